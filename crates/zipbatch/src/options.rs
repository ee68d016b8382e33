use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::nav::Location;
use crate::state::STATE_FILE_NAME;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_EXTRACT_SUBDIR: &str = "extracted_zip";
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// What happens to the run when a member fails after its retries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Record the failure and continue with the next member.
    #[default]
    Skip,
    /// Stop the run; state reflects progress strictly before the member.
    Abort,
}

impl FromStr for OnError {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(Error::Configuration(format!(
                "on_error must be 'skip' or 'abort', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for OnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Skip => "skip",
            Self::Abort => "abort",
        })
    }
}

/// Settings for one extraction run.
#[derive(Clone, Debug)]
pub struct IterConfig {
    pub output_dir:     PathBuf,
    pub batch_size:     usize,
    pub extract_subdir: String,
    pub base:           Location,
    pub reset:          bool,
    pub seed:           Option<u64>,
    pub extensions:     Option<Vec<String>>,
    pub on_error:       OnError,
    pub max_retries:    u32,
    pub validate_crc:   bool,
    pub rotate:         bool,
}

impl IterConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir:     output_dir.into(),
            batch_size:     DEFAULT_BATCH_SIZE,
            extract_subdir: DEFAULT_EXTRACT_SUBDIR.to_string(),
            base:           Location::root(),
            reset:          false,
            seed:           None,
            extensions:     None,
            on_error:       OnError::Skip,
            max_retries:    DEFAULT_MAX_RETRIES,
            validate_crc:   false,
            rotate:         false,
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn extract_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.extract_subdir = subdir.into();
        self
    }

    pub fn base(mut self, base: Location) -> Self {
        self.base = base;
        self
    }

    pub fn reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    pub fn on_error(mut self, on_error: OnError) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn validate_crc(mut self, validate_crc: bool) -> Self {
        self.validate_crc = validate_crc;
        self
    }

    pub fn rotate(mut self, rotate: bool) -> Self {
        self.rotate = rotate;
        self
    }

    /// `<output_dir>/<extract_subdir>`, the root every member is written under.
    pub fn extract_dir(&self) -> PathBuf { self.output_dir.join(&self.extract_subdir) }

    pub fn state_path(&self) -> PathBuf { self.extract_dir().join(STATE_FILE_NAME) }

    /// Lowercase, dot-prefixed extension filter. `None` selects every file.
    pub fn normalized_extensions(&self) -> Result<Option<BTreeSet<String>>> {
        let Some(raw) = &self.extensions else {
            return Ok(None);
        };
        raw.iter()
            .map(|ext| normalize_extension(ext))
            .collect::<Result<BTreeSet<_>>>()
            .map(Some)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Configuration("batch_size must be greater than zero".into()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::Configuration("output_dir must not be empty".into()));
        }
        validate_subdir(&self.extract_subdir)?;
        if let Some(exts) = &self.extensions
            && exts.is_empty()
        {
            return Err(Error::Configuration(
                "extension filter must name at least one extension".into(),
            ));
        }
        self.normalized_extensions()?;
        Ok(())
    }
}

fn validate_subdir(subdir: &str) -> Result<()> {
    let mut components = Path::new(subdir).components();
    let single_normal = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none()
        && !subdir.contains(['/', '\\']);
    if single_normal {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "extract_subdir must be a single path segment, got '{subdir}'"
        )))
    }
}

fn normalize_extension(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return Err(Error::Configuration(format!("invalid extension '{raw}'")));
    }
    Ok(format!(".{}", trimmed.to_lowercase()))
}

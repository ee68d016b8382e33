use indicatif::{ProgressBar, ProgressStyle};
use tabled::settings::object::Rows;
use tabled::settings::{Panel, Remove, Style};
use tabled::{Table, Tabled};

const PB_STYLE: &str = "{spinner:.blue} {prefix:>10.cyan.bold} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} batches {wide_msg}";
const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";
const PB_CHARS: &str = "█▓▒░  ";

/// Borderless table with an optional title row.
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    pub header:    Option<String>,
    pub col_names: bool,
}

impl Formatter {
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn col_names(mut self, col_names: bool) -> Self {
        self.col_names = col_names;
        self
    }

    pub fn build<T: Tabled, I: IntoIterator<Item = T>>(self, data: I) -> Table {
        let mut table = Table::new(data);
        if !self.col_names {
            table.with(Remove::row(Rows::first()));
        }
        if let Some(header) = self.header {
            table.with(Panel::header(header));
        }
        table.with(Style::blank());
        table
    }
}

/// One `key  value` line of a record view.
#[derive(Tabled)]
pub struct Field {
    pub field: &'static str,
    pub value: String,
}

impl Field {
    pub fn new(field: &'static str, value: impl ToString) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// Batch-level progress bar starting at `done` of `total`.
pub fn batch_progress(total: usize, done: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template(PB_STYLE) {
        pb.set_style(style.tick_chars(TICK).progress_chars(PB_CHARS));
    }
    pb.set_prefix("extract");
    pb.set_position(done as u64);
    pb
}

pub fn human_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.00 KiB");
        assert_eq!(human_bytes(5 * 1024 * 1024 + 512 * 1024), "5.50 MiB");
    }

    #[test]
    fn record_table_has_no_column_names() {
        let rendered = Formatter::default()
            .build([Field::new("path", "a.csv"), Field::new("size", 12)])
            .to_string();
        assert!(rendered.contains("a.csv"));
        assert!(!rendered.contains("field"));
    }
}

//! Spreadsheet plumbing: cell values, reading report exports, writing
//! result workbooks and locating the newest export in a folder.

pub mod latest;
pub mod reader;
pub mod writer;

use std::fmt;

pub use latest::{FolderEntry, describe_folder, latest_file, latest_files};
pub use reader::SheetGrid;
pub use writer::{SheetSpec, open_book, set_cell, write_grid, write_table};

/// A non-empty spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Text cell, or `None` for blank strings
    pub fn text(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(CellValue::Text(value))
        }
    }

    /// Numeric cell, or `None` for NaN/infinite values
    pub fn number(value: f64) -> Option<Self> {
        value.is_finite().then_some(CellValue::Number(value))
    }

    /// Normalised join key: trimmed text, integral numbers without a decimal part
    pub fn as_key(&self) -> Option<String> {
        let key = match self {
            CellValue::Text(text) => text.trim().to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(b) => b.to_string(),
        };
        (!key.is_empty()).then_some(key)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(text) => f.write_str(text),
            CellValue::Number(n) => f.write_str(&format_number(*n)),
            CellValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_floats_key_without_decimals() {
        assert_eq!(
            CellValue::Number(1234567.0).as_key().as_deref(),
            Some("1234567")
        );
        assert_eq!(CellValue::Number(12.5).as_key().as_deref(), Some("12.5"));
    }

    #[test]
    fn text_keys_are_trimmed() {
        assert_eq!(
            CellValue::Text("  98765 \n".into()).as_key().as_deref(),
            Some("98765")
        );
        assert_eq!(CellValue::Text("   ".into()).as_key(), None);
    }

    #[test]
    fn blank_and_nan_cells_are_absent() {
        assert_eq!(CellValue::text(" "), None);
        assert_eq!(CellValue::number(f64::NAN), None);
        assert_eq!(CellValue::number(3.0), Some(CellValue::Number(3.0)));
    }
}

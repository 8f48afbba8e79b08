use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use tracing::debug;

use super::CellValue;
use crate::error::{ToolkitError, ToolkitResult};

/// First worksheet of a workbook, addressed by absolute 0-based (row, column)
/// so fixed offsets like "column P from row 10" stay valid even when the
/// sheet starts with blank rows.
#[derive(Debug, Clone)]
pub struct SheetGrid {
    range: Range<Data>,
}

impl SheetGrid {
    pub fn open(path: &Path) -> ToolkitResult<Self> {
        let read_error = |message: String| ToolkitError::SpreadsheetRead {
            path: path.to_path_buf(),
            message,
        };

        let mut workbook = open_workbook_auto(path).map_err(|e| read_error(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| read_error("workbook has no worksheets".to_string()))?
            .map_err(|e| read_error(e.to_string()))?;

        debug!(
            "Opened {} with used range {:?}..{:?}",
            path.display(),
            range.start(),
            range.end()
        );
        Ok(Self { range })
    }

    pub fn from_range(range: Range<Data>) -> Self {
        Self { range }
    }

    /// Number of rows counted from the top of the sheet, blank leading rows included
    pub fn row_count(&self) -> u32 {
        self.range.end().map(|(row, _)| row + 1).unwrap_or(0)
    }

    pub fn get(&self, row: u32, col: u32) -> Option<CellValue> {
        self.range.get_value((row, col)).and_then(cell_from_data)
    }
}

fn cell_from_data(data: &Data) -> Option<CellValue> {
    match data {
        Data::Int(i) => Some(CellValue::Number(*i as f64)),
        Data::Float(f) => CellValue::number(*f),
        Data::String(s) => CellValue::text(s.as_str()),
        Data::Bool(b) => Some(CellValue::Bool(*b)),
        Data::DateTime(dt) => CellValue::number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s.as_str()),
        Data::Error(_) | Data::Empty => None,
    }
}

use std::path::Path;

use tracing::debug;
use umya_spreadsheet::{Spreadsheet, Worksheet};

use super::CellValue;
use crate::error::{ToolkitError, ToolkitResult};

/// Layout of a freshly written single-sheet workbook
#[derive(Debug, Clone)]
pub struct SheetSpec<'a> {
    pub name: &'a str,
    pub headers: &'a [&'a str],
    /// Column widths from column A onwards
    pub widths: &'a [f64],
}

/// Write a header row followed by `rows` into a new workbook at `path`
pub fn write_table(
    path: &Path,
    spec: &SheetSpec<'_>,
    rows: &[Vec<Option<CellValue>>],
) -> ToolkitResult<()> {
    let mut grid = Vec::with_capacity(rows.len() + 1);
    grid.push(
        spec.headers
            .iter()
            .map(|h| CellValue::text(*h))
            .collect::<Vec<_>>(),
    );
    grid.extend(rows.iter().cloned());

    let mut book = umya_spreadsheet::new_file();
    {
        let sheet = first_sheet_mut(&mut book, path)?;
        sheet.set_name(spec.name);
        fill(sheet, &grid);
        for (idx, width) in spec.widths.iter().enumerate() {
            sheet
                .get_column_dimension_mut(&column_letter(idx as u32 + 1))
                .set_width(*width);
        }
    }
    save(&book, path)
}

/// Write `grid` verbatim starting at A1 of a new workbook
pub fn write_grid(path: &Path, sheet_name: &str, grid: &[Vec<Option<CellValue>>]) -> ToolkitResult<()> {
    let mut book = umya_spreadsheet::new_file();
    {
        let sheet = first_sheet_mut(&mut book, path)?;
        sheet.set_name(sheet_name);
        fill(sheet, grid);
    }
    save(&book, path)
}

/// Store `value` at 1-based (`col`, `row`)
pub fn set_cell(sheet: &mut Worksheet, col: u32, row: u32, value: &CellValue) {
    let cell = sheet.get_cell_mut((col, row));
    match value {
        CellValue::Text(text) => {
            cell.set_value_string(text.clone());
        }
        CellValue::Number(n) => {
            cell.set_value_number(*n);
        }
        CellValue::Bool(b) => {
            cell.set_value_bool(*b);
        }
    }
}

/// Spreadsheet column name for a 1-based index (1 → A, 27 → AA)
pub fn column_letter(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

pub(crate) fn save(book: &Spreadsheet, path: &Path) -> ToolkitResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    umya_spreadsheet::writer::xlsx::write(book, path).map_err(|e| {
        ToolkitError::SpreadsheetWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;
    debug!("Wrote workbook {}", path.display());
    Ok(())
}

/// Load an existing workbook for editing; macro parts are carried through
pub fn open_book(path: &Path) -> ToolkitResult<Spreadsheet> {
    umya_spreadsheet::reader::xlsx::read(path).map_err(|e| ToolkitError::SpreadsheetRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub(crate) fn first_sheet_mut<'a>(book: &'a mut Spreadsheet, path: &Path) -> ToolkitResult<&'a mut Worksheet> {
    book.get_sheet_mut(&0)
        .ok_or_else(|| ToolkitError::SpreadsheetWrite {
            path: path.to_path_buf(),
            message: "workbook has no worksheet".to_string(),
        })
}

/// The sheet that opens when the workbook is shown; the first one if the
/// stored tab index is out of range
pub(crate) fn active_sheet_mut<'a>(book: &'a mut Spreadsheet, path: &Path) -> ToolkitResult<&'a mut Worksheet> {
    let active = *book.get_workbook_view().get_active_tab() as usize;
    let index = if active < book.get_sheet_count() { active } else { 0 };
    book.get_sheet_mut(&index)
        .ok_or_else(|| ToolkitError::SpreadsheetWrite {
            path: path.to_path_buf(),
            message: "workbook has no worksheet".to_string(),
        })
}

fn fill(sheet: &mut Worksheet, grid: &[Vec<Option<CellValue>>]) {
    for (row_idx, row) in grid.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            if let Some(value) = value {
                set_cell(sheet, col_idx as u32 + 1, row_idx as u32 + 1, value);
            }
        }
    }
}

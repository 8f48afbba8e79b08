use umya_spreadsheet::Worksheet;

use super::sources::KeyedTable;
use crate::workbook::{CellValue, set_cell};

/// Unit rows start below the header
pub const FIRST_UNIT_ROW: u32 = 2;
const KEY_COLUMN: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub rows_with_key: usize,
    pub rows_updated: usize,
}

/// Write every non-empty mapped value into rows whose column A holds a known key
pub fn apply_sources(sheet: &mut Worksheet, tables: &[&KeyedTable]) -> ApplyStats {
    let mut stats = ApplyStats::default();
    let last_row = sheet.get_highest_row();

    for row in FIRST_UNIT_ROW..=last_row {
        let Some(key) = unit_key(sheet, row) else {
            continue;
        };
        stats.rows_with_key += 1;

        let mut updated = false;
        for table in tables {
            for (col, value) in table.writes_for(&key) {
                set_cell(sheet, col, row, value);
                updated = true;
            }
        }
        if updated {
            stats.rows_updated += 1;
        }
    }
    stats
}

/// Column A of `row` as a join key; integral numbers lose their decimal part
pub fn unit_key(sheet: &Worksheet, row: u32) -> Option<String> {
    let cell = sheet.get_cell((KEY_COLUMN, row))?;
    if let Some(n) = cell.get_value_number() {
        return CellValue::number(n).and_then(|v| v.as_key());
    }
    CellValue::text(cell.get_value().to_string()).and_then(|v| v.as_key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit_merge::sources::{DIMENSIONS, KeyedTable, PRICES, TableLayout};
    use crate::workbook::SheetGrid;
    use calamine::{Data, Range};

    fn table(layout: &'static TableLayout, rows: &[(u32, u32, Data)]) -> KeyedTable {
        let mut range = Range::new((0, 0), (5, 6));
        for (row, col, value) in rows {
            range.set_value((*row, *col), value.clone());
        }
        let mut table = KeyedTable::new(layout);
        table.absorb(&SheetGrid::from_range(range));
        table
    }

    #[test]
    fn known_keys_get_values_and_are_counted() {
        let prices = table(&PRICES, &[(1, 0, Data::String("1001".into())), (1, 2, Data::Float(499.0))]);
        let dimensions = table(
            &DIMENSIONS,
            &[(1, 0, Data::Int(1002)), (1, 3, Data::Float(10.5)), (1, 5, Data::Float(30.0))],
        );

        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_mut(&0).unwrap();
        sheet.get_cell_mut((1, 1)).set_value_string("SKU");
        sheet.get_cell_mut((1, 2)).set_value_number(1001.0);
        sheet.get_cell_mut((1, 3)).set_value_string(" 1002 ");
        sheet.get_cell_mut((1, 5)).set_value_string("9999");
        sheet.get_cell_mut((2, 4)).set_value_string("no key in A");

        let stats = apply_sources(sheet, &[&dimensions, &prices]);

        assert_eq!(
            stats,
            ApplyStats {
                rows_with_key: 3,
                rows_updated: 2,
            }
        );
        assert_eq!(sheet.get_cell((37, 2)).unwrap().get_value_number(), Some(499.0));
        assert_eq!(sheet.get_cell((5, 3)).unwrap().get_value_number(), Some(30.0));
        assert_eq!(sheet.get_cell((6, 3)).unwrap().get_value_number(), Some(10.5));
        assert!(sheet.get_cell((7, 3)).is_none());
    }
}

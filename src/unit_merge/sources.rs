use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use super::inputs::MergeInputs;
use crate::error::ToolkitResult;
use crate::workbook::{CellValue, SheetGrid};

/// Source column (0-based) copied into a unit workbook column (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub source: u32,
    pub target: u32,
}

const fn map(source: u32, target: u32) -> ColumnMap {
    ColumnMap { source, target }
}

/// How a repeated key combines with the row already held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// The later row replaces the earlier one wholesale
    Replace,
    /// Only non-empty cells of the later row overwrite
    KeepNonEmpty,
}

#[derive(Debug)]
pub struct TableLayout {
    pub name: &'static str,
    /// First data row, 0-based
    pub first_row: u32,
    pub key_col: u32,
    pub columns: &'static [ColumnMap],
    pub policy: MergePolicy,
}

/// Marketplace report: B ← col 0, C ← col 15 (cost)
pub static MARK: TableLayout = TableLayout {
    name: "A (MARK)",
    first_row: 9,
    key_col: 3,
    columns: &[map(0, 2), map(15, 3)],
    policy: MergePolicy::Replace,
};

/// Analytics report: O ← col 63 (average price), AH ← col 69 (total DRR)
pub static ANALYTICS: TableLayout = TableLayout {
    name: "B (analytics)",
    first_row: 13,
    key_col: 7,
    columns: &[map(63, 15), map(69, 34)],
    policy: MergePolicy::KeepNonEmpty,
};

/// Dimensions report: E ← length, F ← width, G ← height
pub static DIMENSIONS: TableLayout = TableLayout {
    name: "C (dimensions)",
    first_row: 1,
    key_col: 0,
    columns: &[map(5, 5), map(3, 6), map(4, 7)],
    policy: MergePolicy::Replace,
};

/// Scraped prices: AK ← price with co-investment
pub static PRICES: TableLayout = TableLayout {
    name: "D (prices)",
    first_row: 1,
    key_col: 0,
    columns: &[map(2, 37)],
    policy: MergePolicy::Replace,
};

/// Rows of one source table indexed by key, values in `layout.columns` order
#[derive(Debug)]
pub struct KeyedTable {
    layout: &'static TableLayout,
    rows: HashMap<String, Vec<Option<CellValue>>>,
}

impl KeyedTable {
    pub fn new(layout: &'static TableLayout) -> Self {
        Self {
            layout,
            rows: HashMap::new(),
        }
    }

    pub fn layout(&self) -> &'static TableLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fold every data row of `grid` into the table
    pub fn absorb(&mut self, grid: &SheetGrid) {
        for row in self.layout.first_row..grid.row_count() {
            let Some(key) = grid.get(row, self.layout.key_col).and_then(|cell| cell.as_key()) else {
                continue;
            };
            let values: Vec<Option<CellValue>> = self
                .layout
                .columns
                .iter()
                .map(|column| grid.get(row, column.source))
                .collect();
            self.insert(key, values);
        }
    }

    fn insert(&mut self, key: String, values: Vec<Option<CellValue>>) {
        if self.layout.policy == MergePolicy::KeepNonEmpty {
            if let Some(existing) = self.rows.get_mut(&key) {
                for (slot, value) in existing.iter_mut().zip(values) {
                    if value.is_some() {
                        *slot = value;
                    }
                }
                return;
            }
        }
        self.rows.insert(key, values);
    }

    /// Non-empty `(target column, value)` pairs held for `key`
    pub fn writes_for<'a>(&'a self, key: &str) -> impl Iterator<Item = (u32, &'a CellValue)> + 'a {
        let columns = self.layout.columns;
        self.rows
            .get(key)
            .into_iter()
            .flat_map(move |values| {
                columns
                    .iter()
                    .zip(values.iter())
                    .filter_map(|(column, value)| value.as_ref().map(|v| (column.target, v)))
            })
    }
}

/// The four lookup tables of a merge run
#[derive(Debug)]
pub struct SourceTables {
    pub mark: KeyedTable,
    pub analytics: KeyedTable,
    pub dimensions: KeyedTable,
    pub prices: KeyedTable,
    pub analytics_files: usize,
}

impl SourceTables {
    pub fn load(inputs: &MergeInputs) -> ToolkitResult<Self> {
        let mark = load_table(&MARK, &[inputs.mark.as_path()])?;
        let analytics_paths: Vec<&Path> = inputs.analytics.iter().map(|p| p.as_path()).collect();
        let analytics = load_table(&ANALYTICS, &analytics_paths)?;
        let dimensions = load_table(&DIMENSIONS, &[inputs.dimensions.as_path()])?;
        let prices = load_table(&PRICES, &[inputs.prices.as_path()])?;

        Ok(Self {
            mark,
            analytics,
            dimensions,
            prices,
            analytics_files: inputs.analytics.len(),
        })
    }

    /// Tables in the order their values are written
    pub fn in_apply_order(&self) -> [&KeyedTable; 4] {
        [&self.mark, &self.dimensions, &self.analytics, &self.prices]
    }
}

/// Read `paths` in order into one table; later files win per the layout's policy
pub fn load_table(layout: &'static TableLayout, paths: &[&Path]) -> ToolkitResult<KeyedTable> {
    let mut table = KeyedTable::new(layout);
    for path in paths {
        let grid = SheetGrid::open(path)?;
        table.absorb(&grid);
        info!("Table {}: read {}", layout.name, path.display());
    }
    info!("Table {}: {} keys", layout.name, table.len());
    Ok(table)
}

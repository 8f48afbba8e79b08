//! Merge report exports into a copy of the unit economics workbook

pub mod apply;
pub mod inputs;
pub mod sources;

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

pub use apply::{ApplyStats, apply_sources, unit_key};
pub use inputs::MergeInputs;
pub use sources::{KeyedTable, MergePolicy, SourceTables, TableLayout};

use crate::config::Config;
use crate::error::ToolkitResult;
use crate::workbook::open_book;
use crate::workbook::writer::{active_sheet_mut, save};
use inputs::file_name;

/// What a merge run read and wrote
#[derive(Debug, Clone)]
pub struct MergeSummary {
    pub mark_keys: usize,
    pub analytics_keys: usize,
    pub analytics_files: usize,
    pub dimensions_keys: usize,
    pub prices_keys: usize,
    pub stats: ApplyStats,
    pub original: PathBuf,
    pub updated: PathBuf,
}

impl fmt::Display for MergeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Table A (MARK): {} SKU", self.mark_keys)?;
        writeln!(
            f,
            "Table B (analytics): {} unique SKU from {} files",
            self.analytics_keys, self.analytics_files
        )?;
        writeln!(f, "Table C (dimensions): {} SKU", self.dimensions_keys)?;
        writeln!(f, "Table D (prices): {} SKU", self.prices_keys)?;
        writeln!(
            f,
            "Unit workbook: {} rows with SKU, {} updated",
            self.stats.rows_with_key, self.stats.rows_updated
        )?;
        writeln!(f, "Original: {}", file_name(&self.original))?;
        write!(f, "Updated copy: {}", file_name(&self.updated))
    }
}

/// `<stem>_updated_<YYYY-MM-DD_HH-MM-SS><ext>` next to `original`
pub fn updated_copy_path(original: &Path, at: DateTime<Local>) -> PathBuf {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    original.with_file_name(format!(
        "{}_updated_{}{}",
        stem,
        at.format("%Y-%m-%d_%H-%M-%S"),
        extension
    ))
}

/// Locate inputs, build the lookup tables and write an updated copy of the
/// unit workbook's active sheet. The original file is only read.
pub fn run_unit_update(config: &Config) -> ToolkitResult<MergeSummary> {
    info!("Working directory: {}", config.base_dir().display());
    let inputs = MergeInputs::locate(config)?;
    let tables = SourceTables::load(&inputs)?;

    let updated = updated_copy_path(&inputs.unit, Local::now());
    let mut book = open_book(&inputs.unit)?;
    let stats = {
        let sheet = active_sheet_mut(&mut book, &inputs.unit)?;
        apply_sources(sheet, &tables.in_apply_order())
    };
    save(&book, &updated)?;
    info!(
        "Updated copy {} written: {} of {} rows updated",
        updated.display(),
        stats.rows_updated,
        stats.rows_with_key
    );

    Ok(MergeSummary {
        mark_keys: tables.mark.len(),
        analytics_keys: tables.analytics.len(),
        analytics_files: tables.analytics_files,
        dimensions_keys: tables.dimensions.len(),
        prices_keys: tables.prices.len(),
        stats,
        original: inputs.unit,
        updated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn updated_copy_keeps_stem_and_extension() {
        let at = Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(
            updated_copy_path(Path::new("unit_folder/Unit.xlsm"), at),
            PathBuf::from("unit_folder/Unit_updated_2026-03-07_09-05-01.xlsm")
        );
    }
}

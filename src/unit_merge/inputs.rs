use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::config::{ANALYTICS_DIR, Config, DIMENSIONS_DIR, MARK_DIR, PRICES_DIR, UNIT_DIR};
use crate::error::{ToolkitError, ToolkitResult};
use crate::workbook::{describe_folder, latest_file, latest_files};

pub const ANALYTICS_FILES: usize = 2;

/// Files chosen for one merge run
#[derive(Debug, Clone)]
pub struct MergeInputs {
    pub mark: PathBuf,
    /// Oldest first, so the newest export is applied last
    pub analytics: Vec<PathBuf>,
    pub dimensions: PathBuf,
    pub prices: PathBuf,
    pub unit: PathBuf,
}

impl MergeInputs {
    /// Pick the newest export in every input folder
    pub fn locate(config: &Config) -> ToolkitResult<Self> {
        let mark = latest_file(&config.mark_dir(), "xlsx");
        let mut analytics = latest_files(&config.analytics_dir(), "xlsx", ANALYTICS_FILES);
        analytics.reverse();
        let dimensions = latest_file(&config.dimensions_dir(), "xlsx");
        let prices = latest_file(&config.prices_dir(), "xlsx");
        let unit = latest_file(&config.unit_dir(), "xlsm").or_else(|| latest_file(&config.unit_dir(), "xlsx"));

        let mut missing = Vec::new();
        let mut require = |found: bool, folder: &str| {
            if !found {
                missing.push(folder.to_string());
            }
        };
        require(mark.is_some(), MARK_DIR);
        require(!analytics.is_empty(), ANALYTICS_DIR);
        require(dimensions.is_some(), DIMENSIONS_DIR);
        require(prices.is_some(), PRICES_DIR);
        require(unit.is_some(), UNIT_DIR);

        match (mark, dimensions, prices, unit) {
            (Some(mark), Some(dimensions), Some(prices), Some(unit)) if missing.is_empty() => {
                let inputs = Self {
                    mark,
                    analytics,
                    dimensions,
                    prices,
                    unit,
                };
                inputs.log();
                Ok(inputs)
            }
            _ => {
                log_folders(config);
                Err(ToolkitError::MissingInputs(missing))
            }
        }
    }

    fn log(&self) {
        info!("Table A (MARK): {}", file_name(&self.mark));
        for (idx, path) in self.analytics.iter().enumerate() {
            info!("Table B (analytics) file {}: {}", idx + 1, file_name(path));
        }
        info!("Table C (dimensions): {}", file_name(&self.dimensions));
        info!("Table D (prices): {}", file_name(&self.prices));
        info!("Unit workbook: {}", file_name(&self.unit));
    }
}

fn log_folders(config: &Config) {
    let folders = [
        (config.mark_dir(), MARK_DIR),
        (config.analytics_dir(), ANALYTICS_DIR),
        (config.dimensions_dir(), DIMENSIONS_DIR),
        (config.prices_dir(), PRICES_DIR),
        (config.unit_dir(), UNIT_DIR),
    ];
    for (dir, name) in folders {
        match describe_folder(&dir) {
            Some(entries) => {
                error!("{}: {} files", name, entries.len());
                for entry in entries {
                    let modified = entry
                        .modified
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    error!("  - {} ({})", entry.name, modified);
                }
            }
            None => error!("{}: folder does not exist", name),
        }
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::time::{Duration, SystemTime};

    fn base_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ozon-inputs-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn touch(path: &Path, age_secs: u64) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = File::create(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[test]
    fn missing_folders_are_all_reported() {
        let base = base_dir("missing");
        touch(&base.join(MARK_DIR).join("mark.xlsx"), 10);
        let config = Config::default().with_base_dir(&base);

        match MergeInputs::locate(&config) {
            Err(ToolkitError::MissingInputs(folders)) => assert_eq!(
                folders,
                vec![ANALYTICS_DIR, DIMENSIONS_DIR, PRICES_DIR, UNIT_DIR]
            ),
            other => panic!("unexpected {other:?}"),
        }
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn analytics_come_oldest_first_and_xlsm_is_preferred() {
        let base = base_dir("order");
        touch(&base.join(MARK_DIR).join("mark.xlsx"), 10);
        touch(&base.join(ANALYTICS_DIR).join("oldest.xlsx"), 300);
        touch(&base.join(ANALYTICS_DIR).join("older.xlsx"), 200);
        touch(&base.join(ANALYTICS_DIR).join("newest.xlsx"), 100);
        touch(&base.join(DIMENSIONS_DIR).join("ozon_dimensions_cm.xlsx"), 10);
        touch(&base.join(PRICES_DIR).join("ozon_products_1.xlsx"), 10);
        touch(&base.join(UNIT_DIR).join("Unit.xlsx"), 1);
        touch(&base.join(UNIT_DIR).join("Unit.xlsm"), 50);
        let config = Config::default().with_base_dir(&base);

        let inputs = MergeInputs::locate(&config).unwrap();
        let names: Vec<String> = inputs.analytics.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["older.xlsx", "newest.xlsx"]);
        assert_eq!(file_name(&inputs.unit), "Unit.xlsm");
        let _ = fs::remove_dir_all(&base);
    }
}

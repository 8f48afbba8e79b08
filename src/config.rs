use std::env;
use std::path::{Path, PathBuf};

use tracing::warn;

pub const DEFAULT_API_URL: &str = "https://api-seller.ozon.ru";

pub const APIS_FILE: &str = "apis.txt";
pub const SELLERS_FILE: &str = "sellers_list.txt";
pub const DIMENSIONS_DIR: &str = "ozon_dimensions";
pub const DIMENSIONS_FILE: &str = "ozon_dimensions_cm.xlsx";
pub const PRICES_DIR: &str = "prices_with_co-investment";
pub const MARK_DIR: &str = "MARK_ozon_report";
pub const ANALYTICS_DIR: &str = "analytics_report";
pub const UNIT_DIR: &str = "unit_folder";

/// Toolkit configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding every input and output folder
    pub base_dir: PathBuf,
    pub api_base_url: String,
    /// Browser binary; autodetected when unset
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    /// Multiplier for human-like pauses, 0 disables them
    pub pace: f64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            base_dir: env::var("TOOLKIT_BASE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            api_base_url: env::var("OZON_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            chrome_path: env::var("CHROME_PATH").ok().map(PathBuf::from),
            headless: env::var("TOOLKIT_HEADLESS")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
            pace: parse_pace(env::var("TOOLKIT_PACE").ok().as_deref()),
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn apis_file(&self) -> PathBuf {
        self.base_dir.join(APIS_FILE)
    }

    pub fn sellers_file(&self) -> PathBuf {
        self.base_dir.join(SELLERS_FILE)
    }

    pub fn dimensions_dir(&self) -> PathBuf {
        self.base_dir.join(DIMENSIONS_DIR)
    }

    pub fn dimensions_output(&self) -> PathBuf {
        self.dimensions_dir().join(DIMENSIONS_FILE)
    }

    pub fn prices_dir(&self) -> PathBuf {
        self.base_dir.join(PRICES_DIR)
    }

    pub fn mark_dir(&self) -> PathBuf {
        self.base_dir.join(MARK_DIR)
    }

    pub fn analytics_dir(&self) -> PathBuf {
        self.base_dir.join(ANALYTICS_DIR)
    }

    pub fn unit_dir(&self) -> PathBuf {
        self.base_dir.join(UNIT_DIR)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_pace(raw: Option<&str>) -> f64 {
    match raw.map(str::trim) {
        None | Some("") => 1.0,
        Some(value) => match value.parse::<f64>() {
            Ok(pace) if pace.is_finite() && pace >= 0.0 => pace,
            _ => {
                warn!("TOOLKIT_PACE must be a non-negative number, got {value:?}; using 1.0");
                1.0
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pace_accepts_zero_and_fractions() {
        assert_eq!(parse_pace(None), 1.0);
        assert_eq!(parse_pace(Some("0")), 0.0);
        assert_eq!(parse_pace(Some(" 0.5 ")), 0.5);
    }

    #[test]
    fn pace_rejects_garbage() {
        assert_eq!(parse_pace(Some("fast")), 1.0);
        assert_eq!(parse_pace(Some("-2")), 1.0);
    }

    #[test]
    fn folders_hang_off_base_dir() {
        let config = Config::from_env().with_base_dir("/data/shop");
        assert_eq!(
            config.dimensions_output(),
            PathBuf::from("/data/shop/ozon_dimensions/ozon_dimensions_cm.xlsx")
        );
        assert_eq!(
            config.prices_dir(),
            PathBuf::from("/data/shop/prices_with_co-investment")
        );
        assert_eq!(config.unit_dir(), PathBuf::from("/data/shop/unit_folder"));
    }
}

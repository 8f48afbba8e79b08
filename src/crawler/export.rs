use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::error::ToolkitResult;
use crate::models::ScrapedProduct;
use crate::workbook::{SheetSpec, write_table};

const SHEET_NAME: &str = "Products";
const COLUMN_WIDTHS: [f64; 4] = [20.0, 70.0, 20.0, 40.0];

/// Share of rows with each field filled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillStats {
    pub total: usize,
    pub with_sku: usize,
    pub with_name: usize,
    pub with_price: usize,
}

impl FillStats {
    pub fn of(products: &[ScrapedProduct]) -> Self {
        let count = |f: fn(&ScrapedProduct) -> &str| products.iter().filter(|p| !f(p).is_empty()).count();
        Self {
            total: products.len(),
            with_sku: count(|p| p.sku.as_str()),
            with_name: count(|p| p.name.as_str()),
            with_price: count(|p| p.price.as_str()),
        }
    }

    fn percent(&self, n: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            n as f64 * 100.0 / self.total as f64
        }
    }
}

/// `ozon_products_<YYYYmmdd_HHMMSS>.xlsx` in `dir`
pub fn output_path(dir: &Path) -> PathBuf {
    dir.join(format!("ozon_products_{}.xlsx", Local::now().format("%Y%m%d_%H%M%S")))
}

/// Write the scraped rows; returns `None` when there is nothing to save
pub fn save_products(dir: &Path, products: &[ScrapedProduct]) -> ToolkitResult<Option<PathBuf>> {
    if products.is_empty() {
        info!("No products scraped, nothing to save");
        return Ok(None);
    }

    let path = output_path(dir);
    let spec = SheetSpec {
        name: SHEET_NAME,
        headers: &ScrapedProduct::HEADERS,
        widths: &COLUMN_WIDTHS,
    };
    let rows: Vec<_> = products.iter().map(ScrapedProduct::to_row).collect();
    write_table(&path, &spec, &rows)?;

    let stats = FillStats::of(products);
    info!("Saved {} products to {}", stats.total, path.display());
    info!(
        "With SKU: {}/{} ({:.1}%), with name: {}/{} ({:.1}%), with price: {}/{} ({:.1}%)",
        stats.with_sku,
        stats.total,
        stats.percent(stats.with_sku),
        stats.with_name,
        stats.total,
        stats.percent(stats.with_name),
        stats.with_price,
        stats.total,
        stats.percent(stats.with_price),
    );
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::{CellValue, SheetGrid};

    fn product(sku: &str, name: &str, price: &str) -> ScrapedProduct {
        ScrapedProduct {
            sku: sku.into(),
            name: name.into(),
            price: price.into(),
            seller_url: "https://www.ozon.ru/seller/x-1/".into(),
        }
    }

    #[test]
    fn fill_stats_count_non_empty_fields() {
        let products = vec![
            product("1", "a", "100"),
            product("", "b", ""),
            ScrapedProduct::empty("https://www.ozon.ru/seller/x-1/"),
        ];
        assert_eq!(
            FillStats::of(&products),
            FillStats {
                total: 3,
                with_sku: 1,
                with_name: 2,
                with_price: 1,
            }
        );
    }

    #[test]
    fn nothing_is_written_for_an_empty_crawl() {
        let dir = std::env::temp_dir().join("ozon-export-empty");
        assert_eq!(save_products(&dir, &[]).unwrap(), None);
    }

    #[test]
    fn saved_sheet_has_header_and_rows() {
        let dir = std::env::temp_dir().join(format!("ozon-export-{}", std::process::id()));
        let path = save_products(&dir, &[product("555", "Лампа", "1299")])
            .unwrap()
            .unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("ozon_products_") && name.ends_with(".xlsx"));

        let grid = SheetGrid::open(&path).unwrap();
        assert_eq!(grid.get(0, 2), CellValue::text("Price with co-investment"));
        assert_eq!(grid.get(1, 0), Some(CellValue::Number(555.0)));
        assert_eq!(grid.get(1, 1), CellValue::text("Лампа"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}

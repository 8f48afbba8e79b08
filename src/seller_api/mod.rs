//! Marketplace seller API: product ids, physical dimensions, and the
//! dimensions report consumed by the unit update.

pub mod client;
pub mod credentials;

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

pub use client::{HttpSellerApi, ProductAttributes, ProductListPage, SellerApi};
pub use credentials::{ApiCredentials, load_credentials};

use crate::error::ToolkitResult;
use crate::models::ProductDimensions;
use crate::workbook::{SheetSpec, write_table};

pub const ATTRIBUTES_CHUNK: usize = 100;

/// Walk the `last_id` cursor until the listing is exhausted
pub async fn fetch_all_product_ids<A: SellerApi + ?Sized>(api: &A) -> ToolkitResult<Vec<u64>> {
    let mut ids = Vec::new();
    let mut seen_cursors = HashSet::new();
    let mut last_id = String::new();

    loop {
        let page = api.product_list_page(&last_id).await?;
        let page_len = page.items.len();
        ids.extend(page.items.into_iter().map(|item| item.product_id));

        if page.last_id.is_empty() || page_len == 0 {
            break;
        }
        if !seen_cursors.insert(page.last_id.clone()) {
            warn!("Product list cursor {} repeated, stopping pagination", page.last_id);
            break;
        }
        last_id = page.last_id;
    }

    Ok(ids)
}

/// Fetch attributes in chunks of [`ATTRIBUTES_CHUNK`] and convert sizes to centimetres
pub async fn fetch_dimensions<A: SellerApi + ?Sized>(
    api: &A,
    product_ids: &[u64],
) -> ToolkitResult<Vec<ProductDimensions>> {
    let mut rows = Vec::with_capacity(product_ids.len());
    for chunk in product_ids.chunks(ATTRIBUTES_CHUNK) {
        let products = api.product_attributes(chunk).await?;
        rows.extend(products.iter().map(to_dimensions));
    }
    Ok(rows)
}

/// Write the dimensions report with the header the unit update expects
pub fn write_dimensions_report(path: &Path, rows: &[ProductDimensions]) -> ToolkitResult<()> {
    let spec = SheetSpec {
        name: "Sheet1",
        headers: &ProductDimensions::HEADERS,
        widths: &[],
    };
    let grid: Vec<_> = rows.iter().map(ProductDimensions::to_row).collect();
    write_table(path, &spec, &grid)?;
    info!("Dimensions report saved to {} ({} rows)", path.display(), rows.len());
    Ok(())
}

pub fn to_dimensions(product: &ProductAttributes) -> ProductDimensions {
    let unit = product.dimension_unit.as_deref();
    ProductDimensions {
        sku: product.sku.as_ref().map(render_id).unwrap_or_default(),
        name: product.name.clone().unwrap_or_default(),
        offer_id: product.offer_id.clone().unwrap_or_default(),
        width_cm: to_centimetres(product.width.as_ref(), unit),
        height_cm: to_centimetres(product.height.as_ref(), unit),
        length_cm: to_centimetres(product.depth.as_ref(), unit),
    }
}

/// Millimetres by default; rounded to two decimals
pub fn to_centimetres(value: Option<&Value>, unit: Option<&str>) -> Option<f64> {
    let raw = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok()?,
        _ => return None,
    };
    let cm = match unit.map(str::trim) {
        Some("cm") => raw,
        Some("m") => raw * 100.0,
        Some("in") => raw * 2.54,
        _ => raw / 10.0,
    };
    Some((cm * 100.0).round() / 100.0)
}

fn render_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use super::client::ProductListItem;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeApi {
        pages: Vec<ProductListPage>,
        cursors: Mutex<Vec<String>>,
        chunks: Mutex<Vec<usize>>,
    }

    impl FakeApi {
        fn with_pages(pages: Vec<ProductListPage>) -> Self {
            Self {
                pages,
                cursors: Mutex::new(Vec::new()),
                chunks: Mutex::new(Vec::new()),
            }
        }
    }

    fn page(ids: &[u64], last_id: &str) -> ProductListPage {
        ProductListPage {
            items: ids
                .iter()
                .map(|&product_id| ProductListItem { product_id })
                .collect(),
            last_id: last_id.to_string(),
            total: 0,
        }
    }

    #[async_trait]
    impl SellerApi for FakeApi {
        async fn product_list_page(&self, last_id: &str) -> ToolkitResult<ProductListPage> {
            let mut cursors = self.cursors.lock().unwrap();
            let idx = cursors.len();
            cursors.push(last_id.to_string());
            Ok(self.pages.get(idx).cloned().unwrap_or_default())
        }

        async fn product_attributes(&self, product_ids: &[u64]) -> ToolkitResult<Vec<ProductAttributes>> {
            self.chunks.lock().unwrap().push(product_ids.len());
            Ok(product_ids
                .iter()
                .map(|id| ProductAttributes {
                    sku: Some(json!(id + 1000)),
                    name: Some(format!("product {id}")),
                    offer_id: Some(format!("OF-{id}")),
                    width: Some(json!(105)),
                    height: Some(json!(20)),
                    depth: Some(json!(333)),
                    dimension_unit: Some("mm".into()),
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn follows_cursor_until_empty() {
        let api = FakeApi::with_pages(vec![
            page(&[1, 2], "c1"),
            page(&[3], "c2"),
            page(&[4], ""),
        ]);
        let ids = fetch_all_product_ids(&api).await.unwrap();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(*api.cursors.lock().unwrap(), vec!["", "c1", "c2"]);
    }

    #[tokio::test]
    async fn stops_when_cursor_repeats() {
        let api = FakeApi::with_pages(vec![
            page(&[1], "same"),
            page(&[2], "same"),
            page(&[3], "never-reached"),
        ]);
        let ids = fetch_all_product_ids(&api).await.unwrap();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn attributes_are_requested_in_chunks_of_100() {
        let api = FakeApi::with_pages(Vec::new());
        let ids: Vec<u64> = (1..=250).collect();
        let rows = fetch_dimensions(&api, &ids).await.unwrap();

        assert_eq!(*api.chunks.lock().unwrap(), vec![100, 100, 50]);
        assert_eq!(rows.len(), 250);
        assert_eq!(rows[0].sku, "1001");
        assert_eq!(rows[0].width_cm, Some(10.5));
        assert_eq!(rows[0].height_cm, Some(2.0));
        assert_eq!(rows[0].length_cm, Some(33.3));
    }

    #[test]
    fn centimetres_respect_unit_and_reject_garbage() {
        assert_eq!(to_centimetres(Some(&json!(1234)), None), Some(123.4));
        assert_eq!(to_centimetres(Some(&json!(7)), Some("mm")), Some(0.7));
        assert_eq!(to_centimetres(Some(&json!(15.456)), Some("cm")), Some(15.46));
        assert_eq!(to_centimetres(Some(&json!("12,5")), Some("cm")), Some(12.5));
        assert_eq!(to_centimetres(Some(&json!("n/a")), None), None);
        assert_eq!(to_centimetres(Some(&Value::Null), None), None);
        assert_eq!(to_centimetres(None, None), None);
    }
}

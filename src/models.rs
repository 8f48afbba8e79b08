use serde::Serialize;

use crate::workbook::CellValue;

/// One product row of the dimensions report, sizes in centimetres
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDimensions {
    pub sku: String,
    pub name: String,
    pub offer_id: String,
    pub width_cm: Option<f64>,
    pub height_cm: Option<f64>,
    pub length_cm: Option<f64>,
}

/// Fields scraped from one competitor product page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScrapedProduct {
    pub sku: String,
    pub name: String,
    pub price: String,
    pub seller_url: String,
}

impl ProductDimensions {
    pub const HEADERS: [&'static str; 6] =
        ["sku", "name", "offer_id", "width_cm", "height_cm", "length_cm"];

    pub fn to_row(&self) -> Vec<Option<CellValue>> {
        vec![
            numeric_or_text(&self.sku),
            CellValue::text(self.name.as_str()),
            CellValue::text(self.offer_id.as_str()),
            self.width_cm.and_then(CellValue::number),
            self.height_cm.and_then(CellValue::number),
            self.length_cm.and_then(CellValue::number),
        ]
    }
}

impl ScrapedProduct {
    pub const HEADERS: [&'static str; 4] =
        ["SKU", "Name", "Price with co-investment", "Seller URL"];

    /// Placeholder row for a page that could not be scraped
    pub fn empty(seller_url: &str) -> Self {
        Self {
            seller_url: seller_url.to_string(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sku.is_empty() && self.name.is_empty() && self.price.is_empty()
    }

    pub fn to_row(&self) -> Vec<Option<CellValue>> {
        vec![
            numeric_or_text(&self.sku),
            CellValue::text(self.name.as_str()),
            numeric_or_text(&self.price),
            CellValue::text(self.seller_url.as_str()),
        ]
    }
}

/// Digit-only identifiers are stored as numbers so Excel does not flag them
fn numeric_or_text(value: &str) -> Option<CellValue> {
    let trimmed = value.trim();
    if !trimmed.is_empty() && trimmed.len() <= 15 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        trimmed.parse::<f64>().ok().and_then(CellValue::number)
    } else {
        CellValue::text(trimmed)
    }
}

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::dom::{digit_runs, has_digit, is_silent_tag, visible_text};

static SKU_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.ga5_3_11-a2.tsBodyControl400Small").unwrap());
static NAME_HEADING: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1.pdp_gb9.tsHeadline550Medium").unwrap());
static ANY_HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static PRICE_SPAN: Lazy<Selector> = Lazy::new(|| Selector::parse("span.tsHeadline600Large").unwrap());
static BODY_ELEMENTS: Lazy<Selector> = Lazy::new(|| Selector::parse("body *").unwrap());

const SKU_LABEL: &str = "Артикул";
const ROUBLE: char = '₽';

/// Fields read from a product page; missing ones stay empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFields {
    pub sku: String,
    pub name: String,
    pub price: String,
}

pub fn extract_product(html: &str) -> ProductFields {
    let doc = Html::parse_document(html);
    ProductFields {
        sku: extract_sku(&doc).unwrap_or_default(),
        name: extract_name(&doc).unwrap_or_default(),
        price: extract_price(&doc).unwrap_or_default(),
    }
}

fn extract_sku(doc: &Html) -> Option<String> {
    let from_block = doc
        .select(&SKU_BLOCK)
        .map(visible_text)
        .find(|text| text.contains(SKU_LABEL))
        .and_then(|text| last_digit_run(&text));
    if from_block.is_some() {
        return from_block;
    }

    let element = smallest_element_with(doc, |text| text.contains(SKU_LABEL) && has_digit(text))?;
    last_digit_run(&visible_text(element))
}

fn extract_name(doc: &Html) -> Option<String> {
    doc.select(&NAME_HEADING)
        .map(visible_text)
        .find(|text| !text.is_empty())
        .or_else(|| {
            doc.select(&ANY_HEADING)
                .map(visible_text)
                .find(|text| text.chars().count() > 3)
        })
}

/// All digit runs joined: "1 299 ₽" becomes "1299"
fn extract_price(doc: &Html) -> Option<String> {
    let joined = |text: String| -> Option<String> {
        let digits = digit_runs(&text).concat();
        (!digits.is_empty()).then_some(digits)
    };

    doc.select(&PRICE_SPAN)
        .map(visible_text)
        .find_map(joined)
        .or_else(|| {
            let element = smallest_element_with(doc, |text| text.contains(ROUBLE) && has_digit(text))?;
            joined(visible_text(element))
        })
}

fn last_digit_run(text: &str) -> Option<String> {
    digit_runs(text).last().map(|run| run.to_string())
}

/// The innermost element whose rendered text satisfies `accept`.
/// Outer containers (up to `<html>`) also match, so the shortest text wins.
pub fn smallest_element_with<'a>(doc: &'a Html, accept: impl Fn(&str) -> bool) -> Option<ElementRef<'a>> {
    doc.select(&BODY_ELEMENTS)
        .filter(|element| !is_silent_tag(element.value().name()))
        .filter_map(|element| {
            let text = visible_text(element);
            accept(&text).then_some((text.chars().count(), element))
        })
        .min_by_key(|(len, _)| *len)
        .map(|(_, element)| element)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_selectors_win() {
        let html = r#"<html><body>
            <h1 class="pdp_gb9 tsHeadline550Medium">Кабель USB-C 2 м</h1>
            <div class="ga5_3_11-a2 tsBodyControl400Small">Артикул: 1234567</div>
            <span class="tsHeadline600Large">1&nbsp;299&thinsp;₽</span>
        </body></html>"#;
        assert_eq!(
            extract_product(html),
            ProductFields {
                sku: "1234567".into(),
                name: "Кабель USB-C 2 м".into(),
                price: "1299".into(),
            }
        );
    }

    #[test]
    fn fallbacks_pick_the_innermost_element() {
        let html = r#"<html><body>
            <h1>Ok</h1>
            <h1>Зарядное устройство</h1>
            <section>
              <div><span>Код товара</span><p>Артикул 98765</p></div>
              <div class="price-box"><b>2 450 ₽</b><s>3 100 ₽</s></div>
            </section>
            <script>var sku = "Артикул 1";</script>
        </body></html>"#;
        let fields = extract_product(html);
        assert_eq!(fields.sku, "98765");
        assert_eq!(fields.name, "Зарядное устройство");
        assert_eq!(fields.price, "2450");
    }

    #[test]
    fn missing_fields_are_empty() {
        let fields = extract_product("<html><body><p>Товар закончился</p></body></html>");
        assert_eq!(fields, ProductFields::default());
    }
}

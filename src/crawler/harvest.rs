//! Product link discovery under infinite scroll

use std::collections::HashSet;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use super::dom::{digit_runs, own_text, visible_text};

static ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static PRODUCT_ANCHORS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href*='/product/']").unwrap());
static BODY_ELEMENTS: Lazy<Selector> = Lazy::new(|| Selector::parse("body *").unwrap());

/// Tried in order when scrolling stops producing links
pub const SHOW_MORE_XPATHS: [&str; 5] = [
    "//button[contains(., 'Показать ещё')]",
    "//button[contains(., 'Показать еще')]",
    "//div[contains(., 'Показать ещё') and @role='button']",
    "//button[contains(@class, 'show-more')]",
    "//button[@data-widget='showMore']",
];

const MAX_PLAUSIBLE_TOTAL: usize = 1000;

/// Product total announced by the seller page ("Найдено 120 товаров").
/// Falls back to the number of product anchors currently rendered.
pub fn expected_product_count(html: &str) -> Option<usize> {
    let doc = Html::parse_document(html);
    let mut best = 0;

    for element in doc.select(&BODY_ELEMENTS) {
        let own = own_text(element).to_lowercase();
        let class = element.value().attr("class").unwrap_or_default().to_lowercase();
        let full = visible_text(element);
        let full_lower = full.to_lowercase();

        let announces_total = own.contains("товар") && (own.contains("найдено") || own.contains("всего"));
        let total_widget = class.contains("total") && full_lower.contains("товар");
        if !announces_total && !total_widget {
            continue;
        }

        let largest = digit_runs(&full)
            .into_iter()
            .filter_map(|run| run.parse::<usize>().ok())
            .max();
        if let Some(n) = largest {
            if n > best && n < MAX_PLAUSIBLE_TOTAL {
                best = n;
            }
        }
    }

    if best > 0 {
        return Some(best);
    }
    let anchors = doc.select(&PRODUCT_ANCHORS).count();
    (anchors > 0).then_some(anchors)
}

/// Absolute product URLs without query or fragment, in document order
pub fn discover_product_links(html: &str, page_url: &Url) -> Vec<String> {
    let doc = Html::parse_document(html);
    doc.select(&ANCHORS)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter(|href| href.contains("/product/"))
        .filter_map(|href| page_url.join(href).ok())
        .map(|mut url| {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        })
        .filter(|url| url.contains("ozon.ru"))
        .collect()
}

/// Deduplicated links in discovery order
#[derive(Debug, Default, Clone)]
pub struct LinkSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl LinkSet {
    /// Add links, returning how many were new
    pub fn extend<I: IntoIterator<Item = String>>(&mut self, links: I) -> usize {
        let before = self.order.len();
        for link in links {
            if self.seen.insert(link.clone()) {
                self.order.push(link);
            }
        }
        self.order.len() - before
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.order
    }
}

/// Termination thresholds of the scroll loop
#[derive(Debug, Clone)]
pub struct HarvestLimits {
    pub max_iterations: usize,
    pub stale_limit: usize,
    pub show_more_at: usize,
    pub lazy_images_at: usize,
    pub near_complete_ratio: f64,
    /// Stale counter value forced once the expected total is nearly reached
    pub near_complete_stale: usize,
    pub saturation_links: usize,
    pub saturation_stale: usize,
    pub challenge_check_every: usize,
    pub jiggle_chance: f64,
    pub final_sweeps: usize,
}

impl Default for HarvestLimits {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            stale_limit: 8,
            show_more_at: 2,
            lazy_images_at: 4,
            near_complete_ratio: 0.95,
            near_complete_stale: 7,
            saturation_links: 170,
            saturation_stale: 3,
            challenge_check_every: 15,
            jiggle_chance: 0.3,
            final_sweeps: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    IterationLimit,
    NoNewLinks,
    Saturated,
}

/// What the scroll loop should do after an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestStep {
    Continue,
    ShowMore,
    RevealLazyImages,
    Stop(StopReason),
}

#[derive(Debug, Clone)]
pub struct HarvestProgress {
    limits: HarvestLimits,
    iteration: usize,
    stale: usize,
}

impl HarvestProgress {
    pub fn new(limits: HarvestLimits) -> Self {
        Self {
            limits,
            iteration: 0,
            stale: 0,
        }
    }

    pub fn limits(&self) -> &HarvestLimits {
        &self.limits
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn stale(&self) -> usize {
        self.stale
    }

    /// Start the next iteration, returning its 1-based number
    pub fn begin_iteration(&mut self) -> usize {
        self.iteration += 1;
        self.iteration
    }

    pub fn challenge_check_due(&self) -> bool {
        self.limits.challenge_check_every > 0 && self.iteration % self.limits.challenge_check_every == 0
    }

    /// Fold in the outcome of one collection pass
    pub fn record(&mut self, new_links: usize, total_links: usize, expected: Option<usize>) -> HarvestStep {
        if new_links > 0 {
            self.stale = 0;
            if let Some(expected) = expected.filter(|&n| n > 0) {
                if total_links as f64 >= expected as f64 * self.limits.near_complete_ratio {
                    self.stale = self.limits.near_complete_stale;
                }
            }
        } else {
            self.stale += 1;
        }

        if total_links >= self.limits.saturation_links && self.stale >= self.limits.saturation_stale {
            return HarvestStep::Stop(StopReason::Saturated);
        }
        if self.stale >= self.limits.stale_limit {
            return HarvestStep::Stop(StopReason::NoNewLinks);
        }
        if self.iteration >= self.limits.max_iterations {
            return HarvestStep::Stop(StopReason::IterationLimit);
        }

        if self.stale == self.limits.show_more_at {
            HarvestStep::ShowMore
        } else if self.stale == self.limits.lazy_images_at {
            HarvestStep::RevealLazyImages
        } else {
            HarvestStep::Continue
        }
    }

    /// A failed collection pass counts as an iteration without new links
    pub fn record_failure(&mut self, total_links: usize, expected: Option<usize>) -> HarvestStep {
        self.record(0, total_links, expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seller_url() -> Url {
        Url::parse("https://www.ozon.ru/seller/energy-strong-172995/").unwrap()
    }

    #[test]
    fn total_is_read_from_announcement() {
        let html = r#"<html><body>
            <div>Найдено <b>137</b> товаров</div>
            <a href="/product/a-1/">a</a>
        </body></html>"#;
        assert_eq!(expected_product_count(html), Some(137));
    }

    #[test]
    fn implausible_totals_fall_back_to_anchor_count() {
        let html = r#"<html><body>
            <div class="total">Всего 25000 товаров</div>
            <a href="/product/a-1/">a</a><a href="/product/b-2/">b</a>
        </body></html>"#;
        assert_eq!(expected_product_count(html), Some(2));
        assert_eq!(expected_product_count("<html><body></body></html>"), None);
    }

    #[test]
    fn links_are_absolute_and_stripped() {
        let html = r#"<html><body>
            <a href="/product/kabel-1/?asb=1#reviews">1</a>
            <a href="https://www.ozon.ru/product/lampa-2/">2</a>
            <a href="https://example.com/product/other-3/">3</a>
            <a href="/seller/energy-strong-172995/">seller</a>
        </body></html>"#;
        assert_eq!(
            discover_product_links(html, &seller_url()),
            vec![
                "https://www.ozon.ru/product/kabel-1/".to_string(),
                "https://www.ozon.ru/product/lampa-2/".to_string(),
            ]
        );
    }

    #[test]
    fn link_set_keeps_first_seen_order() {
        let mut links = LinkSet::default();
        assert_eq!(links.extend(["b".to_string(), "a".to_string()]), 2);
        assert_eq!(links.extend(["a".to_string(), "c".to_string(), "b".to_string()]), 1);
        assert_eq!(links.into_vec(), vec!["b", "a", "c"]);
    }

    #[test]
    fn stale_iterations_trigger_actions_then_stop() {
        let mut progress = HarvestProgress::new(HarvestLimits::default());
        let mut steps = Vec::new();
        loop {
            progress.begin_iteration();
            let step = progress.record(0, 10, None);
            steps.push(step);
            if matches!(step, HarvestStep::Stop(_)) {
                break;
            }
        }
        assert_eq!(
            steps,
            vec![
                HarvestStep::Continue,
                HarvestStep::ShowMore,
                HarvestStep::Continue,
                HarvestStep::RevealLazyImages,
                HarvestStep::Continue,
                HarvestStep::Continue,
                HarvestStep::Continue,
                HarvestStep::Stop(StopReason::NoNewLinks),
            ]
        );
    }

    #[test]
    fn new_links_reset_the_stale_counter() {
        let mut progress = HarvestProgress::new(HarvestLimits::default());
        progress.begin_iteration();
        progress.record(0, 0, None);
        assert_eq!(progress.stale(), 1);
        progress.begin_iteration();
        assert_eq!(progress.record(5, 5, None), HarvestStep::Continue);
        assert_eq!(progress.stale(), 0);
    }

    #[test]
    fn near_complete_total_ends_on_next_empty_pass() {
        let mut progress = HarvestProgress::new(HarvestLimits::default());
        progress.begin_iteration();
        assert_eq!(progress.record(96, 96, Some(100)), HarvestStep::Continue);
        assert_eq!(progress.stale(), 7);
        progress.begin_iteration();
        assert_eq!(
            progress.record(0, 96, Some(100)),
            HarvestStep::Stop(StopReason::NoNewLinks)
        );
    }

    #[test]
    fn large_catalogues_stop_early_when_saturated() {
        let mut progress = HarvestProgress::new(HarvestLimits::default());
        for _ in 0..2 {
            progress.begin_iteration();
            assert_ne!(progress.record(0, 180, None), HarvestStep::Stop(StopReason::Saturated));
        }
        progress.begin_iteration();
        assert_eq!(
            progress.record(0, 180, None),
            HarvestStep::Stop(StopReason::Saturated)
        );
    }

    #[test]
    fn iteration_limit_and_challenge_cadence() {
        let limits = HarvestLimits {
            max_iterations: 15,
            ..HarvestLimits::default()
        };
        let mut progress = HarvestProgress::new(limits);
        let mut due = Vec::new();
        let mut last = HarvestStep::Continue;
        for _ in 0..15 {
            let n = progress.begin_iteration();
            if progress.challenge_check_due() {
                due.push(n);
            }
            last = progress.record(1, n, None);
        }
        assert_eq!(due, vec![15]);
        assert_eq!(last, HarvestStep::Stop(StopReason::IterationLimit));
    }
}

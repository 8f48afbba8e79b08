use std::collections::HashSet;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, warn};
use url::Url;

use super::browser::PageDriver;
use super::challenge::{ChallengeGuard, Operator};
use super::harvest::{
    HarvestLimits, HarvestProgress, HarvestStep, LinkSet, SHOW_MORE_XPATHS, discover_product_links,
    expected_product_count,
};
use super::pacing::Pacer;
use super::product::extract_product;
use super::sellers::seller_name;
use crate::error::ToolkitError;
use crate::models::ScrapedProduct;

const NAVIGATION_ATTEMPTS: usize = 3;
const BODY_TIMEOUT: Duration = Duration::from_secs(10);
const PROGRESS_EVERY: usize = 10;

const COOKIE_XPATHS: [&str; 2] = [
    "//button[contains(., 'Принять')]",
    "//button[contains(., 'Согласен')]",
];

/// One browser crawl over a list of sellers. Scraped rows accumulate in the
/// session, so they survive a failure part-way through.
pub struct CrawlSession<D, O> {
    driver: D,
    guard: ChallengeGuard<O>,
    pacer: Pacer,
    limits: HarvestLimits,
    visited: HashSet<String>,
    products: Vec<ScrapedProduct>,
    cookies_handled: bool,
}

impl<D: PageDriver, O: Operator> CrawlSession<D, O> {
    pub fn new(driver: D, guard: ChallengeGuard<O>, pacer: Pacer) -> Self {
        Self {
            driver,
            guard,
            pacer,
            limits: HarvestLimits::default(),
            visited: HashSet::new(),
            products: Vec::new(),
            cookies_handled: false,
        }
    }

    pub fn with_limits(mut self, limits: HarvestLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn products(&self) -> &[ScrapedProduct] {
        &self.products
    }

    pub fn into_products(self) -> Vec<ScrapedProduct> {
        self.products
    }

    /// Crawl every seller in order. A seller page that will not load is
    /// skipped; an operator abort stops the whole run.
    pub async fn run(&mut self, seller_urls: &[String]) -> Result<()> {
        for (idx, seller_url) in seller_urls.iter().enumerate() {
            info!("Seller {}/{}: {}", idx + 1, seller_urls.len(), seller_url);
            match self.crawl_seller(seller_url).await {
                Ok(count) => info!("Seller {} done, {} products processed", seller_name(seller_url), count),
                Err(e) if ToolkitError::is_operator_abort(&e) => return Err(e),
                Err(e) => warn!("Skipping seller {}: {:#}", seller_name(seller_url), e),
            }
        }
        info!("All sellers processed");
        Ok(())
    }

    pub async fn crawl_seller(&mut self, seller_url: &str) -> Result<usize> {
        self.safe_get(seller_url).await?;

        if !self.cookies_handled {
            self.accept_cookies().await;
            self.cookies_handled = true;
        }

        let links = self.harvest_seller(seller_url).await?;
        if links.is_empty() {
            warn!("No products found for seller {}", seller_name(seller_url));
            return Ok(0);
        }

        info!("Parsing {} product pages", links.len());
        let started = Instant::now();
        for (idx, link) in links.iter().enumerate() {
            self.parse_product_page(link, seller_url).await?;

            let done = idx + 1;
            if done % PROGRESS_EVERY == 0 {
                let minutes = started.elapsed().as_secs_f64() / 60.0;
                let rate = if minutes > 0.0 { done as f64 / minutes } else { 0.0 };
                info!(
                    "Progress: {}/{} ({:.1}%), {:.1} items/min",
                    done,
                    links.len(),
                    done as f64 * 100.0 / links.len() as f64,
                    rate
                );
            }
        }
        Ok(links.len())
    }

    /// Navigate with retries, blocking on any challenge until it is solved
    pub async fn safe_get(&self, url: &str) -> Result<()> {
        for attempt in 1..=NAVIGATION_ATTEMPTS {
            debug!("Loading {} (attempt {}/{})", url, attempt, NAVIGATION_ATTEMPTS);
            match self.try_load(url).await {
                Ok(()) => return Ok(()),
                Err(e) if ToolkitError::is_operator_abort(&e) => return Err(e),
                Err(e) => {
                    warn!("Attempt {}/{} to load {} failed: {:#}", attempt, NAVIGATION_ATTEMPTS, url, e);
                    self.pacer.pause(3.0, 5.0).await;
                }
            }
        }
        Err(ToolkitError::NavigationFailed {
            url: url.to_string(),
            attempts: NAVIGATION_ATTEMPTS,
        }
        .into())
    }

    async fn try_load(&self, url: &str) -> Result<()> {
        self.driver.navigate(url).await?;
        self.pacer.pause(2.0, 4.0).await;
        self.guard.ensure_clear(&self.driver, true).await?;
        self.driver.wait_for_body(BODY_TIMEOUT).await
    }

    /// Best effort: a missing consent banner is not an error
    pub async fn accept_cookies(&mut self) {
        match self.driver.click_first_visible(&COOKIE_XPATHS).await {
            Ok(Some(_)) => {
                info!("Cookie consent accepted");
                self.pacer.pause(1.0, 2.0).await;
            }
            Ok(None) => debug!("No cookie consent button"),
            Err(e) => debug!("Cookie consent click failed: {}", e),
        }
    }

    /// Scroll the current seller page until no more product links appear
    pub async fn harvest_seller(&self, seller_url: &str) -> Result<Vec<String>> {
        self.guard.ensure_clear(&self.driver, true).await?;

        let first = self.driver.snapshot().await?;
        let page_url = Url::parse(&first.url).or_else(|_| Url::parse(seller_url))?;
        let expected = expected_product_count(&first.html);
        if let Some(n) = expected {
            info!("Expecting about {} products", n);
        }

        let mut links = LinkSet::default();
        let mut progress = HarvestProgress::new(self.limits.clone());

        loop {
            let iteration = progress.begin_iteration();
            if let Err(e) = self.driver.scroll_to_bottom().await {
                debug!("Scroll failed: {}", e);
            }
            self.pacer.pause(1.0, 2.0).await;

            if progress.challenge_check_due() {
                self.guard.ensure_clear_by_title(&self.driver).await?;
            }

            if self.pacer.chance(self.limits.jiggle_chance) {
                self.jiggle().await;
            }

            let step = match self.collect_links(&page_url, &mut links).await {
                Ok(new) => {
                    debug!("Iteration {}: {} unique links (+{})", iteration, links.len(), new);
                    progress.record(new, links.len(), expected)
                }
                Err(e) => {
                    warn!("Iteration {}: failed to collect links: {}", iteration, e);
                    progress.record_failure(links.len(), expected)
                }
            };

            match step {
                HarvestStep::Continue => {}
                HarvestStep::ShowMore => self.click_show_more().await,
                HarvestStep::RevealLazyImages => match self.driver.reveal_lazy_images().await {
                    Ok(n) => debug!("Revealed {} lazy images", n),
                    Err(e) => debug!("Lazy image reveal failed: {}", e),
                },
                HarvestStep::Stop(reason) => {
                    info!(
                        "Stopping scroll after {} iterations ({:?}), {} links",
                        iteration,
                        reason,
                        links.len()
                    );
                    break;
                }
            }
            self.pacer.pause(1.5, 3.0).await;
        }

        for _ in 0..self.limits.final_sweeps {
            if let Err(e) = self.driver.scroll_to_bottom().await {
                debug!("Scroll failed: {}", e);
            }
            self.pacer.pause(1.0, 2.0).await;
        }
        if let Err(e) = self.collect_links(&page_url, &mut links).await {
            warn!("Final link sweep failed: {}", e);
        }

        match expected {
            Some(n) => info!(
                "Collected {} unique products ({:.1}% of {})",
                links.len(),
                links.len() as f64 * 100.0 / n as f64,
                n
            ),
            None => info!("Collected {} unique products", links.len()),
        }
        Ok(links.into_vec())
    }

    /// Load one product page and record its fields. Pages seen before are
    /// skipped; a page that fails to load leaves an empty row.
    pub async fn parse_product_page(&mut self, product_url: &str, seller_url: &str) -> Result<()> {
        if self.visited.contains(product_url) {
            debug!("Already visited {}", product_url);
            return Ok(());
        }

        match self.read_product(product_url, seller_url).await {
            Ok(product) => {
                info!(
                    "{} sku:{} name:{} price:{}",
                    product_url,
                    mark(&product.sku),
                    mark(&product.name),
                    mark(&product.price)
                );
                self.products.push(product);
                self.pacer.pause(1.0, 2.0).await;
                Ok(())
            }
            Err(e) if ToolkitError::is_operator_abort(&e) => Err(e),
            Err(e) => {
                warn!("Could not scrape {}: {:#}", product_url, e);
                self.products.push(ScrapedProduct::empty(seller_url));
                Ok(())
            }
        }
    }

    async fn read_product(&mut self, product_url: &str, seller_url: &str) -> Result<ScrapedProduct> {
        self.safe_get(product_url).await?;
        self.visited.insert(product_url.to_string());
        self.guard.ensure_clear(&self.driver, true).await?;

        let fields = extract_product(&self.driver.snapshot().await?.html);
        Ok(ScrapedProduct {
            sku: fields.sku,
            name: fields.name,
            price: fields.price,
            seller_url: seller_url.to_string(),
        })
    }

    async fn collect_links(&self, page_url: &Url, links: &mut LinkSet) -> Result<usize> {
        let snapshot = self.driver.snapshot().await?;
        Ok(links.extend(discover_product_links(&snapshot.html, page_url)))
    }

    async fn click_show_more(&self) {
        match self.driver.click_first_visible(&SHOW_MORE_XPATHS).await {
            Ok(Some(xpath)) => {
                info!("Clicked show-more button ({})", xpath);
                self.pacer.pause(2.0, 3.0).await;
            }
            Ok(None) => debug!("No show-more button"),
            Err(e) => debug!("Show-more click failed: {}", e),
        }
    }

    async fn jiggle(&self) {
        let up = self.pacer.pixels(300, 800);
        let down = self.pacer.pixels(400, 900);
        if self.driver.scroll_by(-up).await.is_ok() {
            self.pacer.pause(0.5, 1.5).await;
            let _ = self.driver.scroll_by(down).await;
            self.pacer.pause(0.5, 1.5).await;
        }
    }
}

fn mark(field: &str) -> &'static str {
    if field.is_empty() { "-" } else { "+" }
}

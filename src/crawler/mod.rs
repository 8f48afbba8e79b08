//! Challenge-aware browser crawl of competitor seller pages

pub mod browser;
pub mod challenge;
pub mod dom;
pub mod export;
pub mod harvest;
pub mod pacing;
pub mod product;
pub mod sellers;
pub mod session;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::error;

pub use browser::{ChromeDriver, PageDriver, PageSnapshot};
pub use challenge::{Challenge, ChallengeGuard, ConsoleOperator, Operator, OperatorReply, detect_challenge};
pub use export::save_products;
pub use harvest::{HarvestLimits, discover_product_links, expected_product_count};
pub use pacing::Pacer;
pub use product::{ProductFields, extract_product};
pub use sellers::{SellerList, load_or_create_seller_list, seller_name};
pub use session::CrawlSession;

/// Run the crawl and write whatever was scraped, even when the crawl fails.
/// The crawl error, if any, is returned after the rows are saved.
pub async fn crawl_and_export<D: PageDriver, O: Operator>(
    mut session: CrawlSession<D, O>,
    seller_urls: &[String],
    output_dir: &Path,
) -> Result<Option<PathBuf>> {
    let outcome = session.run(seller_urls).await;
    let products = session.into_products();

    let saved = save_products(output_dir, &products);
    if let (Err(crawl_err), Err(_)) = (&outcome, &saved) {
        error!("Crawl failed before results could be saved: {:#}", crawl_err);
    }
    let saved = saved.context("Failed to save scraped products")?;
    outcome?;
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::challenge::tests::{BlockedPage, FakeOperator};
    use crate::error::ToolkitError;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicBool;

    #[tokio::test]
    async fn abort_is_reported_after_saving() {
        let blocked = Arc::new(AtomicBool::new(true));
        let driver = BlockedPage {
            blocked: Arc::clone(&blocked),
            screenshots: Mutex::new(Vec::new()),
        };
        let dir = std::env::temp_dir().join(format!("ozon-crawl-{}", std::process::id()));
        let guard = ChallengeGuard::new(FakeOperator::aborting(blocked), &dir, Pacer::instant());
        let session = CrawlSession::new(driver, guard, Pacer::instant());

        let err = crawl_and_export(
            session,
            &["https://www.ozon.ru/seller/x-1/".to_string()],
            &dir,
        )
        .await
        .unwrap_err();

        assert!(ToolkitError::is_operator_abort(&err));
        assert!(crate::workbook::latest_file(&dir, "xlsx").is_none());
    }
}

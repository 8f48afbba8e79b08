use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::crawler::{
    ChallengeGuard, ChromeDriver, ConsoleOperator, CrawlSession, Operator, Pacer, SellerList,
    crawl_and_export, load_or_create_seller_list,
};
use crate::error::ToolkitError;
use crate::seller_api::{
    HttpSellerApi, fetch_all_product_ids, fetch_dimensions, load_credentials, write_dimensions_report,
};
use crate::unit_merge::{MergeSummary, run_unit_update as merge_unit_workbook};

/// Initialize tracing and logging for the application
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ozon_toolkit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Pull dimensions for every account in `apis.txt` into the dimensions report
pub async fn run_dimensions(config: &Config) -> Result<PathBuf> {
    let output = config.dimensions_output();
    if output.exists() {
        warn!(
            "Dimensions report already exists at {}; delete or rename it to build a new one",
            output.display()
        );
        return Err(ToolkitError::OutputExists(output).into());
    }

    let apis_file = config.apis_file();
    if !apis_file.exists() {
        error!(
            "{} not found in {}; expected one `client_id;api_key` per line",
            apis_file.display(),
            config.base_dir().display()
        );
        return Err(anyhow!("missing {}", apis_file.display()));
    }
    let accounts = load_credentials(&apis_file)?;
    if accounts.is_empty() {
        return Err(anyhow!("{} has no accounts", apis_file.display()));
    }

    let mut rows = Vec::new();
    for (idx, credentials) in accounts.into_iter().enumerate() {
        let client_id = credentials.client_id.clone();
        info!("Account #{} (client {})", idx + 1, client_id);
        let api = HttpSellerApi::new(&config.api_base_url, credentials)?;
        let ids = fetch_all_product_ids(&api)
            .await
            .with_context(|| format!("Failed to list products for client {}", client_id))?;
        info!("Client {}: {} products", client_id, ids.len());
        let dimensions = fetch_dimensions(&api, &ids)
            .await
            .with_context(|| format!("Failed to fetch attributes for client {}", client_id))?;
        rows.extend(dimensions);
    }

    write_dimensions_report(&output, &rows)?;
    println!("Dimensions report saved: {} ({} products)", output.display(), rows.len());
    Ok(output)
}

/// Crawl the sellers listed in `sellers_list.txt` with a visible browser.
/// Returns the written prices file, if any rows were scraped.
pub async fn run_scraper(config: &Config, assume_yes: bool) -> Result<Option<PathBuf>> {
    run_scraper_with(config, assume_yes, ConsoleOperator).await
}

async fn run_scraper_with<O: Operator>(config: &Config, assume_yes: bool, operator: O) -> Result<Option<PathBuf>> {
    let sellers_file = config.sellers_file();
    let seller_urls = match load_or_create_seller_list(&sellers_file)? {
        SellerList::Loaded(urls) => urls,
        SellerList::ExampleCreated => {
            println!(
                "Created {}. Add seller URLs to it and run the scraper again.",
                sellers_file.display()
            );
            return Ok(None);
        }
    };

    println!("Sellers to process: {}", seller_urls.len());
    for url in &seller_urls {
        println!("  - {}", url);
    }
    println!("\nWhen a captcha appears the crawl stops until you solve it in the browser");
    println!("and press Enter in this console.");

    if !assume_yes && !operator.confirm("\nStart scraping?").await {
        println!("Scraping cancelled.");
        return Ok(None);
    }

    let output_dir = config.prices_dir();
    let pacer = Pacer::new(config.pace);
    let driver = ChromeDriver::launch(config)?;
    let guard = ChallengeGuard::new(operator, &output_dir, pacer.clone());
    let session = CrawlSession::new(driver, guard, pacer);

    let saved = crawl_and_export(session, &seller_urls, &output_dir).await?;
    match &saved {
        Some(path) => println!("Results saved: {}", path.display()),
        None => println!("No products were scraped."),
    }
    Ok(saved)
}

/// Merge the latest reports into an updated copy of the unit workbook
pub async fn run_unit_update(config: &Config) -> Result<MergeSummary> {
    let config = config.clone();
    let summary = tokio::task::spawn_blocking(move || merge_unit_workbook(&config))
        .await
        .context("Unit update task panicked")??;
    println!("{}", summary);
    Ok(summary)
}

/// Dimensions, then scraping, then the unit update. An existing dimensions
/// report is reused; any other failure stops the chain.
pub async fn run_pipeline(config: &Config, assume_yes: bool) -> Result<()> {
    println!("Step 1/3: product dimensions (seller API)");
    match run_dimensions(config).await {
        Ok(_) => {}
        Err(e) if matches!(e.downcast_ref::<ToolkitError>(), Some(ToolkitError::OutputExists(_))) => {
            warn!("Keeping the existing dimensions report: {}", e);
        }
        Err(e) => return Err(e.context("Step 1/3 failed")),
    }

    println!("\nStep 2/3: competitor prices (browser)");
    run_scraper(config, assume_yes).await.context("Step 2/3 failed")?;

    println!("\nStep 3/3: unit workbook update");
    run_unit_update(config).await.context("Step 3/3 failed")?;

    println!("\nAll steps completed.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::challenge::tests::FakeOperator;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn config(tag: &str) -> Config {
        let dir = std::env::temp_dir().join(format!("ozon-app-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        Config::from_env().with_base_dir(dir)
    }

    #[tokio::test]
    async fn dimensions_refuse_to_overwrite_report() {
        let config = config("exists");
        fs::create_dir_all(config.dimensions_dir()).unwrap();
        fs::write(config.dimensions_output(), b"old").unwrap();

        let err = run_dimensions(&config).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ToolkitError>(),
            Some(ToolkitError::OutputExists(_))
        ));
        assert_eq!(fs::read(config.dimensions_output()).unwrap(), b"old");
    }

    #[tokio::test]
    async fn dimensions_without_apis_file_fail() {
        let config = config("noapis");
        let err = run_dimensions(&config).await.unwrap_err();
        assert!(err.to_string().contains("apis.txt"));
    }

    #[tokio::test]
    async fn scraper_writes_example_sellers_file_and_stops() {
        let config = config("sellers");
        let operator = FakeOperator::solving(Arc::new(AtomicBool::new(false)), 1);

        let saved = run_scraper_with(&config, true, operator).await.unwrap();

        assert_eq!(saved, None);
        let content = fs::read_to_string(config.sellers_file()).unwrap();
        assert!(content.contains("https://www.ozon.ru/seller/energy-strong-172995/"));
    }

    #[tokio::test]
    async fn declined_confirmation_cancels_before_browser_launch() {
        let config = config("declined");
        fs::write(config.sellers_file(), "https://www.ozon.ru/seller/x-1/\n").unwrap();
        let operator = FakeOperator::aborting(Arc::new(AtomicBool::new(false)));

        let saved = run_scraper_with(&config, false, operator).await.unwrap();
        assert_eq!(saved, None);
    }
}

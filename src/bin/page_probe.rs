// page_probe.rs – run the crawler's page heuristics against one page
// -----------------------------------------------------------------------------
// Offline mode reads a saved HTML file (e.g. "Save page as" from the browser)
// and prints what the crawl would see: challenge verdict, expected product
// count, product links and product-page fields. Live mode opens the page in
// Chrome first and can store the rendered HTML for later offline runs.
// -----------------------------------------------------------------------------

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use ozon_toolkit::config::Config;
use ozon_toolkit::crawler::{
    ChromeDriver, PageDriver, PageSnapshot, detect_challenge, discover_product_links, expected_product_count,
    extract_product,
};
use url::Url;

const DEFAULT_PAGE_URL: &str = "https://www.ozon.ru/";

fn report(snapshot: &PageSnapshot) -> Result<()> {
    let start = Instant::now();

    println!("Title: {}", snapshot.title);
    println!("URL:   {}", snapshot.url);
    match detect_challenge(snapshot) {
        Some(challenge) => println!("Challenge: {}", challenge),
        None => println!("Challenge: none"),
    }

    match expected_product_count(&snapshot.html) {
        Some(n) => println!("Expected products: {}", n),
        None => println!("Expected products: unknown"),
    }

    let page_url = Url::parse(&snapshot.url).context("Invalid page URL")?;
    let links = discover_product_links(&snapshot.html, &page_url);
    println!("Product links: {}", links.len());
    for link in links.iter().take(20) {
        println!("  {}", link);
    }
    if links.len() > 20 {
        println!("  ... {} more", links.len() - 20);
    }

    let fields = extract_product(&snapshot.html);
    println!("SKU:   {}", fields.sku);
    println!("Name:  {}", fields.name);
    println!("Price: {}", fields.price);

    println!("Analysed in {:.3}s", start.elapsed().as_secs_f64());
    Ok(())
}

async fn probe_live(url: &str, save_to: Option<&str>) -> Result<()> {
    let config = Config::from_env();
    let driver = ChromeDriver::launch(&config).context("Failed to start Chrome")?;
    driver.navigate(url).await?;
    driver.wait_for_body(Duration::from_secs(10)).await?;
    let snapshot = driver.snapshot().await?;

    if let Some(path) = save_to {
        std::fs::write(path, &snapshot.html).with_context(|| format!("Failed to write {}", path))?;
        println!("Rendered HTML saved to {}", path);
    }
    report(&snapshot)
}

fn probe_file(path: &str, page_url: &str) -> Result<()> {
    let html = std::fs::read_to_string(Path::new(path)).with_context(|| format!("Failed to read {}", path))?;
    let title = scraper::Html::parse_document(&html)
        .select(&scraper::Selector::parse("title").map_err(|e| anyhow::anyhow!("{e}"))?)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    report(&PageSnapshot {
        title,
        url: page_url.to_string(),
        html,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        println!("Usage:");
        println!("  {} <file.html> [page-url]        - Analyse a saved page", args[0]);
        println!("  {} live <URL> [save-to.html]     - Open the page in Chrome and analyse it", args[0]);
        println!("\nExamples:");
        println!("  {} seller.html https://www.ozon.ru/seller/energy-strong-172995/", args[0]);
        println!("  {} live https://www.ozon.ru/product/some-product-123/ product.html", args[0]);
        return Ok(());
    }

    match args[1].as_str() {
        "live" => {
            let url = args.get(2).context("live mode needs a URL")?;
            probe_live(url, args.get(3).map(String::as_str)).await
        }
        path => probe_file(path, args.get(2).map(String::as_str).unwrap_or(DEFAULT_PAGE_URL)),
    }
}

use std::fs;
use std::path::Path;

use tracing::{info, warn};
use url::Url;

use crate::error::{ToolkitError, ToolkitResult};

pub const SAMPLE_SELLER_URL: &str = "https://www.ozon.ru/seller/energy-strong-172995/";

const EXAMPLE_FILE: &str = "# Ozon sellers to scrape, one URL per line
# Blank lines and lines starting with # are ignored

# Example seller:
https://www.ozon.ru/seller/energy-strong-172995/

# More sellers can be added below:
# https://www.ozon.ru/seller/example-seller-123456/
# https://www.ozon.ru/seller/another-seller-789012/
";

/// Result of looking for the sellers file
#[derive(Debug)]
pub enum SellerList {
    Loaded(Vec<String>),
    /// The file did not exist; an example was written in its place
    ExampleCreated,
}

pub fn load_or_create_seller_list(path: &Path) -> ToolkitResult<SellerList> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, EXAMPLE_FILE)?;
        info!("Created example sellers file at {}", path.display());
        return Ok(SellerList::ExampleCreated);
    }

    let content = fs::read_to_string(path)?;
    let urls = parse_seller_urls(&content);
    if urls.is_empty() {
        return Err(ToolkitError::NoSellerUrls(path.to_path_buf()));
    }
    info!("Loaded {} seller URLs from {}", urls.len(), path.display());
    Ok(SellerList::Loaded(urls))
}

/// Valid seller URLs in file order; malformed lines are logged and dropped
pub fn parse_seller_urls(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            if is_seller_url(line) {
                Some(line.to_string())
            } else {
                warn!("Skipping invalid seller URL: {}", line);
                None
            }
        })
        .collect()
}

pub fn is_seller_url(candidate: &str) -> bool {
    candidate.starts_with("http") && candidate.contains("ozon.ru/seller/")
}

/// Last non-empty path segment: `energy-strong-172995`
pub fn seller_name(seller_url: &str) -> String {
    let from_path = |path: &str| {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .last()
            .map(str::to_string)
    };
    Url::parse(seller_url)
        .ok()
        .and_then(|url| from_path(url.path()))
        .or_else(|| from_path(seller_url))
        .unwrap_or_else(|| seller_url.to_string())
}

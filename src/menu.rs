use std::future::Future;

use anyhow::Result;
use tracing::{error, info};

use crate::app::{run_dimensions, run_pipeline, run_scraper, run_unit_update};
use crate::config::Config;
use crate::console::{clear_screen, is_input_closed, pause, read_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Scraper,
    Dimensions,
    UnitUpdate,
    Pipeline,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::Scraper),
            "2" => Some(MenuChoice::Dimensions),
            "3" => Some(MenuChoice::UnitUpdate),
            "4" => Some(MenuChoice::Pipeline),
            "0" => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

fn print_menu() {
    println!("{}", "=".repeat(60));
    println!("OZON TOOLKIT");
    println!("{}", "=".repeat(60));
    println!("1. Scrape competitor sellers (browser)");
    println!("2. Fetch product dimensions (seller API)");
    println!("3. Update unit workbook (Excel)");
    println!("4. Full pipeline (API -> scraping -> unit)");
    println!("0. Exit");
    println!("{}", "=".repeat(60));
}

/// Interactive launcher. Errors are reported and the menu is shown again;
/// a closed stdin ends it.
pub async fn run_menu(config: &Config) -> Result<()> {
    run_menu_with(config, || read_line("Choose an option: ")).await
}

async fn run_menu_with<F, Fut>(config: &Config, mut next_input: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    loop {
        clear_screen();
        print_menu();
        let input = match next_input().await {
            Ok(input) => input,
            Err(e) if is_input_closed(&e) => {
                info!("Input closed, leaving the menu");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let Some(choice) = MenuChoice::parse(&input) else {
            println!("\nUnknown option: {}", input);
            pause().await;
            continue;
        };

        clear_screen();
        let outcome = match choice {
            MenuChoice::Exit => {
                println!("Bye.");
                return Ok(());
            }
            MenuChoice::Scraper => run_scraper(config, false).await.map(|_| ()),
            MenuChoice::Dimensions => run_dimensions(config).await.map(|_| ()),
            MenuChoice::UnitUpdate => run_unit_update(config).await.map(|_| ()),
            MenuChoice::Pipeline => run_pipeline(config, false).await,
        };

        if let Err(e) = outcome {
            error!("{:?} failed: {:#}", choice, e);
            println!("\nFailed: {:#}", e);
        }
        pause().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_keys_map_to_actions() {
        assert_eq!(MenuChoice::parse("1"), Some(MenuChoice::Scraper));
        assert_eq!(MenuChoice::parse(" 4 "), Some(MenuChoice::Pipeline));
        assert_eq!(MenuChoice::parse("0"), Some(MenuChoice::Exit));
        assert_eq!(MenuChoice::parse("5"), None);
        assert_eq!(MenuChoice::parse(""), None);
    }

    #[tokio::test]
    async fn closed_input_leaves_the_menu() {
        let config = Config::from_env();
        let mut calls = 0;
        let outcome = run_menu_with(&config, || {
            calls += 1;
            let closed = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stdin is closed");
            async move { Err::<String, _>(anyhow::Error::new(closed)) }
        })
        .await;

        assert!(outcome.is_ok());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn exit_choice_returns() {
        let config = Config::from_env();
        let outcome = run_menu_with(&config, || async { Ok::<_, anyhow::Error>("0".to_string()) }).await;
        assert!(outcome.is_ok());
    }
}

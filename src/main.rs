use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ozon_toolkit::config::Config;
use ozon_toolkit::menu::run_menu;
use ozon_toolkit::{init_tracing, run_dimensions, run_pipeline, run_scraper, run_unit_update};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ozon-toolkit", version, about = "Ozon seller toolkit: dimensions, competitor prices, unit workbook")]
struct Cli {
    /// Folder holding apis.txt, sellers_list.txt and the report folders
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long, global = true)]
    headless: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch product dimensions from the seller API
    Dimensions,
    /// Scrape competitor seller pages
    Scrape {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Update the unit workbook from the latest reports
    Merge,
    /// Dimensions, scraping and merge in sequence
    Pipeline {
        #[arg(long)]
        yes: bool,
    },
    /// Interactive menu (default)
    Menu,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(base_dir) = cli.base_dir {
        config = config.with_base_dir(base_dir);
    }
    if cli.headless {
        config.headless = true;
    }
    info!("Configuration loaded: {:?}", config);

    let outcome = match cli.command.unwrap_or(Command::Menu) {
        Command::Dimensions => run_dimensions(&config).await.map(|_| ()),
        Command::Scrape { yes } => run_scraper(&config, yes).await.map(|_| ()),
        Command::Merge => run_unit_update(&config).await.map(|_| ()),
        Command::Pipeline { yes } => run_pipeline(&config, yes).await,
        Command::Menu => run_menu(&config).await,
    };

    if let Err(e) = outcome {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

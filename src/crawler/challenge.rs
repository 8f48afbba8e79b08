//! Anti-bot challenge detection and operator hand-off

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{info, warn};

use super::browser::{PageDriver, PageSnapshot};
use super::dom::{is_rendered, own_text, visible_text};
use super::pacing::Pacer;
use crate::console;
use crate::error::ToolkitError;

const TITLE_MARKERS: [&str; 2] = ["antibot captcha", "капча"];
const INDICATOR_IDS: [&str; 3] = ["captcha-container", "captcha", "slider-background"];
const HIDDEN_FIELDS: [&str; 5] = [
    "captcha-input",
    "incident",
    "complaints-token",
    "captcha-ip",
    "captcha-date",
];
const SOURCE_MARKERS: [&str; 4] = ["captcha", "slider", "puzzle", "antibot"];

const NOT_A_BOT: &str = "Подтвердите, что вы не бот";
const MOVE_SLIDER: &str = "Передвиньте ползунок, чтобы пазл попал в контур";
const NOT_A_ROBOT: &str = "Подтвердите, что вы не робот";

static ANY_ELEMENT: Lazy<Selector> = Lazy::new(|| Selector::parse("body *").unwrap());
static TITLE_CLASS: Lazy<Selector> = Lazy::new(|| Selector::parse("[class*='title']").unwrap());
static IFRAME: Lazy<Selector> = Lazy::new(|| Selector::parse("iframe[src]").unwrap());

/// Which heuristic flagged the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    Title(String),
    Indicator(&'static str),
    Recaptcha,
    HiddenField(&'static str),
    PageSource,
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Challenge::Title(title) => write!(f, "title \"{}\"", title),
            Challenge::Indicator(what) => write!(f, "page element {}", what),
            Challenge::Recaptcha => write!(f, "reCAPTCHA frame"),
            Challenge::HiddenField(id) => write!(f, "hidden field #{}", id),
            Challenge::PageSource => write!(f, "captcha markers in page source"),
        }
    }
}

/// Run every heuristic in order; the first hit wins
pub fn detect_challenge(page: &PageSnapshot) -> Option<Challenge> {
    if let Some(hit) = detect_by_title(page) {
        return Some(hit);
    }

    let doc = Html::parse_document(&page.html);
    detect_indicator(&doc)
        .or_else(|| detect_recaptcha(&doc))
        .or_else(|| detect_hidden_field(&doc))
        .or_else(|| detect_in_source(&page.html))
}

pub fn detect_by_title(page: &PageSnapshot) -> Option<Challenge> {
    let title = page.title.to_lowercase();
    TITLE_MARKERS
        .iter()
        .any(|marker| title.contains(marker))
        .then(|| Challenge::Title(page.title.clone()))
}

fn detect_indicator(doc: &Html) -> Option<Challenge> {
    for id in INDICATOR_IDS {
        let Ok(selector) = Selector::parse(&format!("#{}", id)) else {
            continue;
        };
        if doc.select(&selector).any(is_rendered) {
            return Some(Challenge::Indicator(id));
        }
    }

    for element in doc.select(&ANY_ELEMENT) {
        let text = own_text(element);
        let hit = if text == NOT_A_BOT {
            Some("bot confirmation text")
        } else if text.contains(MOVE_SLIDER) {
            Some("slider puzzle text")
        } else {
            None
        };
        if let Some(what) = hit {
            if mentions_bot(&element.html()) && is_rendered(element) {
                return Some(Challenge::Indicator(what));
            }
        }
    }

    doc.select(&TITLE_CLASS)
        .find(|element| {
            visible_text(*element).contains(NOT_A_ROBOT)
                && mentions_bot(&element.html())
                && is_rendered(*element)
        })
        .map(|_| Challenge::Indicator("robot confirmation title"))
}

fn detect_recaptcha(doc: &Html) -> Option<Challenge> {
    doc.select(&IFRAME)
        .filter_map(|frame| frame.value().attr("src"))
        .any(|src| src.contains("google.com/recaptcha"))
        .then_some(Challenge::Recaptcha)
}

fn detect_hidden_field(doc: &Html) -> Option<Challenge> {
    HIDDEN_FIELDS.into_iter().find_map(|id| {
        let selector = Selector::parse(&format!("#{}", id)).ok()?;
        doc.select(&selector).next().map(|_| Challenge::HiddenField(id))
    })
}

fn detect_in_source(html: &str) -> Option<Challenge> {
    let source = html.to_lowercase();
    SOURCE_MARKERS
        .iter()
        .all(|marker| source.contains(marker))
        .then_some(Challenge::PageSource)
}

fn mentions_bot(outer_html: &str) -> bool {
    let lower = outer_html.to_lowercase();
    lower.contains("captcha") || lower.contains("bot")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorReply {
    Solved,
    Abort,
}

/// The human in the loop
#[async_trait]
pub trait Operator: Send + Sync {
    /// Block until the operator says the challenge is solved or gives up
    async fn request_solution(&self, challenge: &Challenge, screenshot: Option<&Path>) -> OperatorReply;

    async fn confirm(&self, question: &str) -> bool;
}

/// Prompts on the terminal that launched the toolkit
pub struct ConsoleOperator;

#[async_trait]
impl Operator for ConsoleOperator {
    async fn request_solution(&self, challenge: &Challenge, screenshot: Option<&Path>) -> OperatorReply {
        println!("\n{}", "=".repeat(70));
        println!("Anti-bot challenge detected: {}", challenge);
        if let Some(path) = screenshot {
            println!("Screenshot saved to {}", path.display());
        }
        println!("Solve it in the browser window, then press Enter here.");
        println!("Type q and press Enter to stop the crawl.");
        println!("{}", "=".repeat(70));

        reply_for(console::read_line("> ").await)
    }

    async fn confirm(&self, question: &str) -> bool {
        match console::read_line(&format!("{} (y/n): ", question)).await {
            Ok(answer) => console::is_affirmative(&answer),
            Err(_) => false,
        }
    }
}

/// `q` aborts, any other line means solved; unreadable or closed input aborts
fn reply_for(answer: Result<String>) -> OperatorReply {
    match answer {
        Ok(answer) if answer.eq_ignore_ascii_case("q") => OperatorReply::Abort,
        Ok(_) => OperatorReply::Solved,
        Err(e) => {
            warn!("Could not read operator input: {}", e);
            OperatorReply::Abort
        }
    }
}

/// Blocks the crawl while a challenge is on screen
pub struct ChallengeGuard<O> {
    operator: O,
    screenshot_path: PathBuf,
    pacer: Pacer,
}

impl<O: Operator> ChallengeGuard<O> {
    pub const SCREENSHOT_FILE: &'static str = "captcha_screenshot.png";
    const RECHECK_SECS: f64 = 3.0;

    pub fn new(operator: O, output_dir: &Path, pacer: Pacer) -> Self {
        Self {
            operator,
            screenshot_path: output_dir.join(Self::SCREENSHOT_FILE),
            pacer,
        }
    }

    pub fn operator(&self) -> &O {
        &self.operator
    }

    /// Full detection. With `require_solution` the call returns only once the
    /// page is clear or the operator aborts.
    pub async fn ensure_clear<D: PageDriver + ?Sized>(&self, driver: &D, require_solution: bool) -> Result<()> {
        self.resolve(driver, require_solution, detect_challenge).await
    }

    /// Title-only detection for periodic checks during long scroll loops
    pub async fn ensure_clear_by_title<D: PageDriver + ?Sized>(&self, driver: &D) -> Result<()> {
        self.resolve(driver, true, detect_by_title).await
    }

    async fn resolve<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        require_solution: bool,
        detect: fn(&PageSnapshot) -> Option<Challenge>,
    ) -> Result<()> {
        let Some(mut challenge) = detect(&driver.snapshot().await?) else {
            return Ok(());
        };
        warn!("Challenge detected: {}", challenge);

        let screenshot = match driver.save_screenshot(&self.screenshot_path).await {
            Ok(()) => Some(self.screenshot_path.as_path()),
            Err(e) => {
                warn!("Could not save challenge screenshot: {}", e);
                None
            }
        };

        if !require_solution {
            warn!("Continuing without waiting for the challenge to be solved");
            return Ok(());
        }

        loop {
            if self.operator.request_solution(&challenge, screenshot).await == OperatorReply::Abort {
                return Err(ToolkitError::ChallengeUnresolved(challenge.to_string()).into());
            }
            self.pacer.pause(Self::RECHECK_SECS, Self::RECHECK_SECS).await;

            match detect(&driver.snapshot().await?) {
                Some(still) => {
                    warn!("Challenge still present: {}", still);
                    challenge = still;
                }
                None => {
                    info!("Challenge cleared, resuming");
                    return Ok(());
                }
            }
        }
    }
}

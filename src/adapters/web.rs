//! Estimates nutrition from public nutrition-reference pages.
//!
//! Only the configured destinations are queried, in order. Every request
//! from one estimator, across concurrent lookups too, waits out the
//! politeness delay since the previous one. Macro values are pulled out of the page
//! text by pattern; a page without a calorie figure counts as no match.

use crate::adapters::http::HttpPolicy;
use crate::domain::model::{Confidence, NutritionRecord, SourceId};
use crate::domain::ports::SourceAdapter;
use crate::utils::error::{ResolveError, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const SOURCE_NAME: &str = "web";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub fn default_destinations() -> Vec<String> {
    vec![
        "https://www.fatsecret.com/calories-nutrition/search?q={query}".to_string(),
        "https://www.myfitnesspal.com/food/search?search={query}".to_string(),
    ]
}

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script>|<style\b.*?</style>").expect("valid script pattern")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid space pattern"));

static CALORIES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)\bcalories\b[^0-9]{0,20}(\d+(?:\.\d+)?)").expect("valid calories pattern"),
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:kcal|cal)\b").expect("valid kcal pattern"),
    ]
});
static PROTEIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bprotein\b[^0-9]{0,20}(\d+(?:\.\d+)?)").expect("valid protein pattern")
});
static CARBS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:carbohydrates?|carbs?)\b[^0-9]{0,20}(\d+(?:\.\d+)?)")
        .expect("valid carbs pattern")
});
static FAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:total\s+)?fat\b[^0-9]{0,20}(\d+(?:\.\d+)?)").expect("valid fat pattern")
});

pub struct WebEstimator {
    destinations: Vec<String>,
    politeness_delay: Duration,
    total_timeout: Duration,
    policy: HttpPolicy,
    client: Client,
    /// Start of the most recent request.
    last_request: Mutex<Option<Instant>>,
}

impl WebEstimator {
    pub fn new(
        destinations: Vec<String>,
        politeness_delay: Duration,
        total_timeout: Duration,
        user_agent: &str,
        policy: HttpPolicy,
    ) -> Self {
        Self {
            destinations,
            politeness_delay,
            total_timeout,
            client: policy.client(Some(user_agent)),
            policy,
            last_request: Mutex::new(None),
        }
    }

    async fn scan(&self, food_name: &str) -> Option<NutritionRecord> {
        let query: String = url::form_urlencoded::byte_serialize(food_name.as_bytes()).collect();

        for template in &self.destinations {
            let url = template.replace("{query}", &query);
            tracing::debug!("Estimating '{}' from {}", food_name, url);
            match self.fetch_text(&url).await {
                Ok(Some(text)) => {
                    if let Some(record) = extract_record(&text, food_name) {
                        return Some(record);
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Web destination {} failed: {}", url, e),
            }
        }
        None
    }

    /// Holds the gate while sleeping so concurrent callers queue in turn.
    async fn wait_turn(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.politeness_delay).await;
        }
        *last = Some(Instant::now());
    }

    async fn fetch_text(&self, url: &str) -> Result<Option<String>> {
        self.wait_turn().await;
        let response = self.policy.send(SOURCE_NAME, || self.client.get(url)).await?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        let html = response.text().await?;
        Ok(Some(page_text(&html)))
    }
}

#[async_trait]
impl SourceAdapter for WebEstimator {
    fn source_id(&self) -> SourceId {
        SourceId::Web
    }

    fn time_budget(&self) -> Duration {
        self.total_timeout + Duration::from_millis(250)
    }

    async fn resolve(&self, food_name: &str) -> Result<Option<NutritionRecord>> {
        if self.destinations.is_empty() {
            return Ok(None);
        }
        tokio::time::timeout(self.total_timeout, self.scan(food_name))
            .await
            .map_err(|_| ResolveError::Timeout {
                source_name: SOURCE_NAME.to_string(),
            })
    }
}

/// Visible text of an HTML page, whitespace collapsed.
pub fn page_text(html: &str) -> String {
    let without_code = SCRIPT_OR_STYLE.replace_all(html, " ");
    let without_tags = TAG.replace_all(&without_code, " ");
    let decoded = html_escape::decode_html_entities(&without_tags).replace('\u{a0}', " ");
    SPACES.replace_all(decoded.trim(), " ").into_owned()
}

pub fn extract_record(text: &str, food_name: &str) -> Option<NutritionRecord> {
    let calories = CALORIES.iter().find_map(|re| first_number(re, text))?;
    Some(NutritionRecord::new(
        food_name,
        calories,
        first_number(&PROTEIN, text).unwrap_or(0.0),
        first_number(&CARBS, text).unwrap_or(0.0),
        first_number(&FAT, text).unwrap_or(0.0),
        SourceId::Web,
        Confidence::Medium,
    ))
}

fn first_number(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

use crate::adapters::http::HttpPolicy;
use crate::adapters::{nutritionix, usda, web};
use crate::utils::error::{ResolveError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid placeholder pattern"));

const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Resolver settings loaded from TOML. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub resolver: ResolverSection,
    pub usda: UsdaConfig,
    pub nutritionix: NutritionixConfig,
    pub web: WebConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSection {
    /// Overall budget for one message; unset means no deadline.
    pub deadline_seconds: Option<u64>,
    pub parallel: bool,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            deadline_seconds: None,
            parallel: true,
        }
    }
}

impl ResolverSection {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsdaConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<String>,
    pub page_size: u32,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_millis: u64,
}

impl Default for UsdaConfig {
    fn default() -> Self {
        let policy = HttpPolicy::default();
        Self {
            enabled: true,
            base_url: usda::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            page_size: 5,
            timeout_seconds: policy.timeout.as_secs(),
            retry_attempts: policy.retry_attempts,
            retry_delay_millis: policy.retry_delay.as_millis() as u64,
        }
    }
}

impl UsdaConfig {
    pub fn credential(&self) -> Option<String> {
        present(&self.api_key)
    }

    pub fn policy(&self) -> HttpPolicy {
        policy(self.timeout_seconds, self.retry_attempts, self.retry_delay_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionixConfig {
    pub enabled: bool,
    pub base_url: String,
    pub app_id: Option<String>,
    pub app_key: Option<String>,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_millis: u64,
}

impl Default for NutritionixConfig {
    fn default() -> Self {
        let policy = HttpPolicy::default();
        Self {
            enabled: true,
            base_url: nutritionix::DEFAULT_BASE_URL.to_string(),
            app_id: None,
            app_key: None,
            timeout_seconds: policy.timeout.as_secs(),
            retry_attempts: policy.retry_attempts,
            retry_delay_millis: policy.retry_delay.as_millis() as u64,
        }
    }
}

impl NutritionixConfig {
    pub fn app_id(&self) -> Option<String> {
        present(&self.app_id)
    }

    pub fn app_key(&self) -> Option<String> {
        present(&self.app_key)
    }

    pub fn policy(&self) -> HttpPolicy {
        policy(self.timeout_seconds, self.retry_attempts, self.retry_delay_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,
    /// URL templates; `{query}` is replaced by the encoded food name.
    pub destinations: Vec<String>,
    pub politeness_delay_millis: u64,
    pub total_timeout_seconds: u64,
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_millis: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            destinations: web::default_destinations(),
            politeness_delay_millis: 1000,
            total_timeout_seconds: 10,
            user_agent: web::DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: 4,
            retry_attempts: 0,
            retry_delay_millis: 250,
        }
    }
}

impl WebConfig {
    pub fn policy(&self) -> HttpPolicy {
        policy(self.timeout_seconds, self.retry_attempts, self.retry_delay_millis)
    }
}

impl ResolverConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        toml::from_str(&processed).map_err(|e| ResolveError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Only the static table is consulted.
    pub fn offline() -> Self {
        let mut config = Self::default();
        config.disable_network();
        config
    }

    pub fn disable_network(&mut self) {
        self.usda.enabled = false;
        self.nutritionix.enabled = false;
        self.web.enabled = false;
    }

    /// Replaces `${VAR}` with the environment value. Unset variables keep
    /// their placeholder and are read as absent credentials later.
    fn substitute_env_vars(content: &str) -> String {
        ENV_PLACEHOLDER
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    fn validate_http(
        section: &str,
        base_url: &str,
        timeout_seconds: u64,
        retry_attempts: u32,
    ) -> Result<()> {
        validation::validate_url(&format!("{}.base_url", section), base_url)?;
        validation::validate_positive_number(
            &format!("{}.timeout_seconds", section),
            timeout_seconds,
            1,
        )?;
        validation::validate_range(
            &format!("{}.retry_attempts", section),
            retry_attempts,
            0,
            MAX_RETRY_ATTEMPTS,
        )
    }
}

impl Validate for ResolverConfig {
    fn validate(&self) -> Result<()> {
        if let Some(deadline) = self.resolver.deadline_seconds {
            validation::validate_positive_number("resolver.deadline_seconds", deadline, 1)?;
        }

        if self.usda.enabled {
            Self::validate_http(
                "usda",
                &self.usda.base_url,
                self.usda.timeout_seconds,
                self.usda.retry_attempts,
            )?;
            validation::validate_range("usda.page_size", self.usda.page_size, 1, 200)?;
            if self.usda.credential().is_none() {
                tracing::warn!("No USDA api_key configured, primary source disabled");
            }
        }

        if self.nutritionix.enabled {
            Self::validate_http(
                "nutritionix",
                &self.nutritionix.base_url,
                self.nutritionix.timeout_seconds,
                self.nutritionix.retry_attempts,
            )?;
            if self.nutritionix.app_id().is_none() || self.nutritionix.app_key().is_none() {
                tracing::warn!("Nutritionix credentials incomplete, secondary source disabled");
            }
        }

        if self.web.enabled {
            for (i, destination) in self.web.destinations.iter().enumerate() {
                validation::validate_url_template(&format!("web.destinations[{}]", i), destination)?;
            }
            validation::validate_positive_number(
                "web.timeout_seconds",
                self.web.timeout_seconds,
                1,
            )?;
            validation::validate_positive_number(
                "web.total_timeout_seconds",
                self.web.total_timeout_seconds,
                1,
            )?;
            validation::validate_range(
                "web.retry_attempts",
                self.web.retry_attempts,
                0,
                MAX_RETRY_ATTEMPTS,
            )?;
            validation::validate_non_empty_string("web.user_agent", &self.web.user_agent)?;
        }

        Ok(())
    }
}

fn policy(timeout_seconds: u64, retry_attempts: u32, retry_delay_millis: u64) -> HttpPolicy {
    HttpPolicy {
        timeout: Duration::from_secs(timeout_seconds),
        retry_attempts,
        retry_delay: Duration::from_millis(retry_delay_millis),
    }
}

/// Blank values and unexpanded `${VAR}` placeholders count as absent.
fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !ENV_PLACEHOLDER.is_match(v))
        .map(str::to_string)
}

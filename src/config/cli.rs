use crate::config::toml_config::ResolverConfig;
use crate::domain::meal_log::MealType;
use crate::utils::error::{ResolveError, Result};
use crate::utils::validation::Validate;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "meal-resolver")]
#[command(about = "Estimate calories and macros for a free-text meal description")]
pub struct CliConfig {
    /// Meal description, e.g. "2 cups of rice and dal"
    #[arg(required = true, num_args = 1..)]
    pub message: Vec<String>,

    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Meal type for the log row: breakfast, lunch, dinner or snack")]
    pub meal_type: Option<MealType>,

    #[arg(long, help = "Append resolved items to this CSV meal log")]
    pub log_file: Option<PathBuf>,

    #[arg(long, help = "Print the result as JSON and log in JSON")]
    pub json: bool,

    #[arg(long, help = "Use the built-in table only, no network lookups")]
    pub offline: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    pub fn message_text(&self) -> String {
        self.message.join(" ")
    }

    /// File settings when `--config` is given, defaults otherwise.
    pub fn load_resolver_config(&self) -> Result<ResolverConfig> {
        let mut config = match &self.config {
            Some(path) => ResolverConfig::from_file(path)?,
            None => ResolverConfig::default(),
        };
        if self.offline {
            config.disable_network();
        }
        config.validate()?;
        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if self.message_text().trim().is_empty() {
            return Err(ResolveError::invalid_input("message is empty"));
        }
        if self.log_file.is_some() && self.meal_type.is_none() {
            return Err(ResolveError::MissingConfigError {
                field: "--meal-type (required with --log-file)".to_string(),
            });
        }
        Ok(())
    }
}

use crate::adapters::fallback::StaticFallbackTable;
use crate::adapters::nutritionix::NutritionixAdapter;
use crate::adapters::usda::UsdaAdapter;
use crate::adapters::web::WebEstimator;
use crate::config::toml_config::ResolverConfig;
use crate::core::resolver::NutritionResolver;
use crate::core::splitter::ItemSplitter;
use crate::domain::model::{AggregateResult, FoodPhrase};
use crate::domain::ports::SourceAdapter;
use crate::utils::error::{ResolveError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Turns one message into an [`AggregateResult`].
pub struct Aggregator {
    splitter: ItemSplitter,
    resolver: NutritionResolver,
    parallel: bool,
    deadline: Option<Duration>,
}

impl Aggregator {
    pub fn new(splitter: ItemSplitter, resolver: NutritionResolver) -> Self {
        Self {
            splitter,
            resolver,
            parallel: true,
            deadline: None,
        }
    }

    /// Wires the fixed cascade: USDA, Nutritionix, web estimate, static table.
    pub fn from_config(config: &ResolverConfig) -> Self {
        let table = StaticFallbackTable::shared();
        let splitter = ItemSplitter::with_vocabulary(table.standalone_names());

        let usda = &config.usda;
        let nutritionix = &config.nutritionix;
        let web = &config.web;
        let mut sources: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(4);
        if usda.enabled {
            sources.push(Arc::new(UsdaAdapter::new(
                usda.credential(),
                &usda.base_url,
                usda.page_size,
                usda.policy(),
            )));
        }
        if nutritionix.enabled {
            sources.push(Arc::new(NutritionixAdapter::new(
                nutritionix.app_id(),
                nutritionix.app_key(),
                &nutritionix.base_url,
                nutritionix.policy(),
            )));
        }
        if web.enabled {
            sources.push(Arc::new(WebEstimator::new(
                web.destinations.clone(),
                Duration::from_millis(web.politeness_delay_millis),
                Duration::from_secs(web.total_timeout_seconds),
                &web.user_agent,
                web.policy(),
            )));
        }
        sources.push(table.clone());

        tracing::debug!("Cascade has {} source(s)", sources.len());
        Self::new(splitter, NutritionResolver::new(sources, table))
            .with_parallel(config.resolver.parallel)
            .with_deadline(config.resolver.deadline())
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Default deadline applied by [`Aggregator::aggregate`].
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn split(&self, message: &str) -> Result<Vec<FoodPhrase>> {
        if message.trim().is_empty() {
            return Err(ResolveError::invalid_input("message is empty"));
        }
        Ok(self.splitter.split(message))
    }

    pub async fn aggregate(&self, message: &str) -> Result<AggregateResult> {
        let deadline = self.deadline.map(|d| Instant::now() + d);
        self.run(self.split(message)?, deadline).await
    }

    pub async fn aggregate_with_deadline(
        &self,
        message: &str,
        deadline: Instant,
    ) -> Result<AggregateResult> {
        self.run(self.split(message)?, Some(deadline)).await
    }

    /// Resolves phrases an upstream parser already split, skipping the
    /// splitter.
    pub async fn aggregate_phrases(&self, phrases: Vec<FoodPhrase>) -> Result<AggregateResult> {
        if phrases.is_empty() {
            return Err(ResolveError::invalid_input("no food items given"));
        }
        for phrase in &phrases {
            let multiplier = phrase.quantity.multiplier;
            if !(multiplier.is_finite() && multiplier > 0.0) {
                return Err(ResolveError::invalid_input(format!(
                    "quantity for '{}' must be positive, got {}",
                    phrase.normalized_name, multiplier
                )));
            }
            if phrase.normalized_name.trim().is_empty() && phrase.declared_calories.is_none() {
                return Err(ResolveError::invalid_input("food item name is empty"));
            }
        }
        let deadline = self.deadline.map(|d| Instant::now() + d);
        self.run(phrases, deadline).await
    }

    async fn run(
        &self,
        phrases: Vec<FoodPhrase>,
        deadline: Option<Instant>,
    ) -> Result<AggregateResult> {
        tracing::info!("Resolving {} food item(s)", phrases.len());

        let items = if self.parallel {
            futures::future::join_all(
                phrases
                    .iter()
                    .map(|phrase| self.resolver.resolve_one_until(phrase, deadline)),
            )
            .await
        } else {
            let mut items = Vec::with_capacity(phrases.len());
            for phrase in &phrases {
                items.push(self.resolver.resolve_one_until(phrase, deadline).await);
            }
            items
        };

        let result = AggregateResult::from_items(items);
        tracing::info!(
            "Meal total {:.0} kcal over {} item(s), {} unresolved",
            result.totals().calories,
            result.items().len(),
            result.unresolved_count()
        );
        Ok(result)
    }
}

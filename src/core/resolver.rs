use crate::adapters::fallback::StaticFallbackTable;
use crate::domain::model::{FoodPhrase, NutritionRecord, ResolvedItem};
use crate::domain::ports::SourceAdapter;
use std::sync::Arc;
use tokio::time::Instant;

/// Runs one food phrase through the source cascade.
///
/// Sources are tried in list order and the first record wins. A source that
/// errors or overruns its time budget is skipped like a NOT_FOUND, and the
/// static table closes the cascade, so resolution always terminates.
pub struct NutritionResolver {
    sources: Vec<Arc<dyn SourceAdapter>>,
    fallback: Arc<StaticFallbackTable>,
}

impl NutritionResolver {
    pub fn new(sources: Vec<Arc<dyn SourceAdapter>>, fallback: Arc<StaticFallbackTable>) -> Self {
        Self { sources, fallback }
    }

    pub async fn resolve_one(&self, phrase: &FoodPhrase) -> ResolvedItem {
        self.resolve_one_until(phrase, None).await
    }

    /// Once `deadline` has passed, remaining sources are skipped and the
    /// static table answers directly.
    pub async fn resolve_one_until(
        &self,
        phrase: &FoodPhrase,
        deadline: Option<Instant>,
    ) -> ResolvedItem {
        if let Some(calories) = phrase.declared_calories {
            tracing::debug!(
                "Using declared {} kcal for '{}'",
                calories,
                phrase.normalized_name
            );
            // Declared calories already cover the whole phrase.
            return ResolvedItem {
                phrase: phrase.clone(),
                record: NutritionRecord::user_supplied(&phrase.normalized_name, calories),
            };
        }

        let record = self.cascade(&phrase.normalized_name, deadline).await;
        tracing::info!(
            "Resolved '{}' via {} ({} confidence) x{}",
            phrase.normalized_name,
            record.source_id,
            record.confidence,
            phrase.quantity.multiplier
        );

        ResolvedItem {
            phrase: phrase.clone(),
            record: record.scaled(phrase.quantity.multiplier),
        }
    }

    async fn cascade(&self, food_name: &str, deadline: Option<Instant>) -> NutritionRecord {
        if food_name.is_empty() {
            return self.fallback.resolve_record(food_name);
        }

        for source in &self.sources {
            let mut budget = source.time_budget();
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    tracing::warn!(
                        "Deadline passed before {} for '{}', using static table",
                        source.source_id(),
                        food_name
                    );
                    break;
                }
                budget = budget.min(deadline - now);
            }

            match tokio::time::timeout(budget, source.resolve(food_name)).await {
                Ok(Ok(Some(record))) => return record,
                Ok(Ok(None)) => {
                    tracing::debug!("{}: no match for '{}'", source.source_id(), food_name);
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        "{} failed for '{}', skipping: {}",
                        source.source_id(),
                        food_name,
                        e
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        "{} exceeded {:?} for '{}', skipping",
                        source.source_id(),
                        budget,
                        food_name
                    );
                }
            }
        }

        self.fallback.resolve_record(food_name)
    }
}

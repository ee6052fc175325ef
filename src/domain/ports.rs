use crate::domain::meal_log::MealLogRow;
use crate::domain::model::{NutritionRecord, SourceId};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// One stage of the resolution cascade.
///
/// `Ok(None)` is NOT_FOUND. An `Err` is a transient failure for this call
/// only; the resolver logs it and moves on to the next source exactly as it
/// would for NOT_FOUND. Adapters without credentials answer `Ok(None)`.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source_id(&self) -> SourceId;

    /// Upper bound the resolver allows for a single `resolve` call.
    fn time_budget(&self) -> Duration {
        Duration::from_secs(8)
    }

    async fn resolve(&self, food_name: &str) -> Result<Option<NutritionRecord>>;
}

pub trait MealLogStore: Send + Sync {
    fn append(
        &self,
        rows: &[MealLogRow],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::ResolverConfig;

pub use crate::core::{Aggregator, ItemSplitter, NutritionResolver};
pub use domain::meal_log::{MealLogRow, MealType};
pub use domain::model::{
    AggregateResult, Confidence, FoodPhrase, NutritionRecord, NutritionTotals, QuantitySpec,
    ResolvedItem, SourceId, Unit,
};
pub use domain::ports::{MealLogStore, SourceAdapter};
pub use utils::error::{ResolveError, Result};

// Adapters layer: concrete sources behind the SourceAdapter port, the shared
// HTTP call policy and the meal-log store.

pub mod fallback;
pub mod http;
pub mod nutritionix;
pub mod storage;
pub mod usda;
pub mod web;

pub use fallback::StaticFallbackTable;
pub use http::HttpPolicy;
pub use nutritionix::NutritionixAdapter;
pub use storage::CsvMealLog;
pub use usda::UsdaAdapter;
pub use web::WebEstimator;

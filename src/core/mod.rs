pub mod aggregator;
pub mod quantity;
pub mod resolver;
pub mod splitter;

pub use aggregator::Aggregator;
pub use quantity::extract_quantity;
pub use resolver::NutritionResolver;
pub use splitter::ItemSplitter;

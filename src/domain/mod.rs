// Domain layer: data model, persistence-facing rows and ports. No I/O here.

pub mod meal_log;
pub mod model;
pub mod ports;

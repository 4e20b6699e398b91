pub mod filter_engine;
pub mod row_validation;
pub mod schema_inference;
pub mod sort_engine;

pub use filter_engine::FilterEngine;
pub use row_validation::{FieldViolation, RowValidator};
pub use schema_inference::SchemaInferenceService;
pub use sort_engine::SortEngine;

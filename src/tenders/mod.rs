//! Tender listing model and aggregation.

pub mod aggregate;
pub mod date;
pub mod model;

pub use aggregate::{AggregationError, Aggregator, Collected, Dedup};
pub use date::parse_platform_date;
pub use model::{FieldValue, OutputRow, PageRequest, PageResponse, RawItem, COLUMNS, PAGE_SIZE};

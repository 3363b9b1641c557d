pub mod catalog;
pub mod config;
pub mod error;
pub mod predicate;
pub mod snapshot;
pub mod template;
pub mod types;

pub use catalog::Catalog;
pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use predicate::{CompareOp, FieldScope, KeywordLists, Predicate};
pub use snapshot::{CitizenSnapshot, FieldSource, FieldValue};
pub use types::*;

//! Candidate filter
//!
//! Maps the raw rows of a search result listing onto an ordered list of
//! bookable candidates and picks the configured one.

pub mod extract;
pub mod model;
pub mod select;
pub mod train_type;

pub use model::{Candidate, RowDescriptor};
pub use select::{eligible_candidates, select_candidate};
pub use train_type::{train_types_for_prefixes, TrainType};

//! Core records, deduplication and customer metrics for the C360 pipeline.

pub mod codec;
pub mod dedup;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod records;
pub mod segment;
pub mod table;
pub mod windows;

pub use dedup::{deduplicate, deduplicate_with_report, DedupReport};
pub use error::{Error, Result};
pub use metrics::*;
pub use pipeline::*;
pub use records::*;
pub use segment::*;
pub use table::{decode, Decoded, RowSet, ValidationStats};
pub use windows::*;

//! Records and host metadata shared by the structured sinks.
//!
//! `BenchRecord` (v1) is the line format of the JSONL sink.

pub mod env;
pub mod schema;

pub use env::EnvironmentInfo;
pub use schema::{BenchRecord, SCHEMA_VERSION};

// src/lib.rs
// Public library surface for the `potm` binary and integration tests.

pub mod config;
pub mod dedup;
pub mod drafting;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod source_weights;
pub mod store;
pub mod workflow;

// ---- Re-exports for stable public API ----
pub use crate::config::AppConfig;
pub use crate::drafting::PostGenerator;
pub use crate::extract::EventExtractor;
pub use crate::ingest::CancelFlag;
pub use crate::pipeline::{import_companies, Pipeline, RunOptions, RunReport};
pub use crate::registry::CompanyRegistry;
pub use crate::store::{LocalStore, Store};
pub use crate::workflow::{WorkflowEngine, WorkflowEvent};

// src/error.rs
//! Error taxonomy shared across the pipeline and the review workflow.
//!
//! Recovered errors (`SourceFetchError`, `GenerationError`) never leave their
//! component: fetchers degrade to empty batches and the post generator falls
//! back to templates. `WorkflowError` and `ConfigError` are surfaced to callers.

use std::time::Duration;

use thiserror::Error;

use crate::model::{AnnouncementId, AnnouncementStatus, CompanyId, PostId};

/// Failure of one source during one fetch. Logged and turned into an empty batch.
#[derive(Debug, Error)]
pub enum SourceFetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected http status {0}")]
    Status(u16),

    #[error("malformed payload: {0}")]
    Parse(String),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("daily quota exhausted")]
    QuotaExhausted,

    #[error("rate limited by upstream")]
    RateLimited,

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
}

/// Failure of the AI text-generation backend. Always recovered by falling back.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("AI backend disabled")]
    Disabled,

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("daily generation limit reached")]
    DailyLimit,

    #[error("backend http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned status {0}")]
    Status(u16),

    #[error("backend returned empty text")]
    EmptyResponse,
}

/// Persistence-layer failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic-concurrency failure: the record changed since it was read.
    #[error("{entity} {id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict {
        entity: &'static str,
        id: String,
        expected: u64,
        found: u64,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("store snapshot: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors returned to the review surface. State is never mutated when one is returned.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid transition: cannot {event} an announcement that is {from}")]
    InvalidTransition {
        from: AnnouncementStatus,
        event: &'static str,
    },

    #[error("announcement {0} not found")]
    NotFound(AnnouncementId),

    #[error("post {0} not found")]
    PostNotFound(PostId),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("persistence conflict, reload and retry: {0}")]
    PersistenceConflict(StoreError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for WorkflowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { .. } => WorkflowError::PersistenceConflict(e),
            other => WorkflowError::Store(other),
        }
    }
}

/// Fatal configuration problems, raised at import or startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("alias {alias:?} is claimed by both {first} and {second}")]
    DuplicateAlias {
        alias: String,
        first: CompanyId,
        second: CompanyId,
    },

    #[error("duplicate company id {0}")]
    DuplicateCompany(CompanyId),

    #[error("unknown company {0}")]
    UnknownCompany(CompanyId),

    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

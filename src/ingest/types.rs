// src/ingest/types.rs
use chrono::{DateTime, Utc};

use crate::error::SourceFetchError;
use crate::model::Company;

/// One raw text item from a source, normalized to a common shape.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct RawItem {
    pub source_id: String,   // e.g. "prnewswire-food", "newsapi"
    pub source_name: String, // publication display name
    pub fetched_at: DateTime<Utc>,
    pub url: String, // stable within a source
    pub title: String,
    pub body_text: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Whether a source is queried once per run or once per tracked company.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchScope {
    Global,
    PerCompany,
}

#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch a finite batch. `company` is `Some` for per-company sources.
    async fn try_fetch(&self, company: Option<&Company>) -> Result<Vec<RawItem>, SourceFetchError>;
    fn source_id(&self) -> &str;
    fn scope(&self) -> FetchScope {
        FetchScope::Global
    }
}

// src/ingest/providers/search_api.rs
//! Keyword news-search API (NewsAPI `everything` endpoint), one query per company.
//!
//! The API is capped per day, so every request takes a permit from a shared
//! [`DailyQuota`]. An upstream 429 exhausts the quota for the rest of the day.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;

use crate::error::SourceFetchError;
use crate::ingest::normalize_text;
use crate::ingest::quota::DailyQuota;
use crate::ingest::types::{FetchScope, RawItem, SourceFetcher};
use crate::model::Company;

pub const NEWSAPI_EVERYTHING: &str = "https://newsapi.org/v2/everything";

const MOVE_TERMS: &str =
    "appointed OR promoted OR named OR hires OR VP OR director OR executive";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

enum Mode {
    Fixture(String),
    Live {
        endpoint: String,
        api_key: Option<String>,
        client: reqwest::Client,
    },
}

pub struct SearchApiFetcher {
    id: String,
    days_back: i64,
    page_size: usize,
    quota: Arc<DailyQuota>,
    mode: Mode,
}

impl SearchApiFetcher {
    pub fn new(
        id: &str,
        endpoint: &str,
        api_key: Option<String>,
        quota: Arc<DailyQuota>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            id: id.to_string(),
            days_back: 7,
            page_size: 20,
            quota,
            mode: Mode::Live {
                endpoint: endpoint.to_string(),
                api_key: api_key.filter(|k| !k.trim().is_empty()),
                client,
            },
        }
    }

    /// Serve a canned JSON response for every company; still consumes quota.
    pub fn from_fixture(id: &str, json: &str, quota: Arc<DailyQuota>) -> Self {
        Self {
            id: id.to_string(),
            days_back: 7,
            page_size: 20,
            quota,
            mode: Mode::Fixture(json.to_string()),
        }
    }

    pub fn with_days_back(mut self, days: u32) -> Self {
        self.days_back = i64::from(days.max(1));
        self
    }

    pub fn with_page_size(mut self, n: usize) -> Self {
        self.page_size = n.clamp(1, 100);
        self
    }

    pub fn query_for(company: &Company) -> String {
        format!("\"{}\" AND ({MOVE_TERMS})", company.canonical_name)
    }

    fn request_url(&self, endpoint: &str, api_key: &str, company: &Company) -> Result<String, SourceFetchError> {
        let from = (Utc::now() - ChronoDuration::days(self.days_back))
            .format("%Y-%m-%d")
            .to_string();
        let page_size = self.page_size.to_string();
        reqwest::Url::parse_with_params(
            endpoint,
            &[
                ("q", Self::query_for(company).as_str()),
                ("from", from.as_str()),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
                ("apiKey", api_key),
            ],
        )
        .map(String::from)
        .map_err(|e| SourceFetchError::Parse(format!("search url: {e}")))
    }

    pub fn parse_response(&self, body: &str) -> Result<Vec<RawItem>, SourceFetchError> {
        let resp: SearchResponse = serde_json::from_str(body)
            .map_err(|e| SourceFetchError::Parse(format!("search api: {e}")))?;
        if resp.status == "error" {
            return Err(SourceFetchError::Parse(
                resp.message.unwrap_or_else(|| "search api error".into()),
            ));
        }

        let now = Utc::now();
        let items = resp
            .articles
            .into_iter()
            .take(self.page_size)
            .filter_map(|a| {
                let title = normalize_text(a.title.as_deref().unwrap_or_default());
                let body_text = normalize_text(
                    a.description
                        .as_deref()
                        .or(a.content.as_deref())
                        .unwrap_or_default(),
                );
                if title.is_empty() && body_text.is_empty() {
                    return None;
                }
                Some(RawItem {
                    source_id: self.id.clone(),
                    source_name: a
                        .source
                        .and_then(|s| s.name)
                        .unwrap_or_else(|| "NewsAPI".to_string()),
                    fetched_at: now,
                    url: a.url.unwrap_or_default(),
                    title,
                    body_text,
                    published_at: a
                        .published_at
                        .as_deref()
                        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                        .map(|dt| dt.with_timezone(&Utc)),
                })
            })
            .collect();
        Ok(items)
    }
}

#[async_trait]
impl SourceFetcher for SearchApiFetcher {
    async fn try_fetch(&self, company: Option<&Company>) -> Result<Vec<RawItem>, SourceFetchError> {
        let Some(company) = company else {
            return Ok(Vec::new());
        };
        match &self.mode {
            Mode::Fixture(json) => {
                if !self.quota.try_acquire() {
                    return Err(SourceFetchError::QuotaExhausted);
                }
                self.parse_response(json)
            }
            Mode::Live {
                endpoint,
                api_key,
                client,
            } => {
                let key = api_key
                    .as_deref()
                    .ok_or(SourceFetchError::MissingCredential("NEWSAPI_KEY"))?;
                if !self.quota.try_acquire() {
                    return Err(SourceFetchError::QuotaExhausted);
                }
                let url = self.request_url(endpoint, key, company)?;
                match super::get_text(client, &url).await {
                    Ok(body) => self.parse_response(&body),
                    Err(SourceFetchError::RateLimited) => {
                        tracing::warn!(source = %self.id, "search api rate limited; disabling for today");
                        self.quota.exhaust();
                        Err(SourceFetchError::RateLimited)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    fn source_id(&self) -> &str {
        &self.id
    }

    fn scope(&self) -> FetchScope {
        FetchScope::PerCompany
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "status": "ok",
        "totalResults": 2,
        "articles": [
            {
                "source": {"id": null, "name": "Food Business News"},
                "title": "Hormel Foods promotes John Doe to chief financial officer",
                "description": "Hormel Foods said John Doe was promoted to CFO.",
                "url": "https://example.test/hormel-cfo",
                "publishedAt": "2025-06-09T12:30:00Z",
                "content": null
            },
            {"source": {"name": "Blank"}, "title": "", "description": null, "url": "https://example.test/blank"}
        ]
    }"#;

    #[tokio::test]
    async fn parses_articles_and_skips_blank_ones() {
        let q = Arc::new(DailyQuota::new(10));
        let f = SearchApiFetcher::from_fixture("newsapi", JSON, q.clone());
        let items = f.try_fetch(Some(&Company::new("Hormel Foods"))).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_name, "Food Business News");
        assert!(items[0].published_at.is_some());
        assert_eq!(q.remaining(), 9);
    }

    #[tokio::test]
    async fn zero_quota_short_circuits() {
        let f = SearchApiFetcher::from_fixture("newsapi", JSON, Arc::new(DailyQuota::new(0)));
        let res = f.try_fetch(Some(&Company::new("Hormel Foods"))).await;
        assert!(matches!(res, Err(SourceFetchError::QuotaExhausted)));
    }

    #[tokio::test]
    async fn missing_key_is_reported() {
        let f = SearchApiFetcher::new(
            "newsapi",
            NEWSAPI_EVERYTHING,
            None,
            Arc::new(DailyQuota::new(10)),
            reqwest::Client::new(),
        );
        let res = f.try_fetch(Some(&Company::new("Hormel Foods"))).await;
        assert!(matches!(res, Err(SourceFetchError::MissingCredential(_))));
    }

    #[test]
    fn query_quotes_company_name() {
        let q = SearchApiFetcher::query_for(&Company::new("Perdue Farms"));
        assert!(q.starts_with("\"Perdue Farms\" AND ("));
    }
}

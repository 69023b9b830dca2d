// src/ingest/providers/rss.rs
//! RSS 2.0 sources: fixed industry/wire feeds and per-company news-search queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::error::SourceFetchError;
use crate::ingest::types::{FetchScope, RawItem, SourceFetcher};
use crate::ingest::{dedup_by_url, normalize_text};
use crate::model::Company;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

pub(crate) fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), 0))
        .or_else(|| {
            DateTime::parse_from_rfc2822(ts.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// Default news-search endpoint (Google News RSS).
pub const NEWS_SEARCH_RSS: &str = "https://news.google.com/rss/search";

enum Mode {
    Fixture(String),
    Feed {
        url: String,
        client: reqwest::Client,
    },
    Search {
        endpoint: String,
        queries: Vec<String>,
        client: reqwest::Client,
    },
}

pub struct RssFetcher {
    id: String,
    name: String,
    max_items: usize,
    mode: Mode,
}

impl RssFetcher {
    /// A fixed feed fetched once per run.
    pub fn feed(id: &str, name: &str, url: &str, client: reqwest::Client) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            max_items: 50,
            mode: Mode::Feed {
                url: url.to_string(),
                client,
            },
        }
    }

    /// Per-company search feed; each query template has a `{company}` placeholder.
    pub fn company_search(
        id: &str,
        endpoint: &str,
        queries: Vec<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: "Google News".to_string(),
            max_items: 20,
            mode: Mode::Search {
                endpoint: endpoint.to_string(),
                queries,
                client,
            },
        }
    }

    /// Parse a static XML document instead of going to the network.
    pub fn from_fixture(id: &str, xml: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            max_items: usize::MAX,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn with_max_items(mut self, n: usize) -> Self {
        self.max_items = n.max(1);
        self
    }

    pub fn parse_items(&self, xml: &str) -> Result<Vec<RawItem>, SourceFetchError> {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss =
            from_str(&xml_clean).map_err(|e| SourceFetchError::Parse(format!("rss: {e}")))?;
        let source_name = match &self.mode {
            Mode::Feed { .. } | Mode::Fixture(_) => rss
                .channel
                .title
                .as_deref()
                .map(normalize_text)
                .filter(|t| !t.is_empty() && self.name == self.id)
                .unwrap_or_else(|| self.name.clone()),
            Mode::Search { .. } => self.name.clone(),
        };

        let now = Utc::now();
        let mut out = Vec::with_capacity(rss.channel.item.len().min(self.max_items));
        for it in rss.channel.item.into_iter().take(self.max_items) {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            let body_text = normalize_text(it.description.as_deref().unwrap_or_default());
            if title.is_empty() && body_text.is_empty() {
                continue;
            }
            out.push(RawItem {
                source_id: self.id.clone(),
                source_name: source_name.clone(),
                fetched_at: now,
                url: it.link.map(|l| l.trim().to_string()).unwrap_or_default(),
                title,
                body_text,
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822),
            });
        }
        Ok(out)
    }
}

/// Build a search-feed URL for one company and one query template.
pub fn search_url(endpoint: &str, template: &str, company: &str) -> Result<String, SourceFetchError> {
    let query = template.replace("{company}", company);
    reqwest::Url::parse_with_params(
        endpoint,
        &[("q", query.as_str()), ("hl", "en-US"), ("gl", "US"), ("ceid", "US:en")],
    )
    .map(String::from)
    .map_err(|e| SourceFetchError::Parse(format!("search url: {e}")))
}

#[async_trait]
impl SourceFetcher for RssFetcher {
    async fn try_fetch(&self, company: Option<&Company>) -> Result<Vec<RawItem>, SourceFetchError> {
        match &self.mode {
            Mode::Fixture(xml) => self.parse_items(xml),
            Mode::Feed { url, client } => {
                let body = super::get_text(client, url).await?;
                self.parse_items(&body)
            }
            Mode::Search {
                endpoint,
                queries,
                client,
            } => {
                let Some(company) = company else {
                    return Ok(Vec::new());
                };
                let mut all = Vec::new();
                let mut failures = 0usize;
                let mut last_err = None;
                for q in queries {
                    let url = search_url(endpoint, q, &company.canonical_name)?;
                    match super::get_text(client, &url).await {
                        Ok(body) => all.extend(self.parse_items(&body)?),
                        Err(e) => {
                            failures += 1;
                            last_err = Some(e);
                        }
                    }
                }
                // Partial success is still success.
                if failures == queries.len() {
                    if let Some(e) = last_err {
                        return Err(e);
                    }
                }
                Ok(dedup_by_url(all))
            }
        }
    }

    fn source_id(&self) -> &str {
        &self.id
    }

    fn scope(&self) -> FetchScope {
        match self.mode {
            Mode::Search { .. } => FetchScope::PerCompany,
            _ => FetchScope::Global,
        }
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

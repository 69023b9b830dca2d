// src/ingest/mod.rs
pub mod providers;
pub mod quota;
pub mod scheduler;
pub mod types;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;

use crate::error::SourceFetchError;
use crate::ingest::types::{FetchScope, RawItem, SourceFetcher};
use crate::model::Company;

/// Normalize text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    normalize_text_capped(s, 4000)
}

pub fn normalize_text_capped(s: &str, max_chars: usize) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace('\u{00A0}', " ");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect();
    }
    out
}

/// Cooperative cancellation checked between source fetches and merges.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fetch one batch, swallowing errors and timeouts into an empty result.
pub async fn fetch_resilient(
    fetcher: &dyn SourceFetcher,
    company: Option<&Company>,
    timeout: Duration,
) -> Vec<RawItem> {
    let t0 = Instant::now();
    let res = match tokio::time::timeout(timeout, fetcher.try_fetch(company)).await {
        Ok(r) => r,
        Err(_) => Err(SourceFetchError::Timeout(timeout)),
    };
    histogram!("pipeline_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    match res {
        Ok(items) => {
            counter!("pipeline_items_fetched_total").increment(items.len() as u64);
            tracing::debug!(
                source = fetcher.source_id(),
                company = company.map(|c| c.canonical_name.as_str()),
                items = items.len(),
                "source fetched"
            );
            items
        }
        Err(SourceFetchError::QuotaExhausted) => {
            tracing::info!(source = fetcher.source_id(), "quota exhausted, skipping");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                source = fetcher.source_id(),
                company = company.map(|c| c.canonical_name.as_str()),
                "source fetch failed"
            );
            counter!("pipeline_source_errors_total").increment(1);
            Vec::new()
        }
    }
}

/// Result of one concurrent fetch round.
#[derive(Debug, Default)]
pub struct FetchRound {
    pub items: Vec<RawItem>,
    pub sources: usize,
    pub cancelled: bool,
}

/// Fetch every source concurrently. Per-company sources walk `companies` in order,
/// checking `cancel` before each request. `timeout` bounds each source as a
/// whole, so a slow per-company source gives up after one timeout in total.
pub async fn fetch_all(
    fetchers: &[Arc<dyn SourceFetcher>],
    companies: &[Company],
    timeout: Duration,
    cancel: &CancelFlag,
) -> FetchRound {
    let mut set = JoinSet::new();
    let companies = Arc::new(companies.to_vec());
    let mut spawned = 0usize;

    for f in fetchers {
        if cancel.is_cancelled() {
            break;
        }
        let f = Arc::clone(f);
        let companies = Arc::clone(&companies);
        let cancel = cancel.clone();
        spawned += 1;
        set.spawn(async move {
            match f.scope() {
                FetchScope::Global => fetch_resilient(f.as_ref(), None, timeout).await,
                FetchScope::PerCompany => {
                    // One deadline for the whole source, not one per company.
                    let deadline = Instant::now() + timeout;
                    let mut out = Vec::new();
                    for (done, c) in companies.iter().enumerate() {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let left = deadline.saturating_duration_since(Instant::now());
                        if left.is_zero() {
                            tracing::warn!(
                                source = f.source_id(),
                                companies_done = done,
                                companies_total = companies.len(),
                                "source deadline reached; keeping partial results"
                            );
                            counter!("pipeline_source_errors_total").increment(1);
                            break;
                        }
                        out.extend(fetch_resilient(f.as_ref(), Some(c), left).await);
                    }
                    out
                }
            }
        });
    }

    let mut items = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(mut batch) => items.append(&mut batch),
            Err(e) => {
                tracing::error!(error = %e, "source task panicked");
                counter!("pipeline_source_errors_total").increment(1);
            }
        }
    }

    FetchRound {
        items: dedup_by_url(items),
        sources: spawned,
        cancelled: cancel.is_cancelled(),
    }
}

/// Drop repeated (source, url) pairs, keeping the first occurrence.
pub fn dedup_by_url(items: Vec<RawItem>) -> Vec<RawItem> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    items
        .into_iter()
        .filter(|it| it.url.is_empty() || seen.insert((it.source_id.clone(), it.url.clone())))
        .collect()
}

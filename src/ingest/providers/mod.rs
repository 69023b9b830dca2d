// src/ingest/providers/mod.rs
pub mod newsroom;
pub mod rss;
pub mod search_api;

use std::time::Duration;

/// Shared HTTP client for all providers.
pub fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("Mozilla/5.0 (compatible; PeopleOnTheMove/1.0)")
        .connect_timeout(Duration::from_secs(5))
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default http client");
            reqwest::Client::new()
        })
}

pub(crate) async fn get_text(
    client: &reqwest::Client,
    url: &str,
) -> Result<String, crate::error::SourceFetchError> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if status.as_u16() == 429 {
        return Err(crate::error::SourceFetchError::RateLimited);
    }
    if !status.is_success() {
        return Err(crate::error::SourceFetchError::Status(status.as_u16()));
    }
    Ok(resp.text().await?)
}

/// Build every enabled source from config. Sources that cannot work without a
/// missing credential are still built; they log and return empty batches.
pub fn build_fetchers(cfg: &crate::config::AppConfig) -> Vec<std::sync::Arc<dyn crate::ingest::types::SourceFetcher>> {
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::config::resolve_secret;
    use crate::ingest::quota::DailyQuota;
    use crate::model::CompanyId;

    let client = http_client(Duration::from_secs(cfg.pipeline.source_timeout_secs));
    let max_items = cfg.pipeline.max_items_per_source;
    let src = &cfg.sources;
    let mut out: Vec<Arc<dyn crate::ingest::types::SourceFetcher>> = Vec::new();

    for f in &src.feeds {
        out.push(Arc::new(
            rss::RssFetcher::feed(&f.id, &f.name, &f.url, client.clone())
                .with_max_items(f.max_items.unwrap_or(max_items)),
        ));
    }

    if src.news_search.enabled && !src.news_search.queries.is_empty() {
        out.push(Arc::new(rss::RssFetcher::company_search(
            &src.news_search.id,
            &src.news_search.endpoint,
            src.news_search.queries.clone(),
            client.clone(),
        )));
    }

    if src.search_api.enabled {
        let key = resolve_secret(&src.search_api.api_key, "NEWSAPI_KEY");
        if key.is_none() {
            tracing::warn!(source = %src.search_api.id, "NEWSAPI_KEY not set; search API will return nothing");
        }
        let quota = Arc::new(DailyQuota::new(src.search_api.daily_limit));
        out.push(Arc::new(
            search_api::SearchApiFetcher::new(
                &src.search_api.id,
                &src.search_api.endpoint,
                key,
                quota,
                client.clone(),
            )
            .with_days_back(cfg.pipeline.days_back)
            .with_page_size(src.search_api.page_size),
        ));
    }

    if src.newsrooms.enabled && !src.newsrooms.pages.is_empty() {
        let pages: HashMap<CompanyId, String> = src
            .newsrooms
            .pages
            .iter()
            .map(|(name, url)| (CompanyId::from_name(name), url.clone()))
            .collect();
        out.push(Arc::new(
            newsroom::NewsroomFetcher::new(&src.newsrooms.id, pages, client)
                .with_link_pattern(&src.newsrooms.link_pattern)
                .with_max_items(max_items),
        ));
    }

    tracing::debug!(sources = out.len(), "fetchers built");
    out
}

// src/ingest/providers/newsroom.rs
//! Company newsroom / press-release listing pages without a feed.
//!
//! The page is parsed with `scraper`; release links are the anchors whose
//! `href` contains the configured path fragment, and the anchor text is the
//! headline. Listing pages often prefix headlines with the release date
//! ("Feb 24, 2026, 16:30 ET ..."), which is split off and used as `published_at`.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{Html, Selector};

use crate::error::SourceFetchError;
use crate::ingest::normalize_text;
use crate::ingest::types::{FetchScope, RawItem, SourceFetcher};
use crate::model::{Company, CompanyId};

pub const DEFAULT_LINK_PATTERN: &str = "/news-releases/";
const MIN_TITLE_CHARS: usize = 10;

fn re_date_prefix() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^((?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+\d{1,2},\s+\d{4})(?:,\s+\d{1,2}:\d{2}\s*(?:ET|PT|CT|MT))?\s*",
        )
        .expect("static regex")
    })
}

/// Split a leading release date off a headline.
pub fn split_date_prefix(title: &str) -> (Option<DateTime<Utc>>, &str) {
    let Some(caps) = re_date_prefix().captures(title) else {
        return (None, title);
    };
    let whole = caps.get(0).map_or(0, |m| m.end());
    let date_text = caps.get(1).map_or("", |m| m.as_str());
    let published = parse_listing_date(date_text);
    (published, title[whole..].trim())
}

fn parse_listing_date(s: &str) -> Option<DateTime<Utc>> {
    // "Feb 24, 2026" / "February 24, 2026" / "Sept. 3, 2025"
    let cleaned = s.replace('.', "");
    let mut parts = cleaned.split_whitespace();
    let month = parts.next()?;
    let rest: Vec<&str> = parts.collect();
    let short: String = month.chars().take(3).collect();
    let normalized = format!("{short} {}", rest.join(" "));
    NaiveDate::parse_from_str(&normalized, "%b %d, %Y")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

enum Mode {
    Fixture { base_url: String, html: String },
    Live {
        pages: HashMap<CompanyId, String>,
        client: reqwest::Client,
    },
}

pub struct NewsroomFetcher {
    id: String,
    link_pattern: String,
    max_items: usize,
    mode: Mode,
}

impl NewsroomFetcher {
    /// One listing page per tracked company; companies without a page are skipped.
    pub fn new(id: &str, pages: HashMap<CompanyId, String>, client: reqwest::Client) -> Self {
        Self {
            id: id.to_string(),
            link_pattern: DEFAULT_LINK_PATTERN.to_string(),
            max_items: 25,
            mode: Mode::Live { pages, client },
        }
    }

    /// Scrape a static page once per run.
    pub fn from_fixture(id: &str, base_url: &str, html: &str) -> Self {
        Self {
            id: id.to_string(),
            link_pattern: DEFAULT_LINK_PATTERN.to_string(),
            max_items: 25,
            mode: Mode::Fixture {
                base_url: base_url.to_string(),
                html: html.to_string(),
            },
        }
    }

    pub fn with_link_pattern(mut self, pattern: &str) -> Self {
        if !pattern.trim().is_empty() {
            self.link_pattern = pattern.to_string();
        }
        self
    }

    pub fn with_max_items(mut self, n: usize) -> Self {
        self.max_items = n.max(1);
        self
    }

    pub fn parse_page(
        &self,
        base_url: &str,
        html: &str,
        source_name: &str,
    ) -> Result<Vec<RawItem>, SourceFetchError> {
        let base = reqwest::Url::parse(base_url)
            .map_err(|e| SourceFetchError::Parse(format!("newsroom base url: {e}")))?;
        let now = Utc::now();
        let selector = Selector::parse(&format!(
            "a[href*=\"{}\"]",
            self.link_pattern.replace('"', "\\\"")
        ))
        .map_err(|e| SourceFetchError::Parse(format!("newsroom link selector: {e:?}")))?;
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for el in document.select(&selector) {
            if out.len() >= self.max_items {
                break;
            }
            let href = el.value().attr("href").unwrap_or_default().trim();
            let Ok(url) = base.join(href) else {
                continue;
            };
            let url = url.to_string();
            if !seen.insert(url.clone()) {
                continue;
            }
            let text = normalize_text(&el.text().collect::<Vec<_>>().join(" "));
            let (published_at, title) = split_date_prefix(&text);
            if title.chars().count() < MIN_TITLE_CHARS {
                continue;
            }
            out.push(RawItem {
                source_id: self.id.clone(),
                source_name: source_name.to_string(),
                fetched_at: now,
                url,
                title: title.to_string(),
                body_text: String::new(),
                published_at,
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceFetcher for NewsroomFetcher {
    async fn try_fetch(&self, company: Option<&Company>) -> Result<Vec<RawItem>, SourceFetchError> {
        match &self.mode {
            Mode::Fixture { base_url, html } => self.parse_page(base_url, html, &self.id),
            Mode::Live { pages, client } => {
                let Some(company) = company else {
                    return Ok(Vec::new());
                };
                let Some(page) = pages.get(&company.id) else {
                    return Ok(Vec::new());
                };
                let html = super::get_text(client, page).await?;
                let name = format!("{} Newsroom", company.canonical_name);
                self.parse_page(page, &html, &name)
            }
        }
    }

    fn source_id(&self) -> &str {
        &self.id
    }

    fn scope(&self) -> FetchScope {
        match self.mode {
            Mode::Live { .. } => FetchScope::PerCompany,
            Mode::Fixture { .. } => FetchScope::Global,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"
<ul>
  <li><a class="card" href="/news-releases/tyson-names-coo-302001.html">Jun 10, 2025, 09:00 ET Tyson Foods Names Jane Smith Chief Operating Officer</a></li>
  <li><a href="/news-releases/tyson-names-coo-302001.html">duplicate</a></li>
  <li><a href="/news-releases/short.html">Short</a></li>
  <li><a href="/about-us/">About Tyson Foods and our team</a></li>
  <li><a href="https://www.prnewswire.com/news-releases/q2-results-302002.html"><span>Tyson Foods Reports Second Quarter Results</span></a></li>
</ul>"#;

    #[tokio::test]
    async fn picks_release_links_and_strips_dates() {
        let f = NewsroomFetcher::from_fixture("prnewswire-tyson", "https://www.prnewswire.com/", HTML);
        let items = f.try_fetch(None).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0].url,
            "https://www.prnewswire.com/news-releases/tyson-names-coo-302001.html"
        );
        assert_eq!(
            items[0].title,
            "Tyson Foods Names Jane Smith Chief Operating Officer"
        );
        assert_eq!(
            items[0].published_at.map(|d| d.date_naive()),
            NaiveDate::from_ymd_opt(2025, 6, 10)
        );
        assert_eq!(items[1].title, "Tyson Foods Reports Second Quarter Results");
        assert!(items[1].published_at.is_none());
    }

    #[test]
    fn nested_markup_and_custom_pattern() {
        let html = r#"<div>
  <a href="/press/2025/perdue-cfo"><h3>Perdue Farms names <b>John Doe</b> CFO</h3><p>Jun 2, 2025</p></a>
  <a href="/press/2025/perdue-cfo">Perdue Farms names John Doe CFO (again)</a>
  <a href="/news-releases/other-302001.html">Tom &amp; Jerry Foods names a new CEO</a>
</div>"#;
        let f = NewsroomFetcher::from_fixture("perdue", "https://corporate.perdue.com/", html)
            .with_link_pattern("/press/");
        let items = f.parse_page("https://corporate.perdue.com/", html, "Perdue Newsroom").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://corporate.perdue.com/press/2025/perdue-cfo");
        assert!(items[0].title.starts_with("Perdue Farms names John Doe CFO"));
        assert_eq!(items[0].source_name, "Perdue Newsroom");

        let f = NewsroomFetcher::from_fixture("wire", "https://www.prnewswire.com/", html);
        let items = f.parse_page("https://www.prnewswire.com/", html, "wire").unwrap();
        assert_eq!(items[0].title, "Tom & Jerry Foods names a new CEO");
    }

    #[test]
    fn date_prefix_variants() {
        let (d, rest) = split_date_prefix("February 3, 2025 Perdue names CFO");
        assert!(d.is_some());
        assert_eq!(rest, "Perdue names CFO");
        let (d, rest) = split_date_prefix("Perdue names CFO");
        assert!(d.is_none());
        assert_eq!(rest, "Perdue names CFO");
    }

    #[tokio::test]
    async fn company_without_page_is_empty() {
        let f = NewsroomFetcher::new("newsroom", HashMap::new(), reqwest::Client::new());
        let items = f.try_fetch(Some(&Company::new("Tyson Foods"))).await.unwrap();
        assert!(items.is_empty());
    }
}

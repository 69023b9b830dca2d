// src/config/mod.rs
//! Application configuration loaded from TOML or JSON.
//!
//! Lookup order:
//! 1) `$POTM_CONFIG_PATH`
//! 2) `config/potm.toml`
//! 3) `config/potm.json`
//! 4) built-in defaults
//!
//! Every section and field has a default, so a partial file is fine.

pub mod ai;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::extract::ExtractorConfig;
use crate::ingest::providers::rss::NEWS_SEARCH_RSS;
use crate::ingest::providers::search_api::NEWSAPI_EVERYTHING;
use crate::source_weights::SourceWeights;

pub use ai::{resolve_secret, DraftingConfig};

const ENV_PATH: &str = "POTM_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub extractor: ExtractorConfig,
    pub drafting: DraftingConfig,
    pub sources: SourcesConfig,
    pub source_weights: SourceWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub interval_secs: u64,
    pub source_timeout_secs: u64,
    /// Items with a known publish date older than this are skipped.
    pub days_back: u32,
    pub max_items_per_source: usize,
    /// Draft a post for every newly created announcement.
    pub auto_draft: bool,
    pub store_path: PathBuf,
    pub companies_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            source_timeout_secs: 30,
            days_back: 7,
            max_items_per_source: 50,
            auto_draft: true,
            store_path: PathBuf::from("data/store.json"),
            companies_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSource {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub max_items: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsSearchSource {
    pub enabled: bool,
    pub id: String,
    pub endpoint: String,
    /// Query templates with a `{company}` placeholder.
    pub queries: Vec<String>,
}

impl Default for NewsSearchSource {
    fn default() -> Self {
        Self {
            enabled: true,
            id: "google-news".into(),
            endpoint: NEWS_SEARCH_RSS.into(),
            queries: [
                "\"{company}\" appointed",
                "\"{company}\" names",
                "\"{company}\" promoted",
                "\"{company}\" hires",
                "\"{company}\" vice president",
                "\"{company}\" chief officer",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchApiSource {
    pub enabled: bool,
    pub id: String,
    pub endpoint: String,
    /// "ENV" means: read from NEWSAPI_KEY
    pub api_key: String,
    pub daily_limit: u32,
    pub page_size: usize,
}

impl Default for SearchApiSource {
    fn default() -> Self {
        Self {
            enabled: false,
            id: "newsapi".into(),
            endpoint: NEWSAPI_EVERYTHING.into(),
            api_key: "ENV".into(),
            daily_limit: 100,
            page_size: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsroomSource {
    pub enabled: bool,
    pub id: String,
    pub link_pattern: String,
    /// Company name (or id) -> listing page URL.
    pub pages: BTreeMap<String, String>,
}

impl Default for NewsroomSource {
    fn default() -> Self {
        let pages = [
            ("Tyson Foods", "https://www.prnewswire.com/news/tyson-foods-inc/"),
            ("Hormel Foods", "https://www.prnewswire.com/news/hormel-foods-corporation/"),
            ("Smithfield Foods", "https://www.prnewswire.com/news/smithfield-foods-inc/"),
            ("Cargill", "https://www.prnewswire.com/news/cargill/"),
            ("JBS USA", "https://www.prnewswire.com/news/jbs-usa/"),
            ("Pilgrim's Pride", "https://www.prnewswire.com/news/pilgrims-pride-corporation/"),
            ("Perdue Farms", "https://www.prnewswire.com/news/perdue-farms/"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            enabled: true,
            id: "prnewswire-company".into(),
            link_pattern: crate::ingest::providers::newsroom::DEFAULT_LINK_PATTERN.into(),
            pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub feeds: Vec<FeedSource>,
    pub news_search: NewsSearchSource,
    pub search_api: SearchApiSource,
    pub newsrooms: NewsroomSource,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        let feeds = [
            (
                "prnewswire-food",
                "PR Newswire Food & Beverages",
                "https://www.prnewswire.com/rss/food-and-beverages-industry-news.rss",
            ),
            (
                "prnewswire-personnel",
                "PR Newswire Personnel Announcements",
                "https://www.prnewswire.com/rss/personnel-announcements-news.rss",
            ),
            (
                "meatpoultry-people",
                "Meat + Poultry People",
                "https://www.meatpoultry.com/rss/topic/285-people",
            ),
            ("provisioner", "The National Provisioner", "https://www.provisioneronline.com/rss"),
            ("foodbusinessnews", "Food Business News", "https://www.foodbusinessnews.net/rss"),
            ("fooddive", "Food Dive", "https://www.fooddive.com/feeds/news/"),
            ("wattagnet", "WATTPoultry", "https://www.wattagnet.com/rss/poultry"),
        ]
        .into_iter()
        .map(|(id, name, url)| FeedSource {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            max_items: None,
        })
        .collect();
        Self {
            feeds,
            news_search: NewsSearchSource::default(),
            search_api: SearchApiSource::default(),
            newsrooms: NewsroomSource::default(),
        }
    }
}

impl AppConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, &ext)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.sanitize()?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks (see module docs).
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
        for p in ["config/potm.toml", "config/potm.json"] {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        let mut cfg = Self::default();
        cfg.sanitize()?;
        Ok(cfg)
    }

    /// Clamp out-of-range values; reject what cannot be repaired.
    pub fn sanitize(&mut self) -> Result<()> {
        self.drafting.sanitize();
        self.extractor.sanitize();
        self.source_weights.sanitize();
        if self.pipeline.interval_secs == 0 {
            bail!("pipeline.interval_secs must be positive");
        }
        if self.pipeline.source_timeout_secs == 0 {
            self.pipeline.source_timeout_secs = PipelineConfig::default().source_timeout_secs;
        }
        if self.pipeline.days_back == 0 {
            self.pipeline.days_back = 1;
        }
        if self.pipeline.max_items_per_source == 0 {
            self.pipeline.max_items_per_source = PipelineConfig::default().max_items_per_source;
        }
        let mut ids = std::collections::HashSet::new();
        for f in &self.sources.feeds {
            if !ids.insert(f.id.as_str()) {
                bail!("duplicate source id {:?}", f.id);
            }
            reqwest::Url::parse(&f.url)
                .with_context(|| format!("source {} has an invalid url", f.id))?;
        }
        Ok(())
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig> {
    match hint_ext {
        "toml" => Ok(toml::from_str(s)?),
        "json" => Ok(serde_json::from_str(s)?),
        _ => match serde_json::from_str(s) {
            Ok(v) => Ok(v),
            Err(_) => toml::from_str(s).map_err(|e| anyhow!("unsupported config format: {e}")),
        },
    }
}

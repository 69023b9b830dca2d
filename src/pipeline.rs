// src/pipeline.rs
//! One pipeline run: fetch → extract → merge → draft.
//!
//! Fetching is concurrent (one task per source). Everything after it runs
//! sequentially in this task; the cancel flag is checked before each merge so
//! a cancelled run stops between candidates, never inside one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::{counter, gauge};
use serde::Serialize;

use crate::config::AppConfig;
use crate::dedup::{Deduplicator, MergeOutcome};
use crate::drafting::PostGenerator;
use crate::error::ConfigError;
use crate::extract::EventExtractor;
use crate::ingest::providers::build_fetchers;
use crate::ingest::types::{RawItem, SourceFetcher};
use crate::ingest::{fetch_all, CancelFlag};
use crate::model::{AnnouncementId, Company};
use crate::registry::{CompanyRegistry, ImportReport};
use crate::store::Store;
use crate::workflow::WorkflowEngine;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub source_timeout: Duration,
    pub days_back: u32,
    pub auto_draft: bool,
}

impl From<&AppConfig> for PipelineSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            source_timeout: Duration::from_secs(cfg.pipeline.source_timeout_secs),
            days_back: cfg.pipeline.days_back,
            auto_draft: cfg.pipeline.auto_draft,
        }
    }
}

/// Per-run overrides.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Restrict the run to companies whose name contains this (or whose id equals it).
    pub company: Option<String>,
    pub auto_draft: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub sources: usize,
    pub items: usize,
    pub recent_items: usize,
    pub candidates: usize,
    pub created: usize,
    pub merged: usize,
    pub unchanged: usize,
    pub drafts: usize,
    pub errors: usize,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

pub struct Pipeline {
    fetchers: Vec<Arc<dyn SourceFetcher>>,
    extractor: EventExtractor,
    dedup: Deduplicator,
    store: Arc<dyn Store>,
    workflow: Arc<WorkflowEngine>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        fetchers: Vec<Arc<dyn SourceFetcher>>,
        extractor: EventExtractor,
        store: Arc<dyn Store>,
        workflow: Arc<WorkflowEngine>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            fetchers,
            extractor,
            dedup: Deduplicator::new(),
            store,
            workflow,
            settings,
        }
    }

    /// Wire every component from config around an opened store.
    pub fn from_config(cfg: &AppConfig, store: Arc<dyn Store>) -> Self {
        let generator = Arc::new(PostGenerator::from_config(&cfg.drafting));
        tracing::info!(backend = generator.backend_name(), "post generator ready");
        let workflow = Arc::new(WorkflowEngine::new(Arc::clone(&store), generator));
        let extractor = EventExtractor::new(cfg.extractor.clone(), cfg.source_weights.clone());
        Self::new(build_fetchers(cfg), extractor, store, workflow, PipelineSettings::from(cfg))
    }

    pub fn workflow(&self) -> &Arc<WorkflowEngine> {
        &self.workflow
    }

    pub async fn run_once(&self, opts: &RunOptions, cancel: &CancelFlag) -> Result<RunReport> {
        let t0 = Instant::now();
        let mut report = RunReport::default();

        let companies = self.store.list_companies().context("loading companies")?;
        let registry =
            CompanyRegistry::from_companies(companies).context("building company registry")?;
        let registry = match opts.company.as_deref() {
            Some(filter) => {
                let picked: Vec<Company> =
                    registry.find_by_name(filter).into_iter().cloned().collect();
                if picked.is_empty() {
                    return Err(ConfigError::UnknownCompany(crate::model::CompanyId::from_name(filter)))
                        .context("company filter matched nothing");
                }
                CompanyRegistry::from_companies(picked)?
            }
            None => registry,
        };
        let targets: Vec<Company> = registry.active().cloned().collect();
        if targets.is_empty() {
            tracing::warn!("no active companies; import some with `potm import`");
        }

        let round = fetch_all(&self.fetchers, &targets, self.settings.source_timeout, cancel).await;
        report.sources = round.sources;
        report.items = round.items.len();

        let recent: Vec<RawItem> = round
            .items
            .into_iter()
            .filter(|it| is_recent(it, self.settings.days_back))
            .collect();
        report.recent_items = recent.len();

        let mut candidates = Vec::new();
        for item in &recent {
            candidates.extend(self.extractor.extract(item, &registry));
        }
        report.candidates = candidates.len();
        counter!("pipeline_candidates_total").increment(candidates.len() as u64);

        let mut created: Vec<AnnouncementId> = Vec::new();
        for cand in &candidates {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            match self.dedup.ingest(self.store.as_ref(), cand) {
                Ok(MergeOutcome::Created(a)) => {
                    report.created += 1;
                    created.push(a.id);
                }
                Ok(MergeOutcome::Merged(_)) => report.merged += 1,
                Ok(MergeOutcome::Unchanged(_)) => report.unchanged += 1,
                Err(e) => {
                    report.errors += 1;
                    tracing::warn!(
                        error = %e,
                        company = %cand.company_id,
                        person = %cand.person_name,
                        "merge failed"
                    );
                }
            }
        }

        let auto_draft = opts.auto_draft.unwrap_or(self.settings.auto_draft);
        if auto_draft {
            for id in created {
                if cancel.is_cancelled() {
                    report.cancelled = true;
                    break;
                }
                match self.workflow.create_draft(id).await {
                    Ok(_) => report.drafts += 1,
                    Err(e) => {
                        report.errors += 1;
                        tracing::warn!(error = %e, announcement = %id, "draft failed");
                    }
                }
            }
        }

        report.cancelled |= round.cancelled;
        report.elapsed_ms = t0.elapsed().as_millis() as u64;
        gauge!("pipeline_last_run_ts").set(Utc::now().timestamp() as f64);
        tracing::info!(
            sources = report.sources,
            items = report.items,
            candidates = report.candidates,
            created = report.created,
            merged = report.merged,
            drafts = report.drafts,
            errors = report.errors,
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed_ms,
            "pipeline run finished"
        );
        Ok(report)
    }
}

fn is_recent(item: &RawItem, days_back: u32) -> bool {
    match item.published_at {
        Some(ts) => ts >= Utc::now() - chrono::Duration::days(i64::from(days_back)),
        None => true,
    }
}

/// Add companies to the store. Existing ids are skipped; an alias clash with any
/// known or incoming company aborts the whole import before anything is written.
pub fn import_companies(store: &dyn Store, incoming: Vec<Company>) -> Result<ImportReport> {
    let existing = store.list_companies().context("loading companies")?;
    let mut registry = CompanyRegistry::from_companies(existing)?;
    let mut report = ImportReport::default();
    let mut to_add = Vec::new();

    for c in incoming {
        report.parsed += 1;
        if registry.get(&c.id).is_some() {
            report.already_exists += 1;
            tracing::debug!(company = %c.id, "already exists, skipped");
            continue;
        }
        registry.insert(c.clone())?;
        to_add.push(c);
    }

    for c in to_add {
        let id = c.id.clone();
        store
            .insert_company(c)
            .with_context(|| format!("storing company {id}"))?;
        report.added += 1;
    }
    tracing::info!(
        parsed = report.parsed,
        added = report.added,
        already_exists = report.already_exists,
        "companies imported"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;

    fn item(published_days_ago: Option<i64>) -> RawItem {
        RawItem {
            source_id: "s".into(),
            source_name: "S".into(),
            fetched_at: Utc::now(),
            url: "https://x".into(),
            title: "t".into(),
            body_text: String::new(),
            published_at: published_days_ago.map(|d| Utc::now() - chrono::Duration::days(d)),
        }
    }

    #[test]
    fn recency_window() {
        assert!(is_recent(&item(None), 7));
        assert!(is_recent(&item(Some(2)), 7));
        assert!(!is_recent(&item(Some(30)), 7));
    }

    #[test]
    fn import_skips_known_and_rejects_alias_clash() {
        let store = LocalStore::in_memory();
        let first = vec![
            Company::new("Tyson Foods").with_aliases(["Tyson"]),
            Company::new("Hormel Foods"),
        ];
        let r = import_companies(&store, first).unwrap();
        assert_eq!((r.parsed, r.added, r.already_exists), (2, 2, 0));

        let again = vec![Company::new("Tyson Foods"), Company::new("Cargill")];
        let r = import_companies(&store, again).unwrap();
        assert_eq!((r.added, r.already_exists), (1, 1));

        let clash = vec![Company::new("Tyson Fresh Meats").with_aliases(["Tyson"])];
        let err = import_companies(&store, clash).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::DuplicateAlias { .. })
        ));
        assert_eq!(store.list_companies().unwrap().len(), 3);
    }
}

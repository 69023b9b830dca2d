// src/dedup.rs
//! Candidate → Announcement merge.
//!
//! `merge` is the pure rule; `Deduplicator::ingest` runs it against the store
//! under a single-writer lock so lookups and writes never interleave.

use std::sync::Mutex;

use chrono::Utc;
use metrics::counter;

use crate::error::StoreError;
use crate::model::{normalize_person, Announcement, AnnouncementId, AnnouncementStatus, Candidate};
use crate::store::Store;

/// Candidate title is worth taking over the current one.
pub fn is_more_specific(current: Option<&str>, candidate: &str) -> bool {
    let cand = candidate.trim();
    if cand.is_empty() {
        return false;
    }
    match current.map(str::trim).filter(|c| !c.is_empty()) {
        None => true,
        Some(cur) => {
            cand.len() > cur.len() && cand.to_lowercase().contains(&cur.to_lowercase())
        }
    }
}

/// Merge `candidate` into the matching announcement in `existing`, or start a new one.
///
/// Match: same company, same normalized person, not rejected. Returns the
/// resulting announcement and whether it is new.
pub fn merge(candidate: &Candidate, existing: &[Announcement]) -> (Announcement, bool) {
    let key = normalize_person(&candidate.person_name);
    let found = existing
        .iter()
        .find(|a| a.company_id == candidate.company_id && a.is_active() && a.person_key() == key);

    match found {
        Some(a) => (merge_into(a.clone(), candidate), false),
        None => (new_announcement(candidate), true),
    }
}

fn merge_into(mut a: Announcement, c: &Candidate) -> Announcement {
    let mut changed = false;

    if !c.source_url.is_empty() && !a.source_urls.iter().any(|u| u == &c.source_url) {
        a.source_urls.push(c.source_url.clone());
        changed = true;
    }

    let editable = a.status == AnnouncementStatus::Pending && !a.human_edited;
    if editable {
        if let Some(t) = c.new_title.as_deref() {
            if is_more_specific(a.new_title.as_deref(), t) {
                a.new_title = Some(t.trim().to_string());
                changed = true;
            }
        }
        if a.previous_title.is_none() && c.previous_title.is_some() {
            a.previous_title = c.previous_title.clone();
            changed = true;
        }
    }

    if c.confidence_score > a.confidence {
        a.confidence = c.confidence_score;
        changed = true;
    }
    if changed {
        a.updated_at = Utc::now();
    }
    a
}

fn new_announcement(c: &Candidate) -> Announcement {
    let now = Utc::now();
    Announcement {
        id: AnnouncementId::new(),
        company_id: c.company_id.clone(),
        person_name: c.person_name.trim().to_string(),
        new_title: c.new_title.clone().filter(|t| !t.trim().is_empty()),
        previous_title: c.previous_title.clone(),
        move_kind: c.move_kind,
        source_urls: if c.source_url.is_empty() {
            Vec::new()
        } else {
            vec![c.source_url.clone()]
        },
        first_seen_at: now,
        updated_at: now,
        status: AnnouncementStatus::Pending,
        human_edited: false,
        confidence: c.confidence_score,
        version: 0,
    }
}

/// What `ingest` did with one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    Created(Announcement),
    Merged(Announcement),
    Unchanged(Announcement),
}

impl MergeOutcome {
    pub fn announcement(&self) -> &Announcement {
        match self {
            MergeOutcome::Created(a) | MergeOutcome::Merged(a) | MergeOutcome::Unchanged(a) => a,
        }
    }
}

#[derive(Debug, Default)]
pub struct Deduplicator {
    writer: Mutex<()>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one candidate through the store's `find_active_by` index.
    pub fn ingest(&self, store: &dyn Store, candidate: &Candidate) -> Result<MergeOutcome, StoreError> {
        let _guard = self.writer.lock().unwrap_or_else(|p| p.into_inner());

        let key = normalize_person(&candidate.person_name);
        let existing = store.find_active_by(&candidate.company_id, &key)?;
        let (merged, is_new) = merge(candidate, existing.as_slice());

        if is_new {
            let created = store.insert_announcement(merged)?;
            counter!("pipeline_announcements_new_total").increment(1);
            tracing::info!(
                announcement = %created.id,
                company = %created.company_id,
                person = %created.person_name,
                title = created.new_title.as_deref().unwrap_or("-"),
                "new announcement"
            );
            return Ok(MergeOutcome::Created(created));
        }

        // `merge` only returns an existing match when `existing` is Some.
        let Some(before) = existing else {
            return Err(StoreError::NotFound {
                entity: "announcement",
                id: key,
            });
        };
        if merged == before {
            return Ok(MergeOutcome::Unchanged(before));
        }
        let updated = store.update_announcement(merged)?;
        counter!("pipeline_announcements_merged_total").increment(1);
        tracing::debug!(
            announcement = %updated.id,
            sources = updated.source_urls.len(),
            "candidate merged"
        );
        Ok(MergeOutcome::Merged(updated))
    }
}

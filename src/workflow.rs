// src/workflow.rs
//! Announcement review lifecycle.
//!
//! ```text
//!  pending ──edit──▶ edited ──edit──▶ edited
//!     │                 │
//!     ├──approve────────┴──approve──▶ approved ──mark posted──▶ posted
//!     └──reject─────────┴──reject───▶ rejected
//! ```
//!
//! `next_status` is the only transition table. Every write goes through
//! `Store::commit`, so a stale read fails with `PersistenceConflict` and
//! nothing changes.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use serde::Serialize;

use crate::drafting::{clean_post, PostGenerator};
use crate::error::{StoreError, WorkflowError};
use crate::model::{
    normalize_person, Announcement, AnnouncementId, AnnouncementStatus, CompanyId, Post,
    PostStatus,
};
use crate::store::{Commit, Store};

/// Field edits from a reviewer. `None` leaves the field alone.
#[derive(Debug, Clone, Default)]
pub struct AnnouncementEdit {
    pub person_name: Option<String>,
    pub new_title: Option<String>,
    pub previous_title: Option<String>,
}

impl AnnouncementEdit {
    fn is_empty(&self) -> bool {
        self.person_name.is_none() && self.new_title.is_none() && self.previous_title.is_none()
    }
}

#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    Edit(AnnouncementEdit),
    Regenerate { template_index: Option<usize> },
    Approve { by: String },
    Reject,
    MarkPosted { url: String },
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::Edit(_) => "edit",
            WorkflowEvent::Regenerate { .. } => "regenerate",
            WorkflowEvent::Approve { .. } => "approve",
            WorkflowEvent::Reject => "reject",
            WorkflowEvent::MarkPosted { .. } => "mark posted",
        }
    }
}

/// Transition table. Errors leave the caller's state untouched.
pub fn next_status(
    current: AnnouncementStatus,
    event: &WorkflowEvent,
) -> Result<AnnouncementStatus, WorkflowError> {
    use AnnouncementStatus::*;
    let open = matches!(current, Pending | Edited);
    let to = match event {
        WorkflowEvent::Edit(_) if open => Edited,
        WorkflowEvent::Regenerate { .. } if open => current,
        WorkflowEvent::Approve { .. } if open => Approved,
        WorkflowEvent::Reject if open => Rejected,
        WorkflowEvent::MarkPosted { .. } if current == Approved => Posted,
        _ => {
            return Err(WorkflowError::InvalidTransition {
                from: current,
                event: event.name(),
            })
        }
    };
    Ok(to)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowStats {
    pub pending: usize,
    pub edited: usize,
    pub approved: usize,
    pub posted: usize,
    pub rejected: usize,
}

impl WorkflowStats {
    pub fn total(&self) -> usize {
        self.pending + self.edited + self.approved + self.posted + self.rejected
    }

    /// Waiting on a reviewer.
    pub fn open(&self) -> usize {
        self.pending + self.edited
    }
}

pub struct WorkflowEngine {
    store: Arc<dyn Store>,
    generator: Arc<PostGenerator>,
}

impl WorkflowEngine {
    pub fn new(store: Arc<dyn Store>, generator: Arc<PostGenerator>) -> Self {
        Self { store, generator }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn get(&self, id: AnnouncementId) -> Result<Announcement, WorkflowError> {
        self.store
            .get_announcement(id)?
            .ok_or(WorkflowError::NotFound(id))
    }

    pub fn list_by_status(
        &self,
        status: Option<AnnouncementStatus>,
    ) -> Result<Vec<Announcement>, WorkflowError> {
        Ok(self.store.list_by_status(status)?)
    }

    /// Highest revision, if any.
    pub fn current_post(&self, id: AnnouncementId) -> Result<Option<Post>, WorkflowError> {
        Ok(self.store.posts_for(id)?.into_iter().max_by_key(|p| p.revision))
    }

    pub fn stats(&self) -> Result<WorkflowStats, WorkflowError> {
        let mut s = WorkflowStats::default();
        for a in self.store.list_by_status(None)? {
            match a.status {
                AnnouncementStatus::Pending => s.pending += 1,
                AnnouncementStatus::Edited => s.edited += 1,
                AnnouncementStatus::Approved => s.approved += 1,
                AnnouncementStatus::Posted => s.posted += 1,
                AnnouncementStatus::Rejected => s.rejected += 1,
            }
        }
        Ok(s)
    }

    pub async fn apply(
        &self,
        id: AnnouncementId,
        event: WorkflowEvent,
    ) -> Result<Announcement, WorkflowError> {
        match event {
            WorkflowEvent::Edit(edit) => self.edit(id, edit),
            WorkflowEvent::Regenerate { template_index } => {
                self.regenerate(id, template_index).await.map(|(a, _)| a)
            }
            WorkflowEvent::Approve { by } => self.approve(id, &by).await,
            WorkflowEvent::Reject => self.reject(id),
            WorkflowEvent::MarkPosted { url } => self.mark_posted(id, &url),
        }
    }

    pub fn edit(&self, id: AnnouncementId, edit: AnnouncementEdit) -> Result<Announcement, WorkflowError> {
        let mut a = self.get(id)?;
        let event = WorkflowEvent::Edit(edit.clone());
        let to = next_status(a.status, &event)?;
        if edit.is_empty() {
            return Err(WorkflowError::InvalidInput("nothing to edit".into()));
        }

        if let Some(name) = edit.person_name {
            let name = name.trim();
            if name.is_empty() {
                return Err(WorkflowError::InvalidInput("person name cannot be empty".into()));
            }
            a.person_name = name.to_string();
            if let Some(other) = self.store.find_active_by(&a.company_id, &a.person_key())? {
                if other.id != a.id {
                    return Err(person_clash(&a.person_name, &a.company_id, other.id));
                }
            }
        }
        if let Some(t) = edit.new_title {
            a.new_title = non_blank(t);
        }
        if let Some(t) = edit.previous_title {
            a.previous_title = non_blank(t);
        }
        a.human_edited = true;
        let company_id = a.company_id.clone();
        let person = a.person_name.clone();
        self.commit(a, to, &event, Vec::new(), false).map_err(|e| match e {
            // Lost a race against a merge that created the same person.
            WorkflowError::Store(StoreError::AlreadyExists { .. }) => {
                match self.store.find_active_by(&company_id, &normalize_person(&person)) {
                    Ok(Some(other)) if other.id != id => person_clash(&person, &company_id, other.id),
                    _ => e,
                }
            }
            other => other,
        })
    }

    /// New post revision; status is unchanged.
    pub async fn regenerate(
        &self,
        id: AnnouncementId,
        template_index: Option<usize>,
    ) -> Result<(Announcement, Post), WorkflowError> {
        let a = self.get(id)?;
        let event = WorkflowEvent::Regenerate { template_index };
        let to = next_status(a.status, &event)?;

        let revision = self
            .current_post(id)?
            .map(|p| p.revision + 1)
            .unwrap_or(1);
        let company = self.company_name(&a)?;
        let post = self.generator.regenerate(&a, &company, revision, template_index).await;
        let a = self.commit(a, to, &event, vec![post.clone()], false)?;
        let stored = self.current_post(id)?.unwrap_or(post);
        Ok((a, stored))
    }

    /// Approves the current post, drafting one first if there is none.
    pub async fn approve(&self, id: AnnouncementId, by: &str) -> Result<Announcement, WorkflowError> {
        let by = by.trim();
        let a = self.get(id)?;
        let event = WorkflowEvent::Approve { by: by.to_string() };
        let to = next_status(a.status, &event)?;
        if by.is_empty() {
            return Err(WorkflowError::InvalidInput("approver is required".into()));
        }

        let mut post = match self.current_post(id)? {
            Some(p) => p,
            None => {
                let company = self.company_name(&a)?;
                self.generator.generate(&a, &company).await
            }
        };
        post.status = PostStatus::Approved;
        post.approved_by = Some(by.to_string());
        post.approved_at = Some(Utc::now());
        self.commit(a, to, &event, vec![post], false)
    }

    /// Terminal; all posts are removed.
    pub fn reject(&self, id: AnnouncementId) -> Result<Announcement, WorkflowError> {
        let a = self.get(id)?;
        let event = WorkflowEvent::Reject;
        let to = next_status(a.status, &event)?;
        self.commit(a, to, &event, Vec::new(), true)
    }

    pub fn mark_posted(&self, id: AnnouncementId, url: &str) -> Result<Announcement, WorkflowError> {
        let url = url.trim();
        let a = self.get(id)?;
        let event = WorkflowEvent::MarkPosted { url: url.to_string() };
        let to = next_status(a.status, &event)?;

        let parsed = reqwest::Url::parse(url)
            .map_err(|e| WorkflowError::InvalidInput(format!("bad post url {url:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(WorkflowError::InvalidInput(format!("bad post url {url:?}")));
        }

        let mut post = self
            .current_post(id)?
            .filter(|p| p.status == PostStatus::Approved)
            .ok_or_else(|| WorkflowError::InvalidInput("no approved post to publish".into()))?;
        post.status = PostStatus::Posted;
        post.posted_at = Some(Utc::now());
        post.linkedin_url = Some(url.to_string());
        self.commit(a, to, &event, vec![post], false)
    }

    /// First draft for a fresh announcement. Returns the existing current post if there is one.
    pub async fn create_draft(&self, id: AnnouncementId) -> Result<Post, WorkflowError> {
        let a = self.get(id)?;
        if let Some(p) = self.current_post(id)? {
            return Ok(p);
        }
        if !matches!(a.status, AnnouncementStatus::Pending | AnnouncementStatus::Edited) {
            return Err(WorkflowError::InvalidTransition {
                from: a.status,
                event: "draft",
            });
        }
        let company = self.company_name(&a)?;
        let post = self.generator.generate(&a, &company).await;
        let status = a.status;
        self.store.commit(Commit {
            announcement: a,
            posts: vec![post],
            delete_posts: false,
        })?;
        counter!("workflow_transitions_total", "event" => "draft", "to" => status.as_str()).increment(1);
        self.current_post(id)?.ok_or(WorkflowError::NotFound(id))
    }

    /// Manual rewrite of the current draft's text.
    pub fn edit_post_text(&self, id: AnnouncementId, text: &str) -> Result<Post, WorkflowError> {
        let a = self.get(id)?;
        if !matches!(a.status, AnnouncementStatus::Pending | AnnouncementStatus::Edited) {
            return Err(WorkflowError::InvalidTransition {
                from: a.status,
                event: "edit post of",
            });
        }
        let text = clean_post(text);
        if text.is_empty() {
            return Err(WorkflowError::InvalidInput("post text cannot be empty".into()));
        }
        let mut post = self
            .current_post(id)?
            .ok_or_else(|| WorkflowError::InvalidInput("announcement has no draft yet".into()))?;
        post.text = text;
        let post_id = post.id;
        self.store.commit(Commit {
            announcement: a,
            posts: vec![post],
            delete_posts: false,
        })?;
        self.store
            .posts_for(id)?
            .into_iter()
            .find(|p| p.id == post_id)
            .ok_or(WorkflowError::PostNotFound(post_id))
    }

    fn commit(
        &self,
        mut a: Announcement,
        to: AnnouncementStatus,
        event: &WorkflowEvent,
        posts: Vec<Post>,
        delete_posts: bool,
    ) -> Result<Announcement, WorkflowError> {
        let from = a.status;
        a.status = to;
        a.updated_at = Utc::now();
        let saved = self.store.commit(Commit {
            announcement: a,
            posts,
            delete_posts,
        })?;
        counter!("workflow_transitions_total", "event" => event.name(), "to" => to.as_str()).increment(1);
        tracing::info!(
            announcement = %saved.id,
            from = %from,
            to = %to,
            event = event.name(),
            "workflow transition"
        );
        Ok(saved)
    }

    fn company_name(&self, a: &Announcement) -> Result<String, WorkflowError> {
        Ok(self
            .store
            .get_company(&a.company_id)?
            .map(|c| c.canonical_name)
            .unwrap_or_else(|| a.company_id.to_string()))
    }
}

fn person_clash(person: &str, company: &CompanyId, other: AnnouncementId) -> WorkflowError {
    WorkflowError::InvalidInput(format!(
        "{person} at {company} is already tracked by announcement {other}"
    ))
}

fn non_blank(s: String) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use AnnouncementStatus::*;

    #[test]
    fn transition_table() {
        let approve = WorkflowEvent::Approve { by: "ed".into() };
        let posted = WorkflowEvent::MarkPosted { url: "https://x".into() };
        let edit = WorkflowEvent::Edit(AnnouncementEdit::default());
        let regen = WorkflowEvent::Regenerate { template_index: None };

        assert_eq!(next_status(Pending, &edit).unwrap(), Edited);
        assert_eq!(next_status(Edited, &edit).unwrap(), Edited);
        assert_eq!(next_status(Edited, &regen).unwrap(), Edited);
        assert_eq!(next_status(Pending, &approve).unwrap(), Approved);
        assert_eq!(next_status(Edited, &WorkflowEvent::Reject).unwrap(), Rejected);
        assert_eq!(next_status(Approved, &posted).unwrap(), Posted);

        for ev in [&edit, &regen, &approve, &WorkflowEvent::Reject, &posted] {
            assert!(next_status(Posted, ev).is_err());
            assert!(next_status(Rejected, ev).is_err());
        }
        assert!(next_status(Pending, &posted).is_err());
        assert!(next_status(Approved, &edit).is_err());
        assert!(next_status(Approved, &WorkflowEvent::Reject).is_err());
    }

    #[test]
    fn invalid_transition_names_state_and_event() {
        let err = next_status(Posted, &WorkflowEvent::Reject).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid transition: cannot reject an announcement that is posted"
        );
    }
}

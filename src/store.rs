// src/store.rs
//! Persistence for companies, announcements and posts.
//!
//! `LocalStore` keeps everything in memory behind one mutex and, when opened
//! with a path, rewrites a JSON snapshot after every mutation (tmp file +
//! rename). Announcements and posts carry a `version`; updates are
//! compare-and-set against it and bump it by one.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{
    Announcement, AnnouncementId, AnnouncementStatus, Company, CompanyId, Post, PostId,
};

/// An atomic workflow write: one announcement plus its post changes.
#[derive(Debug, Clone)]
pub struct Commit {
    /// Must carry the version that was read; stored with version + 1.
    pub announcement: Announcement,
    /// New posts (version 0) are inserted, known ones are compare-and-set.
    pub posts: Vec<Post>,
    pub delete_posts: bool,
}

pub trait Store: Send + Sync {
    fn insert_company(&self, company: Company) -> Result<(), StoreError>;
    fn update_company(&self, company: Company) -> Result<(), StoreError>;
    fn get_company(&self, id: &CompanyId) -> Result<Option<Company>, StoreError>;
    fn list_companies(&self) -> Result<Vec<Company>, StoreError>;

    /// Insert with version 1. Fails if another active announcement owns the same person key.
    fn insert_announcement(&self, a: Announcement) -> Result<Announcement, StoreError>;
    fn get_announcement(&self, id: AnnouncementId) -> Result<Option<Announcement>, StoreError>;
    fn update_announcement(&self, a: Announcement) -> Result<Announcement, StoreError>;
    /// The single non-rejected announcement for (company, normalized person), if any.
    fn find_active_by(
        &self,
        company_id: &CompanyId,
        person_key: &str,
    ) -> Result<Option<Announcement>, StoreError>;
    /// Oldest first; `None` lists everything.
    fn list_by_status(
        &self,
        status: Option<AnnouncementStatus>,
    ) -> Result<Vec<Announcement>, StoreError>;

    fn insert_post(&self, p: Post) -> Result<Post, StoreError>;
    fn update_post(&self, p: Post) -> Result<Post, StoreError>;
    /// Ascending by revision.
    fn posts_for(&self, id: AnnouncementId) -> Result<Vec<Post>, StoreError>;
    fn delete_posts_for(&self, id: AnnouncementId) -> Result<usize, StoreError>;

    /// All-or-nothing write used by workflow transitions.
    fn commit(&self, c: Commit) -> Result<Announcement, StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    companies: BTreeMap<CompanyId, Company>,
    #[serde(default)]
    announcements: BTreeMap<AnnouncementId, Announcement>,
    #[serde(default)]
    posts: BTreeMap<PostId, Post>,
}

#[derive(Debug, Default)]
struct Inner {
    data: Snapshot,
    // (company, person key) -> active announcement
    active: HashMap<(CompanyId, String), AnnouncementId>,
}

impl Inner {
    fn rebuild_index(&mut self) {
        self.active.clear();
        for a in self.data.announcements.values() {
            if a.is_active() {
                self.active.insert((a.company_id.clone(), a.person_key()), a.id);
            }
        }
    }

    fn check_announcement(&self, a: &Announcement) -> Result<(), StoreError> {
        let stored = self
            .data
            .announcements
            .get(&a.id)
            .ok_or_else(|| not_found("announcement", a.id))?;
        if stored.version != a.version {
            return Err(StoreError::Conflict {
                entity: "announcement",
                id: a.id.to_string(),
                expected: a.version,
                found: stored.version,
            });
        }
        if a.is_active() {
            if let Some(owner) = self.active.get(&(a.company_id.clone(), a.person_key())) {
                if *owner != a.id {
                    return Err(StoreError::AlreadyExists {
                        entity: "active announcement",
                        id: format!("{}/{}", a.company_id, a.person_key()),
                    });
                }
            }
        }
        Ok(())
    }

    fn write_announcement(&mut self, mut a: Announcement) -> Announcement {
        if let Some(old) = self.data.announcements.get(&a.id) {
            let old_key = (old.company_id.clone(), old.person_key());
            if self.active.get(&old_key) == Some(&a.id) {
                self.active.remove(&old_key);
            }
        }
        a.version += 1;
        if a.is_active() {
            self.active.insert((a.company_id.clone(), a.person_key()), a.id);
        }
        self.data.announcements.insert(a.id, a.clone());
        a
    }

    fn check_post(&self, p: &Post) -> Result<(), StoreError> {
        match self.data.posts.get(&p.id) {
            None if p.version == 0 => Ok(()),
            None => Err(not_found("post", p.id)),
            Some(stored) if stored.version == p.version => Ok(()),
            Some(stored) => Err(StoreError::Conflict {
                entity: "post",
                id: p.id.to_string(),
                expected: p.version,
                found: stored.version,
            }),
        }
    }

    fn write_post(&mut self, mut p: Post) -> Post {
        p.version += 1;
        self.data.posts.insert(p.id, p.clone());
        p
    }
}

fn not_found(entity: &'static str, id: impl ToString) -> StoreError {
    StoreError::NotFound {
        entity,
        id: id.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct LocalStore {
    inner: Mutex<Inner>,
    path: Option<PathBuf>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open (or create) a snapshot-backed store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let data = match fs::read_to_string(&path) {
            Ok(s) if !s.trim().is_empty() => serde_json::from_str(&s)?,
            Ok(_) => Snapshot::default(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(e.into()),
        };
        let mut inner = Inner {
            data,
            active: HashMap::new(),
        };
        inner.rebuild_index();
        tracing::debug!(
            path = %path.display(),
            companies = inner.data.companies.len(),
            announcements = inner.data.announcements.len(),
            "store opened"
        );
        Ok(Self {
            inner: Mutex::new(inner),
            path: Some(path),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn persist(&self, inner: &Inner) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(&inner.data)?;
        let mut f = fs::File::create(&tmp)?;
        f.write_all(&json)?;
        f.sync_all()?;
        fs::rename(tmp, path)?;
        Ok(())
    }
}

impl Store for LocalStore {
    fn insert_company(&self, company: Company) -> Result<(), StoreError> {
        let mut g = self.lock();
        if g.data.companies.contains_key(&company.id) {
            return Err(StoreError::AlreadyExists {
                entity: "company",
                id: company.id.to_string(),
            });
        }
        g.data.companies.insert(company.id.clone(), company);
        self.persist(&g)
    }

    fn update_company(&self, company: Company) -> Result<(), StoreError> {
        let mut g = self.lock();
        if !g.data.companies.contains_key(&company.id) {
            return Err(not_found("company", &company.id));
        }
        g.data.companies.insert(company.id.clone(), company);
        self.persist(&g)
    }

    fn get_company(&self, id: &CompanyId) -> Result<Option<Company>, StoreError> {
        Ok(self.lock().data.companies.get(id).cloned())
    }

    fn list_companies(&self) -> Result<Vec<Company>, StoreError> {
        Ok(self.lock().data.companies.values().cloned().collect())
    }

    fn insert_announcement(&self, mut a: Announcement) -> Result<Announcement, StoreError> {
        let mut g = self.lock();
        if g.data.announcements.contains_key(&a.id) {
            return Err(StoreError::AlreadyExists {
                entity: "announcement",
                id: a.id.to_string(),
            });
        }
        if a.is_active() && g.active.contains_key(&(a.company_id.clone(), a.person_key())) {
            return Err(StoreError::AlreadyExists {
                entity: "active announcement",
                id: format!("{}/{}", a.company_id, a.person_key()),
            });
        }
        a.version = 0;
        let a = g.write_announcement(a);
        self.persist(&g)?;
        Ok(a)
    }

    fn get_announcement(&self, id: AnnouncementId) -> Result<Option<Announcement>, StoreError> {
        Ok(self.lock().data.announcements.get(&id).cloned())
    }

    fn update_announcement(&self, a: Announcement) -> Result<Announcement, StoreError> {
        let mut g = self.lock();
        g.check_announcement(&a)?;
        let a = g.write_announcement(a);
        self.persist(&g)?;
        Ok(a)
    }

    fn find_active_by(
        &self,
        company_id: &CompanyId,
        person_key: &str,
    ) -> Result<Option<Announcement>, StoreError> {
        let g = self.lock();
        Ok(g.active
            .get(&(company_id.clone(), person_key.to_string()))
            .and_then(|id| g.data.announcements.get(id))
            .cloned())
    }

    fn list_by_status(
        &self,
        status: Option<AnnouncementStatus>,
    ) -> Result<Vec<Announcement>, StoreError> {
        let g = self.lock();
        let mut out: Vec<Announcement> = g
            .data
            .announcements
            .values()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.first_seen_at.cmp(&b.first_seen_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    fn insert_post(&self, mut p: Post) -> Result<Post, StoreError> {
        let mut g = self.lock();
        if !g.data.announcements.contains_key(&p.announcement_id) {
            return Err(not_found("announcement", p.announcement_id));
        }
        if g.data.posts.contains_key(&p.id) {
            return Err(StoreError::AlreadyExists {
                entity: "post",
                id: p.id.to_string(),
            });
        }
        p.version = 0;
        let p = g.write_post(p);
        self.persist(&g)?;
        Ok(p)
    }

    fn update_post(&self, p: Post) -> Result<Post, StoreError> {
        let mut g = self.lock();
        if !g.data.posts.contains_key(&p.id) {
            return Err(not_found("post", p.id));
        }
        g.check_post(&p)?;
        let p = g.write_post(p);
        self.persist(&g)?;
        Ok(p)
    }

    fn posts_for(&self, id: AnnouncementId) -> Result<Vec<Post>, StoreError> {
        let g = self.lock();
        let mut out: Vec<Post> = g
            .data
            .posts
            .values()
            .filter(|p| p.announcement_id == id)
            .cloned()
            .collect();
        out.sort_by_key(|p| p.revision);
        Ok(out)
    }

    fn delete_posts_for(&self, id: AnnouncementId) -> Result<usize, StoreError> {
        let mut g = self.lock();
        let before = g.data.posts.len();
        g.data.posts.retain(|_, p| p.announcement_id != id);
        let removed = before - g.data.posts.len();
        if removed > 0 {
            self.persist(&g)?;
        }
        Ok(removed)
    }

    fn commit(&self, c: Commit) -> Result<Announcement, StoreError> {
        let mut g = self.lock();
        g.check_announcement(&c.announcement)?;
        if !c.delete_posts {
            for p in &c.posts {
                if p.announcement_id != c.announcement.id {
                    return Err(not_found("post for announcement", p.id));
                }
                g.check_post(p)?;
            }
        }

        let id = c.announcement.id;
        let a = g.write_announcement(c.announcement);
        if c.delete_posts {
            g.data.posts.retain(|_, p| p.announcement_id != id);
        } else {
            for p in c.posts {
                g.write_post(p);
            }
        }
        self.persist(&g)?;
        Ok(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GeneratorKind, MoveKind, PostStatus};
    use chrono::Utc;

    fn ann(company: &str, person: &str) -> Announcement {
        let now = Utc::now();
        Announcement {
            id: AnnouncementId::new(),
            company_id: CompanyId::from_name(company),
            person_name: person.into(),
            new_title: Some("COO".into()),
            previous_title: None,
            move_kind: MoveKind::Named,
            source_urls: vec!["https://example.test/a".into()],
            first_seen_at: now,
            updated_at: now,
            status: AnnouncementStatus::Pending,
            human_edited: false,
            confidence: 0.8,
            version: 0,
        }
    }

    fn post(a: &Announcement) -> Post {
        Post {
            id: PostId::new(),
            announcement_id: a.id,
            revision: 1,
            text: "Jane Smith is now COO at Tyson Foods.".into(),
            generator_kind: GeneratorKind::Template,
            template_index: Some(0),
            created_at: Utc::now(),
            status: PostStatus::Draft,
            approved_by: None,
            approved_at: None,
            posted_at: None,
            linkedin_url: None,
            version: 0,
        }
    }

    #[test]
    fn compare_and_set_detects_stale_writes() {
        let s = LocalStore::in_memory();
        let a = s.insert_announcement(ann("Tyson Foods", "Jane Smith")).unwrap();
        assert_eq!(a.version, 1);

        let mut first = a.clone();
        first.status = AnnouncementStatus::Edited;
        let first = s.update_announcement(first).unwrap();
        assert_eq!(first.version, 2);

        let mut stale = a;
        stale.status = AnnouncementStatus::Rejected;
        let err = s.update_announcement(stale).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 1, found: 2, .. }));
    }

    #[test]
    fn active_index_follows_status() {
        let s = LocalStore::in_memory();
        let a = s.insert_announcement(ann("Tyson Foods", "Jane Smith")).unwrap();
        let tyson = CompanyId::from_name("Tyson Foods");
        assert!(s.find_active_by(&tyson, "jane smith").unwrap().is_some());
        assert!(s.insert_announcement(ann("Tyson Foods", "JANE SMITH")).is_err());

        let mut rejected = a;
        rejected.status = AnnouncementStatus::Rejected;
        s.update_announcement(rejected).unwrap();
        assert!(s.find_active_by(&tyson, "jane smith").unwrap().is_none());
        assert!(s.insert_announcement(ann("Tyson Foods", "Jane Smith")).is_ok());
    }

    #[test]
    fn failed_commit_changes_nothing() {
        let s = LocalStore::in_memory();
        let a = s.insert_announcement(ann("Tyson Foods", "Jane Smith")).unwrap();
        let p = s.insert_post(post(&a)).unwrap();

        let mut stale_post = p.clone();
        stale_post.version = 7;
        stale_post.status = PostStatus::Approved;
        let mut approved = a.clone();
        approved.status = AnnouncementStatus::Approved;
        let res = s.commit(Commit {
            announcement: approved,
            posts: vec![stale_post],
            delete_posts: false,
        });
        assert!(res.is_err());
        let still = s.get_announcement(a.id).unwrap().unwrap();
        assert_eq!(still.status, AnnouncementStatus::Pending);
        assert_eq!(still.version, a.version);
        assert_eq!(s.posts_for(a.id).unwrap()[0].status, PostStatus::Draft);
    }

    #[test]
    fn snapshot_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let id = {
            let s = LocalStore::open(&path).unwrap();
            s.insert_company(Company::new("Tyson Foods")).unwrap();
            s.insert_announcement(ann("Tyson Foods", "Jane Smith")).unwrap().id
        };
        let s = LocalStore::open(&path).unwrap();
        assert_eq!(s.list_companies().unwrap().len(), 1);
        let tyson = CompanyId::from_name("Tyson Foods");
        assert_eq!(s.find_active_by(&tyson, "jane smith").unwrap().map(|a| a.id), Some(id));
    }
}

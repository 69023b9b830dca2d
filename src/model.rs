// src/model.rs
//! Core records: companies, candidates, announcements and posts.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable company identifier: a slug of the canonical name (e.g. `tyson-foods`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub String);

impl CompanyId {
    pub fn from_name(name: &str) -> Self {
        let mut slug = String::with_capacity(name.len());
        let mut dash = false;
        for ch in name.chars() {
            if ch.is_alphanumeric() {
                slug.extend(ch.to_lowercase());
                dash = false;
            } else if ch == '\'' || ch == '\u{2019}' {
                // "Pilgrim's" -> "pilgrims"
            } else if !dash && !slug.is_empty() {
                slug.push('-');
                dash = true;
            }
        }
        while slug.ends_with('-') {
            slug.pop();
        }
        Self(slug)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnouncementId(pub Uuid);

impl AnnouncementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnnouncementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnnouncementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for AnnouncementId {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub Uuid);

impl PostId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub canonical_name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub aliases: BTreeSet<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Company {
    pub fn new(canonical_name: &str) -> Self {
        Self {
            id: CompanyId::from_name(canonical_name),
            canonical_name: canonical_name.trim().to_string(),
            domain: String::new(),
            website: String::new(),
            aliases: BTreeSet::new(),
            active: true,
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = domain.trim().to_ascii_lowercase();
        if self.website.is_empty() && !self.domain.is_empty() {
            self.website = format!("https://www.{}", self.domain);
        }
        self
    }

    /// Canonical name followed by every alias.
    pub fn name_variants(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// The kind of executive move a keyword indicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MoveKind {
    Appointed,
    Promoted,
    Joined,
    Departed,
    #[default]
    Named,
}

impl MoveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MoveKind::Appointed => "appointed",
            MoveKind::Promoted => "promoted",
            MoveKind::Joined => "joined",
            MoveKind::Departed => "departed",
            MoveKind::Named => "named",
        }
    }
}

/// Unconfirmed single-source detection of an executive move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub company_id: CompanyId,
    pub person_name: String,
    pub new_title: Option<String>,
    pub previous_title: Option<String>,
    pub move_kind: MoveKind,
    pub move_keyword: String,
    pub source_id: String,
    pub source_url: String,
    pub source_text_excerpt: String,
    pub confidence_score: f32,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementStatus {
    Pending,
    Edited,
    Approved,
    Posted,
    Rejected,
}

impl AnnouncementStatus {
    pub const ALL: [AnnouncementStatus; 5] = [
        AnnouncementStatus::Pending,
        AnnouncementStatus::Edited,
        AnnouncementStatus::Approved,
        AnnouncementStatus::Posted,
        AnnouncementStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnnouncementStatus::Pending => "pending",
            AnnouncementStatus::Edited => "edited",
            AnnouncementStatus::Approved => "approved",
            AnnouncementStatus::Posted => "posted",
            AnnouncementStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AnnouncementStatus::Posted | AnnouncementStatus::Rejected)
    }
}

impl fmt::Display for AnnouncementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for AnnouncementStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown status {s:?}"))
    }
}

/// Canonical, deduplicated record of one executive move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub company_id: CompanyId,
    pub person_name: String,
    pub new_title: Option<String>,
    pub previous_title: Option<String>,
    #[serde(default)]
    pub move_kind: MoveKind,
    pub source_urls: Vec<String>,
    pub first_seen_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: AnnouncementStatus,
    #[serde(default)]
    pub human_edited: bool,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub version: u64,
}

impl Announcement {
    /// Lookup key used by the dedup index.
    pub fn person_key(&self) -> String {
        normalize_person(&self.person_name)
    }

    pub fn is_active(&self) -> bool {
        self.status != AnnouncementStatus::Rejected
    }
}

/// Case-insensitive, punctuation-stripped, whitespace-collapsed person name.
pub fn normalize_person(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for word in name.split_whitespace() {
        let cleaned: String = word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        if cleaned.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&cleaned);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    Ai,
    Template,
}

impl GeneratorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GeneratorKind::Ai => "ai",
            GeneratorKind::Template => "template",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Approved,
    Posted,
}

/// One revision of the social-media text for an announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub announcement_id: AnnouncementId,
    pub revision: u32,
    pub text: String,
    pub generator_kind: GeneratorKind,
    pub template_index: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub status: PostStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub posted_at: Option<DateTime<Utc>>,
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_slug_is_stable() {
        assert_eq!(CompanyId::from_name("Tyson Foods").as_str(), "tyson-foods");
        assert_eq!(CompanyId::from_name("Pilgrim's Pride").as_str(), "pilgrims-pride");
        assert_eq!(CompanyId::from_name("  Bell & Evans ").as_str(), "bell-evans");
        assert_eq!(CompanyId::from_name("H-E-B").as_str(), "h-e-b");
    }

    #[test]
    fn person_normalization_ignores_case_and_punctuation() {
        assert_eq!(normalize_person("Jane  Smith"), "jane smith");
        assert_eq!(normalize_person("JANE SMITH."), "jane smith");
        assert_eq!(normalize_person("John A. O'Brien"), "john a obrien");
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Posted".parse::<AnnouncementStatus>(), Ok(AnnouncementStatus::Posted));
        assert!("archived".parse::<AnnouncementStatus>().is_err());
    }
}

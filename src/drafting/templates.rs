//! Deterministic template posts, used when AI drafting fails or is disabled.
//!
//! Template choice is a pure function of the announcement id (and an optional
//! explicit index), so the same announcement always renders the same text.

use sha2::{Digest, Sha256};

use crate::model::{Announcement, AnnouncementId, MoveKind};

const APPOINTED: &[&str] = &[
    "{person} has been appointed {title} at {company}.",
    "{company} has named {person} as {title}.",
];

const PROMOTED: &[&str] = &[
    "{person} has been promoted to {title} at {company}.",
    "{company} has promoted {person} to {title}.",
];

const JOINED: &[&str] = &[
    "{person} has joined {company} as {title}.",
    "{person} joins {company} as {title}.",
];

const DEPARTED: &[&str] = &[
    "{person} has left {company}.",
    "{company} announced the departure of {person}.",
];

const DEFAULT: &[&str] = &[
    "{person} is now {title} at {company}.",
    "{company} announces {person} as {title}.",
];

// Same family sizes as the titled ones, so an index picks the same slot.
const APPOINTED_UNTITLED: &[&str] = &[
    "{person} has been appointed to a new role at {company}.",
    "{company} has appointed {person} to a new role.",
];

const PROMOTED_UNTITLED: &[&str] = &[
    "{person} has been promoted at {company}.",
    "{company} has promoted {person}.",
];

const JOINED_UNTITLED: &[&str] = &[
    "{person} has joined {company}.",
    "{person} joins {company}.",
];

const DEFAULT_UNTITLED: &[&str] = &[
    "{person} takes on a new role at {company}.",
    "{company} announces a new role for {person}.",
];

const FALLBACK_COMPANY: &str = "the company";
const HASHTAG_COUNT: usize = 5;

pub fn family(kind: MoveKind) -> &'static [&'static str] {
    match kind {
        MoveKind::Appointed => APPOINTED,
        MoveKind::Promoted => PROMOTED,
        MoveKind::Joined => JOINED,
        MoveKind::Departed => DEPARTED,
        MoveKind::Named => DEFAULT,
    }
}

/// Templates that never mention a title, for announcements without one.
pub fn untitled_family(kind: MoveKind) -> &'static [&'static str] {
    match kind {
        MoveKind::Appointed => APPOINTED_UNTITLED,
        MoveKind::Promoted => PROMOTED_UNTITLED,
        MoveKind::Joined => JOINED_UNTITLED,
        MoveKind::Departed => DEPARTED,
        MoveKind::Named => DEFAULT_UNTITLED,
    }
}

/// Stable index derived from the announcement id.
pub fn default_index(id: AnnouncementId, family_len: usize) -> usize {
    if family_len == 0 {
        return 0;
    }
    let digest = Sha256::digest(id.0.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) % family_len as u64) as usize
}

/// `#TysonFoods` style tag from alphanumeric words of the name.
pub fn company_hashtag(company_name: &str) -> Option<String> {
    let body: String = company_name
        .split_whitespace()
        .filter(|w| w.chars().all(char::is_alphanumeric))
        .map(|w| {
            let mut cs = w.chars();
            match cs.next() {
                Some(first) => first.to_uppercase().chain(cs.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect();
    (!body.is_empty()).then(|| format!("#{body}"))
}

pub fn hashtag_line(company_name: &str, defaults: &[String]) -> String {
    let mut tags: Vec<String> = Vec::with_capacity(HASHTAG_COUNT);
    if let Some(tag) = company_hashtag(company_name) {
        tags.push(tag);
    }
    for t in defaults {
        if tags.len() >= HASHTAG_COUNT {
            break;
        }
        if !tags.iter().any(|x| x.eq_ignore_ascii_case(t)) {
            tags.push(t.clone());
        }
    }
    tags.join(" ")
}

/// Render a template post. Returns the text and the index actually used.
pub fn render(
    a: &Announcement,
    company_name: &str,
    index: Option<usize>,
    hashtags: &[String],
) -> (String, usize) {
    let title = a.new_title.as_deref().and_then(non_blank);
    let fam = match title {
        Some(_) => family(a.move_kind),
        None => untitled_family(a.move_kind),
    };
    let idx = index.unwrap_or_else(|| default_index(a.id, fam.len())) % fam.len();

    let company = non_blank(company_name).unwrap_or(FALLBACK_COMPANY);
    let body = capitalize_first(
        &fam[idx]
            .replace("{person}", a.person_name.trim())
            .replace("{title}", title.unwrap_or_default())
            .replace("{company}", company),
    );
    let tags = hashtag_line(company_name, hashtags);
    let text = if tags.is_empty() {
        body
    } else {
        format!("{body}\n\n{tags}")
    };
    (text, idx)
}

fn capitalize_first(s: &str) -> String {
    let mut cs = s.chars();
    match cs.next() {
        Some(first) => first.to_uppercase().chain(cs).collect(),
        None => String::new(),
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let t = s.trim();
    (!t.is_empty()).then_some(t)
}

// src/extract/vocab.rs
//! Built-in vocabularies: move keywords, executive titles and the person-name filters.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::model::MoveKind;

/// Move phrases (lowercase, space separated) and the kind of move they signal.
pub const MOVE_KEYWORDS: &[(&str, MoveKind)] = &[
    ("appoints", MoveKind::Appointed),
    ("appointed", MoveKind::Appointed),
    ("appointment of", MoveKind::Appointed),
    ("elects", MoveKind::Appointed),
    ("elected", MoveKind::Appointed),
    ("promotes", MoveKind::Promoted),
    ("promoted", MoveKind::Promoted),
    ("promotion of", MoveKind::Promoted),
    ("elevates", MoveKind::Promoted),
    ("elevated", MoveKind::Promoted),
    ("joins", MoveKind::Joined),
    ("joined", MoveKind::Joined),
    ("to join", MoveKind::Joined),
    ("hires", MoveKind::Joined),
    ("hired", MoveKind::Joined),
    ("welcomes", MoveKind::Joined),
    ("names", MoveKind::Named),
    ("named", MoveKind::Named),
    ("taps", MoveKind::Named),
    ("tapped", MoveKind::Named),
    ("selects", MoveKind::Named),
    ("selected", MoveKind::Named),
    ("becomes", MoveKind::Named),
    ("to lead", MoveKind::Named),
    ("to head", MoveKind::Named),
    ("takes over", MoveKind::Named),
    ("succeeds", MoveKind::Named),
    ("steps down", MoveKind::Departed),
    ("stepping down", MoveKind::Departed),
    ("stepped down", MoveKind::Departed),
    ("retires", MoveKind::Departed),
    ("to retire", MoveKind::Departed),
    ("resigns", MoveKind::Departed),
    ("resigned", MoveKind::Departed),
    ("departs", MoveKind::Departed),
];

pub const EXECUTIVE_TITLES: &[&str] = &[
    // C-suite
    "CEO",
    "Chief Executive Officer",
    "President",
    "President and CEO",
    "President and Chief Executive Officer",
    "COO",
    "Chief Operating Officer",
    "CFO",
    "Chief Financial Officer",
    "CMO",
    "Chief Marketing Officer",
    "CTO",
    "Chief Technology Officer",
    "CIO",
    "Chief Information Officer",
    "CHRO",
    "Chief Human Resources Officer",
    "Chief People Officer",
    "Chief Supply Chain Officer",
    "Chief Commercial Officer",
    "Chief Revenue Officer",
    "Chief Sales Officer",
    "Chief Strategy Officer",
    "Chief Sustainability Officer",
    "Chief Legal Officer",
    "General Counsel",
    // VP level
    "Vice President",
    "VP",
    "SVP",
    "Senior Vice President",
    "EVP",
    "Executive Vice President",
    "Group Vice President",
    "Regional Vice President",
    // Director level
    "Director",
    "Senior Director",
    "Executive Director",
    "Managing Director",
    "Regional Director",
    // General management
    "General Manager",
    "Plant Manager",
    "Division President",
    "Business Unit President",
    // Board
    "Chairman",
    "Chairwoman",
    "Chair",
    "Board Member",
    "Board Director",
];

/// Phrases after which a title describes the person's previous role.
pub const PREVIOUS_TITLE_MARKERS: &[&str] = &[
    "formerly",
    "former",
    "previously served as",
    "previously",
    "most recently served as",
    "most recently",
    "who served as",
    "steps down as",
    "stepping down as",
    "stepped down as",
    "retires as",
    "succeeds",
];

/// Publications and phrases that look like names but never are.
pub static FALSE_POSITIVE_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "supermarket news",
        "progressive grocer",
        "grocery dive",
        "food dive",
        "meat poultry",
        "reuters",
        "associated press",
        "ap news",
        "business wire",
        "pr newswire",
        "globe newswire",
        "yahoo finance",
        "wall street journal",
        "new york times",
        "fox business",
        "food business news",
        "food navigator",
        "the packer",
        "produce news",
        "watt poultry",
        "national provisioner",
        "perishable news",
        "spectrum news",
        "industry dive",
        "press release",
        "news release",
        "breaking news",
        "read more",
        "click here",
        "learn more",
        "see more",
        "view all",
        "president trump",
        "president biden",
        "president obama",
        "takes helm",
        "kraft heinz",
        "general mills",
        "coca cola",
        "top executive",
        "senior executive",
        "board member",
        "board director",
        "united states",
        "north america",
        "new york",
        "los angeles",
    ]
    .into_iter()
    .collect()
});

pub static INVALID_FIRST_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "new", "former", "current", "acting", "interim", "its", "their", "our",
        "your", "his", "her", "this", "that", "brings", "quietly", "business", "supermarket",
        "progressive", "grocery", "food", "meat", "industry", "company", "corporate", "executive",
        "president", "investment", "retail", "wholesale", "breaking", "just", "press", "news",
        "warns", "settled", "takes", "steps", "moves", "stepping", "read", "click", "learn", "see",
        "view", "get", "how", "why", "what", "when", "where", "who", "which", "here", "there",
        "vet", "veteran", "longtime", "seasoned", "senior", "junior", "chief", "director",
        "manager", "head", "leader", "founder", "owner", "mr", "mrs", "ms", "dr", "today",
    ]
    .into_iter()
    .collect()
});

pub static INVALID_LAST_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "news", "grocer", "dive", "wire", "times", "journal", "post", "tribune", "herald",
        "gazette", "press", "media", "report", "foods", "farms", "inc", "corp", "corporation",
        "company", "co", "llc", "ltd", "group", "holdings", "brands", "products", "experience",
        "chief", "executive", "lawsuit", "helm", "up", "down", "on", "off", "out", "in", "here",
        "there", "promoted", "appointed", "named", "hired", "takes", "joins", "becomes", "steps",
        "moves", "brings",
    ]
    .into_iter()
    .collect()
});

/// Second words that mark a publication or company ("X News", "X Foods").
pub static PUBLICATION_SECOND_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "news", "dive", "wire", "grocer", "times", "journal", "post", "tribune", "herald",
        "gazette", "foods", "farms", "brands", "executive",
    ]
    .into_iter()
    .collect()
});

/// Lowercase words that end a run of capitalized tokens even when capitalized.
pub static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "and", "or", "of", "for", "at", "in", "on", "to", "as", "its", "their",
        "new", "next", "former", "with", "from", "by", "has", "have", "had", "was", "is", "will",
        "be", "been", "who", "which", "that", "this", "he", "she", "they", "his", "her", "our",
        "we", "after", "before", "effective", "today", "monday", "tuesday", "wednesday",
        "thursday", "friday", "saturday", "sunday", "january", "february", "march", "april",
        "june", "july", "august", "september", "october", "november", "december", "inc", "corp",
        "llc", "ltd", "co", "company", "announces", "announced", "said", "says",
    ]
    .into_iter()
    .collect()
});

/// Word can never be part of a person name.
pub fn is_blocked_name_word(lower: &str) -> bool {
    STOP_WORDS.contains(lower) || KEYWORD_WORDS.contains(lower) || TITLE_WORDS.contains(lower)
}

static KEYWORD_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    MOVE_KEYWORDS
        .iter()
        .flat_map(|(p, _)| p.split(' '))
        .filter(|w| w.len() > 2)
        .collect()
});

static TITLE_WORDS: Lazy<HashSet<String>> = Lazy::new(|| {
    EXECUTIVE_TITLES
        .iter()
        .flat_map(|t| t.split(' '))
        .map(str::to_lowercase)
        .filter(|w| w.len() > 1 && w != "and" && w != "general")
        .collect()
});

/// Validity checks on a candidate person span (2-4 words, already split).
pub fn is_valid_person_name(words: &[&str]) -> bool {
    if !(2..=4).contains(&words.len()) {
        return false;
    }
    let lower: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
    let joined = lower.join(" ");
    if FALSE_POSITIVE_NAMES.contains(joined.as_str()) {
        return false;
    }
    if INVALID_FIRST_WORDS.contains(lower[0].as_str()) {
        return false;
    }
    if lower
        .last()
        .is_some_and(|l| INVALID_LAST_WORDS.contains(l.as_str()))
    {
        return false;
    }
    if words[0].len() > 1 && words[0].chars().all(|c| !c.is_lowercase()) {
        return false;
    }
    if PUBLICATION_SECOND_WORDS.contains(lower[1].as_str()) {
        return false;
    }
    // Full names need at least two words longer than an initial.
    words.iter().filter(|w| w.chars().count() > 1).count() >= 2
}

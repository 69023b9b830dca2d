// src/extract/mod.rs
//! Executive-move extraction: RawItem → Candidates.
//!
//! Rule-based and windowed. Around every company mention the extractor looks
//! for a person-name span and a move keyword close to each other, then for an
//! executive title near the pair. Nothing is emitted without all of company,
//! person and keyword. Zero candidates is the normal outcome for most items.

pub mod scoring;
pub mod tokens;
pub mod vocab;

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::ingest::normalize_text;
use crate::ingest::types::RawItem;
use crate::model::{normalize_person, Candidate, CompanyId, MoveKind};
use crate::registry::CompanyRegistry;
use crate::source_weights::{clamp01, SourceWeights};

use scoring::{confidence, proximity_score, ConfidenceWeights, ScoreInputs};
use tokens::{joined, phrase_at, tokenize, Token};
use vocab::{
    is_blocked_name_word, is_valid_person_name, EXECUTIVE_TITLES, INVALID_FIRST_WORDS,
    INVALID_LAST_WORDS, MOVE_KEYWORDS, PREVIOUS_TITLE_MARKERS,
};

/// Additional move phrase supplied by configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub phrase: String,
    #[serde(default)]
    pub kind: MoveKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Tokens taken on each side of a company mention.
    pub window_tokens: usize,
    /// Max tokens between a person span and its move keyword.
    pub keyword_distance: usize,
    /// Candidates below this are flagged in review; never dropped.
    pub min_confidence: f32,
    pub excerpt_chars: usize,
    pub weights: ConfidenceWeights,
    pub extra_keywords: Vec<KeywordRule>,
    pub extra_titles: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            window_tokens: 15,
            keyword_distance: 8,
            min_confidence: 0.30,
            excerpt_chars: 300,
            weights: ConfidenceWeights::default(),
            extra_keywords: Vec::new(),
            extra_titles: Vec::new(),
        }
    }
}

impl ExtractorConfig {
    pub fn sanitize(&mut self) {
        self.window_tokens = self.window_tokens.max(1);
        self.keyword_distance = self.keyword_distance.max(1);
        self.min_confidence = clamp01(self.min_confidence);
        self.excerpt_chars = self.excerpt_chars.max(40);
        self.weights.sanitize();
    }
}

#[derive(Debug, Clone, Copy)]
struct Span {
    first: usize,
    last: usize,
}

impl Span {
    fn contains(&self, i: usize) -> bool {
        self.first <= i && i <= self.last
    }

    /// Tokens strictly between two non-overlapping spans.
    fn gap_to(&self, other: &Span) -> usize {
        if other.first > self.last {
            other.first - self.last - 1
        } else if self.first > other.last {
            self.first - other.last - 1
        } else {
            0
        }
    }
}

#[derive(Debug, Clone)]
struct KeywordHit {
    span: Span,
    kind: MoveKind,
}

#[derive(Debug, Clone)]
struct PreviousTitle {
    marker: usize,
    span: Span,
}

pub struct EventExtractor {
    cfg: ExtractorConfig,
    source_weights: SourceWeights,
    // Lowercase phrases, most words first so the longest match wins.
    keywords: Vec<(String, MoveKind)>,
    titles: Vec<String>,
    markers: Vec<String>,
}

impl EventExtractor {
    pub fn new(mut cfg: ExtractorConfig, source_weights: SourceWeights) -> Self {
        cfg.sanitize();

        let mut keywords: Vec<(String, MoveKind)> = MOVE_KEYWORDS
            .iter()
            .map(|(p, k)| (p.to_string(), *k))
            .chain(cfg.extra_keywords.iter().map(|r| (phrase_key(&r.phrase), r.kind)))
            .filter(|(p, _)| !p.is_empty())
            .collect();
        keywords.sort_by_key(|(p, _)| std::cmp::Reverse(p.split(' ').count()));
        keywords.dedup_by(|a, b| a.0 == b.0);

        let mut titles: Vec<String> = EXECUTIVE_TITLES
            .iter()
            .map(|t| phrase_key(t))
            .chain(cfg.extra_titles.iter().map(|t| phrase_key(t)))
            .filter(|t| !t.is_empty())
            .collect();
        titles.sort_by_key(|t| std::cmp::Reverse(t.split(' ').count()));
        titles.dedup();

        let mut markers: Vec<String> = PREVIOUS_TITLE_MARKERS.iter().map(|m| m.to_string()).collect();
        markers.sort_by_key(|m| std::cmp::Reverse(m.split(' ').count()));

        Self {
            cfg,
            source_weights,
            keywords,
            titles,
            markers,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.cfg
    }

    /// All candidates in `item`, at most one per (company, person).
    pub fn extract(&self, item: &RawItem, registry: &CompanyRegistry) -> Vec<Candidate> {
        let title = normalize_text(&item.title);
        let body = normalize_text(&item.body_text);
        let text = match (title.is_empty(), body.is_empty()) {
            (_, true) => title.clone(),
            (true, false) => body,
            (false, false) => format!("{title}. {body}"),
        };
        let headline_end = title.len();

        let mentions = registry.mentions(&text);
        if mentions.is_empty() {
            return Vec::new();
        }
        let toks = tokenize(&text);
        if toks.is_empty() {
            return Vec::new();
        }

        let mut company_tok = vec![false; toks.len()];
        let mut mention_spans: Vec<(CompanyId, Span)> = Vec::with_capacity(mentions.len());
        for m in &mentions {
            let covered: Vec<usize> = toks
                .iter()
                .filter(|t| t.start < m.end && t.end > m.start)
                .map(|t| t.index)
                .collect();
            let (Some(&first), Some(&last)) = (covered.first(), covered.last()) else {
                continue;
            };
            for &i in &covered {
                company_tok[i] = true;
            }
            mention_spans.push((m.company_id.clone(), Span { first, last }));
        }

        let keywords = self.keyword_hits(&toks);
        if keywords.is_empty() {
            return Vec::new();
        }
        let previous = self.previous_titles(&text, &toks, &company_tok);
        let persons = person_spans(&text, &toks, &company_tok);
        if persons.is_empty() {
            return Vec::new();
        }

        let reliability = self
            .source_weights
            .weight_for(&item.source_id)
            .max(self.source_weights.weight_for(&item.source_name));
        let kd = self.cfg.keyword_distance;
        let w = self.cfg.window_tokens;

        let mut order: Vec<(CompanyId, String)> = Vec::new();
        let mut best: HashMap<(CompanyId, String), Candidate> = HashMap::new();

        for (company_id, mention) in &mention_spans {
            let lo = mention.first.saturating_sub(w);
            let hi = (mention.last + w).min(toks.len() - 1);
            let in_window = |s: &Span| s.first >= lo && s.last <= hi;

            for person in persons.iter().filter(|p| in_window(p)) {
                let Some(kw) = keywords
                    .iter()
                    .filter(|k| in_window(&k.span) && person.gap_to(&k.span) <= kd)
                    .min_by_key(|k| person.gap_to(&k.span))
                else {
                    continue;
                };

                let prev = previous
                    .iter()
                    .filter(|p| {
                        p.marker + kd >= person.first && p.marker <= person.last + kd
                    })
                    .min_by_key(|p| p.marker.abs_diff(person.last));
                let nearest =
                    self.nearest_title(&text, &toks, &company_tok, person, &kw.span, &previous);
                let mut previous_title = prev.map(|p| slice(&text, &toks, &p.span).to_string());
                // A departure has no new role; the title near it is the one being left.
                let new_title = if kw.kind == MoveKind::Departed {
                    if previous_title.is_none() {
                        previous_title = nearest;
                    }
                    None
                } else {
                    nearest
                };

                let in_headline = |s: &Span| toks[s.last].end <= headline_end;
                let inputs = ScoreInputs::new(
                    proximity_score(person.gap_to(&kw.span), kd),
                    if new_title.is_some() { 1.0 } else { 0.0 },
                    reliability,
                    if in_headline(person) && in_headline(&kw.span) {
                        1.0
                    } else {
                        0.0
                    },
                );
                let score = confidence(&inputs, &self.cfg.weights);

                let person_name = strip_possessive(slice(&text, &toks, person)).to_string();
                let key = (company_id.clone(), normalize_person(&person_name));
                let candidate = Candidate {
                    company_id: company_id.clone(),
                    person_name,
                    new_title,
                    previous_title,
                    move_kind: kw.kind,
                    move_keyword: slice(&text, &toks, &kw.span).to_string(),
                    source_id: item.source_id.clone(),
                    source_url: item.url.clone(),
                    source_text_excerpt: excerpt(&text, &toks, lo, hi, self.cfg.excerpt_chars),
                    confidence_score: score,
                    detected_at: Utc::now(),
                };

                match best.remove(&key) {
                    Some(existing) => {
                        best.insert(key, combine(existing, candidate));
                    }
                    None => {
                        order.push(key.clone());
                        best.insert(key, candidate);
                    }
                }
            }
        }

        let out: Vec<Candidate> = order.into_iter().filter_map(|k| best.remove(&k)).collect();
        if !out.is_empty() {
            tracing::debug!(
                source = %item.source_id,
                url = %item.url,
                candidates = out.len(),
                "candidates extracted"
            );
        }
        out
    }

    fn keyword_hits(&self, toks: &[Token]) -> Vec<KeywordHit> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < toks.len() {
            let hit = self
                .keywords
                .iter()
                .find_map(|(p, k)| phrase_at(toks, i, p).map(|n| (n, *k)));
            match hit {
                Some((n, kind)) => {
                    out.push(KeywordHit {
                        span: Span {
                            first: i,
                            last: i + n - 1,
                        },
                        kind,
                    });
                    i += n;
                }
                None => i += 1,
            }
        }
        out
    }

    /// Longest title phrase at `at`, extended by "of <Word>..." when present.
    fn title_at(&self, text: &str, toks: &[Token], company_tok: &[bool], at: usize) -> Option<Span> {
        if company_tok.get(at).copied().unwrap_or(true) {
            return None;
        }
        let n = self.titles.iter().find_map(|t| phrase_at(toks, at, t))?;
        let mut last = at + n - 1;
        if company_tok[at..=last].iter().any(|&c| c) {
            return None;
        }

        // "Vice President of Sales", "VP of R&D"; never into a company name.
        if toks.get(last + 1).is_some_and(|t| t.lower == "of") {
            let mut ext = last + 1;
            let mut words = 0;
            while let Some(t) = toks.get(ext + 1) {
                let prev = &toks[ext];
                let gap = &text[prev.end..t.start];
                let glued = matches!(gap.trim(), "" | "&");
                let wordy = t.is_capitalized() || t.is_initial() || (t.lower == "and" && words > 0);
                if !glued || !wordy || company_tok[t.index] || words >= 4 {
                    break;
                }
                ext += 1;
                words += 1;
            }
            // Trailing "and" is not part of the title.
            while ext > last + 1 && toks[ext].lower == "and" {
                ext -= 1;
            }
            if ext > last + 1 {
                last = ext;
            }
        }
        Some(Span { first: at, last })
    }

    fn previous_titles(&self, text: &str, toks: &[Token], company_tok: &[bool]) -> Vec<PreviousTitle> {
        const SKIP: &[&str] = &["the", "a", "an", "its", "company's", "served", "as", "of", "our"];
        let mut out = Vec::new();
        for i in 0..toks.len() {
            let Some(n) = self.markers.iter().find_map(|m| phrase_at(toks, i, m)) else {
                continue;
            };
            let mut j = i + n;
            while toks.get(j).is_some_and(|t| SKIP.contains(&t.lower.as_str())) {
                j += 1;
            }
            if let Some(span) = self.title_at(text, toks, company_tok, j) {
                out.push(PreviousTitle { marker: i, span });
            }
        }
        out
    }

    fn nearest_title(
        &self,
        text: &str,
        toks: &[Token],
        company_tok: &[bool],
        person: &Span,
        keyword: &Span,
        previous: &[PreviousTitle],
    ) -> Option<String> {
        let kd = self.cfg.keyword_distance;
        let lo = person.first.min(keyword.first).saturating_sub(kd);
        let hi = (person.last.max(keyword.last) + kd).min(toks.len() - 1);

        let mut best: Option<Span> = None;
        let mut i = lo;
        while i <= hi {
            let blocked = person.contains(i)
                || keyword.contains(i)
                || previous.iter().any(|p| p.span.contains(i));
            if blocked {
                i += 1;
                continue;
            }
            if let Some(span) = self.title_at(text, toks, company_tok, i) {
                let len = span.last - span.first;
                let better = match best {
                    None => true,
                    Some(b) => {
                        let blen = b.last - b.first;
                        len > blen || (len == blen && span.gap_to(person) < b.gap_to(person))
                    }
                };
                if better {
                    best = Some(span);
                }
                i = span.last + 1;
            } else {
                i += 1;
            }
        }
        best.map(|s| slice(text, toks, &s).to_string())
    }
}

/// Keep the higher-scoring mention, filling titles it lacks from the other.
fn combine(a: Candidate, b: Candidate) -> Candidate {
    let (mut keep, other) = if b.confidence_score > a.confidence_score {
        (b, a)
    } else {
        (a, b)
    };
    if keep.new_title.is_none() {
        keep.new_title = other.new_title;
    }
    if keep.previous_title.is_none() {
        keep.previous_title = other.previous_title;
    }
    keep
}

fn phrase_key(s: &str) -> String {
    tokenize(s)
        .into_iter()
        .map(|t| t.lower)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs of 2-4 capitalized, non-company, non-vocabulary tokens that pass the name filters.
fn person_spans(text: &str, toks: &[Token], company_tok: &[bool]) -> Vec<Span> {
    let nameish = |t: &Token| {
        !company_tok[t.index]
            && (t.is_initial() || (t.is_capitalized() && !is_blocked_name_word(&t.lower)))
    };

    let mut out = Vec::new();
    let mut i = 0;
    while i < toks.len() {
        if !nameish(&toks[i]) {
            i += 1;
            continue;
        }
        let mut end = i;
        while end + 1 < toks.len() && nameish(&toks[end + 1]) && joined(text, &toks[end], &toks[end + 1]) {
            end += 1;
        }

        let (mut s, mut e) = (i, end);
        while s < e && INVALID_FIRST_WORDS.contains(toks[s].lower.as_str()) {
            s += 1;
        }
        while e > s && INVALID_LAST_WORDS.contains(toks[e].lower.as_str()) {
            e -= 1;
        }
        let words: Vec<&str> = toks[s..=e]
            .iter()
            .map(|t| strip_possessive(&t.text))
            .collect();
        if is_valid_person_name(&words) {
            out.push(Span { first: s, last: e });
        }
        i = end + 1;
    }
    out
}

fn slice<'a>(text: &'a str, toks: &[Token], s: &Span) -> &'a str {
    &text[toks[s.first].start..toks[s.last].end]
}

fn strip_possessive(s: &str) -> &str {
    s.strip_suffix("'s")
        .or_else(|| s.strip_suffix("’s"))
        .unwrap_or(s)
}

fn excerpt(text: &str, toks: &[Token], lo: usize, hi: usize, max_chars: usize) -> String {
    let raw = &text[toks[lo].start..toks[hi].end];
    if raw.chars().count() <= max_chars {
        return raw.to_string();
    }
    let mut s: String = raw.chars().take(max_chars.saturating_sub(3)).collect();
    s.push_str("...");
    s
}

//! # Source Weights
//!
//! Reliability weight in `[0.0, 1.0]` per source, keyed by feed id or
//! publication name ("prnewswire-food", "Meat + Poultry"). Feeds the
//! `source` component of the extractor's confidence score.
//!
//! Keys are compared after [`normalize`]: lowercase, punctuation and dashes
//! folded to single spaces. A config section overlays the built-in seed
//! instead of replacing it (see [`SourceWeights::sanitize`]).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceWeights {
    /// Weight when nothing matches.
    pub default_weight: f32,
    /// Canonical source key -> weight.
    pub weights: HashMap<String, f32>,
    /// Alternative spelling -> canonical source key.
    pub aliases: HashMap<String, String>,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self::seed()
    }
}

/// Wire services and company newsrooms rank above trade press, which ranks
/// above aggregated search results.
const SEED_WEIGHTS: &[(&str, f32)] = &[
    ("prnewswire", 0.90),
    ("business wire", 0.90),
    ("globenewswire", 0.88),
    ("newsroom", 0.95),
    ("meatpoultry", 0.80),
    ("provisioner", 0.78),
    ("foodbusinessnews", 0.78),
    ("fooddive", 0.75),
    ("grocerydive", 0.75),
    ("wattagnet", 0.75),
    ("supermarket news", 0.72),
    ("newsapi", 0.70),
    ("google news", 0.60),
];

const SEED_ALIASES: &[(&str, &str)] = &[
    ("pr newswire", "prnewswire"),
    ("businesswire", "business wire"),
    ("meat + poultry", "meatpoultry"),
    ("meat poultry", "meatpoultry"),
    ("the national provisioner", "provisioner"),
    ("food business news", "foodbusinessnews"),
    ("food dive", "fooddive"),
    ("grocery dive", "grocerydive"),
    ("wattpoultry", "wattagnet"),
    ("google", "google news"),
];

const SEED_DEFAULT: f32 = 0.60;

impl SourceWeights {
    pub fn seed() -> Self {
        Self {
            default_weight: SEED_DEFAULT,
            weights: SEED_WEIGHTS
                .iter()
                .map(|&(k, w)| (k.to_string(), w))
                .collect(),
            aliases: SEED_ALIASES
                .iter()
                .map(|&(a, c)| (a.to_string(), c.to_string()))
                .collect(),
        }
    }

    /// Normalize keys, clamp weights and fill in seed entries the
    /// configuration does not mention. Configured entries win.
    pub fn sanitize(&mut self) {
        let weights = std::mem::take(&mut self.weights);
        self.weights = weights
            .into_iter()
            .map(|(k, w)| (normalize(&k), clamp01(w)))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        let aliases = std::mem::take(&mut self.aliases);
        self.aliases = aliases
            .into_iter()
            .map(|(a, c)| (normalize(&a), normalize(&c)))
            .filter(|(a, c)| !a.is_empty() && !c.is_empty())
            .collect();

        for &(k, w) in SEED_WEIGHTS {
            self.weights.entry(normalize(k)).or_insert(w);
        }
        for &(a, c) in SEED_ALIASES {
            self.aliases.entry(normalize(a)).or_insert_with(|| normalize(c));
        }
        self.default_weight = clamp01(self.default_weight);
    }

    /// Weight for a source id or name: alias, then exact key, then the
    /// longest key contained in the name ("tyson foods newsroom" -> "newsroom"),
    /// then `default_weight`.
    pub fn weight_for(&self, source: &str) -> f32 {
        let key = normalize(source);
        let canonical = self.aliases.get(&key).map(|c| normalize(c));

        let exact = canonical
            .as_deref()
            .and_then(|c| self.weights.get(c))
            .or_else(|| self.weights.get(&key))
            .copied();

        let w = exact.or_else(|| {
            self.weights
                .iter()
                .filter(|(k, _)| !k.is_empty() && key.contains(k.as_str()))
                .max_by_key(|(k, _)| k.len())
                .map(|(_, &w)| w)
        });

        clamp01(w.unwrap_or(self.default_weight))
    }
}

/// Lowercase, fold dashes and punctuation to spaces, collapse whitespace.
fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|ch| match ch {
            '\u{2014}' | '\u{2013}' | '-' | '_' | '/' | '\\' | '.' | ',' | '\'' | '\u{2019}' => ' ',
            c if c.is_whitespace() => ' ',
            c => c,
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn clamp01(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

//! Confidence scoring for extracted candidates.
//!
//! `ScoreInputs` holds four normalized signals in [0,1]:
//! - `proximity`  : how close the person is to the move keyword
//! - `title`      : an executive title was found near the pair
//! - `source`     : reliability of the source (see `SourceWeights`)
//! - `headline`   : person and keyword both appear in the item title
//!
//! confidence = clamp01(base + Σ wᵢ·xᵢ). Monotone in every input.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub base: f32,
    pub proximity: f32,
    pub title: f32,
    pub source: f32,
    pub headline: f32,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            base: 0.20,
            proximity: 0.25,
            title: 0.20,
            source: 0.20,
            headline: 0.15,
        }
    }
}

impl ConfidenceWeights {
    /// Negative weights would break monotonicity; clamp them to zero.
    pub fn sanitize(&mut self) {
        for w in [
            &mut self.base,
            &mut self.proximity,
            &mut self.title,
            &mut self.source,
            &mut self.headline,
        ] {
            if !w.is_finite() || *w < 0.0 {
                *w = 0.0;
            }
        }
    }
}

/// Normalized inputs in [0,1].
#[derive(Clone, Copy, Debug, Default)]
pub struct ScoreInputs {
    pub proximity: f32,
    pub title: f32,
    pub source: f32,
    pub headline: f32,
}

impl ScoreInputs {
    /// Safe constructor with clamping.
    pub fn new(proximity: f32, title: f32, source: f32, headline: f32) -> Self {
        fn c(x: f32) -> f32 {
            x.clamp(0.0, 1.0)
        }
        Self {
            proximity: c(proximity),
            title: c(title),
            source: c(source),
            headline: c(headline),
        }
    }
}

/// 1.0 when adjacent, falling linearly to 0 just past `max_distance`.
pub fn proximity_score(distance: usize, max_distance: usize) -> f32 {
    1.0 - distance as f32 / (max_distance as f32 + 1.0)
}

pub fn confidence(inputs: &ScoreInputs, w: &ConfidenceWeights) -> f32 {
    let raw = w.base
        + inputs.proximity * w.proximity
        + inputs.title * w.title
        + inputs.source * w.source
        + inputs.headline * w.headline;
    raw.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotone_in_each_input() {
        let w = ConfidenceWeights::default();
        let lo = confidence(&ScoreInputs::new(0.2, 0.0, 0.5, 0.0), &w);
        let hi = confidence(&ScoreInputs::new(0.9, 0.0, 0.5, 0.0), &w);
        assert!(hi > lo);
        let titled = confidence(&ScoreInputs::new(0.2, 1.0, 0.5, 0.0), &w);
        assert!(titled > lo);
    }

    #[test]
    fn clamped_to_unit_interval() {
        let w = ConfidenceWeights {
            base: 0.9,
            proximity: 0.9,
            ..ConfidenceWeights::default()
        };
        assert_eq!(confidence(&ScoreInputs::new(1.0, 1.0, 1.0, 1.0), &w), 1.0);
    }

    #[test]
    fn proximity_decays() {
        assert_eq!(proximity_score(0, 8), 1.0);
        assert!(proximity_score(8, 8) > 0.0);
        assert!(proximity_score(4, 8) < proximity_score(1, 8));
    }
}

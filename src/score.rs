//! Attribute scoring: candidate → per-dimension scores in `[0, 1]`.
//!
//! Every dimension is scored by a rubric: a base value plus the weights of
//! the lexical markers found in the candidate's keyword, alt text and
//! description (case-insensitive substring match), clamped to range.
//!
//! ```text
//! lexical = clamp(base + Σ weightᵢ·[markerᵢ present])
//! score   = clamp((1 − w)·lexical + w·(1 − temperature(dominant color)))
//! ```
//!
//! `w` is the rubric's `color_weight`; with the stock tables only calm uses
//! it, so cool dominant colors read as calmer. Bipolar rubrics (valence,
//! arousal) range over `[-1, 1]`; the raw value is kept as [`Affect`] and the
//! score map holds `(raw + 1) / 2`.
//!
//! Sector overrides are applied once per request by [`RubricSet::for_sector`].
//! There is no hidden state: the same candidate always scores the same.

use crate::color::{ColorError, Rgb, color_temperature_rgb, hex_to_rgb, parse_or_neutral};
use crate::config::{EngineConfig, OverrideMode, Rubric, RubricOverride, SectionWeights};
use crate::provider::RetrievedCandidate;
use crate::types::{Affect, AttributeScores, Candidate, Dimension, affect_to_unit};
use std::collections::BTreeMap;

/// Temperature at or below which a dominant color counts as cool.
const COOL_TONE_MAX: f64 = 0.3;
/// Temperature at or above which a dominant color counts as warm.
const WARM_TONE_MIN: f64 = 0.6;

pub const TAG_COOL_TONE: &str = "cool-tone";
pub const TAG_WARM_TONE: &str = "warm-tone";
pub const TAG_PSYCHOLOGY_OPTIMIZED: &str = "psychology-optimized";

/// A rubric after sector overrides, with markers lowercased for matching.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRubric {
    pub dimension: Dimension,
    pub base: f64,
    pub bipolar: bool,
    pub color_weight: f64,
    pub tag: Option<String>,
    pub markers: BTreeMap<String, f64>,
}

impl ResolvedRubric {
    fn compose(dimension: Dimension, base: &Rubric, sector: Option<&RubricOverride>) -> Self {
        let lowered = |markers: &BTreeMap<String, f64>| -> BTreeMap<String, f64> {
            markers
                .iter()
                .map(|(m, w)| (m.trim().to_lowercase(), *w))
                .filter(|(m, _)| !m.is_empty())
                .collect()
        };

        let Some(sector) = sector else {
            return Self {
                dimension,
                base: base.base,
                bipolar: base.bipolar,
                color_weight: base.color_weight,
                tag: base.tag.clone(),
                markers: lowered(&base.markers),
            };
        };

        let markers = match sector.mode {
            OverrideMode::Extend => {
                let mut merged = lowered(&base.markers);
                merged.extend(lowered(&sector.markers));
                merged
            }
            OverrideMode::Replace => lowered(&sector.markers),
        };
        Self {
            dimension,
            base: sector.base.unwrap_or(base.base),
            bipolar: base.bipolar,
            color_weight: sector.color_weight.unwrap_or(base.color_weight),
            tag: sector.tag.clone().or_else(|| base.tag.clone()),
            markers,
        }
    }

    fn neutral(dimension: Dimension) -> Self {
        Self {
            dimension,
            base: if dimension.is_affect() { 0.0 } else { 0.5 },
            bipolar: dimension.is_affect(),
            color_weight: 0.0,
            tag: None,
            markers: BTreeMap::new(),
        }
    }

    fn lower_bound(&self) -> f64 {
        if self.bipolar { -1.0 } else { 0.0 }
    }

    /// Base plus matched marker weights, clamped. `text` must be lowercase.
    pub fn lexical(&self, text: &str) -> f64 {
        let hits: f64 = self
            .markers
            .iter()
            .filter(|(marker, _)| text.contains(marker.as_str()))
            .map(|(_, weight)| weight)
            .sum();
        (self.base + hits).clamp(self.lower_bound(), 1.0)
    }

    /// Raw score in the rubric's own range.
    pub fn raw(&self, text: &str, temperature: f64) -> f64 {
        let lexical = self.lexical(text);
        if self.color_weight <= 0.0 {
            return lexical;
        }
        let w = self.color_weight.min(1.0);
        ((1.0 - w) * lexical + w * (1.0 - temperature)).clamp(self.lower_bound(), 1.0)
    }

    /// Score mapped onto `[0, 1]`.
    pub fn unit(&self, text: &str, temperature: f64) -> f64 {
        let raw = self.raw(text, temperature);
        if self.bipolar {
            affect_to_unit(raw)
        } else {
            raw.clamp(0.0, 1.0)
        }
    }
}

/// Every dimension's rubric for one sector.
#[derive(Debug, Clone, PartialEq)]
pub struct RubricSet {
    rubrics: BTreeMap<Dimension, ResolvedRubric>,
}

impl RubricSet {
    /// Compose base rubrics with the sector's overrides. Dimensions without a
    /// base rubric score a flat neutral value.
    pub fn for_sector(config: &EngineConfig, sector: &str) -> Self {
        let overrides = config.sectors.get(sector).map(|s| &s.rubrics);
        let rubrics = Dimension::ALL
            .into_iter()
            .map(|dimension| {
                let sector_override = overrides.and_then(|o| o.get(&dimension));
                let rubric = match config.rubrics.get(&dimension) {
                    Some(base) => ResolvedRubric::compose(dimension, base, sector_override),
                    None => ResolvedRubric::neutral(dimension),
                };
                (dimension, rubric)
            })
            .collect();
        Self { rubrics }
    }

    pub fn rubric(&self, dimension: Dimension) -> &ResolvedRubric {
        &self.rubrics[&dimension]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedRubric> {
        self.rubrics.values()
    }
}

/// A candidate with its scores, ready for ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub scores: AttributeScores,
    pub affect: Affect,
    /// Temperature of the dominant color (neutral gray if it was malformed).
    pub temperature: f64,
    pub psychology_optimized: bool,
    /// Set when the dominant color was malformed and replaced.
    pub color_error: Option<ColorError>,
}

pub struct Scorer {
    rubrics: RubricSet,
    neutral: Rgb,
    tag_threshold: f64,
}

impl Scorer {
    pub fn new(config: &EngineConfig, sector: &str) -> Self {
        Self {
            rubrics: RubricSet::for_sector(config, sector),
            neutral: hex_to_rgb(&config.engine.neutral_color).unwrap_or(Rgb::new(128, 128, 128)),
            tag_threshold: config.scoring.tag_threshold,
        }
    }

    pub fn rubrics(&self) -> &RubricSet {
        &self.rubrics
    }

    fn temperature(&self, candidate: &Candidate) -> (f64, Option<ColorError>) {
        let (rgb, error) = parse_or_neutral(&candidate.dominant_color, self.neutral);
        (color_temperature_rgb(rgb), error)
    }

    /// `score(candidate, dimension) ∈ [0, 1]`.
    pub fn score(&self, candidate: &Candidate, dimension: Dimension) -> f64 {
        let (temperature, _) = self.temperature(candidate);
        self.rubrics
            .rubric(dimension)
            .unit(&candidate.searchable_text(), temperature)
    }

    /// Score every dimension of a retrieved candidate.
    pub fn score_all(&self, retrieved: RetrievedCandidate) -> ScoredCandidate {
        let RetrievedCandidate {
            candidate,
            psychology_optimized,
        } = retrieved;
        let text = candidate.searchable_text();
        let (temperature, color_error) = self.temperature(&candidate);

        let mut scores = AttributeScores::new();
        let mut affect = Affect::default();
        for rubric in self.rubrics.iter() {
            scores.set(rubric.dimension, rubric.unit(&text, temperature));
            match rubric.dimension {
                Dimension::Valence => affect.valence = rubric.raw(&text, temperature),
                Dimension::Arousal => affect.arousal = rubric.raw(&text, temperature),
                _ => {}
            }
        }

        ScoredCandidate {
            candidate,
            scores,
            affect,
            temperature,
            psychology_optimized,
            color_error,
        }
    }

    /// Rationale tags: rubric tags for high-scoring dimensions (in dimension
    /// order), then tone, then provider capability.
    pub fn rationale_tags(&self, scored: &ScoredCandidate) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for rubric in self.rubrics.iter() {
            let Some(tag) = &rubric.tag else { continue };
            if scored.scores.get(rubric.dimension) >= self.tag_threshold && !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        if scored.temperature <= COOL_TONE_MAX {
            tags.push(TAG_COOL_TONE.to_string());
        } else if scored.temperature >= WARM_TONE_MIN {
            tags.push(TAG_WARM_TONE.to_string());
        }
        if scored.psychology_optimized {
            tags.push(TAG_PSYCHOLOGY_OPTIMIZED.to_string());
        }
        tags
    }
}

/// Weighted sum of dimension scores, clamped to `[0, 1]`.
pub fn composite(scores: &AttributeScores, weights: &SectionWeights) -> f64 {
    weights
        .weighted()
        .map(|(dimension, weight)| weight * scores.get(dimension))
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

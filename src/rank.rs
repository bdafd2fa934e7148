//! Ranking and selection per page section.
//!
//! ```text
//! retrieved (keyword order) → dedupe by id → sort → top N → pad to N
//! ```
//!
//! Sort order is composite score descending, then trust descending, then
//! candidate id ascending, which makes the order total and reproducible.
//! A section always comes back with exactly `count` entries: missing slots
//! are filled with placeholders scoring a neutral 0.5 on every dimension.

use crate::config::SectionWeights;
use crate::ids::IdSource;
use crate::score::{ScoredCandidate, Scorer, composite};
use crate::types::{
    Affect, AttributeScores, CandidateUrls, Dimension, SectionRequirement, SectionSelection,
    SelectedAsset,
};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Neutral score given to every dimension of a placeholder.
pub const PLACEHOLDER_SCORE: f64 = 0.5;
pub const PLACEHOLDER_SOURCE: &str = "placeholder";
pub const TAG_SYNTHETIC: &str = "synthetic";

/// Builds deterministic placeholder entries.
pub struct PlaceholderFactory<'a> {
    ids: &'a dyn IdSource,
    base_url: &'a str,
    neutral_color: &'a str,
}

impl<'a> PlaceholderFactory<'a> {
    pub fn new(ids: &'a dyn IdSource, base_url: &'a str, neutral_color: &'a str) -> Self {
        Self {
            ids,
            base_url,
            neutral_color,
        }
    }

    /// Placeholder for the 0-based `slot` of a section.
    pub fn make(
        &self,
        requirement: &SectionRequirement,
        slot: usize,
        weights: &SectionWeights,
    ) -> SelectedAsset {
        let slot_text = slot.to_string();
        let id = self
            .ids
            .derive_id("placeholder", &[requirement.name.as_str(), slot_text.as_str()]);
        let scores = AttributeScores::uniform(PLACEHOLDER_SCORE);
        SelectedAsset {
            urls: CandidateUrls::sized(self.base_url, &id, requirement.orientation),
            candidate_id: id,
            source: PLACEHOLDER_SOURCE.to_string(),
            keyword: String::new(),
            alt_text: format!("Placeholder image for {}", requirement.name),
            dominant_color: self.neutral_color.to_string(),
            license: PLACEHOLDER_SOURCE.to_string(),
            composite_score: composite(&scores, weights),
            scores,
            affect: Affect::default(),
            rationale_tags: vec![TAG_SYNTHETIC.to_string()],
            synthetic: true,
        }
    }
}

/// Ranked selection for one section plus how much padding it needed.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRanking {
    pub selection: SectionSelection,
    pub placeholders: usize,
}

/// Total order used to rank candidates within a section: composite, then
/// trust, then psychology-optimized sources, then candidate id.
fn rank_order(a: &(f64, &ScoredCandidate), b: &(f64, &ScoredCandidate)) -> Ordering {
    b.0.total_cmp(&a.0)
        .then_with(|| {
            b.1.scores
                .get(Dimension::Trust)
                .total_cmp(&a.1.scores.get(Dimension::Trust))
        })
        .then_with(|| b.1.psychology_optimized.cmp(&a.1.psychology_optimized))
        .then_with(|| a.1.candidate.id.cmp(&b.1.candidate.id))
}

/// Rank `candidates` (in keyword order) for one section.
pub fn rank_section(
    requirement: &SectionRequirement,
    candidates: &[ScoredCandidate],
    weights: &SectionWeights,
    scorer: &Scorer,
    placeholders: &PlaceholderFactory<'_>,
) -> SectionRanking {
    let mut seen = BTreeSet::new();
    let mut ranked: Vec<(f64, &ScoredCandidate)> = candidates
        .iter()
        .filter(|c| seen.insert(c.candidate.id.as_str()))
        .map(|c| (composite(&c.scores, weights), c))
        .collect();
    ranked.sort_by(rank_order);

    let mut entries: Vec<SelectedAsset> = ranked
        .into_iter()
        .take(requirement.count)
        .map(|(score, scored)| SelectedAsset {
            candidate_id: scored.candidate.id.clone(),
            source: scored.candidate.source.clone(),
            keyword: scored.candidate.keyword.clone(),
            urls: scored.candidate.urls.clone(),
            alt_text: scored.candidate.alt_text.clone(),
            dominant_color: scored.candidate.dominant_color.clone(),
            license: scored.candidate.license.clone(),
            composite_score: score,
            scores: scored.scores.clone(),
            affect: scored.affect,
            rationale_tags: scorer.rationale_tags(scored),
            synthetic: false,
        })
        .collect();

    let real = entries.len();
    for slot in real..requirement.count {
        entries.push(placeholders.make(requirement, slot, weights));
    }

    SectionRanking {
        selection: SectionSelection {
            section: requirement.name.clone(),
            entries,
        },
        placeholders: requirement.count - real,
    }
}

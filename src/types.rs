//! Shared types passed between pipeline stages.
//!
//! Inputs ([`SectionRequirement`]), intermediate records ([`Candidate`],
//! [`AttributeScores`]) and the serialized output ([`SelectionResult`]).
//! Everything that ends up in a result uses ordered collections so identical
//! inputs serialize to identical bytes.

use crate::color::AnnotatedPalette;
use crate::diagnostics::Diagnostics;
use crate::strategy::StrategyChoice;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Image orientation requested by a page section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
    Squarish,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
            Orientation::Squarish => "squarish",
        }
    }

    /// Pixel dimensions for thumbnail, regular and high-resolution URLs.
    pub fn url_sizes(&self) -> [(u32, u32); 3] {
        match self {
            Orientation::Landscape => [(400, 267), (1080, 720), (2400, 1600)],
            Orientation::Portrait => [(267, 400), (720, 1080), (1600, 2400)],
            Orientation::Squarish => [(400, 400), (1080, 1080), (2400, 2400)],
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider / section quality tier. Ordered: `Standard < High < Premium`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    #[default]
    Standard,
    High,
    Premium,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Standard => "standard",
            QualityTier::High => "high",
            QualityTier::Premium => "premium",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one logical page section (hero, services, about, ...) needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionRequirement {
    pub name: String,
    pub count: usize,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub quality: QualityTier,
    /// Search keywords in priority order. Each yields at most one candidate.
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Thumbnail / regular / high-resolution URLs for one image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateUrls {
    pub thumbnail: String,
    pub regular: String,
    pub highres: String,
}

impl CandidateUrls {
    /// URLs of the form `{base}/{id}?w=W&h=H` for each size of `orientation`.
    pub fn sized(base_url: &str, id: &str, orientation: Orientation) -> Self {
        let [thumb, regular, highres] = orientation
            .url_sizes()
            .map(|(w, h)| format!("{}/{}?w={}&h={}", base_url.trim_end_matches('/'), id, w, h));
        Self {
            thumbnail: thumb,
            regular,
            highres,
        }
    }
}

/// A retrieved image record, not yet scored. Immutable once retrieved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    /// Provider that produced this candidate.
    pub source: String,
    /// Keyword the candidate was retrieved for.
    pub keyword: String,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub description: String,
    pub urls: CandidateUrls,
    /// `#RRGGBB`; malformed values are replaced by neutral gray at scoring time.
    pub dominant_color: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub synthetic: bool,
}

impl Candidate {
    /// Lowercased text searched by rubric markers.
    pub fn searchable_text(&self) -> String {
        format!("{} {} {}", self.keyword, self.alt_text, self.description).to_lowercase()
    }
}

/// A scoring dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Trust,
    Calm,
    Professionalism,
    NaturalElements,
    Valence,
    Arousal,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Trust,
        Dimension::Calm,
        Dimension::Professionalism,
        Dimension::NaturalElements,
        Dimension::Valence,
        Dimension::Arousal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Trust => "trust",
            Dimension::Calm => "calm",
            Dimension::Professionalism => "professionalism",
            Dimension::NaturalElements => "natural_elements",
            Dimension::Valence => "valence",
            Dimension::Arousal => "arousal",
        }
    }

    /// Human-readable name for prose.
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Trust => "trust",
            Dimension::Calm => "calm",
            Dimension::Professionalism => "professionalism",
            Dimension::NaturalElements => "natural elements",
            Dimension::Valence => "valence (positivity)",
            Dimension::Arousal => "arousal (energy)",
        }
    }

    /// Valence and arousal are bipolar (`[-1, 1]`) before mapping.
    pub fn is_affect(&self) -> bool {
        matches!(self, Dimension::Valence | Dimension::Arousal)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dimension → score in `[0, 1]`. Values are clamped on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeScores(BTreeMap<Dimension, f64>);

impl AttributeScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every dimension set to `value`.
    pub fn uniform(value: f64) -> Self {
        let mut scores = Self::new();
        for dimension in Dimension::ALL {
            scores.set(dimension, value);
        }
        scores
    }

    pub fn set(&mut self, dimension: Dimension, value: f64) {
        self.0.insert(dimension, value.clamp(0.0, 1.0));
    }

    /// Score for a dimension; unscored dimensions read as 0.
    pub fn get(&self, dimension: Dimension) -> f64 {
        self.0.get(&dimension).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        self.0.iter().map(|(&d, &v)| (d, v))
    }
}

/// Raw bipolar affect in `[-1, 1]`, kept alongside the mapped scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Affect {
    pub valence: f64,
    pub arousal: f64,
}

/// Map a bipolar value in `[-1, 1]` onto `[0, 1]`.
pub fn affect_to_unit(value: f64) -> f64 {
    ((value.clamp(-1.0, 1.0) + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// One entry in a section's ordered selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedAsset {
    pub candidate_id: String,
    pub source: String,
    pub keyword: String,
    pub urls: CandidateUrls,
    pub alt_text: String,
    pub dominant_color: String,
    pub license: String,
    pub composite_score: f64,
    pub scores: AttributeScores,
    pub affect: Affect,
    pub rationale_tags: Vec<String>,
    pub synthetic: bool,
}

/// Ordered selection for one section; `entries.len() == requirement.count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSelection {
    pub section: String,
    pub entries: Vec<SelectedAsset>,
}

impl SectionSelection {
    pub fn placeholder_count(&self) -> usize {
        self.entries.iter().filter(|e| e.synthetic).count()
    }
}

/// Complete output of one selection request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub sector: String,
    pub sections: Vec<SectionSelection>,
    pub palette: AnnotatedPalette,
    pub strategy: StrategyChoice,
    pub diagnostics: Diagnostics,
}

impl SelectionResult {
    pub fn section(&self, name: &str) -> Option<&SectionSelection> {
        self.sections.iter().find(|s| s.section == name)
    }
}

/// Cooperative cancellation flag shared between a request and its caller.
///
/// Cloning shares the flag. Retrieval checks it before every provider
/// attempt; a cancelled request yields no partial result.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

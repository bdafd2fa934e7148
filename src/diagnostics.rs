//! Diagnostics attached to every selection result.
//!
//! Nothing recoverable stops a request; it becomes a [`Warning`] here
//! instead. Alongside the warnings the report carries per-dimension averages
//! over every selected entry and plain-language recommendations for
//! improving the inputs.

use crate::color::AnnotatedPalette;
use crate::config::EngineConfig;
use crate::types::{AttributeScores, Dimension, SectionSelection};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A section had fewer real candidates than requested.
    SectionPadded { section: String, placeholders: usize },
    /// No provider had anything for a section keyword.
    NoCandidateFound { section: String, keyword: String },
    ProviderFailed {
        provider: String,
        keyword: String,
        error: String,
    },
    /// A malformed color was replaced by the neutral gray.
    ColorParse { context: String, value: String },
    /// A palette base color misses the minimum contrast on white or black.
    LowContrast {
        palette: String,
        role: String,
        color: String,
        on_white: f64,
        on_black: f64,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SectionPadded {
                section,
                placeholders,
            } => write!(f, "section {} padded with {} placeholder(s)", section, placeholders),
            Warning::NoCandidateFound { section, keyword } => {
                write!(f, "no candidate for \"{}\" in section {}", keyword, section)
            }
            Warning::ProviderFailed {
                provider,
                keyword,
                error,
            } => write!(f, "provider {} failed for \"{}\": {}", provider, keyword, error),
            Warning::ColorParse { context, value } => {
                write!(f, "invalid color {:?} in {}, using neutral gray", value, context)
            }
            Warning::LowContrast {
                palette,
                role,
                color,
                on_white,
                on_black,
            } => write!(
                f,
                "{} {} {} has low contrast ({:.2} on white, {:.2} on black)",
                palette, role, color, on_white, on_black
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Per-dimension averages over every selected entry, placeholders included.
    pub averages: AttributeScores,
    pub warnings: Vec<Warning>,
    pub recommendations: Vec<String>,
}

/// Average every dimension over the given entries. Empty input yields an
/// empty score map.
pub fn dimension_averages<'a>(
    sections: impl IntoIterator<Item = &'a SectionSelection>,
) -> AttributeScores {
    let mut totals = [0.0_f64; Dimension::ALL.len()];
    let mut count = 0usize;
    for entry in sections.into_iter().flat_map(|s| &s.entries) {
        for (i, dimension) in Dimension::ALL.iter().enumerate() {
            totals[i] += entry.scores.get(*dimension);
        }
        count += 1;
    }

    let mut averages = AttributeScores::new();
    if count > 0 {
        for (i, dimension) in Dimension::ALL.iter().enumerate() {
            averages.set(*dimension, totals[i] / count as f64);
        }
    }
    averages
}

/// Assemble the diagnostics report for a finished selection.
pub fn build(
    config: &EngineConfig,
    sections: &[SectionSelection],
    palette: &AnnotatedPalette,
    warnings: Vec<Warning>,
    has_psychology_provider: bool,
) -> Diagnostics {
    let threshold = config.diagnostics.low_score_threshold;
    let mut recommendations = Vec::new();

    for section in sections.iter().filter(|s| !s.entries.is_empty()) {
        let averages = dimension_averages([section]);
        for (dimension, _) in config.section_weights(&section.section).weighted() {
            if averages.get(dimension) < threshold {
                recommendations.push(format!(
                    "increase {} markers for section {}",
                    dimension.label(),
                    section.section
                ));
            }
        }
    }

    for swatch in palette.flagged() {
        let direction = if swatch.on_white < palette.min_contrast {
            "darken"
        } else {
            "lighten"
        };
        recommendations.push(format!(
            "{} {} color {} to reach {:.1}:1 contrast on white and black",
            direction, swatch.role, swatch.base, palette.min_contrast
        ));
    }

    if !has_psychology_provider {
        recommendations.push("add a psychology-optimized image provider".to_string());
    }

    Diagnostics {
        averages: dimension_averages(sections),
        warnings,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{annotate_palette, derive_palette};
    use crate::test_helpers::{approx, stock_config};
    use crate::types::{Affect, CandidateUrls, SelectedAsset};

    fn entry(id: &str, scores: AttributeScores) -> SelectedAsset {
        SelectedAsset {
            candidate_id: id.into(),
            source: "stub".into(),
            keyword: String::new(),
            urls: CandidateUrls::default(),
            alt_text: String::new(),
            dominant_color: "#808080".into(),
            license: String::new(),
            composite_score: 0.5,
            scores,
            affect: Affect::default(),
            rationale_tags: vec![],
            synthetic: false,
        }
    }

    fn selection(name: &str, entries: Vec<SelectedAsset>) -> SectionSelection {
        SectionSelection {
            section: name.into(),
            entries,
        }
    }

    fn clean_palette() -> AnnotatedPalette {
        // Mid-tone colors clear 1.5:1 on both sides.
        let spec = derive_palette("#4A90E2", "#6B9080", "#CC6633", "#7F7F7F").unwrap();
        annotate_palette("mid", spec, 1.5, 0.5)
    }

    // =========================================================================
    // Averages
    // =========================================================================

    #[test]
    fn averages_cover_all_sections() {
        let mut high = AttributeScores::uniform(0.5);
        high.set(Dimension::Trust, 0.9);
        let mut low = AttributeScores::uniform(0.5);
        low.set(Dimension::Trust, 0.3);
        let sections = vec![
            selection("hero", vec![entry("a", high)]),
            selection("about", vec![entry("b", low)]),
        ];
        let averages = dimension_averages(&sections);
        assert!(approx(averages.get(Dimension::Trust), 0.6));
        assert!(approx(averages.get(Dimension::Calm), 0.5));
    }

    #[test]
    fn no_entries_no_averages() {
        let averages = dimension_averages(&[selection("hero", vec![])]);
        assert_eq!(averages.iter().count(), 0);
    }

    // =========================================================================
    // Recommendations
    // =========================================================================

    #[test]
    fn low_weighted_dimensions_are_recommended() {
        let config = stock_config();
        let mut scores = AttributeScores::uniform(0.6);
        scores.set(Dimension::Calm, 0.2);
        scores.set(Dimension::Arousal, 0.1);
        let sections = vec![selection("hero", vec![entry("a", scores)])];
        let report = build(&config, &sections, &clean_palette(), vec![], true);
        // Arousal is not weighted on hero.
        assert_eq!(report.recommendations, vec!["increase calm markers for section hero"]);
    }

    #[test]
    fn recommendations_name_dimensions_in_prose() {
        let config = stock_config();
        let mut scores = AttributeScores::uniform(0.6);
        scores.set(Dimension::NaturalElements, 0.1);
        let sections = vec![selection("gallery", vec![entry("a", scores)])];
        let report = build(&config, &sections, &clean_palette(), vec![], true);
        assert_eq!(
            report.recommendations,
            vec!["increase natural elements markers for section gallery"]
        );
    }

    #[test]
    fn flagged_palette_colors_are_recommended() {
        let config = stock_config();
        let spec = derive_palette("#4A90E2", "#7FB069", "#F4F4F4", "#050505").unwrap();
        let palette = annotate_palette("edge", spec, 1.5, 0.5);
        let report = build(&config, &[], &palette, vec![], true);
        assert!(
            report
                .recommendations
                .contains(&"darken tertiary color #F4F4F4 to reach 1.5:1 contrast on white and black".to_string())
        );
        assert!(
            report
                .recommendations
                .contains(&"lighten accent color #050505 to reach 1.5:1 contrast on white and black".to_string())
        );
    }

    #[test]
    fn missing_psychology_provider_is_recommended() {
        let config = stock_config();
        let report = build(&config, &[], &clean_palette(), vec![], false);
        assert_eq!(
            report.recommendations,
            vec!["add a psychology-optimized image provider"]
        );
    }

    #[test]
    fn warnings_pass_through_in_order() {
        let config = stock_config();
        let warnings = vec![
            Warning::NoCandidateFound {
                section: "hero".into(),
                keyword: "calm".into(),
            },
            Warning::SectionPadded {
                section: "hero".into(),
                placeholders: 1,
            },
        ];
        let report = build(&config, &[], &clean_palette(), warnings.clone(), true);
        assert_eq!(report.warnings, warnings);
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    #[test]
    fn warnings_serialize_with_kind_tag() {
        let warning = Warning::SectionPadded {
            section: "gallery".into(),
            placeholders: 2,
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "section_padded");
        assert_eq!(json["placeholders"], 2);
        assert_eq!(
            warning.to_string(),
            "section gallery padded with 2 placeholder(s)"
        );
    }
}

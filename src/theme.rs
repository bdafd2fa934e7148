//! Palette selection for a sector and profile.
//!
//! Every named base palette in the sector table is derived, annotated and
//! scored:
//!
//! ```text
//! fit = 0.6 · harmony + 0.4 · calm_fit(anxiety, mean temperature)
//! ```
//!
//! High-anxiety audiences favor cool palettes, low-anxiety audiences warm
//! ones, medium is indifferent. The best palette wins; ties go to the one
//! declared first. Malformed colors fall back to the neutral gray and
//! low-contrast base colors are reported, but neither removes a palette.

use crate::color::{
    AnnotatedPalette, ColorError, PaletteSpec, Rgb, annotate_palette, darken_rgb,
    derive_palette_rgb, harmony_score, lighten_rgb, mean_temperature, parse_or_neutral,
};
use crate::config::{BasePalette, SectorTable};
use crate::diagnostics::Warning;
use crate::profile::Level;

const HARMONY_WEIGHT: f64 = 0.6;
const CALM_FIT_WEIGHT: f64 = 0.4;
/// Name of the palette used when a sector lists none.
pub const NEUTRAL_PALETTE: &str = "neutral";

/// The chosen palette and the warnings raised while building the candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteChoice {
    pub palette: AnnotatedPalette,
    pub warnings: Vec<Warning>,
}

/// How well a palette's mean temperature suits the audience's anxiety level.
pub fn calm_fit(anxiety: Level, mean_temperature: f64) -> f64 {
    let t = mean_temperature.clamp(0.0, 1.0);
    match anxiety {
        Level::High => 1.0 - t,
        Level::Medium => 0.5,
        Level::Low => t,
    }
}

/// Selection score for a derived palette.
pub fn palette_fit(spec: &PaletteSpec, anxiety: Level) -> f64 {
    HARMONY_WEIGHT * harmony_score(spec) + CALM_FIT_WEIGHT * calm_fit(anxiety, mean_temperature(spec))
}

/// Derive a palette from a table entry, substituting `neutral` for any
/// malformed color.
fn derive_base(base: &BasePalette, neutral: Rgb, warnings: &mut Vec<Warning>) -> PaletteSpec {
    derive_lenient(
        &base.name,
        [
            base.primary.as_str(),
            base.secondary.as_str(),
            base.tertiary.as_str(),
            base.accent.as_str(),
        ],
        neutral,
        warnings,
    )
}

/// Derive a palette from primary, secondary, tertiary and accent hex
/// strings. Malformed colors become `neutral` and push a `ColorParse`
/// warning with context `palette {name} {role}`.
pub fn derive_lenient(
    name: &str,
    colors: [&str; 4],
    neutral: Rgb,
    warnings: &mut Vec<Warning>,
) -> PaletteSpec {
    let mut parse = |role: &str, hex: &str| {
        let (rgb, error) = parse_or_neutral(hex, neutral);
        if let Some(ColorError::Parse(value)) = error {
            warnings.push(Warning::ColorParse {
                context: format!("palette {} {}", name, role),
                value,
            });
        }
        rgb
    };
    let primary = parse("primary", colors[0]);
    let secondary = parse("secondary", colors[1]);
    let tertiary = parse("tertiary", colors[2]);
    let accent = parse("accent", colors[3]);
    derive_palette_rgb(primary, secondary, tertiary, accent)
}

/// Gray palette derived from the neutral color.
fn neutral_palette(neutral: Rgb) -> PaletteSpec {
    derive_palette_rgb(
        neutral,
        darken_rgb(neutral, 0.4),
        lighten_rgb(neutral, 0.9),
        darken_rgb(neutral, 0.7),
    )
}

/// Pick the palette for a sector. `sector` is `None` when the sector has no
/// table entry, in which case the neutral palette is used.
pub fn select_palette(
    sector: Option<&SectorTable>,
    anxiety: Level,
    min_contrast: f64,
    neutral: Rgb,
) -> PaletteChoice {
    let mut warnings = Vec::new();
    let mut best: Option<(String, PaletteSpec, f64)> = None;

    for base in sector.map(|s| s.palettes.as_slice()).unwrap_or_default() {
        let spec = derive_base(base, neutral, &mut warnings);
        let fit = palette_fit(&spec, anxiety);
        // Strict comparison keeps the first of equal scores.
        let better = best.as_ref().is_none_or(|(_, _, top)| fit > *top);
        if better {
            best = Some((base.name.clone(), spec, fit));
        }
    }

    let (name, spec, fit) = best.unwrap_or_else(|| {
        let spec = neutral_palette(neutral);
        let fit = palette_fit(&spec, anxiety);
        (NEUTRAL_PALETTE.to_string(), spec, fit)
    });

    let palette = annotate_palette(&name, spec, min_contrast, fit);
    warnings.extend(palette.flagged().map(|swatch| Warning::LowContrast {
        palette: palette.name.clone(),
        role: swatch.role.to_string(),
        color: swatch.base.clone(),
        on_white: swatch.on_white,
        on_black: swatch.on_black,
    }));

    PaletteChoice { palette, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{color_temperature, hex_to_rgb};
    use crate::test_helpers::stock_config;

    const GRAY: Rgb = Rgb::new(128, 128, 128);

    fn base(name: &str, colors: [&str; 4]) -> BasePalette {
        BasePalette {
            name: name.into(),
            primary: colors[0].into(),
            secondary: colors[1].into(),
            tertiary: colors[2].into(),
            accent: colors[3].into(),
        }
    }

    fn sector_with(palettes: Vec<BasePalette>) -> SectorTable {
        let mut table = stock_config().sectors["therapy"].clone();
        table.palettes = palettes;
        table
    }

    // =========================================================================
    // calm_fit
    // =========================================================================

    #[test]
    fn calm_fit_follows_anxiety() {
        assert_eq!(calm_fit(Level::High, 0.1), 0.9);
        assert_eq!(calm_fit(Level::Medium, 0.1), 0.5);
        assert_eq!(calm_fit(Level::Low, 0.1), 0.1);
        assert_eq!(calm_fit(Level::Low, 1.4), 1.0);
    }

    // =========================================================================
    // Selection
    // =========================================================================

    #[test]
    fn high_anxiety_prefers_the_cooler_palette() {
        let cool = base("cool", ["#4A90E2", "#3A7CA5", "#2E86AB", "#5DADE2"]);
        let warm = base("warm", ["#E4572E", "#F39C12", "#C0392B", "#E67E22"]);
        let table = sector_with(vec![warm.clone(), cool.clone()]);

        let anxious = select_palette(Some(&table), Level::High, 1.5, GRAY);
        assert_eq!(anxious.palette.name, "cool");
        let relaxed = select_palette(Some(&table), Level::Low, 1.5, GRAY);
        assert_eq!(relaxed.palette.name, "warm");
    }

    #[test]
    fn stock_therapy_palette_is_cool() {
        let config = stock_config();
        let choice = select_palette(config.sectors.get("therapy"), Level::High, 1.5, GRAY);
        let primary = &choice.palette.spec.primary.base;
        assert!(color_temperature(primary).unwrap() <= 0.3, "{}", primary);
    }

    #[test]
    fn ties_go_to_the_first_palette() {
        let colors = ["#4A90E2", "#7FB069", "#F4F4F4", "#E8B86D"];
        let table = sector_with(vec![base("first", colors), base("second", colors)]);
        let choice = select_palette(Some(&table), Level::Medium, 1.5, GRAY);
        assert_eq!(choice.palette.name, "first");
    }

    #[test]
    fn fit_score_is_recorded() {
        let colors = ["#4A90E2", "#7FB069", "#F4F4F4", "#E8B86D"];
        let table = sector_with(vec![base("only", colors)]);
        let choice = select_palette(Some(&table), Level::High, 1.5, GRAY);
        let expected = palette_fit(&choice.palette.spec, Level::High);
        assert_eq!(choice.palette.fit_score, expected);
        assert!((0.0..=1.0).contains(&choice.palette.fit_score));
    }

    // =========================================================================
    // Fallbacks and warnings
    // =========================================================================

    #[test]
    fn malformed_color_becomes_neutral_with_warning() {
        let table = sector_with(vec![base("broken", ["#4A90E2", "mint", "#F4F4F4", "#E8B86D"])]);
        let choice = select_palette(Some(&table), Level::High, 1.5, GRAY);
        assert_eq!(choice.palette.spec.secondary.base, "#808080");
        assert!(choice.warnings.contains(&Warning::ColorParse {
            context: "palette broken secondary".into(),
            value: "mint".into(),
        }));
    }

    #[test]
    fn lenient_derivation_keeps_going_past_bad_colors() {
        let mut warnings = Vec::new();
        let spec = derive_lenient(
            "custom",
            ["#4A90E2", "#7FB069", "not-a-color", "#12"],
            GRAY,
            &mut warnings,
        );
        assert_eq!(spec.primary.base, "#4A90E2");
        assert_eq!(spec.tertiary.base, "#808080");
        assert_eq!(spec.accent.base, "#808080");
        assert_eq!(
            warnings,
            vec![
                Warning::ColorParse {
                    context: "palette custom tertiary".into(),
                    value: "not-a-color".into(),
                },
                Warning::ColorParse {
                    context: "palette custom accent".into(),
                    value: "#12".into(),
                },
            ]
        );
    }

    #[test]
    fn missing_sector_uses_neutral_palette() {
        let choice = select_palette(None, Level::High, 1.5, GRAY);
        assert_eq!(choice.palette.name, NEUTRAL_PALETTE);
        assert_eq!(choice.palette.spec.primary.base, "#808080");
    }

    #[test]
    fn empty_palette_list_uses_neutral_palette() {
        let table = sector_with(vec![]);
        let choice = select_palette(Some(&table), Level::Low, 1.5, GRAY);
        assert_eq!(choice.palette.name, NEUTRAL_PALETTE);
    }

    #[test]
    fn low_contrast_base_colors_are_flagged_not_dropped() {
        // Near-white tertiary fails against white.
        let table = sector_with(vec![base("airy", ["#4A90E2", "#7FB069", "#F4F4F4", "#E8B86D"])]);
        let choice = select_palette(Some(&table), Level::High, 1.5, GRAY);
        let low: Vec<&Warning> = choice
            .warnings
            .iter()
            .filter(|w| matches!(w, Warning::LowContrast { .. }))
            .collect();
        assert!(!low.is_empty());
        assert!(low.iter().any(|w| matches!(
            w,
            Warning::LowContrast { role, color, .. } if role == "tertiary" && color == "#F4F4F4"
        )));
        assert_eq!(choice.palette.swatches.len(), 4);
        assert_eq!(low.len(), choice.palette.flagged().count());
        assert!(hex_to_rgb(&choice.palette.spec.tertiary.base).is_ok());
    }
}

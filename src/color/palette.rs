//! Palette derivation, harmony scoring, and contrast annotation.
//!
//! A palette starts as four base colors (primary, secondary, tertiary,
//! accent). Each base expands into a shade ramp of nine derived steps around
//! the base itself:
//!
//! ```text
//!  50  100  200  300  400 │ 500 │ 600  700  800  900
//!  ←── lighten 0.90..0.20 │ base│ darken 0.20..0.80 ──→
//! ```
//!
//! Step 50 is the lightest, 900 the darkest, and 500 is always the base
//! color itself.

use super::convert::{
    ColorError, Rgb, color_temperature_rgb, contrast_ratio_rgb, darken_rgb, hex_to_rgb,
    lighten_rgb, rgb_to_hex, rgb_to_hsl,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Shade step → signed interpolation amount. Negative lightens, positive darkens.
pub const RAMP_STEPS: [(u16, f64); 10] = [
    (50, -0.90),
    (100, -0.75),
    (200, -0.60),
    (300, -0.40),
    (400, -0.20),
    (500, 0.0),
    (600, 0.20),
    (700, 0.40),
    (800, 0.60),
    (900, 0.80),
];

/// Standard deviation of hue temperature at which the temperature term hits zero.
const TEMPERATURE_SPREAD: f64 = 0.35;
/// Standard deviation of saturation at which the saturation term hits zero.
const SATURATION_SPREAD: f64 = 0.5;
/// Lightness spread that reads as deliberate contrast without clashing.
const LIGHTNESS_WINDOW: (f64, f64) = (0.15, 0.35);
/// Distance outside the window over which the lightness term falls to zero.
const LIGHTNESS_FALLOFF: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteRole {
    Primary,
    Secondary,
    Tertiary,
    Accent,
}

impl PaletteRole {
    pub const ALL: [PaletteRole; 4] = [
        PaletteRole::Primary,
        PaletteRole::Secondary,
        PaletteRole::Tertiary,
        PaletteRole::Accent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaletteRole::Primary => "primary",
            PaletteRole::Secondary => "secondary",
            PaletteRole::Tertiary => "tertiary",
            PaletteRole::Accent => "accent",
        }
    }
}

impl fmt::Display for PaletteRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One base color and its shade ramp, keyed by step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadeRamp {
    pub base: String,
    pub shades: BTreeMap<u16, String>,
}

impl ShadeRamp {
    pub fn from_base(base: Rgb) -> Self {
        let shades = RAMP_STEPS
            .iter()
            .map(|&(step, amount)| {
                let rgb = if amount < 0.0 {
                    lighten_rgb(base, -amount)
                } else {
                    darken_rgb(base, amount)
                };
                (step, rgb_to_hex(rgb))
            })
            .collect();
        Self {
            base: rgb_to_hex(base),
            shades,
        }
    }

    /// Hex value at a shade step (`50`, `100`, ..., `900`).
    pub fn shade(&self, step: u16) -> Option<&str> {
        self.shades.get(&step).map(String::as_str)
    }
}

/// Four base colors with derived ramps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteSpec {
    pub primary: ShadeRamp,
    pub secondary: ShadeRamp,
    pub tertiary: ShadeRamp,
    pub accent: ShadeRamp,
}

impl PaletteSpec {
    pub fn ramp(&self, role: PaletteRole) -> &ShadeRamp {
        match role {
            PaletteRole::Primary => &self.primary,
            PaletteRole::Secondary => &self.secondary,
            PaletteRole::Tertiary => &self.tertiary,
            PaletteRole::Accent => &self.accent,
        }
    }

    /// Base colors in role order. Every base was produced by
    /// [`rgb_to_hex`], so parsing cannot fail; a failure maps to black.
    fn base_colors(&self) -> [Rgb; 4] {
        PaletteRole::ALL.map(|role| hex_to_rgb(&self.ramp(role).base).unwrap_or(Rgb::BLACK))
    }
}

/// Derive a palette from already-parsed base colors.
pub fn derive_palette_rgb(primary: Rgb, secondary: Rgb, tertiary: Rgb, accent: Rgb) -> PaletteSpec {
    PaletteSpec {
        primary: ShadeRamp::from_base(primary),
        secondary: ShadeRamp::from_base(secondary),
        tertiary: ShadeRamp::from_base(tertiary),
        accent: ShadeRamp::from_base(accent),
    }
}

pub fn derive_palette(
    primary: &str,
    secondary: &str,
    tertiary: &str,
    accent: &str,
) -> Result<PaletteSpec, ColorError> {
    Ok(derive_palette_rgb(
        hex_to_rgb(primary)?,
        hex_to_rgb(secondary)?,
        hex_to_rgb(tertiary)?,
        hex_to_rgb(accent)?,
    ))
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

fn lightness_window(spread: f64) -> f64 {
    let (lo, hi) = LIGHTNESS_WINDOW;
    let distance = if spread < lo {
        lo - spread
    } else if spread > hi {
        spread - hi
    } else {
        0.0
    };
    (1.0 - distance / LIGHTNESS_FALLOFF).clamp(0.0, 1.0)
}

/// Harmony of the four base colors in `[0, 1]`.
///
/// Rewards consistent temperature and saturation, and a lightness spread
/// inside a target window (some light/dark contrast, not none and not all).
pub fn harmony_score(palette: &PaletteSpec) -> f64 {
    let bases = palette.base_colors();
    let temperatures: Vec<f64> = bases.iter().map(|&c| color_temperature_rgb(c)).collect();
    let hsl: Vec<_> = bases.iter().map(|&c| rgb_to_hsl(c)).collect();
    let saturations: Vec<f64> = hsl.iter().map(|c| c.s).collect();
    let lightnesses: Vec<f64> = hsl.iter().map(|c| c.l).collect();

    let temperature_term = (1.0 - std_dev(&temperatures) / TEMPERATURE_SPREAD).clamp(0.0, 1.0);
    let saturation_term = (1.0 - std_dev(&saturations) / SATURATION_SPREAD).clamp(0.0, 1.0);
    let lightness_term = lightness_window(std_dev(&lightnesses));

    (0.4 * temperature_term + 0.3 * saturation_term + 0.3 * lightness_term).clamp(0.0, 1.0)
}

/// Mean hue temperature of the base colors.
pub fn mean_temperature(palette: &PaletteSpec) -> f64 {
    let bases = palette.base_colors();
    bases.iter().map(|&c| color_temperature_rgb(c)).sum::<f64>() / bases.len() as f64
}

/// Contrast of a single color against white and black.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadeContrast {
    pub step: u16,
    pub hex: String,
    pub on_white: f64,
    pub on_black: f64,
}

/// A base color with contrast annotations for itself and every shade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swatch {
    pub role: PaletteRole,
    pub base: String,
    pub on_white: f64,
    pub on_black: f64,
    /// Base meets the minimum ratio against both white and black.
    pub meets_min_contrast: bool,
    pub shades: Vec<ShadeContrast>,
}

/// A chosen palette as handed to the templating layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedPalette {
    pub name: String,
    pub harmony: f64,
    /// Selection score (harmony blended with profile fit).
    pub fit_score: f64,
    pub min_contrast: f64,
    pub spec: PaletteSpec,
    pub swatches: Vec<Swatch>,
}

impl AnnotatedPalette {
    /// Swatches whose base fails the minimum contrast requirement.
    pub fn flagged(&self) -> impl Iterator<Item = &Swatch> {
        self.swatches.iter().filter(|s| !s.meets_min_contrast)
    }
}

fn contrast_pair(rgb: Rgb) -> (f64, f64) {
    (
        contrast_ratio_rgb(rgb, Rgb::WHITE),
        contrast_ratio_rgb(rgb, Rgb::BLACK),
    )
}

/// Annotate every base color and shade with its contrast against white/black.
///
/// Colors below `min_contrast` on either side are flagged, never removed.
pub fn annotate_palette(
    name: &str,
    spec: PaletteSpec,
    min_contrast: f64,
    fit_score: f64,
) -> AnnotatedPalette {
    let bases = spec.base_colors();
    let swatches = PaletteRole::ALL
        .iter()
        .zip(bases)
        .map(|(&role, base)| {
            let (on_white, on_black) = contrast_pair(base);
            let shades = spec
                .ramp(role)
                .shades
                .iter()
                .map(|(&step, hex)| {
                    let rgb = hex_to_rgb(hex).unwrap_or(Rgb::BLACK);
                    let (on_white, on_black) = contrast_pair(rgb);
                    ShadeContrast {
                        step,
                        hex: hex.clone(),
                        on_white,
                        on_black,
                    }
                })
                .collect();
            Swatch {
                role,
                base: rgb_to_hex(base),
                on_white,
                on_black,
                meets_min_contrast: on_white >= min_contrast && on_black >= min_contrast,
                shades,
            }
        })
        .collect();

    AnnotatedPalette {
        name: name.to_string(),
        harmony: harmony_score(&spec),
        fit_score,
        min_contrast,
        spec,
        swatches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::convert::{Hsl, hsl_to_rgb};

    fn calming_blue() -> PaletteSpec {
        derive_palette("#4A90E2", "#7FB069", "#F4F4F4", "#E8B86D").unwrap()
    }

    fn lightness(hex: &str) -> f64 {
        rgb_to_hsl(hex_to_rgb(hex).unwrap()).l
    }

    // =========================================================================
    // Derivation
    // =========================================================================

    #[test]
    fn step_500_is_the_base_color() {
        let palette = calming_blue();
        assert_eq!(palette.primary.shade(500), Some("#4A90E2"));
        assert_eq!(palette.secondary.shade(500), Some("#7FB069"));
        assert_eq!(palette.tertiary.shade(500), Some("#F4F4F4"));
        assert_eq!(palette.accent.shade(500), Some("#E8B86D"));
        assert_eq!(palette.primary.base, "#4A90E2");
    }

    #[test]
    fn ramp_has_every_step() {
        let palette = calming_blue();
        let steps: Vec<u16> = palette.primary.shades.keys().copied().collect();
        assert_eq!(steps, vec![50, 100, 200, 300, 400, 500, 600, 700, 800, 900]);
    }

    #[test]
    fn primary_ramp_darkens_from_50_to_900() {
        let palette = calming_blue();
        let ls: Vec<f64> = palette.primary.shades.values().map(|h| lightness(h)).collect();
        for pair in ls.windows(2) {
            assert!(pair[0] > pair[1], "lightness not decreasing: {ls:?}");
        }
    }

    #[test]
    fn every_ramp_is_non_increasing_in_lightness() {
        let palette = calming_blue();
        for role in PaletteRole::ALL {
            let ls: Vec<f64> = palette.ramp(role).shades.values().map(|h| lightness(h)).collect();
            for pair in ls.windows(2) {
                assert!(pair[0] >= pair[1], "{role}: {ls:?}");
            }
        }
    }

    #[test]
    fn derive_rejects_bad_hex() {
        let err = derive_palette("#4A90E2", "green", "#F4F4F4", "#E8B86D").unwrap_err();
        assert_eq!(err, ColorError::Parse("green".into()));
    }

    // =========================================================================
    // Harmony
    // =========================================================================

    #[test]
    fn std_dev_is_population() {
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
    }

    #[test]
    fn harmony_is_bounded() {
        let palettes = [
            calming_blue(),
            derive_palette("#FF0000", "#00FF00", "#0000FF", "#FFFF00").unwrap(),
            derive_palette("#000000", "#FFFFFF", "#000000", "#FFFFFF").unwrap(),
            derive_palette("#808080", "#808080", "#808080", "#808080").unwrap(),
        ];
        for p in &palettes {
            let h = harmony_score(p);
            assert!((0.0..=1.0).contains(&h), "{h}");
        }
    }

    #[test]
    fn analogous_palette_beats_clashing_palette() {
        // Blues at graded lightness: same temperature, same saturation,
        // moderate lightness spread.
        let blue = |l: f64| rgb_to_hex(hsl_to_rgb(Hsl { h: 210.0, s: 0.6, l }));
        let analogous =
            derive_palette(&blue(0.25), &blue(0.45), &blue(0.65), &blue(0.85)).unwrap();
        let clashing = derive_palette("#FF0000", "#00FFFF", "#FFFFFF", "#000000").unwrap();
        assert!(harmony_score(&analogous) > harmony_score(&clashing));
    }

    #[test]
    fn flat_lightness_is_penalized() {
        assert_eq!(lightness_window(0.0), 1.0 - 0.15 / 0.25);
        assert_eq!(lightness_window(0.2), 1.0);
        assert_eq!(lightness_window(1.0), 0.0);
    }

    // =========================================================================
    // Annotation
    // =========================================================================

    #[test]
    fn annotation_flags_light_colors_against_white() {
        // #F4F4F4 (1.04:1) and #E8B86D (1.32:1) are too light for white;
        // #4A90E2 and #7FB069 clear 1.5 on both sides.
        let annotated = annotate_palette("calming-blue", calming_blue(), 1.5, 0.0);
        let flagged: Vec<PaletteRole> = annotated.flagged().map(|s| s.role).collect();
        assert_eq!(flagged, vec![PaletteRole::Tertiary, PaletteRole::Accent]);
        // Flagged, not dropped
        assert_eq!(annotated.swatches.len(), 4);
    }

    #[test]
    fn annotation_covers_every_shade() {
        let annotated = annotate_palette("calming-blue", calming_blue(), 1.5, 0.0);
        for swatch in &annotated.swatches {
            assert_eq!(swatch.shades.len(), RAMP_STEPS.len());
            for shade in &swatch.shades {
                assert!(shade.on_white >= 1.0 && shade.on_white <= 21.0 + 1e-9);
                assert!(shade.on_black >= 1.0 && shade.on_black <= 21.0 + 1e-9);
            }
        }
    }

    #[test]
    fn annotation_records_harmony() {
        let spec = calming_blue();
        let expected = harmony_score(&spec);
        let annotated = annotate_palette("calming-blue", spec, 1.5, 0.42);
        assert_eq!(annotated.harmony, expected);
        assert_eq!(annotated.fit_score, 0.42);
    }
}

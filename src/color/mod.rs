//! Color harmony: pure color-space math and palette derivation.
//!
//! - **Conversion**: hex ↔ RGB ↔ HSL, lighten/darken, contrast, temperature
//! - **Palette**: shade ramps, harmony scoring, contrast annotation
//!
//! Nothing here performs I/O or keeps state. Malformed input surfaces as
//! [`ColorError`]; callers that must not fail use [`parse_or_neutral`].

pub mod convert;
pub mod palette;

pub use convert::{
    ColorError, Hsl, MAX_CONTRAST_RATIO, Rgb, color_temperature, color_temperature_rgb,
    contrast_ratio, contrast_ratio_rgb, darken, darken_rgb, hex_to_rgb, hsl_to_rgb, lighten,
    lighten_rgb, luminance, normalize_hex, rgb_to_hex, rgb_to_hsl,
};
pub use palette::{
    AnnotatedPalette, PaletteRole, PaletteSpec, ShadeRamp, Swatch, annotate_palette,
    derive_palette, derive_palette_rgb, harmony_score, mean_temperature,
};

/// Parse `hex`, substituting `neutral` when it is malformed.
///
/// Returns the parsed color and the parse error, if one was recovered from,
/// so the caller can record a warning.
pub fn parse_or_neutral(hex: &str, neutral: Rgb) -> (Rgb, Option<ColorError>) {
    match hex_to_rgb(hex) {
        Ok(rgb) => (rgb, None),
        Err(e) => (neutral, Some(e)),
    }
}

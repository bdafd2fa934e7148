//! Pure color-space math: hex ↔ RGB ↔ HSL, interpolation, contrast.
//!
//! All functions here are pure and testable without any I/O.

use std::fmt;
use thiserror::Error;

/// Ratio returned by [`contrast_ratio`] for pure white against pure black.
///
/// Luminance here is the simplified `0.299R + 0.587G + 0.114B` weighting, so
/// the maximum is `(1.0 + 0.05) / (0.0 + 0.05)`. This is not WCAG relative
/// luminance; treat ratios as a coarse legibility signal.
pub const MAX_CONTRAST_RATIO: f64 = 21.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("invalid hex color {0:?}: expected #RRGGBB")]
    Parse(String),
}

/// An 8-bit sRGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&rgb_to_hex(*self))
    }
}

/// Hue in degrees `[0, 360)`, saturation and lightness in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

/// Parse a `#RRGGBB` string (hex digits in either case).
///
/// Shorthand (`#fff`), missing `#`, and alpha channels are rejected so that
/// every accepted input round-trips through [`rgb_to_hex`] unchanged apart
/// from case.
pub fn hex_to_rgb(hex: &str) -> Result<Rgb, ColorError> {
    let err = || ColorError::Parse(hex.to_string());
    let digits = hex.strip_prefix('#').ok_or_else(err)?;
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(err());
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| err());
    Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
}

/// Format as uppercase `#RRGGBB`.
pub fn rgb_to_hex(rgb: Rgb) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb.r, rgb.g, rgb.b)
}

/// Canonical uppercase form of a hex color.
pub fn normalize_hex(hex: &str) -> Result<String, ColorError> {
    hex_to_rgb(hex).map(rgb_to_hex)
}

pub fn rgb_to_hsl(rgb: Rgb) -> Hsl {
    let r = rgb.r as f64 / 255.0;
    let g = rgb.g as f64 / 255.0;
    let b = rgb.b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let delta = max - min;

    if delta == 0.0 {
        // Achromatic: hue is undefined, reported as 0.
        return Hsl { h: 0.0, s: 0.0, l };
    }

    let s = if l > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };

    let sector = if max == r {
        (g - b) / delta + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    Hsl {
        h: (sector * 60.0) % 360.0,
        s,
        l,
    }
}

pub fn hsl_to_rgb(hsl: Hsl) -> Rgb {
    let s = hsl.s.clamp(0.0, 1.0);
    let l = hsl.l.clamp(0.0, 1.0);

    if s == 0.0 {
        let v = to_channel(l);
        return Rgb::new(v, v, v);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let h = hsl.h.rem_euclid(360.0) / 360.0;

    Rgb::new(
        to_channel(hue_to_channel(p, q, h + 1.0 / 3.0)),
        to_channel(hue_to_channel(p, q, h)),
        to_channel(hue_to_channel(p, q, h - 1.0 / 3.0)),
    )
}

fn hue_to_channel(p: f64, q: f64, t: f64) -> f64 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn to_channel(unit: f64) -> u8 {
    (unit.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn interpolate(rgb: Rgb, target: f64, amount: f64) -> Rgb {
    let amount = amount.clamp(0.0, 1.0);
    let mix = |c: u8| {
        let c = c as f64;
        (c + (target - c) * amount).round().clamp(0.0, 255.0) as u8
    };
    Rgb::new(mix(rgb.r), mix(rgb.g), mix(rgb.b))
}

/// Move each channel toward 255 by `amount` (clamped to `[0, 1]`).
pub fn lighten_rgb(rgb: Rgb, amount: f64) -> Rgb {
    interpolate(rgb, 255.0, amount)
}

/// Move each channel toward 0 by `amount` (clamped to `[0, 1]`).
pub fn darken_rgb(rgb: Rgb, amount: f64) -> Rgb {
    interpolate(rgb, 0.0, amount)
}

pub fn lighten(hex: &str, amount: f64) -> Result<String, ColorError> {
    hex_to_rgb(hex).map(|rgb| rgb_to_hex(lighten_rgb(rgb, amount)))
}

pub fn darken(hex: &str, amount: f64) -> Result<String, ColorError> {
    hex_to_rgb(hex).map(|rgb| rgb_to_hex(darken_rgb(rgb, amount)))
}

/// Simplified luminance in `[0, 1]`.
pub fn luminance(rgb: Rgb) -> f64 {
    (0.299 * rgb.r as f64 + 0.587 * rgb.g as f64 + 0.114 * rgb.b as f64) / 255.0
}

/// `(max(L) + 0.05) / (min(L) + 0.05)`, symmetric in its arguments.
pub fn contrast_ratio_rgb(a: Rgb, b: Rgb) -> f64 {
    let la = luminance(a);
    let lb = luminance(b);
    (la.max(lb) + 0.05) / (la.min(lb) + 0.05)
}

pub fn contrast_ratio(a: &str, b: &str) -> Result<f64, ColorError> {
    Ok(contrast_ratio_rgb(hex_to_rgb(a)?, hex_to_rgb(b)?))
}

/// Perceived warmth of a color by hue bucket: 0.8 for reds/oranges down to
/// 0.1 for blues. Used by the calm dimension and palette fit.
pub fn color_temperature_rgb(rgb: Rgb) -> f64 {
    let h = rgb_to_hsl(rgb).h;
    match h {
        h if h < 60.0 => 0.8,
        h if h < 120.0 => 0.4,
        h if h < 180.0 => 0.2,
        h if h < 240.0 => 0.1,
        h if h < 300.0 => 0.3,
        _ => 0.6,
    }
}

pub fn color_temperature(hex: &str) -> Result<f64, ColorError> {
    hex_to_rgb(hex).map(color_temperature_rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Hex parsing
    // =========================================================================

    #[test]
    fn parses_uppercase_and_lowercase() {
        assert_eq!(hex_to_rgb("#4A90E2").unwrap(), Rgb::new(74, 144, 226));
        assert_eq!(hex_to_rgb("#4a90e2").unwrap(), Rgb::new(74, 144, 226));
    }

    #[test]
    fn rejects_malformed_hex() {
        for bad in ["4A90E2", "#fff", "#4A90E2FF", "#GGGGGG", "", "#", "#12345"] {
            assert_eq!(
                hex_to_rgb(bad),
                Err(ColorError::Parse(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn hex_round_trip_is_case_normalized() {
        for hex in ["#000000", "#ffffff", "#4a90e2", "#7FB069", "#F4f4F4", "#e8b86d"] {
            let back = rgb_to_hex(hex_to_rgb(hex).unwrap());
            assert_eq!(back, hex.to_uppercase());
        }
    }

    #[test]
    fn hex_round_trip_exhaustive_channel_values() {
        for v in 0..=255u8 {
            let rgb = Rgb::new(v, 255 - v, v / 2);
            assert_eq!(hex_to_rgb(&rgb_to_hex(rgb)).unwrap(), rgb);
        }
    }

    // =========================================================================
    // HSL
    // =========================================================================

    #[test]
    fn hsl_of_primaries() {
        let red = rgb_to_hsl(Rgb::new(255, 0, 0));
        assert_eq!(red.h, 0.0);
        assert_eq!(red.s, 1.0);
        assert_eq!(red.l, 0.5);

        let blue = rgb_to_hsl(Rgb::new(0, 0, 255));
        assert!((blue.h - 240.0).abs() < 1e-9);
    }

    #[test]
    fn gray_is_achromatic() {
        let gray = rgb_to_hsl(Rgb::new(128, 128, 128));
        assert_eq!(gray.h, 0.0);
        assert_eq!(gray.s, 0.0);
    }

    #[test]
    fn hsl_round_trip_within_one_step() {
        for r in (0..=255u16).step_by(17) {
            for g in (0..=255u16).step_by(51) {
                for b in (0..=255u16).step_by(85) {
                    let rgb = Rgb::new(r as u8, g as u8, b as u8);
                    let back = hsl_to_rgb(rgb_to_hsl(rgb));
                    assert!((back.r as i16 - rgb.r as i16).abs() <= 1, "{rgb} -> {back}");
                    assert!((back.g as i16 - rgb.g as i16).abs() <= 1, "{rgb} -> {back}");
                    assert!((back.b as i16 - rgb.b as i16).abs() <= 1, "{rgb} -> {back}");
                }
            }
        }
    }

    // =========================================================================
    // Lighten / darken
    // =========================================================================

    #[test]
    fn lighten_interpolates_toward_white() {
        assert_eq!(lighten("#000000", 0.5).unwrap(), "#808080");
        assert_eq!(lighten("#4A90E2", 0.0).unwrap(), "#4A90E2");
        assert_eq!(lighten("#4A90E2", 1.0).unwrap(), "#FFFFFF");
    }

    #[test]
    fn darken_interpolates_toward_black() {
        assert_eq!(darken("#FFFFFF", 0.5).unwrap(), "#808080");
        assert_eq!(darken("#4A90E2", 1.0).unwrap(), "#000000");
    }

    #[test]
    fn amounts_are_clamped() {
        assert_eq!(lighten("#102030", 2.0).unwrap(), "#FFFFFF");
        assert_eq!(darken("#102030", -1.0).unwrap(), "#102030");
    }

    // =========================================================================
    // Contrast
    // =========================================================================

    #[test]
    fn contrast_with_self_is_one() {
        for hex in ["#000000", "#FFFFFF", "#4A90E2", "#808080"] {
            assert_eq!(contrast_ratio(hex, hex).unwrap(), 1.0);
        }
    }

    #[test]
    fn white_on_black_is_documented_maximum() {
        let ratio = contrast_ratio("#FFFFFF", "#000000").unwrap();
        assert!((ratio - MAX_CONTRAST_RATIO).abs() < 1e-9);
        assert_eq!(ratio, contrast_ratio("#000000", "#FFFFFF").unwrap());
    }

    #[test]
    fn contrast_propagates_parse_errors() {
        assert!(contrast_ratio("#FFFFFF", "black").is_err());
    }

    // =========================================================================
    // Temperature
    // =========================================================================

    #[test]
    fn temperature_buckets() {
        assert_eq!(color_temperature("#FF0000").unwrap(), 0.8); // 0°
        assert_eq!(color_temperature("#FFFF00").unwrap(), 0.4); // 60°
        assert_eq!(color_temperature("#00FF00").unwrap(), 0.2); // 120°
        assert_eq!(color_temperature("#00FFFF").unwrap(), 0.1); // 180°
        assert_eq!(color_temperature("#0000FF").unwrap(), 0.3); // 240°
        assert_eq!(color_temperature("#FF00FF").unwrap(), 0.6); // 300°
    }

    #[test]
    fn calming_blue_is_very_cool() {
        // #4A90E2 sits at ~212°
        assert_eq!(color_temperature("#4A90E2").unwrap(), 0.1);
    }
}

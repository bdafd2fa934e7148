//! Engine configuration: the static rubric, weight, sector, provider and
//! strategy tables.
//!
//! Tables are loaded once at process start and shared read-only. Loading is
//! layered: the stock `engine.toml` compiled into the binary is the base,
//! a user `engine.toml` in the config directory is merged over it key-by-key,
//! and every `sectors/<name>.toml` file is merged under `[sectors.<name>]`.
//!
//! ## Config Directory Layout
//!
//! ```text
//! config/
//! ├── engine.toml          # Overrides stock defaults (sparse)
//! ├── catalogs/
//! │   └── premium.json     # Referenced by a `kind = "catalog"` provider
//! └── sectors/
//!     ├── therapy.toml     # Merged into [sectors.therapy]
//!     └── bakery.toml      # A new sector: [sectors.bakery]
//! ```
//!
//! ## Partial Configuration
//!
//! Overlays only need the keys they change:
//!
//! ```toml
//! [palette]
//! min_contrast = 2.0
//!
//! [sectors.therapy.rubrics.calm.markers]
//! "sand tray" = 0.1
//! ```
//!
//! Arrays (providers, strategies, palettes) are replaced as a whole. Unknown
//! keys are rejected to catch typos early. Run `photo-engine gen-config` for
//! the full commented stock file.

use crate::color::hex_to_rgb;
use crate::profile::Level;
use crate::strategy::StrategyDefinition;
use crate::types::{Dimension, QualityTier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

/// Tolerance for section weight tables summing to 1.
const WEIGHT_SUM_EPSILON: f64 = 1e-6;

const STOCK_CONFIG: &str = include_str!("engine.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// All static tables. Built by [`load_config`] or [`resolve_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    pub engine: EngineSettings,
    pub scoring: ScoringSettings,
    pub palette: PaletteSettings,
    pub diagnostics: DiagnosticsSettings,
    pub rubrics: BTreeMap<Dimension, Rubric>,
    pub sections: BTreeMap<String, SectionWeights>,
    pub sectors: BTreeMap<String, SectorTable>,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub strategies: Vec<StrategyDefinition>,
}

/// Retrieval and determinism settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSettings {
    /// Maximum concurrent provider lookups.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(default)]
    pub max_parallel_lookups: Option<usize>,
    /// Timeout applied to providers that do not declare their own.
    pub lookup_timeout_ms: u64,
    /// Seed for the deterministic id source.
    pub seed: String,
    pub placeholder_base_url: String,
    /// Substitute for malformed colors.
    pub neutral_color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringSettings {
    pub tag_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaletteSettings {
    pub min_contrast: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagnosticsSettings {
    pub low_score_threshold: f64,
}

/// Base rubric for one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rubric {
    pub base: f64,
    /// Scores range over `[-1, 1]` and are mapped to `[0, 1]`.
    #[serde(default)]
    pub bipolar: bool,
    /// Share of the score taken from the coolness of the dominant color.
    #[serde(default)]
    pub color_weight: f64,
    /// Rationale tag attached when the dimension scores high.
    #[serde(default)]
    pub tag: Option<String>,
    /// Marker phrase → signed weight.
    #[serde(default)]
    pub markers: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideMode {
    /// Merge override markers over the base list; override weights win.
    #[default]
    Extend,
    /// Discard the base markers.
    Replace,
}

/// Sector-specific adjustment of a base rubric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RubricOverride {
    pub mode: OverrideMode,
    pub base: Option<f64>,
    pub color_weight: Option<f64>,
    pub tag: Option<String>,
    pub markers: BTreeMap<String, f64>,
}

/// Weight per dimension for one page section. Sums to 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionWeights(pub BTreeMap<Dimension, f64>);

impl SectionWeights {
    pub fn weight(&self, dimension: Dimension) -> f64 {
        self.0.get(&dimension).copied().unwrap_or(0.0)
    }

    /// Dimensions with a non-zero weight.
    pub fn weighted(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        self.0
            .iter()
            .filter(|(_, w)| **w > 0.0)
            .map(|(&d, &w)| (d, w))
    }
}

/// A named set of four base colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasePalette {
    pub name: String,
    pub primary: String,
    pub secondary: String,
    pub tertiary: String,
    pub accent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectorTable {
    #[serde(default)]
    pub label: String,
    pub anxiety_level: Level,
    pub trust_requirement: Level,
    pub professional_level: Level,
    pub palettes: Vec<BasePalette>,
    #[serde(default)]
    pub rubrics: BTreeMap<Dimension, RubricOverride>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Catalog,
    Generated,
}

/// One `[[providers]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    #[serde(default)]
    pub tier: QualityTier,
    #[serde(default)]
    pub psychology_optimized: bool,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Catalog JSON file, relative to the config directory.
    #[serde(default)]
    pub catalog: Option<String>,
    /// URL prefix for generated images.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl EngineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.lookup_timeout_ms == 0 {
            return Err(invalid("engine.lookup_timeout_ms must be positive"));
        }
        if self.engine.max_parallel_lookups == Some(0) {
            return Err(invalid("engine.max_parallel_lookups must be at least 1"));
        }
        if hex_to_rgb(&self.engine.neutral_color).is_err() {
            return Err(invalid(format!(
                "engine.neutral_color {:?} is not a #RRGGBB color",
                self.engine.neutral_color
            )));
        }
        if !(0.0..=1.0).contains(&self.scoring.tag_threshold) {
            return Err(invalid("scoring.tag_threshold must be 0-1"));
        }
        if !(1.0..=crate::color::MAX_CONTRAST_RATIO).contains(&self.palette.min_contrast) {
            return Err(invalid("palette.min_contrast must be 1-21"));
        }
        if !(0.0..=1.0).contains(&self.diagnostics.low_score_threshold) {
            return Err(invalid("diagnostics.low_score_threshold must be 0-1"));
        }

        for dimension in Dimension::ALL {
            let rubric = self
                .rubrics
                .get(&dimension)
                .ok_or_else(|| invalid(format!("rubrics.{} is missing", dimension)))?;
            check_rubric_ranges(
                &format!("rubrics.{}", dimension),
                rubric.bipolar,
                Some(rubric.base),
                Some(rubric.color_weight),
            )?;
        }

        if !self.sections.contains_key("default") {
            return Err(invalid("sections.default is missing"));
        }
        for (name, weights) in &self.sections {
            if weights.0.values().any(|w| *w < 0.0) {
                return Err(invalid(format!("sections.{} has a negative weight", name)));
            }
            let sum: f64 = weights.0.values().sum();
            if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
                return Err(invalid(format!(
                    "sections.{} weights sum to {:.4}, expected 1.0",
                    name, sum
                )));
            }
        }

        if self.sectors.is_empty() {
            return Err(invalid("at least one sector is required"));
        }
        for (id, sector) in &self.sectors {
            if id.trim().is_empty() || id != &id.to_lowercase() {
                return Err(invalid(format!("sector id {:?} must be lowercase", id)));
            }
            if sector.palettes.is_empty() {
                return Err(invalid(format!("sectors.{} needs at least one palette", id)));
            }
            for palette in &sector.palettes {
                for hex in [
                    &palette.primary,
                    &palette.secondary,
                    &palette.tertiary,
                    &palette.accent,
                ] {
                    if hex_to_rgb(hex).is_err() {
                        return Err(invalid(format!(
                            "sectors.{} palette {:?}: {:?} is not a #RRGGBB color",
                            id, palette.name, hex
                        )));
                    }
                }
            }
            for (dimension, rubric) in &sector.rubrics {
                let bipolar = self
                    .rubrics
                    .get(dimension)
                    .map(|r| r.bipolar)
                    .unwrap_or(false);
                check_rubric_ranges(
                    &format!("sectors.{}.rubrics.{}", id, dimension),
                    bipolar,
                    rubric.base,
                    rubric.color_weight,
                )?;
            }
        }

        let mut provider_ids = BTreeSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(invalid("provider id must not be empty"));
            }
            if !provider_ids.insert(provider.id.as_str()) {
                return Err(invalid(format!("duplicate provider id {:?}", provider.id)));
            }
            if provider.kind == ProviderKind::Catalog && provider.catalog.is_none() {
                return Err(invalid(format!(
                    "provider {:?} is a catalog but has no `catalog` file",
                    provider.id
                )));
            }
            if provider.timeout_ms == Some(0) {
                return Err(invalid(format!(
                    "provider {:?} timeout_ms must be positive",
                    provider.id
                )));
            }
        }

        if self.strategies.is_empty() {
            return Err(invalid("at least one strategy is required"));
        }
        let mut strategy_ids = BTreeSet::new();
        for strategy in &self.strategies {
            if !strategy_ids.insert(strategy.id.as_str()) {
                return Err(invalid(format!("duplicate strategy id {:?}", strategy.id)));
            }
            strategy
                .validate()
                .map_err(|msg| invalid(format!("strategy {:?}: {}", strategy.id, msg)))?;
        }
        Ok(())
    }

    /// Weight table for a section, falling back to `[sections.default]`.
    pub fn section_weights(&self, section: &str) -> &SectionWeights {
        self.sections
            .get(section)
            .or_else(|| self.sections.get("default"))
            .unwrap_or(&EMPTY_WEIGHTS)
    }
}

static EMPTY_WEIGHTS: SectionWeights = SectionWeights(BTreeMap::new());

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn check_rubric_ranges(
    path: &str,
    bipolar: bool,
    base: Option<f64>,
    color_weight: Option<f64>,
) -> Result<(), ConfigError> {
    let lower = if bipolar { -1.0 } else { 0.0 };
    if base.is_some_and(|b| !(lower..=1.0).contains(&b)) {
        return Err(invalid(format!("{}.base must be {}-1", path, lower)));
    }
    if color_weight.is_some_and(|w| !(0.0..=1.0).contains(&w)) {
        return Err(invalid(format!("{}.color_weight must be 0-1", path)));
    }
    Ok(())
}

/// Resolve the effective lookup parallelism from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &EngineSettings) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_parallel_lookups
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock tables as a `toml::Value::Table`.
///
/// This is the base layer every user overlay is merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::from_str(STOCK_CONFIG).expect("stock engine.toml must parse")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `engine.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `engine.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("engine.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Collect `sectors/*.toml` into one overlay of the form
/// `{ sectors = { <stem> = <file contents> } }`.
///
/// Files are visited in name order. Returns `Ok(None)` when the directory
/// is absent or holds no TOML files.
pub fn load_sector_overlays(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let sectors_dir = dir.join("sectors");
    if !sectors_dir.is_dir() {
        return Ok(None);
    }

    let mut sectors = toml::Table::new();
    for entry in WalkDir::new(&sectors_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| ConfigError::Io(e.into()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "toml") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let content = fs::read_to_string(path)?;
        let value: toml::Value = toml::from_str(&content)?;
        sectors.insert(stem.to_lowercase(), value);
    }

    if sectors.is_empty() {
        return Ok(None);
    }
    let mut root = toml::Table::new();
    root.insert("sectors".into(), toml::Value::Table(sectors));
    Ok(Some(toml::Value::Table(root)))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EngineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EngineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the tables for a config directory.
///
/// Stock defaults, then `engine.toml`, then `sectors/*.toml`. Rejects unknown
/// keys and validates the result.
pub fn load_config(dir: &Path) -> Result<EngineConfig, ConfigError> {
    let mut base = stock_defaults_value();
    if let Some(user) = load_raw_config(dir)? {
        base = merge_toml(base, user);
    }
    let sectors = load_sector_overlays(dir)?;
    resolve_config(base, sectors)
}

/// The stock tables, validated.
pub fn stock_config() -> Result<EngineConfig, ConfigError> {
    resolve_config(stock_defaults_value(), None)
}

/// Returns the fully-commented stock `engine.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    STOCK_CONFIG
}

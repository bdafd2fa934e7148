//! Strategy (conversion path) selection.
//!
//! A strategy is an ordered sequence of page steps with a historical base
//! conversion rate. Fit bonuses are data: each one pairs a [`Condition`] on
//! the client profile or on the request's aggregates with an additive bonus.
//!
//! ```text
//! score(strategy) = base_rate + Σ bonus for every condition that holds
//! ```
//!
//! The highest score wins; ties go to the strategy declared first. The
//! choice carries the two next-best strategies and the bonuses that applied,
//! so callers can show why.

use crate::profile::{ClientProfile, Level};
use crate::types::{AttributeScores, Dimension};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of runner-up strategies reported alongside the winner.
pub const RUNNERS_UP: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyDefinition {
    pub id: String,
    pub steps: Vec<String>,
    pub base_rate: f64,
    #[serde(default)]
    pub bonuses: Vec<BonusRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BonusRule {
    pub when: Condition,
    pub bonus: f64,
}

/// Condition under which a bonus applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Sector(String),
    AnxietyLevel(Level),
    TrustRequirement(Level),
    ProfessionalLevel(Level),
    /// Profile lists this audience tag.
    Audience(String),
    /// Average of a dimension over every selected entry is at least `value`.
    DimensionAtLeast { dimension: Dimension, value: f64 },
    PaletteHarmonyAtLeast(f64),
}

/// Everything a condition can look at.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    pub profile: &'a ClientProfile,
    /// Per-dimension averages over all selected entries.
    pub averages: &'a AttributeScores,
    pub palette_harmony: f64,
}

impl Condition {
    pub fn holds(&self, ctx: &StrategyContext<'_>) -> bool {
        match self {
            Condition::Sector(sector) => ctx.profile.sector.eq_ignore_ascii_case(sector),
            Condition::AnxietyLevel(level) => ctx.profile.anxiety_level == *level,
            Condition::TrustRequirement(level) => ctx.profile.trust_requirement == *level,
            Condition::ProfessionalLevel(level) => ctx.profile.professional_level == *level,
            Condition::Audience(tag) => ctx.profile.has_audience(tag),
            Condition::DimensionAtLeast { dimension, value } => {
                ctx.averages.get(*dimension) >= *value
            }
            Condition::PaletteHarmonyAtLeast(value) => ctx.palette_harmony >= *value,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Sector(sector) => write!(f, "sector = {}", sector),
            Condition::AnxietyLevel(level) => write!(f, "anxiety_level = {}", level),
            Condition::TrustRequirement(level) => write!(f, "trust_requirement = {}", level),
            Condition::ProfessionalLevel(level) => write!(f, "professional_level = {}", level),
            Condition::Audience(tag) => write!(f, "audience includes {}", tag),
            Condition::DimensionAtLeast { dimension, value } => {
                write!(f, "average {} >= {:.2}", dimension, value)
            }
            Condition::PaletteHarmonyAtLeast(value) => {
                write!(f, "palette harmony >= {:.2}", value)
            }
        }
    }
}

impl StrategyDefinition {
    /// Range checks run at config load.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("id must not be empty".into());
        }
        if self.steps.is_empty() {
            return Err("needs at least one step".into());
        }
        if !(0.0..=1.0).contains(&self.base_rate) {
            return Err("base_rate must be 0-1".into());
        }
        for rule in &self.bonuses {
            if !rule.bonus.is_finite() {
                return Err(format!("bonus for `{}` is not a number", rule.when));
            }
            match &rule.when {
                Condition::DimensionAtLeast { value, .. } | Condition::PaletteHarmonyAtLeast(value)
                    if !(0.0..=1.0).contains(value) =>
                {
                    return Err(format!("threshold in `{}` must be 0-1", rule.when));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn score(&self, ctx: &StrategyContext<'_>) -> ScoredStrategy {
        let applied: Vec<AppliedBonus> = self
            .bonuses
            .iter()
            .filter(|rule| rule.when.holds(ctx))
            .map(|rule| AppliedBonus {
                condition: rule.when.to_string(),
                bonus: rule.bonus,
            })
            .collect();
        let score = self.base_rate + applied.iter().map(|b| b.bonus).sum::<f64>();
        ScoredStrategy {
            id: self.id.clone(),
            steps: self.steps.clone(),
            base_rate: self.base_rate,
            score,
            applied,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedBonus {
    pub condition: String,
    pub bonus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredStrategy {
    pub id: String,
    pub steps: Vec<String>,
    pub base_rate: f64,
    pub score: f64,
    pub applied: Vec<AppliedBonus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyChoice {
    pub chosen: ScoredStrategy,
    /// Next-best strategies, best first. At most [`RUNNERS_UP`].
    pub runners_up: Vec<ScoredStrategy>,
}

/// Score the whole catalog and pick the best. `None` for an empty catalog.
pub fn select_strategy(
    catalog: &[StrategyDefinition],
    ctx: &StrategyContext<'_>,
) -> Option<StrategyChoice> {
    let mut scored: Vec<ScoredStrategy> = catalog.iter().map(|s| s.score(ctx)).collect();
    // Stable sort: equal scores keep declaration order.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut ranked = scored.into_iter();
    let chosen = ranked.next()?;
    Some(StrategyChoice {
        chosen,
        runners_up: ranked.take(RUNNERS_UP).collect(),
    })
}

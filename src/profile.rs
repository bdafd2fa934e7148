//! Client profile: who the site is for, derived once per request.
//!
//! The intake side hands over a [`ProfileDraft`] where only the sector is
//! mandatory. [`ClientProfile::derive`] fills the remaining levels from the
//! sector's defaults in the static tables. Sectors are table keys, not a
//! closed enum, so adding a sector is a config change.

use crate::config::EngineConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("profile is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unknown sector {sector:?} (known: {known})")]
    UnknownSector { sector: String, known: String },
}

/// Three-step intensity used for anxiety, trust and professionalism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of the client for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientProfile {
    pub sector: String,
    #[serde(default)]
    pub audience: BTreeSet<String>,
    pub anxiety_level: Level,
    pub trust_requirement: Level,
    pub professional_level: Level,
}

/// Intake-side profile: everything but the sector may be left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileDraft {
    pub sector: String,
    pub audience: Vec<String>,
    pub anxiety_level: Option<Level>,
    pub trust_requirement: Option<Level>,
    pub professional_level: Option<Level>,
}

impl ClientProfile {
    /// Build a profile from intake data, filling unset levels from the
    /// sector table.
    pub fn derive(draft: &ProfileDraft, config: &EngineConfig) -> Result<Self, ProfileError> {
        let sector = draft.sector.trim().to_lowercase();
        if sector.is_empty() {
            return Err(ProfileError::MissingField("sector"));
        }
        let table = config
            .sectors
            .get(&sector)
            .ok_or_else(|| unknown_sector(&sector, config))?;

        let audience = draft
            .audience
            .iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();

        Ok(Self {
            sector,
            audience,
            anxiety_level: draft.anxiety_level.unwrap_or(table.anxiety_level),
            trust_requirement: draft.trust_requirement.unwrap_or(table.trust_requirement),
            professional_level: draft.professional_level.unwrap_or(table.professional_level),
        })
    }

    /// Check a directly-constructed profile against the loaded tables.
    pub fn validate(&self, config: &EngineConfig) -> Result<(), ProfileError> {
        if self.sector.trim().is_empty() {
            return Err(ProfileError::MissingField("sector"));
        }
        if !config.sectors.contains_key(&self.sector) {
            return Err(unknown_sector(&self.sector, config));
        }
        Ok(())
    }

    pub fn has_audience(&self, tag: &str) -> bool {
        self.audience.contains(&tag.to_lowercase())
    }
}

fn unknown_sector(sector: &str, config: &EngineConfig) -> ProfileError {
    let known: Vec<&str> = config.sectors.keys().map(String::as_str).collect();
    ProfileError::UnknownSector {
        sector: sector.to_string(),
        known: known.join(", "),
    }
}

//! Request orchestration: profile in, [`SelectionResult`] out.
//!
//! ```text
//! validate profile ─→ retrieve ─→ score ─→ palette ─→ rank ─→ strategy ─→ diagnostics
//!   (fail fast)      (parallel)
//! ```
//!
//! Stages run in sequence; only retrieval fans out. Every keyword of every
//! section becomes a [`LookupKey`], and identical keys across sections are
//! looked up once. Anything that goes wrong after validation, short of
//! cancellation, ends up as a [`Warning`] in the result rather than an error.
//!
//! Progress is reported through an optional channel of [`SelectionEvent`]s,
//! formatted for the terminal by [`crate::output`].

use crate::color::{Rgb, parse_or_neutral};
use crate::config::EngineConfig;
use crate::diagnostics::{self, Warning};
use crate::ids::{IdSource, SeededIds};
use crate::profile::{ClientProfile, ProfileDraft, ProfileError};
use crate::provider::{
    Cancelled, CatalogError, LookupConstraints, LookupKey, Provider, Resolution, Resolver,
    build_providers,
};
use crate::rank::{PlaceholderFactory, rank_section};
use crate::score::{ScoredCandidate, Scorer};
use crate::strategy::{StrategyContext, select_strategy};
use crate::theme;
use crate::types::{CancelToken, SectionRequirement, SectionSelection, SelectionResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

const FALLBACK_NEUTRAL: Rgb = Rgb::new(128, 128, 128);

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("invalid profile: {0}")]
    InvalidProfile(#[from] ProfileError),
    #[error("request cancelled")]
    Cancelled,
    #[error("no strategies configured")]
    EmptyStrategyCatalog,
}

impl From<Cancelled> for SelectionError {
    fn from(_: Cancelled) -> Self {
        SelectionError::Cancelled
    }
}

/// JSON input accepted by the CLI: intake profile plus page sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionRequest {
    pub profile: ProfileDraft,
    pub sections: Vec<SectionRequirement>,
}

/// Progress events sent while a request runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    Started {
        sector: String,
        sections: usize,
    },
    Retrieved {
        lookups: usize,
        found: usize,
        failures: usize,
        elapsed: Duration,
    },
    PaletteChosen {
        name: String,
        harmony: f64,
        flagged: usize,
    },
    SectionRanked {
        section: String,
        selected: usize,
        placeholders: usize,
    },
    StrategyChosen {
        id: String,
        score: f64,
    },
    Finished {
        warnings: usize,
    },
}

/// A configured engine. Cheap to share; one instance serves many requests.
pub struct Engine {
    config: Arc<EngineConfig>,
    resolver: Resolver,
    ids: Arc<dyn IdSource>,
}

impl Engine {
    pub fn new(
        config: Arc<EngineConfig>,
        providers: Vec<Arc<dyn Provider>>,
        ids: Arc<dyn IdSource>,
    ) -> Self {
        let resolver = Resolver::new(
            providers,
            Duration::from_millis(config.engine.lookup_timeout_ms),
            crate::config::effective_threads(&config.engine),
        );
        Self {
            config,
            resolver,
            ids,
        }
    }

    /// Build the providers listed in the config, seeding ids from
    /// `engine.seed`. Catalog paths resolve against `base_dir`.
    pub fn from_config(config: Arc<EngineConfig>, base_dir: &Path) -> Result<Self, CatalogError> {
        let ids: Arc<dyn IdSource> = Arc::new(SeededIds::new(config.engine.seed.clone()));
        let providers = build_providers(&config.providers, base_dir, Arc::clone(&ids))?;
        Ok(Self::new(config, providers, ids))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Derive the profile from the request's draft, then [`Engine::select`].
    pub fn select_request(
        &self,
        request: &SelectionRequest,
        cancel: &CancelToken,
        progress: Option<Sender<SelectionEvent>>,
    ) -> Result<SelectionResult, SelectionError> {
        let profile = ClientProfile::derive(&request.profile, &self.config)?;
        self.select(&profile, &request.sections, cancel, progress)
    }

    /// Run one selection request.
    pub fn select(
        &self,
        profile: &ClientProfile,
        sections: &[SectionRequirement],
        cancel: &CancelToken,
        progress: Option<Sender<SelectionEvent>>,
    ) -> Result<SelectionResult, SelectionError> {
        profile.validate(&self.config)?;
        if self.config.strategies.is_empty() {
            return Err(SelectionError::EmptyStrategyCatalog);
        }
        let config = &*self.config;
        let emit = |event: SelectionEvent| {
            if let Some(tx) = &progress {
                tx.send(event).ok();
            }
        };
        info!(sector = %profile.sector, sections = sections.len(), "selection started");
        emit(SelectionEvent::Started {
            sector: profile.sector.clone(),
            sections: sections.len(),
        });
        let mut warnings = Vec::new();

        // Retrieval
        let started = Instant::now();
        let keys = lookup_keys(sections);
        let resolutions = self.resolver.resolve_all(&keys, cancel)?;
        let failures: usize = resolutions.values().map(|r| r.failures.len()).sum();
        for failure in resolutions.values().flat_map(|r| &r.failures) {
            warnings.push(Warning::ProviderFailed {
                provider: failure.provider.clone(),
                keyword: failure.keyword.clone(),
                error: failure.error.to_string(),
            });
        }
        let elapsed = started.elapsed();
        debug!(lookups = keys.len(), failures, ?elapsed, "retrieval finished");
        emit(SelectionEvent::Retrieved {
            lookups: keys.len(),
            found: resolutions.values().filter(|r| r.candidate.is_some()).count(),
            failures,
            elapsed,
        });

        // Scoring
        let scorer = Scorer::new(config, &profile.sector);
        let scored = score_resolutions(&scorer, &resolutions);
        let mut bad_colors = BTreeSet::new();
        for candidate in scored.values() {
            if candidate.color_error.is_some() && bad_colors.insert(&candidate.candidate.id) {
                warnings.push(Warning::ColorParse {
                    context: format!("candidate {}", candidate.candidate.id),
                    value: candidate.candidate.dominant_color.clone(),
                });
            }
        }
        if cancel.is_cancelled() {
            return Err(SelectionError::Cancelled);
        }

        // Palette
        let (neutral, _) = parse_or_neutral(&config.engine.neutral_color, FALLBACK_NEUTRAL);
        let choice = theme::select_palette(
            config.sectors.get(&profile.sector),
            profile.anxiety_level,
            config.palette.min_contrast,
            neutral,
        );
        let palette = choice.palette;
        warnings.extend(choice.warnings);
        debug!(palette = %palette.name, harmony = palette.harmony, "palette chosen");
        emit(SelectionEvent::PaletteChosen {
            name: palette.name.clone(),
            harmony: palette.harmony,
            flagged: palette.flagged().count(),
        });

        // Ranking
        let placeholders = PlaceholderFactory::new(
            self.ids.as_ref(),
            &config.engine.placeholder_base_url,
            &config.engine.neutral_color,
        );
        let mut selections: Vec<SectionSelection> = Vec::with_capacity(sections.len());
        for requirement in sections {
            let constraints = constraints_for(requirement);
            let mut candidates: Vec<ScoredCandidate> = Vec::new();
            for keyword in usable_keywords(requirement) {
                match scored.get(&LookupKey::new(keyword, constraints)) {
                    Some(candidate) => candidates.push(candidate.clone()),
                    None => warnings.push(Warning::NoCandidateFound {
                        section: requirement.name.clone(),
                        keyword: keyword.to_string(),
                    }),
                }
            }

            let ranking = rank_section(
                requirement,
                &candidates,
                config.section_weights(&requirement.name),
                &scorer,
                &placeholders,
            );
            if ranking.placeholders > 0 {
                warnings.push(Warning::SectionPadded {
                    section: requirement.name.clone(),
                    placeholders: ranking.placeholders,
                });
            }
            emit(SelectionEvent::SectionRanked {
                section: requirement.name.clone(),
                selected: ranking.selection.entries.len() - ranking.placeholders,
                placeholders: ranking.placeholders,
            });
            selections.push(ranking.selection);
        }
        if cancel.is_cancelled() {
            return Err(SelectionError::Cancelled);
        }

        // Strategy
        let averages = diagnostics::dimension_averages(&selections);
        let ctx = StrategyContext {
            profile,
            averages: &averages,
            palette_harmony: palette.harmony,
        };
        let strategy =
            select_strategy(&config.strategies, &ctx).ok_or(SelectionError::EmptyStrategyCatalog)?;
        debug!(strategy = %strategy.chosen.id, score = strategy.chosen.score, "strategy chosen");
        emit(SelectionEvent::StrategyChosen {
            id: strategy.chosen.id.clone(),
            score: strategy.chosen.score,
        });

        // Diagnostics
        let diagnostics = diagnostics::build(
            config,
            &selections,
            &palette,
            warnings,
            self.resolver.has_psychology_optimized(),
        );
        info!(warnings = diagnostics.warnings.len(), "selection finished");
        emit(SelectionEvent::Finished {
            warnings: diagnostics.warnings.len(),
        });

        Ok(SelectionResult {
            sector: profile.sector.clone(),
            sections: selections,
            palette,
            strategy,
            diagnostics,
        })
    }
}

fn constraints_for(requirement: &SectionRequirement) -> LookupConstraints {
    LookupConstraints {
        orientation: requirement.orientation,
        quality: requirement.quality,
    }
}

/// Keywords in priority order, blanks skipped.
fn usable_keywords(requirement: &SectionRequirement) -> impl Iterator<Item = &str> {
    requirement
        .keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
}

/// Unique lookups across all sections.
fn lookup_keys(sections: &[SectionRequirement]) -> BTreeSet<LookupKey> {
    sections
        .iter()
        .flat_map(|requirement| {
            let constraints = constraints_for(requirement);
            usable_keywords(requirement).map(move |k| LookupKey::new(k, constraints))
        })
        .collect()
}

fn score_resolutions<'a>(
    scorer: &Scorer,
    resolutions: &'a BTreeMap<LookupKey, Resolution>,
) -> BTreeMap<&'a LookupKey, ScoredCandidate> {
    resolutions
        .iter()
        .filter_map(|(key, resolution)| {
            let retrieved = resolution.candidate.clone()?;
            Some((key, scorer.score_all(retrieved)))
        })
        .collect()
}

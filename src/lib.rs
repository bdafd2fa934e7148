//! # Photo Engine
//!
//! Scores and selects visual assets for generated small business websites.
//! Given a client profile (sector, audience, anxiety/trust/professionalism
//! levels) and the page sections that need images, the engine retrieves
//! candidates from a chain of providers, scores them along psychological
//! dimensions, ranks them per section, picks a color palette and a
//! conversion strategy, and explains all of it in a diagnostics report.
//!
//! # Architecture: One Request, Seven Stages
//!
//! ```text
//! 1. Validate    profile         →  fail fast on unknown sector
//! 2. Retrieve    keywords        →  one candidate per (keyword, constraints)
//! 3. Score       candidates      →  trust, calm, professionalism, ... ∈ [0, 1]
//! 4. Palette     sector table    →  derived + contrast-annotated palette
//! 5. Rank        per section     →  exactly `count` entries, padded if needed
//! 6. Strategy    profile + aggregates → best conversion path + 2 runners-up
//! 7. Diagnose    everything      →  averages, warnings, recommendations
//! ```
//!
//! Only retrieval does I/O, and only retrieval runs in parallel. Everything
//! after it is a pure function of its inputs and the static tables, so the
//! same request against the same provider answers yields byte-identical
//! JSON.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Orchestrates the stages; entry point is [`pipeline::Engine`] |
//! | [`provider`] | Provider trait, catalog and generated providers, fallback resolver |
//! | [`score`] | Rubric composition and per-dimension scoring |
//! | [`rank`] | Per-section ranking and placeholder padding |
//! | [`strategy`] | Strategy catalog scoring and selection |
//! | [`theme`] | Palette selection for a sector and profile |
//! | [`color`] | Color-space math, shade ramps, harmony, contrast |
//! | [`diagnostics`] | Warnings, averages, recommendations |
//! | [`config`] | Layered `engine.toml` loading, sector overlays, validation |
//! | [`profile`] | Client profile derivation from intake data |
//! | [`ids`] | Deterministic id source for placeholders and generated images |
//! | [`types`] | Shared types passed between stages and serialized in results |
//! | [`output`] | CLI output formatting for progress, summaries and palettes |
//!
//! # Design Decisions
//!
//! ## Tables Are Data
//!
//! Rubrics, section weights, sector defaults, palettes and strategy bonuses
//! all live in `engine.toml`. The stock file is embedded in the binary and
//! fully commented; a user file and `sectors/*.toml` overlays are merged over
//! it key by key. Adding a sector or tuning a weight never touches code.
//!
//! ## Failures Become Warnings
//!
//! A provider that times out, errors or panics is just a provider without a
//! candidate. A malformed color becomes neutral gray. A section short on
//! candidates is padded with placeholders. All of these are recorded in the
//! diagnostics; only an invalid profile or a cancellation ends a request.
//!
//! ## Keywords, Not Pixels
//!
//! Scores are deterministic functions of keyword and text markers plus the
//! dominant color. There is no perception model; the point is a consistent,
//! explainable ranking, with rationale tags saying why an image scored well.

pub mod color;
pub mod config;
pub mod diagnostics;
pub mod ids;
pub mod output;
pub mod pipeline;
pub mod profile;
pub mod provider;
pub mod rank;
pub mod score;
pub mod strategy;
pub mod theme;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

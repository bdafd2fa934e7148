//! Candidate sources and the fallback resolver in front of them.
//!
//! A [`Provider`] answers "give me one image for this keyword". It may be
//! slow, fail, or return garbage; none of that escapes the
//! [`Resolver`](resolver::Resolver), which tries providers in order and
//! turns every failure into "no candidate from this provider".
//!
//! Two implementations ship with the engine:
//!
//! | Kind | Type | Source |
//! |------|------|--------|
//! | `catalog` | [`CatalogProvider`] | keyword → JSON payload file |
//! | `generated` | [`GeneratedProvider`] | deterministic generated images |
//!
//! Tests plug in their own doubles (see `test_helpers`).

pub mod catalog;
pub mod generated;
pub mod resolver;

pub use catalog::{CatalogError, CatalogProvider};
pub use generated::GeneratedProvider;
pub use resolver::{
    Cancelled, LookupKey, ProviderFailure, Resolution, Resolver, RetrievedCandidate,
};

use crate::config::{ProviderConfig, ProviderKind};
use crate::ids::IdSource;
use crate::types::{CancelToken, Candidate, Orientation, QualityTier};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Longest a [`LookupContext::pause`] sleeps between checks.
const PAUSE_SLICE: Duration = Duration::from_millis(10);

/// Stock URL prefix for generated images when a provider entry sets none.
const DEFAULT_GENERATED_BASE_URL: &str = "https://images.example.invalid/generated";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("lookup timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// What a provider declares about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub id: String,
    pub tier: QualityTier,
    pub psychology_optimized: bool,
    /// Overrides the engine-wide lookup timeout.
    pub timeout: Option<Duration>,
}

impl ProviderDescriptor {
    pub fn new(id: impl Into<String>, tier: QualityTier) -> Self {
        Self {
            id: id.into(),
            tier,
            psychology_optimized: false,
            timeout: None,
        }
    }

    fn from_config(config: &ProviderConfig) -> Self {
        Self {
            id: config.id.clone(),
            tier: config.tier,
            psychology_optimized: config.psychology_optimized,
            timeout: config.timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Section-level constraints passed along with each keyword.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LookupConstraints {
    pub orientation: Orientation,
    pub quality: QualityTier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub keyword: String,
    pub constraints: LookupConstraints,
}

impl LookupRequest {
    pub fn new(keyword: impl Into<String>, constraints: LookupConstraints) -> Self {
        Self {
            keyword: keyword.into(),
            constraints,
        }
    }
}

/// Deadline and cancellation for one provider attempt.
///
/// Providers that block (network calls, retries, backoff) call
/// [`checkpoint`](Self::checkpoint) or [`pause`](Self::pause) so an expired
/// or cancelled attempt stops instead of running on in the background.
#[derive(Debug, Clone)]
pub struct LookupContext {
    budget: Duration,
    deadline: Instant,
    cancel: CancelToken,
}

impl LookupContext {
    pub fn new(budget: Duration, cancel: CancelToken) -> Self {
        Self {
            budget,
            deadline: Instant::now() + budget,
            cancel,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `Err` once the attempt is cancelled or past its deadline.
    pub fn checkpoint(&self) -> Result<(), ProviderError> {
        if self.is_cancelled() {
            return Err(ProviderError::Unavailable("lookup cancelled".into()));
        }
        if self.expired() {
            return Err(ProviderError::Timeout(self.budget));
        }
        Ok(())
    }

    /// Sleep for `duration`, waking early with `Err` on cancel or deadline.
    pub fn pause(&self, duration: Duration) -> Result<(), ProviderError> {
        let until = Instant::now() + duration;
        loop {
            self.checkpoint()?;
            let now = Instant::now();
            if now >= until {
                return Ok(());
            }
            std::thread::sleep((until - now).min(self.remaining()).min(PAUSE_SLICE));
        }
    }
}

/// A source of candidate images.
///
/// Implementations must be shareable across lookup threads. `Ok(None)` means
/// "nothing for this keyword"; errors are absorbed by the resolver. Long
/// running implementations honor `context` and return once it expires.
pub trait Provider: Send + Sync {
    fn descriptor(&self) -> &ProviderDescriptor;

    fn lookup(
        &self,
        request: &LookupRequest,
        context: &LookupContext,
    ) -> Result<Option<Candidate>, ProviderError>;
}

/// Construct providers from `[[providers]]` entries, in declaration order.
///
/// Catalog paths are resolved relative to `base_dir`.
pub fn build_providers(
    configs: &[ProviderConfig],
    base_dir: &Path,
    ids: Arc<dyn IdSource>,
) -> Result<Vec<Arc<dyn Provider>>, CatalogError> {
    let mut providers: Vec<Arc<dyn Provider>> = Vec::with_capacity(configs.len());
    for config in configs {
        let descriptor = ProviderDescriptor::from_config(config);
        match config.kind {
            ProviderKind::Catalog => {
                let file = config.catalog.as_deref().ok_or_else(|| {
                    CatalogError::MissingFile {
                        provider: config.id.clone(),
                    }
                })?;
                let provider = CatalogProvider::from_file(descriptor, &base_dir.join(file))?;
                providers.push(Arc::new(provider));
            }
            ProviderKind::Generated => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_GENERATED_BASE_URL.to_string());
                providers.push(Arc::new(GeneratedProvider::new(
                    descriptor,
                    base_url,
                    Arc::clone(&ids),
                )));
            }
        }
    }
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SeededIds;
    use std::fs;
    use tempfile::TempDir;

    fn ids() -> Arc<dyn IdSource> {
        Arc::new(SeededIds::new("test"))
    }

    #[test]
    fn build_providers_keeps_declaration_order() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("premium.json"), "{}").unwrap();
        let configs = vec![
            ProviderConfig {
                id: "premium".into(),
                kind: ProviderKind::Catalog,
                tier: QualityTier::Premium,
                psychology_optimized: true,
                timeout_ms: Some(250),
                catalog: Some("premium.json".into()),
                base_url: None,
            },
            ProviderConfig {
                id: "generated".into(),
                kind: ProviderKind::Generated,
                tier: QualityTier::Standard,
                psychology_optimized: false,
                timeout_ms: None,
                catalog: None,
                base_url: None,
            },
        ];
        let providers = build_providers(&configs, tmp.path(), ids()).unwrap();
        let descriptors: Vec<&ProviderDescriptor> =
            providers.iter().map(|p| p.descriptor()).collect();
        assert_eq!(descriptors[0].id, "premium");
        assert!(descriptors[0].psychology_optimized);
        assert_eq!(descriptors[0].timeout, Some(Duration::from_millis(250)));
        assert_eq!(descriptors[1].id, "generated");
        assert_eq!(descriptors[1].timeout, None);
    }

    #[test]
    fn build_providers_missing_catalog_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let configs = vec![ProviderConfig {
            id: "premium".into(),
            kind: ProviderKind::Catalog,
            tier: QualityTier::Premium,
            psychology_optimized: false,
            timeout_ms: None,
            catalog: Some("absent.json".into()),
            base_url: None,
        }];
        let result = build_providers(&configs, tmp.path(), ids());
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }

    #[test]
    fn timeout_error_reports_millis() {
        let err = ProviderError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "lookup timed out after 1500ms");
    }

    // =========================================================================
    // Lookup context
    // =========================================================================

    #[test]
    fn pause_stops_at_the_deadline() {
        let context = LookupContext::new(Duration::from_millis(20), CancelToken::new());
        let started = Instant::now();
        assert_eq!(
            context.pause(Duration::from_secs(5)),
            Err(ProviderError::Timeout(Duration::from_millis(20)))
        );
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(context.expired());
    }

    #[test]
    fn pause_wakes_on_cancel() {
        let cancel = CancelToken::new();
        let context = LookupContext::new(Duration::from_secs(10), cancel.clone());
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            cancel.cancel();
        });
        let started = Instant::now();
        assert!(matches!(
            context.pause(Duration::from_secs(5)),
            Err(ProviderError::Unavailable(_))
        ));
        assert!(started.elapsed() < Duration::from_secs(1));
        canceller.join().unwrap();
    }

    #[test]
    fn short_pause_within_budget_succeeds() {
        let context = LookupContext::new(Duration::from_secs(5), CancelToken::new());
        assert_eq!(context.pause(Duration::from_millis(5)), Ok(()));
        assert!(context.checkpoint().is_ok());
    }
}

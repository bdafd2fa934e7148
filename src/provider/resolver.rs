//! Fallback resolution across the provider chain.
//!
//! For one keyword the resolver walks the providers in a fixed order and
//! returns the first candidate any of them produces:
//!
//! ```text
//! providers meeting the section's tier (declaration order)
//!   then the remaining providers      (declaration order)
//! ```
//!
//! Every attempt runs on the calling thread with a [`LookupContext`] that
//! carries its deadline and the request's cancel token. A provider that
//! errors, panics or answers after its deadline counts as "no candidate" and
//! the next one is tried; the failure is recorded for diagnostics. A late
//! answer is discarded. Cancellation is checked before and after each attempt.
//!
//! [`Resolver::resolve_all`] fans unique lookups out over a rayon pool of
//! `max_parallel` threads, so at most that many provider calls are live at
//! once and none outlive the call. Results are keyed by [`LookupKey`], so
//! scheduling never affects the output.

use super::{LookupConstraints, LookupContext, LookupRequest, Provider, ProviderError};
use crate::types::{CancelToken, Candidate, QualityTier};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("request cancelled")]
pub struct Cancelled;

/// One unique lookup: keyword plus the section constraints that affect it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LookupKey {
    pub keyword: String,
    pub constraints: LookupConstraints,
}

impl LookupKey {
    pub fn new(keyword: impl Into<String>, constraints: LookupConstraints) -> Self {
        Self {
            keyword: keyword.into(),
            constraints,
        }
    }

    pub fn request(&self) -> LookupRequest {
        LookupRequest::new(self.keyword.clone(), self.constraints)
    }
}

/// A candidate plus what the resolver knows about the provider that made it.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedCandidate {
    pub candidate: Candidate,
    pub psychology_optimized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub keyword: String,
    pub error: ProviderError,
}

/// Outcome of resolving one keyword.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// `None` when every provider came up empty or failed.
    pub candidate: Option<RetrievedCandidate>,
    /// Failures absorbed along the way, in attempt order.
    pub failures: Vec<ProviderFailure>,
}

pub struct Resolver {
    providers: Vec<Arc<dyn Provider>>,
    default_timeout: Duration,
    max_parallel: usize,
}

impl Resolver {
    pub fn new(
        providers: Vec<Arc<dyn Provider>>,
        default_timeout: Duration,
        max_parallel: usize,
    ) -> Self {
        Self {
            providers,
            default_timeout,
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    pub fn has_psychology_optimized(&self) -> bool {
        self.providers
            .iter()
            .any(|p| p.descriptor().psychology_optimized)
    }

    /// Attempt order for a section's quality tier: a stable partition with
    /// tier-meeting providers first.
    pub fn ordered_for(&self, quality: QualityTier) -> Vec<&Arc<dyn Provider>> {
        let (preferred, rest): (Vec<_>, Vec<_>) = self
            .providers
            .iter()
            .partition(|p| p.descriptor().tier >= quality);
        preferred.into_iter().chain(rest).collect()
    }

    /// Resolve one keyword against the provider chain.
    pub fn resolve(
        &self,
        request: &LookupRequest,
        cancel: &CancelToken,
    ) -> Result<Resolution, Cancelled> {
        let mut resolution = Resolution::default();

        for provider in self.ordered_for(request.constraints.quality) {
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }
            let descriptor = provider.descriptor();
            let timeout = descriptor.timeout.unwrap_or(self.default_timeout);

            let context = LookupContext::new(timeout, cancel.clone());
            let answer = attempt(provider, request, &context);
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }

            match answer {
                Ok(Some(mut candidate)) => {
                    candidate.source = descriptor.id.clone();
                    candidate.keyword = request.keyword.clone();
                    debug!(
                        provider = %descriptor.id,
                        keyword = %request.keyword,
                        candidate = %candidate.id,
                        "resolved"
                    );
                    resolution.candidate = Some(RetrievedCandidate {
                        candidate,
                        psychology_optimized: descriptor.psychology_optimized,
                    });
                    return Ok(resolution);
                }
                Ok(None) => {
                    debug!(provider = %descriptor.id, keyword = %request.keyword, "no candidate");
                }
                Err(error) => {
                    warn!(
                        provider = %descriptor.id,
                        keyword = %request.keyword,
                        %error,
                        "provider lookup failed"
                    );
                    resolution.failures.push(ProviderFailure {
                        provider: descriptor.id.clone(),
                        keyword: request.keyword.clone(),
                        error,
                    });
                }
            }
        }
        Ok(resolution)
    }

    /// Resolve every key with bounded parallelism.
    pub fn resolve_all(
        &self,
        keys: &BTreeSet<LookupKey>,
        cancel: &CancelToken,
    ) -> Result<BTreeMap<LookupKey, Resolution>, Cancelled> {
        let run = || {
            keys.par_iter()
                .map(|key| {
                    self.resolve(&key.request(), cancel)
                        .map(|resolution| (key.clone(), resolution))
                })
                .collect::<Result<BTreeMap<_, _>, Cancelled>>()
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_parallel)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(error) => {
                warn!(%error, "cannot build lookup pool, resolving sequentially");
                keys.iter()
                    .map(|key| {
                        self.resolve(&key.request(), cancel)
                            .map(|resolution| (key.clone(), resolution))
                    })
                    .collect()
            }
        }
    }
}

/// Run one provider attempt under `context`.
///
/// A panic becomes `Unavailable`. An answer that arrives after the deadline
/// is discarded as `Timeout`, even if the provider ignored the context.
fn attempt(
    provider: &Arc<dyn Provider>,
    request: &LookupRequest,
    context: &LookupContext,
) -> Result<Option<Candidate>, ProviderError> {
    let answer = panic::catch_unwind(AssertUnwindSafe(|| provider.lookup(request, context)))
        .unwrap_or_else(|_| {
            Err(ProviderError::Unavailable(format!(
                "provider {} panicked",
                provider.descriptor().id
            )))
        });
    match answer {
        Ok(_) if context.expired() => Err(ProviderError::Timeout(context.budget())),
        other => other,
    }
}

//! Shared test utilities for the photo-engine test suite.
//!
//! Provides fixture builders for profiles, sections and candidates, plus a
//! scriptable [`StubProvider`] for exercising retrieval without a network.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let config = stock_config();
//! let p = profile("therapy", Level::High, Level::High);
//!
//! let stub = Arc::new(
//!     StubProvider::new("stub", QualityTier::Standard)
//!         .with("ocean", candidate("s-ocean", "ocean water", "#3A7CA5")),
//! );
//! let resolver = Resolver::new(as_providers(vec![stub.clone()]), timeout, 2);
//! // ...
//! assert_eq!(stub.calls(), vec!["ocean"]);
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{self, EngineConfig};
use crate::profile::{ClientProfile, Level};
use crate::provider::{
    LookupContext, LookupRequest, Provider, ProviderDescriptor, ProviderError,
    RetrievedCandidate,
};
use crate::types::{Candidate, CandidateUrls, Orientation, QualityTier, SectionRequirement};

// =========================================================================
// Fixture builders
// =========================================================================

/// The embedded stock tables. Panics if they fail to load.
pub fn stock_config() -> EngineConfig {
    config::stock_config().unwrap()
}

/// Profile with the given anxiety and trust levels, medium professionalism
/// and no audience tags.
pub fn profile(sector: &str, anxiety: Level, trust: Level) -> ClientProfile {
    ClientProfile {
        sector: sector.to_string(),
        audience: Default::default(),
        anxiety_level: anxiety,
        trust_requirement: trust,
        professional_level: Level::Medium,
    }
}

/// Landscape, standard-quality section.
pub fn section(name: &str, count: usize, keywords: &[&str]) -> SectionRequirement {
    SectionRequirement {
        name: name.to_string(),
        count,
        orientation: Orientation::Landscape,
        quality: QualityTier::Standard,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

/// Candidate whose only searchable text is `keyword`.
pub fn candidate(id: &str, keyword: &str, color: &str) -> Candidate {
    Candidate {
        id: id.to_string(),
        source: "stub".to_string(),
        keyword: keyword.to_string(),
        alt_text: String::new(),
        description: String::new(),
        urls: CandidateUrls::sized("https://img.test", id, Orientation::Landscape),
        dominant_color: color.to_string(),
        license: "test".to_string(),
        synthetic: false,
    }
}

/// Wrap a candidate as if a regular (not psychology-optimized) provider
/// returned it.
pub fn retrieved(candidate: Candidate) -> RetrievedCandidate {
    RetrievedCandidate {
        candidate,
        psychology_optimized: false,
    }
}

/// Float comparison for derived scores.
pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// =========================================================================
// Stub provider
// =========================================================================

/// Scriptable provider: canned candidates per keyword, optional failure,
/// panic or delay. Records every keyword it is asked for.
pub struct StubProvider {
    descriptor: ProviderDescriptor,
    responses: BTreeMap<String, Candidate>,
    failure: Option<ProviderError>,
    panics: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl StubProvider {
    pub fn new(id: &str, tier: QualityTier) -> Self {
        Self {
            descriptor: ProviderDescriptor::new(id, tier),
            responses: BTreeMap::new(),
            failure: None,
            panics: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer `keyword` with `candidate`.
    pub fn with(mut self, keyword: &str, candidate: Candidate) -> Self {
        self.responses.insert(keyword.to_string(), candidate);
        self
    }

    /// Fail every lookup with `error`.
    pub fn failing(mut self, error: ProviderError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    /// Sleep before answering, waking early on deadline or cancel.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Declare a per-provider timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.descriptor.timeout = Some(timeout);
        self
    }

    pub fn psychology(mut self) -> Self {
        self.descriptor.psychology_optimized = true;
        self
    }

    /// Keywords looked up so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Provider for StubProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn lookup(
        &self,
        request: &LookupRequest,
        context: &LookupContext,
    ) -> Result<Option<Candidate>, ProviderError> {
        self.calls.lock().unwrap().push(request.keyword.clone());
        if let Some(delay) = self.delay {
            context.pause(delay)?;
        }
        if self.panics {
            panic!("stub provider {} panicked", self.descriptor.id);
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(self.responses.get(&request.keyword).cloned())
    }
}

/// Erase concrete stub types for APIs that take trait objects.
pub fn as_providers(stubs: Vec<Arc<StubProvider>>) -> Vec<Arc<dyn Provider>> {
    stubs
        .into_iter()
        .map(|stub| stub as Arc<dyn Provider>)
        .collect()
}

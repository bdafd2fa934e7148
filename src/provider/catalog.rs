//! Keyword catalog provider.
//!
//! A catalog is a JSON object mapping keywords to raw payloads. Payloads are
//! kept as untyped JSON and only decoded when a lookup hits them, so one bad
//! entry fails that keyword (as `MalformedPayload`) instead of the whole
//! catalog.
//!
//! ```json
//! {
//!   "ocean": {
//!     "id": "cat-ocean-1",
//!     "alt_text": "Calm ocean at sunrise",
//!     "description": "peaceful water, soft light",
//!     "urls": { "thumbnail": "...", "regular": "...", "highres": "..." },
//!     "dominant_color": "#3A7CA5",
//!     "license": "catalog"
//!   },
//!   "team": [
//!     { "id": "cat-team-wide", "orientation": "landscape", ... },
//!     { "id": "cat-team-tall", "orientation": "portrait", ... }
//!   ],
//!   "retired": null
//! }
//! ```
//!
//! A keyword mapping to a list yields the first entry whose `orientation`
//! matches the request (entries without one match anything).

use super::{LookupContext, LookupRequest, Provider, ProviderDescriptor, ProviderError};
use crate::types::{Candidate, CandidateUrls, Orientation};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("cannot read catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("catalog {} is not a JSON object: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("provider {provider:?} has no catalog file")]
    MissingFile { provider: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogEntry {
    id: String,
    #[serde(default)]
    alt_text: String,
    #[serde(default)]
    description: String,
    urls: CandidateUrls,
    dominant_color: String,
    #[serde(default)]
    license: String,
    #[serde(default)]
    orientation: Option<Orientation>,
}

pub struct CatalogProvider {
    descriptor: ProviderDescriptor,
    entries: BTreeMap<String, Value>,
}

impl CatalogProvider {
    /// Build from in-memory payloads. Keywords are matched case-insensitively.
    pub fn from_entries(
        descriptor: ProviderDescriptor,
        entries: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        Self {
            descriptor,
            entries: entries
                .into_iter()
                .map(|(keyword, payload)| (normalize_keyword(&keyword), payload))
                .collect(),
        }
    }

    pub fn from_file(descriptor: ProviderDescriptor, path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: BTreeMap<String, Value> =
            serde_json::from_str(&content).map_err(|source| CatalogError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_entries(descriptor, entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_keyword(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}

fn malformed(keyword: &str, err: serde_json::Error) -> ProviderError {
    ProviderError::MalformedPayload(format!("{}: {}", keyword, err))
}

impl Provider for CatalogProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn lookup(
        &self,
        request: &LookupRequest,
        _context: &LookupContext,
    ) -> Result<Option<Candidate>, ProviderError> {
        let Some(payload) = self.entries.get(&normalize_keyword(&request.keyword)) else {
            return Ok(None);
        };

        let entries: Vec<CatalogEntry> = match payload {
            Value::Null => return Ok(None),
            Value::Array(_) => serde_json::from_value(payload.clone())
                .map_err(|e| malformed(&request.keyword, e))?,
            _ => vec![
                serde_json::from_value(payload.clone())
                    .map_err(|e| malformed(&request.keyword, e))?,
            ],
        };

        let wanted = request.constraints.orientation;
        let Some(entry) = entries
            .into_iter()
            .find(|e| e.orientation.is_none_or(|o| o == wanted))
        else {
            return Ok(None);
        };
        if entry.id.trim().is_empty() {
            return Err(ProviderError::MalformedPayload(format!(
                "{}: empty id",
                request.keyword
            )));
        }

        Ok(Some(Candidate {
            id: entry.id,
            source: self.descriptor.id.clone(),
            keyword: request.keyword.clone(),
            alt_text: entry.alt_text,
            description: entry.description,
            urls: entry.urls,
            dominant_color: entry.dominant_color,
            license: entry.license,
            synthetic: false,
        }))
    }
}

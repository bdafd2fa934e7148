//! Deterministic generated-image provider.
//!
//! Stands in for an image-generation backend: every keyword yields an image
//! whose id, URLs and dominant color are derived from the [`IdSource`], so
//! identical requests produce identical candidates. Generated images are real
//! candidates (scored and ranked like any other), not placeholders.

use super::{LookupContext, LookupRequest, Provider, ProviderDescriptor, ProviderError};
use crate::color::{Rgb, rgb_to_hex};
use crate::ids::IdSource;
use crate::types::{Candidate, CandidateUrls};
use std::sync::Arc;

pub struct GeneratedProvider {
    descriptor: ProviderDescriptor,
    base_url: String,
    ids: Arc<dyn IdSource>,
}

impl GeneratedProvider {
    pub fn new(descriptor: ProviderDescriptor, base_url: String, ids: Arc<dyn IdSource>) -> Self {
        Self {
            descriptor,
            base_url,
            ids,
        }
    }
}

impl Provider for GeneratedProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn lookup(
        &self,
        request: &LookupRequest,
        _context: &LookupContext,
    ) -> Result<Option<Candidate>, ProviderError> {
        let keyword = request.keyword.trim();
        if keyword.is_empty() {
            return Ok(None);
        }
        let orientation = request.constraints.orientation;
        let parts = [
            self.descriptor.id.as_str(),
            keyword,
            orientation.as_str(),
        ];
        let id = self.ids.derive_id("gen", &parts);
        let digest = self.ids.digest("gen-color", &parts);
        let dominant = Rgb::new(digest[0], digest[1], digest[2]);

        Ok(Some(Candidate {
            urls: CandidateUrls::sized(&self.base_url, &id, orientation),
            id,
            source: self.descriptor.id.clone(),
            keyword: request.keyword.clone(),
            alt_text: format!("Generated image: {}", keyword),
            description: keyword.to_lowercase(),
            dominant_color: rgb_to_hex(dominant),
            license: "generated".to_string(),
            synthetic: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::hex_to_rgb;
    use crate::ids::SeededIds;
    use crate::provider::LookupConstraints;
    use crate::types::{CancelToken, Orientation, QualityTier};
    use std::time::Duration;

    fn provider(seed: &str) -> GeneratedProvider {
        GeneratedProvider::new(
            ProviderDescriptor::new("generated", QualityTier::Standard),
            "https://gen.test".into(),
            Arc::new(SeededIds::new(seed)),
        )
    }

    fn context() -> LookupContext {
        LookupContext::new(Duration::from_secs(1), CancelToken::new())
    }

    fn request(keyword: &str, orientation: Orientation) -> LookupRequest {
        LookupRequest::new(
            keyword,
            LookupConstraints {
                orientation,
                quality: QualityTier::Standard,
            },
        )
    }

    #[test]
    fn same_request_same_candidate() {
        let forest = request("forest", Orientation::Landscape);
        let a = provider("s").lookup(&forest, &context()).unwrap();
        let b = provider("s").lookup(&forest, &context()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn orientation_changes_id_and_urls() {
        let p = provider("s");
        let wide = p
            .lookup(&request("forest", Orientation::Landscape), &context())
            .unwrap()
            .unwrap();
        let tall = p
            .lookup(&request("forest", Orientation::Portrait), &context())
            .unwrap()
            .unwrap();
        assert_ne!(wide.id, tall.id);
        assert!(tall.urls.regular.ends_with("?w=720&h=1080"));
    }

    #[test]
    fn candidate_is_not_a_placeholder() {
        let c = provider("s")
            .lookup(&request("garden", Orientation::Squarish), &context())
            .unwrap()
            .unwrap();
        assert!(!c.synthetic);
        assert!(c.id.starts_with("gen-"));
        assert!(hex_to_rgb(&c.dominant_color).is_ok());
        assert!(c.urls.thumbnail.starts_with("https://gen.test/gen-"));
    }

    #[test]
    fn blank_keyword_yields_nothing() {
        let blank = provider("s")
            .lookup(&request("  ", Orientation::Landscape), &context())
            .unwrap();
        assert!(blank.is_none());
    }
}

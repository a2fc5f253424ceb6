//! Manifest Loader
//!
//! Fetch, parse and validate a manifest, then derive model records and
//! configurations from the untouched document on demand.

use std::sync::Arc;

use iiif3d_core::ModelConfiguration;
use iiif3d_platform::Fetch;

use crate::collection::Collection;
use crate::document::{Manifest, validate_manifest};
use crate::extract::{ModelRecord, extract_models};
use crate::rewrite::UrlRewriteTable;
use crate::settings::{DEFAULT_MODEL_ID, ViewerSettings};
use crate::{ManifestError, ManifestResult};

/// A parsed, validated manifest
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    raw: serde_json::Value,
    document: Manifest,
    rewrites: UrlRewriteTable,
    settings: ViewerSettings,
}

impl LoadedManifest {
    /// Parse and validate manifest JSON with default rewrites and settings
    pub fn from_json_str(json: &str) -> ManifestResult<Self> {
        let raw: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(raw, UrlRewriteTable::default(), ViewerSettings::default())
    }

    /// Validate an already parsed document
    pub fn from_value(
        raw: serde_json::Value,
        rewrites: UrlRewriteTable,
        settings: ViewerSettings,
    ) -> ManifestResult<Self> {
        let document = validate_manifest(&raw)?;
        Ok(Self {
            raw,
            document,
            rewrites,
            settings,
        })
    }

    /// The document exactly as fetched
    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    /// Typed view of the document
    pub fn document(&self) -> &Manifest {
        &self.document
    }

    /// Viewer settings applied to this manifest
    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    /// All model records. Recomputed on every call.
    pub fn extract_models(&self) -> Vec<ModelRecord> {
        extract_models(&self.document, &self.rewrites)
    }

    /// Id of the first model, or the default id when there is none
    pub fn default_model_id(&self) -> String {
        self.extract_models()
            .into_iter()
            .next()
            .map(|model| model.id)
            .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string())
    }

    /// Configuration for `model_id`, falling back to the first model when the
    /// id is absent or unknown
    pub fn get_model_config(&self, model_id: Option<&str>) -> ManifestResult<ModelConfiguration> {
        let models = self.extract_models();

        let model = model_id
            .and_then(|id| models.iter().find(|model| model.id == id))
            .or_else(|| {
                if let Some(id) = model_id {
                    log::warn!("Model '{}' not found in manifest, using the first model", id);
                }
                models.first()
            })
            .ok_or(ManifestError::NotFound)?;

        model.to_configuration(self.settings.enable_progressive)
    }
}

/// Loads manifests and collections through a [`Fetch`] implementation
#[derive(Clone)]
pub struct ManifestLoader {
    fetcher: Arc<dyn Fetch>,
    rewrites: UrlRewriteTable,
    settings: ViewerSettings,
}

impl ManifestLoader {
    /// Create a loader with the default rewrite table and settings
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            rewrites: UrlRewriteTable::default(),
            settings: ViewerSettings::default(),
        }
    }

    /// Replace the URL rewrite table
    pub fn with_rewrites(mut self, rewrites: UrlRewriteTable) -> Self {
        self.rewrites = rewrites;
        self
    }

    /// Replace the viewer settings
    pub fn with_settings(mut self, settings: ViewerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Fetch, parse and validate a manifest
    pub async fn load(&self, url: &str) -> ManifestResult<LoadedManifest> {
        log::info!("Loading manifest {}", url);

        let text = self.fetcher.fetch_text(url).await.inspect_err(|e| {
            log::error!("Error loading IIIF manifest {}: {}", url, e);
        })?;
        let raw: serde_json::Value = serde_json::from_str(&text)?;

        LoadedManifest::from_value(raw, self.rewrites.clone(), self.settings.clone())
    }

    /// Fetch, parse and validate a collection
    pub async fn load_collection(&self, url: &str) -> ManifestResult<Collection> {
        log::info!("Loading collection {}", url);
        let text = self.fetcher.fetch_text(url).await?;
        Collection::from_json_str(&text)
    }
}

impl std::fmt::Debug for ManifestLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestLoader")
            .field("rewrites", &self.rewrites)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use futures_util::future::BoxFuture;
    use iiif3d_core::LodLevel;
    use iiif3d_platform::{FetchProgress, PlatformError, PlatformResult, ProgressFn};

    const SAMPLE: &str = include_str!("../../../data/manifests/sponza_iiif.json");

    /// In-memory fetcher: known URLs return their body, others a 404
    struct StaticFetch(HashMap<&'static str, &'static str>);

    impl Fetch for StaticFetch {
        fn fetch<'a>(
            &'a self,
            url: &'a str,
            on_progress: ProgressFn<'a>,
        ) -> BoxFuture<'a, PlatformResult<Vec<u8>>> {
            Box::pin(async move {
                let body = self.0.get(url).ok_or_else(|| PlatformError::Http {
                    url: url.to_string(),
                    status: 404,
                })?;
                on_progress(FetchProgress {
                    loaded: body.len() as u64,
                    total: Some(body.len() as u64),
                });
                Ok(body.as_bytes().to_vec())
            })
        }
    }

    fn loader() -> ManifestLoader {
        let fetch = StaticFetch(HashMap::from([
            ("/manifest.json", SAMPLE),
            ("/broken.json", "{\"type\": \"Manifest\", \"items\": ["),
            ("/collection-as-manifest.json", "{\"type\": \"Collection\", \"items\": []}"),
            ("/empty.json", "{\"type\": \"Manifest\", \"items\": []}"),
        ]));
        ManifestLoader::new(Arc::new(fetch))
    }

    #[tokio::test]
    async fn test_load_sample_manifest() {
        let manifest = loader().load("/manifest.json").await.unwrap();

        let models = manifest.extract_models();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "Sponza Palace");
        assert_eq!(manifest.default_model_id(), "model");

        let config = manifest.get_model_config(None).unwrap();
        assert_eq!(config.lod_levels().as_slice(), &LodLevel::ALL[..4]);
        assert_eq!(config.url(LodLevel::Low), Some("/data/models/sponza/sponza_lod3.glb"));
        assert!(config.progressive);
    }

    #[tokio::test]
    async fn test_document_is_not_mutated() {
        let manifest = loader().load("/manifest.json").await.unwrap();
        let expected: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();

        let _ = manifest.extract_models();
        let _ = manifest.get_model_config(Some("model"));
        assert_eq!(manifest.raw(), &expected);
    }

    #[tokio::test]
    async fn test_error_taxonomy() {
        let loader = loader();

        let err = loader.load("/missing.json").await.unwrap_err();
        assert!(matches!(err, ManifestError::Fetch(PlatformError::Http { status: 404, .. })));

        let err = loader.load("/broken.json").await.unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));

        let err = loader.load("/collection-as-manifest.json").await.unwrap_err();
        assert!(matches!(err, ManifestError::Validation(_)));
    }

    #[tokio::test]
    async fn test_model_lookup_fallbacks() {
        let loader = loader();
        let manifest = loader.load("/manifest.json").await.unwrap();
        let first = manifest.get_model_config(None).unwrap();
        let unknown = manifest.get_model_config(Some("does-not-exist")).unwrap();
        assert_eq!(first, unknown);

        let empty = loader.load("/empty.json").await.unwrap();
        assert!(matches!(empty.get_model_config(None), Err(ManifestError::NotFound)));
        assert_eq!(empty.default_model_id(), "model");
    }

    #[tokio::test]
    async fn test_settings_disable_progressive() {
        let settings = ViewerSettings {
            enable_progressive: false,
            ..ViewerSettings::default()
        };
        let manifest = loader().with_settings(settings).load("/manifest.json").await.unwrap();
        assert!(!manifest.get_model_config(None).unwrap().progressive);
    }
}

//! In-memory doubles shared by the session and viewer tests

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use glam::Vec3;
use iiif3d_core::{Aabb, AssetDescriptor, LodLevel, ModelConfiguration, ModelMetadata};
use iiif3d_platform::{Fetch, FetchProgress, PlatformError, PlatformResult, ProgressFn};
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::asset::{AssetDecoder, DecodedAsset, MeshInstance};
use crate::session::{LoaderConfig, LoadingSession};
use crate::telemetry::{TelemetrySnapshot, TelemetryStore};
use crate::viewer::LoaderContext;
use crate::{LoadError, LoadResult};

pub(crate) const FOUR_LEVELS: [LodLevel; 4] =
    [LodLevel::Low, LodLevel::Medium, LodLevel::High, LodLevel::Ultra];

pub(crate) fn asset_url(level: LodLevel) -> String {
    format!("/models/{}.glb", level)
}

/// Vertices the mock asset for `level` decodes to
pub(crate) fn vertices_for(level: LodLevel) -> usize {
    (level.rank() + 1) * 1000
}

pub(crate) fn configuration(levels: &[LodLevel]) -> ModelConfiguration {
    let metadata = ModelMetadata {
        id: "model".to_string(),
        name: "Test Model".to_string(),
        ..ModelMetadata::default()
    };
    let levels = levels
        .iter()
        .map(|&level| (level, AssetDescriptor::new(asset_url(level), None, level.as_str())));
    ModelConfiguration::new(levels, metadata).unwrap()
}

/// Serves `mesh:<n>` bodies and records every request in a shared event log
pub(crate) struct MockFetch {
    assets: HashMap<String, Vec<u8>>,
    events: Arc<Mutex<Vec<String>>>,
    gate: Option<Arc<Notify>>,
}

impl MockFetch {
    pub fn new() -> Self {
        Self {
            assets: HashMap::new(),
            events: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    /// One decodable asset per level
    pub fn standard(levels: &[LodLevel]) -> Self {
        levels.iter().fold(Self::new(), |fetch, &level| {
            fetch.with_asset(&asset_url(level), &format!("mesh:{}", vertices_for(level)))
        })
    }

    pub fn with_asset(mut self, url: &str, body: &str) -> Self {
        self.assets.insert(url.to_string(), body.as_bytes().to_vec());
        self
    }

    pub fn without_asset(mut self, url: &str) -> Self {
        self.assets.remove(url);
        self
    }

    /// Hold every fetch until the gate is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

impl Fetch for MockFetch {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        on_progress: ProgressFn<'a>,
    ) -> BoxFuture<'a, PlatformResult<Vec<u8>>> {
        Box::pin(async move {
            self.events.lock().push(format!("fetch:{}", url));
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            let body = self.assets.get(url).ok_or_else(|| PlatformError::Http {
                url: url.to_string(),
                status: 404,
            })?;
            let total = body.len() as u64;
            on_progress(FetchProgress {
                loaded: total / 2,
                total: Some(total),
            });
            on_progress(FetchProgress {
                loaded: total,
                total: Some(total),
            });
            Ok(body.clone())
        })
    }
}

/// Decodes `mesh:<n>` into one mesh of `n` vertices spanning `n` units on x
pub(crate) struct MockDecoder;

impl AssetDecoder for MockDecoder {
    fn decode(&self, bytes: &[u8]) -> LoadResult<DecodedAsset> {
        let text = std::str::from_utf8(bytes).map_err(|e| LoadError::Decode(e.to_string()))?;
        let vertices: usize = text
            .strip_prefix("mesh:")
            .and_then(|count| count.parse().ok())
            .ok_or_else(|| LoadError::Decode(format!("unreadable asset: {}", text)))?;

        Ok(DecodedAsset::new(vec![MeshInstance {
            name: Some("mock".to_string()),
            vertex_count: vertices,
            bounds: Aabb::new(Vec3::ZERO, Vec3::new(vertices as f32, 1.0, 1.0)),
        }]))
    }
}

/// Loader context wired to the mocks, recording every published snapshot
pub(crate) struct Harness {
    pub context: LoaderContext,
    events: Arc<Mutex<Vec<String>>>,
    snapshots: Arc<Mutex<Vec<TelemetrySnapshot>>>,
}

impl Harness {
    /// Mocks with no inter-level delays
    pub fn new(fetch: MockFetch) -> Self {
        Self::with_config(fetch, LoaderConfig::default().without_delays())
    }

    pub fn with_config(fetch: MockFetch, config: LoaderConfig) -> Self {
        let events = Arc::clone(&fetch.events);
        let snapshots = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::new(TelemetryStore::new());

        let log = Arc::clone(&events);
        let sink = Arc::clone(&snapshots);
        store.subscribe(move |snapshot: &TelemetrySnapshot| {
            log.lock().push(format!("status:{}", snapshot.status));
            sink.lock().push(snapshot.clone());
        });

        let context = LoaderContext::new(Arc::new(fetch))
            .with_store(store)
            .with_decoder(Arc::new(MockDecoder))
            .with_config(config);

        Self {
            context,
            events,
            snapshots,
        }
    }

    pub fn session(&self, levels: &[LodLevel]) -> LoadingSession {
        LoadingSession::new(configuration(levels), self.context.clone())
    }

    /// Requested URLs in order
    pub fn fetches(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| event.strip_prefix("fetch:").map(str::to_owned))
            .collect()
    }

    /// Fetches and status publications interleaved in the order they happened
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn snapshots(&self) -> Vec<TelemetrySnapshot> {
        self.snapshots.lock().clone()
    }

    /// Snapshots published when a level finished
    pub fn loaded_snapshots(&self) -> Vec<TelemetrySnapshot> {
        self.snapshots()
            .into_iter()
            .filter(|snapshot| {
                snapshot.status.starts_with("LOD ")
                    || snapshot.status.starts_with("Fallback ")
                    || snapshot.status == "Complete"
            })
            .collect()
    }
}

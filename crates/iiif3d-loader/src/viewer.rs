//! Viewer
//!
//! Owns the injected collaborators and the one live loading session. Mounting
//! a new configuration tears the previous session down first.

use std::sync::Arc;

use iiif3d_core::ModelConfiguration;
use iiif3d_platform::Fetch;
use parking_lot::Mutex;

use crate::asset::AssetDecoder;
use crate::decode::GltfDecoder;
use crate::fallback::{Fallback, ProceduralPlaceholder};
use crate::session::{LoaderConfig, LoadingSession};
use crate::telemetry::TelemetryStore;

/// Collaborators shared by every session of a viewer
#[derive(Clone)]
pub struct LoaderContext {
    pub store: Arc<TelemetryStore>,
    pub fetcher: Arc<dyn Fetch>,
    pub decoder: Arc<dyn AssetDecoder>,
    pub fallback: Arc<dyn Fallback>,
    pub config: LoaderConfig,
}

impl LoaderContext {
    /// glTF decoding, box placeholder, fresh store and default tuning
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            store: Arc::new(TelemetryStore::new()),
            fetcher,
            decoder: Arc::new(GltfDecoder::new()),
            fallback: Arc::new(ProceduralPlaceholder::default()),
            config: LoaderConfig::default(),
        }
    }

    /// Publish telemetry to a shared store
    pub fn with_store(mut self, store: Arc<TelemetryStore>) -> Self {
        self.store = store;
        self
    }

    /// Replace the glTF decoder
    pub fn with_decoder(mut self, decoder: Arc<dyn AssetDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Replace the placeholder shown when a level fails
    pub fn with_fallback(mut self, fallback: Arc<dyn Fallback>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Replace the loader tuning
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }
}

impl std::fmt::Debug for LoaderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderContext")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Session owner for one viewport
pub struct Viewer {
    context: LoaderContext,
    session: Mutex<Option<Arc<LoadingSession>>>,
}

impl Viewer {
    /// Viewer with nothing mounted
    pub fn new(context: LoaderContext) -> Self {
        Self {
            context,
            session: Mutex::new(None),
        }
    }

    pub fn context(&self) -> &LoaderContext {
        &self.context
    }

    /// Telemetry of the current session
    pub fn store(&self) -> &Arc<TelemetryStore> {
        &self.context.store
    }

    /// Replace the current session with a fresh one for `config`.
    ///
    /// The previous session is cancelled and the store reset before the new
    /// session exists. Cancelling waits out any write the old session already
    /// started, so nothing from the old run can reach the new telemetry.
    pub fn mount(&self, config: ModelConfiguration) -> Arc<LoadingSession> {
        let mut slot = self.session.lock();
        if let Some(previous) = slot.take() {
            previous.cancel();
        }
        self.context.store.reset();

        log::debug!("Mounting '{}' ({} levels)", config.metadata.name, config.len());
        let session = Arc::new(LoadingSession::new(config, self.context.clone()));
        *slot = Some(Arc::clone(&session));
        session
    }

    /// Tear down the current session. Returns false if nothing was mounted.
    pub fn unmount(&self) -> bool {
        match self.session.lock().take() {
            Some(session) => {
                session.cancel();
                true
            }
            None => false,
        }
    }

    /// The mounted session, if any
    pub fn current_session(&self) -> Option<Arc<LoadingSession>> {
        self.session.lock().clone()
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.unmount();
    }
}

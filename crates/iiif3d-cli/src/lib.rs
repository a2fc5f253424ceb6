//! # IIIF3D CLI
//!
//! Headless front end for the IIIF 3D viewer.
//!
//! ## Commands
//! - `inspect` - List the models and LOD assets of a manifest
//! - `config` - Print the model configuration handed to the loader
//! - `load` - Run the progressive loader and print the telemetry panel
//! - `collection` - List the manifests and places of a collection

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use iiif3d_core::{DEFAULT_TARGET_SIZE, LodLevel};
use iiif3d_loader::{
    LoadMode, LoaderConfig, LoaderContext, TelemetrySnapshot, TelemetryStore, TelemetryUpdate,
    Viewer,
};
use iiif3d_manifest::{
    DEFAULT_COLLECTION_URL, LoadedManifest, ManifestLoader, ViewerParams, ViewerSettings,
};
use iiif3d_platform::{Fetch, Fetcher};
use parking_lot::Mutex;

/// Status shown when the manifest itself cannot be loaded
pub const MANIFEST_ERROR_STATUS: &str = "Error loading manifest";

/// IIIF 3D Viewer CLI
#[derive(Parser, Debug)]
#[command(name = "iiif3d")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory that root-relative URLs resolve against
    #[arg(short, long, default_value = ".", global = true)]
    pub asset_root: PathBuf,

    /// Viewer settings JSON (delays, progressive flag)
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the models and LOD assets of a manifest
    Inspect {
        /// Manifest URL (defaults to the bundled sample)
        manifest: Option<String>,
    },

    /// Print the model configuration as JSON
    Config {
        /// Manifest URL (defaults to the bundled sample)
        manifest: Option<String>,

        /// Model id (defaults to the first model)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Load a model and print the telemetry panel
    Load {
        /// Manifest URL (defaults to the bundled sample)
        manifest: Option<String>,

        /// Model id (defaults to the first model)
        #[arg(short, long)]
        model: Option<String>,

        /// Load only this level instead of stepping through all of them
        #[arg(short, long)]
        level: Option<LodLevel>,

        /// Skip the pauses between levels
        #[arg(long)]
        no_delay: bool,
    },

    /// List the manifests and places of a collection
    Collection {
        /// Collection URL
        #[arg(default_value = DEFAULT_COLLECTION_URL)]
        url: String,
    },
}

/// Execute the CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    run(cli).await
}

/// Run a command without touching the global logger
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.settings.as_ref()).await?;
    let fetcher: Arc<dyn Fetch> = Arc::new(Fetcher::new(&cli.asset_root));
    let loader = ManifestLoader::new(Arc::clone(&fetcher)).with_settings(settings);

    match cli.command {
        Commands::Inspect { manifest } => {
            let params = ViewerParams::new(manifest, None);
            let manifest = loader.load(&params.manifest_url).await?;
            print_models(&manifest);
        }

        Commands::Config { manifest, model } => {
            let params = ViewerParams::new(manifest, model);
            let manifest = loader.load(&params.manifest_url).await?;
            let config = manifest.get_model_config(params.model_id.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }

        Commands::Load {
            manifest,
            model,
            level,
            no_delay,
        } => {
            let params = ViewerParams::new(manifest, model);
            let snapshot = load_model(&loader, fetcher, &params, level, no_delay).await?;
            println!("{}", snapshot);
        }

        Commands::Collection { url } => {
            let collection = loader.load_collection(&url).await?;
            for (id, title) in collection.summaries() {
                match collection.place_for(id) {
                    Some(place) => println!(
                        "{}  {}  ({:.4}, {:.4})",
                        id, title, place.latitude, place.longitude
                    ),
                    None => println!("{}  {}", id, title),
                }
            }
        }
    }

    Ok(())
}

async fn load_settings(path: Option<&PathBuf>) -> Result<ViewerSettings> {
    let Some(path) = path else {
        return Ok(ViewerSettings::default());
    };
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read settings {}", path.display()))?;
    Ok(ViewerSettings::from_json_str(&json)?)
}

fn print_models(manifest: &LoadedManifest) {
    let models = manifest.extract_models();
    if models.is_empty() {
        println!("No models found");
        return;
    }

    for model in models {
        println!("{} - {}", model.id, model.name);
        if !model.description.is_empty() {
            println!("  {}", model.description);
        }
        for (level, asset) in &model.lods {
            println!("  {:<8} {:<10} {}", level.label(), asset.formatted_size(), asset.url);
        }
        for asset in &model.collapsed {
            println!("  (collapsed) {:<10} {}", asset.formatted_size(), asset.url);
        }
        for (key, value) in &model.metadata {
            println!("  {}: {}", key, value);
        }
    }
}

/// Load one model through a fresh viewer and return the final telemetry
pub async fn load_model(
    loader: &ManifestLoader,
    fetcher: Arc<dyn Fetch>,
    params: &ViewerParams,
    level: Option<LodLevel>,
    no_delay: bool,
) -> Result<TelemetrySnapshot> {
    let store = Arc::new(TelemetryStore::new());

    let manifest = match loader.load(&params.manifest_url).await {
        Ok(manifest) => manifest,
        Err(e) => {
            store.update(TelemetryUpdate::new().status(MANIFEST_ERROR_STATUS));
            println!("{}", store.snapshot());
            return Err(e).with_context(|| format!("Could not load {}", params.manifest_url));
        }
    };
    let config = manifest.get_model_config(params.model_id.as_deref())?;

    let mut loader_config = LoaderConfig {
        target_size: DEFAULT_TARGET_SIZE,
        lod_delays: manifest.settings().lod_delays,
    };
    if no_delay {
        loader_config = loader_config.without_delays();
    }

    let context = LoaderContext::new(fetcher)
        .with_store(Arc::clone(&store))
        .with_config(loader_config);
    let viewer = Viewer::new(context);
    let session = viewer.mount(config);

    let last_status = Mutex::new(String::new());
    let subscription = store.subscribe(move |snapshot| {
        let mut last = last_status.lock();
        if *last != snapshot.status {
            println!("[{:>3.0}%] {}", snapshot.progress, snapshot.status);
            *last = snapshot.status.clone();
        }
    });

    let mode = match level {
        Some(level) => LoadMode::Single(level),
        None => LoadMode::Progressive,
    };
    session.start(mode).await;
    store.unsubscribe(subscription);

    if let Some(asset) = session.current_asset() {
        log::debug!(
            "Displayed asset: {} meshes, normalized bounds {:?}",
            asset.meshes.len(),
            asset.normalized_bounds()
        );
    }
    Ok(store.snapshot())
}

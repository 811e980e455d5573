use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use tokio::signal;

use posterbox::catalog::SpotifyCatalog;
use posterbox::cloud::RestCloudStore;
use posterbox::config::{AppConfig, BindingStore, DisplayBinding};
use posterbox::pairing::PairingBroker;
use posterbox::poster::PosterRenderer;
use posterbox::surface::{DisplaySurface, FileSurface};
use posterbox::sync::SyncController;

const CONFIG_PATH: &str = "posterbox.json";
const PAIRING_POLL_SECS: u64 = 4;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("posterbox starting up...");

    let config = AppConfig::load(CONFIG_PATH)?;
    if config.cloud_base_url.is_empty() {
        bail!("cloud_base_url is not set; configure {CONFIG_PATH} or CLOUD_BASE_URL");
    }
    let (client_id, client_secret) = config
        .spotify_credentials()
        .context("catalog credentials are not configured")?;

    let store = Arc::new(RestCloudStore::new(&config.cloud_base_url)?);
    let catalog = Arc::new(SpotifyCatalog::new(client_id, client_secret)?);
    let renderer = Arc::new(PosterRenderer::new());
    let surface: Arc<dyn DisplaySurface> = Arc::new(FileSurface::new(&config.poster_path));
    let bindings = BindingStore::new(&config.binding_path);
    let broker = PairingBroker::new(store.clone());

    // Each pass through this loop is one pairing lifetime: bind (or
    // restore), sync until the controller unpairs us, then start over.
    loop {
        let binding = match bindings.load() {
            Some(binding) => {
                info!("restored binding to venue {}", binding.venue_id);
                binding
            }
            None => {
                let binding = pair(&broker).await;
                if let Err(err) = bindings.save(&binding) {
                    warn!("could not persist binding: {err:#}");
                }
                binding
            }
        };

        let mut controller = SyncController::start(
            binding.venue_id.clone(),
            binding.display_id.clone(),
            store.clone(),
            catalog.clone(),
            renderer.clone(),
            surface.clone(),
            config.default_orientation,
            config.sync(),
        );

        tokio::select! {
            result = controller.join() => {
                result?;
                info!("display was unpaired remotely; returning to pairing");
                if let Err(err) = bindings.clear() {
                    warn!("could not clear stale binding: {err:#}");
                }
            }
            _ = signal::ctrl_c() => {
                info!("shutdown requested");
                controller.stop().await?;
                return Ok(());
            }
        }
    }
}

/// Show a code and wait for a controller to claim it. Store outages only
/// delay pairing; this returns once the display is linked.
async fn pair(broker: &PairingBroker<RestCloudStore>) -> DisplayBinding {
    let pending = broker
        .generate_code_retrying(Duration::from_secs(PAIRING_POLL_SECS))
        .await;
    info!(
        "pair this display with code {} {}",
        &pending.code[..3],
        &pending.code[3..]
    );

    loop {
        tokio::time::sleep(Duration::from_secs(PAIRING_POLL_SECS)).await;
        match broker.poll_linked(&pending).await {
            Ok(Some(venue_id)) => {
                info!("display linked to venue {venue_id}");
                return DisplayBinding {
                    venue_id,
                    display_id: pending.display_id.clone(),
                };
            }
            Ok(None) => {}
            Err(err) => warn!("pairing poll failed: {err:#}"),
        }
    }
}

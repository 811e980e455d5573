use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::catalog::MusicCatalog;
use crate::cloud::CloudStore;
use crate::poster::{Orientation, PosterRenderer};
use crate::surface::DisplaySurface;

use super::engine::{EngineCommand, SyncConfig, SyncEngine};
use super::state::SyncSnapshot;

const COMMAND_QUEUE_DEPTH: usize = 8;

/// Owns the spawned sync loop for one display: start, command forwarding,
/// snapshot access, and shutdown.
pub struct SyncController {
    handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
    commands: mpsc::Sender<EngineCommand>,
    snapshot_rx: watch::Receiver<SyncSnapshot>,
}

impl SyncController {
    #[allow(clippy::too_many_arguments)]
    pub fn start<S: CloudStore + 'static, C: MusicCatalog + 'static>(
        venue_id: String,
        display_id: String,
        store: Arc<S>,
        catalog: Arc<C>,
        renderer: Arc<PosterRenderer>,
        surface: Arc<dyn DisplaySurface>,
        orientation: Orientation,
        config: SyncConfig,
    ) -> Self {
        let (engine, snapshot_rx) = SyncEngine::new(
            venue_id,
            display_id,
            store,
            catalog,
            renderer,
            surface,
            orientation,
            config,
        );

        let cancel_token = CancellationToken::new();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let handle = tokio::spawn(engine.run(command_rx, cancel_token.clone()));

        Self {
            handle: Some(handle),
            cancel_token,
            commands: command_tx,
            snapshot_rx,
        }
    }

    /// Operator override: render one specific poster and pin it.
    pub async fn push_manual(
        &self,
        track: &str,
        artist: &str,
        orientation: Orientation,
    ) -> Result<()> {
        self.commands
            .send(EngineCommand::PushManual {
                track: track.to_string(),
                artist: artist.to_string(),
                orientation,
            })
            .await
            .context("sync loop is no longer running")
    }

    pub async fn set_orientation(&self, orientation: Orientation) -> Result<()> {
        self.commands
            .send(EngineCommand::SetOrientation(orientation))
            .await
            .context("sync loop is no longer running")
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Wait for the loop to end on its own (remote unpair).
    pub async fn join(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            handle.await.context("sync loop task failed to join")?;
        }
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.cancel_token.cancel();
        self.join().await
    }
}

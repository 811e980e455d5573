//! The per-display control loop: on every tick, decide whether the shown
//! poster is stale and regenerate it at most once. One tick runs at a
//! time; a tick still executing when the next is due is skipped, never
//! queued.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::cache::{ContentFingerprint, FingerprintCache, PosterArtifact};
use crate::catalog::{format_duration, format_release_date, MusicCatalog};
use crate::cloud::{CloudStore, HistoryEntry, HistoryKind};
use crate::pairing::PairingBroker;
use crate::poster::{Orientation, PosterInput, PosterRenderer};
use crate::surface::DisplaySurface;
use crate::{log_info, log_warn};

use super::state::{DisplayPhase, SyncSnapshot, SyncState};

// Set to false to silence per-tick logging in this module.
const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub poll_period: Duration,
    pub idle_timeout: Duration,
}

#[derive(Debug)]
pub enum EngineCommand {
    PushManual {
        track: String,
        artist: String,
        orientation: Orientation,
    },
    SetOrientation(Orientation),
}

#[derive(Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// The display's registry record is gone; the engine must stop.
    Unpaired,
}

pub struct SyncEngine<S, C> {
    venue_id: String,
    display_id: String,
    store: Arc<S>,
    broker: PairingBroker<S>,
    catalog: Arc<C>,
    renderer: Arc<PosterRenderer>,
    surface: Arc<dyn DisplaySurface>,
    cache: FingerprintCache,
    state: SyncState,
    orientation: Orientation,
    config: SyncConfig,
    snapshot_tx: watch::Sender<SyncSnapshot>,
}

impl<S: CloudStore + 'static, C: MusicCatalog + 'static> SyncEngine<S, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        venue_id: String,
        display_id: String,
        store: Arc<S>,
        catalog: Arc<C>,
        renderer: Arc<PosterRenderer>,
        surface: Arc<dyn DisplaySurface>,
        orientation: Orientation,
        config: SyncConfig,
    ) -> (Self, watch::Receiver<SyncSnapshot>) {
        let (snapshot_tx, snapshot_rx) = watch::channel(SyncSnapshot::initial());
        let engine = Self {
            venue_id,
            display_id,
            broker: PairingBroker::new(store.clone()),
            store,
            catalog,
            renderer,
            surface,
            cache: FingerprintCache::new(),
            state: SyncState::new(),
            orientation,
            config,
            snapshot_tx,
        };
        (engine, snapshot_rx)
    }

    /// Drive the engine until remote unpair or cancellation. Commands are
    /// handled between ticks, so one display never runs two renders
    /// concurrently.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<EngineCommand>,
        cancel_token: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.config.poll_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut commands_open = true;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let started = Instant::now();
                    let outcome = self.tick().await;
                    log_info!(
                        "tick for display {} finished in {}ms",
                        self.display_id,
                        started.elapsed().as_millis()
                    );
                    if outcome == TickOutcome::Unpaired {
                        log_info!("display {} unpaired remotely; sync loop ending", self.display_id);
                        break;
                    }
                }
                command = commands.recv(), if commands_open => {
                    match command {
                        Some(EngineCommand::PushManual { track, artist, orientation }) => {
                            self.push_manual(&track, &artist, orientation).await;
                        }
                        Some(EngineCommand::SetOrientation(orientation)) => {
                            self.orientation = orientation;
                        }
                        // Sender dropped; keep ticking without polling it.
                        None => commands_open = false,
                    }
                }
                _ = cancel_token.cancelled() => {
                    log_info!("sync loop for display {} shutting down", self.display_id);
                    break;
                }
            }
        }
    }

    /// One evaluation of the decision procedure.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.broker.check_unpaired(&self.venue_id, &self.display_id).await {
            return TickOutcome::Unpaired;
        }

        // A fetch failure is "no new information"; fall through to the
        // idle check with no state change.
        let record = match self.store.now_playing(&self.venue_id).await {
            Ok(record) => record,
            Err(err) => {
                log_warn!("now-playing fetch failed for {}: {err:#}", self.venue_id);
                None
            }
        };

        if let Some((track, artist)) = record.as_ref().and_then(|r| r.as_pair()) {
            let incoming = ContentFingerprint::new(track, artist, self.orientation);
            self.apply_now_playing(incoming).await;
        }

        if self.state.phase == DisplayPhase::Active && self.state.is_idle(self.config.idle_timeout) {
            log_info!("venue {} idle; display {} entering standby", self.venue_id, self.display_id);
            self.state.enter_standby();
            self.cache.invalidate();
            self.publish();
        }

        TickOutcome::Continue
    }

    async fn apply_now_playing(&mut self, incoming: ContentFingerprint) {
        match self.state.phase {
            DisplayPhase::Manual => {
                // Manual holds until genuinely new content is observed.
                if !self.state.is_new_content(&incoming) {
                    self.state.observed = Some(incoming);
                    return;
                }
                self.track_change(incoming).await;
            }
            DisplayPhase::Active | DisplayPhase::Standby => {
                if self.state.displayed.as_ref() == Some(&incoming) {
                    self.state.observed = Some(incoming);
                    return;
                }
                self.track_change(incoming).await;
            }
        }
    }

    /// Handle a fingerprint change: reset the idle anchor for new content,
    /// then render. On failure nothing advances, so the same change is
    /// retried next tick.
    async fn track_change(&mut self, incoming: ContentFingerprint) {
        if self.state.is_new_content(&incoming) {
            self.state.last_change = Instant::now();
        }

        match self.render_and_show(&incoming).await {
            Ok(()) => {
                self.state.note_rendered(incoming, DisplayPhase::Active);
                self.publish();
            }
            Err(err) => {
                log_warn!(
                    "render failed for \"{}\" by \"{}\": {err:#}",
                    incoming.track,
                    incoming.artist
                );
            }
        }
    }

    /// Operator override: resolve and render one poster outside the
    /// now-playing path, then pin it until new content arrives.
    pub async fn push_manual(&mut self, track: &str, artist: &str, orientation: Orientation) {
        let fingerprint = ContentFingerprint::new(track, artist, orientation);
        // Never let a stale image survive a manual override.
        self.cache.invalidate();

        match self.render_and_show(&fingerprint).await {
            Ok(()) => {
                self.state.note_rendered(fingerprint.clone(), DisplayPhase::Manual);
                self.publish();
                let entry = HistoryEntry {
                    id: Utc::now().timestamp_millis().to_string(),
                    track: fingerprint.track.clone(),
                    artist: fingerprint.artist.clone(),
                    time: Utc::now().format("%H:%M").to_string(),
                    kind: HistoryKind::Manual,
                };
                if let Err(err) = self.store.append_history(&self.venue_id, &entry).await {
                    log_warn!("history append failed for {}: {err:#}", self.venue_id);
                }
            }
            Err(err) => {
                log_warn!("manual render failed for \"{track}\" by \"{artist}\": {err:#}");
            }
        }
    }

    /// The render path: cache consult, album resolution with
    /// fall-back-to-track-title, asset fetch, blocking composition, show.
    async fn render_and_show(&mut self, fingerprint: &ContentFingerprint) -> Result<()> {
        if let Some(artifact) = self.cache.get(fingerprint) {
            self.surface.show_image(artifact.png.clone()).await?;
            return Ok(());
        }

        let subject = match self
            .catalog
            .resolve_album(&fingerprint.track, &fingerprint.artist)
            .await
        {
            Ok(Some(album)) => album,
            Ok(None) => fingerprint.track.clone(),
            Err(err) => {
                log_warn!("album resolution failed, using track title: {err:#}");
                fingerprint.track.clone()
            }
        };

        let assets = self
            .catalog
            .album_assets(&subject, &fingerprint.artist)
            .await
            .context("album asset fetch failed")?
            .with_context(|| format!("no album assets for \"{subject}\""))?;

        let input = PosterInput {
            album_title: assets.album_title,
            artist: fingerprint.artist.clone(),
            release_date: format_release_date(&assets.release_date),
            duration: format_duration(assets.duration_ms),
            track_names: assets.track_names,
            cover: assets.cover,
            scan_code: assets.scan_code,
        };

        let renderer = self.renderer.clone();
        let orientation = fingerprint.orientation;
        let png = tokio::task::spawn_blocking(move || renderer.render(&input, orientation))
            .await
            .context("render worker join failed")??;

        let artifact = PosterArtifact {
            fingerprint: fingerprint.clone(),
            png: Arc::new(png),
        };
        self.surface.show_image(artifact.png.clone()).await?;
        self.cache.put(artifact);
        Ok(())
    }

    fn publish(&self) {
        let _ = self.snapshot_tx.send(SyncSnapshot::from_state(&self.state));
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &SyncState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }
}

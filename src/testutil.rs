//! In-memory collaborator fakes shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use image::{Rgba, RgbaImage};

use crate::catalog::{AlbumAssets, MusicCatalog};
use crate::cloud::{
    CloudStore, DisplayRecord, HistoryEntry, NowPlayingRecord, PairingRecord,
};
use crate::surface::DisplaySurface;

pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut out = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

#[derive(Default)]
pub struct MemoryStore {
    pairing: Mutex<HashMap<String, PairingRecord>>,
    displays: Mutex<HashMap<String, DisplayRecord>>,
    now_playing: Mutex<HashMap<String, NowPlayingRecord>>,
    pub history: Mutex<Vec<HistoryEntry>>,
    fail_reads: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn set_now_playing(&self, venue_id: &str, track: &str, artist: &str) {
        self.now_playing.lock().unwrap().insert(
            venue_id.to_string(),
            NowPlayingRecord {
                track: Some(track.to_string()),
                artist: Some(artist.to_string()),
            },
        );
    }

    pub fn register_display(&self, venue_id: &str, display_id: &str) {
        self.displays.lock().unwrap().insert(
            display_key(venue_id, display_id),
            DisplayRecord {
                name: "Test Display".into(),
                added: 0,
            },
        );
    }

    pub fn remove_display(&self, venue_id: &str, display_id: &str) {
        self.displays
            .lock()
            .unwrap()
            .remove(&display_key(venue_id, display_id));
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("simulated store outage");
        }
        Ok(())
    }

    fn check_deletes(&self) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            bail!("simulated delete outage");
        }
        Ok(())
    }
}

fn display_key(venue_id: &str, display_id: &str) -> String {
    format!("{venue_id}/{display_id}")
}

#[async_trait]
impl CloudStore for MemoryStore {
    async fn now_playing(&self, venue_id: &str) -> Result<Option<NowPlayingRecord>> {
        self.check_reads()?;
        Ok(self.now_playing.lock().unwrap().get(venue_id).cloned())
    }

    async fn put_pairing_code(&self, code: &str, record: &PairingRecord) -> Result<()> {
        self.pairing
            .lock()
            .unwrap()
            .insert(code.to_string(), record.clone());
        Ok(())
    }

    async fn get_pairing_code(&self, code: &str) -> Result<Option<PairingRecord>> {
        self.check_reads()?;
        Ok(self.pairing.lock().unwrap().get(code).cloned())
    }

    async fn delete_pairing_code(&self, code: &str) -> Result<()> {
        self.check_deletes()?;
        self.pairing.lock().unwrap().remove(code);
        Ok(())
    }

    async fn get_display(&self, venue_id: &str, display_id: &str) -> Result<Option<DisplayRecord>> {
        self.check_reads()?;
        Ok(self
            .displays
            .lock()
            .unwrap()
            .get(&display_key(venue_id, display_id))
            .cloned())
    }

    async fn put_display(
        &self,
        venue_id: &str,
        display_id: &str,
        record: &DisplayRecord,
    ) -> Result<()> {
        self.displays
            .lock()
            .unwrap()
            .insert(display_key(venue_id, display_id), record.clone());
        Ok(())
    }

    async fn delete_display(&self, venue_id: &str, display_id: &str) -> Result<()> {
        self.check_deletes()?;
        self.displays
            .lock()
            .unwrap()
            .remove(&display_key(venue_id, display_id));
        Ok(())
    }

    async fn append_history(&self, _venue_id: &str, entry: &HistoryEntry) -> Result<()> {
        self.history.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

pub struct FakeCatalog {
    /// Album returned by `resolve_album`; `None` simulates a lookup miss.
    pub album: Mutex<Option<String>>,
    pub fail_assets: AtomicBool,
    pub asset_calls: AtomicUsize,
    /// (album, artist) of the last `album_assets` call.
    pub last_assets_query: Mutex<Option<(String, String)>>,
}

impl FakeCatalog {
    pub fn with_album(album: &str) -> Self {
        Self {
            album: Mutex::new(Some(album.to_string())),
            fail_assets: AtomicBool::new(false),
            asset_calls: AtomicUsize::new(0),
            last_assets_query: Mutex::new(None),
        }
    }

    pub fn without_album() -> Self {
        let catalog = Self::with_album("");
        *catalog.album.lock().unwrap() = None;
        catalog
    }

    pub fn set_fail_assets(&self, fail: bool) {
        self.fail_assets.store(fail, Ordering::SeqCst);
    }

    pub fn asset_call_count(&self) -> usize {
        self.asset_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MusicCatalog for FakeCatalog {
    async fn resolve_album(&self, _track: &str, _artist: &str) -> Result<Option<String>> {
        Ok(self.album.lock().unwrap().clone())
    }

    async fn album_assets(&self, album: &str, artist: &str) -> Result<Option<AlbumAssets>> {
        self.asset_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_assets_query.lock().unwrap() =
            Some((album.to_string(), artist.to_string()));
        if self.fail_assets.load(Ordering::SeqCst) {
            bail!("simulated catalog outage");
        }
        Ok(Some(AlbumAssets {
            album_title: album.to_string(),
            cover: png_bytes(32, 32, [120, 60, 30, 255]),
            scan_code: png_bytes(64, 16, [255, 255, 255, 255]),
            release_date: "1977-02-04".into(),
            duration_ms: 39 * 60_000 + 3_000,
            track_names: vec!["DREAMS".into(), "THE CHAIN".into(), "SONGBIRD".into()],
        }))
    }
}

#[derive(Default)]
pub struct RecordingSurface {
    shown: Mutex<Vec<Arc<Vec<u8>>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown_count(&self) -> usize {
        self.shown.lock().unwrap().len()
    }
}

#[async_trait]
impl DisplaySurface for RecordingSurface {
    async fn show_image(&self, png: Arc<Vec<u8>>) -> Result<()> {
        self.shown.lock().unwrap().push(png);
        Ok(())
    }
}

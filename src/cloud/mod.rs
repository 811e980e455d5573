//! Persisted record schemas and the `CloudStore` seam over the shared
//! hierarchical key-value store.

mod rest;

pub use rest::RestCloudStore;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// `venues/{venue}/now_playing` — written by the external recognizer,
/// only ever read here. Fields are optional because the producer is not
/// under our control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NowPlayingRecord {
    pub track: Option<String>,
    pub artist: Option<String>,
}

impl NowPlayingRecord {
    /// Both fields present and non-blank, or the record is unusable.
    pub fn as_pair(&self) -> Option<(&str, &str)> {
        match (self.track.as_deref(), self.artist.as_deref()) {
            (Some(track), Some(artist)) if !track.trim().is_empty() && !artist.trim().is_empty() => {
                Some((track, artist))
            }
            _ => None,
        }
    }
}

/// `venues/{venue}/displays/{display}` — its absence is the unpair signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayRecord {
    pub name: String,
    /// Epoch millis at registration.
    pub added: i64,
}

/// `venues/{venue}/history/{entry_id}` — append-only log; entry ids are
/// millisecond timestamp strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub track: String,
    pub artist: String,
    /// Wall-clock "HH:MM".
    pub time: String,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Auto,
    Manual,
}

/// `pairing_codes/{code}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingRecord {
    pub status: PairingStatus,
    pub display_id: String,
    /// Epoch seconds at creation.
    pub timestamp: i64,
    /// Written by the controller when it links the code.
    pub venue_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingStatus {
    Waiting,
    Linked,
}

/// The shared store, as narrow as the core needs it. Every call is
/// fallible and time-boxed by the implementation; callers treat errors as
/// "no new information this tick".
#[async_trait]
pub trait CloudStore: Send + Sync {
    async fn now_playing(&self, venue_id: &str) -> Result<Option<NowPlayingRecord>>;

    async fn put_pairing_code(&self, code: &str, record: &PairingRecord) -> Result<()>;
    async fn get_pairing_code(&self, code: &str) -> Result<Option<PairingRecord>>;
    async fn delete_pairing_code(&self, code: &str) -> Result<()>;

    async fn get_display(&self, venue_id: &str, display_id: &str) -> Result<Option<DisplayRecord>>;
    async fn put_display(
        &self,
        venue_id: &str,
        display_id: &str,
        record: &DisplayRecord,
    ) -> Result<()>;
    async fn delete_display(&self, venue_id: &str, display_id: &str) -> Result<()>;

    async fn append_history(&self, venue_id: &str, entry: &HistoryEntry) -> Result<()>;
}

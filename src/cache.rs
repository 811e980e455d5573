use std::sync::Arc;

use crate::poster::Orientation;

/// Identity of "what should currently be shown": track + artist + the
/// canvas orientation. Track and artist are trimmed but case-preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFingerprint {
    pub track: String,
    pub artist: String,
    pub orientation: Orientation,
}

impl ContentFingerprint {
    pub fn new(track: &str, artist: &str, orientation: Orientation) -> Self {
        Self {
            track: track.trim().to_string(),
            artist: artist.trim().to_string(),
            orientation,
        }
    }

    /// True when the two fingerprints name the same recording, regardless
    /// of orientation. The idle timer only resets on this kind of change.
    pub fn same_content(&self, other: &ContentFingerprint) -> bool {
        self.track == other.track && self.artist == other.artist
    }
}

/// A rendered poster, keyed by the fingerprint it was rendered for.
#[derive(Debug, Clone)]
pub struct PosterArtifact {
    pub fingerprint: ContentFingerprint,
    pub png: Arc<Vec<u8>>,
}

/// Single-slot cache: only the artifact for the current fingerprint is ever
/// worth keeping, so `put` unconditionally replaces and `invalidate` drops.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    slot: Option<PosterArtifact>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self { slot: None }
    }

    pub fn get(&self, fingerprint: &ContentFingerprint) -> Option<PosterArtifact> {
        self.slot
            .as_ref()
            .filter(|artifact| &artifact.fingerprint == fingerprint)
            .cloned()
    }

    pub fn put(&mut self, artifact: PosterArtifact) {
        self.slot = Some(artifact);
    }

    pub fn invalidate(&mut self) {
        self.slot = None;
    }
}

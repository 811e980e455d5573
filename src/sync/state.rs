use std::time::{Duration, Instant};

use serde::Serialize;

use crate::cache::ContentFingerprint;

/// What the screen is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayPhase {
    /// Tracking now-playing; the displayed fingerprint follows the venue.
    Active,
    /// Idle fallback; the shell shows its standby surface instead.
    Standby,
    /// Operator-pinned poster; now-playing is ignored until new content
    /// is observed.
    Manual,
}

/// Per-display in-memory state, owned exclusively by one engine instance.
#[derive(Debug)]
pub struct SyncState {
    pub phase: DisplayPhase,
    /// Fingerprint of the poster currently on screen, if any.
    pub displayed: Option<ContentFingerprint>,
    /// Last now-playing fingerprint successfully processed. A manual push
    /// never touches this; it is the key for leaving `Manual`.
    pub observed: Option<ContentFingerprint>,
    /// Idle anchor: reset only on a genuine (track, artist) change.
    pub last_change: Instant,
}

impl SyncState {
    pub fn new() -> Self {
        Self {
            phase: DisplayPhase::Active,
            displayed: None,
            observed: None,
            last_change: Instant::now(),
        }
    }

    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_change.elapsed() > timeout
    }

    /// A render for `fingerprint` completed and is on screen.
    pub fn note_rendered(&mut self, fingerprint: ContentFingerprint, phase: DisplayPhase) {
        self.displayed = Some(fingerprint.clone());
        if phase != DisplayPhase::Manual {
            self.observed = Some(fingerprint);
        }
        self.phase = phase;
    }

    /// True when `incoming` is new content relative to the last observed
    /// fingerprint (orientation-only differences do not count).
    pub fn is_new_content(&self, incoming: &ContentFingerprint) -> bool {
        self.observed
            .as_ref()
            .map_or(true, |observed| !observed.same_content(incoming))
    }

    pub fn enter_standby(&mut self) {
        self.phase = DisplayPhase::Standby;
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view published to the shell after every transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    pub phase: DisplayPhase,
    pub track: Option<String>,
    pub artist: Option<String>,
}

impl SyncSnapshot {
    pub fn from_state(state: &SyncState) -> Self {
        Self {
            phase: state.phase,
            track: state.displayed.as_ref().map(|fp| fp.track.clone()),
            artist: state.displayed.as_ref().map(|fp| fp.artist.clone()),
        }
    }

    pub fn initial() -> Self {
        Self {
            phase: DisplayPhase::Active,
            track: None,
            artist: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poster::Orientation;

    fn fp(track: &str, orientation: Orientation) -> ContentFingerprint {
        ContentFingerprint::new(track, "Artist", orientation)
    }

    #[test]
    fn fresh_state_treats_anything_as_new_content() {
        let state = SyncState::new();
        assert!(state.is_new_content(&fp("Dreams", Orientation::Landscape)));
    }

    #[test]
    fn orientation_flip_is_not_new_content() {
        let mut state = SyncState::new();
        state.note_rendered(fp("Dreams", Orientation::Landscape), DisplayPhase::Active);
        assert!(!state.is_new_content(&fp("Dreams", Orientation::Portrait)));
        assert!(state.is_new_content(&fp("The Chain", Orientation::Landscape)));
    }

    #[test]
    fn manual_render_keeps_observed_untouched() {
        let mut state = SyncState::new();
        state.note_rendered(fp("Dreams", Orientation::Landscape), DisplayPhase::Active);
        state.note_rendered(fp("Rumours", Orientation::Portrait), DisplayPhase::Manual);

        assert_eq!(state.phase, DisplayPhase::Manual);
        assert_eq!(state.displayed.as_ref().unwrap().track, "Rumours");
        assert_eq!(state.observed.as_ref().unwrap().track, "Dreams");
    }

    #[test]
    fn idle_is_measured_from_last_change() {
        let state = SyncState::new();
        assert!(!state.is_idle(Duration::from_secs(60)));
        std::thread::sleep(Duration::from_millis(2));
        assert!(state.is_idle(Duration::from_millis(1)));
    }
}

//! Runtime configuration plus the persisted pairing binding. Secrets are
//! resolved environment-first, then from the config file, so deployments
//! can keep credentials out of the JSON on disk.

use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::poster::Orientation;
use crate::sync::SyncConfig;

const ENV_CLOUD_BASE: &str = "CLOUD_BASE_URL";
const ENV_SPOTIFY_ID: &str = "SPOTIFY_CLIENT_ID";
const ENV_SPOTIFY_SECRET: &str = "SPOTIFY_CLIENT_SECRET";

const DEFAULT_POLL_PERIOD_SECS: u64 = 3;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root URL of the shared record store.
    pub cloud_base_url: String,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub poll_period_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub default_orientation: Orientation,
    /// Forwarded to the kiosk shell's standby surface; the daemon itself
    /// never consults it.
    pub default_city: String,
    /// Where the current poster is written for the shell to pick up.
    pub poster_path: PathBuf,
    /// Where the (venue, display) binding survives restarts.
    pub binding_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cloud_base_url: String::new(),
            spotify_client_id: None,
            spotify_client_secret: None,
            poll_period_seconds: DEFAULT_POLL_PERIOD_SECS,
            idle_timeout_seconds: DEFAULT_IDLE_TIMEOUT_SECS,
            default_orientation: Orientation::default(),
            default_city: "London".into(),
            poster_path: PathBuf::from("current_poster.png"),
            binding_path: PathBuf::from("display_binding.json"),
        }
    }
}

impl AppConfig {
    /// Parse the config file, or start from defaults when it is absent.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("malformed config at {}", path.display()))
    }

    /// File values with environment overrides applied on top.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.overlay_env();
        Ok(config)
    }

    /// Environment beats file for anything secret-shaped.
    pub fn overlay_env(&mut self) {
        if let Ok(base) = env::var(ENV_CLOUD_BASE) {
            self.cloud_base_url = base;
        }
        if let Ok(id) = env::var(ENV_SPOTIFY_ID) {
            self.spotify_client_id = Some(id);
        }
        if let Ok(secret) = env::var(ENV_SPOTIFY_SECRET) {
            self.spotify_client_secret = Some(secret);
        }
    }

    /// Both halves of the catalog credential, or `None` if either is missing.
    pub fn spotify_credentials(&self) -> Option<(&str, &str)> {
        match (
            self.spotify_client_id.as_deref(),
            self.spotify_client_secret.as_deref(),
        ) {
            (Some(id), Some(secret)) => Some((id, secret)),
            _ => None,
        }
    }

    pub fn sync(&self) -> SyncConfig {
        SyncConfig {
            poll_period: Duration::from_secs(self.poll_period_seconds),
            idle_timeout: Duration::from_secs(self.idle_timeout_seconds),
        }
    }
}

/// The binding a successful pairing produces. Persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayBinding {
    pub venue_id: String,
    pub display_id: String,
}

/// Disk persistence for the pairing binding. A corrupt or missing file
/// just means the display pairs again, so loads never fail.
pub struct BindingStore {
    path: PathBuf,
}

impl BindingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Option<DisplayBinding> {
        let contents = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    pub fn save(&self, binding: &DisplayBinding) -> Result<()> {
        let serialized = serde_json::to_string_pretty(binding)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write binding to {}", self.path.display()))
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to clear {}", self.path.display()))
            }
        }
    }
}

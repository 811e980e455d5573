//! Client-credentials metadata client. All endpoints are read-only; a
//! cached bearer token is refreshed shortly before it expires.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{clean_album_title, clean_track_title, AlbumAssets, MusicCatalog};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";
const SCANNABLES_BASE: &str = "https://scannables.scdn.co/uri/plain/png/000000/white/640";
const HTTP_TIMEOUT_SECS: u64 = 10;

/// Refresh this long before the advertised expiry.
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

pub struct SpotifyCatalog {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct TrackSearchResponse {
    tracks: ItemPage<TrackItem>,
}

#[derive(Debug, Deserialize)]
struct AlbumSearchResponse {
    albums: ItemPage<AlbumSummary>,
}

#[derive(Debug, Deserialize)]
struct ItemPage<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    album: AlbumRef,
}

#[derive(Debug, Deserialize)]
struct AlbumRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumSummary {
    id: String,
    name: String,
    uri: String,
    images: Vec<ImageRef>,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    url: String,
}

#[derive(Debug, Deserialize)]
struct AlbumDetail {
    release_date: Option<String>,
    tracks: ItemPage<AlbumTrack>,
}

#[derive(Debug, Deserialize)]
struct AlbumTrack {
    name: String,
    duration_ms: u64,
}

impl SpotifyCatalog {
    pub fn new(client_id: &str, client_secret: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .context("failed to build catalog HTTP client")?;

        Ok(Self {
            client,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token: Mutex::new(None),
        })
    }

    async fn bearer_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }

        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("catalog token request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("catalog token endpoint returned {}", response.status());
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("catalog token response was not JSON")?;

        let lifetime = token.expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS);
        let access_token = token.access_token.clone();
        *guard = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });

        Ok(access_token)
    }

    async fn search<T: serde::de::DeserializeOwned>(&self, query: &str, kind: &str) -> Result<T> {
        let token = self.bearer_token().await?;
        let response = self
            .client
            .get(format!("{API_BASE}/search"))
            .bearer_auth(token)
            .query(&[("q", query), ("type", kind), ("limit", "1")])
            .send()
            .await
            .context("catalog search request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("catalog search returned {}", response.status());
        }

        response.json().await.context("catalog search response was not JSON")
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("image fetch failed for {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("image fetch for {url} returned {}", response.status());
        }

        Ok(response
            .bytes()
            .await
            .with_context(|| format!("image body read failed for {url}"))?
            .to_vec())
    }
}

#[async_trait]
impl MusicCatalog for SpotifyCatalog {
    async fn resolve_album(&self, track: &str, artist: &str) -> Result<Option<String>> {
        let query = format!("track:{track} artist:{artist}");
        let result: TrackSearchResponse = self.search(&query, "track").await?;
        Ok(result
            .tracks
            .items
            .into_iter()
            .next()
            .map(|item| item.album.name))
    }

    async fn album_assets(&self, album: &str, artist: &str) -> Result<Option<AlbumAssets>> {
        let query = format!("album:{album} artist:{artist}");
        let result: AlbumSearchResponse = self.search(&query, "album").await?;
        let Some(summary) = result.albums.items.into_iter().next() else {
            return Ok(None);
        };
        let Some(cover_url) = summary.images.first().map(|image| image.url.clone()) else {
            return Ok(None);
        };

        let token = self.bearer_token().await?;
        let response = self
            .client
            .get(format!("{API_BASE}/albums/{}", summary.id))
            .bearer_auth(token)
            .send()
            .await
            .context("catalog album fetch failed")?;
        if !response.status().is_success() {
            anyhow::bail!("catalog album fetch returned {}", response.status());
        }
        let detail: AlbumDetail = response
            .json()
            .await
            .context("catalog album response was not JSON")?;

        let cover = self.fetch_bytes(&cover_url).await?;
        let scan_code = self
            .fetch_bytes(&format!("{SCANNABLES_BASE}/{}", summary.uri))
            .await?;

        let duration_ms: u64 = detail.tracks.items.iter().map(|track| track.duration_ms).sum();
        let track_names = detail
            .tracks
            .items
            .iter()
            .map(|track| clean_track_title(&track.name.to_uppercase()))
            .collect();

        Ok(Some(AlbumAssets {
            album_title: clean_album_title(&summary.name),
            cover,
            scan_code,
            release_date: detail.release_date.unwrap_or_default(),
            duration_ms,
            track_names,
        }))
    }
}

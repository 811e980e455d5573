//! REST client for the hierarchical key-value store. Records live at
//! `{base}/{path}.json`; a missing record reads back as JSON `null`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use super::{CloudStore, DisplayRecord, HistoryEntry, NowPlayingRecord, PairingRecord};

const READ_TIMEOUT_SECS: u64 = 5;
const WRITE_TIMEOUT_SECS: u64 = 3;

pub struct RestCloudStore {
    base: String,
    client: reqwest::Client,
}

impl RestCloudStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .build()
            .context("failed to build cloud store HTTP client")?;

        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("cloud store read failed for {path}"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            anyhow::bail!("cloud store read for {path} returned {}", response.status());
        }

        // The store answers 200 with a `null` body for absent records.
        let value: serde_json::Value = response
            .json()
            .await
            .with_context(|| format!("cloud store response for {path} was not JSON"))?;
        if value.is_null() {
            return Ok(None);
        }

        let record = serde_json::from_value(value)
            .with_context(|| format!("cloud store record at {path} had an unexpected shape"))?;
        Ok(Some(record))
    }

    async fn put_json<T: Serialize>(&self, path: &str, body: &T) -> Result<()> {
        let response = self
            .client
            .put(self.url(path))
            .timeout(Duration::from_secs(WRITE_TIMEOUT_SECS))
            .json(body)
            .send()
            .await
            .with_context(|| format!("cloud store write failed for {path}"))?;

        if !response.status().is_success() {
            anyhow::bail!("cloud store write for {path} returned {}", response.status());
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(path))
            .timeout(Duration::from_secs(WRITE_TIMEOUT_SECS))
            .send()
            .await
            .with_context(|| format!("cloud store delete failed for {path}"))?;

        // Deleting an already-absent record is not an error.
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            anyhow::bail!("cloud store delete for {path} returned {}", response.status());
        }
        Ok(())
    }
}

#[async_trait]
impl CloudStore for RestCloudStore {
    async fn now_playing(&self, venue_id: &str) -> Result<Option<NowPlayingRecord>> {
        self.get_json(&format!("venues/{venue_id}/now_playing")).await
    }

    async fn put_pairing_code(&self, code: &str, record: &PairingRecord) -> Result<()> {
        self.put_json(&format!("pairing_codes/{code}"), record).await
    }

    async fn get_pairing_code(&self, code: &str) -> Result<Option<PairingRecord>> {
        self.get_json(&format!("pairing_codes/{code}")).await
    }

    async fn delete_pairing_code(&self, code: &str) -> Result<()> {
        self.delete(&format!("pairing_codes/{code}")).await
    }

    async fn get_display(&self, venue_id: &str, display_id: &str) -> Result<Option<DisplayRecord>> {
        self.get_json(&format!("venues/{venue_id}/displays/{display_id}"))
            .await
    }

    async fn put_display(
        &self,
        venue_id: &str,
        display_id: &str,
        record: &DisplayRecord,
    ) -> Result<()> {
        self.put_json(&format!("venues/{venue_id}/displays/{display_id}"), record)
            .await
    }

    async fn delete_display(&self, venue_id: &str, display_id: &str) -> Result<()> {
        self.delete(&format!("venues/{venue_id}/displays/{display_id}"))
            .await
    }

    async fn append_history(&self, venue_id: &str, entry: &HistoryEntry) -> Result<()> {
        self.put_json(&format!("venues/{venue_id}/history/{}", entry.id), entry)
            .await
    }
}

//! Pairing protocol: turn a short numeric code shown on the screen into a
//! durable (venue, display) binding, with the shared store as the only
//! coordinator.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::Utc;
use log::warn;
use rand::Rng;
use uuid::Uuid;

use crate::cloud::{CloudStore, DisplayRecord, PairingRecord, PairingStatus};

/// Collision retries before giving up on code generation. With six digits
/// and a handful of outstanding codes this bound is effectively unreachable.
const MAX_CODE_ATTEMPTS: usize = 16;

/// A freshly generated pairing code and the display identity that will own
/// the binding once a controller links it.
#[derive(Debug, Clone)]
pub struct PendingPairing {
    pub code: String,
    pub display_id: String,
}

pub struct PairingBroker<S> {
    store: Arc<S>,
}

impl<S: CloudStore> PairingBroker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Produce a fresh 6-digit code plus a new display id and write the
    /// `waiting` record. Regenerates on collision with an outstanding code;
    /// the read-then-write window is a benign last-writer-wins race.
    pub async fn generate_code(&self) -> Result<PendingPairing> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
            if self.store.get_pairing_code(&code).await?.is_some() {
                continue;
            }

            let display_id = format!("disp_{}", Uuid::new_v4().simple());
            let record = PairingRecord {
                status: PairingStatus::Waiting,
                display_id: display_id.clone(),
                timestamp: Utc::now().timestamp(),
                venue_id: None,
            };
            self.store.put_pairing_code(&code, &record).await?;

            return Ok(PendingPairing { code, display_id });
        }

        bail!("could not find a free pairing code after {MAX_CODE_ATTEMPTS} attempts")
    }

    /// `generate_code`, retried until the store accepts the write. A store
    /// outage during onboarding delays the code, it never kills the screen.
    pub async fn generate_code_retrying(&self, retry_delay: Duration) -> PendingPairing {
        loop {
            match self.generate_code().await {
                Ok(pending) => return pending,
                Err(err) => {
                    warn!("pairing code generation failed, retrying: {err:#}");
                    tokio::time::sleep(retry_delay).await;
                }
            }
        }
    }

    /// Check whether a controller has linked the code. On the first
    /// successful `linked` read the record is deleted (single use) and the
    /// display is registered under the venue. The delete runs before
    /// registration so a later failure can only cause a harmless re-pair,
    /// never a double bind.
    pub async fn poll_linked(&self, pending: &PendingPairing) -> Result<Option<String>> {
        let Some(record) = self.store.get_pairing_code(&pending.code).await? else {
            return Ok(None);
        };

        if record.status != PairingStatus::Linked {
            return Ok(None);
        }
        let Some(venue_id) = record.venue_id else {
            return Ok(None);
        };

        if let Err(err) = self.store.delete_pairing_code(&pending.code).await {
            warn!("consumed pairing code {} but delete failed: {err:#}", pending.code);
        }

        let display = DisplayRecord {
            name: format!("Display {}", &pending.code[..3]),
            added: Utc::now().timestamp_millis(),
        };
        if let Err(err) = self
            .store
            .put_display(&venue_id, &pending.display_id, &display)
            .await
        {
            // Non-fatal: the unpair poll will read the display as absent
            // and the screen simply returns to pairing.
            warn!(
                "display registration failed for venue {venue_id}: {err:#}"
            );
        }

        Ok(Some(venue_id))
    }

    /// Remote-unpair signal: true iff the display's registry record no
    /// longer exists. Store failures read as "still paired".
    pub async fn check_unpaired(&self, venue_id: &str, display_id: &str) -> bool {
        match self.store.get_display(venue_id, display_id).await {
            Ok(record) => record.is_none(),
            Err(err) => {
                warn!("unpair check failed for {venue_id}/{display_id}: {err:#}");
                false
            }
        }
    }

    pub async fn unpair(&self, venue_id: &str, display_id: &str) -> Result<()> {
        self.store.delete_display(venue_id, display_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemoryStore;

    fn broker() -> (Arc<MemoryStore>, PairingBroker<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), PairingBroker::new(store))
    }

    async fn link(store: &MemoryStore, code: &str, venue: &str) {
        let mut record = store.get_pairing_code(code).await.unwrap().unwrap();
        record.status = PairingStatus::Linked;
        record.venue_id = Some(venue.to_string());
        store.put_pairing_code(code, &record).await.unwrap();
    }

    #[tokio::test]
    async fn generate_writes_waiting_record() {
        let (store, broker) = broker();
        let pending = broker.generate_code().await.unwrap();

        assert_eq!(pending.code.len(), 6);
        assert!(pending.code.chars().all(|c| c.is_ascii_digit()));

        let record = store.get_pairing_code(&pending.code).await.unwrap().unwrap();
        assert_eq!(record.status, PairingStatus::Waiting);
        assert_eq!(record.display_id, pending.display_id);
        assert!(record.venue_id.is_none());
    }

    #[tokio::test]
    async fn generated_codes_avoid_outstanding_ones() {
        let (store, broker) = broker();
        // Occupy most of a tiny slice of the space; what matters is that a
        // fresh code never equals an existing key.
        let first = broker.generate_code().await.unwrap();
        let second = broker.generate_code().await.unwrap();
        assert_ne!(first.code, second.code);
        assert!(store.get_pairing_code(&second.code).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn waiting_code_polls_empty() {
        let (_store, broker) = broker();
        let pending = broker.generate_code().await.unwrap();
        assert!(broker.poll_linked(&pending).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn linked_code_is_consumed_exactly_once() {
        let (store, broker) = broker();
        let pending = broker.generate_code().await.unwrap();
        link(&store, &pending.code, "venue-1").await;

        let venue = broker.poll_linked(&pending).await.unwrap();
        assert_eq!(venue.as_deref(), Some("venue-1"));

        // Record is gone, so a racing second poll reads empty.
        assert!(store.get_pairing_code(&pending.code).await.unwrap().is_none());
        assert!(broker.poll_linked(&pending).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn consumption_registers_the_display() {
        let (store, broker) = broker();
        let pending = broker.generate_code().await.unwrap();
        link(&store, &pending.code, "venue-1").await;

        broker.poll_linked(&pending).await.unwrap();

        let display = store
            .get_display("venue-1", &pending.display_id)
            .await
            .unwrap();
        assert!(display.is_some());
        assert!(!broker.check_unpaired("venue-1", &pending.display_id).await);
    }

    #[tokio::test]
    async fn unpair_deletes_registry_record() {
        let (store, broker) = broker();
        let pending = broker.generate_code().await.unwrap();
        link(&store, &pending.code, "venue-1").await;
        broker.poll_linked(&pending).await.unwrap();

        broker.unpair("venue-1", &pending.display_id).await.unwrap();
        assert!(broker.check_unpaired("venue-1", &pending.display_id).await);
        assert!(store
            .get_display("venue-1", &pending.display_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn code_generation_outlives_a_store_outage() {
        let (store, broker) = broker();
        store.set_fail_reads(true);

        let recover = {
            let store = store.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                store.set_fail_reads(false);
            })
        };

        let pending = broker.generate_code_retrying(Duration::from_millis(1)).await;
        recover.await.unwrap();
        assert!(store.get_pairing_code(&pending.code).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_code_delete_still_returns_the_venue() {
        let (store, broker) = broker();
        let pending = broker.generate_code().await.unwrap();
        link(&store, &pending.code, "venue-1").await;

        store.set_fail_deletes(true);
        let venue = broker.poll_linked(&pending).await.unwrap();
        assert_eq!(venue.as_deref(), Some("venue-1"));

        // The leftover record is a warned-about leak, not a blocker: the
        // display is registered and the binding proceeds.
        assert!(store.get_pairing_code(&pending.code).await.unwrap().is_some());
        assert!(store
            .get_display("venue-1", &pending.display_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn store_failure_reads_as_still_paired() {
        let (store, broker) = broker();
        store.set_fail_reads(true);
        assert!(!broker.check_unpaired("venue-1", "disp_x").await);
    }
}

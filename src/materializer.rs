use crate::error::ForemanError;
use crate::job::DelayEnvelope;
use crate::keys::KeyLayout;
use crate::producer::Producer;
use crate::store::Store;

/// The "delay" unit flavor: one short-lived sweep that promotes mature
/// delayed jobs to the realtime lane.
pub struct DelayMaterializer {
    store: Store,
    keys: KeyLayout,
    producer: Producer,
    max_exec: u32,
}

impl DelayMaterializer {
    pub fn new(store: Store, keys: KeyLayout, max_exec: u32) -> Self {
        let producer = Producer::new(store.clone(), keys.clone());
        Self {
            store,
            keys,
            producer,
            max_exec,
        }
    }

    /// Runs one sweep and returns the number of promoted jobs. Applying a
    /// sweep to already-drained buckets is a no-op, so crashed or
    /// overlapping sweeps re-converge from Redis state alone.
    pub async fn sweep(&self) -> Result<usize, ForemanError> {
        let now = chrono::Utc::now().timestamp();
        let due = self.store.zrangebyscore(&self.keys.delay_time(), 0, now).await?;

        let mut moved = 0usize;
        for fire_at in due {
            let bucket = self.keys.delay_jobs(&fire_at);
            loop {
                if moved >= self.max_exec as usize {
                    tracing::info!(moved, "Delay sweep reached its batch bound");
                    return Ok(moved);
                }

                match self.store.rpop(&bucket).await? {
                    Some(raw) => {
                        moved += 1;
                        match serde_json::from_str::<DelayEnvelope>(&raw) {
                            Ok(envelope) => {
                                self.producer
                                    .push_realtime(&envelope.group, &envelope.job)
                                    .await?;
                            }
                            Err(err) => {
                                tracing::warn!(
                                    fire_at,
                                    error = %err,
                                    "Dropping undecodable delay envelope"
                                );
                            }
                        }
                    }
                    None => {
                        // schedule entry first, lock field second; a crash
                        // in between re-observes an empty bucket next sweep
                        self.store.zrem(&self.keys.delay_time(), &fire_at).await?;
                        self.store.hdel(&self.keys.delay_lock(), &fire_at).await?;
                        break;
                    }
                }
            }
        }

        if moved > 0 {
            tracing::info!(moved, "Delay sweep promoted jobs");
        }
        Ok(moved)
    }
}

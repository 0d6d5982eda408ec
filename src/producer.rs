use crate::error::ForemanError;
use crate::job::{DelayEnvelope, JobPayload};
use crate::keys::KeyLayout;
use crate::store::Store;

/// Delivery lane for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Enqueue now, FIFO per group.
    Realtime,
    /// Park in a per-second bucket until `now + time`.
    Delay,
    /// Deduplicate on `cmd` (plus the payload's `unique_id`) for `time`
    /// seconds, then enqueue as realtime. The marker is never cleared when
    /// the job runs; the TTL alone is the dedup window.
    Unique,
}

/// Outcome of `Producer::add`. The numeric protocol of the wire API maps
/// `Duplicate` to −1 and `Queued(n)` to n; storage failures surface as
/// `Err(ForemanError)` instead of the 0 sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Enqueued; holds the new length of the target list.
    Queued(i64),
    /// Rejected inside a unique lane's dedup window.
    Duplicate,
}

impl AddOutcome {
    pub fn code(&self) -> i64 {
        match self {
            AddOutcome::Queued(len) => *len,
            AddOutcome::Duplicate => -1,
        }
    }
}

/// Routes new submissions into the realtime, delay or unique lane.
#[derive(Clone)]
pub struct Producer {
    store: Store,
    keys: KeyLayout,
}

impl Producer {
    pub fn new(store: Store, keys: KeyLayout) -> Self {
        Self { store, keys }
    }

    /// Submits `cmd` with `payload` to `group` over `lane`. `time` is the
    /// delay or dedup window in whole seconds. An empty group falls back to
    /// `main`; `time == 0` forces the realtime lane so a unique marker can
    /// never be written without a TTL.
    pub async fn add(
        &self,
        cmd: &str,
        payload: serde_json::Map<String, serde_json::Value>,
        group: &str,
        lane: Lane,
        time: i64,
    ) -> Result<AddOutcome, ForemanError> {
        let group = if group.is_empty() { "main" } else { group };
        let lane = if time == 0 { Lane::Realtime } else { lane };
        let payload = JobPayload::new(cmd, payload);

        tracing::trace!(cmd = payload.cmd, group, ?lane, time, "Adding job");

        match lane {
            Lane::Realtime => {
                let len = self.push_realtime(group, &payload).await?;
                Ok(AddOutcome::Queued(len))
            }
            Lane::Unique => {
                let uid = match payload.unique_suffix() {
                    Some(suffix) => format!("{}:{suffix}", payload.cmd),
                    None => payload.cmd.clone(),
                };
                let marker = self.keys.unique(&uid);
                let now = chrono::Utc::now().timestamp();
                if !self.store.set_nx(&marker, &now.to_string()).await? {
                    tracing::debug!(uid, "Duplicate submission inside dedup window");
                    return Ok(AddOutcome::Duplicate);
                }
                self.store.expire(&marker, time).await?;

                let len = self.push_realtime(group, &payload).await?;
                Ok(AddOutcome::Queued(len))
            }
            Lane::Delay => {
                let fire_at = chrono::Utc::now().timestamp() + time;
                let field = fire_at.to_string();
                // The HSETNX gate makes the ZADD idempotent across
                // producers racing on the same fire time.
                if self.store.hset_nx(&self.keys.delay_lock(), &field, &field).await? {
                    self.store.zadd(&self.keys.delay_time(), &field, fire_at).await?;
                }

                let envelope = DelayEnvelope {
                    group: group.to_string(),
                    job: payload,
                };
                let len = self
                    .store
                    .lpush(&self.keys.delay_jobs(&field), &serde_json::to_string(&envelope)?)
                    .await?;
                Ok(AddOutcome::Queued(len))
            }
        }
    }

    /// Realtime enqueue shared with the delay materializer and the admin
    /// rollback path. The listen entry must land before the first push on a
    /// freshly empty list so a waking master never misses it.
    pub(crate) async fn push_realtime(
        &self,
        group: &str,
        payload: &JobPayload,
    ) -> Result<i64, ForemanError> {
        let jobs_key = self.keys.jobs(group);
        self.store.sadd(&self.keys.listen(), &jobs_key).await?;
        self.store
            .lpush(&jobs_key, &serde_json::to_string(payload)?)
            .await
    }
}

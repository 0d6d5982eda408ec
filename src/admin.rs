use std::collections::HashMap;
use std::str::FromStr;

use crate::error::ForemanError;
use crate::job::LogEntry;
use crate::keys::KeyLayout;
use crate::producer::Producer;
use crate::store::Store;

/// The two dispatch logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Success,
    Failed,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Success => "success",
            LogKind::Failed => "failed",
        }
    }
}

impl FromStr for LogKind {
    type Err = ForemanError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "success" => Ok(LogKind::Success),
            "failed" => Ok(LogKind::Failed),
            other => Err(ForemanError::InvalidLogKind(other.to_string())),
        }
    }
}

/// One page of a dispatch log.
#[derive(Debug, Clone)]
pub struct LogView {
    pub key: String,
    pub len: i64,
    pub data: Vec<LogEntry>,
}

/// Operator surface: enumerate queues and workers, roll failed jobs back,
/// trim logs, kill units. Must not be exposed over untrusted channels.
#[derive(Clone)]
pub struct Admin {
    store: Store,
    keys: KeyLayout,
}

impl Admin {
    pub fn new(store: Store, keys: KeyLayout) -> Self {
        Self { store, keys }
    }

    /// Deletes one worker's liveness key (or every worker on this host
    /// when `proc_hash` is `None`) and compacts the watch hash.
    pub async fn kill(&self, proc_hash: Option<&str>) -> Result<(), ForemanError> {
        match proc_hash {
            Some(hash) => {
                let worker_key = self.keys.worker(hash);
                self.store.del(&worker_key).await?;
                self.store.hdel(&self.keys.watch(), &worker_key).await?;
                tracing::info!(unit = hash, "Killed worker");
            }
            None => {
                let fields = self.store.hkeys(&self.keys.watch()).await?;
                self.store.del_many(&fields).await?;
                self.store.hdel_many(&self.keys.watch(), &fields).await?;
                tracing::info!(count = fields.len(), "Killed all workers");
            }
        }

        compact_watch(&self.store, &self.keys.watch()).await?;
        Ok(())
    }

    /// Removes one raw entry from the failure log and re-enqueues its
    /// payload on the realtime lane under the `rollback` group. Returns the
    /// new length of that list, or `0` when the entry was not found (and
    /// nothing was enqueued).
    pub async fn rollback(&self, job_json: &str) -> Result<i64, ForemanError> {
        let removed = self.store.lrem(&self.keys.failed(), 1, job_json).await?;
        if removed == 0 {
            return Ok(0);
        }

        let entry: LogEntry = serde_json::from_str(job_json)?;
        let producer = Producer::new(self.store.clone(), self.keys.clone());
        let len = producer.push_realtime("rollback", &entry.data).await?;

        tracing::info!(cmd = entry.data.cmd, "Rolled back failed job");
        Ok(len)
    }

    /// Returns the `start..=stop` slice of a dispatch log. `kind` must be
    /// `success` or `failed`.
    pub async fn show_logs(&self, kind: &str, start: i64, stop: i64) -> Result<LogView, ForemanError> {
        let key = self.log_key(kind.parse()?);
        let len = self.store.llen(&key).await?;

        let mut data = Vec::new();
        for raw in self.store.lrange(&key, start, stop).await? {
            data.push(serde_json::from_str(&raw)?);
        }

        Ok(LogView { key, len, data })
    }

    /// Drops a dispatch log wholesale. The failure log is only ever
    /// trimmed through this operation.
    pub async fn del_logs(&self, kind: &str) -> Result<(), ForemanError> {
        let key = self.log_key(kind.parse()?);
        self.store.del(&key).await?;
        Ok(())
    }

    /// Length of an arbitrary job list (callers pass fully-qualified keys
    /// as returned by `show_queue`).
    pub async fn show_length(&self, queue_key: &str) -> Result<i64, ForemanError> {
        self.store.llen(queue_key).await
    }

    /// The listen set, pruned: members whose list is empty are removed, so
    /// repeated calls without producer activity only ever shrink.
    pub async fn show_queue(&self) -> Result<Vec<String>, ForemanError> {
        let mut queues = Vec::new();
        for list_key in self.store.smembers(&self.keys.listen()).await? {
            if self.store.llen(&list_key).await? > 0 {
                queues.push(list_key);
            } else {
                self.store.srem(&self.keys.listen(), &list_key).await?;
            }
        }

        queues.sort();
        Ok(queues)
    }

    /// The compacted watch hash for this host: worker key to enrollment
    /// time, live entries only.
    pub async fn show_process(&self) -> Result<HashMap<String, String>, ForemanError> {
        compact_watch(&self.store, &self.keys.watch()).await
    }

    /// Every host's compacted watch hash in this namespace, keyed by
    /// hostname. The `KEYS watch:*` iteration lives here and nowhere else.
    pub async fn show_hosts(
        &self,
    ) -> Result<HashMap<String, HashMap<String, String>>, ForemanError> {
        let mut hosts = HashMap::new();
        for watch_key in self.store.keys(&self.keys.watch_pattern()).await? {
            let host = match watch_key.rsplit(':').next() {
                Some(host) => host.to_string(),
                None => continue,
            };
            let entries = compact_watch(&self.store, &watch_key).await?;
            hosts.insert(host, entries);
        }
        Ok(hosts)
    }

    /// A handle on the same store under a fresh key namespace. The
    /// original is untouched.
    pub fn set_name(&self, name: &str) -> Admin {
        Admin {
            store: self.store.clone(),
            keys: KeyLayout::new(name, self.keys.host()),
        }
    }

    fn log_key(&self, kind: LogKind) -> String {
        match kind {
            LogKind::Success => self.keys.success(),
            LogKind::Failed => self.keys.failed(),
        }
    }
}

/// Reads one watch hash and drops entries whose worker string is gone
/// (invariant: a watch field without a live worker key is garbage).
/// Returns the surviving entries.
pub(crate) async fn compact_watch(
    store: &Store,
    watch_key: &str,
) -> Result<HashMap<String, String>, ForemanError> {
    let mut entries = store.hgetall(watch_key).await?;

    let mut dead = Vec::new();
    for worker_key in entries.keys() {
        if !store.exists(worker_key).await? {
            dead.push(worker_key.clone());
        }
    }

    if !dead.is_empty() {
        tracing::debug!(count = dead.len(), "Compacting stale watch entries");
        store.hdel_many(watch_key, &dead).await?;
        for worker_key in &dead {
            entries.remove(worker_key);
        }
    }

    Ok(entries)
}

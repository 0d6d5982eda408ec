/// Centralizes the Redis key naming scheme shared by every scheduler
/// component.
///
/// All keys carry the `{Q}:<queueName>:` prefix. The literal `{Q}` hash tag
/// pins every key of a deployment to one Redis Cluster slot; external
/// tooling depends on the prefix, so it is part of the wire contract.
#[derive(Debug, Clone)]
pub struct KeyLayout {
    /// Normalized `{Q}:<queueName>:` prefix applied to every key.
    prefix: String,
    /// Queue namespace segment inside the prefix.
    queue_name: String,
    /// Hostname segment used by the per-host watch hash and master lock.
    host: String,
}

impl KeyLayout {
    /// Builds the key family for one queue namespace on one host. An empty
    /// queue name falls back to `main`.
    pub fn new(queue_name: impl Into<String>, host: impl Into<String>) -> Self {
        let queue_name = queue_name.into();
        let queue_name = if queue_name.is_empty() {
            "main".to_string()
        } else {
            queue_name
        };

        Self {
            prefix: format!("{{Q}}:{queue_name}:"),
            queue_name,
            host: host.into(),
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// SET of fully-qualified job-list keys that may contain jobs.
    pub fn listen(&self) -> String {
        format!("{}listen", self.prefix)
    }

    /// LIST of job payloads for one group, LPUSH producer / BRPOP consumer.
    pub fn jobs(&self, group: &str) -> String {
        format!("{}jobs:{group}", self.prefix)
    }

    /// ZSET of pending fire times (member = score = unix second).
    pub fn delay_time(&self) -> String {
        format!("{}delay:time", self.prefix)
    }

    /// HASH marking fire times already present in the delay ZSET.
    pub fn delay_lock(&self) -> String {
        format!("{}delay:lock", self.prefix)
    }

    /// LIST of `{group, job}` envelopes waiting until `fire_at`.
    pub fn delay_jobs(&self, fire_at: &str) -> String {
        format!("{}delay:jobs:{fire_at}", self.prefix)
    }

    /// Dedup marker STRING, expires after the submission's `time` seconds.
    pub fn unique(&self, uid: &str) -> String {
        format!("{}unique:{uid}", self.prefix)
    }

    /// Per-host HASH of enrolled worker keys (field = worker key).
    pub fn watch(&self) -> String {
        format!("{}watch:{}", self.prefix, self.host)
    }

    /// `KEYS` pattern matching every host's watch hash in this namespace.
    /// Cross-host queries iterate hosts through this pattern via the Admin
    /// surface only.
    pub fn watch_pattern(&self) -> String {
        format!("{}watch:*", self.prefix)
    }

    /// Liveness STRING for one unit; presence means alive.
    pub fn worker(&self, id: &str) -> String {
        format!("{}worker:{id}", self.prefix)
    }

    /// The master lock key. The host segment makes it a single-writer lock
    /// across competing masters on the same machine.
    pub fn master(&self) -> String {
        self.worker(&self.host)
    }

    /// Bounded LIST of successful dispatch records.
    pub fn success(&self) -> String {
        format!("{}success", self.prefix)
    }

    /// Unbounded LIST of failed dispatch records.
    pub fn failed(&self) -> String {
        format!("{}failed", self.prefix)
    }
}

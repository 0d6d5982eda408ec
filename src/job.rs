use serde::{Deserialize, Serialize};

/// A submitted job. Opaque to the scheduler except for `cmd`, the command
/// string the dispatcher routes on; everything else rides along for the
/// handler.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobPayload {
    pub cmd: String,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl JobPayload {
    /// A `cmd` member inside `rest` would collide with the flattened field,
    /// so the explicit argument wins.
    pub fn new(cmd: impl Into<String>, mut rest: serde_json::Map<String, serde_json::Value>) -> Self {
        let cmd = cmd.into();
        rest.remove("cmd");
        Self { cmd, rest }
    }

    /// The logical id the unique lane deduplicates on, when the payload
    /// carries one.
    pub fn unique_suffix(&self) -> Option<String> {
        match self.rest.get("unique_id") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// The `{group, job}` record parked in a delay bucket until its fire time.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DelayEnvelope {
    pub group: String,
    pub job: JobPayload,
}

/// One record in the success or failure log.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogEntry {
    pub data: JobPayload,
    pub time: i64,
    #[serde(rename = "return")]
    pub output: serde_json::Value,
}

impl LogEntry {
    pub fn new(data: JobPayload, output: serde_json::Value) -> Self {
        Self {
            data,
            time: chrono::Utc::now().timestamp(),
            output,
        }
    }
}

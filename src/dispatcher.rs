use crate::job::JobPayload;

pub type DispatchError = Box<dyn std::error::Error + Send + Sync>;

/// External command router. The scheduler hands over the decoded payload
/// (with its `cmd` field) and classifies whatever comes back; routing,
/// argument binding and visibility checks are entirely the implementor's
/// concern.
#[async_trait::async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, payload: &JobPayload) -> Result<serde_json::Value, DispatchError>;
}

/// Result classification: `null` and literal `true` count as success,
/// anything else is recorded as a failure.
pub(crate) fn is_success(value: &serde_json::Value) -> bool {
    matches!(value, serde_json::Value::Null | serde_json::Value::Bool(true))
}

#[derive(Debug, thiserror::Error)]
pub enum ForemanError {
    #[error("Redis error: {0}")]
    Redis(#[from] deadpool_redis::redis::RedisError),

    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("Redis pool setup error: {0}")]
    CreatePool(#[from] deadpool_redis::CreatePoolError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Process spawn error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid log kind: {0} (expected success or failed)")]
    InvalidLogKind(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

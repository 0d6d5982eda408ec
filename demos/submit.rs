use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

struct NoopDispatcher;

#[async_trait::async_trait]
impl foreman::Dispatcher for NoopDispatcher {
    async fn dispatch(
        &self,
        _: &foreman::JobPayload,
    ) -> Result<serde_json::Value, foreman::DispatchError> {
        Ok(serde_json::Value::Null)
    }
}

/// Submits one job per lane, then prints the queue view.
#[tokio::main]
async fn main() -> Result<(), foreman::ForemanError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = foreman::Config::from_env()?;
    let scheduler = foreman::Scheduler::new(config, Arc::new(NoopDispatcher))?;
    let producer = scheduler.producer();

    let mut payload = serde_json::Map::new();
    payload.insert("v".to_string(), serde_json::json!(1));

    let queued = producer
        .add("ping", payload.clone(), "main", foreman::Lane::Realtime, 0)
        .await?;
    println!("realtime: {queued:?}");

    let delayed = producer
        .add("ping", payload.clone(), "main", foreman::Lane::Delay, 30)
        .await?;
    println!("delay(30s): {delayed:?}");

    payload.insert("unique_id".to_string(), serde_json::json!("demo"));
    let first = producer
        .add("ping", payload.clone(), "main", foreman::Lane::Unique, 60)
        .await?;
    let second = producer
        .add("ping", payload, "main", foreman::Lane::Unique, 60)
        .await?;
    println!("unique: {first:?}, then {second:?}");

    for queue in scheduler.admin().show_queue().await? {
        let len = scheduler.admin().show_length(&queue).await?;
        println!("{queue}: {len} job(s)");
    }

    Ok(())
}

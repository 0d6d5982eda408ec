use std::sync::Arc;

use testresult::TestResult;

use crate::shared::*;
use foreman::{DelayMaterializer, Lane, LogEntry, Producer, WorkerUnit};

// A delayed submission travels bucket -> realtime lane -> dispatcher ->
// success log once its fire time passes.
#[tokio::test]
async fn test_delayed_job_reaches_the_success_log() -> TestResult {
    let store = setup();
    let keys = layout();
    let producer = Producer::new(store.clone(), keys.clone());
    let materializer = DelayMaterializer::new(store.clone(), keys.clone(), 1000);

    producer
        .add("b", payload(&[("v", serde_json::json!(7))]), "g", Lane::Delay, 1)
        .await?;

    // premature sweep: the bucket is not mature yet
    assert_eq!(materializer.sweep().await?, 0);
    assert_eq!(store.llen(&keys.jobs("g")).await?, 0);

    tokio::time::sleep(std::time::Duration::from_millis(1200)).await;

    assert_eq!(materializer.sweep().await?, 1);
    assert_eq!(store.llen(&keys.jobs("g")).await?, 1);

    let unit = WorkerUnit::new(
        store.clone(),
        keys.clone(),
        Arc::new(StaticDispatcher(serde_json::Value::Bool(true))),
        &config(),
    );
    unit.run().await?;

    let raw = store.lrange(&keys.success(), 0, -1).await?;
    assert_eq!(raw.len(), 1);
    let entry: LogEntry = serde_json::from_str(&raw[0])?;
    assert_eq!(entry.data.cmd, "b");
    assert_eq!(entry.data.rest.get("v"), Some(&serde_json::json!(7)));

    // the delay machinery cleaned up after itself
    let now = chrono::Utc::now().timestamp();
    assert!(store.zrangebyscore(&keys.delay_time(), 0, now).await?.is_empty());
    assert!(store.hgetall(&keys.delay_lock()).await?.is_empty());

    Ok(())
}

// Unique submissions dedup to one enqueue; the consumer sees exactly one
// job even under rapid resubmission.
#[tokio::test]
async fn test_unique_burst_yields_one_execution() -> TestResult {
    let store = setup();
    let keys = layout();
    let producer = Producer::new(store.clone(), keys.clone());

    let job = payload(&[("unique_id", serde_json::json!("x"))]);
    let mut codes = Vec::new();
    for _ in 0..3 {
        codes.push(producer.add("c", job.clone(), "g", Lane::Unique, 10).await?.code());
    }
    assert_eq!(codes, vec![1, -1, -1]);

    let unit = WorkerUnit::new(
        store.clone(),
        keys.clone(),
        Arc::new(StaticDispatcher(serde_json::Value::Bool(true))),
        &config(),
    );
    unit.run().await?;

    assert_eq!(store.llen(&keys.success()).await?, 1);

    Ok(())
}

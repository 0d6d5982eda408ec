use std::sync::Arc;

use testresult::TestResult;

use crate::shared::*;
use foreman::{Admin, JobPayload, Lane, LogEntry, Producer, WorkerUnit};

#[tokio::test]
async fn test_realtime_fifo_into_success_log() -> TestResult {
    let store = setup();
    let keys = layout();
    let producer = Producer::new(store.clone(), keys.clone());

    producer
        .add("a", payload(&[("v", serde_json::json!(1))]), "g", Lane::Realtime, 0)
        .await?;
    producer
        .add("a", payload(&[("v", serde_json::json!(2))]), "g", Lane::Realtime, 0)
        .await?;

    let unit = WorkerUnit::new(
        store.clone(),
        keys.clone(),
        Arc::new(StaticDispatcher(serde_json::Value::Bool(true))),
        &config(),
    );
    let worker_key = keys.worker(unit.id());
    unit.run().await?;

    let raw = store.lrange(&keys.success(), 0, -1).await?;
    assert_eq!(raw.len(), 2);

    // BRPOP consumes the tail, LPUSH prepends the log: newest first
    let newest: LogEntry = serde_json::from_str(&raw[0])?;
    let oldest: LogEntry = serde_json::from_str(&raw[1])?;
    assert_eq!(oldest.data.rest.get("v"), Some(&serde_json::json!(1)));
    assert_eq!(newest.data.rest.get("v"), Some(&serde_json::json!(2)));
    assert_eq!(oldest.output, serde_json::Value::Bool(true));

    // drained group was pruned from the listen set
    assert!(store.smembers(&keys.listen()).await?.is_empty());

    // teardown removed the enrollment
    assert!(!store.exists(&worker_key).await?);
    assert!(store.hgetall(&keys.watch()).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_success_log_is_trimmed() -> TestResult {
    let store = setup();
    let keys = layout();
    let producer = Producer::new(store.clone(), keys.clone());

    for v in 0..3 {
        producer
            .add("a", payload(&[("v", serde_json::json!(v))]), "g", Lane::Realtime, 0)
            .await?;
    }

    let unit = WorkerUnit::new(
        store.clone(),
        keys.clone(),
        Arc::new(StaticDispatcher(serde_json::Value::Null)),
        &config().max_hist(2),
    );
    unit.run().await?;

    assert_eq!(store.llen(&keys.success()).await?, 2);

    Ok(())
}

#[tokio::test]
async fn test_handler_error_lands_in_failure_log() -> TestResult {
    let store = setup();
    let keys = layout();
    let producer = Producer::new(store.clone(), keys.clone());

    producer
        .add("fail", payload(&[]), "g", Lane::Realtime, 0)
        .await?;

    let unit = WorkerUnit::new(
        store.clone(),
        keys.clone(),
        Arc::new(FailingDispatcher("boom")),
        &config(),
    );
    unit.run().await?;

    assert_eq!(store.llen(&keys.success()).await?, 0);

    let raw = store.lrange(&keys.failed(), 0, -1).await?;
    assert_eq!(raw.len(), 1);
    let entry: LogEntry = serde_json::from_str(&raw[0])?;
    assert_eq!(entry.data.cmd, "fail");
    assert_eq!(entry.output, serde_json::json!("boom"));

    Ok(())
}

#[tokio::test]
async fn test_non_true_result_is_a_failure() -> TestResult {
    let store = setup();
    let keys = layout();
    let producer = Producer::new(store.clone(), keys.clone());

    producer
        .add("partial", payload(&[]), "g", Lane::Realtime, 0)
        .await?;

    let unit = WorkerUnit::new(
        store.clone(),
        keys.clone(),
        Arc::new(StaticDispatcher(serde_json::json!({"ok": false}))),
        &config(),
    );
    unit.run().await?;

    assert_eq!(store.llen(&keys.success()).await?, 0);
    let raw = store.lrange(&keys.failed(), 0, -1).await?;
    let entry: LogEntry = serde_json::from_str(&raw[0])?;
    assert_eq!(entry.output, serde_json::json!({"ok": false}));

    Ok(())
}

#[tokio::test]
async fn test_panicking_handler_is_contained() -> TestResult {
    let store = setup();
    let keys = layout();
    let producer = Producer::new(store.clone(), keys.clone());

    producer.add("x", payload(&[]), "g", Lane::Realtime, 0).await?;
    producer.add("y", payload(&[]), "g", Lane::Realtime, 0).await?;

    let unit = WorkerUnit::new(
        store.clone(),
        keys.clone(),
        Arc::new(PanickingDispatcher),
        &config(),
    );
    unit.run().await?;

    // both jobs were attempted; the unit survived each panic
    let raw = store.lrange(&keys.failed(), 0, -1).await?;
    assert_eq!(raw.len(), 2);
    let entry: LogEntry = serde_json::from_str(&raw[0])?;
    assert!(
        entry
            .output
            .as_str()
            .is_some_and(|msg| msg.contains("handler blew up"))
    );

    // teardown still ran
    assert!(store.hgetall(&keys.watch()).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_evicted_unit_stops_and_deregisters() -> TestResult {
    let store = setup();
    let keys = layout();
    let producer = Producer::new(store.clone(), keys.clone());

    for v in 0..10 {
        producer
            .add("slow", payload(&[("v", serde_json::json!(v))]), "g", Lane::Realtime, 0)
            .await?;
    }

    let unit = WorkerUnit::new(
        store.clone(),
        keys.clone(),
        Arc::new(SlowDispatcher(300)),
        &config(),
    );
    let worker_key = keys.worker(unit.id());
    let handle = tokio::spawn(async move { unit.run().await });

    tokio::time::sleep(std::time::Duration::from_millis(450)).await;
    store.del(&worker_key).await?;

    handle.await??;

    // the unit exited early, leaving work behind
    assert!(store.llen(&keys.jobs("g")).await? > 0);
    assert!(store.llen(&keys.success()).await? < 10);
    assert!(store.hgetall(&keys.watch()).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_failed_job_rollback_round_trip() -> TestResult {
    let store = setup();
    let keys = layout();
    let producer = Producer::new(store.clone(), keys.clone());
    let admin = Admin::new(store.clone(), keys.clone());

    producer
        .add("fail", payload(&[("n", serde_json::json!(9))]), "g", Lane::Realtime, 0)
        .await?;

    let unit = WorkerUnit::new(
        store.clone(),
        keys.clone(),
        Arc::new(FailingDispatcher("boom")),
        &config(),
    );
    unit.run().await?;

    let raw = store.lrange(&keys.failed(), 0, -1).await?;
    assert_eq!(raw.len(), 1);

    assert_eq!(admin.rollback(&raw[0]).await?, 1);

    assert_eq!(store.llen(&keys.failed()).await?, 0);
    let requeued = store.rpop(&keys.jobs("rollback")).await?.unwrap();
    let job: JobPayload = serde_json::from_str(&requeued)?;
    assert_eq!(job.cmd, "fail");
    assert_eq!(job.rest.get("n"), Some(&serde_json::json!(9)));

    Ok(())
}

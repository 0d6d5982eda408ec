use std::sync::Arc;

use testresult::TestResult;

use crate::shared::*;
use foreman::{Lane, Master, MasterOutcome, Producer};

#[tokio::test]
async fn test_host_lock_admits_one_master() -> TestResult {
    let store = setup();
    let keys = layout();
    let spawner = Arc::new(RecordingSpawn::default());

    let first = Master::new(store.clone(), keys.clone(), config(), spawner.clone());
    let cancel = first.cancel_token();
    let handle = tokio::spawn(async move { first.run().await });

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    // the lock is taken; a competing master backs off immediately
    let second = Master::new(store.clone(), keys.clone(), config(), spawner.clone());
    assert_eq!(second.run().await?, MasterOutcome::AlreadyRunning);

    cancel.cancel();
    assert_eq!(handle.await??, MasterOutcome::Stopped);

    // teardown emptied the watch hash and dropped the lock
    assert!(store.hgetall(&keys.watch()).await?.is_empty());
    assert!(!store.exists(&keys.master()).await?);

    // every iteration fed the delay materializer
    assert!(spawner.spawned("delay") >= 1);

    Ok(())
}

#[tokio::test]
async fn test_master_probe_scales_and_keeps_the_job() -> TestResult {
    let store = setup();
    let keys = layout();
    let producer = Producer::new(store.clone(), keys.clone());
    let spawner = Arc::new(RecordingSpawn::default());

    producer
        .add("a", payload(&[("v", serde_json::json!(1))]), "g", Lane::Realtime, 0)
        .await?;

    let master = Master::new(store.clone(), keys.clone(), config(), spawner.clone());
    let cancel = master.cancel_token();
    let handle = tokio::spawn(async move { master.run().await });

    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    cancel.cancel();
    assert_eq!(handle.await??, MasterOutcome::Stopped);

    // the probe returned the job it popped
    assert_eq!(store.llen(&keys.jobs("g")).await?, 1);

    // a one-job backlog warrants exactly one realtime unit per pass
    assert!(spawner.spawned("realtime") >= 1);
    let realtime_argv: Vec<Vec<String>> = spawner
        .calls()
        .into_iter()
        .filter(|argv| argv.iter().any(|arg| arg == "realtime"))
        .collect();
    assert_eq!(
        realtime_argv[0],
        vec![
            "unit".to_string(),
            "--type".to_string(),
            "realtime".to_string(),
            "--name".to_string(),
            keys.queue_name().to_string(),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_master_parks_while_another_unit_is_live() -> TestResult {
    let store = setup();
    let keys = layout();
    let producer = Producer::new(store.clone(), keys.clone());
    let spawner = Arc::new(RecordingSpawn::default());

    // a live foreign unit on this host
    let foreign = keys.worker("feedf00d");
    store.set_ex(&foreign, "", 60).await?;
    store.hset(&keys.watch(), &foreign, "100").await?;

    producer.add("a", payload(&[]), "g", Lane::Realtime, 0).await?;

    let master = Master::new(store.clone(), keys.clone(), config(), spawner.clone());
    let cancel = master.cancel_token();
    let handle = tokio::spawn(async move { master.run().await });

    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    cancel.cancel();
    handle.await??;

    // parked: no realtime scaling, job untouched
    assert_eq!(spawner.spawned("realtime"), 0);
    assert_eq!(store.llen(&keys.jobs("g")).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_master_exits_when_lock_is_stolen() -> TestResult {
    let store = setup();
    let keys = layout();
    let spawner = Arc::new(RecordingSpawn::default());

    let master = Master::new(store.clone(), keys.clone(), config(), spawner.clone());
    let handle = tokio::spawn(async move { master.run().await });

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    // an eviction elsewhere rewrites the lock; the loop must notice
    store.set_ex(&keys.master(), "someone-else", 60).await?;

    // the next iteration fails its validity check (within WAIT_IDLE)
    let outcome = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await???;
    assert_eq!(outcome, MasterOutcome::Stopped);

    Ok(())
}

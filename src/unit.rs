use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use rand::Rng;

use crate::config::{Config, WAIT_SCAN, idle_time};
use crate::dispatcher::{Dispatcher, is_success};
use crate::error::ForemanError;
use crate::job::{JobPayload, LogEntry};
use crate::keys::KeyLayout;
use crate::store::Store;

/// The two unit flavors the master spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum UnitKind {
    Delay,
    Realtime,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Delay => "delay",
            UnitKind::Realtime => "realtime",
        }
    }
}

/// The "realtime" unit flavor: a short-lived consumer that pops a bounded
/// batch off the listen set and runs each job through the dispatcher.
pub struct WorkerUnit {
    store: Store,
    keys: KeyLayout,
    dispatcher: Arc<dyn Dispatcher>,
    max_exec: u32,
    max_hist: u32,
    unit_id: String,
}

impl WorkerUnit {
    pub fn new(
        store: Store,
        keys: KeyLayout,
        dispatcher: Arc<dyn Dispatcher>,
        config: &Config,
    ) -> Self {
        let unit_id = format!("{:08x}", rand::rng().random::<u32>());
        Self {
            store,
            keys,
            dispatcher,
            max_exec: config.max_exec,
            max_hist: config.max_hist,
            unit_id,
        }
    }

    /// Random per-process hash identifying this unit's liveness key.
    pub fn id(&self) -> &str {
        &self.unit_id
    }

    /// Enrolls, consumes up to `max_exec` jobs, and tears the enrollment
    /// down again on every exit path, panics included.
    pub async fn run(&self) -> Result<(), ForemanError> {
        self.enroll().await?;

        let result = AssertUnwindSafe(self.work_loop()).catch_unwind().await;
        self.teardown().await;

        match result {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn enroll(&self) -> Result<(), ForemanError> {
        let worker_key = self.keys.worker(&self.unit_id);
        let now = chrono::Utc::now().timestamp();

        self.store.set_ex(&worker_key, "", WAIT_SCAN as u64).await?;
        self.store
            .hset(&self.keys.watch(), &worker_key, &now.to_string())
            .await?;

        tracing::info!(unit = self.unit_id, "Unit enrolled");
        Ok(())
    }

    async fn work_loop(&self) -> Result<(), ForemanError> {
        let worker_key = self.keys.worker(&self.unit_id);

        for _ in 0..self.max_exec {
            // refresh doubles as the liveness check: a deleted or expired
            // worker string ends the unit after its current job
            if !self.store.expire(&worker_key, WAIT_SCAN).await? {
                tracing::info!(unit = self.unit_id, "Unit evicted, exiting");
                break;
            }

            let Some(candidate) = self.store.srandmember(&self.keys.listen()).await? else {
                break;
            };

            let Some((_, raw)) = get_job(&self.store, &self.keys, &candidate, idle_time()).await?
            else {
                continue;
            };

            self.exec_job(&raw).await?;
        }

        Ok(())
    }

    /// Dispatches one raw payload and records the outcome. Handler errors
    /// and panics land in the failure log; only Redis errors propagate.
    async fn exec_job(&self, raw: &str) -> Result<(), ForemanError> {
        let payload: JobPayload = match serde_json::from_str(raw) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, "Skipping undecodable job payload");
                return Ok(());
            }
        };

        tracing::info!(unit = self.unit_id, cmd = payload.cmd, "Job started");
        let start = std::time::Instant::now();

        let outcome = match AssertUnwindSafe(self.dispatcher.dispatch(&payload))
            .catch_unwind()
            .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(err.to_string()),
            Err(panic) => {
                let panic_msg = if let Some(s) = panic.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic occurred".to_string()
                };
                Err(panic_msg)
            }
        };

        let success = matches!(&outcome, Ok(value) if is_success(value));
        tracing::info!(
            unit = self.unit_id,
            cmd = payload.cmd,
            success,
            duration = start.elapsed().as_millis(),
            "Job finished"
        );

        let output = match outcome {
            Ok(value) => value,
            Err(message) => serde_json::Value::String(message),
        };
        let entry = serde_json::to_string(&LogEntry::new(payload, output))?;

        if success {
            self.store.lpush(&self.keys.success(), &entry).await?;
            self.store
                .ltrim(&self.keys.success(), 0, self.max_hist as i64 - 1)
                .await?;
        } else {
            self.store.lpush(&self.keys.failed(), &entry).await?;
        }

        Ok(())
    }

    async fn teardown(&self) {
        let worker_key = self.keys.worker(&self.unit_id);

        if let Err(err) = self.store.del(&worker_key).await {
            tracing::error!(unit = self.unit_id, error = %err, "Failed to drop worker key");
        }
        if let Err(err) = self.store.hdel(&self.keys.watch(), &worker_key).await {
            tracing::error!(unit = self.unit_id, error = %err, "Failed to drop watch entry");
        }

        tracing::info!(unit = self.unit_id, "Unit torn down");
    }
}

/// Shared consumer probe. The LLEN gate keeps BRPOP from parking on a list
/// that is already empty; a miss prunes the listen entry, which is only
/// re-added by the next producer push.
pub(crate) async fn get_job(
    store: &Store,
    keys: &KeyLayout,
    list_key: &str,
    idle: f64,
) -> Result<Option<(String, String)>, ForemanError> {
    if store.llen(list_key).await? > 0 {
        if let Some(hit) = store.brpop(list_key, idle).await? {
            return Ok(Some(hit));
        }
    }

    store.srem(&keys.listen(), list_key).await?;
    Ok(None)
}

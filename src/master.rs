use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::admin::compact_watch;
use crate::config::{Config, WAIT_IDLE, WAIT_SCAN, idle_time};
use crate::error::ForemanError;
use crate::keys::KeyLayout;
use crate::spawn::Spawn;
use crate::store::Store;
use crate::unit::{UnitKind, get_job};

/// How a master run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterOutcome {
    /// Another master on this host already holds the lock; nothing was
    /// started. A clean exit, not an error.
    AlreadyRunning,
    /// The loop ran and ended (lock lost, evicted, or cancelled) and every
    /// worker on this host was killed on the way out.
    Stopped,
}

/// The supervising process: holds the per-host lock, keeps the delay
/// materializer fed, and scales realtime units against the backlog.
pub struct Master {
    store: Store,
    keys: KeyLayout,
    config: Config,
    spawner: Arc<dyn Spawn>,
    cancel_token: CancellationToken,
    master_hash: String,
}

impl Master {
    pub fn new(store: Store, keys: KeyLayout, config: Config, spawner: Arc<dyn Spawn>) -> Self {
        Self {
            store,
            keys,
            config,
            spawner,
            cancel_token: CancellationToken::new(),
            master_hash: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Token that ends the supervision loop; wire it to the process signal
    /// handler.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Takes the host lock and supervises until liveness fails or the
    /// token fires. Teardown kills every worker on this host on all exit
    /// paths, panics included.
    pub async fn run(&self) -> Result<MasterOutcome, ForemanError> {
        let master_key = self.keys.master();

        if !self.store.set_nx(&master_key, &self.master_hash).await? {
            tracing::warn!(host = self.keys.host(), "Master lock already held");
            return Ok(MasterOutcome::AlreadyRunning);
        }
        self.store.expire(&master_key, WAIT_SCAN).await?;
        let now = chrono::Utc::now().timestamp();
        self.store
            .hset(&self.keys.watch(), &master_key, &now.to_string())
            .await?;

        tracing::info!(
            host = self.keys.host(),
            queue = self.keys.queue_name(),
            "Master loop started"
        );

        let result = AssertUnwindSafe(self.supervise()).catch_unwind().await;
        self.kill_all().await;

        match result {
            Ok(result) => result.map(|()| MasterOutcome::Stopped),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn supervise(&self) -> Result<(), ForemanError> {
        let master_key = self.keys.master();

        loop {
            if self.cancel_token.is_cancelled() {
                tracing::info!("Master cancelled");
                return Ok(());
            }

            // one materializer pass per iteration keeps mature delay
            // buckets flowing even while realtime lanes are busy
            if let Err(err) = self.spawn_unit(UnitKind::Delay) {
                tracing::error!(error = %err, "Failed to spawn delay unit");
            }

            let valid = self.store.get(&master_key).await?.as_deref()
                == Some(self.master_hash.as_str());
            let running = self.store.expire(&master_key, WAIT_SCAN).await?;
            if !valid || !running {
                tracing::info!("Master lost its lock, exiting");
                return Ok(());
            }

            match self.tick().await {
                Ok(true) => self.idle_sleep().await,
                Ok(false) => {}
                Err(err) => {
                    // abort this iteration only; a persistent Redis outage
                    // ends the loop through the expire refresh above
                    tracing::error!(error = %err, "Master iteration failed");
                    self.idle_sleep().await;
                }
            }
        }
    }

    /// One supervision pass. Returns `true` when there is nothing to do
    /// and the master should idle.
    async fn tick(&self) -> Result<bool, ForemanError> {
        let Some(candidate) = self.store.srandmember(&self.keys.listen()).await? else {
            return Ok(true);
        };

        // more than one live entry means some unit is already working;
        // stay parked
        let live = compact_watch(&self.store, &self.keys.watch()).await?;
        if live.len() > 1 {
            return Ok(true);
        }

        let Some((key, payload)) =
            get_job(&self.store, &self.keys, &candidate, idle_time()).await?
        else {
            return Ok(true);
        };

        // the probe consumed a real job; return it before scaling
        self.store.lpush(&key, &payload).await?;

        let runs = live.len() as u32;
        let backlog = self.total_backlog().await?;
        let target = spawn_target(runs, self.config.max_fork, backlog, self.config.max_exec);

        for _ in 0..target {
            self.spawn_unit(UnitKind::Realtime)?;
        }
        if target > 0 {
            tracing::info!(spawned = target, backlog, "Scaled realtime units");
        }

        Ok(false)
    }

    async fn total_backlog(&self) -> Result<i64, ForemanError> {
        let mut total = 0;
        for list_key in self.store.smembers(&self.keys.listen()).await? {
            total += self.store.llen(&list_key).await?;
        }
        Ok(total)
    }

    fn spawn_unit(&self, kind: UnitKind) -> Result<(), ForemanError> {
        let argv = vec![
            "unit".to_string(),
            "--type".to_string(),
            kind.as_str().to_string(),
            "--name".to_string(),
            self.keys.queue_name().to_string(),
        ];
        self.spawner.spawn_detached(&argv)
    }

    /// Deletes every worker key enrolled on this host and empties the
    /// watch hash (the master's own lock entry included).
    async fn kill_all(&self) {
        match self.store.hkeys(&self.keys.watch()).await {
            Ok(fields) => {
                if let Err(err) = self.store.del_many(&fields).await {
                    tracing::error!(error = %err, "Failed to delete worker keys");
                }
                if let Err(err) = self.store.hdel_many(&self.keys.watch(), &fields).await {
                    tracing::error!(error = %err, "Failed to empty watch hash");
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to enumerate watch hash");
            }
        }

        tracing::info!(host = self.keys.host(), "Master teardown complete");
    }

    async fn idle_sleep(&self) {
        tokio::select! {
            () = self.cancel_token.cancelled() => {}
            () = tokio::time::sleep(std::time::Duration::from_secs(WAIT_IDLE)) => {}
        }
    }
}

/// Bounded autoscaling: never exceed `max_fork` concurrent units, never
/// spawn more than the backlog warrants at `max_exec` jobs per unit.
pub(crate) fn spawn_target(runs: u32, max_fork: u32, backlog: i64, max_exec: u32) -> u32 {
    let left = i64::from(max_fork) - i64::from(runs) + 1;
    if left <= 0 {
        return 0;
    }

    let per_unit = i64::from(max_exec.max(1));
    let need = (backlog + per_unit - 1) / per_unit - i64::from(runs) + 1;

    left.min(need).max(0) as u32
}

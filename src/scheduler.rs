use std::sync::Arc;

use crate::admin::Admin;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::ForemanError;
use crate::keys::KeyLayout;
use crate::master::Master;
use crate::materializer::DelayMaterializer;
use crate::producer::Producer;
use crate::spawn::{OsSpawn, Spawn};
use crate::store::Store;
use crate::unit::WorkerUnit;

/// Root handle tying one configuration, one Redis store and one dispatcher
/// together. Components built from it share the store; `set_name` clones
/// the handle into a fresh key namespace.
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = foreman::Scheduler::new(config, dispatcher)?;
/// scheduler
///     .producer()
///     .add("ping", payload, "main", foreman::Lane::Realtime, 0)
///     .await?;
/// ```
#[derive(Clone)]
pub struct Scheduler {
    store: Store,
    keys: KeyLayout,
    config: Config,
    dispatcher: Arc<dyn Dispatcher>,
}

impl Scheduler {
    /// Connects to Redis and builds the handle for `config.queue_name` on
    /// this host.
    pub fn new(config: Config, dispatcher: Arc<dyn Dispatcher>) -> Result<Self, ForemanError> {
        let store = Store::connect(&config.redis_url)?;
        Ok(Self::from_store(store, config, dispatcher))
    }

    /// Builds the handle over an existing store.
    pub fn from_store(store: Store, config: Config, dispatcher: Arc<dyn Dispatcher>) -> Self {
        let host = gethostname::gethostname().to_string_lossy().to_string();
        let keys = KeyLayout::new(config.queue_name.as_str(), host);
        Self {
            store,
            keys,
            config,
            dispatcher,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn keys(&self) -> &KeyLayout {
        &self.keys
    }

    pub fn producer(&self) -> Producer {
        Producer::new(self.store.clone(), self.keys.clone())
    }

    pub fn admin(&self) -> Admin {
        Admin::new(self.store.clone(), self.keys.clone())
    }

    pub fn materializer(&self) -> DelayMaterializer {
        DelayMaterializer::new(self.store.clone(), self.keys.clone(), self.config.max_exec)
    }

    pub fn unit(&self) -> WorkerUnit {
        WorkerUnit::new(
            self.store.clone(),
            self.keys.clone(),
            Arc::clone(&self.dispatcher),
            &self.config,
        )
    }

    /// The master for this host, spawning units through the configured
    /// binary.
    pub fn master(&self) -> Master {
        self.master_with(Arc::new(OsSpawn::new(self.config.binary.clone())))
    }

    pub fn master_with(&self, spawner: Arc<dyn Spawn>) -> Master {
        Master::new(
            self.store.clone(),
            self.keys.clone(),
            self.config.clone(),
            spawner,
        )
    }

    /// A handle on the same store and dispatcher under a fresh key
    /// namespace; the original is untouched.
    pub fn set_name(&self, name: &str) -> Scheduler {
        Scheduler {
            store: self.store.clone(),
            keys: KeyLayout::new(name, self.keys.host()),
            config: self.config.clone().queue_name(name),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

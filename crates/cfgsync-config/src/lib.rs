//! # cfgsync-config
//!
//! Startup configuration for a process. A locator (`--config`) is resolved to
//! a local file or a remote etcd key; the document is decoded and merged with
//! defaults, prefixed environment variables and explicit overrides, in that
//! precedence order; a background watcher then keeps the snapshot current.
//!
//! ```no_run
//! # async fn run() -> cfgsync_core::Result<()> {
//! let config = cfgsync_config::init(cfgsync_config::InitOptions::new("APP", "config")).await?;
//! let port = config.store.snapshot().get_i64("server.port").unwrap_or(8080);
//! # let _ = port;
//! config.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod decode;
pub mod layers;
pub mod locator;
pub mod mock;
pub mod remote;
pub mod snapshot;
pub mod store;
pub mod watcher;

pub use layers::{EnvSource, Layers};
pub use locator::{RemoteDescriptor, SearchPaths, Source, locate, resolve, resolve_with};
pub use remote::{EtcdProvider, RemoteProvider};
pub use snapshot::Snapshot;
pub use store::{ConfigHandle, ConfigStore};
pub use watcher::{DEFAULT_POLL_INTERVAL, WatchState, WatcherHandle};

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use cfgsync_core::Result;

/// Everything [`init`] needs to find, load and watch the configuration.
pub struct InitOptions {
    /// `--config` value: a path or `provider+protocol://host/path.ext`.
    pub locator: Option<String>,
    /// `--isRemoteConfig`: refuse to treat the locator as a local path.
    pub force_remote: bool,
    pub env_prefix: String,
    /// File stem searched for when no locator is given.
    pub cfg_name: String,
    /// Directories searched when no locator is given.
    pub search_paths: SearchPaths,
    pub defaults: Vec<(String, Value)>,
    pub overrides: Vec<(String, Value)>,
    pub env: EnvSource,
    pub poll_interval: Duration,
    /// Start a watcher after the initial load.
    pub watch: bool,
    /// Replaces the provider the locator names.
    pub remote_provider: Option<Arc<dyn RemoteProvider>>,
}

impl InitOptions {
    pub fn new(env_prefix: impl Into<String>, cfg_name: impl Into<String>) -> Self {
        let cfg_name = cfg_name.into();
        Self {
            locator: None,
            force_remote: false,
            env_prefix: env_prefix.into(),
            search_paths: SearchPaths::for_app(&cfg_name),
            cfg_name,
            defaults: Vec::new(),
            overrides: Vec::new(),
            env: EnvSource::Process,
            poll_interval: DEFAULT_POLL_INTERVAL,
            watch: true,
            remote_provider: None,
        }
    }

    pub fn locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }
}

/// A loaded store plus the watcher keeping it fresh.
pub struct Config {
    pub store: ConfigStore,
    pub watcher: Option<WatcherHandle>,
}

impl Config {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get(key)
    }

    pub fn handle(&self) -> ConfigHandle {
        self.store.handle()
    }

    /// Stop the watcher, if any, and wait for it.
    pub async fn shutdown(self) {
        if let Some(watcher) = self.watcher {
            watcher.shutdown().await;
        }
    }
}

/// Resolve, load and (optionally) start watching.
///
/// Every failure is returned; deciding whether to exit is left to the caller.
pub async fn init(options: InitOptions) -> Result<Config> {
    let source = locate(
        options.locator.as_deref(),
        options.force_remote,
        &options.cfg_name,
        &options.search_paths,
    )?;

    let mut layers = Layers::new(options.env_prefix);
    layers.set_env_source(options.env);
    for (key, value) in options.defaults {
        layers.set_default(&key, value);
    }
    for (key, value) in options.overrides {
        layers.set_override(&key, value);
    }

    let mut builder = ConfigStore::builder(source).layers(layers);
    if let Some(provider) = options.remote_provider {
        builder = builder.remote_provider(provider);
    }
    let store = builder.load().await?;

    let watcher = if options.watch {
        Some(watcher::spawn(store.clone(), options.poll_interval)?)
    } else {
        None
    };

    Ok(Config { store, watcher })
}

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::decode::decode;
use crate::layers::{EnvSource, Layers};
use crate::locator::Source;
use crate::remote::{RemoteProvider, provider_for};
use crate::snapshot::Snapshot;
use cfgsync_core::{CfgError, Result};

/// Owns the source, the precedence layers and the current snapshot.
///
/// Cloning is cheap; all clones share the same snapshot cell.
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    source: Source,
    layers: Layers,
    remote: Option<Arc<dyn RemoteProvider>>,
    current: Arc<RwLock<Arc<Snapshot>>>,
    changes: watch::Sender<u64>,
}

/// Read-only view handed to consumers.
#[derive(Clone)]
pub struct ConfigHandle {
    current: Arc<RwLock<Arc<Snapshot>>>,
    changes: watch::Receiver<u64>,
}

impl ConfigHandle {
    /// The snapshot in effect right now.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.current.read().get(key).cloned()
    }

    /// Receiver yielding the generation of every applied snapshot.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.changes.clone()
    }
}

/// Builder for [`ConfigStore`]; `load` performs the initial synchronous read.
pub struct ConfigStoreBuilder {
    source: Source,
    layers: Layers,
    remote: Option<Arc<dyn RemoteProvider>>,
}

impl ConfigStoreBuilder {
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.layers.env_prefix = prefix.into();
        self
    }

    pub fn env_source(mut self, env: EnvSource) -> Self {
        self.layers.set_env_source(env);
        self
    }

    pub fn default_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.layers.set_default(key, value.into());
        self
    }

    pub fn defaults_from<T: Serialize>(mut self, defaults: &T) -> Result<Self> {
        self.layers.set_defaults_from(defaults)?;
        Ok(self)
    }

    pub fn override_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.layers.set_override(key, value.into());
        self
    }

    pub fn layers(mut self, layers: Layers) -> Self {
        self.layers = layers;
        self
    }

    /// Use `provider` for remote sources instead of the one the locator names.
    pub fn remote_provider(mut self, provider: Arc<dyn RemoteProvider>) -> Self {
        self.remote = Some(provider);
        self
    }

    pub async fn load(self) -> Result<ConfigStore> {
        let remote = match (&self.source, self.remote) {
            (Source::Remote(desc), None) => Some(provider_for(desc)?),
            (_, remote) => remote,
        };

        let snapshot = fetch_and_merge(&self.source, &self.layers, remote.as_deref()).await?;
        match &self.source {
            Source::Local { path } => {
                info!(path = %path.display(), keys = snapshot.len(), "using configuration file")
            }
            Source::Remote(desc) => {
                info!(source = %desc, keys = snapshot.len(), "using remote configuration")
            }
        }

        let (changes, _) = watch::channel(snapshot.generation());
        Ok(ConfigStore {
            inner: Arc::new(StoreInner {
                source: self.source,
                layers: self.layers,
                remote,
                current: Arc::new(RwLock::new(Arc::new(snapshot))),
                changes,
            }),
        })
    }
}

impl ConfigStore {
    pub fn builder(source: Source) -> ConfigStoreBuilder {
        ConfigStoreBuilder {
            source,
            layers: Layers::default(),
            remote: None,
        }
    }

    pub fn source(&self) -> &Source {
        &self.inner.source
    }

    pub fn layers(&self) -> &Layers {
        &self.inner.layers
    }

    /// The snapshot in effect right now.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.current.read())
    }

    /// Value for `key` in the current snapshot; `None` when absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.current.read().get(key).cloned()
    }

    pub fn handle(&self) -> ConfigHandle {
        ConfigHandle {
            current: Arc::clone(&self.inner.current),
            changes: self.inner.changes.subscribe(),
        }
    }

    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Read and merge the source without touching the current snapshot.
    pub async fn load_snapshot(&self) -> Result<Snapshot> {
        fetch_and_merge(
            &self.inner.source,
            &self.inner.layers,
            self.inner.remote.as_deref(),
        )
        .await
    }

    /// Install `snapshot` as current. The lock is held only for the swap.
    pub fn apply(&self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        let applied = {
            let mut current = self.inner.current.write();
            snapshot.set_generation(current.generation() + 1);
            let applied = Arc::new(snapshot);
            *current = Arc::clone(&applied);
            applied
        };
        self.inner.changes.send_replace(applied.generation());
        debug!(generation = applied.generation(), "snapshot applied");
        applied
    }

    /// Re-read the source and swap in the result. On error the current
    /// snapshot is left untouched.
    pub async fn reload(&self) -> Result<Arc<Snapshot>> {
        let snapshot = self.load_snapshot().await?;
        Ok(self.apply(snapshot))
    }
}

async fn fetch_and_merge(
    source: &Source,
    layers: &Layers,
    remote: Option<&dyn RemoteProvider>,
) -> Result<Snapshot> {
    let raw = match source {
        Source::Local { path } => tokio::fs::read(path)
            .await
            .map_err(|e| CfgError::unreadable(path.display().to_string(), e))?,
        Source::Remote(desc) => {
            let provider = remote.ok_or_else(|| {
                CfgError::unreadable(desc.to_string(), "no remote provider configured")
            })?;
            provider.fetch(desc).await?
        }
    };

    let content = decode(source.format()?, &raw)?;
    let merged = layers.merge(content);
    Ok(Snapshot::new(merged, source.to_string(), source.kind()))
}

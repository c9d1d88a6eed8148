// Copyright 2025 tinycache Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    fmt::Debug,
    sync::{Arc, OnceLock},
};

use mixtrics::{metrics::BoxedRegistry, registry::noop::NoopMetricsRegistry};
use tinycache_common::{
    error::{Error, ErrorKind, Result},
    event::EventListener,
};
use tinycache_memory::{Cache, CacheBuilder, CachedValue, EvictionConfig};

use crate::{
    metrics::GroupMetrics,
    peer::{FetchRequest, PeerFetcher, PeerPicker},
    singleflight::SingleFlight,
};

/// Loads the value of a key from the backing store on a cache miss.
pub type DataSource = Arc<dyn Fn(&str) -> anyhow::Result<Vec<u8>> + Send + Sync + 'static>;

/// A named cache namespace.
///
/// A group serves [`Group::get`] from its local cache first. On a miss, concurrent lookups of one key are coalesced
/// into one load, which asks the owning remote peer first and falls back to the data source.
pub struct Group {
    name: String,
    source: DataSource,
    cache: Cache<CachedValue>,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    loader: SingleFlight<CachedValue>,
    metrics: GroupMetrics,

    cache_peer_values: bool,
}

impl Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("cache", &self.cache)
            .field("peers_registered", &self.peers.get().is_some())
            .field("cache_peer_values", &self.cache_peer_values)
            .finish()
    }
}

impl Group {
    /// Name of the group.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The local cache of the group.
    pub fn cache(&self) -> &Cache<CachedValue> {
        &self.cache
    }

    /// Counters of the group.
    pub fn metrics(&self) -> &GroupMetrics {
        &self.metrics
    }

    /// Register the peer picker.
    ///
    /// # Panics
    ///
    /// Panics if a peer picker is already registered.
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) {
        if let Err(e) = self.try_register_peers(picker) {
            panic!("{e}");
        }
    }

    /// Register the peer picker, or fail if a peer picker is already registered.
    pub fn try_register_peers(&self, picker: Arc<dyn PeerPicker>) -> Result<()> {
        self.peers.set(picker).map_err(|_| {
            Error::new(
                ErrorKind::DuplicatePeerRegistration,
                "peers can be registered only once",
            )
            .with_context("group", &self.name)
        })
    }

    /// Get the value of the key.
    pub fn get(&self, key: &str) -> Result<CachedValue> {
        if key.is_empty() {
            return Err(Error::key_not_found(key).with_context("group", &self.name));
        }
        self.metrics.get.increase(1);

        if let Ok(value) = self.cache.get(key) {
            self.metrics.hit.increase(1);
            tracing::trace!("[group {}]: hit, key: {key}", self.name);
            return Ok(value);
        }
        self.metrics.miss.increase(1);
        tracing::debug!("[group {}]: miss, key: {key}", self.name);

        let (res, shared) = self.loader.run_shared(key, || self.load(key));
        if shared {
            self.metrics.coalesced.increase(1);
            tracing::debug!("[group {}]: follower received coalesced load, key: {key}", self.name);
        }
        res
    }

    fn load(&self, key: &str) -> Result<CachedValue> {
        self.metrics.load.increase(1);
        tracing::debug!("[group {}]: leader loads, key: {key}", self.name);

        if let Some(peer) = self.peers.get().and_then(|picker| picker.pick_peer(key)) {
            match self.get_from_peer(peer.as_ref(), key) {
                Ok(value) => {
                    self.metrics.peer_load.increase(1);
                    if self.cache_peer_values {
                        self.populate_cache(key, value.clone());
                    }
                    return Ok(value);
                }
                Err(e) => {
                    self.metrics.peer_error.increase(1);
                    tracing::warn!(
                        "[group {}]: fetch from peer failed, fall back to the data source, key: {key}, error: {e}",
                        self.name
                    );
                }
            }
        }

        self.get_locally(key)
    }

    fn get_from_peer(&self, peer: &dyn PeerFetcher, key: &str) -> Result<CachedValue> {
        let request = FetchRequest {
            group: self.name.clone(),
            key: key.to_string(),
        };
        let response = peer.fetch(&request).map_err(|e| {
            Error::new(ErrorKind::RemoteFetch, "fetch from peer failed")
                .with_context("group", &self.name)
                .with_context("key", key)
                .with_source(e)
        })?;
        Ok(CachedValue::from(response.value))
    }

    fn get_locally(&self, key: &str) -> Result<CachedValue> {
        let bytes = (self.source)(key).map_err(|e| {
            self.metrics.local_error.increase(1);
            Error::new(ErrorKind::DataSource, "data source failed")
                .with_context("group", &self.name)
                .with_context("key", key)
                .with_source(e)
        })?;
        self.metrics.local_load.increase(1);

        // The data source hands over ownership, so the buffer cannot be mutated behind the cache.
        let value = CachedValue::from(bytes);
        self.populate_cache(key, value.clone());
        Ok(value)
    }

    fn populate_cache(&self, key: &str, value: CachedValue) {
        tracing::debug!("[group {}]: populate cache, key: {key}, bytes: {}", self.name, value.len());
        self.cache.set(key, value);
    }
}

/// Builder for [`Group`].
pub struct GroupBuilder {
    name: String,
    max_bytes: usize,
    source: DataSource,

    eviction_config: EvictionConfig,
    event_listener: Option<Arc<dyn EventListener<Value = CachedValue>>>,
    cache_peer_values: bool,
    metrics_registry: BoxedRegistry,
}

impl GroupBuilder {
    /// Create a builder with the group name, the byte budget of the local cache and the data source.
    pub fn new<F>(name: impl Into<String>, max_bytes: usize, source: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            max_bytes,
            source: Arc::new(source),
            eviction_config: EvictionConfig::default(),
            event_listener: None,
            cache_peer_values: false,
            metrics_registry: Box::new(NoopMetricsRegistry),
        }
    }

    /// Set eviction algorithm config of the local cache. Lru by default.
    pub fn with_eviction_config(mut self, eviction_config: impl Into<EvictionConfig>) -> Self {
        self.eviction_config = eviction_config.into();
        self
    }

    /// Set the listener of entries leaving the local cache.
    pub fn with_event_listener(mut self, event_listener: Arc<dyn EventListener<Value = CachedValue>>) -> Self {
        self.event_listener = Some(event_listener);
        self
    }

    /// Store values fetched from remote peers in the local cache. Disabled by default.
    pub fn with_cache_peer_values(mut self, cache_peer_values: bool) -> Self {
        self.cache_peer_values = cache_peer_values;
        self
    }

    /// Set metrics registry.
    ///
    /// Default: [`NoopMetricsRegistry`].
    pub fn with_metrics_registry(mut self, registry: BoxedRegistry) -> Self {
        self.metrics_registry = registry;
        self
    }

    /// Build the group.
    pub fn build(self) -> Result<Group> {
        let mut builder = CacheBuilder::new(self.max_bytes).with_eviction_config(self.eviction_config);
        if let Some(event_listener) = self.event_listener {
            builder = builder.with_event_listener(event_listener);
        }
        let cache = builder.build().map_err(|e| e.with_context("group", &self.name))?;
        let metrics = GroupMetrics::new(self.name.clone(), &self.metrics_registry);

        tracing::info!(
            "[group {}]: created, policy: {}, max bytes: {}",
            self.name,
            cache.policy(),
            self.max_bytes
        );

        Ok(Group {
            name: self.name,
            source: self.source,
            cache,
            peers: OnceLock::new(),
            loader: SingleFlight::new(),
            metrics,
            cache_peer_values: self.cache_peer_values,
        })
    }
}

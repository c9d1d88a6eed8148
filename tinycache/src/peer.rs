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

use std::{fmt::Debug, sync::Arc};

use hashbrown::HashMap;
use itertools::Itertools;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tinycache_common::{
    error::{Error, Result},
    hasher::HashFn,
};

use crate::ring::ConsistentHash;

/// Default virtual nodes per peer.
pub const DEFAULT_REPLICAS: usize = 50;

/// Request for a value owned by a remote peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Group name.
    pub group: String,
    /// Key in the group.
    pub key: String,
}

/// Value returned by a remote peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    /// Value bytes.
    pub value: Vec<u8>,
}

/// Fetch capability of one remote peer.
///
/// The transport and the wire encoding belong to the implementor.
pub trait PeerFetcher: Send + Sync + 'static {
    /// Fetch the value of the request from the peer.
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}

/// Chooses the peer owning a key.
pub trait PeerPicker: Send + Sync + 'static {
    /// Return the fetcher of the owning peer.
    ///
    /// Return `None` if the key is owned by the local process or there is no remote peer.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerFetcher>>;
}

struct PeerPoolInner {
    ring: ConsistentHash,
    fetchers: HashMap<String, Arc<dyn PeerFetcher>>,
}

/// A [`PeerPicker`] over a consistent-hash ring of peer ids.
///
/// The local process is always on the ring under its own id and is never picked.
pub struct PeerPool {
    self_id: String,
    replicas: usize,
    hash_fn: Option<HashFn>,

    inner: RwLock<PeerPoolInner>,
}

impl Debug for PeerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerPool")
            .field("self_id", &self.self_id)
            .field("replicas", &self.replicas)
            .field("peers", &self.peers())
            .finish()
    }
}

impl PeerPool {
    /// Create a pool with only the local process on the ring.
    pub fn new(self_id: impl Into<String>) -> Self {
        let mut pool = Self {
            self_id: self_id.into(),
            replicas: DEFAULT_REPLICAS,
            hash_fn: None,
            inner: RwLock::new(PeerPoolInner {
                ring: ConsistentHash::new(DEFAULT_REPLICAS),
                fetchers: HashMap::new(),
            }),
        };
        pool.rebuild();
        pool
    }

    /// Set virtual nodes per peer.
    ///
    /// Fails if `replicas` is zero.
    pub fn with_replicas(mut self, replicas: usize) -> Result<Self> {
        if replicas == 0 {
            return Err(Error::config("replicas must be positive").with_context("peer", &self.self_id));
        }
        self.replicas = replicas;
        self.rebuild();
        Ok(self)
    }

    /// Set the ring hash function. Every process of one cluster must use the same one.
    pub fn with_hash_fn(mut self, hash_fn: HashFn) -> Self {
        self.hash_fn = Some(hash_fn);
        self.rebuild();
        self
    }

    /// Id of the local process.
    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    fn new_ring(&self) -> ConsistentHash {
        match self.hash_fn.as_ref() {
            Some(hash_fn) => ConsistentHash::with_hash_fn(self.replicas, hash_fn.clone()),
            None => ConsistentHash::new(self.replicas),
        }
    }

    fn rebuild(&mut self) {
        let mut ring = self.new_ring();
        let inner = self.inner.get_mut();
        ring.add(
            std::iter::once(self.self_id.as_str())
                .chain(inner.fetchers.keys().map(String::as_str))
                .sorted(),
        );
        inner.ring = ring;
    }

    /// Replace all remote peers.
    pub fn set<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = (S, Arc<dyn PeerFetcher>)>,
        S: Into<String>,
    {
        let fetchers = peers
            .into_iter()
            .map(|(id, fetcher)| (id.into(), fetcher))
            .filter(|(id, _)| id != &self.self_id)
            .collect::<HashMap<_, _>>();

        let mut ring = self.new_ring();
        // Sorted, so every process builds the same ring for the same peer set.
        ring.add(
            std::iter::once(self.self_id.as_str())
                .chain(fetchers.keys().map(String::as_str))
                .sorted(),
        );

        let mut inner = self.inner.write();
        inner.ring = ring;
        inner.fetchers = fetchers;
        tracing::info!("[peer pool {}]: set peers: {:?}", self.self_id, inner.ring.peers());
    }

    /// Add or replace a remote peer.
    pub fn add_peer(&self, id: impl Into<String>, fetcher: Arc<dyn PeerFetcher>) {
        let id = id.into();
        if id == self.self_id {
            tracing::warn!("[peer pool {}]: ignore adding the local process as a remote peer", self.self_id);
            return;
        }

        let mut inner = self.inner.write();
        inner.ring.add([id.as_str()]);
        inner.fetchers.insert(id, fetcher);
    }

    /// Remove a remote peer. Return `true` if it was present.
    pub fn remove_peer(&self, id: &str) -> bool {
        if id == self.self_id {
            return false;
        }

        let mut inner = self.inner.write();
        inner.ring.remove(id);
        inner.fetchers.remove(id).is_some()
    }

    /// Sorted ids on the ring, including the local process.
    pub fn peers(&self) -> Vec<String> {
        self.inner
            .read()
            .ring
            .peers()
            .into_iter()
            .map(str::to_string)
            .collect_vec()
    }
}

impl PeerPicker for PeerPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerFetcher>> {
        let inner = self.inner.read();
        let owner = inner.ring.get(key)?;
        if owner == self.self_id {
            return None;
        }
        tracing::debug!("[peer pool {}]: pick peer {owner} for key {key}", self.self_id);
        inner.fetchers.get(owner).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tinycache_common::error::ErrorKind;

    use super::*;

    #[derive(Debug, Default)]
    struct EchoFetcher {
        id: String,
        calls: AtomicUsize,
    }

    impl EchoFetcher {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl PeerFetcher for EchoFetcher {
        fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if request.key.is_empty() {
                return Err(Error::key_not_found(&request.key));
            }
            Ok(FetchResponse {
                value: self.id.as_bytes().to_vec(),
            })
        }
    }

    fn owner_of(pool: &PeerPool, key: &str) -> Option<String> {
        pool.pick_peer(key).map(|fetcher| {
            let response = fetcher
                .fetch(&FetchRequest {
                    group: "scores".to_string(),
                    key: key.to_string(),
                })
                .unwrap();
            String::from_utf8(response.value).unwrap()
        })
    }

    fn keys() -> Vec<String> {
        (0..2_000).map(|i| format!("key-{i}")).collect_vec()
    }

    #[test_log::test]
    fn test_pool_without_peers_picks_nothing() {
        let pool = PeerPool::new("self");
        assert_eq!(pool.peers(), vec!["self"]);
        for key in keys() {
            assert!(pool.pick_peer(&key).is_none());
        }
    }

    #[test_log::test]
    fn test_pool_never_picks_self() {
        let pool = PeerPool::new("peer-2");
        pool.set(
            ["peer-1", "peer-2", "peer-3"]
                .into_iter()
                .map(|id| (id, EchoFetcher::new(id) as Arc<dyn PeerFetcher>)),
        );
        assert_eq!(pool.peers(), vec!["peer-1", "peer-2", "peer-3"]);

        let mut ring = ConsistentHash::new(DEFAULT_REPLICAS);
        ring.add(["peer-1", "peer-2", "peer-3"]);

        let mut remote = 0;
        for key in keys() {
            let owner = ring.get(&key).unwrap();
            match owner_of(&pool, &key) {
                Some(picked) => {
                    assert_ne!(picked, "peer-2");
                    assert_eq!(picked, owner);
                    remote += 1;
                }
                None => assert_eq!(owner, "peer-2"),
            }
        }
        assert!(remote > 0);
    }

    #[test_log::test]
    fn test_pool_add_and_remove_peer() {
        let pool = PeerPool::new("self").with_replicas(10).unwrap();
        let fetcher = EchoFetcher::new("peer-1");
        pool.add_peer("peer-1", fetcher.clone());
        pool.add_peer("self", EchoFetcher::new("self"));
        assert_eq!(pool.peers(), vec!["peer-1", "self"]);

        let picked = keys().iter().filter(|key| owner_of(&pool, key).is_some()).count();
        assert!(picked > 0);
        assert_eq!(fetcher.calls.load(Ordering::Relaxed), picked);

        assert!(pool.remove_peer("peer-1"));
        assert!(!pool.remove_peer("peer-1"));
        assert!(!pool.remove_peer("self"));
        for key in keys() {
            assert!(pool.pick_peer(&key).is_none());
        }
    }

    #[test]
    fn test_pool_rejects_zero_replicas() {
        let err = PeerPool::new("self").with_replicas(0).unwrap_err();
        assert!(err.is(ErrorKind::Config));

        let pool = PeerPool::new("self").with_replicas(1).unwrap();
        pool.add_peer("peer-1", EchoFetcher::new("peer-1"));
        assert_eq!(pool.inner.read().ring.len(), 2);
    }

    #[test]
    fn test_pool_custom_hash_fn() {
        let pool = PeerPool::new("self").with_hash_fn(Arc::new(|_: &[u8]| 7u32));
        pool.add_peer("peer-1", EchoFetcher::new("peer-1"));
        // Every virtual node collides with the first node of "self".
        assert!(pool.pick_peer("Tom").is_none());
    }

    #[test]
    fn test_fetch_error() {
        let fetcher = EchoFetcher::new("peer-1");
        let err = fetcher
            .fetch(&FetchRequest {
                group: "scores".to_string(),
                key: String::new(),
            })
            .unwrap_err();
        assert!(err.is(ErrorKind::KeyNotFound));
    }

    #[test]
    fn test_request_serde() {
        let request = FetchRequest {
            group: "scores".to_string(),
            key: "Tom".to_string(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"group":"scores","key":"Tom"}"#);
        assert_eq!(serde_json::from_str::<FetchRequest>(&json).unwrap(), request);
    }
}

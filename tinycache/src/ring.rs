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

use std::fmt::Debug;

use hashbrown::{hash_map::Entry, HashMap};
use itertools::Itertools;
use tinycache_common::{
    hasher::{default_hash_fn, HashFn},
    strict_assert_eq,
};

/// Consistent-hash ring mapping keys to peer ids.
///
/// Each peer is placed on the ring as `replicas` virtual nodes named `"{i}{peer}"`. A key is owned by the first
/// virtual node clockwise from the hash of the key.
///
/// When two virtual nodes hash to the same slot, the one added first keeps it.
pub struct ConsistentHash {
    hash_fn: HashFn,
    replicas: usize,

    /// Sorted virtual node hashes.
    ring: Vec<u32>,
    owners: HashMap<u32, String>,
}

impl Debug for ConsistentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsistentHash")
            .field("replicas", &self.replicas)
            .field("virtual_nodes", &self.ring.len())
            .field("peers", &self.peers())
            .finish()
    }
}

impl ConsistentHash {
    /// Create an empty ring with the default hash function.
    pub fn new(replicas: usize) -> Self {
        Self::with_hash_fn(replicas, default_hash_fn())
    }

    /// Create an empty ring with a custom hash function.
    pub fn with_hash_fn(replicas: usize, hash_fn: HashFn) -> Self {
        Self {
            hash_fn,
            replicas,
            ring: vec![],
            owners: HashMap::new(),
        }
    }

    fn virtual_hash(&self, peer: &str, i: usize) -> u32 {
        (self.hash_fn)(format!("{i}{peer}").as_bytes())
    }

    /// Place peers on the ring. Peers already on the ring are skipped.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for peer in peers {
            let peer = peer.as_ref();
            if self.contains(peer) {
                continue;
            }
            for i in 0..self.replicas {
                let hash = self.virtual_hash(peer, i);
                match self.owners.entry(hash) {
                    Entry::Vacant(e) => {
                        e.insert(peer.to_string());
                        self.ring.push(hash);
                    }
                    Entry::Occupied(e) => {
                        tracing::trace!(
                            "[ring]: virtual node collision, peer: {peer}, replica: {i}, owner: {owner}",
                            owner = e.get()
                        );
                    }
                }
            }
        }
        self.ring.sort_unstable();
        strict_assert_eq!(self.ring.len(), self.owners.len());
    }

    /// Peer id owning the key.
    ///
    /// Return `None` if the ring is empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        let hash = (self.hash_fn)(key.as_bytes());
        let idx = self.ring.partition_point(|&h| h < hash);
        // Past the largest hash, wrap around to the first.
        let slot = self.ring.get(idx).or_else(|| self.ring.first())?;
        self.owners.get(slot).map(String::as_str)
    }

    /// Take a peer off the ring.
    ///
    /// Only virtual nodes owned by the peer are removed, so removing an unknown peer is a no-op.
    pub fn remove(&mut self, peer: &str) {
        for i in 0..self.replicas {
            let hash = self.virtual_hash(peer, i);
            if self.owners.get(&hash).is_some_and(|owner| owner == peer) {
                self.owners.remove(&hash);
                if let Ok(idx) = self.ring.binary_search(&hash) {
                    self.ring.remove(idx);
                }
            }
        }
    }

    /// Return `true` if the peer owns at least one virtual node.
    pub fn contains(&self, peer: &str) -> bool {
        self.owners.values().any(|owner| owner == peer)
    }

    /// Sorted ids of the peers on the ring.
    pub fn peers(&self) -> Vec<&str> {
        self.owners.values().map(String::as_str).unique().sorted().collect_vec()
    }

    /// Virtual nodes per peer.
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Count of virtual nodes on the ring.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Return `true` if no peer is on the ring.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use rand::{distr::Alphanumeric, rngs::SmallRng, Rng, SeedableRng};

    use super::*;

    fn decimal_ring(replicas: usize) -> ConsistentHash {
        ConsistentHash::with_hash_fn(
            replicas,
            Arc::new(|data: &[u8]| std::str::from_utf8(data).unwrap().parse::<u32>().unwrap()),
        )
    }

    fn random_keys(n: usize, seed: u64) -> Vec<String> {
        let mut rng = SmallRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let len = rng.random_range(1..16);
                (&mut rng).sample_iter(&Alphanumeric).take(len).map(char::from).collect()
            })
            .collect_vec()
    }

    #[test]
    fn test_ring_lookup() {
        // Virtual nodes: 2, 4, 6, 12, 14, 16, 22, 24, 26.
        let mut ring = decimal_ring(3);
        ring.add(["6", "4", "2"]);
        assert_eq!(ring.len(), 9);

        for (key, peer) in [("2", "2"), ("11", "2"), ("23", "4"), ("27", "2")] {
            assert_eq!(ring.get(key), Some(peer), "key: {key}");
        }

        // Adds 8, 18, 28.
        ring.add(["8"]);
        assert_eq!(ring.get("27"), Some("8"));
        assert_eq!(ring.peers(), vec!["2", "4", "6", "8"]);
    }

    #[test]
    fn test_ring_empty() {
        let mut ring = ConsistentHash::new(50);
        assert_eq!(ring.get("Tom"), None);
        assert_eq!(ring.get(""), None);
        ring.add(["peer-1"]);
        assert_eq!(ring.get("Tom"), Some("peer-1"));
    }

    #[test]
    fn test_ring_empty_key_is_hashed() {
        let mut ring = ConsistentHash::new(50);
        ring.add(["peer-1", "peer-2"]);
        let owner = ring.get("").unwrap();
        assert!(["peer-1", "peer-2"].contains(&owner));

        // Slots are 20 ("0a") and 30 ("0bb"). The empty key hashes to 0 and lands on the lowest slot.
        let mut decimal = ConsistentHash::with_hash_fn(1, Arc::new(|data: &[u8]| data.len() as u32 * 10));
        decimal.add(["a", "bb"]);
        assert_eq!(decimal.get(""), Some("a"));
    }

    #[test]
    fn test_ring_add_is_idempotent() {
        let mut ring = ConsistentHash::new(50);
        ring.add(["peer-1", "peer-2"]);
        let len = ring.len();
        ring.add(["peer-2"]);
        assert_eq!(ring.len(), len);
    }

    #[test]
    fn test_ring_collision_keeps_first_owner() {
        let mut ring = ConsistentHash::with_hash_fn(3, Arc::new(|_: &[u8]| 42u32));
        ring.add(["a", "b"]);
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.get("any"), Some("a"));
        assert!(!ring.contains("b"));

        // "b" owns nothing, so removing it must not take the slot from "a".
        ring.remove("b");
        assert_eq!(ring.get("any"), Some("a"));

        ring.remove("a");
        assert!(ring.is_empty());
        assert_eq!(ring.get("any"), None);
    }

    #[test]
    fn test_ring_deterministic_and_balanced() {
        let mut ring = ConsistentHash::new(50);
        ring.add(["peer-1", "peer-2", "peer-3"]);

        let keys = random_keys(10_000, 42);
        let mut load = HashMap::new();
        for key in keys.iter() {
            let owner = ring.get(key).unwrap();
            assert_eq!(ring.get(key), Some(owner));
            *load.entry(owner).or_insert(0usize) += 1;
        }

        assert_eq!(load.len(), 3);
        for (peer, count) in load {
            assert!(count > 1_000, "peer {peer} owns only {count} keys");
        }
    }

    #[test]
    fn test_ring_add_moves_keys_only_to_new_peer() {
        let mut ring = ConsistentHash::new(50);
        ring.add(["peer-1", "peer-2", "peer-3"]);
        let keys = random_keys(10_000, 7);
        let before = keys.iter().map(|key| ring.get(key).unwrap().to_string()).collect_vec();

        ring.add(["peer-4"]);
        let mut moved = 0;
        for (key, old) in keys.iter().zip_eq(before.iter()) {
            let owner = ring.get(key).unwrap();
            if owner != old {
                assert_eq!(owner, "peer-4");
                moved += 1;
            }
        }
        assert!(moved > 0);
        assert!(moved < keys.len() / 2, "moved: {moved}");
    }

    #[test]
    fn test_ring_remove() {
        let mut ring = ConsistentHash::new(50);
        ring.add(["peer-1", "peer-2", "peer-3"]);
        let keys = random_keys(5_000, 3);
        let before = keys.iter().map(|key| ring.get(key).unwrap().to_string()).collect_vec();

        ring.remove("peer-2");
        ring.remove("peer-unknown");
        assert!(!ring.contains("peer-2"));
        assert_eq!(ring.peers(), vec!["peer-1", "peer-3"]);

        for (key, old) in keys.iter().zip_eq(before.iter()) {
            let owner = ring.get(key).unwrap();
            assert_ne!(owner, "peer-2");
            if old != "peer-2" {
                assert_eq!(owner, old);
            }
        }
    }
}

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

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tinycache_common::{
    code::{charge, Value},
    error::{Error, Result},
    slab::{SlabLinkedList, Token},
    strict_assert,
};

use super::{
    lru::{Lru, LruConfig},
    Departure, Policy, Strategy,
};

/// Lru-k eviction algorithm config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LruKConfig {
    /// Accesses an entry needs before it is admitted from the history into the cache.
    ///
    /// Must be positive. `1` admits on insertion.
    pub k: usize,
    /// Byte budget of the history queue.
    ///
    /// `None` uses the byte budget of the cache.
    pub history_capacity: Option<usize>,
}

impl Default for LruKConfig {
    fn default() -> Self {
        Self {
            k: 2,
            history_capacity: None,
        }
    }
}

#[derive(Debug)]
struct HistoryEntry<V> {
    key: String,
    value: V,
    count: usize,
}

/// Lru cache behind a fifo history.
///
/// A new entry waits in the history queue until it has been accessed `k` times, counting the insertion. It is then
/// moved into the lru cache. The history and the cache evict independently, each against its own byte budget.
pub struct LruK<V>
where
    V: Value,
{
    history: SlabLinkedList<HistoryEntry<V>>,
    history_index: HashMap<String, Token>,
    history_used: usize,
    history_capacity: usize,

    promoted: Lru<V>,

    k: usize,

    /// Entries evicted from the cache by promotions on `get`.
    evicted: Vec<Departure<V>>,
}

impl<V> LruK<V>
where
    V: Value,
{
    /// Create a lru-k strategy with the byte budget of the cache.
    pub fn new(capacity: usize, config: &LruKConfig) -> Result<Self> {
        if config.k == 0 {
            return Err(Error::config("lru-k requires a positive k").with_context("k", config.k));
        }
        let history_capacity = config.history_capacity.unwrap_or(capacity);
        if history_capacity == 0 {
            return Err(Error::invalid_max_bytes(history_capacity).with_context("budget", "history"));
        }

        Ok(Self {
            history: SlabLinkedList::new(),
            history_index: HashMap::new(),
            history_used: 0,
            history_capacity,
            promoted: Lru::new(capacity, &LruConfig::default()),
            k: config.k,
            evicted: vec![],
        })
    }

    /// Used bytes of the history queue.
    pub fn history_size(&self) -> usize {
        self.history_used
    }

    /// Used bytes of the lru cache.
    pub fn promoted_size(&self) -> usize {
        self.promoted.size()
    }

    /// Count one access of a history entry, replacing its value if `value` is given.
    ///
    /// The entry is promoted once its count reaches `k`.
    fn touch_history(
        &mut self,
        key: &str,
        token: Token,
        value: Option<V>,
        departures: &mut Vec<Departure<V>>,
    ) -> Result<V> {
        let entry = self.history.get_mut(token).ok_or_else(|| Error::invalid_cache(key))?;

        if let Some(value) = value {
            let weight = value.weight();
            let old = std::mem::replace(&mut entry.value, value);
            self.history_used = self.history_used - old.weight() + weight;
            departures.push(Departure::replace(key.to_string(), old));
        }

        entry.count += 1;
        let value = entry.value.clone();
        if entry.count >= self.k {
            departures.extend(self.promote(key, token)?);
        }

        Ok(value)
    }

    fn promote(&mut self, key: &str, token: Token) -> Result<Vec<Departure<V>>> {
        let entry = self.history.remove(token).ok_or_else(|| Error::invalid_cache(key))?;
        let removed = self.history_index.remove(&entry.key);
        strict_assert!(removed.is_some());
        self.history_used -= charge(&entry.key, &entry.value);

        Ok(self.promoted.set(&entry.key, entry.value))
    }

    fn evict_history(&mut self, departures: &mut Vec<Departure<V>>) {
        while self.history_used >= self.history_capacity && self.history.len() > 1 {
            let Some(entry) = self.history.pop_back() else {
                break;
            };
            let removed = self.history_index.remove(&entry.key);
            strict_assert!(removed.is_some());
            self.history_used -= charge(&entry.key, &entry.value);
            departures.push(Departure::evict(entry.key, entry.value));
        }
    }
}

impl<V> Strategy<V> for LruK<V>
where
    V: Value,
{
    fn set(&mut self, key: &str, value: V) -> Vec<Departure<V>> {
        if self.promoted.contains(key) {
            return self.promoted.set(key, value);
        }

        let mut departures = vec![];

        let token = self
            .history_index
            .get(key)
            .copied()
            .filter(|&token| self.history.get(token).is_some());
        match token {
            Some(token) => {
                if let Err(e) = self.touch_history(key, token, Some(value), &mut departures) {
                    tracing::warn!("[lru-k]: access history entry failed, key: {key}, error: {e}");
                }
            }
            None if self.k <= 1 => return self.promoted.set(key, value),
            None => {
                self.history_used += charge(key, &value);
                let token = self.history.push_front(HistoryEntry {
                    key: key.to_string(),
                    value,
                    count: 1,
                });
                self.history_index.insert(key.to_string(), token);
            }
        }

        self.evict_history(&mut departures);
        departures
    }

    fn get(&mut self, key: &str) -> Result<V> {
        if self.promoted.contains(key) {
            return self.promoted.get(key);
        }

        let token = *self.history_index.get(key).ok_or_else(|| Error::key_not_found(key))?;
        let mut departures = vec![];
        let value = self.touch_history(key, token, None, &mut departures)?;
        self.evicted.append(&mut departures);
        Ok(value)
    }

    fn remove(&mut self, key: &str) -> Result<V> {
        if self.promoted.contains(key) {
            return self.promoted.remove(key);
        }

        let token = self.history_index.remove(key).ok_or_else(|| Error::key_not_found(key))?;
        let entry = self.history.remove(token).ok_or_else(|| Error::invalid_cache(key))?;
        self.history_used -= charge(&entry.key, &entry.value);
        Ok(entry.value)
    }

    fn purge(&mut self) -> Vec<(String, V)> {
        self.history_index.clear();
        self.history_used = 0;
        let mut drained = self.promoted.purge();
        drained.extend(
            std::mem::take(&mut self.history)
                .into_iter()
                .map(|entry| (entry.key, entry.value)),
        );
        drained
    }

    fn drain_evicted(&mut self) -> Vec<Departure<V>> {
        std::mem::take(&mut self.evicted)
    }

    fn size(&self) -> usize {
        self.history_used + self.promoted.size()
    }

    fn max_size(&self) -> usize {
        self.history_capacity + self.promoted.max_size()
    }

    /// An entry passes through both structures, so the smaller budget bounds it.
    fn entry_budget(&self) -> usize {
        self.history_capacity.min(self.promoted.max_size())
    }

    fn len(&self) -> usize {
        self.history_index.len() + self.promoted.len()
    }

    fn policy(&self) -> Policy {
        Policy::LruK
    }
}

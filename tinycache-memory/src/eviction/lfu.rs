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
    strict_assert, strict_assert_eq,
};

use super::{Departure, Policy, Strategy};

/// Lfu eviction algorithm config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LfuConfig {}

#[derive(Debug)]
struct Entry<V> {
    key: String,
    value: V,
}

/// Evicts the least frequently used entry. Ties go to the entry that reached the frequency earliest.
///
/// Entries are grouped into one list per access frequency. Within a list, the front holds the entry that most
/// recently reached the frequency.
///
/// A new entry makes room before it is inserted, so it never evicts itself for being the only entry of the
/// lowest frequency.
pub struct Lfu<V>
where
    V: Value,
{
    buckets: HashMap<usize, SlabLinkedList<Entry<V>>>,
    index: HashMap<String, (usize, Token)>,
    min_freq: usize,

    used: usize,
    capacity: usize,
}

impl<V> Lfu<V>
where
    V: Value,
{
    /// Create a lfu strategy with the byte budget.
    pub fn new(capacity: usize, _config: &LfuConfig) -> Self {
        Self {
            buckets: HashMap::new(),
            index: HashMap::new(),
            min_freq: 0,
            used: 0,
            capacity,
        }
    }

    /// Bump the frequency of the key and return its new position.
    fn increment(&mut self, key: &str) -> Result<(usize, Token)> {
        let (freq, token) = *self.index.get(key).ok_or_else(|| Error::key_not_found(key))?;
        let bucket = self.buckets.get_mut(&freq).ok_or_else(|| Error::invalid_cache(key))?;
        let entry = bucket.remove(token).ok_or_else(|| Error::invalid_cache(key))?;

        if bucket.is_empty() {
            self.buckets.remove(&freq);
            if self.min_freq == freq {
                self.min_freq = freq + 1;
            }
        }

        let pos = (freq + 1, self.buckets.entry(freq + 1).or_default().push_front(entry));
        self.index.insert(key.to_string(), pos);
        Ok(pos)
    }

    fn entry_mut(&mut self, key: &str, (freq, token): (usize, Token)) -> Result<&mut Entry<V>> {
        self.buckets
            .get_mut(&freq)
            .and_then(|bucket| bucket.get_mut(token))
            .ok_or_else(|| Error::invalid_cache(key))
    }

    fn update_min_freq(&mut self) {
        self.min_freq = self.buckets.keys().copied().min().unwrap_or(0);
    }

    fn pop_victim(&mut self) -> Option<Entry<V>> {
        strict_assert!(self.buckets.contains_key(&self.min_freq));

        let bucket = self.buckets.get_mut(&self.min_freq)?;
        let entry = bucket.pop_back()?;
        if bucket.is_empty() {
            self.buckets.remove(&self.min_freq);
            self.update_min_freq();
        }

        let removed = self.index.remove(&entry.key);
        strict_assert!(removed.is_some());
        self.used -= charge(&entry.key, &entry.value);
        Some(entry)
    }

    /// Evict while the used bytes plus `incoming` reach the budget.
    ///
    /// `keep` entries are never evicted.
    fn evict(&mut self, incoming: usize, keep: usize, departures: &mut Vec<Departure<V>>) {
        while self.used + incoming >= self.capacity && self.index.len() > keep {
            let Some(entry) = self.pop_victim() else {
                self.update_min_freq();
                break;
            };
            departures.push(Departure::evict(entry.key, entry.value));
        }
    }
}

impl<V> Strategy<V> for Lfu<V>
where
    V: Value,
{
    fn set(&mut self, key: &str, value: V) -> Vec<Departure<V>> {
        let mut departures = vec![];

        if self.index.contains_key(key) {
            match self.increment(key).and_then(|pos| self.entry_mut(key, pos)) {
                Ok(entry) => {
                    let weight = value.weight();
                    let old = std::mem::replace(&mut entry.value, value);
                    self.used = self.used - old.weight() + weight;
                    departures.push(Departure::replace(key.to_string(), old));
                    self.evict(0, 1, &mut departures);
                    return departures;
                }
                Err(e) => {
                    tracing::warn!("[lfu]: drop dangling index entry, key: {key}, error: {e}");
                    self.index.remove(key);
                }
            }
        }

        let charge = charge(key, &value);
        self.evict(charge, 0, &mut departures);

        let token = self.buckets.entry(1).or_default().push_front(Entry {
            key: key.to_string(),
            value,
        });
        self.index.insert(key.to_string(), (1, token));
        self.min_freq = 1;
        self.used += charge;

        departures
    }

    fn get(&mut self, key: &str) -> Result<V> {
        let pos = self.increment(key)?;
        self.entry_mut(key, pos).map(|entry| entry.value.clone())
    }

    fn remove(&mut self, key: &str) -> Result<V> {
        let (freq, token) = self.index.remove(key).ok_or_else(|| Error::key_not_found(key))?;
        let bucket = self.buckets.get_mut(&freq).ok_or_else(|| Error::invalid_cache(key))?;
        let entry = bucket.remove(token).ok_or_else(|| Error::invalid_cache(key))?;

        if bucket.is_empty() {
            self.buckets.remove(&freq);
            if self.min_freq == freq {
                self.update_min_freq();
            }
        }

        self.used -= charge(&entry.key, &entry.value);
        Ok(entry.value)
    }

    fn purge(&mut self) -> Vec<(String, V)> {
        self.index.clear();
        self.used = 0;
        self.min_freq = 0;
        self.buckets
            .drain()
            .flat_map(|(_, bucket)| bucket.into_iter())
            .map(|entry| (entry.key, entry.value))
            .collect()
    }

    fn size(&self) -> usize {
        self.used
    }

    fn max_size(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        strict_assert_eq!(
            self.index.len(),
            self.buckets.values().map(|bucket| bucket.len()).sum::<usize>()
        );
        self.index.len()
    }

    fn policy(&self) -> Policy {
        Policy::Lfu
    }
}

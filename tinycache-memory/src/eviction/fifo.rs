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

use super::{Departure, Policy, Strategy};

/// Fifo eviction algorithm config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FifoConfig {}

#[derive(Debug)]
struct Entry<V> {
    key: String,
    value: V,
}

/// Evicts the earliest inserted entry. Neither reads nor updates reorder the queue.
pub struct Fifo<V>
where
    V: Value,
{
    queue: SlabLinkedList<Entry<V>>,
    index: HashMap<String, Token>,

    used: usize,
    capacity: usize,
}

impl<V> Fifo<V>
where
    V: Value,
{
    /// Create a fifo strategy with the byte budget.
    pub fn new(capacity: usize, _config: &FifoConfig) -> Self {
        Self {
            queue: SlabLinkedList::new(),
            index: HashMap::new(),
            used: 0,
            capacity,
        }
    }

    fn evict(&mut self, departures: &mut Vec<Departure<V>>) {
        while self.used >= self.capacity && self.queue.len() > 1 {
            let Some(entry) = self.queue.pop_back() else {
                break;
            };
            let removed = self.index.remove(&entry.key);
            strict_assert!(removed.is_some());
            self.used -= charge(&entry.key, &entry.value);
            departures.push(Departure::evict(entry.key, entry.value));
        }
    }
}

impl<V> Strategy<V> for Fifo<V>
where
    V: Value,
{
    fn set(&mut self, key: &str, value: V) -> Vec<Departure<V>> {
        let mut departures = vec![];

        let existing = self.index.get(key).and_then(|&token| self.queue.get_mut(token));
        match existing {
            Some(entry) => {
                self.used = self.used - entry.value.weight() + value.weight();
                let old = std::mem::replace(&mut entry.value, value);
                departures.push(Departure::replace(key.to_string(), old));
            }
            None => {
                self.used += charge(key, &value);
                let token = self.queue.push_front(Entry {
                    key: key.to_string(),
                    value,
                });
                self.index.insert(key.to_string(), token);
            }
        }

        self.evict(&mut departures);
        departures
    }

    fn get(&mut self, key: &str) -> Result<V> {
        let token = *self.index.get(key).ok_or_else(|| Error::key_not_found(key))?;
        self.queue
            .get(token)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| Error::invalid_cache(key))
    }

    fn remove(&mut self, key: &str) -> Result<V> {
        let token = self.index.remove(key).ok_or_else(|| Error::key_not_found(key))?;
        let entry = self.queue.remove(token).ok_or_else(|| Error::invalid_cache(key))?;
        self.used -= charge(&entry.key, &entry.value);
        Ok(entry.value)
    }

    fn purge(&mut self) -> Vec<(String, V)> {
        self.index.clear();
        self.used = 0;
        std::mem::take(&mut self.queue)
            .into_iter()
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
        self.index.len()
    }

    fn policy(&self) -> Policy {
        Policy::Fifo
    }
}

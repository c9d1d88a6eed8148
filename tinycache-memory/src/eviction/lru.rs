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

/// Lru eviction algorithm config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LruConfig {}

#[derive(Debug)]
struct Entry<V> {
    key: String,
    value: V,
}

/// Evicts the least recently used entry.
///
/// The list front holds the most recently used entry. Reads and updates move the entry to the front.
pub struct Lru<V>
where
    V: Value,
{
    list: SlabLinkedList<Entry<V>>,
    index: HashMap<String, Token>,

    used: usize,
    capacity: usize,
}

impl<V> Lru<V>
where
    V: Value,
{
    /// Create a lru strategy with the byte budget.
    pub fn new(capacity: usize, _config: &LruConfig) -> Self {
        Self {
            list: SlabLinkedList::new(),
            index: HashMap::new(),
            used: 0,
            capacity,
        }
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    fn evict(&mut self, departures: &mut Vec<Departure<V>>) {
        while self.used >= self.capacity && self.list.len() > 1 {
            let Some(entry) = self.list.pop_back() else {
                break;
            };
            let removed = self.index.remove(&entry.key);
            strict_assert!(removed.is_some());
            self.used -= charge(&entry.key, &entry.value);
            departures.push(Departure::evict(entry.key, entry.value));
        }
    }
}

impl<V> Strategy<V> for Lru<V>
where
    V: Value,
{
    fn set(&mut self, key: &str, value: V) -> Vec<Departure<V>> {
        let mut departures = vec![];

        let token = self.index.get(key).copied().filter(|&token| self.list.move_to_front(token));
        match token.and_then(|token| self.list.get_mut(token)) {
            Some(entry) => {
                self.used = self.used - entry.value.weight() + value.weight();
                let old = std::mem::replace(&mut entry.value, value);
                departures.push(Departure::replace(key.to_string(), old));
            }
            None => {
                self.used += charge(key, &value);
                let token = self.list.push_front(Entry {
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
        if !self.list.move_to_front(token) {
            return Err(Error::invalid_cache(key));
        }
        self.list
            .get(token)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| Error::invalid_cache(key))
    }

    fn remove(&mut self, key: &str) -> Result<V> {
        let token = self.index.remove(key).ok_or_else(|| Error::key_not_found(key))?;
        let entry = self.list.remove(token).ok_or_else(|| Error::invalid_cache(key))?;
        self.used -= charge(&entry.key, &entry.value);
        Ok(entry.value)
    }

    fn purge(&mut self) -> Vec<(String, V)> {
        self.index.clear();
        self.used = 0;
        std::mem::take(&mut self.list)
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
        Policy::Lru
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use tinycache_common::{error::ErrorKind, event::Event};

    use super::*;
    use crate::eviction::test_utils::{fuzz_accounting, keys_of, value};

    fn lru(capacity: usize) -> Lru<Vec<u8>> {
        Lru::new(capacity, &LruConfig::default())
    }

    fn dump(lru: &Lru<Vec<u8>>) -> Vec<String> {
        lru.list.iter().map(|entry| entry.key.clone()).collect_vec()
    }

    #[test]
    fn test_lru_get_protects_entry() {
        // "key1" + "value1" charges 10 bytes.
        let mut lru = lru(30);
        lru.set("key1", b"value1".to_vec());
        lru.set("key2", b"value2".to_vec());
        assert_eq!(lru.get("key1").unwrap(), b"value1");
        assert_eq!(dump(&lru), vec!["key1", "key2"]);

        let departures = lru.set("key3", b"value3".to_vec());
        assert_eq!(keys_of(&departures, Event::Evict), vec!["key2"]);
        assert!(lru.get("key2").unwrap_err().is(ErrorKind::KeyNotFound));
        assert_eq!(dump(&lru), vec!["key3", "key1"]);
        assert_eq!(lru.size(), 20);
    }

    #[test]
    fn test_lru_update_moves_to_front() {
        let mut lru = lru(100);
        for key in ["a", "b", "c"] {
            lru.set(key, value(1));
        }
        let departures = lru.set("a", value(3));
        assert_eq!(departures, vec![Departure::replace("a".to_string(), value(1))]);
        assert_eq!(dump(&lru), vec!["a", "c", "b"]);
        assert_eq!(lru.size(), 4 + 2 + 2);
    }

    #[test]
    fn test_lru_eviction_reaches_budget() {
        let mut lru = lru(20);
        for key in ["a", "b", "c", "d"] {
            lru.set(key, value(4));
        }
        // 4 * 5 = 20 reaches the budget, so the least recently used goes.
        assert_eq!(dump(&lru), vec!["d", "c", "b"]);
        assert_eq!(lru.size(), 15);
        assert!(lru.contains("b"));
        assert!(!lru.contains("a"));
    }

    #[test]
    fn test_lru_keeps_single_oversized_entry() {
        let mut lru = lru(8);
        let departures = lru.set("big", value(100));
        assert!(departures.is_empty());
        assert_eq!(lru.size(), 103);
        assert_eq!(lru.get("big").unwrap().len(), 100);

        let departures = lru.set("a", value(1));
        assert_eq!(keys_of(&departures, Event::Evict), vec!["big"]);
        assert_eq!(lru.size(), 2);
    }

    #[test]
    fn test_lru_remove_and_purge() {
        let mut lru = lru(100);
        lru.set("a", value(1));
        lru.set("b", value(2));
        assert_eq!(lru.remove("a").unwrap(), value(1));
        assert!(lru.remove("a").unwrap_err().is(ErrorKind::KeyNotFound));
        assert_eq!(lru.size(), 3);

        assert_eq!(lru.purge(), vec![("b".to_string(), value(2))]);
        assert_eq!(lru.size(), 0);
        assert!(lru.is_empty());
    }

    #[test]
    fn test_lru_fuzzy_accounting() {
        fuzz_accounting(Box::new(lru(512)), 1919810);
    }
}

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

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use tinycache_common::{
    code::Value,
    error::{Error, Result},
    event::Event,
};

use crate::eviction::{
    fifo::{Fifo, FifoConfig},
    lfu::{Lfu, LfuConfig},
    lru::{Lru, LruConfig},
    lru_k::{LruK, LruKConfig},
};

/// An entry that left a strategy, with the reason it left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure<V> {
    /// Why the entry left.
    pub event: Event,
    /// Key of the entry.
    pub key: String,
    /// The value that left.
    pub value: V,
}

impl<V> Departure<V> {
    pub(crate) fn evict(key: String, value: V) -> Self {
        Self {
            event: Event::Evict,
            key,
            value,
        }
    }

    pub(crate) fn replace(key: String, value: V) -> Self {
        Self {
            event: Event::Replace,
            key,
            value,
        }
    }
}

/// Eviction policy identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Policy {
    /// First in, first out.
    Fifo,
    /// Least recently used.
    Lru,
    /// Least frequently used.
    Lfu,
    /// LRU with a k-access admission history.
    LruK,
}

impl Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Policy::Fifo => "fifo",
            Policy::Lru => "lru",
            Policy::Lfu => "lfu",
            Policy::LruK => "lruk",
        };
        write!(f, "{s}")
    }
}

/// A byte-budgeted key-value store with an eviction policy.
///
/// A strategy is single-threaded. [`crate::Cache`] makes it shareable.
///
/// After every mutation, entries are evicted while the used bytes reach the budget and more than one entry is
/// left in the structure being evicted. A single entry larger than the budget is kept until it is removed.
pub trait Strategy<V>: Send + Sync + 'static
where
    V: Value,
{
    /// Insert or update an entry, then evict.
    ///
    /// Return the replaced value (if any) and every evicted entry.
    fn set(&mut self, key: &str, value: V) -> Vec<Departure<V>>;

    /// Get the value of the key and record the access.
    fn get(&mut self, key: &str) -> Result<V>;

    /// Remove the entry of the key.
    fn remove(&mut self, key: &str) -> Result<V>;

    /// Drain all entries and reset the used bytes.
    fn purge(&mut self) -> Vec<(String, V)>;

    /// Take the entries evicted while serving [`Strategy::get`].
    ///
    /// Only policies that move entries between budgets on access evict on `get`.
    fn drain_evicted(&mut self) -> Vec<Departure<V>> {
        vec![]
    }

    /// Used bytes.
    fn size(&self) -> usize;

    /// Byte budget.
    fn max_size(&self) -> usize;

    /// Largest charge a single entry can take before it evicts everything else of the structure that holds it.
    ///
    /// Equals [`Strategy::max_size`] unless the policy splits its budget.
    fn entry_budget(&self) -> usize {
        self.max_size()
    }

    /// Count of entries.
    fn len(&self) -> usize;

    /// Return `true` if there is no entry.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Policy of the strategy.
    fn policy(&self) -> Policy;
}

/// Eviction policy config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvictionConfig {
    /// FIFO eviction config.
    Fifo(FifoConfig),
    /// LRU eviction config.
    Lru(LruConfig),
    /// LFU eviction config.
    Lfu(LfuConfig),
    /// LRU-K eviction config.
    LruK(LruKConfig),
}

impl Default for EvictionConfig {
    fn default() -> Self {
        LruConfig::default().into()
    }
}

impl EvictionConfig {
    /// Policy of the config.
    pub fn policy(&self) -> Policy {
        match self {
            EvictionConfig::Fifo(_) => Policy::Fifo,
            EvictionConfig::Lru(_) => Policy::Lru,
            EvictionConfig::Lfu(_) => Policy::Lfu,
            EvictionConfig::LruK(_) => Policy::LruK,
        }
    }
}

impl From<FifoConfig> for EvictionConfig {
    fn from(value: FifoConfig) -> EvictionConfig {
        EvictionConfig::Fifo(value)
    }
}

impl From<LruConfig> for EvictionConfig {
    fn from(value: LruConfig) -> EvictionConfig {
        EvictionConfig::Lru(value)
    }
}

impl From<LfuConfig> for EvictionConfig {
    fn from(value: LfuConfig) -> EvictionConfig {
        EvictionConfig::Lfu(value)
    }
}

impl From<LruKConfig> for EvictionConfig {
    fn from(value: LruKConfig) -> EvictionConfig {
        EvictionConfig::LruK(value)
    }
}

impl FromStr for EvictionConfig {
    type Err = Error;

    /// Parse a policy tag with the default config of that policy.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(FifoConfig::default().into()),
            "lru" => Ok(LruConfig::default().into()),
            "lfu" => Ok(LfuConfig::default().into()),
            "lruk" | "lru-k" => Ok(LruKConfig::default().into()),
            _ => Err(Error::config(format!("unknown eviction policy: {s:?}"))),
        }
    }
}

/// Create a strategy with the byte budget and the eviction config.
pub fn new_strategy<V>(max_bytes: usize, config: &EvictionConfig) -> Result<Box<dyn Strategy<V>>>
where
    V: Value,
{
    if max_bytes == 0 {
        return Err(Error::invalid_max_bytes(max_bytes));
    }

    let strategy: Box<dyn Strategy<V>> = match config {
        EvictionConfig::Fifo(config) => Box::new(Fifo::new(max_bytes, config)),
        EvictionConfig::Lru(config) => Box::new(Lru::new(max_bytes, config)),
        EvictionConfig::Lfu(config) => Box::new(Lfu::new(max_bytes, config)),
        EvictionConfig::LruK(config) => Box::new(LruK::new(max_bytes, config)?),
    };
    Ok(strategy)
}

/// First-in-first-out eviction.
pub mod fifo;
/// Least-frequently-used eviction with frequency buckets.
pub mod lfu;
/// Least-recently-used eviction.
pub mod lru;
/// LRU eviction behind a k-access admission history.
pub mod lru_k;

#[cfg(test)]
pub(crate) mod test_utils;

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

use parking_lot::RwLock;
use tinycache_common::{
    code::{charge, Value},
    error::Result,
    event::{Event, EventListener},
};

use crate::eviction::{new_strategy, Departure, EvictionConfig, Policy, Strategy};

/// Thread-safe wrapper of a [`Strategy`].
///
/// All operations that touch the eviction metadata take the exclusive lock, including [`Cache::get`], which
/// reorders or counts the accessed entry. Size queries take the shared lock.
///
/// The event listener is called after the lock is released.
pub struct Cache<V>
where
    V: Value,
{
    strategy: RwLock<Box<dyn Strategy<V>>>,
    event_listener: Option<Arc<dyn EventListener<Value = V>>>,
}

impl<V> Debug for Cache<V>
where
    V: Value,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let strategy = self.strategy.read();
        f.debug_struct("Cache")
            .field("policy", &strategy.policy())
            .field("len", &strategy.len())
            .field("size", &strategy.size())
            .field("max_size", &strategy.max_size())
            .finish()
    }
}

impl<V> Cache<V>
where
    V: Value,
{
    /// Insert or update an entry.
    pub fn set(&self, key: &str, value: V) {
        let budget = self.strategy.read().entry_budget();
        let charge = charge(key, &value);
        if charge >= budget {
            tracing::warn!(
                "[cache]: entry reaches the byte budget and will evict everything else, key: {key}, charge: {charge}, budget: {budget}"
            );
        }

        let departures = self.strategy.write().set(key, value);

        // Deallocate data out of the lock critical section.
        self.notify(departures);
    }

    /// Get the value of the key.
    pub fn get(&self, key: &str) -> Result<V> {
        let (res, evicted) = {
            let mut strategy = self.strategy.write();
            let res = strategy.get(key);
            (res, strategy.drain_evicted())
        };
        self.notify(evicted);
        res
    }

    /// Remove the entry of the key.
    pub fn remove(&self, key: &str) -> Result<V> {
        let res = self.strategy.write().remove(key);
        if let (Ok(value), Some(listener)) = (res.as_ref(), self.event_listener.as_ref()) {
            listener.on_leave(Event::Remove, key, value);
        }
        res
    }

    /// Remove all entries.
    pub fn purge(&self) {
        let drained = self.strategy.write().purge();
        if let Some(listener) = self.event_listener.as_ref() {
            for (key, value) in drained.iter() {
                listener.on_leave(Event::Purge, key, value);
            }
        }
    }

    /// Used bytes.
    pub fn size(&self) -> usize {
        self.strategy.read().size()
    }

    /// Byte budget.
    pub fn max_size(&self) -> usize {
        self.strategy.read().max_size()
    }

    /// Count of entries.
    pub fn len(&self) -> usize {
        self.strategy.read().len()
    }

    /// Return `true` if there is no entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Eviction policy of the cache.
    pub fn policy(&self) -> Policy {
        self.strategy.read().policy()
    }

    fn notify(&self, departures: Vec<Departure<V>>) {
        if let Some(listener) = self.event_listener.as_ref() {
            for departure in departures.iter() {
                listener.on_leave(departure.event, &departure.key, &departure.value);
            }
        }
    }
}

/// Builder for [`Cache`].
pub struct CacheBuilder<V>
where
    V: Value,
{
    max_bytes: usize,
    eviction_config: EvictionConfig,
    event_listener: Option<Arc<dyn EventListener<Value = V>>>,
}

impl<V> CacheBuilder<V>
where
    V: Value,
{
    /// Create a builder with the byte budget. The eviction policy defaults to lru.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            eviction_config: EvictionConfig::default(),
            event_listener: None,
        }
    }

    /// Set eviction algorithm config.
    pub fn with_eviction_config(mut self, eviction_config: impl Into<EvictionConfig>) -> Self {
        self.eviction_config = eviction_config.into();
        self
    }

    /// Set event listener.
    pub fn with_event_listener(mut self, event_listener: Arc<dyn EventListener<Value = V>>) -> Self {
        self.event_listener = Some(event_listener);
        self
    }

    /// Build the cache.
    ///
    /// Fails if the byte budget is zero or the eviction config is invalid.
    pub fn build(self) -> Result<Cache<V>> {
        let strategy = new_strategy(self.max_bytes, &self.eviction_config)?;
        Ok(Cache {
            strategy: RwLock::new(strategy),
            event_listener: self.event_listener,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, thread};

    use itertools::Itertools;
    use parking_lot::Mutex;
    use tinycache_common::error::ErrorKind;

    use super::*;
    use crate::{
        eviction::{fifo::FifoConfig, lru_k::LruKConfig},
        value::CachedValue,
    };

    #[derive(Debug, Default)]
    struct Recorder {
        events: Mutex<Vec<(Event, String)>>,
    }

    impl EventListener for Recorder {
        type Value = CachedValue;

        fn on_leave(&self, reason: Event, key: &str, _: &Self::Value) {
            self.events.lock().push((reason, key.to_string()));
        }
    }

    impl Recorder {
        fn take(&self) -> Vec<(Event, String)> {
            std::mem::take(&mut *self.events.lock())
        }
    }

    fn cache_with_recorder(
        max_bytes: usize,
        config: impl Into<EvictionConfig>,
    ) -> (Cache<CachedValue>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let cache = CacheBuilder::<CachedValue>::new(max_bytes)
            .with_eviction_config(config)
            .with_event_listener(recorder.clone())
            .build()
            .unwrap();
        (cache, recorder)
    }

    #[test_log::test]
    fn test_cache_events() {
        let (cache, recorder) = cache_with_recorder(10, FifoConfig::default());

        cache.set("a", "1234".into());
        cache.set("a", "12".into());
        cache.set("b", "1234".into());
        cache.set("c", "1".into());
        assert_eq!(
            recorder.take(),
            vec![(Event::Replace, "a".to_string()), (Event::Evict, "a".to_string())]
        );

        assert_eq!(cache.remove("b").unwrap().to_string(), "1234");
        assert!(cache.remove("b").unwrap_err().is(ErrorKind::KeyNotFound));
        assert_eq!(recorder.take(), vec![(Event::Remove, "b".to_string())]);

        cache.purge();
        assert_eq!(recorder.take(), vec![(Event::Purge, "c".to_string())]);
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
    }

    #[test_log::test]
    fn test_cache_reports_evictions_on_get() {
        let (cache, recorder) = cache_with_recorder(6, LruKConfig::default());
        cache.set("a", "12".into());
        cache.get("a").unwrap();
        cache.set("b", "12".into());
        cache.get("b").unwrap();
        assert_eq!(recorder.take(), vec![(Event::Evict, "a".to_string())]);
        assert_eq!(cache.policy(), Policy::LruK);
    }

    #[test_log::test]
    fn test_cache_listener_may_reenter() {
        struct Reentrant {
            cache: Mutex<Option<Arc<Cache<CachedValue>>>>,
        }

        impl EventListener for Reentrant {
            type Value = CachedValue;

            fn on_leave(&self, _: Event, _: &str, _: &Self::Value) {
                if let Some(cache) = self.cache.lock().as_ref() {
                    assert!(cache.size() > 0);
                }
            }
        }

        let listener = Arc::new(Reentrant { cache: Mutex::new(None) });
        let cache = Arc::new(
            CacheBuilder::<CachedValue>::new(8)
                .with_event_listener(listener.clone())
                .build()
                .unwrap(),
        );
        *listener.cache.lock() = Some(cache.clone());

        cache.set("a", "123".into());
        cache.set("b", "123".into());
        assert_eq!(cache.len(), 1);

        *listener.cache.lock() = None;
    }

    #[derive(Debug, Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` and return the warnings it logs.
    fn warnings(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer({
                let buffer = buffer.clone();
                move || buffer.clone()
            })
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8_lossy(&buffer.0.lock()).into_owned();
        logs
    }

    #[test]
    fn test_cache_warns_oversized_entry_against_structure_budget() {
        let cache = CacheBuilder::<CachedValue>::new(100)
            .with_eviction_config(LruKConfig {
                k: 2,
                history_capacity: Some(10),
            })
            .build()
            .unwrap();
        assert_eq!(cache.max_size(), 110);

        assert!(warnings(|| cache.set("a", "1234".into())).is_empty());
        // 20 bytes fit the combined budget but not the history queue.
        let logs = warnings(|| cache.set("b", vec![b'v'; 19].into()));
        assert!(logs.contains("reaches the byte budget"), "{logs}");
        assert!(logs.contains("budget: 10"), "{logs}");

        let lru = CacheBuilder::<CachedValue>::new(100).build().unwrap();
        assert!(warnings(|| lru.set("b", vec![b'v'; 19].into())).is_empty());
        assert!(!warnings(|| lru.set("c", vec![b'v'; 99].into())).is_empty());
    }

    #[test]
    fn test_cache_builder_rejects_zero_budget() {
        let err = CacheBuilder::<CachedValue>::new(0).build().unwrap_err();
        assert!(err.is(ErrorKind::InvalidMaxBytes));
    }

    #[test_log::test]
    fn test_cache_concurrent_accounting() {
        const THREADS: usize = 8;
        const KEYS: usize = 200;

        let cache = Arc::new(CacheBuilder::<CachedValue>::new(4096).build().unwrap());
        let handles = (0..THREADS)
            .map(|t| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for i in 0..KEYS {
                        let key = format!("{t}-{i}");
                        cache.set(&key, CachedValue::from(vec![b'v'; i % 17]));
                        let _ = cache.get(&format!("{t}-{}", i / 2));
                        if i % 5 == 0 {
                            let _ = cache.remove(&format!("{}-{i}", (t + 1) % THREADS));
                        }
                    }
                })
            })
            .collect_vec();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.size() < cache.max_size());
        let mut expected = HashMap::new();
        for t in 0..THREADS {
            for i in 0..KEYS {
                let key = format!("{t}-{i}");
                if let Ok(value) = cache.get(&key) {
                    expected.insert(key, value);
                }
            }
        }
        assert_eq!(expected.len(), cache.len());
        assert_eq!(
            expected.iter().map(|(k, v)| charge(k, v)).sum::<usize>(),
            cache.size()
        );
    }
}

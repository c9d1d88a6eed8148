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

use std::collections::HashMap;

use itertools::Itertools;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use tinycache_common::{code::charge, event::Event};

use super::{Departure, Strategy};

/// Keys of the departures with the given event, in departure order.
pub fn keys_of(departures: &[Departure<Vec<u8>>], event: Event) -> Vec<String> {
    departures
        .iter()
        .filter(|d| d.event == event)
        .map(|d| d.key.clone())
        .collect_vec()
}

/// Value of `len` bytes.
pub fn value(len: usize) -> Vec<u8> {
    vec![b'x'; len]
}

/// Drive the strategy with random operations and check it against a model rebuilt from the departures.
///
/// Entries are small against the budget, so every `set` must leave the used bytes under the budget.
pub fn fuzz_accounting(mut strategy: Box<dyn Strategy<Vec<u8>>>, seed: u64) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut model: HashMap<String, Vec<u8>> = HashMap::new();
    let max_value = strategy.max_size() / 8;

    let apply = |model: &mut HashMap<String, Vec<u8>>, departures: Vec<Departure<Vec<u8>>>| {
        for departure in departures {
            match departure.event {
                Event::Evict => {
                    let removed = model.remove(&departure.key);
                    assert_eq!(removed, Some(departure.value));
                }
                Event::Replace => {}
                event => panic!("unexpected event: {event:?}"),
            }
        }
    };

    for _ in 0..20_000 {
        let key = format!("k{}", rng.random_range(0..64));
        match rng.random_range(0..10) {
            0..=4 => {
                let v = value(rng.random_range(0..max_value));
                let departures = strategy.set(&key, v.clone());
                if let Some(old) = model.get(&key) {
                    assert!(departures
                        .iter()
                        .any(|d| d.event == Event::Replace && d.key == key && &d.value == old));
                }
                model.insert(key.clone(), v);
                apply(&mut model, departures);
                assert!(
                    strategy.size() < strategy.max_size(),
                    "size: {}, max size: {}",
                    strategy.size(),
                    strategy.max_size()
                );
            }
            5..=7 => {
                let res = strategy.get(&key);
                match model.get(&key) {
                    Some(v) => assert_eq!(res.unwrap(), *v),
                    None => assert!(res.is_err()),
                }
                apply(&mut model, strategy.drain_evicted());
            }
            8 => {
                let res = strategy.remove(&key);
                match model.remove(&key) {
                    Some(v) => assert_eq!(res.unwrap(), v),
                    None => assert!(res.is_err()),
                }
            }
            _ => {
                if rng.random_bool(0.01) {
                    let drained = strategy.purge();
                    assert_eq!(drained.len(), model.len());
                    model.clear();
                }
            }
        }

        assert_eq!(strategy.len(), model.len());
        assert_eq!(strategy.size(), model.iter().map(|(k, v)| charge(k, v)).sum::<usize>());
    }
}

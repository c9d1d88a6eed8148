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

pub use tinycache_common::{
    code::{charge, Value},
    error::{Error, ErrorKind, Result},
    event::{Event, EventListener},
    hasher::{default_hash_fn, xxhash32, HashFn},
};
pub use tinycache_memory::{
    Cache, CacheBuilder, CachedValue, EvictionConfig, FifoConfig, LfuConfig, LruConfig, LruKConfig, Policy,
};

pub use crate::{
    group::{DataSource, Group, GroupBuilder},
    metrics::GroupMetrics,
    peer::{FetchRequest, FetchResponse, PeerFetcher, PeerPicker, PeerPool, DEFAULT_REPLICAS},
    registry::Registry,
    ring::ConsistentHash,
    singleflight::SingleFlight,
};

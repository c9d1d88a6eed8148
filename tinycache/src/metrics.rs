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

use std::borrow::Cow;

use mixtrics::metrics::{BoxedCounter, BoxedRegistry};

/// Counters of a [`crate::Group`].
///
/// All counters are registered as `tinycache_group_op_total`, labeled with the group `name` and the `op`.
#[derive(Debug)]
pub struct GroupMetrics {
    /// `get` calls with a non-empty key
    pub get: BoxedCounter,
    /// local cache hits
    pub hit: BoxedCounter,
    /// local cache misses
    pub miss: BoxedCounter,
    /// resolver runs, one per coalesced miss
    pub load: BoxedCounter,
    /// misses served by another caller's resolver run
    pub coalesced: BoxedCounter,
    /// values fetched from a remote peer
    pub peer_load: BoxedCounter,
    /// failed remote peer fetches
    pub peer_error: BoxedCounter,
    /// values loaded from the data source
    pub local_load: BoxedCounter,
    /// failed data source loads
    pub local_error: BoxedCounter,
}

impl GroupMetrics {
    /// Register the counters of the named group to the registry.
    pub fn new(name: impl Into<Cow<'static, str>>, registry: &BoxedRegistry) -> Self {
        let name = name.into();
        let ops = registry.register_counter_vec(
            "tinycache_group_op_total".into(),
            "tinycache group operations".into(),
            &["name", "op"],
        );
        let counter = |op: &'static str| ops.counter(&[name.clone(), op.into()]);

        Self {
            get: counter("get"),
            hit: counter("hit"),
            miss: counter("miss"),
            load: counter("load"),
            coalesced: counter("coalesced"),
            peer_load: counter("peer_load"),
            peer_error: counter("peer_error"),
            local_load: counter("local_load"),
            local_error: counter("local_error"),
        }
    }
}

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

use crate::code::Value;

/// Event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// Cache eviction on insertion or access.
    Evict,
    /// Cache replacement on insertion.
    Replace,
    /// Cache remove.
    Remove,
    /// Cache purge.
    Purge,
}

/// Trait for the customized event listener.
///
/// Listeners are called after the cache lock is released, so a listener may call back into the cache.
pub trait EventListener: Send + Sync + 'static {
    /// Associated value type.
    type Value: Value;

    /// Called when a cache entry leaves the local cache with the reason.
    #[expect(unused_variables)]
    fn on_leave(&self, reason: Event, key: &str, value: &Self::Value) {}
}

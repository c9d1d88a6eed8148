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

use std::{hash::Hasher, sync::Arc};

use twox_hash::XxHash32;

/// Hash function placing keys and virtual nodes on the ring.
///
/// Every process of one cluster must use the same function, or peers disagree on key ownership.
pub type HashFn = Arc<dyn Fn(&[u8]) -> u32 + Send + Sync + 'static>;

/// xxHash32 with seed 0, the default ring hash.
pub fn xxhash32(data: &[u8]) -> u32 {
    let mut hasher = XxHash32::with_seed(0);
    hasher.write(data);
    hasher.finish() as u32
}

/// The default [`HashFn`].
pub fn default_hash_fn() -> HashFn {
    Arc::new(xxhash32)
}

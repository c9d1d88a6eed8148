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

//! Byte-budgeted in-memory cache with pluggable eviction policies.
//!
//! A [`Strategy`] owns the entries and the eviction metadata of one policy:
//! fifo, lru, lfu or lru-k. [`Cache`] wraps a strategy behind a lock and reports departing
//! entries to an event listener.

mod cache;
mod eviction;
mod prelude;
mod value;

pub use prelude::*;

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

//! tinycache is a distributed in-process cache for Rust.
//!
//! Keys are partitioned across peers by a consistent-hash ring. Each process keeps a byte-bounded local cache per
//! [`Group`]. A miss is coalesced per key, then served by the owning peer or by the data source of the group.
//!
//! ```rust
//! use tinycache::{GroupBuilder, LfuConfig, Registry};
//!
//! let registry = Registry::new();
//! let group = registry
//!     .create(
//!         GroupBuilder::new("scores", 1024, |key: &str| Ok(format!("score of {key}").into_bytes()))
//!             .with_eviction_config(LfuConfig::default()),
//!     )
//!     .unwrap();
//!
//! assert_eq!(group.get("Tom").unwrap().to_string(), "score of Tom");
//! ```

mod group;
mod metrics;
mod peer;
mod prelude;
mod registry;
mod ring;
mod singleflight;

pub use prelude::*;

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

//! Shared components for tinycache.

/// Assertion macros.
pub mod assert;
/// Value trait and byte charge.
pub mod code;
/// Error type of tinycache.
pub mod error;
/// Cache entry leave events and the listener trait.
pub mod event;
/// Ring hash functions.
pub mod hasher;
/// Index arena and the linked list built on it.
pub mod slab;

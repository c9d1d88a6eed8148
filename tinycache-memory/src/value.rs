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

use std::fmt::Display;

use bytes::Bytes;
use tinycache_common::code::Value;

/// Immutable byte value held by the cache.
///
/// Cloning shares the underlying buffer. Callers that need to mutate the bytes take an owned copy with
/// [`CachedValue::copy`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CachedValue {
    bytes: Bytes,
}

impl CachedValue {
    /// Create a value by copying the given bytes.
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self {
            bytes: Bytes::copy_from_slice(data),
        }
    }

    /// Byte length of the value.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Return `true` if the value holds no byte.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Return an owned copy of the bytes.
    pub fn copy(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// Read-only view of the bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Value for CachedValue {
    fn weight(&self) -> usize {
        self.len()
    }
}

impl Display for CachedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes))
    }
}

impl AsRef<[u8]> for CachedValue {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for CachedValue {
    fn from(value: Vec<u8>) -> Self {
        Self { bytes: value.into() }
    }
}

impl From<Bytes> for CachedValue {
    fn from(bytes: Bytes) -> Self {
        Self { bytes }
    }
}

impl From<&str> for CachedValue {
    fn from(value: &str) -> Self {
        Self::copy_from_slice(value.as_bytes())
    }
}

impl From<String> for CachedValue {
    fn from(value: String) -> Self {
        Self {
            bytes: value.into_bytes().into(),
        }
    }
}

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

use bytes::Bytes;

/// Value trait for the values held by tinycache eviction strategies.
///
/// The weight is the byte charge of the value. An entry is charged `key.len() + value.weight()` bytes.
pub trait Value: Send + Sync + 'static + Clone + std::fmt::Debug {
    /// Byte charge of the value.
    fn weight(&self) -> usize;
}

impl Value for Vec<u8> {
    fn weight(&self) -> usize {
        self.len()
    }
}

impl Value for Bytes {
    fn weight(&self) -> usize {
        self.len()
    }
}

impl Value for String {
    fn weight(&self) -> usize {
        self.len()
    }
}

/// Byte charge of an entry.
pub fn charge<V: Value>(key: &str, value: &V) -> usize {
    key.len() + value.weight()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge() {
        assert_eq!(charge("key", &b"value".to_vec()), 8);
        assert_eq!(charge("", &String::new()), 0);
        assert_eq!(charge("k", &Bytes::from_static(b"12")), 3);
    }
}

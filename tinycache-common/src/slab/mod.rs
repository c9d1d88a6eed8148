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

/// Handle of a slot in a [`Slab`].
///
/// A token stays valid until its slot is removed. After that, the slot may be reused by a later insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(usize);

impl Token {
    /// Index of the slot.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// An index arena. Vacant slots are chained into a free list and reused first.
#[derive(Debug, Clone)]
pub struct Slab<T> {
    entries: Vec<Entry<T>>,
    len: usize,
    next: usize,
}

#[derive(Debug, Clone)]
enum Entry<T> {
    Vacant(usize),
    Occupied(T),
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slab<T> {
    /// Create an empty slab.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next: 0,
            len: 0,
        }
    }

    /// Create an empty slab with room for `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            next: 0,
            len: 0,
        }
    }

    /// Insert a value and return its token.
    pub fn insert(&mut self, val: T) -> Token {
        let index = self.next;
        self.len += 1;

        if index == self.entries.len() {
            self.entries.push(Entry::Occupied(val));
            self.next = index + 1;
        } else {
            let entry = std::mem::replace(&mut self.entries[index], Entry::Occupied(val));
            self.next = match entry {
                Entry::Vacant(next) => next,
                Entry::Occupied(_) => unreachable!("the free list head must be vacant"),
            };
        }

        Token(index)
    }

    /// Remove the value of the token, if present.
    pub fn remove(&mut self, token: Token) -> Option<T> {
        let index = token.index();
        let entry = self.entries.get_mut(index)?;

        if matches!(entry, Entry::Vacant(_)) {
            return None;
        }

        match std::mem::replace(entry, Entry::Vacant(self.next)) {
            Entry::Occupied(val) => {
                self.len -= 1;
                self.next = index;
                Some(val)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Get the value of the token, if present.
    pub fn get(&self, token: Token) -> Option<&T> {
        match self.entries.get(token.index()) {
            Some(Entry::Occupied(val)) => Some(val),
            _ => None,
        }
    }

    /// Get the mutable value of the token, if present.
    pub fn get_mut(&mut self, token: Token) -> Option<&mut T> {
        match self.entries.get_mut(token.index()) {
            Some(Entry::Occupied(val)) => Some(val),
            _ => None,
        }
    }

    /// Return `true` if the token points to a live value.
    pub fn contains(&self, token: Token) -> bool {
        self.get(token).is_some()
    }

    /// Count of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Return `true` if there is no live value.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all values and release the slots.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.len = 0;
        self.next = 0;
    }
}

/// Doubly linked list whose nodes live in a [`Slab`].
pub mod linked_list;

pub use linked_list::SlabLinkedList;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slab_reuse() {
        let mut slab = Slab::new();
        let t1 = slab.insert(1);
        let t2 = slab.insert(2);
        let t3 = slab.insert(3);
        assert_eq!(slab.len(), 3);

        assert_eq!(slab.remove(t2), Some(2));
        assert_eq!(slab.remove(t2), None);
        assert!(!slab.contains(t2));

        let t4 = slab.insert(4);
        assert_eq!(t4.index(), t2.index());
        assert_eq!(slab.get(t4), Some(&4));

        *slab.get_mut(t1).unwrap() = 10;
        assert_eq!(slab.get(t1), Some(&10));
        assert_eq!(slab.get(t3), Some(&3));
        assert_eq!(slab.len(), 3);

        slab.clear();
        assert!(slab.is_empty());
        assert_eq!(slab.get(t1), None);
    }

    #[test]
    fn test_slab_free_list_order() {
        let mut slab = Slab::new();
        let tokens = (0..4).map(|i| slab.insert(i)).collect::<Vec<_>>();
        slab.remove(tokens[1]);
        slab.remove(tokens[3]);

        // The most recently freed slot is reused first.
        assert_eq!(slab.insert(5).index(), 3);
        assert_eq!(slab.insert(6).index(), 1);
        assert_eq!(slab.insert(7).index(), 4);
    }
}

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

use super::{Slab, Token};

struct Node<T> {
    val: T,

    prev: Option<Token>,
    next: Option<Token>,
}

/// A doubly linked list with O(1) removal and reordering by [`Token`].
///
/// The front is the newest end, the back is the oldest end.
pub struct SlabLinkedList<T> {
    slab: Slab<Node<T>>,
    head: Option<Token>,
    tail: Option<Token>,
}

impl<T> Default for SlabLinkedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for SlabLinkedList<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> SlabLinkedList<T> {
    /// Create an empty list.
    pub const fn new() -> Self {
        Self {
            slab: Slab::new(),
            head: None,
            tail: None,
        }
    }

    /// Create an empty list with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slab: Slab::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    /// The newest value.
    pub fn front(&self) -> Option<&T> {
        self.head.and_then(|token| self.get(token))
    }

    /// The oldest value.
    pub fn back(&self) -> Option<&T> {
        self.tail.and_then(|token| self.get(token))
    }

    /// Token of the newest value.
    pub fn front_token(&self) -> Option<Token> {
        self.head
    }

    /// Token of the oldest value.
    pub fn back_token(&self) -> Option<Token> {
        self.tail
    }

    /// Get the value of the token.
    pub fn get(&self, token: Token) -> Option<&T> {
        self.slab.get(token).map(|node| &node.val)
    }

    /// Get the mutable value of the token.
    pub fn get_mut(&mut self, token: Token) -> Option<&mut T> {
        self.slab.get_mut(token).map(|node| &mut node.val)
    }

    /// Link a value at the front.
    pub fn push_front(&mut self, val: T) -> Token {
        let token = self.slab.insert(Node {
            val,
            prev: None,
            next: None,
        });
        self.link_front(token);
        token
    }

    /// Link a value at the back.
    pub fn push_back(&mut self, val: T) -> Token {
        let token = self.slab.insert(Node {
            val,
            prev: None,
            next: None,
        });
        self.link_back(token);
        token
    }

    /// Unlink and return the newest value.
    pub fn pop_front(&mut self) -> Option<T> {
        let token = self.head?;
        self.remove(token)
    }

    /// Unlink and return the oldest value.
    pub fn pop_back(&mut self) -> Option<T> {
        let token = self.tail?;
        self.remove(token)
    }

    /// Unlink and return the value of the token.
    ///
    /// Return `None` if the token is stale.
    pub fn remove(&mut self, token: Token) -> Option<T> {
        if !self.unlink(token) {
            return None;
        }
        self.slab.remove(token).map(|node| node.val)
    }

    /// Move the node of the token to the front.
    ///
    /// Return `false` if the token is stale.
    pub fn move_to_front(&mut self, token: Token) -> bool {
        if self.head == Some(token) {
            return self.slab.contains(token);
        }
        if !self.unlink(token) {
            return false;
        }
        self.link_front(token);
        true
    }

    /// Iterate from the front (newest) to the back (oldest).
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            token: self.head,
            list: self,
        }
    }

    /// Count of linked values.
    pub fn len(&self) -> usize {
        self.slab.len()
    }

    /// Return `true` if nothing is linked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all values.
    pub fn clear(&mut self) {
        self.slab.clear();
        self.head = None;
        self.tail = None;
    }

    fn link_front(&mut self, token: Token) {
        let old = self.head;
        if let Some(node) = self.slab.get_mut(token) {
            node.prev = None;
            node.next = old;
        }
        match old.and_then(|old| self.slab.get_mut(old)) {
            Some(node) => node.prev = Some(token),
            None => self.tail = Some(token),
        }
        self.head = Some(token);
    }

    fn link_back(&mut self, token: Token) {
        let old = self.tail;
        if let Some(node) = self.slab.get_mut(token) {
            node.prev = old;
            node.next = None;
        }
        match old.and_then(|old| self.slab.get_mut(old)) {
            Some(node) => node.next = Some(token),
            None => self.head = Some(token),
        }
        self.tail = Some(token);
    }

    fn unlink(&mut self, token: Token) -> bool {
        let (prev, next) = match self.slab.get_mut(token) {
            Some(node) => (node.prev.take(), node.next.take()),
            None => return false,
        };

        match prev.and_then(|prev| self.slab.get_mut(prev)) {
            Some(node) => node.next = next,
            None => self.head = next,
        }
        match next.and_then(|next| self.slab.get_mut(next)) {
            Some(node) => node.prev = prev,
            None => self.tail = prev,
        }

        true
    }
}

impl<T> Extend<T> for SlabLinkedList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        iter.into_iter().for_each(|val| {
            self.push_back(val);
        })
    }
}

impl<T> FromIterator<T> for SlabLinkedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

/// Iterator from the front to the back of a [`SlabLinkedList`].
pub struct Iter<'a, T> {
    token: Option<Token>,
    list: &'a SlabLinkedList<T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.slab.get(self.token?)?;
        self.token = node.next;
        Some(&node.val)
    }
}

/// Owning iterator from the front to the back of a [`SlabLinkedList`].
pub struct IntoIter<T> {
    list: SlabLinkedList<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.list.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.list.len(), Some(self.list.len()))
    }
}

impl<T> IntoIterator for SlabLinkedList<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { list: self }
    }
}

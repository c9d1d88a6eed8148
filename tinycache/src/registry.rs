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

use std::sync::Arc;

use hashbrown::{hash_map::Entry, HashMap};
use itertools::Itertools;
use parking_lot::RwLock;
use tinycache_common::error::{Error, ErrorKind, Result};

use crate::group::{Group, GroupBuilder};

/// Process-wide table of groups by name.
///
/// A peer serving fetch requests resolves [`crate::FetchRequest::group`] here.
#[derive(Debug, Default)]
pub struct Registry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group under its name.
    pub fn register(&self, group: impl Into<Arc<Group>>) -> Result<Arc<Group>> {
        let group = group.into();
        match self.groups.write().entry(group.name().to_string()) {
            Entry::Occupied(_) => Err(Error::new(ErrorKind::DuplicateGroup, "group name is taken")
                .with_context("group", group.name())),
            Entry::Vacant(e) => {
                tracing::debug!("[registry]: register group {}", group.name());
                Ok(e.insert(group).clone())
            }
        }
    }

    /// Build a group and register it.
    pub fn create(&self, builder: GroupBuilder) -> Result<Arc<Group>> {
        self.register(builder.build()?)
    }

    /// Look up a group by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }

    /// Sorted names of the registered groups.
    pub fn names(&self) -> Vec<String> {
        self.groups.read().keys().cloned().sorted().collect_vec()
    }

    /// Count of registered groups.
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Return `true` if no group is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

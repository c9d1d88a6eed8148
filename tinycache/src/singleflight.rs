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

use std::{fmt::Debug, sync::Arc};

use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex};
use tinycache_common::error::{Error, ErrorKind, Result};

struct Call<T> {
    result: Mutex<Option<Result<T>>>,
    done: Condvar,
}

impl<T> Call<T>
where
    T: Clone,
{
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn wait(&self) -> Result<T> {
        let mut result = self.result.lock();
        loop {
            if let Some(res) = result.as_ref() {
                return res.clone();
            }
            self.done.wait(&mut result);
        }
    }
}

/// Completes the call of the leader, even if the leader unwinds.
struct Completion<'a, T>
where
    T: Clone,
{
    flight: &'a SingleFlight<T>,
    key: &'a str,
    call: Arc<Call<T>>,
    completed: bool,
}

impl<T> Completion<'_, T>
where
    T: Clone,
{
    fn complete(&mut self, res: Result<T>) {
        if self.completed {
            return;
        }
        self.completed = true;

        *self.call.result.lock() = Some(res);
        self.flight.calls.lock().remove(self.key);
        self.call.done.notify_all();
    }
}

impl<T> Drop for Completion<'_, T>
where
    T: Clone,
{
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!("[singleflight]: in-flight call unwound, wake waiters, key: {}", self.key);
            self.complete(Err(Error::new(
                ErrorKind::Interrupted,
                "in-flight call finished without a result",
            )
            .with_context("key", self.key)));
        }
    }
}

/// Coalesces concurrent calls with the same key into one execution.
///
/// The first caller of a key runs the function on its own thread. Callers that arrive while it runs block until it
/// finishes and receive a clone of its result. Once the result is published, the key is free again, so a later
/// call runs the function again.
pub struct SingleFlight<T> {
    calls: Mutex<HashMap<String, Arc<Call<T>>>>,
}

impl<T> Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &self.calls.lock().len())
            .finish()
    }
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone,
{
    /// Create an empty coalescer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` for the key, or wait for the in-flight run of the key.
    pub fn run<F>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        self.run_shared(key, f).0
    }

    /// Run `f` for the key, or wait for the in-flight run of the key.
    ///
    /// The returned flag is `true` if the result was produced by another caller.
    pub fn run_shared<F>(&self, key: &str, f: F) -> (Result<T>, bool)
    where
        F: FnOnce() -> Result<T>,
    {
        let call = {
            let mut calls = self.calls.lock();
            if let Some(call) = calls.get(key).cloned() {
                drop(calls);
                return (call.wait(), true);
            }
            let call = Arc::new(Call::new());
            calls.insert(key.to_string(), call.clone());
            call
        };

        let mut completion = Completion {
            flight: self,
            key,
            call,
            completed: false,
        };
        let res = f();
        completion.complete(res.clone());
        (res, false)
    }

    /// Count of keys with a run in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }
}

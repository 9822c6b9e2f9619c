//! Execution-scoped key-value storage owned by the caller.
//!
//! Tool invocations read and write credentials and externally supplied auth
//! responses here; the storage medium itself belongs to the agent runtime.
//!
//! - **Native**: `dashmap::DashMap` for lock-free concurrent access
//! - **WASM**: `RefCell<HashMap>` (single-threaded)

use serde_json::Value;
use std::sync::Arc;

use crate::{MaybeSend, MaybeSync};

#[cfg(all(target_os = "wasi", target_env = "p1"))]
use std::cell::RefCell;

#[cfg(all(target_os = "wasi", target_env = "p1"))]
use std::collections::HashMap as StdHashMap;

#[cfg(not(all(target_os = "wasi", target_env = "p1")))]
type StateMap = Arc<dashmap::DashMap<String, Value>>;

#[cfg(all(target_os = "wasi", target_env = "p1"))]
type StateMap = Arc<RefCell<StdHashMap<String, Value>>>;

/// Storage for execution-scoped JSON values, keyed by string.
pub trait ExecutionState: MaybeSend + MaybeSync {
    /// Persists a JSON value under the provided key, replacing any previous value.
    fn set_state(&self, key: &str, value: Value);

    /// Retrieves a clone of the value stored under `key`.
    fn get_state(&self, key: &str) -> Option<Value>;

    /// Removes and returns the value stored under `key`.
    fn remove_state(&self, key: &str) -> Option<Value>;
}

/// Default in-memory implementation.
///
/// Cloning shares the underlying map.
#[derive(Clone)]
pub struct DefaultExecutionState {
    state: StateMap,
}

impl DefaultExecutionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(not(all(target_os = "wasi", target_env = "p1")))]
    fn create_state() -> StateMap {
        Arc::new(dashmap::DashMap::default())
    }

    #[cfg(all(target_os = "wasi", target_env = "p1"))]
    fn create_state() -> StateMap {
        Arc::new(RefCell::new(StdHashMap::new()))
    }
}

impl Default for DefaultExecutionState {
    fn default() -> Self {
        Self {
            state: Self::create_state(),
        }
    }
}

#[cfg(not(all(target_os = "wasi", target_env = "p1")))]
impl ExecutionState for DefaultExecutionState {
    fn set_state(&self, key: &str, value: Value) {
        self.state.insert(key.to_owned(), value);
    }

    fn get_state(&self, key: &str) -> Option<Value> {
        self.state.get(key).map(|entry| entry.value().clone())
    }

    fn remove_state(&self, key: &str) -> Option<Value> {
        self.state.remove(key).map(|(_, value)| value)
    }
}

#[cfg(all(target_os = "wasi", target_env = "p1"))]
impl ExecutionState for DefaultExecutionState {
    fn set_state(&self, key: &str, value: Value) {
        self.state.borrow_mut().insert(key.to_owned(), value);
    }

    fn get_state(&self, key: &str) -> Option<Value> {
        self.state.borrow().get(key).cloned()
    }

    fn remove_state(&self, key: &str) -> Option<Value> {
        self.state.borrow_mut().remove(key)
    }
}

//! Execution context shared across a task graph.
//!
//! An [`ExecutionContext`] is a thread-safe key/value bag plus an optional
//! handle to the [`TaskExecutor`] that runs the graph. Dependent tasks use
//! the executor handle to launch their own dependencies onto the same pool.
//!
//! Values are stored type-erased. Each single `get`/`set` is atomic; there is
//! no transactional guarantee across keys, so concurrently running tasks
//! should treat every key as an independent cell.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

use crate::execution::TaskExecutor;

type ObjectMap = HashMap<String, Arc<dyn Any + Send + Sync>>;

/// Errors that can occur when reading from the context.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Key was not found in the context.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Key exists but holds a value of a different type.
    #[error("type mismatch for key '{key}': expected {expected}")]
    TypeMismatch { key: String, expected: &'static str },
}

/// Shared key/value bag and executor back-reference for a task graph.
///
/// `ExecutionContext` is `Clone`; clones share the same object map and the
/// same executor handle. One context is typically created by the caller and
/// passed to every task reached from it.
#[derive(Clone)]
pub struct ExecutionContext {
    objects: Arc<RwLock<ObjectMap>>,
    executor: Option<TaskExecutor>,
}

impl ExecutionContext {
    /// Create a context bound to `executor`.
    pub fn new(executor: TaskExecutor) -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            executor: Some(executor),
        }
    }

    /// Create a context with no executor.
    ///
    /// Plain tasks run fine against it; a dependent task that declares
    /// dependencies fails with [`TaskError::MissingExecutor`](crate::TaskError::MissingExecutor).
    pub fn detached() -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            executor: None,
        }
    }

    /// The executor this context was created with, if any.
    pub fn executor(&self) -> Option<&TaskExecutor> {
        self.executor.as_ref()
    }

    /// Store `object` under `name`, replacing any previous value.
    ///
    /// Passing `None` removes the key.
    pub fn set_object<T>(&self, name: impl Into<String>, object: Option<T>)
    where
        T: Any + Send + Sync,
    {
        let name = name.into();
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        match object {
            Some(value) => {
                objects.insert(name, Arc::new(value));
            }
            None => {
                objects.remove(&name);
            }
        }
    }

    /// Store an already shared value under `name` without re-wrapping it.
    pub fn set_shared<T>(&self, name: impl Into<String>, object: Arc<T>)
    where
        T: Any + Send + Sync,
    {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), object);
    }

    /// Get the value stored under `name`.
    ///
    /// Returns `None` if the key is absent or holds a different type.
    pub fn get_object<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.try_get_object(name).ok()
    }

    /// Get the value stored under `name`, reporting why it is unavailable.
    pub fn try_get_object<T>(&self, name: &str) -> Result<Arc<T>, ContextError>
    where
        T: Any + Send + Sync,
    {
        let value = self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| ContextError::KeyNotFound(name.to_string()))?;
        value.downcast::<T>().map_err(|_| ContextError::TypeMismatch {
            key: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Remove the value stored under `name`, returning whether it existed.
    pub fn remove_object(&self, name: &str) -> bool {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    /// Check if a key exists in the context.
    pub fn contains(&self, name: &str) -> bool {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Get all keys in the context.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no objects are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("keys", &self.keys())
            .field("has_executor", &self.executor.is_some())
            .finish()
    }
}

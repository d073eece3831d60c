//! Identifier types for launched tasks.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a single launch of a task.
///
/// The same task instance may be launched many times; each launch gets its
/// own `LaunchId` and its own [`TaskStatus`](crate::TaskStatus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LaunchId(Uuid);

impl LaunchId {
    /// Generate a new random LaunchId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a LaunchId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LaunchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LaunchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

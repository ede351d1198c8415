//! Operation plumbing shared by every engine stage.
//!
//! - [`cancel`]: cooperative cancellation checked between chunks and layers
//! - [`listener`]: progress observation

pub mod cancel;
pub mod listener;

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier attached to the tracing span of one engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub Uuid);

impl OperationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_ids_are_unique() {
        assert_ne!(OperationId::new(), OperationId::new());
    }
}

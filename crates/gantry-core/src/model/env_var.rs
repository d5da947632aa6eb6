//! Environment variable records and their grouping.

use crate::ids::VariableGroupId;
use crate::scope::VariableScope;
use serde::{Deserialize, Serialize};

/// A single scoped `key = value` override.
///
/// Key, value, and scope must all be present; the resolver rejects empty
/// keys and values, and [`VariableScope::parse`] rejects malformed scopes
/// at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    /// Variable name
    pub key: String,

    /// Variable value
    pub value: String,

    /// Where this override applies
    pub scope: VariableScope,
}

impl EnvironmentVariable {
    /// Construct a variable with the given scope.
    pub fn new(key: impl Into<String>, value: impl Into<String>, scope: VariableScope) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            scope,
        }
    }
}

/// A named, reusable collection of environment variables.
///
/// Groups are attached to stages and iterated in a fixed caller-supplied
/// order (name order by convention) during resolution, which makes
/// same-precedence collisions deterministic: the last definition wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentVariableGroup {
    /// Unique identifier
    pub id: VariableGroupId,

    /// Group name, unique across the installation
    pub name: String,

    /// Variables owned by this group, in definition order
    pub variables: Vec<EnvironmentVariable>,
}

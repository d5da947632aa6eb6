//! Environment and deploy-group records.

use crate::ids::{DeployGroupId, EnvironmentId};
use serde::{Deserialize, Serialize};

/// A deployment environment (e.g. staging, production).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    /// Unique identifier
    pub id: EnvironmentId,

    /// Environment name
    pub name: String,

    /// Whether deploys here count as production deploys
    #[serde(default)]
    pub production: bool,
}

/// A group of hosts inside one environment that a stage deploys to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployGroup {
    /// Unique identifier
    pub id: DeployGroupId,

    /// Deploy group name
    pub name: String,

    /// Owning environment
    pub environment_id: EnvironmentId,
}

//! Project record.

use crate::ids::ProjectId;
use serde::{Deserialize, Serialize};

/// A deployable project owning an ordered collection of stages.
///
/// Stage ordering itself lives on the [`Stage`](crate::model::Stage) records
/// (their `order` field); the project is the identity the pipeline graph
/// scopes its critical sections to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier
    pub id: ProjectId,

    /// Project name
    pub name: String,
}

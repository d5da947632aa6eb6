//! gantry-core - Core library for Gantry
//!
//! This crate provides the shared deployment data model, typed identifiers,
//! scoped environment-variable resolution, engine configuration, and the
//! in-memory record store used by the Gantry engine.

pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod scope;
pub mod store;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use ids::{
    CommandId, DeployGroupId, DeployId, EnvironmentId, ProjectId, StageId, UserId, VariableGroupId,
};
pub use model::{
    Deploy, DeployGroup, DeployStatus, Environment, EnvironmentVariable, EnvironmentVariableGroup,
    Lock, LockTarget, Project, ResolvedEnv, ResourceKind, Stage, StageDraft, User,
};
pub use scope::{resolve, ResolveContext, VariableScope};
pub use store::MemoryStore;

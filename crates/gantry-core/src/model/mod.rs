//! Deployment data model shared across the Gantry workspace.

mod deploy;
mod env_var;
mod environment;
mod lock;
mod project;
mod stage;
mod user;

pub use deploy::{Deploy, DeployStatus, ResolvedEnv};
pub use env_var::{EnvironmentVariable, EnvironmentVariableGroup};
pub use environment::{DeployGroup, Environment};
pub use lock::{Lock, LockTarget, ResourceKind};
pub use project::Project;
pub use stage::{Stage, StageDraft};
pub use user::User;

//! gantry-engine - Deployment control services for Gantry
//!
//! Builds the stateful half of the control core on top of `gantry-core`:
//! process-wide lock management, stage pipeline maintenance (ordering,
//! cloning, chain edges), deploy scheduling with the single-active-deploy
//! guarantee, and automated-failure notification.

pub mod hooks;
pub mod locks;
pub mod notifier;
pub mod pipeline;
pub mod scheduler;

#[cfg(test)]
mod testutil;

pub use hooks::CloneHooks;
pub use locks::LockManager;
pub use notifier::{ChangesetProvider, FailureNotifier};
pub use pipeline::PipelineGraph;
pub use scheduler::DeployScheduler;

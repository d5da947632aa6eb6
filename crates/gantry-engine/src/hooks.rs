//! Extension hooks fired during pipeline mutations.

use gantry_core::model::Stage;
use std::sync::RwLock;

/// Callback invoked when a stage is cloned, before the clone is persisted.
///
/// Receives the template stage and a mutable reference to the unsaved
/// clone, so plugins can adjust copied attributes.
pub type StageCloneHook = Box<dyn Fn(&Stage, &mut Stage) + Send + Sync>;

/// Registry of stage-clone hooks.
#[derive(Default)]
pub struct CloneHooks {
    hooks: RwLock<Vec<StageCloneHook>>,
}

impl CloneHooks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook to run on every stage clone.
    pub fn on_stage_clone(&self, hook: impl Fn(&Stage, &mut Stage) + Send + Sync + 'static) {
        self.hooks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Box::new(hook));
    }

    /// Fire all registered hooks in registration order.
    pub fn fire_stage_clone(&self, template: &Stage, clone: &mut Stage) {
        for hook in self.hooks.read().unwrap_or_else(|e| e.into_inner()).iter() {
            hook(template, clone);
        }
    }
}

impl std::fmt::Debug for CloneHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.hooks.read().unwrap_or_else(|e| e.into_inner()).len();
        f.debug_struct("CloneHooks").field("hooks", &count).finish()
    }
}

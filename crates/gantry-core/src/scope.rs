//! Scoped environment-variable resolution.
//!
//! Environment variables carry a scope restricting where they apply:
//! everywhere, one environment, or one deploy group. Resolution flattens a
//! layered set of overrides into a single effective `key -> value` map for
//! a concrete deploy target. Pure functions only; safe to call from any
//! number of threads.

use crate::error::{CoreError, CoreResult};
use crate::ids::{DeployGroupId, EnvironmentId};
use crate::model::EnvironmentVariableGroup;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where an environment variable applies.
///
/// Parsed once at the boundary from its string form; downstream code only
/// ever sees the tagged enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableScope {
    /// Applies to every deploy target
    All,
    /// Applies only to targets inside the given environment
    Environment(EnvironmentId),
    /// Applies only to the given deploy group
    DeployGroup(DeployGroupId),
}

impl VariableScope {
    /// Parse a scope from its boundary string form.
    ///
    /// Accepts `All` (or the legacy bare `0`), `Environment:<id>`, and
    /// `DeployGroup:<id>`. Legacy dotted forms (`Environment.<id>`) are
    /// accepted and normalised. Anything else is a validation error.
    pub fn parse(s: &str) -> CoreResult<Self> {
        let s = s.trim();
        if s == "All" || s == "0" {
            return Ok(VariableScope::All);
        }

        let (kind, id) = s
            .split_once(':')
            .or_else(|| s.split_once('.'))
            .ok_or_else(|| CoreError::validation(format!("malformed variable scope: {s:?}")))?;

        let id: u64 = id
            .parse()
            .map_err(|_| CoreError::validation(format!("malformed scope id in {s:?}")))?;

        match kind {
            "Environment" => Ok(VariableScope::Environment(EnvironmentId::new(id))),
            "DeployGroup" => Ok(VariableScope::DeployGroup(DeployGroupId::new(id))),
            _ => Err(CoreError::validation(format!(
                "unknown variable scope kind: {kind:?}"
            ))),
        }
    }

    /// Precedence tier when applied to `ctx`: `None` when the scope does not
    /// match, otherwise a rank where higher wins on key collision.
    fn precedence(self, ctx: &ResolveContext) -> Option<u8> {
        match self {
            VariableScope::All => Some(0),
            VariableScope::Environment(id) => (ctx.environment_id == Some(id)).then_some(1),
            VariableScope::DeployGroup(id) => (ctx.deploy_group_id == Some(id)).then_some(2),
        }
    }
}

impl std::fmt::Display for VariableScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableScope::All => f.write_str("All"),
            VariableScope::Environment(id) => write!(f, "Environment:{id}"),
            VariableScope::DeployGroup(id) => write!(f, "DeployGroup:{id}"),
        }
    }
}

/// The deploy target a variable set is resolved for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveContext {
    pub environment_id: Option<EnvironmentId>,
    pub deploy_group_id: Option<DeployGroupId>,
}

impl ResolveContext {
    /// Context for a target inside `environment_id` / `deploy_group_id`.
    pub fn new(
        environment_id: Option<EnvironmentId>,
        deploy_group_id: Option<DeployGroupId>,
    ) -> Self {
        Self {
            environment_id,
            deploy_group_id,
        }
    }
}

/// Resolve the effective variable map for one deploy target.
///
/// Groups are applied in the caller-supplied order (name order by
/// convention). On key collision the higher-precedence scope wins
/// (DeployGroup > Environment > All); within the same tier the
/// last-defined value wins. Variables scoped to a non-matching environment
/// or deploy group are skipped silently.
pub fn resolve<'a>(
    groups: impl IntoIterator<Item = &'a EnvironmentVariableGroup>,
    ctx: &ResolveContext,
) -> CoreResult<BTreeMap<String, String>> {
    let mut chosen: BTreeMap<String, (u8, String)> = BTreeMap::new();

    for group in groups {
        for var in &group.variables {
            if var.key.is_empty() {
                return Err(CoreError::validation(format!(
                    "empty variable key in group {:?}",
                    group.name
                )));
            }
            if var.value.is_empty() {
                return Err(CoreError::validation(format!(
                    "empty value for variable {:?} in group {:?}",
                    var.key, group.name
                )));
            }

            let Some(tier) = var.scope.precedence(ctx) else {
                continue;
            };

            match chosen.get(&var.key) {
                // Same tier: last definition wins, so >= replaces.
                Some((existing, _)) if *existing > tier => {}
                _ => {
                    chosen.insert(var.key.clone(), (tier, var.value.clone()));
                }
            }
        }
    }

    Ok(chosen
        .into_iter()
        .map(|(key, (_, value))| (key, value))
        .collect())
}

#[cfg(test)]
#[path = "scope_test.rs"]
mod tests;

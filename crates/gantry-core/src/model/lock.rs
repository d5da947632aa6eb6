//! Lock record and its target taxonomy.

use crate::ids::{ProjectId, StageId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of resource a lock can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Stage,
    Project,
    Environment,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceKind::Stage => "stage",
            ResourceKind::Project => "project",
            ResourceKind::Environment => "environment",
        };
        f.write_str(s)
    }
}

/// What a lock covers: everything, or one specific resource.
///
/// The tagged `{kind, id}` pair replaces a polymorphic association; the
/// global singleton is its own variant rather than a magic null resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockTarget {
    /// The global lock; blocks every resource
    Global,
    /// A single resource
    Resource { kind: ResourceKind, id: u64 },
}

impl LockTarget {
    /// Target covering one stage.
    pub fn stage(id: StageId) -> Self {
        LockTarget::Resource {
            kind: ResourceKind::Stage,
            id: id.as_u64(),
        }
    }

    /// Target covering one project.
    pub fn project(id: ProjectId) -> Self {
        LockTarget::Resource {
            kind: ResourceKind::Project,
            id: id.as_u64(),
        }
    }
}

impl std::fmt::Display for LockTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockTarget::Global => f.write_str("global"),
            LockTarget::Resource { kind, id } => write!(f, "{kind} {id}"),
        }
    }
}

/// A live lock held by one user over one target.
///
/// `warning` distinguishes soft locks (advisory, bypassable by policy) from
/// hard locks (never bypassed). A lock whose `expires_at` has passed is
/// treated as absent everywhere, never as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lock {
    /// Opaque token identifying this particular acquisition
    pub token: Uuid,

    /// What the lock covers
    pub target: LockTarget,

    /// User holding the lock
    pub owner: UserId,

    /// Soft (warning) lock vs hard lock
    pub warning: bool,

    /// Lazy expiry deadline, if any
    pub expires_at: Option<DateTime<Utc>>,

    /// When the lock was acquired
    pub created_at: DateTime<Utc>,
}

impl Lock {
    /// Create a lock over `target` held by `owner`.
    pub fn new(
        target: LockTarget,
        owner: UserId,
        warning: bool,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            token: Uuid::new_v4(),
            target,
            owner,
            warning,
            expires_at,
            created_at: Utc::now(),
        }
    }

    /// Whether the lock has lapsed as of `now`.
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_lock_without_expiry_never_expires() {
        let lock = Lock::new(LockTarget::Global, UserId::new(1), false, None);
        assert!(!lock.expired(Utc::now() + Duration::days(365)));
    }

    #[test]
    fn test_lock_expiry() {
        let now = Utc::now();
        let lock = Lock::new(
            LockTarget::stage(StageId::new(1)),
            UserId::new(1),
            true,
            Some(now + Duration::minutes(5)),
        );
        assert!(!lock.expired(now));
        assert!(lock.expired(now + Duration::minutes(5)));
    }

    #[test]
    fn test_target_display() {
        assert_eq!(LockTarget::Global.to_string(), "global");
        assert_eq!(LockTarget::stage(StageId::new(3)).to_string(), "stage 3");
    }
}

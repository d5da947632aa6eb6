//! Process-wide lock management.
//!
//! One lock table behind a single mutex: the global lock must exclude
//! resource-specific checks too, so every acquire/check/release shares one
//! critical section. That keeps concurrent acquires on the same target
//! linearizable by construction. Expired locks are treated as absent and
//! reaped lazily; expiry is never reported as an error.

use chrono::{DateTime, Duration, Utc};
use gantry_core::config::Config;
use gantry_core::error::{CoreError, CoreResult};
use gantry_core::ids::UserId;
use gantry_core::model::{Lock, LockTarget};
use std::collections::HashMap;
use std::sync::Mutex;

/// Holds all live locks for the process.
///
/// Starts empty; locks persist until released or expired, there is no
/// implicit teardown.
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<HashMap<LockTarget, Lock>>,
    default_ttl: Option<Duration>,
}

impl LockManager {
    /// Create a manager with no locks held and no default expiry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager applying the configured default lock lifetime to
    /// acquisitions that do not pass an explicit expiry.
    pub fn from_config(config: &Config) -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            default_ttl: config
                .default_lock_ttl_minutes
                .map(|minutes| Duration::minutes(minutes as i64)),
        }
    }

    /// Acquire a lock over `target` for `owner`.
    ///
    /// Fails with [`CoreError::AlreadyLocked`] if a live lock exists for
    /// that exact target, or globally. A lapsed lock on the target is
    /// removed and acquisition proceeds. When no expiry is given the
    /// manager's default lifetime applies, if one is configured.
    pub fn acquire(
        &self,
        target: LockTarget,
        owner: UserId,
        warning: bool,
        expires_at: Option<DateTime<Utc>>,
    ) -> CoreResult<Lock> {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        let expires_at = expires_at.or_else(|| self.default_ttl.map(|ttl| now + ttl));

        // A global lock blocks every resource-specific acquire as well.
        if target != LockTarget::Global {
            if let Some(global) = Self::live_entry(&mut table, LockTarget::Global, now) {
                return Err(CoreError::AlreadyLocked {
                    target: LockTarget::Global.to_string(),
                    owner: global.owner.as_u64(),
                });
            }
        }

        if let Some(existing) = Self::live_entry(&mut table, target, now) {
            return Err(CoreError::AlreadyLocked {
                target: target.to_string(),
                owner: existing.owner.as_u64(),
            });
        }

        let lock = Lock::new(target, owner, warning, expires_at);
        log::debug!("lock acquired on {} by user {}", lock.target, lock.owner);
        table.insert(target, lock.clone());
        Ok(lock)
    }

    /// Release the lock on `target`, returning it if one was held.
    ///
    /// Releasing an unheld target is a no-op, not an error.
    pub fn release(&self, target: LockTarget) -> Option<Lock> {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        let released = table.remove(&target);
        if let Some(lock) = &released {
            log::debug!("lock released on {} by user {}", lock.target, lock.owner);
        }
        released
    }

    /// The live lock covering `target`, if any.
    ///
    /// For resource targets the global lock is checked first and wins, so a
    /// global lock is what callers see while it is held.
    pub fn locked(&self, target: LockTarget) -> Option<Lock> {
        self.covering(target).into_iter().next()
    }

    /// All live locks covering `target`: the global lock (for resource
    /// targets) and the exact entry, in that order.
    ///
    /// Policy decisions that must consider every holder — not just the
    /// winning lock — go through this instead of [`locked`](Self::locked).
    pub fn covering(&self, target: LockTarget) -> Vec<Lock> {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        let mut locks = Vec::new();

        if target != LockTarget::Global {
            if let Some(global) = Self::live_entry(&mut table, LockTarget::Global, now) {
                locks.push(global);
            }
        }
        if let Some(lock) = Self::live_entry(&mut table, target, now) {
            locks.push(lock);
        }
        locks
    }

    /// Number of live locks held.
    pub fn len(&self) -> usize {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        table.retain(|_, lock| !lock.expired(now));
        table.len()
    }

    /// Whether no locks are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return a live clone of the entry for `target`, lazily reaping it if
    /// it has expired. Must be called with the table mutex held.
    fn live_entry(
        table: &mut HashMap<LockTarget, Lock>,
        target: LockTarget,
        now: DateTime<Utc>,
    ) -> Option<Lock> {
        match table.get(&target) {
            Some(lock) if lock.expired(now) => {
                log::debug!("lock on {} expired, treating as absent", lock.target);
                table.remove(&target);
                None
            }
            Some(lock) => Some(lock.clone()),
            None => None,
        }
    }
}

#[cfg(test)]
#[path = "locks_test.rs"]
mod tests;

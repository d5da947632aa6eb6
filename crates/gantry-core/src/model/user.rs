//! User record.

use crate::ids::UserId;
use serde::{Deserialize, Serialize};

/// A user able to trigger deploys and hold locks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: UserId,

    /// Email address
    pub email: String,

    /// Whether this is an automation/integration identity rather than a
    /// human; only failures triggered by these are auto-notified
    #[serde(default)]
    pub integration: bool,
}

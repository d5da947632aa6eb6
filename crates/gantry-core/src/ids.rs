//! Strongly-typed numeric identifiers for every record kind.
//!
//! All ids share the same representation (a `u64` handed out by the record
//! store) and the same set of trait impls (Display, From, Serialize,
//! Deserialize, Ord, Hash). The macro generates all of that from a single
//! invocation so a `StageId` can never be passed where a `DeployId` is
//! expected.

/// Define a strongly-typed numeric id newtype.
///
/// Generates:
/// - The struct with `Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord`
/// - Transparent `Serialize`/`Deserialize`
/// - `new()`, `as_u64()`
/// - `Display`, `From<u64>`, `From<$Name> for u64`
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        $vis struct $Name(u64);

        impl $Name {
            /// Wrap a raw id value.
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Return the raw id value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $Name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$Name> for u64 {
            fn from(id: $Name) -> u64 {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of a [`Project`](crate::model::Project).
    pub struct ProjectId;
}

define_id! {
    /// Identifier of a [`Stage`](crate::model::Stage).
    pub struct StageId;
}

define_id! {
    /// Identifier of a [`Deploy`](crate::model::Deploy).
    pub struct DeployId;
}

define_id! {
    /// Identifier of an [`Environment`](crate::model::Environment).
    pub struct EnvironmentId;
}

define_id! {
    /// Identifier of a [`DeployGroup`](crate::model::DeployGroup).
    pub struct DeployGroupId;
}

define_id! {
    /// Identifier of an [`EnvironmentVariableGroup`](crate::model::EnvironmentVariableGroup).
    pub struct VariableGroupId;
}

define_id! {
    /// Identifier of a stage command.
    pub struct CommandId;
}

define_id! {
    /// Identifier of a [`User`](crate::model::User).
    pub struct UserId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = StageId::new(42);
        assert_eq!(id.as_u64(), 42);
        assert_eq!(u64::from(id), 42);
        assert_eq!(StageId::from(42), id);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(format!("{}", DeployId::new(7)), "7");
    }

    #[test]
    fn test_id_ord() {
        assert!(DeployId::new(1) < DeployId::new(2));
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = ProjectId::new(3);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "3");
        let back: ProjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}

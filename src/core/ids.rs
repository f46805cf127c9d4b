//! String-backed identifiers for content-defined entities.
//!
//! Content (resources, stats, passives, actions, ...) is keyed by the ids
//! authors write in registry tables. Each id kind gets its own newtype so a
//! `ResourceId` can never be passed where a `StatKey` is expected.
//!
//! All ids implement `Borrow<str>`, so maps keyed by an id can be queried
//! with a plain `&str`.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new id.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the raw id string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// A concrete resource or a group parent.
    ResourceId
);
string_id!(
    /// A resource group.
    GroupId
);
string_id!(
    /// A tier within a tier track.
    TierId
);
string_id!(
    /// A player stat.
    StatKey
);
string_id!(
    /// A passive definition (not the owner-qualified record key).
    PassiveId
);
string_id!(
    /// An action definition.
    ActionId
);
string_id!(
    /// A building definition.
    BuildingId
);
string_id!(
    /// A land development definition.
    DevelopmentId
);
string_id!(
    /// A population role.
    RoleId
);
string_id!(
    /// A turn phase.
    PhaseId
);
string_id!(
    /// A step within a phase.
    StepId
);

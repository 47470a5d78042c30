//! Type-safe identifier wrappers.
//!
//! Entities that come from configuration files (maps, nodes, characters,
//! NPCs, facilities, actions) carry the string identifiers the config
//! author chose, wrapped in newtypes so they cannot be mixed at compile
//! time. Entities created at runtime (conversation sessions, mid-term
//! memories) use UUID v7 (time-ordered) identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around an owned [`String`] identifier.
macro_rules! define_str_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an owned string as this identifier type.
            pub const fn new(raw: String) -> Self {
                Self(raw)
            }

            /// Return the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_str_id! {
    /// Identifier of a tile map (e.g. `town`, `home`).
    MapId
}

define_str_id! {
    /// Identifier of a path node within a map.
    ///
    /// Grid nodes follow the form `<mapPrefix>-<row>-<col>`; entrance
    /// node identifiers are arbitrary.
    NodeId
}

define_str_id! {
    /// Identifier of a simulated character.
    CharacterId
}

define_str_id! {
    /// Identifier of a static NPC.
    NpcId
}

define_str_id! {
    /// Identifier of a facility (attached to an obstacle).
    FacilityId
}

define_str_id! {
    /// Identifier of an obstacle on a map.
    ObstacleId
}

define_uuid_id! {
    /// Unique identifier for a conversation session.
    SessionId
}

define_uuid_id! {
    /// Unique identifier for a mid-term memory entry.
    MemoryId
}

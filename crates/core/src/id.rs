// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier types.
//!
//! Entity identifiers (`JobId`, `ClusterId`, `WorkflowId`, `NodeId`) are
//! thin wrappers around `i64`: the Store assigns them via `INTEGER PRIMARY
//! KEY AUTOINCREMENT`, so they are monotonically increasing and unique by
//! construction — no in-process ID generation is involved. Opaque
//! correlation identifiers (subscription topics, JSON-RPC string ids) use
//! [`random_token`] instead.

/// Generate a random, URL-safe opaque token (21 characters).
///
/// Used for [`crate::metrics`]-adjacent correlation ids such as event
/// subscription topics — never for entities the Store owns.
pub fn random_token() -> String {
    nanoid::nanoid!(21)
}

/// Define a newtype ID wrapper around `i64`.
///
/// The wrapped value is assigned by the Store (`INTEGER PRIMARY KEY
/// AUTOINCREMENT`); these types never generate their own values.
#[macro_export]
macro_rules! define_int_id {
    ($(#[$meta:meta])* pub struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub const fn new(v: i64) -> Self {
                Self(v)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(v: i64) -> Self {
                Self(v)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;

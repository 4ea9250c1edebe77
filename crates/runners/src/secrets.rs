// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential plumbing for remote clusters. Storage and provenance of
//! secrets are out of scope here; this module only defines the seam the
//! SSH pool calls into.

use cm_core::ClusterId;

/// An SSH credential: either a private key file or a keyring-stored
/// password. Never logged or serialized.
#[derive(Clone)]
pub enum Credentials {
    PrivateKeyFile { path: std::path::PathBuf, passphrase: Option<String> },
    Password(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::PrivateKeyFile { path, .. } => {
                f.debug_struct("PrivateKeyFile").field("path", path).finish_non_exhaustive()
            }
            Credentials::Password(_) => f.debug_tuple("Password").field(&"<redacted>").finish(),
        }
    }
}

/// Opaque collaborator resolving cluster ids to credentials. Implementations
/// live outside this crate (keyring, vault, environment); the connection
/// pool only ever calls `get`.
pub trait Secrets: Send + Sync {
    fn get(&self, cluster_id: ClusterId) -> Option<Credentials>;
}

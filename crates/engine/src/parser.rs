// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output-file scientific parsing is out of scope here: turning raw
//! CRYSTAL23/VASP/QE stdout into structured results (final energy, band
//! gap, convergence, ...) is the concern of a collaborator.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("output parsing failed: {0}")]
pub struct ParseError(pub String);

/// Parses a completed job's artifacts into a flat key/value result set,
/// consumed downstream via `{{upstream.<node>.<key>}}` placeholders.
pub trait OutputParser: Send + Sync {
    fn parse(&self, work_dir: &Path) -> Result<HashMap<String, String>, ParseError>;
}

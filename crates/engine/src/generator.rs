// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Input-file generation is out of scope here: rendering a `template_ref`
//! plus a resolved parameter string into the actual CRYSTAL23/VASP/QE input
//! deck is the concern of a collaborator, not the orchestrator.

use thiserror::Error;

#[derive(Debug, Error)]
#[error("input generation failed: {0}")]
pub struct GeneratorError(pub String);

/// Renders a node's prepared input from its template reference and
/// fully-resolved parameter string.
pub trait InputGenerator: Send + Sync {
    fn generate(&self, template_ref: &str, resolved_parameters: &str) -> Result<String, GeneratorError>;
}

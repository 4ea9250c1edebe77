// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal, format-agnostic default [`InputGenerator`]/[`OutputParser`]
//! implementations, satisfying the collaborator seams
//! [`cm_engine::orchestrator::Orchestrator`] requires at construction time.
//! Rendering an actual CRYSTAL23/VASP/QE input deck or parsing its stdout
//! for scientific quantities is out of scope for this daemon; a real
//! deployment swaps these for format-aware collaborators without touching
//! the orchestrator itself.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cm_engine::{GeneratorError, InputGenerator, OutputParser, ParseError};

/// Renders `template_ref` as a path under `template_dir`, appending the
/// fully-resolved parameter block verbatim.
pub struct FileInputGenerator {
    template_dir: PathBuf,
}

impl FileInputGenerator {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self { template_dir: template_dir.into() }
    }
}

impl InputGenerator for FileInputGenerator {
    fn generate(&self, template_ref: &str, resolved_parameters: &str) -> Result<String, GeneratorError> {
        let path = self.template_dir.join(template_ref);
        let template = std::fs::read_to_string(&path)
            .map_err(|err| GeneratorError(format!("reading template {}: {err}", path.display())))?;
        Ok(format!("{template}\n{resolved_parameters}\n"))
    }
}

/// Scrapes `<work_dir>/output` for `key = value` lines into a flat result
/// set. No knowledge of any specific code's output grammar.
pub struct KeyValueOutputParser {
    output_filename: String,
}

impl KeyValueOutputParser {
    pub fn new(output_filename: impl Into<String>) -> Self {
        Self { output_filename: output_filename.into() }
    }
}

impl OutputParser for KeyValueOutputParser {
    fn parse(&self, work_dir: &Path) -> Result<HashMap<String, String>, ParseError> {
        let path = work_dir.join(&self.output_filename);
        let text = std::fs::read_to_string(&path)
            .map_err(|err| ParseError(format!("reading output {}: {err}", path.display())))?;

        let mut results = HashMap::new();
        for line in text.lines() {
            if let Some((key, value)) = line.split_once('=') {
                results.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
#[path = "templates_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `{{upstream.<nodeName>.<key>}}` placeholder resolution.
//!
//! A node's `parameter_template` may reference the results of any upstream
//! node it (transitively) depends on. Unlike plain variable interpolation,
//! an unresolved reference here is not an error: it means the node is not
//! yet submittable, because the upstream result it needs doesn't exist yet.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{upstream\.([a-zA-Z_][a-zA-Z0-9_-]*)\.([a-zA-Z_][a-zA-Z0-9_.-]*)\}\}")
            .expect("static regex")
    })
}

/// Parsed result keys for one upstream node, looked up by name.
pub type UpstreamResults<'a> = HashMap<&'a str, &'a HashMap<String, String>>;

/// Outcome of attempting to resolve every placeholder in a template.
pub enum Resolution {
    /// Every placeholder resolved; the node can be submitted.
    Resolved(String),
    /// At least one referenced upstream node or key isn't available yet.
    /// Names the first missing reference, for diagnostics.
    Pending { node: String, key: String },
}

/// Substitute every `{{upstream.node.key}}` placeholder in `template` using
/// `results`. Returns [`Resolution::Pending`] on the first reference that
/// can't yet be resolved, rather than partially substituting.
pub fn resolve(template: &str, results: &UpstreamResults<'_>) -> Resolution {
    let mut missing = None;
    let resolved = placeholder_pattern().replace_all(template, |caps: &regex::Captures<'_>| {
        let node = &caps[1];
        let key = &caps[2];
        match results.get(node).and_then(|kv| kv.get(key)) {
            Some(value) => value.clone(),
            None => {
                if missing.is_none() {
                    missing = Some((node.to_string(), key.to_string()));
                }
                caps[0].to_string()
            }
        }
    });

    match missing {
        Some((node, key)) => Resolution::Pending { node, key },
        None => Resolution::Resolved(resolved.into_owned()),
    }
}

/// Every node name referenced by `{{upstream.<name>.*}}` placeholders in
/// `template`, used to compute a node's effective dependency set from its
/// parameter template rather than requiring it be declared twice.
pub fn referenced_upstream_nodes(template: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in placeholder_pattern().captures_iter(template) {
        let node = caps[1].to_string();
        if !seen.contains(&node) {
            seen.push(node);
        }
    }
    seen
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;

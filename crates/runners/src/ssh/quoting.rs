// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! POSIX shell quoting for values interpolated into remote driver scripts.
//!
//! Every path or filename that ends up inside a script run by `sh -c` on
//! a remote host must pass through [`quote`] first. This is a security
//! invariant, not an optimization.

/// Wrap `value` in single quotes, escaping any embedded single quote as
/// `'\''`. The result is safe to splice into a POSIX shell command line.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
    out
}

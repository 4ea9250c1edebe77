// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH execution backend: a pooled connection manager plus the runner
//! that drives jobs over it.

pub mod pool;
pub mod quoting;
pub mod runner;

pub use pool::{ConnectionPool, PooledConnection};
pub use runner::{ClusterLookup, SshRunner};

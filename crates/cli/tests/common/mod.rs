// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A short run: small holds so each cycle takes a few milliseconds
pub const FAST_CONFIG: &str = r#"
peers = 3
poll_interval = "5ms"
cycles = 2

[pool_a]
capacity = 2
hold = "3ms"
lease = "200ms"
early_release = "1ms"

[pool_b]
capacity = 1
hold = "2ms"
"#;

/// Write `contents` as `kex.toml` in a fresh directory
pub fn config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let path = temp.path().join("kex.toml");
    fs::write(&path, contents).expect("Failed to write config");
    (temp, path)
}

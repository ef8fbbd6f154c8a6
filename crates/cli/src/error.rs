// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing errors with context and suggestions.
//!
//! Each error carries:
//! - What went wrong (message)
//! - What was observed (context)
//! - How to fix it (suggestions)

use kex_core::ConfigError;
use kex_engine::{ClusterError, Violation};
use std::fmt;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct KexError {
    /// What went wrong
    pub message: String,
    /// What was observed
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
    /// Original error if any
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl KexError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Configuration from `origin` could not be used
    pub fn config_invalid(origin: &str, error: ConfigError) -> Self {
        KexError::new(format!("invalid configuration from {origin}"))
            .with_context(error.to_string())
            .with_suggestion("Print the defaults: kex config")
            .with_suggestion("Durations use humantime syntax, e.g. \"250ms\" or \"2s\"")
            .with_source(error)
    }

    /// The cluster stopped because a peer or task failed
    pub fn cluster_failed(error: ClusterError) -> Self {
        let err = KexError::new("cluster run failed").with_context(error.to_string());
        let err = match &error {
            ClusterError::PeerFailed { .. } => {
                err.with_suggestion("Rerun with RUST_LOG=debug to trace the failing peer")
            }
            ClusterError::TaskPanicked { .. } | ClusterError::MonitorFailed(_) => {
                err.with_suggestion("Rerun with RUST_BACKTRACE=1 to see the panic")
            }
            ClusterError::Config(_) => err.with_suggestion("Print the defaults: kex config"),
        };
        err.with_source(error)
    }

    /// A pool was held by more peers than its capacity
    pub fn exclusion_violated(violations: &[Violation]) -> Self {
        let mut err = KexError::new(format!(
            "k-exclusion violated {} time(s)",
            violations.len()
        ));
        for v in violations.iter().take(5) {
            let holders: Vec<String> = v.holders.iter().map(ToString::to_string).collect();
            err = err.with_context(format!(
                "pool {} (capacity {}) held by {} at event {}",
                v.class,
                v.capacity,
                holders.join(", "),
                v.event
            ));
        }
        err.with_suggestion("Rerun with --json for the full report")
    }
}

impl fmt::Display for KexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for KexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kex_core::{PeerId, ResourceClass};

    #[test]
    fn test_error_display() {
        let err = KexError::new("Something went wrong")
            .with_context("First context")
            .with_context("Second context")
            .with_suggestion("Try this")
            .with_suggestion("Or this");

        let output = format!("{}", err);
        assert!(output.contains("error: Something went wrong"));
        assert!(output.contains("-> First context"));
        assert!(output.contains("-> Second context"));
        assert!(output.contains("1. Try this"));
        assert!(output.contains("2. Or this"));
    }

    #[test]
    fn test_config_invalid_keeps_source() {
        let err = KexError::config_invalid("kex.toml", ConfigError::NoPeers);

        let output = format!("{}", err);
        assert!(output.contains("invalid configuration from kex.toml"));
        assert!(output.contains("-> peers must be at least 1"));
        assert!(output.contains("kex config"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_exclusion_violated_lists_holders() {
        let violation = Violation {
            class: ResourceClass::B,
            capacity: 1,
            holders: vec![PeerId(0), PeerId(2)],
            event: 17,
        };

        let output = format!("{}", KexError::exclusion_violated(&[violation]));
        assert!(output.contains("violated 1 time(s)"));
        assert!(output.contains("pool B (capacity 1) held by peer-0, peer-2 at event 17"));
    }
}

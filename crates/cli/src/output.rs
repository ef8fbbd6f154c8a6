// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use anyhow::Result;
use kex_engine::ClusterReport;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Print a finished run in the requested format
pub fn print_report(report: &ClusterReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render_text(report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

pub fn render_text(report: &ClusterReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} peers, {} cycles, {} events in {}ms",
        report.peers.len(),
        report.total_cycles(),
        report.events,
        report.elapsed_ms
    );

    let _ = writeln!(
        out,
        "\n{:<8} {:>6} {:>9} {:>8} {:>8} {:>6} {:>9}",
        "PEER", "CYCLES", "ABANDONED", "SKIPPED", "EXPIRED", "EARLY", "RECEIVED"
    );
    for p in &report.peers {
        let _ = writeln!(
            out,
            "{:<8} {:>6} {:>9} {:>8} {:>8} {:>6} {:>9}",
            p.peer.to_string(),
            p.stats.cycles,
            p.stats.abandoned,
            p.stats.skipped_b,
            p.stats.leases_expired,
            p.stats.early_releases,
            p.router.received
        );
    }

    let _ = writeln!(
        out,
        "\n{:<6} {:>8} {:>11} {:>10} {:>12}",
        "POOL", "CAPACITY", "MAX HOLDERS", "ADMISSIONS", "LONGEST HOLD"
    );
    for pool in &report.pools {
        let _ = writeln!(
            out,
            "{:<6} {:>8} {:>11} {:>10} {:>10}ms",
            pool.class.to_string(),
            pool.capacity,
            pool.max_holders,
            pool.admissions,
            pool.longest_hold_ms
        );
    }

    if report.is_safe() {
        let _ = writeln!(out, "\nviolations: none");
    } else {
        let _ = writeln!(out, "\nviolations: {}", report.violations.len());
    }
    out
}

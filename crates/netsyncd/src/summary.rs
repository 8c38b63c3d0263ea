//! Human-readable rendering of diffs and apply reports.

use std::fmt::Write;

use netsync_collect::CollectReport;
use netsync_core::{ApplyAction, ApplyReport, Diff};

/// Renders a diff as one line per change, grouped by kind.
///
/// ```text
/// + interface ams01-edge-01__Ethernet1/3
/// ~ interface ams01-edge-01__Ethernet1/1
///     description: "uplink" -> "core uplink"
/// - cable ams01-edge-01__Ethernet1/1__ams01-edge-02__Ethernet1/1
/// ```
pub fn render_diff(diff: &Diff) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "diff {} -> {}: {}", diff.source, diff.target, diff.summary());

    for group in &diff.groups {
        for id in &group.created {
            let _ = writeln!(out, "+ {} {}", group.kind, id);
        }
        for modified in &group.modified {
            let _ = writeln!(out, "~ {} {}", group.kind, modified.identity);
            for change in &modified.changes {
                let _ = writeln!(out, "    {}: {} -> {}", change.field, change.target, change.source);
            }
        }
        for id in &group.deleted {
            let _ = writeln!(out, "- {} {}", group.kind, id);
        }
    }
    out
}

/// Renders apply counts, failures and unresolved references.
pub fn render_report(report: &ApplyReport) -> String {
    let mut out = String::new();
    for action in [ApplyAction::Create, ApplyAction::Update, ApplyAction::Delete] {
        let counts = report.counts(action);
        let _ = writeln!(
            out,
            "{:<7} ok={} skipped={} failed={}",
            action.to_string(),
            counts.succeeded,
            counts.skipped,
            counts.failed
        );
    }
    for failure in &report.failures {
        let _ = writeln!(
            out,
            "FAILED {} {} {}: {}",
            failure.action, failure.kind, failure.identity, failure.error
        );
    }
    for unresolved in &report.unresolved {
        let _ = writeln!(
            out,
            "unresolved {}.{} on {} -> {} '{}'",
            unresolved.kind, unresolved.field, unresolved.identity, unresolved.target, unresolved.reference
        );
    }
    if report.aborted {
        let _ = writeln!(out, "aborted after first failure");
    }
    out
}

/// Renders the outcome of a live collection.
pub fn render_collect(report: &CollectReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "collected={} unreachable={} failed={} cables={} pruned_vlans={} removed_cables={}",
        report.collected.len(),
        report.unreachable.len(),
        report.failed.len(),
        report.cables,
        report.validation.pruned_vlans,
        report.validation.removed_cables.len()
    );
    for device in &report.unreachable {
        let _ = writeln!(out, "UNREACHABLE {}", device);
    }
    for failure in &report.failed {
        let _ = writeln!(out, "FAILED {}: {}", failure.device, failure.error);
    }
    for skipped in &report.skipped {
        let _ = writeln!(out, "skipped: {}", skipped);
    }
    out
}

use structcheck::engine::findings::RepairNote;
use structcheck::engine::report::{CheckKind, Report, ReportDiff};

/// Plain-text overview of a report: one line per check with findings or defects.
pub fn report_summary(report: &Report) -> String {
    let mut lines = vec![format!(
        "Revision {}: {} unresolved item(s)",
        report.revision, report.unresolved
    )];
    for kind in CheckKind::ALL {
        let count = report.count(kind);
        let defects = report.defects(kind);
        if count == 0 && defects == 0 {
            continue;
        }
        lines.push(format!("  {:<18} {count:>5} finding(s), {defects:>5} defect(s)", kind.name()));
    }
    let clashes = report.clash_counts();
    if !clashes.is_empty() {
        let categories: Vec<String> = clashes
            .iter()
            .map(|(category, n)| format!("{category}={n}"))
            .collect();
        lines.push(format!("  clash categories: {}", categories.join(", ")));
    }
    lines.join("\n")
}

/// Per-check before/after counts, listing only checks that changed.
pub fn diff_summary(diff: &ReportDiff) -> String {
    let mut lines = vec![format!(
        "Revision {} -> {}: unresolved {} -> {}",
        diff.from_revision, diff.to_revision, diff.unresolved_before, diff.unresolved_after
    )];
    for (kind, delta) in &diff.checks {
        if delta.resolved == 0 && delta.introduced == 0 {
            continue;
        }
        lines.push(format!(
            "  {:<18} {:>5} -> {:<5} (resolved {}, introduced {})",
            kind.name(),
            delta.before,
            delta.after,
            delta.resolved,
            delta.introduced
        ));
    }
    if diff.severe_clashes_introduced > 0 {
        lines.push(format!(
            "  warning: {} severe clash(es) introduced by repair",
            diff.severe_clashes_introduced
        ));
    }
    lines.join("\n")
}

pub fn notes_summary(notes: &[RepairNote]) -> String {
    notes
        .iter()
        .map(|note| format!("  - {note}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// Colored terminal output for cycle reports and the persisted roster.
//
// Logging carries the full detail; these are the short human summaries
// printed after each cycle and by `status`.

use std::collections::BTreeMap;

use colored::Colorize;

use super::plural;
use crate::clones::CloneKind;
use crate::cycle::CycleReport;
use crate::post::{LABEL_COMPLETED, LABEL_REMOVED, UNSET_LABEL_TEXT};
use crate::roster::RosterLine;

/// Print the outcome of one cycle.
pub fn display_cycle_report(report: &CycleReport) {
    if report.skipped {
        println!("{}", "No new posts since last check; cycle skipped.".dimmed());
        return;
    }

    println!(
        "\n{}",
        format!("=== Cycle ({} checked) ===", plural(report.fetched, "post")).bold()
    );
    if report.malformed > 0 {
        println!(
            "  {} {} skipped (missing fields)",
            "~".yellow(),
            plural(report.malformed, "post")
        );
    }

    if report.groups.is_empty() {
        println!("  {}", "No clones found.".green());
    }

    for group in &report.groups {
        println!("  Original: {}", group.original().absolute_url());
        for (kind, clone) in group.clones() {
            let removed = report
                .policy
                .removed
                .iter()
                .any(|(_, permalink)| *permalink == clone.permalink);
            let status = if removed {
                "removed".red().to_string()
            } else {
                "kept".normal().to_string()
            };
            println!(
                "    {} {:<10} {}  ({})",
                "-".dimmed(),
                colorize_kind(kind),
                clone.absolute_url().dimmed(),
                status
            );
        }
    }

    let flaired_kept = report.policy.kept_count(CloneKind::Flaired);
    if flaired_kept > 0 {
        println!(
            "  {} {} left for manual inspection",
            "!".bright_red(),
            plural(flaired_kept, "flaired clone")
        );
    }

    if report.mod_log_removals > 0 {
        println!(
            "  {} marked removed from the mod log",
            plural(report.mod_log_removals, "tracked post")
        );
    }
    if let Some(sweep) = report.queue {
        println!(
            "  Modqueue: {} checked, {} removed, {} skipped",
            sweep.checked, sweep.removed, sweep.skipped
        );
    }

    if let Some(ref err) = report.roster_error {
        println!("  {} roster not saved: {}", "Error:".red(), err);
    } else if report.roster_written {
        println!(
            "  Roster saved ({})",
            plural(report.roster_entries, "tracked post")
        );
    }
}

/// Print a persisted roster as a per-label tally followed by every entry.
pub fn display_roster(lines: &[RosterLine]) {
    if lines.is_empty() {
        println!("Tracked posts: none yet");
        return;
    }

    let mut tally: BTreeMap<&str, usize> = BTreeMap::new();
    for line in lines {
        *tally.entry(line.label.as_str()).or_default() += 1;
    }

    println!("Tracked posts: {}", lines.len());
    for (label, count) in &tally {
        println!("  {:<16} {:>4}", colorize_label(label), count);
    }

    println!();
    for line in lines {
        println!(
            "  {:<20} {:<16} {}",
            line.source,
            colorize_label(&line.label),
            line.url.dimmed()
        );
    }
}

fn colorize_kind(kind: CloneKind) -> colored::ColoredString {
    match kind {
        CloneKind::Flaired => kind.as_str().yellow().bold(),
        CloneKind::Unflaired => kind.as_str().dimmed(),
    }
}

fn colorize_label(label: &str) -> colored::ColoredString {
    match label {
        LABEL_COMPLETED => label.green(),
        LABEL_REMOVED => label.red(),
        UNSET_LABEL_TEXT => label.dimmed(),
        _ => label.yellow(),
    }
}

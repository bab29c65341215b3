//! Terminal presentation of change reasons and diff summaries.
//!
//! The reconciliation engine knows nothing about symbols or colours; the
//! per-reason styling lives here as a plain lookup.

use std::io::Write as _;

use console::Style;

use sitesync_core::{ChangeReason, DiffResult};

/// Symbol, label, and colour for one change reason.
#[must_use]
pub fn reason_style(reason: ChangeReason) -> (&'static str, &'static str, Style) {
    match reason {
        ChangeReason::NewFile => ("+", "New", Style::new().green()),
        ChangeReason::ContentChanged => ("*", "Changed", Style::new().blue()),
        ChangeReason::AttributesChanged => ("^", "Attrs", Style::new().cyan()),
        ChangeReason::Deleted => ("-", "Delete", Style::new().red()),
        ChangeReason::DeletedProtected => ("\u{2022}", "Protected", Style::new().dim()),
        ChangeReason::Unchanged => ("=", "Unchanged", Style::new().dim()),
    }
}

fn print_group(term: &mut console::Term, reason: ChangeReason, paths: &[String]) {
    let (symbol, label, style) = reason_style(reason);
    for path in paths {
        let tag = style.apply_to(format!(" {symbol} [{label}]"));
        let _ = writeln!(term, "{tag}     {path}");
    }
}

/// Print the per-path diff listing followed by a one-line total.
pub fn print_diff_summary(diff: &DiffResult, verbose: bool) {
    let mut term = console::Term::stderr();

    print_group(&mut term, ChangeReason::NewFile, &diff.new_files);
    print_group(&mut term, ChangeReason::ContentChanged, &diff.content_changed);
    print_group(
        &mut term,
        ChangeReason::AttributesChanged,
        &diff.attributes_changed,
    );
    print_group(&mut term, ChangeReason::Deleted, &diff.deleted);
    print_group(
        &mut term,
        ChangeReason::DeletedProtected,
        &diff.deleted_protected,
    );
    if verbose {
        print_group(&mut term, ChangeReason::Unchanged, &diff.unchanged);
    }

    let _ = writeln!(term);
    if diff.has_changes() {
        let _ = writeln!(term, "{} change(s) required", diff.num_changes);
    } else {
        let _ = writeln!(term, "No changes required");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_reason_has_a_distinct_symbol() {
        let reasons = [
            ChangeReason::NewFile,
            ChangeReason::ContentChanged,
            ChangeReason::AttributesChanged,
            ChangeReason::Deleted,
            ChangeReason::DeletedProtected,
            ChangeReason::Unchanged,
        ];
        let mut symbols: Vec<&str> = reasons.iter().map(|r| reason_style(*r).0).collect();
        symbols.sort_unstable();
        symbols.dedup();
        assert_eq!(symbols.len(), reasons.len());
    }
}

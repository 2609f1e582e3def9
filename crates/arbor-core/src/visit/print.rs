//! Tree rendering without execution.

use crate::action::Action;
use crate::report::Report;

/// Renders an action tree as an indented outline, one node per line.
///
/// With a [`Report`] attached, each line carries the node's outcome summary,
/// or `[not reached]` for nodes execution never visited. Rendering walks the
/// structure only; no leaf work runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Printer;

impl Printer {
    pub fn new() -> Self {
        Printer
    }

    /// The bare structure, labels only.
    pub fn render(&self, root: &Action) -> String {
        let mut out = String::new();
        self.render_node(root, 0, None, &mut out);
        out
    }

    /// The structure annotated with per-node outcomes from a finished run.
    pub fn render_with_report(&self, root: &Action, report: &Report) -> String {
        let mut out = String::new();
        self.render_node(root, 0, Some(report), &mut out);
        out
    }

    fn render_node(&self, action: &Action, depth: usize, report: Option<&Report>, out: &mut String) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(&action.label());
        if let Some(report) = report {
            match report.record(action) {
                Some(record) => {
                    out.push_str("  [");
                    out.push_str(&record.summary());
                    out.push(']');
                }
                None => out.push_str("  [not reached]"),
            }
        }
        out.push('\n');
        for child in action.children() {
            self.render_node(child, depth + 1, report, out);
        }
    }
}

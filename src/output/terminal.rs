//! Terminal output formatting with colors and box drawing.

use colored::Colorize;

use crate::analysis::max_statistic;
use crate::result::RunResult;
use crate::types::Tail;

/// Format a RunResult for human-readable terminal output.
///
/// Shows the map size, eligibility, the observed peak statistic and, when
/// the run has permutation rows beyond the observed one, how many units
/// survive FWE correction at 0.05.
pub fn format_summary(result: &RunResult) -> String {
    let [n_permutations, n_units] = result.tensors.shape();
    let mut summary = SummaryBox::default();

    if result.has_failures() {
        summary.line(format!(
            "{} {}",
            "\u{26A0}".yellow().bold(),
            "COMPLETED WITH UNIT FAILURES".yellow().bold()
        ));
    } else {
        summary.line(format!("{} {}", "\u{2713}".green().bold(), "COMPLETED".green().bold()));
    }
    summary.rule();

    summary.line(format!(
        "Units: {} ({} eligible)",
        n_units,
        result.eligibility.len()
    ));
    summary.line(format!("Permutations: {}", n_permutations));
    summary.line(format!("Tail: {}", format_tail(result.tail)));
    summary.rule();

    if n_permutations > 0 {
        let peak = max_statistic(result.tensors.fmap_row(0), result.tail);
        let label = if result.observed_first {
            "Observed peak TFCE"
        } else {
            "Row 0 peak TFCE"
        };
        summary.line(format!("{}: {:.3}", label, peak));
    }

    match result.corrected_pvalues() {
        Ok(pvalues) => {
            let significant = pvalues.iter().filter(|&&p| p <= 0.05).count();
            let text = format!("Significant units (FWE p <= 0.05): {}", significant);
            summary.line(if significant > 0 {
                text.green().to_string()
            } else {
                text
            });
        }
        Err(_) => summary.line(
            "FWE correction unavailable (no null rows)"
                .dimmed()
                .to_string(),
        ),
    }

    if result.has_failures() {
        summary.rule();
        summary.line(
            format!("Unit failures: {}", result.failures.len())
                .red()
                .to_string(),
        );
        for failure in result.failures.iter().take(MAX_LISTED_FAILURES) {
            let at = match failure.permutation {
                Some(p) => format!("permutation {}", p),
                None => "all permutations".to_string(),
            };
            summary.line(format!("  unit {} ({}): {}", failure.unit, at, failure.reason));
        }
        let hidden = result.failures.len().saturating_sub(MAX_LISTED_FAILURES);
        if hidden > 0 {
            summary.line(format!("  ... and {} more", hidden));
        }
    }

    summary.render()
}

const MAX_LISTED_FAILURES: usize = 5;

fn format_tail(tail: Tail) -> &'static str {
    match tail {
        Tail::Negative => "negative",
        Tail::Both => "two-sided",
        Tail::Positive => "positive",
    }
}

/// Narrowest interior width of the summary box.
const MIN_INNER_WIDTH: usize = 56;

enum Row {
    Text(String),
    Rule,
}

/// Rows of a boxed summary, sized to the widest row when rendered.
#[derive(Default)]
struct SummaryBox {
    rows: Vec<Row>,
}

impl SummaryBox {
    fn line(&mut self, text: String) {
        self.rows.push(Row::Text(text));
    }

    fn rule(&mut self) {
        self.rows.push(Row::Rule);
    }

    fn render(&self) -> String {
        let inner = self
            .rows
            .iter()
            .filter_map(|row| match row {
                Row::Text(text) => Some(visible_width(text)),
                Row::Rule => None,
            })
            .fold(MIN_INNER_WIDTH, usize::max);
        let edge = |left: char, right: char| {
            format!("{}{}{}\n", left, "\u{2500}".repeat(inner + 2), right)
        };

        let mut out = edge('\u{250C}', '\u{2510}');
        for row in &self.rows {
            match row {
                Row::Text(text) => {
                    let pad = inner - visible_width(text);
                    out.push_str(&format!("\u{2502} {}{:pad$} \u{2502}\n", text, "", pad = pad));
                }
                Row::Rule => out.push_str(&edge('\u{251C}', '\u{2524}')),
            }
        }
        out.push_str(&edge('\u{2514}', '\u{2518}'));
        out
    }
}

/// Number of characters a terminal displays for `text`, skipping CSI
/// escape sequences (`ESC [ ... final-byte`).
fn visible_width(text: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_escape {
            in_escape = !('@'..='~').contains(&c);
        } else if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            in_escape = true;
        } else {
            width += 1;
        }
    }
    width
}

//! Prompt rendering for debate turns.
//!
//! Pure string work. Placeholder substitution over the per-agent
//! instruction template, plus the two renderers it pulls from: the
//! fact sheet (populated fields only, grouped by category) and the
//! debate history (one line per prior entry, chronological).

use crate::debate::state::{DebateTurnEntry, Decision};
use crate::facts::FactSheet;

/// Notice rendered in place of history for the opening speech.
const FIRST_TO_SPEAK: &str =
    "No prior statements. You are the first to speak; open the debate with \
your independent read of the facts.";

/// Appended after a rendered history.
const NO_REPEAT: &str =
    "Do not repeat points already made above. Agree, rebut, or bring new evidence.";

/// Borrowed view of the session data a substitution needs.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub facts: &'a FactSheet,
    pub history: &'a [DebateTurnEntry],
    pub turn_number: u32,
    pub agent_name: &'a str,
}

/// Substitute `{fact_sheet}`, `{debate_history}`, `{turn_number}`,
/// `{agent_name}`, and `{symbol}` in an instruction template.
pub fn render_instruction(template: &str, ctx: &PromptContext<'_>) -> String {
    template
        .replace("{fact_sheet}", &render_fact_sheet(ctx.facts))
        .replace("{debate_history}", &render_history(ctx.history))
        .replace("{turn_number}", &ctx.turn_number.to_string())
        .replace("{agent_name}", ctx.agent_name)
        .replace("{symbol}", &ctx.facts.symbol)
}

/// Render the sheet's populated fields, one `[category]` block each.
pub fn render_fact_sheet(facts: &FactSheet) -> String {
    let mut out = format!("Symbol: {}", facts.symbol);
    if let Some(price) = facts.current_price {
        out.push_str(&format!("\nCurrent price: ${price:.2}"));
    }
    for category in facts.populated_categories() {
        out.push_str(&format!("\n\n[{category}]"));
        for (label, value) in facts.category_fields(category) {
            out.push_str(&format!("\n{label}: {value}"));
        }
    }
    out
}

/// Render prior entries chronologically, or the first-to-speak notice.
pub fn render_history(entries: &[DebateTurnEntry]) -> String {
    if entries.is_empty() {
        return FIRST_TO_SPEAK.to_string();
    }
    let mut lines: Vec<String> = entries.iter().map(history_line).collect();
    lines.push(String::new());
    lines.push(NO_REPEAT.to_string());
    lines.join("\n")
}

/// `[turn T] <agent> [<decision> <confidence>%] <summary-or-message>`,
/// degrading a missing stance to HOLD at 50.
fn history_line(entry: &DebateTurnEntry) -> String {
    let decision = entry.decision.unwrap_or(Decision::Hold);
    let confidence = entry.confidence.unwrap_or(50);
    let body = if entry.summary.is_empty() {
        entry.message.as_str()
    } else {
        entry.summary.as_str()
    };
    format!(
        "[turn {}] {} [{} {}%] {}",
        entry.turn_number, entry.agent_name, decision, confidence, body
    )
}

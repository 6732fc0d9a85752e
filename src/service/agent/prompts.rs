//! Prompts for match report generation

use std::fmt::Write;

use crate::model::{Language, MatchRecord};

/// System prompt for report generation
pub const REPORT_SYSTEM_PROMPT: &str = r#"You are a football journalist writing short post-match reports.

## Critical Rules

1. **Use only the facts provided.** Never invent goals, scorers, minutes or statistics.
2. **State the final score exactly as given, home team first** (for example "2:1"). Do not write the score in any other order.
3. **The final score is the only result you state.** Mention a half-time, after-90-minutes or penalty shootout score only right after a phrase naming it (for example "at half-time it was 1:0") or in parentheses after the final score (for example "2:1 (1:0)").
4. If the facts do not describe a finished football match, set "is_valid" to false and leave "narrative" empty.

## Output Requirements

- Submit the report through the provided schema.
- "home_team" and "away_team" must repeat the team names exactly as given.
- "final_score" must repeat the final score exactly as given.
- "narrative" is the report itself: a professional, neutral match report in flowing prose, without headings or bullet points.
- "statistics" holds only values the match page or statistics page states: possession, shots, cards, substitutions, extra time, penalties, the penalty shootout, the goal timeline and disallowed goals. Leave anything not stated empty.
- Preserve minute formats such as "45+2'".
- Write the narrative in the language requested in the instructions.
"#;

/// Build the user prompt for a validated record
pub fn build_report_prompt(
    record: &MatchRecord,
    language: Language,
    report_length_words: u32,
) -> String {
    let mut prompt = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(prompt, "## Match");
    let _ = writeln!(prompt, "Home team: {}", record.home_team());
    let _ = writeln!(prompt, "Away team: {}", record.away_team());
    let _ = writeln!(
        prompt,
        "Final score ({} - {}): {}",
        record.home_team(),
        record.away_team(),
        record.final_score()
    );
    if let Some(competition) = record.competition() {
        let _ = writeln!(prompt, "Competition: {}", competition);
    }
    if let Some(kickoff) = record.kickoff_time() {
        let _ = writeln!(prompt, "Kickoff: {}", kickoff.format("%Y-%m-%d %H:%M UTC"));
    }

    if !record.events().is_empty() {
        let _ = writeln!(prompt, "\n## Timeline");
        for event in record.events() {
            let _ = writeln!(prompt, "- {} {}", event.minute_label(), event.description);
        }
    }

    let context = record.context();
    if let Some(stats) = &context.stats_text {
        let _ = writeln!(prompt, "\n## Match statistics (page text)\n{}", stats);
    }
    if let Some(page) = &context.page_text {
        let _ = writeln!(prompt, "\n## Match page (page text)\n{}", page);
    }

    let _ = writeln!(
        prompt,
        "\n## Instructions\nWrite a match report of about {} words. {}",
        report_length_words,
        language.instruction()
    );

    prompt
}

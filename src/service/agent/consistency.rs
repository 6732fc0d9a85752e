//! Score consistency between a narrative and its source record
//!
//! Every score a narrative states must be the final score, home goals
//! first. The only scores allowed to differ are side scores: a score in
//! parentheses, as in "2:1 (1:0)", or a score whose clause opens with a
//! half-time, regular-time or penalty marker, as in "at half-time it was
//! 1:0". A marker after the score does not count: in "led 1:0 at the
//! break" the 1:0 is checked.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::Score;
use crate::service::normalizer::{SCORE_SEPARATORS, parse_score};

static SCORE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b(\d{{1,2}})\s*{}\s*(\d{{1,2}})\b", SCORE_SEPARATORS)).unwrap()
});

/// Characters that end a clause
const CLAUSE_BREAKS: &[char] = &['.', '!', '?', ';', ',', '\n'];

/// Lowercase markers introducing a score other than the final one
const SIDE_SCORE_MARKERS: &[&str] = &[
    "half-time",
    "half time",
    "halftime",
    "the break",
    "interval",
    "after 90",
    "regular time",
    "normal time",
    "penalt",
    "shootout",
    "shoot-out",
    "poločas",
    "přestávk",
    "normální hrací",
    "řádné hrací",
    "pokutov",
    "rozstřel",
];

/// Scores a narrative states as the result, in order of appearance
pub fn final_score_tokens(narrative: &str) -> Vec<Score> {
    SCORE_TOKEN
        .captures_iter(narrative)
        .filter_map(|caps| {
            let token = caps.get(0)?;
            if is_side_score(narrative, token.start(), token.end()) {
                return None;
            }
            let home = caps[1].parse().ok()?;
            let away = caps[2].parse().ok()?;
            Some(Score { home, away })
        })
        .collect()
}

fn is_side_score(narrative: &str, start: usize, end: usize) -> bool {
    let before = &narrative[..start];
    let after = &narrative[end..];

    if before.trim_end().ends_with('(') && after.trim_start().starts_with(')') {
        return true;
    }

    let clause_start = before.rfind(CLAUSE_BREAKS).map_or(0, |i| i + 1);
    let clause = before[clause_start..].to_lowercase();
    SIDE_SCORE_MARKERS
        .iter()
        .any(|marker| clause.contains(marker))
}

/// Check that a narrative states the final score and no other result
///
/// Fails with the offending scores when any result score differs from the
/// record's, and with an empty list when the narrative states no result
/// score at all. When the model also declared a `final_score` field, that
/// value must agree too.
pub fn check_score(
    narrative: &str,
    declared: Option<&str>,
    expected: Score,
) -> Result<(), Vec<Score>> {
    if let Some(declared) = declared
        && let Ok(declared) = parse_score(declared)
        && declared != expected
    {
        return Err(vec![declared]);
    }

    let found = final_score_tokens(narrative);
    if found.is_empty() {
        return Err(found);
    }

    let wrong: Vec<Score> = found.into_iter().filter(|score| *score != expected).collect();
    if wrong.is_empty() {
        Ok(())
    } else {
        Err(wrong)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_score_passes() {
        let narrative = "Bohemians beat Mladá Boleslav 2:1 (1:0) in Prague.";
        assert!(check_score(narrative, None, Score::new(2, 1)).is_ok());
        assert_eq!(final_score_tokens(narrative), vec![Score::new(2, 1)]);
    }

    #[test]
    fn test_wrong_score_next_to_final_fails() {
        let narrative = "Bohemians thrashed Mladá Boleslav 3:1 in Prague. It finished 2:1.";
        let err = check_score(narrative, None, Score::new(2, 1)).unwrap_err();
        assert_eq!(err, vec![Score::new(3, 1)]);
    }

    #[test]
    fn test_reversed_score_fails() {
        let err = check_score("Mladá Boleslav lost 1:2.", None, Score::new(2, 1)).unwrap_err();
        assert_eq!(err, vec![Score::new(1, 2)]);
    }

    #[test]
    fn test_missing_score_fails() {
        let err = check_score("A tight game in Prague.", None, Score::new(0, 0)).unwrap_err();
        assert!(err.is_empty());
    }

    #[test]
    fn test_marked_side_scores_are_skipped() {
        let expected = Score::new(2, 1);
        assert!(check_score("Bohemians won 2:1. At half-time it was 1:0.", None, expected).is_ok());
        assert!(
            check_score(
                "Bohemians porazili Mladou Boleslav 2:1, v poločase vedli 1:0.",
                None,
                expected
            )
            .is_ok()
        );

        let shootout = "It finished 1:1, and Bohemians won the penalty shootout 4:3.";
        assert!(check_score(shootout, None, Score::new(1, 1)).is_ok());
    }

    #[test]
    fn test_marker_after_score_does_not_exempt() {
        let err = check_score(
            "Bohemians led 1:0 at the break and won 2:1.",
            None,
            Score::new(2, 1),
        )
        .unwrap_err();
        assert_eq!(err, vec![Score::new(1, 0)]);
    }

    #[test]
    fn test_only_side_scores_fails() {
        let err = check_score("At half-time it was 1:0.", None, Score::new(2, 1)).unwrap_err();
        assert!(err.is_empty());
    }

    #[test]
    fn test_separators_match_normalizer() {
        let expected = Score::new(2, 1);
        for narrative in [
            "Bohemians won 2:1.",
            "Bohemians won 2-1.",
            "Bohemians won 2 - 1.",
            "Bohemians won 2–1.",
            "Bohemians won 2—1.",
            "Bohemians won 2 — 1.",
        ] {
            assert!(check_score(narrative, None, expected).is_ok(), "{}", narrative);
            assert_eq!(parse_score(&narrative[14..]).unwrap(), expected, "{}", narrative);
        }
    }

    #[test]
    fn test_declared_score_must_agree() {
        let narrative = "Bohemians won 2:1.";
        assert!(check_score(narrative, Some("2:1"), Score::new(2, 1)).is_ok());
        assert!(check_score(narrative, Some("1:2"), Score::new(2, 1)).is_err());
        assert!(check_score(narrative, Some("n/a"), Score::new(2, 1)).is_ok());
    }
}

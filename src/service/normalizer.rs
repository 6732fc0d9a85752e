//! Pure normalization of raw page fragments
//!
//! Converts extracted markup into clean text, canonical URLs and typed
//! values. Nothing here performs I/O, and every function is idempotent on
//! its own output. Fields that cannot be coerced are kept as
//! [`FieldValue::Invalid`] so the validator decides what is fatal.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use url::Url;

use crate::model::{FieldValue, MatchEvent, NormalizedFields, RawFragment, Score, Slot};

/// Elements whose text is never visible content
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "svg", "img", "nav", "footer", "noscript", "template", "head",
];

/// Query parameters that only carry tracking information
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "mc_cid", "mc_eid", "_ga", "igshid",
];

/// Characters accepted between the two numbers of a score
pub(crate) const SCORE_SEPARATORS: &str = r"[:\-–—]";

static SCORE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(\d{{1,3}})\s*{}\s*(\d{{1,3}})", SCORE_SEPARATORS)).unwrap()
});

static EVENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})(?:\s*\+\s*(\d{1,2}))?\s*['’]?\s*(.*)$").unwrap());

/// Date formats seen on match pages, most specific first
const KICKOFF_FORMATS: &[&str] = &[
    "%d.%m.%Y %H:%M",
    "%d. %m. %Y %H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

const KICKOFF_DATE_FORMATS: &[&str] = &["%d.%m.%Y", "%Y-%m-%d"];

/// Normalize every slot of a fragment
///
/// Page and stats text are cut to `max_context_chars` characters.
pub fn normalize(fragment: &RawFragment, max_context_chars: usize) -> NormalizedFields {
    let source_url = fragment
        .source_url
        .as_deref()
        .and_then(|raw| match canonicalize_url(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::debug!(url = %raw, error = %e, "Dropping unparsable source URL");
                None
            }
        });

    NormalizedFields {
        source_url,
        home_team: text_field(fragment.first(Slot::HomeTeam)),
        away_team: text_field(fragment.first(Slot::AwayTeam)),
        final_score: coerce(fragment.first(Slot::Score), parse_score),
        competition: text_field(fragment.first(Slot::Competition)),
        kickoff_time: coerce(fragment.first(Slot::KickoffTime), parse_kickoff),
        events: fragment
            .all(Slot::Events)
            .iter()
            .map(|raw| coerce(Some(raw.as_str()), parse_event))
            .collect(),
        page_text: context_text(fragment.first(Slot::PageText), max_context_chars),
        stats_text: context_text(fragment.first(Slot::StatsText), max_context_chars),
    }
}

fn text_field(raw: Option<&str>) -> FieldValue<String> {
    coerce(raw, |text| {
        if text.is_empty() {
            Err("empty after markup removal".to_string())
        } else {
            Ok(text.to_string())
        }
    })
}

fn coerce<T>(raw: Option<&str>, parse: impl Fn(&str) -> Result<T, String>) -> FieldValue<T> {
    let Some(raw) = raw else {
        return FieldValue::Missing;
    };
    let text = strip_markup(raw);
    match parse(&text) {
        Ok(value) => FieldValue::Present(value),
        Err(reason) => FieldValue::invalid(text, reason),
    }
}

fn context_text(raw: Option<&str>, max_chars: usize) -> Option<String> {
    raw.map(|raw| clean_page_text(raw, max_chars))
        .filter(|text| !text.is_empty())
}

/// Collapse whitespace runs into single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip markup from a fragment, keeping a space between elements
pub fn strip_markup(raw: &str) -> String {
    if !raw.contains('<') && !raw.contains('&') {
        return collapse_whitespace(raw);
    }
    let fragment = Html::parse_fragment(raw);
    collapse_whitespace(&visible_text(fragment.root_element()))
}

/// Visible text of a whole page, truncated to `max_chars` characters
pub fn clean_page_text(html: &str, max_chars: usize) -> String {
    let text = if html.contains('<') || html.contains('&') {
        let document = Html::parse_document(html);
        collapse_whitespace(&visible_text(document.root_element()))
    } else {
        collapse_whitespace(html)
    };

    if text.chars().count() <= max_chars {
        return text;
    }
    text.chars()
        .take(max_chars)
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn visible_text(root: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }
    parts.join(" ")
}

/// Canonicalize a page URL
///
/// Scheme and host are lowercased, tracking parameters and the fragment are
/// dropped, the path gets a trailing slash. Other query parameters (such as
/// the `mid` match id) are kept in order.
pub fn canonicalize_url(raw: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(raw.trim())?;
    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept.iter());
    }

    if !url.cannot_be_a_base() && !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Parse a score such as `2:1`, `2-1` or `2 – 1`
pub fn parse_score(text: &str) -> Result<Score, String> {
    let captures = SCORE_PATTERN
        .captures(text)
        .ok_or_else(|| format!("no score found in '{}'", text))?;
    let home = captures[1]
        .parse()
        .map_err(|_| format!("invalid home score in '{}'", text))?;
    let away = captures[2]
        .parse()
        .map_err(|_| format!("invalid away score in '{}'", text))?;
    Ok(Score { home, away })
}

/// Parse a timeline row such as `45+2' Novák (penalty)`
pub fn parse_event(text: &str) -> Result<MatchEvent, String> {
    let captures = EVENT_PATTERN
        .captures(text)
        .ok_or_else(|| format!("no minute marker in '{}'", text))?;
    let minute = captures[1]
        .parse()
        .map_err(|_| format!("invalid minute in '{}'", text))?;
    let added_time = match captures.get(2) {
        Some(m) => Some(
            m.as_str()
                .parse()
                .map_err(|_| format!("invalid added time in '{}'", text))?,
        ),
        None => None,
    };
    let description = captures
        .get(3)
        .map(|m| m.as_str().trim())
        .unwrap_or_default();
    if description.is_empty() {
        return Err(format!("event '{}' has no description", text));
    }

    Ok(MatchEvent {
        minute,
        added_time,
        description: description.to_string(),
    })
}

/// Parse a kickoff time; times without an offset are taken as UTC
pub fn parse_kickoff(text: &str) -> Result<DateTime<Utc>, String> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in KICKOFF_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }

    for fmt in KICKOFF_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt)
            && let Some(naive) = date.and_hms_opt(0, 0, 0)
        {
            return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }

    Err(format!("unrecognized kickoff time '{}'", text))
}

//! Selector-driven extraction of slots from rendered HTML

use scraper::{Html, Selector};
use url::Url;

use super::FetchError;
use crate::model::{ConfigError, RawFragment, Slot, SlotSelectors};

/// CSS selectors compiled once per fetcher
#[derive(Debug)]
pub struct CompiledSelectors {
    entries: Vec<(Slot, String, Selector)>,
}

impl CompiledSelectors {
    pub fn compile(selectors: &SlotSelectors) -> Result<Self, ConfigError> {
        let configured = [
            (Slot::HomeTeam, &selectors.home_team),
            (Slot::AwayTeam, &selectors.away_team),
            (Slot::Score, &selectors.score),
            (Slot::Competition, &selectors.competition),
            (Slot::KickoffTime, &selectors.kickoff_time),
            (Slot::Events, &selectors.events),
        ];

        let entries = configured
            .into_iter()
            .map(|(slot, raw)| {
                Selector::parse(raw)
                    .map(|selector| (slot, raw.clone(), selector))
                    .map_err(|e| ConfigError::InvalidSelector {
                        slot: slot.to_string(),
                        selector: raw.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { entries })
    }
}

/// Extract every configured slot from a rendered page
///
/// Single-valued slots take the first match, events keep every match in
/// document order. The whole page is kept as [`Slot::PageText`] for context.
/// A required slot with no match fails with [`FetchError::MissingElement`].
pub fn extract_fragment(
    html: &str,
    url: &Url,
    selectors: &CompiledSelectors,
) -> Result<RawFragment, FetchError> {
    let document = Html::parse_document(html);
    let mut fragment = RawFragment::new(Some(url.to_string()));

    for (slot, raw, selector) in &selectors.entries {
        let mut matches = document.select(selector).peekable();

        if matches.peek().is_none() {
            if slot.is_required() {
                tracing::debug!(url = %url, slot = %slot, selector = %raw, "Required element not found");
                return Err(FetchError::MissingElement {
                    slot: *slot,
                    selector: raw.clone(),
                });
            }
            continue;
        }

        if *slot == Slot::Events {
            for element in matches {
                fragment.insert(*slot, element.inner_html());
            }
        } else if let Some(element) = matches.next() {
            fragment.insert(*slot, element.inner_html());
        }
    }

    fragment.insert(Slot::PageText, html);

    tracing::debug!(
        url = %url,
        events = fragment.all(Slot::Events).len(),
        "Extracted match fragment"
    );

    Ok(fragment)
}

/// Trimmed livesport match page used across tests
#[cfg(test)]
pub(crate) const MATCH_PAGE: &str = r#"<html><body>
    <div class="tournamentHeader__country">CZECHIA: <a>Chance Liga - Round 21</a></div>
    <div class="duelParticipant">
      <div class="duelParticipant__startTime"><div>14.02.2026 12:00</div></div>
      <div class="duelParticipant__home"><a class="participant__participantName">Bohemians</a></div>
      <div class="detailScore__wrapper"><span>2</span><span>-</span><span>1</span></div>
      <div class="duelParticipant__away"><a class="participant__participantName">Mladá Boleslav</a></div>
    </div>
    <div class="smv__participantRow"><div>12'</div><div>Novák J.</div></div>
    <div class="smv__participantRow"><div>67'</div><div>Kovář M.</div></div>
</body></html>"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://www.livesport.cz/zapas/fotbal/bohemians/mlada-boleslav/").unwrap()
    }

    #[test]
    fn test_extract_all_slots() {
        let selectors = CompiledSelectors::compile(&SlotSelectors::default()).unwrap();
        let fragment = extract_fragment(MATCH_PAGE, &url(), &selectors).unwrap();

        assert_eq!(fragment.first(Slot::HomeTeam), Some("Bohemians"));
        assert_eq!(fragment.first(Slot::AwayTeam), Some("Mladá Boleslav"));
        assert_eq!(fragment.all(Slot::Events).len(), 2);
        assert!(fragment.first(Slot::Score).unwrap().contains("<span>2</span>"));
        assert!(fragment.first(Slot::Competition).is_some());
        assert!(fragment.first(Slot::PageText).is_some());
        assert_eq!(fragment.source_url.as_deref(), Some(url().as_str()));
    }

    #[test]
    fn test_missing_required_element() {
        let selectors = CompiledSelectors::compile(&SlotSelectors::default()).unwrap();
        let html = MATCH_PAGE.replace("detailScore__wrapper", "somethingElse");

        let err = extract_fragment(&html, &url(), &selectors).unwrap_err();
        assert!(matches!(
            err,
            FetchError::MissingElement {
                slot: Slot::Score,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_optional_element_is_skipped() {
        let selectors = CompiledSelectors::compile(&SlotSelectors::default()).unwrap();
        let html = MATCH_PAGE.replace("smv__participantRow", "other");

        let fragment = extract_fragment(&html, &url(), &selectors).unwrap();
        assert!(fragment.all(Slot::Events).is_empty());
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let selectors = SlotSelectors {
            score: "div[".to_string(),
            ..Default::default()
        };
        let err = CompiledSelectors::compile(&selectors).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSelector { ref slot, .. } if slot == "score"));
    }
}

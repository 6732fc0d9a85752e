//! Raw fragments extracted from a rendered match page
//!
//! A fragment is untyped: each semantic slot maps to the markup or text that
//! the page selectors matched. It only lives until normalization.

use std::collections::BTreeMap;
use std::fmt;

/// Semantic slot of a match page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    HomeTeam,
    AwayTeam,
    Score,
    Competition,
    KickoffTime,
    Events,
    PageText,
    StatsText,
}

impl Slot {
    /// Slots the page must provide for a report to be possible
    pub const REQUIRED: [Slot; 3] = [Slot::HomeTeam, Slot::AwayTeam, Slot::Score];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::HomeTeam => "home_team",
            Slot::AwayTeam => "away_team",
            Slot::Score => "score",
            Slot::Competition => "competition",
            Slot::KickoffTime => "kickoff_time",
            Slot::Events => "events",
            Slot::PageText => "page_text",
            Slot::StatsText => "stats_text",
        }
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped slot → extracted markup mapping for one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFragment {
    /// URL the fragment was extracted from, as given
    pub source_url: Option<String>,
    slots: BTreeMap<Slot, Vec<String>>,
}

impl RawFragment {
    pub fn new(source_url: Option<String>) -> Self {
        Self {
            source_url,
            slots: BTreeMap::new(),
        }
    }

    /// Append a value to a slot (multi-valued slots such as events keep order)
    pub fn insert(&mut self, slot: Slot, value: impl Into<String>) {
        self.slots.entry(slot).or_default().push(value.into());
    }

    /// Builder-style [`RawFragment::insert`]
    #[cfg(test)]
    pub fn with(mut self, slot: Slot, value: impl Into<String>) -> Self {
        self.insert(slot, value);
        self
    }

    pub fn first(&self, slot: Slot) -> Option<&str> {
        self.slots
            .get(&slot)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn all(&self, slot: Slot) -> &[String] {
        self.slots.get(&slot).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.slots.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_valued_slot_keeps_order() {
        let fragment = RawFragment::new(None)
            .with(Slot::Events, "12' Goal")
            .with(Slot::Events, "45+2' Yellow card");

        assert_eq!(fragment.all(Slot::Events).len(), 2);
        assert_eq!(fragment.first(Slot::Events), Some("12' Goal"));
        assert!(fragment.all(Slot::Score).is_empty());
        assert!(fragment.first(Slot::Score).is_none());
    }

    #[test]
    fn test_required_slots() {
        assert!(Slot::Score.is_required());
        assert!(!Slot::Competition.is_required());
        assert_eq!(Slot::HomeTeam.to_string(), "home_team");
    }
}

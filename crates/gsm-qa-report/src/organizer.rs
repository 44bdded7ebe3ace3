//! Card and section organization
//!
//! Every test of a result belongs to one card: the section or display card
//! that lists it, or else the reserved misc card.

use std::collections::{BTreeMap, BTreeSet};

use gsm_qa_runner::TestCaseResult;

use crate::config::{Card, Cards, MISC_CARD, MISC_TITLE};

/// Every test identifier listed by a section or display card.
///
/// An existing misc card is not counted as configuration.
#[must_use]
pub fn configured_tests(cards: &Cards) -> BTreeSet<&str> {
    cards
        .scored
        .sections
        .values()
        .flat_map(|s| s.cases.iter())
        .chain(
            cards
                .others
                .iter()
                .filter(|(key, _)| key.as_str() != MISC_CARD)
                .flat_map(|(_, card)| card.cases.iter()),
        )
        .map(String::as_str)
        .collect()
}

/// Tests present in the result but absent from the configuration, sorted
#[must_use]
pub fn misc_tests(cards: &Cards, tests: &BTreeMap<String, TestCaseResult>) -> Vec<String> {
    let configured = configured_tests(cards);
    tests
        .keys()
        .filter(|id| !configured.contains(id.as_str()))
        .cloned()
        .collect()
}

/// Place unconfigured tests into the misc card.
///
/// The misc card is replaced on every call and removed when empty. Returns
/// the misc test identifiers.
pub fn assign_misc(cards: &mut Cards, tests: &BTreeMap<String, TestCaseResult>) -> Vec<String> {
    let misc = misc_tests(cards, tests);
    if misc.is_empty() {
        cards.others.shift_remove(MISC_CARD);
    } else {
        cards.others.insert(
            MISC_CARD.to_string(),
            Card {
                title: MISC_TITLE.to_string(),
                cases: misc.clone(),
            },
        );
    }
    misc
}

/// Test identifier to the key of the card or section listing it.
///
/// When a test is listed more than once, the first listing wins: sections
/// before display cards, each in configuration order.
#[must_use]
pub fn card_index(cards: &Cards) -> BTreeMap<&str, &str> {
    let mut index = BTreeMap::new();
    for (key, section) in &cards.scored.sections {
        for case in &section.cases {
            index.entry(case.as_str()).or_insert(key.as_str());
        }
    }
    for (key, card) in &cards.others {
        for case in &card.cases {
            index.entry(case.as_str()).or_insert(key.as_str());
        }
    }
    index
}

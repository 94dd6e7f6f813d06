//! Fuzzy name resolution against the roster snapshot.
//!
//! Maps free-text name fragments from a member's message to a boat or a
//! fellow member. Matching is tiered: an exact token-set match wins
//! outright, then recognizer over-capture is forgiven (extra filler
//! words), then partial names are accepted when they point at exactly
//! one entity.

use crate::model::{Resource, SchedUser};
use std::collections::BTreeSet;

/// Outcome of a name resolution attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome<T> {
    /// Exactly one entity matched
    Match(T),
    /// Several entities matched a partial name; the member must be more
    /// specific
    Ambiguous(Vec<T>),
    /// Nothing matched at any tier
    NoMatch,
}

impl<T> ResolveOutcome<T> {
    /// Collapses ambiguity into absence, for callers that only care about
    /// a definite answer.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Match(value) => Some(value),
            Self::Ambiguous(_) | Self::NoMatch => None,
        }
    }
}

/// Finds the boat best matching the given name words.
///
/// Each boat's candidate name set is its canonical name plus any
/// configured alternates, lower-cased and tokenized on spaces. Tiers are
/// applied in strict priority order:
///
/// 1. **Perfect**: some candidate name's token set equals the input token
///    set. The first boat in roster order wins.
/// 2. **Over-match**: the input tokens are a strict superset of a
///    candidate name's tokens. The surplus tokens must not name any other
///    boat; input spanning two boats is not a match.
/// 3. **Under-match**: the input tokens are a strict subset of a
///    candidate name's tokens, accepted only when exactly one boat
///    qualifies.
pub fn find_best_resource_match<'a>(
    resources: &'a [Resource],
    name_words: &[String],
) -> ResolveOutcome<&'a Resource> {
    let input = input_tokens(name_words);
    if input.is_empty() {
        return ResolveOutcome::NoMatch;
    }

    let candidates: Vec<(usize, Vec<BTreeSet<String>>)> = resources
        .iter()
        .enumerate()
        .map(|(index, resource)| {
            (
                index,
                resource.candidate_names().map(tokenize).collect::<Vec<_>>(),
            )
        })
        .collect();

    match resolve_tiered(&candidates, &input) {
        TierOutcome::Match(index) => ResolveOutcome::Match(&resources[index]),
        TierOutcome::Ambiguous(indices) => {
            ResolveOutcome::Ambiguous(indices.into_iter().map(|i| &resources[i]).collect())
        }
        TierOutcome::NoMatch => ResolveOutcome::NoMatch,
    }
}

/// Finds the member best matching the given name words.
///
/// Same tiered algorithm as [`find_best_resource_match`], with a single
/// candidate name per member (their full display name).
pub fn find_best_user_match<'a>(
    users: &'a [SchedUser],
    name_words: &[String],
) -> ResolveOutcome<&'a SchedUser> {
    let input = input_tokens(name_words);
    if input.is_empty() {
        return ResolveOutcome::NoMatch;
    }

    let candidates: Vec<(usize, Vec<BTreeSet<String>>)> = users
        .iter()
        .enumerate()
        .map(|(index, user)| (index, vec![tokenize(&user.full_name())]))
        .collect();

    match resolve_tiered(&candidates, &input) {
        TierOutcome::Match(index) => ResolveOutcome::Match(&users[index]),
        TierOutcome::Ambiguous(indices) => {
            ResolveOutcome::Ambiguous(indices.into_iter().map(|i| &users[i]).collect())
        }
        TierOutcome::NoMatch => ResolveOutcome::NoMatch,
    }
}

enum TierOutcome {
    Match(usize),
    Ambiguous(Vec<usize>),
    NoMatch,
}

fn resolve_tiered(candidates: &[(usize, Vec<BTreeSet<String>>)], input: &BTreeSet<String>) -> TierOutcome {
    // Tier 1: exact token-set equality, first in roster order
    for (index, names) in candidates {
        if names.iter().any(|name| name == input) {
            return TierOutcome::Match(*index);
        }
    }

    // Tier 2: input strictly contains a candidate name. Surplus tokens
    // belonging to a different entity mean the input spans two entities,
    // which is not over-capture.
    for (index, names) in candidates {
        for name in names {
            if !is_strict_superset(input, name) {
                continue;
            }
            let surplus_names_other = input.iter().any(|token| {
                !name.contains(token)
                    && candidates
                        .iter()
                        .any(|(other, other_names)| {
                            other != index
                                && other_names.iter().any(|n| n.contains(token))
                        })
            });
            if !surplus_names_other {
                return TierOutcome::Match(*index);
            }
        }
    }

    // Tier 3: input is a partial name; only a unique hit is accepted
    let under: Vec<usize> = candidates
        .iter()
        .filter(|(_, names)| names.iter().any(|name| is_strict_superset(name, input)))
        .map(|(index, _)| *index)
        .collect();
    match under.len() {
        0 => TierOutcome::NoMatch,
        1 => TierOutcome::Match(under[0]),
        _ => TierOutcome::Ambiguous(under),
    }
}

fn tokenize(name: &str) -> BTreeSet<String> {
    name.split_whitespace()
        .map(|token| token.to_lowercase())
        .collect()
}

fn input_tokens(words: &[String]) -> BTreeSet<String> {
    words
        .iter()
        .flat_map(|word| word.split_whitespace())
        .map(|token| token.to_lowercase())
        .collect()
}

fn is_strict_superset(larger: &BTreeSet<String>, smaller: &BTreeSet<String>) -> bool {
    larger.len() > smaller.len() && smaller.iter().all(|token| larger.contains(token))
}

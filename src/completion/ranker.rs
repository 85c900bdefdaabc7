//! Filtering and ordering of completion candidates

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::completion::candidate::Candidate;
use crate::document::Document;

/// How a candidate's filter text matches the typed prefix, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchClass {
    Prefix,
    FoldedPrefix,
    Contains,
}

/// A candidate that passed filtering
#[derive(Debug, Clone)]
pub struct Ranked {
    pub candidate: Candidate,
    pub class: MatchClass,
    /// Offsets replaced by the primary edit
    pub replace: (usize, usize),
}

fn chars_eq_folded(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Char index of the first occurrence of `needle` in `haystack`
pub(crate) fn find_chars(haystack: &[char], needle: &[char], case_sensitive: bool) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&start| {
        needle.iter().enumerate().all(|(i, &c)| {
            let h = haystack[start + i];
            if case_sensitive {
                h == c
            } else {
                chars_eq_folded(h, c)
            }
        })
    })
}

/// Classifies how `filter_text` matches `prefix`; `None` excludes the candidate.
pub fn match_class(filter_text: &str, prefix: &str, case_sensitive: bool) -> Option<MatchClass> {
    if filter_text.starts_with(prefix) {
        return Some(MatchClass::Prefix);
    }
    let filter: Vec<char> = filter_text.chars().collect();
    let prefix: Vec<char> = prefix.chars().collect();

    match find_chars(&filter, &prefix, case_sensitive) {
        Some(0) => Some(MatchClass::FoldedPrefix),
        Some(_) => Some(MatchClass::Contains),
        None => None,
    }
}

/// Filters `candidates` against the text typed before `invocation` and
/// orders the survivors.
///
/// Order: match class, then sort text when any candidate declares one,
/// then the order servers reported the items in.
pub fn rank(
    candidates: Vec<Candidate>,
    document: &dyn Document,
    invocation: usize,
    case_sensitive: bool,
) -> Vec<Ranked> {
    let total = candidates.len();
    let use_sort_text = candidates.iter().any(Candidate::has_sort_text);

    let mut ranked: Vec<Ranked> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let replace = match candidate.replace_range(document, invocation) {
                Ok(replace) => replace,
                Err(e) => {
                    warn!(
                        "Dropping completion item {:?} from {}: {}",
                        candidate.label(),
                        candidate.server,
                        e
                    );
                    return None;
                }
            };
            let prefix = if replace.0 < invocation {
                document.slice(replace.0, invocation).unwrap_or_default()
            } else {
                String::new()
            };
            let class = match_class(candidate.filter_text(), &prefix, case_sensitive)?;
            Some(Ranked {
                candidate,
                class,
                replace,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.class
            .cmp(&b.class)
            .then_with(|| {
                if use_sort_text {
                    a.candidate.sort_text().cmp(b.candidate.sort_text())
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| a.candidate.position.cmp(&b.candidate.position))
    });

    debug!("Ranked {} of {} completion items", ranked.len(), total);
    ranked
}

//! Listing transformation: hide pending puts, restore pending deletes.
//!
//! Two independent passes over a raw listing:
//!
//! ```text
//! raw summaries/prefixes ──filter(hidden by put)──► ──restore(active deletes)──► result
//! ```
//!
//! Restoration honors the listing shape. A recursive (flat) listing gets the
//! deleted object's summary back if it lies anywhere under the prefix. A
//! delimited listing gets the summary back only for direct children, and a
//! rolled-up common prefix for anything deeper, so a deleted
//! `a/b/c/d/e/file` still makes `a/b/c/d/` show up when listing `a/b/c`.

use super::state::ConsistencyState;
use crate::clock::StoreClock;
use crate::io::Rng;
use crate::store::{ObjectSummary, DELIMITER};
use tracing::trace;

/// Result of one transform, with counts for statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformedListing {
    pub summaries: Vec<ObjectSummary>,
    pub common_prefixes: Vec<String>,
    /// Raw entries dropped because a put is still pending
    pub hidden: usize,
    pub restored_summaries: usize,
    pub restored_prefixes: usize,
}

pub struct ListingTransformer<'a, R: Rng, C: StoreClock> {
    state: &'a ConsistencyState<R, C>,
}

impl<'a, R: Rng, C: StoreClock> ListingTransformer<'a, R, C> {
    pub fn new(state: &'a ConsistencyState<R, C>) -> Self {
        ListingTransformer { state }
    }

    pub fn transform(
        &self,
        raw_summaries: Vec<ObjectSummary>,
        raw_prefixes: Vec<String>,
        request_prefix: &str,
        recursive: bool,
    ) -> TransformedListing {
        let mut out = TransformedListing::default();

        for summary in raw_summaries {
            if self.state.is_hidden_by_put(&summary.key) {
                trace!("hiding {}", summary.key);
                out.hidden += 1;
            } else {
                out.summaries.push(summary);
            }
        }
        for prefix in raw_prefixes {
            if self.state.is_hidden_by_put(&prefix) {
                trace!("hiding prefix {}", prefix);
                out.hidden += 1;
            } else {
                out.common_prefixes.push(prefix);
            }
        }

        for (key, summary) in self.state.active_deletes() {
            if is_descendant(request_prefix, &key, recursive) {
                if let Some(summary) = summary {
                    if add_summary_if_absent(&mut out.summaries, summary) {
                        trace!("restoring deleted {}", key);
                        out.restored_summaries += 1;
                    }
                }
            }
            // Delimited listings report deeper deletes as rolled-up prefixes
            if !recursive && is_descendant(request_prefix, &key, true) {
                if let Some(prefix) = rollup_prefix(request_prefix, &key) {
                    if add_prefix_if_absent(&mut out.common_prefixes, prefix) {
                        out.restored_prefixes += 1;
                    }
                }
            }
        }

        out
    }
}

/// Strip trailing delimiters; the root is the empty string
fn normalize(path: &str) -> &str {
    path.trim_end_matches(DELIMITER)
}

/// Parent directory of a key, `None` for the root
fn parent(path: &str) -> Option<&str> {
    let path = normalize(path);
    if path.is_empty() {
        return None;
    }
    Some(path.rfind(DELIMITER).map_or("", |idx| &path[..idx]))
}

/// Does `child` lie under `parent`?
///
/// Recursive: any key starting with `parent` plus a trailing delimiter (an
/// empty `parent` contains everything). Non-recursive: only keys whose
/// immediate parent is `parent`.
pub fn is_descendant(parent_prefix: &str, child: &str, recursive: bool) -> bool {
    if recursive {
        if parent_prefix.is_empty() {
            return true;
        }
        if parent_prefix.ends_with(DELIMITER) {
            child.starts_with(parent_prefix)
        } else {
            child
                .strip_prefix(parent_prefix)
                .is_some_and(|rest| rest.starts_with(DELIMITER))
        }
    } else {
        parent(child) == Some(normalize(parent_prefix))
    }
}

/// The path one level below `ancestor` on the way to `child`, with a
/// trailing delimiter, e.g. `a/b/c` + `a/b/c/d/e/file` -> `a/b/c/d/`.
///
/// `None` for direct children of `ancestor`, which roll up to nothing.
pub fn rollup_prefix(ancestor: &str, child: &str) -> Option<String> {
    let ancestor = normalize(ancestor);
    let mut candidate = parent(child)?;
    while !candidate.is_empty() {
        let next = parent(candidate)?;
        if next == ancestor {
            return Some(format!("{}{}", candidate, DELIMITER));
        }
        candidate = next;
    }
    None
}

fn add_summary_if_absent(summaries: &mut Vec<ObjectSummary>, item: ObjectSummary) -> bool {
    if summaries.iter().any(|s| s.key == item.key) {
        return false;
    }
    summaries.push(item);
    true
}

fn add_prefix_if_absent(prefixes: &mut Vec<String>, prefix: String) -> bool {
    if prefixes.iter().any(|p| normalize(p) == normalize(&prefix)) {
        return false;
    }
    prefixes.push(prefix);
    true
}

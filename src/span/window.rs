//! Bounded working buffers for the join cursors.
//!
//! Two pieces live here: the per-document ordering buffer every gathering
//! combinator drains through, and the candidate list the distance sweep
//! evicts from the front. Both are deliberately separate from the cursors
//! so their invariants can be tested in isolation.

use std::collections::VecDeque;

use crate::types::SpanMatch;

/// Sort one document's worth of produced matches into emission order and
/// collapse exact duplicates (same span, payload and classes).
///
/// The derived `SpanMatch` ordering makes identical matches adjacent after
/// sorting, so a plain `dedup` suffices. Matches that share a span but
/// differ in annotations both survive.
pub(crate) fn into_run(mut buf: Vec<SpanMatch>) -> VecDeque<SpanMatch> {
    buf.sort();
    buf.dedup();
    buf.into()
}

/// Ordered working set of one operand's occurrences still reachable from
/// the other operand's current position in a distance sweep.
///
/// Entries enter at the back in `(start, end)` order and leave at the
/// front once the monotone eviction bound says they can never pair with
/// the current or any later opposite-side occurrence.
pub(crate) struct CandidateList {
    items: VecDeque<SpanMatch>,
}

impl CandidateList {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    pub fn push(&mut self, m: SpanMatch) {
        self.items.push_back(m);
    }

    /// Drop candidates from the front for as long as `dead` holds.
    ///
    /// Correct only if `dead` is monotone over the sweep: once true for a
    /// candidate it must stay true for every later opposite-side position.
    pub fn evict_front(&mut self, dead: impl Fn(&SpanMatch) -> bool) {
        while let Some(front) = self.items.front() {
            if dead(front) {
                self.items.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpanMatch> {
        self.items.iter()
    }
}

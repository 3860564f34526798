//! Projection onto captured classes.
//!
//! Focusing re-derives the primary span of each sub-match from its class
//! annotations. Projection can swap the relative order of neighbouring
//! sub-matches, so the sorted path re-orders through a release window:
//! projections enter a min-heap and the smallest is released once the
//! window overflows, or when the document is exhausted. The default window
//! is unbounded per document, which makes the re-ordering exact.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use crate::error::Result;
use crate::span::{unpositioned, BoxCursor, Operand, SpanCursor};
use crate::types::{DocId, MatchPayload, SpanMatch, TEMP_CLASS_MIN};

/// Feed projections through a bounded re-ordering window.
///
/// `None` buffers the whole run and therefore releases in exact order;
/// a bounded window releases early once it overflows. Consecutive exact
/// duplicates are collapsed on the way out.
fn release(projected: impl Iterator<Item = SpanMatch>, window: Option<usize>) -> VecDeque<SpanMatch> {
    let mut heap: BinaryHeap<Reverse<SpanMatch>> = BinaryHeap::new();
    let mut out: Vec<SpanMatch> = Vec::new();
    for p in projected {
        heap.push(Reverse(p));
        if let Some(w) = window {
            if heap.len() > w {
                if let Some(Reverse(m)) = heap.pop() {
                    out.push(m);
                }
            }
        }
    }
    while let Some(Reverse(m)) = heap.pop() {
        out.push(m);
    }
    out.dedup();
    out.into()
}

/// Re-anchors each sub-match on the union of its annotations with the
/// given ids, dropping sub-matches that carry none of them. Temporary ids
/// that were focused on are scaffolding and are stripped from the result.
pub struct FocusCursor {
    ids: Vec<u8>,
    sub: Operand,
    sorted: bool,
    window: Option<usize>,
    pending: VecDeque<SpanMatch>,
    current: Option<SpanMatch>,
    started: bool,
}

impl FocusCursor {
    pub fn new(ids: Vec<u8>, sub: BoxCursor, sorted: bool, window: Option<usize>) -> Self {
        Self {
            ids,
            sub: Operand::new(sub),
            sorted,
            window,
            pending: VecDeque::new(),
            current: None,
            started: false,
        }
    }

    fn project(&self, m: &SpanMatch) -> Option<SpanMatch> {
        let mut lo = u32::MAX;
        let mut hi = 0;
        let mut found = false;
        for c in &m.classes {
            if self.ids.contains(&c.id) {
                found = true;
                lo = lo.min(c.start);
                hi = hi.max(c.end);
            }
        }
        if !found {
            return None;
        }
        let mut classes = m.classes.clone();
        classes.retain(|c| !(c.id >= TEMP_CLASS_MIN && self.ids.contains(&c.id)));
        Some(SpanMatch {
            doc: m.doc,
            start: lo,
            end: hi,
            payload: MatchPayload::None,
            classes,
        })
    }

    /// Sorted path: project one document at a time through the window.
    fn fill_batch(&mut self) -> Result<bool> {
        loop {
            self.sub.start()?;
            if !self.sub.live() {
                self.current = None;
                return Ok(false);
            }
            let matches = self.sub.take_doc()?;
            let projected: Vec<SpanMatch> =
                matches.iter().filter_map(|m| self.project(m)).collect();
            let run = release(projected.into_iter(), self.window);
            if !run.is_empty() {
                self.pending = run;
                self.current = self.pending.pop_front();
                return Ok(true);
            }
        }
    }

    /// Unsorted path: emit projections in sub order.
    fn stream(&mut self, mut has: bool) -> Result<bool> {
        while has {
            if let Some(p) = self.project(self.sub.current()?) {
                self.current = Some(p);
                return Ok(true);
            }
            has = self.sub.advance()?;
        }
        self.current = None;
        Ok(false)
    }
}

impl SpanCursor for FocusCursor {
    fn advance(&mut self) -> Result<bool> {
        if let Some(m) = self.pending.pop_front() {
            self.current = Some(m);
            return Ok(true);
        }
        if self.sorted {
            return self.fill_batch();
        }
        let has = if self.started {
            self.sub.advance()?
        } else {
            self.started = true;
            self.sub.start()?;
            self.sub.live()
        };
        self.stream(has)
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        if let Some(cur) = &self.current {
            if cur.doc >= target {
                return Ok(true);
            }
        }
        self.pending.clear();
        self.started = true;
        if !self.sub.skip_to(target)? {
            self.current = None;
            return Ok(false);
        }
        if self.sorted {
            self.fill_batch()
        } else {
            self.stream(true)
        }
    }

    fn current(&self) -> Result<&SpanMatch> {
        self.current.as_ref().ok_or_else(unpositioned)
    }
}

/// Re-anchors one captured class as the primary span, the building block
/// of relation chains. Equivalent to a single-id sorted focus; kept as its
/// own cursor because joins compose it to arbitrary depth.
pub struct ReferenceCursor {
    inner: FocusCursor,
}

impl ReferenceCursor {
    pub fn new(sub: BoxCursor, class_id: u8) -> Self {
        Self {
            inner: FocusCursor::new(vec![class_id], sub, true, None),
        }
    }
}

impl SpanCursor for ReferenceCursor {
    fn advance(&mut self) -> Result<bool> {
        self.inner.advance()
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        self.inner.skip_to(target)
    }

    fn current(&self) -> Result<&SpanMatch> {
        self.inner.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(start: u32, end: u32) -> SpanMatch {
        SpanMatch::new(0, start, end)
    }

    #[test]
    fn test_unbounded_release_sorts_exactly() {
        let run = release(vec![m(5, 6), m(1, 2), m(3, 4)].into_iter(), None);
        let starts: Vec<u32> = run.iter().map(|x| x.start).collect();
        assert_eq!(starts, vec![1, 3, 5]);
    }

    #[test]
    fn test_bounded_window_releases_smallest_first() {
        // Window of one: each overflow releases the smallest seen so far.
        let run = release(vec![m(5, 6), m(1, 2), m(3, 4)].into_iter(), Some(1));
        let starts: Vec<u32> = run.iter().map(|x| x.start).collect();
        // (5,6) enters; (1,2) overflows the window and (1,2) leaves first;
        // (3,4) overflows and (3,4) leaves; (5,6) drains last.
        assert_eq!(starts, vec![1, 3, 5]);
    }

    #[test]
    fn test_window_too_small_can_misorder() {
        let run = release(vec![m(5, 6), m(7, 8), m(1, 2)].into_iter(), Some(1));
        let starts: Vec<u32> = run.iter().map(|x| x.start).collect();
        // (5,6) is released before (1,2) ever arrives.
        assert_eq!(starts, vec![5, 1, 7]);
    }

    #[test]
    fn test_release_collapses_exact_duplicates() {
        let run = release(vec![m(1, 2), m(1, 2), m(3, 4)].into_iter(), None);
        assert_eq!(run.len(), 2);
    }
}

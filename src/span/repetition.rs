//! Bounded self-concatenation.
//!
//! A repetition match is a chain of back-to-back operand occurrences:
//! each part starts exactly where the previous one ends. Every window of
//! every valid length is emitted, not only maximal runs, so a run of n
//! parts yields n-k+1 windows of length k.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::span::window::into_run;
use crate::span::{unpositioned, BoxCursor, Operand, SpanCursor};
use crate::types::{ClassAnnotation, DocId, SpanMatch};

/// Append every chain window over `parts` (one document, emission order)
/// to `buf`. Chains accumulate part classes left to right.
fn chain_windows(parts: &[SpanMatch], min: u32, max: u32, buf: &mut Vec<SpanMatch>) {
    fn extend(
        parts: &[SpanMatch],
        min: u32,
        max: u32,
        last: usize,
        len: u32,
        origin: u32,
        classes: &[ClassAnnotation],
        buf: &mut Vec<SpanMatch>,
    ) {
        let end = parts[last].end;
        if len >= min {
            let mut m = SpanMatch::new(parts[last].doc, origin, end);
            m.classes = classes.to_vec();
            buf.push(m);
        }
        if len == max {
            return;
        }
        let from = parts.partition_point(|p| p.start < end);
        for j in from..parts.len() {
            if parts[j].start != end {
                break;
            }
            // Zero-width parts may only chain forward.
            if parts[j].end == parts[j].start && j <= last {
                continue;
            }
            let mut chained = classes.to_vec();
            chained.extend_from_slice(&parts[j].classes);
            extend(parts, min, max, j, len + 1, origin, &chained, buf);
        }
    }

    for (i, part) in parts.iter().enumerate() {
        extend(parts, min, max, i, 1, part.start, &part.classes, buf);
    }
}

/// Emits all `min..=max`-length adjacency chains of the operand.
pub struct RepetitionCursor {
    sub: Operand,
    min: u32,
    max: u32,
    pending: VecDeque<SpanMatch>,
    current: Option<SpanMatch>,
}

impl RepetitionCursor {
    pub fn new(sub: BoxCursor, min: u32, max: u32) -> Result<Self> {
        if min < 1 {
            return Err(Error::invalid_query(
                "minimum repetition must not be lower than 1",
            ));
        }
        if min > max {
            return Err(Error::invalid_query(format!(
                "maximum repetition {max} must not be lower than the minimum {min}"
            )));
        }
        Ok(Self {
            sub: Operand::new(sub),
            min,
            max,
            pending: VecDeque::new(),
            current: None,
        })
    }

    fn fill(&mut self) -> Result<bool> {
        loop {
            self.sub.start()?;
            if !self.sub.live() {
                self.current = None;
                return Ok(false);
            }
            let parts = self.sub.take_doc()?;
            let mut buf = Vec::new();
            chain_windows(&parts, self.min, self.max, &mut buf);
            if !buf.is_empty() {
                self.pending = into_run(buf);
                self.current = self.pending.pop_front();
                return Ok(true);
            }
        }
    }
}

impl SpanCursor for RepetitionCursor {
    fn advance(&mut self) -> Result<bool> {
        if let Some(m) = self.pending.pop_front() {
            self.current = Some(m);
            return Ok(true);
        }
        self.fill()
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        if let Some(cur) = &self.current {
            if cur.doc >= target {
                return Ok(true);
            }
        }
        self.pending.clear();
        if !self.sub.skip_to(target)? {
            self.current = None;
            return Ok(false);
        }
        self.fill()
    }

    fn current(&self) -> Result<&SpanMatch> {
        self.current.as_ref().ok_or_else(unpositioned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(spans: &[(u32, u32)]) -> Vec<SpanMatch> {
        spans.iter().map(|&(s, e)| SpanMatch::new(0, s, e)).collect()
    }

    fn windows(spans: &[(u32, u32)], min: u32, max: u32) -> Vec<(u32, u32)> {
        let mut buf = Vec::new();
        chain_windows(&parts(spans), min, max, &mut buf);
        buf.sort();
        buf.iter().map(|m| (m.start, m.end)).collect()
    }

    #[test]
    fn test_runs_yield_every_window() {
        // Two runs: length 2 at 1..3 and length 3 at 4..7.
        let spans = [(1, 2), (2, 3), (4, 5), (5, 6), (6, 7)];
        assert_eq!(
            windows(&spans, 2, 3),
            vec![(1, 3), (4, 6), (4, 7), (5, 7)]
        );
    }

    #[test]
    fn test_window_count_formula() {
        // n consecutive parts yield n-k+1 windows per length k.
        let spans: Vec<(u32, u32)> = (0..6).map(|i| (i, i + 1)).collect();
        let n = 6u32;
        for min in 1..=n {
            for max in min..=n {
                let expect: u32 = (min..=max).map(|k| n - k + 1).sum();
                assert_eq!(
                    windows(&spans, min, max).len(),
                    expect as usize,
                    "min={min} max={max}"
                );
            }
        }
    }

    #[test]
    fn test_single_part_windows() {
        assert_eq!(windows(&[(3, 4)], 1, 4), vec![(3, 4)]);
        assert_eq!(windows(&[(3, 4)], 2, 4), vec![]);
    }

    #[test]
    fn test_chains_accumulate_classes() {
        let mut a = SpanMatch::new(0, 0, 1);
        a.tag_class(1);
        let mut b = SpanMatch::new(0, 1, 2);
        b.tag_class(2);
        let mut buf = Vec::new();
        chain_windows(&[a, b], 2, 2, &mut buf);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf[0].start, 0);
        assert_eq!(buf[0].end, 2);
        let ids: Vec<u8> = buf[0].classes.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    /// Fixed match list standing in for a positioned operand.
    struct ListCursor {
        items: Vec<SpanMatch>,
        at: Option<usize>,
    }

    impl ListCursor {
        fn new(items: Vec<SpanMatch>) -> Self {
            Self { items, at: None }
        }
    }

    impl SpanCursor for ListCursor {
        fn advance(&mut self) -> Result<bool> {
            let next = self.at.map_or(0, |i| i + 1);
            if next < self.items.len() {
                self.at = Some(next);
                Ok(true)
            } else {
                self.at = Some(self.items.len());
                Ok(false)
            }
        }

        fn skip_to(&mut self, target: DocId) -> Result<bool> {
            loop {
                match self.at {
                    Some(i) if i >= self.items.len() => return Ok(false),
                    Some(i) if self.items[i].doc >= target => return Ok(true),
                    _ => {
                        if !self.advance()? {
                            return Ok(false);
                        }
                    }
                }
            }
        }

        fn current(&self) -> Result<&SpanMatch> {
            self.at
                .and_then(|i| self.items.get(i))
                .ok_or_else(unpositioned)
        }
    }

    #[test]
    fn test_minimum_validated() {
        let sub = Box::new(ListCursor::new(vec![]));
        let err = RepetitionCursor::new(sub, 0, 2).err();
        assert!(err
            .map(|e| e.to_string())
            .is_some_and(|m| m.contains("minimum repetition must not be lower than 1")));
    }

    #[test]
    fn test_cursor_spans_two_documents() {
        let items: Vec<SpanMatch> = [(0u32, 0u32, 1u32), (0, 1, 2), (3, 4, 5), (3, 5, 6)]
            .iter()
            .map(|&(d, s, e)| SpanMatch::new(d, s, e))
            .collect();
        let mut rep = RepetitionCursor::new(Box::new(ListCursor::new(items)), 2, 2).unwrap();
        let mut got = Vec::new();
        while rep.advance().unwrap() {
            let m = rep.current().unwrap();
            got.push((m.doc, m.start, m.end));
        }
        assert_eq!(got, vec![(0, 0, 2), (3, 4, 6)]);
    }
}

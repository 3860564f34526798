//! Distance joins.
//!
//! Pairs a left and a right operand under one or more distance constraints,
//! each in its own unit: words, or occurrences of a named element such as a
//! sentence. A pair qualifies when every constraint holds; the emitted match
//! is the hull of the two spans. With `ordered` the left span must end at or
//! before the right span's start. With `exclusion` the join inverts: left
//! matches are emitted unchanged when no right match qualifies near them.
//!
//! Word distance is 0 for overlapping spans and gap plus one otherwise, so
//! adjacent spans measure 1. Element distance is the ordinal difference of
//! the outermost occurrences containing each span; a span contained in no
//! occurrence fails the constraint.

mod element;
mod token;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::reader::{CorpusReader, DocStore};
use crate::span::window::{into_run, CandidateList};
use crate::span::{align_all, unpositioned, BoxCursor, Operand, SpanCursor};
use crate::types::{DocId, SpanMatch};

use element::{element_distance, ElementOrdinals};
use token::{within_word_reach, word_distance};

/// Unit a distance constraint is measured in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceUnit {
    /// Token positions.
    Words,
    /// Outermost occurrences of the named element.
    Element(String),
}

/// One band of allowed distances between the paired spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceConstraint {
    pub unit: DistanceUnit,
    pub min: u32,
    pub max: u32,
}

impl DistanceConstraint {
    pub fn words(min: u32, max: u32) -> Self {
        Self {
            unit: DistanceUnit::Words,
            min,
            max,
        }
    }

    pub fn element(name: impl Into<String>, min: u32, max: u32) -> Self {
        Self {
            unit: DistanceUnit::Element(name.into()),
            min,
            max,
        }
    }
}

fn pair_qualifies(
    constraints: &[DistanceConstraint],
    ords: &[Option<ElementOrdinals>],
    ordered: bool,
    l: &SpanMatch,
    r: &SpanMatch,
) -> bool {
    if ordered && l.end > r.start {
        return false;
    }
    for (constraint, ord) in constraints.iter().zip(ords) {
        let d = match (&constraint.unit, ord.as_ref()) {
            (DistanceUnit::Words, _) => word_distance(l.start, l.end, r.start, r.end),
            (DistanceUnit::Element(_), Some(ords)) => {
                let (Some(a), Some(b)) = (
                    ords.ordinal(l.start, l.end),
                    ords.ordinal(r.start, r.end),
                ) else {
                    return false;
                };
                element_distance(a, b)
            }
            (DistanceUnit::Element(_), None) => return false,
        };
        if d < constraint.min || d > constraint.max {
            return false;
        }
    }
    true
}

/// One-document pair sweep. Candidates are admitted and retired by the
/// leading constraint's band; every surviving pair is checked against the
/// full constraint list.
fn gather_pairs(
    constraints: &[DistanceConstraint],
    ords: &[Option<ElementOrdinals>],
    ordered: bool,
    lefts: &[SpanMatch],
    rights: &[SpanMatch],
) -> Vec<SpanMatch> {
    let lead = &constraints[0];
    let lead_ords = ords.first().and_then(Option::as_ref);
    let mut out = Vec::new();
    let mut cands = CandidateList::new();
    let mut li = 0usize;
    for r in rights {
        match (&lead.unit, lead_ords) {
            (DistanceUnit::Words, _) => {
                cands.evict_front(|l| !within_word_reach(l.end, r.start, lead.max));
                while li < lefts.len()
                    && lefts[li].start as u64 <= r.end as u64 + lead.max as u64
                {
                    cands.push(lefts[li].clone());
                    li += 1;
                }
            }
            (DistanceUnit::Element(_), Some(ord0)) => {
                let Some(r_ord) = ord0.ordinal(r.start, r.end) else {
                    // No ordinal, no qualifying pair with this right span.
                    continue;
                };
                cands.evict_front(|l| match ord0.ordinal(l.start, l.end) {
                    None => true,
                    Some(l_ord) => (l_ord as u64) + (lead.max as u64) < r_ord as u64,
                });
                while li < lefts.len() {
                    let held = match ord0.ordinal(lefts[li].start, lefts[li].end) {
                        // Pulled so the sweep stays monotone; the next
                        // eviction removes it.
                        None => true,
                        Some(l_ord) => l_ord as u64 <= (r_ord as u64) + (lead.max as u64),
                    };
                    if !held {
                        break;
                    }
                    cands.push(lefts[li].clone());
                    li += 1;
                }
            }
            (DistanceUnit::Element(_), None) => continue,
        }
        for l in cands.iter() {
            if pair_qualifies(constraints, ords, ordered, l, r) {
                let mut m = SpanMatch::new(r.doc, l.start.min(r.start), l.end.max(r.end));
                m.classes = l.classes.clone();
                m.classes.extend_from_slice(&r.classes);
                out.push(m);
            }
        }
    }
    out
}

/// Distance join over two operands, in pairing or exclusion form.
pub struct DistanceCursor {
    left: Operand,
    right: Operand,
    constraints: Vec<DistanceConstraint>,
    ordered: bool,
    exclusion: bool,
    store: DocStore,
    pending: VecDeque<SpanMatch>,
    current: Option<SpanMatch>,
}

impl DistanceCursor {
    pub fn new(
        reader: &CorpusReader,
        left: BoxCursor,
        right: BoxCursor,
        constraints: Vec<DistanceConstraint>,
        ordered: bool,
        exclusion: bool,
    ) -> Result<Self> {
        if constraints.is_empty() {
            return Err(Error::invalid_query(
                "Distance requires at least one constraint",
            ));
        }
        for constraint in &constraints {
            if constraint.min > constraint.max {
                return Err(Error::invalid_query(format!(
                    "Distance maximum {} must not be lower than the minimum {}",
                    constraint.max, constraint.min
                )));
            }
        }
        Ok(Self {
            left: Operand::new(left),
            right: Operand::new(right),
            constraints,
            ordered,
            exclusion,
            store: reader.doc_store()?,
            pending: VecDeque::new(),
            current: None,
        })
    }

    fn load_ords(&self, doc: DocId) -> Result<Vec<Option<ElementOrdinals>>> {
        let any_element = self
            .constraints
            .iter()
            .any(|c| matches!(c.unit, DistanceUnit::Element(_)));
        if !any_element {
            return Ok(self.constraints.iter().map(|_| None).collect());
        }
        self.store.with_sidecar(doc, |view| {
            Ok(self
                .constraints
                .iter()
                .map(|c| match &c.unit {
                    DistanceUnit::Words => None,
                    DistanceUnit::Element(name) => Some(ElementOrdinals::from_view(view, name)),
                })
                .collect())
        })
    }

    fn fill_pairs(&mut self) -> Result<bool> {
        loop {
            let Some(doc) = align_all(&mut [&mut self.left, &mut self.right])? else {
                self.current = None;
                return Ok(false);
            };
            let lefts = self.left.take_doc()?;
            let rights = self.right.take_doc()?;
            let ords = self.load_ords(doc)?;
            let buf = gather_pairs(&self.constraints, &ords, self.ordered, &lefts, &rights);
            if !buf.is_empty() {
                self.pending = into_run(buf);
                self.current = self.pending.pop_front();
                return Ok(true);
            }
        }
    }

    fn fill_exclusion(&mut self) -> Result<bool> {
        loop {
            self.left.start()?;
            if !self.left.live() {
                self.current = None;
                return Ok(false);
            }
            let doc = self.left.doc()?;
            let mut rights = Vec::new();
            if self.right.skip_to(doc)? && self.right.doc()? == doc {
                rights = self.right.take_doc()?;
            }
            let lefts = self.left.take_doc()?;
            let ords = self.load_ords(doc)?;
            let mut buf = Vec::new();
            for l in &lefts {
                let near = rights
                    .iter()
                    .any(|r| pair_qualifies(&self.constraints, &ords, self.ordered, l, r));
                if !near {
                    buf.push(l.clone());
                }
            }
            if !buf.is_empty() {
                self.pending = into_run(buf);
                self.current = self.pending.pop_front();
                return Ok(true);
            }
        }
    }

    fn fill(&mut self) -> Result<bool> {
        if self.exclusion {
            self.fill_exclusion()
        } else {
            self.fill_pairs()
        }
    }
}

impl SpanCursor for DistanceCursor {
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
        let left_live = self.left.skip_to(target)?;
        let right_live = self.right.skip_to(target)?;
        if !left_live || (!self.exclusion && !right_live) {
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

    fn spans(items: &[(u32, u32)]) -> Vec<SpanMatch> {
        items.iter().map(|&(s, e)| SpanMatch::new(0, s, e)).collect()
    }

    fn hulls(
        constraints: &[DistanceConstraint],
        ordered: bool,
        lefts: &[(u32, u32)],
        rights: &[(u32, u32)],
    ) -> Vec<(u32, u32)> {
        let ords: Vec<Option<ElementOrdinals>> = constraints.iter().map(|_| None).collect();
        let mut out = gather_pairs(constraints, &ords, ordered, &spans(lefts), &spans(rights));
        out.sort();
        out.dedup();
        out.iter().map(|m| (m.start, m.end)).collect()
    }

    #[test]
    fn test_ordered_band_pairs() {
        let c = [DistanceConstraint::words(1, 2)];
        // Left at 0..1 reaches starts 1 and 2 only.
        assert_eq!(
            hulls(&c, true, &[(0, 1)], &[(1, 2), (2, 3), (3, 4)]),
            vec![(0, 2), (0, 3)]
        );
    }

    #[test]
    fn test_unordered_pairs_both_sides() {
        let c = [DistanceConstraint::words(1, 1)];
        assert_eq!(
            hulls(&c, false, &[(2, 3)], &[(1, 2), (3, 4), (5, 6)]),
            vec![(1, 3), (2, 4)]
        );
    }

    #[test]
    fn test_overlap_needs_zero_minimum() {
        let c1 = [DistanceConstraint::words(1, 3)];
        assert_eq!(hulls(&c1, false, &[(0, 3)], &[(1, 2)]), vec![]);
        let c0 = [DistanceConstraint::words(0, 3)];
        assert_eq!(hulls(&c0, false, &[(0, 3)], &[(1, 2)]), vec![(0, 3)]);
    }

    #[test]
    fn test_every_constraint_must_hold() {
        let c = [
            DistanceConstraint::words(1, 5),
            DistanceConstraint::words(1, 2),
        ];
        // Distance 4 passes the first band but not the second.
        assert_eq!(hulls(&c, true, &[(0, 1)], &[(4, 5)]), vec![]);
        assert_eq!(hulls(&c, true, &[(0, 1)], &[(2, 3)]), vec![(0, 3)]);
    }

    #[test]
    fn test_ordered_rejects_preceding_right() {
        // Distance from 0..1 to 5..6 is 5 either way round.
        let c = [DistanceConstraint::words(1, 5)];
        assert_eq!(hulls(&c, true, &[(5, 6)], &[(0, 1)]), vec![]);
        assert_eq!(hulls(&c, false, &[(5, 6)], &[(0, 1)]), vec![(0, 6)]);
    }
}

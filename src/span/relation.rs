//! Directed edge cursors and the edge/pattern join.
//!
//! Edges are indexed once, from their source marker term; the annotation
//! block keeps them twice-sorted (a by-source array plus a by-target
//! permutation) so a cursor anchored on either side still emits in
//! `(start, end)` order. The anchored side becomes the match span and the
//! opposite side travels along in the payload for joins.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::reader::{CorpusReader, DocStore, PostingsDriver};
use crate::index::term::REL_SOURCE_PREFIX;
use crate::span::window::into_run;
use crate::span::{align_all, unpositioned, BoxCursor, Operand, SpanCursor};
use crate::types::{DocId, MatchPayload, SpanMatch};

/// Which side of an edge a relation cursor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationDirection {
    Source,
    Target,
}

/// Leaf-like cursor over the edges of one relation label.
pub struct RelationCursor {
    driver: PostingsDriver,
    store: DocStore,
    label: String,
    direction: RelationDirection,
    pending: VecDeque<SpanMatch>,
    current: Option<SpanMatch>,
    started: bool,
}

impl RelationCursor {
    pub fn new(reader: &CorpusReader, label: &str, direction: RelationDirection) -> Result<Self> {
        Ok(Self {
            driver: reader.open_postings(&format!("{REL_SOURCE_PREFIX}{label}"))?,
            store: reader.doc_store()?,
            label: label.to_string(),
            direction,
            pending: VecDeque::new(),
            current: None,
            started: false,
        })
    }

    #[inline]
    pub fn direction(&self) -> RelationDirection {
        self.direction
    }

    fn load_doc(&mut self) -> Result<()> {
        let Some(doc) = self.driver.doc() else {
            self.pending.clear();
            return Ok(());
        };
        let label = self.label.clone();
        let direction = self.direction;
        let occs = self.store.with_sidecar(doc, |view| match direction {
            RelationDirection::Source => Ok(view.relations_by_source(&label)),
            RelationDirection::Target => Ok(view.relations_by_target(&label)),
        })?;
        self.pending = occs
            .into_iter()
            .map(|edge| match direction {
                RelationDirection::Source => SpanMatch::with_payload(
                    doc,
                    edge.source_start,
                    edge.source_end,
                    MatchPayload::Relation {
                        counterpart_start: edge.target_start,
                        counterpart_end: edge.target_end,
                    },
                ),
                RelationDirection::Target => SpanMatch::with_payload(
                    doc,
                    edge.target_start,
                    edge.target_end,
                    MatchPayload::Relation {
                        counterpart_start: edge.source_start,
                        counterpart_end: edge.source_end,
                    },
                ),
            })
            .collect();
        Ok(())
    }

    fn fill(&mut self) -> Result<bool> {
        loop {
            if let Some(m) = self.pending.pop_front() {
                self.current = Some(m);
                return Ok(true);
            }
            if self.driver.advance().is_none() {
                self.current = None;
                return Ok(false);
            }
            self.load_doc()?;
        }
    }
}

impl SpanCursor for RelationCursor {
    fn advance(&mut self) -> Result<bool> {
        if !self.started {
            self.started = true;
            if self.driver.doc().is_none() {
                return Ok(false);
            }
            self.load_doc()?;
        }
        self.fill()
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        if let Some(cur) = &self.current {
            if cur.doc >= target {
                return Ok(true);
            }
        }
        self.started = true;
        if self.driver.seek(target).is_none() {
            self.pending.clear();
            self.current = None;
            return Ok(false);
        }
        self.load_doc()?;
        self.fill()
    }

    fn current(&self) -> Result<&SpanMatch> {
        self.current.as_ref().ok_or_else(unpositioned)
    }
}

/// Joins edges against a source pattern and a target pattern by exact span
/// equality on both endpoints.
///
/// The emitted span is the edge's anchored side (per the relation cursor's
/// direction); classes are the union of edge, source-match and target-match
/// annotations. Several edges may share an anchored span, so equal spans
/// with different counterparts are all reported.
pub struct RelationMatchCursor {
    direction: RelationDirection,
    relation: Operand,
    source: Operand,
    target: Operand,
    pending: VecDeque<SpanMatch>,
    current: Option<SpanMatch>,
}

impl RelationMatchCursor {
    pub fn new(relation: RelationCursor, source: BoxCursor, target: BoxCursor) -> Self {
        Self {
            direction: relation.direction(),
            relation: Operand::new(Box::new(relation)),
            source: Operand::new(source),
            target: Operand::new(target),
            pending: VecDeque::new(),
            current: None,
        }
    }

    fn fill(&mut self) -> Result<bool> {
        loop {
            let aligned = align_all(&mut [
                &mut self.relation,
                &mut self.source,
                &mut self.target,
            ])?;
            let Some(doc) = aligned else {
                self.current = None;
                return Ok(false);
            };
            let edges = self.relation.take_doc()?;
            let sources = self.source.take_doc()?;
            let targets = self.target.take_doc()?;

            let mut buf = Vec::new();
            for edge in &edges {
                let MatchPayload::Relation {
                    counterpart_start,
                    counterpart_end,
                } = edge.payload
                else {
                    return Err(Error::IllegalState(
                        "relation join requires edge-bearing matches",
                    ));
                };
                let anchored = (edge.start, edge.end);
                let counterpart = (counterpart_start, counterpart_end);
                let (src_span, tgt_span) = match self.direction {
                    RelationDirection::Source => (anchored, counterpart),
                    RelationDirection::Target => (counterpart, anchored),
                };
                for s in sources.iter().filter(|s| (s.start, s.end) == src_span) {
                    for t in targets.iter().filter(|t| (t.start, t.end) == tgt_span) {
                        let mut m = SpanMatch::new(doc, edge.start, edge.end);
                        m.classes.extend_from_slice(&edge.classes);
                        m.classes.extend_from_slice(&s.classes);
                        m.classes.extend_from_slice(&t.classes);
                        buf.push(m);
                    }
                }
            }
            if !buf.is_empty() {
                self.pending = into_run(buf);
                self.current = self.pending.pop_front();
                return Ok(true);
            }
        }
    }
}

impl SpanCursor for RelationMatchCursor {
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
        self.relation.skip_to(target)?;
        self.source.skip_to(target)?;
        self.target.skip_to(target)?;
        self.fill()
    }

    fn current(&self) -> Result<&SpanMatch> {
        self.current.as_ref().ok_or_else(unpositioned)
    }
}

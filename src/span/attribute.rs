//! Attribute anchors and attribute-filtered spans.
//!
//! An attribute is a marker term anchored to one token position, usually
//! the opening position of a structural element. [`AttributeCursor`] is the
//! plain leaf over those anchors; [`WithAttributesCursor`] filters a base
//! query by the presence or absence of attributes at each base match's
//! anchor, or, without a base, enumerates the elements carrying the
//! attributes directly.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::reader::{CorpusReader, DocStore, PostingsDriver};
use crate::index::sidecar::SidecarView;
use crate::index::term::ATTRIBUTE_PREFIX;
use crate::span::window::into_run;
use crate::span::{unpositioned, BoxCursor, Operand, SpanCursor};
use crate::types::{DocId, MatchPayload, SpanMatch};

/// Emits one width-1 match per anchored attribute occurrence.
pub struct AttributeCursor {
    driver: PostingsDriver,
    store: DocStore,
    name: String,
    pending: VecDeque<SpanMatch>,
    current: Option<SpanMatch>,
    started: bool,
}

impl AttributeCursor {
    pub fn new(reader: &CorpusReader, name: &str) -> Result<Self> {
        Ok(Self {
            driver: reader.open_postings(&format!("{ATTRIBUTE_PREFIX}{name}"))?,
            store: reader.doc_store()?,
            name: name.to_string(),
            pending: VecDeque::new(),
            current: None,
            started: false,
        })
    }

    fn load_doc(&mut self) -> Result<()> {
        let Some(doc) = self.driver.doc() else {
            self.pending.clear();
            return Ok(());
        };
        let name = self.name.clone();
        let occs = self
            .store
            .with_sidecar(doc, |view| Ok(view.attributes_named(&name)))?;
        self.pending = occs
            .into_iter()
            .map(|occ| SpanMatch::new(doc, occ.anchor, occ.anchor + 1))
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

impl SpanCursor for AttributeCursor {
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

/// One attribute predicate of a [`WithAttributesCursor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    pub negated: bool,
}

impl AttributeSpec {
    /// The attribute must be present at the anchor.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            negated: false,
        }
    }

    /// The attribute must be absent at the anchor.
    pub fn forbidden(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            negated: true,
        }
    }
}

enum Mode {
    /// Pass base matches through, filtered at their anchors.
    Filter { base: Operand },
    /// No base: enumerate elements anchored at qualifying attribute
    /// occurrences, driven by the positive attribute markers.
    Seeded { drivers: Vec<PostingsDriver> },
}

/// Filters spans by attributes anchored at their start position.
///
/// With `all_required` every non-negated attribute must be present and
/// every negated one absent; otherwise one satisfied predicate suffices.
/// Without a base query the attribute list must contain positive entries
/// to seed candidate enumeration.
pub struct WithAttributesCursor {
    specs: Vec<AttributeSpec>,
    all_required: bool,
    store: DocStore,
    mode: Mode,
    pending: VecDeque<SpanMatch>,
    current: Option<SpanMatch>,
    started: bool,
}

impl WithAttributesCursor {
    pub fn new(
        reader: &CorpusReader,
        base: Option<BoxCursor>,
        specs: Vec<AttributeSpec>,
        all_required: bool,
    ) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::invalid_query(
                "Attribute filter requires at least one attribute",
            ));
        }
        let mode = match base {
            Some(cursor) => Mode::Filter {
                base: Operand::new(cursor),
            },
            None => {
                if specs.iter().all(|s| s.negated) {
                    return Err(Error::invalid_query(
                        "Attribute filter with only negated attributes requires a base query",
                    ));
                }
                if !all_required && specs.iter().any(|s| s.negated) {
                    return Err(Error::invalid_query(
                        "Disjunctive attribute filter without a base cannot hold negated attributes",
                    ));
                }
                let drivers = if all_required {
                    // Conjunction: any one positive marker's documents are a
                    // superset of the answer, the per-document check does the
                    // rest.
                    let seed = specs.iter().find(|s| !s.negated).map(|s| s.name.clone());
                    match seed {
                        Some(name) => {
                            vec![reader.open_postings(&format!("{ATTRIBUTE_PREFIX}{name}"))?]
                        }
                        None => Vec::new(),
                    }
                } else {
                    specs
                        .iter()
                        .map(|s| reader.open_postings(&format!("{ATTRIBUTE_PREFIX}{}", s.name)))
                        .collect::<Result<Vec<_>>>()?
                };
                Mode::Seeded { drivers }
            }
        };
        Ok(Self {
            specs,
            all_required,
            store: reader.doc_store()?,
            mode,
            pending: VecDeque::new(),
            current: None,
            started: false,
        })
    }

    fn spec_holds(view: &SidecarView<'_>, spec: &AttributeSpec, anchor: u32, depth: Option<u8>) -> bool {
        let present = match view.name_id(&spec.name) {
            Some(id) => match depth {
                Some(d) => view.has_attribute(id, anchor, d),
                None => view.has_attribute_at(id, anchor),
            },
            None => false,
        };
        if spec.negated {
            !present
        } else {
            present
        }
    }

    /// Whether a base match passes the attribute predicates at its anchor.
    fn base_qualifies(
        store: &DocStore,
        specs: &[AttributeSpec],
        all_required: bool,
        m: &SpanMatch,
    ) -> Result<bool> {
        let anchor = m.start;
        let depth = match m.payload {
            MatchPayload::Element { depth, .. } => Some(depth),
            _ => None,
        };
        store.with_sidecar(m.doc, |view| {
            let mut any = false;
            for spec in specs {
                let ok = Self::spec_holds(view, spec, anchor, depth);
                if all_required && !ok {
                    return Ok(false);
                }
                if ok {
                    any = true;
                }
            }
            Ok(all_required || any)
        })
    }

    /// Elements anchored at qualifying attribute occurrences of one document.
    fn gather_seeded(
        store: &DocStore,
        specs: &[AttributeSpec],
        all_required: bool,
        doc: DocId,
    ) -> Result<Vec<SpanMatch>> {
        store.with_sidecar(doc, |view| {
            let mut anchors: Vec<(u32, u8)> = Vec::new();
            for spec in specs.iter().filter(|s| !s.negated) {
                anchors.extend(
                    view.attributes_named(&spec.name)
                        .into_iter()
                        .map(|occ| (occ.anchor, occ.depth)),
                );
                if all_required {
                    // One positive attribute seeds all candidates.
                    break;
                }
            }
            anchors.sort_unstable();
            anchors.dedup();

            let mut out = Vec::new();
            for (anchor, depth) in anchors {
                let qualified = if all_required {
                    specs
                        .iter()
                        .all(|s| Self::spec_holds(view, s, anchor, Some(depth)))
                } else {
                    true
                };
                if !qualified {
                    continue;
                }
                for occ in view.elements_anchored(anchor, depth) {
                    out.push(SpanMatch::with_payload(
                        doc,
                        occ.start,
                        occ.end,
                        MatchPayload::Element {
                            char_start: occ.char_start,
                            char_end: occ.char_end,
                            depth: occ.depth,
                        },
                    ));
                }
            }
            Ok(out)
        })
    }
}

impl SpanCursor for WithAttributesCursor {
    fn advance(&mut self) -> Result<bool> {
        if let Some(m) = self.pending.pop_front() {
            self.current = Some(m);
            return Ok(true);
        }
        match &mut self.mode {
            Mode::Filter { base } => {
                let mut has = if self.started {
                    base.advance()?
                } else {
                    self.started = true;
                    base.start()?;
                    base.live()
                };
                while has {
                    let m = base.current()?.clone();
                    if Self::base_qualifies(&self.store, &self.specs, self.all_required, &m)? {
                        self.current = Some(m);
                        return Ok(true);
                    }
                    has = base.advance()?;
                }
                self.current = None;
                Ok(false)
            }
            Mode::Seeded { drivers } => loop {
                let Some(doc) = drivers.iter().filter_map(|d| d.doc()).min() else {
                    self.current = None;
                    return Ok(false);
                };
                let batch =
                    Self::gather_seeded(&self.store, &self.specs, self.all_required, doc)?;
                for driver in drivers.iter_mut() {
                    if driver.doc() == Some(doc) {
                        driver.advance();
                    }
                }
                if !batch.is_empty() {
                    self.pending = into_run(batch);
                    self.current = self.pending.pop_front();
                    return Ok(true);
                }
            },
        }
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        if let Some(cur) = &self.current {
            if cur.doc >= target {
                return Ok(true);
            }
        }
        self.pending.clear();
        match &mut self.mode {
            Mode::Seeded { drivers } => {
                for driver in drivers.iter_mut() {
                    driver.seek(target);
                }
                self.current = None;
                self.advance()
            }
            Mode::Filter { base } => {
                self.started = true;
                let mut has = base.skip_to(target)?;
                while has {
                    let m = base.current()?.clone();
                    if Self::base_qualifies(&self.store, &self.specs, self.all_required, &m)? {
                        self.current = Some(m);
                        return Ok(true);
                    }
                    has = base.advance()?;
                }
                self.current = None;
                Ok(false)
            }
        }
    }

    fn current(&self) -> Result<&SpanMatch> {
        self.current.as_ref().ok_or_else(unpositioned)
    }
}

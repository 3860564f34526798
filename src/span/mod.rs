//! Span cursor algebra
//!
//! Every query operator evaluates to a [`SpanCursor`]: a forward-only
//! iterator over [`SpanMatch`]es in `(doc, start, end)` order with
//! document-level skip support. Leaf cursors read postings and annotation
//! blocks; combinators compose other cursors and never touch the index
//! directly.
//!
//! This module is organized into the following submodules:
//! - `term`, `element`, `attribute`, `relation`: leaf cursors
//! - `or`: k-way merge
//! - `next`, `within`: adjacency and containment joins
//! - `distance`: token- and element-scoped distance joins with exclusion
//! - `class`, `focus`: capture tagging and projection
//! - `repetition`, `expansion`: self-concatenation and span growth
//! - `window`: per-document ordering buffers and candidate eviction

pub mod attribute;
pub mod class;
pub mod distance;
pub mod element;
pub mod expansion;
pub mod focus;
pub mod next;
pub mod or;
pub mod relation;
pub mod repetition;
pub mod term;
pub mod window;
pub mod within;


pub use attribute::{AttributeCursor, AttributeSpec, WithAttributesCursor};
pub use class::ClassCursor;
pub use distance::{DistanceConstraint, DistanceCursor, DistanceUnit};
pub use element::ElementCursor;
pub use expansion::{ExpandDirection, ExpansionCursor};
pub use focus::{FocusCursor, ReferenceCursor};
pub use next::NextCursor;
pub use or::OrCursor;
pub use relation::{RelationCursor, RelationDirection, RelationMatchCursor};
pub use repetition::RepetitionCursor;
pub use term::TermCursor;
pub use within::{WithinCursor, WithinMode};

use crate::error::{Error, Result};
use crate::types::{DocId, SpanMatch};

/// An ordered, skip-to-capable stream of span matches.
///
/// A fresh cursor is unpositioned: [`SpanCursor::current`] fails until the
/// first [`SpanCursor::advance`] returns `true`. Once `advance` or
/// [`SpanCursor::skip_to`] returns `false` the cursor is exhausted and every
/// later call keeps returning `false`.
pub trait SpanCursor: Send {
    /// Move to the next match in `(doc, start, end)` order.
    fn advance(&mut self) -> Result<bool>;

    /// Move to the first match in a document `>= target`.
    ///
    /// A no-op when the cursor is already positioned at such a document.
    fn skip_to(&mut self, target: DocId) -> Result<bool>;

    /// The match the cursor is positioned on.
    fn current(&self) -> Result<&SpanMatch>;
}

/// Cursors are composed as boxed trait objects.
pub type BoxCursor = Box<dyn SpanCursor>;

pub(crate) fn unpositioned() -> Error {
    Error::IllegalState("cursor is not positioned on a match")
}

/// A child cursor together with the bookkeeping a parent needs while
/// draining it: whether it has been started and whether it still has
/// matches left.
pub(crate) struct Operand {
    cursor: BoxCursor,
    live: bool,
    started: bool,
}

impl Operand {
    pub fn new(cursor: BoxCursor) -> Self {
        Self {
            cursor,
            live: true,
            started: false,
        }
    }

    /// Position on the first match unless already started.
    pub fn start(&mut self) -> Result<()> {
        if !self.started {
            self.started = true;
            self.live = self.cursor.advance()?;
        }
        Ok(())
    }

    #[inline]
    pub fn live(&self) -> bool {
        self.live
    }

    pub fn doc(&self) -> Result<DocId> {
        Ok(self.cursor.current()?.doc)
    }

    pub fn current(&self) -> Result<&SpanMatch> {
        self.cursor.current()
    }

    pub fn advance(&mut self) -> Result<bool> {
        self.started = true;
        self.live = self.cursor.advance()?;
        Ok(self.live)
    }

    pub fn skip_to(&mut self, target: DocId) -> Result<bool> {
        self.started = true;
        if !self.live {
            return Ok(false);
        }
        self.live = self.cursor.skip_to(target)?;
        Ok(self.live)
    }

    /// Drain every match of the current document, leaving the cursor on the
    /// first match of a later document (or exhausted).
    pub fn take_doc(&mut self) -> Result<Vec<SpanMatch>> {
        let doc = self.current()?.doc;
        let mut out = vec![self.current()?.clone()];
        while self.advance()? {
            let m = self.cursor.current()?;
            if m.doc != doc {
                break;
            }
            out.push(m.clone());
        }
        Ok(out)
    }
}

/// Align operands on a common document, starting them if necessary.
///
/// Returns the shared document, or `None` as soon as any operand is
/// exhausted (conjunctive semantics).
pub(crate) fn align_all(operands: &mut [&mut Operand]) -> Result<Option<DocId>> {
    for op in operands.iter_mut() {
        op.start()?;
    }
    loop {
        if operands.iter().any(|op| !op.live()) {
            return Ok(None);
        }
        let mut max = 0;
        for op in operands.iter() {
            max = max.max(op.doc()?);
        }
        let mut aligned = true;
        for op in operands.iter_mut() {
            if op.doc()? < max {
                op.skip_to(max)?;
                aligned = false;
                if !op.live() {
                    return Ok(None);
                }
            }
        }
        if aligned {
            return Ok(Some(max));
        }
    }
}

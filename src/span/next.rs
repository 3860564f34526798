//! Adjacency join.

use std::collections::VecDeque;

use crate::error::Result;
use crate::span::window::into_run;
use crate::span::{align_all, unpositioned, BoxCursor, Operand, SpanCursor};
use crate::types::{DocId, SpanMatch};

/// Emits `[left.start, right.end)` wherever a left occurrence ends exactly
/// where a right occurrence begins. Classes of both sides are carried.
pub struct NextCursor {
    left: Operand,
    right: Operand,
    pending: VecDeque<SpanMatch>,
    current: Option<SpanMatch>,
}

impl NextCursor {
    pub fn new(left: BoxCursor, right: BoxCursor) -> Self {
        Self {
            left: Operand::new(left),
            right: Operand::new(right),
            pending: VecDeque::new(),
            current: None,
        }
    }

    fn fill(&mut self) -> Result<bool> {
        loop {
            let Some(doc) = align_all(&mut [&mut self.left, &mut self.right])? else {
                self.current = None;
                return Ok(false);
            };
            let lefts = self.left.take_doc()?;
            let rights = self.right.take_doc()?;

            let mut buf = Vec::new();
            for l in &lefts {
                let from = rights.partition_point(|r| r.start < l.end);
                for r in rights[from..].iter().take_while(|r| r.start == l.end) {
                    let mut m = SpanMatch::new(doc, l.start, r.end);
                    m.classes.extend_from_slice(&l.classes);
                    m.classes.extend_from_slice(&r.classes);
                    buf.push(m);
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

impl SpanCursor for NextCursor {
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
        self.left.skip_to(target)?;
        self.right.skip_to(target)?;
        self.fill()
    }

    fn current(&self) -> Result<&SpanMatch> {
        self.current.as_ref().ok_or_else(unpositioned)
    }
}

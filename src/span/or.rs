//! K-way disjunction merge.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::span::{unpositioned, BoxCursor, Operand, SpanCursor};
use crate::types::{DocId, SpanMatch};

/// Merges any number of operand streams in `(doc, start, end)` order.
///
/// When several operands sit on the same `(doc, start, end)` span, the
/// first operand's match is emitted and the others' equal-span matches are
/// consumed silently.
pub struct OrCursor {
    branches: Vec<Operand>,
    current: Option<SpanMatch>,
    started: bool,
}

impl OrCursor {
    pub fn new(branches: Vec<BoxCursor>) -> Result<Self> {
        if branches.is_empty() {
            return Err(Error::invalid_query("Or requires at least one operand"));
        }
        Ok(Self {
            branches: branches.into_iter().map(Operand::new).collect(),
            current: None,
            started: false,
        })
    }

    /// Emit the smallest positioned match and consume its duplicates.
    fn pick(&mut self) -> Result<bool> {
        let mut best: Option<usize> = None;
        for (ix, branch) in self.branches.iter().enumerate() {
            if !branch.live() {
                continue;
            }
            match best {
                None => best = Some(ix),
                Some(bi) => {
                    if branch
                        .current()?
                        .position_cmp(self.branches[bi].current()?)
                        == Ordering::Less
                    {
                        best = Some(ix);
                    }
                }
            }
        }
        let Some(bi) = best else {
            self.current = None;
            return Ok(false);
        };
        let chosen = self.branches[bi].current()?.clone();
        self.branches[bi].advance()?;
        for (ix, branch) in self.branches.iter_mut().enumerate() {
            if ix == bi {
                continue;
            }
            while branch.live() && branch.current()?.position_cmp(&chosen) == Ordering::Equal {
                branch.advance()?;
            }
        }
        self.current = Some(chosen);
        Ok(true)
    }
}

impl SpanCursor for OrCursor {
    fn advance(&mut self) -> Result<bool> {
        if !self.started {
            self.started = true;
            for branch in &mut self.branches {
                branch.start()?;
            }
        }
        self.pick()
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        if let Some(cur) = &self.current {
            if cur.doc >= target {
                return Ok(true);
            }
        }
        self.started = true;
        for branch in &mut self.branches {
            branch.skip_to(target)?;
        }
        self.pick()
    }

    fn current(&self) -> Result<&SpanMatch> {
        self.current.as_ref().ok_or_else(unpositioned)
    }
}

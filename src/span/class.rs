//! Capture tagging.

use crate::error::Result;
use crate::span::{unpositioned, BoxCursor, SpanCursor};
use crate::types::{DocId, SpanMatch};

/// Passes the operand through unchanged except that every match gains a
/// class annotation covering its span. Nested tags accumulate inner-first;
/// sibling annotations with the same id are permitted.
pub struct ClassCursor {
    id: u8,
    sub: BoxCursor,
    current: Option<SpanMatch>,
}

impl ClassCursor {
    pub fn new(id: u8, sub: BoxCursor) -> Self {
        Self {
            id,
            sub,
            current: None,
        }
    }

    fn capture(&mut self) -> Result<()> {
        let mut m = self.sub.current()?.clone();
        m.tag_class(self.id);
        self.current = Some(m);
        Ok(())
    }
}

impl SpanCursor for ClassCursor {
    fn advance(&mut self) -> Result<bool> {
        if !self.sub.advance()? {
            self.current = None;
            return Ok(false);
        }
        self.capture()?;
        Ok(true)
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        if let Some(cur) = &self.current {
            if cur.doc >= target {
                return Ok(true);
            }
        }
        if !self.sub.skip_to(target)? {
            self.current = None;
            return Ok(false);
        }
        self.capture()?;
        Ok(true)
    }

    fn current(&self) -> Result<&SpanMatch> {
        self.current.as_ref().ok_or_else(unpositioned)
    }
}

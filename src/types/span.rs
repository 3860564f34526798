use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Document identifier, global across all index segments.
pub type DocId = u32;

/// Highest class id available to callers; larger ids are internal.
pub const MAX_USER_CLASS: u8 = 127;

/// First class id reserved for operator-internal scaffolding.
pub const TEMP_CLASS_MIN: u8 = 129;

/// A highlighted region captured inside a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassAnnotation {
    pub id: u8,
    pub start: u32,
    pub end: u32,
}

impl ClassAnnotation {
    pub fn new(id: u8, start: u32, end: u32) -> Self {
        Self { id, start, end }
    }

    /// Whether this id belongs to operator-internal scaffolding.
    pub fn is_temporary(&self) -> bool {
        self.id >= TEMP_CLASS_MIN
    }
}

/// Extra information a match carries beyond its token span
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum MatchPayload {
    /// Plain token matches and most composites.
    #[default]
    None,
    /// The match covers one occurrence of a markup element.
    Element {
        char_start: u32,
        char_end: u32,
        depth: u8,
    },
    /// The match is one side of a relation edge; the opposite side is kept
    /// so relation joins can line the two up.
    Relation {
        counterpart_start: u32,
        counterpart_end: u32,
    },
}

/// A single span produced by a cursor: a token range inside one document.
///
/// The derived ordering is the evaluation order: document, start, end, with
/// payload and classes as deterministic tie-breaks so equal spans that carry
/// different annotations still sort stably.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpanMatch {
    pub doc: DocId,
    pub start: u32,
    pub end: u32,
    pub payload: MatchPayload,
    pub classes: Vec<ClassAnnotation>,
}

impl SpanMatch {
    pub fn new(doc: DocId, start: u32, end: u32) -> Self {
        Self {
            doc,
            start,
            end,
            payload: MatchPayload::None,
            classes: Vec::new(),
        }
    }

    pub fn with_payload(doc: DocId, start: u32, end: u32, payload: MatchPayload) -> Self {
        Self {
            doc,
            start,
            end,
            payload,
            classes: Vec::new(),
        }
    }

    pub fn length(&self) -> u32 {
        self.end - self.start
    }

    pub fn contains(&self, other: &SpanMatch) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    pub fn overlaps(&self, other: &SpanMatch) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Evaluation order: document, then start, then end.
    pub fn position_cmp(&self, other: &SpanMatch) -> Ordering {
        (self.doc, self.start, self.end).cmp(&(other.doc, other.start, other.end))
    }

    /// Append a class annotation covering this whole match.
    pub fn tag_class(&mut self, id: u8) {
        self.classes.push(ClassAnnotation::new(id, self.start, self.end));
    }

    /// Drop annotations whose id lies in the internal range.
    pub fn strip_temporary_classes(&mut self) {
        self.classes.retain(|c| !c.is_temporary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_by_document_then_position() {
        let mut spans = vec![
            SpanMatch::new(1, 0, 2),
            SpanMatch::new(0, 5, 6),
            SpanMatch::new(0, 5, 9),
            SpanMatch::new(0, 2, 3),
        ];
        spans.sort();
        let pos: Vec<(DocId, u32, u32)> =
            spans.iter().map(|m| (m.doc, m.start, m.end)).collect();
        assert_eq!(pos, vec![(0, 2, 3), (0, 5, 6), (0, 5, 9), (1, 0, 2)]);
    }

    #[test]
    fn test_position_cmp_ignores_annotations() {
        let plain = SpanMatch::new(0, 1, 3);
        let mut tagged = SpanMatch::new(0, 1, 3);
        tagged.tag_class(4);
        assert_eq!(plain.position_cmp(&tagged), Ordering::Equal);
        assert_ne!(plain, tagged);
        // The full order still separates them, with annotations last.
        assert!(plain < tagged);
    }

    #[test]
    fn test_containment_and_overlap() {
        let outer = SpanMatch::new(0, 2, 8);
        let inner = SpanMatch::new(0, 3, 5);
        let touching = SpanMatch::new(0, 8, 9);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.contains(&outer));
        assert!(outer.overlaps(&inner));
        // Half-open intervals: sharing an edge is not an overlap.
        assert!(!outer.overlaps(&touching));
    }

    #[test]
    fn test_temporary_class_boundary() {
        assert!(!ClassAnnotation::new(MAX_USER_CLASS, 0, 1).is_temporary());
        assert!(!ClassAnnotation::new(128, 0, 1).is_temporary());
        assert!(ClassAnnotation::new(TEMP_CLASS_MIN, 0, 1).is_temporary());

        let mut m = SpanMatch::new(0, 0, 2);
        m.tag_class(3);
        m.classes.push(ClassAnnotation::new(130, 0, 1));
        m.strip_temporary_classes();
        assert_eq!(m.classes, vec![ClassAnnotation::new(3, 0, 2)]);
    }
}

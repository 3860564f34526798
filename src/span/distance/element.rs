//! Element-unit distance support.
//!
//! An element-scoped constraint measures how many occurrences of a named
//! element (sentences, say) lie between two spans. Only outermost
//! occurrences count; nested re-entries of the same name do not open new
//! ordinals. A span not contained in any occurrence has no ordinal and
//! cannot satisfy the constraint.

use crate::index::sidecar::SidecarView;

/// Outermost occurrences of one element name in one document, in span
/// order, with ordinal lookup by containment.
pub(crate) struct ElementOrdinals {
    spans: Vec<(u32, u32)>,
}

impl ElementOrdinals {
    pub fn from_view(view: &SidecarView<'_>, name: &str) -> Self {
        let mut spans: Vec<(u32, u32)> = view
            .elements_named(name)
            .into_iter()
            .filter(|e| e.depth == 0)
            .map(|e| (e.start, e.end))
            .collect();
        spans.sort_unstable();
        Self { spans }
    }

    /// Ordinal of the occurrence containing `start..end`, if any.
    pub fn ordinal(&self, start: u32, end: u32) -> Option<u32> {
        let at = self.spans.partition_point(|s| s.0 <= start);
        if at == 0 {
            return None;
        }
        let (occ_start, occ_end) = self.spans[at - 1];
        (start >= occ_start && end <= occ_end).then_some((at - 1) as u32)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }
}

/// Ordinal difference between two contained spans.
pub(crate) fn element_distance(left: u32, right: u32) -> u32 {
    left.abs_diff(right)
}

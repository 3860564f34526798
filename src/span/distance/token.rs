//! Word-unit distance arithmetic.

/// Distance between two spans in words: 0 when they overlap, otherwise the
/// token gap plus one, so adjacent spans measure 1.
pub(crate) fn word_distance(a_start: u32, a_end: u32, b_start: u32, b_end: u32) -> u32 {
    if a_start < b_end && b_start < a_end {
        return 0;
    }
    if a_end <= b_start {
        b_start - a_end + 1
    } else {
        a_start - b_end + 1
    }
}

/// Whether a span ending at `left_end` can still reach a span starting at or
/// after `right_start` within `max` words. Monotone in `right_start`, so a
/// `false` here retires the left span for the rest of the document.
pub(crate) fn within_word_reach(left_end: u32, right_start: u32, max: u32) -> bool {
    left_end as u64 + max as u64 > right_start as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacent_spans_measure_one() {
        assert_eq!(word_distance(0, 2, 2, 3), 1);
        assert_eq!(word_distance(2, 3, 0, 2), 1);
    }

    #[test]
    fn test_gap_adds_to_distance() {
        assert_eq!(word_distance(0, 1, 4, 5), 4);
        assert_eq!(word_distance(4, 5, 0, 1), 4);
    }

    #[test]
    fn test_overlap_measures_zero() {
        assert_eq!(word_distance(0, 3, 2, 5), 0);
        assert_eq!(word_distance(2, 5, 0, 3), 0);
        assert_eq!(word_distance(1, 4, 2, 3), 0);
    }

    #[test]
    fn test_reach_boundary() {
        // Distance from end 3 to start 5 is 3; max 3 reaches, max 2 does not.
        assert!(within_word_reach(3, 5, 3));
        assert!(!within_word_reach(3, 5, 2));
        // Overlapping or preceding rights always stay reachable.
        assert!(within_word_reach(7, 2, 1));
    }

    #[test]
    fn test_reach_survives_large_values() {
        assert!(within_word_reach(u32::MAX, u32::MAX, u32::MAX));
        assert!(!within_word_reach(0, 0, 0));
    }
}

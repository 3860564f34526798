//! Lowering a query tree onto a corpus snapshot.

use crate::error::Result;
use crate::index::CorpusReader;
use crate::span::{
    AttributeCursor, BoxCursor, ClassCursor, DistanceCursor, ElementCursor, ExpansionCursor,
    FocusCursor, NextCursor, OrCursor, ReferenceCursor, RelationCursor, RelationMatchCursor,
    RepetitionCursor, TermCursor, WithAttributesCursor, WithinCursor,
};

use super::SpanQuery;

/// Build the evaluation cursor for a query against one snapshot.
///
/// Construction repeats the checks of [`SpanQuery::validate`] where a bad
/// parameter would corrupt evaluation, so building an unvalidated tree is
/// safe; calling `validate` first just gives errors before any index access.
pub fn build_cursor(reader: &CorpusReader, query: &SpanQuery) -> Result<BoxCursor> {
    Ok(match query {
        SpanQuery::Term { text } => Box::new(TermCursor::new(reader, text)?),
        SpanQuery::Element { name } => Box::new(ElementCursor::new(reader, name)?),
        SpanQuery::Attribute { name } => Box::new(AttributeCursor::new(reader, name)?),
        SpanQuery::Or { operands } => {
            let branches = operands
                .iter()
                .map(|q| build_cursor(reader, q))
                .collect::<Result<Vec<_>>>()?;
            Box::new(OrCursor::new(branches)?)
        }
        SpanQuery::Next { left, right } => Box::new(NextCursor::new(
            build_cursor(reader, left)?,
            build_cursor(reader, right)?,
        )),
        SpanQuery::Within { outer, inner, mode } => Box::new(WithinCursor::new(
            build_cursor(reader, outer)?,
            build_cursor(reader, inner)?,
            *mode,
        )),
        SpanQuery::Distance {
            left,
            right,
            constraint,
            ordered,
            exclusion,
        } => Box::new(DistanceCursor::new(
            reader,
            build_cursor(reader, left)?,
            build_cursor(reader, right)?,
            vec![constraint.clone()],
            *ordered,
            *exclusion,
        )?),
        SpanQuery::MultiDistance {
            left,
            right,
            constraints,
            ordered,
            exclusion,
        } => Box::new(DistanceCursor::new(
            reader,
            build_cursor(reader, left)?,
            build_cursor(reader, right)?,
            constraints.clone(),
            *ordered,
            *exclusion,
        )?),
        SpanQuery::Class { id, operand } => {
            Box::new(ClassCursor::new(*id, build_cursor(reader, operand)?))
        }
        SpanQuery::Focus {
            ids,
            operand,
            sorted,
            window,
        } => Box::new(FocusCursor::new(
            ids.clone(),
            build_cursor(reader, operand)?,
            *sorted,
            *window,
        )),
        SpanQuery::Repetition { operand, min, max } => Box::new(RepetitionCursor::new(
            build_cursor(reader, operand)?,
            *min,
            *max,
        )?),
        SpanQuery::Expansion {
            operand,
            direction,
            min,
            max,
            stop,
            class_id,
        } => Box::new(ExpansionCursor::new(
            reader,
            build_cursor(reader, operand)?,
            *direction,
            *min,
            *max,
            stop.as_deref(),
            *class_id,
        )?),
        SpanQuery::Relation { label, direction } => {
            Box::new(RelationCursor::new(reader, label, *direction)?)
        }
        SpanQuery::RelationMatch {
            label,
            direction,
            source,
            target,
        } => Box::new(RelationMatchCursor::new(
            RelationCursor::new(reader, label, *direction)?,
            build_cursor(reader, source)?,
            build_cursor(reader, target)?,
        )),
        SpanQuery::Reference { operand, class_id } => Box::new(ReferenceCursor::new(
            build_cursor(reader, operand)?,
            *class_id,
        )),
        SpanQuery::WithAttributes {
            base,
            attributes,
            all_required,
        } => {
            let base = base
                .as_ref()
                .map(|q| build_cursor(reader, q))
                .transpose()?;
            Box::new(WithAttributesCursor::new(
                reader,
                base,
                attributes.clone(),
                *all_required,
            )?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{AnnotatedDocument, CorpusIndex};
    use crate::span::{AttributeSpec, SpanCursor};
    use crate::types::DocId;

    fn letters_corpus(letters: &str) -> CorpusIndex {
        let words: Vec<String> = letters.chars().map(|c| c.to_string()).collect();
        let refs: Vec<&str> = words.iter().map(|w| w.as_str()).collect();
        let mut corpus = CorpusIndex::create_in_ram().unwrap();
        corpus
            .add_document(&AnnotatedDocument::from_words("d1", &refs))
            .unwrap();
        corpus.commit().unwrap();
        corpus
    }

    fn drain(cursor: &mut BoxCursor) -> Vec<(DocId, u32, u32)> {
        let mut out = Vec::new();
        while cursor.advance().unwrap() {
            let m = cursor.current().unwrap();
            out.push((m.doc, m.start, m.end));
        }
        out
    }

    #[test]
    fn test_builds_adjacency_tree() {
        let corpus = letters_corpus("abcabcabac");
        let reader = corpus.snapshot().unwrap();
        let q = SpanQuery::next(SpanQuery::term("a"), SpanQuery::term("b"));
        let mut cursor = build_cursor(&reader, &q).unwrap();
        assert_eq!(drain(&mut cursor), vec![(0, 0, 2), (0, 3, 5), (0, 6, 8)]);
    }

    #[test]
    fn test_builds_focus_over_class() {
        let corpus = letters_corpus("abcabcabac");
        let reader = corpus.snapshot().unwrap();
        let q = SpanQuery::focus(
            1,
            SpanQuery::next(SpanQuery::term("a"), SpanQuery::class(1, SpanQuery::term("b"))),
        );
        let mut cursor = build_cursor(&reader, &q).unwrap();
        assert_eq!(drain(&mut cursor), vec![(0, 1, 2), (0, 4, 5), (0, 7, 8)]);
    }

    #[test]
    fn test_build_rejects_bad_parameters() {
        let corpus = letters_corpus("a");
        let reader = corpus.snapshot().unwrap();
        let q = SpanQuery::repetition(SpanQuery::term("a"), 0, 2);
        assert!(build_cursor(&reader, &q).is_err());
        let q = SpanQuery::WithAttributes {
            base: None,
            attributes: vec![AttributeSpec::forbidden("lang=en")],
            all_required: true,
        };
        assert!(build_cursor(&reader, &q).is_err());
    }
}

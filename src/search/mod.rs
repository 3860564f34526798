//! Search surface.
//!
//! [`Searcher`] binds query trees to one corpus snapshot. Evaluation is
//! lazy: [`SearchIterator`] pulls matches from the cursor tree on demand, in
//! `(doc, start, end)` order, applying the result cap and the optional
//! document collection of [`SearchOptions`] without touching cursor
//! internals. A finished iterator is not resumable; call
//! [`Searcher::find`] again to restart from scratch.

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::reader::DocStore;
use crate::index::CorpusReader;
use crate::query::{build_cursor, SpanQuery};
use crate::span::BoxCursor;
use crate::types::{ClassAnnotation, DocId};

/// Evaluation settings orthogonal to the query tree.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Stop after this many matches; `None` drains the snapshot.
    pub limit: Option<usize>,
    /// Only surface matches from documents in this set.
    pub collection: Option<RoaringBitmap>,
    /// Keep internal scaffolding classes instead of stripping them.
    pub keep_temporary_classes: bool,
}

impl SearchOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_collection(mut self, collection: RoaringBitmap) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn keeping_temporary_classes(mut self) -> Self {
        self.keep_temporary_classes = true;
        self
    }
}

/// One surfaced match, with the document key resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub doc: DocId,
    pub key: String,
    pub start: u32,
    pub end: u32,
    pub classes: Vec<ClassAnnotation>,
}

impl Match {
    /// Region captured under one class id, if any.
    pub fn class_span(&self, id: u8) -> Option<(u32, u32)> {
        self.classes
            .iter()
            .find(|c| c.id == id)
            .map(|c| (c.start, c.end))
    }

    /// All regions captured under one class id, in tag order.
    pub fn class_spans(&self, id: u8) -> Vec<(u32, u32)> {
        self.classes
            .iter()
            .filter(|c| c.id == id)
            .map(|c| (c.start, c.end))
            .collect()
    }
}

/// Entry point for evaluating queries against one snapshot.
pub struct Searcher {
    reader: CorpusReader,
}

impl Searcher {
    pub fn new(reader: CorpusReader) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &CorpusReader {
        &self.reader
    }

    /// Validate and lower the query, returning a lazy match stream.
    pub fn find(&self, query: &SpanQuery) -> Result<SearchIterator> {
        self.find_with(query, SearchOptions::default())
    }

    /// Like [`Searcher::find`], with explicit evaluation settings.
    pub fn find_with(&self, query: &SpanQuery, options: SearchOptions) -> Result<SearchIterator> {
        query.validate()?;
        log::debug!("Evaluating span query: {query:?}");
        let cursor = build_cursor(&self.reader, query)?;
        SearchIterator::over(&self.reader, cursor, options)
    }
}

/// Lazy stream of [`Match`]es produced by one [`Searcher::find`] call.
pub struct SearchIterator {
    cursor: BoxCursor,
    store: DocStore,
    options: SearchOptions,
    yielded: usize,
    done: bool,
}

impl SearchIterator {
    fn over(reader: &CorpusReader, cursor: BoxCursor, options: SearchOptions) -> Result<Self> {
        Ok(Self {
            cursor,
            store: reader.doc_store()?,
            options,
            yielded: 0,
            done: false,
        })
    }

    /// The next match, or `None` once the stream (or the cap) runs out.
    pub fn next_match(&mut self) -> Result<Option<Match>> {
        if self.done {
            return Ok(None);
        }
        if let Some(limit) = self.options.limit {
            if self.yielded >= limit {
                self.done = true;
                return Ok(None);
            }
        }
        let mut have = self.cursor.advance()?;
        while have {
            let doc = self.cursor.current()?.doc;
            if let Some(collection) = &self.options.collection {
                if !collection.contains(doc) {
                    have = self.cursor.skip_to(doc + 1)?;
                    continue;
                }
            }
            let key = self
                .store
                .key(doc)?
                .ok_or_else(|| Error::corpus_data(format!("Document {doc} has no key")))?;
            let m = self.cursor.current()?;
            let mut classes = m.classes.clone();
            if !self.options.keep_temporary_classes {
                classes.retain(|c| !c.is_temporary());
            }
            let row = Match {
                doc,
                key,
                start: m.start,
                end: m.end,
                classes,
            };
            self.yielded += 1;
            return Ok(Some(row));
        }
        self.done = true;
        Ok(None)
    }
}

impl Iterator for SearchIterator {
    type Item = Result<Match>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_match().transpose()
    }
}

/// Drains an iterator into a bounded result list.
pub struct MatchCollector {
    limit: Option<usize>,
}

impl MatchCollector {
    pub fn new(limit: Option<usize>) -> Self {
        Self { limit }
    }

    pub fn collect(&self, iter: &mut SearchIterator) -> Result<Vec<Match>> {
        let mut out = Vec::new();
        if self.limit == Some(0) {
            return Ok(out);
        }
        while let Some(m) = iter.next_match()? {
            out.push(m);
            if let Some(limit) = self.limit {
                if out.len() >= limit {
                    break;
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{AnnotatedDocument, CorpusIndex};
    use crate::span::ClassCursor;

    fn four_docs() -> CorpusIndex {
        let mut corpus = CorpusIndex::create_in_ram().unwrap();
        for (i, words) in [
            ["a", "b", "a"],
            ["a", "a", "a"],
            ["b", "b", "b"],
            ["a", "b", "b"],
        ]
        .iter()
        .enumerate()
        {
            corpus
                .add_document(&AnnotatedDocument::from_words(format!("doc-{i}"), words))
                .unwrap();
        }
        corpus.commit().unwrap();
        corpus
    }

    fn positions(matches: &[Match]) -> Vec<(DocId, u32, u32)> {
        matches.iter().map(|m| (m.doc, m.start, m.end)).collect()
    }

    #[test]
    fn test_find_streams_in_order_with_keys() {
        let corpus = four_docs();
        let searcher = Searcher::new(corpus.snapshot().unwrap());
        let mut iter = searcher.find(&SpanQuery::term("a")).unwrap();
        let all = MatchCollector::new(None).collect(&mut iter).unwrap();
        assert_eq!(
            positions(&all),
            vec![
                (0, 0, 1),
                (0, 2, 3),
                (1, 0, 1),
                (1, 1, 2),
                (1, 2, 3),
                (3, 0, 1),
            ]
        );
        assert_eq!(all[0].key, "doc-0");
        assert_eq!(all[5].key, "doc-3");
    }

    #[test]
    fn test_limit_caps_the_stream() {
        let corpus = four_docs();
        let searcher = Searcher::new(corpus.snapshot().unwrap());
        let options = SearchOptions::default().with_limit(3);
        let mut iter = searcher.find_with(&SpanQuery::term("a"), options).unwrap();
        let capped = MatchCollector::new(None).collect(&mut iter).unwrap();
        assert_eq!(positions(&capped), vec![(0, 0, 1), (0, 2, 3), (1, 0, 1)]);
        // Once capped the iterator stays finished.
        assert!(iter.next_match().unwrap().is_none());
    }

    #[test]
    fn test_collector_cap_is_independent_of_iterator_limit() {
        let corpus = four_docs();
        let searcher = Searcher::new(corpus.snapshot().unwrap());
        let mut iter = searcher.find(&SpanQuery::term("a")).unwrap();
        let two = MatchCollector::new(Some(2)).collect(&mut iter).unwrap();
        assert_eq!(positions(&two), vec![(0, 0, 1), (0, 2, 3)]);
        // The iterator itself was not capped and keeps going.
        let rest = MatchCollector::new(None).collect(&mut iter).unwrap();
        assert_eq!(rest.len(), 4);
    }

    #[test]
    fn test_collection_filters_documents() {
        let corpus = four_docs();
        let searcher = Searcher::new(corpus.snapshot().unwrap());
        let mut collection = RoaringBitmap::new();
        collection.insert(1);
        collection.insert(3);
        let options = SearchOptions::default().with_collection(collection);
        let mut iter = searcher.find_with(&SpanQuery::term("a"), options).unwrap();
        let filtered = MatchCollector::new(None).collect(&mut iter).unwrap();
        assert_eq!(
            positions(&filtered),
            vec![(1, 0, 1), (1, 1, 2), (1, 2, 3), (3, 0, 1)]
        );
    }

    #[test]
    fn test_empty_collection_yields_nothing() {
        let corpus = four_docs();
        let searcher = Searcher::new(corpus.snapshot().unwrap());
        let options = SearchOptions::default().with_collection(RoaringBitmap::new());
        let mut iter = searcher.find_with(&SpanQuery::term("a"), options).unwrap();
        assert!(iter.next_match().unwrap().is_none());
    }

    #[test]
    fn test_temporary_classes_stripped_by_default() {
        let corpus = four_docs();
        let reader = corpus.snapshot().unwrap();
        let scaffolded = |reader: &CorpusReader| -> BoxCursor {
            let term = build_cursor(reader, &SpanQuery::class(2, SpanQuery::term("b"))).unwrap();
            Box::new(ClassCursor::new(130, term))
        };

        let mut iter = SearchIterator::over(
            &reader,
            scaffolded(&reader),
            SearchOptions::default().with_limit(1),
        )
        .unwrap();
        let m = iter.next_match().unwrap().unwrap();
        assert_eq!(m.class_span(2), Some((1, 2)));
        assert!(m.class_span(130).is_none());

        let mut iter = SearchIterator::over(
            &reader,
            scaffolded(&reader),
            SearchOptions::default()
                .with_limit(1)
                .keeping_temporary_classes(),
        )
        .unwrap();
        let m = iter.next_match().unwrap().unwrap();
        assert_eq!(m.class_span(130), Some((1, 2)));
    }

    #[test]
    fn test_evaluation_restarts_from_scratch() {
        let corpus = four_docs();
        let searcher = Searcher::new(corpus.snapshot().unwrap());
        let q = SpanQuery::next(SpanQuery::term("a"), SpanQuery::term("b"));
        let first: Vec<_> = positions(
            &MatchCollector::new(None)
                .collect(&mut searcher.find(&q).unwrap())
                .unwrap(),
        );
        let second: Vec<_> = positions(
            &MatchCollector::new(None)
                .collect(&mut searcher.find(&q).unwrap())
                .unwrap(),
        );
        assert_eq!(first, second);
        assert_eq!(first, vec![(0, 0, 2), (3, 0, 2)]);
    }

    #[test]
    fn test_iterator_adapter_yields_results() {
        let corpus = four_docs();
        let searcher = Searcher::new(corpus.snapshot().unwrap());
        let iter = searcher.find(&SpanQuery::term("b")).unwrap();
        let docs: Vec<DocId> = iter.map(|m| m.unwrap().doc).collect();
        assert_eq!(docs, vec![0, 2, 2, 2, 3, 3]);
    }
}

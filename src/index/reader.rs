//! Snapshot access to a committed corpus.
//!
//! A [`CorpusReader`] wraps one point-in-time searcher and maps between
//! global document ids and (segment, local id) pairs. Global ids number
//! documents in commit order: segment base + local id, with segments in
//! the order the searcher lists them. The writer keeps that order stable
//! (single indexing thread, no merging).

use std::sync::Arc;

use tantivy::postings::{Postings, SegmentPostings};
use tantivy::schema::{Field, TantivyDocument, Value};
use tantivy::store::StoreReader;
use tantivy::{DocSet, Searcher, Term};

use crate::error::{Error, Result};
use crate::index::sidecar::SidecarView;
use crate::types::DocId;

/// Blocks of the stored-field cache kept per segment.
const STORE_CACHE_BLOCKS: usize = 1;

fn locate_doc(bases: &[DocId], doc: DocId) -> Option<(usize, tantivy::DocId)> {
    let total = *bases.last()?;
    if doc >= total {
        return None;
    }
    let seg = bases.partition_point(|&b| b <= doc) - 1;
    Some((seg, doc - bases[seg]))
}

/// Point-in-time view of a corpus, shared by all cursors of one query.
#[derive(Clone)]
pub struct CorpusReader {
    searcher: Searcher,
    /// Segment doc-id bases with a trailing total, length = segments + 1.
    bases: Arc<Vec<DocId>>,
    annotations_field: Field,
    binary_field: Field,
    key_field: Field,
    text_field: Field,
}

impl CorpusReader {
    pub(crate) fn new(
        searcher: Searcher,
        annotations_field: Field,
        binary_field: Field,
        key_field: Field,
        text_field: Field,
    ) -> Result<Self> {
        let mut bases = Vec::with_capacity(searcher.segment_readers().len() + 1);
        let mut running = 0u32;
        for segment in searcher.segment_readers() {
            bases.push(running);
            running += segment.num_docs();
        }
        bases.push(running);
        Ok(Self {
            searcher,
            bases: Arc::new(bases),
            annotations_field,
            binary_field,
            key_field,
            text_field,
        })
    }

    /// Number of documents visible in this snapshot.
    pub fn doc_count(&self) -> u32 {
        *self.bases.last().unwrap_or(&0)
    }

    /// Resolve the stored key of a document.
    pub fn doc_key(&self, doc: DocId) -> Result<Option<String>> {
        self.doc_store()?.key(doc)
    }

    /// Resolve the stored raw text of a document.
    pub fn doc_text(&self, doc: DocId) -> Result<Option<String>> {
        self.doc_store()?.text(doc)
    }

    /// Open per-segment postings for one annotation term.
    pub(crate) fn open_postings(&self, term_text: &str) -> Result<PostingsDriver> {
        let term = Term::from_field_text(self.annotations_field, term_text);
        let mut segments = Vec::with_capacity(self.searcher.segment_readers().len());
        for segment in self.searcher.segment_readers() {
            let inverted = segment.inverted_index(self.annotations_field)?;
            let postings = inverted.read_postings(
                &term,
                tantivy::schema::IndexRecordOption::WithFreqsAndPositions,
            )?;
            segments.push(postings);
        }
        Ok(PostingsDriver::new(segments, Arc::clone(&self.bases)))
    }

    /// Open stored-field access (annotation blocks, keys, text).
    pub(crate) fn doc_store(&self) -> Result<DocStore> {
        let mut stores = Vec::with_capacity(self.searcher.segment_readers().len());
        for segment in self.searcher.segment_readers() {
            stores.push(segment.get_store_reader(STORE_CACHE_BLOCKS)?);
        }
        Ok(DocStore {
            stores,
            bases: Arc::clone(&self.bases),
            binary_field: self.binary_field,
            key_field: self.key_field,
            text_field: self.text_field,
        })
    }
}

/// Walks the documents containing one term, across all segments, in global
/// doc-id order. Freshly opened drivers are positioned on their first doc.
pub(crate) struct PostingsDriver {
    segments: Vec<Option<SegmentPostings>>,
    bases: Arc<Vec<DocId>>,
    seg: usize,
    current: Option<DocId>,
}

impl PostingsDriver {
    fn new(segments: Vec<Option<SegmentPostings>>, bases: Arc<Vec<DocId>>) -> Self {
        let mut driver = Self {
            segments,
            bases,
            seg: 0,
            current: None,
        };
        driver.enter_segment_at(0);
        driver
    }

    /// Current document, or `None` once exhausted (or if the term does not
    /// occur at all).
    #[inline]
    pub fn doc(&self) -> Option<DocId> {
        self.current
    }

    /// Move to the next document containing the term.
    pub fn advance(&mut self) -> Option<DocId> {
        self.current?;
        if let Some(Some(postings)) = self.segments.get_mut(self.seg) {
            let local = postings.advance();
            if local != tantivy::TERMINATED {
                self.current = Some(self.bases[self.seg] + local);
                return self.current;
            }
        }
        self.enter_segment_at(self.seg + 1)
    }

    /// Move to the first document >= `target`. No-op if already there.
    pub fn seek(&mut self, target: DocId) -> Option<DocId> {
        match self.current {
            None => return None,
            Some(doc) if doc >= target => return self.current,
            Some(_) => {}
        }
        // Segment that could contain the target.
        let mut seg = self.seg;
        while seg + 1 < self.segments.len() && self.bases[seg + 1] <= target {
            seg += 1;
        }
        if seg == self.seg {
            // Same segment the driver is positioned in; its postings exist.
            if let Some(Some(postings)) = self.segments.get_mut(seg) {
                let local = postings.seek(target - self.bases[seg]);
                if local != tantivy::TERMINATED {
                    self.current = Some(self.bases[seg] + local);
                    return self.current;
                }
            }
            return self.enter_segment_at(seg + 1);
        }
        for s in seg..self.segments.len() {
            let base = self.bases[s];
            let Some(postings) = self.segments.get_mut(s).and_then(Option::as_mut) else {
                continue;
            };
            if postings.doc() == tantivy::TERMINATED {
                continue;
            }
            let local_target = target.saturating_sub(base);
            let local = if postings.doc() >= local_target {
                postings.doc()
            } else {
                postings.seek(local_target)
            };
            if local != tantivy::TERMINATED {
                self.seg = s;
                self.current = Some(base + local);
                return self.current;
            }
        }
        self.exhaust()
    }

    /// Term positions within the current document.
    pub fn positions(&mut self, output: &mut Vec<u32>) {
        output.clear();
        if self.current.is_none() {
            return;
        }
        if let Some(Some(postings)) = self.segments.get_mut(self.seg) {
            postings.positions(output);
        }
    }

    fn enter_segment_at(&mut self, start: usize) -> Option<DocId> {
        for s in start..self.segments.len() {
            if let Some(postings) = &self.segments[s] {
                if postings.doc() != tantivy::TERMINATED {
                    self.seg = s;
                    self.current = Some(self.bases[s] + postings.doc());
                    return self.current;
                }
            }
        }
        self.exhaust()
    }

    fn exhaust(&mut self) -> Option<DocId> {
        self.seg = self.segments.len();
        self.current = None;
        None
    }
}

/// Per-segment stored field access shared by the cursors of one query.
pub(crate) struct DocStore {
    stores: Vec<StoreReader>,
    bases: Arc<Vec<DocId>>,
    binary_field: Field,
    key_field: Field,
    text_field: Field,
}

impl DocStore {
    /// Run `f` against the document's annotation block.
    pub fn with_sidecar<T>(
        &self,
        doc: DocId,
        f: impl FnOnce(&SidecarView<'_>) -> Result<T>,
    ) -> Result<T> {
        let (seg, local) = locate_doc(&self.bases, doc)
            .ok_or_else(|| Error::corpus_data(format!("Document {doc} out of range")))?;
        let stored: TantivyDocument = self.stores[seg].get(local)?;
        let bytes = stored
            .get_first(self.binary_field)
            .and_then(|v| v.as_bytes())
            .ok_or_else(|| {
                Error::corpus_data(format!("Document {doc} has no annotation block"))
            })?;
        let view = SidecarView::from_bytes(bytes)?;
        f(&view)
    }

    pub fn key(&self, doc: DocId) -> Result<Option<String>> {
        self.stored_text(doc, self.key_field)
    }

    pub fn text(&self, doc: DocId) -> Result<Option<String>> {
        self.stored_text(doc, self.text_field)
    }

    fn stored_text(&self, doc: DocId, field: Field) -> Result<Option<String>> {
        let Some((seg, local)) = locate_doc(&self.bases, doc) else {
            return Ok(None);
        };
        let stored: TantivyDocument = self.stores[seg].get(local)?;
        Ok(stored
            .get_first(field)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()))
    }
}

//! Corpus index: schema, writer, and snapshot access.
//!
//! Annotation terms are indexed pre-tokenized into a single positional
//! field, so every layer of a token bundle lands on the same position.
//! Payload-bearing data goes into the per-document annotation block stored
//! in a bytes field (see [`crate::index::sidecar`]).

use std::path::Path;

use tantivy::directory::MmapDirectory;
use tantivy::merge_policy::NoMergePolicy;
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TantivyDocument, TextFieldIndexing, TextOptions, STORED,
    STRING,
};
use tantivy::tokenizer::{PreTokenizedString, Token};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy};

use crate::error::{Error, Result};
use crate::index::document::AnnotatedDocument;
use crate::index::reader::CorpusReader;
use crate::index::sidecar::SidecarBuilder;
use crate::index::term::{MultiTerm, TermKind};

/// Stored document identifier field.
pub const FIELD_KEY: &str = "key";
/// Stored raw text field.
pub const FIELD_TEXT: &str = "text";
/// Positional field holding every annotation term.
pub const FIELD_ANNOTATIONS: &str = "annotations";
/// Stored bytes field holding the annotation block.
pub const FIELD_ANNOTATIONS_BINARY: &str = "annotations_bin";

const WRITER_MEMORY_BUDGET: usize = 50_000_000;

/// An annotated corpus backed by a positional inverted index.
pub struct CorpusIndex {
    index: Index,
    reader: IndexReader,
    writer: Option<IndexWriter>,
    key_field: Field,
    text_field: Field,
    annotations_field: Field,
    binary_field: Field,
}

impl CorpusIndex {
    /// Create a volatile in-memory corpus. Used heavily in tests.
    pub fn create_in_ram() -> Result<Self> {
        let index = Index::create_in_ram(Self::build_schema());
        Self::from_index(index)
    }

    /// Open a corpus directory, creating it on first use.
    ///
    /// If another process holds the write lock the corpus opens in
    /// read-only mode: queries work, `add_document` fails.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let dir = MmapDirectory::open(path.as_ref()).map_err(tantivy::TantivyError::from)?;
        let index = Index::open_or_create(dir, Self::build_schema())?;
        Self::from_index(index)
    }

    fn build_schema() -> Schema {
        let mut builder = Schema::builder();
        builder.add_text_field(FIELD_KEY, STRING | STORED);
        builder.add_text_field(FIELD_TEXT, STORED);
        let annotations = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("raw")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );
        builder.add_text_field(FIELD_ANNOTATIONS, annotations);
        builder.add_bytes_field(FIELD_ANNOTATIONS_BINARY, STORED);
        builder.build()
    }

    fn from_index(index: Index) -> Result<Self> {
        let schema = index.schema();
        // One indexing thread and no merging keep segment order equal to
        // commit order, which is what makes global document ids stable.
        let writer = match index.writer_with_num_threads(1, WRITER_MEMORY_BUDGET) {
            Ok(w) => {
                w.set_merge_policy(Box::new(NoMergePolicy));
                Some(w)
            }
            Err(tantivy::TantivyError::LockFailure(e, _)) => {
                log::warn!("Could not acquire index lock, running in read-only mode: {}", e);
                None
            }
            Err(e) => return Err(e.into()),
        };
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let key_field = schema.get_field(FIELD_KEY)?;
        let text_field = schema.get_field(FIELD_TEXT)?;
        let annotations_field = schema.get_field(FIELD_ANNOTATIONS)?;
        let binary_field = schema.get_field(FIELD_ANNOTATIONS_BINARY)?;
        Ok(Self {
            index,
            reader,
            writer,
            key_field,
            text_field,
            annotations_field,
            binary_field,
        })
    }

    /// Whether this corpus can accept documents.
    pub fn is_writable(&self) -> bool {
        self.writer.is_some()
    }

    /// Queue one document for indexing. Not visible until [`Self::commit`].
    pub fn add_document(&mut self, doc: &AnnotatedDocument) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or(Error::IllegalState("corpus is read-only"))?;

        let mut sidecar = SidecarBuilder::new(doc.token_count());
        let mut tokens = Vec::new();
        for (position, bundle) in doc.tokens.iter().enumerate() {
            let position = position as u32;
            for raw in bundle {
                let term = MultiTerm::parse(raw)?;
                let mut token = Token {
                    offset_from: 0,
                    offset_to: 0,
                    position: position as usize,
                    text: term.text.clone(),
                    position_length: 1,
                };
                match term.kind {
                    TermKind::Plain => {}
                    TermKind::Element(p) => {
                        sidecar.add_element(
                            term.name(),
                            position,
                            p.end,
                            p.char_start,
                            p.char_end,
                            p.depth,
                        )?;
                    }
                    TermKind::RelationSource(p) => {
                        sidecar.add_relation(
                            term.name(),
                            position,
                            p.end,
                            p.counterpart_start,
                            p.counterpart_end,
                        )?;
                    }
                    // Edges are recorded once, from their source term; the
                    // target marker only contributes a posting.
                    TermKind::RelationTarget(_) => {}
                    TermKind::Attribute { depth } => {
                        sidecar.add_attribute(term.name(), position, depth)?;
                    }
                    TermKind::Position {
                        token: carrier,
                        char_start,
                        char_end,
                    } => {
                        if carrier != position {
                            return Err(Error::corpus_data(format!(
                                "Offset term '_{carrier}' found at position {position} in document '{}'",
                                doc.key
                            )));
                        }
                        sidecar.set_token_offsets(position, char_start, char_end)?;
                        token.offset_from = char_start as usize;
                        token.offset_to = char_end as usize;
                    }
                }
                tokens.push(token);
            }
        }
        let block = sidecar.serialize()?;

        let mut tdoc = TantivyDocument::default();
        tdoc.add_text(self.key_field, &doc.key);
        tdoc.add_text(self.text_field, &doc.text);
        tdoc.add_pre_tokenized_text(
            self.annotations_field,
            PreTokenizedString {
                text: String::new(),
                tokens,
            },
        );
        tdoc.add_bytes(self.binary_field, &*block);
        writer.add_document(tdoc)?;
        Ok(())
    }

    /// Commit queued documents and refresh the reader.
    pub fn commit(&mut self) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or(Error::IllegalState("corpus is read-only"))?;
        writer.commit()?;
        self.reader.reload()?;
        log::debug!("Commit complete, {} documents visible", self.doc_count());
        Ok(())
    }

    /// Number of committed documents.
    pub fn doc_count(&self) -> u32 {
        self.reader.searcher().num_docs() as u32
    }

    /// Take a point-in-time snapshot for query evaluation.
    pub fn snapshot(&self) -> Result<CorpusReader> {
        CorpusReader::new(
            self.reader.searcher(),
            self.annotations_field,
            self.binary_field,
            self.key_field,
            self.text_field,
        )
    }

    /// Underlying index, for maintenance tooling.
    pub fn raw_index(&self) -> &Index {
        &self.index
    }
}

//! Corpus indexing and snapshot access
//!
//! This module is organized into the following submodules:
//! - `term`: Annotation term syntax (prefix + optional binary payload)
//! - `sidecar`: Per-document binary annotation block (elements, attributes,
//!   relations, token offsets)
//! - `document`: Input document shape and JSON ingestion
//! - `corpus`: The writable index (schema, writer, commits)
//! - `reader`: Point-in-time snapshots, postings access, stored fields

pub mod corpus;
pub mod document;
pub mod reader;
pub mod sidecar;
pub mod term;

pub use corpus::{
    CorpusIndex, FIELD_ANNOTATIONS, FIELD_ANNOTATIONS_BINARY, FIELD_KEY, FIELD_TEXT,
};
pub use document::AnnotatedDocument;
pub use reader::CorpusReader;
pub use sidecar::{AttributeOcc, ElementOcc, RelationOcc, SidecarBuilder, SidecarView};
pub use term::{MultiTerm, TermKind};

pub mod error;
pub mod index;
pub mod query;
pub mod search;
pub mod span;
pub mod types;

pub use error::{Error, Result};
pub use index::{AnnotatedDocument, CorpusIndex, CorpusReader};
pub use query::{build_cursor, SpanQuery};
pub use search::{Match, MatchCollector, SearchIterator, SearchOptions, Searcher};
pub use span::{BoxCursor, SpanCursor};
pub use types::{ClassAnnotation, DocId, MatchPayload, SpanMatch};

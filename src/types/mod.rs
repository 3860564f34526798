pub mod span;

pub use span::{
    ClassAnnotation, DocId, MatchPayload, SpanMatch, MAX_USER_CLASS, TEMP_CLASS_MIN,
};

//! Error types shared by event readers, event writers and object translators.
//!
//! Each concern gets its own `thiserror` enum. Format specific syntax errors live
//! next to their parser in [`crate::formats`] and are folded into [`ReadError`]
//! through [`FormatError`].

use std::fmt;

use thiserror::Error;

use crate::events::EventType;
use crate::formats::FormatError;
use crate::parent::StructureViolation;

/// Position inside a text source. Both values are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

fn describe_parent(parent: &Option<EventType>) -> String {
    match parent {
        Some(parent) => format!("an event of the type {}", parent),
        None => "the document root".to_string(),
    }
}

/// Errors raised while pulling events from a reader.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("No more events are available from this reader")]
    EndOfStream,

    #[error("Unexpected event sequence: {0}")]
    UnexpectedSequence(String),

    #[error(
        "An event of the type {event} was encountered under {} which is not allowed here",
        describe_parent(.parent)
    )]
    Structure {
        event: EventType,
        parent: Option<EventType>,
    },

    #[error("The source ended while an event of the type {open} was still open")]
    PrematureEnd { open: EventType },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("The reader has already been closed")]
    Closed,
}

impl From<StructureViolation> for ReadError {
    fn from(violation: StructureViolation) -> Self {
        ReadError::Structure {
            event: violation.event,
            parent: violation.parent,
        }
    }
}

impl From<EventError> for ReadError {
    fn from(err: EventError) -> Self {
        ReadError::UnexpectedSequence(err.to_string())
    }
}

/// Result type for reading operations.
pub type ReadResult<T> = Result<T, ReadError>;

/// Errors raised while writing a document from data adapters.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error(
        "An event of the type {event} was encountered under {} which is invalid in this receiver",
        describe_parent(.parent)
    )]
    IllegalEvent {
        event: EventType,
        parent: Option<EventType>,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Inconsistent adapter data: {0}")]
    InconsistentAdapterData(String),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StructureViolation> for WriteError {
    fn from(violation: StructureViolation) -> Self {
        WriteError::IllegalEvent {
            event: violation.event,
            parent: violation.parent,
        }
    }
}

/// Result type for writing operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// Errors raised when an event would be constructed in an invalid state, or when a
/// run of continued content events is broken.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("A literal metadata content event carrying an object value cannot be continued in a following event")]
    ContinuedObjectValue,

    #[error("A further literal metadata content event was found after its content was already terminated")]
    ContentAfterTermination,

    #[error("A run of continued content events was interrupted before its final part")]
    UnterminatedContinuation,
}

/// Errors raised by object translators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("Invalid source data for {data_type}: {message}")]
    InvalidSourceData { data_type: String, message: String },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventContentType, EventType};

    #[test]
    fn test_illegal_event_message_names_both_types() {
        let err = WriteError::IllegalEvent {
            event: EventType::sole(EventContentType::LiteralMetaContent),
            parent: Some(EventType::start(EventContentType::Sequence)),
        };
        let message = err.to_string();
        assert!(message.contains("LITERAL_META_CONTENT"));
        assert!(message.contains("SEQUENCE"));
    }

    #[test]
    fn test_structure_error_without_parent() {
        let err = ReadError::Structure {
            event: EventType::end(EventContentType::Node),
            parent: None,
        };
        assert!(err.to_string().contains("document root"));
    }

    #[test]
    fn test_source_location_display() {
        assert_eq!(SourceLocation::new(3, 14).to_string(), "line 3, column 14");
    }
}

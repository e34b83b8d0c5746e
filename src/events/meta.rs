//! Metadata events and the reassembly of continued literal content.

use std::borrow::Cow;
use std::fmt;

use crate::error::EventError;

/// XML Schema namespace used for the predefined data types.
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// A namespace qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub namespace_uri: String,
    pub local_part: String,
    pub prefix: Option<String>,
}

impl QName {
    pub fn new(namespace_uri: impl Into<String>, local_part: impl Into<String>) -> Self {
        Self {
            namespace_uri: namespace_uri.into(),
            local_part: local_part.into(),
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// A name in the XML Schema namespace, e.g. `xsd:double`.
    pub fn xsd(local_part: &str) -> Self {
        Self::new(XSD_NAMESPACE, local_part).with_prefix("xsd")
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local_part),
            None if self.namespace_uri.is_empty() => f.write_str(&self.local_part),
            None => write!(f, "{{{}}}{}", self.namespace_uri, self.local_part),
        }
    }
}

/// Identifies a metadata predicate or relation either by a plain string key, a
/// qualified URI, or both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UriOrStringIdentifier {
    string_representation: Option<String>,
    uri: Option<QName>,
}

impl UriOrStringIdentifier {
    pub fn from_string(key: impl Into<String>) -> Self {
        Self {
            string_representation: Some(key.into()),
            uri: None,
        }
    }

    pub fn from_uri(uri: QName) -> Self {
        Self {
            string_representation: None,
            uri: Some(uri),
        }
    }

    pub fn new(key: impl Into<String>, uri: QName) -> Self {
        Self {
            string_representation: Some(key.into()),
            uri: Some(uri),
        }
    }

    pub fn string_representation(&self) -> Option<&str> {
        self.string_representation.as_deref()
    }

    pub fn uri(&self) -> Option<&QName> {
        self.uri.as_ref()
    }

    /// A printable key: the string form if present, otherwise the URI.
    pub fn key(&self) -> Cow<'_, str> {
        match (&self.string_representation, &self.uri) {
            (Some(key), _) => Cow::Borrowed(key),
            (None, Some(uri)) if uri.prefix.is_none() && uri.namespace_uri.is_empty() => {
                Cow::Borrowed(&uri.local_part)
            }
            (None, Some(uri)) => Cow::Owned(uri.to_string()),
            (None, None) => Cow::Borrowed(""),
        }
    }
}

impl fmt::Display for UriOrStringIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// How the content of a literal metadata element is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralContentSequenceType {
    /// One or more `LITERAL_META_CONTENT` events carrying string or object values.
    Simple,
    /// Structured XML content.
    Xml,
}

/// A typed metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Double(f64),
    List(Vec<ObjectValue>),
}

impl fmt::Display for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectValue::String(value) => f.write_str(value),
            ObjectValue::Boolean(value) => write!(f, "{}", value),
            ObjectValue::Integer(value) => write!(f, "{}", value),
            ObjectValue::Double(value) => write!(f, "{}", value),
            ObjectValue::List(values) => {
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", value)?;
                }
                Ok(())
            }
        }
    }
}

/// START of a literal metadata element.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralMetadataEvent {
    pub id: String,
    pub label: Option<String>,
    pub predicate: UriOrStringIdentifier,
    pub sequence_type: LiteralContentSequenceType,
}

impl LiteralMetadataEvent {
    pub fn new(
        id: impl Into<String>,
        label: Option<String>,
        predicate: UriOrStringIdentifier,
        sequence_type: LiteralContentSequenceType,
    ) -> Self {
        Self {
            id: id.into(),
            label,
            predicate,
            sequence_type,
        }
    }

    /// A simple literal with a string predicate.
    pub fn simple(id: impl Into<String>, predicate: impl Into<String>) -> Self {
        Self::new(
            id,
            None,
            UriOrStringIdentifier::from_string(predicate),
            LiteralContentSequenceType::Simple,
        )
    }
}

/// One part of the value of a literal metadata element.
///
/// A value may be split over several events. All but the last one are flagged as
/// continued. An event carrying an object value is always the last part.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralMetadataContentEvent {
    string_value: Option<String>,
    object_value: Option<ObjectValue>,
    continued_in_next_event: bool,
}

impl LiteralMetadataContentEvent {
    pub fn try_new(
        string_value: Option<String>,
        object_value: Option<ObjectValue>,
        continued_in_next_event: bool,
    ) -> Result<Self, EventError> {
        if object_value.is_some() && continued_in_next_event {
            return Err(EventError::ContinuedObjectValue);
        }
        Ok(Self {
            string_value,
            object_value,
            continued_in_next_event,
        })
    }

    pub fn from_string(value: impl Into<String>, continued_in_next_event: bool) -> Self {
        Self {
            string_value: Some(value.into()),
            object_value: None,
            continued_in_next_event,
        }
    }

    /// A complete value given as object, optionally with its source representation.
    pub fn from_object(object_value: ObjectValue, string_value: Option<String>) -> Self {
        Self {
            string_value,
            object_value: Some(object_value),
            continued_in_next_event: false,
        }
    }

    /// The string form of this part. Falls back to the rendered object value.
    pub fn string_value(&self) -> Option<Cow<'_, str>> {
        match (&self.string_value, &self.object_value) {
            (Some(value), _) => Some(Cow::Borrowed(value)),
            (None, Some(object)) => Some(Cow::Owned(object.to_string())),
            (None, None) => None,
        }
    }

    pub fn object_value(&self) -> Option<&ObjectValue> {
        self.object_value.as_ref()
    }

    pub fn is_continued_in_next_event(&self) -> bool {
        self.continued_in_next_event
    }
}

/// START of a resource metadata element, which groups nested metadata under a
/// relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMetadataEvent {
    pub id: String,
    pub label: Option<String>,
    pub rel: UriOrStringIdentifier,
    pub href: Option<String>,
    pub about: Option<String>,
}

impl ResourceMetadataEvent {
    pub fn new(id: impl Into<String>, label: Option<String>, rel: UriOrStringIdentifier) -> Self {
        Self {
            id: id.into(),
            label,
            rel,
            href: None,
            about: None,
        }
    }
}

/// Concatenates the parts of one literal metadata value.
///
/// Feed it every content event of one literal element and call [`finish`] at the
/// END of the element. Non-content events seen in between must be announced
/// through [`interrupt`] so that a broken run of continued parts is detected.
///
/// [`finish`]: LiteralContentAssembler::finish
/// [`interrupt`]: LiteralContentAssembler::interrupt
#[derive(Debug, Default, Clone)]
pub struct LiteralContentAssembler {
    buffer: String,
    in_run: bool,
    completed: Option<String>,
}

impl LiteralContentAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: &LiteralMetadataContentEvent) -> Result<(), EventError> {
        if self.completed.is_some() {
            return Err(EventError::ContentAfterTermination);
        }
        if let Some(value) = event.string_value() {
            self.buffer.push_str(&value);
        }
        if event.is_continued_in_next_event() {
            self.in_run = true;
        } else {
            self.in_run = false;
            self.completed = Some(std::mem::take(&mut self.buffer));
        }
        Ok(())
    }

    /// Signals a non-content event inside the literal element.
    pub fn interrupt(&self) -> Result<(), EventError> {
        if self.in_run {
            Err(EventError::UnterminatedContinuation)
        } else {
            Ok(())
        }
    }

    /// Returns the assembled value, or `None` if no content event was pushed, and
    /// resets the assembler.
    pub fn finish(&mut self) -> Result<Option<String>, EventError> {
        self.interrupt()?;
        self.buffer.clear();
        Ok(self.completed.take())
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.in_run = false;
        self.completed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_value_cannot_be_continued() {
        let result = LiteralMetadataContentEvent::try_new(
            Some("1.5".into()),
            Some(ObjectValue::Double(1.5)),
            true,
        );
        assert_eq!(result, Err(EventError::ContinuedObjectValue));

        let event =
            LiteralMetadataContentEvent::try_new(None, Some(ObjectValue::Double(1.5)), false)
                .unwrap();
        assert_eq!(event.string_value().as_deref(), Some("1.5"));
    }

    #[test]
    fn test_assembler_concatenates_parts() {
        let mut assembler = LiteralContentAssembler::new();
        assembler
            .push(&LiteralMetadataContentEvent::from_string("ab", true))
            .unwrap();
        assembler.interrupt().unwrap_err();
        assembler
            .push(&LiteralMetadataContentEvent::from_string("cd", false))
            .unwrap();
        assert_eq!(assembler.finish().unwrap().as_deref(), Some("abcd"));
        assert_eq!(assembler.finish().unwrap(), None);
    }

    #[test]
    fn test_assembler_rejects_content_after_last_part() {
        let mut assembler = LiteralContentAssembler::new();
        assembler
            .push(&LiteralMetadataContentEvent::from_string("a", false))
            .unwrap();
        let err = assembler
            .push(&LiteralMetadataContentEvent::from_string("b", false))
            .unwrap_err();
        assert_eq!(err, EventError::ContentAfterTermination);
    }

    #[test]
    fn test_assembler_rejects_open_run_at_finish() {
        let mut assembler = LiteralContentAssembler::new();
        assembler
            .push(&LiteralMetadataContentEvent::from_string("a", true))
            .unwrap();
        assert_eq!(
            assembler.finish(),
            Err(EventError::UnterminatedContinuation)
        );
    }

    #[test]
    fn test_identifier_key() {
        assert_eq!(UriOrStringIdentifier::from_string("Title").key(), "Title");
        let uri = UriOrStringIdentifier::from_uri(QName::xsd("string"));
        assert_eq!(uri.key(), "xsd:string");
        assert_eq!(
            QName::new("http://example.org/", "rel").to_string(),
            "{http://example.org/}rel"
        );
    }

    #[test]
    fn test_list_value_display() {
        let list = ObjectValue::List(vec![ObjectValue::Integer(1), ObjectValue::Boolean(true)]);
        assert_eq!(list.to_string(), "1 true");
    }
}

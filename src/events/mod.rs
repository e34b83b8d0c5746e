//! The event model shared by all readers and writers.
//!
//! A document is a sequence of [`Event`]s forming a well-nested tree: every START
//! event is eventually followed by an END event of the same [`EventContentType`],
//! and SOLE events stand alone. The structure of a document looks like this:
//!
//! ```text
//! DOCUMENT START
//!   OTU_LIST START ( OTU START .. END )* END
//!   ALIGNMENT START
//!     TOKEN_SET_DEFINITION START ( SINGLE_TOKEN_DEFINITION START .. END )* END
//!     CHARACTER_SET START ( CHARACTER_SET_INTERVAL )* END
//!     SEQUENCE START ( SEQUENCE_TOKENS | SINGLE_SEQUENCE_TOKEN START .. END )* END
//!   END
//!   TREE_NETWORK_GROUP START
//!     TREE START ( NODE START .. END | EDGE START .. END | ROOT_EDGE START .. END )* END
//!   END
//! DOCUMENT END
//! ```
//!
//! Metadata (`LITERAL_META`, `RESOURCE_META`) and `COMMENT` events may appear
//! nested under most elements.

pub mod meta;

use std::fmt;

pub use meta::{
    LiteralContentAssembler, LiteralContentSequenceType, LiteralMetadataContentEvent,
    LiteralMetadataEvent, ObjectValue, QName, ResourceMetadataEvent, UriOrStringIdentifier,
};

/// The kind of element an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventContentType {
    Document,
    Comment,
    UnknownCommand,
    LiteralMeta,
    LiteralMetaContent,
    ResourceMeta,
    MetaXmlContent,
    OtuList,
    Otu,
    Alignment,
    Sequence,
    SequenceTokens,
    SingleSequenceToken,
    CharacterSet,
    CharacterSetInterval,
    TokenSetDefinition,
    SingleTokenDefinition,
    SetElement,
    TreeNetworkGroup,
    Tree,
    Network,
    Node,
    Edge,
    RootEdge,
}

impl EventContentType {
    pub fn name(self) -> &'static str {
        match self {
            EventContentType::Document => "DOCUMENT",
            EventContentType::Comment => "COMMENT",
            EventContentType::UnknownCommand => "UNKNOWN_COMMAND",
            EventContentType::LiteralMeta => "LITERAL_META",
            EventContentType::LiteralMetaContent => "LITERAL_META_CONTENT",
            EventContentType::ResourceMeta => "RESOURCE_META",
            EventContentType::MetaXmlContent => "META_XML_CONTENT",
            EventContentType::OtuList => "OTU_LIST",
            EventContentType::Otu => "OTU",
            EventContentType::Alignment => "ALIGNMENT",
            EventContentType::Sequence => "SEQUENCE",
            EventContentType::SequenceTokens => "SEQUENCE_TOKENS",
            EventContentType::SingleSequenceToken => "SINGLE_SEQUENCE_TOKEN",
            EventContentType::CharacterSet => "CHARACTER_SET",
            EventContentType::CharacterSetInterval => "CHARACTER_SET_INTERVAL",
            EventContentType::TokenSetDefinition => "TOKEN_SET_DEFINITION",
            EventContentType::SingleTokenDefinition => "SINGLE_TOKEN_DEFINITION",
            EventContentType::SetElement => "SET_ELEMENT",
            EventContentType::TreeNetworkGroup => "TREE_NETWORK_GROUP",
            EventContentType::Tree => "TREE",
            EventContentType::Network => "NETWORK",
            EventContentType::Node => "NODE",
            EventContentType::Edge => "EDGE",
            EventContentType::RootEdge => "ROOT_EDGE",
        }
    }

    /// Returns `true` for the two metadata element types.
    pub fn is_metadata(self) -> bool {
        matches!(
            self,
            EventContentType::LiteralMeta | EventContentType::ResourceMeta
        )
    }
}

impl fmt::Display for EventContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Position of an event in the element tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopologyType {
    Start,
    End,
    Sole,
}

impl fmt::Display for EventTopologyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTopologyType::Start => write!(f, "START"),
            EventTopologyType::End => write!(f, "END"),
            EventTopologyType::Sole => write!(f, "SOLE"),
        }
    }
}

/// Content type and topology of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventType {
    pub content_type: EventContentType,
    pub topology_type: EventTopologyType,
}

impl EventType {
    pub const fn new(content_type: EventContentType, topology_type: EventTopologyType) -> Self {
        Self {
            content_type,
            topology_type,
        }
    }

    pub const fn start(content_type: EventContentType) -> Self {
        Self::new(content_type, EventTopologyType::Start)
    }

    pub const fn end(content_type: EventContentType) -> Self {
        Self::new(content_type, EventTopologyType::End)
    }

    pub const fn sole(content_type: EventContentType) -> Self {
        Self::new(content_type, EventTopologyType::Sole)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.content_type, self.topology_type)
    }
}

/// START of an element identified by an ID with an optional human readable label
/// (OTU_LIST, OTU, CHARACTER_SET, TREE, NETWORK).
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledIdEvent {
    pub content_type: EventContentType,
    pub id: String,
    pub label: Option<String>,
}

impl LabeledIdEvent {
    pub fn new(
        content_type: EventContentType,
        id: impl Into<String>,
        label: Option<String>,
    ) -> Self {
        Self {
            content_type,
            id: id.into(),
            label,
        }
    }
}

/// START of an element that may reference another element by ID, e.g. a SEQUENCE
/// linked to its OTU or an ALIGNMENT linked to its OTU_LIST.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedLabeledIdEvent {
    pub content_type: EventContentType,
    pub id: String,
    pub label: Option<String>,
    pub linked_id: Option<String>,
}

impl LinkedLabeledIdEvent {
    pub fn new(
        content_type: EventContentType,
        id: impl Into<String>,
        label: Option<String>,
        linked_id: Option<String>,
    ) -> Self {
        Self {
            content_type,
            id: id.into(),
            label,
            linked_id,
        }
    }
}

/// START of an edge. An edge without a source node is a ROOT_EDGE.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeEvent {
    pub id: String,
    pub label: Option<String>,
    pub source_id: Option<String>,
    pub target_id: String,
    pub length: Option<f64>,
}

impl EdgeEvent {
    pub fn new(
        id: impl Into<String>,
        label: Option<String>,
        source_id: Option<String>,
        target_id: impl Into<String>,
        length: Option<f64>,
    ) -> Self {
        Self {
            id: id.into(),
            label,
            source_id,
            target_id: target_id.into(),
            length,
        }
    }

    pub fn content_type(&self) -> EventContentType {
        if self.source_id.is_some() {
            EventContentType::Edge
        } else {
            EventContentType::RootEdge
        }
    }
}

/// A run of sequence tokens. Long sequences are split into several of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceTokensEvent {
    pub tokens: Vec<String>,
}

impl SequenceTokensEvent {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }
}

/// START of a single sequence token that carries nested metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleSequenceTokenEvent {
    pub label: Option<String>,
    pub token: String,
}

impl SingleSequenceTokenEvent {
    pub fn new(label: Option<String>, token: impl Into<String>) -> Self {
        Self {
            label,
            token: token.into(),
        }
    }
}

/// A column interval of a character set. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterSetIntervalEvent {
    pub start: u64,
    pub end: u64,
}

impl CharacterSetIntervalEvent {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Kind of tokens a token set describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterStateSetType {
    Unknown,
    Discrete,
    Nucleotide,
    Dna,
    Rna,
    AminoAcid,
    Continuous,
}

impl CharacterStateSetType {
    /// Maps a NEXUS or MEGA data type name to a set type.
    pub fn from_format_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "dna" => CharacterStateSetType::Dna,
            "rna" => CharacterStateSetType::Rna,
            "nucleotide" | "nucleotides" => CharacterStateSetType::Nucleotide,
            "protein" | "aminoacid" | "aminoacids" => CharacterStateSetType::AminoAcid,
            "continuous" => CharacterStateSetType::Continuous,
            "standard" | "discrete" => CharacterStateSetType::Discrete,
            _ => CharacterStateSetType::Unknown,
        }
    }
}

/// START of a token set definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSetDefinitionEvent {
    pub id: String,
    pub label: Option<String>,
    pub set_type: CharacterStateSetType,
    pub character_set_id: Option<String>,
}

impl TokenSetDefinitionEvent {
    pub fn new(id: impl Into<String>, label: Option<String>, set_type: CharacterStateSetType) -> Self {
        Self {
            id: id.into(),
            label,
            set_type,
            character_set_id: None,
        }
    }
}

/// Meaning of a single token inside a token set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterSymbolMeaning {
    CharacterState,
    Gap,
    Missing,
    Match,
    Other,
}

/// Whether a token stands for one state or combines several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterSymbolType {
    Atomic,
    Uncertain,
    Polymorphic,
}

/// START of a single token definition nested under a token set definition.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleTokenDefinitionEvent {
    pub id: String,
    pub label: Option<String>,
    pub token_name: String,
    pub meaning: CharacterSymbolMeaning,
    pub symbol_type: CharacterSymbolType,
    pub constituents: Vec<String>,
}

impl SingleTokenDefinitionEvent {
    pub fn new(
        id: impl Into<String>,
        token_name: impl Into<String>,
        meaning: CharacterSymbolMeaning,
    ) -> Self {
        Self {
            id: id.into(),
            label: None,
            token_name: token_name.into(),
            meaning,
            symbol_type: CharacterSymbolType::Atomic,
            constituents: Vec::new(),
        }
    }
}

/// References an element by ID from inside a set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetElementEvent {
    pub linked_id: String,
    pub linked_content_type: EventContentType,
}

/// A source comment. Long comments are split into several events, all but the last
/// flagged as continued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentEvent {
    pub content: String,
    pub continued_in_next_event: bool,
}

impl CommentEvent {
    pub fn new(content: impl Into<String>, continued_in_next_event: bool) -> Self {
        Self {
            content: content.into(),
            continued_in_next_event,
        }
    }
}

/// A command a reader found but does not model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommandEvent {
    pub command_name: String,
    pub block_type: Option<String>,
    pub content: String,
    pub continued_in_next_event: bool,
}

impl UnknownCommandEvent {
    pub fn new(
        command_name: impl Into<String>,
        block_type: Option<String>,
        content: impl Into<String>,
        continued_in_next_event: bool,
    ) -> Self {
        Self {
            command_name: command_name.into(),
            block_type,
            content: content.into(),
            continued_in_next_event,
        }
    }
}

/// A single event of a document stream.
///
/// Each variant carries exactly the payload its content type needs. Consumers match
/// on the variant instead of querying a type tag and casting.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// START of an element without further data, such as the DOCUMENT.
    Start(EventContentType),
    End(EventContentType),
    LabeledId(LabeledIdEvent),
    LinkedLabeledId(LinkedLabeledIdEvent),
    Edge(EdgeEvent),
    SequenceTokens(SequenceTokensEvent),
    SingleSequenceToken(SingleSequenceTokenEvent),
    CharacterSetInterval(CharacterSetIntervalEvent),
    TokenSetDefinition(TokenSetDefinitionEvent),
    SingleTokenDefinition(SingleTokenDefinitionEvent),
    SetElement(SetElementEvent),
    Comment(CommentEvent),
    UnknownCommand(UnknownCommandEvent),
    LiteralMeta(LiteralMetadataEvent),
    LiteralMetaContent(LiteralMetadataContentEvent),
    ResourceMeta(ResourceMetadataEvent),
}

impl Event {
    pub fn document_start() -> Self {
        Event::Start(EventContentType::Document)
    }

    pub fn end(content_type: EventContentType) -> Self {
        Event::End(content_type)
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Event::Start(content_type) => EventType::start(*content_type),
            Event::End(content_type) => EventType::end(*content_type),
            Event::LabeledId(e) => EventType::start(e.content_type),
            Event::LinkedLabeledId(e) => EventType::start(e.content_type),
            Event::Edge(e) => EventType::start(e.content_type()),
            Event::SequenceTokens(_) => EventType::sole(EventContentType::SequenceTokens),
            Event::SingleSequenceToken(_) => {
                EventType::start(EventContentType::SingleSequenceToken)
            }
            Event::CharacterSetInterval(_) => {
                EventType::sole(EventContentType::CharacterSetInterval)
            }
            Event::TokenSetDefinition(_) => EventType::start(EventContentType::TokenSetDefinition),
            Event::SingleTokenDefinition(_) => {
                EventType::start(EventContentType::SingleTokenDefinition)
            }
            Event::SetElement(_) => EventType::sole(EventContentType::SetElement),
            Event::Comment(_) => EventType::sole(EventContentType::Comment),
            Event::UnknownCommand(_) => EventType::sole(EventContentType::UnknownCommand),
            Event::LiteralMeta(_) => EventType::start(EventContentType::LiteralMeta),
            Event::LiteralMetaContent(_) => EventType::sole(EventContentType::LiteralMetaContent),
            Event::ResourceMeta(_) => EventType::start(EventContentType::ResourceMeta),
        }
    }

    pub fn content_type(&self) -> EventContentType {
        self.event_type().content_type
    }

    pub fn topology_type(&self) -> EventTopologyType {
        self.event_type().topology_type
    }

    pub fn is_start(&self) -> bool {
        self.topology_type() == EventTopologyType::Start
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Event::End(_))
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Event::Comment(_))
    }

    /// ID of the element this event starts, if it carries one.
    pub fn id(&self) -> Option<&str> {
        match self {
            Event::LabeledId(e) => Some(&e.id),
            Event::LinkedLabeledId(e) => Some(&e.id),
            Event::Edge(e) => Some(&e.id),
            Event::TokenSetDefinition(e) => Some(&e.id),
            Event::SingleTokenDefinition(e) => Some(&e.id),
            Event::LiteralMeta(e) => Some(&e.id),
            Event::ResourceMeta(e) => Some(&e.id),
            _ => None,
        }
    }

    /// Label of the element this event starts, if it has one.
    pub fn label(&self) -> Option<&str> {
        match self {
            Event::LabeledId(e) => e.label.as_deref(),
            Event::LinkedLabeledId(e) => e.label.as_deref(),
            Event::Edge(e) => e.label.as_deref(),
            Event::SingleSequenceToken(e) => e.label.as_deref(),
            Event::TokenSetDefinition(e) => e.label.as_deref(),
            Event::SingleTokenDefinition(e) => e.label.as_deref(),
            Event::LiteralMeta(e) => e.label.as_deref(),
            Event::ResourceMeta(e) => e.label.as_deref(),
            _ => None,
        }
    }
}

macro_rules! impl_from_event_payload {
    ($($payload:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$payload> for Event {
                fn from(payload: $payload) -> Self {
                    Event::$variant(payload)
                }
            }
        )*
    };
}

impl_from_event_payload! {
    LabeledIdEvent => LabeledId,
    LinkedLabeledIdEvent => LinkedLabeledId,
    EdgeEvent => Edge,
    SequenceTokensEvent => SequenceTokens,
    SingleSequenceTokenEvent => SingleSequenceToken,
    CharacterSetIntervalEvent => CharacterSetInterval,
    TokenSetDefinitionEvent => TokenSetDefinition,
    SingleTokenDefinitionEvent => SingleTokenDefinition,
    SetElementEvent => SetElement,
    CommentEvent => Comment,
    UnknownCommandEvent => UnknownCommand,
    LiteralMetadataEvent => LiteralMeta,
    LiteralMetadataContentEvent => LiteralMetaContent,
    ResourceMetadataEvent => ResourceMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_without_source_is_root_edge() {
        let root = Event::from(EdgeEvent::new("e0", None, None, "n0", Some(0.5)));
        assert_eq!(root.content_type(), EventContentType::RootEdge);

        let edge = Event::from(EdgeEvent::new("e1", None, Some("n0".into()), "n1", None));
        assert_eq!(edge.event_type(), EventType::start(EventContentType::Edge));
    }

    #[test]
    fn test_topology_of_event_kinds() {
        assert!(Event::document_start().is_start());
        assert!(Event::end(EventContentType::Document).is_end());
        assert_eq!(
            Event::from(SequenceTokensEvent::new(vec!["A".into()])).topology_type(),
            EventTopologyType::Sole
        );
        assert_eq!(
            Event::from(CommentEvent::new("c", false)).topology_type(),
            EventTopologyType::Sole
        );
    }

    #[test]
    fn test_id_and_label_accessors() {
        let event = Event::from(LinkedLabeledIdEvent::new(
            EventContentType::Sequence,
            "seq3",
            Some("A-2301".into()),
            Some("otu1".into()),
        ));
        assert_eq!(event.id(), Some("seq3"));
        assert_eq!(event.label(), Some("A-2301"));
        assert_eq!(Event::end(EventContentType::Sequence).id(), None);
    }

    #[test]
    fn test_data_type_names() {
        assert_eq!(
            CharacterStateSetType::from_format_name("DNA"),
            CharacterStateSetType::Dna
        );
        assert_eq!(
            CharacterStateSetType::from_format_name("Protein"),
            CharacterStateSetType::AminoAcid
        );
        assert_eq!(
            CharacterStateSetType::from_format_name("restriction"),
            CharacterStateSetType::Unknown
        );
    }
}

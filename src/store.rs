//! In-memory data adapters filled from a reader.
//!
//! [`DocumentStore::read`] consumes the events of any [`EventReader`] and keeps
//! them grouped per object, so the document can be handed to any writer.
//! Interleaved formats start the same sequence several times; the content of all
//! blocks is appended to one stored object.

use std::collections::HashMap;

use crate::error::{ReadError, ReadResult, WriteError, WriteResult};
use crate::events::{
    EdgeEvent, Event, EventContentType, LabeledIdEvent, LinkedLabeledIdEvent,
    TokenSetDefinitionEvent,
};
use crate::reader::EventReader;
use crate::writer::adapters::{
    AnnotatedDataAdapter, DocumentDataAdapter, MatrixDataAdapter, ObjectListDataAdapter,
    OtuListDataAdapter, TreeNetworkDataAdapter, TreeNetworkGroupDataAdapter,
};
use crate::writer::EventReceiver;

fn replay(events: &[Event], receiver: &mut dyn EventReceiver) -> WriteResult<()> {
    for event in events {
        if !receiver.add(event.clone())? {
            break;
        }
    }
    Ok(())
}

/// START event and content of one stored object.
#[derive(Debug, Clone)]
pub struct StoreObjectData<E> {
    pub start_event: E,
    pub content: Vec<Event>,
}

/// Object list keeping insertion order.
#[derive(Debug, Clone)]
pub struct StoreObjectListDataAdapter<E> {
    order: Vec<String>,
    objects: HashMap<String, StoreObjectData<E>>,
}

impl<E> Default for StoreObjectListDataAdapter<E> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            objects: HashMap::new(),
        }
    }
}

impl<E> StoreObjectListDataAdapter<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object, or appends `content` to the object already stored under
    /// `id`.
    pub fn add(&mut self, id: impl Into<String>, start_event: E, content: Vec<Event>) {
        let id = id.into();
        match self.objects.get_mut(&id) {
            Some(existing) => existing.content.extend(content),
            None => {
                self.order.push(id.clone());
                self.objects.insert(
                    id,
                    StoreObjectData {
                        start_event,
                        content,
                    },
                );
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&StoreObjectData<E>> {
        self.objects.get(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoreObjectData<E>> {
        self.order.iter().filter_map(|id| self.objects.get(id))
    }

    fn unknown(id: &str) -> WriteError {
        WriteError::InvalidArgument(format!("No object with the ID \"{}\" is stored", id))
    }
}

impl<E: Clone> ObjectListDataAdapter<E> for StoreObjectListDataAdapter<E> {
    fn count(&self) -> u64 {
        self.order.len() as u64
    }

    fn id_iterator(&self) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(self.order.iter().cloned())
    }

    fn object_start_event(&self, id: &str) -> WriteResult<E> {
        self.objects
            .get(id)
            .map(|object| object.start_event.clone())
            .ok_or_else(|| Self::unknown(id))
    }

    fn write_content_data(&self, receiver: &mut dyn EventReceiver, id: &str) -> WriteResult<()> {
        let object = self.objects.get(id).ok_or_else(|| Self::unknown(id))?;
        replay(&object.content, receiver)
    }
}

#[derive(Debug, Clone)]
pub struct StoreOtuListDataAdapter {
    pub start_event: LabeledIdEvent,
    pub metadata: Vec<Event>,
    pub otus: StoreObjectListDataAdapter<LabeledIdEvent>,
}

impl StoreOtuListDataAdapter {
    pub fn new(start_event: LabeledIdEvent) -> Self {
        Self {
            start_event,
            metadata: Vec::new(),
            otus: StoreObjectListDataAdapter::new(),
        }
    }
}

impl AnnotatedDataAdapter for StoreOtuListDataAdapter {
    fn write_metadata(&self, receiver: &mut dyn EventReceiver) -> WriteResult<()> {
        replay(&self.metadata, receiver)
    }
}

impl OtuListDataAdapter for StoreOtuListDataAdapter {
    fn list_start_event(&self) -> LabeledIdEvent {
        self.start_event.clone()
    }

    fn otus(&self) -> &dyn ObjectListDataAdapter<LabeledIdEvent> {
        &self.otus
    }
}

#[derive(Debug, Clone)]
pub struct StoreMatrixDataAdapter {
    pub start_event: LinkedLabeledIdEvent,
    pub metadata: Vec<Event>,
    pub sequences: StoreObjectListDataAdapter<LinkedLabeledIdEvent>,
    pub character_sets: StoreObjectListDataAdapter<LabeledIdEvent>,
    pub token_sets: StoreObjectListDataAdapter<TokenSetDefinitionEvent>,
    long_tokens: bool,
}

impl StoreMatrixDataAdapter {
    pub fn new(start_event: LinkedLabeledIdEvent) -> Self {
        Self {
            start_event,
            metadata: Vec::new(),
            sequences: StoreObjectListDataAdapter::new(),
            character_sets: StoreObjectListDataAdapter::new(),
            token_sets: StoreObjectListDataAdapter::new(),
            long_tokens: false,
        }
    }

    fn sequence_length(content: &[Event]) -> u64 {
        content
            .iter()
            .map(|event| match event {
                Event::SequenceTokens(tokens) => tokens.tokens.len() as u64,
                Event::SingleSequenceToken(_) => 1,
                _ => 0,
            })
            .sum()
    }

    /// Adds sequence content and updates the long token flag.
    pub fn add_sequence(&mut self, start_event: LinkedLabeledIdEvent, content: Vec<Event>) {
        self.long_tokens |= content.iter().any(|event| match event {
            Event::SequenceTokens(tokens) => tokens.tokens.iter().any(|t| t.chars().count() > 1),
            Event::SingleSequenceToken(token) => token.token.chars().count() > 1,
            _ => false,
        });
        self.sequences.add(start_event.id.clone(), start_event, content);
    }
}

impl AnnotatedDataAdapter for StoreMatrixDataAdapter {
    fn write_metadata(&self, receiver: &mut dyn EventReceiver) -> WriteResult<()> {
        replay(&self.metadata, receiver)
    }
}

impl MatrixDataAdapter for StoreMatrixDataAdapter {
    fn start_event(&self) -> LinkedLabeledIdEvent {
        self.start_event.clone()
    }

    fn column_count(&self) -> Option<u64> {
        let mut lengths = self
            .sequences
            .iter()
            .map(|sequence| Self::sequence_length(&sequence.content));
        let first = lengths.next()?;
        lengths.all(|length| length == first).then_some(first)
    }

    fn contains_long_tokens(&self) -> bool {
        self.long_tokens
    }

    fn sequences(&self) -> &dyn ObjectListDataAdapter<LinkedLabeledIdEvent> {
        &self.sequences
    }

    fn character_sets(&self) -> &dyn ObjectListDataAdapter<LabeledIdEvent> {
        &self.character_sets
    }

    fn token_sets(&self) -> &dyn ObjectListDataAdapter<TokenSetDefinitionEvent> {
        &self.token_sets
    }
}

#[derive(Debug, Clone)]
pub struct StoreTreeNetworkDataAdapter {
    pub start_event: LabeledIdEvent,
    pub metadata: Vec<Event>,
    pub nodes: StoreObjectListDataAdapter<LinkedLabeledIdEvent>,
    pub edges: StoreObjectListDataAdapter<EdgeEvent>,
}

impl StoreTreeNetworkDataAdapter {
    pub fn new(start_event: LabeledIdEvent) -> Self {
        Self {
            start_event,
            metadata: Vec::new(),
            nodes: StoreObjectListDataAdapter::new(),
            edges: StoreObjectListDataAdapter::new(),
        }
    }
}

impl AnnotatedDataAdapter for StoreTreeNetworkDataAdapter {
    fn write_metadata(&self, receiver: &mut dyn EventReceiver) -> WriteResult<()> {
        replay(&self.metadata, receiver)
    }
}

impl TreeNetworkDataAdapter for StoreTreeNetworkDataAdapter {
    fn start_event(&self) -> LabeledIdEvent {
        self.start_event.clone()
    }

    fn is_tree(&self) -> bool {
        self.start_event.content_type == EventContentType::Tree
    }

    fn nodes(&self) -> &dyn ObjectListDataAdapter<LinkedLabeledIdEvent> {
        &self.nodes
    }

    fn edges(&self) -> &dyn ObjectListDataAdapter<EdgeEvent> {
        &self.edges
    }
}

#[derive(Debug, Clone)]
pub struct StoreTreeNetworkGroupDataAdapter {
    pub start_event: LinkedLabeledIdEvent,
    pub metadata: Vec<Event>,
    pub trees: Vec<StoreTreeNetworkDataAdapter>,
}

impl StoreTreeNetworkGroupDataAdapter {
    pub fn new(start_event: LinkedLabeledIdEvent) -> Self {
        Self {
            start_event,
            metadata: Vec::new(),
            trees: Vec::new(),
        }
    }
}

impl AnnotatedDataAdapter for StoreTreeNetworkGroupDataAdapter {
    fn write_metadata(&self, receiver: &mut dyn EventReceiver) -> WriteResult<()> {
        replay(&self.metadata, receiver)
    }
}

impl TreeNetworkGroupDataAdapter for StoreTreeNetworkGroupDataAdapter {
    fn start_event(&self) -> LinkedLabeledIdEvent {
        self.start_event.clone()
    }

    fn trees_and_networks(&self) -> Box<dyn Iterator<Item = &dyn TreeNetworkDataAdapter> + '_> {
        Box::new(
            self.trees
                .iter()
                .map(|tree| tree as &dyn TreeNetworkDataAdapter),
        )
    }
}

/// Document adapter over lists of element adapters.
#[derive(Default)]
pub struct ListBasedDocumentDataAdapter {
    pub metadata: Vec<Event>,
    pub otu_lists: Vec<Box<dyn OtuListDataAdapter>>,
    pub matrices: Vec<Box<dyn MatrixDataAdapter>>,
    pub tree_network_groups: Vec<Box<dyn TreeNetworkGroupDataAdapter>>,
}

impl ListBasedDocumentDataAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnnotatedDataAdapter for ListBasedDocumentDataAdapter {
    fn write_metadata(&self, receiver: &mut dyn EventReceiver) -> WriteResult<()> {
        replay(&self.metadata, receiver)
    }
}

impl DocumentDataAdapter for ListBasedDocumentDataAdapter {
    fn otu_lists(&self) -> Box<dyn Iterator<Item = &dyn OtuListDataAdapter> + '_> {
        Box::new(self.otu_lists.iter().map(|list| list.as_ref()))
    }

    fn otu_list_count(&self) -> usize {
        self.otu_lists.len()
    }

    fn matrices(&self) -> Box<dyn Iterator<Item = &dyn MatrixDataAdapter> + '_> {
        Box::new(self.matrices.iter().map(|matrix| matrix.as_ref()))
    }

    fn tree_network_groups(&self) -> Box<dyn Iterator<Item = &dyn TreeNetworkGroupDataAdapter> + '_> {
        Box::new(self.tree_network_groups.iter().map(|group| group.as_ref()))
    }
}

/// Builds a [`ListBasedDocumentDataAdapter`] from the events of a reader.
pub struct DocumentStore;

impl DocumentStore {
    /// Reads all events of `reader`. The reader must be positioned before the
    /// DOCUMENT START event.
    pub fn read<R: EventReader + ?Sized>(reader: &mut R) -> ReadResult<ListBasedDocumentDataAdapter> {
        let mut document = ListBasedDocumentDataAdapter::new();
        match reader.next_event()? {
            Event::Start(EventContentType::Document) => {}
            other => {
                return Err(ReadError::UnexpectedSequence(format!(
                    "Expected the start of the document but found {}",
                    other.event_type()
                )))
            }
        }
        loop {
            let event = reader.next_event()?;
            match event {
                Event::End(EventContentType::Document) => break,
                Event::LabeledId(start) if start.content_type == EventContentType::OtuList => {
                    document.otu_lists.push(Box::new(read_otu_list(reader, start)?));
                }
                Event::LinkedLabeledId(start) if start.content_type == EventContentType::Alignment => {
                    document.matrices.push(Box::new(read_matrix(reader, start)?));
                }
                Event::LinkedLabeledId(start)
                    if start.content_type == EventContentType::TreeNetworkGroup =>
                {
                    document
                        .tree_network_groups
                        .push(Box::new(read_tree_network_group(reader, start)?));
                }
                other => store_or_skip(reader, other, &mut document.metadata)?,
            }
        }
        log::debug!(
            "Stored {} OTU list(s), {} matrix(es) and {} tree group(s)",
            document.otu_lists.len(),
            document.matrices.len(),
            document.tree_network_groups.len()
        );
        Ok(document)
    }
}

/// Events of the element started by `start` up to, excluding, its END event.
fn read_content<R: EventReader + ?Sized>(reader: &mut R) -> ReadResult<Vec<Event>> {
    let mut content = Vec::new();
    let mut depth = 0usize;
    loop {
        let event = reader.next_event()?;
        if event.is_end() {
            if depth == 0 {
                return Ok(content);
            }
            depth -= 1;
        } else if event.is_start() {
            depth += 1;
        }
        content.push(event);
    }
}

/// Keeps metadata and comments in `metadata`, skips any other element.
fn store_or_skip<R: EventReader + ?Sized>(
    reader: &mut R,
    event: Event,
    metadata: &mut Vec<Event>,
) -> ReadResult<()> {
    match event {
        Event::Comment(_) => metadata.push(event),
        Event::LiteralMeta(_) | Event::ResourceMeta(_) => {
            let content_type = event.content_type();
            metadata.push(event);
            metadata.extend(read_content(reader)?);
            metadata.push(Event::End(content_type));
        }
        other if other.is_start() => {
            log::debug!("Skipping unsupported element {}", other.event_type());
            crate::reader::utils::reach_element_end(reader)?;
        }
        other => log::debug!("Skipping event {}", other.event_type()),
    }
    Ok(())
}

fn read_otu_list<R: EventReader + ?Sized>(
    reader: &mut R,
    start: LabeledIdEvent,
) -> ReadResult<StoreOtuListDataAdapter> {
    let mut list = StoreOtuListDataAdapter::new(start);
    loop {
        match reader.next_event()? {
            Event::End(EventContentType::OtuList) => return Ok(list),
            Event::LabeledId(otu) if otu.content_type == EventContentType::Otu => {
                let content = read_content(reader)?;
                list.otus.add(otu.id.clone(), otu, content);
            }
            other => store_or_skip(reader, other, &mut list.metadata)?,
        }
    }
}

fn read_matrix<R: EventReader + ?Sized>(
    reader: &mut R,
    start: LinkedLabeledIdEvent,
) -> ReadResult<StoreMatrixDataAdapter> {
    let mut matrix = StoreMatrixDataAdapter::new(start);
    loop {
        match reader.next_event()? {
            Event::End(EventContentType::Alignment) => return Ok(matrix),
            Event::LinkedLabeledId(sequence) if sequence.content_type == EventContentType::Sequence => {
                let content = read_content(reader)?;
                matrix.add_sequence(sequence, content);
            }
            Event::LabeledId(set) if set.content_type == EventContentType::CharacterSet => {
                let content = read_content(reader)?;
                matrix.character_sets.add(set.id.clone(), set, content);
            }
            Event::TokenSetDefinition(set) => {
                let content = read_content(reader)?;
                matrix.token_sets.add(set.id.clone(), set, content);
            }
            other => store_or_skip(reader, other, &mut matrix.metadata)?,
        }
    }
}

fn read_tree_network_group<R: EventReader + ?Sized>(
    reader: &mut R,
    start: LinkedLabeledIdEvent,
) -> ReadResult<StoreTreeNetworkGroupDataAdapter> {
    let mut group = StoreTreeNetworkGroupDataAdapter::new(start);
    loop {
        match reader.next_event()? {
            Event::End(EventContentType::TreeNetworkGroup) => return Ok(group),
            Event::LabeledId(tree)
                if matches!(
                    tree.content_type,
                    EventContentType::Tree | EventContentType::Network
                ) =>
            {
                group.trees.push(read_tree_network(reader, tree)?);
            }
            other => store_or_skip(reader, other, &mut group.metadata)?,
        }
    }
}

fn read_tree_network<R: EventReader + ?Sized>(
    reader: &mut R,
    start: LabeledIdEvent,
) -> ReadResult<StoreTreeNetworkDataAdapter> {
    let content_type = start.content_type;
    let mut tree = StoreTreeNetworkDataAdapter::new(start);
    loop {
        match reader.next_event()? {
            Event::End(end) if end == content_type => return Ok(tree),
            Event::LinkedLabeledId(node) if node.content_type == EventContentType::Node => {
                let content = read_content(reader)?;
                tree.nodes.add(node.id.clone(), node, content);
            }
            Event::Edge(edge) => {
                let content = read_content(reader)?;
                tree.edges.add(edge.id.clone(), edge, content);
            }
            other => store_or_skip(reader, other, &mut tree.metadata)?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{
        LiteralMetadataContentEvent, LiteralMetadataEvent, SequenceTokensEvent,
    };
    use crate::reader::list_reader;
    use crate::writer::collect_sequence_tokens;

    fn sequence(id: &str, label: &str) -> Event {
        LinkedLabeledIdEvent::new(EventContentType::Sequence, id, Some(label.into()), None).into()
    }

    fn tokens(text: &str) -> Event {
        SequenceTokensEvent::new(text.chars().map(String::from).collect()).into()
    }

    fn interleaved_document() -> Vec<Event> {
        vec![
            Event::document_start(),
            LiteralMetadataEvent::simple("meta0", "Title").into(),
            LiteralMetadataContentEvent::from_string("demo", false).into(),
            Event::end(EventContentType::LiteralMeta),
            LinkedLabeledIdEvent::new(EventContentType::Alignment, "matrix1", None, None).into(),
            sequence("seq2", "A"),
            tokens("ACG"),
            Event::end(EventContentType::Sequence),
            sequence("seq3", "B"),
            tokens("ACC"),
            Event::end(EventContentType::Sequence),
            sequence("seq2", "A"),
            tokens("TT"),
            Event::end(EventContentType::Sequence),
            sequence("seq3", "B"),
            tokens("TA"),
            Event::end(EventContentType::Sequence),
            Event::end(EventContentType::Alignment),
            Event::end(EventContentType::Document),
        ]
    }

    #[test]
    fn test_interleaved_blocks_are_joined() {
        let mut reader = list_reader(interleaved_document());
        let document = DocumentStore::read(&mut reader).unwrap();

        assert_eq!(document.metadata.len(), 3);
        let matrix = document.matrices().next().unwrap();
        assert_eq!(matrix.sequences().count(), 2);
        assert_eq!(matrix.column_count(), Some(5));
        assert!(!matrix.contains_long_tokens());

        let ids: Vec<String> = matrix.sequences().id_iterator().collect();
        assert_eq!(ids, vec!["seq2", "seq3"]);
        let (tokens, _) = collect_sequence_tokens(matrix, "seq2").unwrap();
        assert_eq!(tokens.concat(), "ACGTT");
    }

    #[test]
    fn test_unknown_object_id() {
        let list = StoreObjectListDataAdapter::<LabeledIdEvent>::new();
        assert!(matches!(
            list.object_start_event("otu7"),
            Err(WriteError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_document_must_start_with_document_event() {
        let mut reader = list_reader(vec![
            LinkedLabeledIdEvent::new(EventContentType::Alignment, "m", None, None).into(),
            Event::end(EventContentType::Alignment),
        ]);
        assert!(matches!(
            DocumentStore::read(&mut reader),
            Err(ReadError::Structure { .. })
        ));
    }
}

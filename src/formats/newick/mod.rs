//! Newick reader and writer.
//!
//! ## Newick Format
//!
//! ```text
//! [&R] ((A:0.1,B:0.2)C[&support=95]:0.5,'D d')E;
//! (A,B);
//! ```
//!
//! A file holds any number of trees, each terminated by `;`. Names may be quoted
//! with `'`; in unquoted names `_` stands for a space. Comments in `[...]` may be
//! nested. Hot comments of the form `[&key=value,...]` and NHX comments
//! (`[&&NHX:key=value:...]`) are read as literal metadata of nodes and edges.
//!
//! All trees of a file are placed in one tree group.

pub mod reader;
pub mod scanner;
pub mod writer;

use std::collections::VecDeque;
use std::io::BufRead;

use thiserror::Error;

use crate::error::{ReadResult, SourceLocation};
use crate::events::{Event, EventContentType, LinkedLabeledIdEvent};
use crate::formats::{ids, FormatFactory, FormatInfo, MetadataModeling};
use crate::ids::{prefixes, IdManager};
use crate::labels::VerbatimLabelProcessor;
use crate::parameters::{names, ReadWriteParameters};
use crate::reader::text::PeekReader;
use crate::reader::{EventProducer, EventReader, EventStream};
use crate::writer::EventWriter;

pub use reader::NewickStringReader;
pub use writer::NewickEventWriter;

/// Errors that can occur during Newick parsing.
#[derive(Error, Debug)]
pub enum NewickError {
    #[error("Unexpected {token} at {location}")]
    UnexpectedToken {
        token: String,
        location: SourceLocation,
    },

    #[error("Invalid branch length \"{text}\" at {location}")]
    InvalidLength {
        text: String,
        location: SourceLocation,
    },

    #[error("Unexpected end of the tree definition at {0}")]
    UnexpectedEnd(SourceLocation),

    #[error("Unterminated name starting at {0}")]
    UnterminatedName(SourceLocation),
}

const TREE_ELEMENTS: &[EventContentType] = &[
    EventContentType::Document,
    EventContentType::TreeNetworkGroup,
    EventContentType::Tree,
    EventContentType::Node,
    EventContentType::Edge,
    EventContentType::RootEdge,
    EventContentType::LiteralMeta,
    EventContentType::LiteralMetaContent,
    EventContentType::Comment,
];

const TREE_METADATA: &[(EventContentType, MetadataModeling)] = &[
    (EventContentType::Tree, MetadataModeling::LiteralOnly),
    (EventContentType::Node, MetadataModeling::LiteralOnly),
    (EventContentType::Edge, MetadataModeling::LiteralOnly),
    (EventContentType::RootEdge, MetadataModeling::LiteralOnly),
];

pub static NEWICK_INFO: FormatInfo = FormatInfo {
    format_id: ids::NEWICK,
    format_name: "Newick",
    extensions: &["nwk", "newick", "tre", "tree", "con"],
    reader_elements: TREE_ELEMENTS,
    writer_elements: TREE_ELEMENTS,
    reader_metadata: TREE_METADATA,
    writer_metadata: TREE_METADATA,
    reader_parameters: &[names::MAX_COMMENT_LENGTH],
    writer_parameters: &[names::IGNORE_COMMENTS],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Trees,
    Finished,
}

/// Turns a Newick file into events.
pub struct NewickEventProducer {
    reader: PeekReader,
    trees: NewickStringReader,
    ids: IdManager,
    state: State,
}

impl NewickEventProducer {
    pub fn new(source: Box<dyn BufRead>, parameters: &ReadWriteParameters) -> Self {
        Self {
            reader: PeekReader::new(source),
            trees: NewickStringReader::new(parameters.max_comment_length),
            ids: IdManager::new(),
            state: State::Start,
        }
    }
}

impl EventProducer for NewickEventProducer {
    fn format_id(&self) -> &'static str {
        ids::NEWICK
    }

    fn produce(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        match self.state {
            State::Start => {
                queue.push_back(Event::document_start());
                let group_id = self.ids.create_new_id(prefixes::TREE_NETWORK_GROUP);
                queue.push_back(
                    LinkedLabeledIdEvent::new(EventContentType::TreeNetworkGroup, group_id, None, None)
                        .into(),
                );
                self.state = State::Trees;
            }
            State::Trees => {
                let labels = VerbatimLabelProcessor::new(None);
                let more = self
                    .trees
                    .add_next_events(&mut self.reader, &labels, &mut self.ids, queue)?;
                if !more {
                    queue.push_back(Event::end(EventContentType::TreeNetworkGroup));
                    queue.push_back(Event::end(EventContentType::Document));
                    self.state = State::Finished;
                }
            }
            State::Finished => {}
        }
        Ok(())
    }
}

/// Reader for Newick sources.
pub type NewickEventReader = EventStream<NewickEventProducer>;

pub fn newick_reader(source: Box<dyn BufRead>, parameters: &ReadWriteParameters) -> NewickEventReader {
    EventStream::new(NewickEventProducer::new(source, parameters))
}

/// Factory for Newick readers and writers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewickFactory;

impl FormatFactory for NewickFactory {
    fn info(&self) -> &'static FormatInfo {
        &NEWICK_INFO
    }

    fn reader(
        &self,
        source: Box<dyn BufRead>,
        parameters: &ReadWriteParameters,
    ) -> Box<dyn EventReader> {
        Box::new(newick_reader(source, parameters))
    }

    fn writer(&self) -> Option<Box<dyn EventWriter>> {
        Some(Box::new(NewickEventWriter))
    }
}

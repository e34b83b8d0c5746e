//! FASTA reader and writer.
//!
//! ## FASTA Format
//!
//! ```text
//! >sequence name with optional description
//! ;optional comment lines directly after the name
//! ACGTACGTACGT...
//! >another sequence
//! 1 TGCATGCATGCA...
//! ```
//!
//! A file holds one alignment. Leading whitespace and token indices at the start
//! of a sequence line are skipped. Every other non-whitespace character is a
//! token.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use thiserror::Error;

use crate::error::{ReadResult, SourceLocation, WriteResult};
use crate::events::{Event, EventContentType, LinkedLabeledIdEvent};
use crate::formats::{ids, FormatFactory, FormatInfo};
use crate::ids::{prefixes, IdManager};
use crate::parameters::{names, ReadWriteParameters};
use crate::reader::text::comment_events;
use crate::reader::tokens::{character_tokens, SequenceTokensEventManager};
use crate::reader::{EventProducer, EventReader, EventStream};
use crate::writer::adapters::{object_label, DocumentDataAdapter};
use crate::writer::receiver::{BasicEventReceiver, ReceiverHooks, ReceiverState};
use crate::writer::{single_matrix, EventWriter, WriteReport};

pub const NAME_START: char = '>';
pub const COMMENT_START: char = ';';

/// Errors that can occur during FASTA parsing.
#[derive(Error, Debug)]
pub enum FastaError {
    #[error("Sequence data without a preceding name line at {0}")]
    SequenceWithoutHeader(SourceLocation),
}

pub static FASTA_INFO: FormatInfo = FormatInfo {
    format_id: ids::FASTA,
    format_name: "FASTA",
    extensions: &["fasta", "fa", "fas", "fna", "faa", "ffn", "frn"],
    reader_elements: &[
        EventContentType::Document,
        EventContentType::Alignment,
        EventContentType::Sequence,
        EventContentType::SequenceTokens,
        EventContentType::Comment,
    ],
    writer_elements: &[
        EventContentType::Document,
        EventContentType::Alignment,
        EventContentType::Sequence,
        EventContentType::SequenceTokens,
        EventContentType::SingleSequenceToken,
    ],
    reader_metadata: &[],
    writer_metadata: &[],
    reader_parameters: &[
        names::MAX_TOKENS_TO_READ,
        names::MAX_COMMENT_LENGTH,
        names::REPLACE_MATCH_TOKENS,
        names::MATCH_TOKEN,
    ],
    writer_parameters: &[names::LINE_LENGTH],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Body,
    Finished,
}

/// Turns FASTA lines into events.
pub struct FastaEventProducer {
    source: Box<dyn BufRead>,
    max_comment_length: usize,
    ids: IdManager,
    tokens: SequenceTokensEventManager,
    state: State,
    current_name: Option<String>,
    line_number: usize,
}

impl FastaEventProducer {
    pub fn new(source: Box<dyn BufRead>, parameters: &ReadWriteParameters) -> Self {
        Self {
            source,
            max_comment_length: parameters.max_comment_length,
            ids: IdManager::new(),
            tokens: SequenceTokensEventManager::new(parameters),
            state: State::Start,
            current_name: None,
            line_number: 0,
        }
    }

    fn read_line(&mut self) -> ReadResult<Option<String>> {
        let mut line = String::new();
        if self.source.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        let trimmed_len = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed_len);
        Ok(Some(line))
    }

    fn location(&self, column: usize) -> SourceLocation {
        SourceLocation::new(self.line_number, column)
    }
}

impl EventProducer for FastaEventProducer {
    fn format_id(&self) -> &'static str {
        ids::FASTA
    }

    fn produce(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        match self.state {
            State::Start => {
                queue.push_back(Event::document_start());
                let matrix_id = self.ids.create_new_id(prefixes::MATRIX);
                queue.push_back(
                    LinkedLabeledIdEvent::new(EventContentType::Alignment, matrix_id, None, None)
                        .into(),
                );
                self.state = State::Body;
                return Ok(());
            }
            State::Finished => return Ok(()),
            State::Body => {}
        }

        while queue.is_empty() {
            let Some(line) = self.read_line()? else {
                if self.current_name.take().is_some() {
                    queue.push_back(Event::end(EventContentType::Sequence));
                }
                queue.push_back(Event::end(EventContentType::Alignment));
                queue.push_back(Event::end(EventContentType::Document));
                self.state = State::Finished;
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }

            if let Some(name) = line.strip_prefix(NAME_START) {
                let name = name.trim();
                if self.current_name.take().is_some() {
                    queue.push_back(Event::end(EventContentType::Sequence));
                }
                if name.is_empty() {
                    log::warn!("Sequence without a name at {}", self.location(1));
                    let (key, start) = self.tokens.unnamed_start_event(&mut self.ids);
                    queue.push_back(start);
                    self.current_name = Some(key);
                } else {
                    queue.push_back(self.tokens.start_event(name, None, &mut self.ids));
                    self.current_name = Some(name.to_string());
                }
            } else if let Some(comment) = line.strip_prefix(COMMENT_START) {
                queue.extend(comment_events(comment, self.max_comment_length));
            } else {
                let Some(name) = self.current_name.clone() else {
                    return Err(FastaError::SequenceWithoutHeader(self.location(1)).into());
                };
                let data = line.trim_start_matches(|c: char| c.is_whitespace() || c.is_ascii_digit());
                self.tokens
                    .add_tokens_events(&name, character_tokens(data), queue)?;
            }
        }
        Ok(())
    }
}

/// Reader for FASTA sources.
pub type FastaEventReader = EventStream<FastaEventProducer>;

pub fn fasta_reader(source: Box<dyn BufRead>, parameters: &ReadWriteParameters) -> FastaEventReader {
    EventStream::new(FastaEventProducer::new(source, parameters))
}

/// Writes the tokens of one sequence, wrapping lines.
struct FastaSequenceHooks<'w> {
    output: &'w mut dyn Write,
    line_length: usize,
    long_tokens: bool,
    column: usize,
}

impl<'w> FastaSequenceHooks<'w> {
    fn new(output: &'w mut dyn Write, line_length: usize, long_tokens: bool) -> Self {
        Self {
            output,
            line_length: line_length.max(1),
            long_tokens,
            column: 0,
        }
    }

    fn write_token(&mut self, token: &str) -> WriteResult<()> {
        let width = token.chars().count() + usize::from(self.long_tokens);
        if self.column > 0 && self.column + width > self.line_length {
            writeln!(self.output)?;
            self.column = 0;
        }
        self.output.write_all(token.as_bytes())?;
        if self.long_tokens {
            self.output.write_all(b" ")?;
        }
        self.column += width;
        Ok(())
    }

    fn finish_line(&mut self) -> WriteResult<()> {
        if self.column > 0 {
            writeln!(self.output)?;
            self.column = 0;
        }
        Ok(())
    }
}

impl ReceiverHooks for FastaSequenceHooks<'_> {
    fn do_add(&mut self, state: &mut ReceiverState, event: Event) -> WriteResult<bool> {
        match event {
            Event::SequenceTokens(tokens) => {
                for token in &tokens.tokens {
                    self.write_token(token)?;
                }
            }
            Event::SingleSequenceToken(token) => self.write_token(&token.token)?,
            Event::End(EventContentType::SingleSequenceToken) => {}
            other => return Err(state.illegal(&other)),
        }
        Ok(true)
    }
}

/// Writer for FASTA output. Only the first matrix of a document is written.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastaEventWriter;

impl EventWriter for FastaEventWriter {
    fn format_id(&self) -> &'static str {
        ids::FASTA
    }

    fn write_document(
        &self,
        document: &dyn DocumentDataAdapter,
        output: &mut dyn Write,
        parameters: &ReadWriteParameters,
    ) -> WriteResult<WriteReport> {
        let mut report = WriteReport::default();
        if let Some(matrix) = single_matrix(document, FASTA_INFO.format_name, &mut report) {
            let long_tokens = matrix.contains_long_tokens();
            let sequences = matrix.sequences();
            for id in sequences.id_iterator() {
                let start = sequences.object_start_event(&id)?;
                let label = object_label(
                    document,
                    &id,
                    start.label.as_deref(),
                    start.linked_id.as_deref(),
                );
                writeln!(output, "{}{}", NAME_START, label)?;

                let hooks = FastaSequenceHooks::new(&mut *output, parameters.line_length, long_tokens);
                let mut receiver = BasicEventReceiver::new(hooks);
                sequences.write_content_data(&mut receiver, &id)?;
                let (mut hooks, ignored) = receiver.finish()?;
                hooks.finish_line()?;
                report.ignored.add(ignored);
            }
        }
        report.log_ignored(FASTA_INFO.format_name);
        Ok(report)
    }
}

/// FASTA entry of the format registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastaFactory;

impl FormatFactory for FastaFactory {
    fn info(&self) -> &'static FormatInfo {
        &FASTA_INFO
    }

    fn reader(
        &self,
        source: Box<dyn BufRead>,
        parameters: &ReadWriteParameters,
    ) -> Box<dyn EventReader> {
        Box::new(fasta_reader(source, parameters))
    }

    fn writer(&self) -> Option<Box<dyn EventWriter>> {
        Some(Box::new(FastaEventWriter))
    }
}

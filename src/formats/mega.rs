//! MEGA alignment reader.
//!
//! ## MEGA Format
//!
//! A MEGA file starts with `#MEGA`, followed by commands and sequences:
//! ```text
//! #MEGA
//! !Title Three HLA alleles;
//! !Format DataType=DNA indel=-;
//!
//! #A-2301  ATGCGG
//! #A-2501  ATGCGG
//!
//! #A-2301  GTCACG
//! #A-2501  GTCACG
//! ```
//!
//! - Commands start with `!` and end with `;`. They become literal metadata with
//!   the command name as predicate, except for `!Format` (one literal per
//!   sub-command), `!Label` and `!Gene=`/`!Domain=` (character sets).
//! - Sequence lines start with `#name`. A name may appear in several blocks.
//! - Comments are enclosed in `[` and `]` and may be nested.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::BufRead;

use thiserror::Error;

use crate::error::{ReadResult, SourceLocation};
use crate::events::{
    CharacterSetIntervalEvent, Event, EventContentType, LabeledIdEvent, LinkedLabeledIdEvent,
    LiteralMetadataContentEvent, LiteralMetadataEvent,
};
use crate::formats::{ids, FormatFactory, FormatInfo, MetadataModeling};
use crate::ids::{prefixes, IdManager};
use crate::parameters::{names, ReadWriteParameters};
use crate::reader::text::PeekReader;
use crate::reader::tokens::{character_tokens, SequenceTokensEventManager};
use crate::reader::{EventProducer, EventReader, EventStream};

/// Errors that can occur during MEGA parsing.
#[derive(Error, Debug)]
pub enum MegaError {
    #[error("MEGA files must start with \"#MEGA\" ({0})")]
    MissingHeader(SourceLocation),

    #[error("Unterminated command \"{command}\" starting at {location}")]
    UnterminatedCommand {
        command: String,
        location: SourceLocation,
    },

    #[error("Sequence data without a preceding \"#name\" at {0}")]
    DataWithoutSequence(SourceLocation),
}

const FIRST_LINE: &str = "#MEGA";
const COMMAND_FORMAT: &str = "Format";
const COMMAND_LABEL: &str = "Label";
const COMMAND_TITLE: &str = "Title";
const COMMAND_DESCRIPTION: &str = "Description";
const FORMAT_PREFIX: &str = "Format.";
const NO_LABEL: char = '_';

pub static MEGA_INFO: FormatInfo = FormatInfo {
    format_id: ids::MEGA,
    format_name: "MEGA",
    extensions: &["meg", "mega"],
    reader_elements: &[
        EventContentType::Document,
        EventContentType::Alignment,
        EventContentType::Sequence,
        EventContentType::SequenceTokens,
        EventContentType::CharacterSet,
        EventContentType::CharacterSetInterval,
        EventContentType::Comment,
    ],
    writer_elements: &[],
    reader_metadata: &[(EventContentType::Alignment, MetadataModeling::LiteralOnly)],
    writer_metadata: &[],
    reader_parameters: &[
        names::MAX_TOKENS_TO_READ,
        names::MAX_COMMENT_LENGTH,
        names::REPLACE_MATCH_TOKENS,
        names::MATCH_TOKEN,
    ],
    writer_parameters: &[],
};

/// Extracts `Gene.<name>` or `Domain.<name>` from a `Gene=<name>` or
/// `Domain=<name>` command, ignoring case.
fn gene_or_domain_name(content: &str) -> Option<String> {
    let lower = content.to_ascii_lowercase();
    for (keyword, prefix) in [("gene", "Gene"), ("domain", "Domain")] {
        for (index, _) in lower.match_indices(keyword) {
            let rest = content[index + keyword.len()..].trim_start();
            let Some(value) = rest.strip_prefix('=') else {
                continue;
            };
            let name: String = value
                .trim_start()
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if !name.is_empty() {
                return Some(format!("{}.{}", prefix, name));
            }
        }
    }
    None
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Body,
    Finished,
}

/// Turns MEGA text into events.
pub struct MegaEventProducer {
    reader: PeekReader,
    ids: IdManager,
    tokens: SequenceTokensEventManager,
    max_comment_length: usize,
    state: State,
    current_sequence: Option<String>,
    /// Number of tokens of the first sequence read so far.
    characters_read: usize,
    label_position: usize,
    pending_gene: Option<(String, usize)>,
    label_set_ids: HashMap<char, String>,
}

impl MegaEventProducer {
    pub fn new(source: Box<dyn BufRead>, parameters: &ReadWriteParameters) -> Self {
        Self {
            reader: PeekReader::new(source),
            ids: IdManager::new(),
            tokens: SequenceTokensEventManager::new(parameters),
            max_comment_length: parameters.max_comment_length,
            state: State::Start,
            current_sequence: None,
            characters_read: 0,
            label_position: 0,
            pending_gene: None,
            label_set_ids: HashMap::new(),
        }
    }

    fn read_start(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        self.reader.skip_whitespace()?;
        if !self.reader.starts_with_ignore_case(FIRST_LINE)? {
            return Err(MegaError::MissingHeader(self.reader.location()).into());
        }
        self.reader.skip(FIRST_LINE.len())?;
        queue.push_back(Event::document_start());
        let matrix_id = self.ids.create_new_id(prefixes::MATRIX);
        queue.push_back(
            LinkedLabeledIdEvent::new(EventContentType::Alignment, matrix_id, None, None).into(),
        );
        self.state = State::Body;
        Ok(())
    }

    fn read_comment(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        let start = self.reader.location();
        self.reader.read()?;
        let events = self
            .reader
            .read_comment('[', ']', self.max_comment_length, start)?;
        queue.extend(events);
        Ok(())
    }

    fn skip_whitespace_and_comments(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        loop {
            self.reader.skip_whitespace()?;
            if self.reader.peek()? != Some('[') {
                return Ok(());
            }
            self.read_comment(queue)?;
        }
    }

    fn end_sequence(&mut self, queue: &mut VecDeque<Event>) {
        if self.current_sequence.take().is_some() {
            queue.push_back(Event::end(EventContentType::Sequence));
        }
    }

    fn push_literal(&mut self, predicate: &str, value: &str, queue: &mut VecDeque<Event>) {
        let id = self.ids.create_new_id(prefixes::META);
        queue.push_back(LiteralMetadataEvent::simple(id, predicate).into());
        queue.push_back(LiteralMetadataContentEvent::from_string(value, false).into());
        queue.push_back(Event::end(EventContentType::LiteralMeta));
    }

    fn unterminated(&self, command: &str, location: SourceLocation) -> MegaError {
        MegaError::UnterminatedCommand {
            command: command.to_string(),
            location,
        }
    }

    fn push_pending_gene(&mut self, queue: &mut VecDeque<Event>) {
        if let Some((name, start)) = self.pending_gene.take() {
            let id = self.ids.create_new_id(prefixes::CHARACTER_SET);
            queue.push_back(LabeledIdEvent::new(EventContentType::CharacterSet, id, Some(name)).into());
            queue.push_back(
                CharacterSetIntervalEvent::new(start as u64, self.characters_read as u64).into(),
            );
            queue.push_back(Event::end(EventContentType::CharacterSet));
        }
    }

    /// Reads a command after its `!`.
    fn read_command(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        let location = self.reader.location();
        self.reader.read()?;
        self.skip_whitespace_and_comments(queue)?;
        if self.reader.starts_with_ignore_case(COMMAND_LABEL)? {
            return self.read_label_command(location, queue);
        }
        if self.reader.starts_with_ignore_case(COMMAND_FORMAT)? {
            return self.read_format_command(location, queue);
        }

        let mut content = String::new();
        loop {
            match self.reader.peek()? {
                None => return Err(self.unterminated(content.trim(), location).into()),
                Some(';') => {
                    self.reader.read()?;
                    break;
                }
                Some('[') => self.read_comment(queue)?,
                Some(c) => {
                    self.reader.read()?;
                    content.push(c);
                }
            }
        }
        let content = content.trim();

        if !starts_with_ignore_case(content, COMMAND_TITLE)
            && !starts_with_ignore_case(content, COMMAND_DESCRIPTION)
        {
            if let Some(name) = gene_or_domain_name(content) {
                self.push_pending_gene(queue);
                self.pending_gene = Some((name, self.characters_read));
                return Ok(());
            }
        }
        match content.split_once(char::is_whitespace) {
            Some((name, value)) => self.push_literal(name, value.trim(), queue),
            None => self.push_literal(content, "", queue),
        }
        Ok(())
    }

    fn read_format_command(
        &mut self,
        location: SourceLocation,
        queue: &mut VecDeque<Event>,
    ) -> ReadResult<()> {
        self.reader.skip(COMMAND_FORMAT.len())?;
        let mut subcommands = 0;
        loop {
            self.skip_whitespace_and_comments(queue)?;
            match self.reader.peek()? {
                None => return Err(self.unterminated(COMMAND_FORMAT, location).into()),
                Some(';') => {
                    self.reader.read()?;
                    break;
                }
                Some(_) => {}
            }
            let key = self
                .reader
                .read_until(|c| c == '=' || c == ';' || c == '[' || c.is_whitespace())?;
            self.skip_whitespace_and_comments(queue)?;
            let value = if self.reader.peek()? == Some('=') {
                self.reader.read()?;
                self.skip_whitespace_and_comments(queue)?;
                self.reader
                    .read_until(|c| c == ';' || c == '[' || c.is_whitespace())?
            } else {
                String::new()
            };
            if key.is_empty() {
                continue;
            }
            if key.eq_ignore_ascii_case("Identical") || key.eq_ignore_ascii_case("MatchChar") {
                self.tokens.set_match_token(value.clone());
            }
            self.push_literal(&format!("{}{}", FORMAT_PREFIX, key), &value, queue);
            subcommands += 1;
        }
        if subcommands == 0 {
            self.push_literal(COMMAND_FORMAT, "", queue);
        }
        Ok(())
    }

    /// Reads `!Label`, whose characters assign the following alignment columns to
    /// character sets named by the character. `_` marks unlabeled columns.
    fn read_label_command(
        &mut self,
        location: SourceLocation,
        queue: &mut VecDeque<Event>,
    ) -> ReadResult<()> {
        self.reader.skip(COMMAND_LABEL.len())?;
        let mut intervals: BTreeMap<char, Vec<(usize, usize)>> = BTreeMap::new();
        let mut position = self.label_position;
        let mut run: Option<(char, usize)> = None;
        loop {
            let c = match self.reader.peek()? {
                None => return Err(self.unterminated(COMMAND_LABEL, location).into()),
                Some(';') => {
                    self.reader.read()?;
                    break;
                }
                Some('[') => {
                    self.read_comment(queue)?;
                    continue;
                }
                Some(c) => {
                    self.reader.read()?;
                    c
                }
            };
            if c.is_whitespace() {
                continue;
            }
            match run {
                Some((current, _)) if current == c => {}
                _ => {
                    if let Some((current, start)) = run.take() {
                        intervals.entry(current).or_default().push((start, position));
                    }
                    if c != NO_LABEL {
                        run = Some((c, position));
                    }
                }
            }
            position += 1;
        }
        if let Some((current, start)) = run {
            intervals.entry(current).or_default().push((start, position));
        }
        self.label_position = position;

        for (label, runs) in intervals {
            let next_id = self.label_set_ids.len();
            let id = self
                .label_set_ids
                .entry(label)
                .or_insert_with(|| format!("{}Label{}", prefixes::CHARACTER_SET, next_id))
                .clone();
            queue.push_back(
                LabeledIdEvent::new(EventContentType::CharacterSet, id, Some(label.to_string())).into(),
            );
            for (start, end) in runs {
                queue.push_back(CharacterSetIntervalEvent::new(start as u64, end as u64).into());
            }
            queue.push_back(Event::end(EventContentType::CharacterSet));
        }
        Ok(())
    }

    fn read_sequence_name(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        self.reader.read()?;
        let name = self.reader.read_until(char::is_whitespace)?;
        match self.tokens.first_sequence_name() {
            Some(first) if first == name => {
                // Blocks without a preceding !Label continue after the longest block.
                self.label_position = self.label_position.max(self.characters_read);
            }
            _ => {}
        }
        queue.push_back(self.tokens.start_event(&name, None, &mut self.ids));
        self.current_sequence = Some(name);
        Ok(())
    }

    fn read_characters(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        let location = self.reader.location();
        let Some(name) = self.current_sequence.clone() else {
            return Err(MegaError::DataWithoutSequence(location).into());
        };
        let text = self
            .reader
            .read_until(|c| c == '\n' || c == '\r' || c == '[')?;
        let tokens = character_tokens(&text);
        if self.tokens.first_sequence_name() == Some(name.as_str()) {
            self.characters_read += tokens.len();
        }
        self.tokens.add_tokens_events(&name, tokens, queue)
    }

    fn finish(&mut self, queue: &mut VecDeque<Event>) {
        self.end_sequence(queue);
        self.push_pending_gene(queue);
        queue.push_back(Event::end(EventContentType::Alignment));
        queue.push_back(Event::end(EventContentType::Document));
        self.state = State::Finished;
    }
}

impl EventProducer for MegaEventProducer {
    fn format_id(&self) -> &'static str {
        ids::MEGA
    }

    fn produce(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        match self.state {
            State::Start => return self.read_start(queue),
            State::Finished => return Ok(()),
            State::Body => {}
        }
        while queue.is_empty() {
            self.reader.skip_whitespace()?;
            match self.reader.peek()? {
                None => self.finish(queue),
                Some('[') => self.read_comment(queue)?,
                Some('!') => {
                    self.end_sequence(queue);
                    self.read_command(queue)?;
                }
                Some('#') => {
                    self.end_sequence(queue);
                    self.read_sequence_name(queue)?;
                }
                Some(_) => self.read_characters(queue)?,
            }
        }
        Ok(())
    }
}

/// Reader for MEGA sources.
pub type MegaEventReader = EventStream<MegaEventProducer>;

pub fn mega_reader(source: Box<dyn BufRead>, parameters: &ReadWriteParameters) -> MegaEventReader {
    EventStream::new(MegaEventProducer::new(source, parameters))
}

/// Registry entry for MEGA. There is no MEGA writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MegaFactory;

impl FormatFactory for MegaFactory {
    fn info(&self) -> &'static FormatInfo {
        &MEGA_INFO
    }

    fn reader(
        &self,
        source: Box<dyn BufRead>,
        parameters: &ReadWriteParameters,
    ) -> Box<dyn EventReader> {
        Box::new(mega_reader(source, parameters))
    }
}

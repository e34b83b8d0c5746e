//! NEXUS reader.
//!
//! ## NEXUS Format
//!
//! NEXUS files start with `#NEXUS` and contain blocks of commands:
//! ```text
//! #NEXUS
//! BEGIN TAXA;
//!   DIMENSIONS NTAX=3;
//!   TAXLABELS A-2301 A-2501 'A 3301';
//! END;
//! BEGIN CHARACTERS;
//!   DIMENSIONS NCHAR=10;
//!   FORMAT DATATYPE=DNA GAP=- MISSING=? MATCHCHAR=.;
//!   MATRIX
//!     A-2301    ACGTACGTAC
//!     A-2501    ....TG....
//!     'A 3301'  T.T.T.T.T.
//!   ;
//! END;
//! BEGIN TREES;
//!   TRANSLATE 1 A-2301, 2 A-2501, 3 'A 3301';
//!   TREE tree1 = [&R] ((1:0.1,2:0.2):0.05,3:0.3);
//! END;
//! ```
//!
//! ## Supported Features
//!
//! - `TAXA` blocks (`TAXLABELS`) as OTU lists
//! - `CHARACTERS` and `DATA` blocks (`DIMENSIONS`, `FORMAT`, sequential and
//!   interleaved `MATRIX`, `(...)` and `{...}` tokens)
//! - `TREES` blocks (`TRANSLATE`, `TREE`), read with the Newick string reader
//! - `TITLE` and `LINK TAXA=...` to connect blocks
//! - Any other command as UNKNOWN_COMMAND event, if enabled
//!
//! ## Relaxed Parsing
//!
//! - Case insensitive commands
//! - Flexible whitespace
//! - Quoted and unquoted names; `_` in unquoted names stands for a space

use std::collections::VecDeque;
use std::io::BufRead;

use thiserror::Error;

use crate::error::{ReadResult, SourceLocation};
use crate::events::{
    CharacterStateSetType, CharacterSymbolMeaning, Event, EventContentType, LabeledIdEvent,
    LinkedLabeledIdEvent, LiteralMetadataContentEvent, LiteralMetadataEvent,
    SingleTokenDefinitionEvent, TokenSetDefinitionEvent, UnknownCommandEvent,
};
use crate::formats::newick::NewickStringReader;
use crate::formats::{ids, FormatFactory, FormatInfo, MetadataModeling};
use crate::ids::{prefixes, IdManager};
use crate::labels::{OtuLabelIndex, TranslatingLabelProcessor, TranslationTable};
use crate::parameters::{names, ReadWriteParameters};
use crate::reader::text::PeekReader;
use crate::reader::tokens::SequenceTokensEventManager;
use crate::reader::{EventProducer, EventReader, EventStream};

/// Errors that can occur during NEXUS parsing.
#[derive(Error, Debug)]
pub enum NexusError {
    #[error("Not a NEXUS file (must start with #NEXUS, {0})")]
    NotNexus(SourceLocation),

    #[error("Unterminated command {command} starting at {location} (missing ';')")]
    UnterminatedCommand {
        command: String,
        location: SourceLocation,
    },

    #[error("Unterminated quoted name starting at {0}")]
    UnterminatedName(SourceLocation),

    #[error("Invalid value \"{value}\" of {key} at {location}")]
    InvalidValue {
        key: String,
        value: String,
        location: SourceLocation,
    },

    #[error("Expected '{expected}' in command {command} at {location}")]
    ExpectedSymbol {
        expected: char,
        command: String,
        location: SourceLocation,
    },
}

/// Result type for NEXUS operations.
pub type NexusResult<T> = Result<T, NexusError>;

const FIRST_WORD: &str = "#NEXUS";
const COMMAND_END: char = ';';
const COMMENT_START: char = '[';
const COMMENT_END: char = ']';
const NAME_DELIMITER: char = '\'';
const STRING_DELIMITER: char = '"';
const KEY_VALUE_SEPARATOR: char = '=';
const TRANSLATE_SEPARATOR: char = ',';
const UNDERSCORE_BLANK: char = '_';
const FORMAT_PREFIX: &str = "FORMAT.";

fn is_word_delimiter(c: char) -> bool {
    c.is_whitespace()
        || c == COMMAND_END
        || c == COMMENT_START
        || c == KEY_VALUE_SEPARATOR
        || c == TRANSLATE_SEPARATOR
}

/// Closing bracket of a token spanning several characters, like `(AG)` or `{CT}`.
fn token_group_end(c: char) -> Option<char> {
    match c {
        '(' => Some(')'),
        '{' => Some('}'),
        _ => None,
    }
}

pub static NEXUS_INFO: FormatInfo = FormatInfo {
    format_id: ids::NEXUS,
    format_name: "NEXUS",
    extensions: &["nex", "nexus", "nxs"],
    reader_elements: &[
        EventContentType::Document,
        EventContentType::Comment,
        EventContentType::UnknownCommand,
        EventContentType::OtuList,
        EventContentType::Otu,
        EventContentType::Alignment,
        EventContentType::Sequence,
        EventContentType::SequenceTokens,
        EventContentType::TokenSetDefinition,
        EventContentType::SingleTokenDefinition,
        EventContentType::TreeNetworkGroup,
        EventContentType::Tree,
        EventContentType::Node,
        EventContentType::Edge,
        EventContentType::RootEdge,
    ],
    writer_elements: &[],
    reader_metadata: &[
        (EventContentType::Alignment, MetadataModeling::LiteralOnly),
        (EventContentType::Tree, MetadataModeling::LiteralOnly),
        (EventContentType::Node, MetadataModeling::LiteralOnly),
        (EventContentType::Edge, MetadataModeling::LiteralOnly),
        (EventContentType::RootEdge, MetadataModeling::LiteralOnly),
    ],
    writer_metadata: &[],
    reader_parameters: &[
        names::MAX_TOKENS_TO_READ,
        names::MAX_COMMENT_LENGTH,
        names::REPLACE_MATCH_TOKENS,
        names::MATCH_TOKEN,
        names::CREATE_UNKNOWN_COMMAND_EVENTS,
    ],
    writer_parameters: &[],
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Block {
    Taxa,
    Characters,
    Trees,
    Other(String),
}

impl Block {
    fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "TAXA" => Block::Taxa,
            "CHARACTERS" | "DATA" => Block::Characters,
            "TREES" => Block::Trees,
            _ => Block::Other(name.to_string()),
        }
    }

    fn name(&self) -> &str {
        match self {
            Block::Taxa => "TAXA",
            Block::Characters => "CHARACTERS",
            Block::Trees => "TREES",
            Block::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Commands,
    Matrix,
    Tree,
    Finished,
}

#[derive(Debug)]
struct OtuList {
    id: String,
    title: Option<String>,
    labels: OtuLabelIndex,
}

/// The OTU list linked by `LINK TAXA=title`, else the last one read.
fn active_otu_list<'a>(lists: &'a [OtuList], linked_title: Option<&str>) -> Option<&'a OtuList> {
    match linked_title {
        Some(title) => lists.iter().rev().find(|list| {
            list.title
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(title))
        }),
        None => lists.last(),
    }
}

/// Per-block settings of a CHARACTERS block.
#[derive(Debug, Default)]
struct MatrixFormat {
    nchar: Option<usize>,
    interleave: bool,
}

/// Turns NEXUS text into events, one command at a time.
pub struct NexusEventProducer {
    reader: PeekReader,
    parameters: ReadWriteParameters,
    ids: IdManager,
    tokens: SequenceTokensEventManager,
    state: State,
    block: Option<Block>,
    block_title: Option<String>,
    linked_title: Option<String>,
    /// ALIGNMENT or TREE_NETWORK_GROUP opened by the current block.
    open_element: Option<EventContentType>,
    otu_lists: Vec<OtuList>,
    translation: TranslationTable,
    format: MatrixFormat,
    tree: Option<NewickStringReader>,
}

impl NexusEventProducer {
    pub fn new(source: Box<dyn BufRead>, parameters: &ReadWriteParameters) -> Self {
        Self {
            reader: PeekReader::new(source),
            parameters: parameters.clone(),
            ids: IdManager::new(),
            tokens: SequenceTokensEventManager::new(parameters),
            state: State::Start,
            block: None,
            block_title: None,
            linked_title: None,
            open_element: None,
            otu_lists: Vec::new(),
            translation: TranslationTable::new(),
            format: MatrixFormat::default(),
            tree: None,
        }
    }

    fn unterminated(command: &str, location: SourceLocation) -> NexusError {
        NexusError::UnterminatedCommand {
            command: command.to_string(),
            location,
        }
    }

    fn read_comment(&mut self, comments: &mut Vec<Event>) -> ReadResult<()> {
        let start = self.reader.location();
        self.reader.read()?;
        let events = self.reader.read_comment(
            COMMENT_START,
            COMMENT_END,
            self.parameters.max_comment_length,
            start,
        )?;
        comments.extend(events);
        Ok(())
    }

    fn skip_whitespace_and_comments(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        let mut comments = Vec::new();
        loop {
            self.reader.skip_whitespace()?;
            if self.reader.peek()? != Some(COMMENT_START) {
                break;
            }
            self.read_comment(&mut comments)?;
        }
        queue.extend(comments);
        Ok(())
    }

    /// Reads a word. Names may be enclosed in `'` (with `''` for a single `'`) or
    /// `"`. With `blanks`, `_` in unquoted words is turned into a space.
    fn read_word(&mut self, blanks: bool) -> ReadResult<String> {
        let location = self.reader.location();
        match self.reader.peek()? {
            Some(delimiter @ (NAME_DELIMITER | STRING_DELIMITER)) => {
                self.reader.read()?;
                let mut word = String::new();
                loop {
                    match self.reader.read()? {
                        None => return Err(NexusError::UnterminatedName(location).into()),
                        Some(c) if c == delimiter => {
                            if delimiter == NAME_DELIMITER && self.reader.peek()? == Some(NAME_DELIMITER) {
                                self.reader.read()?;
                                word.push(NAME_DELIMITER);
                            } else {
                                break;
                            }
                        }
                        Some(c) => word.push(c),
                    }
                }
                Ok(word)
            }
            _ => {
                let word = self.reader.read_until(is_word_delimiter)?;
                if blanks {
                    Ok(word.replace(UNDERSCORE_BLANK, " "))
                } else {
                    Ok(word)
                }
            }
        }
    }

    /// Reads the rest of a command up to and including its `;`. Comments are
    /// moved to `queue`, quoted parts are kept as written.
    fn read_command_content(
        &mut self,
        command: &str,
        location: SourceLocation,
        queue: &mut VecDeque<Event>,
    ) -> ReadResult<String> {
        let mut content = String::new();
        let mut comments = Vec::new();
        let mut quote: Option<char> = None;
        loop {
            match (quote, self.reader.peek()?) {
                (_, None) => return Err(Self::unterminated(command, location).into()),
                (None, Some(COMMAND_END)) => {
                    self.reader.read()?;
                    break;
                }
                (None, Some(COMMENT_START)) => self.read_comment(&mut comments)?,
                (None, Some(c @ (NAME_DELIMITER | STRING_DELIMITER))) => {
                    self.reader.read()?;
                    quote = Some(c);
                    content.push(c);
                }
                (Some(q), Some(c)) => {
                    self.reader.read()?;
                    if c == q {
                        quote = None;
                    }
                    content.push(c);
                }
                (None, Some(c)) => {
                    self.reader.read()?;
                    content.push(c);
                }
            }
        }
        queue.extend(comments);
        Ok(content.trim().to_string())
    }

    /// Consumes the `;` of a command whose arguments were read. Additional
    /// content is ignored.
    fn finish_command(
        &mut self,
        command: &str,
        location: SourceLocation,
        queue: &mut VecDeque<Event>,
    ) -> ReadResult<()> {
        let rest = self.read_command_content(command, location, queue)?;
        if !rest.is_empty() {
            log::debug!("Ignoring \"{}\" at the end of the {} command", rest, command);
        }
        Ok(())
    }

    /// Reads `key[=value] ...` up to the `;` of a command.
    fn read_key_values(
        &mut self,
        command: &str,
        location: SourceLocation,
        queue: &mut VecDeque<Event>,
    ) -> ReadResult<Vec<(String, String)>> {
        let mut pairs = Vec::new();
        loop {
            self.skip_whitespace_and_comments(queue)?;
            match self.reader.peek()? {
                None => return Err(Self::unterminated(command, location).into()),
                Some(COMMAND_END) => {
                    self.reader.read()?;
                    return Ok(pairs);
                }
                Some(_) => {}
            }
            let key = self.read_word(false)?;
            if key.is_empty() {
                // A lone separator such as a stray `,`.
                self.reader.read()?;
                continue;
            }
            self.skip_whitespace_and_comments(queue)?;
            let value = if self.reader.peek()? == Some(KEY_VALUE_SEPARATOR) {
                self.reader.read()?;
                self.skip_whitespace_and_comments(queue)?;
                self.read_word(false)?
            } else {
                String::new()
            };
            pairs.push((key.to_ascii_uppercase(), value));
        }
    }

    fn push_literal(&mut self, predicate: String, value: &str, queue: &mut VecDeque<Event>) {
        let id = self.ids.create_new_id(prefixes::META);
        queue.push_back(LiteralMetadataEvent::simple(id, predicate).into());
        queue.push_back(LiteralMetadataContentEvent::from_string(value, false).into());
        queue.push_back(Event::end(EventContentType::LiteralMeta));
    }

    fn read_start(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        self.reader.skip_whitespace()?;
        if !self.reader.starts_with_ignore_case(FIRST_WORD)? {
            return Err(NexusError::NotNexus(self.reader.location()).into());
        }
        self.reader.skip(FIRST_WORD.len())?;
        queue.push_back(Event::document_start());
        self.state = State::Commands;
        Ok(())
    }

    fn finish_document(&mut self, queue: &mut VecDeque<Event>) {
        if let Some(block) = &self.block {
            log::warn!("The {} block was not closed before the end of the file", block.name());
            self.end_block(queue);
        }
        queue.push_back(Event::end(EventContentType::Document));
        self.state = State::Finished;
    }

    fn begin_block(&mut self, name: String) {
        log::debug!("Reading NEXUS block {}", name);
        self.block = Some(Block::from_name(&name));
        self.block_title = None;
        self.linked_title = None;
        self.format = MatrixFormat::default();
        self.tokens = SequenceTokensEventManager::new(&self.parameters);
    }

    fn end_block(&mut self, queue: &mut VecDeque<Event>) {
        if let Some(content_type) = self.open_element.take() {
            queue.push_back(Event::end(content_type));
        }
        self.translation.clear();
        self.block = None;
    }

    fn active_otu_id(&self) -> Option<String> {
        active_otu_list(&self.otu_lists, self.linked_title.as_deref()).map(|list| list.id.clone())
    }

    fn ensure_alignment(&mut self, queue: &mut VecDeque<Event>) {
        if self.open_element.is_none() {
            let id = self.ids.create_new_id(prefixes::MATRIX);
            queue.push_back(
                LinkedLabeledIdEvent::new(
                    EventContentType::Alignment,
                    id,
                    self.block_title.clone(),
                    self.active_otu_id(),
                )
                .into(),
            );
            self.open_element = Some(EventContentType::Alignment);
        }
    }

    fn ensure_tree_group(&mut self, queue: &mut VecDeque<Event>) {
        if self.open_element.is_none() {
            let id = self.ids.create_new_id(prefixes::TREE_NETWORK_GROUP);
            queue.push_back(
                LinkedLabeledIdEvent::new(
                    EventContentType::TreeNetworkGroup,
                    id,
                    self.block_title.clone(),
                    self.active_otu_id(),
                )
                .into(),
            );
            self.open_element = Some(EventContentType::TreeNetworkGroup);
        }
    }

    /// Reads the next command and dispatches it by block and name.
    fn read_command(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        self.skip_whitespace_and_comments(queue)?;
        let location = self.reader.location();
        if self.reader.peek()?.is_none() {
            self.finish_document(queue);
            return Ok(());
        }
        let command = self.read_word(false)?;
        if command.is_empty() {
            // Empty command or stray separator.
            self.reader.read()?;
            return Ok(());
        }
        let upper = command.to_ascii_uppercase();
        match (self.block.clone(), upper.as_str()) {
            (None, "BEGIN") => {
                self.skip_whitespace_and_comments(queue)?;
                let name = self.read_word(false)?;
                self.finish_command(&command, location, queue)?;
                self.begin_block(name);
            }
            (Some(_), "END" | "ENDBLOCK") => {
                self.finish_command(&command, location, queue)?;
                self.end_block(queue);
            }
            (Some(_), "TITLE") => {
                self.skip_whitespace_and_comments(queue)?;
                self.block_title = Some(self.read_word(true)?);
                self.finish_command(&command, location, queue)?;
            }
            (Some(_), "LINK") => {
                for (key, value) in self.read_key_values(&command, location, queue)? {
                    if key == "TAXA" {
                        self.linked_title = Some(value.replace(UNDERSCORE_BLANK, " "));
                    }
                }
            }
            (Some(Block::Taxa), "TAXLABELS") => self.read_taxlabels(&command, location, queue)?,
            (Some(Block::Taxa), "DIMENSIONS") => {
                self.read_key_values(&command, location, queue)?;
            }
            (Some(Block::Characters), "DIMENSIONS") => {
                self.read_dimensions(&command, location, queue)?
            }
            (Some(Block::Characters), "FORMAT") => self.read_format(&command, location, queue)?,
            (Some(Block::Characters), "MATRIX") => {
                self.ensure_alignment(queue);
                self.state = State::Matrix;
            }
            (Some(Block::Trees), "TRANSLATE") => self.read_translate(&command, location, queue)?,
            (Some(Block::Trees), "TREE" | "UTREE") => self.read_tree_start(&command, location, queue)?,
            (block, _) => {
                let content = self.read_command_content(&command, location, queue)?;
                let block_name = block.as_ref().map(|block| block.name().to_string());
                if self.parameters.create_unknown_command_events {
                    queue.push_back(
                        UnknownCommandEvent::new(command, block_name, content, false).into(),
                    );
                } else {
                    log::debug!("Skipping unsupported command {}", command);
                }
            }
        }
        Ok(())
    }

    fn read_taxlabels(
        &mut self,
        command: &str,
        location: SourceLocation,
        queue: &mut VecDeque<Event>,
    ) -> ReadResult<()> {
        let mut labels = Vec::new();
        loop {
            self.skip_whitespace_and_comments(queue)?;
            match self.reader.peek()? {
                None => return Err(Self::unterminated(command, location).into()),
                Some(COMMAND_END) => {
                    self.reader.read()?;
                    break;
                }
                Some(_) => {}
            }
            let label = self.read_word(true)?;
            if label.is_empty() {
                self.reader.read()?;
                continue;
            }
            labels.push(label);
        }

        let list_id = self.ids.create_new_id(prefixes::OTU_LIST);
        queue.push_back(
            LabeledIdEvent::new(EventContentType::OtuList, list_id.clone(), self.block_title.clone())
                .into(),
        );
        let mut index = OtuLabelIndex::new();
        for label in labels {
            let otu_id = self.ids.create_new_id(prefixes::OTU);
            index.add(label.clone(), otu_id.clone());
            queue.push_back(LabeledIdEvent::new(EventContentType::Otu, otu_id, Some(label)).into());
            queue.push_back(Event::end(EventContentType::Otu));
        }
        queue.push_back(Event::end(EventContentType::OtuList));
        self.otu_lists.push(OtuList {
            id: list_id,
            title: self.block_title.clone(),
            labels: index,
        });
        Ok(())
    }

    fn read_dimensions(
        &mut self,
        command: &str,
        location: SourceLocation,
        queue: &mut VecDeque<Event>,
    ) -> ReadResult<()> {
        for (key, value) in self.read_key_values(command, location, queue)? {
            if key == "NCHAR" {
                let nchar = value.parse::<usize>().map_err(|_| NexusError::InvalidValue {
                    key: key.clone(),
                    value: value.clone(),
                    location,
                })?;
                self.format.nchar = Some(nchar);
            }
        }
        Ok(())
    }

    /// Reads `FORMAT`. Every sub-command becomes a literal, and the symbols
    /// become a token set definition.
    fn read_format(
        &mut self,
        command: &str,
        location: SourceLocation,
        queue: &mut VecDeque<Event>,
    ) -> ReadResult<()> {
        self.ensure_alignment(queue);
        let mut set_type = None;
        let mut symbols = Vec::new();
        for (key, value) in self.read_key_values(command, location, queue)? {
            match key.as_str() {
                "DATATYPE" => set_type = Some(CharacterStateSetType::from_format_name(&value)),
                "GAP" => symbols.push((value.clone(), CharacterSymbolMeaning::Gap)),
                "MISSING" => symbols.push((value.clone(), CharacterSymbolMeaning::Missing)),
                "MATCHCHAR" => {
                    self.tokens.set_match_token(value.clone());
                    symbols.push((value.clone(), CharacterSymbolMeaning::Match));
                }
                "INTERLEAVE" => {
                    self.format.interleave = value.is_empty() || value.eq_ignore_ascii_case("YES");
                }
                _ => {}
            }
            self.push_literal(format!("{}{}", FORMAT_PREFIX, key), &value, queue);
        }

        if set_type.is_some() || !symbols.is_empty() {
            let set_id = self.ids.create_new_id(prefixes::TOKEN_SET);
            queue.push_back(
                TokenSetDefinitionEvent::new(
                    set_id,
                    None,
                    set_type.unwrap_or(CharacterStateSetType::Unknown),
                )
                .into(),
            );
            for (token, meaning) in symbols.into_iter().filter(|(token, _)| !token.is_empty()) {
                let id = self.ids.create_new_id(prefixes::SINGLE_TOKEN);
                queue.push_back(SingleTokenDefinitionEvent::new(id, token, meaning).into());
                queue.push_back(Event::end(EventContentType::SingleTokenDefinition));
            }
            queue.push_back(Event::end(EventContentType::TokenSetDefinition));
        }
        Ok(())
    }

    /// Reads the tokens up to the end of the current line or the `;` of the
    /// matrix. Comments are collected separately.
    fn read_line_tokens(
        &mut self,
        tokens: &mut Vec<String>,
        comments: &mut Vec<Event>,
    ) -> ReadResult<()> {
        loop {
            self.reader.skip_inline_whitespace()?;
            let location = self.reader.location();
            match self.reader.peek()? {
                None | Some(COMMAND_END) => return Ok(()),
                Some('\n') | Some('\r') => {
                    self.reader.consume_line_break()?;
                    return Ok(());
                }
                Some(COMMENT_START) => self.read_comment(comments)?,
                Some(c) => {
                    self.reader.read()?;
                    match token_group_end(c) {
                        Some(end) => {
                            let mut token = c.to_string();
                            loop {
                                match self.reader.read()? {
                                    None => {
                                        return Err(Self::unterminated("MATRIX", location).into())
                                    }
                                    Some(inner) => {
                                        if !inner.is_whitespace() {
                                            token.push(inner);
                                        }
                                        if inner == end {
                                            break;
                                        }
                                    }
                                }
                            }
                            tokens.push(token);
                        }
                        None => tokens.push(c.to_string()),
                    }
                }
            }
        }
    }

    /// Reads one row of a matrix: a name followed by its tokens. Sequential rows
    /// continue over several lines until NCHAR tokens were read.
    fn read_matrix_row(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        self.skip_whitespace_and_comments(queue)?;
        let location = self.reader.location();
        match self.reader.peek()? {
            None => return Err(Self::unterminated("MATRIX", location).into()),
            Some(COMMAND_END) => {
                self.reader.read()?;
                self.state = State::Commands;
                return Ok(());
            }
            Some(_) => {}
        }
        let name = self.read_word(true)?;
        if name.is_empty() {
            return Err(NexusError::ExpectedSymbol {
                expected: COMMAND_END,
                command: "MATRIX".to_string(),
                location,
            }
            .into());
        }
        let linked_otu = active_otu_list(&self.otu_lists, self.linked_title.as_deref())
            .and_then(|list| list.labels.id_for_label(&name))
            .map(str::to_string);
        queue.push_back(self.tokens.start_event(&name, linked_otu, &mut self.ids));

        let mut comments = Vec::new();
        let mut read_in_row = 0;
        loop {
            let mut tokens = Vec::new();
            self.read_line_tokens(&mut tokens, &mut comments)?;
            read_in_row += tokens.len();
            self.tokens.add_tokens_events(&name, tokens, queue)?;
            let at_end = matches!(self.reader.peek()?, None | Some(COMMAND_END));
            let row_complete = if self.format.interleave {
                read_in_row > 0
            } else {
                match self.format.nchar {
                    Some(nchar) => self.tokens.column(&name) >= nchar,
                    None => read_in_row > 0,
                }
            };
            if at_end || row_complete {
                break;
            }
        }
        queue.extend(comments);
        queue.push_back(Event::end(EventContentType::Sequence));
        Ok(())
    }

    fn read_translate(
        &mut self,
        command: &str,
        location: SourceLocation,
        queue: &mut VecDeque<Event>,
    ) -> ReadResult<()> {
        loop {
            self.skip_whitespace_and_comments(queue)?;
            match self.reader.peek()? {
                None => return Err(Self::unterminated(command, location).into()),
                Some(COMMAND_END) => {
                    self.reader.read()?;
                    return Ok(());
                }
                Some(TRANSLATE_SEPARATOR) => {
                    self.reader.read()?;
                    continue;
                }
                Some(_) => {}
            }
            let key = self.read_word(true)?;
            self.skip_whitespace_and_comments(queue)?;
            let label = self.read_word(true)?;
            if key.is_empty() || label.is_empty() {
                return Err(NexusError::ExpectedSymbol {
                    expected: TRANSLATE_SEPARATOR,
                    command: command.to_string(),
                    location: self.reader.location(),
                }
                .into());
            }
            self.translation.add(key, label);
        }
    }

    /// Reads `TREE [*] name =` and hands the tree string to a Newick reader.
    fn read_tree_start(
        &mut self,
        command: &str,
        location: SourceLocation,
        queue: &mut VecDeque<Event>,
    ) -> ReadResult<()> {
        self.skip_whitespace_and_comments(queue)?;
        if self.reader.peek()? == Some('*') {
            self.reader.read()?;
            self.skip_whitespace_and_comments(queue)?;
        }
        let name = self.read_word(true)?;
        self.skip_whitespace_and_comments(queue)?;
        if self.reader.peek()? != Some(KEY_VALUE_SEPARATOR) {
            return Err(NexusError::ExpectedSymbol {
                expected: KEY_VALUE_SEPARATOR,
                command: command.to_string(),
                location,
            }
            .into());
        }
        self.reader.read()?;
        self.ensure_tree_group(queue);
        let label = (!name.is_empty()).then_some(name);
        self.tree = Some(NewickStringReader::single_tree(
            label,
            self.parameters.max_comment_length,
        ));
        self.state = State::Tree;
        Ok(())
    }

    fn read_tree(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        let Some(tree) = self.tree.as_mut() else {
            self.state = State::Commands;
            return Ok(());
        };
        let otus = active_otu_list(&self.otu_lists, self.linked_title.as_deref())
            .map(|list| &list.labels);
        let labels = TranslatingLabelProcessor::new(&self.translation, otus);
        if !tree.add_next_events(&mut self.reader, &labels, &mut self.ids, queue)? {
            self.tree = None;
            self.state = State::Commands;
        }
        Ok(())
    }
}

impl EventProducer for NexusEventProducer {
    fn format_id(&self) -> &'static str {
        ids::NEXUS
    }

    fn produce(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        while queue.is_empty() && self.state != State::Finished {
            match self.state {
                State::Start => self.read_start(queue)?,
                State::Commands => self.read_command(queue)?,
                State::Matrix => self.read_matrix_row(queue)?,
                State::Tree => self.read_tree(queue)?,
                State::Finished => {}
            }
        }
        Ok(())
    }
}

/// Reader for NEXUS sources.
pub type NexusEventReader = EventStream<NexusEventProducer>;

pub fn nexus_reader(source: Box<dyn BufRead>, parameters: &ReadWriteParameters) -> NexusEventReader {
    EventStream::new(NexusEventProducer::new(source, parameters))
}

/// Factory for NEXUS readers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NexusFactory;

impl FormatFactory for NexusFactory {
    fn info(&self) -> &'static FormatInfo {
        &NEXUS_INFO
    }

    fn reader(
        &self,
        source: Box<dyn BufRead>,
        parameters: &ReadWriteParameters,
    ) -> Box<dyn EventReader> {
        Box::new(nexus_reader(source, parameters))
    }
}

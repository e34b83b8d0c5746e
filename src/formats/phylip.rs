//! PHYLIP reader and writer.
//!
//! Supports both sequential and interleaved PHYLIP formats. They are registered
//! as two formats, since a reader cannot tell them apart reliably.
//!
//! ## PHYLIP Format
//!
//! The first line contains the number of sequences and the sequence length:
//! ```text
//!  3 10
//! ```
//!
//! ### Sequential Format
//! Each sequence name (10 chars, padded) followed by all its data, possibly on
//! several lines:
//! ```text
//!  3 10
//! Seq1      ACGTACGTAC
//! Seq2      TGCATGCATG
//! Seq3      AAAACCCCGG
//! ```
//!
//! ### Interleaved Format
//! Names on first block, then data continues in subsequent blocks:
//! ```text
//!  3 20
//! Seq1      ACGTACGTAC
//! Seq2      TGCATGCATG
//! Seq3      AAAACCCCGG
//!
//! GTGTGTGTGT
//! CACACACACA
//! TTTTTTTTTT
//! ```
//!
//! ## Relaxed Parsing
//!
//! With `relaxed_phylip` names end at the first whitespace and may be of any
//! length. Without it, names are the first 10 characters of a line, unless those
//! contain several words, in which case the relaxed rule is used for that line.

use std::collections::{HashSet, VecDeque};
use std::io::{BufRead, Write};

use thiserror::Error;

use crate::error::{ReadResult, WriteResult};
use crate::events::{Event, EventContentType, LinkedLabeledIdEvent};
use crate::formats::{ids, FormatFactory, FormatInfo};
use crate::ids::{prefixes, IdManager};
use crate::parameters::{names, ReadWriteParameters, PHYLIP_NAME_LENGTH};
use crate::reader::tokens::{character_tokens, SequenceTokensEventManager};
use crate::reader::{EventProducer, EventReader, EventStream};
use crate::writer::adapters::{object_label, DocumentDataAdapter};
use crate::writer::{collect_sequence_tokens, single_matrix, EventWriter, WriteReport};

/// Errors that can occur during PHYLIP parsing.
#[derive(Error, Debug)]
pub enum PhylipError {
    #[error("Empty PHYLIP file")]
    EmptyFile,

    #[error("Line {line}: invalid header, expected 'ntax nchar' (two integers), got '{content}'")]
    InvalidHeader { line: usize, content: String },

    #[error("Invalid sequence count in header: '{0}' is not a valid number")]
    InvalidSequenceCount(String),

    #[error("Invalid sequence length in header: '{0}' is not a valid number")]
    InvalidSequenceLength(String),
}

const READER_ELEMENTS: &[EventContentType] = &[
    EventContentType::Document,
    EventContentType::Alignment,
    EventContentType::Sequence,
    EventContentType::SequenceTokens,
];

const WRITER_ELEMENTS: &[EventContentType] = &[
    EventContentType::Document,
    EventContentType::Alignment,
    EventContentType::Sequence,
    EventContentType::SequenceTokens,
    EventContentType::SingleSequenceToken,
];

const READER_PARAMETERS: &[&str] = &[
    names::MAX_TOKENS_TO_READ,
    names::REPLACE_MATCH_TOKENS,
    names::MATCH_TOKEN,
    names::RELAXED_PHYLIP,
];

const WRITER_PARAMETERS: &[&str] = &[names::RELAXED_PHYLIP, names::MAXIMUM_NAME_LENGTH];

pub static PHYLIP_INFO: FormatInfo = FormatInfo {
    format_id: ids::PHYLIP,
    format_name: "PHYLIP",
    extensions: &["phy", "phylip", "ph"],
    reader_elements: READER_ELEMENTS,
    writer_elements: WRITER_ELEMENTS,
    reader_metadata: &[],
    writer_metadata: &[],
    reader_parameters: READER_PARAMETERS,
    writer_parameters: WRITER_PARAMETERS,
};

pub static SEQUENTIAL_PHYLIP_INFO: FormatInfo = FormatInfo {
    format_id: ids::SEQUENTIAL_PHYLIP,
    format_name: "sequential PHYLIP",
    extensions: &[],
    reader_elements: READER_ELEMENTS,
    writer_elements: WRITER_ELEMENTS,
    reader_metadata: &[],
    writer_metadata: &[],
    reader_parameters: READER_PARAMETERS,
    writer_parameters: WRITER_PARAMETERS,
};

/// Splits a line into name and sequence parts.
fn split_name_and_sequence(line: &str, relaxed: bool) -> (String, String) {
    let line = line.trim_end();
    if !relaxed {
        match line.char_indices().nth(PHYLIP_NAME_LENGTH) {
            Some((offset, _)) => {
                let name = line[..offset].trim();
                if name.split_whitespace().count() == 1 {
                    return (name.to_string(), line[offset..].to_string());
                }
            }
            None => {
                let name = line.trim();
                if name.split_whitespace().count() == 1 {
                    return (name.to_string(), String::new());
                }
            }
        }
    }
    match line.trim_start().split_once(char::is_whitespace) {
        Some((name, rest)) => (name.to_string(), rest.to_string()),
        None => (line.trim().to_string(), String::new()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Body,
    Finished,
}

/// Turns PHYLIP lines into events.
pub struct PhylipEventProducer {
    source: Box<dyn BufRead>,
    format_id: &'static str,
    interleaved: bool,
    relaxed: bool,
    ids: IdManager,
    tokens: SequenceTokensEventManager,
    state: State,
    sequence_count: usize,
    character_count: usize,
    names: Vec<String>,
    block_row: usize,
    current_name: Option<String>,
    line_number: usize,
}

impl PhylipEventProducer {
    pub fn new(source: Box<dyn BufRead>, parameters: &ReadWriteParameters, interleaved: bool) -> Self {
        Self {
            source,
            format_id: if interleaved {
                ids::PHYLIP
            } else {
                ids::SEQUENTIAL_PHYLIP
            },
            interleaved,
            relaxed: parameters.relaxed_phylip,
            ids: IdManager::new(),
            tokens: SequenceTokensEventManager::new(parameters),
            state: State::Header,
            sequence_count: 0,
            character_count: 0,
            names: Vec::new(),
            block_row: 0,
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
        Ok(Some(line))
    }

    fn read_header(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        let header = loop {
            match self.read_line()? {
                None => return Err(PhylipError::EmptyFile.into()),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
            }
        };
        let parts: Vec<&str> = header.split_whitespace().collect();
        if parts.len() < 2 {
            return Err(PhylipError::InvalidHeader {
                line: self.line_number,
                content: header.trim().to_string(),
            }
            .into());
        }
        self.sequence_count = parts[0]
            .parse()
            .map_err(|_| PhylipError::InvalidSequenceCount(parts[0].to_string()))?;
        self.character_count = parts[1]
            .parse()
            .map_err(|_| PhylipError::InvalidSequenceLength(parts[1].to_string()))?;
        if self.sequence_count == 0 {
            return Err(PhylipError::InvalidSequenceCount("0".to_string()).into());
        }
        log::debug!(
            "PHYLIP header declares {} sequences of length {}",
            self.sequence_count,
            self.character_count
        );

        queue.push_back(Event::document_start());
        let matrix_id = self.ids.create_new_id(prefixes::MATRIX);
        queue.push_back(
            LinkedLabeledIdEvent::new(EventContentType::Alignment, matrix_id, None, None).into(),
        );
        self.state = State::Body;
        Ok(())
    }

    /// Emits a complete SEQUENCE element for one interleaved line.
    fn read_interleaved_line(&mut self, line: &str, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        let (name, data) = if self.names.len() < self.sequence_count {
            let (name, data) = split_name_and_sequence(line, self.relaxed);
            self.names.push(name.clone());
            (name, data)
        } else {
            let name = self.names[self.block_row % self.sequence_count].clone();
            self.block_row += 1;
            let trimmed = line.trim_start();
            let data = match trimmed.split_once(char::is_whitespace) {
                Some((first, rest)) if first == name => rest.to_string(),
                _ => trimmed.to_string(),
            };
            (name, data)
        };
        queue.push_back(self.tokens.start_event(&name, None, &mut self.ids));
        self.tokens
            .add_tokens_events(&name, character_tokens(&data), queue)?;
        queue.push_back(Event::end(EventContentType::Sequence));
        Ok(())
    }

    /// Continues or starts a sequential sequence with one line.
    fn read_sequential_line(&mut self, line: &str, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        let (name, data) = match self.current_name.take() {
            Some(name) => (name, line.to_string()),
            None => {
                if self.names.len() >= self.sequence_count {
                    log::warn!(
                        "Ignoring line {} after the {} declared sequences",
                        self.line_number,
                        self.sequence_count
                    );
                    return Ok(());
                }
                let (name, data) = split_name_and_sequence(line, self.relaxed);
                self.names.push(name.clone());
                queue.push_back(self.tokens.start_event(&name, None, &mut self.ids));
                (name, data)
            }
        };
        self.tokens
            .add_tokens_events(&name, character_tokens(&data), queue)?;
        if self.tokens.column(&name) >= self.character_count {
            queue.push_back(Event::end(EventContentType::Sequence));
        } else {
            self.current_name = Some(name);
        }
        Ok(())
    }
}

impl EventProducer for PhylipEventProducer {
    fn format_id(&self) -> &'static str {
        self.format_id
    }

    fn produce(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        match self.state {
            State::Header => return self.read_header(queue),
            State::Finished => return Ok(()),
            State::Body => {}
        }
        while queue.is_empty() {
            let Some(line) = self.read_line()? else {
                if let Some(name) = self.current_name.take() {
                    log::warn!(
                        "Sequence \"{}\" ended after {} of {} characters",
                        name,
                        self.tokens.column(&name),
                        self.character_count
                    );
                    queue.push_back(Event::end(EventContentType::Sequence));
                }
                if self.names.len() < self.sequence_count {
                    log::warn!(
                        "Expected {} sequences but found {}",
                        self.sequence_count,
                        self.names.len()
                    );
                }
                queue.push_back(Event::end(EventContentType::Alignment));
                queue.push_back(Event::end(EventContentType::Document));
                self.state = State::Finished;
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }
            if self.interleaved {
                self.read_interleaved_line(&line, queue)?;
            } else {
                self.read_sequential_line(&line, queue)?;
            }
        }
        Ok(())
    }
}

/// Reader for PHYLIP sources.
pub type PhylipEventReader = EventStream<PhylipEventProducer>;

pub fn phylip_reader(
    source: Box<dyn BufRead>,
    parameters: &ReadWriteParameters,
    interleaved: bool,
) -> PhylipEventReader {
    EventStream::new(PhylipEventProducer::new(source, parameters, interleaved))
}

/// Formats `label` for the PHYLIP name column. Shortened names that collide with
/// an earlier name get a numeric suffix.
fn phylip_name(label: &str, limit: Option<usize>, used: &mut HashSet<String>) -> String {
    let Some(limit) = limit else {
        let name: String = label
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        used.insert(name.clone());
        return format!("{} ", name);
    };
    let mut name: String = label.chars().take(limit).collect();
    let mut counter = 1usize;
    while used.contains(&name) {
        let suffix = counter.to_string();
        let keep = limit.saturating_sub(suffix.len());
        name = label.chars().take(keep).collect::<String>() + &suffix;
        counter += 1;
    }
    used.insert(name.clone());
    format!("{:<width$}", name, width = limit)
}

/// Writer for PHYLIP output. Each sequence is written on one line, which both
/// PHYLIP readers accept.
#[derive(Debug, Clone, Copy)]
pub struct PhylipEventWriter {
    format_id: &'static str,
}

impl PhylipEventWriter {
    pub fn interleaved() -> Self {
        Self {
            format_id: ids::PHYLIP,
        }
    }

    pub fn sequential() -> Self {
        Self {
            format_id: ids::SEQUENTIAL_PHYLIP,
        }
    }
}

impl EventWriter for PhylipEventWriter {
    fn format_id(&self) -> &'static str {
        self.format_id
    }

    fn write_document(
        &self,
        document: &dyn DocumentDataAdapter,
        output: &mut dyn Write,
        parameters: &ReadWriteParameters,
    ) -> WriteResult<WriteReport> {
        let mut report = WriteReport::default();
        let Some(matrix) = single_matrix(document, "PHYLIP", &mut report) else {
            return Ok(report);
        };
        if matrix.contains_long_tokens() {
            report.warn("The matrix contains tokens longer than one character which PHYLIP cannot separate");
        }

        let sequences = matrix.sequences();
        let mut rows = Vec::new();
        for id in sequences.id_iterator() {
            let start = sequences.object_start_event(&id)?;
            let label = object_label(document, &id, start.label.as_deref(), start.linked_id.as_deref());
            let (tokens, ignored) = collect_sequence_tokens(matrix, &id)?;
            report.ignored.add(ignored);
            rows.push((label, tokens));
        }
        let length = match matrix.column_count() {
            Some(length) => length as usize,
            None => rows.iter().map(|(_, tokens)| tokens.len()).max().unwrap_or(0),
        };

        writeln!(output, "{} {}", rows.len(), length)?;
        let limit = parameters.phylip_name_length();
        let mut used = HashSet::new();
        for (label, tokens) in rows {
            let name = phylip_name(&label, limit, &mut used);
            if limit.map_or(false, |limit| label.chars().count() > limit) {
                report.warn(format!(
                    "The name \"{}\" was shortened to \"{}\"",
                    label,
                    name.trim_end()
                ));
            }
            output.write_all(name.as_bytes())?;
            for token in &tokens {
                output.write_all(token.as_bytes())?;
            }
            if tokens.len() < length {
                report.warn(format!(
                    "The sequence \"{}\" was padded with {} missing data tokens",
                    label,
                    length - tokens.len()
                ));
                output.write_all("?".repeat(length - tokens.len()).as_bytes())?;
            }
            writeln!(output)?;
        }
        report.log_ignored("PHYLIP");
        Ok(report)
    }
}

/// Registry entry for one of the two PHYLIP variants.
#[derive(Debug, Clone, Copy)]
pub struct PhylipFactory {
    interleaved: bool,
}

impl PhylipFactory {
    pub fn interleaved() -> Self {
        Self { interleaved: true }
    }

    pub fn sequential() -> Self {
        Self { interleaved: false }
    }
}

impl FormatFactory for PhylipFactory {
    fn info(&self) -> &'static FormatInfo {
        if self.interleaved {
            &PHYLIP_INFO
        } else {
            &SEQUENTIAL_PHYLIP_INFO
        }
    }

    fn reader(
        &self,
        source: Box<dyn BufRead>,
        parameters: &ReadWriteParameters,
    ) -> Box<dyn EventReader> {
        Box::new(phylip_reader(source, parameters, self.interleaved))
    }

    fn writer(&self) -> Option<Box<dyn EventWriter>> {
        Some(Box::new(if self.interleaved {
            PhylipEventWriter::interleaved()
        } else {
            PhylipEventWriter::sequential()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadError;
    use crate::formats::FormatError;
    use crate::reader::events;
    use crate::store::DocumentStore;
    use crate::writer::adapters::MatrixDataAdapter;
    use crate::writer::write_document_to_string;
    use std::io::Cursor;

    fn read_sequences(
        content: &str,
        parameters: &ReadWriteParameters,
        interleaved: bool,
    ) -> ReadResult<Vec<(String, String)>> {
        let mut reader = phylip_reader(
            Box::new(Cursor::new(content.as_bytes().to_vec())),
            parameters,
            interleaved,
        );
        let document = DocumentStore::read(&mut reader)?;
        let matrix = document.matrices().next().expect("matrix");
        let mut result = Vec::new();
        for id in matrix.sequences().id_iterator() {
            let label = matrix.sequences().object_start_event(&id).unwrap().label.unwrap();
            let (tokens, _) = collect_sequence_tokens(matrix, &id).unwrap();
            result.push((label, tokens.concat()));
        }
        Ok(result)
    }

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|(name, seq)| (name.to_string(), seq.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_sequential_simple() {
        let content = " 3 10
Seq1      ACGTACGTAC
Seq2      TGCATGCATG
Seq3      AAAACCCCGG
";
        let sequences = read_sequences(content, &ReadWriteParameters::default(), false).unwrap();
        assert_eq!(
            sequences,
            pairs(&[
                ("Seq1", "ACGTACGTAC"),
                ("Seq2", "TGCATGCATG"),
                ("Seq3", "AAAACCCCGG")
            ])
        );
    }

    #[test]
    fn test_parse_sequential_multiline() {
        let content = " 2 20
Seq1      ACGTACGTAC
GGGGGGGGGG
Seq2      TGCATGCATG
CCCCCCCCCC
";
        let sequences = read_sequences(content, &ReadWriteParameters::default(), false).unwrap();
        assert_eq!(
            sequences,
            pairs(&[
                ("Seq1", "ACGTACGTACGGGGGGGGGG"),
                ("Seq2", "TGCATGCATGCCCCCCCCCC")
            ])
        );
    }

    #[test]
    fn test_parse_interleaved() {
        let content = " 3 20
Seq1      ACGTACGTAC
Seq2      TGCATGCATG
Seq3      AAAACCCCGG

GGGGGGGGGG
CCCCCCCCCC
TTTTTTTTTT
";
        let sequences = read_sequences(content, &ReadWriteParameters::default(), true).unwrap();
        assert_eq!(
            sequences,
            pairs(&[
                ("Seq1", "ACGTACGTACGGGGGGGGGG"),
                ("Seq2", "TGCATGCATGCCCCCCCCCC"),
                ("Seq3", "AAAACCCCGGTTTTTTTTTT")
            ])
        );
    }

    #[test]
    fn test_interleaved_blocks_reuse_sequence_ids() {
        let content = "2 4\nA         AC\nB         GT\n\nAC\nGT\n";
        let mut reader = phylip_reader(
            Box::new(Cursor::new(content.as_bytes().to_vec())),
            &ReadWriteParameters::default(),
            true,
        );
        let starts: Vec<String> = events(&mut reader)
            .filter_map(|event| match event.unwrap() {
                Event::LinkedLabeledId(e) if e.content_type == EventContentType::Sequence => Some(e.id),
                _ => None,
            })
            .collect();
        assert_eq!(starts.len(), 4);
        assert_eq!(starts[0], starts[2]);
        assert_eq!(starts[1], starts[3]);
        assert_ne!(starts[0], starts[1]);
    }

    #[test]
    fn test_parse_relaxed_names() {
        let content = "3 10
sequence_one ACGTACGTAC
seq2 TGCATGCATG
seq3 AAAACCCCGG
";
        let params = ReadWriteParameters::new().with_relaxed_phylip(true);
        let sequences = read_sequences(content, &params, false).unwrap();
        assert_eq!(sequences[0], ("sequence_one".to_string(), "ACGTACGTAC".to_string()));

        // Several words in the name column fall back to whitespace splitting.
        let sequences = read_sequences(content, &ReadWriteParameters::default(), true).unwrap();
        assert_eq!(sequences[1], ("seq2".to_string(), "TGCATGCATG".to_string()));
    }

    #[test]
    fn test_parse_with_gaps() {
        let content = " 2 10
Seq1      ACGT--GTAC
Seq2      TG--TGCATG
";
        let sequences = read_sequences(content, &ReadWriteParameters::default(), false).unwrap();
        assert_eq!(sequences[0].1, "ACGT--GTAC");
        assert_eq!(sequences[1].1, "TG--TGCATG");
    }

    #[test]
    fn test_empty_file() {
        let result = read_sequences("", &ReadWriteParameters::default(), true);
        assert!(matches!(
            result,
            Err(ReadError::Format(FormatError::Phylip(PhylipError::EmptyFile)))
        ));
    }

    #[test]
    fn test_invalid_header() {
        let result = read_sequences("not a valid header\nSeq1 ACGT\n", &ReadWriteParameters::default(), true);
        assert!(result.is_err());

        let result = read_sequences("invalid\nSeq1 ACGT\n", &ReadWriteParameters::default(), true);
        assert!(matches!(
            result,
            Err(ReadError::Format(FormatError::Phylip(PhylipError::InvalidHeader { .. })))
        ));
    }

    #[test]
    fn test_too_few_sequences() {
        let content = " 3 10
Seq1      ACGTACGTAC
Seq2      TGCATGCATG
";
        let sequences = read_sequences(content, &ReadWriteParameters::default(), false).unwrap();
        assert_eq!(sequences.len(), 2);
    }

    #[test]
    fn test_write_strict_names() {
        let content = "2 4\nlong_sequence_name ACGT\nlong_sequence_other TTTT\n";
        let params = ReadWriteParameters::new().with_relaxed_phylip(true);
        let mut reader = phylip_reader(Box::new(Cursor::new(content.as_bytes().to_vec())), &params, false);
        let document = DocumentStore::read(&mut reader).unwrap();
        assert_eq!(document.matrices().next().unwrap().column_count(), Some(4));

        let (text, report) = write_document_to_string(
            &PhylipEventWriter::sequential(),
            &document,
            &ReadWriteParameters::default(),
        )
        .unwrap();
        assert_eq!(text, "2 4\nlong_sequeACGT\nlong_sequ1TTTT\n");
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_write_relaxed_names_round_trip() {
        let content = "2 4\nalpha ACGT\nbeta TT-A\n";
        let params = ReadWriteParameters::new().with_relaxed_phylip(true);
        let mut reader = phylip_reader(Box::new(Cursor::new(content.as_bytes().to_vec())), &params, true);
        let document = DocumentStore::read(&mut reader).unwrap();
        let (text, _) = write_document_to_string(&PhylipEventWriter::interleaved(), &document, &params).unwrap();
        assert_eq!(text, "2 4\nalpha ACGT\nbeta TT-A\n");
    }
}

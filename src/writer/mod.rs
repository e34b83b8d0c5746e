//! Streaming writers and the receivers they use.
//!
//! A writer walks a [`DocumentDataAdapter`] once, in document order, and writes
//! the target format as it goes. Object contents arrive as events that the adapter
//! pushes into an [`EventReceiver`] supplied by the writer.

pub mod adapters;
pub mod receiver;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::WriteResult;
use crate::events::Event;
use crate::parameters::ReadWriteParameters;

use adapters::{DocumentDataAdapter, MatrixDataAdapter};

/// Accepts the events of one object's content.
pub trait EventReceiver {
    /// Handles `event`. Returns `false` if the receiver does not want further
    /// events.
    fn add(&mut self, event: Event) -> WriteResult<bool>;
}

/// Numbers of elements a writer could not represent and skipped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IgnoredCounts {
    pub comments: u64,
    pub literal_metadata: u64,
    pub resource_metadata: u64,
}

impl IgnoredCounts {
    pub fn add(&mut self, other: IgnoredCounts) {
        self.comments += other.comments;
        self.literal_metadata += other.literal_metadata;
        self.resource_metadata += other.resource_metadata;
    }

    pub fn total(&self) -> u64 {
        self.comments + self.literal_metadata + self.resource_metadata
    }
}

/// Outcome of writing a document: skipped content and warnings.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub ignored: IgnoredCounts,
    pub warnings: Vec<String>,
}

impl WriteReport {
    /// Records a warning and logs it.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Logs a summary of ignored elements, if any.
    pub fn log_ignored(&self, format_name: &str) {
        if self.ignored.comments > 0 {
            log::warn!(
                "{} comment(s) could not be written to {}",
                self.ignored.comments,
                format_name
            );
        }
        if self.ignored.literal_metadata > 0 || self.ignored.resource_metadata > 0 {
            log::warn!(
                "{} literal and {} resource metadata element(s) could not be written to {}",
                self.ignored.literal_metadata,
                self.ignored.resource_metadata,
                format_name
            );
        }
    }
}

/// A format writer.
pub trait EventWriter {
    fn format_id(&self) -> &'static str;

    fn write_document(
        &self,
        document: &dyn DocumentDataAdapter,
        output: &mut dyn Write,
        parameters: &ReadWriteParameters,
    ) -> WriteResult<WriteReport>;
}

/// Writes `document` to a file at `path`.
pub fn write_document_to_path<P: AsRef<Path>>(
    writer: &dyn EventWriter,
    document: &dyn DocumentDataAdapter,
    path: P,
    parameters: &ReadWriteParameters,
) -> WriteResult<WriteReport> {
    let file = File::create(path.as_ref())?;
    let mut output = BufWriter::new(file);
    let report = writer.write_document(document, &mut output, parameters)?;
    output.flush()?;
    Ok(report)
}

/// Writes `document` into a string.
pub fn write_document_to_string(
    writer: &dyn EventWriter,
    document: &dyn DocumentDataAdapter,
    parameters: &ReadWriteParameters,
) -> WriteResult<(String, WriteReport)> {
    let mut output = Vec::new();
    let report = writer.write_document(document, &mut output, parameters)?;
    let text = String::from_utf8(output).map_err(|err| {
        crate::error::WriteError::InconsistentAdapterData(format!(
            "The written text is not valid UTF-8: {}",
            err
        ))
    })?;
    Ok((text, report))
}

/// Selects the matrix written by formats that hold a single alignment and records
/// warnings for everything else in the document.
pub fn single_matrix<'d>(
    document: &'d dyn DocumentDataAdapter,
    format_name: &str,
    report: &mut WriteReport,
) -> Option<&'d dyn MatrixDataAdapter> {
    if document.otu_list_count() > 0 {
        log::info!(
            "OTU lists are not written to {}; sequence names are used instead",
            format_name
        );
    }
    if document.tree_network_groups().next().is_some() {
        report.warn(format!(
            "The document contains trees or networks which are not supported by {} and were not written",
            format_name
        ));
    }
    let mut matrices = document.matrices();
    let matrix = matrices.next();
    match matrix {
        None => report.warn(format!(
            "The document contains no matrix. An empty {} file was written",
            format_name
        )),
        Some(matrix) => {
            if matrix.sequences().count() == 0 {
                report.warn(format!(
                    "The matrix contains no sequences. An empty {} file was written",
                    format_name
                ));
            }
            if matrices.next().is_some() {
                report.warn(format!(
                    "The document contains more than one matrix. Only the first one was written to {}",
                    format_name
                ));
            }
        }
    }
    matrix
}

/// Collects the tokens of one sequence's content.
#[derive(Debug, Default)]
pub struct TokenCollector {
    pub tokens: Vec<String>,
}

impl receiver::ReceiverHooks for TokenCollector {
    fn do_add(&mut self, state: &mut receiver::ReceiverState, event: Event) -> WriteResult<bool> {
        match event {
            Event::SequenceTokens(tokens) => self.tokens.extend(tokens.tokens),
            Event::SingleSequenceToken(token) => self.tokens.push(token.token),
            Event::End(crate::events::EventContentType::SingleSequenceToken) => {}
            Event::UnknownCommand(_) => {}
            other => return Err(state.illegal(&other)),
        }
        Ok(true)
    }
}

/// Tokens of sequence `id` of `matrix`, plus the ignored content counts.
pub fn collect_sequence_tokens(
    matrix: &dyn MatrixDataAdapter,
    id: &str,
) -> WriteResult<(Vec<String>, IgnoredCounts)> {
    let mut receiver = receiver::BasicEventReceiver::new(TokenCollector::default());
    matrix.sequences().write_content_data(&mut receiver, id)?;
    let (collector, ignored) = receiver.finish()?;
    Ok((collector.tokens, ignored))
}

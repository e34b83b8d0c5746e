//! Supported file formats and the registry that creates their readers and
//! writers.
//!
//! | ID                  | Reader | Writer | Extensions                 |
//! |---------------------|--------|--------|----------------------------|
//! | `fasta`             | yes    | yes    | .fasta .fa .fas .fna .faa  |
//! | `phylip`            | yes    | yes    | .phy .phylip               |
//! | `sequential-phylip` | yes    | yes    |                            |
//! | `mega`              | yes    | no     | .meg .mega                 |
//! | `newick`            | yes    | yes    | .nwk .newick .tre .tree    |
//! | `nexus`             | yes    | no     | .nex .nexus .nxs           |
//!
//! Formats are chosen explicitly by ID or from the file extension; the content is
//! never used to guess a format.

pub mod fasta;
pub mod mega;
pub mod newick;
pub mod nexus;
pub mod phylip;

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::error::{ReadError, ReadResult};
use crate::events::EventContentType;
use crate::parameters::ReadWriteParameters;
use crate::reader::text::TextError;
use crate::reader::EventReader;
use crate::writer::EventWriter;

/// Format IDs.
pub mod ids {
    pub const FASTA: &str = "fasta";
    pub const PHYLIP: &str = "phylip";
    pub const SEQUENTIAL_PHYLIP: &str = "sequential-phylip";
    pub const MEGA: &str = "mega";
    pub const NEWICK: &str = "newick";
    pub const NEXUS: &str = "nexus";
}

/// Syntax errors of the format readers.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("FASTA error: {0}")]
    Fasta(#[from] fasta::FastaError),

    #[error("PHYLIP error: {0}")]
    Phylip(#[from] phylip::PhylipError),

    #[error("MEGA error: {0}")]
    Mega(#[from] mega::MegaError),

    #[error("Newick error: {0}")]
    Newick(#[from] newick::NewickError),

    #[error("NEXUS error: {0}")]
    Nexus(#[from] nexus::NexusError),

    #[error("Syntax error: {0}")]
    Text(#[from] TextError),
}

macro_rules! impl_read_error_from {
    ($($error:ty),* $(,)?) => {
        $(
            impl From<$error> for ReadError {
                fn from(err: $error) -> Self {
                    ReadError::Format(err.into())
                }
            }
        )*
    };
}

impl_read_error_from!(
    fasta::FastaError,
    phylip::PhylipError,
    mega::MegaError,
    newick::NewickError,
    nexus::NexusError,
    TextError,
);

/// How much of a metadata tree a format can represent below an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataModeling {
    None,
    LiteralOnly,
    LimitedTree,
    FullTree,
}

/// Capabilities of a format.
#[derive(Debug, Clone)]
pub struct FormatInfo {
    pub format_id: &'static str,
    pub format_name: &'static str,
    pub extensions: &'static [&'static str],
    pub reader_elements: &'static [EventContentType],
    pub writer_elements: &'static [EventContentType],
    pub reader_metadata: &'static [(EventContentType, MetadataModeling)],
    pub writer_metadata: &'static [(EventContentType, MetadataModeling)],
    pub reader_parameters: &'static [&'static str],
    pub writer_parameters: &'static [&'static str],
}

impl FormatInfo {
    pub fn is_element_modeled(&self, content_type: EventContentType, for_reading: bool) -> bool {
        let elements = if for_reading {
            self.reader_elements
        } else {
            self.writer_elements
        };
        elements.contains(&content_type)
    }

    /// Metadata support below elements of type `parent`.
    pub fn metadata_modeling(&self, parent: EventContentType, for_reading: bool) -> MetadataModeling {
        let modeling = if for_reading {
            self.reader_metadata
        } else {
            self.writer_metadata
        };
        modeling
            .iter()
            .find(|(content_type, _)| *content_type == parent)
            .map(|(_, modeling)| *modeling)
            .unwrap_or(MetadataModeling::None)
    }

    pub fn is_metadata_modeled(&self, parent: EventContentType, for_reading: bool) -> bool {
        self.metadata_modeling(parent, for_reading) != MetadataModeling::None
    }

    pub fn is_parameter_supported(&self, name: &str, for_reading: bool) -> bool {
        let parameters = if for_reading {
            self.reader_parameters
        } else {
            self.writer_parameters
        };
        parameters.contains(&name)
    }

    pub fn has_writer(&self) -> bool {
        !self.writer_elements.is_empty()
    }
}

/// Creates the reader and writer of one format.
pub trait FormatFactory {
    fn info(&self) -> &'static FormatInfo;

    fn reader(
        &self,
        source: Box<dyn BufRead>,
        parameters: &ReadWriteParameters,
    ) -> Box<dyn EventReader>;

    fn writer(&self) -> Option<Box<dyn EventWriter>> {
        None
    }
}

/// Registry of formats by ID.
pub struct ReaderWriterFactory {
    formats: BTreeMap<&'static str, Box<dyn FormatFactory>>,
}

impl ReaderWriterFactory {
    /// A registry without formats.
    pub fn new() -> Self {
        Self {
            formats: BTreeMap::new(),
        }
    }

    /// A registry with all formats of this crate.
    pub fn with_default_formats() -> Self {
        let mut factory = Self::new();
        factory.register(Box::new(fasta::FastaFactory));
        factory.register(Box::new(phylip::PhylipFactory::interleaved()));
        factory.register(Box::new(phylip::PhylipFactory::sequential()));
        factory.register(Box::new(mega::MegaFactory));
        factory.register(Box::new(newick::NewickFactory));
        factory.register(Box::new(nexus::NexusFactory));
        factory
    }

    /// Adds a format, replacing a registered format with the same ID.
    pub fn register(&mut self, format: Box<dyn FormatFactory>) {
        self.formats.insert(format.info().format_id, format);
    }

    pub fn format_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.formats.keys().copied()
    }

    pub fn format_info(&self, format_id: &str) -> Option<&'static FormatInfo> {
        self.formats.get(format_id).map(|format| format.info())
    }

    pub fn reader(
        &self,
        format_id: &str,
        source: Box<dyn BufRead>,
        parameters: &ReadWriteParameters,
    ) -> Option<Box<dyn EventReader>> {
        let format = self.formats.get(format_id)?;
        Some(format.reader(source, parameters))
    }

    /// Opens `path` and creates a reader of the given format for it.
    pub fn reader_for_path<P: AsRef<Path>>(
        &self,
        format_id: &str,
        path: P,
        parameters: &ReadWriteParameters,
    ) -> ReadResult<Option<Box<dyn EventReader>>> {
        let Some(format) = self.formats.get(format_id) else {
            return Ok(None);
        };
        let file = File::open(path.as_ref())?;
        let source = BufReader::with_capacity(1024 * 1024, file);
        Ok(Some(format.reader(Box::new(source), parameters)))
    }

    pub fn writer(&self, format_id: &str) -> Option<Box<dyn EventWriter>> {
        self.formats.get(format_id)?.writer()
    }

    /// ID of the first registered format claiming the extension of `path`.
    pub fn format_for_extension<P: AsRef<Path>>(&self, path: P) -> Option<&'static str> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(OsStr::to_str)?
            .to_lowercase();
        self.formats
            .values()
            .map(|format| format.info())
            .find(|info| info.extensions.contains(&extension.as_str()))
            .map(|info| info.format_id)
    }
}

impl Default for ReaderWriterFactory {
    fn default() -> Self {
        Self::with_default_formats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::names;

    #[test]
    fn test_default_formats_are_registered() {
        let factory = ReaderWriterFactory::with_default_formats();
        let ids: Vec<&str> = factory.format_ids().collect();
        assert_eq!(
            ids,
            vec!["fasta", "mega", "newick", "nexus", "phylip", "sequential-phylip"]
        );
        assert!(factory.writer(ids::FASTA).is_some());
        assert!(factory.writer(ids::NEWICK).is_some());
        assert!(factory.writer(ids::MEGA).is_none());
        assert!(factory.writer("nexml").is_none());
    }

    #[test]
    fn test_extension_lookup() {
        let factory = ReaderWriterFactory::default();
        assert_eq!(factory.format_for_extension("seqs.FASTA"), Some(ids::FASTA));
        assert_eq!(factory.format_for_extension("dir/data.nex"), Some(ids::NEXUS));
        assert_eq!(factory.format_for_extension("HLA.meg"), Some(ids::MEGA));
        assert_eq!(factory.format_for_extension("trees.tre"), Some(ids::NEWICK));
        assert_eq!(factory.format_for_extension("aln.phy"), Some(ids::PHYLIP));
        assert_eq!(factory.format_for_extension("notes.txt"), None);
        assert_eq!(factory.format_for_extension("no_extension"), None);
    }

    #[test]
    fn test_format_info_queries() {
        let factory = ReaderWriterFactory::default();
        let fasta = factory.format_info(ids::FASTA).unwrap();
        assert!(fasta.is_element_modeled(EventContentType::Sequence, true));
        assert!(!fasta.is_element_modeled(EventContentType::Tree, true));
        assert!(fasta.is_parameter_supported(names::LINE_LENGTH, false));
        assert!(!fasta.is_parameter_supported(names::LINE_LENGTH, true));

        let newick = factory.format_info(ids::NEWICK).unwrap();
        assert_eq!(
            newick.metadata_modeling(EventContentType::Node, true),
            MetadataModeling::LiteralOnly
        );
        assert!(!newick.is_metadata_modeled(EventContentType::Document, true));

        let mega = factory.format_info(ids::MEGA).unwrap();
        assert!(!mega.has_writer());
    }

    #[test]
    fn test_reader_from_registry() {
        let factory = ReaderWriterFactory::default();
        let source = Box::new(std::io::Cursor::new(b">a\nACGT\n".to_vec()));
        let mut reader = factory
            .reader(ids::FASTA, source, &ReadWriteParameters::default())
            .unwrap();
        assert_eq!(reader.format_id(), ids::FASTA);
        assert!(reader.has_next_event().unwrap());
        assert!(factory
            .reader("nexml", Box::new(std::io::empty()), &ReadWriteParameters::default())
            .is_none());
    }
}

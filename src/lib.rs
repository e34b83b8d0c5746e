//! # phylostream - Event-based phylogenetic file formats
//!
//! Reads and writes phylogenetic documents (OTU lists, alignments, trees and
//! their metadata) as a stream of events.
//!
//! ## Architecture
//!
//! - `events`: The event model. Every element is a START/END pair or a SOLE event.
//! - `parent`: Stack of open elements used to validate nesting.
//! - `reader`: The pull reader contract, lookahead and subtree skipping.
//! - `labels`: Translation tables and node label resolution for tree formats.
//! - `writer`: Data adapters, event receivers and the single-pass writer contract.
//! - `store`: Adapters holding a whole document read from any reader.
//! - `formats`: FASTA, PHYLIP, MEGA, Newick and NEXUS, and the format factory.
//!
//! ## Example
//!
//! ```no_run
//! use phylostream::formats::{ids, ReaderWriterFactory};
//! use phylostream::parameters::ReadWriteParameters;
//! use phylostream::reader::EventReader;
//!
//! let factory = ReaderWriterFactory::default();
//! let parameters = ReadWriteParameters::default();
//! let mut reader = factory
//!     .reader_for_path(ids::NEXUS, "data/trees.nex", &parameters)?
//!     .expect("NEXUS is registered");
//! while reader.has_next_event()? {
//!     println!("{:?}", reader.next_event()?.event_type());
//! }
//! # Ok::<(), phylostream::error::ReadError>(())
//! ```

pub mod error;
pub mod events;
pub mod formats;
pub mod ids;
pub mod labels;
pub mod objecttranslation;
pub mod parameters;
pub mod parent;
pub mod reader;
pub mod store;
pub mod writer;

pub use error::{ReadError, ReadResult, SourceLocation, WriteError, WriteResult};
pub use events::{Event, EventContentType, EventTopologyType, EventType};
pub use formats::{FormatFactory, FormatInfo, ReaderWriterFactory};
pub use parameters::ReadWriteParameters;
pub use reader::EventReader;
pub use store::DocumentStore;
pub use writer::{EventWriter, WriteReport};

//! phylostream - Converts between phylogenetic file formats
//!
//! ## Usage
//!
//! ```bash
//! phylostream alignment.fasta -t phylip -o alignment.phy
//! phylostream -f nexus data.nex --events      # Print the event stream
//! phylostream --list-formats
//! ```
//!
//! Input formats are taken from `-f/--from` or from the file extension. The
//! output format defaults to the input format if it has a writer.

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser};
use log::LevelFilter;

use phylostream::events::Event;
use phylostream::formats::ReaderWriterFactory;
use phylostream::parameters::{ReadWriteParameters, DEFAULT_LINE_LENGTH, DEFAULT_MATCH_TOKEN};
use phylostream::reader::{events, EventReader};
use phylostream::store::DocumentStore;
use phylostream::writer::write_document_to_path;

/// phylostream - Reads and converts phylogenetic file formats
///
/// Reads FASTA, PHYLIP, MEGA, Newick and NEXUS files and writes FASTA, PHYLIP
/// and Newick.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file
    #[arg(required_unless_present = "list_formats")]
    input: Option<PathBuf>,

    /// Input format ID (default: from the file extension)
    #[arg(short = 'f', long = "from")]
    from: Option<String>,

    /// Output format ID (default: the input format)
    #[arg(short = 't', long = "to")]
    to: Option<String>,

    /// Output file. Use "-" for stdout.
    #[arg(short = 'o', long = "output", default_value = "-")]
    output: String,

    /// Print one line per event instead of converting
    #[arg(long)]
    events: bool,

    /// Replace match tokens by the token of the first sequence
    #[arg(long = "match-token-replacement")]
    replace_match_tokens: bool,

    /// Match token used when no format specific one is declared
    #[arg(long, default_value = DEFAULT_MATCH_TOKEN)]
    match_token: String,

    /// Read and write PHYLIP names delimited by whitespace instead of 10 columns
    #[arg(long)]
    relaxed_phylip: bool,

    /// Line length of written sequences
    #[arg(long, default_value_t = DEFAULT_LINE_LENGTH)]
    line_length: usize,

    /// Do not write comments
    #[arg(long)]
    ignore_comments: bool,

    /// Do not report unknown NEXUS commands as events
    #[arg(long)]
    skip_unknown_commands: bool,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// List the supported formats and exit
    #[arg(long)]
    list_formats: bool,
}

impl Args {
    fn parameters(&self) -> ReadWriteParameters {
        ReadWriteParameters::new()
            .with_replace_match_tokens(self.replace_match_tokens)
            .with_match_token(self.match_token.clone())
            .with_relaxed_phylip(self.relaxed_phylip)
            .with_line_length(self.line_length)
            .with_ignore_comments(self.ignore_comments)
            .with_create_unknown_command_events(!self.skip_unknown_commands)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn list_formats(factory: &ReaderWriterFactory) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for id in factory.format_ids() {
        if let Some(info) = factory.format_info(id) {
            let extensions: Vec<String> = info.extensions.iter().map(|e| format!(".{}", e)).collect();
            writeln!(
                out,
                "{:<18} {:<8} {:<6} {}",
                id,
                info.format_name,
                if info.has_writer() { "rw" } else { "r" },
                extensions.join(" ")
            )?;
        }
    }
    Ok(())
}

/// One line describing an event.
fn describe_event(event: &Event) -> String {
    let mut line = event.event_type().to_string();
    if let Some(id) = event.id() {
        line.push_str(&format!(" id={}", id));
    }
    if let Some(label) = event.label() {
        line.push_str(&format!(" label=\"{}\"", label));
    }
    match event {
        Event::LinkedLabeledId(e) => {
            if let Some(linked) = &e.linked_id {
                line.push_str(&format!(" linked={}", linked));
            }
        }
        Event::Edge(e) => {
            line.push_str(&format!(
                " {} -> {}",
                e.source_id.as_deref().unwrap_or("-"),
                e.target_id
            ));
            if let Some(length) = e.length {
                line.push_str(&format!(" length={}", length));
            }
        }
        Event::SequenceTokens(tokens) => line.push_str(&format!(" {}", tokens.tokens.join(""))),
        Event::CharacterSetInterval(interval) => {
            line.push_str(&format!(" [{}, {})", interval.start, interval.end))
        }
        Event::Comment(comment) => line.push_str(&format!(" \"{}\"", comment.content)),
        Event::UnknownCommand(command) => {
            line.push_str(&format!(" {} \"{}\"", command.command_name, command.content))
        }
        Event::LiteralMeta(meta) => line.push_str(&format!(" predicate={}", meta.predicate)),
        Event::LiteralMetaContent(content) => {
            if let Some(value) = content.string_value() {
                line.push_str(&format!(" \"{}\"", value));
            }
        }
        _ => {}
    }
    line
}

fn print_events(reader: &mut dyn EventReader) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut depth = 0usize;
    for event in events(reader) {
        let event = event?;
        if event.is_end() {
            depth = depth.saturating_sub(1);
        }
        writeln!(out, "{}{}", "  ".repeat(depth), describe_event(&event))?;
        if event.is_start() {
            depth += 1;
        }
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let factory = ReaderWriterFactory::with_default_formats();

    if args.list_formats {
        return list_formats(&factory);
    }
    let input = args
        .input
        .clone()
        .ok_or_else(|| anyhow!("No input file given"))?;

    let from = match &args.from {
        Some(format) => format.to_lowercase(),
        None => factory
            .format_for_extension(&input)
            .ok_or_else(|| {
                anyhow!(
                    "Cannot determine the format of {} from its extension, use -f/--from",
                    input.display()
                )
            })?
            .to_string(),
    };
    let parameters = args.parameters();
    let mut reader = factory
        .reader_for_path(&from, &input, &parameters)
        .with_context(|| format!("Cannot open {}", input.display()))?
        .ok_or_else(|| anyhow!("Unknown input format \"{}\"", from))?;

    if args.events {
        return print_events(reader.as_mut());
    }

    let to = args.to.as_deref().map(str::to_lowercase).unwrap_or_else(|| from.clone());
    let Some(writer) = factory.writer(&to) else {
        bail!("No writer available for the format \"{}\"", to);
    };
    let document = DocumentStore::read(reader.as_mut())
        .with_context(|| format!("Cannot read {}", input.display()))?;
    reader.close()?;

    let report = if args.output == "-" {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        let report = writer.write_document(&document, &mut out, &parameters)?;
        out.flush()?;
        report
    } else {
        let report = write_document_to_path(&*writer, &document, &args.output, &parameters)?;
        log::info!("Wrote {} to {}", to, args.output);
        report
    };
    if report.ignored.total() > 0 || !report.warnings.is_empty() {
        eprintln!(
            "{} warning(s), {} element(s) not representable in {}",
            report.warnings.len(),
            report.ignored.total(),
            to
        );
    }
    Ok(())
}

//! Writes the trees of a document as Newick strings.

use std::collections::HashMap;
use std::io::Write;

use crate::error::{WriteError, WriteResult};
use crate::events::{EdgeEvent, EventContentType, LinkedLabeledIdEvent, LiteralMetadataEvent};
use crate::formats::newick::reader::DISPLAY_TREE_ROOTED;
use crate::formats::newick::scanner::{
    is_free_name_char, FREE_NAME_BLANK, NAME_DELIMITER, SUBTREE_END, SUBTREE_START, TERMINAL_SYMBOL,
};
use crate::formats::ids;
use crate::parameters::ReadWriteParameters;
use crate::writer::adapters::{
    object_label, AnnotatedDataAdapter, DocumentDataAdapter, ObjectListDataAdapter,
    TreeNetworkDataAdapter, TreeNetworkGroupDataAdapter,
};
use crate::writer::receiver::{BasicEventReceiver, ReceiverHooks, ReceiverState};
use crate::writer::{EventWriter, IgnoredCounts, WriteReport};

/// Formats a node label for Newick. Labels that cannot be written as free names
/// are enclosed in `'`.
pub fn format_label(label: &str) -> String {
    let needs_quotes = label.is_empty()
        || label
            .chars()
            .any(|c| c == FREE_NAME_BLANK || (c != ' ' && !is_free_name_char(c)));
    if needs_quotes {
        let escaped = label.replace(NAME_DELIMITER, "''");
        format!("{}{}{}", NAME_DELIMITER, escaped, NAME_DELIMITER)
    } else {
        label.replace(' ', &FREE_NAME_BLANK.to_string())
    }
}

fn format_hot_comment_value(value: &str) -> String {
    let simple = !value.is_empty()
        && value
            .chars()
            .all(|c| !c.is_whitespace() && !matches!(c, ',' | '=' | '[' | ']' | '"' | '\'' | ':'));
    let list = value.starts_with('{') && value.ends_with('}') && !value.contains(['"', '[', ']']);
    if simple || list {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('"', "'"))
    }
}

/// Collects what a node, an edge or a tree carries into Newick.
#[derive(Debug, Default)]
struct NewickMetadataCollector {
    ignore_comments: bool,
    literals: Vec<(String, String)>,
    comments: Vec<String>,
}

impl NewickMetadataCollector {
    fn new(ignore_comments: bool) -> Self {
        Self {
            ignore_comments,
            ..Self::default()
        }
    }

    /// The collected content as `[&k=v,...]` followed by plain comments.
    fn render(&self) -> String {
        let mut text = String::new();
        if !self.literals.is_empty() {
            let entries: Vec<String> = self
                .literals
                .iter()
                .map(|(key, value)| format!("{}={}", key, format_hot_comment_value(value)))
                .collect();
            text.push_str(&format!("[&{}]", entries.join(",")));
        }
        for comment in &self.comments {
            text.push_str(&format!("[{}]", comment.replace(['[', ']'], "")));
        }
        text
    }
}

impl ReceiverHooks for NewickMetadataCollector {
    fn handle_literal_meta_start(
        &mut self,
        state: &mut ReceiverState,
        _event: &LiteralMetadataEvent,
    ) -> WriteResult<()> {
        if state.parents().contains(EventContentType::ResourceMeta) {
            state.ignored_mut().literal_metadata += 1;
        }
        Ok(())
    }

    fn handle_literal_meta_end(
        &mut self,
        state: &mut ReceiverState,
        event: &LiteralMetadataEvent,
        value: Option<String>,
    ) -> WriteResult<()> {
        if !state.parents().contains(EventContentType::ResourceMeta) {
            self.literals
                .push((event.predicate.key().into_owned(), value.unwrap_or_default()));
        }
        Ok(())
    }

    fn handle_comment(&mut self, _state: &mut ReceiverState, content: String) -> WriteResult<()> {
        if !self.ignore_comments {
            self.comments.push(content);
        }
        Ok(())
    }
}

fn collect<F>(ignore_comments: bool, write: F) -> WriteResult<(NewickMetadataCollector, IgnoredCounts)>
where
    F: FnOnce(&mut BasicEventReceiver<NewickMetadataCollector>) -> WriteResult<()>,
{
    let mut receiver = BasicEventReceiver::new(NewickMetadataCollector::new(ignore_comments));
    write(&mut receiver)?;
    receiver.finish()
}

struct NodeData {
    start: LinkedLabeledIdEvent,
    annotation: String,
}

struct EdgeData {
    start: EdgeEvent,
    annotation: String,
}

enum Step<'t> {
    Enter(&'t str, Option<&'t EdgeData>),
    Separator,
    Close(&'t str, Option<&'t EdgeData>),
}

/// Writes one tree as a single line. Trees whose nodes have several parents are
/// skipped with a warning.
fn write_tree(
    document: &dyn DocumentDataAdapter,
    tree: &dyn TreeNetworkDataAdapter,
    output: &mut dyn Write,
    parameters: &ReadWriteParameters,
    report: &mut WriteReport,
) -> WriteResult<()> {
    let ignore_comments = parameters.ignore_comments;
    let mut nodes = HashMap::new();
    let mut node_order = Vec::new();
    for id in tree.nodes().id_iterator() {
        let start = tree.nodes().object_start_event(&id)?;
        let (collector, ignored) = collect(ignore_comments, |receiver| {
            tree.nodes().write_content_data(receiver, &id)
        })?;
        report.ignored.add(ignored);
        node_order.push(id.clone());
        nodes.insert(
            id,
            NodeData {
                start,
                annotation: collector.render(),
            },
        );
    }

    let mut edges = Vec::new();
    for id in tree.edges().id_iterator() {
        let start = tree.edges().object_start_event(&id)?;
        let (collector, ignored) = collect(ignore_comments, |receiver| {
            tree.edges().write_content_data(receiver, &id)
        })?;
        report.ignored.add(ignored);
        if !nodes.contains_key(&start.target_id) {
            return Err(WriteError::InconsistentAdapterData(format!(
                "The edge \"{}\" points to the unknown node \"{}\"",
                start.id, start.target_id
            )));
        }
        edges.push(EdgeData {
            start,
            annotation: collector.render(),
        });
    }

    let mut children: HashMap<&str, Vec<&EdgeData>> = HashMap::new();
    let mut incoming: HashMap<&str, &EdgeData> = HashMap::new();
    let mut root_edge = None;
    for edge in &edges {
        match &edge.start.source_id {
            Some(source) => {
                if !nodes.contains_key(source) {
                    return Err(WriteError::InconsistentAdapterData(format!(
                        "The edge \"{}\" starts at the unknown node \"{}\"",
                        edge.start.id, source
                    )));
                }
                children.entry(source.as_str()).or_default().push(edge);
                if incoming.insert(edge.start.target_id.as_str(), edge).is_some() {
                    report.warn(format!(
                        "The node \"{}\" has more than one parent. The tree \"{}\" was not written",
                        edge.start.target_id,
                        tree.start_event().id
                    ));
                    return Ok(());
                }
            }
            None => root_edge = Some(edge),
        }
    }

    let roots: Vec<&str> = node_order
        .iter()
        .map(String::as_str)
        .filter(|id| !incoming.contains_key(id))
        .collect();
    let root = match root_edge {
        Some(edge) => edge.start.target_id.as_str(),
        None => match roots.first() {
            Some(root) => root,
            None => {
                report.warn(format!(
                    "The tree \"{}\" has no root and was not written",
                    tree.start_event().id
                ));
                return Ok(());
            }
        },
    };
    if roots.len() > 1 {
        report.warn(format!(
            "The tree \"{}\" has {} nodes without parent. Only the subtree of \"{}\" was written",
            tree.start_event().id,
            roots.len(),
            root
        ));
    }

    let (tree_metadata, ignored) = collect(true, |receiver| tree.write_metadata(receiver))?;
    report.ignored.add(ignored);
    let mut text = String::new();
    for (key, value) in &tree_metadata.literals {
        if key == DISPLAY_TREE_ROOTED {
            text.push_str(if value == "true" { "[&R] " } else { "[&U] " });
        } else {
            report.ignored.literal_metadata += 1;
        }
    }

    let mut stack = vec![Step::Enter(root, root_edge)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(node, edge) => match children.get(node) {
                Some(child_edges) if !child_edges.is_empty() => {
                    text.push(SUBTREE_START);
                    stack.push(Step::Close(node, edge));
                    for (index, child) in child_edges.iter().enumerate().rev() {
                        stack.push(Step::Enter(child.start.target_id.as_str(), Some(child)));
                        if index > 0 {
                            stack.push(Step::Separator);
                        }
                    }
                }
                _ => write_node(document, &nodes, node, edge, &mut text),
            },
            Step::Separator => text.push(','),
            Step::Close(node, edge) => {
                text.push(SUBTREE_END);
                write_node(document, &nodes, node, edge, &mut text);
            }
        }
    }
    text.push(TERMINAL_SYMBOL);
    writeln!(output, "{}", text)?;
    Ok(())
}

fn write_node(
    document: &dyn DocumentDataAdapter,
    nodes: &HashMap<String, NodeData>,
    id: &str,
    edge: Option<&EdgeData>,
    text: &mut String,
) {
    if let Some(node) = nodes.get(id) {
        let label = match (&node.start.label, &node.start.linked_id) {
            (Some(label), _) => Some(label.clone()),
            (None, Some(otu)) => {
                Some(object_label(document, id, None, Some(otu.as_str()))).filter(|label| label != id)
            }
            (None, None) => None,
        };
        if let Some(label) = label {
            text.push_str(&format_label(&label));
        }
        text.push_str(&node.annotation);
    }
    if let Some(edge) = edge {
        if let Some(length) = edge.start.length {
            text.push_str(&format!(":{}", length));
        }
        text.push_str(&edge.annotation);
    }
}

/// Writer for Newick output: one line per tree of all tree groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewickEventWriter;

impl EventWriter for NewickEventWriter {
    fn format_id(&self) -> &'static str {
        ids::NEWICK
    }

    fn write_document(
        &self,
        document: &dyn DocumentDataAdapter,
        output: &mut dyn Write,
        parameters: &ReadWriteParameters,
    ) -> WriteResult<WriteReport> {
        let mut report = WriteReport::default();
        if document.matrices().next().is_some() {
            report.warn("The document contains matrices which are not supported by Newick and were not written");
        }
        if document.otu_list_count() > 0 {
            log::info!("OTU lists are not written to Newick; node labels are used instead");
        }
        let mut written = 0usize;
        for group in document.tree_network_groups() {
            for tree in group.trees_and_networks() {
                if !tree.is_tree() {
                    report.warn(format!(
                        "The network \"{}\" cannot be written to Newick and was skipped",
                        tree.start_event().id
                    ));
                    continue;
                }
                write_tree(document, tree, output, parameters, &mut report)?;
                written += 1;
            }
        }
        if written == 0 {
            report.warn("The document contains no trees. An empty Newick file was written");
        }
        report.log_ignored("Newick");
        Ok(report)
    }
}

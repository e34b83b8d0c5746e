//! Turns Newick tree strings into node and edge events.
//!
//! For each tree the reader emits TREE START, then every node as soon as it is
//! complete (leaves when they are read, inner nodes after their closing `)`),
//! then the edges from an inner node to its children directly after that node,
//! and finally the ROOT_EDGE and TREE END.
//!
//! Comments before a branch length belong to the node, comments after it to the
//! edge. If there is no branch length but two hot comments follow a node, the
//! second one and everything after it belongs to the edge.

use std::collections::VecDeque;

use crate::error::ReadResult;
use crate::events::{
    EdgeEvent, Event, EventContentType, LabeledIdEvent, LinkedLabeledIdEvent,
    LiteralMetadataContentEvent, LiteralMetadataEvent, ObjectValue,
};
use crate::formats::newick::scanner::{NewickScanner, NewickToken, NewickTokenKind};
use crate::formats::newick::NewickError;
use crate::ids::{prefixes, IdManager};
use crate::labels::NodeLabelProcessor;
use crate::objecttranslation::{DoubleTranslator, ObjectTranslator};
use crate::reader::text::{comment_events, PeekReader};

pub const HOT_COMMENT_START: char = '&';
pub const ALLOCATION_SEPARATOR: char = ',';
pub const ALLOCATION_SYMBOL: char = '=';
pub const FIELD_START: char = '{';
pub const FIELD_END: char = '}';
pub const NHX_START: &str = "&&NHX:";
pub const NHX_VALUE_SEPARATOR: char = ':';
pub const NHX_KEY_PREFIX: &str = "NHX:";
pub const ROOTED_HOT_COMMENT: &str = "&R";
pub const UNROOTED_HOT_COMMENT: &str = "&U";

/// Predicate of the literal metadata carrying `[&R]` or `[&U]`.
pub const DISPLAY_TREE_ROOTED: &str = "displayTreeRooted";

fn is_hot_comment(text: &str) -> bool {
    text.trim_start().starts_with(HOT_COMMENT_START)
}

/// Splits at `separator` outside of `{...}` and quotes.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (index, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, FIELD_START) => depth += 1,
            (None, FIELD_END) => depth = depth.saturating_sub(1),
            (None, c) if c == separator && depth == 0 => {
                parts.push(&text[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn unquote(text: &str) -> Option<&str> {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return Some(&text[1..text.len() - 1]);
        }
    }
    None
}

fn parse_value(raw: &str) -> ObjectValue {
    let raw = raw.trim();
    if let Some(text) = unquote(raw) {
        return ObjectValue::String(text.to_string());
    }
    if let Some(fields) = raw
        .strip_prefix(FIELD_START)
        .and_then(|rest| rest.strip_suffix(FIELD_END))
    {
        return ObjectValue::List(
            split_top_level(fields, ALLOCATION_SEPARATOR)
                .into_iter()
                .map(parse_value)
                .collect(),
        );
    }
    match DoubleTranslator::default().representation_to_object(raw) {
        Ok(value) => value,
        Err(_) => ObjectValue::String(raw.to_string()),
    }
}

/// Parses `[&key=value,...]` (or NHX `[&&NHX:key=value:...]`) comment text into
/// `(key, value)` pairs. Returns `None` if the text is not a valid hot comment.
pub fn parse_hot_comment(text: &str) -> Option<Vec<(String, String)>> {
    let text = text.trim();
    let (entries, key_prefix) = match text.strip_prefix(NHX_START) {
        Some(rest) => (split_top_level(rest, NHX_VALUE_SEPARATOR), NHX_KEY_PREFIX),
        None => (
            split_top_level(text.strip_prefix(HOT_COMMENT_START)?, ALLOCATION_SEPARATOR),
            "",
        ),
    };
    let mut result = Vec::new();
    for entry in entries {
        let (key, value) = entry.split_once(ALLOCATION_SYMBOL)?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        result.push((format!("{}{}", key_prefix, key), value.trim().to_string()));
    }
    Some(result)
}

fn literal_events(ids: &mut IdManager, key: &str, raw: &str, queue: &mut Vec<Event>) {
    queue.push(LiteralMetadataEvent::simple(ids.create_new_id(prefixes::META), key).into());
    let content = match parse_value(raw) {
        ObjectValue::String(text) => LiteralMetadataContentEvent::from_string(text, false),
        object => LiteralMetadataContentEvent::from_object(object, Some(raw.to_string())),
    };
    queue.push(content.into());
    queue.push(Event::end(EventContentType::LiteralMeta));
}

#[derive(Debug)]
struct NodeInfo {
    id: String,
    length: Option<f64>,
    edge_events: Vec<Event>,
}

/// Reads the trees of a Newick string one event batch at a time.
#[derive(Debug)]
pub struct NewickStringReader {
    scanner: NewickScanner,
    tree_label: Option<String>,
    max_comment_length: usize,
    /// Nodes of each open subtree whose incoming edges are not written yet.
    passed_subnodes: Vec<Vec<NodeInfo>>,
    in_tree: bool,
    node_expected: bool,
    single_tree: bool,
    trees_read: usize,
}

impl NewickStringReader {
    /// A reader for a sequence of trees, as in a Newick file.
    pub fn new(max_comment_length: usize) -> Self {
        Self {
            scanner: NewickScanner::new(),
            tree_label: None,
            max_comment_length,
            passed_subnodes: Vec::new(),
            in_tree: false,
            node_expected: false,
            single_tree: false,
            trees_read: 0,
        }
    }

    /// A reader for exactly one tree with the given label, as in a Nexus `TREE`
    /// command.
    pub fn single_tree(label: Option<String>, max_comment_length: usize) -> Self {
        Self {
            tree_label: label,
            single_tree: true,
            ..Self::new(max_comment_length)
        }
    }

    /// Appends the next events to `queue`. Returns `false` when no further tree
    /// follows. Events already in `queue` are kept; at least one event is added
    /// per call that returns `true`.
    pub fn add_next_events(
        &mut self,
        reader: &mut PeekReader,
        labels: &dyn NodeLabelProcessor,
        ids: &mut IdManager,
        queue: &mut VecDeque<Event>,
    ) -> ReadResult<bool> {
        if self.in_tree {
            self.process_tree(reader, labels, ids, queue)?;
            return Ok(true);
        }
        if self.single_tree && self.trees_read > 0 {
            return Ok(false);
        }
        let Some(token) = self.scanner.peek(reader)? else {
            return Ok(false);
        };
        if let NewickTokenKind::Comment(text) = &token.kind {
            if Self::rooting(text).is_none() {
                let text = text.clone();
                self.scanner.next_token(reader)?;
                queue.extend(comment_events(&text, self.max_comment_length));
                return Ok(true);
            }
        }
        self.start_tree(reader, ids, queue)?;
        Ok(true)
    }

    /// `Some(true)` for `[&R]`, `Some(false)` for `[&U]`.
    fn rooting(text: &str) -> Option<bool> {
        let text = text.trim();
        if text.eq_ignore_ascii_case(ROOTED_HOT_COMMENT) {
            Some(true)
        } else if text.eq_ignore_ascii_case(UNROOTED_HOT_COMMENT) {
            Some(false)
        } else {
            None
        }
    }

    fn start_tree(
        &mut self,
        reader: &mut PeekReader,
        ids: &mut IdManager,
        queue: &mut VecDeque<Event>,
    ) -> ReadResult<()> {
        let tree_id = ids.create_new_id(prefixes::TREE);
        queue.push_back(
            LabeledIdEvent::new(EventContentType::Tree, tree_id, self.tree_label.clone()).into(),
        );
        let rooted = match self.scanner.peek(reader)? {
            Some(NewickToken {
                kind: NewickTokenKind::Comment(text),
                ..
            }) => Self::rooting(text),
            _ => None,
        };
        if let Some(rooted) = rooted {
            self.scanner.next_token(reader)?;
            queue.push_back(
                LiteralMetadataEvent::simple(ids.create_new_id(prefixes::META), DISPLAY_TREE_ROOTED)
                    .into(),
            );
            queue.push_back(
                LiteralMetadataContentEvent::from_object(
                    ObjectValue::Boolean(rooted),
                    Some(rooted.to_string()),
                )
                .into(),
            );
            queue.push_back(Event::end(EventContentType::LiteralMeta));
        }
        self.passed_subnodes.clear();
        self.passed_subnodes.push(Vec::new());
        self.in_tree = true;
        self.node_expected = true;
        Ok(())
    }

    fn end_tree(&mut self, ids: &mut IdManager, queue: &mut VecDeque<Event>) {
        if let Some(level) = self.passed_subnodes.pop() {
            Self::add_edge_events(None, level, ids, queue);
        }
        queue.push_back(Event::end(EventContentType::Tree));
        self.passed_subnodes.clear();
        self.in_tree = false;
        self.trees_read += 1;
    }

    fn unexpected(token: &NewickToken) -> NewickError {
        NewickError::UnexpectedToken {
            token: token.describe(),
            location: token.location,
        }
    }

    fn process_tree(
        &mut self,
        reader: &mut PeekReader,
        labels: &dyn NodeLabelProcessor,
        ids: &mut IdManager,
        queue: &mut VecDeque<Event>,
    ) -> ReadResult<()> {
        let queued = queue.len();
        while queue.len() == queued && self.in_tree {
            if self.node_expected {
                self.node_expected = false;
                self.read_node(reader, labels, ids, queue)?;
                continue;
            }
            let Some(token) = self.scanner.next_token(reader)? else {
                if self.passed_subnodes.len() == 1 {
                    self.end_tree(ids, queue);
                    continue;
                }
                return Err(NewickError::UnexpectedEnd(reader.location()).into());
            };
            match &token.kind {
                NewickTokenKind::SubtreeStart => {
                    self.passed_subnodes.push(Vec::new());
                    self.read_node(reader, labels, ids, queue)?;
                }
                NewickTokenKind::ElementSeparator => {
                    self.read_node(reader, labels, ids, queue)?;
                }
                NewickTokenKind::SubtreeEnd => {
                    if self.passed_subnodes.len() < 2 {
                        return Err(Self::unexpected(&token).into());
                    }
                    if let Some(next) = self.scanner.peek(reader)? {
                        if next.kind == NewickTokenKind::SubtreeStart {
                            return Err(Self::unexpected(next).into());
                        }
                    }
                    let level = self.passed_subnodes.pop().unwrap_or_default();
                    match self.read_node(reader, labels, ids, queue)? {
                        Some(node_id) => Self::add_edge_events(Some(node_id), level, ids, queue),
                        None => {
                            let location = reader.location();
                            return Err(NewickError::UnexpectedToken {
                                token: "(".to_string(),
                                location,
                            }
                            .into());
                        }
                    }
                }
                NewickTokenKind::TerminalSymbol => {
                    if self.passed_subnodes.len() != 1 {
                        return Err(Self::unexpected(&token).into());
                    }
                    self.end_tree(ids, queue);
                }
                NewickTokenKind::Comment(text) => {
                    queue.extend(comment_events(text, self.max_comment_length));
                }
                NewickTokenKind::Name { .. } | NewickTokenKind::Length(_) => {
                    return Err(Self::unexpected(&token).into());
                }
            }
        }
        Ok(())
    }

    /// Reads the node at the current position and queues its events. Returns
    /// `None` if a subtree starts here instead.
    fn read_node(
        &mut self,
        reader: &mut PeekReader,
        labels: &dyn NodeLabelProcessor,
        ids: &mut IdManager,
        queue: &mut VecDeque<Event>,
    ) -> ReadResult<Option<String>> {
        let mut leading = Vec::new();
        loop {
            match self.scanner.peek(reader)? {
                Some(NewickToken {
                    kind: NewickTokenKind::Comment(text),
                    ..
                }) => {
                    leading.push(text.clone());
                    self.scanner.next_token(reader)?;
                }
                Some(NewickToken {
                    kind: NewickTokenKind::SubtreeStart,
                    ..
                }) => {
                    for text in leading {
                        queue.extend(comment_events(&text, self.max_comment_length));
                    }
                    return Ok(None);
                }
                Some(_) => break,
                None if self.passed_subnodes.len() <= 1 => break,
                None => return Err(NewickError::UnexpectedEnd(reader.location()).into()),
            }
        }

        let node_id = ids.create_new_id(prefixes::NODE);
        let (name, length, node_comments, edge_comments) = self.collect_node_edge_tokens(reader, leading)?;

        let mut node_events = Vec::new();
        self.add_meta_and_comment_events(&node_comments, ids, &mut node_events);
        let mut edge_events = Vec::new();
        self.add_meta_and_comment_events(&edge_comments, ids, &mut edge_events);

        let label = labels.process_label(name.as_deref());
        let linked_otu = labels.linked_otu_id(label.as_deref());
        queue.push_back(
            LinkedLabeledIdEvent::new(EventContentType::Node, node_id.clone(), label, linked_otu).into(),
        );
        queue.extend(node_events);
        queue.push_back(Event::end(EventContentType::Node));

        if let Some(level) = self.passed_subnodes.last_mut() {
            level.push(NodeInfo {
                id: node_id.clone(),
                length,
                edge_events,
            });
        }
        Ok(Some(node_id))
    }

    #[allow(clippy::type_complexity)]
    fn collect_node_edge_tokens(
        &mut self,
        reader: &mut PeekReader,
        leading: Vec<String>,
    ) -> ReadResult<(Option<String>, Option<f64>, Vec<String>, Vec<String>)> {
        let mut name = None;
        let mut length = None;
        let mut hot_comments = leading.iter().filter(|text| is_hot_comment(text)).count();
        let mut second_hot_comment = None;
        let mut node_comments = leading;
        let mut edge_comments = Vec::new();
        let mut name_expected = true;
        let mut length_expected = true;

        while let Some(token) = self.scanner.peek(reader)? {
            match &token.kind {
                NewickTokenKind::Name { text, .. } if name_expected => {
                    name = Some(text.clone());
                    name_expected = false;
                }
                NewickTokenKind::Length(value) if length_expected => {
                    length = Some(*value);
                    name_expected = false;
                    length_expected = false;
                }
                NewickTokenKind::Comment(text) => {
                    if length_expected {
                        if is_hot_comment(text) {
                            hot_comments += 1;
                            if hot_comments == 2 {
                                second_hot_comment = Some(node_comments.len());
                            }
                        }
                        node_comments.push(text.clone());
                    } else {
                        edge_comments.push(text.clone());
                    }
                }
                _ => break,
            }
            self.scanner.next_token(reader)?;
        }

        if length_expected {
            if let Some(position) = second_hot_comment {
                edge_comments = node_comments.split_off(position);
            }
        }
        Ok((name, length, node_comments, edge_comments))
    }

    fn add_meta_and_comment_events(&self, comments: &[String], ids: &mut IdManager, events: &mut Vec<Event>) {
        for text in comments {
            let entries = if is_hot_comment(text) {
                parse_hot_comment(text)
            } else {
                None
            };
            match entries {
                Some(entries) => {
                    for (key, value) in entries {
                        literal_events(ids, &key, &value, events);
                    }
                }
                None => {
                    if is_hot_comment(text) {
                        log::debug!("Hot comment \"{}\" could not be parsed and is kept as comment", text);
                    }
                    events.extend(comment_events(text, self.max_comment_length));
                }
            }
        }
    }

    fn add_edge_events(
        source: Option<String>,
        level: Vec<NodeInfo>,
        ids: &mut IdManager,
        queue: &mut VecDeque<Event>,
    ) {
        for info in level {
            let edge = EdgeEvent::new(
                ids.create_new_id(prefixes::EDGE),
                None,
                source.clone(),
                info.id,
                info.length,
            );
            let content_type = edge.content_type();
            queue.push_back(edge.into());
            queue.extend(info.edge_events);
            queue.push_back(Event::end(content_type));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{TranslatingLabelProcessor, TranslationTable, VerbatimLabelProcessor};

    fn read_events(text: &str, labels: &dyn NodeLabelProcessor) -> ReadResult<Vec<Event>> {
        let mut reader = PeekReader::from_string(text);
        let mut newick = NewickStringReader::new(1024);
        let mut ids = IdManager::new();
        let mut queue = VecDeque::new();
        let mut events = Vec::new();
        while newick.add_next_events(&mut reader, labels, &mut ids, &mut queue)? {
            events.extend(queue.drain(..));
        }
        events.extend(queue);
        Ok(events)
    }

    /// Compact rendering: `N(label)`, `E(source>target:length)`, `/N`, ...
    fn describe(events: &[Event]) -> Vec<String> {
        let mut names = std::collections::HashMap::new();
        events
            .iter()
            .map(|event| match event {
                Event::LinkedLabeledId(node) => {
                    let label = node.label.clone().unwrap_or_default();
                    names.insert(node.id.clone(), label.clone());
                    format!("N({})", label)
                }
                Event::Edge(edge) => {
                    let source = edge
                        .source_id
                        .as_ref()
                        .map(|id| names[id].clone())
                        .unwrap_or_else(|| "-".to_string());
                    let length = edge.length.map(|l| format!(":{}", l)).unwrap_or_default();
                    format!("E({}>{}{})", source, names[&edge.target_id], length)
                }
                Event::LabeledId(tree) => format!("T({})", tree.label.clone().unwrap_or_default()),
                Event::Comment(comment) => format!("C({})", comment.content),
                Event::LiteralMeta(meta) => format!("M({})", meta.predicate.key()),
                Event::LiteralMetaContent(content) => {
                    format!("V({})", content.string_value().unwrap_or_default())
                }
                Event::End(content_type) => format!("/{}", content_type.name()),
                other => format!("{:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_event_order_of_simple_tree() {
        let events = read_events("((A:1,B:2)C:0.5,D)E;", &VerbatimLabelProcessor::default()).unwrap();
        assert_eq!(
            describe(&events),
            vec![
                "T()", "N(A)", "/NODE", "N(B)", "/NODE", "N(C)", "/NODE",
                "E(C>A:1)", "/EDGE", "E(C>B:2)", "/EDGE",
                "N(D)", "/NODE", "N(E)", "/NODE",
                "E(E>C:0.5)", "/EDGE", "E(E>D)", "/EDGE",
                "E(->E)", "/ROOT_EDGE", "/TREE",
            ]
        );
    }

    #[test]
    fn test_several_trees_and_missing_terminal() {
        let events = read_events("(A,B);\n[between] (C,D)", &VerbatimLabelProcessor::default()).unwrap();
        let described = describe(&events);
        assert_eq!(described.iter().filter(|e| e.as_str() == "/TREE").count(), 2);
        assert!(described.contains(&"C(between)".to_string()));
    }

    #[test]
    fn test_rooting_hot_comment() {
        let events = read_events("[&R] (A,B);", &VerbatimLabelProcessor::default()).unwrap();
        assert_eq!(
            describe(&events)[..4],
            ["T()", "M(displayTreeRooted)", "V(true)", "/LITERAL_META"]
        );
        match &events[2] {
            Event::LiteralMetaContent(content) => {
                assert_eq!(content.object_value(), Some(&ObjectValue::Boolean(true)))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_node_and_edge_comments() {
        let events = read_events(
            "(A[&support=95]:1.0[&rate=0.2][plain],B);",
            &VerbatimLabelProcessor::default(),
        )
        .unwrap();
        let described = describe(&events);
        assert_eq!(
            described[..8],
            ["T()", "N(A)", "M(support)", "V(95)", "/LITERAL_META", "/NODE", "N(B)", "/NODE"]
        );
        let edge = described.iter().position(|e| e == "E(>A:1)").unwrap();
        assert_eq!(
            described[edge + 1..edge + 5],
            ["M(rate)", "V(0.2)", "/LITERAL_META", "C(plain)"]
        );
        match &events[3] {
            Event::LiteralMetaContent(content) => {
                assert_eq!(content.object_value(), Some(&ObjectValue::Double(95.0)))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_second_hot_comment_without_length_belongs_to_edge() {
        let events = read_events("(A[&a=1][&b=2],B);", &VerbatimLabelProcessor::default()).unwrap();
        let described = describe(&events);
        let node_end = described.iter().position(|e| e == "/NODE").unwrap();
        assert_eq!(described[2], "M(a)");
        assert!(node_end < described.iter().position(|e| e == "M(b)").unwrap());
        let edge_to_a = described
            .iter()
            .position(|e| e.starts_with("E(") && e.ends_with(">A)"))
            .unwrap();
        assert_eq!(described[edge_to_a + 1], "M(b)");
    }

    #[test]
    fn test_list_and_nhx_hot_comments() {
        assert_eq!(
            parse_hot_comment("&height_range={1.5,2},name=\"x,y\""),
            Some(vec![
                ("height_range".to_string(), "{1.5,2}".to_string()),
                ("name".to_string(), "\"x,y\"".to_string())
            ])
        );
        assert_eq!(
            parse_hot_comment("&&NHX:S=human:E=1.1"),
            Some(vec![
                ("NHX:S".to_string(), "human".to_string()),
                ("NHX:E".to_string(), "1.1".to_string())
            ])
        );
        assert_eq!(parse_hot_comment("&no value"), None);
        assert_eq!(
            parse_value("{1.5,2}"),
            ObjectValue::List(vec![ObjectValue::Double(1.5), ObjectValue::Double(2.0)])
        );
        assert_eq!(parse_value("\"x,y\""), ObjectValue::String("x,y".to_string()));
    }

    #[test]
    fn test_unparsable_hot_comment_is_kept_as_comment() {
        let events = read_events("A[&odd];", &VerbatimLabelProcessor::default()).unwrap();
        assert!(describe(&events).contains(&"C(&odd)".to_string()));
    }

    #[test]
    fn test_translated_labels() {
        let mut table = TranslationTable::new();
        table.add("1", "A-2301");
        table.add("2", "A-2501");
        let processor = TranslatingLabelProcessor::new(&table, None);
        let events = read_events("(1,2);", &processor).unwrap();
        let described = describe(&events);
        assert_eq!(described[1], "N(A-2301)");
        assert_eq!(described[3], "N(A-2501)");
    }

    #[test]
    fn test_unexpected_end_inside_subtree() {
        let result = read_events("((A,B),C", &VerbatimLabelProcessor::default());
        assert!(matches!(
            result,
            Err(crate::error::ReadError::Format(crate::formats::FormatError::Newick(
                NewickError::UnexpectedEnd(_)
            )))
        ));
    }

    #[test]
    fn test_unbalanced_subtree_end() {
        assert!(read_events("(A,B));", &VerbatimLabelProcessor::default()).is_err());
        assert!(read_events("(A,B)(C);", &VerbatimLabelProcessor::default()).is_err());
    }

    #[test]
    fn test_events_accumulate_in_undrained_queue() {
        let text = "[c] ((A,B)C,D); (E,F);";
        let labels = VerbatimLabelProcessor::default();
        let drained = read_events(text, &labels).unwrap();

        let mut reader = PeekReader::from_string(text);
        let mut newick = NewickStringReader::new(1024);
        let mut ids = IdManager::new();
        let mut queue = VecDeque::new();
        let mut calls = 0;
        while newick
            .add_next_events(&mut reader, &labels, &mut ids, &mut queue)
            .unwrap()
        {
            calls += 1;
            assert!(calls <= drained.len(), "no progress after {} calls", calls);
        }
        let accumulated: Vec<Event> = queue.into_iter().collect();
        assert_eq!(accumulated, drained);
    }

    #[test]
    fn test_single_tree_mode_stops_after_first_tree() {
        let mut reader = PeekReader::from_string("(A,B); rest");
        let mut newick = NewickStringReader::single_tree(Some("t1".to_string()), 1024);
        let mut ids = IdManager::new();
        let mut queue = VecDeque::new();
        let labels = VerbatimLabelProcessor::default();
        while newick
            .add_next_events(&mut reader, &labels, &mut ids, &mut queue)
            .unwrap()
        {}
        let events: Vec<Event> = queue.into_iter().collect();
        assert_eq!(describe(&events)[0], "T(t1)");
        reader.skip_whitespace().unwrap();
        assert!(reader.starts_with_ignore_case("rest").unwrap());
    }
}

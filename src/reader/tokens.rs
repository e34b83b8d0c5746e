//! Shared handling of sequence names and tokens for matrix readers.

use std::collections::{HashMap, VecDeque};

use crate::error::{ReadError, ReadResult};
use crate::events::{Event, EventContentType, LinkedLabeledIdEvent, SequenceTokensEvent};
use crate::ids::{prefixes, IdManager};
use crate::parameters::ReadWriteParameters;

/// Keys of unnamed sequences start with a character no trimmed name line holds.
const UNNAMED_KEY_PREFIX: char = '\0';

/// Assigns stable sequence IDs, replaces match tokens and chunks token lists.
///
/// Interleaved formats mention a sequence once per block. The manager returns the
/// same ID for every block of a name and keeps track of the column each sequence
/// has reached, so a match token can be replaced by the token of the first
/// sequence at that column.
#[derive(Debug)]
pub struct SequenceTokensEventManager {
    replace_match_tokens: bool,
    match_token: String,
    max_tokens_to_read: usize,
    ids_by_name: HashMap<String, String>,
    columns: HashMap<String, usize>,
    first_sequence_name: Option<String>,
    first_sequence: Vec<String>,
}

impl SequenceTokensEventManager {
    pub fn new(parameters: &ReadWriteParameters) -> Self {
        Self {
            replace_match_tokens: parameters.replace_match_tokens,
            match_token: parameters.match_token.clone(),
            max_tokens_to_read: parameters.max_tokens_to_read.max(1),
            ids_by_name: HashMap::new(),
            columns: HashMap::new(),
            first_sequence_name: None,
            first_sequence: Vec::new(),
        }
    }

    /// Replaces the match token, e.g. after a format declared its own.
    pub fn set_match_token(&mut self, token: impl Into<String>) {
        self.match_token = token.into();
    }

    pub fn match_token(&self) -> &str {
        &self.match_token
    }

    /// Returns the ID of the sequence with this name, creating it on first use.
    pub fn sequence_id(&mut self, name: &str, ids: &mut IdManager) -> String {
        if let Some(id) = self.ids_by_name.get(name) {
            return id.clone();
        }
        let id = ids.create_new_id(prefixes::SEQUENCE);
        self.ids_by_name.insert(name.to_string(), id.clone());
        id
    }

    /// Returns `true` if a sequence with this name was already started.
    pub fn is_known(&self, name: &str) -> bool {
        self.ids_by_name.contains_key(name)
    }

    /// Creates the SEQUENCE START event for `name`, reusing its ID if the sequence
    /// appeared before.
    pub fn start_event(
        &mut self,
        name: &str,
        linked_otu_id: Option<String>,
        ids: &mut IdManager,
    ) -> Event {
        if self.first_sequence_name.is_none() {
            self.first_sequence_name = Some(name.to_string());
        }
        let id = self.sequence_id(name, ids);
        LinkedLabeledIdEvent::new(
            EventContentType::Sequence,
            id,
            Some(name.to_string()),
            linked_otu_id,
        )
        .into()
    }

    /// Creates the SEQUENCE START event of a sequence without a name. The returned
    /// key stands for the name in later calls for this sequence.
    pub fn unnamed_start_event(&mut self, ids: &mut IdManager) -> (String, Event) {
        let id = ids.create_new_id(prefixes::SEQUENCE);
        let key = format!("{}{}", UNNAMED_KEY_PREFIX, id);
        self.ids_by_name.insert(key.clone(), id.clone());
        if self.first_sequence_name.is_none() {
            self.first_sequence_name = Some(key.clone());
        }
        let event = LinkedLabeledIdEvent::new(EventContentType::Sequence, id, None, None).into();
        (key, event)
    }

    /// Name of the first sequence of the matrix.
    pub fn first_sequence_name(&self) -> Option<&str> {
        self.first_sequence_name.as_deref()
    }

    /// Number of tokens read so far for the sequence `name`.
    pub fn column(&self, name: &str) -> usize {
        self.columns.get(name).copied().unwrap_or(0)
    }

    /// Appends SEQUENCE_TOKENS events for `tokens` of sequence `name` to `queue`,
    /// at most `max_tokens_to_read` tokens per event.
    pub fn add_tokens_events(
        &mut self,
        name: &str,
        mut tokens: Vec<String>,
        queue: &mut VecDeque<Event>,
    ) -> ReadResult<()> {
        if tokens.is_empty() {
            return Ok(());
        }
        let start_column = self.column(name);
        let is_first = self.first_sequence_name.as_deref() == Some(name);

        if self.replace_match_tokens && !is_first {
            for (offset, token) in tokens.iter_mut().enumerate() {
                if *token == self.match_token {
                    let column = start_column + offset;
                    let replacement = self.first_sequence.get(column).ok_or_else(|| {
                        ReadError::UnexpectedSequence(format!(
                            "The match token at column {} of sequence \"{}\" cannot be replaced because the first sequence only has {} tokens",
                            column + 1,
                            name,
                            self.first_sequence.len()
                        ))
                    })?;
                    *token = replacement.clone();
                }
            }
        }
        if is_first {
            self.first_sequence.extend(tokens.iter().cloned());
        }
        self.columns.insert(name.to_string(), start_column + tokens.len());

        let mut tokens = tokens.into_iter().peekable();
        while tokens.peek().is_some() {
            let chunk: Vec<String> = tokens.by_ref().take(self.max_tokens_to_read).collect();
            queue.push_back(SequenceTokensEvent::new(chunk).into());
        }
        Ok(())
    }
}

/// Splits a string into one token per non-whitespace character.
pub fn character_tokens(text: &str) -> Vec<String> {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_of(queue: &VecDeque<Event>) -> Vec<Vec<String>> {
        queue
            .iter()
            .filter_map(|event| match event {
                Event::SequenceTokens(tokens) => Some(tokens.tokens.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_ids_are_stable_per_name() {
        let mut manager = SequenceTokensEventManager::new(&ReadWriteParameters::default());
        let mut ids = IdManager::new();
        let first = manager.start_event("A", None, &mut ids);
        let second = manager.start_event("B", None, &mut ids);
        let again = manager.start_event("A", None, &mut ids);
        assert_eq!(first.id(), again.id());
        assert_ne!(first.id(), second.id());
        assert_eq!(manager.first_sequence_name(), Some("A"));
    }

    #[test]
    fn test_unnamed_sequences_get_distinct_ids() {
        let mut manager = SequenceTokensEventManager::new(&ReadWriteParameters::default());
        let mut ids = IdManager::new();
        let (first_key, first) = manager.unnamed_start_event(&mut ids);
        let (second_key, second) = manager.unnamed_start_event(&mut ids);
        assert_ne!(first_key, second_key);
        assert_ne!(first.id(), second.id());
        assert_eq!(first.label(), None);
        assert_eq!(manager.sequence_id(&first_key, &mut ids), first.id().unwrap_or_default());
        assert_eq!(manager.first_sequence_name(), Some(first_key.as_str()));
    }

    #[test]
    fn test_tokens_are_chunked() {
        let params = ReadWriteParameters::new().with_max_tokens_to_read(3);
        let mut manager = SequenceTokensEventManager::new(&params);
        let mut ids = IdManager::new();
        manager.start_event("A", None, &mut ids);
        let mut queue = VecDeque::new();
        manager
            .add_tokens_events("A", character_tokens("ACGTACG"), &mut queue)
            .unwrap();
        assert_eq!(
            tokens_of(&queue),
            vec![
                vec!["A", "C", "G"],
                vec!["T", "A", "C"],
                vec!["G"],
            ]
        );
        assert_eq!(manager.column("A"), 7);
    }

    #[test]
    fn test_match_tokens_follow_columns_across_blocks() {
        let params = ReadWriteParameters::new().with_replace_match_tokens(true);
        let mut manager = SequenceTokensEventManager::new(&params);
        let mut ids = IdManager::new();
        let mut queue = VecDeque::new();

        manager.start_event("A", None, &mut ids);
        manager.add_tokens_events("A", character_tokens("ACG"), &mut queue).unwrap();
        manager.start_event("B", None, &mut ids);
        manager.add_tokens_events("B", character_tokens(".T."), &mut queue).unwrap();
        manager.start_event("A", None, &mut ids);
        manager.add_tokens_events("A", character_tokens("TT"), &mut queue).unwrap();
        manager.start_event("B", None, &mut ids);
        manager.add_tokens_events("B", character_tokens("G."), &mut queue).unwrap();

        let chunks = tokens_of(&queue);
        assert_eq!(chunks[1], vec!["A", "T", "G"]);
        assert_eq!(chunks[3], vec!["G", "T"]);
    }

    #[test]
    fn test_match_token_beyond_first_sequence_fails() {
        let params = ReadWriteParameters::new().with_replace_match_tokens(true);
        let mut manager = SequenceTokensEventManager::new(&params);
        let mut ids = IdManager::new();
        let mut queue = VecDeque::new();
        manager.start_event("A", None, &mut ids);
        manager.add_tokens_events("A", character_tokens("A"), &mut queue).unwrap();
        manager.start_event("B", None, &mut ids);
        let result = manager.add_tokens_events("B", character_tokens("A."), &mut queue);
        assert!(matches!(result, Err(ReadError::UnexpectedSequence(_))));
    }

    #[test]
    fn test_match_tokens_kept_without_replacement() {
        let mut manager = SequenceTokensEventManager::new(&ReadWriteParameters::default());
        let mut ids = IdManager::new();
        let mut queue = VecDeque::new();
        manager.start_event("A", None, &mut ids);
        manager.add_tokens_events("A", character_tokens("AC"), &mut queue).unwrap();
        manager.start_event("B", None, &mut ids);
        manager.add_tokens_events("B", character_tokens(".."), &mut queue).unwrap();
        assert_eq!(tokens_of(&queue)[1], vec![".", "."]);
    }
}

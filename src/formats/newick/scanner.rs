//! Tokenizer for Newick tree strings.

use crate::error::{ReadResult, SourceLocation};
use crate::events::Event;
use crate::formats::newick::NewickError;
use crate::reader::text::PeekReader;

pub const SUBTREE_START: char = '(';
pub const SUBTREE_END: char = ')';
pub const NAME_DELIMITER: char = '\'';
pub const LENGTH_SEPARATOR: char = ':';
pub const ELEMENT_SEPARATOR: char = ',';
pub const TERMINAL_SYMBOL: char = ';';
pub const COMMENT_START: char = '[';
pub const COMMENT_END: char = ']';
pub const FREE_NAME_BLANK: char = '_';

#[derive(Debug, Clone, PartialEq)]
pub enum NewickTokenKind {
    SubtreeStart,
    SubtreeEnd,
    ElementSeparator,
    TerminalSymbol,
    /// A node name. `delimited` is set for names enclosed in `'`.
    Name { text: String, delimited: bool },
    Length(f64),
    /// Text between `[` and `]`, without the brackets.
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewickToken {
    pub kind: NewickTokenKind,
    pub location: SourceLocation,
}

impl NewickToken {
    fn new(kind: NewickTokenKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            NewickTokenKind::SubtreeStart => SUBTREE_START.to_string(),
            NewickTokenKind::SubtreeEnd => SUBTREE_END.to_string(),
            NewickTokenKind::ElementSeparator => ELEMENT_SEPARATOR.to_string(),
            NewickTokenKind::TerminalSymbol => TERMINAL_SYMBOL.to_string(),
            NewickTokenKind::Name { text, .. } => format!("name \"{}\"", text),
            NewickTokenKind::Length(length) => format!("length {}", length),
            NewickTokenKind::Comment(_) => "comment".to_string(),
        }
    }
}

pub fn is_char_after_length(c: char) -> bool {
    c.is_whitespace()
        || c == ELEMENT_SEPARATOR
        || c == SUBTREE_END
        || c == COMMENT_START
        || c == TERMINAL_SYMBOL
}

pub fn is_free_name_char(c: char) -> bool {
    c != SUBTREE_START
        && c != SUBTREE_END
        && c != LENGTH_SEPARATOR
        && c != ELEMENT_SEPARATOR
        && c != COMMENT_START
        && c != COMMENT_END
        && c != TERMINAL_SYMBOL
        && c != NAME_DELIMITER
        && !c.is_whitespace()
}

/// Reads tokens from a [`PeekReader`] with one token of lookahead.
///
/// The scanner does not own its source, so a Nexus reader can hand the same
/// reader to a scanner for each tree definition.
#[derive(Debug, Default)]
pub struct NewickScanner {
    peeked: Option<NewickToken>,
}

impl NewickScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_more_tokens(&mut self, reader: &mut PeekReader) -> ReadResult<bool> {
        Ok(self.peek(reader)?.is_some())
    }

    pub fn peek(&mut self, reader: &mut PeekReader) -> ReadResult<Option<&NewickToken>> {
        if self.peeked.is_none() {
            self.peeked = Self::scan(reader)?;
        }
        Ok(self.peeked.as_ref())
    }

    pub fn next_token(&mut self, reader: &mut PeekReader) -> ReadResult<Option<NewickToken>> {
        match self.peeked.take() {
            Some(token) => Ok(Some(token)),
            None => Self::scan(reader),
        }
    }

    fn scan(reader: &mut PeekReader) -> ReadResult<Option<NewickToken>> {
        reader.skip_whitespace()?;
        let location = reader.location();
        let Some(c) = reader.peek()? else {
            return Ok(None);
        };
        let kind = match c {
            SUBTREE_START | SUBTREE_END | ELEMENT_SEPARATOR | TERMINAL_SYMBOL => {
                reader.read()?;
                match c {
                    SUBTREE_START => NewickTokenKind::SubtreeStart,
                    SUBTREE_END => NewickTokenKind::SubtreeEnd,
                    ELEMENT_SEPARATOR => NewickTokenKind::ElementSeparator,
                    _ => NewickTokenKind::TerminalSymbol,
                }
            }
            LENGTH_SEPARATOR => {
                reader.read()?;
                reader.skip_whitespace()?;
                Self::read_length(reader, location)?
            }
            NAME_DELIMITER => Self::read_delimited_name(reader, location)?,
            COMMENT_START => {
                reader.read()?;
                let events = reader.read_comment(COMMENT_START, COMMENT_END, usize::MAX, location)?;
                let text = events
                    .into_iter()
                    .filter_map(|event| match event {
                        Event::Comment(comment) => Some(comment.content),
                        _ => None,
                    })
                    .collect();
                NewickTokenKind::Comment(text)
            }
            c if is_free_name_char(c) => Self::read_free_name(reader)?,
            other => {
                return Err(NewickError::UnexpectedToken {
                    token: other.to_string(),
                    location,
                }
                .into())
            }
        };
        Ok(Some(NewickToken::new(kind, location)))
    }

    fn read_length(reader: &mut PeekReader, location: SourceLocation) -> ReadResult<NewickTokenKind> {
        let text = reader.read_until(is_char_after_length)?;
        text.parse::<f64>()
            .map(NewickTokenKind::Length)
            .map_err(|_| NewickError::InvalidLength { text, location }.into())
    }

    /// Reads a name in `'`. A doubled `''` stands for one `'`.
    fn read_delimited_name(
        reader: &mut PeekReader,
        location: SourceLocation,
    ) -> ReadResult<NewickTokenKind> {
        reader.read()?;
        let mut text = String::new();
        loop {
            match reader.read()? {
                None => return Err(NewickError::UnterminatedName(location).into()),
                Some(NAME_DELIMITER) => {
                    if reader.peek()? == Some(NAME_DELIMITER) {
                        reader.read()?;
                        text.push(NAME_DELIMITER);
                    } else {
                        break;
                    }
                }
                Some(c) => text.push(c),
            }
        }
        Ok(NewickTokenKind::Name {
            text,
            delimited: true,
        })
    }

    /// Reads an unquoted name, where `_` stands for a space.
    fn read_free_name(reader: &mut PeekReader) -> ReadResult<NewickTokenKind> {
        let raw = reader.read_until(|c| !is_free_name_char(c))?;
        let text = raw.replace(FREE_NAME_BLANK, " ");
        Ok(NewickTokenKind::Name {
            text,
            delimited: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadError;
    use crate::formats::FormatError;

    fn kinds(text: &str) -> Vec<NewickTokenKind> {
        let mut reader = PeekReader::from_string(text);
        let mut scanner = NewickScanner::new();
        let mut result = Vec::new();
        while let Some(token) = scanner.next_token(&mut reader).unwrap() {
            result.push(token.kind);
        }
        result
    }

    fn name(text: &str, delimited: bool) -> NewickTokenKind {
        NewickTokenKind::Name {
            text: text.to_string(),
            delimited,
        }
    }

    #[test]
    fn test_simple_tree() {
        assert_eq!(
            kinds("((A,B),C);"),
            vec![
                NewickTokenKind::SubtreeStart,
                NewickTokenKind::SubtreeStart,
                name("A", false),
                NewickTokenKind::ElementSeparator,
                name("B", false),
                NewickTokenKind::SubtreeEnd,
                NewickTokenKind::ElementSeparator,
                name("C", false),
                NewickTokenKind::SubtreeEnd,
                NewickTokenKind::TerminalSymbol,
            ]
        );
    }

    #[test]
    fn test_names_lengths_and_comments() {
        assert_eq!(
            kinds("'It''s' Homo_sapiens : 1.5e-2 [a [nested] note]"),
            vec![
                name("It's", true),
                name("Homo sapiens", false),
                NewickTokenKind::Length(0.015),
                NewickTokenKind::Comment("a [nested] note".to_string()),
            ]
        );
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut reader = PeekReader::from_string("A;");
        let mut scanner = NewickScanner::new();
        assert_eq!(
            scanner.peek(&mut reader).unwrap().map(|t| t.kind.clone()),
            Some(name("A", false))
        );
        assert!(scanner.has_more_tokens(&mut reader).unwrap());
        assert_eq!(
            scanner.next_token(&mut reader).unwrap().map(|t| t.kind),
            Some(name("A", false))
        );
        assert_eq!(
            scanner.next_token(&mut reader).unwrap().map(|t| t.kind),
            Some(NewickTokenKind::TerminalSymbol)
        );
        assert!(!scanner.has_more_tokens(&mut reader).unwrap());
    }

    #[test]
    fn test_invalid_length() {
        let mut reader = PeekReader::from_string("A:abc;");
        let mut scanner = NewickScanner::new();
        scanner.next_token(&mut reader).unwrap();
        assert!(matches!(
            scanner.next_token(&mut reader),
            Err(ReadError::Format(FormatError::Newick(NewickError::InvalidLength { .. })))
        ));
    }

    #[test]
    fn test_unterminated_name() {
        let mut reader = PeekReader::from_string("'open");
        let mut scanner = NewickScanner::new();
        assert!(matches!(
            scanner.next_token(&mut reader),
            Err(ReadError::Format(FormatError::Newick(NewickError::UnterminatedName(_))))
        ));
    }
}

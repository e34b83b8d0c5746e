//! Character level access to text sources with lookahead and position tracking.

use std::collections::VecDeque;
use std::io::{self, BufRead};

use thiserror::Error;

use crate::error::SourceLocation;
use crate::events::{CommentEvent, Event};

/// Syntax errors shared by the bracket based formats.
#[derive(Error, Debug)]
pub enum TextError {
    #[error("Unterminated comment starting at {0}")]
    UnterminatedComment(SourceLocation),

    #[error("Unterminated quoted text starting at {0}")]
    UnterminatedQuote(SourceLocation),
}

/// Buffered character reader over a [`BufRead`] source.
///
/// Lines are pulled from the source on demand, so arbitrary lookahead is possible
/// without loading the whole input.
pub struct PeekReader {
    source: Box<dyn BufRead>,
    buffer: VecDeque<char>,
    line: usize,
    column: usize,
    eof: bool,
}

impl PeekReader {
    pub fn new(source: Box<dyn BufRead>) -> Self {
        Self {
            source,
            buffer: VecDeque::new(),
            line: 1,
            column: 1,
            eof: false,
        }
    }

    pub fn from_string(text: impl Into<String>) -> Self {
        Self::new(Box::new(io::Cursor::new(text.into().into_bytes())))
    }

    fn fill(&mut self, count: usize) -> io::Result<bool> {
        while self.buffer.len() < count && !self.eof {
            let mut line = String::new();
            if self.source.read_line(&mut line)? == 0 {
                self.eof = true;
            } else {
                self.buffer.extend(line.chars());
            }
        }
        Ok(self.buffer.len() >= count)
    }

    pub fn peek(&mut self) -> io::Result<Option<char>> {
        self.peek_at(0)
    }

    pub fn peek_at(&mut self, offset: usize) -> io::Result<Option<char>> {
        self.fill(offset + 1)?;
        Ok(self.buffer.get(offset).copied())
    }

    pub fn read(&mut self) -> io::Result<Option<char>> {
        self.fill(1)?;
        let c = self.buffer.pop_front();
        match c {
            Some('\n') => {
                self.line += 1;
                self.column = 1;
            }
            Some(_) => self.column += 1,
            None => {}
        }
        Ok(c)
    }

    pub fn is_at_end(&mut self) -> io::Result<bool> {
        Ok(self.peek()?.is_none())
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    /// Returns `true` if the upcoming characters equal `text`, ignoring ASCII case.
    pub fn starts_with_ignore_case(&mut self, text: &str) -> io::Result<bool> {
        for (offset, expected) in text.chars().enumerate() {
            match self.peek_at(offset)? {
                Some(c) if c.eq_ignore_ascii_case(&expected) => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    pub fn skip(&mut self, count: usize) -> io::Result<()> {
        for _ in 0..count {
            if self.read()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    pub fn skip_whitespace(&mut self) -> io::Result<()> {
        while let Some(c) = self.peek()? {
            if !c.is_whitespace() {
                break;
            }
            self.read()?;
        }
        Ok(())
    }

    /// Skips spaces and tabs but stops at line breaks.
    pub fn skip_inline_whitespace(&mut self) -> io::Result<()> {
        while let Some(c) = self.peek()? {
            if c == '\n' || c == '\r' || !c.is_whitespace() {
                break;
            }
            self.read()?;
        }
        Ok(())
    }

    /// Consumes a line break (`\n`, `\r\n` or `\r`) if one follows.
    pub fn consume_line_break(&mut self) -> io::Result<bool> {
        match self.peek()? {
            Some('\n') => {
                self.read()?;
                Ok(true)
            }
            Some('\r') => {
                self.read()?;
                if self.peek()? == Some('\n') {
                    self.read()?;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Reads up to `max_length` characters of the current line.
    ///
    /// Returns the text and whether the line was completely read. A completely read
    /// line has its line break consumed but not included in the text.
    pub fn read_line(&mut self, max_length: usize) -> io::Result<(String, bool)> {
        let mut text = String::new();
        let mut length = 0;
        while length < max_length {
            match self.peek()? {
                None => return Ok((text, true)),
                Some('\n') | Some('\r') => {
                    self.consume_line_break()?;
                    return Ok((text, true));
                }
                Some(c) => {
                    self.read()?;
                    text.push(c);
                    length += 1;
                }
            }
        }
        let complete = match self.peek()? {
            None => true,
            Some('\n') | Some('\r') => self.consume_line_break()?,
            Some(_) => false,
        };
        Ok((text, complete))
    }

    /// Reads characters up to (not including) the first one matching `stop`.
    pub fn read_until<F: Fn(char) -> bool>(&mut self, stop: F) -> io::Result<String> {
        let mut text = String::new();
        while let Some(c) = self.peek()? {
            if stop(c) {
                break;
            }
            self.read()?;
            text.push(c);
        }
        Ok(text)
    }

    /// Reads a comment whose opening character was already consumed and returns it
    /// as COMMENT events of at most `max_length` characters each.
    ///
    /// Nested pairs of `open` and `close` are part of the comment text.
    pub fn read_comment(
        &mut self,
        open: char,
        close: char,
        max_length: usize,
        start: SourceLocation,
    ) -> Result<Vec<Event>, ReadCommentError> {
        let max_length = max_length.max(1);
        let mut events = Vec::new();
        let mut current = String::new();
        let mut length = 0;
        let mut depth = 1usize;
        loop {
            let c = match self.read()? {
                Some(c) => c,
                None => return Err(TextError::UnterminatedComment(start).into()),
            };
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            if length == max_length {
                events.push(CommentEvent::new(std::mem::take(&mut current), true).into());
                length = 0;
            }
            current.push(c);
            length += 1;
        }
        events.push(CommentEvent::new(current, false).into());
        Ok(events)
    }
}

/// Failure of [`PeekReader::read_comment`].
#[derive(Error, Debug)]
pub enum ReadCommentError {
    #[error(transparent)]
    Syntax(#[from] TextError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<ReadCommentError> for crate::error::ReadError {
    fn from(err: ReadCommentError) -> Self {
        match err {
            ReadCommentError::Syntax(err) => crate::formats::FormatError::from(err).into(),
            ReadCommentError::Io(err) => err.into(),
        }
    }
}

/// Splits `text` into COMMENT events of at most `max_length` characters.
pub fn comment_events(text: &str, max_length: usize) -> Vec<Event> {
    let max_length = max_length.max(1);
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![CommentEvent::new(String::new(), false).into()];
    }
    let chunks: Vec<&[char]> = chars.chunks(max_length).collect();
    let last = chunks.len() - 1;
    chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| CommentEvent::new(chunk.iter().collect::<String>(), index < last).into())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment_texts(events: &[Event]) -> Vec<(String, bool)> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::Comment(c) => Some((c.content.clone(), c.continued_in_next_event)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_peek_and_location() {
        let mut reader = PeekReader::from_string("ab\ncd");
        assert_eq!(reader.peek_at(3).unwrap(), Some('c'));
        assert_eq!(reader.read().unwrap(), Some('a'));
        reader.skip(2).unwrap();
        assert_eq!(reader.location(), SourceLocation::new(2, 1));
        assert!(reader.starts_with_ignore_case("CD").unwrap());
    }

    #[test]
    fn test_read_line_with_limit() {
        let mut reader = PeekReader::from_string("abcdef\r\nxy");
        assert_eq!(reader.read_line(4).unwrap(), ("abcd".to_string(), false));
        assert_eq!(reader.read_line(4).unwrap(), ("ef".to_string(), true));
        assert_eq!(reader.read_line(4).unwrap(), ("xy".to_string(), true));
        assert!(reader.is_at_end().unwrap());
    }

    #[test]
    fn test_nested_comment() {
        let mut reader = PeekReader::from_string("a [nested] comment] rest");
        let events = reader
            .read_comment('[', ']', 100, SourceLocation::new(1, 1))
            .unwrap();
        assert_eq!(
            comment_texts(&events),
            vec![("a [nested] comment".to_string(), false)]
        );
        assert_eq!(reader.read().unwrap(), Some(' '));
    }

    #[test]
    fn test_long_comment_is_split() {
        let mut reader = PeekReader::from_string("abcdefg]");
        let events = reader
            .read_comment('[', ']', 3, SourceLocation::new(1, 1))
            .unwrap();
        assert_eq!(
            comment_texts(&events),
            vec![
                ("abc".to_string(), true),
                ("def".to_string(), true),
                ("g".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_unterminated_comment() {
        let mut reader = PeekReader::from_string("never closed");
        let result = reader.read_comment('[', ']', 100, SourceLocation::new(4, 2));
        assert!(matches!(
            result,
            Err(ReadCommentError::Syntax(TextError::UnterminatedComment(_)))
        ));
    }

    #[test]
    fn test_comment_events_chunking() {
        assert_eq!(
            comment_texts(&comment_events("abcd", 2)),
            vec![("ab".to_string(), true), ("cd".to_string(), false)]
        );
    }
}

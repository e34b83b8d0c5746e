//! Helpers for consumers of an [`EventReader`].

use crate::error::{ReadError, ReadResult};
use crate::events::{Event, EventContentType, EventTopologyType, LiteralContentAssembler};
use crate::reader::EventReader;

/// Consumes events up to and including the END event closing the element whose
/// START was the last event read.
///
/// Nested subtrees are skipped with a depth counter, so arbitrarily deep
/// documents do not grow the call stack.
pub fn reach_element_end<R: EventReader + ?Sized>(reader: &mut R) -> ReadResult<()> {
    let mut depth = 1usize;
    while depth > 0 {
        match reader.next_event()?.topology_type() {
            EventTopologyType::Start => depth += 1,
            EventTopologyType::End => depth -= 1,
            EventTopologyType::Sole => {}
        }
    }
    Ok(())
}

/// Reads the content of a literal metadata element as one string. Must be called
/// directly after its `LITERAL_META` START event was read.
///
/// The string values of all content events are concatenated in order. Content
/// events carrying only an object value contribute its string form. Nested
/// subtrees and comments are skipped. Returns `None` if the element has no
/// content events. The END event of the element is consumed.
///
/// Fails with [`ReadError::UnexpectedSequence`] if a run of continued content
/// events is interrupted by another event or by the end of the source, or if a
/// further content event follows a terminated value.
pub fn read_literal_metadata_content_as_string<R: EventReader + ?Sized>(
    reader: &mut R,
) -> ReadResult<Option<String>> {
    let mut assembler = LiteralContentAssembler::new();
    loop {
        let event = reader.next_event().map_err(|err| match err {
            ReadError::EndOfStream | ReadError::PrematureEnd { .. } => {
                ReadError::UnexpectedSequence(
                    "The source ended inside a literal metadata element".to_string(),
                )
            }
            other => other,
        })?;
        match event {
            Event::End(EventContentType::LiteralMeta) => return Ok(assembler.finish()?),
            Event::LiteralMetaContent(content) => assembler.push(&content)?,
            other => {
                assembler.interrupt()?;
                if other.is_start() {
                    reach_element_end(reader)?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{
        CommentEvent, LabeledIdEvent, LinkedLabeledIdEvent, LiteralMetadataContentEvent,
        LiteralMetadataEvent, ObjectValue, SequenceTokensEvent,
    };
    use crate::reader::list_reader;

    use proptest::prelude::*;

    fn literal_start() -> Event {
        LiteralMetadataEvent::simple("meta0", "Title").into()
    }

    fn wrapped(content: Vec<Event>) -> Vec<Event> {
        let mut events = vec![Event::document_start(), literal_start()];
        events.extend(content);
        events.push(Event::end(EventContentType::LiteralMeta));
        events.push(Event::end(EventContentType::Document));
        events
    }

    fn read_content(content: Vec<Event>) -> ReadResult<Option<String>> {
        let mut reader = list_reader(wrapped(content));
        reader.next_event()?;
        reader.next_event()?;
        read_literal_metadata_content_as_string(&mut reader)
    }

    #[test]
    fn test_reach_element_end_skips_nested_subtree() {
        let mut reader = list_reader(vec![
            Event::document_start(),
            LabeledIdEvent::new(EventContentType::Tree, "tree0", None).into(),
            LinkedLabeledIdEvent::new(EventContentType::Node, "node1", None, None).into(),
            literal_start(),
            Event::end(EventContentType::LiteralMeta),
            Event::end(EventContentType::Node),
            Event::end(EventContentType::Tree),
            Event::end(EventContentType::Document),
        ]);
        reader.next_event().unwrap();
        reader.next_event().unwrap();
        reach_element_end(&mut reader).unwrap();
        assert_eq!(
            reader.previous_event(),
            Some(&Event::end(EventContentType::Tree))
        );
        assert_eq!(
            reader.next_event().unwrap(),
            Event::end(EventContentType::Document)
        );
    }

    #[test]
    fn test_content_parts_are_concatenated() {
        let value = read_content(vec![
            LiteralMetadataContentEvent::from_string("ab", true).into(),
            LiteralMetadataContentEvent::from_string("cd", true).into(),
            LiteralMetadataContentEvent::from_string("ef", false).into(),
        ])
        .unwrap();
        assert_eq!(value.as_deref(), Some("abcdef"));
    }

    #[test]
    fn test_empty_literal_gives_none() {
        assert_eq!(read_content(Vec::new()).unwrap(), None);
    }

    #[test]
    fn test_object_value_is_rendered() {
        let value = read_content(vec![LiteralMetadataContentEvent::from_object(
            ObjectValue::Integer(42),
            None,
        )
        .into()])
        .unwrap();
        assert_eq!(value.as_deref(), Some("42"));
    }

    #[test]
    fn test_comments_and_nested_subtrees_are_skipped() {
        let value = read_content(vec![
            CommentEvent::new("ignored", false).into(),
            literal_start(),
            LiteralMetadataContentEvent::from_string("nested", false).into(),
            Event::end(EventContentType::LiteralMeta),
            LiteralMetadataContentEvent::from_string("outer", false).into(),
        ])
        .unwrap();
        assert_eq!(value.as_deref(), Some("outer"));
    }

    #[test]
    fn test_interrupted_run_is_rejected() {
        let result = read_content(vec![
            LiteralMetadataContentEvent::from_string("ab", true).into(),
            CommentEvent::new("breaks the run", false).into(),
            LiteralMetadataContentEvent::from_string("cd", false).into(),
        ]);
        assert!(matches!(result, Err(ReadError::UnexpectedSequence(_))));
    }

    #[test]
    fn test_content_after_termination_is_rejected() {
        let result = read_content(vec![
            LiteralMetadataContentEvent::from_string("ab", false).into(),
            LiteralMetadataContentEvent::from_string("cd", false).into(),
        ]);
        assert!(matches!(result, Err(ReadError::UnexpectedSequence(_))));
    }

    #[test]
    fn test_source_ending_inside_run_is_rejected() {
        let mut reader = list_reader(vec![
            Event::document_start(),
            literal_start(),
            LiteralMetadataContentEvent::from_string("ab", true).into(),
        ]);
        reader.next_event().unwrap();
        reader.next_event().unwrap();
        let result = read_literal_metadata_content_as_string(&mut reader);
        assert!(matches!(result, Err(ReadError::UnexpectedSequence(_))));
    }

    /// Builds a random well-nested subtree below a TREE element.
    fn nested(depth: usize, widths: &[usize], out: &mut Vec<Event>) {
        if depth >= widths.len() {
            out.push(SequenceTokensEvent::new(vec!["A".into()]).into());
            return;
        }
        for _ in 0..widths[depth] {
            out.push(LinkedLabeledIdEvent::new(EventContentType::Node, "n", None, None).into());
            nested(depth + 1, widths, out);
            out.push(Event::end(EventContentType::Node));
        }
    }

    proptest! {
        #[test]
        fn prop_reach_element_end_returns_after_matching_end(
            widths in proptest::collection::vec(1usize..3, 0..6),
        ) {
            let mut events = vec![
                Event::document_start(),
                LabeledIdEvent::new(EventContentType::Tree, "tree0", None).into(),
            ];
            nested(0, &widths, &mut events);
            events.push(Event::end(EventContentType::Tree));
            events.push(Event::end(EventContentType::Document));

            let mut reader = list_reader(events);
            reader.next_event().unwrap();
            reader.next_event().unwrap();
            reach_element_end(&mut reader).unwrap();
            prop_assert_eq!(reader.previous_event(), Some(&Event::end(EventContentType::Tree)));
            prop_assert_eq!(reader.parent_information().len(), 1);
        }

        #[test]
        fn prop_continued_parts_concatenate(parts in proptest::collection::vec("[a-z]{0,5}", 1..8)) {
            let last = parts.len() - 1;
            let content: Vec<Event> = parts
                .iter()
                .enumerate()
                .map(|(i, part)| LiteralMetadataContentEvent::from_string(part.clone(), i < last).into())
                .collect();
            let value = read_content(content).unwrap();
            prop_assert_eq!(value, Some(parts.concat()));
        }
    }
}

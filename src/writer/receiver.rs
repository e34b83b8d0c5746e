//! The validating receiver base shared by all writers.

use crate::error::{WriteError, WriteResult};
use crate::events::{
    CommentEvent, Event, EventContentType, EventTopologyType, LiteralContentAssembler,
    LiteralMetadataEvent, ResourceMetadataEvent,
};
use crate::parent::ParentEventInformation;
use crate::writer::{EventReceiver, IgnoredCounts};

/// State a [`BasicEventReceiver`] keeps for its hooks.
#[derive(Debug, Default)]
pub struct ReceiverState {
    parents: ParentEventInformation,
    ignored: IgnoredCounts,
    literal: Option<LiteralMetadataEvent>,
    literal_content: LiteralContentAssembler,
    comment: String,
    comment_open: bool,
}

impl ReceiverState {
    /// START events enclosing the event currently handled.
    pub fn parents(&self) -> &ParentEventInformation {
        &self.parents
    }

    pub fn ignored(&self) -> IgnoredCounts {
        self.ignored
    }

    pub fn ignored_mut(&mut self) -> &mut IgnoredCounts {
        &mut self.ignored
    }

    /// The error for an event that is not valid at the current position.
    pub fn illegal(&self, event: &Event) -> WriteError {
        WriteError::IllegalEvent {
            event: event.event_type(),
            parent: self.parents.direct_parent().map(Event::event_type),
        }
    }
}

/// Format specific reactions of a [`BasicEventReceiver`].
///
/// The defaults ignore metadata and comments and count them, and reject every
/// other event.
pub trait ReceiverHooks {
    fn handle_literal_meta_start(
        &mut self,
        state: &mut ReceiverState,
        event: &LiteralMetadataEvent,
    ) -> WriteResult<()> {
        let _ = event;
        state.ignored.literal_metadata += 1;
        Ok(())
    }

    /// Called at the END of a literal metadata element with its assembled value.
    fn handle_literal_meta_end(
        &mut self,
        state: &mut ReceiverState,
        event: &LiteralMetadataEvent,
        value: Option<String>,
    ) -> WriteResult<()> {
        let _ = (state, event, value);
        Ok(())
    }

    fn handle_resource_meta_start(
        &mut self,
        state: &mut ReceiverState,
        event: &ResourceMetadataEvent,
    ) -> WriteResult<()> {
        let _ = event;
        state.ignored.resource_metadata += 1;
        Ok(())
    }

    /// Called once per complete comment, with continued parts joined.
    fn handle_comment(&mut self, state: &mut ReceiverState, content: String) -> WriteResult<()> {
        let _ = content;
        state.ignored.comments += 1;
        Ok(())
    }

    /// Handles all other events seen at the top level of the receiver.
    fn do_add(&mut self, state: &mut ReceiverState, event: Event) -> WriteResult<bool> {
        Err(state.illegal(&event))
    }
}

/// Receiver that checks the nesting of incoming events and dispatches them to its
/// hooks.
///
/// * END events must close the innermost open element.
/// * Literal metadata contains only content events and comments.
/// * Literal metadata content is only valid directly under literal metadata.
/// * A comment must not split a run of continued literal content.
/// * Resource metadata is valid anywhere outside literal metadata.
/// * Everything else is passed to [`ReceiverHooks::do_add`] when no element is
///   open, and rejected otherwise.
#[derive(Debug, Default)]
pub struct BasicEventReceiver<H> {
    state: ReceiverState,
    hooks: H,
}

impl<H: ReceiverHooks> BasicEventReceiver<H> {
    pub fn new(hooks: H) -> Self {
        Self {
            state: ReceiverState::default(),
            hooks,
        }
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn ignored(&self) -> IgnoredCounts {
        self.state.ignored
    }

    /// Checks that all elements were closed and returns the hooks.
    pub fn finish(mut self) -> WriteResult<(H, IgnoredCounts)> {
        if let Some(open) = self.state.parents.direct_parent() {
            return Err(WriteError::InconsistentAdapterData(format!(
                "The element {} was not closed",
                open.event_type()
            )));
        }
        self.flush_comment_run()?;
        Ok((self.hooks, self.state.ignored))
    }

    fn flush_comment_run(&mut self) -> WriteResult<()> {
        if self.state.comment_open {
            return Err(crate::error::EventError::UnterminatedContinuation.into());
        }
        Ok(())
    }

    fn add_comment(&mut self, comment: CommentEvent) -> WriteResult<bool> {
        self.state.comment.push_str(&comment.content);
        self.state.comment_open = comment.continued_in_next_event;
        if !comment.continued_in_next_event {
            let content = std::mem::take(&mut self.state.comment);
            self.hooks.handle_comment(&mut self.state, content)?;
        }
        Ok(true)
    }
}

impl<H: ReceiverHooks> EventReceiver for BasicEventReceiver<H> {
    fn add(&mut self, event: Event) -> WriteResult<bool> {
        if let Event::Comment(comment) = event {
            if self.state.literal.is_some() {
                self.state.literal_content.interrupt()?;
            }
            return self.add_comment(comment);
        }
        self.flush_comment_run()?;

        let content_type = event.content_type();
        let topology = event.topology_type();
        if topology == EventTopologyType::End {
            if self.state.parents.direct_parent_content_type() != Some(content_type) {
                return Err(self.state.illegal(&event));
            }
            self.state.parents.pop();
        } else if self.state.literal.is_some() && content_type != EventContentType::LiteralMetaContent {
            self.state.literal_content.interrupt()?;
            return Err(self.state.illegal(&event));
        }
        let parent = self.state.parents.direct_parent_content_type();

        let result = match event {
            Event::ResourceMeta(ref resource) => {
                self.hooks.handle_resource_meta_start(&mut self.state, resource)?;
                true
            }
            Event::End(EventContentType::ResourceMeta) => true,
            Event::LiteralMeta(ref literal) => {
                if parent == Some(EventContentType::LiteralMeta) {
                    return Err(self.state.illegal(&event));
                }
                self.hooks.handle_literal_meta_start(&mut self.state, literal)?;
                self.state.literal = Some(literal.clone());
                self.state.literal_content.reset();
                true
            }
            Event::End(EventContentType::LiteralMeta) => {
                let value = self.state.literal_content.finish()?;
                if let Some(literal) = self.state.literal.take() {
                    self.hooks
                        .handle_literal_meta_end(&mut self.state, &literal, value)?;
                }
                true
            }
            Event::LiteralMetaContent(ref content) => {
                if parent != Some(EventContentType::LiteralMeta) {
                    return Err(self.state.illegal(&event));
                }
                self.state.literal_content.push(content)?;
                true
            }
            other if parent.is_none() => {
                let pushed = (topology == EventTopologyType::Start).then(|| other.clone());
                let result = self.hooks.do_add(&mut self.state, other)?;
                if let Some(start) = pushed {
                    self.state.parents.push(start);
                }
                return Ok(result);
            }
            Event::End(_) => true,
            other => return Err(self.state.illegal(&other)),
        };
        if topology == EventTopologyType::Start {
            self.state.parents.push(event);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{
        LiteralMetadataContentEvent, SequenceTokensEvent, SingleSequenceTokenEvent,
    };

    #[derive(Default)]
    struct TokenCollector {
        tokens: Vec<String>,
        literals: Vec<(String, Option<String>)>,
    }

    impl ReceiverHooks for TokenCollector {
        fn handle_literal_meta_end(
            &mut self,
            _state: &mut ReceiverState,
            event: &LiteralMetadataEvent,
            value: Option<String>,
        ) -> WriteResult<()> {
            self.literals.push((event.predicate.key().into_owned(), value));
            Ok(())
        }

        fn do_add(&mut self, state: &mut ReceiverState, event: Event) -> WriteResult<bool> {
            match event {
                Event::SequenceTokens(tokens) => self.tokens.extend(tokens.tokens),
                Event::SingleSequenceToken(token) => self.tokens.push(token.token),
                Event::End(EventContentType::SingleSequenceToken) => {}
                other => return Err(state.illegal(&other)),
            }
            Ok(true)
        }
    }

    fn literal(key: &str) -> Event {
        LiteralMetadataEvent::simple("meta0", key).into()
    }

    #[test]
    fn test_tokens_and_metadata() {
        let mut receiver = BasicEventReceiver::new(TokenCollector::default());
        receiver
            .add(SequenceTokensEvent::new(vec!["A".into(), "C".into()]).into())
            .unwrap();
        receiver.add(literal("note")).unwrap();
        receiver
            .add(LiteralMetadataContentEvent::from_string("x", true).into())
            .unwrap();
        receiver
            .add(LiteralMetadataContentEvent::from_string("y", false).into())
            .unwrap();
        receiver.add(Event::end(EventContentType::LiteralMeta)).unwrap();
        receiver
            .add(SingleSequenceTokenEvent::new(None, "G").into())
            .unwrap();
        receiver.add(literal("quality")).unwrap();
        receiver.add(Event::end(EventContentType::LiteralMeta)).unwrap();
        receiver
            .add(Event::end(EventContentType::SingleSequenceToken))
            .unwrap();
        receiver.add(CommentEvent::new("part", true).into()).unwrap();
        receiver.add(CommentEvent::new(" two", false).into()).unwrap();

        let (hooks, ignored) = receiver.finish().unwrap();
        assert_eq!(hooks.tokens, vec!["A", "C", "G"]);
        assert_eq!(
            hooks.literals,
            vec![
                ("note".to_string(), Some("xy".to_string())),
                ("quality".to_string(), None)
            ]
        );
        assert_eq!(ignored.literal_metadata, 2);
        assert_eq!(ignored.comments, 1);
    }

    #[test]
    fn test_content_outside_literal_is_illegal() {
        let mut receiver = BasicEventReceiver::new(TokenCollector::default());
        let err = receiver
            .add(LiteralMetadataContentEvent::from_string("x", false).into())
            .unwrap_err();
        assert!(matches!(err, WriteError::IllegalEvent { parent: None, .. }));
    }

    #[test]
    fn test_nested_literal_is_illegal() {
        let mut receiver = BasicEventReceiver::new(TokenCollector::default());
        receiver.add(literal("outer")).unwrap();
        let err = receiver.add(literal("inner")).unwrap_err();
        assert!(matches!(err, WriteError::IllegalEvent { .. }));
    }

    #[test]
    fn test_resource_metadata_inside_literal_is_illegal() {
        let mut receiver = BasicEventReceiver::new(TokenCollector::default());
        receiver.add(literal("outer")).unwrap();
        receiver
            .add(LiteralMetadataContentEvent::from_string("value", false).into())
            .unwrap();
        let resource = ResourceMetadataEvent::new(
            "meta1",
            None,
            crate::events::UriOrStringIdentifier::from_string("related"),
        );
        let err = receiver.add(resource.into()).unwrap_err();
        assert!(matches!(
            err,
            WriteError::IllegalEvent {
                parent: Some(crate::events::EventType {
                    content_type: EventContentType::LiteralMeta,
                    ..
                }),
                ..
            }
        ));
        assert!(receiver.hooks().literals.is_empty());
    }

    #[test]
    fn test_literal_after_resource_inside_literal_keeps_outer_value() {
        let mut receiver = BasicEventReceiver::new(TokenCollector::default());
        receiver.add(literal("outer")).unwrap();
        receiver
            .add(LiteralMetadataContentEvent::from_string("kept", false).into())
            .unwrap();
        assert!(receiver.add(literal("inner")).is_err());
        receiver.add(Event::end(EventContentType::LiteralMeta)).unwrap();
        let (hooks, _) = receiver.finish().unwrap();
        assert_eq!(
            hooks.literals,
            vec![("outer".to_string(), Some("kept".to_string()))]
        );
    }

    #[test]
    fn test_comment_inside_continued_literal_run_is_rejected() {
        let mut receiver = BasicEventReceiver::new(TokenCollector::default());
        receiver.add(literal("note")).unwrap();
        receiver
            .add(LiteralMetadataContentEvent::from_string("ab", true).into())
            .unwrap();
        assert!(matches!(
            receiver.add(CommentEvent::new("c", false).into()),
            Err(WriteError::Event(_))
        ));
    }

    #[test]
    fn test_comment_after_terminated_literal_content_is_accepted() {
        let mut receiver = BasicEventReceiver::new(TokenCollector::default());
        receiver.add(literal("note")).unwrap();
        receiver
            .add(LiteralMetadataContentEvent::from_string("ab", false).into())
            .unwrap();
        receiver.add(CommentEvent::new("c", false).into()).unwrap();
        receiver.add(Event::end(EventContentType::LiteralMeta)).unwrap();
        let (hooks, ignored) = receiver.finish().unwrap();
        assert_eq!(hooks.literals, vec![("note".to_string(), Some("ab".to_string()))]);
        assert_eq!(ignored.comments, 1);
    }

    #[test]
    fn test_mismatched_end_is_illegal() {
        let mut receiver = BasicEventReceiver::new(TokenCollector::default());
        receiver.add(literal("outer")).unwrap();
        assert!(receiver.add(Event::end(EventContentType::Sequence)).is_err());
    }

    #[test]
    fn test_tokens_below_open_element_are_illegal() {
        let mut receiver = BasicEventReceiver::new(TokenCollector::default());
        receiver
            .add(SingleSequenceTokenEvent::new(None, "G").into())
            .unwrap();
        let err = receiver
            .add(SequenceTokensEvent::new(vec!["A".into()]).into())
            .unwrap_err();
        assert!(matches!(err, WriteError::IllegalEvent { parent: Some(_), .. }));
    }

    #[test]
    fn test_interrupted_literal_content_is_rejected() {
        let mut receiver = BasicEventReceiver::new(TokenCollector::default());
        receiver.add(literal("outer")).unwrap();
        receiver
            .add(LiteralMetadataContentEvent::from_string("x", true).into())
            .unwrap();
        assert!(matches!(
            receiver.add(Event::end(EventContentType::LiteralMeta)),
            Err(WriteError::Event(_))
        ));
    }

    #[test]
    fn test_unfinished_element_is_reported() {
        let mut receiver = BasicEventReceiver::new(TokenCollector::default());
        receiver.add(literal("outer")).unwrap();
        assert!(matches!(
            receiver.finish(),
            Err(WriteError::InconsistentAdapterData(_))
        ));
    }
}

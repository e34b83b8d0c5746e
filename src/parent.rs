//! Tracking of the open START events above the current position of a stream.

use crate::events::{Event, EventContentType, EventTopologyType, EventType};

/// An END event did not match the innermost open element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructureViolation {
    pub event: EventType,
    pub parent: Option<EventType>,
}

/// Stack of the START events enclosing the current event.
///
/// Index 0 of [`parent_from_top`](Self::parent_from_top) is the outermost element,
/// index 0 of [`parent_from_bottom`](Self::parent_from_bottom) the direct parent.
#[derive(Debug, Clone, Default)]
pub struct ParentEventInformation {
    parents: Vec<Event>,
}

impl ParentEventInformation {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, event: Event) {
        self.parents.push(event);
    }

    pub(crate) fn pop(&mut self) -> Option<Event> {
        self.parents.pop()
    }

    pub(crate) fn clear(&mut self) {
        self.parents.clear();
    }

    /// Updates the stack for `event`: START events are pushed, END events must
    /// close the direct parent and pop it.
    pub fn track(&mut self, event: &Event) -> Result<(), StructureViolation> {
        match event.topology_type() {
            EventTopologyType::Start => self.push(event.clone()),
            EventTopologyType::End => {
                if self.direct_parent_content_type() != Some(event.content_type()) {
                    return Err(StructureViolation {
                        event: event.event_type(),
                        parent: self.direct_parent().map(Event::event_type),
                    });
                }
                self.pop();
            }
            EventTopologyType::Sole => {}
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn direct_parent(&self) -> Option<&Event> {
        self.parents.last()
    }

    pub fn direct_parent_content_type(&self) -> Option<EventContentType> {
        self.direct_parent().map(Event::content_type)
    }

    /// Parent `index` levels above the direct parent.
    pub fn parent_from_bottom(&self, index: usize) -> Option<&Event> {
        self.parents.iter().rev().nth(index)
    }

    /// Parent at depth `index` counted from the outermost element.
    pub fn parent_from_top(&self, index: usize) -> Option<&Event> {
        self.parents.get(index)
    }

    /// Returns `true` if any enclosing element has the given content type.
    pub fn contains(&self, content_type: EventContentType) -> bool {
        self.parents
            .iter()
            .any(|parent| parent.content_type() == content_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.parents.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{LabeledIdEvent, LinkedLabeledIdEvent};

    fn alignment() -> Event {
        LinkedLabeledIdEvent::new(EventContentType::Alignment, "matrix0", None, None).into()
    }

    #[test]
    fn test_push_and_pop_through_track() {
        let mut parents = ParentEventInformation::new();
        parents.track(&Event::document_start()).unwrap();
        parents.track(&alignment()).unwrap();

        assert_eq!(parents.len(), 2);
        assert_eq!(
            parents.direct_parent_content_type(),
            Some(EventContentType::Alignment)
        );
        assert_eq!(
            parents.parent_from_top(0).map(Event::content_type),
            Some(EventContentType::Document)
        );
        assert_eq!(
            parents.parent_from_bottom(1).map(Event::content_type),
            Some(EventContentType::Document)
        );
        assert!(parents.contains(EventContentType::Document));

        parents.track(&Event::end(EventContentType::Alignment)).unwrap();
        parents.track(&Event::end(EventContentType::Document)).unwrap();
        assert!(parents.is_empty());
    }

    #[test]
    fn test_mismatched_end_is_rejected() {
        let mut parents = ParentEventInformation::new();
        parents.track(&Event::document_start()).unwrap();
        let tree: Event = LabeledIdEvent::new(EventContentType::Tree, "tree0", None).into();
        parents.track(&tree).unwrap();

        let violation = parents
            .track(&Event::end(EventContentType::Document))
            .unwrap_err();
        assert_eq!(violation.event, EventType::end(EventContentType::Document));
        assert_eq!(
            violation.parent,
            Some(EventType::start(EventContentType::Tree))
        );
        assert_eq!(parents.len(), 2);
    }

    #[test]
    fn test_end_on_empty_stack() {
        let mut parents = ParentEventInformation::new();
        let violation = parents
            .track(&Event::end(EventContentType::Node))
            .unwrap_err();
        assert_eq!(violation.parent, None);
    }
}

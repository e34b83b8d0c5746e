//! Push-mode delivery of reader events to listeners.

use crate::error::ReadResult;
use crate::events::Event;
use crate::parent::ParentEventInformation;
use crate::reader::EventReader;

/// Receives the events of a document in push mode.
pub trait EventListener {
    /// Called once per event. `parents` holds the elements enclosing `event`,
    /// excluding `event` itself.
    fn process_event(&mut self, parents: &ParentEventInformation, event: &Event) -> ReadResult<()>;
}

impl<F> EventListener for F
where
    F: FnMut(&ParentEventInformation, &Event) -> ReadResult<()>,
{
    fn process_event(&mut self, parents: &ParentEventInformation, event: &Event) -> ReadResult<()> {
        self(parents, event)
    }
}

/// Drains a reader and hands every event to all registered listeners.
#[derive(Default)]
pub struct EventForwarder<'l> {
    listeners: Vec<&'l mut dyn EventListener>,
    parents: ParentEventInformation,
}

impl<'l> EventForwarder<'l> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: &'l mut dyn EventListener) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Reads all remaining events of `reader` and forwards them. Stops at the first
    /// error of the reader or a listener.
    pub fn read_all<R: EventReader + ?Sized>(&mut self, reader: &mut R) -> ReadResult<()> {
        while reader.has_next_event()? {
            let event = reader.next_event()?;
            if event.is_end() {
                self.parents.pop();
            }
            for listener in self.listeners.iter_mut() {
                listener.process_event(&self.parents, &event)?;
            }
            if event.is_start() {
                self.parents.push(event);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventContentType, LinkedLabeledIdEvent, SequenceTokensEvent};
    use crate::reader::list_reader;

    #[test]
    fn test_listeners_see_parents_of_each_event() {
        let mut reader = list_reader(vec![
            Event::document_start(),
            LinkedLabeledIdEvent::new(EventContentType::Alignment, "matrix0", None, None).into(),
            SequenceTokensEvent::new(vec!["A".into()]).into(),
            Event::end(EventContentType::Alignment),
            Event::end(EventContentType::Document),
        ]);

        let mut depths = Vec::new();
        let mut count = 0usize;
        {
            let mut record = |parents: &ParentEventInformation, _: &Event| -> ReadResult<()> {
                depths.push(parents.len());
                Ok(())
            };
            let mut counter = |_: &ParentEventInformation, _: &Event| -> ReadResult<()> {
                count += 1;
                Ok(())
            };
            let mut forwarder = EventForwarder::new();
            forwarder.add_listener(&mut record);
            forwarder.add_listener(&mut counter);
            assert_eq!(forwarder.listener_count(), 2);
            forwarder.read_all(&mut reader).unwrap();
        }
        assert_eq!(depths, vec![0, 1, 2, 1, 0]);
        assert_eq!(count, 5);
    }
}

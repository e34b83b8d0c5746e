//! Pull-based event readers.
//!
//! Every format reader is an [`EventStream`] over a format specific
//! [`EventProducer`]. The stream owns the one-event lookahead, remembers the
//! previously returned events and checks that START and END events pair up, so
//! producers only have to turn their source into events.

pub mod forwarder;
pub mod text;
pub mod tokens;
pub mod utils;

use std::collections::VecDeque;

use crate::error::{ReadError, ReadResult};
use crate::events::{Event, EventContentType, EventType};
use crate::parent::ParentEventInformation;

/// Pull interface of all readers.
pub trait EventReader {
    /// ID of the format this reader parses.
    fn format_id(&self) -> &'static str;

    /// Returns `true` while further events are available. Calling it repeatedly
    /// without consuming an event has no further effect.
    fn has_next_event(&mut self) -> ReadResult<bool>;

    /// Returns the next event and advances the stream.
    fn next_event(&mut self) -> ReadResult<Event>;

    /// Returns the next event without consuming it.
    fn peek(&mut self) -> ReadResult<&Event>;

    /// The event most recently returned by [`next_event`](Self::next_event).
    fn previous_event(&self) -> Option<&Event>;

    /// The most recently returned event that was not a comment.
    fn last_non_comment_event(&self) -> Option<&Event>;

    /// START events enclosing the current position.
    fn parent_information(&self) -> &ParentEventInformation;

    /// Releases the source. Closing twice is allowed; reads after closing fail.
    fn close(&mut self) -> ReadResult<()>;

    /// Skips events until one of the given types is found and returns it.
    fn next_of_type(&mut self, types: &[EventType]) -> ReadResult<Option<Event>> {
        while self.has_next_event()? {
            let event = self.next_event()?;
            if types.contains(&event.event_type()) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }
}

/// Turns a format specific source into events.
pub trait EventProducer {
    fn format_id(&self) -> &'static str;

    /// Appends the next events of the source to `queue`, in document order.
    ///
    /// Called whenever the stream has no buffered events left. Returning with
    /// `queue` still empty marks the end of the document.
    fn produce(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()>;

    fn close(&mut self) -> ReadResult<()> {
        Ok(())
    }
}

/// Generic [`EventReader`] driving an [`EventProducer`].
#[derive(Debug)]
pub struct EventStream<P> {
    producer: P,
    upcoming: VecDeque<Event>,
    next: Option<Event>,
    previous: Option<Event>,
    last_non_comment: Option<Event>,
    parents: ParentEventInformation,
    exhausted: bool,
    closed: bool,
}

impl<P: EventProducer> EventStream<P> {
    pub fn new(producer: P) -> Self {
        Self {
            producer,
            upcoming: VecDeque::new(),
            next: None,
            previous: None,
            last_non_comment: None,
            parents: ParentEventInformation::new(),
            exhausted: false,
            closed: false,
        }
    }

    pub fn producer(&self) -> &P {
        &self.producer
    }

    fn ensure_next(&mut self) -> ReadResult<()> {
        if self.closed {
            return Err(ReadError::Closed);
        }
        if self.next.is_some() || self.exhausted {
            return Ok(());
        }
        if self.upcoming.is_empty() {
            self.producer.produce(&mut self.upcoming)?;
        }
        match self.upcoming.pop_front() {
            Some(event) => self.next = Some(event),
            None => {
                self.exhausted = true;
                log::debug!("{} reader reached the end of its source", self.producer.format_id());
            }
        }
        Ok(())
    }

    /// Only a DOCUMENT START may open the stream and nothing may follow its END.
    fn check_root(&self, event: &Event) -> ReadResult<()> {
        if !self.parents.is_empty() {
            return Ok(());
        }
        let opens_document =
            self.previous.is_none() && matches!(event, Event::Start(EventContentType::Document));
        if opens_document {
            Ok(())
        } else {
            Err(ReadError::Structure {
                event: event.event_type(),
                parent: None,
            })
        }
    }

    fn check_complete(&self) -> ReadResult<()> {
        match self.parents.direct_parent() {
            Some(open) if self.exhausted && self.next.is_none() => Err(ReadError::PrematureEnd {
                open: open.event_type(),
            }),
            _ => Ok(()),
        }
    }
}

impl<P: EventProducer> EventReader for EventStream<P> {
    fn format_id(&self) -> &'static str {
        self.producer.format_id()
    }

    fn has_next_event(&mut self) -> ReadResult<bool> {
        self.ensure_next()?;
        self.check_complete()?;
        Ok(self.next.is_some())
    }

    fn next_event(&mut self) -> ReadResult<Event> {
        self.ensure_next()?;
        self.check_complete()?;
        let event = self.next.take().ok_or(ReadError::EndOfStream)?;
        self.check_root(&event)?;
        self.parents.track(&event)?;
        if !event.is_comment() {
            self.last_non_comment = Some(event.clone());
        }
        self.previous = Some(event.clone());
        Ok(event)
    }

    fn peek(&mut self) -> ReadResult<&Event> {
        self.ensure_next()?;
        self.check_complete()?;
        self.next.as_ref().ok_or(ReadError::EndOfStream)
    }

    fn previous_event(&self) -> Option<&Event> {
        self.previous.as_ref()
    }

    fn last_non_comment_event(&self) -> Option<&Event> {
        self.last_non_comment.as_ref()
    }

    fn parent_information(&self) -> &ParentEventInformation {
        &self.parents
    }

    fn close(&mut self) -> ReadResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.upcoming.clear();
        self.next = None;
        self.parents.clear();
        self.producer.close()
    }
}

/// Iterator view over the remaining events of a reader.
pub struct Events<'r, R: ?Sized> {
    reader: &'r mut R,
    failed: bool,
}

/// Iterates the remaining events of `reader`. Iteration stops after the first
/// error.
pub fn events<R: EventReader + ?Sized>(reader: &mut R) -> Events<'_, R> {
    Events {
        reader,
        failed: false,
    }
}

impl<R: EventReader + ?Sized> Iterator for Events<'_, R> {
    type Item = ReadResult<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = match self.reader.has_next_event() {
            Ok(true) => self.reader.next_event(),
            Ok(false) => return None,
            Err(err) => Err(err),
        };
        self.failed = result.is_err();
        Some(result)
    }
}

/// Producer replaying a fixed list of events. Used to read stored documents and in
/// tests.
#[derive(Debug, Clone, Default)]
pub struct ListEventProducer {
    events: VecDeque<Event>,
}

impl ListEventProducer {
    pub fn new(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }
}

impl EventProducer for ListEventProducer {
    fn format_id(&self) -> &'static str {
        "events"
    }

    fn produce(&mut self, queue: &mut VecDeque<Event>) -> ReadResult<()> {
        queue.extend(self.events.drain(..));
        Ok(())
    }
}

/// Reader over a fixed list of events.
pub fn list_reader(events: impl IntoIterator<Item = Event>) -> EventStream<ListEventProducer> {
    EventStream::new(ListEventProducer::new(events))
}

//! Event channel implementation using crossbeam-channel.
//!
//! Provides a thread-safe, never-blocking way to send events from the
//! pipeline workers to any front end.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::{AnalyzeEvent, Event, ScanEvent};

/// Sends events from the pipeline.
///
/// This is a thin wrapper around crossbeam's Sender that can be
/// cloned and sent across threads.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Create a new EventSender from a raw crossbeam sender.
    pub fn new(sender: Sender<Event>) -> Self {
        Self { inner: sender }
    }

    /// Send an event. Only a bounded channel passed to
    /// [`EventSender::new`] can block here.
    ///
    /// If the receiver is dropped, the event is silently discarded.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }

    pub fn scan(&self, event: ScanEvent) {
        self.send(Event::Scan(event));
    }

    pub fn analyze(&self, event: AnalyzeEvent) {
        self.send(Event::Analyze(event));
    }
}

/// Receives events from the pipeline.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event is received
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Returns an iterator over received events; ends when every sender is
    /// dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }

    /// Everything already queued
    pub fn drain(&self) -> Vec<Event> {
        self.inner.try_iter().collect()
    }
}

/// Constructor for sender/receiver pairs.
pub struct EventChannel;

impl EventChannel {
    /// Create a new unbounded event channel.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// A no-op event sender for when you don't need notifications.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::StageProgress;
    use std::thread;

    #[test]
    fn events_can_be_sent_across_threads() {
        let (sender, receiver) = EventChannel::new();

        let handle = thread::spawn(move || {
            sender.scan(ScanEvent::Completed {
                total_records: 25,
                cancelled: false,
            });
        });

        handle.join().unwrap();

        match receiver.recv().unwrap() {
            Event::Scan(ScanEvent::Completed { total_records, .. }) => {
                assert_eq!(total_records, 25);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn null_sender_does_not_panic() {
        let sender = null_sender();
        sender.analyze(AnalyzeEvent::Progress(StageProgress::Indeterminate));
    }

    #[test]
    fn iteration_ends_when_senders_drop() {
        let (sender, receiver) = EventChannel::new();
        sender.analyze(AnalyzeEvent::Started { total_records: 1 });
        sender.analyze(AnalyzeEvent::Progress(StageProgress::Percent(100)));
        drop(sender);

        assert_eq!(receiver.iter().count(), 2);
        assert!(receiver.recv().is_none());
    }
}

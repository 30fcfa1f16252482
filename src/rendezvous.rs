//! Single-slot hand-off between an implementor producer and its renderer.
//!
//! Whichever side shows up second triggers delivery. Data registered before a
//! consumer exists is merged into one buffer and handed over in a single call
//! when the consumer attaches; data registered afterwards goes straight to the
//! consumer. Each registered value reaches the consumer exactly once.

use std::fmt;
use thiserror::Error;
use tracing::trace;

/// Values that can absorb a later registration into an earlier buffer.
pub trait Merge {
    fn merge(&mut self, other: Self);
}

/// Receiver side of a rendezvous.
pub type Consumer<T> = Box<dyn FnMut(T) + Send>;

/// Observable progress of one rendezvous.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Empty,
    DataBuffered,
    ConsumerWaiting,
    Delivered,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum RendezvousError {
    #[error("a consumer is already attached")]
    ConsumerAlreadyAttached,
}

enum State<T> {
    Empty,
    Buffered(T),
    Waiting(Consumer<T>),
    Delivered(Consumer<T>),
}

pub struct Rendezvous<T> {
    state: State<T>,
    deliveries: usize,
}

impl<T: Merge> Rendezvous<T> {
    pub fn new() -> Self {
        Self {
            state: State::Empty,
            deliveries: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Empty => Phase::Empty,
            State::Buffered(_) => Phase::DataBuffered,
            State::Waiting(_) => Phase::ConsumerWaiting,
            State::Delivered(_) => Phase::Delivered,
        }
    }

    /// Number of consumer invocations so far.
    pub fn deliveries(&self) -> usize {
        self.deliveries
    }

    /// Buffered data not yet handed to a consumer.
    pub fn pending(&self) -> Option<&T> {
        match &self.state {
            State::Buffered(data) => Some(data),
            _ => None,
        }
    }

    /// Offer data: buffer it, or hand it to the attached consumer right away.
    pub fn register(&mut self, data: T) {
        self.state = match std::mem::replace(&mut self.state, State::Empty) {
            State::Empty => State::Buffered(data),
            State::Buffered(mut pending) => {
                pending.merge(data);
                State::Buffered(pending)
            }
            State::Waiting(consumer) | State::Delivered(consumer) => {
                State::Delivered(self.deliver(consumer, data))
            }
        };
    }

    /// Attach the consumer, flushing anything buffered into it immediately.
    ///
    /// Only one consumer may attach; a second attempt leaves the first in place.
    pub fn consumer_ready(&mut self, consumer: Consumer<T>) -> Result<(), RendezvousError> {
        self.state = match std::mem::replace(&mut self.state, State::Empty) {
            State::Empty => State::Waiting(consumer),
            State::Buffered(pending) => State::Delivered(self.deliver(consumer, pending)),
            attached @ (State::Waiting(_) | State::Delivered(_)) => {
                self.state = attached;
                return Err(RendezvousError::ConsumerAlreadyAttached);
            }
        };
        Ok(())
    }

    fn deliver(&mut self, mut consumer: Consumer<T>, data: T) -> Consumer<T> {
        self.deliveries += 1;
        trace!(delivery = self.deliveries, "rendezvous delivering");
        consumer(data);
        consumer
    }
}

impl<T: Merge> Default for Rendezvous<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Merge> fmt::Debug for Rendezvous<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rendezvous")
            .field("phase", &self.phase())
            .field("deliveries", &self.deliveries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Batch(Vec<u32>);

    impl Merge for Batch {
        fn merge(&mut self, other: Self) {
            self.0.extend(other.0);
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<Batch>>>, Consumer<Batch>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (
            seen,
            Box::new(move |batch| sink.lock().unwrap().push(batch)),
        )
    }

    #[test]
    fn buffered_data_is_flushed_on_attach() {
        let mut rv = Rendezvous::new();
        rv.register(Batch(vec![1, 2]));
        rv.register(Batch(vec![3]));
        assert_eq!(rv.phase(), Phase::DataBuffered);
        assert_eq!(rv.pending(), Some(&Batch(vec![1, 2, 3])));

        let (seen, consumer) = recorder();
        rv.consumer_ready(consumer).unwrap();

        assert_eq!(rv.phase(), Phase::Delivered);
        assert_eq!(*seen.lock().unwrap(), vec![Batch(vec![1, 2, 3])]);
        assert_eq!(rv.deliveries(), 1);
        assert!(rv.pending().is_none());
    }

    #[test]
    fn waiting_consumer_receives_each_registration_once() {
        let mut rv = Rendezvous::new();
        let (seen, consumer) = recorder();
        rv.consumer_ready(consumer).unwrap();
        assert_eq!(rv.phase(), Phase::ConsumerWaiting);
        assert!(seen.lock().unwrap().is_empty());

        rv.register(Batch(vec![7]));
        assert_eq!(*seen.lock().unwrap(), vec![Batch(vec![7])]);
        rv.register(Batch(vec![8]));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Batch(vec![7]), Batch(vec![8])]
        );
        assert_eq!(rv.phase(), Phase::Delivered);
        assert_eq!(rv.deliveries(), 2);
    }

    #[test]
    fn empty_registration_still_reaches_consumer() {
        let mut rv = Rendezvous::new();
        let (seen, consumer) = recorder();
        rv.consumer_ready(consumer).unwrap();
        rv.register(Batch::default());
        assert_eq!(*seen.lock().unwrap(), vec![Batch::default()]);
    }

    #[test]
    fn second_consumer_is_rejected_and_first_kept() {
        let mut rv = Rendezvous::new();
        let (first, consumer) = recorder();
        rv.consumer_ready(consumer).unwrap();
        let (second, other) = recorder();
        assert_eq!(
            rv.consumer_ready(other),
            Err(RendezvousError::ConsumerAlreadyAttached)
        );
        assert_eq!(rv.phase(), Phase::ConsumerWaiting);

        rv.register(Batch(vec![1]));
        assert_eq!(first.lock().unwrap().len(), 1);
        assert!(second.lock().unwrap().is_empty());
    }

    #[test]
    fn data_without_consumer_stays_inert() {
        let mut rv = Rendezvous::new();
        rv.register(Batch(vec![42]));
        assert_eq!(rv.deliveries(), 0);
        assert_eq!(format!("{rv:?}"), "Rendezvous { phase: DataBuffered, deliveries: 0 }");
    }
}

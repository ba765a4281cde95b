//! Messages exchanged between simulated processes.
//!
//! A message is allocated once and shared by reference count between every
//! delivery of it, so gossiping one value to many neighbours never copies the
//! payload. Receivers downcast through [`MessagePtr`].

use std::{any::Any, cmp::Reverse, collections::BinaryHeap, rc::Rc};

use crate::{process_handle::ProcessId, time::EventKey};

/// Marker trait for anything a process can send.
///
/// ```rust
/// use sharesim::Message;
///
/// struct Announce {
///     height: usize,
/// }
///
/// impl Message for Announce {}
/// ```
pub trait Message: Any {}

pub struct MessagePtr(pub Rc<dyn Message>);

impl MessagePtr {
    /// Returns the payload if it has type `T`.
    pub fn try_as<T: 'static>(&self) -> Option<Rc<T>> {
        (self.0.clone() as Rc<dyn Any>).downcast::<T>().ok()
    }
}

#[derive(Clone)]
pub(crate) struct ProcessStep {
    pub(crate) source: ProcessId,
    pub(crate) dest: ProcessId,
    pub(crate) message: Rc<dyn Message>,
}

#[derive(Clone)]
pub(crate) struct RoutedMessage {
    pub(crate) arrival: EventKey,
    pub(crate) step: ProcessStep,
}

impl PartialEq for RoutedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.arrival.eq(&other.arrival)
    }
}

impl Eq for RoutedMessage {}

impl PartialOrd for RoutedMessage {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RoutedMessage {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.arrival.cmp(&other.arrival)
    }
}

pub(crate) type TimePriorityMessageQueue = BinaryHeap<Reverse<RoutedMessage>>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping(u32);
    impl Message for Ping {}

    struct Pong;
    impl Message for Pong {}

    #[test]
    fn downcasts_to_the_sent_type_only() {
        let ptr = MessagePtr(Rc::new(Ping(7)));
        assert_eq!(ptr.try_as::<Ping>().map(|p| p.0), Some(7));
        assert!(ptr.try_as::<Pong>().is_none());
    }
}

//! Per-process timers.
//!
//! Timers are owned by the engine and fire in [`EventKey`] order together with
//! network deliveries, so a process observes its own timers and incoming
//! messages interleaved deterministically.

use std::{cell::RefCell, cmp::Reverse, collections::BinaryHeap, rc::Rc};

use log::debug;

use crate::{
    ProcessId,
    actor::{EventSubmitter, SimulationActor},
    communication::SharesimMessage,
    global,
    nursery::Nursery,
    time::{EventKey, Jiffies},
};

/// Identifier handed out by [`schedule_timer_after`] and passed back to
/// [`ProcessHandle::on_timer`] when the timer fires.
///
/// There is no cancellation: a process that no longer cares about a timer
/// simply ignores its id when it fires.
///
/// [`schedule_timer_after`]: crate::schedule_timer_after
/// [`ProcessHandle::on_timer`]: crate::ProcessHandle::on_timer
pub type TimerId = usize;

pub(crate) fn next_timer_id() -> TimerId {
    global::global_unique_id()
}

pub(crate) type TimerManagerActor = Rc<RefCell<TimerManager>>;

pub(crate) struct TimerManager {
    working_timers: BinaryHeap<Reverse<(EventKey, ProcessId, TimerId)>>,
    nursery: Rc<Nursery>,
}

impl TimerManager {
    pub(crate) fn new(nursery: Rc<Nursery>) -> Self {
        Self {
            working_timers: BinaryHeap::new(),
            nursery,
        }
    }
}

impl SimulationActor for TimerManager {
    fn start(&mut self) {
        // Do nothing
    }

    fn peek_closest(&self) -> Option<EventKey> {
        self.working_timers.peek().map(|entry| entry.0.0)
    }

    fn step(&mut self) {
        let Some(Reverse((_, process_id, timer_id))) = self.working_timers.pop() else {
            return;
        };
        debug!("Firing timer with TimerId {timer_id} for P{process_id}");
        self.nursery
            .deliver(process_id, process_id, SharesimMessage::Timer(timer_id));
    }

    fn pending(&self) -> usize {
        self.working_timers.len()
    }
}

impl EventSubmitter for TimerManager {
    type Event = (ProcessId, TimerId, Jiffies);

    fn submit(&mut self, events: &mut Vec<Self::Event>) {
        events.drain(..).for_each(|(source, timer_id, after)| {
            let key = EventKey::new(global::now() + after);
            self.working_timers.push(Reverse((key, source, timer_id)));
        });
    }
}

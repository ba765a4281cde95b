//! The trait simulated peers implement.

use std::{any::Any, cell::RefCell};

use crate::{MessagePtr, time::timer_manager::TimerId};

/// Identifier of a simulated process. Processes are numbered from 1 in
/// topology order; 0 never names a live process.
pub type ProcessId = usize;

pub(crate) type UniqueProcessHandle = Box<dyn ProcessHandle>;
pub(crate) type MutableProcessHandle = RefCell<UniqueProcessHandle>;

/// A logical participant multiplexed onto the single event loop.
///
/// Handlers never block: they react to one event, optionally send messages
/// and arm timers through the crate-level functions ([`gossip`],
/// [`send_to`], [`schedule_timer_after`]), and return. Everything they emit
/// is queued once the handler returns.
///
/// [`gossip`]: crate::gossip
/// [`send_to`]: crate::send_to
/// [`schedule_timer_after`]: crate::schedule_timer_after
pub trait ProcessHandle: Any {
    // This method requires process to schedule some initial events.
    fn start(&mut self);

    // Deliver message
    fn on_message(&mut self, from: ProcessId, message: MessagePtr);

    // Fire timer with id that was returned on schedule_timer_after() call
    fn on_timer(&mut self, id: TimerId);
}

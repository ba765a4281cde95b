use std::{cell::RefCell, rc::Rc};

use crate::{
    Destination, Message, ProcessId,
    actor::EventSubmitter,
    network::NetworkActor,
    time::{
        Jiffies,
        timer_manager::{TimerId, TimerManagerActor, next_timer_id},
    },
};

pub(crate) struct SimulationAccess {
    process_on_execution: ProcessId,
    scheduled_messages: Vec<(ProcessId, Destination, Rc<dyn Message>)>,
    scheduled_timers: Vec<(ProcessId, TimerId, Jiffies)>,
    network: NetworkActor,
    timers: TimerManagerActor,
}

impl SimulationAccess {
    fn new(network: NetworkActor, timers: TimerManagerActor) -> Self {
        Self {
            process_on_execution: 0,
            scheduled_timers: Vec::new(),
            scheduled_messages: Vec::new(),
            network,
            timers,
        }
    }
}

fn drain_to<T: EventSubmitter>(submitter: &Rc<RefCell<T>>, events: &mut Vec<T::Event>) {
    if !events.is_empty() {
        submitter.borrow_mut().submit(events);
    }
}

impl SimulationAccess {
    fn send(&mut self, destination: Destination, message: Rc<dyn Message>) {
        self.scheduled_messages
            .push((self.process_on_execution, destination, message));
    }

    fn schedule_timer_after(&mut self, after: Jiffies) -> TimerId {
        let timer_id = next_timer_id();
        self.scheduled_timers
            .push((self.process_on_execution, timer_id, after));
        timer_id
    }

    fn drain(&mut self) {
        drain_to(&self.network, &mut self.scheduled_messages);
        drain_to(&self.timers, &mut self.scheduled_timers);
    }
}

// Any actor makes step -> Buffering outcoming events -> Drain them to all actors
// Before any process step actor should ensure correct ProcessId on execution via set_process()
thread_local! {
    static ACCESS_HANDLE: RefCell<Option<SimulationAccess>> = const { RefCell::new(None) };
}

pub(crate) fn drop_access() {
    ACCESS_HANDLE.take();
}

pub(crate) fn setup_access(network: NetworkActor, timers: TimerManagerActor) {
    ACCESS_HANDLE.with_borrow_mut(|access| {
        *access = Some(SimulationAccess::new(network, timers))
    });
}

fn with_access<F, T>(f: F) -> T
where
    F: FnOnce(&mut SimulationAccess) -> T,
{
    ACCESS_HANDLE.with_borrow_mut(|access| f(access.as_mut().expect("Out of simulation context")))
}

pub(crate) fn set_process(id: ProcessId) {
    with_access(|access| access.process_on_execution = id);
}

pub(crate) fn schedule() {
    with_access(|access| access.drain());
}

/// Fires [`ProcessHandle::on_timer`] on the calling process `after` jiffies from now.
///
/// [`ProcessHandle::on_timer`]: crate::ProcessHandle::on_timer
pub fn schedule_timer_after(after: Jiffies) -> TimerId {
    with_access(|access| access.schedule_timer_after(after))
}

/// Sends `message` to every topology neighbour of the calling process except `except`.
///
/// Each copy travels its own edge with an independently drawn delay.
pub fn gossip(message: impl Message + 'static, except: Option<ProcessId>) {
    with_access(|access| access.send(Destination::Neighbours { except }, Rc::new(message)));
}

pub fn send_to(to: ProcessId, message: impl Message + 'static) {
    with_access(|access| access.send(Destination::To(to), Rc::new(message)));
}

/// Id of the process whose handler is currently executing.
pub fn rank() -> ProcessId {
    with_access(|access| access.process_on_execution)
}

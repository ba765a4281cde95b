use std::collections::{BinaryHeap, HashMap};
use std::rc::Rc;

use log::debug;

use crate::ProcessId;
use crate::communication::{ProcessStep, RoutedMessage, TimePriorityMessageQueue};
use crate::global;
use crate::random::SharedRandom;
use crate::time::{EventKey, Jiffies};
use crate::topology::Topology;

pub(crate) struct LatencyQueue {
    topology: Rc<Topology>,
    random: SharedRandom,
    queue: TimePriorityMessageQueue,
    // Latest arrival scheduled on each directed edge; later sends never overtake it
    edge_horizon: HashMap<(ProcessId, ProcessId), Jiffies>,
}

impl LatencyQueue {
    pub(crate) fn new(random: SharedRandom, topology: Rc<Topology>) -> Self {
        Self {
            random,
            topology,
            queue: BinaryHeap::new(),
            edge_horizon: HashMap::new(),
        }
    }

    pub(crate) fn push(&mut self, step: ProcessStep) {
        let edge = (step.source, step.dest);
        let delay = match self.topology.latency(step.source, step.dest) {
            Some(distr) => self.random.borrow_mut().sample(distr),
            None => Jiffies::ZERO,
        };
        let drawn = global::now() + delay;
        let horizon = self.edge_horizon.entry(edge).or_default();
        let arrival = drawn.max(*horizon);
        *horizon = arrival;

        debug!(
            "P{} -> P{}: delay {delay}, arrival {arrival} (drawn {drawn})",
            step.source, step.dest
        );
        self.queue.push(std::cmp::Reverse(RoutedMessage {
            arrival: EventKey::new(arrival),
            step,
        }));
    }

    pub(crate) fn pop(&mut self) -> Option<RoutedMessage> {
        Some(self.queue.pop()?.0)
    }

    pub(crate) fn peek(&self) -> Option<&RoutedMessage> {
        Some(&self.queue.peek()?.0)
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }
}

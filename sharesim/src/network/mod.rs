mod latency;

use std::cell::RefCell;
use std::rc::Rc;

pub(crate) use latency::LatencyQueue;
use log::{debug, warn};

use crate::Destination;
use crate::Message;
use crate::MessagePtr;
use crate::ProcessId;
use crate::actor::EventSubmitter;
use crate::actor::SimulationActor;
use crate::communication::ProcessStep;
use crate::communication::SharesimMessage;
use crate::nursery::Nursery;
use crate::random::SharedRandom;
use crate::time::EventKey;
use crate::topology::Topology;

pub(crate) type NetworkActor = Rc<RefCell<Network>>;

pub(crate) struct Network {
    latency_queue: LatencyQueue,
    topology: Rc<Topology>,
    nursery: Rc<Nursery>,
}

impl Network {
    pub(crate) fn new(random: SharedRandom, topology: Rc<Topology>, nursery: Rc<Nursery>) -> Self {
        Self {
            latency_queue: LatencyQueue::new(random, topology.clone()),
            topology,
            nursery,
        }
    }

    fn submit_single_message(
        &mut self,
        message: Rc<dyn Message>,
        source: ProcessId,
        destination: Destination,
    ) {
        let targets: Vec<ProcessId> = match destination {
            Destination::Neighbours { except } => self
                .topology
                .neighbours(source)
                .iter()
                .copied()
                .filter(|id| Some(*id) != except)
                .collect(),
            Destination::To(to) => {
                if !self.topology.are_neighbours(source, to) {
                    warn!("P{source} sends to P{to} which is not its neighbour");
                }
                vec![to]
            }
        };

        debug!("Submitting message from {source}, targets of the message: {targets:?}");

        targets.into_iter().for_each(|target| {
            self.latency_queue.push(ProcessStep {
                source,
                dest: target,
                message: message.clone(),
            });
        });
    }

    fn execute_process_step(&mut self, step: ProcessStep) {
        self.nursery.deliver(
            step.source,
            step.dest,
            SharesimMessage::NetworkMessage(MessagePtr(step.message)),
        );
    }
}

impl SimulationActor for Network {
    fn start(&mut self) {
        self.nursery.keys().for_each(|id| {
            self.nursery.start_single(*id);
        });
    }

    fn step(&mut self) {
        if let Some(message) = self.latency_queue.pop() {
            self.execute_process_step(message.step);
        }
    }

    fn peek_closest(&self) -> Option<EventKey> {
        self.latency_queue.peek().map(|m| m.arrival)
    }

    fn pending(&self) -> usize {
        self.latency_queue.len()
    }
}

impl EventSubmitter for Network {
    type Event = (ProcessId, Destination, Rc<dyn Message>);

    fn submit(&mut self, events: &mut Vec<Self::Event>) {
        events.drain(..).for_each(|(from, destination, message)| {
            self.submit_single_message(message, from, destination);
        });
    }
}

use std::{cell::Ref, cell::RefCell, rc::Rc};

use log::info;

use crate::{
    ProcessHandle, ProcessId,
    actor::{SharedActor, SimulationActor},
    global,
    network::{Network, NetworkActor},
    nursery::{HandlerMap, Nursery},
    progress::Bar,
    random::SharedRandom,
    time::{EventKey, Jiffies, timer_manager::TimerManager},
    topology::Topology,
};

/// A built simulation: one event loop over a fixed topology of processes.
///
/// The engine keeps its clock and id counters in thread-local state, so a
/// thread runs at most one simulation at a time. Independent simulations can
/// run on separate threads.
pub struct Simulation {
    actors: Vec<SharedActor>,
    network: NetworkActor,
    nursery: Rc<Nursery>,
    topology: Rc<Topology>,
    time_budget: Jiffies,
    progress_bar: Bar,
    undelivered: usize,
    executed: usize,
}

impl Simulation {
    pub(crate) fn new(
        random: SharedRandom,
        time_budget: Jiffies,
        topology: Topology,
        procs: HandlerMap,
    ) -> Self {
        let topology = Rc::new(topology);
        let nursery = Nursery::new(procs);

        let network_actor = Rc::new(RefCell::new(Network::new(
            random,
            topology.clone(),
            nursery.clone(),
        )));

        let timers_actor = Rc::new(RefCell::new(TimerManager::new(nursery.clone())));

        global::setup_access(network_actor.clone(), timers_actor.clone());

        let actors: Vec<SharedActor> = vec![network_actor.clone(), timers_actor];

        Self {
            actors,
            network: network_actor,
            nursery,
            topology,
            time_budget,
            progress_bar: Bar::new(time_budget),
            undelivered: 0,
            executed: 0,
        }
    }

    /// Runs until the next event would fire at or after the time budget.
    ///
    /// Events left in the queues at that point are dropped: in-flight
    /// deliveries are counted in [`Simulation::undelivered`], pending timers
    /// are discarded silently.
    pub fn run(&mut self) {
        self.start();

        loop {
            match self.peek_closest() {
                None => {
                    info!("Event queue drained at {}", global::now());
                    break;
                }
                Some((key, _)) if key.at >= self.time_budget => break,
                Some((key, actor)) => self.step(key, actor),
            }
        }

        global::fast_forward_clock(self.time_budget.max(global::now()));
        self.undelivered = self.network.borrow().pending();

        // For small simulations progress bar is not fullfilling
        self.progress_bar.finish();

        info!(
            "Halted at {}: {} events executed, {} deliveries in flight dropped",
            global::now(),
            self.executed,
            self.undelivered
        );
    }

    pub fn time_budget(&self) -> Jiffies {
        self.time_budget
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Deliveries that were scheduled but had not arrived when the run halted.
    pub fn undelivered(&self) -> usize {
        self.undelivered
    }

    /// Borrows process `id` as `P`, or `None` if it is not a `P`.
    pub fn process<P: ProcessHandle>(&self, id: ProcessId) -> Option<Ref<'_, P>> {
        self.nursery.process::<P>(id)
    }

    /// All processes of type `P` in ascending id order.
    pub fn processes<P: ProcessHandle>(&self) -> impl Iterator<Item = (ProcessId, Ref<'_, P>)> {
        self.nursery
            .keys()
            .filter_map(|id| Some((*id, self.nursery.process::<P>(*id)?)))
    }
}

impl Simulation {
    fn start(&mut self) {
        self.actors.iter_mut().for_each(|actor| {
            actor.borrow_mut().start();
            global::schedule(); // Only after start() to avoid double borrow_mut() of SharedActor
        });
    }

    fn step(&mut self, key: EventKey, actor: SharedActor) {
        global::fast_forward_clock(key.at);
        actor.borrow_mut().step();
        global::schedule(); // Only after step() to avoid double borrow_mut() of SharedActor
        self.executed += 1;
        self.progress_bar.make_progress(key.at.min(self.time_budget));
    }

    fn peek_closest(&self) -> Option<(EventKey, SharedActor)> {
        self.actors
            .iter()
            .filter_map(|actor| Some((actor.borrow().peek_closest()?, actor.clone())))
            .min_by_key(|(key, _)| *key)
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        global::drop_all(); // Clear thread_locals
    }
}

use std::{cell::RefCell, collections::BTreeMap, collections::BTreeSet, fs::File};

use crate::{
    ConfigurationError, Distributions, ProcessHandle, ProcessId, Simulation,
    global,
    process_handle::UniqueProcessHandle,
    random::{RandomSource, Seed, SharedRandom},
    time::Jiffies,
    topology::Topology,
};

fn init_logger(file: Option<File>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        let module_path = record.module_path().unwrap_or("unknown");
        let crate_name = module_path.split("::").next().unwrap_or(module_path);
        use std::io::Write;
        writeln!(buf, "[{}] {}", crate_name, record.args())
    });
    if let Some(file) = file {
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    let _ = builder.try_init();
}

enum Shape {
    RandomRegular { num_nodes: usize, num_neighbours: usize },
    Edges { num_nodes: usize, edges: Vec<(ProcessId, ProcessId)> },
}

/// Everything a node factory gets to know about the node it builds.
pub struct Spawn<'a> {
    pub id: ProcessId,
    pub neighbours: &'a BTreeSet<ProcessId>,
    pub random: SharedRandom,
}

pub struct SimulationBuilder {
    seed: Seed,
    time_budget: Jiffies,
    latency: Distributions,
    shape: Shape,
    log_file: Option<File>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        SimulationBuilder {
            seed: 69,
            time_budget: Jiffies(1_000_000),
            latency: Distributions::Uniform(Jiffies(1), Jiffies(10)),
            shape: Shape::Edges {
                num_nodes: 1,
                edges: Vec::new(),
            },
            log_file: None,
        }
    }
}

impl SimulationBuilder {
    pub fn seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    pub fn time_budget(mut self, time_budget: Jiffies) -> Self {
        self.time_budget = time_budget;
        self
    }

    /// Latency distribution of every edge.
    pub fn latency(mut self, latency: Distributions) -> Self {
        self.latency = latency;
        self
    }

    /// Random `num_neighbours`-regular graph drawn from the run's seed.
    pub fn random_regular(mut self, num_nodes: usize, num_neighbours: usize) -> Self {
        self.shape = Shape::RandomRegular {
            num_nodes,
            num_neighbours,
        };
        self
    }

    pub fn edges(mut self, num_nodes: usize, edges: &[(ProcessId, ProcessId)]) -> Self {
        self.shape = Shape::Edges {
            num_nodes,
            edges: edges.to_vec(),
        };
        self
    }

    /// Routes log records to `file` instead of stderr. Only the first
    /// simulation built in a process installs the logger.
    pub fn log_file(mut self, file: File) -> Self {
        self.log_file = Some(file);
        self
    }

    /// Builds the topology, then one process per node through `spawn`.
    ///
    /// The topology draws from the run's random stream first; factories get
    /// the same stream afterwards.
    pub fn build<P, F>(self, mut spawn: F) -> Result<Simulation, ConfigurationError>
    where
        P: ProcessHandle,
        F: FnMut(Spawn<'_>) -> P,
    {
        init_logger(self.log_file);
        self.latency.validate("latency")?;
        if self.time_budget == Jiffies::ZERO {
            return Err(ConfigurationError::InvalidParameter {
                name: "time_budget",
                reason: "must be at least one jiffy".to_string(),
            });
        }

        // Counters restart so equal configurations replay identically
        global::drop_all();

        let random = RandomSource::new_shared(self.seed);
        let topology = match self.shape {
            Shape::RandomRegular {
                num_nodes,
                num_neighbours,
            } => Topology::random_regular(
                num_nodes,
                num_neighbours,
                self.latency,
                &mut random.borrow_mut(),
            )?,
            Shape::Edges { num_nodes, edges } => {
                Topology::from_edges(num_nodes, edges, self.latency)?
            }
        };

        let mut procs = BTreeMap::new();
        for id in topology.nodes() {
            let handle: UniqueProcessHandle = Box::new(spawn(Spawn {
                id,
                neighbours: topology.neighbours(id),
                random: random.clone(),
            }));
            procs.insert(id, RefCell::new(handle));
        }

        Ok(Simulation::new(random, self.time_budget, topology, procs))
    }
}

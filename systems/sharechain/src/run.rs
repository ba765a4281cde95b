//! Entry point: build the network, run it, classify the outcome.

use std::{collections::BTreeMap, rc::Rc};

use log::{debug, info, warn};
use sharesim::{ConfigurationError, ProcessId, Simulation, SimulationBuilder};

use crate::{
    config::SimulationConfig,
    dag::ShareDag,
    node::ShareNode,
    share::Share,
    stats::{RunStats, StatsCollector},
};

pub struct RunReport {
    pub stats: RunStats,
    /// Final view of every node, for export.
    pub dags: BTreeMap<ProcessId, ShareDag>,
}

/// Runs `num_nodes` nodes on a random `num_neighbours`-regular topology.
pub fn run(
    num_nodes: usize,
    num_neighbours: usize,
    config: &SimulationConfig,
) -> Result<RunReport, ConfigurationError> {
    simulate(
        SimulationBuilder::default().random_regular(num_nodes, num_neighbours),
        config,
    )
}

/// Runs on whatever topology `builder` describes. Seed, run time and
/// latency come from `config`.
pub fn simulate(
    builder: SimulationBuilder,
    config: &SimulationConfig,
) -> Result<RunReport, ConfigurationError> {
    config.validate()?;

    let genesis = Rc::new(Share::genesis());
    let mut sim = builder
        .seed(config.random_seed)
        .time_budget(config.run_time)
        .latency(config.propagation_delay)
        .build(|spawn| {
            let interval = config.node_interval(spawn.id);
            ShareNode::new(spawn, genesis.clone(), interval, config.orphan_timeout)
        })?;

    info!("P2P broadcast communication");
    sim.run();

    Ok(report(&sim, config))
}

fn report(sim: &Simulation, config: &SimulationConfig) -> RunReport {
    let collector = StatsCollector::new(config.reward_interval);
    let mut nodes = Vec::new();
    let mut dags = BTreeMap::new();

    for (id, node) in sim.processes::<ShareNode>() {
        debug!("{:?}", node.dag().topological_order());
        debug!("{:?}", node.dag().edges().collect::<Vec<_>>());

        let stats = collector.collect(&node);
        for warning in &stats.orphaned {
            warn!(
                "node: {} share {} never received parent {} (waiting since {})",
                stats.name, warning.share, warning.missing_parent, warning.since
            );
        }
        info!("{}", stats.summary());
        info!("{:?}", stats.shares_not_rewarded);

        nodes.push(stats);
        dags.insert(id, node.dag().clone());
    }

    RunReport {
        stats: RunStats {
            run_time: sim.time_budget(),
            nodes,
            undelivered: sim.undelivered(),
        },
        dags,
    }
}

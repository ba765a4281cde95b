//! The neighbour graph gossip travels over.
//!
//! Nodes are the process ids `1..=num_nodes`. The relation is symmetric and
//! fixed once built; every edge carries the latency distribution its
//! deliveries draw from, looked up per direction.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use log::{debug, warn};

use crate::{ConfigurationError, Distributions, ProcessId, random::RandomSource};

const K_MAX_ATTEMPTS: usize = 1000;

pub(crate) type LatencyTopology = HashMap<(ProcessId, ProcessId), Distributions>;

#[derive(Clone, Debug)]
pub struct Topology {
    neighbours: BTreeMap<ProcessId, BTreeSet<ProcessId>>,
    latency_topology: LatencyTopology,
}

impl Topology {
    /// Builds a random `num_neighbours`-regular graph over `num_nodes` nodes.
    ///
    /// Uses stub pairing: every node contributes `num_neighbours` stubs, stubs
    /// are shuffled and paired, and pairs that would form a self-loop or a
    /// parallel edge are thrown back for another round. A construction that
    /// can no longer finish restarts from scratch.
    pub fn random_regular(
        num_nodes: usize,
        num_neighbours: usize,
        latency: Distributions,
        random: &mut RandomSource,
    ) -> Result<Self, ConfigurationError> {
        validate_degree(num_nodes, num_neighbours)?;

        let nodes: Vec<ProcessId> = (1..=num_nodes).collect();

        if num_neighbours + 1 == num_nodes {
            let edges = nodes
                .iter()
                .flat_map(|a| nodes.iter().filter(move |b| a < *b).map(move |b| (*a, *b)));
            return Self::from_edges(num_nodes, edges, latency);
        }

        for attempt in 1..=K_MAX_ATTEMPTS {
            if let Some(edges) = try_pairing(&nodes, num_neighbours, random) {
                debug!("Random regular graph built on attempt {attempt}");
                let topology = Self::from_edges(num_nodes, edges, latency)?;
                if !topology.is_connected() {
                    warn!(
                        "Topology with {num_nodes} nodes and degree {num_neighbours} is disconnected, gossip will not reach every node"
                    );
                }
                return Ok(topology);
            }
        }

        Err(ConfigurationError::TopologyConstruction {
            attempts: K_MAX_ATTEMPTS,
        })
    }

    /// Builds a topology from an explicit undirected edge list.
    pub fn from_edges(
        num_nodes: usize,
        edges: impl IntoIterator<Item = (ProcessId, ProcessId)>,
        latency: Distributions,
    ) -> Result<Self, ConfigurationError> {
        if num_nodes == 0 {
            return Err(ConfigurationError::NoNodes);
        }
        let mut neighbours: BTreeMap<ProcessId, BTreeSet<ProcessId>> =
            (1..=num_nodes).map(|id| (id, BTreeSet::new())).collect();
        let mut latency_topology = HashMap::new();

        for (a, b) in edges {
            if a == b || !neighbours.contains_key(&a) || !neighbours.contains_key(&b) {
                return Err(ConfigurationError::InvalidEdge(a, b));
            }
            neighbours.entry(a).or_default().insert(b);
            neighbours.entry(b).or_default().insert(a);
            latency_topology.insert((a, b), latency);
            latency_topology.insert((b, a), latency);
        }

        Ok(Self {
            neighbours,
            latency_topology,
        })
    }

    pub fn len(&self) -> usize {
        self.neighbours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbours.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.neighbours.keys().copied()
    }

    pub fn neighbours(&self, id: ProcessId) -> &BTreeSet<ProcessId> {
        static EMPTY: BTreeSet<ProcessId> = BTreeSet::new();
        self.neighbours.get(&id).unwrap_or(&EMPTY)
    }

    pub fn are_neighbours(&self, a: ProcessId, b: ProcessId) -> bool {
        self.neighbours(a).contains(&b)
    }

    pub(crate) fn latency(&self, from: ProcessId, to: ProcessId) -> Option<Distributions> {
        self.latency_topology.get(&(from, to)).copied()
    }

    pub fn is_connected(&self) -> bool {
        let Some(first) = self.nodes().next() else {
            return true;
        };
        let mut seen = BTreeSet::from([first]);
        let mut queue = VecDeque::from([first]);
        while let Some(id) = queue.pop_front() {
            for next in self.neighbours(id) {
                if seen.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }
        seen.len() == self.len()
    }
}

fn validate_degree(num_nodes: usize, num_neighbours: usize) -> Result<(), ConfigurationError> {
    if num_nodes == 0 {
        return Err(ConfigurationError::NoNodes);
    }
    // A lone node is the only one allowed to have no neighbours
    if num_nodes == 1 && num_neighbours == 0 {
        return Ok(());
    }
    if num_neighbours == 0 {
        return Err(ConfigurationError::NoNeighbours { num_nodes });
    }
    if num_neighbours >= num_nodes {
        return Err(ConfigurationError::TooManyNeighbours {
            num_nodes,
            num_neighbours,
        });
    }
    if (num_nodes * num_neighbours) % 2 == 1 {
        return Err(ConfigurationError::OddDegreeSum {
            num_nodes,
            num_neighbours,
        });
    }
    Ok(())
}

fn try_pairing(
    nodes: &[ProcessId],
    degree: usize,
    random: &mut RandomSource,
) -> Option<BTreeSet<(ProcessId, ProcessId)>> {
    let mut edges = BTreeSet::new();
    let mut stubs: Vec<ProcessId> = nodes
        .iter()
        .flat_map(|id| std::iter::repeat_n(*id, degree))
        .collect();

    while !stubs.is_empty() {
        random.shuffle(&mut stubs);
        let mut leftover: BTreeMap<ProcessId, usize> = BTreeMap::new();

        for pair in stubs.chunks_exact(2) {
            let (a, b) = (pair[0].min(pair[1]), pair[0].max(pair[1]));
            if a != b && edges.insert((a, b)) {
                continue;
            }
            *leftover.entry(a).or_default() += 1;
            *leftover.entry(b).or_default() += 1;
        }

        if !can_finish(&edges, &leftover) {
            return None;
        }

        stubs = leftover
            .into_iter()
            .flat_map(|(id, count)| std::iter::repeat_n(id, count))
            .collect();
    }

    Some(edges)
}

// At least one pair of leftover stubs must still be joinable
fn can_finish(
    edges: &BTreeSet<(ProcessId, ProcessId)>,
    leftover: &BTreeMap<ProcessId, usize>,
) -> bool {
    if leftover.is_empty() {
        return true;
    }
    leftover.keys().any(|a| {
        leftover
            .keys()
            .any(|b| a < b && !edges.contains(&(*a, *b)))
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::Jiffies;

    const LATENCY: Distributions = Distributions::Fixed(Jiffies(1));

    fn build(n: usize, d: usize, seed: u64) -> Result<Topology, ConfigurationError> {
        Topology::random_regular(n, d, LATENCY, &mut RandomSource::new(seed))
    }

    #[test]
    fn rejects_invalid_degrees() {
        assert_eq!(build(0, 0, 1).unwrap_err(), ConfigurationError::NoNodes);
        assert!(matches!(
            build(4, 4, 1),
            Err(ConfigurationError::TooManyNeighbours { .. })
        ));
        assert!(matches!(
            build(3, 1, 1),
            Err(ConfigurationError::OddDegreeSum { .. })
        ));
        assert_eq!(
            build(4, 0, 1).unwrap_err(),
            ConfigurationError::NoNeighbours { num_nodes: 4 }
        );
    }

    #[test]
    fn single_isolated_node() {
        let topology = build(1, 0, 1).unwrap();
        assert_eq!(topology.len(), 1);
        assert!(topology.neighbours(1).is_empty());
    }

    #[test]
    fn full_degree_is_complete_graph() {
        let topology = build(5, 4, 3).unwrap();
        for a in 1..=5 {
            assert_eq!(topology.neighbours(a).len(), 4);
            assert!(!topology.neighbours(a).contains(&a));
        }
    }

    #[test]
    fn same_seed_same_graph() {
        let a = build(30, 4, 11).unwrap();
        let b = build(30, 4, 11).unwrap();
        for id in 1..=30 {
            assert_eq!(a.neighbours(id), b.neighbours(id));
        }
    }

    #[test]
    fn explicit_edges_reject_self_loops() {
        assert_eq!(
            Topology::from_edges(3, [(1, 1)], LATENCY).unwrap_err(),
            ConfigurationError::InvalidEdge(1, 1)
        );
        assert!(Topology::from_edges(3, [(1, 4)], LATENCY).is_err());
    }

    #[test]
    fn explicit_edges_carry_the_default_latency() {
        let topology = Topology::from_edges(3, [(1, 2)], LATENCY).unwrap();
        assert_eq!(topology.latency(2, 1), Some(LATENCY));
        assert_eq!(topology.latency(1, 3), None);
        assert!(!topology.is_connected());
    }

    proptest! {
        #[test]
        fn regular_and_symmetric(n in 2usize..40, d in 1usize..8, seed in any::<u64>()) {
            prop_assume!(d < n && (n * d) % 2 == 0);
            let topology = build(n, d, seed).unwrap();
            prop_assert_eq!(topology.len(), n);
            for a in topology.nodes() {
                prop_assert_eq!(topology.neighbours(a).len(), d);
                prop_assert!(!topology.neighbours(a).contains(&a));
                for b in topology.neighbours(a) {
                    prop_assert!(topology.are_neighbours(*b, a));
                }
            }
        }
    }
}

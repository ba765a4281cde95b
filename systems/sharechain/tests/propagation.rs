use std::collections::BTreeSet;

use proptest::prelude::*;
use sharechain::{GENESIS_ID, RunReport, SimulationConfig, run, simulate};
use sharesim::{ConfigurationError, Distributions, Jiffies, SimulationBuilder};

fn fixed(interval: usize, delay: usize, run_time: usize) -> SimulationConfig {
    SimulationConfig {
        run_time: Jiffies(run_time),
        share_interval: Distributions::Fixed(Jiffies(interval)),
        propagation_delay: Distributions::Fixed(Jiffies(delay)),
        ..Default::default()
    }
}

fn check_consistency(report: &RunReport) {
    for node in &report.stats.nodes {
        let dag = &report.dags[&node.id];

        for share in dag.shares() {
            match share.parent {
                None => assert_eq!(share.id, GENESIS_ID),
                Some(parent) => {
                    let parent = dag.get(parent).expect("dangling parent");
                    assert_eq!(share.height, parent.height + 1);
                }
            }
        }

        let sent: BTreeSet<_> = node.shares_sent.iter().collect();
        assert!(node.shares_not_rewarded.iter().all(|id| sent.contains(id)));
        assert_eq!(
            node.rewarded() + node.shares_not_rewarded.len(),
            node.shares_sent.len()
        );
        assert_eq!(node.chain_height, dag.height());

        for warning in &node.orphaned {
            assert!(!dag.contains(warning.share));
            assert!(!dag.contains(warning.missing_parent));
        }
    }
}

#[test]
fn lone_node_builds_a_linear_chain() {
    let config = SimulationConfig {
        run_time: Jiffies(100),
        ..Default::default()
    };
    let report = run(1, 0, &config).unwrap();
    let node = &report.stats.nodes[0];

    assert!(!node.shares_sent.is_empty());
    assert!(node.shares_not_rewarded.is_empty());
    assert_eq!(node.chain_height, node.shares_sent.len());
    assert!(node.stale_shares.is_empty());
    assert_eq!(report.stats.undelivered, 0);
    check_consistency(&report);
}

#[test]
fn simultaneous_shares_resolve_to_one_winner() {
    // Both nodes find a share at t=10, deliveries land at t=13, the run stops at 15
    let report = run(2, 1, &fixed(10, 3, 15)).unwrap();
    let [a, b] = &report.stats.nodes[..] else {
        panic!("expected two nodes");
    };
    assert_eq!(a.shares_sent.len(), 1);
    assert_eq!(b.shares_sent.len(), 1);

    let winner = a.shares_sent[0].min(b.shares_sent[0]);
    let loser = a.shares_sent[0].max(b.shares_sent[0]);

    assert_eq!(a.tip, winner);
    assert_eq!(b.tip, winner);
    for node in [a, b] {
        assert_eq!(node.stale_shares, vec![loser]);
    }
    let not_rewarded: Vec<_> = [a, b]
        .iter()
        .flat_map(|n| n.shares_not_rewarded.iter().copied())
        .collect();
    assert_eq!(not_rewarded, vec![loser]);
    assert_eq!(report.stats.undelivered, 0);
    check_consistency(&report);
}

#[test]
fn complete_graph_converges_on_the_oldest_smallest_share() {
    let report = run(3, 2, &fixed(100, 1, 150)).unwrap();
    let tips: BTreeSet<_> = report.stats.nodes.iter().map(|n| n.tip).collect();
    assert_eq!(tips.len(), 1);

    let rewarded: usize = report.stats.nodes.iter().map(|n| n.rewarded()).sum();
    assert_eq!(rewarded, 1);
    assert_eq!(report.stats.total_not_rewarded(), 2);
    for node in &report.stats.nodes {
        assert_eq!(node.known_shares, 4);
        assert_eq!(node.stale_shares.len(), 2);
    }
}

#[test]
fn halting_mid_flight_still_reports() {
    // Shares at 10 and 20 are still on the wire at 30
    let report = run(4, 2, &fixed(10, 50, 30)).unwrap();
    assert!(report.stats.undelivered >= 1);
    for node in &report.stats.nodes {
        assert_eq!(node.shares_sent.len(), 2);
        assert_eq!(node.known_shares, 3);
        assert!(node.shares_not_rewarded.is_empty());
    }
    check_consistency(&report);
}

#[test]
fn explicit_topology_relays_along_a_line() {
    let builder = SimulationBuilder::default().edges(3, &[(1, 2), (2, 3)]);
    let config = SimulationConfig {
        hash_rates: vec![1.0, 0.01, 0.01],
        ..fixed(10, 2, 25)
    };
    let report = simulate(builder, &config).unwrap();
    // Node 1's first share reaches node 3 through node 2
    let first = report.stats.nodes[0].shares_sent[0];
    assert!(report.dags[&3].contains(first));
    check_consistency(&report);
}

#[test]
fn invalid_topologies_fail_before_running() {
    let config = SimulationConfig::default();
    assert!(matches!(
        run(4, 4, &config),
        Err(ConfigurationError::TooManyNeighbours { .. })
    ));
    assert!(matches!(run(0, 0, &config), Err(ConfigurationError::NoNodes)));
    assert!(matches!(
        run(4, 0, &config),
        Err(ConfigurationError::NoNeighbours { num_nodes: 4 })
    ));
    assert!(matches!(
        run(3, 1, &config),
        Err(ConfigurationError::OddDegreeSum { .. })
    ));
    let config = SimulationConfig {
        run_time: Jiffies::ZERO,
        ..Default::default()
    };
    assert!(matches!(
        run(4, 2, &config),
        Err(ConfigurationError::InvalidParameter { .. })
    ));
}

#[test]
fn dags_export_as_dot() {
    let report = run(4, 2, &fixed(10, 2, 50)).unwrap();
    assert_eq!(report.dags.len(), 4);
    for (id, dag) in &report.dags {
        let dot = dag.to_dot(&format!("node_{id}"));
        for share in dag.shares() {
            assert!(dot.contains(&format!("\"{}\" [label=", share.id)));
        }
        assert_eq!(dag.topological_order().len(), dag.len());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn identical_inputs_replay_identically(seed in any::<u64>(), d in 1usize..4) {
        let config = SimulationConfig {
            random_seed: seed,
            run_time: Jiffies(300),
            ..Default::default()
        };
        let first = run(8, d, &config).unwrap();
        let second = run(8, d, &config).unwrap();
        prop_assert_eq!(&first.stats, &second.stats);
        for (id, dag) in &first.dags {
            let again = &second.dags[id];
            prop_assert_eq!(dag.edges().collect::<Vec<_>>(), again.edges().collect::<Vec<_>>());
            prop_assert_eq!(dag.tip().id, again.tip().id);
        }
    }

    #[test]
    fn runs_keep_their_invariants(seed in any::<u64>(), n in 2usize..12, d in 1usize..5, timeout in proptest::option::of(1usize..20)) {
        prop_assume!(d < n && (n * d) % 2 == 0);
        let config = SimulationConfig {
            random_seed: seed,
            run_time: Jiffies(200),
            orphan_timeout: timeout.map(Jiffies),
            propagation_delay: Distributions::Uniform(Jiffies(0), Jiffies(15)),
            ..Default::default()
        };
        let report = run(n, d, &config).unwrap();
        prop_assert_eq!(report.stats.nodes.len(), n);
        for node in &report.stats.nodes {
            prop_assert_eq!(node.neighbours.len(), d);
        }
        check_consistency(&report);
    }
}

//! Share-chain propagation over a simulated peer-to-peer network.
//!
//! Every node mines shares on top of its current tip and floods them to its
//! neighbours. Propagation delay lets competing shares appear at the same
//! height; each node keeps its own view of the resulting DAG and follows the
//! highest chain. At the end of a run, shares a node created that are not on
//! its final chain are counted as not rewarded.

pub mod config;
pub mod dag;
pub mod node;
pub mod orphanage;
pub mod run;
pub mod share;
pub mod stats;

pub use config::SimulationConfig;
pub use dag::{InsertError, ShareDag};
pub use node::{Accepted, NodeCounters, ShareNode};
pub use orphanage::{Orphan, OrphanBuffer};
pub use run::{RunReport, run, simulate};
pub use share::{GENESIS_ID, Share, ShareId, ShareMessage, SharePtr};
pub use stats::{NodeStats, OrphanedShareWarning, RunStats, StatsCollector};

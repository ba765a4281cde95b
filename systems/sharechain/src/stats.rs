//! End-of-run classification of every node's shares.

use std::fmt::Write;

use sharesim::{Jiffies, ProcessId};

use crate::{
    node::ShareNode,
    share::{ShareId, SharePtr},
};

/// A share still waiting for its parent when the run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanedShareWarning {
    pub node: ProcessId,
    pub share: ShareId,
    pub missing_parent: ShareId,
    pub since: Jiffies,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeStats {
    pub id: ProcessId,
    pub name: String,
    pub neighbours: Vec<ProcessId>,
    pub shares_sent: Vec<ShareId>,
    /// Shares this node created that are not on its final chain.
    pub shares_not_rewarded: Vec<ShareId>,
    /// Heights on the final chain that are a multiple of the reward interval.
    pub num_blocks: usize,
    /// The part of `num_blocks` this node found itself.
    pub own_blocks: usize,
    pub chain_height: usize,
    pub tip: ShareId,
    pub known_shares: usize,
    /// Every known share off the final chain, whoever created it.
    pub stale_shares: Vec<ShareId>,
    pub duplicates: usize,
    pub invalid: usize,
    pub orphans_discarded: usize,
    pub orphaned: Vec<OrphanedShareWarning>,
}

impl NodeStats {
    pub fn rewarded(&self) -> usize {
        self.shares_sent.len() - self.shares_not_rewarded.len()
    }

    pub fn not_rewarded_percent(&self) -> Option<f64> {
        if self.shares_sent.is_empty() {
            return None;
        }
        Some(self.shares_not_rewarded.len() as f64 / self.shares_sent.len() as f64 * 100.0)
    }

    pub fn summary(&self) -> String {
        let mut line = format!(
            "node: {} sent: {} ({}), not rewarded: {}",
            self.name,
            self.shares_sent.len(),
            self.num_blocks,
            self.shares_not_rewarded.len()
        );
        if let Some(percent) = self.not_rewarded_percent() {
            let _ = write!(line, " %age not rewarded {percent}");
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunStats {
    pub run_time: Jiffies,
    pub nodes: Vec<NodeStats>,
    /// Gossip deliveries still in flight when the run halted.
    pub undelivered: usize,
}

impl RunStats {
    pub fn total_sent(&self) -> usize {
        self.nodes.iter().map(|n| n.shares_sent.len()).sum()
    }

    pub fn total_not_rewarded(&self) -> usize {
        self.nodes.iter().map(|n| n.shares_not_rewarded.len()).sum()
    }

    pub fn orphan_warnings(&self) -> impl Iterator<Item = &OrphanedShareWarning> {
        self.nodes.iter().flat_map(|n| n.orphaned.iter())
    }

    /// Two lines per node: the summary and the ids not rewarded.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.nodes.len() * 2 + 1);
        for node in &self.nodes {
            lines.push(node.summary());
            lines.push(format!("{:?}", node.shares_not_rewarded));
        }
        lines.push(format!(
            "total sent: {}, not rewarded: {}, undelivered: {}, orphaned: {}",
            self.total_sent(),
            self.total_not_rewarded(),
            self.undelivered,
            self.orphan_warnings().count()
        ));
        lines
    }

    pub fn csv_header() -> &'static str {
        "num_nodes,run_time,sent,not_rewarded,pct_not_rewarded,undelivered,orphaned"
    }

    pub fn csv_row(&self) -> String {
        let sent = self.total_sent();
        let not_rewarded = self.total_not_rewarded();
        let percent = if sent == 0 {
            0.0
        } else {
            not_rewarded as f64 / sent as f64 * 100.0
        };
        format!(
            "{},{},{},{},{:.3},{},{}",
            self.nodes.len(),
            self.run_time.0,
            sent,
            not_rewarded,
            percent,
            self.undelivered,
            self.orphan_warnings().count()
        )
    }
}

pub struct StatsCollector {
    reward_interval: usize,
}

impl StatsCollector {
    pub fn new(reward_interval: usize) -> Self {
        Self {
            reward_interval: reward_interval.max(1),
        }
    }

    pub fn collect(&self, node: &ShareNode) -> NodeStats {
        let dag = node.dag();
        let chain = dag.main_chain();
        let on_chain = dag.main_chain_ids();

        let blocks: Vec<&SharePtr> = chain
            .iter()
            .filter(|s| s.height > 0 && s.height % self.reward_interval == 0)
            .collect();

        let counters = node.counters();

        NodeStats {
            id: node.id(),
            name: node.name(),
            neighbours: node.neighbours().to_vec(),
            shares_sent: node.shares_sent().to_vec(),
            shares_not_rewarded: node
                .shares_sent()
                .iter()
                .copied()
                .filter(|id| !on_chain.contains(id))
                .collect(),
            num_blocks: blocks.len(),
            own_blocks: blocks.iter().filter(|s| s.creator == node.id()).count(),
            chain_height: dag.height(),
            tip: dag.tip().id,
            known_shares: dag.len(),
            stale_shares: dag
                .shares()
                .map(|s| s.id)
                .filter(|id| !on_chain.contains(id))
                .collect(),
            duplicates: counters.duplicates,
            invalid: counters.invalid,
            orphans_discarded: counters.orphans_discarded,
            orphaned: node
                .orphans()
                .iter()
                .map(|(missing_parent, orphan)| OrphanedShareWarning {
                    node: node.id(),
                    share: orphan.share.id,
                    missing_parent,
                    since: orphan.since,
                })
                .collect(),
        }
    }
}

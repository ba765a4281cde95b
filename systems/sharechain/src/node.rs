//! The simulated peer.
//!
//! A [`ShareNode`] multiplexes two event sources on the engine's clock: its
//! own generation timer and shares delivered by neighbours. The decision
//! logic lives in [`ShareNode::mint`] and [`ShareNode::accept`], which only
//! touch local state; the [`ProcessHandle`] impl turns their results into
//! gossip and timers.

use std::collections::{BTreeSet, VecDeque};

use log::warn;
use sharesim::{
    Distributions, Jiffies, MessagePtr, ProcessHandle, ProcessId, SharedRandom, Spawn, TimerId,
    global_unique_id, gossip, helpers::debug_process, now, schedule_timer_after,
};

use crate::{
    dag::{InsertError, ShareDag},
    orphanage::{Orphan, OrphanBuffer},
    share::{Share, ShareId, ShareMessage, SharePtr},
};

/// Outcome of a delivered share.
#[derive(Debug)]
pub enum Accepted {
    /// Already in the DAG or already waiting for its parent.
    Duplicate,
    Invalid(InsertError),
    Buffered { missing_parent: ShareId },
    /// Newly inserted shares, parent first, each with the neighbour it came from.
    Inserted(Vec<(SharePtr, ProcessId)>),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NodeCounters {
    pub duplicates: usize,
    pub invalid: usize,
    pub orphans_discarded: usize,
    pub relayed: usize,
}

pub struct ShareNode {
    id: ProcessId,
    neighbours: Vec<ProcessId>,
    random: SharedRandom,
    share_interval: Distributions,
    orphan_timeout: Option<Jiffies>,
    dag: ShareDag,
    orphans: OrphanBuffer,
    shares_sent: Vec<ShareId>,
    counters: NodeCounters,
    generation_timer: Option<TimerId>,
    expiry_timers: BTreeSet<TimerId>,
}

impl ShareNode {
    pub fn new(
        spawn: Spawn<'_>,
        genesis: SharePtr,
        share_interval: Distributions,
        orphan_timeout: Option<Jiffies>,
    ) -> Self {
        Self {
            id: spawn.id,
            neighbours: spawn.neighbours.iter().copied().collect(),
            random: spawn.random,
            share_interval,
            orphan_timeout,
            dag: ShareDag::new(genesis),
            orphans: OrphanBuffer::default(),
            shares_sent: Vec::new(),
            counters: NodeCounters::default(),
            generation_timer: None,
            expiry_timers: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn name(&self) -> String {
        self.id.to_string()
    }

    pub fn neighbours(&self) -> &[ProcessId] {
        &self.neighbours
    }

    pub fn dag(&self) -> &ShareDag {
        &self.dag
    }

    pub fn orphans(&self) -> &OrphanBuffer {
        &self.orphans
    }

    pub fn shares_sent(&self) -> &[ShareId] {
        &self.shares_sent
    }

    pub fn counters(&self) -> NodeCounters {
        self.counters
    }

    /// Creates a share on top of the current tip and makes it the tip.
    pub fn mint(&mut self, id: ShareId, at: Jiffies) -> SharePtr {
        let share = SharePtr::new(Share::extending(self.dag.tip(), id, self.id, at));
        match self.dag.insert(share.clone()) {
            Ok(moved) => debug_assert!(moved, "A share on the tip must become the tip"),
            Err(e) => warn!("P{}: own share rejected: {e}", self.id),
        }
        self.shares_sent.push(share.id);
        share
    }

    /// Applies a share delivered by `from`.
    ///
    /// A share whose parent is unknown waits in the orphan buffer. Inserting
    /// a share releases everything waiting on it, transitively.
    pub fn accept(&mut self, from: ProcessId, share: SharePtr, at: Jiffies) -> Accepted {
        if self.dag.contains(share.id) || self.orphans.contains(share.id) {
            self.counters.duplicates += 1;
            return Accepted::Duplicate;
        }

        if let Some(parent) = share.parent.filter(|p| !self.dag.contains(*p)) {
            self.orphans.buffer(Orphan {
                share,
                from,
                since: at,
            });
            return Accepted::Buffered {
                missing_parent: parent,
            };
        }

        let mut inserted = Vec::new();
        let mut queue = VecDeque::from([(share, from)]);
        while let Some((share, from)) = queue.pop_front() {
            match self.dag.insert(share.clone()) {
                Ok(_) => {
                    queue.extend(
                        self.orphans
                            .release(share.id)
                            .into_iter()
                            .map(|o| (o.share, o.from)),
                    );
                    inserted.push((share, from));
                }
                Err(e) => {
                    self.counters.invalid += 1;
                    if inserted.is_empty() {
                        return Accepted::Invalid(e);
                    }
                    warn!("P{}: dropping released share: {e}", self.id);
                }
            }
        }
        Accepted::Inserted(inserted)
    }

    /// Discards orphans that waited past the configured timeout.
    pub fn expire_orphans(&mut self, at: Jiffies) -> usize {
        let Some(timeout) = self.orphan_timeout else {
            return 0;
        };
        let expired = self.orphans.expire(at, timeout);
        for orphan in &expired {
            warn!(
                "P{}: share {} gave up waiting for parent {:?} after {timeout}",
                self.id, orphan.share.id, orphan.share.parent
            );
        }
        self.counters.orphans_discarded += expired.len();
        expired.len()
    }

    fn arm_generation_timer(&mut self) {
        let interval = self
            .random
            .borrow_mut()
            .sample(self.share_interval)
            .max(Jiffies(1));
        self.generation_timer = Some(schedule_timer_after(interval));
    }

    fn relay(&mut self, share: SharePtr, except: Option<ProcessId>) {
        self.counters.relayed += 1;
        gossip(ShareMessage::new(share), except);
    }
}

impl ProcessHandle for ShareNode {
    fn start(&mut self) {
        debug_process!("Neighbours: {:?}", self.neighbours);
        self.arm_generation_timer();
    }

    fn on_message(&mut self, from: ProcessId, message: MessagePtr) {
        let Some(message) = message.try_as::<ShareMessage>() else {
            warn!("P{}: unexpected message from P{from}", self.id);
            return;
        };

        match self.accept(from, message.share.clone(), now()) {
            Accepted::Duplicate => {
                debug_process!("Share {} from P{from} already known", message.share.id);
            }
            Accepted::Invalid(e) => {
                warn!("P{}: invalid share from P{from}: {e}", self.id);
            }
            Accepted::Buffered { missing_parent } => {
                debug_process!(
                    "Share {} from P{from} waits for parent {missing_parent}",
                    message.share.id
                );
                if let Some(timeout) = self.orphan_timeout {
                    self.expiry_timers.insert(schedule_timer_after(timeout));
                }
            }
            Accepted::Inserted(inserted) => {
                for (share, source) in inserted {
                    debug_process!(
                        "Inserted share {} (height {}) from P{source}, tip {}",
                        share.id,
                        share.height,
                        self.dag.tip().id
                    );
                    self.relay(share, Some(source));
                }
            }
        }
    }

    fn on_timer(&mut self, id: TimerId) {
        if self.generation_timer == Some(id) {
            let share = self.mint(global_unique_id(), now());
            debug_process!("Found share {} at height {}", share.id, share.height);
            self.relay(share, None);
            self.arm_generation_timer();
        } else if self.expiry_timers.remove(&id) {
            self.expire_orphans(now());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use sharesim::RandomSource;

    use super::*;
    use crate::share::GENESIS_ID;

    fn node(orphan_timeout: Option<Jiffies>) -> (ShareNode, SharePtr) {
        let genesis = SharePtr::new(Share::genesis());
        let neighbours = BTreeSet::from([2, 3]);
        let spawn = Spawn {
            id: 1,
            neighbours: &neighbours,
            random: RandomSource::new_shared(1),
        };
        let node = ShareNode::new(
            spawn,
            genesis.clone(),
            Distributions::Fixed(Jiffies(10)),
            orphan_timeout,
        );
        (node, genesis)
    }

    fn share(parent: &Share, id: ShareId, creator: ProcessId) -> SharePtr {
        SharePtr::new(Share::extending(parent, id, creator, Jiffies(id)))
    }

    fn inserted_ids(accepted: Accepted) -> Vec<(ShareId, ProcessId)> {
        match accepted {
            Accepted::Inserted(list) => list.iter().map(|(s, from)| (s.id, *from)).collect(),
            other => panic!("expected insertion, got {other:?}"),
        }
    }

    #[test]
    fn mint_extends_the_tip() {
        let (mut node, _) = node(None);
        let a = node.mint(10, Jiffies(5));
        let b = node.mint(11, Jiffies(9));
        assert_eq!(a.parent, Some(GENESIS_ID));
        assert_eq!(b.parent, Some(10));
        assert_eq!(node.dag().tip().id, 11);
        assert_eq!(node.shares_sent(), &[10, 11]);
    }

    #[test]
    fn second_delivery_is_a_no_op() {
        let (mut node, genesis) = node(None);
        let a = share(&genesis, 5, 2);
        assert_eq!(inserted_ids(node.accept(2, a.clone(), Jiffies(6))), vec![(5, 2)]);
        let before = node.dag().len();
        assert!(matches!(node.accept(3, a, Jiffies(7)), Accepted::Duplicate));
        assert_eq!(node.dag().len(), before);
        assert_eq!(node.counters().duplicates, 1);
    }

    #[test]
    fn genesis_redelivery_is_a_duplicate() {
        let (mut node, genesis) = node(None);
        assert!(matches!(node.accept(2, genesis, Jiffies(1)), Accepted::Duplicate));
    }

    #[test]
    fn buffered_shares_replay_transitively() {
        let (mut node, genesis) = node(None);
        let a = share(&genesis, 5, 2);
        let b = share(&a, 6, 2);
        let c = share(&b, 7, 3);

        assert!(matches!(
            node.accept(3, c.clone(), Jiffies(8)),
            Accepted::Buffered { missing_parent: 6 }
        ));
        assert!(matches!(
            node.accept(2, b.clone(), Jiffies(8)),
            Accepted::Buffered { missing_parent: 5 }
        ));
        // Still waiting: a redelivery is a duplicate, not a second entry
        assert!(matches!(node.accept(2, c, Jiffies(9)), Accepted::Duplicate));
        assert_eq!(node.orphans().len(), 2);

        assert_eq!(
            inserted_ids(node.accept(2, a, Jiffies(9))),
            vec![(5, 2), (6, 2), (7, 3)]
        );
        assert!(node.orphans().is_empty());
        assert_eq!(node.dag().tip().id, 7);
    }

    #[test]
    fn foreign_roots_are_invalid() {
        let (mut node, _) = node(None);
        let mut root = Share::genesis();
        root.id = 9;
        assert!(matches!(
            node.accept(2, SharePtr::new(root), Jiffies(1)),
            Accepted::Invalid(InsertError::ForeignRoot(9))
        ));
        assert_eq!(node.counters().invalid, 1);
    }

    #[test]
    fn orphans_expire_after_timeout() {
        let (mut node, genesis) = node(Some(Jiffies(5)));
        let a = share(&genesis, 5, 2);
        let b = share(&a, 6, 2);
        node.accept(2, b, Jiffies(10));
        assert_eq!(node.expire_orphans(Jiffies(14)), 0);
        assert_eq!(node.expire_orphans(Jiffies(15)), 1);
        assert_eq!(node.counters().orphans_discarded, 1);
        // Parent arriving later no longer drags the discarded child in
        assert_eq!(inserted_ids(node.accept(2, a, Jiffies(16))), vec![(5, 2)]);
    }

    #[test]
    fn tip_height_never_decreases() {
        let (mut node, genesis) = node(None);
        let a = share(&genesis, 5, 2);
        let b = share(&a, 6, 2);
        let rival = share(&genesis, 2, 3);
        let mut heights = Vec::new();
        for s in [a, b, rival] {
            node.accept(2, s, Jiffies(20));
            heights.push(node.dag().height());
        }
        assert_eq!(heights, vec![1, 2, 2]);
    }
}

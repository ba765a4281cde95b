//! A node's local view of the share-chain.
//!
//! Shares are held by pointer: every node that learned a share keeps a
//! reference to the same allocation. The DAG only ever grows, and a share
//! is admitted only once its parent is present, so no edge dangles and the
//! strictly increasing height rules out cycles.

use std::{
    cmp::Reverse,
    collections::{BTreeMap, BinaryHeap, HashSet},
};

use thiserror::Error;

use crate::share::{ShareId, SharePtr};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertError {
    #[error("share {0} is already known")]
    Duplicate(ShareId),

    #[error("share {share} extends unknown share {parent}")]
    MissingParent { share: ShareId, parent: ShareId },

    #[error("share {0} has no parent and is not this node's genesis")]
    ForeignRoot(ShareId),

    #[error("share {share} claims height {claimed}, parent implies {expected}")]
    HeightMismatch {
        share: ShareId,
        claimed: usize,
        expected: usize,
    },
}

#[derive(Debug, Clone)]
pub struct ShareDag {
    shares: BTreeMap<ShareId, SharePtr>,
    children: BTreeMap<ShareId, Vec<ShareId>>,
    tip: SharePtr,
}

impl ShareDag {
    pub fn new(genesis: SharePtr) -> Self {
        Self {
            shares: BTreeMap::from([(genesis.id, genesis.clone())]),
            children: BTreeMap::new(),
            tip: genesis,
        }
    }

    pub fn contains(&self, id: ShareId) -> bool {
        self.shares.contains_key(&id)
    }

    pub fn get(&self, id: ShareId) -> Option<&SharePtr> {
        self.shares.get(&id)
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    pub fn tip(&self) -> &SharePtr {
        &self.tip
    }

    pub fn height(&self) -> usize {
        self.tip.height
    }

    /// Adds `share` and returns whether it became the new tip.
    pub fn insert(&mut self, share: SharePtr) -> Result<bool, InsertError> {
        if self.contains(share.id) {
            return Err(InsertError::Duplicate(share.id));
        }
        let parent_id = share.parent.ok_or(InsertError::ForeignRoot(share.id))?;
        let parent = self.shares.get(&parent_id).ok_or(InsertError::MissingParent {
            share: share.id,
            parent: parent_id,
        })?;
        if share.height != parent.height + 1 {
            return Err(InsertError::HeightMismatch {
                share: share.id,
                claimed: share.height,
                expected: parent.height + 1,
            });
        }

        self.children.entry(parent_id).or_default().push(share.id);
        self.shares.insert(share.id, share.clone());

        let moved = share.outranks(&self.tip);
        if moved {
            self.tip = share;
        }
        Ok(moved)
    }

    /// The chain from the tip back to genesis, tip first.
    pub fn main_chain(&self) -> Vec<SharePtr> {
        let mut chain = vec![self.tip.clone()];
        let mut cursor = self.tip.parent;
        while let Some(share) = cursor.and_then(|id| self.shares.get(&id)) {
            chain.push(share.clone());
            cursor = share.parent;
        }
        chain
    }

    pub fn main_chain_ids(&self) -> HashSet<ShareId> {
        self.main_chain().iter().map(|s| s.id).collect()
    }

    pub fn shares(&self) -> impl Iterator<Item = &SharePtr> {
        self.shares.values()
    }

    /// Parent links as `(parent, child)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (ShareId, ShareId)> + '_ {
        self.children
            .iter()
            .flat_map(|(parent, kids)| kids.iter().map(move |kid| (*parent, *kid)))
    }

    pub fn children(&self, id: ShareId) -> &[ShareId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Parents before children; among available shares the smallest id goes first.
    pub fn topological_order(&self) -> Vec<ShareId> {
        let mut ready: BinaryHeap<Reverse<ShareId>> = self
            .shares
            .values()
            .filter(|s| s.parent.is_none_or(|p| !self.contains(p)))
            .map(|s| Reverse(s.id))
            .collect();

        let mut order = Vec::with_capacity(self.len());
        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            ready.extend(self.children(id).iter().map(|kid| Reverse(*kid)));
        }
        order
    }

    /// Graphviz rendering; main-chain shares are filled.
    pub fn to_dot(&self, name: &str) -> String {
        let on_chain = self.main_chain_ids();
        let mut dot = format!("digraph \"{name}\" {{\n  rankdir=LR;\n");
        for share in self.shares.values() {
            let style = if on_chain.contains(&share.id) {
                ", style=filled"
            } else {
                ""
            };
            dot.push_str(&format!(
                "  \"{}\" [label=\"{}\\nP{} h{} t{}\"{}];\n",
                share.id, share.id, share.creator, share.height, share.created_at.0, style
            ));
        }
        for (parent, child) in self.edges() {
            dot.push_str(&format!("  \"{parent}\" -> \"{child}\";\n"));
        }
        dot.push_str("}\n");
        dot
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use sharesim::Jiffies;

    use super::*;
    use crate::share::{GENESIS_ID, Share};

    fn child(parent: &Share, id: ShareId, at: usize) -> SharePtr {
        Rc::new(Share::extending(parent, id, 1, Jiffies(at)))
    }

    fn dag() -> (ShareDag, SharePtr) {
        let genesis = Rc::new(Share::genesis());
        (ShareDag::new(genesis.clone()), genesis)
    }

    #[test]
    fn starts_at_genesis() {
        let (dag, _) = dag();
        assert_eq!(dag.tip().id, GENESIS_ID);
        assert_eq!(dag.height(), 0);
        assert_eq!(dag.len(), 1);
    }

    #[test]
    fn insert_requires_known_parent() {
        let (mut dag, genesis) = dag();
        let a = child(&genesis, 1, 5);
        let b = child(&a, 2, 6);
        assert_eq!(
            dag.insert(b.clone()),
            Err(InsertError::MissingParent {
                share: 2,
                parent: 1
            })
        );
        assert_eq!(dag.insert(a.clone()), Ok(true));
        assert_eq!(dag.insert(b), Ok(true));
        assert_eq!(dag.insert(a), Err(InsertError::Duplicate(1)));
        assert_eq!(dag.height(), 2);
    }

    #[test]
    fn rejects_bad_heights_and_roots() {
        let (mut dag, genesis) = dag();
        let mut forged = Share::extending(&genesis, 3, 1, Jiffies(1));
        forged.height = 5;
        assert!(matches!(
            dag.insert(Rc::new(forged)),
            Err(InsertError::HeightMismatch { .. })
        ));
        let mut root = Share::genesis();
        root.id = 7;
        assert_eq!(dag.insert(Rc::new(root)), Err(InsertError::ForeignRoot(7)));
        assert_eq!(dag.len(), 1);
    }

    #[test]
    fn ties_resolve_to_older_then_smaller_id() {
        let (mut dag, genesis) = dag();
        assert_eq!(dag.insert(child(&genesis, 4, 10)), Ok(true));
        // Same height, same time, larger id: stays
        assert_eq!(dag.insert(child(&genesis, 6, 10)), Ok(false));
        // Same height, same time, smaller id: wins
        assert_eq!(dag.insert(child(&genesis, 2, 10)), Ok(true));
        // Older share at the same height wins regardless of id
        assert_eq!(dag.insert(child(&genesis, 9, 8)), Ok(true));
        assert_eq!(dag.tip().id, 9);
        // Shorter never displaces taller
        let a = dag.get(9).unwrap().clone();
        assert_eq!(dag.insert(child(&a, 10, 20)), Ok(true));
        assert_eq!(dag.insert(child(&genesis, 11, 1)), Ok(false));
        assert_eq!(dag.tip().id, 10);
    }

    #[test]
    fn main_chain_walks_back_to_genesis() {
        let (mut dag, genesis) = dag();
        let a = child(&genesis, 1, 1);
        let b = child(&genesis, 2, 2);
        let c = child(&b, 3, 3);
        for s in [a, b, c] {
            dag.insert(s).unwrap();
        }
        let ids: Vec<ShareId> = dag.main_chain().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 2, GENESIS_ID]);
    }

    #[test]
    fn traversal_exposes_edges_and_order() {
        let (mut dag, genesis) = dag();
        let a = child(&genesis, 5, 1);
        let b = child(&genesis, 2, 1);
        let c = child(&a, 3, 2);
        for s in [a, b, c] {
            dag.insert(s).unwrap();
        }
        let mut edges: Vec<_> = dag.edges().collect();
        edges.sort();
        assert_eq!(edges, vec![(0, 2), (0, 5), (5, 3)]);
        assert_eq!(dag.topological_order(), vec![0, 2, 5, 3]);

        let dot = dag.to_dot("node_1");
        assert!(dot.starts_with("digraph \"node_1\""));
        assert!(dot.contains("\"5\" -> \"3\";"));
        assert!(dot.contains("\"3\" [label=\"3\\nP1 h2 t2\", style=filled];"));
        // Header, four shares, three edges, closing brace
        assert_eq!(dot.lines().count(), 2 + 4 + 3 + 1);
        assert!(dot.ends_with("}\n"));
    }
}

//! Shares that arrived before their parent.

use std::collections::{BTreeMap, BTreeSet};

use sharesim::{Jiffies, ProcessId};

use crate::share::{ShareId, SharePtr};

#[derive(Debug, Clone)]
pub struct Orphan {
    pub share: SharePtr,
    pub from: ProcessId,
    pub since: Jiffies,
}

/// Waiting room keyed by the missing parent id.
#[derive(Debug, Default)]
pub struct OrphanBuffer {
    waiting: BTreeMap<ShareId, Vec<Orphan>>,
    buffered: BTreeSet<ShareId>,
}

impl OrphanBuffer {
    /// Parks `orphan` under its parent. Returns false if it was already parked.
    pub fn buffer(&mut self, orphan: Orphan) -> bool {
        let Some(parent) = orphan.share.parent else {
            return false;
        };
        if !self.buffered.insert(orphan.share.id) {
            return false;
        }
        self.waiting.entry(parent).or_default().push(orphan);
        true
    }

    pub fn contains(&self, id: ShareId) -> bool {
        self.buffered.contains(&id)
    }

    /// Takes every share waiting directly on `parent`, in arrival order.
    pub fn release(&mut self, parent: ShareId) -> Vec<Orphan> {
        let released = self.waiting.remove(&parent).unwrap_or_default();
        released.iter().for_each(|o| {
            self.buffered.remove(&o.share.id);
        });
        released
    }

    /// Drops every share that has waited at least `max_wait`.
    pub fn expire(&mut self, now: Jiffies, max_wait: Jiffies) -> Vec<Orphan> {
        let mut expired = Vec::new();
        self.waiting.retain(|_, orphans| {
            let (gone, kept): (Vec<_>, Vec<_>) = orphans
                .drain(..)
                .partition(|o| o.since + max_wait <= now);
            expired.extend(gone);
            *orphans = kept;
            !orphans.is_empty()
        });
        expired.iter().for_each(|o| {
            self.buffered.remove(&o.share.id);
        });
        expired
    }

    /// Missing parent id and the orphan waiting on it.
    pub fn iter(&self) -> impl Iterator<Item = (ShareId, &Orphan)> {
        self.waiting
            .iter()
            .flat_map(|(parent, orphans)| orphans.iter().map(move |o| (*parent, o)))
    }

    pub fn len(&self) -> usize {
        self.buffered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffered.is_empty()
    }
}

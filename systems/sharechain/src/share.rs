use std::{cmp::Reverse, rc::Rc};

use sharesim::{Jiffies, Message, ProcessId};

pub type ShareId = usize;

/// Id of the genesis share every node starts from. Minted ids start at 1.
pub const GENESIS_ID: ShareId = 0;

pub type SharePtr = Rc<Share>;

/// One proof-of-work submission. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Share {
    pub id: ShareId,
    pub creator: ProcessId,
    pub parent: Option<ShareId>,
    pub height: usize,
    pub created_at: Jiffies,
}

impl Share {
    pub fn genesis() -> Self {
        Self {
            id: GENESIS_ID,
            creator: 0,
            parent: None,
            height: 0,
            created_at: Jiffies::ZERO,
        }
    }

    pub fn extending(parent: &Share, id: ShareId, creator: ProcessId, created_at: Jiffies) -> Self {
        Self {
            id,
            creator,
            parent: Some(parent.id),
            height: parent.height + 1,
            created_at,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.parent.is_none()
    }

    // Higher wins: taller first, then older, then smaller id
    fn rank(&self) -> (usize, Reverse<Jiffies>, Reverse<ShareId>) {
        (self.height, Reverse(self.created_at), Reverse(self.id))
    }

    /// Whether `self` is a better chain head than `other`.
    pub fn outranks(&self, other: &Share) -> bool {
        self.rank() > other.rank()
    }
}

/// Gossip payload. The share itself is shared, not copied, between deliveries.
pub struct ShareMessage {
    pub share: SharePtr,
}

impl ShareMessage {
    pub fn new(share: SharePtr) -> Self {
        Self { share }
    }
}

impl Message for ShareMessage {}

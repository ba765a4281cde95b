mod jiffy;
pub(crate) mod timer_manager;

pub use jiffy::Jiffies;
pub use timer_manager::TimerId;

/// Total order over scheduled events: simulated time first, submission order second.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub(crate) struct EventKey {
    pub(crate) at: Jiffies,
    pub(crate) seq: u64,
}

impl EventKey {
    pub(crate) fn new(at: Jiffies) -> Self {
        Self {
            at,
            seq: crate::global::next_sequence(),
        }
    }
}

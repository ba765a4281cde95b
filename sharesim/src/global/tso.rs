//! Deterministic counters.
//!
//! Both counters are thread-local and reset whenever a simulation is built or
//! dropped, so two runs with the same configuration hand out the same ids in
//! the same order.

use std::cell::Cell;

thread_local! {
    pub(crate) static TSO: Cell<usize> = const { Cell::new(1) };
    static SEQUENCE: Cell<u64> = const { Cell::new(0) };
}

/// Returns an identifier never returned before in the current simulation run.
///
/// Ids start at 1; callers may reserve 0 for values that exist before the run
/// begins.
///
/// ```rust
/// let a = sharesim::global_unique_id();
/// let b = sharesim::global_unique_id();
/// assert!(b > a);
/// ```
pub fn global_unique_id() -> usize {
    TSO.replace(TSO.get() + 1)
}

// Tie-breaker for events scheduled at the same instant
pub(crate) fn next_sequence() -> u64 {
    SEQUENCE.replace(SEQUENCE.get() + 1)
}

pub(crate) fn drop_tso() {
    TSO.set(1);
    SEQUENCE.set(0);
}

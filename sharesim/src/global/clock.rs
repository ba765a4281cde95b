use std::cell::Cell;

use log::debug;

use crate::Jiffies;

thread_local! {
    pub(crate) static CLOCK: Cell<Jiffies> = const { Cell::new(Jiffies(0)) }
}

pub(crate) fn drop_clock() {
    CLOCK.take();
}

pub(crate) fn fast_forward_clock(future: Jiffies) {
    let present = CLOCK.replace(future);
    debug_assert!(present <= future, "Future < Present");
    debug!("Global time now: {future}");
}

/// Current simulated time.
pub fn now() -> Jiffies {
    CLOCK.get()
}

use std::{
    fmt::{Debug, Display},
    ops::{Add, AddAssign, Sub},
};

/// One tick of simulated time. The simulation never looks at wall-clock time.
#[derive(PartialEq, PartialOrd, Ord, Eq, Copy, Clone, Default, Hash)]
pub struct Jiffies(pub usize);

impl Jiffies {
    pub const ZERO: Jiffies = Jiffies(0);

    /// Multiplies by a non-negative factor, rounding to the nearest tick.
    pub fn scaled(self, factor: f64) -> Jiffies {
        Jiffies((self.0 as f64 * factor).round().max(0.0) as usize)
    }
}

impl Add for Jiffies {
    type Output = Jiffies;

    fn add(self, rhs: Self) -> Self::Output {
        Jiffies(self.0 + rhs.0)
    }
}

impl Sub for Jiffies {
    type Output = Jiffies;

    fn sub(self, rhs: Self) -> Self::Output {
        Jiffies(self.0 - rhs.0)
    }
}

impl AddAssign for Jiffies {
    fn add_assign(&mut self, rhs: Jiffies) {
        self.0 += rhs.0
    }
}

impl From<usize> for Jiffies {
    fn from(value: usize) -> Self {
        Jiffies(value)
    }
}

impl Display for Jiffies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}j", self.0)
    }
}

impl Debug for Jiffies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

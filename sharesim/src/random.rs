use std::{cell::RefCell, rc::Rc};

use rand::{Rng, SeedableRng, distr::Uniform, seq::SliceRandom};
use rand_distr::{Bernoulli, Exp, Normal};

use crate::{ConfigurationError, Jiffies};

pub type Seed = u64;

/// The run's single random stream, handed explicitly to everything that draws from it.
pub type SharedRandom = Rc<RefCell<RandomSource>>;

/// Delay distributions over simulated time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Distributions {
    Fixed(Jiffies),
    Uniform(Jiffies, Jiffies),
    /// Exponential with the given mean; the memoryless inter-arrival time of a Poisson process.
    Exponential(Jiffies),
    Normal(Jiffies, Jiffies),
    Bernoulli(f64, Jiffies),
}

impl Distributions {
    pub fn validate(&self, what: &'static str) -> Result<(), ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidDistribution { what, reason };
        match *self {
            Distributions::Fixed(_) => Ok(()),
            Distributions::Uniform(from, to) if from > to => {
                Err(invalid(format!("uniform bounds {from} > {to}")))
            }
            Distributions::Uniform(..) => Ok(()),
            Distributions::Exponential(Jiffies(0)) => {
                Err(invalid("exponential mean must be positive".to_string()))
            }
            Distributions::Exponential(_) => Ok(()),
            Distributions::Normal(..) => Ok(()),
            Distributions::Bernoulli(p, _) if !(0.0..=1.0).contains(&p) => {
                Err(invalid(format!("probability {p} outside [0, 1]")))
            }
            Distributions::Bernoulli(..) => Ok(()),
        }
    }

    /// Stretches every time parameter by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        match self {
            Distributions::Fixed(at) => Distributions::Fixed(at.scaled(factor)),
            Distributions::Uniform(from, to) => {
                Distributions::Uniform(from.scaled(factor), to.scaled(factor))
            }
            Distributions::Exponential(mean) => Distributions::Exponential(mean.scaled(factor)),
            Distributions::Normal(mean, std_dev) => {
                Distributions::Normal(mean.scaled(factor), std_dev.scaled(factor))
            }
            Distributions::Bernoulli(p, val) => Distributions::Bernoulli(p, val.scaled(factor)),
        }
    }
}

pub struct RandomSource {
    rnd: rand::rngs::StdRng,
}

impl RandomSource {
    pub fn new(seed: Seed) -> Self {
        Self {
            rnd: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }

    pub fn new_shared(seed: Seed) -> SharedRandom {
        Rc::new(RefCell::new(Self::new(seed)))
    }

    // Distributions are validated when the simulation is configured
    pub fn sample(&mut self, d: Distributions) -> Jiffies {
        match d {
            Distributions::Fixed(at) => at,
            Distributions::Uniform(Jiffies(from), Jiffies(to)) => {
                let distr = Uniform::new_inclusive(from, to).expect("Invalid bounds");
                Jiffies(self.rnd.sample(distr))
            }
            Distributions::Exponential(Jiffies(mean)) => {
                let distr = Exp::new(1.0 / mean as f64).expect("Invalid mean");
                Jiffies(self.rnd.sample(distr).round() as usize)
            }
            Distributions::Normal(Jiffies(mean), Jiffies(std_dev)) => {
                let distr = Normal::new(mean as f64, std_dev as f64).expect("Invalid parameters");
                Jiffies(self.rnd.sample(distr).max(0.0).round() as usize)
            }
            Distributions::Bernoulli(p, Jiffies(val)) => {
                let distr = Bernoulli::new(p).expect("Invalid probability");
                if self.rnd.sample(distr) {
                    Jiffies(val)
                } else {
                    Jiffies::ZERO
                }
            }
        }
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rnd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = RandomSource::new(7);
        let mut b = RandomSource::new(7);
        let d = Distributions::Exponential(Jiffies(50));
        let xs: Vec<_> = (0..32).map(|_| a.sample(d)).collect();
        let ys: Vec<_> = (0..32).map(|_| b.sample(d)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn uniform_stays_within_bounds() {
        let mut r = RandomSource::new(1);
        for _ in 0..1000 {
            let x = r.sample(Distributions::Uniform(Jiffies(3), Jiffies(9)));
            assert!(Jiffies(3) <= x && x <= Jiffies(9));
        }
    }

    #[test]
    fn fixed_is_constant() {
        let mut r = RandomSource::new(1);
        assert_eq!(r.sample(Distributions::Fixed(Jiffies(4))), Jiffies(4));
    }

    #[test]
    fn validation_rejects_bad_parameters() {
        assert!(
            Distributions::Uniform(Jiffies(5), Jiffies(1))
                .validate("latency")
                .is_err()
        );
        assert!(Distributions::Exponential(Jiffies(0)).validate("interval").is_err());
        assert!(Distributions::Bernoulli(1.5, Jiffies(1)).validate("latency").is_err());
        assert!(Distributions::Normal(Jiffies(5), Jiffies(1)).validate("latency").is_ok());
    }

    #[test]
    fn scaling_stretches_parameters() {
        assert_eq!(
            Distributions::Exponential(Jiffies(100)).scaled(0.5),
            Distributions::Exponential(Jiffies(50))
        );
        assert_eq!(
            Distributions::Uniform(Jiffies(2), Jiffies(4)).scaled(2.0),
            Distributions::Uniform(Jiffies(4), Jiffies(8))
        );
    }
}

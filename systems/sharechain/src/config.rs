//! Run parameters, read once before the simulation starts.

use sharesim::{ConfigurationError, Distributions, Jiffies, ProcessId, Seed};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Simulated duration; events at or after it never fire.
    pub run_time: Jiffies,
    pub random_seed: Seed,
    /// Whether the driver should export every node's DAG.
    pub save_dot: bool,
    /// Time between two shares found by a node with hash rate 1.
    pub share_interval: Distributions,
    /// Per-edge propagation delay.
    pub propagation_delay: Distributions,
    /// Every `reward_interval`-th height on the final chain counts as a block.
    pub reward_interval: usize,
    /// How long a share may wait for a missing parent. `None` waits until the run ends.
    pub orphan_timeout: Option<Jiffies>,
    /// Relative hash rate of node `i + 1`; nodes past the end of the list get 1.
    pub hash_rates: Vec<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            run_time: Jiffies(1_000),
            random_seed: 42,
            save_dot: false,
            share_interval: Distributions::Exponential(Jiffies(10)),
            propagation_delay: Distributions::Uniform(Jiffies(1), Jiffies(5)),
            reward_interval: 10,
            orphan_timeout: None,
            hash_rates: Vec::new(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |name: &'static str, reason: &str| ConfigurationError::InvalidParameter {
            name,
            reason: reason.to_string(),
        };
        if self.run_time == Jiffies::ZERO {
            return Err(invalid("run_time", "must be at least 1"));
        }
        if self.reward_interval == 0 {
            return Err(invalid("reward_interval", "must be at least 1"));
        }
        if self.orphan_timeout == Some(Jiffies::ZERO) {
            return Err(invalid("orphan_timeout", "must be at least 1 when set"));
        }
        if let Some(rate) = self.hash_rates.iter().find(|r| !r.is_finite() || **r <= 0.0) {
            return Err(invalid(
                "hash_rates",
                &format!("{rate} is not a positive finite weight"),
            ));
        }
        self.propagation_delay.validate("propagation_delay")?;
        self.share_interval.validate("share_interval")?;
        for rate in &self.hash_rates {
            self.share_interval.scaled(1.0 / rate).validate("share_interval")?;
        }
        Ok(())
    }

    pub fn hash_rate(&self, id: ProcessId) -> f64 {
        id.checked_sub(1)
            .and_then(|i| self.hash_rates.get(i))
            .copied()
            .unwrap_or(1.0)
    }

    /// Share interval of node `id`; a faster node finds shares proportionally sooner.
    pub fn node_interval(&self, id: ProcessId) -> Distributions {
        self.share_interval.scaled(1.0 / self.hash_rate(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(SimulationConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_degenerate_values() {
        let bad = [
            SimulationConfig {
                run_time: Jiffies::ZERO,
                ..Default::default()
            },
            SimulationConfig {
                reward_interval: 0,
                ..Default::default()
            },
            SimulationConfig {
                hash_rates: vec![1.0, -2.0],
                ..Default::default()
            },
            SimulationConfig {
                orphan_timeout: Some(Jiffies::ZERO),
                ..Default::default()
            },
            SimulationConfig {
                propagation_delay: Distributions::Uniform(Jiffies(9), Jiffies(2)),
                ..Default::default()
            },
            // Mean scales down to zero
            SimulationConfig {
                hash_rates: vec![100.0],
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn hash_rate_scales_interval() {
        let config = SimulationConfig {
            hash_rates: vec![2.0],
            ..Default::default()
        };
        assert_eq!(
            config.node_interval(1),
            Distributions::Exponential(Jiffies(5))
        );
        assert_eq!(
            config.node_interval(2),
            Distributions::Exponential(Jiffies(10))
        );
    }
}

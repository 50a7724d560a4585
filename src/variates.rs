//! Interarrival and service-time sampling.
//!
//! All randomness in a run flows through one [`VariateSource`], so a seeded
//! source reproduces the same trajectory draw for draw.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Exp, Normal};

use crate::error::{Error, Result};
use crate::models::{ArrivalDistribution, ServiceDistribution};

pub struct VariateSource {
    rng: StdRng,
}

impl VariateSource {
    /// Seeded sources are reproducible; `None` draws a seed from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn next_interarrival(&mut self, dist: &ArrivalDistribution) -> Result<f64> {
        dist.validate()?;
        match *dist {
            ArrivalDistribution::Exponential { rate } => {
                let exp = Exp::new(rate).map_err(|_| positive("arrival rate", rate))?;
                Ok(self.rng.sample(exp))
            }
            ArrivalDistribution::ConstantRate { rate } => Ok(1.0 / rate),
            ArrivalDistribution::FixedInterval { interval } => Ok(interval),
        }
    }

    pub fn next_service(&mut self, dist: &ServiceDistribution) -> Result<f64> {
        dist.validate()?;
        match *dist {
            ServiceDistribution::Exponential { rate } => {
                let exp = Exp::new(rate).map_err(|_| positive("service rate", rate))?;
                Ok(self.rng.sample(exp))
            }
            ServiceDistribution::Constant { time } => Ok(time),
            ServiceDistribution::Normal { mean, std_dev } => {
                let normal = Normal::new(mean, std_dev)
                    .map_err(|_| non_negative("service std_dev", std_dev))?;
                Ok(self.rng.sample(normal).max(0.0))
            }
        }
    }
}

impl ArrivalDistribution {
    pub fn validate(&self) -> Result<()> {
        match *self {
            ArrivalDistribution::Exponential { rate }
            | ArrivalDistribution::ConstantRate { rate } => {
                require_positive("arrival rate", rate)
            }
            ArrivalDistribution::FixedInterval { interval } => {
                require_positive("arrival interval", interval)
            }
        }
    }
}

impl ServiceDistribution {
    pub fn validate(&self) -> Result<()> {
        match *self {
            ServiceDistribution::Exponential { rate } => require_positive("service rate", rate),
            ServiceDistribution::Constant { time } => require_positive("service time", time),
            ServiceDistribution::Normal { mean, std_dev } => {
                require_positive("service mean", mean)?;
                if std_dev >= 0.0 && std_dev.is_finite() {
                    Ok(())
                } else {
                    Err(non_negative("service std_dev", std_dev))
                }
            }
        }
    }
}

fn require_positive(name: &'static str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(positive(name, value))
    }
}

fn positive(name: &'static str, value: f64) -> Error {
    Error::InvalidParameter {
        name,
        requirement: "positive",
        value,
    }
}

fn non_negative(name: &'static str, value: f64) -> Error {
    Error::InvalidParameter {
        name,
        requirement: "non-negative",
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_families_return_literal_values() {
        let mut source = VariateSource::new(Some(1));
        assert_eq!(
            source
                .next_interarrival(&ArrivalDistribution::ConstantRate { rate: 4.0 })
                .unwrap(),
            0.25
        );
        assert_eq!(
            source
                .next_interarrival(&ArrivalDistribution::FixedInterval { interval: 0.2 })
                .unwrap(),
            0.2
        );
        assert_eq!(
            source
                .next_service(&ServiceDistribution::Constant { time: 0.15 })
                .unwrap(),
            0.15
        );
    }

    #[test]
    fn same_seed_reproduces_samples() {
        let dist = ArrivalDistribution::Exponential { rate: 5.0 };
        let mut a = VariateSource::new(Some(42));
        let mut b = VariateSource::new(Some(42));
        let left: Vec<f64> = (0..16).map(|_| a.next_interarrival(&dist).unwrap()).collect();
        let right: Vec<f64> = (0..16).map(|_| b.next_interarrival(&dist).unwrap()).collect();
        assert_eq!(left, right);
        assert!(left.iter().all(|gap| *gap >= 0.0));
    }

    #[test]
    fn exponential_mean_tracks_rate() {
        let dist = ServiceDistribution::Exponential { rate: 4.0 };
        let mut source = VariateSource::new(Some(7));
        let n = 20_000;
        let mean = (0..n)
            .map(|_| source.next_service(&dist).unwrap())
            .sum::<f64>()
            / n as f64;
        assert!((mean - 0.25).abs() < 0.01, "mean was {}", mean);
    }

    #[test]
    fn normal_service_is_clamped_at_zero() {
        let dist = ServiceDistribution::Normal {
            mean: 0.01,
            std_dev: 5.0,
        };
        let mut source = VariateSource::new(Some(3));
        let samples: Vec<f64> = (0..1_000)
            .map(|_| source.next_service(&dist).unwrap())
            .collect();
        assert!(samples.iter().all(|value| *value >= 0.0));
        assert!(samples.iter().any(|value| *value == 0.0));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut source = VariateSource::new(Some(1));
        let err = source
            .next_interarrival(&ArrivalDistribution::Exponential { rate: 0.0 })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid parameter: arrival rate must be positive (got 0)"
        );
        assert!(source
            .next_interarrival(&ArrivalDistribution::FixedInterval { interval: -1.0 })
            .is_err());
        assert!(source
            .next_service(&ServiceDistribution::Constant { time: 0.0 })
            .is_err());
        let err = source
            .next_service(&ServiceDistribution::Normal {
                mean: 1.0,
                std_dev: -0.5,
            })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid parameter: service std_dev must be non-negative (got -0.5)"
        );
        assert!(ServiceDistribution::Normal {
            mean: 0.0,
            std_dev: 1.0
        }
        .validate()
        .is_err());
    }

    #[test]
    fn zero_std_dev_is_allowed() {
        let dist = ServiceDistribution::Normal {
            mean: 0.3,
            std_dev: 0.0,
        };
        let mut source = VariateSource::new(Some(9));
        assert_eq!(source.next_service(&dist).unwrap(), 0.3);
    }
}

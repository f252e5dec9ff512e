// Random stage parameters
//
// A stage parameter is either a fixed value or a distribution that is sampled
// afresh on every call (once per channel for per-channel stages). Sampling
// draws from the context's generator, so a seeded context reproduces the
// same parameter sequence.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use sluice_core::{Error, Result};

/// A scalar parameter, possibly random.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Fixed(f64),
    /// Uniform on the closed interval `[low, high]`.
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std: f64 },
    /// One of the listed values, chosen uniformly.
    Choice(Vec<f64>),
}

impl Param {
    pub fn uniform(low: f64, high: f64) -> Result<Self> {
        let p = Param::Uniform { low, high };
        p.validate()?;
        Ok(p)
    }

    pub fn normal(mean: f64, std: f64) -> Result<Self> {
        let p = Param::Normal { mean, std };
        p.validate()?;
        Ok(p)
    }

    pub fn choice(values: impl Into<Vec<f64>>) -> Result<Self> {
        let p = Param::Choice(values.into());
        p.validate()?;
        Ok(p)
    }

    /// Check that the parameter can be sampled.
    pub fn validate(&self) -> Result<()> {
        match self {
            Param::Fixed(_) => Ok(()),
            Param::Uniform { low, high } => {
                if low.is_finite() && high.is_finite() && low <= high {
                    Ok(())
                } else {
                    Err(Error::config(format!(
                        "uniform parameter needs finite low <= high, got [{low}, {high}]"
                    )))
                }
            }
            Param::Normal { mean, std } => {
                normal_dist(*mean, *std, "normal parameter")?;
                Ok(())
            }
            Param::Choice(values) => {
                if values.is_empty() {
                    Err(Error::config("choice parameter needs at least one value"))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Whether sampling is deterministic.
    pub fn is_fixed(&self) -> bool {
        matches!(self, Param::Fixed(_))
    }

    /// Draw one value.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        match self {
            Param::Fixed(v) => Ok(*v),
            Param::Uniform { low, high } => {
                self.validate()?;
                Ok(rng.gen_range(*low..=*high))
            }
            Param::Normal { mean, std } => {
                let dist = normal_dist(*mean, *std, "normal parameter")?;
                Ok(dist.sample(rng))
            }
            Param::Choice(values) => values
                .choose(rng)
                .copied()
                .ok_or_else(|| Error::config("choice parameter needs at least one value")),
        }
    }

    /// Draw `n` independent values.
    pub fn sample_n<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<f64>> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

/// Normal distribution with finite mean and finite, non-negative std.
///
/// `Normal::new` alone lets a negative std through.
pub(crate) fn normal_dist(mean: f64, std: f64, what: &str) -> Result<Normal<f64>> {
    if !(mean.is_finite() && std.is_finite() && std >= 0.0) {
        return Err(Error::config(format!(
            "{what} needs finite mean and std >= 0, got mean {mean}, std {std}"
        )));
    }
    Normal::new(mean, std).map_err(|e| Error::config_with_source(format!("invalid {what}"), e))
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Fixed(v)
    }
}

impl Default for Param {
    fn default() -> Self {
        Param::Fixed(0.0)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn fixed_is_constant() {
        let mut rng = StdRng::seed_from_u64(0);
        let p = Param::from(1.5);
        assert!(p.is_fixed());
        assert_eq!(p.sample_n(4, &mut rng).unwrap(), vec![1.5; 4]);
    }

    #[test]
    fn uniform_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let p = Param::uniform(-2.0, 3.0).unwrap();
        for v in p.sample_n(200, &mut rng).unwrap() {
            assert!((-2.0..=3.0).contains(&v));
        }
        let degenerate = Param::uniform(4.0, 4.0).unwrap();
        assert_eq!(degenerate.sample(&mut rng).unwrap(), 4.0);
    }

    #[test]
    fn drawn_per_call() {
        let mut rng = StdRng::seed_from_u64(2);
        let p = Param::uniform(0.0, 1.0).unwrap();
        let a = p.sample(&mut rng).unwrap();
        let b = p.sample(&mut rng).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn choice_picks_listed_values() {
        let mut rng = StdRng::seed_from_u64(3);
        let p = Param::choice(vec![0.5, 2.0]).unwrap();
        for v in p.sample_n(20, &mut rng).unwrap() {
            assert!(v == 0.5 || v == 2.0);
        }
    }

    #[test]
    fn invalid_parameters() {
        assert!(Param::uniform(1.0, 0.0).unwrap_err().is_config());
        assert!(Param::normal(0.0, -1.0).unwrap_err().is_config());
        assert!(Param::choice(Vec::new()).unwrap_err().is_config());
        let mut rng = StdRng::seed_from_u64(0);
        let bad = Param::Uniform {
            low: f64::NAN,
            high: 1.0,
        };
        assert!(bad.sample(&mut rng).is_err());
    }

    #[test]
    fn negative_std_rejected_when_sampling() {
        let mut rng = StdRng::seed_from_u64(0);
        let unchecked = Param::Normal {
            mean: 0.0,
            std: -1.0,
        };
        assert!(unchecked.validate().unwrap_err().is_config());
        assert!(unchecked.sample(&mut rng).unwrap_err().is_config());
        assert!(Param::normal(0.0, f64::INFINITY).unwrap_err().is_config());
        assert_eq!(Param::normal(2.0, 0.0).unwrap().sample(&mut rng).unwrap(), 2.0);
    }
}

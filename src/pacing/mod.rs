//! Trade-pair pacing: delay sampling per strategy and precomputed plans.
//!
//! Everything here is pure and deterministic given the caller's RNG; there
//! is no shared state between calls. The execution loop samples one delay
//! per iteration, while the estimator and trending mode build a whole
//! [`PacingPlan`] up front.

pub mod trending;

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

/// Named pacing preset controlling delay variance around the base interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Middle case: delays in `[0.8, 1.2] × base`
    #[default]
    Balanced,
    /// Narrow variance biased toward the base: `[0.7, 1.1] × base`
    Aggressive,
    /// Wide, organic-looking variance: `[0.5, 1.8] × base`
    Organic,
}

impl Strategy {
    /// Delay bounds as multiples of the base delay.
    pub fn delay_bounds(&self) -> (f64, f64) {
        match self {
            Strategy::Balanced => (0.8, 1.2),
            Strategy::Aggressive => (0.7, 1.1),
            Strategy::Organic => (0.5, 1.8),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Balanced => "balanced",
            Strategy::Aggressive => "aggressive",
            Strategy::Organic => "organic",
        })
    }
}

impl FromStr for Strategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "balanced" => Ok(Strategy::Balanced),
            "aggressive" => Ok(Strategy::Aggressive),
            "organic" => Ok(Strategy::Organic),
            other => Err(EngineError::invalid(
                "strategy",
                format!("unknown strategy '{other}' (expected balanced, aggressive or organic)"),
            )),
        }
    }
}

/// Base delay between trade pairs: `total_duration_secs / num_trades`.
///
/// Fails with `InvalidParameters` for a zero trade count rather than
/// dividing by zero.
pub fn base_delay_secs(total_duration_secs: f64, num_trades: u32) -> EngineResult<f64> {
    if num_trades == 0 {
        return Err(EngineError::invalid("num_trades", "must be at least 1"));
    }
    Ok(total_duration_secs / f64::from(num_trades))
}

/// Sample one fresh inter-pair delay for the given strategy.
pub fn sample_delay_secs<R: Rng + ?Sized>(base_delay: f64, strategy: Strategy, rng: &mut R) -> f64 {
    let (lo, hi) = strategy.delay_bounds();
    rng.gen_range(base_delay * lo..base_delay * hi)
}

/// One scheduled trade pair inside a [`PacingPlan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedPair {
    /// Seconds from job start
    pub offset_secs: f64,
    /// Trade-size multiplier for this pair (1.0 outside burst windows)
    pub size_multiplier: f64,
}

/// Derived schedule of offsets for each trade pair. Never persisted;
/// computed once per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingPlan {
    pub pairs: Vec<PlannedPair>,
}

impl PacingPlan {
    /// Build a strategy-mode plan: cumulative sampled delays, no bursts.
    pub fn for_strategy<R: Rng + ?Sized>(
        num_trades: u32,
        total_duration_secs: f64,
        strategy: Strategy,
        rng: &mut R,
    ) -> EngineResult<Self> {
        let base = base_delay_secs(total_duration_secs, num_trades)?;
        let mut offset = 0.0;
        let mut pairs = Vec::with_capacity(num_trades as usize);
        for _ in 0..num_trades {
            pairs.push(PlannedPair {
                offset_secs: offset,
                size_multiplier: 1.0,
            });
            offset += sample_delay_secs(base, strategy, rng);
        }
        Ok(PacingPlan { pairs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn balanced_delays_within_bounds() {
        let mut rng = SmallRng::seed_from_u64(7);
        let base = base_delay_secs(60.0, 5).unwrap();
        assert_eq!(base, 12.0);
        for _ in 0..500 {
            let d = sample_delay_secs(base, Strategy::Balanced, &mut rng);
            assert!((0.8 * base..1.2 * base).contains(&d), "delay {d} out of bounds");
        }
    }

    #[test]
    fn aggressive_and_organic_bounds() {
        let mut rng = SmallRng::seed_from_u64(11);
        let base = 10.0;
        for _ in 0..500 {
            let a = sample_delay_secs(base, Strategy::Aggressive, &mut rng);
            assert!((7.0..11.0).contains(&a));
            let o = sample_delay_secs(base, Strategy::Organic, &mut rng);
            assert!((5.0..18.0).contains(&o));
        }
    }

    #[test]
    fn zero_trades_is_invalid() {
        let err = base_delay_secs(60.0, 0).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidParameters { field: "num_trades", .. }
        ));
    }

    #[test]
    fn strategy_parsing() {
        assert_eq!("Balanced".parse::<Strategy>().unwrap(), Strategy::Balanced);
        assert_eq!("organic".parse::<Strategy>().unwrap(), Strategy::Organic);
        assert!("turbo".parse::<Strategy>().is_err());
    }

    #[test]
    fn strategy_plan_is_monotone_and_sized() {
        let mut rng = SmallRng::seed_from_u64(3);
        let plan = PacingPlan::for_strategy(10, 600.0, Strategy::Balanced, &mut rng).unwrap();
        assert_eq!(plan.pairs.len(), 10);
        assert_eq!(plan.pairs[0].offset_secs, 0.0);
        for w in plan.pairs.windows(2) {
            assert!(w[1].offset_secs > w[0].offset_secs);
        }
    }

    #[test]
    fn plan_deterministic_given_seed() {
        let mut a = SmallRng::seed_from_u64(42);
        let mut b = SmallRng::seed_from_u64(42);
        let p1 = PacingPlan::for_strategy(6, 120.0, Strategy::Organic, &mut a).unwrap();
        let p2 = PacingPlan::for_strategy(6, 120.0, Strategy::Organic, &mut b).unwrap();
        let offs1: Vec<f64> = p1.pairs.iter().map(|p| p.offset_secs).collect();
        let offs2: Vec<f64> = p2.pairs.iter().map(|p| p.offset_secs).collect();
        assert_eq!(offs1, offs2);
    }
}

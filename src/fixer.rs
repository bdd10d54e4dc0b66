use log::debug;
use statrs::function::erf::erfc;

use crate::{
    cfg::{Config, ModeThresholds},
    constants::RELAXED_DEVIATION_FACTOR,
    double_diff::DoubleDifference,
    prelude::Stage,
};

/// Maximal number of integer intervals summed by the decision test
const MAX_DECISION_TERMS: usize = 50;

/// Probability that rounding `value` to its nearest integer is wrong,
/// given its standard deviation. Dong & Bock (1989) decision function.
pub fn wrong_rounding_probability(value: f64, sigma: f64) -> f64 {
    let frac = (value - value.round()).abs();

    if sigma <= 0.0 {
        return 0.0;
    }

    let scaling = std::f64::consts::SQRT_2 * sigma;
    let mut probability = 0.0;

    for i in 1..=MAX_DECISION_TERMS {
        let i = i as f64;
        let term = erfc((i - frac) / scaling) - erfc((i + frac) / scaling);
        probability += term;
        if term < 1.0E-12 {
            break;
        }
    }

    probability.clamp(0.0, 1.0)
}

/// How a [DoubleDifference] was fixed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixDecision {
    /// Passed the statistical decision test
    Fixed(i64),
    /// Passed the relaxed partial fixing bound only
    Relaxed(i64),
    /// Not fixed
    Rejected,
}

impl FixDecision {
    pub fn integer(&self) -> Option<i64> {
        match self {
            Self::Fixed(n) | Self::Relaxed(n) => Some(*n),
            Self::Rejected => None,
        }
    }
}

/// [CombinationFixer] rounds stage combinations to their nearest integer
/// when that rounding is statistically safe.
pub struct CombinationFixer<'a> {
    cfg: &'a Config,
}

impl<'a> CombinationFixer<'a> {
    pub fn new(cfg: &'a Config) -> Self {
        Self { cfg }
    }

    /// Decision on this float value (cycles) and standard deviation (cycles).
    /// - well_tracked: both satellites have been fixed and tracked long enough
    ///   for the deviation bounds to be relaxed.
    pub fn decide(&self, stage: Stage, value: f64, sigma: f64, well_tracked: bool) -> FixDecision {
        let ModeThresholds {
            max_deviation,
            max_sigma,
            alpha,
        } = self.cfg.thresholds.get(stage);

        let factor = if well_tracked {
            RELAXED_DEVIATION_FACTOR
        } else {
            1.0
        };

        let nearest = value.round();
        let frac = (value - nearest).abs();

        if frac < max_deviation * factor
            && sigma < max_sigma
            && wrong_rounding_probability(value, sigma) <= alpha
        {
            return FixDecision::Fixed(nearest as i64);
        }

        if self.cfg.partial_fixing && frac < self.cfg.partial_max_deviation * factor {
            return FixDecision::Relaxed(nearest as i64);
        }

        FixDecision::Rejected
    }

    /// Tries to fix the stage combination of this [DoubleDifference].
    /// Returns true when fixed.
    pub fn fix(&self, stage: Stage, dd: &mut DoubleDifference, well_tracked: bool) -> bool {
        let Some(combination) = dd.combination.as_mut() else {
            return false;
        };

        let decision = self.decide(
            stage,
            combination.corrected(),
            combination.sigma,
            well_tracked,
        );

        combination.fixed = decision.integer();

        match decision {
            FixDecision::Fixed(n) => {
                debug!("{}({}) - fixed to {}", stage, dd.pair, n);
                true
            },
            FixDecision::Relaxed(n) => {
                debug!("{}({}) - relaxed fix to {}", stage, dd.pair, n);
                true
            },
            FixDecision::Rejected => {
                debug!(
                    "{}({}) - not fixed (value={:.3}, sigma={:.3})",
                    stage,
                    dd.pair,
                    combination.corrected(),
                    combination.sigma
                );
                false
            },
        }
    }
}

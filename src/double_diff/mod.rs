use crate::{
    parameter::{AmbiguityKind, TimeWindow},
    prelude::{Constellation, SV},
};

mod builder;
pub use builder::DoubleDifferenceBuilder;

/// Satellite pair of a [DoubleDifference], on a given site.
/// `sv1` is always the smallest of the two.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SatPair {
    pub site: String,
    pub sv1: SV,
    pub sv2: SV,
}

impl std::fmt::Display for SatPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.site, self.sv1, self.sv2)
    }
}

impl SatPair {
    pub fn new(site: &str, sv_a: SV, sv_b: SV) -> Self {
        let (sv1, sv2) = if sv_a < sv_b { (sv_a, sv_b) } else { (sv_b, sv_a) };
        Self {
            site: site.to_string(),
            sv1,
            sv2,
        }
    }

    /// True if this pair involves this [SV]
    pub fn contains(&self, sv: SV) -> bool {
        self.sv1 == sv || self.sv2 == sv
    }
}

/// Stage combination of a [DoubleDifference], in cycles.
///
/// The combination is a linear form over the filter parameters:
/// cycles = (Σ terms·x - offset) / wavelength.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Combination {
    /// (filter index, coefficient) pairs. Empty when the combination
    /// does not derive from the filter state (Melbourne-Wübbena).
    pub terms: Vec<(usize, f64)>,
    /// Offset (filter units), the wide lane contribution
    /// of the ionosphere free ambiguities.
    pub offset: f64,
    /// Scaling from filter units to cycles
    pub wavelength: f64,
    /// Float value (cycles), prior UPD correction
    pub float: f64,
    /// Formal standard deviation (cycles)
    pub sigma: f64,
    /// UPD correction (cycles): upd(sv1) - upd(sv2)
    pub upd: f64,
    /// Fixed integer
    pub fixed: Option<i64>,
}

impl Combination {
    /// Float value (cycles) corrected for phase biases
    pub fn corrected(&self) -> f64 {
        self.float - self.upd
    }

    /// Absolute deviation to nearest integer
    pub fn deviation(&self) -> f64 {
        let value = self.corrected();
        (value - value.round()).abs()
    }

    /// True if fixed
    pub fn is_fixed(&self) -> bool {
        self.fixed.is_some()
    }
}

/// Single receiver [DoubleDifference] between two satellites
/// of the same constellation, on the same site.
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleDifference {
    /// [SatPair]
    pub pair: SatPair,
    /// [Constellation] of both satellites
    pub constellation: Constellation,
    /// [AmbiguityKind] of both parameters
    pub kind: AmbiguityKind,
    /// Glonass frequency channels of sv1 and sv2
    pub channels: (Option<i8>, Option<i8>),
    /// Filter indexes of sv1 and sv2
    pub indexes: (usize, usize),
    /// Common time window
    pub window: TimeWindow,
    /// Unit conversion applied to sv1 and sv2 values:
    /// 1 in meters, 1/λ for Glonass (cycles)
    pub factors: (f64, f64),
    /// Raw double difference (meters, cycles for Glonass)
    pub raw: f64,
    /// Formal standard deviation of the raw value (same unit)
    pub raw_sigma: Option<f64>,
    /// Stage [Combination]
    pub combination: Option<Combination>,
}

impl std::fmt::Display for DoubleDifference {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}({})", self.pair, self.kind)?;
        if let Some(combination) = &self.combination {
            write!(
                f,
                " float={:.3} upd={:.3} sigma={:.3}",
                combination.float, combination.upd, combination.sigma
            )?;
            if let Some(fixed) = combination.fixed {
                write!(f, " fixed={}", fixed)?;
            }
        }
        Ok(())
    }
}

impl DoubleDifference {
    /// Raw difference as a linear form over the filter parameters
    pub fn terms(&self) -> Vec<(usize, f64)> {
        vec![
            (self.indexes.0, self.factors.0),
            (self.indexes.1, -self.factors.1),
        ]
    }

    /// True if this is a Glonass-Glonass pair
    pub fn is_glonass(&self) -> bool {
        self.constellation == Constellation::Glonass
    }

    /// True once fixed in current stage
    pub fn is_fixed(&self) -> bool {
        self.combination
            .as_ref()
            .map(|c| c.is_fixed())
            .unwrap_or(false)
    }

    /// Fixed integer in current stage
    pub fn fixed(&self) -> Option<i64> {
        self.combination.as_ref()?.fixed
    }

    /// Formal sigma of the stage combination, when formed
    pub fn sigma(&self) -> Option<f64> {
        self.combination.as_ref().map(|c| c.sigma)
    }
}

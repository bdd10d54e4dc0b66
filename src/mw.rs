use std::collections::HashMap;

use log::{debug, warn};

use crate::prelude::{Duration, Epoch, Stage, SV};

/// Melbourne-Wübbena estimate (cycles) of one satellite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MwEstimate {
    /// Mean value (cycles)
    pub value: f64,
    /// Standard deviation of the samples (cycles)
    pub sigma: f64,
    /// Number of samples
    pub count: u32,
}

/// Any Melbourne-Wübbena source should implement [MwProvider].
pub trait MwProvider {
    /// Provide the averaged wide lane combination of this [Stage] for this [SV], in cycles.
    fn estimate(&self, sv: SV, stage: Stage) -> Option<MwEstimate>;
}

/// Running mean and variance
#[derive(Debug, Clone, Default)]
struct Averager {
    mean: f64,
    m2: f64,
    count: u32,
    last: Option<Epoch>,
}

impl Averager {
    /// Push new value into [Averager]
    fn add(&mut self, t: Epoch, x: f64) {
        self.count += 1;
        let k = self.count as f64;
        let delta = x - self.mean;
        self.mean += delta / k;
        self.m2 += delta * (x - self.mean);
        self.last = Some(t);
    }

    fn sigma(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / (self.count - 1) as f64).sqrt()
        }
    }

    /// Reset [Averager]
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// [MwAccumulator] averages Melbourne-Wübbena combinations (in cycles),
/// per satellite and per wide lane class [Stage].
/// Averages are reset on data gaps and on jumps (cycle slips).
#[derive(Debug, Clone)]
pub struct MwAccumulator {
    gap_tolerance: Duration,
    slip_threshold: f64,
    inner: HashMap<(SV, Stage), Averager>,
}

impl MwAccumulator {
    /// Minimal number of samples before jumps are looked for
    const MIN_SLIP_SAMPLES: u32 = 3;

    /// Creates a new [MwAccumulator].
    /// - gap_tolerance: averages are reset after data gaps larger than this
    /// - slip_threshold: averages are reset on jumps larger than this (cycles)
    pub fn new(gap_tolerance: Duration, slip_threshold: f64) -> Self {
        Self {
            gap_tolerance,
            slip_threshold,
            inner: HashMap::with_capacity(32),
        }
    }

    /// Push new MW sample (cycles)
    pub fn push(&mut self, t: Epoch, sv: SV, stage: Stage, value: f64) {
        let averager = self.inner.entry((sv, stage)).or_default();

        if let Some(last) = averager.last {
            if t - last > self.gap_tolerance {
                debug!("{}({}) - {} mw reset on data gap", t, sv, stage);
                averager.reset();
            }
        }

        if averager.count >= Self::MIN_SLIP_SAMPLES
            && (value - averager.mean).abs() > self.slip_threshold
        {
            warn!(
                "{}({}) - {} mw jump ({:.3} cycles): reset",
                t,
                sv,
                stage,
                value - averager.mean
            );
            averager.reset();
        }

        averager.add(t, value);
    }

    /// Resets all averages of this [SV]
    pub fn reset_sv(&mut self, sv: SV) {
        self.inner.retain(|(k, _), _| *k != sv);
    }
}

impl MwProvider for MwAccumulator {
    fn estimate(&self, sv: SV, stage: Stage) -> Option<MwEstimate> {
        let averager = self.inner.get(&(sv, stage))?;
        if averager.count == 0 {
            return None;
        }
        Some(MwEstimate {
            value: averager.mean,
            sigma: averager.sigma(),
            count: averager.count,
        })
    }
}

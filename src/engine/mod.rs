//! Ambiguity resolution engine
use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use log::{debug, error, info, warn};
use nalgebra::{DMatrix, DVector};

mod diagnostics;
mod state;

pub use diagnostics::Diagnostics;
pub use state::{CacheEntry, FixCounter, FixKey, StageState};

use crate::{
    cfg::Config,
    constants::{PARTIAL_MIN_FIX_EPOCHS, RELAXED_MIN_FIXES, RELAXED_MIN_LOCK_EPOCHS},
    constraint::ConstraintInjector,
    double_diff::{DoubleDifference, DoubleDifferenceBuilder, SatPair},
    error::Error,
    filter::PositioningFilter,
    fixer::{CombinationFixer, FixDecision},
    independence::Independence,
    lambda::{Lambda, LambdaSolution, PartialCandidate},
    mw::MwProvider,
    prelude::{Constellation, Epoch, Stage, SV},
    snapshot::EpochSnapshot,
    upd::{UpdCorrector, UpdProvider},
    wavelength::WavelengthTable,
};

/// Minimal number of distinct satellites for wide lane classes
const MIN_WIDE_LANE_SATELLITES: usize = 4;

/// Fix status of a successful [AmbiguityEngine::run]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixStatus {
    /// All candidates got fixed
    Fixed,
    /// Only a subset got fixed (partial ambiguity resolution)
    Partial,
}

impl std::fmt::Display for FixStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

/// Outcome of a successful [AmbiguityEngine::run]
#[derive(Debug, Clone, PartialEq)]
pub struct FixOutcome {
    /// Sampling [Epoch]
    pub t: Epoch,
    /// Processed [Stage]
    pub stage: Stage,
    /// [FixStatus]
    pub status: FixStatus,
    /// Number of fixed double differences
    pub nfixed: usize,
    /// Number of constraints applied to the filter
    pub nconstraints: usize,
    /// Search ratio (narrow lane only)
    pub ratio: Option<f64>,
    /// Bootstrapping success rate (narrow lane only)
    pub bootstrap: Option<f64>,
    /// Updated filter estimates
    pub estimates: DVector<f64>,
}

/// Stage resolution result, prior bookkeeping
struct Resolution {
    /// All fixed double differences, to be persisted
    fixed: Vec<DoubleDifference>,
    /// Independent subset, to be constrained
    independent: Vec<DoubleDifference>,
    status: FixStatus,
    ratio: Option<f64>,
    bootstrap: Option<f64>,
}

/// [AmbiguityEngine] resolves the carrier phase ambiguities of one site,
/// one [Stage] at a time. Stages should be processed in [Stage::CASCADE] order.
pub struct AmbiguityEngine {
    /// [Config]
    cfg: Config,
    /// [WavelengthTable]
    wavelengths: WavelengthTable,
    /// [Lambda] integer search
    lambda: Lambda,
    /// [StageState]s, indexed by [Stage::index]
    states: [StageState; 5],
    /// Start of continuous tracking, per site and satellite
    locks: HashMap<(String, SV), Epoch>,
    /// [Diagnostics]
    diagnostics: Diagnostics,
}

impl AmbiguityEngine {
    /// Creates a new [AmbiguityEngine]
    pub fn new(cfg: &Config) -> Result<Self, Error> {
        cfg.validate().map_err(|e| {
            error!("ambiguity engine: {}", e);
            e
        })?;

        Ok(Self {
            cfg: cfg.clone(),
            wavelengths: WavelengthTable::new(cfg.bands.clone()),
            lambda: Lambda::new(cfg.ratio_threshold, cfg.bootstrap_threshold),
            states: Default::default(),
            locks: HashMap::with_capacity(32),
            diagnostics: Diagnostics::default(),
        })
    }

    /// Streams the ratio of each narrow lane search
    pub fn with_ratio_stream(mut self, stream: Box<dyn std::io::Write>) -> Self {
        self.diagnostics.set_ratio_stream(stream);
        self
    }

    /// Streams the bootstrapping success rate of each narrow lane search
    pub fn with_bootstrap_stream(mut self, stream: Box<dyn std::io::Write>) -> Self {
        self.diagnostics.set_bootstrap_stream(stream);
        self
    }

    /// [Config] in use
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// [StageState] of this [Stage]
    pub fn state(&self, stage: Stage) -> &StageState {
        &self.states[stage.index()]
    }

    /// Currently cached integer of this [SatPair] for this [Stage]
    pub fn cached_integer(&self, stage: Stage, pair: &SatPair) -> Option<i64> {
        self.state(stage).integers.get(pair).map(|entry| entry.value)
    }

    /// Modifies the reference satellites. Independence
    /// buffers are reallocated on next call.
    pub fn set_reference_satellites(&mut self, satellites: &[SV]) {
        self.cfg.reference_satellites = satellites.to_vec();
        for state in self.states.iter_mut() {
            state.buffer.release();
        }
    }

    /// Resets this engine entirely
    pub fn reset(&mut self) {
        self.states = Default::default();
        self.locks.clear();
    }

    /// Number of continuously tracked epochs
    fn lock_epochs(&self, site: &str, sv: SV, t: Epoch) -> f64 {
        let sampling = self.cfg.sampling_interval.to_seconds();
        match self.locks.get(&(site.to_string(), sv)) {
            Some(start) if sampling > 0.0 => (t - *start).to_seconds() / sampling,
            _ => 0.0,
        }
    }

    /// Updates lock estimates. New ambiguities reset the counters of that satellite.
    fn track_locks(&mut self, snapshot: &EpochSnapshot) {
        // most recent start over all ambiguities of each satellite
        let mut starts = HashMap::<(String, SV), Epoch>::with_capacity(snapshot.ambiguities.len());

        for param in snapshot.ambiguities.iter() {
            let start = starts
                .entry((param.site.clone(), param.sv))
                .or_insert(param.window.start);

            if param.window.start > *start {
                *start = param.window.start;
            }
        }

        for (key, start) in starts.into_iter() {
            match self.locks.get(&key) {
                Some(prev) if *prev == start => {},
                Some(_) => {
                    debug!("{}({}) - new ambiguity", snapshot.t, key.1);
                    for state in self.states.iter_mut() {
                        state.reset_sv(key.1);
                    }
                    self.locks.insert(key, start);
                },
                None => {
                    self.locks.insert(key, start);
                },
            }
        }
    }

    /// Both satellites have been fixed and tracked long enough
    fn is_well_tracked(&self, t: Epoch, stage: Stage, pair: &SatPair) -> bool {
        let state = self.state(stage);
        [pair.sv1, pair.sv2].iter().all(|sv| {
            state.fix_count(*sv) >= RELAXED_MIN_FIXES
                && self.lock_epochs(&pair.site, *sv, t) >= RELAXED_MIN_LOCK_EPOCHS
        })
    }

    /// Partial fixing removal preferences
    fn partial_candidate(&self, t: Epoch, dd: &DoubleDifference) -> PartialCandidate {
        let state = self.state(Stage::Nl);
        let eligible = [dd.pair.sv1, dd.pair.sv2].iter().any(|sv| {
            state.fix_count(*sv) < PARTIAL_MIN_FIX_EPOCHS
                || self.lock_epochs(&dd.pair.site, *sv, t) < self.cfg.partial_min_lock_epochs
        });

        PartialCandidate {
            eligible,
            glonass: dd.is_glonass(),
        }
    }

    /// Keeps the linearly independent [DoubleDifference]s, smallest sigma first.
    fn independent_subset(&mut self, stage: Stage, mut dds: Vec<DoubleDifference>) -> Vec<DoubleDifference> {
        dds.sort_by(|a, b| {
            let (s_a, s_b) = (a.sigma().unwrap_or(f64::MAX), b.sigma().unwrap_or(f64::MAX));
            s_a.total_cmp(&s_b)
        });

        let buffer = &mut self.states[stage.index()].buffer;
        buffer.begin();

        dds.into_iter()
            .filter(|dd| match buffer.try_insert(dd.indexes.0, dd.indexes.1) {
                Ok(Independence::Independent) => true,
                Ok(Independence::Dependent) => {
                    debug!("{}({}) - dependent", stage, dd.pair);
                    false
                },
                Err(e) => {
                    warn!("{}({}) - independence: {}", stage, dd.pair, e);
                    false
                },
            })
            .collect()
    }

    /// Drops the fixed integers that do not close over satellite triangles:
    /// N(a,c) = N(a,b) + N(b,c).
    fn loop_closure(stage: Stage, dds: Vec<DoubleDifference>) -> Vec<DoubleDifference> {
        let integers = dds
            .iter()
            .filter_map(|dd| Some((dd.pair.clone(), dd.fixed()?)))
            .collect::<HashMap<_, _>>();

        let mut offenders = HashSet::<SatPair>::new();

        let groups = dds
            .iter()
            .map(|dd| (dd.pair.site.clone(), dd.constellation))
            .unique()
            .collect::<Vec<(String, Constellation)>>();

        for (site, constellation) in groups.iter() {
            let satellites = dds
                .iter()
                .filter(|dd| dd.pair.site == *site && dd.constellation == *constellation)
                .flat_map(|dd| [dd.pair.sv1, dd.pair.sv2])
                .unique()
                .sorted()
                .collect::<Vec<_>>();

            for (a, b, c) in satellites.iter().tuple_combinations() {
                let ab = SatPair::new(site, *a, *b);
                let bc = SatPair::new(site, *b, *c);
                let ac = SatPair::new(site, *a, *c);

                if let (Some(n_ab), Some(n_bc), Some(n_ac)) =
                    (integers.get(&ab), integers.get(&bc), integers.get(&ac))
                {
                    if n_ab + n_bc != *n_ac {
                        warn!(
                            "{} - loop closure failure {}/{}/{} ({}+{}!={})",
                            stage, a, b, c, n_ab, n_bc, n_ac
                        );
                        offenders.insert(ab);
                        offenders.insert(bc);
                        offenders.insert(ac);
                    }
                }
            }
        }

        dds.into_iter()
            .filter(|dd| !offenders.contains(&dd.pair))
            .collect()
    }

    /// Wide lane classes: rounding
    fn resolve_wide_lane(
        &mut self,
        t: Epoch,
        stage: Stage,
        dds: Vec<DoubleDifference>,
    ) -> Result<Resolution, Error> {
        let well_tracked = dds
            .iter()
            .map(|dd| self.is_well_tracked(t, stage, &dd.pair))
            .collect::<Vec<_>>();

        let total = dds.len();
        let fixer = CombinationFixer::new(&self.cfg);

        let fixed = dds
            .into_iter()
            .zip(well_tracked)
            .filter_map(|(mut dd, well_tracked)| {
                if fixer.fix(stage, &mut dd, well_tracked) {
                    Some(dd)
                } else {
                    None
                }
            })
            .collect::<Vec<_>>();

        let fixed = Self::loop_closure(stage, fixed);

        let satellites = fixed
            .iter()
            .flat_map(|dd| [dd.pair.sv1, dd.pair.sv2])
            .unique()
            .count();

        if satellites < MIN_WIDE_LANE_SATELLITES {
            debug!("{}({}) - {} satellites fixed: not enough", t, stage, satellites);
            return Err(Error::NothingToFix);
        }

        let status = if fixed.len() == total {
            FixStatus::Fixed
        } else {
            FixStatus::Partial
        };

        let independent = self.independent_subset(stage, fixed.clone());

        Ok(Resolution {
            fixed,
            independent,
            status,
            ratio: None,
            bootstrap: None,
        })
    }

    /// Narrow lane: integer search
    fn resolve_narrow_lane(
        &mut self,
        t: Epoch,
        snapshot: &EpochSnapshot,
        dds: Vec<DoubleDifference>,
    ) -> Result<Resolution, Error> {
        let fixer = CombinationFixer::new(&self.cfg);

        let dds = dds
            .into_iter()
            .filter(|dd| {
                let Some(combination) = dd.combination.as_ref() else {
                    return false;
                };

                let well_tracked = self.is_well_tracked(t, Stage::Nl, &dd.pair);
                let value = combination.corrected();

                match fixer.decide(Stage::Nl, value, combination.sigma, well_tracked) {
                    FixDecision::Rejected => {
                        debug!(
                            "{}(NL) - {}: not a candidate (deviation={:.3}, sigma={:.3})",
                            t,
                            dd.pair,
                            combination.deviation(),
                            combination.sigma
                        );
                        false
                    },
                    _ => true,
                }
            })
            .collect::<Vec<_>>();

        let mut candidates = self.independent_subset(Stage::Nl, dds);

        if candidates.is_empty() {
            return Err(Error::NothingToFix);
        }

        if snapshot.covariance.is_none() {
            return Err(Error::MissingCovariance);
        }

        let n = candidates.len();
        let mut a = DVector::<f64>::zeros(n);
        let mut q = DMatrix::<f64>::zeros(n, n);

        for (i, dd_i) in candidates.iter().enumerate() {
            let c_i = dd_i.combination.as_ref().ok_or(Error::NothingToFix)?;
            a[i] = c_i.corrected();

            for (j, dd_j) in candidates.iter().enumerate().skip(i) {
                let c_j = dd_j.combination.as_ref().ok_or(Error::NothingToFix)?;
                let q_ij = snapshot
                    .covariance(&c_i.terms, &c_j.terms)
                    .ok_or(Error::MissingCovariance)?
                    / c_i.wavelength
                    / c_j.wavelength;
                q[(i, j)] = q_ij;
                q[(j, i)] = q_ij;
            }
        }

        let solution = match self.lambda.search_solution(&a, &q) {
            Ok(solution) => solution,
            Err(e) => {
                warn!("{}(NL) - search failure: {}", t, e);
                LambdaSolution::default()
            },
        };

        let (ratio, bootstrap) = (solution.ratio, solution.bootstrap);

        if solution.accepted {
            self.diagnostics.record(ratio, bootstrap);

            for (dd, fixed) in candidates.iter_mut().zip(solution.fixed.iter()) {
                if let Some(combination) = dd.combination.as_mut() {
                    combination.fixed = Some(*fixed);
                }
            }

            return Ok(Resolution {
                fixed: candidates.clone(),
                independent: candidates,
                status: FixStatus::Fixed,
                ratio: Some(ratio),
                bootstrap: Some(bootstrap),
            });
        }

        if !self.cfg.partial_fixing {
            self.diagnostics.record(ratio, bootstrap);
            warn!(
                "{}(NL) - search rejected (ratio={:.3}, bootstrap={:.4})",
                t, ratio, bootstrap
            );
            return Err(Error::SearchRejected { ratio, bootstrap });
        }

        let preferences = candidates
            .iter()
            .map(|dd| self.partial_candidate(t, dd))
            .collect::<Vec<_>>();

        let partial = match self
            .lambda
            .partial_search(&a, &q, &preferences, self.cfg.partial_min_fixed)
        {
            Ok(partial) => partial,
            Err(e) => {
                self.diagnostics.record(ratio, bootstrap);
                warn!("{}(NL) - partial fixing failure: {}", t, e);
                return Err(Error::SearchRejected { ratio, bootstrap });
            },
        };

        self.diagnostics
            .record(partial.solution.ratio, partial.solution.bootstrap);

        let mut fixed = Vec::with_capacity(partial.kept.len());

        for (index, integer) in partial.kept.iter().zip(partial.solution.fixed.iter()) {
            let mut dd = candidates[*index].clone();
            if let Some(combination) = dd.combination.as_mut() {
                combination.fixed = Some(*integer);
            }
            fixed.push(dd);
        }

        debug!(
            "{}(NL) - partial fixing: {}/{} (ratio={:.3})",
            t,
            fixed.len(),
            n,
            partial.solution.ratio
        );

        Ok(Resolution {
            fixed: fixed.clone(),
            independent: fixed,
            status: FixStatus::Partial,
            ratio: Some(partial.solution.ratio),
            bootstrap: Some(partial.solution.bootstrap),
        })
    }

    /// Resets the counters of this [Stage] when the UPD products are discontinued.
    fn check_upd_continuity(&mut self, t: Epoch, stage: Stage, upd: &dyn UpdProvider) {
        let interval = upd.interval(stage);
        let current = upd.corrections(stage, t).map(|set| set.epoch);

        let state = &mut self.states[stage.index()];

        if let Some(prev) = state.upd_epoch {
            let discontinued = match current {
                Some(current) => current - prev > interval,
                None => true,
            };

            if discontinued {
                debug!("{}({}) - phase bias discontinuity: counters reset", t, stage);
                state.reset_counters();
            }
        }

        state.upd_epoch = current;
    }

    /// Resolves the ambiguities of this [Stage] at this [Epoch], and
    /// constrains the [PositioningFilter] with the fixed integers.
    /// ## Input
    /// - t: sampling [Epoch]
    /// - stage: [Stage] to process
    /// - filter: [PositioningFilter]
    /// - mw: [MwProvider] (wide lane classes, ionosphere free processing)
    /// - upd: [UpdProvider]
    /// ## Output
    /// - [FixOutcome] on success. On failure, the filter keeps its float solution.
    pub fn run<F: PositioningFilter + ?Sized>(
        &mut self,
        t: Epoch,
        stage: Stage,
        filter: &mut F,
        mw: &dyn MwProvider,
        upd: &dyn UpdProvider,
    ) -> Result<FixOutcome, Error> {
        self.diagnostics.new_epoch(t);

        let upd_required = UpdCorrector::new(&self.cfg).is_required(stage);

        if upd_required {
            self.check_upd_continuity(t, stage, upd);
        }

        let max_gap = self.cfg.sampling_interval * self.cfg.max_gap_factor;
        let (max_parameters, max_ambiguities) = (self.cfg.max_parameters, self.cfg.max_ambiguities);

        let state = &mut self.states[stage.index()];
        state.age_out(t, max_gap);

        if !state.buffer.is_allocated() {
            state.buffer.allocate(max_parameters, max_ambiguities)?;
        }

        let snapshot = EpochSnapshot::capture(t, filter);
        self.track_locks(&snapshot);

        let mut builder = DoubleDifferenceBuilder::new(&self.cfg, &mut self.wavelengths);
        let dds = builder.build(&snapshot)?;

        let wide_lanes = self.states[Stage::Wl.index()].valid_integers(&dds);
        let mut dds = builder.combine(stage, &snapshot, &dds, mw, &wide_lanes);

        if !self.cfg.reference_satellites.is_empty() {
            let references = &self.cfg.reference_satellites;
            dds.retain(|dd| references.iter().any(|sv| dd.pair.contains(*sv)));
        }

        let corrector = UpdCorrector::new(&self.cfg);

        let dds = corrector.apply(
            t,
            stage,
            if upd_required {
                upd.corrections(stage, t)
            } else {
                None
            },
            dds,
        )?;

        if dds.is_empty() {
            debug!("{}({}) - no candidate", t, stage);
            return Err(Error::NothingToFix);
        }

        let resolution = if stage.is_wide_lane_class() {
            self.resolve_wide_lane(t, stage, dds)?
        } else {
            self.resolve_narrow_lane(t, &snapshot, dds)?
        };

        let nfixed = resolution.independent.len();
        let refix_gap = self.cfg.sampling_interval * self.cfg.refix_gap_factor;

        let state = &mut self.states[stage.index()];

        let regaining = match state.last_fix {
            Some(last_fix) => t - last_fix > refix_gap,
            None => true,
        };

        if regaining && nfixed < self.cfg.min_refix {
            warn!("{}({}) - {} fixed after gap: not enough", t, stage, nfixed);
            return Err(Error::NotEnoughFixed(nfixed));
        }

        for dd in resolution.fixed.iter() {
            state.persist(dd);
        }

        let nconstraints = ConstraintInjector::apply(t, stage, filter, &resolution.independent)?;

        let state = &mut self.states[stage.index()];

        let satellites = resolution
            .independent
            .iter()
            .flat_map(|dd| [dd.pair.sv1, dd.pair.sv2])
            .unique()
            .collect::<Vec<_>>();

        for sv in satellites {
            state.bump(t, FixKey::Satellite(sv));
        }

        state.bump(t, FixKey::Sum);
        state.last_fix = Some(t);

        info!(
            "{}({}) - {} {} ambiguities ({} constraints)",
            t, stage, resolution.status, nfixed, nconstraints
        );

        Ok(FixOutcome {
            t,
            stage,
            nfixed,
            nconstraints,
            status: resolution.status,
            ratio: resolution.ratio,
            bootstrap: resolution.bootstrap,
            estimates: filter.estimates(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::AmbiguityEngine;
    use crate::{
        cfg::Config,
        double_diff::{Combination, DoubleDifference, SatPair},
        error::Error,
        parameter::{AmbiguityKind, TimeWindow},
        prelude::{Constellation, Epoch, Stage, SV},
    };

    fn dd(a: u8, b: u8, fixed: i64) -> DoubleDifference {
        let t = Epoch::from_gpst_seconds(0.0);
        DoubleDifference {
            pair: SatPair::new(
                "ALGO",
                SV::new(Constellation::GPS, a),
                SV::new(Constellation::GPS, b),
            ),
            constellation: Constellation::GPS,
            kind: AmbiguityKind::IonosphereFree,
            channels: (None, None),
            indexes: (a as usize, b as usize),
            window: TimeWindow::new(t, t),
            factors: (1.0, 1.0),
            raw: 0.0,
            raw_sigma: None,
            combination: Some(Combination {
                fixed: Some(fixed),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn loop_closure() {
        // N(1,2) = 2, N(2,3) = 3, N(1,3) = 5
        let consistent = vec![dd(1, 2, 2), dd(2, 3, 3), dd(1, 3, 5), dd(3, 4, 1)];
        let kept = AmbiguityEngine::loop_closure(Stage::Wl, consistent.clone());
        assert_eq!(kept, consistent);

        let inconsistent = vec![dd(1, 2, 2), dd(2, 3, 3), dd(1, 3, 6), dd(3, 4, 1)];
        let kept = AmbiguityEngine::loop_closure(Stage::Wl, inconsistent);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].fixed(), Some(1));
    }

    #[test]
    fn invalid_configuration() {
        let mut cfg = Config::default();
        cfg.max_ambiguities = 0;
        assert!(matches!(
            AmbiguityEngine::new(&cfg),
            Err(Error::Configuration(_))
        ));
    }
}

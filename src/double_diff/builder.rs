use std::collections::HashMap;

use itertools::Itertools;
use log::{debug, warn};

use crate::{
    carrier::Frequency,
    cfg::{Config, ObsCombination},
    double_diff::{Combination, DoubleDifference, SatPair},
    error::Error,
    mw::{MwEstimate, MwProvider},
    parameter::{AmbiguityKind, FloatParameter},
    prelude::{Constellation, Stage},
    snapshot::EpochSnapshot,
    wavelength::WavelengthTable,
};

/// [DoubleDifferenceBuilder] forms the [DoubleDifference]s of one epoch
/// and their stage [Combination]s.
pub struct DoubleDifferenceBuilder<'a> {
    cfg: &'a Config,
    wavelengths: &'a mut WavelengthTable,
}

fn scaled(terms: Vec<(usize, f64)>, scaling: f64) -> Vec<(usize, f64)> {
    terms.into_iter().map(|(i, c)| (i, c * scaling)).collect()
}

impl<'a> DoubleDifferenceBuilder<'a> {
    pub fn new(cfg: &'a Config, wavelengths: &'a mut WavelengthTable) -> Self {
        Self { cfg, wavelengths }
    }

    /// Unit conversion of a single ambiguity: Glonass uncombined
    /// ambiguities are converted to cycles with their own wavelength.
    /// None when that wavelength cannot be determined.
    fn factor(&mut self, param: &FloatParameter) -> Option<f64> {
        if param.sv.constellation != Constellation::Glonass {
            return Some(1.0);
        }

        match param.kind {
            AmbiguityKind::Raw(frequency) => {
                if param.channel.is_none() {
                    return None;
                }
                let lambda = self
                    .wavelengths
                    .wavelengths(Constellation::Glonass, param.channel)
                    .band(frequency)?;
                Some(1.0 / lambda)
            },
            AmbiguityKind::IonosphereFree => Some(1.0),
        }
    }

    /// Forms all [DoubleDifference]s of this [EpochSnapshot].
    pub fn build(&mut self, snapshot: &EpochSnapshot) -> Result<Vec<DoubleDifference>, Error> {
        let t = snapshot.t;

        let params = snapshot
            .ambiguities
            .iter()
            .filter(|param| {
                !self.cfg.excluded_satellites.contains(&param.sv) && param.predicted != 0.0
            })
            .collect::<Vec<_>>();

        if params.len() < 2 {
            return Err(Error::NotEnoughParameters);
        }

        let mut dds = Vec::with_capacity(params.len() * (params.len() - 1) / 2);

        for (lhs, rhs) in params.iter().tuple_combinations() {
            if lhs.site != rhs.site
                || lhs.sv == rhs.sv
                || lhs.sv.constellation != rhs.sv.constellation
                || lhs.kind != rhs.kind
            {
                continue;
            }

            let (p1, p2) = if lhs.sv < rhs.sv {
                (lhs, rhs)
            } else {
                (rhs, lhs)
            };

            let pair = SatPair::new(&p1.site, p1.sv, p2.sv);
            let window = p1.window.intersection(&p2.window).clipped(t);

            if window.duration() < self.cfg.min_common_time {
                debug!(
                    "{}({}) - common time too short ({})",
                    t,
                    pair,
                    window.duration()
                );
                continue;
            }

            let factors = match (self.factor(p1), self.factor(p2)) {
                (Some(f1), Some(f2)) => (f1, f2),
                _ => {
                    warn!("{}({}) - unknown glonass channel or band", t, pair);
                    continue;
                },
            };

            let mut dd = DoubleDifference {
                pair,
                window,
                factors,
                kind: p1.kind,
                constellation: p1.sv.constellation,
                channels: (p1.channel, p2.channel),
                indexes: (p1.index, p2.index),
                raw: factors.0 * p1.predicted - factors.1 * p2.predicted,
                raw_sigma: None,
                combination: None,
            };

            if snapshot.covariance.is_some() {
                match snapshot.variance(&dd.terms()) {
                    Some(variance) if variance > 0.0 => {
                        dd.raw_sigma = Some(variance.sqrt());
                    },
                    Some(_) => {
                        warn!("{}({}) - {}", t, dd.pair, Error::NonPositiveVariance);
                        continue;
                    },
                    None => {
                        warn!("{}({}) - parameter index out of covariance", t, dd.pair);
                        continue;
                    },
                }
            }

            dds.push(dd);
        }

        if dds.is_empty() {
            return Err(Error::EmptyDoubleDifferences);
        }

        debug!("{} - formed {} double differences", t, dds.len());
        Ok(dds)
    }

    /// Wide lane contribution (meters) to the ionosphere free double difference.
    /// Null when the wide lane of this pair has not been fixed yet.
    pub fn wide_lane_correction(
        &mut self,
        dd: &DoubleDifference,
        wide_lanes: &HashMap<SatPair, i64>,
    ) -> f64 {
        let Some(n_wl) = wide_lanes.get(&dd.pair) else {
            return 0.0;
        };

        self.wavelengths
            .wavelengths(dd.constellation, dd.channels.0)
            .if_wide_lane_coefficient()
            .map(|k| k * *n_wl as f64)
            .unwrap_or_default()
    }

    /// Forms the [Combination] of this [Stage] for each [DoubleDifference].
    /// Returns the subset that could be combined.
    /// - wide_lanes: currently valid wide lane integers,
    ///   which the narrow lane depends on.
    pub fn combine(
        &mut self,
        stage: Stage,
        snapshot: &EpochSnapshot,
        dds: &[DoubleDifference],
        mw: &dyn MwProvider,
        wide_lanes: &HashMap<SatPair, i64>,
    ) -> Vec<DoubleDifference> {
        match (self.cfg.obs_combination, stage) {
            (ObsCombination::IonosphereFree, Stage::Nl) => {
                self.if_narrow_lane(snapshot, dds, wide_lanes)
            },
            (ObsCombination::IonosphereFree, _) => self.mw_wide_lane(stage, snapshot, dds, mw),
            (ObsCombination::Raw, Stage::Nl) => self.raw_narrow_lane(snapshot, dds, wide_lanes),
            (ObsCombination::Raw, _) => self.raw_wide_lane(stage, snapshot, dds),
        }
    }

    fn mw_estimate(
        &self,
        mw: &dyn MwProvider,
        dd: &DoubleDifference,
        stage: Stage,
        first: bool,
    ) -> Option<MwEstimate> {
        let sv = if first { dd.pair.sv1 } else { dd.pair.sv2 };
        let estimate = mw.estimate(sv, stage)?;
        if estimate.count > 2 && estimate.sigma <= self.cfg.max_mw_sigma {
            Some(estimate)
        } else {
            None
        }
    }

    /// Wide lane classes from Melbourne-Wübbena averages
    fn mw_wide_lane(
        &mut self,
        stage: Stage,
        snapshot: &EpochSnapshot,
        dds: &[DoubleDifference],
        mw: &dyn MwProvider,
    ) -> Vec<DoubleDifference> {
        let mut combined = Vec::with_capacity(dds.len());

        for dd in dds.iter() {
            if dd.kind != AmbiguityKind::IonosphereFree {
                continue;
            }

            let (Some(mw_1), Some(mw_2)) = (
                self.mw_estimate(mw, dd, stage, true),
                self.mw_estimate(mw, dd, stage, false),
            ) else {
                debug!("{}({}) - {} mw not available", snapshot.t, dd.pair, stage);
                continue;
            };

            let Some(wavelength) = self
                .wavelengths
                .wavelengths(dd.constellation, dd.channels.0)
                .stage(stage)
            else {
                continue;
            };

            let sigma = (mw_1.sigma.powi(2) / mw_1.count as f64
                + mw_2.sigma.powi(2) / mw_2.count as f64)
                .sqrt();

            let mut dd = dd.clone();
            dd.combination = Some(Combination {
                wavelength,
                sigma,
                float: mw_1.value - mw_2.value,
                ..Default::default()
            });

            combined.push(dd);
        }

        combined
    }

    /// Narrow lane from ionosphere free double differences
    fn if_narrow_lane(
        &mut self,
        snapshot: &EpochSnapshot,
        dds: &[DoubleDifference],
        wide_lanes: &HashMap<SatPair, i64>,
    ) -> Vec<DoubleDifference> {
        let mut combined = Vec::with_capacity(dds.len());

        for dd in dds.iter() {
            if dd.kind != AmbiguityKind::IonosphereFree {
                continue;
            }

            if dd.is_glonass() && dd.channels.0 != dd.channels.1 {
                debug!("{}({}) - glonass inter channel pair", snapshot.t, dd.pair);
                continue;
            }

            if !wide_lanes.contains_key(&dd.pair) {
                debug!("{}({}) - wide lane not fixed", snapshot.t, dd.pair);
                continue;
            }

            let Some(raw_sigma) = dd.raw_sigma else {
                continue;
            };

            let Some(wavelength) = self
                .wavelengths
                .wavelengths(dd.constellation, dd.channels.0)
                .narrow_lane()
            else {
                continue;
            };

            let offset = self.wide_lane_correction(dd, wide_lanes);

            let mut dd = dd.clone();
            dd.combination = Some(Combination {
                offset,
                wavelength,
                terms: dd.terms(),
                float: (dd.raw - offset) / wavelength,
                sigma: raw_sigma / wavelength,
                ..Default::default()
            });

            combined.push(dd);
        }

        combined
    }

    /// Cycle conversion of an uncombined double difference
    fn cycles_scaling(&mut self, dd: &DoubleDifference, frequency: Frequency) -> Option<f64> {
        if dd.is_glonass() {
            // factors already applied
            Some(1.0)
        } else {
            let lambda = self
                .wavelengths
                .wavelengths(dd.constellation, None)
                .band(frequency)?;
            Some(1.0 / lambda)
        }
    }

    /// Wide lane classes: cross combination of two uncombined double differences
    fn raw_wide_lane(
        &mut self,
        stage: Stage,
        snapshot: &EpochSnapshot,
        dds: &[DoubleDifference],
    ) -> Vec<DoubleDifference> {
        let (f_a, f_b) = stage.frequencies();

        let secondaries = dds
            .iter()
            .filter(|dd| dd.kind == AmbiguityKind::Raw(f_b))
            .map(|dd| (dd.pair.clone(), dd))
            .collect::<HashMap<_, _>>();

        let mut combined = Vec::with_capacity(secondaries.len());

        for dd_a in dds.iter() {
            if dd_a.kind != AmbiguityKind::Raw(f_a) {
                continue;
            }

            let Some(dd_b) = secondaries.get(&dd_a.pair) else {
                continue;
            };

            let (Some(c_a), Some(c_b)) = (
                self.cycles_scaling(dd_a, f_a),
                self.cycles_scaling(dd_b, f_b),
            ) else {
                continue;
            };

            let mut terms = scaled(dd_a.terms(), c_a);
            terms.extend(scaled(dd_b.terms(), -c_b));

            let sigma = match snapshot.variance(&terms) {
                Some(variance) if variance > 0.0 => variance.sqrt(),
                _ => {
                    debug!("{}({}) - {} invalid variance", snapshot.t, dd_a.pair, stage);
                    continue;
                },
            };

            let mut dd = (*dd_a).clone();
            dd.window = dd_a.window.intersection(&dd_b.window);
            dd.combination = Some(Combination {
                terms,
                sigma,
                wavelength: 1.0,
                float: c_a * dd_a.raw - c_b * dd_b.raw,
                ..Default::default()
            });

            combined.push(dd);
        }

        combined
    }

    /// Narrow lane: first frequency uncombined double difference, in cycles.
    fn raw_narrow_lane(
        &mut self,
        snapshot: &EpochSnapshot,
        dds: &[DoubleDifference],
        wide_lanes: &HashMap<SatPair, i64>,
    ) -> Vec<DoubleDifference> {
        let mut combined = Vec::with_capacity(dds.len());

        for dd in dds.iter() {
            if dd.kind != AmbiguityKind::Raw(Frequency::F1) {
                continue;
            }

            if !wide_lanes.contains_key(&dd.pair) {
                debug!("{}({}) - wide lane not fixed", snapshot.t, dd.pair);
                continue;
            }

            let (Some(raw_sigma), Some(scaling)) =
                (dd.raw_sigma, self.cycles_scaling(dd, Frequency::F1))
            else {
                continue;
            };

            let mut dd = dd.clone();
            dd.combination = Some(Combination {
                terms: scaled(dd.terms(), scaling),
                wavelength: 1.0,
                float: dd.raw * scaling,
                sigma: raw_sigma * scaling,
                ..Default::default()
            });

            combined.push(dd);
        }

        combined
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use nalgebra::DMatrix;

    use super::DoubleDifferenceBuilder;
    use crate::{
        carrier::Frequency,
        cfg::{Config, ObsCombination},
        double_diff::SatPair,
        error::Error,
        mw::MwAccumulator,
        parameter::{AmbiguityKind, FloatParameter, TimeWindow},
        prelude::{Constellation, Duration, Epoch, Stage, SV},
        snapshot::EpochSnapshot,
        wavelength::WavelengthTable,
    };

    fn t0() -> Epoch {
        Epoch::from_gpst_seconds(86400.0)
    }

    fn float(site: &str, sv: SV, kind: AmbiguityKind, index: usize, value: f64, age_s: f64) -> FloatParameter {
        FloatParameter {
            index,
            value,
            kind,
            sv,
            site: site.to_string(),
            channel: None,
            predicted: value,
            window: TimeWindow::new(
                t0() - Duration::from_seconds(age_s),
                t0() + Duration::from_seconds(3600.0),
            ),
        }
    }

    fn snapshot(ambiguities: Vec<FloatParameter>, covariance: Option<DMatrix<f64>>) -> EpochSnapshot {
        EpochSnapshot {
            t: t0(),
            ambiguities,
            covariance,
            sigma0: 1.0,
        }
    }

    #[test]
    fn double_difference_invariants() {
        let cfg = Config::default();
        let mut table = WavelengthTable::new(Default::default());
        let mut builder = DoubleDifferenceBuilder::new(&cfg, &mut table);

        let g01 = SV::new(Constellation::GPS, 1);
        let g02 = SV::new(Constellation::GPS, 2);
        let g03 = SV::new(Constellation::GPS, 3);
        let e01 = SV::new(Constellation::Galileo, 1);

        let if_kind = AmbiguityKind::IonosphereFree;

        let snapshot = snapshot(
            vec![
                float("ALGO", g02, if_kind, 0, 2.0, 3600.0),
                float("ALGO", g01, if_kind, 1, 1.5, 3600.0),
                // common time too short
                float("ALGO", g03, if_kind, 2, 3.0, 300.0),
                // other constellation
                float("ALGO", e01, if_kind, 3, 4.0, 3600.0),
                // other site
                float("NRC1", g03, if_kind, 4, 5.0, 3600.0),
                // other kind
                float("ALGO", g03, AmbiguityKind::Raw(Frequency::F1), 5, 5.0, 3600.0),
                // null ambiguity
                float("NRC1", g01, if_kind, 6, 0.0, 3600.0),
            ],
            Some(DMatrix::identity(7, 7) * 1.0E-4),
        );

        let dds = builder.build(&snapshot).unwrap();
        assert_eq!(dds.len(), 1, "{:?}", dds);

        let dd = &dds[0];
        assert_eq!(dd.pair, SatPair::new("ALGO", g01, g02));
        assert_eq!(dd.pair.sv1, g01);
        assert_eq!(dd.indexes, (1, 0));
        assert_eq!(dd.raw, -0.5);
        assert!((dd.raw_sigma.unwrap() - (2.0E-4_f64).sqrt()).abs() < 1.0E-12);
        assert!(dd.window.duration() >= cfg.min_common_time);

        for dd in dds.iter() {
            assert_ne!(dd.pair.sv1, dd.pair.sv2);
            assert_eq!(dd.pair.sv1.constellation, dd.pair.sv2.constellation);
        }
    }

    #[test]
    fn double_difference_failures() {
        let cfg = Config::default();
        let mut table = WavelengthTable::new(Default::default());
        let mut builder = DoubleDifferenceBuilder::new(&cfg, &mut table);

        let g01 = SV::new(Constellation::GPS, 1);
        let g02 = SV::new(Constellation::GPS, 2);
        let if_kind = AmbiguityKind::IonosphereFree;

        let single = snapshot(vec![float("ALGO", g01, if_kind, 0, 1.0, 3600.0)], None);
        assert_eq!(builder.build(&single), Err(Error::NotEnoughParameters));

        let short = snapshot(
            vec![
                float("ALGO", g01, if_kind, 0, 1.0, 100.0),
                float("ALGO", g02, if_kind, 1, 1.0, 3600.0),
            ],
            None,
        );
        assert_eq!(builder.build(&short), Err(Error::EmptyDoubleDifferences));

        // perfectly correlated: null variance
        let singular = snapshot(
            vec![
                float("ALGO", g01, if_kind, 0, 1.0, 3600.0),
                float("ALGO", g02, if_kind, 1, 2.0, 3600.0),
            ],
            Some(DMatrix::from_element(2, 2, 1.0E-4)),
        );
        assert_eq!(builder.build(&singular), Err(Error::EmptyDoubleDifferences));
    }

    #[test]
    fn narrow_lane_requires_wide_lane() {
        let cfg = Config::default();
        let mut table = WavelengthTable::new(Default::default());
        let mut builder = DoubleDifferenceBuilder::new(&cfg, &mut table);

        let g01 = SV::new(Constellation::GPS, 1);
        let g02 = SV::new(Constellation::GPS, 2);
        let if_kind = AmbiguityKind::IonosphereFree;

        let snapshot = snapshot(
            vec![
                float("ALGO", g01, if_kind, 0, 1.0, 3600.0),
                float("ALGO", g02, if_kind, 1, 2.0, 3600.0),
            ],
            Some(DMatrix::identity(2, 2) * 1.0E-6),
        );

        let mw = MwAccumulator::new(Duration::from_seconds(60.0), 2.0);
        let dds = builder.build(&snapshot).unwrap();

        let no_wide_lanes = HashMap::new();
        assert_eq!(builder.wide_lane_correction(&dds[0], &no_wide_lanes), 0.0);

        let nl = builder.combine(Stage::Nl, &snapshot, &dds, &mw, &no_wide_lanes);
        assert!(nl.is_empty());

        let mut wide_lanes = HashMap::new();
        wide_lanes.insert(SatPair::new("ALGO", g01, g02), 3);

        let correction = builder.wide_lane_correction(&dds[0], &wide_lanes);
        assert!((correction - 3.0 * 0.377482).abs() < 1.0E-5);

        let nl = builder.combine(Stage::Nl, &snapshot, &dds, &mw, &wide_lanes);
        assert_eq!(nl.len(), 1);

        let combination = nl[0].combination.as_ref().unwrap();
        assert_eq!(combination.offset, correction);
        assert_eq!(combination.terms, vec![(0, 1.0), (1, -1.0)]);
        assert!((combination.float - (-1.0 - correction) / combination.wavelength).abs() < 1.0E-9);
    }

    #[test]
    fn mw_wide_lane() {
        let cfg = Config::default();
        let mut table = WavelengthTable::new(Default::default());
        let mut builder = DoubleDifferenceBuilder::new(&cfg, &mut table);

        let g01 = SV::new(Constellation::GPS, 1);
        let g02 = SV::new(Constellation::GPS, 2);
        let g03 = SV::new(Constellation::GPS, 3);
        let if_kind = AmbiguityKind::IonosphereFree;

        let snapshot = snapshot(
            vec![
                float("ALGO", g01, if_kind, 0, 1.0, 3600.0),
                float("ALGO", g02, if_kind, 1, 2.0, 3600.0),
                float("ALGO", g03, if_kind, 2, 3.0, 3600.0),
            ],
            None,
        );

        let dt = Duration::from_seconds(30.0);
        let mut mw = MwAccumulator::new(Duration::from_seconds(60.0), 2.0);

        for i in 0..4 {
            let t = t0() + dt * i as f64;
            mw.push(t, g01, Stage::Wl, 12.10);
            mw.push(t, g02, Stage::Wl, 4.08);
        }

        // only two samples: rejected
        mw.push(t0(), g03, Stage::Wl, 1.0);
        mw.push(t0() + dt, g03, Stage::Wl, 1.0);

        let dds = builder.build(&snapshot).unwrap();
        assert_eq!(dds.len(), 3);

        let wl = builder.combine(Stage::Wl, &snapshot, &dds, &mw, &HashMap::new());
        assert_eq!(wl.len(), 1);

        let combination = wl[0].combination.as_ref().unwrap();
        assert!((combination.float - 8.02).abs() < 1.0E-9);
        assert_eq!(combination.sigma, 0.0);
        assert!(combination.terms.is_empty());
    }

    #[test]
    fn raw_wide_lane_cross_combination() {
        let cfg = Config::default().with_obs_combination(ObsCombination::Raw);
        let mut table = WavelengthTable::new(Default::default());

        let gps = table.wavelengths(Constellation::GPS, None);
        let (lambda_1, lambda_2) = (
            gps.band(Frequency::F1).unwrap(),
            gps.band(Frequency::F2).unwrap(),
        );

        let mut builder = DoubleDifferenceBuilder::new(&cfg, &mut table);

        let g01 = SV::new(Constellation::GPS, 1);
        let g02 = SV::new(Constellation::GPS, 2);
        let f1 = AmbiguityKind::Raw(Frequency::F1);
        let f2 = AmbiguityKind::Raw(Frequency::F2);

        // N1 = 7, N2 = 4 => N_wl = 3
        let snapshot = snapshot(
            vec![
                float("ALGO", g01, f1, 0, 10.0 * lambda_1, 3600.0),
                float("ALGO", g02, f1, 1, 3.0 * lambda_1, 3600.0),
                float("ALGO", g01, f2, 2, 6.0 * lambda_2, 3600.0),
                float("ALGO", g02, f2, 3, 2.0 * lambda_2, 3600.0),
            ],
            Some(DMatrix::identity(4, 4) * 1.0E-6),
        );

        let dds = builder.build(&snapshot).unwrap();
        assert_eq!(dds.len(), 2);

        let mw = MwAccumulator::new(Duration::from_seconds(60.0), 2.0);
        let wl = builder.combine(Stage::Wl, &snapshot, &dds, &mw, &HashMap::new());
        assert_eq!(wl.len(), 1);

        let combination = wl[0].combination.as_ref().unwrap();
        assert_eq!(combination.terms.len(), 4);
        assert!((combination.float - 3.0).abs() < 1.0E-9);
        assert_eq!(combination.wavelength, 1.0);

        // no F3 on this setup
        let ewl = builder.combine(Stage::Ewl, &snapshot, &dds, &mw, &HashMap::new());
        assert!(ewl.is_empty());
    }

    #[test]
    fn glonass_cycles() {
        let cfg = Config::default().with_obs_combination(ObsCombination::Raw);
        let mut table = WavelengthTable::new(Default::default());

        let r01 = SV::new(Constellation::Glonass, 1);
        let r02 = SV::new(Constellation::Glonass, 2);

        let lambda_1 = table
            .wavelengths(Constellation::Glonass, Some(1))
            .band(Frequency::F1)
            .unwrap();
        let lambda_2 = table
            .wavelengths(Constellation::Glonass, Some(-4))
            .band(Frequency::F1)
            .unwrap();

        let mut builder = DoubleDifferenceBuilder::new(&cfg, &mut table);

        let f1 = AmbiguityKind::Raw(Frequency::F1);

        let mut p1 = float("ALGO", r01, f1, 0, 10.0 * lambda_1, 3600.0);
        p1.channel = Some(1);
        let mut p2 = float("ALGO", r02, f1, 1, 4.0 * lambda_2, 3600.0);
        p2.channel = Some(-4);

        let tracked = snapshot(vec![p1, p2], Some(DMatrix::identity(2, 2) * 1.0E-6));
        let dds = builder.build(&tracked).unwrap();

        assert_eq!(dds.len(), 1);
        assert!(dds[0].is_glonass());
        assert!((dds[0].raw - 6.0).abs() < 1.0E-9);
        assert_eq!(dds[0].channels, (Some(1), Some(-4)));

        // no channel: cannot be converted to cycles
        let mut p3 = float("ALGO", r02, f1, 1, 4.0 * lambda_2, 3600.0);
        p3.channel = None;

        let mut p1 = float("ALGO", r01, f1, 0, 10.0 * lambda_1, 3600.0);
        p1.channel = Some(1);

        let no_channel = snapshot(vec![p1, p3], Some(DMatrix::identity(2, 2) * 1.0E-6));
        assert_eq!(builder.build(&no_channel), Err(Error::EmptyDoubleDifferences));

        // no band on that slot
        let f5 = AmbiguityKind::Raw(Frequency::F5);
        let mut p4 = float("ALGO", r01, f5, 0, 1.0, 3600.0);
        p4.channel = Some(1);
        let mut p5 = float("ALGO", r02, f5, 1, 2.0, 3600.0);
        p5.channel = Some(-4);

        let no_band = snapshot(vec![p4, p5], Some(DMatrix::identity(2, 2) * 1.0E-6));
        assert_eq!(builder.build(&no_band), Err(Error::EmptyDoubleDifferences));
    }
}

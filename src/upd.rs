//! Uncalibrated Phase Delay (UPD) corrections
use std::collections::HashMap;

use log::debug;

use crate::{
    cfg::{Config, UpdMode},
    double_diff::DoubleDifference,
    error::Error,
    prelude::{Duration, Epoch, Stage, SV},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Satellite fractional phase bias (cycles)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UpdRecord {
    /// Fractional bias (cycles)
    pub value: f64,
    /// Standard deviation (cycles)
    pub sigma: f64,
    /// Number of stations used in the estimation
    pub npts: u32,
}

impl UpdRecord {
    pub fn new(value: f64, sigma: f64, npts: u32) -> Self {
        Self { value, sigma, npts }
    }

    /// True if this [UpdRecord] passes the acceptance criteria of this [Stage]
    pub fn is_valid(&self, stage: Stage) -> bool {
        let (max_sigma, min_npts) = stage.upd_acceptance();
        self.sigma <= max_sigma && self.npts > min_npts
    }
}

/// One block of [UpdRecord]s, valid from `epoch` onwards.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdSet {
    /// Reference [Epoch] of this block
    pub epoch: Epoch,
    /// Per satellite record
    pub inner: HashMap<SV, UpdRecord>,
}

impl UpdSet {
    pub fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            inner: HashMap::with_capacity(32),
        }
    }

    /// Copies and returns [UpdSet] with one more [UpdRecord]
    pub fn with_record(&self, sv: SV, record: UpdRecord) -> Self {
        let mut s = self.clone();
        s.inner.insert(sv, record);
        s
    }

    pub fn get(&self, sv: SV) -> Option<&UpdRecord> {
        self.inner.get(&sv)
    }
}

/// Any UPD product should implement [UpdProvider].
pub trait UpdProvider {
    /// [UpdSet] of this [Stage], applicable at `t`
    fn corrections(&self, stage: Stage, t: Epoch) -> Option<&UpdSet>;

    /// Publication interval of this [Stage]
    fn interval(&self, stage: Stage) -> Duration;
}

/// [UpdTable] is a simple in-memory [UpdProvider]: per stage blocks,
/// each one valid for one publication interval.
#[derive(Debug, Clone, Default)]
pub struct UpdTable {
    blocks: HashMap<Stage, Vec<UpdSet>>,
    intervals: HashMap<Stage, Duration>,
}

impl UpdTable {
    /// Declares the publication interval of this [Stage]
    pub fn with_interval(&self, stage: Stage, interval: Duration) -> Self {
        let mut s = self.clone();
        s.intervals.insert(stage, interval);
        s
    }

    /// Stores a new [UpdSet] for this [Stage]
    pub fn insert(&mut self, stage: Stage, set: UpdSet) {
        let blocks = self.blocks.entry(stage).or_default();
        match blocks.binary_search_by(|b| {
            b.epoch
                .partial_cmp(&set.epoch)
                .unwrap_or(std::cmp::Ordering::Equal)
        }) {
            Ok(pos) => blocks[pos] = set,
            Err(pos) => blocks.insert(pos, set),
        }
    }
}

impl UpdProvider for UpdTable {
    fn corrections(&self, stage: Stage, t: Epoch) -> Option<&UpdSet> {
        let blocks = self.blocks.get(&stage)?;
        let interval = self.interval(stage);

        let set = blocks.iter().rev().find(|b| b.epoch <= t)?;

        if t - set.epoch < interval {
            Some(set)
        } else {
            None
        }
    }

    fn interval(&self, stage: Stage) -> Duration {
        self.intervals
            .get(&stage)
            .copied()
            .unwrap_or(match stage {
                Stage::Nl => Duration::from_seconds(30.0),
                _ => Duration::from_days(1.0),
            })
    }
}

/// [UpdCorrector] validates and applies [UpdSet]s to [DoubleDifference]s.
pub struct UpdCorrector<'a> {
    cfg: &'a Config,
}

impl<'a> UpdCorrector<'a> {
    pub fn new(cfg: &'a Config) -> Self {
        Self { cfg }
    }

    /// True when UPD corrections must be applied to this [Stage]
    pub fn is_required(&self, stage: Stage) -> bool {
        match stage {
            Stage::Nl => true,
            _ => self.cfg.upd_mode == UpdMode::Upd,
        }
    }

    /// Double difference correction (cycles) of this satellite pair:
    /// upd(sv1) - upd(sv2).
    pub fn correction(&self, stage: Stage, set: &UpdSet, sv1: SV, sv2: SV) -> Result<f64, Error> {
        let upd_1 = set
            .get(sv1)
            .filter(|r| r.is_valid(stage))
            .ok_or(Error::CorrectionUnavailable(sv1))?;

        let upd_2 = set
            .get(sv2)
            .filter(|r| r.is_valid(stage))
            .ok_or(Error::CorrectionUnavailable(sv2))?;

        Ok(upd_1.value - upd_2.value)
    }

    /// Applies UPD corrections to these [DoubleDifference]s.
    /// Double differences that cannot be corrected are dropped.
    /// Returns all [DoubleDifference]s untouched when corrections are not required.
    pub fn apply(
        &self,
        t: Epoch,
        stage: Stage,
        set: Option<&UpdSet>,
        dds: Vec<DoubleDifference>,
    ) -> Result<Vec<DoubleDifference>, Error> {
        if !self.is_required(stage) {
            return Ok(dds);
        }

        let set = set.ok_or(Error::MissingCorrections(stage))?;

        let mut corrected = Vec::with_capacity(dds.len());

        for mut dd in dds.into_iter() {
            match self.correction(stage, set, dd.pair.sv1, dd.pair.sv2) {
                Ok(upd) => {
                    if let Some(combination) = dd.combination.as_mut() {
                        combination.upd = upd;
                        corrected.push(dd);
                    }
                },
                Err(e) => {
                    debug!("{}({}) - {} {}", t, dd.pair, stage, e);
                },
            }
        }

        Ok(corrected)
    }
}

#[cfg(test)]
mod test {
    use super::{UpdCorrector, UpdProvider, UpdRecord, UpdSet, UpdTable};
    use crate::{
        cfg::{Config, UpdMode},
        double_diff::{Combination, DoubleDifference, SatPair},
        error::Error,
        parameter::{AmbiguityKind, TimeWindow},
        prelude::{Constellation, Duration, Epoch, Stage, SV},
    };

    fn dd(sv1: SV, sv2: SV) -> DoubleDifference {
        let t = Epoch::from_gpst_seconds(0.0);
        DoubleDifference {
            pair: SatPair::new("ALGO", sv1, sv2),
            constellation: sv1.constellation,
            kind: AmbiguityKind::IonosphereFree,
            channels: (None, None),
            indexes: (0, 1),
            window: TimeWindow::new(t, t),
            factors: (1.0, 1.0),
            raw: 0.0,
            raw_sigma: None,
            combination: Some(Combination {
                float: 2.3,
                wavelength: 1.0,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn record_acceptance() {
        assert!(UpdRecord::new(0.1, 0.05, 5).is_valid(Stage::Wl));
        assert!(UpdRecord::new(0.1, 0.2, 3).is_valid(Stage::Wl));
        assert!(!UpdRecord::new(0.1, 0.2, 2).is_valid(Stage::Wl));
        assert!(!UpdRecord::new(0.1, 0.5, 10).is_valid(Stage::Ewl));
        assert!(UpdRecord::new(0.1, 0.1, 4).is_valid(Stage::Nl));
        assert!(!UpdRecord::new(0.1, 0.1, 3).is_valid(Stage::Nl));
        assert!(!UpdRecord::new(0.1, 0.15, 10).is_valid(Stage::Nl));
    }

    #[test]
    fn upd_rejection() {
        let cfg = Config::default();
        let corrector = UpdCorrector::new(&cfg);

        let t = Epoch::from_gpst_seconds(0.0);
        let g01 = SV::new(Constellation::GPS, 1);
        let g02 = SV::new(Constellation::GPS, 2);
        let g03 = SV::new(Constellation::GPS, 3);

        let set = UpdSet::new(t)
            .with_record(g01, UpdRecord::new(0.30, 0.05, 10))
            .with_record(g02, UpdRecord::new(0.05, 0.05, 10))
            .with_record(g03, UpdRecord::new(0.10, 0.5, 10));

        let dds = vec![dd(g01, g02), dd(g01, g03)];

        let corrected = corrector
            .apply(t, Stage::Wl, Some(&set), dds.clone())
            .unwrap();

        assert_eq!(corrected.len(), 1);
        assert_eq!(corrected[0].pair, SatPair::new("ALGO", g01, g02));

        let combination = corrected[0].combination.as_ref().unwrap();
        assert!((combination.upd - 0.25).abs() < 1.0E-12);
        assert!((combination.corrected() - 2.05).abs() < 1.0E-12);

        assert_eq!(
            corrector.correction(Stage::Wl, &set, g01, g03),
            Err(Error::CorrectionUnavailable(g03))
        );

        assert_eq!(
            corrector.apply(t, Stage::Nl, None, dds.clone()),
            Err(Error::MissingCorrections(Stage::Nl))
        );

        // disabled: wide lane classes untouched
        let cfg = cfg.with_upd_mode(UpdMode::Disabled);
        let corrector = UpdCorrector::new(&cfg);

        let untouched = corrector.apply(t, Stage::Wl, None, dds.clone()).unwrap();
        assert_eq!(untouched, dds);
        assert!(corrector.is_required(Stage::Nl));
    }

    #[test]
    fn upd_table() {
        let t0 = Epoch::from_gpst_seconds(86400.0);
        let g01 = SV::new(Constellation::GPS, 1);

        let mut table = UpdTable::default().with_interval(Stage::Nl, Duration::from_seconds(30.0));

        for i in [0.0, 30.0, 90.0] {
            let set = UpdSet::new(t0 + Duration::from_seconds(i))
                .with_record(g01, UpdRecord::new(i / 100.0, 0.01, 10));
            table.insert(Stage::Nl, set);
        }

        assert!(table.corrections(Stage::Nl, t0 - Duration::from_seconds(1.0)).is_none());

        let set = table.corrections(Stage::Nl, t0 + Duration::from_seconds(45.0)).unwrap();
        assert_eq!(set.epoch, t0 + Duration::from_seconds(30.0));

        // not covered
        assert!(table.corrections(Stage::Nl, t0 + Duration::from_seconds(75.0)).is_none());

        let set = table.corrections(Stage::Nl, t0 + Duration::from_seconds(90.0)).unwrap();
        assert_eq!(set.get(g01).unwrap().value, 0.9);

        assert!(table.corrections(Stage::Wl, t0).is_none());
        assert_eq!(table.interval(Stage::Wl), Duration::from_days(1.0));
    }
}

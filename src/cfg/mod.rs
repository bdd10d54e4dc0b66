#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::{
    error::Error,
    prelude::{Duration, Stage, SV},
};

mod bands;
pub use bands::BandPlan;

/// Observation combination the positioning filter works with.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub enum ObsCombination {
    /// Ionosphere free ambiguities (F1/F2), wide lanes
    /// are obtained from Melbourne-Wübbena averages.
    #[default]
    IonosphereFree,
    /// Uncombined ambiguities, one per frequency.
    /// Wide lanes are cross combinations of two frequency double differences.
    Raw,
}

/// Phase bias (UPD) usage
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub enum UpdMode {
    /// UPD are mandatory for all stages
    #[default]
    Upd,
    /// UPD are not used by the wide lane stages.
    /// The narrow lane always requires them.
    Disabled,
}

/// Rounding criteria of a single [Stage]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct ModeThresholds {
    /// Maximal deviation to nearest integer (cycles)
    pub max_deviation: f64,
    /// Maximal formal sigma (cycles)
    pub max_sigma: f64,
    /// Significance level of the rounding decision test
    pub alpha: f64,
}

impl ModeThresholds {
    pub const fn new(max_deviation: f64, max_sigma: f64, alpha: f64) -> Self {
        Self {
            max_deviation,
            max_sigma,
            alpha,
        }
    }
}

fn default_ewl_thresholds() -> ModeThresholds {
    ModeThresholds::new(0.20, 0.10, 0.001)
}

fn default_wl_thresholds() -> ModeThresholds {
    ModeThresholds::new(0.25, 0.10, 0.001)
}

fn default_nl_thresholds() -> ModeThresholds {
    ModeThresholds::new(0.25, 0.10, 0.001)
}

/// [ModeThresholds] for each [Stage]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct StageThresholds {
    #[cfg_attr(feature = "serde", serde(default = "default_ewl_thresholds"))]
    pub ewl: ModeThresholds,
    #[cfg_attr(feature = "serde", serde(default = "default_ewl_thresholds"))]
    pub ewl24: ModeThresholds,
    #[cfg_attr(feature = "serde", serde(default = "default_ewl_thresholds"))]
    pub ewl25: ModeThresholds,
    #[cfg_attr(feature = "serde", serde(default = "default_wl_thresholds"))]
    pub wl: ModeThresholds,
    #[cfg_attr(feature = "serde", serde(default = "default_nl_thresholds"))]
    pub nl: ModeThresholds,
}

impl Default for StageThresholds {
    fn default() -> Self {
        Self {
            ewl: default_ewl_thresholds(),
            ewl24: default_ewl_thresholds(),
            ewl25: default_ewl_thresholds(),
            wl: default_wl_thresholds(),
            nl: default_nl_thresholds(),
        }
    }
}

impl StageThresholds {
    /// [ModeThresholds] of this [Stage]
    pub fn get(&self, stage: Stage) -> ModeThresholds {
        match stage {
            Stage::Ewl => self.ewl,
            Stage::Ewl24 => self.ewl24,
            Stage::Ewl25 => self.ewl25,
            Stage::Wl => self.wl,
            Stage::Nl => self.nl,
        }
    }
}

fn default_partial_fixing() -> bool {
    true
}

fn default_partial_min_fixed() -> usize {
    4
}

fn default_partial_max_deviation() -> f64 {
    0.15
}

fn default_partial_min_lock_epochs() -> f64 {
    20.0
}

fn default_ratio_threshold() -> f64 {
    3.0
}

fn default_bootstrap_threshold() -> f64 {
    0.99
}

fn default_min_common_time() -> Duration {
    Duration::from_seconds(600.0)
}

fn default_max_ambiguities() -> usize {
    128
}

fn default_max_parameters() -> usize {
    256
}

fn default_sampling_interval() -> Duration {
    Duration::from_seconds(30.0)
}

fn default_max_gap_factor() -> f64 {
    20.0
}

fn default_refix_gap_factor() -> f64 {
    10.0
}

fn default_min_refix() -> usize {
    3
}

fn default_max_mw_sigma() -> f64 {
    0.5
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Config {
    /// Observation combination of the positioning filter
    #[cfg_attr(feature = "serde", serde(default))]
    pub obs_combination: ObsCombination,

    /// UPD usage
    #[cfg_attr(feature = "serde", serde(default))]
    pub upd_mode: UpdMode,

    /// Enables partial ambiguity resolution (relaxed rounding
    /// and iterative removal when the integer search is rejected)
    #[cfg_attr(feature = "serde", serde(default = "default_partial_fixing"))]
    pub partial_fixing: bool,

    /// Minimal number of ambiguities partial fixing must retain
    #[cfg_attr(feature = "serde", serde(default = "default_partial_min_fixed"))]
    pub partial_min_fixed: usize,

    /// Relaxed absolute deviation bound (cycles) for partial fixing
    #[cfg_attr(feature = "serde", serde(default = "default_partial_max_deviation"))]
    pub partial_max_deviation: f64,

    /// Continuous lock (epochs) under which an ambiguity
    /// is a removal candidate in partial fixing
    #[cfg_attr(feature = "serde", serde(default = "default_partial_min_lock_epochs"))]
    pub partial_min_lock_epochs: f64,

    /// Ratio test threshold
    #[cfg_attr(feature = "serde", serde(default = "default_ratio_threshold"))]
    pub ratio_threshold: f64,

    /// Bootstrapping success rate threshold (0..1)
    #[cfg_attr(feature = "serde", serde(default = "default_bootstrap_threshold"))]
    pub bootstrap_threshold: f64,

    /// Minimal common time of the two ambiguities of a double difference
    #[cfg_attr(feature = "serde", serde(default = "default_min_common_time"))]
    pub min_common_time: Duration,

    /// Maximal number of simultaneously fixed ambiguities (basis columns)
    #[cfg_attr(feature = "serde", serde(default = "default_max_ambiguities"))]
    pub max_ambiguities: usize,

    /// Maximal number of ambiguity parameters (basis rows)
    #[cfg_attr(feature = "serde", serde(default = "default_max_parameters"))]
    pub max_parameters: usize,

    /// Observation sampling interval
    #[cfg_attr(feature = "serde", serde(default = "default_sampling_interval"))]
    pub sampling_interval: Duration,

    /// Per satellite fix counters are dropped when no fix happened
    /// for this many sampling intervals
    #[cfg_attr(feature = "serde", serde(default = "default_max_gap_factor"))]
    pub max_gap_factor: f64,

    /// After this many sampling intervals without fix,
    /// at least [Config::min_refix] ambiguities are required.
    #[cfg_attr(feature = "serde", serde(default = "default_refix_gap_factor"))]
    pub refix_gap_factor: f64,

    /// Minimal number of fixed ambiguities after a fixing gap
    #[cfg_attr(feature = "serde", serde(default = "default_min_refix"))]
    pub min_refix: usize,

    /// Maximal Melbourne-Wübbena standard deviation (cycles)
    #[cfg_attr(feature = "serde", serde(default = "default_max_mw_sigma"))]
    pub max_mw_sigma: f64,

    /// Reference satellites: when not empty, only double differences
    /// involving one of them are formed.
    #[cfg_attr(feature = "serde", serde(default))]
    pub reference_satellites: Vec<SV>,

    /// Satellites excluded from ambiguity resolution
    #[cfg_attr(feature = "serde", serde(default))]
    pub excluded_satellites: Vec<SV>,

    /// Frequency plan
    #[cfg_attr(feature = "serde", serde(default))]
    pub bands: BandPlan,

    /// Rounding thresholds
    #[cfg_attr(feature = "serde", serde(default))]
    pub thresholds: StageThresholds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            obs_combination: Default::default(),
            upd_mode: Default::default(),
            partial_fixing: default_partial_fixing(),
            partial_min_fixed: default_partial_min_fixed(),
            partial_max_deviation: default_partial_max_deviation(),
            partial_min_lock_epochs: default_partial_min_lock_epochs(),
            ratio_threshold: default_ratio_threshold(),
            bootstrap_threshold: default_bootstrap_threshold(),
            min_common_time: default_min_common_time(),
            max_ambiguities: default_max_ambiguities(),
            max_parameters: default_max_parameters(),
            sampling_interval: default_sampling_interval(),
            max_gap_factor: default_max_gap_factor(),
            refix_gap_factor: default_refix_gap_factor(),
            min_refix: default_min_refix(),
            max_mw_sigma: default_max_mw_sigma(),
            reference_satellites: Default::default(),
            excluded_satellites: Default::default(),
            bands: Default::default(),
            thresholds: Default::default(),
        }
    }
}

impl Config {
    /// Copies and returns [Config] with updated [ObsCombination]
    pub fn with_obs_combination(&self, combination: ObsCombination) -> Self {
        let mut s = self.clone();
        s.obs_combination = combination;
        s
    }

    /// Copies and returns [Config] with updated [UpdMode]
    pub fn with_upd_mode(&self, mode: UpdMode) -> Self {
        let mut s = self.clone();
        s.upd_mode = mode;
        s
    }

    /// Copies and returns [Config] with partial fixing enabled or disabled
    pub fn with_partial_fixing(&self, enabled: bool) -> Self {
        let mut s = self.clone();
        s.partial_fixing = enabled;
        s
    }

    /// Copies and returns [Config] with new minimal common time
    pub fn with_min_common_time(&self, min_common_time: Duration) -> Self {
        let mut s = self.clone();
        s.min_common_time = min_common_time;
        s
    }

    /// Copies and returns [Config] with new reference satellites
    pub fn with_reference_satellites(&self, satellites: &[SV]) -> Self {
        let mut s = self.clone();
        s.reference_satellites = satellites.to_vec();
        s
    }

    /// Copies and returns [Config] with new excluded satellites
    pub fn with_excluded_satellites(&self, satellites: &[SV]) -> Self {
        let mut s = self.clone();
        s.excluded_satellites = satellites.to_vec();
        s
    }

    /// Verifies this setup is usable.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_ambiguities == 0 || self.max_parameters == 0 {
            return Err(Error::Configuration(
                "workspace must be sized to at least one ambiguity".to_string(),
            ));
        }

        if self.max_ambiguities > self.max_parameters {
            return Err(Error::Configuration(format!(
                "cannot fix {} ambiguities out of {} parameters",
                self.max_ambiguities, self.max_parameters
            )));
        }

        if self.sampling_interval <= Duration::ZERO {
            return Err(Error::Configuration(
                "null or negative sampling interval".to_string(),
            ));
        }

        if self.ratio_threshold < 1.0 {
            return Err(Error::Configuration(format!(
                "invalid ratio threshold {}",
                self.ratio_threshold
            )));
        }

        if !(0.0..=1.0).contains(&self.bootstrap_threshold) {
            return Err(Error::Configuration(format!(
                "invalid bootstrap threshold {}",
                self.bootstrap_threshold
            )));
        }

        Ok(())
    }
}

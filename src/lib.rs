#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod carrier;
mod cfg;
mod constants;
mod constraint;
mod double_diff;
mod engine;
mod error;
mod filter;
mod fixer;
mod independence;
mod lambda;
mod mw;
mod parameter;
mod snapshot;
mod stage;
mod upd;
mod wavelength;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::carrier::{Carrier, Frequency};
    pub use crate::cfg::{BandPlan, Config, ModeThresholds, ObsCombination, StageThresholds, UpdMode};
    pub use crate::constraint::ConstraintInjector;
    pub use crate::double_diff::{Combination, DoubleDifference, DoubleDifferenceBuilder, SatPair};
    pub use crate::engine::{AmbiguityEngine, FixOutcome, FixStatus};
    pub use crate::error::Error;
    pub use crate::filter::{ConstraintEquation, PositioningFilter};
    pub use crate::fixer::{CombinationFixer, FixDecision};
    pub use crate::independence::{Independence, IndependenceBuffer, IndependenceError};
    pub use crate::lambda::{Lambda, LambdaSolution, PartialCandidate, PartialSolution};
    pub use crate::mw::{MwAccumulator, MwEstimate, MwProvider};
    pub use crate::parameter::{AmbiguityKind, FilterParameter, FloatParameter, ParameterKind, TimeWindow};
    pub use crate::snapshot::EpochSnapshot;
    pub use crate::stage::Stage;
    pub use crate::upd::{UpdCorrector, UpdProvider, UpdRecord, UpdSet, UpdTable};
    pub use crate::wavelength::{WavelengthTable, Wavelengths};
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::{DMatrix, DVector};
}

// pub export
pub use error::Error;

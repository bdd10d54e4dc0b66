use thiserror::Error;

use crate::prelude::{Stage, SV};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Less than two ambiguity parameters could be used to form double differences.
    #[error("not enough ambiguity parameters")]
    NotEnoughParameters,

    /// Every candidate pair was rejected (common time, variance, ...).
    #[error("no double difference could be formed")]
    EmptyDoubleDifferences,

    /// Formal variance of a double difference is zero or negative.
    #[error("non positive double difference variance")]
    NonPositiveVariance,

    /// Filter did not provide a covariance matrix, which the narrow lane requires.
    #[error("missing covariance matrix")]
    MissingCovariance,

    /// UPD correction unavailable or rejected by the quality criteria.
    #[error("phase bias correction unavailable for {0}")]
    CorrectionUnavailable(SV),

    /// No UPD block covers the current epoch for this stage.
    #[error("no phase bias product for {0}")]
    MissingCorrections(Stage),

    /// Not a single double difference could be fixed for this stage.
    #[error("nothing to fix")]
    NothingToFix,

    /// Too few ambiguities were fixed after a fixing gap.
    #[error("not enough fixed ambiguities ({0})")]
    NotEnoughFixed(usize),

    /// Ratio or bootstrap success rate did not pass the acceptance thresholds.
    #[error("integer search rejected (ratio={ratio:.3}, bootstrap={bootstrap:.4})")]
    SearchRejected { ratio: f64, bootstrap: f64 },

    /// LAMBDA failed to complete (singular matrix, loop limit)
    #[error("integer search failure")]
    SearchFailure,

    /// Virtual observations could not be applied to the filter.
    #[error("failed to apply constraints: {0}")]
    ConstraintApply(String),

    /// Filter update reported an issue
    #[error("filter update failure: {0}")]
    FilterUpdate(String),

    /// Invalid setup: fatal for this engine.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

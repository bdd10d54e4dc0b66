use nalgebra::{DMatrix, DVector};

use crate::{error::Error, parameter::FilterParameter};

/// Virtual observation: Σ coefficient × x\[index\] = value, with given weight.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintEquation {
    /// (filter index, coefficient) pairs
    pub terms: Vec<(usize, f64)>,
    /// Observed value
    pub value: f64,
    /// Weight (inverse variance)
    pub weight: f64,
}

impl ConstraintEquation {
    /// Evaluates the left hand side of this equation at `x`
    pub fn evaluate(&self, x: &DVector<f64>) -> f64 {
        self.terms.iter().map(|(i, c)| c * x[*i]).sum()
    }

    /// Residual at `x`
    pub fn residual(&self, x: &DVector<f64>) -> f64 {
        self.value - self.evaluate(x)
    }
}

/// The [PositioningFilter] is the least squares (or Kalman) filter
/// estimating the float ambiguities. It is not part of this library:
/// it is an external collaborator that should implement this trait to
/// let the ambiguities be resolved.
pub trait PositioningFilter {
    /// Parameter descriptions, in filter order
    fn parameters(&self) -> &[FilterParameter];

    /// Latest increments, one per parameter
    fn increments(&self) -> &DVector<f64>;

    /// Cofactor (covariance) matrix of the parameters, when available.
    /// Scaled by [PositioningFilter::sigma0] squared.
    fn covariance(&self) -> Option<&DMatrix<f64>>;

    /// A posteriori unit weight standard deviation
    fn sigma0(&self) -> f64;

    /// Resets the virtual observation accumulator
    fn reset_virtual_observations(&mut self);

    /// Adds one virtual observation to the accumulator
    fn add_virtual_observation(&mut self, equation: &ConstraintEquation);

    /// Re-estimates the parameters, taking all accumulated virtual observations into account.
    fn update(&mut self) -> Result<(), Error>;

    /// Current parameter estimates (value + increment)
    fn estimates(&self) -> DVector<f64>;
}

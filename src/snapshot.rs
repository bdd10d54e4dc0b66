use nalgebra::DMatrix;

use crate::{
    filter::PositioningFilter,
    parameter::{FloatParameter, ParameterKind},
    prelude::Epoch,
};

/// [EpochSnapshot] is a read-only copy of the filter state,
/// taken at the beginning of each engine call.
#[derive(Debug, Clone)]
pub struct EpochSnapshot {
    /// Sampling [Epoch]
    pub t: Epoch,
    /// Ambiguity parameters, predicted with the latest increments
    pub ambiguities: Vec<FloatParameter>,
    /// Cofactor matrix
    pub covariance: Option<DMatrix<f64>>,
    /// Unit weight standard deviation
    pub sigma0: f64,
}

impl EpochSnapshot {
    /// Captures a new [EpochSnapshot] from this [PositioningFilter]
    pub fn capture<F: PositioningFilter + ?Sized>(t: Epoch, filter: &F) -> Self {
        let increments = filter.increments();

        let ambiguities = filter
            .parameters()
            .iter()
            .enumerate()
            .filter_map(|(index, param)| match &param.kind {
                ParameterKind::Ambiguity { sv, kind, channel } => {
                    let increment = increments.get(index).copied().unwrap_or_default();
                    Some(FloatParameter {
                        index,
                        sv: *sv,
                        kind: *kind,
                        channel: *channel,
                        site: param.site.clone(),
                        window: param.window,
                        value: param.value,
                        predicted: param.value + increment,
                    })
                },
                ParameterKind::Other => None,
            })
            .collect();

        Self {
            t,
            ambiguities,
            covariance: filter.covariance().cloned(),
            sigma0: filter.sigma0(),
        }
    }

    /// Covariance of two linear combinations of the parameters:
    /// σ0² aᵀ Q b. Returns None when no covariance matrix is available
    /// or an index lies out of bounds.
    pub fn covariance(&self, lhs: &[(usize, f64)], rhs: &[(usize, f64)]) -> Option<f64> {
        let q = self.covariance.as_ref()?;
        let n = q.nrows().min(q.ncols());

        let mut value = 0.0;
        for (i, a_i) in lhs.iter() {
            for (j, b_j) in rhs.iter() {
                if *i >= n || *j >= n {
                    return None;
                }
                value += a_i * b_j * q[(*i, *j)];
            }
        }

        Some(value * self.sigma0.powi(2))
    }

    /// Variance of a linear combination of the parameters
    pub fn variance(&self, terms: &[(usize, f64)]) -> Option<f64> {
        self.covariance(terms, terms)
    }
}

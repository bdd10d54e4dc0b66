use std::cmp::Ordering;

use log::debug;
use nalgebra::{DMatrix, DVector};
use statrs::function::erf::erf;

use crate::{constants::MAX_RATIO, error::Error};

/// Integer search solution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LambdaSolution {
    /// Best integer candidate. Empty when rejected.
    pub fixed: Vec<i64>,
    /// Second best over best squared norms. Null when rejected.
    pub ratio: f64,
    /// Bootstrapping success rate
    pub bootstrap: f64,
    /// True when both acceptance tests passed
    pub accepted: bool,
}

/// Removal preferences of one ambiguity, in partial fixing
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartialCandidate {
    /// Recently fixed or shortly tracked: first to be removed
    pub eligible: bool,
    /// Glonass-Glonass pair: second to be removed
    pub glonass: bool,
}

/// Partial fixing solution
#[derive(Debug, Clone, PartialEq)]
pub struct PartialSolution {
    /// Indexes (in the input vector) of the fixed ambiguities,
    /// matching [LambdaSolution::fixed]
    pub kept: Vec<usize>,
    /// Removed indexes, in removal order
    pub removed: Vec<usize>,
    /// [LambdaSolution] of the kept subset
    pub solution: LambdaSolution,
}

/// LAMBDA integer least squares (Teunissen, 1995), using
/// the MLAMBDA search (Chang et al., 2005).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lambda {
    /// Minimal ratio for acceptance
    pub ratio_threshold: f64,
    /// Minimal bootstrapping success rate for acceptance
    pub bootstrap_threshold: f64,
}

/// Search loop bound
const MAX_SEARCH: usize = 100_000;

/// Variance floor applied to the diagonal
const MIN_VARIANCE: f64 = 1.0E-12;

/// Number of candidates
const CANDIDATES: usize = 2;

fn sgn(x: f64) -> f64 {
    if x <= 0.0 {
        -1.0
    } else {
        1.0
    }
}

impl Lambda {
    pub fn new(ratio_threshold: f64, bootstrap_threshold: f64) -> Self {
        Self {
            ratio_threshold,
            bootstrap_threshold,
        }
    }

    /// LᵀDL factorization of Q
    fn ld_factorization(q: &DMatrix<f64>) -> Result<(DMatrix<f64>, DVector<f64>), Error> {
        let n = q.nrows();
        let mut a = q.clone();
        let mut l = DMatrix::<f64>::zeros(n, n);
        let mut d = DVector::<f64>::zeros(n);

        for i in (0..n).rev() {
            d[i] = a[(i, i)];
            if d[i] <= 0.0 {
                return Err(Error::SearchFailure);
            }

            let s = d[i].sqrt();

            for j in 0..=i {
                l[(i, j)] = a[(i, j)] / s;
            }

            for j in 0..i {
                for k in 0..=j {
                    a[(j, k)] -= l[(i, k)] * l[(i, j)];
                }
            }

            let l_ii = l[(i, i)];
            for j in 0..=i {
                l[(i, j)] /= l_ii;
            }
        }

        Ok((l, d))
    }

    fn gauss_transform(i: usize, j: usize, l: &mut DMatrix<f64>, z: &mut DMatrix<f64>) {
        let n = l.nrows();
        let mu = (l[(i, j)] + 0.5).floor();

        if mu != 0.0 {
            for k in i..n {
                l[(k, j)] -= mu * l[(k, i)];
            }
            for k in 0..n {
                z[(k, j)] -= mu * z[(k, i)];
            }
        }
    }

    fn permutation(
        j: usize,
        delta: f64,
        l: &mut DMatrix<f64>,
        d: &mut DVector<f64>,
        z: &mut DMatrix<f64>,
    ) {
        let n = l.nrows();

        let eta = d[j] / delta;
        let lambda = d[j + 1] * l[(j + 1, j)] / delta;

        d[j] = eta * d[j + 1];
        d[j + 1] = delta;

        for k in 0..j {
            let (a0, a1) = (l[(j, k)], l[(j + 1, k)]);
            l[(j, k)] = -l[(j + 1, j)] * a0 + a1;
            l[(j + 1, k)] = eta * a0 + lambda * a1;
        }

        l[(j + 1, j)] = lambda;

        for k in j + 2..n {
            l.swap((k, j), (k, j + 1));
        }

        z.swap_columns(j, j + 1);
    }

    /// Decorrelation: integer Gauss transforms and permutations
    fn reduction(l: &mut DMatrix<f64>, d: &mut DVector<f64>, z: &mut DMatrix<f64>) {
        let n = l.nrows() as isize;
        let mut j = n - 2;
        let mut k = n - 2;

        while j >= 0 {
            let ju = j as usize;

            if j <= k {
                for i in ju + 1..n as usize {
                    Self::gauss_transform(i, ju, l, z);
                }
            }

            let delta = d[ju] + l[(ju + 1, ju)].powi(2) * d[ju + 1];

            if delta + 1.0E-6 < d[ju + 1] {
                Self::permutation(ju, delta, l, d, z);
                k = j;
                j = n - 2;
            } else {
                j -= 1;
            }
        }
    }

    /// Depth first search of the best candidates.
    /// Returns the candidates (one per column) and their squared norms, sorted.
    fn search(
        l: &DMatrix<f64>,
        d: &DVector<f64>,
        zs: &DVector<f64>,
    ) -> Result<(DMatrix<f64>, Vec<f64>), Error> {
        let n = l.nrows();
        let m = CANDIDATES;

        let mut zn = DMatrix::<f64>::zeros(n, m);
        let mut s = vec![0.0; m];

        let mut big_s = DMatrix::<f64>::zeros(n, n);
        let mut dist = vec![0.0; n];
        let mut zb = vec![0.0; n];
        let mut z = vec![0.0; n];
        let mut step = vec![0.0; n];

        let mut nn = 0;
        let mut imax = 0;
        let mut max_dist = f64::MAX;

        let mut k = n - 1;
        zb[k] = zs[k];
        z[k] = (zb[k] + 0.5).floor();
        let mut y = zb[k] - z[k];
        step[k] = sgn(y);

        let mut completed = false;

        for _ in 0..MAX_SEARCH {
            let new_dist = dist[k] + y * y / d[k];

            if new_dist < max_dist {
                if k != 0 {
                    // move down
                    k -= 1;
                    dist[k] = new_dist;

                    for i in 0..=k {
                        big_s[(k, i)] = big_s[(k + 1, i)] + (z[k + 1] - zb[k + 1]) * l[(k + 1, i)];
                    }

                    zb[k] = zs[k] + big_s[(k, k)];
                    z[k] = (zb[k] + 0.5).floor();
                    y = zb[k] - z[k];
                    step[k] = sgn(y);
                } else {
                    // new candidate
                    if nn < m {
                        if nn == 0 || new_dist > s[imax] {
                            imax = nn;
                        }
                        for i in 0..n {
                            zn[(i, nn)] = z[i];
                        }
                        s[nn] = new_dist;
                        nn += 1;
                    } else {
                        if new_dist < s[imax] {
                            for i in 0..n {
                                zn[(i, imax)] = z[i];
                            }
                            s[imax] = new_dist;
                            imax = 0;
                            for i in 0..m {
                                if s[imax] < s[i] {
                                    imax = i;
                                }
                            }
                        }
                        max_dist = s[imax];
                    }

                    z[0] += step[0];
                    y = zb[0] - z[0];
                    step[0] = -step[0] - sgn(step[0]);
                }
            } else {
                if k == n - 1 {
                    completed = true;
                    break;
                }

                // move up
                k += 1;
                z[k] += step[k];
                y = zb[k] - z[k];
                step[k] = -step[k] - sgn(step[k]);
            }
        }

        if !completed || nn < m {
            return Err(Error::SearchFailure);
        }

        if s[1] < s[0] {
            s.swap(0, 1);
            zn.swap_columns(0, 1);
        }

        Ok((zn, s))
    }

    /// Resolves the float ambiguities `a` (cycles) of covariance `q` (cycles²).
    pub fn search_solution(&self, a: &DVector<f64>, q: &DMatrix<f64>) -> Result<LambdaSolution, Error> {
        let n = a.len();

        if n == 0 {
            return Err(Error::NothingToFix);
        }

        if q.nrows() != n || q.ncols() != n {
            return Err(Error::SearchFailure);
        }

        let mut q = q.clone();
        for i in 0..n {
            if q[(i, i)] < MIN_VARIANCE {
                q[(i, i)] = MIN_VARIANCE;
            }
        }

        let rounded = a.map(|a_i| a_i.round());
        let fractional = a - &rounded;

        let (mut l, mut d) = Self::ld_factorization(&q)?;
        let mut z = DMatrix::<f64>::identity(n, n);

        Self::reduction(&mut l, &mut d, &mut z);

        let zs = z.transpose() * &fractional;
        let (candidates, s) = Self::search(&l, &d, &zs)?;

        let f = z
            .transpose()
            .lu()
            .solve(&candidates)
            .ok_or(Error::SearchFailure)?;

        let ratio = if s[0] < MIN_VARIANCE {
            MAX_RATIO
        } else {
            (s[1] / s[0]).min(MAX_RATIO)
        };

        let bootstrap = d
            .iter()
            .map(|d_i| erf(1.0 / (2.0 * (2.0 * d_i).sqrt())))
            .product::<f64>();

        let accepted = ratio > self.ratio_threshold && bootstrap > self.bootstrap_threshold;

        if !accepted {
            debug!("lambda - ratio={:.3} bootstrap={:.4}: rejected", ratio, bootstrap);
            return Ok(LambdaSolution {
                bootstrap,
                ..Default::default()
            });
        }

        let fixed = (0..n)
            .map(|i| (f[(i, 0)] + rounded[i]).round() as i64)
            .collect();

        Ok(LambdaSolution {
            fixed,
            ratio,
            bootstrap,
            accepted,
        })
    }

    /// Partial fixing: removes one ambiguity at a time until the
    /// search is accepted, or fails when less than `min_fixed` remain.
    pub fn partial_search(
        &self,
        a: &DVector<f64>,
        q: &DMatrix<f64>,
        candidates: &[PartialCandidate],
        min_fixed: usize,
    ) -> Result<PartialSolution, Error> {
        let n = a.len();

        if candidates.len() != n {
            return Err(Error::SearchFailure);
        }

        let mut kept = (0..n).collect::<Vec<_>>();
        let mut removed = Vec::with_capacity(n);

        loop {
            if kept.is_empty() || kept.len() < min_fixed {
                debug!("partial fixing - {} ambiguities left: abort", kept.len());
                return Err(Error::NotEnoughFixed(kept.len()));
            }

            let a_k = DVector::from_iterator(kept.len(), kept.iter().map(|i| a[*i]));
            let q_k = DMatrix::from_fn(kept.len(), kept.len(), |i, j| q[(kept[i], kept[j])]);

            match self.search_solution(&a_k, &q_k) {
                Ok(solution) if solution.accepted => {
                    return Ok(PartialSolution {
                        kept,
                        removed,
                        solution,
                    });
                },
                Ok(solution) => {
                    debug!(
                        "partial fixing - n={} ratio={:.3} bootstrap={:.4}: rejected",
                        kept.len(),
                        solution.ratio,
                        solution.bootstrap
                    );
                },
                Err(e) => {
                    debug!("partial fixing - n={}: {}", kept.len(), e);
                },
            }

            let largest_variance = |filter: &dyn Fn(&PartialCandidate) -> bool| {
                kept.iter()
                    .enumerate()
                    .filter(|(_, index)| filter(&candidates[**index]))
                    .max_by(|(_, i), (_, j)| {
                        q[(**i, **i)]
                            .partial_cmp(&q[(**j, **j)])
                            .unwrap_or(Ordering::Equal)
                    })
                    .map(|(pos, _)| pos)
            };

            let pos = largest_variance(&|c| c.eligible)
                .or_else(|| largest_variance(&|c| c.glonass))
                .or_else(|| largest_variance(&|_| true));

            let Some(pos) = pos else {
                return Err(Error::NotEnoughFixed(kept.len()));
            };

            let index = kept.remove(pos);
            debug!("partial fixing - removing ambiguity #{}", index);
            removed.push(index);
        }
    }
}

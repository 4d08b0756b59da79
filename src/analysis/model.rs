//! Logistic regression of superhost status on response time and rating
//!
//! Fits `host_is_superhost_binary ~ C(host_response_time) + review_scores_rating`
//! by Newton's method (iteratively reweighted least squares). The response-time
//! factor is dummy-coded against the lexically first observed label.

use crate::error::{EdaError, Result};
use crate::schema::{self, HOST_IS_SUPERHOST_BINARY, HOST_RESPONSE_TIME, REVIEW_SCORES_RATING};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Probabilities are clamped away from 0 and 1 inside the log-likelihood
const PROB_EPS: f64 = 1e-12;

/// Design matrix and response extracted from the analysis dataset
#[derive(Debug, Clone)]
pub struct Design {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub names: Vec<String>,
    pub reference_category: String,
    /// Rows skipped because one of the model columns was null
    pub rows_skipped: usize,
}

impl Design {
    /// Build the design from a cleaned listings table
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        schema::require_columns(df, &[HOST_RESPONSE_TIME, REVIEW_SCORES_RATING, HOST_IS_SUPERHOST_BINARY])?;

        let labels = df.column(HOST_RESPONSE_TIME)?.as_materialized_series().cast(&DataType::String)?;
        let rating = df.column(REVIEW_SCORES_RATING)?.as_materialized_series().cast(&DataType::Float64)?;
        let target = df.column(HOST_IS_SUPERHOST_BINARY)?.as_materialized_series().cast(&DataType::Float64)?;

        let rows: Vec<(&str, f64, f64)> = labels
            .str()?
            .into_iter()
            .zip(rating.f64()?)
            .zip(target.f64()?)
            .filter_map(|((label, score), y)| Some((label?, score?, y?)))
            .collect();
        let rows_skipped = df.height() - rows.len();

        if rows.is_empty() {
            return Err(EdaError::ModelError("no complete rows to fit".into()));
        }

        let categories: Vec<&str> = rows
            .iter()
            .map(|(label, _, _)| *label)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let reference_category = categories[0].to_string();
        let levels = &categories[1..];

        let mut names = Vec::with_capacity(levels.len() + 2);
        names.push("Intercept".to_string());
        names.extend(levels.iter().map(|level| format!("{HOST_RESPONSE_TIME}[T.{level}]")));
        names.push(REVIEW_SCORES_RATING.to_string());

        let n_features = names.len();
        let mut x: Array2<f64> = Array2::zeros((rows.len(), n_features));
        let mut y: Array1<f64> = Array1::zeros(rows.len());

        for (i, (label, score, target)) in rows.iter().enumerate() {
            x[[i, 0]] = 1.0;
            if let Some(pos) = levels.iter().position(|level| level == label) {
                x[[i, pos + 1]] = 1.0;
            }
            x[[i, n_features - 1]] = *score;
            y[i] = *target;
        }

        Ok(Self {
            x,
            y,
            names,
            reference_category,
            rows_skipped,
        })
    }
}

/// One fitted coefficient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub z: f64,
    pub p_value: f64,
}

/// Fit statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub coefficients: Vec<Coefficient>,
    pub reference_category: String,
    pub n_obs: usize,
    pub log_likelihood: f64,
    pub null_log_likelihood: f64,
    /// McFadden's pseudo R²
    pub pseudo_r2: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl ModelSummary {
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }
}

/// Binary logistic regression fitted by Newton iterations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperhostModel {
    /// Maximum Newton iterations
    pub max_iter: usize,
    /// Stop once the largest coefficient step is below this
    pub tol: f64,
    pub coefficients: Option<Array1<f64>>,
    pub is_fitted: bool,
}

impl Default for SuperhostModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SuperhostModel {
    pub fn new() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-8,
            coefficients: None,
            is_fitted: false,
        }
    }

    /// Set the Newton iteration cap
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Fit on a cleaned listings table
    pub fn fit_frame(&mut self, df: &DataFrame) -> Result<ModelSummary> {
        let design = Design::from_frame(df)?;
        if design.rows_skipped > 0 {
            debug!(rows = design.rows_skipped, "Skipped incomplete rows for model fit");
        }
        let mut summary = self.fit(&design.x, &design.y, &design.names)?;
        summary.reference_category = design.reference_category;
        Ok(summary)
    }

    /// Fit on a prepared design matrix whose first column is the intercept
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, names: &[String]) -> Result<ModelSummary> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() || names.len() != n_features {
            return Err(EdaError::ModelError(format!(
                "shape mismatch: {} rows, {} targets, {} columns, {} names",
                n_samples,
                y.len(),
                n_features,
                names.len()
            )));
        }
        if n_samples <= n_features {
            return Err(EdaError::ModelError(format!(
                "{} observations cannot identify {} coefficients",
                n_samples, n_features
            )));
        }
        let positives = y.iter().filter(|&&v| v == 1.0).count();
        if positives == 0 || positives == n_samples {
            return Err(EdaError::ModelError("target has a single class".into()));
        }

        let mut beta: Array1<f64> = Array1::zeros(n_features);
        let mut iterations = 0;
        let mut converged = false;

        for _ in 0..self.max_iter {
            iterations += 1;
            let p = sigmoid(&x.dot(&beta));
            let hessian = weighted_gram(x, &p);
            let gradient = x.t().dot(&(y - &p));

            let chol = cholesky(&hessian).ok_or_else(|| {
                EdaError::ModelError("information matrix is singular (separated or collinear data)".into())
            })?;
            let step = cholesky_solve(&chol, &gradient);
            beta = beta + &step;

            let max_step = step.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
            if !max_step.is_finite() {
                return Err(EdaError::ModelError("Newton step diverged".into()));
            }
            if max_step < self.tol {
                converged = true;
                break;
            }
        }

        let p = sigmoid(&x.dot(&beta));
        let hessian = weighted_gram(x, &p);
        let chol = cholesky(&hessian)
            .ok_or_else(|| EdaError::ModelError("information matrix is singular at the optimum".into()))?;
        let covariance_diag = inverse_diagonal(&chol);

        let coefficients = names
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let estimate = beta[j];
                let std_error = covariance_diag[j].sqrt();
                let z = estimate / std_error;
                Coefficient {
                    name: name.clone(),
                    estimate,
                    std_error,
                    z,
                    p_value: 2.0 * (1.0 - normal_cdf(z.abs())),
                }
            })
            .collect();

        let log_likelihood = log_likelihood(y, &p);
        let y_mean = positives as f64 / n_samples as f64;
        let null_log_likelihood =
            n_samples as f64 * (y_mean * y_mean.ln() + (1.0 - y_mean) * (1.0 - y_mean).ln());

        self.coefficients = Some(beta);
        self.is_fitted = true;

        let summary = ModelSummary {
            coefficients,
            reference_category: String::new(),
            n_obs: n_samples,
            log_likelihood,
            null_log_likelihood,
            pseudo_r2: 1.0 - log_likelihood / null_log_likelihood,
            iterations,
            converged,
        };
        info!(
            n_obs = summary.n_obs,
            iterations,
            converged,
            log_likelihood,
            pseudo_r2 = summary.pseudo_r2,
            "Fitted superhost model"
        );
        Ok(summary)
    }

    /// Predicted superhost probability per row of `x`
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .filter(|_| self.is_fitted)
            .ok_or_else(|| EdaError::ModelError("model not fitted".into()))?;
        if x.ncols() != coefficients.len() {
            return Err(EdaError::ModelError(format!(
                "expected {} columns, got {}",
                coefficients.len(),
                x.ncols()
            )));
        }
        Ok(sigmoid(&x.dot(coefficients)))
    }
}

fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
    z.mapv(|v| {
        if v >= 0.0 {
            1.0 / (1.0 + (-v).exp())
        } else {
            let e = v.exp();
            e / (1.0 + e)
        }
    })
}

/// X^T diag(p(1-p)) X
fn weighted_gram(x: &Array2<f64>, p: &Array1<f64>) -> Array2<f64> {
    let weights = p.mapv(|v| v * (1.0 - v));
    let weighted = x * &weights.insert_axis(Axis(1));
    x.t().dot(&weighted)
}

fn log_likelihood(y: &Array1<f64>, p: &Array1<f64>) -> f64 {
    y.iter()
        .zip(p.iter())
        .map(|(&yi, &pi)| {
            let pi = pi.clamp(PROB_EPS, 1.0 - PROB_EPS);
            yi * pi.ln() + (1.0 - yi) * (1.0 - pi).ln()
        })
        .sum()
}

/// Lower-triangular L with A = L Lᵀ, or `None` if A is not positive definite
fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let scale = a.diag().iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1.0);
    let mut l: Array2<f64> = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 1e-12 * scale {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Solve L Lᵀ x = b by forward then backward substitution
fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    let mut y: Array1<f64> = Array1::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * y[j]).sum();
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    let mut x: Array1<f64> = Array1::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    x
}

/// Diagonal of (L Lᵀ)⁻¹
fn inverse_diagonal(l: &Array2<f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut diag: Array1<f64> = Array1::zeros(n);
    for i in 0..n {
        let mut e: Array1<f64> = Array1::zeros(n);
        e[i] = 1.0;
        diag[i] = cholesky_solve(l, &e)[i];
    }
    diag
}

/// Standard normal CDF approximation
fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Error function approximation (Abramowitz and Stegun 7.1.26)
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

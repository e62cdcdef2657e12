//! Levenberg-Marquardt minimizer backed by the `levenberg-marquardt` crate
//!
//! The solver itself is unbounded, so parameters are optimized in internal
//! space through [`BoundsTransform`] and mapped back before every residual
//! evaluation. The Jacobian is taken by forward differences in internal space;
//! the covariance is estimated afterwards in external space.

use crate::analysis::minimizer::{forward_difference_jacobian, sum_of_squares};
use crate::analysis::{FitError, Minimizer, MinimizerConfig, MinimizerOutcome, ResidualFn};
use crate::error::{Error, Result};
use crate::parameters::{Bounds, BoundsTransform};
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::storage::Owned;
use nalgebra::{DMatrix, DVector, Dyn};
use ndarray::Array2;
use std::cell::RefCell;

/// Adapter between a residual closure and [`LeastSquaresProblem`]
struct BoundedProblem<'f, 'r> {
    residuals: RefCell<&'f mut ResidualFn<'r>>,
    transforms: Vec<BoundsTransform>,
    internal: DVector<f64>,
    epsilon: f64,
    error: RefCell<Option<Error>>,
}

impl BoundedProblem<'_, '_> {
    fn external(&self, internal: &[f64]) -> Vec<f64> {
        internal
            .iter()
            .zip(&self.transforms)
            .map(|(&u, t)| t.to_external(u))
            .collect()
    }

    /// Residuals at an internal point; errors are parked for the caller
    fn eval(&self, internal: &[f64]) -> Result<Vec<f64>> {
        let external = self.external(internal);
        let mut residuals = self.residuals.borrow_mut();
        (*residuals)(&external)
    }

    fn park(&self, err: Error) {
        tracing::debug!(%err, "Residual evaluation failed, stopping");
        let mut slot = self.error.borrow_mut();
        if slot.is_none() {
            *slot = Some(err);
        }
    }
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for BoundedProblem<'_, '_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.internal.copy_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.internal.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        if self.error.borrow().is_some() {
            return None;
        }
        match self.eval(self.internal.as_slice()) {
            Ok(r) => Some(DVector::from_vec(r)),
            Err(err) => {
                self.park(err);
                None
            }
        }
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        if self.error.borrow().is_some() {
            return None;
        }
        let mut f = |u: &[f64]| self.eval(u);
        match forward_difference_jacobian(&mut f, self.internal.as_slice(), &[], self.epsilon) {
            Ok(jac) => {
                let (rows, cols) = jac.dim();
                Some(DMatrix::from_row_iterator(rows, cols, jac.iter().copied()))
            }
            Err(err) => {
                self.park(err);
                None
            }
        }
    }
}

/// Built-in `"lm"` minimizer
#[derive(Debug, Clone, Default)]
pub struct LmMinimizer {
    config: MinimizerConfig,
}

impl LmMinimizer {
    pub fn new(config: MinimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MinimizerConfig {
        &self.config
    }

    /// `redchi * inv(JᵀJ)` at an external point
    ///
    /// `None` without degrees of freedom or when `JᵀJ` is singular.
    fn covariance(
        &self,
        residuals: &mut ResidualFn<'_>,
        params: &[f64],
        bounds: &[Bounds],
    ) -> Result<Option<Array2<f64>>> {
        let r = residuals(params)?;
        let dof = r.len() as i64 - params.len() as i64;
        if dof <= 0 {
            return Ok(None);
        }
        let redchi = sum_of_squares(&r) / dof as f64;

        let jac = forward_difference_jacobian(residuals, params, bounds, self.config.epsilon)?;
        let (rows, cols) = jac.dim();
        let j = DMatrix::from_row_iterator(rows, cols, jac.iter().copied());
        let jtj = j.transpose() * &j;

        Ok(jtj.try_inverse().map(|inv| {
            Array2::from_shape_fn((cols, cols), |(a, b)| inv[(a, b)] * redchi)
        }))
    }
}

impl Minimizer for LmMinimizer {
    fn name(&self) -> &str {
        "lm"
    }

    fn minimize(
        &self,
        initial: &[f64],
        bounds: &[Bounds],
        residuals: &mut ResidualFn<'_>,
    ) -> Result<MinimizerOutcome> {
        if initial.len() != bounds.len() {
            return Err(FitError::Minimizer(format!(
                "{} starting values for {} bounds",
                initial.len(),
                bounds.len()
            ))
            .into());
        }

        let transforms: Vec<BoundsTransform> = bounds.iter().copied().map(BoundsTransform::new).collect();
        let internal = initial
            .iter()
            .zip(&transforms)
            .map(|(&x, t)| t.to_internal(t.bounds().clamp(x)))
            .collect::<std::result::Result<Vec<f64>, _>>()?;

        let n = initial.len().max(1);
        let patience = (self.config.max_iterations / (n + 1)).max(1);
        let solver = LevenbergMarquardt::new()
            .with_ftol(self.config.ftol)
            .with_xtol(self.config.xtol)
            .with_gtol(self.config.gtol)
            .with_patience(patience);

        let problem = BoundedProblem {
            residuals: RefCell::new(residuals),
            transforms,
            internal: DVector::from_vec(internal),
            epsilon: self.config.epsilon,
            error: RefCell::new(None),
        };
        let (problem, report) = solver.minimize(problem);

        let params = problem.external(problem.internal.as_slice());
        if let Some(err) = problem.error.into_inner() {
            return Err(err);
        }
        let residuals = problem.residuals.into_inner();

        let covariance = self.covariance(residuals, &params, bounds)?;
        let success = report.termination.was_successful();
        let message = format!("{:?}", report.termination);
        tracing::debug!(
            evaluations = report.number_of_evaluations,
            objective = report.objective_function,
            %message,
            "Levenberg-Marquardt finished"
        );

        Ok(MinimizerOutcome {
            params,
            covariance,
            success,
            iterations: report.number_of_evaluations,
            message,
        })
    }
}

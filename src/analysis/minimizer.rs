//! Minimizer interface, name-based factory and shared numerics
//!
//! A minimizer receives the starting point, the allowed range of every
//! parameter and a residual closure. It never touches the parameter graph:
//! scattering values into live parameters is the closure's job.

use crate::analysis::{FitError, MinimizerConfig};
use crate::error::Result;
use crate::parameters::Bounds;
use ndarray::Array2;
use std::collections::BTreeMap;

/// Residual function handed to a minimizer
pub type ResidualFn<'a> = dyn FnMut(&[f64]) -> Result<Vec<f64>> + 'a;

/// What a minimizer reports back
#[derive(Debug, Clone)]
pub struct MinimizerOutcome {
    /// Best parameter vector found
    pub params: Vec<f64>,

    /// Parameter covariance, if it could be estimated
    pub covariance: Option<Array2<f64>>,

    pub success: bool,

    /// Number of residual evaluations
    pub iterations: usize,

    pub message: String,
}

pub trait Minimizer {
    fn name(&self) -> &str;

    /// Minimize the sum of squared residuals
    ///
    /// # Arguments
    ///
    /// * `initial` - Starting values, inside `bounds`
    /// * `bounds` - Allowed range of each parameter
    /// * `residuals` - Residual vector at a parameter vector
    fn minimize(
        &self,
        initial: &[f64],
        bounds: &[Bounds],
        residuals: &mut ResidualFn<'_>,
    ) -> Result<MinimizerOutcome>;
}

type MinimizerBuilder = Box<dyn Fn(&MinimizerConfig) -> Box<dyn Minimizer>>;

/// Registry of minimizer constructors, keyed by name
///
/// The default factory provides `"lm"` when the `lm` feature is enabled.
pub struct MinimizerFactory {
    builders: BTreeMap<String, MinimizerBuilder>,
}

impl Default for MinimizerFactory {
    fn default() -> Self {
        #[allow(unused_mut)]
        let mut factory = Self::empty();
        #[cfg(feature = "lm")]
        factory.register("lm", |config| {
            Box::new(crate::analysis::LmMinimizer::new(config.clone()))
        });
        factory
    }
}

impl MinimizerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory with no minimizers registered
    pub fn empty() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    /// Register a constructor, replacing any previous one under `name`
    pub fn register<F>(&mut self, name: &str, builder: F)
    where
        F: Fn(&MinimizerConfig) -> Box<dyn Minimizer> + 'static,
    {
        self.builders.insert(name.to_string(), Box::new(builder));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }

    pub fn create(&self, name: &str, config: &MinimizerConfig) -> Result<Box<dyn Minimizer>> {
        match self.builders.get(name) {
            Some(builder) => Ok(builder(config)),
            None => {
                let available = self.names().join(", ");
                tracing::warn!(name, %available, "Unknown minimizer");
                Err(FitError::UnknownMinimizer {
                    name: name.to_string(),
                    available,
                }
                .into())
            }
        }
    }
}

/// Jacobian of `residuals` at `params` by forward differences
///
/// The step for each parameter is `|x| * epsilon`, or `epsilon` near zero. A
/// step that would leave `bounds` is taken backwards instead.
pub(crate) fn forward_difference_jacobian(
    residuals: &mut ResidualFn<'_>,
    params: &[f64],
    bounds: &[Bounds],
    epsilon: f64,
) -> Result<Array2<f64>> {
    let base = residuals(params)?;
    let mut jac = Array2::zeros((base.len(), params.len()));

    for j in 0..params.len() {
        let mut step = if params[j].abs() > epsilon {
            params[j].abs() * epsilon
        } else {
            epsilon
        };
        if let Some(b) = bounds.get(j) {
            if !b.contains(params[j] + step) {
                step = -step;
            }
        }

        let mut perturbed = params.to_vec();
        perturbed[j] += step;
        let shifted = residuals(&perturbed)?;
        if shifted.len() != base.len() {
            return Err(FitError::Minimizer(format!(
                "residual length changed from {} to {}",
                base.len(),
                shifted.len()
            ))
            .into());
        }

        for (i, (s, r)) in shifted.iter().zip(&base).enumerate() {
            jac[[i, j]] = (s - r) / step;
        }
    }

    Ok(jac)
}

/// Standard errors from the covariance diagonal; negative variances give `None`
pub(crate) fn standard_errors(covariance: &Array2<f64>) -> Vec<Option<f64>> {
    covariance
        .diag()
        .iter()
        .map(|&v| if v >= 0.0 && v.is_finite() { Some(v.sqrt()) } else { None })
        .collect()
}

/// Sum of squares of a residual vector
pub(crate) fn sum_of_squares(residuals: &[f64]) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

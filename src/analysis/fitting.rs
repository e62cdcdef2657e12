//! Fit orchestration
//!
//! A fit runs through these stages:
//!
//! 1. apply constraints, then collect free parameters (abort if none)
//! 2. build the residual closure
//! 3. minimize; every evaluation scatters the vector into live parameters
//!    through the registry, re-applies constraints, asks the calculator for
//!    each experiment's pattern and concatenates weighted residuals
//! 4. scatter the final values and uncertainties
//! 5. report quality figures

use crate::analysis::joint::weighted_concat;
use crate::analysis::metrics::{r_factor, r_factor_squared, reduced_chi_square, weighted_r_factor};
use crate::analysis::minimizer::standard_errors;
use crate::analysis::{Calculator, FitError, FitProgressTracker, Minimizer};
use crate::constraints::{ConstraintEngine, ConstraintError};
use crate::datablocks::Datablock;
use crate::error::Result;
use crate::model::{Experiment, SampleModels};
use crate::parameters::{Bounds, ParameterRef};
use crate::registry::UidRegistry;
use ndarray::{concatenate, Array1, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One refined parameter in a fit report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedParameter {
    pub uid: String,
    pub start: f64,
    pub value: f64,
    pub uncertainty: Option<f64>,
    pub units: String,
}

impl FittedParameter {
    /// Relative change from the start value, in percent
    pub fn change_percent(&self) -> Option<f64> {
        (self.start != 0.0).then(|| (self.value - self.start) / self.start.abs() * 100.0)
    }
}

/// Outcome and quality figures of one fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResults {
    pub success: bool,
    pub message: String,
    /// Residual evaluations reported by the minimizer
    pub iterations: usize,
    pub reduced_chi_square: Option<f64>,
    pub parameters: Vec<FittedParameter>,
    pub r_factor: Option<f64>,
    pub r_factor_squared: Option<f64>,
    pub weighted_r_factor: Option<f64>,
    pub fitting_time_secs: Option<f64>,
    pub best_iteration: Option<usize>,
}

impl FitResults {
    pub fn parameter(&self, uid: &str) -> Option<&FittedParameter> {
        self.parameters.iter().find(|p| p.uid == uid)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.precision$}"))
}

impl fmt::Display for FitResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit {}: {}", if self.success { "succeeded" } else { "failed" }, self.message)?;
        writeln!(f, "  evaluations: {}", self.iterations)?;
        if let Some(secs) = self.fitting_time_secs {
            writeln!(f, "  fitting time: {secs:.2} s")?;
        }
        writeln!(f, "  reduced χ²: {}", fmt_opt(self.reduced_chi_square, 2))?;
        writeln!(f, "  R-factor (Rf): {}", fmt_opt(self.r_factor.map(|r| r * 100.0), 2))?;
        writeln!(f, "  R-factor squared (Rf²): {}", fmt_opt(self.r_factor_squared.map(|r| r * 100.0), 2))?;
        writeln!(f, "  weighted R-factor (wR): {}", fmt_opt(self.weighted_r_factor.map(|r| r * 100.0), 2))?;
        writeln!(f, "  refined parameters:")?;
        for p in &self.parameters {
            write!(
                f,
                "    {:<40} {:>12.6} -> {:>12.6} ± {:<10}",
                p.uid,
                p.start,
                p.value,
                fmt_opt(p.uncertainty, 6)
            )?;
            if !p.units.is_empty() {
                write!(f, " {}", p.units)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Residual builder and driver for one fit
pub struct Fitter<'a> {
    minimizer: &'a dyn Minimizer,
    calculator: &'a dyn Calculator,
}

impl<'a> Fitter<'a> {
    pub fn new(minimizer: &'a dyn Minimizer, calculator: &'a dyn Calculator) -> Self {
        Self {
            minimizer,
            calculator,
        }
    }

    /// Free parameters of the models and experiments, without duplicates
    pub fn collect_free_parameters(
        sample_models: &SampleModels,
        experiments: &[(&Experiment, f64)],
    ) -> Vec<ParameterRef> {
        let mut free: Vec<ParameterRef> = Vec::new();
        let candidates = sample_models
            .free_parameters()
            .into_iter()
            .chain(experiments.iter().flat_map(|(e, _)| e.free_parameters()));
        for p in candidates {
            if !free.iter().any(|q| q.ptr_eq(&p)) {
                free.push(p);
            }
        }
        free
    }

    /// Weighted residuals over the included points of every experiment
    ///
    /// The calculated pattern is the calculator output plus the experiment
    /// background. Each experiment contributes `(meas - calc) / su`, scaled
    /// by the square root of its weight. Uncertainties that are absent or not positive count
    /// as 1. The calculated pattern is stored in the experiment's datastore.
    pub fn residuals(
        &self,
        sample_models: &SampleModels,
        experiments: &[(&Experiment, f64)],
    ) -> Result<Array1<f64>> {
        let mut parts = Vec::with_capacity(experiments.len());
        for &(experiment, weight) in experiments {
            let calc = self.calculator.calculate_pattern(sample_models, experiment)?;
            let store = experiment.datastore();
            if calc.len() != store.len() {
                return Err(FitError::LengthMismatch {
                    experiment: experiment.name(),
                    expected: store.len(),
                    actual: calc.len(),
                }
                .into());
            }
            let calc = calc + &experiment.background.calculate(store.x());

            let diff = store.meas() - &calc;
            let residuals = match store.meas_su() {
                Some(su) => {
                    let su = su.mapv(|s| if s > 0.0 { s } else { 1.0 });
                    diff / su
                }
                None => diff,
            };
            drop(store);
            experiment.set_calculated(calc)?;
            parts.push((residuals, weight));
        }
        Ok(weighted_concat(&parts))
    }

    /// Refine the free parameters against `experiments`
    ///
    /// # Arguments
    ///
    /// * `sample_models` - Structures shared by all experiments
    /// * `experiments` - Experiments with their joint-fit weights (1.0 for a
    ///   single fit)
    /// * `registry` - Registry synced with the current project tree
    /// * `constraints` - Constraints applied before every evaluation
    ///
    /// # Returns
    ///
    /// The fit results, or [`FitError::NoFreeParameters`] without calling the
    /// minimizer when nothing is free
    pub fn fit(
        &self,
        sample_models: &SampleModels,
        experiments: &[(&Experiment, f64)],
        registry: &UidRegistry,
        constraints: &mut ConstraintEngine,
    ) -> Result<FitResults> {
        // each distinct constraint failure is warned about once per fit
        let mut reported: BTreeSet<String> = BTreeSet::new();
        let mut warn_new = |failures: &[ConstraintError]| {
            for failure in failures {
                if reported.insert(failure.to_string()) {
                    tracing::warn!(error = %failure, "Constraint not applied");
                }
            }
        };
        warn_new(&constraints.apply(registry).failures);

        let mut free = Vec::new();
        let mut uids = Vec::new();
        let mut initial = Vec::new();
        let mut bounds: Vec<Bounds> = Vec::new();
        for p in Self::collect_free_parameters(sample_models, experiments) {
            let uid = p.uid();
            registry.get(&uid)?;
            {
                let mut parameter = p.borrow_mut();
                parameter.record_start_value();
                let range = parameter.fit_range()?;
                if range.is_point() {
                    // nothing to refine inside a zero-width range
                    parameter.set_fitted_value(range.min)?;
                    tracing::debug!(%uid, value = range.min, "Zero-width fit range, held fixed");
                    continue;
                }
                initial.push(range.clamp(parameter.value()));
                bounds.push(range);
            }
            uids.push(uid);
            free.push(p);
        }
        if free.is_empty() {
            tracing::warn!("No free parameters to refine, skipping the minimizer");
            return Err(FitError::NoFreeParameters.into());
        }
        let n_free = free.len();
        tracing::info!(
            free = n_free,
            minimizer = self.minimizer.name(),
            calculator = self.calculator.name(),
            "Starting fit"
        );

        let mut tracker = FitProgressTracker::new();
        tracker.start_timer();

        let mut objective = |x: &[f64]| -> Result<Vec<f64>> {
            for (uid, &value) in uids.iter().zip(x) {
                registry.get(uid)?.borrow_mut().set_fitted_value(value)?;
            }
            warn_new(&constraints.apply(registry).failures);
            let residuals = self.residuals(sample_models, experiments)?.to_vec();
            tracker.track(&residuals, n_free);
            Ok(residuals)
        };

        let outcome = self.minimizer.minimize(&initial, &bounds, &mut objective)?;
        let final_residuals = objective(&outcome.params)?;
        tracker.stop_timer();

        let errors = outcome
            .covariance
            .as_ref()
            .map(standard_errors)
            .unwrap_or_else(|| vec![None; n_free]);
        let mut parameters = Vec::with_capacity(n_free);
        for (p, error) in free.iter().zip(errors) {
            let mut parameter = p.borrow_mut();
            parameter.set_uncertainty(error)?;
            parameters.push(FittedParameter {
                uid: parameter.uid(),
                start: parameter.start_value().unwrap_or(parameter.value()),
                value: parameter.value(),
                uncertainty: error,
                units: parameter.units().to_string(),
            });
        }

        let (meas, calc, su) = gather_patterns(experiments);
        let results = FitResults {
            success: outcome.success,
            message: outcome.message,
            iterations: outcome.iterations,
            reduced_chi_square: reduced_chi_square(&final_residuals, n_free),
            parameters,
            r_factor: r_factor(&meas, &calc),
            r_factor_squared: r_factor_squared(&meas, &calc),
            weighted_r_factor: weighted_r_factor(&meas, &calc, &su),
            fitting_time_secs: tracker.fitting_time().map(|t| t.as_secs_f64()),
            best_iteration: tracker.best_iteration(),
        };

        if results.success {
            tracing::info!(
                reduced_chi2 = ?results.reduced_chi_square,
                evaluations = results.iterations,
                "Fit converged"
            );
        } else {
            tracing::warn!(message = %results.message, "Fit did not converge");
        }
        Ok(results)
    }
}

/// Measured, calculated and su arrays of all experiments, concatenated
fn gather_patterns(experiments: &[(&Experiment, f64)]) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
    let mut meas = Vec::new();
    let mut calc = Vec::new();
    let mut su = Vec::new();
    for (experiment, _) in experiments {
        let store = experiment.datastore();
        let Some(c) = store.calc() else {
            continue;
        };
        meas.push(store.meas().clone());
        calc.push(c.clone());
        su.push(
            store
                .meas_su()
                .cloned()
                .unwrap_or_else(|| Array1::ones(store.len())),
        );
    }
    let join = |parts: Vec<Array1<f64>>| -> Array1<f64> {
        let views: Vec<ArrayView1<f64>> = parts.iter().map(|a| a.view()).collect();
        concatenate(Axis(0), &views).unwrap_or_else(|_| Array1::zeros(0))
    };
    (join(meas), join(calc), join(su))
}

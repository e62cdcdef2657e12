//! # Refinement Orchestration
//!
//! Everything between the parameter graph and the numerical backends:
//!
//! - [`Calculator`]: forward model turning parameters into a simulated pattern
//! - [`Minimizer`]: least-squares backend driving the residual function
//! - [`Fitter`]: collects free parameters, builds the residual closure,
//!   scatters results back and reports fit quality
//! - [`JointFitExperiments`]: per-experiment weights for joint refinement
//! - [`Analysis`]: configuration, factories and the last fit results
//!
//! No calculator ships with the crate; register one with
//! [`CalculatorFactory::register`] or hand it to [`Analysis::set_calculator`].

pub mod calculator;
pub mod config;
pub mod fitting;
pub mod joint;
#[cfg(feature = "lm")]
pub mod lm;
pub mod metrics;
pub mod minimizer;
pub mod tracking;

pub use calculator::{Calculator, CalculatorFactory};
pub use config::{AnalysisConfig, FitMode, JointFitConfig, MinimizerConfig};
pub use fitting::{FitResults, FittedParameter, Fitter};
pub use joint::{JointFitExperiment, JointFitExperiments};
#[cfg(feature = "lm")]
pub use lm::LmMinimizer;
pub use minimizer::{Minimizer, MinimizerFactory, MinimizerOutcome, ResidualFn};
pub use tracking::FitProgressTracker;

use crate::constraints::ConstraintEngine;
use crate::datablocks::Datablock;
use crate::error::Result;
use crate::model::{Experiment, Experiments, SampleModels};
use crate::registry::UidRegistry;
use thiserror::Error;

/// Errors raised while setting up or running a fit
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("No free parameters to refine")]
    NoFreeParameters,

    #[error("No experiments to fit")]
    NoExperiments,

    #[error("No calculator selected")]
    NoCalculator,

    #[error("Unknown calculator '{name}', available: {available}")]
    UnknownCalculator { name: String, available: String },

    #[error("Unknown minimizer '{name}', available: {available}")]
    UnknownMinimizer { name: String, available: String },

    #[error("Calculated pattern for '{experiment}' has {actual} points, expected {expected}")]
    LengthMismatch {
        experiment: String,
        expected: usize,
        actual: usize,
    },

    #[error("Minimizer failed: {0}")]
    Minimizer(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Refinement settings, backends and the last results of a project
pub struct Analysis {
    config: AnalysisConfig,
    calculators: CalculatorFactory,
    minimizers: MinimizerFactory,
    calculator: Option<Box<dyn Calculator>>,
    pub joint_fit_experiments: JointFitExperiments,
    fit_results: Vec<FitResults>,
}

impl std::fmt::Debug for Analysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analysis")
            .field("config", &self.config)
            .field("calculator", &self.calculator.as_ref().map(|c| c.name().to_string()))
            .field("joint_fit_experiments", &self.joint_fit_experiments.ids())
            .field("fit_results", &self.fit_results.len())
            .finish()
    }
}

impl Default for Analysis {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl Analysis {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            calculators: CalculatorFactory::new(),
            minimizers: MinimizerFactory::default(),
            calculator: None,
            joint_fit_experiments: JointFitExperiments::new(),
            fit_results: Vec::new(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AnalysisConfig {
        &mut self.config
    }

    pub fn calculators_mut(&mut self) -> &mut CalculatorFactory {
        &mut self.calculators
    }

    pub fn minimizers_mut(&mut self) -> &mut MinimizerFactory {
        &mut self.minimizers
    }

    /// Use a calculator instance directly
    pub fn set_calculator(&mut self, calculator: Box<dyn Calculator>) {
        tracing::info!(calculator = calculator.name(), "Calculator set");
        self.config.calculator = Some(calculator.name().to_string());
        self.calculator = Some(calculator);
    }

    /// Select a registered calculator by name
    pub fn select_calculator(&mut self, name: &str) -> Result<()> {
        let calculator = self.calculators.create(name)?;
        self.set_calculator(calculator);
        Ok(())
    }

    /// Select a registered minimizer by name
    pub fn select_minimizer(&mut self, name: &str) -> Result<()> {
        if !self.minimizers.contains(name) {
            return Err(FitError::UnknownMinimizer {
                name: name.to_string(),
                available: self.minimizers.names().join(", "),
            }
            .into());
        }
        tracing::info!(minimizer = name, "Minimizer set");
        self.config.minimizer = name.to_string();
        Ok(())
    }

    pub fn calculator(&self) -> Option<&dyn Calculator> {
        self.calculator.as_deref()
    }

    /// Results of the last call to [`Analysis::fit`], one per fit performed
    pub fn fit_results(&self) -> &[FitResults] {
        &self.fit_results
    }

    /// Refine the project
    ///
    /// In single mode each experiment is fitted on its own, in insertion order;
    /// in joint mode all experiments are fitted at once with their
    /// joint-fit weights.
    ///
    /// # Returns
    ///
    /// The results of the last fit performed
    pub fn fit(
        &mut self,
        sample_models: &SampleModels,
        experiments: &Experiments,
        registry: &UidRegistry,
        constraints: &mut ConstraintEngine,
    ) -> Result<&FitResults> {
        if experiments.is_empty() {
            tracing::warn!("No experiments to fit");
            return Err(FitError::NoExperiments.into());
        }
        if self.calculator.is_none() {
            let name = self.config.calculator.clone().ok_or(FitError::NoCalculator)?;
            self.calculator = Some(self.calculators.create(&name)?);
        }
        let calculator = self.calculator.as_deref().ok_or(FitError::NoCalculator)?;
        let minimizer = self
            .minimizers
            .create(&self.config.minimizer, &self.config.minimizer_options)?;
        let fitter = Fitter::new(minimizer.as_ref(), calculator);

        self.fit_results.clear();
        match self.config.fit_mode {
            FitMode::Single => {
                for experiment in experiments {
                    tracing::info!(experiment = %experiment.name(), "Single fit");
                    let results = fitter.fit(sample_models, &[(experiment, 1.0)], registry, constraints)?;
                    self.fit_results.push(results);
                }
            }
            FitMode::Joint => {
                let all: Vec<&Experiment> = experiments.iter().collect();
                let weights = self
                    .joint_fit_experiments
                    .weights_for(&all, self.config.joint.normalize_weights);
                let weighted: Vec<(&Experiment, f64)> = all.into_iter().zip(weights).collect();
                tracing::info!(experiments = weighted.len(), "Joint fit");
                let results = fitter.fit(sample_models, &weighted, registry, constraints)?;
                self.fit_results.push(results);
            }
        }

        self.fit_results
            .last()
            .ok_or_else(|| FitError::NoExperiments.into())
    }
}

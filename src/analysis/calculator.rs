//! Forward-model interface and its name-based factory

use crate::analysis::FitError;
use crate::error::Result;
use crate::model::{Experiment, SampleModel, SampleModels};
use ndarray::Array1;
use std::collections::BTreeMap;

/// Turns the current parameter values into a simulated pattern
///
/// Implementations read parameters through the public model API; they must
/// not change them.
pub trait Calculator {
    fn name(&self) -> &str;

    /// Simulated intensities at the experiment's included x-positions
    ///
    /// The returned array must have the same length as
    /// `experiment.datastore().x()`. The experiment background is added by
    /// the caller and must not be included.
    fn calculate_pattern(
        &self,
        sample_models: &SampleModels,
        experiment: &Experiment,
    ) -> Result<Array1<f64>>;

    /// Structure factors for single-crystal data
    fn calculate_structure_factors(
        &self,
        _sample_model: &SampleModel,
        _experiment: &Experiment,
    ) -> Result<Array1<f64>> {
        Err(FitError::Unsupported(format!(
            "calculator '{}' does not compute structure factors",
            self.name()
        ))
        .into())
    }
}

type CalculatorBuilder = Box<dyn Fn() -> Box<dyn Calculator>>;

/// Registry of calculator constructors, keyed by name
#[derive(Default)]
pub struct CalculatorFactory {
    builders: BTreeMap<String, CalculatorBuilder>,
}

impl CalculatorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor, replacing any previous one under `name`
    pub fn register<F>(&mut self, name: &str, builder: F)
    where
        F: Fn() -> Box<dyn Calculator> + 'static,
    {
        tracing::debug!(name, "Calculator registered");
        self.builders.insert(name.to_string(), Box::new(builder));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Calculator>> {
        match self.builders.get(name) {
            Some(builder) => Ok(builder()),
            None => {
                let available = self.names().join(", ");
                tracing::warn!(name, %available, "Unknown calculator");
                Err(FitError::UnknownCalculator {
                    name: name.to_string(),
                    available,
                }
                .into())
            }
        }
    }
}

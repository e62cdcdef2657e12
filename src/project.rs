//! # Project
//!
//! Owns the sample models, experiments and analysis of one refinement
//! session, together with the session-scoped services they share: the
//! [`UidRegistry`] and the [`ConstraintEngine`].
//!
//! ## Example Usage
//!
//! ```rust
//! use diffrefine::model::{Experiment, ExperimentType, SampleModel};
//! use diffrefine::Project;
//!
//! let mut project = Project::new();
//! project.add_sample_model(SampleModel::new("lbco").unwrap()).unwrap();
//! project
//!     .add_experiment(Experiment::new("hrpt", ExperimentType::powder_cwl_neutron().unwrap()).unwrap())
//!     .unwrap();
//!
//! let length_a = project.sample_models.get("lbco").unwrap().cell.length_a.clone();
//! let length_b = project.sample_models.get("lbco").unwrap().cell.length_b.clone();
//! project.set_aliases([("a", &length_a), ("b", &length_b)]);
//! project.add_constraint("b", "a * 2").unwrap();
//!
//! length_a.set_value(3.0).unwrap();
//! assert!(project.apply_constraints().unwrap().is_clean());
//! assert_eq!(length_b.value(), 6.0);
//! ```

use crate::analysis::{Analysis, FitResults};
use crate::collection::CollectionError;
use crate::constraints::{ApplyReport, ConstraintEngine};
use crate::datablocks::Datablock;
use crate::error::Result;
use crate::model::{Experiment, Experiments, SampleModel, SampleModels};
use crate::parameters::{Attribute, ParameterRef};
use crate::registry::UidRegistry;
use std::collections::BTreeMap;

/// One refinement session
#[derive(Debug, Default)]
pub struct Project {
    pub sample_models: SampleModels,
    pub experiments: Experiments,
    pub analysis: Analysis,
    registry: UidRegistry,
    constraints: ConstraintEngine,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sample model, replacing one with the same name
    pub fn add_sample_model(&mut self, model: SampleModel) -> Result<()> {
        if let Some(replaced) = self.sample_models.add(model) {
            tracing::debug!(name = %replaced.name(), "Sample model replaced");
        }
        self.sync_registry()
    }

    /// Add an experiment, replacing one with the same name
    pub fn add_experiment(&mut self, experiment: Experiment) -> Result<()> {
        if let Some(replaced) = self.experiments.add(experiment) {
            tracing::debug!(name = %replaced.name(), "Experiment replaced");
        }
        self.sync_registry()
    }

    pub fn remove_sample_model(&mut self, name: &str) -> Result<SampleModel> {
        let model = self.sample_models.remove(name)?;
        self.sync_registry()?;
        Ok(model)
    }

    pub fn remove_experiment(&mut self, name: &str) -> Result<Experiment> {
        let experiment = self.experiments.remove(name)?;
        self.sync_registry()?;
        Ok(experiment)
    }

    /// Rename a sample model; uids of its parameters follow
    ///
    /// Fails with [`CollectionError::NameTaken`] if another model already
    /// uses `new`. On failure the model keeps its old name.
    pub fn rename_sample_model(&mut self, old: &str, new: &str) -> Result<()> {
        if old != new && self.sample_models.contains(new) {
            return Err(CollectionError::NameTaken {
                name: new.to_string(),
            }
            .into());
        }
        self.sample_models
            .get_mut(old)
            .ok_or_else(|| CollectionError::NotFound {
                name: old.to_string(),
            })?
            .set_name(new);
        if let Err(err) = self.sync_registry() {
            if let Some(model) = self.sample_models.get_mut(new) {
                model.set_name(old);
            }
            return Err(err);
        }
        Ok(())
    }

    /// Rename an experiment; uids of its parameters follow
    ///
    /// Same rules as [`Project::rename_sample_model`].
    pub fn rename_experiment(&mut self, old: &str, new: &str) -> Result<()> {
        if old != new && self.experiments.contains(new) {
            return Err(CollectionError::NameTaken {
                name: new.to_string(),
            }
            .into());
        }
        self.experiments
            .get_mut(old)
            .ok_or_else(|| CollectionError::NotFound {
                name: old.to_string(),
            })?
            .set_name(new);
        if let Err(err) = self.sync_registry() {
            if let Some(experiment) = self.experiments.get_mut(new) {
                experiment.set_name(old);
            }
            return Err(err);
        }
        Ok(())
    }

    fn attributes(&self) -> Vec<Attribute> {
        let mut attributes = self.sample_models.attributes();
        attributes.extend(self.experiments.attributes());
        attributes
    }

    /// Rebuild the registry from the current tree
    ///
    /// Parameters whose uid changed since the last sync (renamed datablock,
    /// relabelled atom site) keep their constraint aliases.
    pub fn sync_registry(&mut self) -> Result<()> {
        let previous = self.registry.snapshot();
        let attributes = self.attributes();
        self.registry.sync(&attributes)?;

        // only parameters still in the tree can move; replaced ones are dropped
        let moves: BTreeMap<String, String> = previous
            .into_iter()
            .filter_map(|(old, parameter)| {
                let new = parameter.uid();
                let live = self
                    .registry
                    .get(&new)
                    .map_or(false, |p| p.ptr_eq(&parameter));
                (live && new != old).then_some((old, new))
            })
            .collect();
        if !moves.is_empty() {
            let rebound = self.constraints.retarget(&moves);
            tracing::debug!(moved = moves.len(), rebound, "Parameter uids changed");
        }
        tracing::debug!(parameters = self.registry.len(), "Registry synced");
        Ok(())
    }

    pub fn registry(&self) -> &UidRegistry {
        &self.registry
    }

    pub fn constraints(&self) -> &ConstraintEngine {
        &self.constraints
    }

    pub fn constraints_mut(&mut self) -> &mut ConstraintEngine {
        &mut self.constraints
    }

    /// Replace all constraint aliases
    pub fn set_aliases<'a>(&mut self, aliases: impl IntoIterator<Item = (&'a str, &'a ParameterRef)>) {
        self.constraints.set_aliases(aliases);
    }

    /// Register `dependent = expression`
    pub fn add_constraint(&mut self, dependent: &str, expression: &str) -> Result<()> {
        self.constraints.add_constraint(dependent, expression)?;
        Ok(())
    }

    /// Remove the constraint at `index`, releasing its dependent
    pub fn remove_constraint(&mut self, index: usize) -> Result<()> {
        self.constraints.remove(index, &self.registry)?;
        Ok(())
    }

    /// Apply all constraints once against the synced registry
    pub fn apply_constraints(&mut self) -> Result<ApplyReport> {
        self.sync_registry()?;
        let report = self.constraints.apply(&self.registry);
        for failure in &report.failures {
            tracing::warn!(error = %failure, "Constraint not applied");
        }
        Ok(report)
    }

    /// Every parameter in the project, models first
    pub fn parameters(&self) -> Vec<ParameterRef> {
        let mut parameters = self.sample_models.parameters();
        parameters.extend(self.experiments.parameters());
        parameters
    }

    pub fn free_parameters(&self) -> Vec<ParameterRef> {
        let mut parameters = self.sample_models.free_parameters();
        parameters.extend(self.experiments.free_parameters());
        parameters
    }

    /// Run the analysis over the whole project
    pub fn fit(&mut self) -> Result<&FitResults> {
        self.sync_registry()?;
        self.analysis.fit(
            &self.sample_models,
            &self.experiments,
            &self.registry,
            &mut self.constraints,
        )
    }
}

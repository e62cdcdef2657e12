//! Per-experiment weights for joint refinement

use crate::categories::{entry_key, CategoryCollection, CategoryCore, CategoryItem};
use crate::collection::{CollectionError, Keyed};
use crate::datablocks::Datablock;
use crate::model::{text_descriptor, Experiment, ModelError, ParamSpec};
use crate::parameters::{Bounds, DescriptorRef, ParameterRef};
use ndarray::{concatenate, Array1, ArrayView1, Axis};

/// Weight of one experiment in a joint fit
#[derive(Debug)]
pub struct JointFitExperiment {
    core: CategoryCore,
    pub id: DescriptorRef,
    pub weight: ParameterRef,
}

impl JointFitExperiment {
    pub fn new(id: &str, weight: f64) -> Result<Self, ModelError> {
        let mut core = CategoryCore::new("joint_fit_experiment");
        let id = text_descriptor(&mut core, "id", "_joint_fit_experiment.id", id, None, true)?;
        let weight = ParamSpec::new("weight", "_joint_fit_experiment.weight", weight)
            .bounds(Bounds::min_only(0.0))
            .attach(&mut core)?;
        core.name_after(&id);
        Ok(Self { core, id, weight })
    }
}

impl CategoryItem for JointFitExperiment {
    fn core(&self) -> &CategoryCore {
        &self.core
    }
}

impl Keyed for JointFitExperiment {
    fn key(&self) -> String {
        entry_key(self)
    }
}

/// Joint-fit weights keyed by experiment name
///
/// Experiments without an entry weigh 1.0.
#[derive(Debug)]
pub struct JointFitExperiments {
    items: CategoryCollection<JointFitExperiment>,
}

impl Default for JointFitExperiments {
    fn default() -> Self {
        Self::new()
    }
}

impl JointFitExperiments {
    pub fn new() -> Self {
        Self {
            items: CategoryCollection::new("joint_fit_experiment"),
        }
    }

    /// Set the weight of an experiment, replacing any previous entry
    pub fn add(&mut self, id: &str, weight: f64) -> Result<(), ModelError> {
        self.items.add(JointFitExperiment::new(id, weight)?);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<JointFitExperiment, CollectionError> {
        self.items.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&JointFitExperiment> {
        self.items.get(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.items.names()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn weight_for(&self, id: &str) -> f64 {
        self.items.get(id).map_or(1.0, |e| e.weight.value())
    }

    /// Weights of `experiments`, in the same order
    ///
    /// With `normalize`, weights are rescaled to sum to the number of
    /// experiments. All-zero weights are left as they are.
    pub fn weights_for(&self, experiments: &[&Experiment], normalize: bool) -> Vec<f64> {
        let mut weights: Vec<f64> = experiments.iter().map(|e| self.weight_for(&e.name())).collect();
        if normalize {
            let total: f64 = weights.iter().sum();
            if total > 0.0 {
                let scale = weights.len() as f64 / total;
                weights.iter_mut().for_each(|w| *w *= scale);
            } else {
                tracing::warn!("Joint-fit weights sum to zero, not normalizing");
            }
        }
        weights
    }
}

/// Concatenate residual vectors, each scaled by `sqrt(weight)`
///
/// The sum of squares of the result is `Σ weight_i · SSE_i`.
pub fn weighted_concat(parts: &[(Array1<f64>, f64)]) -> Array1<f64> {
    let scaled: Vec<Array1<f64>> = parts
        .iter()
        .map(|(residuals, weight)| residuals * weight.max(0.0).sqrt())
        .collect();
    let views: Vec<ArrayView1<f64>> = scaled.iter().map(|a| a.view()).collect();
    concatenate(Axis(0), &views).unwrap_or_else(|_| Array1::zeros(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExperimentType;
    use approx::assert_relative_eq;

    #[test]
    fn test_weights_default_and_normalize() {
        let mut joint = JointFitExperiments::new();
        joint.add("npd", 3.0).unwrap();
        joint.add("xrd", 1.0).unwrap();

        let npd = Experiment::new("npd", ExperimentType::powder_cwl_neutron().unwrap()).unwrap();
        let xrd = Experiment::new("xrd", ExperimentType::powder_cwl_neutron().unwrap()).unwrap();
        let other = Experiment::new("other", ExperimentType::powder_cwl_neutron().unwrap()).unwrap();

        assert_eq!(joint.weights_for(&[&npd, &xrd, &other], false), vec![3.0, 1.0, 1.0]);
        let normalized = joint.weights_for(&[&npd, &xrd, &other], true);
        assert_relative_eq!(normalized.iter().sum::<f64>(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(normalized[0], 1.8, epsilon = 1e-12);

        joint.add("npd", 0.5).unwrap();
        assert_eq!(joint.len(), 2);
        assert_eq!(joint.weight_for("npd"), 0.5);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut joint = JointFitExperiments::new();
        assert!(joint.add("npd", -1.0).is_err());
        assert!(joint.is_empty());
    }

    #[test]
    fn test_weighted_concat_sum_of_squares() {
        let a = Array1::from_elem(10, 2.0);
        let b = Array1::from_elem(5, 1.0);
        let (wa, wb) = (0.25, 4.0);

        let combined = weighted_concat(&[(a.clone(), wa), (b.clone(), wb)]);
        assert_eq!(combined.len(), 15);

        let sse = |v: &Array1<f64>| v.mapv(|r| r * r).sum();
        assert_relative_eq!(sse(&combined), wa * sse(&a) + wb * sse(&b), epsilon = 1e-12);
    }
}

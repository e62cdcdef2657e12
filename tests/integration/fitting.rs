//! End-to-end refinement tests against synthetic Gaussian patterns.

use crate::test_helpers::{
    init_tracing, sample_model, synthetic_experiment, GaussianCalculator, TRUE_LENGTH_A, TRUE_SCALE,
};
use approx::assert_relative_eq;
use diffrefine::analysis::{Calculator, FitError, FitMode, JointFitExperiments};
use diffrefine::datablocks::Datablock;
use diffrefine::{Error, Project};
use ndarray::Array1;

fn project_with(experiments: &[(&str, u64)]) -> Project {
    let mut project = Project::new();
    project.add_sample_model(sample_model("lbco", 4.8)).unwrap();
    for &(name, seed) in experiments {
        project
            .add_experiment(synthetic_experiment(name, "lbco", 1.5, seed))
            .unwrap();
    }
    project
        .analysis
        .calculators_mut()
        .register("gaussian", || Box::new(GaussianCalculator) as Box<dyn Calculator>);
    project.analysis.select_calculator("gaussian").unwrap();
    project
}

fn free_cell_and_scales(project: &Project) {
    project.sample_models.get("lbco").unwrap().cell.length_a.set_free(true);
    for experiment in &project.experiments {
        experiment.linked_phases.get("lbco").unwrap().scale.set_free(true);
    }
}

#[test]
fn test_zero_free_parameters_is_reported() {
    init_tracing();
    let mut project = project_with(&[("hrpt", 1)]);
    let err = project.fit().unwrap_err();
    assert!(matches!(err, Error::Fit(FitError::NoFreeParameters)));
    assert!(project.analysis.fit_results().is_empty());
}

#[test]
fn test_unknown_backends_are_errors() {
    let mut project = project_with(&[("hrpt", 1)]);
    assert!(matches!(
        project.analysis.select_calculator("cryspy"),
        Err(Error::Fit(FitError::UnknownCalculator { .. }))
    ));
    assert!(matches!(
        project.analysis.select_minimizer("bumps"),
        Err(Error::Fit(FitError::UnknownMinimizer { .. }))
    ));
}

#[test]
fn test_empty_project_is_reported() {
    let mut project = Project::new();
    project.add_sample_model(sample_model("lbco", 4.8)).unwrap();
    project.sample_models.get("lbco").unwrap().cell.length_a.set_free(true);
    let err = project.fit().unwrap_err();
    assert!(matches!(err, Error::Fit(FitError::NoExperiments)));
}

#[test]
fn test_residuals_reach_calculator_output() {
    let project = project_with(&[("hrpt", 1)]);
    let experiment = project.experiments.get("hrpt").unwrap();
    let calc = GaussianCalculator
        .calculate_pattern(&project.sample_models, experiment)
        .unwrap();
    assert_eq!(calc.len(), experiment.datastore().len());
    let peak = calc.iter().cloned().fold(f64::MIN, f64::max);
    assert_relative_eq!(peak, 1.5, epsilon = 1e-12);
}

/// Lift the measured pattern of `name` by a flat `offset` and free two
/// background points at the ends of the x-range
fn add_flat_background(project: &mut Project, name: &str, offset: f64) {
    let experiment = project.experiments.get_mut(name).unwrap();
    let (x, meas, su) = {
        let store = experiment.datastore();
        (store.x().clone(), store.meas() + offset, store.meas_su().cloned())
    };
    experiment.load_measured_data(x, meas, su).unwrap();
    experiment.background.add_point(0.0, 0.0).unwrap();
    experiment.background.add_point(10.0, 0.0).unwrap();
    for p in experiment.background.parameters() {
        p.set_free(true);
    }
    project.sync_registry().unwrap();
}

#[test]
fn test_background_points_join_free_parameters() {
    let mut project = project_with(&[("hrpt", 1)]);
    add_flat_background(&mut project, "hrpt", 0.3);

    let uids: Vec<String> = project.free_parameters().iter().map(|p| p.uid()).collect();
    assert_eq!(uids, vec!["hrpt.background.0.y", "hrpt.background.10.y"]);
    assert!(project.registry().contains("hrpt.background.10.y"));
}

#[cfg(feature = "lm")]
mod lm {
    use super::*;

    #[test]
    fn test_background_is_refined_with_the_peak() {
        init_tracing();
        let mut project = project_with(&[("hrpt", 11)]);
        free_cell_and_scales(&project);
        add_flat_background(&mut project, "hrpt", 0.3);

        let results = project.fit().unwrap().clone();
        assert!(results.success, "{}", results.message);
        for uid in ["hrpt.background.0.y", "hrpt.background.10.y"] {
            let fitted = results.parameter(uid).unwrap();
            assert_relative_eq!(fitted.value, 0.3, epsilon = 1e-2);
        }
        let a = project.sample_models.get("lbco").unwrap().cell.length_a.value();
        assert_relative_eq!(a, TRUE_LENGTH_A, epsilon = 1e-2);
    }

    #[test]
    fn test_single_fit_recovers_peak() {
        init_tracing();
        let mut project = project_with(&[("hrpt", 7)]);
        free_cell_and_scales(&project);

        let results = project.fit().unwrap().clone();
        assert!(results.success, "{}", results.message);
        assert!(results.iterations > 0);

        let a = project.sample_models.get("lbco").unwrap().cell.length_a.clone();
        assert_relative_eq!(a.value(), TRUE_LENGTH_A, epsilon = 1e-2);
        let scale = project
            .experiments
            .get("hrpt")
            .unwrap()
            .linked_phases
            .get("lbco")
            .unwrap()
            .scale
            .value();
        assert_relative_eq!(scale, TRUE_SCALE, epsilon = 1e-2);

        let fitted = results.parameter("lbco.cell.length_a").unwrap();
        assert_eq!(fitted.start, 4.8);
        assert!(fitted.uncertainty.map_or(false, |u| u > 0.0 && u < 0.1));
        assert_eq!(a.uncertainty(), fitted.uncertainty);

        // noise amplitude is about a third of su
        let chi2 = results.reduced_chi_square.unwrap();
        assert!(chi2 < 1.0, "reduced chi2 {chi2}");
        assert!(results.r_factor.unwrap() < 0.05);
        assert!(results.weighted_r_factor.is_some());
        assert!(results.fitting_time_secs.is_some());
        assert!(results.to_json().unwrap().contains("lbco.cell.length_a"));
    }

    #[test]
    fn test_single_mode_fits_each_experiment() {
        let mut project = project_with(&[("hrpt", 1), ("d20", 2)]);
        free_cell_and_scales(&project);

        project.fit().unwrap();
        let results = project.analysis.fit_results();
        assert_eq!(results.len(), 2);
        assert!(results[0].parameter("hrpt.linked_phases.lbco.scale").is_some());
        assert!(results[0].parameter("d20.linked_phases.lbco.scale").is_none());
        assert!(results[1].parameter("d20.linked_phases.lbco.scale").is_some());
    }

    #[test]
    fn test_joint_fit_refines_shared_cell() {
        let mut project = project_with(&[("hrpt", 3), ("d20", 4)]);
        free_cell_and_scales(&project);
        project.analysis.config_mut().fit_mode = FitMode::Joint;
        project.analysis.joint_fit_experiments.add("hrpt", 2.0).unwrap();

        let results = project.fit().unwrap().clone();
        assert_eq!(project.analysis.fit_results().len(), 1);
        assert_eq!(results.parameters.len(), 3);
        let a = project.sample_models.get("lbco").unwrap().cell.length_a.value();
        assert_relative_eq!(a, TRUE_LENGTH_A, epsilon = 1e-2);
        for experiment in &project.experiments {
            assert!(experiment.datastore().calc().is_some(), "{}", experiment.name());
        }
    }

    #[test]
    fn test_constrained_scale_follows_refined_one() {
        let mut project = project_with(&[("hrpt", 5), ("d20", 6)]);
        free_cell_and_scales(&project);
        project.analysis.config_mut().fit_mode = FitMode::Joint;

        let hrpt = project.experiments.get("hrpt").unwrap().linked_phases.get("lbco").unwrap().scale.clone();
        let d20 = project.experiments.get("d20").unwrap().linked_phases.get("lbco").unwrap().scale.clone();
        project.set_aliases([("s1", &hrpt), ("s2", &d20)]);
        project.add_constraint("s2", "s1").unwrap();

        let results = project.fit().unwrap().clone();
        assert_eq!(results.parameters.len(), 2);
        assert!(d20.constrained());
        assert_relative_eq!(d20.value(), hrpt.value(), epsilon = 1e-12);
        assert_relative_eq!(hrpt.value(), TRUE_SCALE, epsilon = 1e-2);
    }

    #[test]
    fn test_length_mismatch_aborts_fit() {
        struct Short;

        impl Calculator for Short {
            fn name(&self) -> &str {
                "short"
            }

            fn calculate_pattern(
                &self,
                _: &diffrefine::model::SampleModels,
                _: &diffrefine::model::Experiment,
            ) -> diffrefine::Result<Array1<f64>> {
                Ok(Array1::zeros(3))
            }
        }

        let mut project = project_with(&[("hrpt", 1)]);
        free_cell_and_scales(&project);
        project.analysis.set_calculator(Box::new(Short));
        let err = project.fit().unwrap_err();
        assert!(matches!(err, Error::Fit(FitError::LengthMismatch { .. })));
    }
}

#[test]
fn test_joint_weights_default_to_one() {
    let project = project_with(&[("hrpt", 1), ("d20", 2)]);
    let mut joint = JointFitExperiments::new();
    joint.add("hrpt", 0.5).unwrap();

    let experiments: Vec<_> = project.experiments.iter().collect();
    assert_eq!(joint.weights_for(&experiments, false), vec![0.5, 1.0]);
}

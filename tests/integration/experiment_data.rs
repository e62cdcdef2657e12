//! Tests for experiment datablocks: measured data, excluded regions and the
//! peak-profile factory.

use diffrefine::categories::CategoryItem;
use diffrefine::datablocks::Datablock;
use diffrefine::model::{
    BeamMode, ExcludedRegion, Experiment, ExperimentType, ModelError, PeakProfileType,
    RadiationProbe, SampleForm, ScatteringType,
};
use ndarray::array;

fn experiment() -> Experiment {
    let mut experiment = Experiment::new("hrpt", ExperimentType::powder_cwl_neutron().unwrap()).unwrap();
    experiment
        .load_measured_data(
            array![0.0, 1.0, 2.0, 3.0],
            array![5.0, 6.0, 7.0, 8.0],
            Some(array![0.5, 0.5, 0.5, 0.5]),
        )
        .unwrap();
    experiment
}

#[test]
fn test_excluded_region_filters_points() {
    let mut experiment = experiment();
    experiment
        .excluded_regions
        .add(ExcludedRegion::new(1.0, 2.0).unwrap());

    let store = experiment.datastore();
    assert_eq!(store.x(), &array![0.0, 3.0]);
    assert_eq!(store.meas(), &array![5.0, 8.0]);
    assert_eq!(store.meas_su().unwrap(), &array![0.5, 0.5]);
    assert_eq!(store.excluded(), &[false, true, true, false]);
    assert_eq!(store.full_x().len(), 4);
}

#[test]
fn test_removing_region_restores_points() {
    let mut experiment = experiment();
    experiment
        .excluded_regions
        .add(ExcludedRegion::new(1.0, 2.0).unwrap());
    let name = experiment.excluded_regions.names()[0].clone();

    experiment.excluded_regions.remove(&name).unwrap();
    assert_eq!(experiment.datastore().len(), 4);
}

#[test]
fn test_regions_survive_reload() {
    let mut experiment = experiment();
    experiment
        .excluded_regions
        .add(ExcludedRegion::new(2.5, 10.0).unwrap());

    experiment
        .load_measured_data(array![0.0, 2.0, 4.0], array![1.0, 1.0, 1.0], None)
        .unwrap();
    let store = experiment.datastore();
    assert_eq!(store.x(), &array![0.0, 2.0]);
    assert!(store.meas_su().is_none());
}

#[test]
fn test_inverted_region_rejected() {
    assert!(matches!(
        ExcludedRegion::new(3.0, 1.0),
        Err(ModelError::InvertedRegion { .. })
    ));
}

#[test]
fn test_mismatched_data_rejected() {
    let mut experiment = experiment();
    let result = experiment.load_measured_data(array![0.0, 1.0], array![1.0], None);
    assert!(matches!(result, Err(ModelError::LengthMismatch { .. })));

    let result = experiment.set_calculated(array![1.0]);
    assert!(matches!(result, Err(ModelError::LengthMismatch { .. })));
}

#[test]
fn test_peak_profile_follows_experiment_type() {
    let tof = ExperimentType::new(
        SampleForm::Powder,
        BeamMode::TimeOfFlight,
        RadiationProbe::Neutron,
        ScatteringType::Bragg,
    )
    .unwrap();
    let mut experiment = Experiment::new("wish", tof).unwrap();
    assert_eq!(
        experiment.peak.profile_type(),
        PeakProfileType::PseudoVoigtIkedaCarpenter
    );

    experiment
        .set_peak_profile_type(PeakProfileType::PseudoVoigtBackToBack)
        .unwrap();
    assert_eq!(experiment.peak.profile_type(), PeakProfileType::PseudoVoigtBackToBack);

    let result = experiment.set_peak_profile_type(PeakProfileType::ThompsonCoxHastings);
    assert!(matches!(result, Err(ModelError::UnsupportedPeakProfile { .. })));
    assert_eq!(experiment.peak.profile_type(), PeakProfileType::PseudoVoigtBackToBack);
}

#[test]
fn test_experiment_uids_and_rename() {
    let mut experiment = experiment();
    let uids: Vec<String> = experiment.parameters().iter().map(|p| p.uid()).collect();
    assert!(uids.contains(&"hrpt.instrument.calib_twotheta_offset".to_string()));
    assert!(uids.iter().all(|uid| uid.starts_with("hrpt.")));

    experiment.set_name("hrpt2");
    assert!(experiment
        .peak
        .parameters()
        .iter()
        .all(|p| p.uid().starts_with("hrpt2.peak.")));
}

//! Tests for constraints between parameters of a project.

use diffrefine::constraints::{ConstraintError, ConstraintState};
use diffrefine::model::{AtomSite, SampleModel};
use diffrefine::{Error, Project};

fn project() -> Project {
    let mut model = SampleModel::new("lbco").unwrap();
    model
        .atom_sites
        .add(AtomSite::new("La", "La").unwrap().with_occupancy(0.5).unwrap());
    model
        .atom_sites
        .add(AtomSite::new("Ba", "Ba").unwrap().with_occupancy(0.5).unwrap());
    let mut project = Project::new();
    project.add_sample_model(model).unwrap();
    project
}

#[test]
fn test_dependent_is_computed_and_leaves_free_list() {
    let mut project = project();
    let cell = &project.sample_models.get("lbco").unwrap().cell;
    let a = cell.length_a.clone();
    let b = cell.length_b.clone();
    a.set_value(3.0).unwrap();
    a.set_free(true);
    b.set_value(0.0).unwrap();
    b.set_free(true);

    project.set_aliases([("a", &a), ("b", &b)]);
    project.add_constraint("b", "a * 2").unwrap();
    assert_eq!(project.constraints().state(), ConstraintState::ConstraintsRegistered);

    let report = project.apply_constraints().unwrap();
    assert!(report.is_clean());
    assert_eq!(report.applied, vec!["b"]);
    assert_eq!(b.value(), 6.0);
    assert!(b.constrained());

    let free = project.free_parameters();
    assert_eq!(free.len(), 1);
    assert!(free[0].ptr_eq(&a));
    assert!(free.iter().all(|p| !(p.free() && p.constrained())));
}

#[test]
fn test_apply_is_idempotent() {
    let mut project = project();
    let sites = &project.sample_models.get("lbco").unwrap().atom_sites;
    let la = sites.get("La").unwrap().occupancy.clone();
    let ba = sites.get("Ba").unwrap().occupancy.clone();
    la.set_value(0.3).unwrap();

    project.set_aliases([("occ_La", &la), ("occ_Ba", &ba)]);
    project.add_constraint("occ_Ba", "1 - occ_La").unwrap();

    project.apply_constraints().unwrap();
    let first = ba.value();
    project.apply_constraints().unwrap();
    assert_eq!(ba.value(), first);
    assert!((first - 0.7).abs() < 1e-12);
    assert_eq!(project.constraints().state(), ConstraintState::Applied);
}

#[test]
fn test_failure_does_not_stop_the_batch() {
    let mut project = project();
    let cell = &project.sample_models.get("lbco").unwrap().cell;
    let a = cell.length_a.clone();
    let b = cell.length_b.clone();
    let c = cell.length_c.clone();

    project.set_aliases([("a", &a), ("b", &b), ("c", &c)]);
    project.add_constraint("b", "missing + 1").unwrap();
    project.add_constraint("c", "a ^ 2 / (1 + 1)").unwrap();

    let report = project.apply_constraints().unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.applied, vec!["c"]);
    assert_eq!(c.value(), 50.0);
    assert!(!b.constrained());
}

#[test]
fn test_duplicate_dependent_keeps_first() {
    let mut project = project();
    let cell = &project.sample_models.get("lbco").unwrap().cell;
    let a = cell.length_a.clone();
    let b = cell.length_b.clone();

    project.set_aliases([("a", &a), ("b", &b)]);
    project.add_constraint("b", "a").unwrap();
    let err = project.add_constraint("b", "a * 3").unwrap_err();
    assert!(matches!(
        err,
        Error::Constraint(ConstraintError::DuplicateDependent { .. })
    ));

    project.apply_constraints().unwrap();
    assert_eq!(b.value(), a.value());

    project.constraints_mut().replace_constraint("b", "a * 3");
    project.apply_constraints().unwrap();
    assert_eq!(b.value(), a.value() * 3.0);
}

#[test]
fn test_removing_constraint_releases_dependent() {
    let mut project = project();
    let cell = &project.sample_models.get("lbco").unwrap().cell;
    let a = cell.length_a.clone();
    let b = cell.length_b.clone();
    b.set_free(true);

    project.set_aliases([("a", &a), ("b", &b)]);
    project.add_constraint("b", "a + 1").unwrap();
    project.apply_constraints().unwrap();
    assert!(project.free_parameters().is_empty());

    project.remove_constraint(0).unwrap();
    assert!(!b.constrained());
    assert_eq!(project.free_parameters().len(), 1);
    assert!(project.remove_constraint(0).is_err());
}

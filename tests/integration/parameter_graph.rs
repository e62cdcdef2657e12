//! Tests for the parameter graph: identities, collections, free-parameter
//! views and the UID registry.

use diffrefine::datablocks::Datablock;
use diffrefine::diagnostics::{with_reaction, Reaction};
use diffrefine::model::{AtomSite, SampleModel};
use diffrefine::parameters::{Attribute, Identity};
use diffrefine::registry::{RegistryError, UidRegistry};
use diffrefine::Project;

fn lbco() -> SampleModel {
    let mut model = SampleModel::new("lbco").unwrap();
    model
        .atom_sites
        .add(AtomSite::new("La", "La").unwrap().with_occupancy(0.5).unwrap());
    model
        .atom_sites
        .add(AtomSite::new("Ba", "Ba").unwrap().with_occupancy(0.5).unwrap());
    model
}

#[test]
fn test_only_freed_occupancy_is_collected() {
    let model = lbco();
    let la = model.atom_sites.get("La").unwrap();
    la.occupancy.set_free(true);

    let free = model.free_parameters();
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].uid(), "lbco.atom_site.La.occupancy");
    assert!(free[0].ptr_eq(&la.occupancy));

    let mut registry = UidRegistry::new();
    registry.sync(&model.attributes()).unwrap();
    let resolved = registry.get(&free[0].uid()).unwrap();
    assert!(resolved.ptr_eq(&la.occupancy));
    assert_eq!(resolved.value(), 0.5);
}

#[test]
fn test_identity_two_cycle_terminates() {
    let a = Identity::category("a");
    let b = Identity::new();
    a.set_parent(&b);
    b.set_parent(&a);

    assert_eq!(b.category_code().as_deref(), Some("a"));
    assert_eq!(a.datablock_entry(), None);
    assert_eq!(b.unique_name("x"), "a.x");
}

#[test]
fn test_registry_rename_round_trip() {
    let model = lbco();
    let mut registry = UidRegistry::new();
    registry.sync(&model.attributes()).unwrap();

    let old = model.cell.length_a.uid();
    registry.rename(&old, "renamed.length_a").unwrap();

    let found = registry.get("renamed.length_a").unwrap();
    assert!(found.ptr_eq(&model.cell.length_a));
    assert!(matches!(registry.get(&old), Err(RegistryError::UnknownUid { .. })));
}

#[test]
fn test_descriptor_cannot_be_registered() {
    let model = lbco();
    let label = model.atom_sites.get("La").unwrap().label.clone();
    let mut registry = UidRegistry::new();
    let result = registry.register(&Attribute::from(label));
    assert!(matches!(result, Err(RegistryError::NotAParameter { .. })));
}

#[test]
fn test_same_name_replaces_item() {
    let mut model = lbco();
    let replaced = model
        .atom_sites
        .add(AtomSite::new("La", "La").unwrap().with_occupancy(0.9).unwrap());

    assert!(replaced.is_some());
    assert_eq!(model.atom_sites.len(), 2);
    assert_eq!(model.atom_sites.get("La").unwrap().occupancy.value(), 0.9);

    model.atom_sites.remove("Ba").unwrap();
    assert_eq!(model.atom_sites.names(), vec!["La"]);
}

#[test]
fn test_relabelled_site_is_found_by_new_name() {
    let mut project = Project::new();
    project.add_sample_model(lbco()).unwrap();

    let site = project.sample_models.get("lbco").unwrap().atom_sites.get("Ba").unwrap();
    site.label.set_value("Sr").unwrap();
    project.sync_registry().unwrap();

    let models = &project.sample_models;
    let sr = models.get("lbco").unwrap().atom_sites.get("Sr").unwrap();
    assert_eq!(sr.b_iso.uid(), "lbco.atom_site.Sr.b_iso");
    assert!(models.get("lbco").unwrap().atom_sites.get("Ba").is_none());
    assert!(project.registry().contains("lbco.atom_site.Sr.b_iso"));
}

#[test]
fn test_log_reaction_keeps_valid_value() {
    let model = lbco();
    let occupancy = model.atom_sites.get("La").unwrap().occupancy.clone();

    with_reaction(Reaction::Raise, || {
        assert!(occupancy.set_value(1.5).is_err());
    });
    with_reaction(Reaction::Log, || {
        assert!(occupancy.set_value(1.5).is_ok());
    });
    assert_eq!(occupancy.value(), 0.5);
}

#[test]
fn test_every_attribute_has_a_cif_name() {
    let model = lbco();
    for attribute in model.attributes() {
        assert!(
            !attribute.cif_names().is_empty(),
            "{} has no CIF name",
            attribute.uid()
        );
    }
}

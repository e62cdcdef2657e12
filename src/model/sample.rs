//! Sample model datablock: unit cell and atom sites

use crate::categories::{entry_key, CategoryCollection, CategoryCore, CategoryItem};
use crate::collection::Keyed;
use crate::datablocks::{collect_attributes, Datablock, DatablockCollection};
use crate::model::{text_descriptor, ModelError, ParamSpec};
use crate::parameters::{Attribute, Bounds, DescriptorRef, Identity, ParameterRef};
use std::rc::Rc;

/// Unit cell lengths and angles
#[derive(Debug)]
pub struct Cell {
    core: CategoryCore,
    pub length_a: ParameterRef,
    pub length_b: ParameterRef,
    pub length_c: ParameterRef,
    pub angle_alpha: ParameterRef,
    pub angle_beta: ParameterRef,
    pub angle_gamma: ParameterRef,
}

impl Cell {
    pub fn new() -> Result<Self, ModelError> {
        let mut core = CategoryCore::new("cell");
        let mut length = |name: &str, cif: &str| {
            ParamSpec::new(name, cif, 10.0)
                .units("Å")
                .bounds(Bounds::min_only(0.0))
                .attach(&mut core)
        };
        let length_a = length("length_a", "_cell.length_a")?;
        let length_b = length("length_b", "_cell.length_b")?;
        let length_c = length("length_c", "_cell.length_c")?;

        let angles = Bounds::new(0.0, 180.0)?;
        let mut angle = |name: &str, cif: &str| {
            ParamSpec::new(name, cif, 90.0)
                .units("deg")
                .bounds(angles)
                .attach(&mut core)
        };
        let angle_alpha = angle("angle_alpha", "_cell.angle_alpha")?;
        let angle_beta = angle("angle_beta", "_cell.angle_beta")?;
        let angle_gamma = angle("angle_gamma", "_cell.angle_gamma")?;

        Ok(Self {
            core,
            length_a,
            length_b,
            length_c,
            angle_alpha,
            angle_beta,
            angle_gamma,
        })
    }
}

impl CategoryItem for Cell {
    fn core(&self) -> &CategoryCore {
        &self.core
    }
}

/// One atom in the asymmetric unit, named after its label
#[derive(Debug)]
pub struct AtomSite {
    core: CategoryCore,
    pub label: DescriptorRef,
    pub type_symbol: DescriptorRef,
    pub fract_x: ParameterRef,
    pub fract_y: ParameterRef,
    pub fract_z: ParameterRef,
    pub wyckoff_letter: DescriptorRef,
    pub occupancy: ParameterRef,
    pub b_iso: ParameterRef,
    pub adp_type: DescriptorRef,
}

impl AtomSite {
    pub fn new(label: &str, type_symbol: &str) -> Result<Self, ModelError> {
        let mut core = CategoryCore::new("atom_site");
        let label = text_descriptor(&mut core, "label", "_atom_site.label", label, None, true)?;
        let type_symbol = text_descriptor(
            &mut core,
            "type_symbol",
            "_atom_site.type_symbol",
            type_symbol,
            None,
            true,
        )?;
        let fract_x = ParamSpec::new("fract_x", "_atom_site.fract_x", 0.0).attach(&mut core)?;
        let fract_y = ParamSpec::new("fract_y", "_atom_site.fract_y", 0.0).attach(&mut core)?;
        let fract_z = ParamSpec::new("fract_z", "_atom_site.fract_z", 0.0).attach(&mut core)?;
        let wyckoff_letter = text_descriptor(
            &mut core,
            "wyckoff_letter",
            "_atom_site.Wyckoff_symbol",
            "a",
            None,
            true,
        )?;
        let occupancy = ParamSpec::new("occupancy", "_atom_site.occupancy", 1.0)
            .bounds(Bounds::new(0.0, 1.0)?)
            .attach(&mut core)?;
        let b_iso = ParamSpec::new("b_iso", "_atom_site.B_iso_or_equiv", 0.0)
            .units("Ų")
            .description("Isotropic atomic displacement")
            .bounds(Bounds::min_only(0.0))
            .attach(&mut core)?;
        let adp_type = text_descriptor(
            &mut core,
            "adp_type",
            "_atom_site.adp_type",
            "Biso",
            Some(["Biso", "Uiso"].as_slice()),
            true,
        )?;
        core.name_after(&label);

        Ok(Self {
            core,
            label,
            type_symbol,
            fract_x,
            fract_y,
            fract_z,
            wyckoff_letter,
            occupancy,
            b_iso,
            adp_type,
        })
    }

    pub fn with_position(self, x: f64, y: f64, z: f64) -> Result<Self, ModelError> {
        self.fract_x.set_value(x)?;
        self.fract_y.set_value(y)?;
        self.fract_z.set_value(z)?;
        Ok(self)
    }

    pub fn with_occupancy(self, occupancy: f64) -> Result<Self, ModelError> {
        self.occupancy.set_value(occupancy)?;
        Ok(self)
    }

    pub fn with_b_iso(self, b_iso: f64) -> Result<Self, ModelError> {
        self.b_iso.set_value(b_iso)?;
        Ok(self)
    }
}

impl CategoryItem for AtomSite {
    fn core(&self) -> &CategoryCore {
        &self.core
    }
}

impl Keyed for AtomSite {
    fn key(&self) -> String {
        entry_key(self)
    }
}

/// A crystal structure: one datablock per phase
#[derive(Debug)]
pub struct SampleModel {
    name: String,
    identity: Rc<Identity>,
    pub cell: Cell,
    pub atom_sites: CategoryCollection<AtomSite>,
}

impl SampleModel {
    pub fn new(name: &str) -> Result<Self, ModelError> {
        let identity = Identity::datablock(name);
        let cell = Cell::new()?;
        cell.identity().set_parent(&identity);
        let atom_sites = CategoryCollection::new("atom_site");
        atom_sites.identity().set_parent(&identity);

        Ok(Self {
            name: name.to_string(),
            identity,
            cell,
            atom_sites,
        })
    }

    /// Rename the datablock; every child uid follows
    ///
    /// A registry synced before the rename still holds the old uids and must
    /// be re-synced or renamed entry by entry.
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.identity.set_datablock_entry(name);
    }
}

impl Keyed for SampleModel {
    fn key(&self) -> String {
        self.name.clone()
    }
}

impl Datablock for SampleModel {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn identity(&self) -> &Rc<Identity> {
        &self.identity
    }

    fn attributes(&self) -> Vec<Attribute> {
        let mut attributes = collect_attributes([&self.cell as &dyn CategoryItem]);
        attributes.extend(self.atom_sites.attributes());
        attributes
    }
}

pub type SampleModels = DatablockCollection<SampleModel>;

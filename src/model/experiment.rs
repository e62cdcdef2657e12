//! Experiment datablock
//!
//! An experiment bundles its fixed type, the instrument and peak parameter
//! sets selected from that type, the phases it sees, excluded x-ranges and the
//! measured data itself.

use crate::categories::{entry_key, CategoryCollection, CategoryCore, CategoryItem};
use crate::collection::{CollectionError, Keyed};
use crate::datablocks::{collect_attributes, Datablock, DatablockCollection};
use crate::model::{
    text_descriptor, Background, BackgroundType, Datastore, ExperimentType, Instrument, ModelError,
    ParamSpec, Peak, PeakProfileType,
};
use crate::parameters::{
    Attribute, AttributeMeta, Bounds, Descriptor, DescriptorRef, Identity, ParameterRef,
};
use ndarray::Array1;
use std::cell::{Ref, RefCell};
use std::rc::Rc;

/// Sample model contributing to an experiment, with its scale factor
#[derive(Debug)]
pub struct LinkedPhase {
    core: CategoryCore,
    pub id: DescriptorRef,
    pub scale: ParameterRef,
}

impl LinkedPhase {
    pub fn new(id: &str, scale: f64) -> Result<Self, ModelError> {
        let mut core = CategoryCore::new("linked_phases");
        let id = text_descriptor(&mut core, "id", "_pd_phase_block.id", id, None, true)?;
        let scale = ParamSpec::new("scale", "_pd_phase_block.scale", scale)
            .bounds(Bounds::min_only(0.0))
            .attach(&mut core)?;
        core.name_after(&id);
        Ok(Self { core, id, scale })
    }
}

impl CategoryItem for LinkedPhase {
    fn core(&self) -> &CategoryCore {
        &self.core
    }
}

impl Keyed for LinkedPhase {
    fn key(&self) -> String {
        entry_key(self)
    }
}

/// Closed x-range left out of refinement
#[derive(Debug)]
pub struct ExcludedRegion {
    core: CategoryCore,
    pub start: DescriptorRef,
    pub end: DescriptorRef,
}

impl ExcludedRegion {
    pub fn new(start: f64, end: f64) -> Result<Self, ModelError> {
        if start.is_nan() || end.is_nan() || start > end {
            return Err(ModelError::InvertedRegion { start, end });
        }
        let mut core = CategoryCore::new("excluded_regions");
        let start = core.attach_descriptor(Descriptor::new(
            AttributeMeta::new("start", &["_excluded_region.start"])?,
            start,
        ));
        let end = core.attach_descriptor(Descriptor::new(
            AttributeMeta::new("end", &["_excluded_region.end"])?,
            end,
        ));
        core.name_after(&start);
        Ok(Self { core, start, end })
    }

    /// Current `(start, end)`, if both are numbers
    pub fn range(&self) -> Option<(f64, f64)> {
        Some((self.start.number()?, self.end.number()?))
    }
}

impl CategoryItem for ExcludedRegion {
    fn core(&self) -> &CategoryCore {
        &self.core
    }
}

impl Keyed for ExcludedRegion {
    fn key(&self) -> String {
        entry_key(self)
    }
}

/// Excluded regions that keep the experiment's datastore mask current
#[derive(Debug)]
pub struct ExcludedRegions {
    items: CategoryCollection<ExcludedRegion>,
    datastore: Rc<RefCell<Datastore>>,
}

impl ExcludedRegions {
    fn new(datastore: Rc<RefCell<Datastore>>) -> Self {
        Self {
            items: CategoryCollection::new("excluded_regions"),
            datastore,
        }
    }

    /// Add a region and recompute the mask
    pub fn add(&mut self, region: ExcludedRegion) -> Option<ExcludedRegion> {
        let replaced = self.items.add(region);
        self.refresh();
        replaced
    }

    pub fn remove(&mut self, name: &str) -> Result<ExcludedRegion, CollectionError> {
        let region = self.items.remove(name)?;
        self.refresh();
        Ok(region)
    }

    /// Recompute the mask from the current region values
    ///
    /// Needed after editing `start` or `end` of a region already added.
    pub fn refresh(&self) {
        let ranges: Vec<(f64, f64)> = self.items.iter().filter_map(ExcludedRegion::range).collect();
        self.datastore.borrow_mut().apply_exclusions(&ranges);
    }

    pub fn get(&self, name: &str) -> Option<&ExcludedRegion> {
        self.items.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.items.names()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExcludedRegion> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn identity(&self) -> &Rc<Identity> {
        self.items.identity()
    }

    pub fn attributes(&self) -> Vec<Attribute> {
        self.items.attributes()
    }
}

/// One measured dataset and everything needed to model it
#[derive(Debug)]
pub struct Experiment {
    name: String,
    identity: Rc<Identity>,
    pub expt_type: ExperimentType,
    pub instrument: Instrument,
    pub peak: Peak,
    pub linked_phases: CategoryCollection<LinkedPhase>,
    pub excluded_regions: ExcludedRegions,
    pub background: Background,
    datastore: Rc<RefCell<Datastore>>,
}

impl Experiment {
    /// Create an experiment with default instrument and peak parameters for
    /// its type
    pub fn new(name: &str, expt_type: ExperimentType) -> Result<Self, ModelError> {
        let identity = Identity::datablock(name);
        let instrument = Instrument::for_beam_mode(expt_type.beam_mode())?;
        let peak = Peak::create(expt_type.scattering_type(), expt_type.beam_mode(), None)?;
        let linked_phases = CategoryCollection::new("linked_phases");
        let datastore = Rc::new(RefCell::new(Datastore::new()));
        let excluded_regions = ExcludedRegions::new(Rc::clone(&datastore));
        let background = Background::create(BackgroundType::LineSegment);

        for child in [
            expt_type.identity(),
            instrument.identity(),
            peak.identity(),
            linked_phases.identity(),
            excluded_regions.identity(),
            background.identity(),
        ] {
            child.set_parent(&identity);
        }

        Ok(Self {
            name: name.to_string(),
            identity,
            expt_type,
            instrument,
            peak,
            linked_phases,
            excluded_regions,
            background,
            datastore,
        })
    }

    /// Replace the background with an empty one of another type
    ///
    /// As with a peak profile swap, the registry must be re-synced.
    pub fn set_background_type(&mut self, background_type: BackgroundType) {
        let background = Background::create(background_type);
        background.identity().set_parent(&self.identity);
        self.background = background;
        tracing::info!(experiment = %self.name, background = %background_type, "Background type changed");
    }

    /// Background intensity at the included x-positions
    pub fn background_pattern(&self) -> Array1<f64> {
        self.background.calculate(self.datastore.borrow().x())
    }

    /// Swap the peak parameter set for another profile
    ///
    /// The old peak parameters are dropped; a registry synced before the swap
    /// must be re-synced.
    pub fn set_peak_profile_type(&mut self, profile: PeakProfileType) -> Result<(), ModelError> {
        let peak = Peak::create(
            self.expt_type.scattering_type(),
            self.expt_type.beam_mode(),
            Some(profile),
        )?;
        peak.identity().set_parent(&self.identity);
        self.peak = peak;
        tracing::info!(experiment = %self.name, profile = %profile, "Peak profile changed");
        Ok(())
    }

    /// Load measured data and re-apply the excluded regions
    pub fn load_measured_data(
        &mut self,
        x: Array1<f64>,
        meas: Array1<f64>,
        meas_su: Option<Array1<f64>>,
    ) -> Result<(), ModelError> {
        self.datastore.borrow_mut().load(x, meas, meas_su)?;
        self.excluded_regions.refresh();
        Ok(())
    }

    pub fn datastore(&self) -> Ref<'_, Datastore> {
        self.datastore.borrow()
    }

    /// Store a calculated pattern aligned with the included points
    pub fn set_calculated(&self, calc: Array1<f64>) -> Result<(), ModelError> {
        self.datastore.borrow_mut().set_calc(calc)
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.identity.set_datablock_entry(name);
    }
}

impl Keyed for Experiment {
    fn key(&self) -> String {
        self.name.clone()
    }
}

impl Datablock for Experiment {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn identity(&self) -> &Rc<Identity> {
        &self.identity
    }

    fn attributes(&self) -> Vec<Attribute> {
        let mut attributes = collect_attributes([
            &self.expt_type as &dyn CategoryItem,
            &self.instrument,
            &self.peak,
        ]);
        attributes.extend(self.linked_phases.attributes());
        attributes.extend(self.excluded_regions.attributes());
        attributes.extend(self.background.attributes());
        attributes
    }
}

pub type Experiments = DatablockCollection<Experiment>;

//! Top-level named aggregates of categories
//!
//! A datablock (one sample model, one experiment) owns category items and
//! collections and exposes their parameters as flat lists.

use crate::categories::CategoryItem;
use crate::collection::{Collection, CollectionError, Keyed};
use crate::parameters::{Attribute, Identity, ParameterRef};
use std::rc::Rc;

pub trait Datablock {
    fn name(&self) -> String;

    fn identity(&self) -> &Rc<Identity>;

    /// All descriptors and parameters, in category order
    fn attributes(&self) -> Vec<Attribute>;

    fn parameters(&self) -> Vec<ParameterRef> {
        self.attributes()
            .iter()
            .filter_map(|a| a.as_parameter().cloned())
            .collect()
    }

    /// Parameters whose value is not computed by a constraint
    fn fittable_parameters(&self) -> Vec<ParameterRef> {
        self.parameters()
            .into_iter()
            .filter(|p| !p.constrained())
            .collect()
    }

    /// Parameters the optimizer may vary: free and not constrained
    fn free_parameters(&self) -> Vec<ParameterRef> {
        self.parameters()
            .into_iter()
            .filter(ParameterRef::is_free)
            .collect()
    }
}

/// Attributes of several categories, flattened
pub(crate) fn collect_attributes<'a>(
    items: impl IntoIterator<Item = &'a dyn CategoryItem>,
) -> Vec<Attribute> {
    items
        .into_iter()
        .flat_map(|item| item.attributes().iter().cloned())
        .collect()
}

/// Name-unique collection of datablocks
#[derive(Debug)]
pub struct DatablockCollection<D> {
    items: Collection<D>,
}

impl<D> Default for DatablockCollection<D> {
    fn default() -> Self {
        Self {
            items: Collection::default(),
        }
    }
}

impl<D: Datablock + Keyed> DatablockCollection<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a datablock, replacing one with the same name
    pub fn add(&mut self, block: D) -> Option<D> {
        self.items.add(block)
    }

    pub fn get(&self, name: &str) -> Option<&D> {
        self.items.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut D> {
        self.items.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains(name)
    }

    pub fn remove(&mut self, name: &str) -> Result<D, CollectionError> {
        self.items.remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.items.names()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, D> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn attributes(&self) -> Vec<Attribute> {
        self.items.iter().flat_map(Datablock::attributes).collect()
    }

    pub fn parameters(&self) -> Vec<ParameterRef> {
        self.items.iter().flat_map(Datablock::parameters).collect()
    }

    pub fn fittable_parameters(&self) -> Vec<ParameterRef> {
        self.items
            .iter()
            .flat_map(Datablock::fittable_parameters)
            .collect()
    }

    pub fn free_parameters(&self) -> Vec<ParameterRef> {
        self.items.iter().flat_map(Datablock::free_parameters).collect()
    }
}

impl<'a, D: Datablock + Keyed> IntoIterator for &'a DatablockCollection<D> {
    type Item = &'a D;
    type IntoIter = std::slice::Iter<'a, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

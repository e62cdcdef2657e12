//! Category items and category collections
//!
//! A category item bundles the descriptors and parameters of one physical
//! component. Every item owns a [`CategoryCore`]: its identity node and the
//! explicit list of attributes built when the item is constructed.

use crate::collection::{Collection, CollectionError, Keyed};
use crate::parameters::{Attribute, Descriptor, DescriptorRef, Identity, Parameter, ParameterRef};
use std::rc::Rc;

/// Identity plus the attributes of one category item
#[derive(Debug)]
pub struct CategoryCore {
    identity: Rc<Identity>,
    attributes: Vec<Attribute>,
}

impl CategoryCore {
    pub fn new(category_code: &str) -> Self {
        Self {
            identity: Identity::category(category_code),
            attributes: Vec::new(),
        }
    }

    pub fn identity(&self) -> &Rc<Identity> {
        &self.identity
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Take ownership of a parameter and return the shared handle
    pub fn attach_parameter(&mut self, mut parameter: Parameter) -> ParameterRef {
        parameter.meta_mut().set_owner(&self.identity);
        let handle = ParameterRef::new(parameter);
        self.attributes.push(Attribute::Parameter(handle.clone()));
        handle
    }

    /// Take ownership of a descriptor and return the shared handle
    pub fn attach_descriptor(&mut self, mut descriptor: Descriptor) -> DescriptorRef {
        descriptor.meta_mut().set_owner(&self.identity);
        let handle = DescriptorRef::new(descriptor);
        self.attributes.push(Attribute::Descriptor(handle.clone()));
        handle
    }

    /// Name this entry after the current value of `descriptor`
    pub fn name_after(&self, descriptor: &DescriptorRef) {
        self.identity.set_category_entry(descriptor.name_source());
    }
}

/// One instance of a category
pub trait CategoryItem {
    fn core(&self) -> &CategoryCore;

    fn identity(&self) -> &Rc<Identity> {
        self.core().identity()
    }

    fn attributes(&self) -> &[Attribute] {
        self.core().attributes()
    }

    fn category_code(&self) -> Option<String> {
        self.identity().category_code()
    }

    /// Entry name within its collection, derived from a designated child
    fn entry_name(&self) -> Option<String> {
        self.identity().category_entry()
    }

    fn parameters(&self) -> Vec<ParameterRef> {
        self.attributes()
            .iter()
            .filter_map(|a| a.as_parameter().cloned())
            .collect()
    }

    /// Look up a child attribute by name
    fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes().iter().find(|a| a.name() == name)
    }

    fn parameter(&self, name: &str) -> Option<ParameterRef> {
        self.attribute(name).and_then(|a| a.as_parameter().cloned())
    }
}

/// Name-indexed collection of category items sharing one category code
///
/// Items added here are re-parented onto the collection's identity node, so
/// their unique ids pick up the owning datablock's name.
#[derive(Debug)]
pub struct CategoryCollection<T> {
    identity: Rc<Identity>,
    items: Collection<T>,
}

impl<T: CategoryItem + Keyed> CategoryCollection<T> {
    pub fn new(category_code: &str) -> Self {
        Self {
            identity: Identity::category(category_code),
            items: Collection::new(),
        }
    }

    pub fn identity(&self) -> &Rc<Identity> {
        &self.identity
    }

    /// Add an item, replacing one with the same current name
    pub fn add(&mut self, item: T) -> Option<T> {
        item.identity().set_parent(&self.identity);
        let replaced = self.items.add(item);
        if let Some(old) = &replaced {
            old.identity().clear_parent();
        }
        replaced
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.items.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.items.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Result<T, CollectionError> {
        let item = self.items.remove(name)?;
        item.identity().clear_parent();
        Ok(item)
    }

    pub fn names(&self) -> Vec<String> {
        self.items.names()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn attributes(&self) -> Vec<Attribute> {
        self.items
            .iter()
            .flat_map(|item| item.attributes().iter().cloned())
            .collect()
    }

    pub fn parameters(&self) -> Vec<ParameterRef> {
        self.items.iter().flat_map(CategoryItem::parameters).collect()
    }
}

/// Keyed implementation shared by items named after a descriptor
pub(crate) fn entry_key<T: CategoryItem>(item: &T) -> String {
    item.entry_name().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::AttributeMeta;

    struct Site {
        core: CategoryCore,
        label: DescriptorRef,
        occupancy: ParameterRef,
    }

    impl Site {
        fn new(label: &str) -> Self {
            let mut core = CategoryCore::new("atom_site");
            let label = core.attach_descriptor(Descriptor::new(
                AttributeMeta::new("label", &["_atom_site.label"]).unwrap(),
                label,
            ));
            let occupancy = core.attach_parameter(
                Parameter::new(
                    AttributeMeta::new("occupancy", &["_atom_site.occupancy"]).unwrap(),
                    1.0,
                )
                .unwrap(),
            );
            core.name_after(&label);
            Self {
                core,
                label,
                occupancy,
            }
        }
    }

    impl CategoryItem for Site {
        fn core(&self) -> &CategoryCore {
            &self.core
        }
    }

    impl Keyed for Site {
        fn key(&self) -> String {
            entry_key(self)
        }
    }

    #[test]
    fn test_attributes_are_listed_in_order() {
        let site = Site::new("La");
        let names: Vec<String> = site.attributes().iter().map(Attribute::name).collect();
        assert_eq!(names, vec!["label", "occupancy"]);
        assert_eq!(site.parameters().len(), 1);
        assert!(site.parameter("occupancy").unwrap().ptr_eq(&site.occupancy));
        assert!(site.parameter("label").is_none());
    }

    #[test]
    fn test_collection_parents_items() {
        let block = Identity::datablock("lbco");
        let mut sites = CategoryCollection::new("atom_site");
        sites.identity().set_parent(&block);
        sites.add(Site::new("La"));

        let la = sites.get("La").unwrap();
        assert_eq!(la.occupancy.uid(), "lbco.atom_site.La.occupancy");
        assert_eq!(la.label.uid(), "lbco.atom_site.La.label");
    }

    #[test]
    fn test_uid_follows_label_change() {
        let mut sites = CategoryCollection::new("atom_site");
        sites.add(Site::new("La"));

        let occupancy = sites.get("La").unwrap().occupancy.clone();
        sites.get("La").unwrap().label.set_value("Sr").unwrap();

        assert!(sites.get("La").is_none());
        assert!(sites.get("Sr").is_some());
        assert_eq!(occupancy.uid(), "atom_site.Sr.occupancy");
    }

    #[test]
    fn test_removed_item_is_detached() {
        let block = Identity::datablock("lbco");
        let mut sites = CategoryCollection::new("atom_site");
        sites.identity().set_parent(&block);
        sites.add(Site::new("La"));

        let removed = sites.remove("La").unwrap();
        assert!(sites.is_empty());
        assert_eq!(removed.occupancy.uid(), "atom_site.La.occupancy");
        assert!(sites.remove("La").is_err());
    }
}

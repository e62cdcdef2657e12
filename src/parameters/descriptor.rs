//! Non-refinable value cells
//!
//! A [`Descriptor`] is a named, typed value with units, an editable flag and
//! the external (CIF) tags it is written under. Its unique id is derived from
//! the [`Identity`] of the category that owns it.

use crate::diagnostics;
use crate::parameters::identity::Identity;
use crate::parameters::parameter::ParameterError;
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Typed content of a descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Metadata shared by descriptors and parameters
#[derive(Debug, Clone)]
pub struct AttributeMeta {
    name: String,
    description: String,
    units: String,
    editable: bool,
    cif_names: Vec<String>,
    owner: Weak<Identity>,
}

impl AttributeMeta {
    /// Create metadata for an attribute
    ///
    /// # Arguments
    ///
    /// * `name` - Attribute name, the last component of its unique id
    /// * `cif_names` - External tags, the first being the preferred one
    ///
    /// # Returns
    ///
    /// The metadata, or [`ParameterError::MissingCifName`] if no tag is given
    pub fn new(name: &str, cif_names: &[&str]) -> Result<Self, ParameterError> {
        if name.is_empty() {
            return Err(ParameterError::EmptyName);
        }
        if cif_names.is_empty() {
            return Err(ParameterError::MissingCifName {
                name: name.to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            description: String::new(),
            units: String::new(),
            editable: true,
            cif_names: cif_names.iter().map(|s| s.to_string()).collect(),
            owner: Weak::new(),
        })
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.units = units.to_string();
        self
    }

    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn editable(&self) -> bool {
        self.editable
    }

    pub fn cif_names(&self) -> &[String] {
        &self.cif_names
    }

    /// Identity node of the owning category, if still alive
    pub fn owner(&self) -> Option<Rc<Identity>> {
        self.owner.upgrade()
    }

    pub(crate) fn set_owner(&mut self, owner: &Rc<Identity>) {
        self.owner = Rc::downgrade(owner);
    }

    /// Unique id derived from the owner chain
    ///
    /// Unattached attributes resolve to their bare name.
    pub fn uid(&self) -> String {
        match self.owner() {
            Some(owner) => owner.unique_name(&self.name),
            None => self.name.clone(),
        }
    }
}

/// Named, typed, non-refinable value
#[derive(Debug, Clone)]
pub struct Descriptor {
    meta: AttributeMeta,
    value: Value,
    allowed: Option<Vec<String>>,
}

impl Descriptor {
    pub fn new(meta: AttributeMeta, value: impl Into<Value>) -> Self {
        Self {
            meta,
            value: value.into(),
            allowed: None,
        }
    }

    /// Restrict a text descriptor to a fixed set of values
    ///
    /// # Returns
    ///
    /// The descriptor, or [`ParameterError::NotAllowed`] if the current value
    /// is not in the set
    pub fn with_allowed_values(mut self, allowed: &[&str]) -> Result<Self, ParameterError> {
        let allowed: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
        self.check_allowed(&self.value, &allowed)?;
        self.allowed = Some(allowed);
        Ok(self)
    }

    pub fn meta(&self) -> &AttributeMeta {
        &self.meta
    }

    pub(crate) fn meta_mut(&mut self) -> &mut AttributeMeta {
        &mut self.meta
    }

    pub fn name(&self) -> &str {
        self.meta.name()
    }

    pub fn uid(&self) -> String {
        self.meta.uid()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn allowed_values(&self) -> Option<&[String]> {
        self.allowed.as_deref()
    }

    /// Assign a new value
    ///
    /// Non-editable descriptors ignore the write. Type and membership
    /// violations go through the active [`diagnostics::Reaction`].
    pub fn set_value(&mut self, value: impl Into<Value>) -> Result<(), ParameterError> {
        let value = value.into();
        if !self.meta.editable() {
            tracing::debug!(name = %self.meta.name(), "ignoring write to non-editable descriptor");
            return Ok(());
        }

        if value.kind() != self.value.kind() {
            return diagnostics::report(ParameterError::TypeMismatch {
                name: self.meta.name().to_string(),
                expected: self.value.kind(),
            });
        }
        if let Some(allowed) = &self.allowed {
            if let Err(err) = self.check_allowed(&value, allowed) {
                return diagnostics::report(err);
            }
        }

        self.value = value;
        Ok(())
    }

    fn check_allowed(&self, value: &Value, allowed: &[String]) -> Result<(), ParameterError> {
        let text = value.to_string();
        if allowed.iter().any(|a| *a == text) {
            Ok(())
        } else {
            Err(ParameterError::NotAllowed {
                name: self.meta.name().to_string(),
                value: text,
                allowed: allowed.join(", "),
            })
        }
    }
}

/// Shared handle to a [`Descriptor`] owned by a category item
#[derive(Debug, Clone)]
pub struct DescriptorRef(Rc<RefCell<Descriptor>>);

impl DescriptorRef {
    pub(crate) fn new(descriptor: Descriptor) -> Self {
        Self(Rc::new(RefCell::new(descriptor)))
    }

    pub fn borrow(&self) -> Ref<'_, Descriptor> {
        self.0.borrow()
    }

    pub fn name(&self) -> String {
        self.0.borrow().name().to_string()
    }

    pub fn uid(&self) -> String {
        self.0.borrow().uid()
    }

    pub fn value(&self) -> Value {
        self.0.borrow().value().clone()
    }

    pub fn text(&self) -> Option<String> {
        self.0.borrow().value().as_text().map(str::to_string)
    }

    pub fn number(&self) -> Option<f64> {
        self.0.borrow().value().as_number()
    }

    pub fn set_value(&self, value: impl Into<Value>) -> Result<(), ParameterError> {
        self.0.borrow_mut().set_value(value)
    }

    pub fn cif_names(&self) -> Vec<String> {
        self.0.borrow().meta().cif_names().to_vec()
    }

    pub fn ptr_eq(&self, other: &DescriptorRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Name source reading this descriptor's current text
    ///
    /// Returns `None` once the descriptor is dropped or while it is being
    /// written.
    pub fn name_source(&self) -> crate::parameters::NameSource {
        let weak = Rc::downgrade(&self.0);
        crate::parameters::NameSource::derived(move || {
            let cell = weak.upgrade()?;
            let descriptor = cell.try_borrow().ok()?;
            Some(descriptor.value().to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{with_reaction, Reaction};

    fn label(value: &str) -> Descriptor {
        Descriptor::new(
            AttributeMeta::new("label", &["_atom_site.label"]).unwrap(),
            value,
        )
    }

    #[test]
    fn test_meta_requires_cif_name() {
        assert!(matches!(
            AttributeMeta::new("label", &[]),
            Err(ParameterError::MissingCifName { .. })
        ));
        assert!(AttributeMeta::new("", &["_x"]).is_err());
    }

    #[test]
    fn test_non_editable_write_is_ignored() {
        let meta = AttributeMeta::new("beam_mode", &["_expt_type.beam_mode"])
            .unwrap()
            .with_editable(false);
        let mut d = Descriptor::new(meta, "time-of-flight");

        assert!(d.set_value("constant wavelength").is_ok());
        assert_eq!(d.value(), &Value::from("time-of-flight"));
    }

    #[test]
    fn test_type_mismatch_follows_reaction() {
        let mut d = label("La");

        with_reaction(Reaction::Raise, || {
            assert!(matches!(
                d.set_value(1.0),
                Err(ParameterError::TypeMismatch { .. })
            ));
        });
        with_reaction(Reaction::Log, || assert!(d.set_value(1.0).is_ok()));
        assert_eq!(d.value(), &Value::from("La"));
    }

    #[test]
    fn test_allowed_values() {
        let mut d = label("neutron").with_allowed_values(&["neutron", "xray"]).unwrap();

        assert!(d.set_value("xray").is_ok());
        with_reaction(Reaction::Raise, || assert!(d.set_value("muon").is_err()));
        assert_eq!(d.value().as_text(), Some("xray"));

        assert!(label("muon").with_allowed_values(&["neutron"]).is_err());
    }

    #[test]
    fn test_unattached_uid_is_name() {
        assert_eq!(label("La").uid(), "label");
    }

    #[test]
    fn test_name_source_follows_value() {
        let handle = DescriptorRef::new(label("La"));
        let source = handle.name_source();
        let identity = Identity::category("atom_site");
        identity.set_category_entry(source);

        assert_eq!(identity.category_entry().as_deref(), Some("La"));
        handle.set_value("Ba").unwrap();
        assert_eq!(identity.category_entry().as_deref(), Some("Ba"));
    }
}

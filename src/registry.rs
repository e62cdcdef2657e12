//! Session-wide map from unique id to live parameter
//!
//! The registry is the indirection layer used by the constraint engine and
//! the fit orchestrator: both address parameters by uid and resolve them here
//! to read or write the live object.

use crate::parameters::{Attribute, ParameterRef};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur when working with the UID registry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("No parameter registered under uid '{uid}'")]
    UnknownUid { uid: String },

    #[error("'{name}' is a descriptor; only parameters can be registered")]
    NotAParameter { name: String },

    #[error("uid '{uid}' is already held by a different parameter")]
    UidCollision { uid: String },
}

#[derive(Debug, Default)]
pub struct UidRegistry {
    entries: BTreeMap<String, ParameterRef>,
}

impl UidRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an attribute under its current uid
    ///
    /// Registering the same parameter twice is a no-op.
    ///
    /// # Returns
    ///
    /// The uid, [`RegistryError::NotAParameter`] for a descriptor, or
    /// [`RegistryError::UidCollision`] if another parameter holds the uid
    pub fn register(&mut self, attribute: &Attribute) -> Result<String, RegistryError> {
        match attribute {
            Attribute::Parameter(p) => self.register_parameter(p),
            Attribute::Descriptor(d) => Err(RegistryError::NotAParameter { name: d.uid() }),
        }
    }

    pub fn register_parameter(&mut self, parameter: &ParameterRef) -> Result<String, RegistryError> {
        let uid = parameter.uid();
        if let Some(existing) = self.entries.get(&uid) {
            if existing.ptr_eq(parameter) {
                return Ok(uid);
            }
            return Err(RegistryError::UidCollision { uid });
        }
        self.entries.insert(uid.clone(), parameter.clone());
        Ok(uid)
    }

    /// Move an entry to a new uid
    ///
    /// Either both maps update or neither does.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), RegistryError> {
        let parameter = self
            .entries
            .get(old)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownUid {
                uid: old.to_string(),
            })?;
        if let Some(existing) = self.entries.get(new) {
            if !existing.ptr_eq(&parameter) {
                return Err(RegistryError::UidCollision {
                    uid: new.to_string(),
                });
            }
        }
        self.entries.remove(old);
        self.entries.insert(new.to_string(), parameter);
        Ok(())
    }

    pub fn get(&self, uid: &str) -> Result<&ParameterRef, RegistryError> {
        self.entries.get(uid).ok_or_else(|| RegistryError::UnknownUid {
            uid: uid.to_string(),
        })
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.entries.contains_key(uid)
    }

    pub fn unregister(&mut self, uid: &str) -> Result<ParameterRef, RegistryError> {
        self.entries.remove(uid).ok_or_else(|| RegistryError::UnknownUid {
            uid: uid.to_string(),
        })
    }

    /// Rebuild the map from the current model tree
    ///
    /// Descriptors are skipped. Used after renames that changed many uids at
    /// once (a relabelled atom site, a renamed datablock).
    pub fn sync<'a>(
        &mut self,
        attributes: impl IntoIterator<Item = &'a Attribute>,
    ) -> Result<(), RegistryError> {
        let mut fresh = UidRegistry::new();
        for parameter in attributes.into_iter().filter_map(Attribute::as_parameter) {
            fresh.register_parameter(parameter)?;
        }
        *self = fresh;
        Ok(())
    }

    /// Current uid → parameter map
    pub fn snapshot(&self) -> BTreeMap<String, ParameterRef> {
        self.entries.clone()
    }

    pub fn uids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

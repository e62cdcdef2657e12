//! Refinable parameters
//!
//! A [`Parameter`] is a numeric descriptor with the extra state a refinement
//! needs: a free flag, a constrained flag owned by the constraint engine,
//! physical and fit bounds, an uncertainty and the value it had when the
//! last fit started.

use crate::diagnostics;
use crate::parameters::bounds::{Bounds, BoundsError};
use crate::parameters::descriptor::AttributeMeta;
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use thiserror::Error;

/// Errors that can occur when working with descriptors and parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Attribute name must not be empty")]
    EmptyName,

    #[error("Attribute '{name}' needs at least one CIF name")]
    MissingCifName { name: String },

    #[error("Value {value} for '{name}' is outside physical bounds [{min}, {max}]")]
    OutOfBounds {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Value for '{name}' must be finite")]
    NonFinite { name: String },

    #[error("Uncertainty {value} for '{name}' must be non-negative")]
    NegativeUncertainty { name: String, value: f64 },

    #[error("Value '{value}' for '{name}' is not one of: {allowed}")]
    NotAllowed {
        name: String,
        value: String,
        allowed: String,
    },

    #[error("Value for '{name}' must be a {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("Bounds error: {0}")]
    BoundsError(#[from] BoundsError),
}

/// A refinable numeric value
#[derive(Debug, Clone)]
pub struct Parameter {
    meta: AttributeMeta,
    value: f64,
    uncertainty: Option<f64>,
    free: bool,
    constrained: bool,
    physical_bounds: Bounds,
    fit_bounds: Bounds,
    start_value: Option<f64>,
}

impl Parameter {
    /// Create a fixed, unbounded parameter
    ///
    /// # Arguments
    ///
    /// * `meta` - Name, units and CIF tags
    /// * `value` - Initial value
    ///
    /// # Returns
    ///
    /// The parameter, or [`ParameterError::NonFinite`] for NaN/infinite values
    ///
    /// # Examples
    ///
    /// ```
    /// use diffrefine::parameters::{AttributeMeta, Parameter};
    ///
    /// let meta = AttributeMeta::new("length_a", &["_cell.length_a"]).unwrap();
    /// let p = Parameter::new(meta, 3.89).unwrap();
    /// assert_eq!(p.value(), 3.89);
    /// assert!(!p.is_free());
    /// ```
    pub fn new(meta: AttributeMeta, value: f64) -> Result<Self, ParameterError> {
        if !value.is_finite() {
            return Err(ParameterError::NonFinite {
                name: meta.name().to_string(),
            });
        }

        Ok(Self {
            meta,
            value,
            uncertainty: None,
            free: false,
            constrained: false,
            physical_bounds: Bounds::unbounded(),
            fit_bounds: Bounds::unbounded(),
            start_value: None,
        })
    }

    /// Restrict the parameter to a physically meaningful range
    ///
    /// # Returns
    ///
    /// The parameter, or [`ParameterError::OutOfBounds`] if the current value
    /// lies outside `bounds`
    pub fn with_physical_bounds(mut self, bounds: Bounds) -> Result<Self, ParameterError> {
        if !bounds.contains(self.value) {
            return Err(self.out_of_bounds(self.value, &bounds));
        }
        self.physical_bounds = bounds;
        Ok(self)
    }

    pub fn with_free(mut self, free: bool) -> Self {
        self.free = free;
        self
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

    pub fn units(&self) -> &str {
        self.meta.units()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Assign a new value
    ///
    /// Writes to non-editable parameters are ignored. Non-finite values and
    /// values outside the physical bounds go through the active
    /// [`diagnostics::Reaction`]; under `Log` the old value is kept.
    pub fn set_value(&mut self, value: f64) -> Result<(), ParameterError> {
        if !self.meta.editable() {
            tracing::debug!(name = %self.meta.name(), "ignoring write to non-editable parameter");
            return Ok(());
        }
        if !value.is_finite() {
            return diagnostics::report(ParameterError::NonFinite {
                name: self.meta.name().to_string(),
            });
        }
        if !self.physical_bounds.contains(value) {
            return diagnostics::report(self.out_of_bounds(value, &self.physical_bounds));
        }

        self.value = value;
        Ok(())
    }

    /// Write a value proposed by the minimizer
    ///
    /// The value is clamped into the physical bounds; the editable flag does
    /// not apply since only free parameters are ever scattered. Non-finite
    /// values are always an error, whatever the reaction policy.
    pub(crate) fn set_fitted_value(&mut self, value: f64) -> Result<(), ParameterError> {
        if !value.is_finite() {
            return Err(ParameterError::NonFinite {
                name: self.meta.name().to_string(),
            });
        }
        self.value = self.physical_bounds.clamp(value);
        Ok(())
    }

    /// Check a candidate value without writing it or consulting the
    /// reaction policy
    pub(crate) fn validate_value(&self, value: f64) -> Result<(), ParameterError> {
        if !value.is_finite() {
            return Err(ParameterError::NonFinite {
                name: self.meta.name().to_string(),
            });
        }
        if !self.physical_bounds.contains(value) {
            return Err(self.out_of_bounds(value, &self.physical_bounds));
        }
        Ok(())
    }

    pub fn uncertainty(&self) -> Option<f64> {
        self.uncertainty
    }

    pub fn set_uncertainty(&mut self, uncertainty: Option<f64>) -> Result<(), ParameterError> {
        if let Some(value) = uncertainty {
            if !(value >= 0.0) {
                return diagnostics::report(ParameterError::NegativeUncertainty {
                    name: self.meta.name().to_string(),
                    value,
                });
            }
        }
        self.uncertainty = uncertainty;
        Ok(())
    }

    /// The user's free flag, regardless of constraints
    pub fn free(&self) -> bool {
        self.free
    }

    pub fn set_free(&mut self, free: bool) {
        self.free = free;
    }

    pub fn constrained(&self) -> bool {
        self.constrained
    }

    pub(crate) fn set_constrained(&mut self, constrained: bool) {
        self.constrained = constrained;
    }

    /// Eligible for optimisation: free and not constrained
    pub fn is_free(&self) -> bool {
        self.free && !self.constrained
    }

    pub fn physical_bounds(&self) -> Bounds {
        self.physical_bounds
    }

    pub fn fit_bounds(&self) -> Bounds {
        self.fit_bounds
    }

    pub fn set_fit_bounds(&mut self, bounds: Bounds) {
        self.fit_bounds = bounds;
    }

    /// Range handed to the minimizer: fit bounds within physical bounds
    pub fn fit_range(&self) -> Result<Bounds, BoundsError> {
        self.physical_bounds.intersect(&self.fit_bounds)
    }

    pub fn start_value(&self) -> Option<f64> {
        self.start_value
    }

    pub(crate) fn record_start_value(&mut self) {
        self.start_value = Some(self.value);
    }

    fn out_of_bounds(&self, value: f64, bounds: &Bounds) -> ParameterError {
        ParameterError::OutOfBounds {
            name: self.meta.name().to_string(),
            value,
            min: bounds.min,
            max: bounds.max,
        }
    }
}

/// Serializable snapshot of a parameter's refinement state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    pub uid: String,
    pub value: f64,
    pub uncertainty: Option<f64>,
    pub units: String,
    pub free: bool,
    pub constrained: bool,
}

/// Shared handle to a [`Parameter`] owned by a category item
///
/// Category items, the UID registry and the constraint engine all hold clones
/// of the same handle.
#[derive(Debug, Clone)]
pub struct ParameterRef(Rc<RefCell<Parameter>>);

impl ParameterRef {
    pub fn new(parameter: Parameter) -> Self {
        Self(Rc::new(RefCell::new(parameter)))
    }

    pub fn borrow(&self) -> Ref<'_, Parameter> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Parameter> {
        self.0.borrow_mut()
    }

    pub fn name(&self) -> String {
        self.0.borrow().name().to_string()
    }

    pub fn uid(&self) -> String {
        self.0.borrow().uid()
    }

    pub fn value(&self) -> f64 {
        self.0.borrow().value()
    }

    pub fn set_value(&self, value: f64) -> Result<(), ParameterError> {
        self.0.borrow_mut().set_value(value)
    }

    pub fn uncertainty(&self) -> Option<f64> {
        self.0.borrow().uncertainty()
    }

    pub fn free(&self) -> bool {
        self.0.borrow().free()
    }

    pub fn set_free(&self, free: bool) {
        self.0.borrow_mut().set_free(free);
    }

    pub fn constrained(&self) -> bool {
        self.0.borrow().constrained()
    }

    pub fn is_free(&self) -> bool {
        self.0.borrow().is_free()
    }

    pub fn set_fit_bounds(&self, bounds: Bounds) {
        self.0.borrow_mut().set_fit_bounds(bounds);
    }

    pub fn cif_names(&self) -> Vec<String> {
        self.0.borrow().meta().cif_names().to_vec()
    }

    pub fn ptr_eq(&self, other: &ParameterRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn snapshot(&self) -> ParameterSnapshot {
        let p = self.0.borrow();
        ParameterSnapshot {
            uid: p.uid(),
            value: p.value(),
            uncertainty: p.uncertainty(),
            units: p.units().to_string(),
            free: p.free(),
            constrained: p.constrained(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{with_reaction, Reaction};

    fn occupancy(value: f64) -> Parameter {
        let meta = AttributeMeta::new("occupancy", &["_atom_site.occupancy"]).unwrap();
        Parameter::new(meta, value)
            .unwrap()
            .with_physical_bounds(Bounds::new(0.0, 1.0).unwrap())
            .unwrap()
    }

    #[test]
    fn test_new_rejects_non_finite() {
        let meta = AttributeMeta::new("x", &["_x"]).unwrap();
        assert!(matches!(
            Parameter::new(meta, f64::NAN),
            Err(ParameterError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_physical_bounds_on_construction() {
        let meta = AttributeMeta::new("occupancy", &["_atom_site.occupancy"]).unwrap();
        let result = Parameter::new(meta, 1.5)
            .unwrap()
            .with_physical_bounds(Bounds::new(0.0, 1.0).unwrap());
        assert!(matches!(result, Err(ParameterError::OutOfBounds { .. })));
    }

    #[test]
    fn test_out_of_bounds_write_raises() {
        let mut p = occupancy(0.5);
        with_reaction(Reaction::Raise, || {
            assert!(matches!(
                p.set_value(1.2),
                Err(ParameterError::OutOfBounds { .. })
            ));
        });
        assert_eq!(p.value(), 0.5);
    }

    #[test]
    fn test_out_of_bounds_write_logged_keeps_value() {
        let mut p = occupancy(0.5);
        with_reaction(Reaction::Log, || assert!(p.set_value(-0.1).is_ok()));
        assert_eq!(p.value(), 0.5);
    }

    #[test]
    fn test_non_editable_write_is_noop() {
        let meta = AttributeMeta::new("wavelength", &["_instr.wavelength"])
            .unwrap()
            .with_editable(false);
        let mut p = Parameter::new(meta, 1.54).unwrap();
        assert!(p.set_value(2.0).is_ok());
        assert_eq!(p.value(), 1.54);
    }

    #[test]
    fn test_negative_uncertainty_rejected() {
        let mut p = occupancy(0.5);
        with_reaction(Reaction::Raise, || {
            assert!(p.set_uncertainty(Some(-1.0)).is_err());
            assert!(p.set_uncertainty(Some(f64::NAN)).is_err());
        });
        p.set_uncertainty(Some(0.01)).unwrap();
        assert_eq!(p.uncertainty(), Some(0.01));
    }

    #[test]
    fn test_constrained_parameter_is_not_free() {
        let mut p = occupancy(0.5).with_free(true);
        assert!(p.is_free());

        p.set_constrained(true);
        assert!(p.free());
        assert!(!p.is_free());
    }

    #[test]
    fn test_fit_range_intersects_bounds() {
        let mut p = occupancy(0.5);
        p.set_fit_bounds(Bounds::new(0.2, 2.0).unwrap());
        assert_eq!(p.fit_range().unwrap(), Bounds::new(0.2, 1.0).unwrap());
    }

    #[test]
    fn test_fitted_value_is_clamped() {
        let mut p = occupancy(0.5);
        p.set_fitted_value(1.0 + 1e-15).unwrap();
        assert_eq!(p.value(), 1.0);
    }

    #[test]
    fn test_fitted_value_rejects_nan() {
        let mut p = occupancy(0.5);
        with_reaction(Reaction::Log, || {
            assert!(matches!(
                p.set_fitted_value(f64::NAN),
                Err(ParameterError::NonFinite { .. })
            ));
        });
        assert_eq!(p.value(), 0.5);
    }

    #[test]
    fn test_validate_value_ignores_reaction() {
        let p = occupancy(0.5);
        with_reaction(Reaction::Log, || {
            assert!(p.validate_value(0.7).is_ok());
            assert!(matches!(
                p.validate_value(1.5),
                Err(ParameterError::OutOfBounds { .. })
            ));
        });
    }

    #[test]
    fn test_handle_shares_state() {
        let a = ParameterRef::new(occupancy(0.5));
        let b = a.clone();
        b.set_free(true);
        assert!(a.is_free());
        assert!(a.ptr_eq(&b));
    }
}

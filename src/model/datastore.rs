//! Measured pattern storage with an exclusion mask

use crate::model::ModelError;
use ndarray::Array1;

/// Measured and calculated arrays of one experiment
///
/// The full arrays are kept as loaded. `x`, `meas` and `meas_su` are the
/// filtered views with excluded points removed and are the arrays calculators
/// and residual functions work with.
#[derive(Debug, Clone, Default)]
pub struct Datastore {
    full_x: Array1<f64>,
    full_meas: Array1<f64>,
    full_meas_su: Option<Array1<f64>>,
    excluded: Vec<bool>,
    x: Array1<f64>,
    meas: Array1<f64>,
    meas_su: Option<Array1<f64>>,
    calc: Option<Array1<f64>>,
}

impl Datastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the measured arrays and clear the mask
    pub fn load(
        &mut self,
        x: Array1<f64>,
        meas: Array1<f64>,
        meas_su: Option<Array1<f64>>,
    ) -> Result<(), ModelError> {
        if meas.len() != x.len() {
            return Err(ModelError::LengthMismatch {
                what: "meas",
                expected: x.len(),
                actual: meas.len(),
            });
        }
        if let Some(su) = &meas_su {
            if su.len() != x.len() {
                return Err(ModelError::LengthMismatch {
                    what: "meas_su",
                    expected: x.len(),
                    actual: su.len(),
                });
            }
        }

        self.excluded = vec![false; x.len()];
        self.full_x = x;
        self.full_meas = meas;
        self.full_meas_su = meas_su;
        self.calc = None;
        self.refresh_views();
        Ok(())
    }

    /// Recompute the mask from `(start, end)` regions, both ends inclusive
    pub fn apply_exclusions(&mut self, regions: &[(f64, f64)]) {
        self.excluded = self
            .full_x
            .iter()
            .map(|&x| regions.iter().any(|&(start, end)| x >= start && x <= end))
            .collect();
        self.calc = None;
        self.refresh_views();
        tracing::debug!(
            excluded = self.excluded.iter().filter(|&&e| e).count(),
            remaining = self.x.len(),
            "Exclusion mask updated"
        );
    }

    fn refresh_views(&mut self) {
        let keep = |values: &Array1<f64>| -> Array1<f64> {
            values
                .iter()
                .zip(&self.excluded)
                .filter(|&(_, &excluded)| !excluded)
                .map(|(&v, _)| v)
                .collect()
        };
        self.x = keep(&self.full_x);
        self.meas = keep(&self.full_meas);
        self.meas_su = self.full_meas_su.as_ref().map(keep);
    }

    /// Store a calculated pattern aligned with the filtered `x`
    pub fn set_calc(&mut self, calc: Array1<f64>) -> Result<(), ModelError> {
        if calc.len() != self.x.len() {
            return Err(ModelError::LengthMismatch {
                what: "calc",
                expected: self.x.len(),
                actual: calc.len(),
            });
        }
        self.calc = Some(calc);
        Ok(())
    }

    pub fn x(&self) -> &Array1<f64> {
        &self.x
    }

    pub fn meas(&self) -> &Array1<f64> {
        &self.meas
    }

    pub fn meas_su(&self) -> Option<&Array1<f64>> {
        self.meas_su.as_ref()
    }

    pub fn calc(&self) -> Option<&Array1<f64>> {
        self.calc.as_ref()
    }

    pub fn full_x(&self) -> &Array1<f64> {
        &self.full_x
    }

    pub fn full_meas(&self) -> &Array1<f64> {
        &self.full_meas
    }

    pub fn excluded(&self) -> &[bool] {
        &self.excluded
    }

    /// Number of included points
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_exclusion_filters_views() {
        let mut store = Datastore::new();
        store
            .load(
                array![0.0, 1.0, 2.0, 3.0],
                array![10.0, 11.0, 12.0, 13.0],
                Some(array![1.0, 2.0, 3.0, 4.0]),
            )
            .unwrap();
        store.apply_exclusions(&[(1.0, 2.0)]);

        assert_eq!(store.x(), &array![0.0, 3.0]);
        assert_eq!(store.meas(), &array![10.0, 13.0]);
        assert_eq!(store.meas_su().unwrap(), &array![1.0, 4.0]);
        assert_eq!(store.excluded(), &[false, true, true, false]);
        assert_eq!(store.full_x().len(), 4);

        store.apply_exclusions(&[]);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_length_checks() {
        let mut store = Datastore::new();
        let result = store.load(array![0.0, 1.0], array![1.0], None);
        assert!(matches!(
            result,
            Err(ModelError::LengthMismatch { what: "meas", expected: 2, actual: 1 })
        ));

        store.load(array![0.0, 1.0], array![1.0, 2.0], None).unwrap();
        assert!(store.set_calc(array![1.0]).is_err());
        store.set_calc(array![1.5, 2.5]).unwrap();
        assert_eq!(store.calc().unwrap()[1], 2.5);
    }
}

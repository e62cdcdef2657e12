//! Value bounds for refinable parameters
//!
//! A parameter carries two ranges: physical bounds, which reject values that
//! make no physical sense (a negative occupancy), and fit bounds, which the
//! user sets to restrict the optimizer. [`BoundsTransform`] maps a bounded
//! external value onto an unbounded internal one (Minuit-style) so that an
//! unconstrained least-squares backend can never leave the allowed range.

use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};
use thiserror::Error;

/// Errors that can occur when working with bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must not exceed max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Value {value} is outside bounds [{min}, {max}]")]
    ValueOutsideBounds { value: f64, min: f64, max: f64 },

    #[error("Bounds [{min}, {max}] and [{other_min}, {other_max}] do not overlap")]
    Disjoint {
        min: f64,
        max: f64,
        other_min: f64,
        other_max: f64,
    },

    #[error("Infinite or NaN value is not allowed")]
    NonFinite,
}

/// Closed interval `[min, max]`; either end may be infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

// Infinite ends are written as `null` so the JSON stays portable.
impl Serialize for Bounds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Bounds", 2)?;
        let min = self.min.is_finite().then_some(self.min);
        let max = self.max.is_finite().then_some(self.max);
        state.serialize_field("min", &min)?;
        state.serialize_field("max", &max)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Bounds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct BoundsHelper {
            #[serde(default)]
            min: Option<f64>,

            #[serde(default)]
            max: Option<f64>,
        }

        let helper = BoundsHelper::deserialize(deserializer)?;
        Bounds::new(
            helper.min.unwrap_or(NEG_INFINITY),
            helper.max.unwrap_or(INFINITY),
        )
        .map_err(serde::de::Error::custom)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl Bounds {
    /// Create bounds with the given ends
    ///
    /// # Arguments
    ///
    /// * `min` - Lowest allowed value
    /// * `max` - Highest allowed value
    ///
    /// # Returns
    ///
    /// The bounds if `min <= max`, or [`BoundsError::InvalidBounds`] otherwise
    ///
    /// # Examples
    ///
    /// ```
    /// use diffrefine::parameters::Bounds;
    ///
    /// let occupancy = Bounds::new(0.0, 1.0).unwrap();
    /// assert!(occupancy.contains(0.5));
    /// assert!(Bounds::new(1.0, 0.0).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(BoundsError::InvalidBounds { min, max });
        }

        Ok(Self { min, max })
    }

    /// `(-∞, ∞)`
    pub fn unbounded() -> Self {
        Self {
            min: NEG_INFINITY,
            max: INFINITY,
        }
    }

    /// `[min, ∞)`
    pub fn min_only(min: f64) -> Self {
        Self { min, max: INFINITY }
    }

    /// `(-∞, max]`
    pub fn max_only(max: f64) -> Self {
        Self {
            min: NEG_INFINITY,
            max,
        }
    }

    /// `true` if `min <= value <= max`
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Zero-width interval that admits a single value
    pub fn is_point(&self) -> bool {
        self.min == self.max
    }

    pub fn has_lower_bound(&self) -> bool {
        self.min.is_finite()
    }

    pub fn has_upper_bound(&self) -> bool {
        self.max.is_finite()
    }

    /// Clamp a value into the interval
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Overlap of two intervals
    ///
    /// Used to combine physical and fit bounds before handing a parameter to
    /// the minimizer.
    ///
    /// # Returns
    ///
    /// The tightest interval contained in both, or [`BoundsError::Disjoint`]
    /// if they do not overlap
    pub fn intersect(&self, other: &Bounds) -> Result<Bounds, BoundsError> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if min > max {
            return Err(BoundsError::Disjoint {
                min: self.min,
                max: self.max,
                other_min: other.min,
                other_max: other.max,
            });
        }
        Ok(Bounds { min, max })
    }
}

/// Minuit-style transform between bounded external values and unbounded
/// internal values
///
/// Two-sided bounds use `min + (sin(u) + 1) (max - min) / 2`; one-sided bounds
/// use the `sqrt(u² + 1)` mapping; unbounded values pass through.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsTransform {
    bounds: Bounds,
}

impl BoundsTransform {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Map an internal (optimizer) value to the external (physical) value
    ///
    /// The result always lies inside the bounds.
    pub fn to_external(&self, internal: f64) -> f64 {
        let b = &self.bounds;
        if b.is_point() {
            return b.min;
        }
        let external = match (b.has_lower_bound(), b.has_upper_bound()) {
            (false, false) => internal,
            (true, false) => b.min - 1.0 + (internal * internal + 1.0).sqrt(),
            (false, true) => b.max + 1.0 - (internal * internal + 1.0).sqrt(),
            (true, true) => b.min + (internal.sin() + 1.0) * (b.max - b.min) / 2.0,
        };
        // rounding in the two-sided branch can overshoot by an ulp
        b.clamp(external)
    }

    /// Map an external value to the internal value
    ///
    /// # Returns
    ///
    /// The internal value, or an error if `external` is non-finite or outside
    /// the bounds
    pub fn to_internal(&self, external: f64) -> Result<f64, BoundsError> {
        if !external.is_finite() {
            return Err(BoundsError::NonFinite);
        }

        let b = &self.bounds;
        if !b.contains(external) {
            return Err(BoundsError::ValueOutsideBounds {
                value: external,
                min: b.min,
                max: b.max,
            });
        }

        if b.is_point() {
            return Ok(0.0);
        }
        let internal = match (b.has_lower_bound(), b.has_upper_bound()) {
            (false, false) => external,
            (true, false) => ((external - b.min + 1.0).powi(2) - 1.0).sqrt(),
            (false, true) => ((b.max - external + 1.0).powi(2) - 1.0).sqrt(),
            (true, true) => {
                let scaled = 2.0 * (external - b.min) / (b.max - b.min) - 1.0;
                scaled.clamp(-1.0, 1.0).asin()
            }
        };
        Ok(internal)
    }
}

//! # Model Containers
//!
//! Sample models and experiments as parameter containers. No physics lives
//! here: the categories only declare which values exist, their units, CIF
//! tags and valid ranges, so that calculators can read them and the fit
//! orchestrator can refine them.

pub mod background;
pub mod datastore;
pub mod experiment;
pub mod experiment_type;
pub mod instrument;
pub mod peak;
pub mod sample;

pub use background::{Background, BackgroundType, LineSegment, PolynomialTerm};
pub use datastore::Datastore;
pub use experiment::{
    ExcludedRegion, ExcludedRegions, Experiment, Experiments, LinkedPhase,
};
pub use experiment_type::{BeamMode, ExperimentType, RadiationProbe, SampleForm, ScatteringType};
pub use instrument::{CwlInstrument, Instrument, TofInstrument};
pub use peak::{Peak, PeakProfileType};
pub use sample::{AtomSite, Cell, SampleModel, SampleModels};

use crate::categories::CategoryCore;
use crate::parameters::{
    AttributeMeta, Bounds, BoundsError, Descriptor, DescriptorRef, Parameter, ParameterError,
    ParameterRef,
};
use thiserror::Error;

/// Errors that can occur when building models or loading data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("{what} has {actual} points, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown {kind} '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    #[error("Peak profile '{profile}' is not available for {scattering_type} / {beam_mode}")]
    UnsupportedPeakProfile {
        profile: String,
        scattering_type: String,
        beam_mode: String,
    },

    #[error("Excluded region start {start} is above end {end}")]
    InvertedRegion { start: f64, end: f64 },

    #[error("Cannot add a {item} to a {background} background")]
    BackgroundMismatch {
        item: &'static str,
        background: &'static str,
    },

    #[error("Chebyshev order must be a non-negative integer, got {order}")]
    InvalidOrder { order: f64 },

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Bounds(#[from] BoundsError),
}

/// Closed set of string-valued options with a fixed external spelling
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            /// External spellings, in declaration order
            pub fn texts() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::model::ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| $crate::model::ModelError::UnknownValue {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}
pub(crate) use string_enum;

/// Declarative description of one parameter of a category
pub(crate) struct ParamSpec<'a> {
    name: &'a str,
    cif: &'a str,
    value: f64,
    units: &'a str,
    description: &'a str,
    bounds: Bounds,
}

impl<'a> ParamSpec<'a> {
    pub(crate) fn new(name: &'a str, cif: &'a str, value: f64) -> Self {
        Self {
            name,
            cif,
            value,
            units: "",
            description: "",
            bounds: Bounds::unbounded(),
        }
    }

    pub(crate) fn units(mut self, units: &'a str) -> Self {
        self.units = units;
        self
    }

    pub(crate) fn description(mut self, description: &'a str) -> Self {
        self.description = description;
        self
    }

    pub(crate) fn bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub(crate) fn attach(self, core: &mut CategoryCore) -> Result<ParameterRef, ModelError> {
        let meta = AttributeMeta::new(self.name, &[self.cif])?
            .with_units(self.units)
            .with_description(self.description);
        let parameter = Parameter::new(meta, self.value)?.with_physical_bounds(self.bounds)?;
        Ok(core.attach_parameter(parameter))
    }
}

/// Attach a text descriptor, optionally restricted to `allowed`
pub(crate) fn text_descriptor(
    core: &mut CategoryCore,
    name: &str,
    cif: &str,
    value: &str,
    allowed: Option<&[&str]>,
    editable: bool,
) -> Result<DescriptorRef, ModelError> {
    let meta = AttributeMeta::new(name, &[cif])?.with_editable(editable);
    let mut descriptor = Descriptor::new(meta, value);
    if let Some(allowed) = allowed {
        descriptor = descriptor.with_allowed_values(allowed)?;
    }
    Ok(core.attach_descriptor(descriptor))
}

//! # diffrefine
//!
//! `diffrefine` is the parameter and refinement core of a diffraction
//! structure-refinement toolkit.
//!
//! The library provides:
//! - Descriptors and refinable parameters with bounds, units and CIF-style tags
//! - Category items and collections grouped into sample-model and experiment
//!   datablocks, with unique ids derived from the ownership chain
//! - A UID registry and a constraint engine relating parameters symbolically
//! - Fit orchestration over pluggable calculators and minimizers, with a
//!   built-in Levenberg-Marquardt adapter and joint-fit weighting
//!
//! ## Basic Usage
//!
//! ```rust
//! use diffrefine::model::{AtomSite, SampleModel};
//! use diffrefine::Project;
//!
//! let mut model = SampleModel::new("lbco").unwrap();
//! model.atom_sites.add(AtomSite::new("La", "La").unwrap().with_occupancy(0.5).unwrap());
//!
//! let mut project = Project::new();
//! project.add_sample_model(model).unwrap();
//!
//! let la = project.sample_models.get("lbco").unwrap().atom_sites.get("La").unwrap();
//! la.occupancy.set_free(true);
//!
//! let free = project.free_parameters();
//! assert_eq!(free.len(), 1);
//! assert_eq!(free[0].uid(), "lbco.atom_site.La.occupancy");
//! ```

pub mod error;

pub mod diagnostics;

// Parameter graph
pub mod categories;
pub mod collection;
pub mod datablocks;
pub mod parameters;
pub mod registry;

pub mod constraints;

// Domain model
pub mod model;

// Refinement
pub mod analysis;

pub mod project;

// Re-exports for convenience
pub use error::{Error, Result};
pub use project::Project;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

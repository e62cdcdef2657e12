//! # Constraint Engine
//!
//! Symbolic relationships between parameters, addressed through aliases that
//! resolve via the [`UidRegistry`](crate::registry::UidRegistry).
//!
//! ## Example Usage
//!
//! ```rust
//! use diffrefine::categories::CategoryCore;
//! use diffrefine::constraints::ConstraintEngine;
//! use diffrefine::parameters::{AttributeMeta, Parameter};
//! use diffrefine::registry::UidRegistry;
//!
//! let mut sites = CategoryCore::new("atom_site");
//! let occ_la = sites.attach_parameter(
//!     Parameter::new(AttributeMeta::new("occ_la", &["_atom_site.occupancy"]).unwrap(), 0.5).unwrap(),
//! );
//! let occ_ba = sites.attach_parameter(
//!     Parameter::new(AttributeMeta::new("occ_ba", &["_atom_site.occupancy"]).unwrap(), 0.5).unwrap(),
//! );
//!
//! let mut registry = UidRegistry::new();
//! registry.sync(sites.attributes()).unwrap();
//!
//! let mut engine = ConstraintEngine::new();
//! engine.set_aliases([("occ_La", &occ_la), ("occ_Ba", &occ_ba)]);
//! engine.add_constraint("occ_Ba", "1 - occ_La").unwrap();
//!
//! occ_la.set_value(0.3).unwrap();
//! assert!(engine.apply(&registry).is_clean());
//! assert!((occ_ba.value() - 0.7).abs() < 1e-12);
//! assert!(occ_ba.constrained());
//! ```

pub mod engine;
pub mod expression;

pub use engine::{ApplyReport, Constraint, ConstraintEngine, ConstraintError, ConstraintState};
pub use expression::{BinaryOp, EvaluationContext, Expression, ExpressionError, UnaryOp};

//! # Parameter System
//!
//! Leaf value cells of the model graph and the identity scheme that names
//! them.
//!
//! ## Core Components
//!
//! - [`Descriptor`]: typed, named, non-refinable value with CIF tags
//! - [`Parameter`]: refinable value with free/constrained flags, physical and
//!   fit bounds, uncertainty
//! - [`ParameterRef`] and [`DescriptorRef`]: shared handles held by category
//!   items, the UID registry and the constraint engine
//! - [`Identity`]: ownership chain node from which unique ids are derived
//! - [`Bounds`] and [`BoundsTransform`]: value ranges and the Minuit-style
//!   mapping used by the least-squares backend
//!
//! ## Example Usage
//!
//! ```rust
//! use diffrefine::categories::CategoryCore;
//! use diffrefine::parameters::{AttributeMeta, Bounds, Identity, Parameter};
//!
//! let block = Identity::datablock("lbco");
//! let mut cell = CategoryCore::new("cell");
//! cell.identity().set_parent(&block);
//!
//! let meta = AttributeMeta::new("length_a", &["_cell.length_a"])
//!     .unwrap()
//!     .with_units("Å");
//! let length_a = Parameter::new(meta, 3.89)
//!     .unwrap()
//!     .with_physical_bounds(Bounds::min_only(0.0))
//!     .unwrap();
//! let length_a = cell.attach_parameter(length_a);
//!
//! assert_eq!(length_a.uid(), "lbco.cell.length_a");
//! length_a.set_free(true);
//! assert!(length_a.is_free());
//! ```

pub mod attribute;
pub mod bounds;
pub mod descriptor;
pub mod identity;
pub mod parameter;

pub use attribute::Attribute;
pub use bounds::{Bounds, BoundsError, BoundsTransform};
pub use descriptor::{AttributeMeta, Descriptor, DescriptorRef, Value};
pub use identity::{Identity, NameSource};
pub use parameter::{Parameter, ParameterError, ParameterRef, ParameterSnapshot};

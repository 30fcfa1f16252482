//! Capability-keyed implementor index.
//!
//! `identity` holds the newtype keys, `model` the per-capability listing, and
//! `registry` the page-scoped `ImplementorIndex` that producers register into
//! and renderers attach to.

pub mod identity;
pub mod model;
pub mod registry;

pub use identity::{CapabilityName, ItemKind, PackageName, TypePath};
pub use model::{Capability, ImplementorRecord, PackageGroups};
pub use registry::{CapabilityListing, ImplementorIndex, IndexSnapshot, SNAPSHOT_SCHEMA_VERSION};

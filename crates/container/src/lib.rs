//! Bundle container access.
//!
//! A bundle is a single-file archive holding named binary entries, addressed
//! by a root location that may itself sit inside another archive. This crate
//! defines the on-disk bundle format and the per-container extraction layer:
//!
//! * [`format`]: catalog layout (magic, signer table, entry records)
//! * [`location`]: bundle and resource locations, nested-archive identifiers
//! * [`provenance`]: attribution records, interned per container by signer set
//! * [`accessor`]: one opened container; entry existence checks and extraction
//! * [`writer`]: minimal bundle builder for tests and fixture tooling
//!
//! Accessors are safe to share across threads resolving different names;
//! extraction is serialized per container handle, never across containers.

pub mod accessor;
pub mod error;
pub mod format;
pub mod location;
pub mod provenance;
pub mod writer;

pub use accessor::{Accessor, BinaryUnit};
pub use error::ContainerError;
pub use location::{BundleLocation, ResourceLocation};
pub use provenance::Provenance;
pub use writer::BundleWriter;

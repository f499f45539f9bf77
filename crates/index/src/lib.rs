//! Persisted bundle index.
//!
//! Large applications assemble hundreds of nested bundles; resolving a name
//! by scanning every container is linear in the container count. A build
//! step persists an index file mapping each container identifier to the
//! namespace prefixes (or resource paths) it holds. This crate parses that
//! file and joins it with the active container set into a namespace index
//! consulted per lookup.
//!
//! An absent or version-mismatched index file is never an error: the index
//! comes up empty and every lookup degrades to fallback resolution.

mod build;
pub mod parser;

mod error;

pub use build::{NamespaceIndex, build_index};
pub use error::IndexError;
pub use parser::{INDEX_VERSION, INDEX_VERSION_KEY, ParsedIndex, parse_index_file};

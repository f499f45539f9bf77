//! Runtime capabilities surrounding the engine.
//!
//! The engine never reimplements the hierarchical fallback algorithm or the
//! runtime's unit registry; both are capabilities passed in at construction.
//! [`MemoryHost`] is a process-local registry suitable for embedding and for
//! tests.

use std::io::Read;
use std::sync::Arc;

use loadstone_container::{BinaryUnit, Provenance, ResourceLocation};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::ResolveError;

/// The external default resolver the engine defers to on index misses.
pub trait FallbackResolver: Send + Sync {
	/// Resolves `name` or fails with [`ResolveError::NotFound`].
	fn resolve_or_fail(&self, name: &str, link: bool) -> Result<BinaryUnit, ResolveError>;

	/// Opens the raw resource stream for `path` from the parent scope.
	///
	/// Used by the bootstrap bypass for the loader's own infrastructure
	/// units, which must load before the index is consulted.
	fn open_resource(&self, path: &str) -> Option<Box<dyn Read + Send + '_>>;

	/// Locates a single resource in the parent scope.
	fn find_resource(&self, name: &str) -> Option<ResourceLocation>;

	/// Locates every matching resource in the parent scope.
	fn find_resources(&self, name: &str) -> Vec<ResourceLocation>;
}

/// Result of a host definition call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineOutcome {
	Defined,
	/// Another thread defined it first. Benign; the engine re-checks
	/// existence instead of failing.
	AlreadyDefined,
}

/// Registry the engine defines resolved units and namespace metadata into.
pub trait RuntimeHost: Send + Sync {
	/// Registers an extracted unit under `name` with its provenance.
	fn define_unit(&self, name: &str, unit: &BinaryUnit) -> Result<DefineOutcome, ResolveError>;

	/// Whether namespace metadata for `namespace` already exists.
	fn namespace_present(&self, namespace: &str) -> bool;

	/// Creates namespace metadata. May report [`DefineOutcome::AlreadyDefined`]
	/// when racing another creator.
	fn define_namespace(&self, namespace: &str) -> Result<DefineOutcome, ResolveError>;
}

/// In-process unit and namespace registry.
#[derive(Debug, Default)]
pub struct MemoryHost {
	units: Mutex<FxHashMap<String, Arc<Provenance>>>,
	namespaces: Mutex<FxHashSet<String>>,
}

impl MemoryHost {
	pub fn new() -> Self {
		Self::default()
	}

	/// Provenance recorded for `name`, if it was defined.
	pub fn unit_provenance(&self, name: &str) -> Option<Arc<Provenance>> {
		self.units.lock().get(name).cloned()
	}

	pub fn defined_unit_count(&self) -> usize {
		self.units.lock().len()
	}

	pub fn namespace_count(&self) -> usize {
		self.namespaces.lock().len()
	}
}

impl RuntimeHost for MemoryHost {
	fn define_unit(&self, name: &str, unit: &BinaryUnit) -> Result<DefineOutcome, ResolveError> {
		let mut units = self.units.lock();
		if units.contains_key(name) {
			return Ok(DefineOutcome::AlreadyDefined);
		}
		units.insert(name.to_string(), Arc::clone(&unit.provenance));
		Ok(DefineOutcome::Defined)
	}

	fn namespace_present(&self, namespace: &str) -> bool {
		self.namespaces.lock().contains(namespace)
	}

	fn define_namespace(&self, namespace: &str) -> Result<DefineOutcome, ResolveError> {
		if self.namespaces.lock().insert(namespace.to_string()) {
			Ok(DefineOutcome::Defined)
		} else {
			Ok(DefineOutcome::AlreadyDefined)
		}
	}
}

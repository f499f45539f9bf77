//! Name resolution engine.
//!
//! Resolution for one dotted name walks a fixed sequence:
//!
//! 1. bootstrap bypass for the loader's own infrastructure namespaces,
//!    read from the parent scope's resource stream before any index lookup;
//! 2. exclusion filter: platform and foreign-interop names never hit the
//!    index, they are guaranteed to come from the fallback resolver;
//! 3. indexed lookup: candidate containers tried in index declaration
//!    order, first successful extraction wins;
//! 4. fallback delegation, the only step allowed to surface not-found.
//!
//! Namespace metadata creation is serialized by one mutex per engine
//! instance; the underlying registry is not safe for concurrent first
//! writers, and losing the race is absorbed by re-checking existence.

use std::io::Read;
use std::sync::Arc;

use loadstone_container::{Accessor, BinaryUnit, BundleLocation, Provenance, ResourceLocation};
use loadstone_index::{NamespaceIndex, build_index};
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::CachingResolver;
use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::host::{DefineOutcome, FallbackResolver, RuntimeHost};

/// Namespaces resolved through the bootstrap bypass: the engine's own
/// support units plus names reserved by the surrounding launcher.
const BOOTSTRAP_PREFIXES: &[&str] = &["loadstone.loader.", "boot.loader."];

/// Standard-platform namespaces, always delegated.
const PLATFORM_PREFIXES: &[&str] = &["std.", "core.", "alloc."];

/// Foreign-interop markers, always delegated.
const INTEROP_MARKERS: &[&str] = &["ffi.", "abi."];

/// Entry file extension for code units.
const UNIT_SUFFIX: &str = ".unit";

/// A capability that materializes a binary unit for a symbolic name.
pub trait Resolver: Send + Sync {
	/// Resolves `name`, applying the unit-defining side effect on success.
	fn resolve(&self, name: &str, link: bool) -> Result<Arc<BinaryUnit>, ResolveError>;

	/// Locates the first resource matching `name`.
	fn find_resource(&self, name: &str) -> Option<ResourceLocation>;

	/// Locates every resource matching `name`, in candidate order.
	fn find_resources(&self, name: &str) -> Vec<ResourceLocation>;
}

/// Namespace prefix of a dotted name: everything before the last dot.
fn namespace_of(name: &str) -> Option<&str> {
	name.rsplit_once('.').map(|(ns, _)| ns)
}

fn namespace_key(namespace: &str) -> String {
	namespace.replace('.', "/")
}

fn unit_path(name: &str) -> String {
	let mut path = name.replace('.', "/");
	path.push_str(UNIT_SUFFIX);
	path
}

fn is_bootstrap(name: &str) -> bool {
	BOOTSTRAP_PREFIXES.iter().any(|p| name.starts_with(p))
}

fn is_excluded(name: &str) -> bool {
	PLATFORM_PREFIXES.iter().any(|p| name.starts_with(p))
		|| INTEROP_MARKERS.iter().any(|m| name.contains(m))
}

/// Index-backed lookup over the active container set.
pub struct IndexedResolver {
	units: Arc<NamespaceIndex>,
	resources: Arc<NamespaceIndex>,
}

impl IndexedResolver {
	pub fn new(units: Arc<NamespaceIndex>, resources: Arc<NamespaceIndex>) -> Self {
		Self { units, resources }
	}

	/// Attempts an indexed resolution of `name`.
	///
	/// `Ok(None)` is an index miss (no entry, or no candidate had the unit);
	/// extraction failures inside a candidate are hard errors.
	pub fn try_resolve(&self, name: &str) -> Result<Option<BinaryUnit>, ResolveError> {
		let Some(namespace) = namespace_of(name) else {
			return Ok(None);
		};
		let key = namespace_key(namespace);
		let path = unit_path(name);
		for accessor in self.units.candidates(&key) {
			if let Some(unit) = accessor.binary_unit(&path)? {
				debug!(name, container = %accessor.location(), "indexed resolution hit");
				return Ok(Some(unit));
			}
		}
		Ok(None)
	}

	/// First indexed location of the resource `name`.
	pub fn find_resource(&self, name: &str) -> Option<ResourceLocation> {
		self.resources
			.candidates(name)
			.iter()
			.find_map(|accessor| accessor.resource_location(name))
	}

	/// Every indexed location of the resource `name`, in declaration order.
	pub fn find_resources(&self, name: &str) -> Vec<ResourceLocation> {
		self.resources
			.candidates(name)
			.iter()
			.filter_map(|accessor| accessor.resource_location(name))
			.collect()
	}
}

/// Indexed-then-fallback resolution with unit definition and namespace
/// metadata attachment.
pub struct CompositeResolver {
	indexed: IndexedResolver,
	fallback: Arc<dyn FallbackResolver>,
	host: Arc<dyn RuntimeHost>,
	metadata_lock: Mutex<()>,
}

impl CompositeResolver {
	pub fn new(
		indexed: IndexedResolver,
		fallback: Arc<dyn FallbackResolver>,
		host: Arc<dyn RuntimeHost>,
	) -> Self {
		Self {
			indexed,
			fallback,
			host,
			metadata_lock: Mutex::new(()),
		}
	}

	/// Reads a bootstrap unit from the parent scope's resource stream.
	///
	/// Any failure falls through to the regular resolution path.
	fn load_bootstrap(&self, name: &str) -> Result<Option<Arc<BinaryUnit>>, ResolveError> {
		let path = unit_path(name);
		let Some(mut stream) = self.fallback.open_resource(&path) else {
			return Ok(None);
		};
		let mut bytes = Vec::new();
		if stream.read_to_end(&mut bytes).is_err() {
			return Ok(None);
		}
		debug!(name, size = bytes.len(), "bootstrap unit loaded from parent stream");
		let unit = BinaryUnit {
			bytes,
			provenance: Arc::new(Provenance {
				origin: BundleLocation::plain("<bootstrap>"),
				signers: Vec::new().into(),
			}),
		};
		self.host.define_unit(name, &unit)?;
		self.ensure_namespace(name)?;
		Ok(Some(Arc::new(unit)))
	}

	/// Creates namespace metadata for `name`'s namespace if absent.
	///
	/// Creation is serialized; a lost race against another definer is
	/// resolved by re-checking existence.
	fn ensure_namespace(&self, name: &str) -> Result<(), ResolveError> {
		let Some(namespace) = namespace_of(name) else {
			return Ok(());
		};
		if self.host.namespace_present(namespace) {
			return Ok(());
		}
		let _guard = self.metadata_lock.lock();
		if self.host.namespace_present(namespace) {
			return Ok(());
		}
		match self.host.define_namespace(namespace)? {
			DefineOutcome::Defined => Ok(()),
			DefineOutcome::AlreadyDefined => {
				if self.host.namespace_present(namespace) {
					Ok(())
				} else {
					Err(ResolveError::Host(format!(
						"namespace {namespace} reported as already defined but is not present"
					)))
				}
			}
		}
	}
}

impl Resolver for CompositeResolver {
	fn resolve(&self, name: &str, link: bool) -> Result<Arc<BinaryUnit>, ResolveError> {
		if is_bootstrap(name) {
			if let Some(unit) = self.load_bootstrap(name)? {
				return Ok(unit);
			}
		}

		if !is_excluded(name) {
			if let Some(unit) = self.indexed.try_resolve(name)? {
				self.host.define_unit(name, &unit)?;
				self.ensure_namespace(name)?;
				return Ok(Arc::new(unit));
			}
		}

		debug!(name, "delegating to fallback resolver");
		let unit = self.fallback.resolve_or_fail(name, link)?;
		Ok(Arc::new(unit))
	}

	fn find_resource(&self, name: &str) -> Option<ResourceLocation> {
		self.indexed
			.find_resource(name)
			.or_else(|| self.fallback.find_resource(name))
	}

	fn find_resources(&self, name: &str) -> Vec<ResourceLocation> {
		let indexed = self.indexed.find_resources(name);
		if !indexed.is_empty() {
			return indexed;
		}
		self.fallback.find_resources(name)
	}
}

/// Builds the full resolution stack for an active container set: both
/// namespace indexes, the composite engine, and the cache layer in front.
pub fn bootstrap_resolver(
	active: &[Arc<Accessor>],
	config: &ResolverConfig,
	fallback: Arc<dyn FallbackResolver>,
	host: Arc<dyn RuntimeHost>,
) -> CachingResolver<CompositeResolver> {
	let units = Arc::new(build_index(active, &config.unit_index_file));
	let resources = Arc::new(build_index(active, &config.resource_index_file));
	let indexed = IndexedResolver::new(units, resources);
	CachingResolver::new(CompositeResolver::new(indexed, fallback, host), config)
}

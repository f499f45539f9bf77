//! Lookup cache layer.
//!
//! Three independent memo tables sit in front of name resolution, single
//! resource lookup and resource enumeration. Each records positive and
//! negative outcomes and is consulted before any real work.
//!
//! # Invariants
//!
//! - At most one underlying resolution attempt is visible per key, even
//!   under concurrent first access: later callers block on the in-flight
//!   cell and replay its outcome.
//! - Populated keys are never overwritten; tables only grow (the bounded
//!   store evicts and expires, but never replaces a live entry in place).

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::config::{CacheStrategy, ResolverConfig};
use crate::engine::Resolver;
use crate::error::ResolveError;

use loadstone_container::{BinaryUnit, ResourceLocation};

/// A memoized lookup outcome.
#[derive(Debug, Clone)]
pub enum Outcome<V> {
	Found(V),
	/// Looked up, not present. Distinct from "never looked up".
	Absent,
	/// The underlying resolution failed; replayed to later callers.
	Failed(Arc<ResolveError>),
}

struct TimedEntry<V> {
	at: Instant,
	outcome: Outcome<V>,
}

enum Store<K, V> {
	Bounded {
		entries: Mutex<LruCache<K, TimedEntry<V>>>,
		ttl: Duration,
		hits: AtomicU64,
		misses: AtomicU64,
	},
	Sentinel {
		entries: RwLock<FxHashMap<K, Outcome<V>>>,
	},
}

/// One memo table with single-flight population.
pub struct Memo<K, V> {
	store: Store<K, V>,
	in_flight: Mutex<FxHashMap<K, Arc<OnceCell<Outcome<V>>>>>,
}

impl<K, V> Memo<K, V>
where
	K: Eq + Hash + Clone,
	V: Clone,
{
	/// Capacity-bounded table whose entries expire `ttl` after write.
	pub fn bounded(capacity: usize, ttl: Duration) -> Self {
		let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
		Self {
			store: Store::Bounded {
				entries: Mutex::new(LruCache::new(capacity)),
				ttl,
				hits: AtomicU64::new(0),
				misses: AtomicU64::new(0),
			},
			in_flight: Mutex::new(FxHashMap::default()),
		}
	}

	/// Unbounded table; outcomes are permanent for the table's lifetime.
	pub fn sentinel() -> Self {
		Self {
			store: Store::Sentinel {
				entries: RwLock::new(FxHashMap::default()),
			},
			in_flight: Mutex::new(FxHashMap::default()),
		}
	}

	/// Returns the memoized outcome for `key`, computing it via `resolve` on
	/// first access. Concurrent first-access callers share one computation.
	pub fn get_or_resolve(&self, key: &K, resolve: impl FnOnce() -> Outcome<V>) -> Outcome<V> {
		if let Some(outcome) = self.lookup(key) {
			return outcome;
		}

		let cell = {
			let mut in_flight = self.in_flight.lock();
			Arc::clone(in_flight.entry(key.clone()).or_default())
		};
		let outcome = cell.get_or_init(resolve).clone();
		self.populate(key, outcome.clone());

		let mut in_flight = self.in_flight.lock();
		if let Some(current) = in_flight.get(key) {
			if Arc::ptr_eq(current, &cell) {
				in_flight.remove(key);
			}
		}
		outcome
	}

	/// Hit/miss counters; zero for the sentinel store.
	pub fn stats(&self) -> (u64, u64) {
		match &self.store {
			Store::Bounded { hits, misses, .. } => {
				(hits.load(Ordering::Relaxed), misses.load(Ordering::Relaxed))
			}
			Store::Sentinel { .. } => (0, 0),
		}
	}

	fn lookup(&self, key: &K) -> Option<Outcome<V>> {
		match &self.store {
			Store::Bounded {
				entries,
				ttl,
				hits,
				misses,
			} => {
				let mut entries = entries.lock();
				if let Some(entry) = entries.get(key) {
					if entry.at.elapsed() <= *ttl {
						hits.fetch_add(1, Ordering::Relaxed);
						return Some(entry.outcome.clone());
					}
					entries.pop(key);
				}
				misses.fetch_add(1, Ordering::Relaxed);
				None
			}
			Store::Sentinel { entries } => entries.read().get(key).cloned(),
		}
	}

	fn populate(&self, key: &K, outcome: Outcome<V>) {
		match &self.store {
			Store::Bounded { entries, .. } => {
				let mut entries = entries.lock();
				if !entries.contains(key) {
					entries.put(key.clone(), TimedEntry { at: Instant::now(), outcome });
				}
			}
			Store::Sentinel { entries } => {
				entries.write().entry(key.clone()).or_insert(outcome);
			}
		}
	}
}

/// A [`Resolver`] wrapped with the three memo tables.
pub struct CachingResolver<R> {
	inner: R,
	units: Memo<String, Arc<BinaryUnit>>,
	resource: Memo<String, ResourceLocation>,
	resources: Memo<String, Arc<[ResourceLocation]>>,
}

impl<R: Resolver> CachingResolver<R> {
	pub fn new(inner: R, config: &ResolverConfig) -> Self {
		let (units, resource, resources) = match config.strategy {
			CacheStrategy::Bounded => (
				Memo::bounded(
					config.unit_cache_capacity,
					Duration::from_secs(config.unit_ttl_secs),
				),
				Memo::bounded(
					config.resource_cache_capacity,
					Duration::from_secs(config.resource_ttl_secs),
				),
				Memo::bounded(
					config.resource_cache_capacity,
					Duration::from_secs(config.resource_ttl_secs),
				),
			),
			CacheStrategy::Sentinel => (Memo::sentinel(), Memo::sentinel(), Memo::sentinel()),
		};
		Self {
			inner,
			units,
			resource,
			resources,
		}
	}

	/// The wrapped resolver.
	pub fn inner(&self) -> &R {
		&self.inner
	}

	/// Hit/miss counters of the name-resolution table.
	pub fn unit_cache_stats(&self) -> (u64, u64) {
		self.units.stats()
	}
}

impl<R: Resolver> Resolver for CachingResolver<R> {
	fn resolve(&self, name: &str, link: bool) -> Result<Arc<BinaryUnit>, ResolveError> {
		let outcome = self
			.units
			.get_or_resolve(&name.to_string(), || match self.inner.resolve(name, link) {
				Ok(unit) => Outcome::Found(unit),
				Err(ResolveError::NotFound(_)) => Outcome::Absent,
				Err(e) => Outcome::Failed(Arc::new(e)),
			});
		match outcome {
			Outcome::Found(unit) => Ok(unit),
			Outcome::Absent => Err(ResolveError::NotFound(name.to_string())),
			Outcome::Failed(e) => Err(ResolveError::Cached(e)),
		}
	}

	fn find_resource(&self, name: &str) -> Option<ResourceLocation> {
		let outcome = self
			.resource
			.get_or_resolve(&name.to_string(), || match self.inner.find_resource(name) {
				Some(location) => Outcome::Found(location),
				None => Outcome::Absent,
			});
		match outcome {
			Outcome::Found(location) => Some(location),
			_ => None,
		}
	}

	fn find_resources(&self, name: &str) -> Vec<ResourceLocation> {
		let outcome = self
			.resources
			.get_or_resolve(&name.to_string(), || {
				let all = self.inner.find_resources(name);
				if all.is_empty() {
					Outcome::Absent
				} else {
					Outcome::Found(all.into())
				}
			});
		match outcome {
			Outcome::Found(all) => all.to_vec(),
			_ => Vec::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Barrier;
	use std::sync::atomic::AtomicUsize;

	use loadstone_container::{BundleLocation, Provenance};

	fn unit(bytes: &[u8]) -> Arc<BinaryUnit> {
		Arc::new(BinaryUnit {
			bytes: bytes.to_vec(),
			provenance: Arc::new(Provenance {
				origin: BundleLocation::plain("/tmp/a.lsb"),
				signers: Vec::new().into(),
			}),
		})
	}

	/// Counts resolution attempts; resolves only names starting with `ok`.
	struct CountingResolver {
		calls: AtomicUsize,
	}

	impl CountingResolver {
		fn new() -> Self {
			Self { calls: AtomicUsize::new(0) }
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}

	impl Resolver for CountingResolver {
		fn resolve(&self, name: &str, _link: bool) -> Result<Arc<BinaryUnit>, ResolveError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			if name.starts_with("ok") {
				Ok(unit(name.as_bytes()))
			} else if name.starts_with("broken") {
				Err(ResolveError::Host("registry rejected unit".into()))
			} else {
				Err(ResolveError::NotFound(name.to_string()))
			}
		}

		fn find_resource(&self, name: &str) -> Option<ResourceLocation> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			name.starts_with("ok")
				.then(|| BundleLocation::plain("/tmp/a.lsb").resolve(name))
		}

		fn find_resources(&self, name: &str) -> Vec<ResourceLocation> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			if name.starts_with("ok") {
				vec![BundleLocation::plain("/tmp/a.lsb").resolve(name)]
			} else {
				Vec::new()
			}
		}
	}

	fn sentinel_config() -> ResolverConfig {
		ResolverConfig {
			strategy: CacheStrategy::Sentinel,
			..ResolverConfig::default()
		}
	}

	#[test]
	fn test_warm_cache_performs_no_additional_resolution() {
		let caching = CachingResolver::new(CountingResolver::new(), &sentinel_config());
		let first = caching.resolve("ok.com.x.T", true).unwrap();
		let second = caching.resolve("ok.com.x.T", true).unwrap();
		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(caching.inner().calls(), 1);
	}

	#[test]
	fn test_negative_outcome_is_cached_without_reattempt() {
		let caching = CachingResolver::new(CountingResolver::new(), &sentinel_config());
		assert!(matches!(
			caching.resolve("missing.T", true),
			Err(ResolveError::NotFound(_))
		));
		assert!(matches!(
			caching.resolve("missing.T", true),
			Err(ResolveError::NotFound(_))
		));
		assert_eq!(caching.inner().calls(), 1);
	}

	#[test]
	fn test_failed_outcome_is_replayed() {
		let caching = CachingResolver::new(CountingResolver::new(), &sentinel_config());
		assert!(caching.resolve("broken.T", true).is_err());
		assert!(matches!(
			caching.resolve("broken.T", true),
			Err(ResolveError::Cached(_))
		));
		assert_eq!(caching.inner().calls(), 1);
	}

	#[test]
	fn test_resource_lookup_and_enumeration_memoize() {
		let caching = CachingResolver::new(CountingResolver::new(), &sentinel_config());
		assert!(caching.find_resource("ok/logo.bin").is_some());
		assert!(caching.find_resource("ok/logo.bin").is_some());
		assert!(caching.find_resources("absent/logo.bin").is_empty());
		assert!(caching.find_resources("absent/logo.bin").is_empty());
		assert_eq!(caching.inner().calls(), 2);
	}

	#[test]
	fn test_concurrent_first_access_resolves_once() {
		let caching = Arc::new(CachingResolver::new(CountingResolver::new(), &sentinel_config()));
		let threads = 8;
		let barrier = Arc::new(Barrier::new(threads));

		let handles: Vec<_> = (0..threads)
			.map(|_| {
				let caching = Arc::clone(&caching);
				let barrier = Arc::clone(&barrier);
				std::thread::spawn(move || {
					barrier.wait();
					caching.resolve("ok.com.x.T", true).unwrap()
				})
			})
			.collect();

		let units: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
		assert_eq!(caching.inner().calls(), 1);
		for other in &units[1..] {
			assert!(Arc::ptr_eq(&units[0], other));
		}
	}

	#[test]
	fn test_bounded_entries_expire_after_ttl() {
		let config = ResolverConfig {
			strategy: CacheStrategy::Bounded,
			unit_ttl_secs: 0,
			..ResolverConfig::default()
		};
		let caching = CachingResolver::new(CountingResolver::new(), &config);
		caching.resolve("ok.com.x.T", true).unwrap();
		std::thread::sleep(Duration::from_millis(5));
		caching.resolve("ok.com.x.T", true).unwrap();
		assert_eq!(caching.inner().calls(), 2);
	}

	#[test]
	fn test_bounded_capacity_evicts_least_recent() {
		let config = ResolverConfig {
			strategy: CacheStrategy::Bounded,
			unit_cache_capacity: 1,
			..ResolverConfig::default()
		};
		let caching = CachingResolver::new(CountingResolver::new(), &config);
		caching.resolve("ok.a.T", true).unwrap();
		caching.resolve("ok.b.T", true).unwrap();
		// a was evicted by b, so this is a fresh resolution
		caching.resolve("ok.a.T", true).unwrap();
		assert_eq!(caching.inner().calls(), 3);
	}

	#[test]
	fn test_bounded_stats_count_hits_and_misses() {
		let config = ResolverConfig {
			strategy: CacheStrategy::Bounded,
			..ResolverConfig::default()
		};
		let caching = CachingResolver::new(CountingResolver::new(), &config);
		caching.resolve("ok.a.T", true).unwrap();
		caching.resolve("ok.a.T", true).unwrap();
		let (hits, misses) = caching.unit_cache_stats();
		assert_eq!((hits, misses), (1, 1));
	}
}

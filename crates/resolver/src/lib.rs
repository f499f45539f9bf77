//! Index-accelerated symbolic name resolution.
//!
//! Given a dotted symbolic name, the engine consults the persisted bundle
//! index to shortlist candidate containers, extracts the unit from the first
//! container that has it, and hands it to the runtime host with its
//! provenance attached. Names the index does not cover delegate to an
//! external fallback resolver. Memoization tables in front of the engine
//! make repeated lookups, including failed ones, cheap under concurrent
//! access.
//!
//! # Architecture
//!
//! * [`engine`]: the [`Resolver`] seam with indexed, composite and bypass paths
//! * [`cache`]: positive/negative memo tables (bounded+expiring or sentinel)
//! * [`host`]: capabilities the surrounding runtime provides
//! * [`config`]: tuning knobs (cache strategy, capacities, index file paths)
//!
//! Engine instances own all mutable state; several can coexist in one
//! process, which the tests rely on.

pub mod cache;
pub mod config;
pub mod engine;
pub mod host;

mod error;

pub use cache::{CachingResolver, Memo, Outcome};
pub use config::{CacheStrategy, ResolverConfig};
pub use engine::{CompositeResolver, IndexedResolver, Resolver, bootstrap_resolver};
pub use error::ResolveError;
pub use host::{DefineOutcome, FallbackResolver, MemoryHost, RuntimeHost};

//! Engine configuration.
//!
//! Tuning knobs for the cache layer and the index file locations. Defaults
//! suit a long-running process resolving a few thousand names.

use std::path::PathBuf;

use serde::Deserialize;

/// Which memoization strategy the lookup caches use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
	/// Capacity-bounded entries expiring after a fixed duration. Trades
	/// memory for freshness in long-running processes.
	#[default]
	Bounded,
	/// Unbounded, with an explicit not-found sentinel. Negative outcomes
	/// are permanent for the engine lifetime.
	Sentinel,
}

/// Resolver tuning knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
	pub strategy: CacheStrategy,
	/// Name-resolution cache capacity (bounded strategy).
	pub unit_cache_capacity: usize,
	/// Resource lookup/enumeration cache capacity (bounded strategy).
	pub resource_cache_capacity: usize,
	/// Name-resolution entry lifetime in seconds (bounded strategy).
	pub unit_ttl_secs: u64,
	/// Resource entry lifetime in seconds (bounded strategy).
	pub resource_ttl_secs: u64,
	/// Index file mapping containers to namespace prefixes.
	pub unit_index_file: PathBuf,
	/// Index file mapping containers to exact resource paths.
	pub resource_index_file: PathBuf,
}

impl Default for ResolverConfig {
	fn default() -> Self {
		Self {
			strategy: CacheStrategy::default(),
			unit_cache_capacity: 8000,
			resource_cache_capacity: 4000,
			unit_ttl_secs: 120,
			resource_ttl_secs: 60,
			unit_index_file: PathBuf::from("./INDEX.LIST"),
			resource_index_file: PathBuf::from("./RES_INDEX.LIST"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_are_bounded() {
		let config = ResolverConfig::default();
		assert_eq!(config.strategy, CacheStrategy::Bounded);
		assert_eq!(config.unit_cache_capacity, 8000);
	}

	#[test]
	fn test_deserializes_partial_config() {
		let json = r#"{ "strategy": "sentinel", "unit_cache_capacity": 16 }"#;
		let config: ResolverConfig = serde_json::from_str(json).unwrap();
		assert_eq!(config.strategy, CacheStrategy::Sentinel);
		assert_eq!(config.unit_cache_capacity, 16);
		assert_eq!(config.resource_cache_capacity, 4000);
	}
}

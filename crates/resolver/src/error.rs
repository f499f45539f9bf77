use std::sync::Arc;

use loadstone_container::ContainerError;
use thiserror::Error;

/// Errors surfaced by name resolution.
///
/// `NotFound` is the only outcome the fallback path may surface; container
/// errors propagate as hard failures for the requested name and are never
/// retried.
#[derive(Error, Debug)]
pub enum ResolveError {
	#[error("unit not found: {0}")]
	NotFound(String),

	#[error(transparent)]
	Container(#[from] ContainerError),

	#[error("runtime host error: {0}")]
	Host(String),

	/// A failure replayed from the lookup cache.
	#[error("{0}")]
	Cached(Arc<ResolveError>),
}

//! Container error types.

use thiserror::Error;

/// Errors raised while opening or reading a bundle container.
///
/// Missing entries are not errors; accessor lookups report them as `None`.
#[derive(Error, Debug)]
pub enum ContainerError {
	#[error("malformed bundle {bundle}: {reason}")]
	Malformed { bundle: String, reason: String },

	#[error("entry too large: {entry} declares {declared} bytes")]
	EntryTooLarge { entry: String, declared: i64 },

	#[error("container is closed")]
	Closed,

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl ContainerError {
	pub(crate) fn malformed(bundle: impl std::fmt::Display, reason: impl Into<String>) -> Self {
		Self::Malformed {
			bundle: bundle.to_string(),
			reason: reason.into(),
		}
	}
}

//! Bundle and resource locations.
//!
//! A container's location descriptor records both where the archive file
//! lives and, for nested archives, the entry path of the inner archive
//! within the outer one. Only nested locations carry a canonical identifier
//! that index files can name; plain filesystem locations are not indexable.

use std::fmt;
use std::path::{Path, PathBuf};

/// Location of a bundle container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundleLocation {
	/// Path of the archive file on disk.
	pub archive: PathBuf,
	/// Entry path of this bundle inside an enclosing archive, when nested.
	pub entry: Option<String>,
}

impl BundleLocation {
	/// A plain filesystem location.
	pub fn plain(archive: impl Into<PathBuf>) -> Self {
		Self {
			archive: archive.into(),
			entry: None,
		}
	}

	/// A nested location: an archive stored at `entry` within `archive`.
	pub fn nested(archive: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
		Self {
			archive: archive.into(),
			entry: Some(entry.into()),
		}
	}

	/// Canonical identifier used to match this container against index file
	/// sections. Plain locations have none and cannot be indexed.
	pub fn canonical_id(&self) -> Option<&str> {
		self.entry.as_deref()
	}

	/// Path of the archive file backing this bundle.
	pub fn archive_path(&self) -> &Path {
		&self.archive
	}

	/// Resolves a named resource against this container's root.
	pub fn resolve(&self, name: &str) -> ResourceLocation {
		ResourceLocation {
			container: self.clone(),
			path: name.to_string(),
		}
	}
}

impl fmt::Display for BundleLocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.entry {
			Some(entry) => write!(f, "{}!/{}", self.archive.display(), entry),
			None => write!(f, "{}", self.archive.display()),
		}
	}
}

/// Location of a single resource within a bundle container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceLocation {
	/// The container holding the resource.
	pub container: BundleLocation,
	/// Entry path of the resource within the container.
	pub path: String,
}

impl fmt::Display for ResourceLocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}!/{}", self.container, self.path)
	}
}

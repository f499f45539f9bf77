//! Namespace index construction.
//!
//! Joins the parsed index file with the active container set. Each index
//! section names a container by its canonical identifier (the nested entry
//! path of the inner archive); containers the identifier map cannot match
//! are skipped whole, and plain filesystem containers are never eligible.
//! The result is write-once at startup and shared read-only by all
//! resolution threads.

use std::path::Path;
use std::sync::Arc;

use loadstone_container::Accessor;
use rustc_hash::FxHashMap;
use tracing::{info, warn};

use crate::parser::{ParsedIndex, parse_index_file};

/// Entry key → ordered candidate containers.
///
/// Keys are namespace prefixes for the code-unit index, exact resource
/// paths for the resource index. Candidate order is index-file section
/// order; resolution tries candidates in that order and the first success
/// wins.
#[derive(Debug, Default)]
pub struct NamespaceIndex {
	by_entry: FxHashMap<String, Vec<Arc<Accessor>>>,
}

impl NamespaceIndex {
	/// Ordered candidate containers for `key`; empty when unindexed.
	pub fn candidates(&self, key: &str) -> &[Arc<Accessor>] {
		self.by_entry.get(key).map(Vec::as_slice).unwrap_or(&[])
	}

	/// Number of indexed entry keys.
	pub fn len(&self) -> usize {
		self.by_entry.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_entry.is_empty()
	}
}

/// Builds the namespace index for `active` containers from the file at
/// `index_file`.
///
/// Never fails: an absent or unusable index file, an unreadable one, or
/// unmatched container identifiers only shrink the index. Lookups for
/// anything not indexed degrade to fallback resolution.
pub fn build_index(active: &[Arc<Accessor>], index_file: &Path) -> NamespaceIndex {
	let mut ids: FxHashMap<&str, &Arc<Accessor>> = FxHashMap::default();
	for accessor in active {
		// Plain filesystem locations carry no canonical id and cannot be
		// matched against index sections.
		if let Some(id) = accessor.location().canonical_id() {
			ids.entry(id).or_insert(accessor);
		}
	}

	let sections = match parse_index_file(index_file) {
		Ok(ParsedIndex::Loaded(sections)) => sections,
		Ok(ParsedIndex::Absent) => {
			info!(file = %index_file.display(), "no index file, lookups fall back");
			return NamespaceIndex::default();
		}
		Ok(ParsedIndex::Unusable) => {
			info!(file = %index_file.display(), "index version mismatch, lookups fall back");
			return NamespaceIndex::default();
		}
		Err(e) => {
			warn!(file = %index_file.display(), error = %e, "unreadable index file, lookups fall back");
			return NamespaceIndex::default();
		}
	};

	let mut index = NamespaceIndex::default();
	for (container_id, members) in &sections {
		let Some(accessor) = ids.get(container_id.as_str()) else {
			continue;
		};
		for member in members {
			index
				.by_entry
				.entry(member.clone())
				.or_default()
				.push(Arc::clone(accessor));
		}
	}

	info!(
		file = %index_file.display(),
		sections = sections.len(),
		entries = index.len(),
		"built namespace index"
	);
	index
}

#[cfg(test)]
mod tests {
	use super::*;
	use loadstone_container::{BundleLocation, BundleWriter};
	use std::io::Write;

	fn bundle(dir: &Path, file: &str, id: Option<&str>, entries: &[&str]) -> Arc<Accessor> {
		let path = dir.join(file);
		let mut writer = BundleWriter::new();
		for entry in entries {
			writer.add_entry(entry, b"bytes");
		}
		writer.finish(&path).unwrap();
		let location = match id {
			Some(id) => BundleLocation::nested(&path, id),
			None => BundleLocation::plain(&path),
		};
		Arc::new(Accessor::open(location).unwrap())
	}

	fn index_file(dir: &Path, content: &str) -> std::path::PathBuf {
		let path = dir.join("INDEX.LIST");
		let mut file = std::fs::File::create(&path).unwrap();
		file.write_all(content.as_bytes()).unwrap();
		path
	}

	#[test]
	fn test_candidates_follow_section_order() {
		let dir = tempfile::tempdir().unwrap();
		let a = bundle(dir.path(), "a.lsb", Some("lib/a.lsb"), &["com/x/T.unit"]);
		let b = bundle(dir.path(), "b.lsb", Some("lib/b.lsb"), &["com/x/T.unit"]);
		let file = index_file(
			dir.path(),
			"Bundle-Index: 1.0\n\nlib/a.lsb\ncom/x\n\nlib/b.lsb\ncom/x\n",
		);

		let index = build_index(&[Arc::clone(&b), Arc::clone(&a)], &file);
		let candidates = index.candidates("com/x");
		assert_eq!(candidates.len(), 2);
		assert_eq!(candidates[0].location().canonical_id(), Some("lib/a.lsb"));
		assert_eq!(candidates[1].location().canonical_id(), Some("lib/b.lsb"));
	}

	#[test]
	fn test_unmatched_container_id_skips_whole_section() {
		let dir = tempfile::tempdir().unwrap();
		let a = bundle(dir.path(), "a.lsb", Some("lib/a.lsb"), &["com/x/T.unit"]);
		let file = index_file(
			dir.path(),
			"Bundle-Index: 1.0\n\nlib/gone.lsb\ncom/y\n\nlib/a.lsb\ncom/x\n",
		);

		let index = build_index(&[a], &file);
		assert!(index.candidates("com/y").is_empty());
		assert_eq!(index.candidates("com/x").len(), 1);
	}

	#[test]
	fn test_plain_locations_are_not_indexed() {
		let dir = tempfile::tempdir().unwrap();
		let a = bundle(dir.path(), "a.lsb", None, &["com/x/T.unit"]);
		let file = index_file(dir.path(), "Bundle-Index: 1.0\n\na.lsb\ncom/x\n");

		let index = build_index(&[a], &file);
		assert!(index.is_empty());
	}

	#[test]
	fn test_absent_index_file_yields_empty_index() {
		let dir = tempfile::tempdir().unwrap();
		let a = bundle(dir.path(), "a.lsb", Some("lib/a.lsb"), &["com/x/T.unit"]);
		let index = build_index(&[a], &dir.path().join("missing"));
		assert!(index.is_empty());
	}

	#[test]
	fn test_version_mismatch_yields_empty_index() {
		let dir = tempfile::tempdir().unwrap();
		let a = bundle(dir.path(), "a.lsb", Some("lib/a.lsb"), &["com/x/T.unit"]);
		let file = index_file(dir.path(), "Bundle-Index: 9.9\n\nlib/a.lsb\ncom/x\n");
		let index = build_index(&[a], &file);
		assert!(index.is_empty());
	}
}

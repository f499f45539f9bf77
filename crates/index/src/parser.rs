//! Index file parsing.
//!
//! The persisted format is line-oriented:
//!
//! ```text
//! Bundle-Index: 1.0
//!
//! lib/util.lsb
//! com/x
//! com/y
//!
//! lib/extra.lsb
//! com/x
//! ```
//!
//! The first line carries the version token; a mismatch marks the whole file
//! unusable, which is a distinct outcome from the file being absent. Each
//! section is a container identifier followed by member lines up to a blank
//! line or end of file. Section order is insertion order and is preserved in
//! the returned mapping: later consumers break namespace ties by first
//! registration.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use indexmap::{IndexMap, IndexSet};

use crate::error::IndexError;

/// Header prefix of the first line.
pub const INDEX_VERSION_KEY: &str = "Bundle-Index: ";

/// The only supported index version.
pub const INDEX_VERSION: &str = "1.0";

/// Insertion-ordered container-id → members mapping.
pub type IndexSections = IndexMap<String, IndexSet<String>>;

/// Outcome of parsing an index file.
///
/// Callers must distinguish `Absent` from `Unusable`: both leave the index
/// empty, but they take different code paths in the caller.
#[derive(Debug)]
pub enum ParsedIndex {
	/// The file does not exist.
	Absent,
	/// The file exists but its version token is not [`INDEX_VERSION`].
	Unusable,
	/// Sections read from the file, possibly partial.
	Loaded(IndexSections),
}

/// Parses the index file at `path`.
///
/// A malformed header or missing blank separator is not an error: parsing
/// stops early and returns whatever sections were already read.
pub fn parse_index_file(path: &Path) -> Result<ParsedIndex, IndexError> {
	let file = match File::open(path) {
		Ok(file) => file,
		Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ParsedIndex::Absent),
		Err(e) => return Err(e.into()),
	};
	let mut lines = BufReader::new(file).lines();
	let mut sections = IndexSections::default();

	// Must start with version info.
	let Some(first) = lines.next() else {
		return Ok(ParsedIndex::Loaded(sections));
	};
	let first = first?;
	let Some(version) = first.strip_prefix(INDEX_VERSION_KEY) else {
		return Ok(ParsedIndex::Loaded(sections));
	};
	if version != INDEX_VERSION {
		return Ok(ParsedIndex::Unusable);
	}

	// Blank line must be next.
	match lines.next() {
		None => return Ok(ParsedIndex::Loaded(sections)),
		Some(line) => {
			if !line?.is_empty() {
				return Ok(ParsedIndex::Loaded(sections));
			}
		}
	}

	// May contain sections.
	while let Some(header) = lines.next() {
		let container_id = header?;
		let mut members = IndexSet::new();
		let mut saw_eof = true;
		for line in lines.by_ref() {
			let line = line?;
			// Stop at section boundary.
			if line.is_empty() {
				saw_eof = false;
				break;
			}
			members.insert(line.trim().to_string());
		}
		sections.insert(container_id, members);
		if saw_eof {
			break;
		}
	}

	Ok(ParsedIndex::Loaded(sections))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	fn write_index(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("INDEX.LIST");
		let mut file = File::create(&path).unwrap();
		file.write_all(content.as_bytes()).unwrap();
		(dir, path)
	}

	fn loaded(parsed: ParsedIndex) -> IndexSections {
		match parsed {
			ParsedIndex::Loaded(sections) => sections,
			other => panic!("expected Loaded, got {other:?}"),
		}
	}

	#[test]
	fn test_missing_file_is_absent() {
		let dir = tempfile::tempdir().unwrap();
		let parsed = parse_index_file(&dir.path().join("nope")).unwrap();
		assert!(matches!(parsed, ParsedIndex::Absent));
	}

	#[test]
	fn test_version_mismatch_is_unusable() {
		let (_dir, path) = write_index("Bundle-Index: 2.0\n\nlib/a.lsb\ncom/x\n");
		let parsed = parse_index_file(&path).unwrap();
		assert!(matches!(parsed, ParsedIndex::Unusable));
	}

	#[test]
	fn test_malformed_header_returns_empty_mapping() {
		let (_dir, path) = write_index("not an index\n\nlib/a.lsb\ncom/x\n");
		assert!(loaded(parse_index_file(&path).unwrap()).is_empty());
	}

	#[test]
	fn test_header_without_blank_separator_returns_empty_mapping() {
		let (_dir, path) = write_index("Bundle-Index: 1.0\nlib/a.lsb\ncom/x\n");
		assert!(loaded(parse_index_file(&path).unwrap()).is_empty());
	}

	#[test]
	fn test_header_only_returns_empty_mapping() {
		let (_dir, path) = write_index("Bundle-Index: 1.0\n");
		assert!(loaded(parse_index_file(&path).unwrap()).is_empty());
	}

	#[test]
	fn test_sections_parse_in_order() {
		let (_dir, path) = write_index(
			"Bundle-Index: 1.0\n\nlib/a.lsb\ncom/x\ncom/y\n\nlib/b.lsb\ncom/x\n",
		);
		let sections = loaded(parse_index_file(&path).unwrap());
		let ids: Vec<_> = sections.keys().cloned().collect();
		assert_eq!(ids, ["lib/a.lsb", "lib/b.lsb"]);
		assert!(sections["lib/a.lsb"].contains("com/x"));
		assert!(sections["lib/a.lsb"].contains("com/y"));
		assert!(sections["lib/b.lsb"].contains("com/x"));
	}

	#[test]
	fn test_members_are_trimmed_and_deduplicated() {
		let (_dir, path) = write_index("Bundle-Index: 1.0\n\nlib/a.lsb\n  com/x  \ncom/x\ncom/y\n");
		let sections = loaded(parse_index_file(&path).unwrap());
		assert_eq!(sections["lib/a.lsb"].len(), 2);
		assert!(sections["lib/a.lsb"].contains("com/x"));
	}

	#[test]
	fn test_last_section_may_end_at_eof() {
		let (_dir, path) = write_index("Bundle-Index: 1.0\n\nlib/a.lsb\ncom/x");
		let sections = loaded(parse_index_file(&path).unwrap());
		assert!(sections["lib/a.lsb"].contains("com/x"));
	}

	#[test]
	fn test_empty_file_returns_empty_mapping() {
		let (_dir, path) = write_index("");
		assert!(loaded(parse_index_file(&path).unwrap()).is_empty());
	}
}

//! Bundle builder.
//!
//! Produces well-formed bundle files for tests and fixture tooling. Entries
//! can override the declared size (including the unknown sentinel) and carry
//! trailing bytes past it, to exercise the accessor's drain behavior.
//! Output-archive layout generation proper is a build-time concern outside
//! this workspace.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::format::{FORMAT_VERSION, MAGIC, SIZE_UNKNOWN};

struct PendingEntry {
	path: String,
	payload: Vec<u8>,
	declared: i64,
	signers: Vec<String>,
}

/// Builds a bundle file entry by entry.
#[derive(Default)]
pub struct BundleWriter {
	entries: Vec<PendingEntry>,
}

impl BundleWriter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds an unsigned entry whose declared size matches its payload.
	pub fn add_entry(&mut self, path: &str, bytes: &[u8]) -> &mut Self {
		self.push(path, bytes.to_vec(), bytes.len() as i64, &[])
	}

	/// Adds an entry with the unknown-size sentinel.
	pub fn add_entry_unknown_size(&mut self, path: &str, bytes: &[u8]) -> &mut Self {
		self.push(path, bytes.to_vec(), SIZE_UNKNOWN, &[])
	}

	/// Adds an entry whose stored region carries `trailing` past the declared length.
	pub fn add_entry_with_trailing(&mut self, path: &str, bytes: &[u8], trailing: &[u8]) -> &mut Self {
		let mut payload = bytes.to_vec();
		payload.extend_from_slice(trailing);
		self.push(path, payload, bytes.len() as i64, &[])
	}

	/// Adds an entry with an explicit declared size, independent of the payload.
	pub fn add_entry_with_declared(&mut self, path: &str, bytes: &[u8], declared: i64) -> &mut Self {
		self.push(path, bytes.to_vec(), declared, &[])
	}

	/// Adds an entry attributed to `signers`.
	pub fn add_signed_entry(&mut self, path: &str, bytes: &[u8], signers: &[&str]) -> &mut Self {
		self.push(path, bytes.to_vec(), bytes.len() as i64, signers)
	}

	fn push(&mut self, path: &str, payload: Vec<u8>, declared: i64, signers: &[&str]) -> &mut Self {
		self.entries.push(PendingEntry {
			path: path.to_string(),
			payload,
			declared,
			signers: signers.iter().map(|s| s.to_string()).collect(),
		});
		self
	}

	/// Writes the bundle to `path`.
	pub fn finish(&self, path: &Path) -> io::Result<()> {
		// Signer table: first appearance order, deduplicated.
		let mut signer_table: Vec<String> = Vec::new();
		for entry in &self.entries {
			for signer in &entry.signers {
				if !signer_table.contains(signer) {
					signer_table.push(signer.clone());
				}
			}
		}
		let signer_index = |name: &String| -> u16 {
			signer_table.iter().position(|s| s == name).unwrap_or(0) as u16
		};

		let mut catalog_len = MAGIC.len() + 2; // magic + version
		catalog_len += 2 + signer_table.iter().map(|s| 2 + s.len()).sum::<usize>();
		catalog_len += 4;
		for entry in &self.entries {
			catalog_len += 2 + entry.path.len() + 8 + 8 + 8 + 2 + 2 * entry.signers.len();
		}

		let mut offsets = Vec::with_capacity(self.entries.len());
		let mut next = catalog_len as u64;
		for entry in &self.entries {
			offsets.push(next);
			next += entry.payload.len() as u64;
		}

		let mut w = BufWriter::new(File::create(path)?);
		w.write_all(&MAGIC)?;
		w.write_all(&FORMAT_VERSION.to_le_bytes())?;
		w.write_all(&(signer_table.len() as u16).to_le_bytes())?;
		for signer in &signer_table {
			write_string(&mut w, signer)?;
		}
		w.write_all(&(self.entries.len() as u32).to_le_bytes())?;
		for (entry, offset) in self.entries.iter().zip(&offsets) {
			write_string(&mut w, &entry.path)?;
			w.write_all(&offset.to_le_bytes())?;
			w.write_all(&entry.declared.to_le_bytes())?;
			w.write_all(&(entry.payload.len() as u64).to_le_bytes())?;
			w.write_all(&(entry.signers.len() as u16).to_le_bytes())?;
			for signer in &entry.signers {
				w.write_all(&signer_index(signer).to_le_bytes())?;
			}
		}
		for entry in &self.entries {
			w.write_all(&entry.payload)?;
		}
		w.flush()
	}
}

fn write_string(w: &mut impl Write, s: &str) -> io::Result<()> {
	w.write_all(&(s.len() as u16).to_le_bytes())?;
	w.write_all(s.as_bytes())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::accessor::Accessor;
	use crate::location::BundleLocation;

	#[test]
	fn test_empty_bundle_round_trips() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("empty.lsb");
		BundleWriter::new().finish(&path).unwrap();
		let accessor = Accessor::open(BundleLocation::plain(&path)).unwrap();
		assert!(accessor.is_empty());
	}

	#[test]
	fn test_signer_table_deduplicates_across_entries() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("signed.lsb");
		let mut writer = BundleWriter::new();
		writer.add_signed_entry("a.unit", b"a", &["alice", "bob"]);
		writer.add_signed_entry("b.unit", b"b", &["bob"]);
		writer.finish(&path).unwrap();

		let accessor = Accessor::open(BundleLocation::plain(&path)).unwrap();
		let b = accessor.binary_unit("b.unit").unwrap().unwrap();
		assert_eq!(b.provenance.signers.as_ref(), &["bob".to_string()]);
	}
}

//! Per-container extraction.
//!
//! An [`Accessor`] wraps one opened bundle file. The catalog is read once at
//! open time; extraction seeks into the payload region for the requested
//! entry. Reads are serialized per container by a handle mutex, so two
//! threads extracting from the same container take turns while extractions
//! from different containers proceed independently.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::ContainerError;
use crate::format::{Catalog, EntryRecord, SIZE_UNKNOWN};
use crate::location::{BundleLocation, ResourceLocation};
use crate::provenance::{Provenance, ProvenanceInterner};

const BUFFER_SIZE: usize = 16 * 1024;

/// Raw bytes of a resolved code unit plus its attribution.
///
/// Produced fresh per successful extraction; never cached as a standalone
/// entity by this crate.
#[derive(Debug)]
pub struct BinaryUnit {
	pub bytes: Vec<u8>,
	pub provenance: Arc<Provenance>,
}

/// One opened bundle container.
pub struct Accessor {
	location: BundleLocation,
	signers: Vec<String>,
	entries: FxHashMap<String, EntryRecord>,
	// Single in-flight read per underlying handle; `None` once closed.
	file: Mutex<Option<File>>,
	interner: ProvenanceInterner,
}

impl Accessor {
	/// Opens the bundle at `location` and reads its catalog.
	pub fn open(location: BundleLocation) -> Result<Self, ContainerError> {
		let mut file = File::open(location.archive_path())?;
		let catalog = Catalog::read(&mut file, &location)?;
		let mut entries = FxHashMap::default();
		for record in catalog.entries {
			entries.insert(record.path.clone(), record);
		}
		debug!(bundle = %location, entries = entries.len(), "opened container");
		Ok(Self {
			location,
			signers: catalog.signers,
			entries,
			file: Mutex::new(Some(file)),
			interner: ProvenanceInterner::default(),
		})
	}

	/// Root location of this container.
	pub fn location(&self) -> &BundleLocation {
		&self.location
	}

	/// Number of catalog entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Checks that `name` exists in this container and returns its location.
	///
	/// This validates existence without reading payload bytes. Any failure,
	/// including a closed container, maps to `None`.
	pub fn resource_location(&self, name: &str) -> Option<ResourceLocation> {
		if !self.entries.contains_key(name) {
			return None;
		}
		if self.file.lock().is_none() {
			return None;
		}
		Some(self.location.resolve(name))
	}

	/// Extracts the entry at `path`.
	///
	/// Returns `Ok(None)` when the entry is not in the catalog. An entry that
	/// exists but cannot be read to completion, or whose declared size does
	/// not fit a signed 32-bit count, is a hard error.
	pub fn binary_unit(&self, path: &str) -> Result<Option<BinaryUnit>, ContainerError> {
		let Some(record) = self.entries.get(path) else {
			return Ok(None);
		};

		let mut guard = self.file.lock();
		let file = guard.as_mut().ok_or(ContainerError::Closed)?;
		file.seek(SeekFrom::Start(record.offset))?;
		let mut region = file.take(record.stored);

		let bytes = if record.declared == SIZE_UNKNOWN {
			// Size unknown: accumulate incrementally until the region ends.
			read_to_end_buffered(&mut region)?
		} else {
			let declared = record.declared;
			if declared < 0 || declared > i32::MAX as i64 {
				return Err(ContainerError::EntryTooLarge {
					entry: path.to_string(),
					declared,
				});
			}
			if declared as u64 > record.stored {
				return Err(ContainerError::malformed(
					&self.location,
					format!("entry {path} declares {declared} bytes but stores {}", record.stored),
				));
			}
			let mut bytes = vec![0u8; declared as usize];
			region.read_exact(&mut bytes).map_err(|e| match e.kind() {
				std::io::ErrorKind::UnexpectedEof => {
					ContainerError::malformed(&self.location, format!("truncated entry {path}"))
				}
				_ => ContainerError::Io(e),
			})?;
			// Some producers store trailing bytes past the declared length.
			// Drain them so the next read from this handle starts clean.
			drain(&mut region)?;
			bytes
		};

		let provenance = self.interner.intern(&self.location, &record.signers, &self.signers);
		debug!(bundle = %self.location, entry = path, size = bytes.len(), "extracted entry");
		Ok(Some(BinaryUnit { bytes, provenance }))
	}

	/// Releases the underlying file handle. Idempotent; never fails.
	pub fn close(&self) {
		self.file.lock().take();
	}
}

impl std::fmt::Debug for Accessor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Accessor")
			.field("location", &self.location)
			.field("entries", &self.entries.len())
			.finish_non_exhaustive()
	}
}

fn read_to_end_buffered(r: &mut impl Read) -> Result<Vec<u8>, ContainerError> {
	let mut out = Vec::new();
	let mut buf = [0u8; BUFFER_SIZE];
	loop {
		let n = r.read(&mut buf)?;
		if n == 0 {
			break;
		}
		out.extend_from_slice(&buf[..n]);
	}
	Ok(out)
}

fn drain(r: &mut impl Read) -> Result<(), ContainerError> {
	let mut buf = [0u8; BUFFER_SIZE];
	loop {
		let n = r.read(&mut buf)?;
		if n == 0 {
			return Ok(());
		}
	}
}

//! On-disk bundle format.
//!
//! A bundle file is a catalog followed by raw payload regions:
//!
//! ```text
//! magic  b"LSB1"
//! u16    format version (currently 1)
//! u16    signer count, then per signer: u16 length + utf8 name
//! u32    entry count, then per entry:
//!          u16 length + utf8 entry path
//!          u64 payload offset (from file start)
//!          i64 declared size (-1 = unknown)
//!          u64 stored region length
//!          u16 signer-ref count + that many u16 signer table indices
//! payload bytes...
//! ```
//!
//! The declared size is what the producer claimed for the entry; the stored
//! region may be longer. All integers are little-endian.

use std::io::{self, Read};

use crate::error::ContainerError;

/// File magic.
pub const MAGIC: [u8; 4] = *b"LSB1";

/// Supported format version.
pub const FORMAT_VERSION: u16 = 1;

/// Declared-size sentinel for entries of unknown size.
pub const SIZE_UNKNOWN: i64 = -1;

/// One catalog entry.
#[derive(Debug, Clone)]
pub struct EntryRecord {
	/// Entry path within the bundle, e.g. `com/x/Thing.unit`.
	pub path: String,
	/// Byte offset of the payload region from the start of the file.
	pub offset: u64,
	/// Size the producer declared, or [`SIZE_UNKNOWN`].
	pub declared: i64,
	/// Length of the stored payload region.
	pub stored: u64,
	/// Indices into the bundle's signer table.
	pub signers: Vec<u16>,
}

/// Parsed bundle catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
	pub signers: Vec<String>,
	pub entries: Vec<EntryRecord>,
}

impl Catalog {
	/// Reads a catalog from the start of a bundle stream.
	pub fn read(r: &mut impl Read, bundle: &impl std::fmt::Display) -> Result<Self, ContainerError> {
		let mut magic = [0u8; 4];
		read_exact(r, &mut magic, bundle, "truncated magic")?;
		if magic != MAGIC {
			return Err(ContainerError::malformed(bundle, "bad magic"));
		}
		let version = read_u16(r, bundle)?;
		if version != FORMAT_VERSION {
			return Err(ContainerError::malformed(
				bundle,
				format!("unsupported format version {version}"),
			));
		}

		let signer_count = read_u16(r, bundle)?;
		let mut signers = Vec::with_capacity(signer_count as usize);
		for _ in 0..signer_count {
			signers.push(read_string(r, bundle)?);
		}

		let entry_count = read_u32(r, bundle)?;
		let mut entries = Vec::with_capacity(entry_count as usize);
		for _ in 0..entry_count {
			let path = read_string(r, bundle)?;
			let offset = read_u64(r, bundle)?;
			let declared = read_u64(r, bundle)? as i64;
			let stored = read_u64(r, bundle)?;
			let signer_refs = read_u16(r, bundle)?;
			let mut refs = Vec::with_capacity(signer_refs as usize);
			for _ in 0..signer_refs {
				let idx = read_u16(r, bundle)?;
				if idx as usize >= signers.len() {
					return Err(ContainerError::malformed(
						bundle,
						format!("signer index {idx} out of range"),
					));
				}
				refs.push(idx);
			}
			entries.push(EntryRecord {
				path,
				offset,
				declared,
				stored,
				signers: refs,
			});
		}

		Ok(Self { signers, entries })
	}
}

fn read_exact(
	r: &mut impl Read,
	buf: &mut [u8],
	bundle: &impl std::fmt::Display,
	what: &str,
) -> Result<(), ContainerError> {
	r.read_exact(buf).map_err(|e| match e.kind() {
		io::ErrorKind::UnexpectedEof => ContainerError::malformed(bundle, what),
		_ => ContainerError::Io(e),
	})
}

fn read_u16(r: &mut impl Read, bundle: &impl std::fmt::Display) -> Result<u16, ContainerError> {
	let mut buf = [0u8; 2];
	read_exact(r, &mut buf, bundle, "truncated catalog")?;
	Ok(u16::from_le_bytes(buf))
}

fn read_u32(r: &mut impl Read, bundle: &impl std::fmt::Display) -> Result<u32, ContainerError> {
	let mut buf = [0u8; 4];
	read_exact(r, &mut buf, bundle, "truncated catalog")?;
	Ok(u32::from_le_bytes(buf))
}

fn read_u64(r: &mut impl Read, bundle: &impl std::fmt::Display) -> Result<u64, ContainerError> {
	let mut buf = [0u8; 8];
	read_exact(r, &mut buf, bundle, "truncated catalog")?;
	Ok(u64::from_le_bytes(buf))
}

fn read_string(r: &mut impl Read, bundle: &impl std::fmt::Display) -> Result<String, ContainerError> {
	let len = read_u16(r, bundle)? as usize;
	let mut buf = vec![0u8; len];
	read_exact(r, &mut buf, bundle, "truncated string")?;
	String::from_utf8(buf).map_err(|_| ContainerError::malformed(bundle, "non-utf8 string"))
}

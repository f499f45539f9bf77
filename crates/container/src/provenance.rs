//! Provenance records.
//!
//! Every extracted binary unit carries attribution: the container it came
//! from plus the signer set attached to the entry at packaging time. Signer
//! sets are small and repeat heavily across entries of the same container,
//! so records are interned per accessor keyed by structural signer-set
//! equality rather than re-allocated per extraction.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::location::BundleLocation;

/// Attribution for a binary unit: origin container plus signer set.
///
/// Carried unchanged to the runtime host; this crate never verifies signers.
#[derive(Debug, PartialEq, Eq)]
pub struct Provenance {
	/// Root location of the container the unit was extracted from.
	pub origin: BundleLocation,
	/// Names of the signers attached to the entry; empty when unsigned.
	pub signers: Arc<[String]>,
}

/// Per-container intern table for provenance records.
///
/// Keyed by the entry's signer table indices; two entries with the same
/// signer set share one `Arc<Provenance>`.
#[derive(Debug, Default)]
pub(crate) struct ProvenanceInterner {
	records: Mutex<FxHashMap<Vec<u16>, Arc<Provenance>>>,
}

impl ProvenanceInterner {
	/// Returns the interned record for `signer_refs`, creating it on first use.
	pub(crate) fn intern(
		&self,
		origin: &BundleLocation,
		signer_refs: &[u16],
		signer_table: &[String],
	) -> Arc<Provenance> {
		let mut records = self.records.lock();
		if let Some(existing) = records.get(signer_refs) {
			return Arc::clone(existing);
		}
		let signers: Arc<[String]> = signer_refs
			.iter()
			.map(|&i| signer_table[i as usize].clone())
			.collect();
		let record = Arc::new(Provenance {
			origin: origin.clone(),
			signers,
		});
		records.insert(signer_refs.to_vec(), Arc::clone(&record));
		record
	}
}

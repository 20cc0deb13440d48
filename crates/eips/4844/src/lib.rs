//! Types related to EIP-4844 blob transactions.

mod sidecar;

pub use c_kzg::{Blob, Bytes48, BYTES_PER_BLOB, BYTES_PER_COMMITMENT, BYTES_PER_PROOF};
use kaia_primitives::B256;
use sha2::Digest as _;

pub use self::sidecar::{probe_network_shape, BlobSidecar, NetworkShape, SidecarError, SidecarVersion};

/// Version byte of a versioned hash derived from a KZG commitment.
pub const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

/// Gas consumed by a single blob.
pub const GAS_PER_BLOB: u64 = 1 << 17;

/// Number of cells of an extended blob, each of which carries a proof in
/// version 1 sidecars (EIP-7594).
pub const CELLS_PER_EXT_BLOB: usize = 128;

/// Computes the versioned hash of a KZG commitment.
pub fn kzg_to_versioned_hash(commitment: &Bytes48) -> B256 {
    let mut hash = sha2::Sha256::digest(commitment.as_ref());
    if let Some(version) = hash.first_mut() {
        *version = VERSIONED_HASH_VERSION_KZG;
    }

    B256::from_slice(hash.as_ref())
}

/// Returns whether the blob hash carries the KZG version byte.
pub fn is_kzg_versioned_hash(blob_hash: &B256) -> bool {
    blob_hash.first() == Some(&VERSIONED_HASH_VERSION_KZG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versioned_hash_has_version_byte() {
        let commitment = Bytes48::from([0xc0; BYTES_PER_COMMITMENT]);
        let hash = kzg_to_versioned_hash(&commitment);

        assert!(is_kzg_versioned_hash(&hash));
        assert_ne!(kzg_to_versioned_hash(&Bytes48::from([0u8; 48])), hash);
    }
}

use alloy_rlp::{Decodable as _, Encodable as _, Header};
use c_kzg::{Blob, Bytes48};
use kaia_primitives::{Bytes, B256};

use crate::{kzg_to_versioned_hash, CELLS_PER_EXT_BLOB};

/// Version of a blob sidecar.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SidecarVersion {
    /// One KZG proof per blob.
    #[default]
    V0 = 0,
    /// One KZG proof per cell of the extended blob (EIP-7594).
    V1 = 1,
}

impl From<SidecarVersion> for u8 {
    fn from(version: SidecarVersion) -> Self {
        version as u8
    }
}

impl TryFrom<u8> for SidecarVersion {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::V0),
            1 => Ok(Self::V1),
            value => Err(format!("unknown blob sidecar version: {value}")),
        }
    }
}

/// An error that occurs when a sidecar does not match its transaction.
#[derive(Debug, thiserror::Error)]
pub enum SidecarError {
    /// Number of blobs does not match the number of blob hashes.
    #[error("Number of blobs ({actual}) does not match the payload's number of blob hashes ({expected}).")]
    BlobCount {
        /// Number of blob hashes
        expected: usize,
        /// Number of blobs
        actual: usize,
    },
    /// Number of commitments does not match the number of blob hashes.
    #[error("Number of commitments ({actual}) does not match the payload's number of blob hashes ({expected}).")]
    CommitmentCount {
        /// Number of blob hashes
        expected: usize,
        /// Number of commitments
        actual: usize,
    },
    /// Number of proofs does not match the sidecar version's requirement.
    #[error("Number of proofs ({actual}) does not match the expected number ({expected}).")]
    ProofCount {
        /// Expected number of proofs
        expected: usize,
        /// Number of proofs
        actual: usize,
    },
    /// The versioned hash of a commitment does not match the blob hash.
    #[error("The versioned hash of the commitment at index {idx} does not match the payload's blob hash. Expected: {expected}, actual: {actual}.")]
    InvalidCommitment {
        /// Index of the commitment
        idx: usize,
        /// The payload's blob hash
        expected: B256,
        /// The commitment's versioned hash
        actual: B256,
    },
}

/// The blobs, commitments, and proofs accompanying a blob transaction in its
/// network encoding. It is never part of the canonical encoding.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobSidecar {
    /// Sidecar version
    pub version: SidecarVersion,
    /// Blobs
    pub blobs: Vec<Blob>,
    /// KZG commitments, one per blob
    pub commitments: Vec<Bytes48>,
    /// KZG proofs. One per blob for version 0, one per cell for version 1.
    pub proofs: Vec<Bytes48>,
}

impl BlobSidecar {
    /// Computes the versioned hashes of the sidecar's commitments.
    pub fn versioned_hashes(&self) -> Vec<B256> {
        self.commitments.iter().map(kzg_to_versioned_hash).collect()
    }

    /// Returns the number of proofs the sidecar must carry.
    pub fn expected_proof_count(&self) -> usize {
        match self.version {
            SidecarVersion::V0 => self.blobs.len(),
            SidecarVersion::V1 => self.blobs.len() * CELLS_PER_EXT_BLOB,
        }
    }

    /// Checks that the sidecar's shape and commitments match the provided blob
    /// hashes. KZG proofs are not verified.
    pub fn validate_against(&self, blob_hashes: &[B256]) -> Result<(), SidecarError> {
        if blob_hashes.len() != self.blobs.len() {
            return Err(SidecarError::BlobCount {
                expected: blob_hashes.len(),
                actual: self.blobs.len(),
            });
        }

        if blob_hashes.len() != self.commitments.len() {
            return Err(SidecarError::CommitmentCount {
                expected: blob_hashes.len(),
                actual: self.commitments.len(),
            });
        }

        let expected_proofs = self.expected_proof_count();
        if expected_proofs != self.proofs.len() {
            return Err(SidecarError::ProofCount {
                expected: expected_proofs,
                actual: self.proofs.len(),
            });
        }

        let invalid_blob_hash = blob_hashes
            .iter()
            .zip(self.commitments.iter())
            .enumerate()
            .find_map(|(idx, (blob_hash, commitment))| {
                let commitment_hash = kzg_to_versioned_hash(commitment);
                if *blob_hash == commitment_hash {
                    None
                } else {
                    Some((idx, *blob_hash, commitment_hash))
                }
            });

        if let Some((idx, expected, actual)) = invalid_blob_hash {
            return Err(SidecarError::InvalidCommitment {
                idx,
                expected,
                actual,
            });
        }

        Ok(())
    }

    /// Length of the sidecar's fields when appended to an outer list.
    pub fn fields_length(&self) -> usize {
        let version_length = match self.version {
            SidecarVersion::V0 => 0,
            SidecarVersion::V1 => u8::from(self.version).length(),
        };

        version_length
            + byte_list_length(self.blobs.iter().map(blob_bytes))
            + byte_list_length(self.commitments.iter().map(bytes48_bytes))
            + byte_list_length(self.proofs.iter().map(bytes48_bytes))
    }

    /// Encodes the sidecar's fields without a list header. Version 0 sidecars
    /// start with the blob list, later versions with their version number.
    pub fn encode_fields(&self, out: &mut dyn alloy_rlp::BufMut) {
        if self.version != SidecarVersion::V0 {
            u8::from(self.version).encode(out);
        }

        encode_byte_list(self.blobs.iter().map(blob_bytes), out);
        encode_byte_list(self.commitments.iter().map(bytes48_bytes), out);
        encode_byte_list(self.proofs.iter().map(bytes48_bytes), out);
    }

    /// Decodes the sidecar's fields, given the shape that was probed for the
    /// outer list.
    pub fn decode_fields(buf: &mut &[u8], version: SidecarVersion) -> alloy_rlp::Result<Self> {
        if version != SidecarVersion::V0 {
            let encoded_version = u8::decode(buf)?;
            if encoded_version != u8::from(version) {
                return Err(alloy_rlp::Error::Custom("unexpected blob sidecar version"));
            }
        }

        let blobs = Vec::<Bytes>::decode(buf)?
            .iter()
            .map(|blob| Blob::from_bytes(blob.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_error| alloy_rlp::Error::Custom("invalid blob"))?;

        let commitments = decode_bytes48_list(buf)?;
        let proofs = decode_bytes48_list(buf)?;

        Ok(Self {
            version,
            blobs,
            commitments,
            proofs,
        })
    }
}

/// The outer shape of a blob transaction's RLP payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkShape {
    /// `[fields...]` without a sidecar.
    Canonical,
    /// `[[fields...], blobs, commitments, proofs]`
    NetworkV0,
    /// `[[fields...], version, blobs, commitments, cell_proofs]`
    NetworkV1,
}

impl NetworkShape {
    /// Returns the sidecar version carried by this shape, if any.
    pub fn sidecar_version(&self) -> Option<SidecarVersion> {
        match self {
            NetworkShape::Canonical => None,
            NetworkShape::NetworkV0 => Some(SidecarVersion::V0),
            NetworkShape::NetworkV1 => Some(SidecarVersion::V1),
        }
    }
}

fn is_list(byte: u8) -> bool {
    byte >= alloy_rlp::EMPTY_LIST_CODE
}

/// Determines the shape of a blob transaction's RLP payload without consuming
/// it.
///
/// When the first element of the outer list is itself a list, the payload is
/// in network form. A list as second element then denotes a version 0
/// sidecar (the blob list), a scalar denotes the version number of a later
/// sidecar.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub fn probe_network_shape(buf: &[u8]) -> alloy_rlp::Result<NetworkShape> {
    let mut buf = buf;

    let outer = Header::decode(&mut buf)?;
    if !outer.list {
        return Err(alloy_rlp::Error::UnexpectedString);
    }

    let mut payload = buf
        .get(..outer.payload_length)
        .ok_or(alloy_rlp::Error::InputTooShort)?;

    let first = *payload.first().ok_or(alloy_rlp::Error::InputTooShort)?;
    if !is_list(first) {
        return Ok(NetworkShape::Canonical);
    }

    let inner = Header::decode(&mut payload)?;
    payload = payload
        .get(inner.payload_length..)
        .ok_or(alloy_rlp::Error::InputTooShort)?;

    let second = *payload.first().ok_or(alloy_rlp::Error::InputTooShort)?;
    if is_list(second) {
        Ok(NetworkShape::NetworkV0)
    } else {
        Ok(NetworkShape::NetworkV1)
    }
}

fn blob_bytes(blob: &Blob) -> &[u8] {
    blob.as_ref()
}

fn bytes48_bytes(bytes: &Bytes48) -> &[u8] {
    bytes.as_ref()
}

fn byte_list_length<'a>(items: impl Iterator<Item = &'a [u8]>) -> usize {
    let payload_length: usize = items.map(|item| item.length()).sum();
    payload_length + alloy_rlp::length_of_length(payload_length)
}

fn encode_byte_list<'a>(
    items: impl Iterator<Item = &'a [u8]> + Clone,
    out: &mut dyn alloy_rlp::BufMut,
) {
    let payload_length = items.clone().map(|item| item.length()).sum();
    Header {
        list: true,
        payload_length,
    }
    .encode(out);

    for item in items {
        item.encode(out);
    }
}

fn decode_bytes48_list(buf: &mut &[u8]) -> alloy_rlp::Result<Vec<Bytes48>> {
    Vec::<[u8; 48]>::decode(buf).map(|items| items.into_iter().map(Bytes48::from).collect())
}

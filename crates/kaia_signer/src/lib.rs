// Part of this code was adapted from ethers-rs and is distributed under their
// licenss:
// - https://github.com/gakonst/ethers-rs/blob/cba6f071aedafb766e82e4c2f469ed5e4638337d/LICENSE-APACHE
// - https://github.com/gakonst/ethers-rs/blob/cba6f071aedafb766e82e4c2f469ed5e4638337d/LICENSE-MIT
// For the original context see: https://github.com/gakonst/ethers-rs/blob/cba6f071aedafb766e82e4c2f469ed5e4638337d/ethers-core/src/types/signature.rs

//! ECDSA signature types used by Kaia transactions.

mod recovery_id;
mod tx_signature;
pub mod utils;

use kaia_primitives::{Address, B256, U256};
pub use k256::{PublicKey, SecretKey};
use k256::{elliptic_curve::sec1::ToEncodedPoint, FieldBytes};
use sha3::{Digest, Keccak256};

pub use self::{
    recovery_id::SignatureWithRecoveryId,
    tx_signature::{TxSignature, TxSignatures},
};

/// The order of the secp256k1 curve.
pub const SECP256K1_N: U256 = U256::from_limbs([
    0xBFD2_5E8C_D036_4141,
    0xBAAE_DCE6_AF48_A03B,
    0xFFFF_FFFF_FFFF_FFFE,
    0xFFFF_FFFF_FFFF_FFFF,
]);

/// Half the order of the secp256k1 curve. Canonical signatures have an
/// S-value no larger than this.
pub const SECP256K1_HALF_N: U256 = U256::from_limbs([
    0xDFE9_2F46_681B_20A0,
    0x5D57_6E73_57A4_501D,
    0xFFFF_FFFF_FFFF_FFFF,
    0x7FFF_FFFF_FFFF_FFFF,
]);

/// An error involving a signature.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// Invalid length, ECDSA secp256k1 signatures with recovery are 65 bytes
    #[error("invalid signature length, got {0}, expected 65")]
    InvalidLength(usize),
    /// Invalid secret key.
    #[error("Expected 32 byte secret key")]
    InvalidSecretKeyLength,
    /// When parsing a secret key from string to hex
    #[error("Invalid hex")]
    InvalidSecretKeyHex,
    /// When parsing a signature from string to hex
    #[error(transparent)]
    DecodingError(#[from] hex::FromHexError),
    /// The R- or S-value lies outside the curve order, is zero, or the S-value
    /// is not canonical.
    #[error("Invalid signature values: r = {r}, s = {s}")]
    InvalidValues {
        /// The signature's R-value
        r: U256,
        /// The signature's S-value
        s: U256,
    },
    /// The V-value does not encode a valid recovery id.
    #[error("Invalid V-value: {0}")]
    InvalidV(u64),
    /// The signatures of a set were produced for different chains.
    #[error("Signatures were created for different chain ids: {first:?} and {other:?}")]
    MixedChainIds {
        /// Chain id of the first signature in the set
        first: Option<u64>,
        /// The conflicting chain id
        other: Option<u64>,
    },
    /// ECDSA error
    #[error(transparent)]
    ECDSAError(#[from] k256::ecdsa::signature::Error),
    /// Elliptic curve error
    #[error(transparent)]
    EllipticCurveError(#[from] k256::elliptic_curve::Error),
    /// Error in recovering public key from signature
    #[error("Public key recovery error")]
    RecoveryError,
}

/// Trait for an ECDSA signature.
pub trait Signature {
    /// Returns the signature's R-value.
    fn r(&self) -> U256;

    /// Returns the signature's S-value.
    fn s(&self) -> U256;

    /// Returns the signature's V-value.
    fn v(&self) -> u64;
}

/// Trait for a signature with a recoverable address.
pub trait Recoverable {
    /// Recovers the public key which was used to sign the message.
    fn recover_public_key(&self, message: RecoveryMessage) -> Result<PublicKey, SignatureError>;

    /// Recovers the address which was used to sign the message.
    fn recover_address(&self, message: RecoveryMessage) -> Result<Address, SignatureError> {
        self.recover_public_key(message).map(public_key_to_address)
    }
}

/// Recovery message data.
///
/// The message data can either be a binary message that is first hashed
/// according to EIP-191 and then recovered based on the signature or a
/// precomputed hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecoveryMessage {
    /// Message bytes
    Data(Vec<u8>),
    /// Message hash
    Hash(B256),
}

impl RecoveryMessage {
    /// Returns the hash that is signed for this message.
    pub fn to_hash(&self) -> B256 {
        match self {
            RecoveryMessage::Data(data) => utils::hash_message(data),
            RecoveryMessage::Hash(hash) => *hash,
        }
    }
}

impl From<B256> for RecoveryMessage {
    fn from(hash: B256) -> Self {
        RecoveryMessage::Hash(hash)
    }
}

impl From<Vec<u8>> for RecoveryMessage {
    fn from(data: Vec<u8>) -> Self {
        RecoveryMessage::Data(data)
    }
}

/// Returns whether the provided R- and S-values form a structurally valid
/// signature. When `canonical` is set, the S-value must lie in the lower half
/// of the curve order.
pub fn is_valid_signature_values(r: &U256, s: &U256, canonical: bool) -> bool {
    if r.is_zero() || s.is_zero() {
        return false;
    }

    if canonical && *s > SECP256K1_HALF_N {
        return false;
    }

    *r < SECP256K1_N && *s < SECP256K1_N
}

/// Converts a [`PublicKey`] to an [`Address`].
pub fn public_key_to_address(public_key: PublicKey) -> Address {
    let public_key = public_key.to_encoded_point(/* compress = */ false);
    // First byte is header value
    let pk_bytes = public_key
        .as_bytes()
        .get(1..)
        .expect("uncompressed public key is 65 bytes");
    let hash = Keccak256::digest(pk_bytes);
    // Only take the lower 160 bits of the hash
    let hash_slice = hash.get(12..).expect("hash is 32 bytes");
    Address::from_slice(hash_slice)
}

/// It's dangerous to represent secret keys as native string types, because the
/// native string types have debug, display and serialization implementations
/// that can result in the secrets accidentally leaking to logs. It's marked as
/// deprecated, because it should be only created in exactly one place in the
/// production code.
#[deprecated]
pub struct DangerousSecretKeyStr<'a>(pub &'a str);

// It's marked as deprecated to be thoughtful abouts its usage.
#[allow(deprecated)]
/// Converts a hex string to a secret key.
pub fn secret_key_from_str(
    secret_key: DangerousSecretKeyStr<'_>,
) -> Result<SecretKey, SignatureError> {
    #[allow(deprecated)]
    let str_key = secret_key.0;
    let secret_key = if let Some(stripped) = str_key.strip_prefix("0x") {
        hex::decode(stripped)
    } else {
        hex::decode(str_key)
    }
    // Hex error can leak character, so use opaque one.
    .map_err(|_err| SignatureError::InvalidSecretKeyHex)?;
    let secret_key = FieldBytes::from_exact_iter(secret_key.into_iter())
        .ok_or_else(|| SignatureError::InvalidSecretKeyLength)?;
    SecretKey::from_bytes(&secret_key).map_err(SignatureError::EllipticCurveError)
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::{DangerousSecretKeyStr, SecretKey};

    pub fn dummy_secret_key() -> SecretKey {
        #[allow(deprecated)]
        super::secret_key_from_str(DangerousSecretKeyStr(
            "e331b6d69882b4cb4ea581d88e0b604039a3de5967688d3dcffdd2270c0fd109",
        ))
        .expect("valid secret key")
    }
}

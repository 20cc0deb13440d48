use alloy_rlp::{RlpDecodable, RlpDecodableWrapper, RlpEncodable, RlpEncodableWrapper};
use kaia_primitives::{B256, U256};
use k256::PublicKey;

use crate::{
    is_valid_signature_values, Recoverable as _, Signature, SignatureError,
    SignatureWithRecoveryId,
};

/// A single `(v, r, s)` entry of a transaction's signature list.
///
/// The V-value follows the replay-protected convention
/// (`recovery_id + 35 + 2 * chain_id`) for legacy and Kaia-native
/// transactions, and holds the plain Y-parity for Ethereum typed
/// transactions.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, RlpEncodable, RlpDecodable,
    serde::Deserialize, serde::Serialize,
)]
pub struct TxSignature {
    /// V value
    #[serde(rename = "V", with = "alloy_serde::quantity")]
    pub v: u64,
    /// R value
    #[serde(rename = "R")]
    pub r: U256,
    /// S value
    #[serde(rename = "S")]
    pub s: U256,
}

impl TxSignature {
    /// Returns the chain id folded into the V-value, if the signature is
    /// replay-protected.
    pub fn chain_id(&self) -> Option<u64> {
        if self.v >= 35 {
            Some((self.v - 35) / 2)
        } else {
            None
        }
    }

    /// Validates the R- and S-values. The S-value must be canonical.
    pub fn validate_values(&self) -> Result<(), SignatureError> {
        if is_valid_signature_values(&self.r, &self.s, true) {
            Ok(())
        } else {
            Err(SignatureError::InvalidValues {
                r: self.r,
                s: self.s,
            })
        }
    }

    /// Recovers the public key that signed `hash`, using the provided recovery
    /// id (0 or 1) instead of the one encoded in the V-value.
    pub fn recover_public_key(
        &self,
        hash: B256,
        recovery_id: u8,
    ) -> Result<PublicKey, SignatureError> {
        if recovery_id > 1 {
            return Err(SignatureError::InvalidV(self.v));
        }

        SignatureWithRecoveryId {
            r: self.r,
            s: self.s,
            v: 27 + u64::from(recovery_id),
        }
        .recover_public_key(hash.into())
    }
}

impl Signature for TxSignature {
    fn r(&self) -> U256 {
        self.r
    }

    fn s(&self) -> U256 {
        self.s
    }

    fn v(&self) -> u64 {
        self.v
    }
}

/// An ordered list of signatures. Kaia-native transactions may carry several
/// (one per key of a multi-sig or role-based account key), Ethereum-style
/// transactions carry exactly one.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, RlpEncodableWrapper, RlpDecodableWrapper,
    serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct TxSignatures(Vec<TxSignature>);

impl TxSignatures {
    /// Constructs a new instance from the provided signatures.
    pub fn new(signatures: Vec<TxSignature>) -> Self {
        Self(signatures)
    }

    /// Constructs a set containing a single signature.
    pub fn single(signature: TxSignature) -> Self {
        Self(vec![signature])
    }

    /// Returns the first signature, if any.
    pub fn first(&self) -> Option<&TxSignature> {
        self.0.first()
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of signatures.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the signatures as a slice.
    pub fn as_slice(&self) -> &[TxSignature] {
        &self.0
    }

    /// Appends a signature to the set.
    pub fn push(&mut self, signature: TxSignature) {
        self.0.push(signature);
    }

    /// Returns an iterator over the signatures.
    pub fn iter(&self) -> std::slice::Iter<'_, TxSignature> {
        self.0.iter()
    }

    /// Returns the inner signatures.
    pub fn into_inner(self) -> Vec<TxSignature> {
        self.0
    }

    /// Returns the chain id shared by all signatures of the set.
    ///
    /// Returns `None` for an empty set or for unprotected signatures.
    pub fn chain_id(&self) -> Option<u64> {
        self.0.first().and_then(TxSignature::chain_id)
    }

    /// Validates every signature of the set structurally and ensures that all
    /// of them were produced for the same chain.
    pub fn validate(&self) -> Result<(), SignatureError> {
        let first_chain_id = self.chain_id();

        self.0.iter().try_for_each(|signature| {
            signature.validate_values()?;

            let chain_id = signature.chain_id();
            if chain_id == first_chain_id {
                Ok(())
            } else {
                Err(SignatureError::MixedChainIds {
                    first: first_chain_id,
                    other: chain_id,
                })
            }
        })
    }
}

impl From<Vec<TxSignature>> for TxSignatures {
    fn from(signatures: Vec<TxSignature>) -> Self {
        Self(signatures)
    }
}

impl<'a> IntoIterator for &'a TxSignatures {
    type Item = &'a TxSignature;
    type IntoIter = std::slice::Iter<'a, TxSignature>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use alloy_rlp::Decodable as _;
    use kaia_primitives::keccak256;

    use super::*;
    use crate::{public_key_to_address, test_utils::dummy_secret_key, SECP256K1_N};

    fn signature_with_chain_id(chain_id: u64) -> TxSignature {
        TxSignature {
            v: 35 + 2 * chain_id,
            r: U256::from(1u64),
            s: U256::from(2u64),
        }
    }

    #[test]
    fn chain_id_from_v() {
        assert_eq!(signature_with_chain_id(8217).chain_id(), Some(8217));
        assert_eq!(
            TxSignature {
                v: 27,
                ..TxSignature::default()
            }
            .chain_id(),
            None
        );
    }

    #[test]
    fn validate_rejects_mixed_chain_ids() {
        let signatures = TxSignatures::new(vec![
            signature_with_chain_id(1001),
            signature_with_chain_id(8217),
        ]);

        assert!(matches!(
            signatures.validate(),
            Err(SignatureError::MixedChainIds {
                first: Some(1001),
                other: Some(8217)
            })
        ));
    }

    #[test]
    fn validate_rejects_invalid_values() {
        let zero_r = TxSignatures::single(TxSignature {
            r: U256::ZERO,
            ..signature_with_chain_id(1)
        });
        assert!(matches!(
            zero_r.validate(),
            Err(SignatureError::InvalidValues { .. })
        ));

        let high_s = TxSignatures::single(TxSignature {
            s: SECP256K1_N - U256::from(1u64),
            ..signature_with_chain_id(1)
        });
        assert!(matches!(
            high_s.validate(),
            Err(SignatureError::InvalidValues { .. })
        ));
    }

    #[test]
    fn rlp_round_trip() -> anyhow::Result<()> {
        let signatures = TxSignatures::new(vec![
            signature_with_chain_id(1001),
            signature_with_chain_id(1001),
        ]);

        let encoded = alloy_rlp::encode(&signatures);
        let decoded = TxSignatures::decode(&mut encoded.as_slice())?;
        assert_eq!(decoded, signatures);

        Ok(())
    }

    #[test]
    fn json_field_names() -> anyhow::Result<()> {
        let signatures = TxSignatures::single(TxSignature {
            v: 0x7f5,
            r: U256::from(0xabu64),
            s: U256::from(0xcdu64),
        });

        let json = serde_json::to_value(&signatures)?;
        assert_eq!(
            json,
            serde_json::json!([{ "V": "0x7f5", "R": "0xab", "S": "0xcd" }])
        );

        let decoded: TxSignatures = serde_json::from_value(json)?;
        assert_eq!(decoded, signatures);

        Ok(())
    }

    #[test]
    fn recover_with_explicit_recovery_id() -> anyhow::Result<()> {
        let secret_key = dummy_secret_key();
        let hash = keccak256(b"kaia");

        let signature = SignatureWithRecoveryId::new(hash, &secret_key)?;
        let recovery_id = signature.recovery_id()?;
        let tx_signature = TxSignature {
            v: 35 + 2 * 1001 + u64::from(recovery_id),
            r: signature.r,
            s: signature.s,
        };

        let public_key = tx_signature.recover_public_key(hash, recovery_id)?;
        assert_eq!(
            public_key_to_address(public_key),
            public_key_to_address(secret_key.public_key())
        );

        Ok(())
    }
}

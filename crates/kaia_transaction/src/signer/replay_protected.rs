use kaia_primitives::B256;
use kaia_signer::{PublicKey, SignatureWithRecoveryId, TxSignature};

use super::{
    ensure_supported, first_signature, legacy_signature_values, recover_all_replay_protected,
    recover_replay_protected, HomesteadSigner, Signer, SignerCapabilities, SignerError,
    SigningScheme, SupportedTypes,
};
use crate::{Signed, TransactionVariant as _};

/// Signer enforcing EIP-155 replay protection.
///
/// Handles legacy transactions, with or without a chain id folded into the
/// V-value, and every Kaia-native type. All signatures of a native
/// transaction must commit to the signer's chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayProtectedSigner {
    chain_id: u64,
}

impl ReplayProtectedSigner {
    /// Constructs a signer for the provided chain.
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }
}

impl Signer for ReplayProtectedSigner {
    fn capabilities(&self) -> SignerCapabilities {
        SignerCapabilities {
            chain_id: Some(self.chain_id),
            scheme: SigningScheme::ReplayProtected,
            supported_types: SupportedTypes::replay_protected(),
        }
    }

    fn signing_hash(&self, transaction: &Signed) -> Result<B256, SignerError> {
        ensure_supported(&self.capabilities(), transaction)?;

        Ok(transaction.signing_hash(Some(self.chain_id)))
    }

    fn fee_payer_signing_hash(&self, transaction: &Signed) -> Result<B256, SignerError> {
        ensure_supported(&self.capabilities(), transaction)?;

        transaction
            .as_fee_payer_bearing()
            .map(|transaction| transaction.fee_payer_signing_hash(self.chain_id))
            .ok_or(SignerError::NotFeeDelegated)
    }

    fn sender_public_keys(&self, transaction: &Signed) -> Result<Vec<PublicKey>, SignerError> {
        ensure_supported(&self.capabilities(), transaction)?;

        if transaction.is_legacy() {
            let signature = first_signature(transaction)?;
            if signature.chain_id().is_none() {
                return HomesteadSigner.sender_public_keys(transaction);
            }

            let hash = transaction.signing_hash(Some(self.chain_id));
            return Ok(vec![recover_replay_protected(
                hash,
                signature,
                self.chain_id,
            )?]);
        }

        recover_all_replay_protected(
            transaction.signing_hash(Some(self.chain_id)),
            transaction.signatures(),
            self.chain_id,
        )
    }

    fn fee_payer_public_keys(
        &self,
        transaction: &Signed,
    ) -> Result<Vec<PublicKey>, SignerError> {
        ensure_supported(&self.capabilities(), transaction)?;

        let transaction = transaction
            .as_fee_payer_bearing()
            .ok_or(SignerError::NotFeeDelegated)?;

        recover_all_replay_protected(
            transaction.fee_payer_signing_hash(self.chain_id),
            transaction.fee_payer_signatures().as_slice(),
            self.chain_id,
        )
    }

    fn signature_values(
        &self,
        transaction: &Signed,
        signature: &SignatureWithRecoveryId,
    ) -> Result<TxSignature, SignerError> {
        ensure_supported(&self.capabilities(), transaction)?;

        legacy_signature_values(signature, Some(self.chain_id))
    }
}

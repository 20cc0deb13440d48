use kaia_primitives::B256;
use kaia_signer::{PublicKey, SignatureError, SignatureWithRecoveryId, TxSignature};

use super::{
    ensure_supported, first_signature, ReplayProtectedSigner, Signer, SignerCapabilities,
    SignerError, SigningScheme, SupportedTypes,
};
use crate::{Signed, TransactionType, TransactionVariant as _};

/// Signer for Ethereum typed transactions. Delegates legacy and Kaia-native
/// transactions to an embedded [`ReplayProtectedSigner`].
///
/// Ethereum typed transactions carry their own chain id, which must match the
/// signer's. Their V-value is the plain Y-parity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypedSigner {
    replay_protected: ReplayProtectedSigner,
    chain_id: u64,
    supported_types: SupportedTypes,
}

impl TypedSigner {
    fn new(chain_id: u64, typed: &[TransactionType]) -> Self {
        let supported_types = typed
            .iter()
            .copied()
            .fold(SupportedTypes::replay_protected(), SupportedTypes::with);

        Self {
            replay_protected: ReplayProtectedSigner::new(chain_id),
            chain_id,
            supported_types,
        }
    }

    /// Accepts access-list transactions.
    pub fn berlin(chain_id: u64) -> Self {
        Self::new(chain_id, &[TransactionType::EthereumAccessList])
    }

    /// Also accepts dynamic-fee transactions.
    pub fn london(chain_id: u64) -> Self {
        Self::new(
            chain_id,
            &[
                TransactionType::EthereumAccessList,
                TransactionType::EthereumDynamicFee,
            ],
        )
    }

    /// Also accepts blob transactions.
    pub fn cancun(chain_id: u64) -> Self {
        Self::new(
            chain_id,
            &[
                TransactionType::EthereumAccessList,
                TransactionType::EthereumDynamicFee,
                TransactionType::EthereumBlob,
            ],
        )
    }

    /// Also accepts set-code transactions.
    pub fn prague(chain_id: u64) -> Self {
        Self::new(
            chain_id,
            &[
                TransactionType::EthereumAccessList,
                TransactionType::EthereumDynamicFee,
                TransactionType::EthereumBlob,
                TransactionType::EthereumSetCode,
            ],
        )
    }

    fn ensure_chain_id(&self, transaction: &Signed) -> Result<(), SignerError> {
        let actual = transaction.chain_id();
        if actual == Some(self.chain_id) {
            Ok(())
        } else {
            Err(SignerError::InvalidChainId {
                expected: self.chain_id,
                actual,
            })
        }
    }
}

impl Signer for TypedSigner {
    fn capabilities(&self) -> SignerCapabilities {
        SignerCapabilities {
            chain_id: Some(self.chain_id),
            scheme: SigningScheme::Typed,
            supported_types: self.supported_types,
        }
    }

    fn signing_hash(&self, transaction: &Signed) -> Result<B256, SignerError> {
        ensure_supported(&self.capabilities(), transaction)?;

        if transaction.as_ethereum_typed().is_none() {
            return self.replay_protected.signing_hash(transaction);
        }

        self.ensure_chain_id(transaction)?;
        Ok(transaction.signing_hash(None))
    }

    fn fee_payer_signing_hash(&self, transaction: &Signed) -> Result<B256, SignerError> {
        ensure_supported(&self.capabilities(), transaction)?;

        if transaction.as_ethereum_typed().is_none() {
            return self.replay_protected.fee_payer_signing_hash(transaction);
        }

        Err(SignerError::NotFeeDelegated)
    }

    fn sender_public_keys(&self, transaction: &Signed) -> Result<Vec<PublicKey>, SignerError> {
        ensure_supported(&self.capabilities(), transaction)?;

        if transaction.as_ethereum_typed().is_none() {
            return self.replay_protected.sender_public_keys(transaction);
        }

        self.ensure_chain_id(transaction)?;

        let signature = first_signature(transaction)?;
        let recovery_id =
            u8::try_from(signature.v).map_err(|_error| SignatureError::InvalidV(signature.v))?;
        signature.validate_values()?;

        let public_key = signature.recover_public_key(transaction.signing_hash(None), recovery_id)?;
        Ok(vec![public_key])
    }

    fn fee_payer_public_keys(
        &self,
        transaction: &Signed,
    ) -> Result<Vec<PublicKey>, SignerError> {
        ensure_supported(&self.capabilities(), transaction)?;

        if transaction.as_ethereum_typed().is_none() {
            return self.replay_protected.fee_payer_public_keys(transaction);
        }

        Err(SignerError::NotFeeDelegated)
    }

    fn signature_values(
        &self,
        transaction: &Signed,
        signature: &SignatureWithRecoveryId,
    ) -> Result<TxSignature, SignerError> {
        ensure_supported(&self.capabilities(), transaction)?;

        if transaction.as_ethereum_typed().is_none() {
            return self
                .replay_protected
                .signature_values(transaction, signature);
        }

        self.ensure_chain_id(transaction)?;

        Ok(TxSignature {
            v: u64::from(signature.recovery_id()?),
            r: signature.r,
            s: signature.s,
        })
    }
}

#[cfg(test)]
mod tests {
    use kaia_eip2930::AccessList;
    use kaia_primitives::{Address, Bytes, TxKind, U256};
    use kaia_test_utils::secret_key::{secret_key_from_str, secret_key_to_address, TEST_SECRET_KEYS};

    use super::*;
    use crate::signed::Eip1559;

    fn dummy_eip1559(chain_id: u64) -> Signed {
        Signed::Eip1559(Eip1559 {
            chain_id,
            nonce: 0,
            max_priority_fee_per_gas: 1_000_000_000,
            max_fee_per_gas: 50_000_000_000,
            gas_limit: 21_000,
            kind: TxKind::Call(Address::repeat_byte(0x44)),
            value: U256::from(5u64),
            input: Bytes::new(),
            access_list: AccessList::default(),
            signature: TxSignature::default(),
        })
    }

    #[test]
    fn sign_and_recover() -> anyhow::Result<()> {
        let secret_key = secret_key_from_str(TEST_SECRET_KEYS[2])?;
        let expected = secret_key_to_address(TEST_SECRET_KEYS[2])?;

        let signer = TypedSigner::london(1001);
        let mut transaction = dummy_eip1559(1001);
        transaction.sign_with_keys(&signer, std::slice::from_ref(&secret_key))?;

        assert!(transaction.signatures()[0].v <= 1);
        assert_eq!(signer.sender(&transaction)?, expected);

        Ok(())
    }

    #[test]
    fn chain_id_mismatch() -> anyhow::Result<()> {
        let secret_key = secret_key_from_str(TEST_SECRET_KEYS[2])?;

        let mut transaction = dummy_eip1559(1001);
        let result = transaction.sign_with_keys(
            &TypedSigner::london(8217),
            std::slice::from_ref(&secret_key),
        );
        assert!(matches!(
            result,
            Err(SignerError::InvalidChainId {
                expected: 8217,
                actual: Some(1001)
            })
        ));

        transaction.sign_with_keys(&TypedSigner::london(1001), std::slice::from_ref(&secret_key))?;
        let result = TypedSigner::london(8217).sender(&transaction);
        assert!(matches!(
            result,
            Err(SignerError::InvalidChainId {
                expected: 8217,
                actual: Some(1001)
            })
        ));

        Ok(())
    }

    #[test]
    fn berlin_rejects_dynamic_fee() {
        let transaction = dummy_eip1559(1001);

        let result = TypedSigner::berlin(1001).sender(&transaction);
        assert!(matches!(
            result,
            Err(SignerError::UnsupportedTransactionType(
                TransactionType::EthereumDynamicFee
            ))
        ));
    }
}

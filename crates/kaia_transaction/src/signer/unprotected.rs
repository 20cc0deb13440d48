use kaia_primitives::B256;
use kaia_signer::{PublicKey, SignatureWithRecoveryId, TxSignature};

use super::{
    ensure_supported, first_signature, legacy_signature_values, recover_unprotected, Signer,
    SignerCapabilities, SignerError, SigningScheme, SupportedTypes,
};
use crate::{Signed, TransactionVariant as _};

/// Signer for legacy transactions before Homestead. Accepts S-values from
/// the upper half of the curve order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnprotectedSigner;

/// Signer for legacy transactions from Homestead until replay protection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HomesteadSigner;

fn capabilities(scheme: SigningScheme) -> SignerCapabilities {
    SignerCapabilities {
        chain_id: None,
        scheme,
        supported_types: SupportedTypes::legacy(),
    }
}

fn sender_public_keys(
    capabilities: &SignerCapabilities,
    transaction: &Signed,
    canonical: bool,
) -> Result<Vec<PublicKey>, SignerError> {
    ensure_supported(capabilities, transaction)?;

    let signature = first_signature(transaction)?;
    let public_key = recover_unprotected(transaction.signing_hash(None), signature, canonical)?;

    Ok(vec![public_key])
}

/// Implements [`Signer`] for a legacy-only signer.
macro_rules! impl_unprotected_signer {
    ($signer:ty, $scheme:expr, canonical = $canonical:expr) => {
        impl Signer for $signer {
            fn capabilities(&self) -> SignerCapabilities {
                capabilities($scheme)
            }

            fn signing_hash(&self, transaction: &Signed) -> Result<B256, SignerError> {
                ensure_supported(&self.capabilities(), transaction)?;

                Ok(transaction.signing_hash(None))
            }

            fn fee_payer_signing_hash(&self, transaction: &Signed) -> Result<B256, SignerError> {
                ensure_supported(&self.capabilities(), transaction)?;

                Err(SignerError::NotFeeDelegated)
            }

            fn sender_public_keys(
                &self,
                transaction: &Signed,
            ) -> Result<Vec<PublicKey>, SignerError> {
                sender_public_keys(&self.capabilities(), transaction, $canonical)
            }

            fn fee_payer_public_keys(
                &self,
                transaction: &Signed,
            ) -> Result<Vec<PublicKey>, SignerError> {
                ensure_supported(&self.capabilities(), transaction)?;

                Err(SignerError::NotFeeDelegated)
            }

            fn signature_values(
                &self,
                transaction: &Signed,
                signature: &SignatureWithRecoveryId,
            ) -> Result<TxSignature, SignerError> {
                ensure_supported(&self.capabilities(), transaction)?;

                legacy_signature_values(signature, None)
            }
        }
    };
}

impl_unprotected_signer!(UnprotectedSigner, SigningScheme::Unprotected, canonical = false);
impl_unprotected_signer!(HomesteadSigner, SigningScheme::Homestead, canonical = true);

#[cfg(test)]
mod tests {
    use kaia_primitives::{Address, Bytes, TxKind, U256};
    use kaia_signer::SECP256K1_N;
    use kaia_test_utils::secret_key::{secret_key_from_str, secret_key_to_address, TEST_SECRET_KEYS};

    use super::*;
    use crate::signed::Legacy;

    #[test]
    fn high_s_is_accepted_before_homestead() -> anyhow::Result<()> {
        let secret_key = secret_key_from_str(TEST_SECRET_KEYS[1])?;
        let expected = secret_key_to_address(TEST_SECRET_KEYS[1])?;

        let mut transaction = Signed::Legacy(Legacy {
            nonce: 7,
            gas_price: 1_000_000_000,
            gas_limit: 30_000,
            kind: TxKind::Call(Address::repeat_byte(0x33)),
            value: U256::ZERO,
            input: Bytes::from_static(&[0xca, 0xfe]),
            signature: TxSignature::default(),
        });
        transaction.sign_with_keys(&UnprotectedSigner, std::slice::from_ref(&secret_key))?;

        // Flip to the equivalent signature with a high S-value.
        let Signed::Legacy(legacy) = &mut transaction else {
            unreachable!("constructed as legacy");
        };
        legacy.signature.s = SECP256K1_N - legacy.signature.s;
        legacy.signature.v = if legacy.signature.v == 27 { 28 } else { 27 };

        assert_eq!(UnprotectedSigner.sender(&transaction)?, expected);

        let result = HomesteadSigner.sender(&transaction);
        assert!(matches!(result, Err(SignerError::InvalidSignature(_))));

        Ok(())
    }
}

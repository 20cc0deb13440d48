mod replay_protected;
mod typed;
mod unprotected;

use auto_impl::auto_impl;
use kaia_chain_config::ChainConfig;
use kaia_primitives::{Address, B256};
use kaia_signer::{
    public_key_to_address, PublicKey, SignatureError, SignatureWithRecoveryId, TxSignature,
};

pub use self::{
    replay_protected::ReplayProtectedSigner,
    typed::TypedSigner,
    unprotected::{HomesteadSigner, UnprotectedSigner},
};
use crate::{Signed, TransactionType, TransactionVariant as _};

/// Error signing a transaction or recovering its signers.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// The signer does not handle the transaction's type.
    #[error("Transaction type {0} is not supported by the signer")]
    UnsupportedTransactionType(TransactionType),
    /// The transaction or its signatures commit to a different chain.
    #[error("Invalid chain id: expected {expected}, got {actual:?}")]
    InvalidChainId {
        /// The signer's chain id
        expected: u64,
        /// The chain id of the transaction, if any
        actual: Option<u64>,
    },
    /// A signature is malformed or recovery failed.
    #[error(transparent)]
    InvalidSignature(#[from] SignatureError),
    /// The transaction carries no signatures to recover from.
    #[error("Transaction is not signed")]
    MissingSignature,
    /// A fee payer operation was requested for a transaction that is not
    /// fee-delegated.
    #[error("Transaction is not fee-delegated")]
    NotFeeDelegated,
    /// The number of signatures does not fit the transaction type.
    #[error("Expected {expected} signature(s), got {actual}")]
    InvalidKeyCount {
        /// The number of signatures the type accepts
        expected: usize,
        /// The number of signatures provided
        actual: usize,
    },
}

/// The rule a signer applies to V-values and signing hashes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SigningScheme {
    /// Pre-Homestead legacy signatures; high S-values are accepted
    Unprotected,
    /// Legacy signatures with canonical S-values
    Homestead,
    /// EIP-155 replay protection, which also covers Kaia-native types
    ReplayProtected,
    /// EIP-2718 typed transactions on top of replay protection
    Typed,
}

/// A set of transaction types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SupportedTypes(u32);

impl SupportedTypes {
    /// Constructs an empty set.
    pub fn empty() -> Self {
        Self(0)
    }

    /// Returns the set extended by the provided type.
    pub fn with(self, transaction_type: TransactionType) -> Self {
        Self(self.0 | (1 << transaction_type.index()))
    }

    /// Whether the set contains the provided type.
    pub fn contains(&self, transaction_type: TransactionType) -> bool {
        self.0 & (1 << transaction_type.index()) != 0
    }

    /// Returns the types of the set, in discriminant order.
    pub fn iter(&self) -> impl Iterator<Item = TransactionType> + '_ {
        TransactionType::ALL
            .into_iter()
            .filter(|transaction_type| self.contains(*transaction_type))
    }

    /// Legacy only.
    pub fn legacy() -> Self {
        Self::empty().with(TransactionType::Legacy)
    }

    /// Legacy and every Kaia-native type.
    pub fn replay_protected() -> Self {
        TransactionType::ALL
            .into_iter()
            .filter(TransactionType::is_native)
            .fold(Self::legacy(), Self::with)
    }
}

impl FromIterator<TransactionType> for SupportedTypes {
    fn from_iter<IterT: IntoIterator<Item = TransactionType>>(iter: IterT) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

/// Identifies what a signer accepts. Two signers with equal capabilities
/// recover identical senders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SignerCapabilities {
    /// The chain id the signer enforces, if any
    pub chain_id: Option<u64>,
    /// The V-value and hashing rule
    pub scheme: SigningScheme,
    /// The transaction types the signer handles
    pub supported_types: SupportedTypes,
}

/// A signing scheme: computes the hashes that are signed and recovers the
/// public keys behind a transaction's signatures.
#[auto_impl(&, Box, Arc)]
pub trait Signer {
    /// Returns what the signer accepts.
    fn capabilities(&self) -> SignerCapabilities;

    /// Returns the chain id the signer enforces, if any.
    fn chain_id(&self) -> Option<u64> {
        self.capabilities().chain_id
    }

    /// Whether the signer handles the provided transaction type.
    fn supports(&self, transaction_type: TransactionType) -> bool {
        self.capabilities().supported_types.contains(transaction_type)
    }

    /// Computes the hash the sender signs.
    fn signing_hash(&self, transaction: &Signed) -> Result<B256, SignerError>;

    /// Computes the hash the fee payer signs.
    fn fee_payer_signing_hash(&self, transaction: &Signed) -> Result<B256, SignerError>;

    /// Recovers the public key behind each of the sender's signatures, in
    /// order.
    fn sender_public_keys(&self, transaction: &Signed) -> Result<Vec<PublicKey>, SignerError>;

    /// Recovers the public key behind each of the fee payer's signatures, in
    /// order.
    fn fee_payer_public_keys(&self, transaction: &Signed)
    -> Result<Vec<PublicKey>, SignerError>;

    /// Returns the transaction's sender.
    ///
    /// Kaia-native transactions declare their sender, which is returned once
    /// every signature recovered. Whether the recovered keys are allowed to
    /// sign for that account is up to the account-key engine. Other
    /// transactions are sent by the address of the recovered key.
    fn sender(&self, transaction: &Signed) -> Result<Address, SignerError> {
        let public_keys = self.sender_public_keys(transaction)?;
        sender_from_public_keys(transaction, &public_keys)
    }

    /// Converts a raw signature into the `(v, r, s)` values the transaction
    /// stores.
    fn signature_values(
        &self,
        transaction: &Signed,
        signature: &SignatureWithRecoveryId,
    ) -> Result<TxSignature, SignerError>;

    /// Whether both signers recover identical senders.
    fn equal(&self, other: &dyn Signer) -> bool {
        self.capabilities() == other.capabilities()
    }
}

/// One of the signers the network has used over its hardforks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnySigner {
    Unprotected(UnprotectedSigner),
    Homestead(HomesteadSigner),
    ReplayProtected(ReplayProtectedSigner),
    Typed(TypedSigner),
}

macro_rules! for_each_signer {
    ($signer:expr, $binding:ident => $body:expr) => {
        match $signer {
            AnySigner::Unprotected($binding) => $body,
            AnySigner::Homestead($binding) => $body,
            AnySigner::ReplayProtected($binding) => $body,
            AnySigner::Typed($binding) => $body,
        }
    };
}

impl Signer for AnySigner {
    fn capabilities(&self) -> SignerCapabilities {
        for_each_signer!(self, signer => signer.capabilities())
    }

    fn signing_hash(&self, transaction: &Signed) -> Result<B256, SignerError> {
        for_each_signer!(self, signer => signer.signing_hash(transaction))
    }

    fn fee_payer_signing_hash(&self, transaction: &Signed) -> Result<B256, SignerError> {
        for_each_signer!(self, signer => signer.fee_payer_signing_hash(transaction))
    }

    fn sender_public_keys(&self, transaction: &Signed) -> Result<Vec<PublicKey>, SignerError> {
        for_each_signer!(self, signer => signer.sender_public_keys(transaction))
    }

    fn fee_payer_public_keys(
        &self,
        transaction: &Signed,
    ) -> Result<Vec<PublicKey>, SignerError> {
        for_each_signer!(self, signer => signer.fee_payer_public_keys(transaction))
    }

    fn signature_values(
        &self,
        transaction: &Signed,
        signature: &SignatureWithRecoveryId,
    ) -> Result<TxSignature, SignerError> {
        for_each_signer!(self, signer => signer.signature_values(transaction, signature))
    }
}

/// Selects the signer for the provided block. The selection depends only on
/// the chain configuration and the block number.
pub fn make_signer(config: &ChainConfig, block_number: u64) -> AnySigner {
    let rules = config.rules(block_number);
    let chain_id = config.chain_id;

    if rules.is_prague {
        AnySigner::Typed(TypedSigner::prague(chain_id))
    } else if rules.is_cancun {
        AnySigner::Typed(TypedSigner::cancun(chain_id))
    } else if rules.is_eth_tx_type {
        AnySigner::Typed(TypedSigner::london(chain_id))
    } else if rules.is_eip155 {
        AnySigner::ReplayProtected(ReplayProtectedSigner::new(chain_id))
    } else if rules.is_homestead {
        AnySigner::Homestead(HomesteadSigner)
    } else {
        AnySigner::Unprotected(UnprotectedSigner)
    }
}

/// Returns the most permissive signer for the provided chain. Intended for
/// tooling that handles transactions independently of a block.
pub fn latest_signer_for_chain_id(chain_id: u64) -> AnySigner {
    AnySigner::Typed(TypedSigner::prague(chain_id))
}

/// Determines the sender from the public keys recovered for `transaction`.
pub(crate) fn sender_from_public_keys(
    transaction: &Signed,
    public_keys: &[PublicKey],
) -> Result<Address, SignerError> {
    if let Some(sender) = transaction.declared_sender() {
        return Ok(sender);
    }

    public_keys
        .first()
        .copied()
        .map(public_key_to_address)
        .ok_or(SignerError::MissingSignature)
}

fn ensure_supported(
    capabilities: &SignerCapabilities,
    transaction: &Signed,
) -> Result<(), SignerError> {
    let transaction_type = transaction.transaction_type();
    if capabilities.supported_types.contains(transaction_type) {
        Ok(())
    } else {
        Err(SignerError::UnsupportedTransactionType(transaction_type))
    }
}

fn first_signature(transaction: &Signed) -> Result<&TxSignature, SignerError> {
    transaction
        .signatures()
        .first()
        .ok_or(SignerError::MissingSignature)
}

/// Recovers a signature whose V-value is `27` or `28`.
fn recover_unprotected(
    hash: B256,
    signature: &TxSignature,
    canonical: bool,
) -> Result<PublicKey, SignerError> {
    let recovery_id = match signature.v {
        27 => 0,
        28 => 1,
        v => return Err(SignatureError::InvalidV(v).into()),
    };

    if !kaia_signer::is_valid_signature_values(&signature.r, &signature.s, canonical) {
        return Err(SignatureError::InvalidValues {
            r: signature.r,
            s: signature.s,
        }
        .into());
    }

    Ok(signature.recover_public_key(hash, recovery_id)?)
}

/// Recovers a signature whose V-value folds in `chain_id`.
fn recover_replay_protected(
    hash: B256,
    signature: &TxSignature,
    chain_id: u64,
) -> Result<PublicKey, SignerError> {
    let actual = signature.chain_id();
    if actual != Some(chain_id) {
        return Err(SignerError::InvalidChainId {
            expected: chain_id,
            actual,
        });
    }

    signature.validate_values()?;

    let recovery_id = signature
        .v
        .saturating_sub(35)
        .saturating_sub(chain_id.saturating_mul(2));
    let recovery_id =
        u8::try_from(recovery_id).map_err(|_error| SignatureError::InvalidV(signature.v))?;

    Ok(signature.recover_public_key(hash, recovery_id)?)
}

/// Recovers every signature of a Kaia-native signature list.
fn recover_all_replay_protected(
    hash: B256,
    signatures: &[TxSignature],
    chain_id: u64,
) -> Result<Vec<PublicKey>, SignerError> {
    if signatures.is_empty() {
        return Err(SignerError::MissingSignature);
    }

    signatures
        .iter()
        .map(|signature| recover_replay_protected(hash, signature, chain_id))
        .collect()
}

/// Converts a raw signature into the legacy V-value convention, folding in
/// the chain id when provided.
fn legacy_signature_values(
    signature: &SignatureWithRecoveryId,
    chain_id: Option<u64>,
) -> Result<TxSignature, SignerError> {
    let recovery_id = u64::from(signature.recovery_id()?);
    let v = match chain_id {
        Some(chain_id) => chain_id
            .checked_mul(2)
            .and_then(|doubled| doubled.checked_add(35 + recovery_id))
            .ok_or(SignatureError::InvalidV(signature.v))?,
        None => 27 + recovery_id,
    };

    Ok(TxSignature {
        v,
        r: signature.r,
        s: signature.s,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use kaia_chain_config::{HardforkActivation, HardforkActivations, Hardfork};
    use kaia_primitives::{TxKind, U256};
    use kaia_signer::TxSignatures;
    use kaia_test_utils::secret_key::{secret_key_from_str, secret_key_to_address, TEST_SECRET_KEYS};

    use super::*;
    use crate::{
        signed::{Basic, Legacy, Native, ValueTransfer, ValueTransferFields},
        Bytes,
    };

    fn dummy_legacy() -> Signed {
        Signed::Legacy(Legacy {
            nonce: 0,
            gas_price: 25_000_000_000,
            gas_limit: 21_000,
            kind: TxKind::Call(Address::repeat_byte(0x11)),
            value: U256::from(1u64),
            input: Bytes::new(),
            signature: TxSignature::default(),
        })
    }

    fn dummy_value_transfer(from: Address) -> Signed {
        Signed::ValueTransfer(Native {
            nonce: 3,
            gas_price: 25_000_000_000,
            gas_limit: 21_000,
            fields: ValueTransferFields {
                to: Address::repeat_byte(0x22),
                value: U256::from(10u64),
                from,
            },
            signatures: TxSignatures::default(),
            fee: Basic,
        })
    }

    fn staged_config() -> ChainConfig {
        ChainConfig {
            name: "staged".to_string(),
            chain_id: 1001,
            hardfork_activations: HardforkActivations::new(vec![
                HardforkActivation {
                    block_number: 0,
                    hardfork: Hardfork::Frontier,
                },
                HardforkActivation {
                    block_number: 10,
                    hardfork: Hardfork::Homestead,
                },
                HardforkActivation {
                    block_number: 20,
                    hardfork: Hardfork::SpuriousDragon,
                },
                HardforkActivation {
                    block_number: 30,
                    hardfork: Hardfork::EthTxType,
                },
                HardforkActivation {
                    block_number: 40,
                    hardfork: Hardfork::Cancun,
                },
                HardforkActivation {
                    block_number: 50,
                    hardfork: Hardfork::Prague,
                },
            ]),
        }
    }

    #[test]
    fn signer_selection_follows_hardforks() {
        let config = staged_config();

        let schemes = [0, 10, 20, 30, 40, 50].map(|block_number| {
            make_signer(&config, block_number).capabilities().scheme
        });
        assert_eq!(
            schemes,
            [
                SigningScheme::Unprotected,
                SigningScheme::Homestead,
                SigningScheme::ReplayProtected,
                SigningScheme::Typed,
                SigningScheme::Typed,
                SigningScheme::Typed,
            ]
        );

        let london = make_signer(&config, 30);
        assert!(london.supports(TransactionType::EthereumDynamicFee));
        assert!(!london.supports(TransactionType::EthereumBlob));

        let prague = make_signer(&config, 55);
        assert!(prague.supports(TransactionType::EthereumSetCode));
        assert!(prague.supports(TransactionType::FeeDelegatedCancelWithRatio));
    }

    #[test]
    fn signer_selection_is_pure() {
        let config = staged_config();

        for block_number in [0, 15, 25, 35, 45, 55] {
            let first = make_signer(&config, block_number);
            let second = make_signer(&config, block_number);
            assert!(first.equal(&second));
        }

        assert!(!make_signer(&config, 25).equal(&make_signer(&config, 35)));
        assert!(latest_signer_for_chain_id(1001).equal(&make_signer(&config, 50)));
        assert!(!latest_signer_for_chain_id(1).equal(&make_signer(&config, 50)));
    }

    #[test]
    fn supported_types_replay_protected() {
        let supported = SupportedTypes::replay_protected();

        assert!(supported.contains(TransactionType::Legacy));
        assert!(supported.contains(TransactionType::ChainDataAnchoring));
        assert!(!supported.contains(TransactionType::EthereumAccessList));
        assert_eq!(supported.iter().count(), 22);
    }

    #[test]
    fn eip155_legacy_vectors() -> anyhow::Result<()> {
        let expected = Address::from_str("0x2efc0b963da6f672254b4e5eea754551fe191fd6")?;
        let signer = ReplayProtectedSigner::new(4);

        for encoded in [
            "f86b02843b9aca00830186a094d3e8763675e4c425df46cc3b5c0f6cbdac39604687038d7ea4c68000802ba00eb96ca19e8a77102767a41fc85a36afd5c61ccb09911cec5d3e86e193d9c5aea03a456401896b1b6055311536bf00a718568c744d8c1f9df59879e8350220ca18",
            "f86b01843b9aca00830186a094d3e8763675e4c425df46cc3b5c0f6cbdac3960468702769bb01b2a00802ba0e24d8bd32ad906d6f8b8d7741e08d1959df021698b19ee232feba15361587d0aa05406ad177223213df262cb66ccbb2f46bfdccfdfbbb5ffdda9e2c02d977631da",
            "f86b0384773594008398968094d3e8763675e4c425df46cc3b5c0f6cbdac39604687038d7ea4c68000802ba0ce6834447c0a4193c40382e6c57ae33b241379c5418caac9cdc18d786fd12071a03ca3ae86580e94550d7c071e3a02eadb5a77830947c9225165cf9100901bee88",
        ] {
            let bytes = hex::decode(encoded)?;
            let transaction = <Signed as alloy_rlp::Decodable>::decode(&mut bytes.as_slice())?;

            assert_eq!(signer.sender(&transaction)?, expected);

            let result = ReplayProtectedSigner::new(5).sender(&transaction);
            assert!(matches!(
                result,
                Err(SignerError::InvalidChainId {
                    expected: 5,
                    actual: Some(4)
                })
            ));
        }

        Ok(())
    }

    #[test]
    fn legacy_sign_and_recover() -> anyhow::Result<()> {
        let secret_key = secret_key_from_str(TEST_SECRET_KEYS[0])?;
        let expected = secret_key_to_address(TEST_SECRET_KEYS[0])?;

        let signers = [
            AnySigner::Unprotected(UnprotectedSigner),
            AnySigner::Homestead(HomesteadSigner),
            AnySigner::ReplayProtected(ReplayProtectedSigner::new(1001)),
            latest_signer_for_chain_id(1001),
        ];

        for signer in signers {
            let mut transaction = dummy_legacy();
            transaction.sign_with_keys(&signer, std::slice::from_ref(&secret_key))?;

            assert_eq!(signer.sender(&transaction)?, expected);
        }

        Ok(())
    }

    #[test]
    fn unprotected_legacy_recovers_under_replay_protection() -> anyhow::Result<()> {
        let secret_key = secret_key_from_str(TEST_SECRET_KEYS[0])?;
        let expected = secret_key_to_address(TEST_SECRET_KEYS[0])?;

        let mut transaction = dummy_legacy();
        transaction.sign_with_keys(&HomesteadSigner, std::slice::from_ref(&secret_key))?;
        assert!(transaction.signatures()[0].v < 35);

        let signer = ReplayProtectedSigner::new(1001);
        assert_eq!(signer.sender(&transaction)?, expected);

        Ok(())
    }

    #[test]
    fn unprotected_signer_rejects_replay_protected_legacy() -> anyhow::Result<()> {
        let secret_key = secret_key_from_str(TEST_SECRET_KEYS[0])?;

        let mut transaction = dummy_legacy();
        transaction.sign_with_keys(
            &ReplayProtectedSigner::new(1001),
            std::slice::from_ref(&secret_key),
        )?;

        let result = HomesteadSigner.sender(&transaction);
        assert!(matches!(
            result,
            Err(SignerError::InvalidSignature(SignatureError::InvalidV(_)))
        ));

        Ok(())
    }

    #[test]
    fn native_chain_id_mismatch() -> anyhow::Result<()> {
        let secret_key = secret_key_from_str(TEST_SECRET_KEYS[0])?;
        let sender = secret_key_to_address(TEST_SECRET_KEYS[0])?;

        let mut transaction = dummy_value_transfer(sender);
        transaction.sign_with_keys(
            &latest_signer_for_chain_id(1001),
            std::slice::from_ref(&secret_key),
        )?;

        assert_eq!(latest_signer_for_chain_id(1001).sender(&transaction)?, sender);

        let result = latest_signer_for_chain_id(8217).sender(&transaction);
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
    fn native_multisig_round_trip() -> anyhow::Result<()> {
        let secret_keys = TEST_SECRET_KEYS
            .iter()
            .map(|secret_key| secret_key_from_str(secret_key))
            .collect::<Result<Vec<_>, _>>()?;
        let addresses = TEST_SECRET_KEYS
            .iter()
            .map(|secret_key| secret_key_to_address(secret_key))
            .collect::<Result<Vec<_>, _>>()?;

        // The declared sender need not derive from any of the keys.
        let declared = Address::repeat_byte(0xaa);
        let mut transaction = dummy_value_transfer(declared);

        let signer = ReplayProtectedSigner::new(1001);
        transaction.sign_with_keys(&signer, &secret_keys)?;
        assert_eq!(transaction.signatures().len(), 3);

        let recovered = signer
            .sender_public_keys(&transaction)?
            .into_iter()
            .map(public_key_to_address)
            .collect::<Vec<_>>();
        assert_eq!(recovered, addresses);
        assert_eq!(signer.sender(&transaction)?, declared);

        Ok(())
    }

    #[test]
    fn unsigned_native_is_rejected() {
        let transaction = dummy_value_transfer(Address::repeat_byte(0xaa));

        let result = ReplayProtectedSigner::new(1001).sender(&transaction);
        assert!(matches!(result, Err(SignerError::MissingSignature)));
    }

    #[test]
    fn fee_payer_of_basic_transaction() {
        let transaction = dummy_value_transfer(Address::repeat_byte(0xaa));

        let signer = latest_signer_for_chain_id(1001);
        assert!(matches!(
            signer.fee_payer_signing_hash(&transaction),
            Err(SignerError::NotFeeDelegated)
        ));
        assert!(matches!(
            signer.fee_payer_public_keys(&transaction),
            Err(SignerError::NotFeeDelegated)
        ));
    }

    #[test]
    fn unsupported_type() {
        let transaction = dummy_value_transfer(Address::repeat_byte(0xaa));

        let result = HomesteadSigner.signing_hash(&transaction);
        assert!(matches!(
            result,
            Err(SignerError::UnsupportedTransactionType(
                TransactionType::ValueTransfer
            ))
        ));
    }
}

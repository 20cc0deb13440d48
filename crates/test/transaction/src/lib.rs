//! Test utilities for transaction-related tests.
#![warn(missing_docs)]

use kaia_primitives::{Address, Bytes, TxKind, U256};
use kaia_signer::{public_key_to_address, TxSignature, TxSignatures};
pub use kaia_signer::{SecretKey, SignatureError};
use kaia_transaction::{
    signed::{
        Basic, Eip1559, FeeDelegated, FeeDelegatedValueTransfer, Legacy, ValueTransfer,
        ValueTransferFields,
    },
    signer::{latest_signer_for_chain_id, SignerError},
    Signed, Transaction,
};

/// Chain id that dummy transactions are signed for.
pub const DUMMY_CHAIN_ID: u64 = 1001;

/// Gas limit of dummy transactions.
pub const DUMMY_GAS_LIMIT: u64 = 100_000;

/// Creates a deterministic secret key from a non-zero seed.
pub fn dummy_secret_key(seed: u8) -> Result<SecretKey, SignatureError> {
    let secret_key = SecretKey::from_slice(&[seed; 32])?;
    Ok(secret_key)
}

/// Returns the address of the account controlled by `secret_key`.
pub fn address_of(secret_key: &SecretKey) -> Address {
    public_key_to_address(secret_key.public_key())
}

fn recipient() -> Address {
    Address::repeat_byte(0xee)
}

fn sign(
    mut transaction: Signed,
    secret_key: &SecretKey,
    fee_payer: Option<&SecretKey>,
) -> Result<Transaction, SignerError> {
    let signer = latest_signer_for_chain_id(DUMMY_CHAIN_ID);

    transaction.sign_with_keys(&signer, std::slice::from_ref(secret_key))?;
    if let Some(fee_payer) = fee_payer {
        transaction.sign_as_fee_payer_with_keys(&signer, std::slice::from_ref(fee_payer))?;
    }

    Ok(Transaction::new(transaction))
}

/// Creates a dummy EIP-155 legacy transaction.
pub fn dummy_legacy_transaction(
    secret_key: &SecretKey,
    nonce: u64,
    gas_price: u128,
) -> Result<Transaction, SignerError> {
    let transaction = Legacy {
        nonce,
        gas_price,
        gas_limit: DUMMY_GAS_LIMIT,
        kind: TxKind::Call(recipient()),
        value: U256::from(1u64),
        input: Bytes::new(),
        signature: TxSignature::default(),
    };

    sign(transaction.into(), secret_key, None)
}

/// Creates a dummy value transfer.
pub fn dummy_value_transfer(
    secret_key: &SecretKey,
    nonce: u64,
    gas_price: u128,
) -> Result<Transaction, SignerError> {
    let transaction = ValueTransfer {
        nonce,
        gas_price,
        gas_limit: DUMMY_GAS_LIMIT,
        fields: ValueTransferFields {
            to: recipient(),
            value: U256::from(1u64),
            from: address_of(secret_key),
        },
        signatures: TxSignatures::default(),
        fee: Basic,
    };

    sign(transaction.into(), secret_key, None)
}

/// Creates a dummy value transfer whose fee is paid by the owner of
/// `fee_payer`.
pub fn dummy_fee_delegated_value_transfer(
    secret_key: &SecretKey,
    fee_payer: &SecretKey,
    nonce: u64,
    gas_price: u128,
) -> Result<Transaction, SignerError> {
    let transaction = FeeDelegatedValueTransfer {
        nonce,
        gas_price,
        gas_limit: DUMMY_GAS_LIMIT,
        fields: ValueTransferFields {
            to: recipient(),
            value: U256::from(1u64),
            from: address_of(secret_key),
        },
        signatures: TxSignatures::default(),
        fee: FeeDelegated {
            fee_payer: address_of(fee_payer),
            fee_payer_signatures: TxSignatures::default(),
        },
    };

    sign(transaction.into(), secret_key, Some(fee_payer))
}

/// Creates a dummy EIP-1559 transaction with the provided max fee and max
/// priority fee per gas.
pub fn dummy_eip1559_transaction(
    secret_key: &SecretKey,
    nonce: u64,
    max_fee_per_gas: u128,
    max_priority_fee_per_gas: u128,
) -> Result<Transaction, SignerError> {
    let transaction = Eip1559 {
        chain_id: DUMMY_CHAIN_ID,
        nonce,
        max_priority_fee_per_gas,
        max_fee_per_gas,
        gas_limit: DUMMY_GAS_LIMIT,
        kind: TxKind::Call(recipient()),
        value: U256::from(1u64),
        input: Bytes::new(),
        ..Eip1559::default()
    };

    sign(transaction.into(), secret_key, None)
}

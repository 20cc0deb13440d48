//! Kaia transaction types
//!
//! Models every transaction kind the network accepts: the legacy format, the
//! Kaia-native types with their fee-delegated siblings, and the Ethereum
//! typed transactions wrapped in Kaia's `0x78` envelope. Provides their
//! binary and JSON codecs, the hardfork-gated signer family, fee delegation,
//! and intrinsic gas accounting.

/// Account-key engine collaborator.
pub mod account_key;
mod envelope;
/// Execution of transactions against a VM collaborator.
pub mod execution;
/// Fee delegation and effective gas pricing.
pub mod fee;
/// Intrinsic gas schedule.
pub mod gas;
/// JSON representation of transactions.
pub mod rpc;
/// Types for signed transactions.
pub mod signed;
/// Signing schemes and signer selection.
pub mod signer;
/// Mock collaborators for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
mod r#type;
/// Utility functions
pub mod utils;
/// Structural and state-dependent validation.
pub mod validation;

use kaia_chain_config::Rules;
pub use kaia_primitives::{Address, Bytes, TxKind, B256, U256};
use kaia_signer::{TxSignature, TxSignatures};
use kaia_state_api::State;

pub use self::{
    envelope::{Transaction, ValidatedFields},
    fee::FeeRatio,
    r#type::{TransactionType, ETHEREUM_TX_TYPE_PREFIX},
    signed::Signed,
};
use self::{execution::Action, gas::IntrinsicGas, validation::ValidationError};

pub const INVALID_TX_TYPE_ERROR_MESSAGE: &str = "unknown transaction type";

/// Error parsing a [`TransactionType`] from a string.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The string is not a valid hexadecimal number.
    #[error(transparent)]
    InvalidNumber(#[from] std::num::ParseIntError),
    #[error("Invalid radix. Only hexadecimal is supported.")]
    InvalidRadix,
    #[error("Unknown transaction type: {0:#x}")]
    UnknownType(u16),
}

/// Contract shared by every transaction variant.
pub trait TransactionVariant {
    /// Returns the type of the transaction.
    fn transaction_type(&self) -> TransactionType;

    fn nonce(&self) -> u64;

    /// Returns the gas price. Dynamic-fee transactions return their fee cap.
    fn gas_price(&self) -> u128;

    fn gas_limit(&self) -> u64;

    /// Returns the recipient, or [`TxKind::Create`] for contract creations.
    fn kind(&self) -> TxKind;

    fn value(&self) -> U256;

    /// Returns the input data. Empty for variants without a payload.
    fn data(&self) -> &[u8];

    /// Returns the chain id the transaction commits to, if any.
    fn chain_id(&self) -> Option<u64>;

    /// Returns the sender's signatures.
    fn signatures(&self) -> &[TxSignature];

    /// Returns the sender declared inside the transaction. Only Kaia-native
    /// transactions declare their sender.
    fn declared_sender(&self) -> Option<Address> {
        None
    }

    /// Computes the hash the sender signs.
    ///
    /// Legacy transactions use the EIP-155 form when `chain_id` is provided.
    /// Kaia-native transactions always commit to a chain id and treat `None`
    /// as zero. Ethereum typed transactions commit to their own chain id and
    /// ignore the argument.
    fn signing_hash(&self, chain_id: Option<u64>) -> B256;

    /// Computes the hash that uniquely identifies the transaction.
    fn transaction_hash(&self) -> B256;

    /// Computes the identity hash without fee-payer fields. Equal to the
    /// transaction hash for transactions that are not fee-delegated.
    fn sender_only_hash(&self) -> B256 {
        self.transaction_hash()
    }

    /// Computes the intrinsic gas under the provided rules.
    fn intrinsic_gas(&self, rules: &Rules) -> IntrinsicGas;

    /// Returns what executing the transaction does.
    fn action(&self) -> Action<'_>;

    /// Runs structural checks that only need to pass once, at admission.
    fn validate<StateT: State>(
        &self,
        _state: &StateT,
        _rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        Ok(())
    }

    /// Runs state-dependent checks that are repeated at execution time.
    fn validate_mutable<StateT: State>(
        &self,
        _state: &StateT,
        _rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        Ok(())
    }
}

/// Transactions that carry input data.
pub trait PayloadBearing {
    /// Returns the raw input bytes.
    fn payload(&self) -> &Bytes;
}

/// Transactions whose fee is paid by a fee payer.
pub trait FeePayerBearing {
    /// Returns the fee payer's address.
    fn fee_payer(&self) -> Address;

    /// Returns the fee payer's signatures.
    fn fee_payer_signatures(&self) -> &TxSignatures;

    /// Computes the hash the fee payer signs. It commits to the fee payer's
    /// address.
    fn fee_payer_signing_hash(&self, chain_id: u64) -> B256;
}

/// Fee-delegated transactions that split the fee with their sender.
pub trait FeeRatioBearing: FeePayerBearing {
    /// Returns the fee payer's share in percent.
    fn fee_ratio(&self) -> FeeRatio;
}

/// Ethereum typed (EIP-2718) transactions.
pub trait EthereumTyped {
    /// Returns the EIP-2718 type byte.
    fn ethereum_type(&self) -> u8;

    /// Returns the access list.
    fn access_list(&self) -> &kaia_eip2930::AccessList;

    /// Returns the Y-parity of the signature.
    fn y_parity(&self) -> bool;
}

/// Transactions priced by a fee cap and a tip cap.
pub trait BaseFeeBearing {
    fn max_fee_per_gas(&self) -> u128;

    fn max_priority_fee_per_gas(&self) -> u128;
}

/// Transactions that can create a contract and report its address after
/// execution.
pub trait FillContractAddress {
    /// Returns the address of the contract the transaction creates when sent
    /// by `sender`, if it is a creation.
    fn contract_address(&self, sender: &Address) -> Option<Address>;
}

impl<TransactionT: TransactionVariant> FillContractAddress for TransactionT {
    fn contract_address(&self, sender: &Address) -> Option<Address> {
        self.kind()
            .is_create()
            .then(|| sender.create(self.nonce()))
    }
}

/// Maximum amount of native token the transaction can charge for gas.
pub fn max_cost(transaction: &impl TransactionVariant) -> U256 {
    U256::from(transaction.gas_limit()).saturating_mul(U256::from(transaction.gas_price()))
}

/// Amount of native token the payers must hold up front.
pub fn upfront_cost(transaction: &impl TransactionVariant) -> U256 {
    max_cost(transaction).saturating_add(transaction.value())
}

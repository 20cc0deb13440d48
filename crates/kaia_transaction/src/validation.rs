use kaia_primitives::{Address, B256};

use crate::{fee::FeeRatio, signer::SignerError};

/// Error validating a transaction against the chain's state.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError<StateErrorT> {
    /// The recipient is a precompiled contract.
    #[error("Recipient {0} is a precompiled contract")]
    PrecompileRecipient(Address),
    /// The fee ratio lies outside `1..=99`.
    #[error("Fee ratio {} is out of range", .0.get())]
    InvalidFeeRatio(FeeRatio),
    /// A deployment's target address already holds an account.
    #[error("Account {0} already exists")]
    AccountAlreadyExists(Address),
    /// A deployment specified an explicit recipient.
    #[error("Contract deployments cannot specify a recipient")]
    DeploymentWithRecipient,
    /// Human-readable addresses are not supported.
    #[error("Human-readable addresses are not supported")]
    HumanReadableNotSupported,
    /// The deployment's code format is unknown.
    #[error("Unknown code format: {0}")]
    UnknownCodeFormat(u8),
    /// Program accounts cannot update their key.
    #[error("Account {0} is a program account and cannot update its key")]
    ProgramAccountKeyUpdate(Address),
    /// A value transfer targets a program account.
    #[error("Recipient {0} is a program account")]
    RecipientIsProgram(Address),
    /// A value transfer targets an account with code.
    #[error("Recipient {0} has code")]
    RecipientHasCode(Address),
    /// A contract execution targets an account without executable code.
    #[error("Recipient {0} is not a contract")]
    RecipientNotProgram(Address),
    /// A blob transaction carries no blob hashes.
    #[error("Blob transactions must have at least one blob hash")]
    MissingBlobHashes,
    /// A blob hash does not carry the KZG version byte.
    #[error("Blob hash {0} has an unsupported version")]
    InvalidBlobHashVersion(B256),
    /// A set-code transaction carries no authorizations.
    #[error("Set-code transactions must have at least one authorization")]
    EmptyAuthorizationList,
    /// Error reading the state.
    #[error(transparent)]
    State(#[from] StateErrorT),
}

/// Error admitting a transaction into a block.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError<StateErrorT, AccountKeyErrorT> {
    /// Signature recovery failed.
    #[error(transparent)]
    Signer(#[from] SignerError),
    /// The sender's or fee payer's keys do not satisfy their account key.
    #[error("Account key validation failed for {address}: {error}")]
    AccountKey {
        /// The account whose key was checked
        address: Address,
        /// The engine's error
        error: AccountKeyErrorT,
    },
    /// Structural or state-dependent validation failed.
    #[error(transparent)]
    Validation(ValidationError<StateErrorT>),
    /// The gas limit does not cover the required gas.
    #[error("Gas limit {gas_limit} is lower than the required gas {required}")]
    InsufficientGas {
        /// The transaction's gas limit
        gas_limit: u64,
        /// Gas required by intrinsic and signature validation costs
        required: u64,
    },
    /// Error reading the state.
    #[error("State error: {0}")]
    State(StateErrorT),
}

impl<StateErrorT, AccountKeyErrorT> From<ValidationError<StateErrorT>>
    for AdmissionError<StateErrorT, AccountKeyErrorT>
{
    fn from(error: ValidationError<StateErrorT>) -> Self {
        match error {
            ValidationError::State(error) => AdmissionError::State(error),
            error => AdmissionError::Validation(error),
        }
    }
}

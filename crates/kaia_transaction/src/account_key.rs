use auto_impl::auto_impl;
use kaia_primitives::{Address, Bytes};
use kaia_signer::PublicKey;

/// The role a set of signatures is validated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Signing regular transactions
    Transaction,
    /// Signing account updates
    AccountUpdate,
    /// Paying fees of fee-delegated transactions
    FeePayer,
}

/// Validates recovered public keys against an account's key and prices that
/// validation.
///
/// The key formats themselves (multi-sig, role-based) are opaque to this
/// crate.
#[auto_impl(&, Box, Arc)]
pub trait AccountKeyEngine {
    /// The engine's error type
    type Error;

    /// Checks that `public_keys` satisfy the account key stored for `address`
    /// in `role`. Accounts without a stored key use the legacy rule that the
    /// key derives the address.
    fn validate(
        &self,
        block_number: u64,
        address: &Address,
        account_key: Option<&Bytes>,
        public_keys: &[PublicKey],
        role: Role,
    ) -> Result<(), Self::Error>;

    /// Returns the gas charged for validating `num_signatures` signatures in
    /// `role`.
    fn sig_validation_gas(&self, block_number: u64, role: Role, num_signatures: usize) -> u64;

    /// Returns the gas charged for installing `encoded_key`.
    fn key_update_gas(&self, block_number: u64, encoded_key: &Bytes) -> Result<u64, Self::Error>;
}

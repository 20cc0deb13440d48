use std::{collections::HashMap, convert::Infallible};

use kaia_primitives::{Address, Bytes, U256};
use kaia_signer::{public_key_to_address, PublicKey};
use kaia_state_api::{AccountKind, State, StateMut};

use crate::{
    account_key::{AccountKeyEngine, Role},
    execution::{CallResult, Vm},
};

/// An account of an [`InMemoryState`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InMemoryAccount {
    pub kind: AccountKind,
    pub nonce: u64,
    /// Deployed or delegated code
    pub code: Bytes,
    /// The RLP-encoded account key, if one was installed
    pub key: Option<Bytes>,
}

impl Default for InMemoryAccount {
    fn default() -> Self {
        Self {
            kind: AccountKind::Externally,
            nonce: 0,
            code: Bytes::new(),
            key: None,
        }
    }
}

/// A state backed by a hash map.
#[derive(Clone, Debug, Default)]
pub struct InMemoryState {
    accounts: HashMap<Address, InMemoryAccount>,
}

impl InMemoryState {
    /// Inserts or replaces an account.
    pub fn insert(&mut self, address: Address, account: InMemoryAccount) {
        self.accounts.insert(address, account);
    }

    /// Inserts a program account with the provided code.
    pub fn insert_program(&mut self, address: Address, code: Bytes) {
        self.insert(
            address,
            InMemoryAccount {
                kind: AccountKind::Program,
                code,
                ..InMemoryAccount::default()
            },
        );
    }

    /// Returns the account at the provided address.
    pub fn account(&self, address: &Address) -> Option<&InMemoryAccount> {
        self.accounts.get(address)
    }
}

impl State for InMemoryState {
    type Error = Infallible;

    fn exists(&self, address: Address) -> Result<bool, Self::Error> {
        Ok(self.accounts.contains_key(&address))
    }

    fn account_kind(&self, address: Address) -> Result<Option<AccountKind>, Self::Error> {
        Ok(self.accounts.get(&address).map(|account| account.kind))
    }

    fn has_code(&self, address: Address) -> Result<bool, Self::Error> {
        Ok(self
            .accounts
            .get(&address)
            .is_some_and(|account| !account.code.is_empty()))
    }

    fn account_key(&self, address: Address) -> Result<Option<Bytes>, Self::Error> {
        Ok(self
            .accounts
            .get(&address)
            .and_then(|account| account.key.clone()))
    }

    fn nonce(&self, address: Address) -> Result<u64, Self::Error> {
        Ok(self
            .accounts
            .get(&address)
            .map_or(0, |account| account.nonce))
    }
}

impl StateMut for InMemoryState {
    fn increment_nonce(&mut self, address: Address) -> Result<(), Self::Error> {
        let account = self.accounts.entry(address).or_default();
        account.nonce += 1;

        Ok(())
    }

    fn update_key(&mut self, address: Address, encoded_key: Bytes) -> Result<(), Self::Error> {
        self.accounts.entry(address).or_default().key = Some(encoded_key);

        Ok(())
    }
}

/// A VM invocation recorded by [`RecordingVm`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VmCall {
    Call {
        sender: Address,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    },
    Create {
        sender: Address,
        input: Bytes,
        gas: u64,
        value: U256,
        address: Address,
    },
}

/// A VM that records its invocations and returns a fixed result.
#[derive(Clone, Debug)]
pub struct RecordingVm {
    pub calls: Vec<VmCall>,
    pub result: CallResult,
}

impl Default for RecordingVm {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            result: CallResult {
                output: Bytes::new(),
                gas_used: 0,
                success: true,
            },
        }
    }
}

impl Vm for RecordingVm {
    type Error = Infallible;

    fn call(
        &mut self,
        sender: Address,
        to: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> Result<CallResult, Self::Error> {
        self.calls.push(VmCall::Call {
            sender,
            to,
            input: Bytes::copy_from_slice(input),
            gas,
            value,
        });

        Ok(self.result.clone())
    }

    fn create(
        &mut self,
        sender: Address,
        input: &[u8],
        gas: u64,
        value: U256,
        address: Address,
    ) -> Result<CallResult, Self::Error> {
        self.calls.push(VmCall::Create {
            sender,
            input: Bytes::copy_from_slice(input),
            gas,
            value,
            address,
        });

        Ok(self.result.clone())
    }
}

/// Error returned by [`StaticAccountKeyEngine`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StaticAccountKeyError {
    /// None of the keys derives the account's address.
    #[error("No key derives address {0}")]
    AddressMismatch(Address),
    /// The engine was configured to reject the role.
    #[error("Role {0:?} is rejected")]
    RejectedRole(Role),
}

/// An account-key engine with fixed gas prices.
///
/// Accounts with a stored key accept any keys. Accounts without one follow
/// the legacy rule: one of the keys must derive the address.
#[derive(Clone, Debug)]
pub struct StaticAccountKeyEngine {
    /// Gas charged per signature
    pub gas_per_signature: u64,
    /// Gas charged for installing a key
    pub key_update_gas: u64,
    /// Roles that always fail validation
    pub rejected_roles: Vec<Role>,
}

impl Default for StaticAccountKeyEngine {
    fn default() -> Self {
        Self {
            gas_per_signature: 1_000,
            key_update_gas: 20_000,
            rejected_roles: Vec::new(),
        }
    }
}

impl AccountKeyEngine for StaticAccountKeyEngine {
    type Error = StaticAccountKeyError;

    fn validate(
        &self,
        _block_number: u64,
        address: &Address,
        account_key: Option<&Bytes>,
        public_keys: &[PublicKey],
        role: Role,
    ) -> Result<(), Self::Error> {
        if self.rejected_roles.contains(&role) {
            return Err(StaticAccountKeyError::RejectedRole(role));
        }

        if account_key.is_some()
            || public_keys
                .iter()
                .any(|public_key| public_key_to_address(*public_key) == *address)
        {
            Ok(())
        } else {
            Err(StaticAccountKeyError::AddressMismatch(*address))
        }
    }

    fn sig_validation_gas(&self, _block_number: u64, _role: Role, num_signatures: usize) -> u64 {
        self.gas_per_signature
            .saturating_mul(num_signatures as u64)
    }

    fn key_update_gas(&self, _block_number: u64, _encoded_key: &Bytes) -> Result<u64, Self::Error> {
        Ok(self.key_update_gas)
    }
}

//! Account state accessors consumed by transaction validation and execution.

use auto_impl::auto_impl;
use kaia_primitives::{Address, Bytes};

/// The shape of an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountKind {
    /// Externally owned account. May carry delegated code after Prague.
    Externally,
    /// Smart contract account.
    Program,
}

/// Trait for reading state information.
#[auto_impl(&, &mut, Box, Rc, Arc)]
pub trait State {
    /// Combinatorial state error.
    type Error;

    /// Returns whether an account exists at the provided address.
    fn exists(&self, address: Address) -> Result<bool, Self::Error>;

    /// Returns the kind of the account at the provided address, if it exists.
    fn account_kind(&self, address: Address) -> Result<Option<AccountKind>, Self::Error>;

    /// Returns whether the account at the provided address has non-empty code.
    fn has_code(&self, address: Address) -> Result<bool, Self::Error>;

    /// Returns the RLP-encoded account key of the account at the provided
    /// address, if it exists.
    fn account_key(&self, address: Address) -> Result<Option<Bytes>, Self::Error>;

    /// Returns the nonce of the account at the provided address. Missing
    /// accounts have nonce zero.
    fn nonce(&self, address: Address) -> Result<u64, Self::Error>;

    /// Returns whether the account at the provided address is a program
    /// account.
    fn is_program_account(&self, address: Address) -> Result<bool, Self::Error> {
        Ok(self.account_kind(address)? == Some(AccountKind::Program))
    }
}

/// Trait for mutating state information during execution.
pub trait StateMut: State {
    /// Increments the nonce of the account at the provided address, creating
    /// the account if necessary.
    fn increment_nonce(&mut self, address: Address) -> Result<(), Self::Error>;

    /// Replaces the account key of the account at the provided address with
    /// the provided RLP-encoded key.
    fn update_key(&mut self, address: Address, encoded_key: Bytes) -> Result<(), Self::Error>;
}

impl<T: StateMut + ?Sized> StateMut for &mut T {
    fn increment_nonce(&mut self, address: Address) -> Result<(), Self::Error> {
        T::increment_nonce(self, address)
    }

    fn update_key(&mut self, address: Address, encoded_key: Bytes) -> Result<(), Self::Error> {
        T::update_key(self, address, encoded_key)
    }
}

impl<T: StateMut + ?Sized> StateMut for Box<T> {
    fn increment_nonce(&mut self, address: Address) -> Result<(), Self::Error> {
        T::increment_nonce(self, address)
    }

    fn update_key(&mut self, address: Address, encoded_key: Bytes) -> Result<(), Self::Error> {
        T::update_key(self, address, encoded_key)
    }
}

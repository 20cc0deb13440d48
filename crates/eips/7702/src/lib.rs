//! Types related to EIP-7702 set-code authorizations.

use alloy_rlp::{BufMut, Encodable as _, RlpDecodable, RlpEncodable};
use kaia_primitives::{keccak256, Address, B256, U256};
use kaia_signer::{SecretKey, SignatureError, SignatureWithRecoveryId, TxSignature};

/// Prefix byte of an authorization's signing payload.
pub const MAGIC: u8 = 0x05;

/// Intrinsic gas charged per authorization, equal to the cost of creating a
/// new account.
pub const PER_EMPTY_ACCOUNT_COST: u64 = 25_000;

/// An unsigned authorization to delegate an account's code to `address`.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, RlpEncodable, RlpDecodable, serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    /// Chain the authorization is valid on. Zero means any chain.
    pub chain_id: U256,
    /// Address whose code the authority delegates to
    pub address: Address,
    /// Nonce of the authority
    #[serde(with = "alloy_serde::quantity")]
    pub nonce: u64,
}

impl Authorization {
    /// Computes the hash that the authority signs.
    pub fn signature_hash(&self) -> B256 {
        let mut encoded = Vec::with_capacity(1 + self.length());
        encoded.put_u8(MAGIC);
        self.encode(&mut encoded);

        keccak256(encoded)
    }

    /// Signs the authorization with the provided secret key.
    pub fn sign(self, secret_key: &SecretKey) -> Result<SignedAuthorization, SignatureError> {
        let signature = SignatureWithRecoveryId::new(self.signature_hash(), secret_key)?;

        Ok(SignedAuthorization {
            chain_id: self.chain_id,
            address: self.address,
            nonce: self.nonce,
            y_parity: signature.recovery_id()?,
            r: signature.r,
            s: signature.s,
        })
    }
}

/// An authorization together with its authority's signature.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, RlpEncodable, RlpDecodable, serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct SignedAuthorization {
    /// Chain the authorization is valid on. Zero means any chain.
    pub chain_id: U256,
    /// Address whose code the authority delegates to
    pub address: Address,
    /// Nonce of the authority
    #[serde(with = "alloy_serde::quantity")]
    pub nonce: u64,
    /// Y-parity of the signature
    #[serde(with = "alloy_serde::quantity")]
    pub y_parity: u8,
    /// R value
    pub r: U256,
    /// S value
    pub s: U256,
}

impl SignedAuthorization {
    /// Returns the unsigned authorization.
    pub fn authorization(&self) -> Authorization {
        Authorization {
            chain_id: self.chain_id,
            address: self.address,
            nonce: self.nonce,
        }
    }

    /// Recovers the address of the account that signed the authorization.
    ///
    /// Signatures with a non-canonical S-value are rejected.
    pub fn recover_authority(&self) -> Result<Address, SignatureError> {
        let signature = TxSignature {
            v: u64::from(self.y_parity),
            r: self.r,
            s: self.s,
        };
        signature.validate_values()?;

        signature
            .recover_public_key(self.authorization().signature_hash(), self.y_parity)
            .map(kaia_signer::public_key_to_address)
    }
}

/// Computes the intrinsic gas of an authorization list.
pub fn authorization_list_gas(authorizations: &[SignedAuthorization]) -> u64 {
    authorizations.len() as u64 * PER_EMPTY_ACCOUNT_COST
}

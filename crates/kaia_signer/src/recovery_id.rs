use k256::{
    ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey},
    PublicKey, SecretKey,
};
use kaia_primitives::U256;

use crate::{Recoverable, RecoveryMessage, Signature, SignatureError};

/// Length of a raw `r || s || recovery_id` signature.
const RAW_SIGNATURE_LENGTH: usize = 65;

/// An ECDSA signature with a recovery id encoded in its V-value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SignatureWithRecoveryId {
    /// R value
    pub r: U256,
    /// S value
    pub s: U256,
    /// V value
    pub v: u64,
}

impl SignatureWithRecoveryId {
    /// Signs the provided message with the secret key. The resulting V-value
    /// is `27 + recovery_id`.
    pub fn new<M>(message: M, secret_key: &SecretKey) -> Result<Self, SignatureError>
    where
        M: Into<RecoveryMessage>,
    {
        let message_hash = message.into().to_hash();
        let signing_key = SigningKey::from(secret_key);

        let (signature, recovery_id) = signing_key.sign_prehash_recoverable(message_hash.as_slice())?;

        let r = U256::from_be_slice(signature.r().to_bytes().as_slice());
        let s = U256::from_be_slice(signature.s().to_bytes().as_slice());
        let v = 27 + u64::from(recovery_id.to_byte());

        Ok(Self { r, s, v })
    }

    /// Splits a raw `r || s || recovery_id` signature into its components.
    pub fn from_raw_bytes(signature: &[u8]) -> Result<Self, SignatureError> {
        if signature.len() != RAW_SIGNATURE_LENGTH {
            return Err(SignatureError::InvalidLength(signature.len()));
        }

        let (r, rest) = signature.split_at(32);
        let (s, recovery_id) = rest.split_at(32);
        let recovery_id = recovery_id
            .first()
            .copied()
            .ok_or(SignatureError::InvalidLength(signature.len()))?;

        Ok(Self {
            r: U256::from_be_slice(r),
            s: U256::from_be_slice(s),
            v: 27 + u64::from(recovery_id),
        })
    }

    /// Returns the raw `r || s || recovery_id` representation of the
    /// signature.
    pub fn to_raw_bytes(&self) -> Result<[u8; RAW_SIGNATURE_LENGTH], SignatureError> {
        let mut bytes = [0u8; RAW_SIGNATURE_LENGTH];
        let (r, rest) = bytes.split_at_mut(32);
        r.copy_from_slice(&self.r.to_be_bytes::<32>());

        let (s, recovery_id) = rest.split_at_mut(32);
        s.copy_from_slice(&self.s.to_be_bytes::<32>());
        recovery_id.fill(self.recovery_id()?);

        Ok(bytes)
    }

    /// Returns the recovery id (0 or 1) encoded in the V-value.
    pub fn recovery_id(&self) -> Result<u8, SignatureError> {
        match self.v {
            0 | 27 => Ok(0),
            1 | 28 => Ok(1),
            v if v >= 35 => Ok(((v - 1) % 2) as u8),
            v => Err(SignatureError::InvalidV(v)),
        }
    }

    /// Returns whether the V-value indicates an odd Y-parity.
    pub fn odd_y_parity(&self) -> bool {
        self.recovery_id().is_ok_and(|recovery_id| recovery_id == 1)
    }

    fn as_signature(&self) -> Result<(K256Signature, RecoveryId), SignatureError> {
        let recovery_id = RecoveryId::from_byte(self.recovery_id()?)
            .ok_or(SignatureError::RecoveryError)?;

        let signature = K256Signature::from_scalars(
            self.r.to_be_bytes::<32>(),
            self.s.to_be_bytes::<32>(),
        )?;

        // Recovery rejects high-S values, so flip them into the lower half along
        // with the parity.
        Ok(match signature.normalize_s() {
            Some(normalized) => (
                normalized,
                RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
            ),
            None => (signature, recovery_id),
        })
    }
}

impl Recoverable for SignatureWithRecoveryId {
    fn recover_public_key(&self, message: RecoveryMessage) -> Result<PublicKey, SignatureError> {
        let message_hash = message.to_hash();
        let (signature, recovery_id) = self.as_signature()?;

        let verifying_key =
            VerifyingKey::recover_from_prehash(message_hash.as_slice(), &signature, recovery_id)
                .map_err(|_error| SignatureError::RecoveryError)?;

        Ok(PublicKey::from(&verifying_key))
    }
}

impl Signature for SignatureWithRecoveryId {
    fn r(&self) -> U256 {
        self.r
    }

    fn s(&self) -> U256 {
        self.s
    }

    fn v(&self) -> u64 {
        self.v
    }
}

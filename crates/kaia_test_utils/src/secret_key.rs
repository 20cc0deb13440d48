use kaia_primitives::Address;
#[allow(deprecated)]
// This is test code, it's ok to use `DangerousSecretKeyStr`
use kaia_signer::{public_key_to_address, DangerousSecretKeyStr};
pub use kaia_signer::{SecretKey, SignatureError};

/// Well-known secret keys used across tests.
pub const TEST_SECRET_KEYS: [&str; 3] = [
    "e331b6d69882b4cb4ea581d88e0b604039a3de5967688d3dcffdd2270c0fd109",
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
];

/// Converts a hex string to a secret key.
pub fn secret_key_from_str(secret_key: &str) -> Result<SecretKey, SignatureError> {
    // This is test code, it's ok to use `DangerousSecretKeyStr`
    #[allow(deprecated)]
    kaia_signer::secret_key_from_str(DangerousSecretKeyStr(secret_key))
}

/// Converts a secret key in a hex string format to an address.
///
/// Note that this function is in `kaia_test_utils` to restrict opportunities
/// for misuse. In production code there should be only one place where secret
/// keys are parsed from string to avoid potential leakage into logs and error
/// messages.
///
/// # Examples
///
/// ```
/// use kaia_test_utils::secret_key::secret_key_to_address;
///
/// let secret_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
///
/// let address = secret_key_to_address(secret_key).unwrap();
/// ```
pub fn secret_key_to_address(secret_key: &str) -> Result<Address, SignatureError> {
    let secret_key = secret_key_from_str(secret_key)?;
    Ok(public_key_to_address(secret_key.public_key()))
}

/// Converts a secret key to a 0x-prefixed hex string.
pub fn secret_key_to_str(secret_key: &SecretKey) -> String {
    format!("0x{}", hex::encode(secret_key.to_bytes().as_slice()))
}

//! Primitive types shared by the Kaia transaction crates.

pub use alloy_primitives::{
    address, b256, bytes, hex, keccak256, map::HashMap, Address, Bytes, FixedBytes, TxKind, B256,
    U256, U8,
};

/// The highest address reserved for precompiled contracts.
pub const MAX_PRECOMPILE_ADDRESS: Address = address!("0x00000000000000000000000000000000000003ff");

/// Returns whether the provided address lies within the range reserved for
/// precompiled contracts (`0x01..=0x3ff`).
pub fn is_precompile_address(address: &Address) -> bool {
    *address != Address::ZERO && *address <= MAX_PRECOMPILE_ADDRESS
}

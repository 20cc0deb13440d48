//! Fee delegation and effective gas pricing.

use alloy_rlp::{RlpDecodableWrapper, RlpEncodableWrapper};
use kaia_primitives::U256;

/// The fee payer's share of a transaction's fee, in percent.
///
/// Only values in `1..=99` are valid. Out-of-range values survive decoding
/// and are rejected by transaction validation.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, RlpEncodableWrapper,
    RlpDecodableWrapper,
)]
pub struct FeeRatio(u8);

/// Error returned when constructing an out-of-range [`FeeRatio`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Fee ratio must be between {min} and {max}, got {0}", min = FeeRatio::MIN, max = FeeRatio::MAX)]
pub struct InvalidFeeRatio(pub u8);

impl FeeRatio {
    /// Smallest valid ratio
    pub const MIN: u8 = 1;
    /// Largest valid ratio
    pub const MAX: u8 = 99;

    /// Constructs a validated fee ratio.
    pub fn new(ratio: u8) -> Result<Self, InvalidFeeRatio> {
        let ratio = Self(ratio);
        if ratio.is_valid() {
            Ok(ratio)
        } else {
            Err(InvalidFeeRatio(ratio.0))
        }
    }

    /// Returns the ratio in percent.
    pub fn get(&self) -> u8 {
        self.0
    }

    /// Whether the ratio lies within the valid range.
    pub fn is_valid(&self) -> bool {
        (Self::MIN..=Self::MAX).contains(&self.0)
    }
}

impl From<u8> for FeeRatio {
    fn from(ratio: u8) -> Self {
        Self(ratio)
    }
}

impl From<FeeRatio> for u8 {
    fn from(ratio: FeeRatio) -> Self {
        ratio.0
    }
}

impl serde::Serialize for FeeRatio {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        alloy_serde::quantity::serialize(&self.0, serializer)
    }
}

impl<'deserializer> serde::Deserialize<'deserializer> for FeeRatio {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'deserializer>,
    {
        alloy_serde::quantity::deserialize(deserializer).map(Self)
    }
}

/// How a transaction's fee is split between its sender and fee payer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeSplit {
    /// Amount charged to the sender
    pub sender: U256,
    /// Amount charged to the fee payer
    pub fee_payer: U256,
}

/// Splits `fee` between sender and fee payer.
///
/// Fee-delegated transactions without a ratio charge the fee payer in full.
/// Transactions that are not fee-delegated charge the sender in full.
pub fn split_fee(fee: U256, fee_delegated: bool, fee_ratio: Option<FeeRatio>) -> FeeSplit {
    let fee_payer = match (fee_delegated, fee_ratio) {
        (false, _) => U256::ZERO,
        (true, None) => fee,
        (true, Some(ratio)) => {
            let ratio = U256::from(ratio.0);
            let hundred = U256::from(100u64);

            // floor(fee * ratio / 100) without forming the full product
            (fee / hundred)
                .saturating_mul(ratio)
                .saturating_add(fee % hundred * ratio / hundred)
                .min(fee)
        }
    };

    FeeSplit {
        sender: fee.saturating_sub(fee_payer),
        fee_payer,
    }
}

/// Computes the tip per gas that the block proposer receives.
///
/// Without a base fee the tip is the raw tip cap. Otherwise it is the tip cap,
/// clamped to what remains of the fee cap after paying the base fee.
pub fn effective_gas_tip(
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    base_fee: Option<u128>,
) -> u128 {
    match base_fee {
        None => max_priority_fee_per_gas,
        Some(base_fee) => {
            max_priority_fee_per_gas.min(max_fee_per_gas.saturating_sub(base_fee))
        }
    }
}

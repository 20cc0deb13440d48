//! Intrinsic gas schedule.

use kaia_chain_config::Rules;

use crate::TransactionType;

/// Base cost of every transaction
pub const TX_GAS: u64 = 21_000;
/// Base cost of a contract creation
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;
/// Surcharge for fee-delegated transactions
pub const TX_GAS_FEE_DELEGATED: u64 = 10_000;
/// Surcharge for fee-delegated transactions with a fee ratio
pub const TX_GAS_FEE_DELEGATED_WITH_RATIO: u64 = 15_000;
/// Payload cost per byte before Istanbul
pub const TX_DATA_GAS: u64 = 100;
/// Payload cost per zero byte from Istanbul
pub const TX_DATA_ZERO_GAS: u64 = 4;
/// Payload cost per non-zero byte from Istanbul
pub const TX_DATA_NON_ZERO_GAS: u64 = 16;
/// Cost per 32-byte word of initcode from Shanghai
pub const INITCODE_WORD_GAS: u64 = 2;
/// Calldata floor cost per token from Prague
pub const TOTAL_COST_FLOOR_PER_TOKEN: u64 = 10;
/// Number of tokens a non-zero calldata byte counts as
pub const NON_ZERO_BYTE_TOKENS: u64 = 4;

/// Returns the fixed base cost of a transaction of the provided type.
pub fn base_gas(transaction_type: TransactionType, is_creation: bool) -> u64 {
    let base = if is_creation {
        TX_GAS_CONTRACT_CREATION
    } else {
        TX_GAS
    };

    let surcharge = if transaction_type.is_fee_delegated_with_ratio() {
        TX_GAS_FEE_DELEGATED_WITH_RATIO
    } else if transaction_type.is_fee_delegated() {
        TX_GAS_FEE_DELEGATED
    } else {
        0
    };

    base + surcharge
}

fn count_zero_bytes(data: &[u8]) -> u64 {
    data.iter().filter(|byte| **byte == 0).count() as u64
}

/// Computes the payload cost of `data`, including the Shanghai initcode word
/// cost for contract creations.
pub fn payload_gas(data: &[u8], is_creation: bool, rules: &Rules) -> u64 {
    let length = data.len() as u64;

    let mut gas = if rules.is_istanbul {
        let zero_bytes = count_zero_bytes(data);
        let non_zero_bytes = length - zero_bytes;

        zero_bytes
            .saturating_mul(TX_DATA_ZERO_GAS)
            .saturating_add(non_zero_bytes.saturating_mul(TX_DATA_NON_ZERO_GAS))
    } else {
        length.saturating_mul(TX_DATA_GAS)
    };

    if is_creation && rules.is_shanghai {
        let words = length.div_ceil(32);
        gas = gas.saturating_add(words.saturating_mul(INITCODE_WORD_GAS));
    }

    gas
}

/// Counts the calldata tokens of `data`: one per zero byte and four per
/// non-zero byte.
pub fn tokens_in_calldata(data: &[u8]) -> u64 {
    let zero_bytes = count_zero_bytes(data);
    let non_zero_bytes = data.len() as u64 - zero_bytes;

    zero_bytes.saturating_add(non_zero_bytes.saturating_mul(NON_ZERO_BYTE_TOKENS))
}

/// Computes the minimum gas a transaction with calldata `data` must pay.
pub fn floor_data_gas(data: &[u8]) -> u64 {
    TX_GAS.saturating_add(tokens_in_calldata(data).saturating_mul(TOTAL_COST_FLOOR_PER_TOKEN))
}

/// Intrinsic gas of a transaction, before account-key costs are added.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntrinsicGas {
    /// Base, payload, access list, and authorization costs
    pub intrinsic: u64,
    /// Calldata floor cost. Zero before Prague.
    pub floor: u64,
}

impl IntrinsicGas {
    /// Computes the intrinsic gas of a transaction from its parts.
    pub fn new(
        transaction_type: TransactionType,
        data: &[u8],
        is_creation: bool,
        list_gas: u64,
        rules: &Rules,
    ) -> Self {
        let intrinsic = base_gas(transaction_type, is_creation)
            .saturating_add(payload_gas(data, is_creation, rules))
            .saturating_add(list_gas);

        let floor = if rules.is_prague {
            floor_data_gas(data)
        } else {
            0
        };

        Self { intrinsic, floor }
    }
}

/// Gas breakdown recorded during admission validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValidatedGas {
    /// Intrinsic gas, including key installation costs
    pub intrinsic: u64,
    /// Calldata floor cost
    pub floor: u64,
    /// Cost of validating the sender's and fee payer's signatures
    pub sig_validation: u64,
    /// Gas the transaction's limit must cover
    pub required: u64,
}

impl ValidatedGas {
    /// Combines intrinsic gas with account-key costs.
    ///
    /// The floor is compared against intrinsic gas before signature
    /// validation costs are added.
    pub fn new(intrinsic: IntrinsicGas, key_gas: u64, sig_validation: u64) -> Self {
        let intrinsic_gas = intrinsic.intrinsic.saturating_add(key_gas);
        let required = intrinsic_gas
            .max(intrinsic.floor)
            .saturating_add(sig_validation);

        Self {
            intrinsic: intrinsic_gas,
            floor: intrinsic.floor,
            sig_validation,
            required,
        }
    }
}

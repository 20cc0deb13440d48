use std::str::FromStr;

use crate::ParseError;

/// Prefix byte of Ethereum typed transactions on Kaia.
pub const ETHEREUM_TX_TYPE_PREFIX: u8 = 0x78;

/// The type of transaction.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransactionType {
    /// Legacy transaction
    Legacy = 0x00,
    /// Value transfer to an externally owned account
    ValueTransfer = 0x08,
    /// Fee-delegated value transfer
    FeeDelegatedValueTransfer = 0x09,
    /// Fee-delegated value transfer with a fee ratio
    FeeDelegatedValueTransferWithRatio = 0x0a,
    /// Value transfer with a memo
    ValueTransferMemo = 0x10,
    /// Fee-delegated value transfer with a memo
    FeeDelegatedValueTransferMemo = 0x11,
    /// Fee-delegated value transfer with a memo and a fee ratio
    FeeDelegatedValueTransferMemoWithRatio = 0x12,
    /// Account key update
    AccountUpdate = 0x20,
    /// Fee-delegated account key update
    FeeDelegatedAccountUpdate = 0x21,
    /// Fee-delegated account key update with a fee ratio
    FeeDelegatedAccountUpdateWithRatio = 0x22,
    /// Smart contract deployment
    SmartContractDeploy = 0x28,
    /// Fee-delegated smart contract deployment
    FeeDelegatedSmartContractDeploy = 0x29,
    /// Fee-delegated smart contract deployment with a fee ratio
    FeeDelegatedSmartContractDeployWithRatio = 0x2a,
    /// Smart contract execution
    SmartContractExecution = 0x30,
    /// Fee-delegated smart contract execution
    FeeDelegatedSmartContractExecution = 0x31,
    /// Fee-delegated smart contract execution with a fee ratio
    FeeDelegatedSmartContractExecutionWithRatio = 0x32,
    /// Cancellation of a pending transaction with the same nonce
    Cancel = 0x38,
    /// Fee-delegated cancellation
    FeeDelegatedCancel = 0x39,
    /// Fee-delegated cancellation with a fee ratio
    FeeDelegatedCancelWithRatio = 0x3a,
    /// Service chain data anchoring
    ChainDataAnchoring = 0x48,
    /// Fee-delegated data anchoring
    FeeDelegatedChainDataAnchoring = 0x49,
    /// Fee-delegated data anchoring with a fee ratio
    FeeDelegatedChainDataAnchoringWithRatio = 0x4a,
    /// EIP-2930 transaction
    EthereumAccessList = 0x7801,
    /// EIP-1559 transaction
    EthereumDynamicFee = 0x7802,
    /// EIP-4844 transaction
    EthereumBlob = 0x7803,
    /// EIP-7702 transaction
    EthereumSetCode = 0x7804,
}

impl TransactionType {
    /// All transaction types, in discriminant order.
    pub const ALL: [TransactionType; 26] = [
        TransactionType::Legacy,
        TransactionType::ValueTransfer,
        TransactionType::FeeDelegatedValueTransfer,
        TransactionType::FeeDelegatedValueTransferWithRatio,
        TransactionType::ValueTransferMemo,
        TransactionType::FeeDelegatedValueTransferMemo,
        TransactionType::FeeDelegatedValueTransferMemoWithRatio,
        TransactionType::AccountUpdate,
        TransactionType::FeeDelegatedAccountUpdate,
        TransactionType::FeeDelegatedAccountUpdateWithRatio,
        TransactionType::SmartContractDeploy,
        TransactionType::FeeDelegatedSmartContractDeploy,
        TransactionType::FeeDelegatedSmartContractDeployWithRatio,
        TransactionType::SmartContractExecution,
        TransactionType::FeeDelegatedSmartContractExecution,
        TransactionType::FeeDelegatedSmartContractExecutionWithRatio,
        TransactionType::Cancel,
        TransactionType::FeeDelegatedCancel,
        TransactionType::FeeDelegatedCancelWithRatio,
        TransactionType::ChainDataAnchoring,
        TransactionType::FeeDelegatedChainDataAnchoring,
        TransactionType::FeeDelegatedChainDataAnchoringWithRatio,
        TransactionType::EthereumAccessList,
        TransactionType::EthereumDynamicFee,
        TransactionType::EthereumBlob,
        TransactionType::EthereumSetCode,
    ];

    /// Returns the human-readable name of the type.
    pub fn name(&self) -> &'static str {
        match self {
            TransactionType::Legacy => "TxTypeLegacyTransaction",
            TransactionType::ValueTransfer => "TxTypeValueTransfer",
            TransactionType::FeeDelegatedValueTransfer => "TxTypeFeeDelegatedValueTransfer",
            TransactionType::FeeDelegatedValueTransferWithRatio => {
                "TxTypeFeeDelegatedValueTransferWithRatio"
            }
            TransactionType::ValueTransferMemo => "TxTypeValueTransferMemo",
            TransactionType::FeeDelegatedValueTransferMemo => "TxTypeFeeDelegatedValueTransferMemo",
            TransactionType::FeeDelegatedValueTransferMemoWithRatio => {
                "TxTypeFeeDelegatedValueTransferMemoWithRatio"
            }
            TransactionType::AccountUpdate => "TxTypeAccountUpdate",
            TransactionType::FeeDelegatedAccountUpdate => "TxTypeFeeDelegatedAccountUpdate",
            TransactionType::FeeDelegatedAccountUpdateWithRatio => {
                "TxTypeFeeDelegatedAccountUpdateWithRatio"
            }
            TransactionType::SmartContractDeploy => "TxTypeSmartContractDeploy",
            TransactionType::FeeDelegatedSmartContractDeploy => {
                "TxTypeFeeDelegatedSmartContractDeploy"
            }
            TransactionType::FeeDelegatedSmartContractDeployWithRatio => {
                "TxTypeFeeDelegatedSmartContractDeployWithRatio"
            }
            TransactionType::SmartContractExecution => "TxTypeSmartContractExecution",
            TransactionType::FeeDelegatedSmartContractExecution => {
                "TxTypeFeeDelegatedSmartContractExecution"
            }
            TransactionType::FeeDelegatedSmartContractExecutionWithRatio => {
                "TxTypeFeeDelegatedSmartContractExecutionWithRatio"
            }
            TransactionType::Cancel => "TxTypeCancel",
            TransactionType::FeeDelegatedCancel => "TxTypeFeeDelegatedCancel",
            TransactionType::FeeDelegatedCancelWithRatio => "TxTypeFeeDelegatedCancelWithRatio",
            TransactionType::ChainDataAnchoring => "TxTypeChainDataAnchoring",
            TransactionType::FeeDelegatedChainDataAnchoring => {
                "TxTypeFeeDelegatedChainDataAnchoring"
            }
            TransactionType::FeeDelegatedChainDataAnchoringWithRatio => {
                "TxTypeFeeDelegatedChainDataAnchoringWithRatio"
            }
            TransactionType::EthereumAccessList => "TxTypeEthereumAccessList",
            TransactionType::EthereumDynamicFee => "TxTypeEthereumDynamicFee",
            TransactionType::EthereumBlob => "TxTypeEthereumBlob",
            TransactionType::EthereumSetCode => "TxTypeEthereumSetCode",
        }
    }

    /// Position of the type in [`TransactionType::ALL`].
    pub(crate) fn index(&self) -> u32 {
        let index = TransactionType::ALL
            .iter()
            .position(|candidate| candidate == self)
            .unwrap_or_default();

        index as u32
    }

    /// Whether the type is the legacy type.
    pub fn is_legacy(&self) -> bool {
        matches!(self, TransactionType::Legacy)
    }

    /// Whether the type is one of the Ethereum typed (EIP-2718) types.
    pub fn is_ethereum_typed(&self) -> bool {
        (*self as u16) >> 8 == u16::from(ETHEREUM_TX_TYPE_PREFIX)
    }

    /// Whether the type is one of the Kaia-native types.
    pub fn is_native(&self) -> bool {
        !self.is_legacy() && !self.is_ethereum_typed()
    }

    /// Whether the transaction's fee is paid by a fee payer.
    pub fn is_fee_delegated(&self) -> bool {
        self.is_native() && (*self as u16) % 8 != 0
    }

    /// Whether the fee is split between sender and fee payer.
    pub fn is_fee_delegated_with_ratio(&self) -> bool {
        self.is_native() && (*self as u16) % 8 == 2
    }

    /// Whether the type is an account update.
    pub fn is_account_update(&self) -> bool {
        matches!(
            self,
            TransactionType::AccountUpdate
                | TransactionType::FeeDelegatedAccountUpdate
                | TransactionType::FeeDelegatedAccountUpdateWithRatio
        )
    }

    /// Returns the EIP-2718 type byte of Ethereum typed transactions.
    pub fn ethereum_type(&self) -> Option<u8> {
        if self.is_ethereum_typed() {
            Some(*self as u16 as u8)
        } else {
            None
        }
    }

    /// Returns the Ethereum typed transaction type for the provided EIP-2718
    /// type byte.
    pub fn from_ethereum_type(ethereum_type: u8) -> Option<Self> {
        Self::try_from(u16::from_be_bytes([ETHEREUM_TX_TYPE_PREFIX, ethereum_type])).ok()
    }
}

impl From<TransactionType> for u16 {
    fn from(t: TransactionType) -> u16 {
        t as u16
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransactionType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(rest) = s.strip_prefix("0x") else {
            return Err(ParseError::InvalidRadix);
        };

        let value = u16::from_str_radix(rest, 16)?;
        TransactionType::try_from(value).map_err(ParseError::UnknownType)
    }
}

impl TryFrom<u16> for TransactionType {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        TransactionType::ALL
            .iter()
            .find(|candidate| u16::from(**candidate) == value)
            .copied()
            .ok_or(value)
    }
}

impl<'deserializer> serde::Deserialize<'deserializer> for TransactionType {
    fn deserialize<D>(deserializer: D) -> Result<TransactionType, D::Error>
    where
        D: serde::Deserializer<'deserializer>,
    {
        let value = u16::deserialize(deserializer)?;
        TransactionType::try_from(value).map_err(|value| {
            serde::de::Error::custom(format!("unknown transaction type: {value:#x}"))
        })
    }
}

impl serde::Serialize for TransactionType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        u16::from(*self).serialize(serializer)
    }
}

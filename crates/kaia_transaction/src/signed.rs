mod eip1559;
mod eip2930;
mod eip4844;
mod eip7702;
mod legacy;
mod native;

use alloy_rlp::{Buf, BufMut, Decodable as _, Encodable};
use kaia_chain_config::Rules;
use kaia_eip4844::BlobSidecar;
use kaia_eip7702::SignedAuthorization;
use kaia_primitives::{is_precompile_address, Address, TxKind, B256, U256};
use kaia_signer::{SecretKey, SignatureWithRecoveryId, TxSignature, TxSignatures};
use kaia_state_api::State;

pub use self::{
    eip1559::Eip1559,
    eip2930::Eip2930,
    eip4844::Eip4844,
    eip7702::Eip7702,
    legacy::Legacy,
    native::{
        AccountUpdate, AccountUpdateFields, Basic, Cancel, CancelFields, ChainDataAnchoring,
        ChainDataAnchoringFields, FeeDelegated, FeeDelegatedAccountUpdate,
        FeeDelegatedAccountUpdateWithRatio, FeeDelegatedCancel, FeeDelegatedCancelWithRatio,
        FeeDelegatedChainDataAnchoring, FeeDelegatedChainDataAnchoringWithRatio,
        FeeDelegatedSmartContractDeploy, FeeDelegatedSmartContractDeployWithRatio,
        FeeDelegatedSmartContractExecution, FeeDelegatedSmartContractExecutionWithRatio,
        FeeDelegatedValueTransfer, FeeDelegatedValueTransferMemo,
        FeeDelegatedValueTransferMemoWithRatio, FeeDelegatedValueTransferWithRatio,
        FeeDelegatedWithRatio, FeeMode, Native, NativeKind, SmartContractDeploy,
        SmartContractDeployFields, SmartContractExecution, SmartContractExecutionFields,
        ValueTransfer, ValueTransferFields, ValueTransferMemo, ValueTransferMemoFields,
        CODE_FORMAT_EVM,
    },
};
#[cfg(test)]
pub(crate) use self::eip4844::tests as eip4844_tests;
use crate::{
    execution::Action,
    fee::{self, FeeRatio},
    gas::IntrinsicGas,
    rpc::{RpcTransaction, RpcTransactionConversionError},
    signer::{Signer, SignerError},
    utils::is_list,
    validation::ValidationError,
    BaseFeeBearing, EthereumTyped, FeePayerBearing, FeeRatioBearing as _, PayloadBearing,
    TransactionType, TransactionVariant, ETHEREUM_TX_TYPE_PREFIX, INVALID_TX_TYPE_ERROR_MESSAGE,
};

/// Evaluates `$body` with `$binding` bound to the inner transaction.
macro_rules! for_each_variant {
    ($transaction:expr, $binding:ident => $body:expr) => {
        match $transaction {
            Signed::Legacy($binding) => $body,
            Signed::ValueTransfer($binding) => $body,
            Signed::FeeDelegatedValueTransfer($binding) => $body,
            Signed::FeeDelegatedValueTransferWithRatio($binding) => $body,
            Signed::ValueTransferMemo($binding) => $body,
            Signed::FeeDelegatedValueTransferMemo($binding) => $body,
            Signed::FeeDelegatedValueTransferMemoWithRatio($binding) => $body,
            Signed::AccountUpdate($binding) => $body,
            Signed::FeeDelegatedAccountUpdate($binding) => $body,
            Signed::FeeDelegatedAccountUpdateWithRatio($binding) => $body,
            Signed::SmartContractDeploy($binding) => $body,
            Signed::FeeDelegatedSmartContractDeploy($binding) => $body,
            Signed::FeeDelegatedSmartContractDeployWithRatio($binding) => $body,
            Signed::SmartContractExecution($binding) => $body,
            Signed::FeeDelegatedSmartContractExecution($binding) => $body,
            Signed::FeeDelegatedSmartContractExecutionWithRatio($binding) => $body,
            Signed::Cancel($binding) => $body,
            Signed::FeeDelegatedCancel($binding) => $body,
            Signed::FeeDelegatedCancelWithRatio($binding) => $body,
            Signed::ChainDataAnchoring($binding) => $body,
            Signed::FeeDelegatedChainDataAnchoring($binding) => $body,
            Signed::FeeDelegatedChainDataAnchoringWithRatio($binding) => $body,
            Signed::Eip2930($binding) => $body,
            Signed::Eip1559($binding) => $body,
            Signed::Eip4844($binding) => $body,
            Signed::Eip7702($binding) => $body,
        }
    };
}

macro_rules! for_each_native_variant {
    ($transaction:expr, $binding:ident => $body:expr, _ => $otherwise:expr) => {
        match $transaction {
            Signed::ValueTransfer($binding) => $body,
            Signed::FeeDelegatedValueTransfer($binding) => $body,
            Signed::FeeDelegatedValueTransferWithRatio($binding) => $body,
            Signed::ValueTransferMemo($binding) => $body,
            Signed::FeeDelegatedValueTransferMemo($binding) => $body,
            Signed::FeeDelegatedValueTransferMemoWithRatio($binding) => $body,
            Signed::AccountUpdate($binding) => $body,
            Signed::FeeDelegatedAccountUpdate($binding) => $body,
            Signed::FeeDelegatedAccountUpdateWithRatio($binding) => $body,
            Signed::SmartContractDeploy($binding) => $body,
            Signed::FeeDelegatedSmartContractDeploy($binding) => $body,
            Signed::FeeDelegatedSmartContractDeployWithRatio($binding) => $body,
            Signed::SmartContractExecution($binding) => $body,
            Signed::FeeDelegatedSmartContractExecution($binding) => $body,
            Signed::FeeDelegatedSmartContractExecutionWithRatio($binding) => $body,
            Signed::Cancel($binding) => $body,
            Signed::FeeDelegatedCancel($binding) => $body,
            Signed::FeeDelegatedCancelWithRatio($binding) => $body,
            Signed::ChainDataAnchoring($binding) => $body,
            Signed::FeeDelegatedChainDataAnchoring($binding) => $body,
            Signed::FeeDelegatedChainDataAnchoringWithRatio($binding) => $body,
            _ => $otherwise,
        }
    };
}

macro_rules! for_each_fee_delegated_variant {
    ($transaction:expr, $binding:ident => $body:expr, _ => $otherwise:expr) => {
        match $transaction {
            Signed::FeeDelegatedValueTransfer($binding) => $body,
            Signed::FeeDelegatedValueTransferWithRatio($binding) => $body,
            Signed::FeeDelegatedValueTransferMemo($binding) => $body,
            Signed::FeeDelegatedValueTransferMemoWithRatio($binding) => $body,
            Signed::FeeDelegatedAccountUpdate($binding) => $body,
            Signed::FeeDelegatedAccountUpdateWithRatio($binding) => $body,
            Signed::FeeDelegatedSmartContractDeploy($binding) => $body,
            Signed::FeeDelegatedSmartContractDeployWithRatio($binding) => $body,
            Signed::FeeDelegatedSmartContractExecution($binding) => $body,
            Signed::FeeDelegatedSmartContractExecutionWithRatio($binding) => $body,
            Signed::FeeDelegatedCancel($binding) => $body,
            Signed::FeeDelegatedCancelWithRatio($binding) => $body,
            Signed::FeeDelegatedChainDataAnchoring($binding) => $body,
            Signed::FeeDelegatedChainDataAnchoringWithRatio($binding) => $body,
            _ => $otherwise,
        }
    };
}

macro_rules! for_each_fee_ratio_variant {
    ($transaction:expr, $binding:ident => $body:expr, _ => $otherwise:expr) => {
        match $transaction {
            Signed::FeeDelegatedValueTransferWithRatio($binding) => $body,
            Signed::FeeDelegatedValueTransferMemoWithRatio($binding) => $body,
            Signed::FeeDelegatedAccountUpdateWithRatio($binding) => $body,
            Signed::FeeDelegatedSmartContractDeployWithRatio($binding) => $body,
            Signed::FeeDelegatedSmartContractExecutionWithRatio($binding) => $body,
            Signed::FeeDelegatedCancelWithRatio($binding) => $body,
            Signed::FeeDelegatedChainDataAnchoringWithRatio($binding) => $body,
            _ => $otherwise,
        }
    };
}

/// A signed transaction of any type the network accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signed {
    Legacy(Legacy),
    ValueTransfer(ValueTransfer),
    FeeDelegatedValueTransfer(FeeDelegatedValueTransfer),
    FeeDelegatedValueTransferWithRatio(FeeDelegatedValueTransferWithRatio),
    ValueTransferMemo(ValueTransferMemo),
    FeeDelegatedValueTransferMemo(FeeDelegatedValueTransferMemo),
    FeeDelegatedValueTransferMemoWithRatio(FeeDelegatedValueTransferMemoWithRatio),
    AccountUpdate(AccountUpdate),
    FeeDelegatedAccountUpdate(FeeDelegatedAccountUpdate),
    FeeDelegatedAccountUpdateWithRatio(FeeDelegatedAccountUpdateWithRatio),
    SmartContractDeploy(SmartContractDeploy),
    FeeDelegatedSmartContractDeploy(FeeDelegatedSmartContractDeploy),
    FeeDelegatedSmartContractDeployWithRatio(FeeDelegatedSmartContractDeployWithRatio),
    SmartContractExecution(SmartContractExecution),
    FeeDelegatedSmartContractExecution(FeeDelegatedSmartContractExecution),
    FeeDelegatedSmartContractExecutionWithRatio(FeeDelegatedSmartContractExecutionWithRatio),
    Cancel(Cancel),
    FeeDelegatedCancel(FeeDelegatedCancel),
    FeeDelegatedCancelWithRatio(FeeDelegatedCancelWithRatio),
    ChainDataAnchoring(ChainDataAnchoring),
    FeeDelegatedChainDataAnchoring(FeeDelegatedChainDataAnchoring),
    FeeDelegatedChainDataAnchoringWithRatio(FeeDelegatedChainDataAnchoringWithRatio),
    Eip2930(Eip2930),
    Eip1559(Eip1559),
    Eip4844(Eip4844),
    Eip7702(Eip7702),
}

/// Rejects calls to precompiled contracts.
pub(crate) fn validate_recipient_is_not_precompile<StateErrorT>(
    kind: TxKind,
) -> Result<(), ValidationError<StateErrorT>> {
    match kind {
        TxKind::Call(to) if is_precompile_address(&to) => {
            Err(ValidationError::PrecompileRecipient(to))
        }
        _ => Ok(()),
    }
}

impl Signed {
    /// Whether this is a legacy transaction.
    pub fn is_legacy(&self) -> bool {
        matches!(self, Signed::Legacy(_))
    }

    pub fn as_legacy(&self) -> Option<&Legacy> {
        match self {
            Signed::Legacy(transaction) => Some(transaction),
            _ => None,
        }
    }

    /// Returns the fee payer fields of fee-delegated transactions.
    pub fn as_fee_payer_bearing(&self) -> Option<&dyn FeePayerBearing> {
        for_each_fee_delegated_variant!(self, transaction => Some(transaction as &dyn FeePayerBearing), _ => None)
    }

    /// Returns the fee ratio of fee-delegated transactions with a ratio.
    pub fn fee_ratio(&self) -> Option<FeeRatio> {
        for_each_fee_ratio_variant!(self, transaction => Some(transaction.fee_ratio()), _ => None)
    }

    /// Returns the fee cap and tip cap of dynamic-fee transactions.
    pub fn as_base_fee_bearing(&self) -> Option<&dyn BaseFeeBearing> {
        match self {
            Signed::Eip1559(transaction) => Some(transaction),
            Signed::Eip4844(transaction) => Some(transaction),
            Signed::Eip7702(transaction) => Some(transaction),
            _ => None,
        }
    }

    pub fn as_ethereum_typed(&self) -> Option<&dyn EthereumTyped> {
        match self {
            Signed::Eip2930(transaction) => Some(transaction),
            Signed::Eip1559(transaction) => Some(transaction),
            Signed::Eip4844(transaction) => Some(transaction),
            Signed::Eip7702(transaction) => Some(transaction),
            _ => None,
        }
    }

    /// Returns the raw input of transactions that carry a payload.
    pub fn as_payload_bearing(&self) -> Option<&dyn PayloadBearing> {
        match self {
            Signed::Legacy(transaction) => Some(transaction),
            Signed::ValueTransferMemo(transaction) => Some(transaction),
            Signed::FeeDelegatedValueTransferMemo(transaction) => Some(transaction),
            Signed::FeeDelegatedValueTransferMemoWithRatio(transaction) => Some(transaction),
            Signed::SmartContractDeploy(transaction) => Some(transaction),
            Signed::FeeDelegatedSmartContractDeploy(transaction) => Some(transaction),
            Signed::FeeDelegatedSmartContractDeployWithRatio(transaction) => Some(transaction),
            Signed::SmartContractExecution(transaction) => Some(transaction),
            Signed::FeeDelegatedSmartContractExecution(transaction) => Some(transaction),
            Signed::FeeDelegatedSmartContractExecutionWithRatio(transaction) => Some(transaction),
            Signed::ChainDataAnchoring(transaction) => Some(transaction),
            Signed::FeeDelegatedChainDataAnchoring(transaction) => Some(transaction),
            Signed::FeeDelegatedChainDataAnchoringWithRatio(transaction) => Some(transaction),
            Signed::Eip2930(transaction) => Some(transaction),
            Signed::Eip1559(transaction) => Some(transaction),
            Signed::Eip4844(transaction) => Some(transaction),
            Signed::Eip7702(transaction) => Some(transaction),
            _ => None,
        }
    }

    /// Returns the access list of Ethereum typed transactions.
    pub fn access_list(&self) -> Option<&kaia_eip2930::AccessList> {
        self.as_ethereum_typed()
            .map(|transaction| transaction.access_list())
    }

    /// Returns the authorization list of set-code transactions.
    pub fn authorization_list(&self) -> Option<&[SignedAuthorization]> {
        match self {
            Signed::Eip7702(transaction) => Some(&transaction.authorization_list),
            _ => None,
        }
    }

    /// Returns the blob hashes of blob transactions. Empty for other types.
    pub fn blob_hashes(&self) -> &[B256] {
        match self {
            Signed::Eip4844(transaction) => &transaction.blob_hashes,
            _ => &[],
        }
    }

    /// Returns the blob sidecar, if attached.
    pub fn sidecar(&self) -> Option<&BlobSidecar> {
        match self {
            Signed::Eip4844(transaction) => transaction.sidecar.as_ref(),
            _ => None,
        }
    }

    /// Returns the fee payer's address for fee-delegated transactions.
    pub fn declared_fee_payer(&self) -> Option<Address> {
        self.as_fee_payer_bearing()
            .map(|transaction| transaction.fee_payer())
    }

    /// Returns the fee cap. Transactions without one use their gas price.
    pub fn max_fee_per_gas(&self) -> u128 {
        self.as_base_fee_bearing()
            .map_or_else(|| self.gas_price(), |transaction| transaction.max_fee_per_gas())
    }

    /// Returns the tip cap. Transactions without one use their gas price.
    pub fn max_priority_fee_per_gas(&self) -> u128 {
        self.as_base_fee_bearing().map_or_else(
            || self.gas_price(),
            |transaction| transaction.max_priority_fee_per_gas(),
        )
    }

    /// Computes the tip paid to the block proposer per unit of gas.
    pub fn effective_gas_tip(&self, base_fee: Option<u128>) -> u128 {
        fee::effective_gas_tip(
            self.max_priority_fee_per_gas(),
            self.max_fee_per_gas(),
            base_fee,
        )
    }

    /// Computes the price per unit of gas that is charged.
    pub fn effective_gas_price(&self, base_fee: Option<u128>) -> u128 {
        match base_fee {
            Some(base_fee) => self.effective_gas_tip(Some(base_fee)).saturating_add(base_fee),
            None => self.gas_price(),
        }
    }

    /// Replaces the sender's signatures.
    ///
    /// Only Kaia-native transactions accept more than one signature.
    pub fn set_signatures(&mut self, signatures: TxSignatures) -> Result<(), SignerError> {
        for_each_native_variant!(
            self,
            transaction => {
                transaction.signatures = signatures;
                Ok(())
            },
            _ => self.set_single_signature(single_signature(signatures)?)
        )
    }

    fn set_single_signature(&mut self, signature: TxSignature) -> Result<(), SignerError> {
        match self {
            Signed::Legacy(transaction) => transaction.signature = signature,
            Signed::Eip2930(transaction) => transaction.signature = signature,
            Signed::Eip1559(transaction) => transaction.signature = signature,
            Signed::Eip4844(transaction) => transaction.signature = signature,
            Signed::Eip7702(transaction) => transaction.signature = signature,
            _ => {
                return Err(SignerError::UnsupportedTransactionType(
                    self.transaction_type(),
                ));
            }
        }

        Ok(())
    }

    /// Replaces the fee payer's signatures.
    pub fn set_fee_payer_signatures(&mut self, signatures: TxSignatures) -> Result<(), SignerError> {
        for_each_fee_delegated_variant!(
            self,
            transaction => {
                transaction.fee.fee_payer_signatures = signatures;
                Ok(())
            },
            _ => Err(SignerError::NotFeeDelegated)
        )
    }

    /// Signs the transaction as its sender with every provided key.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn sign_with_keys(
        &mut self,
        signer: &dyn Signer,
        secret_keys: &[SecretKey],
    ) -> Result<(), SignerError> {
        let hash = signer.signing_hash(self)?;
        let signatures = sign_hash(signer, self, hash, secret_keys)?;

        self.set_signatures(signatures)
    }

    /// Signs the transaction as its fee payer with every provided key.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn sign_as_fee_payer_with_keys(
        &mut self,
        signer: &dyn Signer,
        secret_keys: &[SecretKey],
    ) -> Result<(), SignerError> {
        let hash = signer.fee_payer_signing_hash(self)?;
        let signatures = sign_hash(signer, self, hash, secret_keys)?;

        self.set_fee_payer_signatures(signatures)
    }

    /// Length of the network encoding.
    pub fn network_length(&self) -> usize {
        match self {
            Signed::Eip4844(transaction) => self.type_prefix_length() + transaction.network_length(),
            _ => self.length(),
        }
    }

    /// Encodes the transaction for propagation between peers. Unlike the
    /// canonical encoding, it includes a blob transaction's sidecar.
    pub fn encode_network(&self, out: &mut dyn BufMut) {
        match self {
            Signed::Eip4844(transaction) => {
                self.encode_type_prefix(out);
                transaction.encode_network(out);
            }
            _ => self.encode(out),
        }
    }

    /// Decodes a transaction in network or canonical encoding.
    pub fn decode_network(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        Self::decode(buf)
    }

    fn type_prefix_length(&self) -> usize {
        let transaction_type = self.transaction_type();
        if transaction_type.is_legacy() {
            0
        } else if transaction_type.is_ethereum_typed() {
            2
        } else {
            1
        }
    }

    fn encode_type_prefix(&self, out: &mut dyn BufMut) {
        let transaction_type = self.transaction_type();
        if let Some(ethereum_type) = transaction_type.ethereum_type() {
            out.put_u8(ETHEREUM_TX_TYPE_PREFIX);
            out.put_u8(ethereum_type);
        } else if transaction_type.is_native() {
            out.put_u8(u16::from(transaction_type) as u8);
        }
    }

    fn decode_ethereum_typed(ethereum_type: u8, buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        match ethereum_type {
            Eip2930::ETHEREUM_TYPE => Ok(Self::Eip2930(Eip2930::decode(buf)?)),
            Eip1559::ETHEREUM_TYPE => Ok(Self::Eip1559(Eip1559::decode(buf)?)),
            Eip4844::ETHEREUM_TYPE => Ok(Self::Eip4844(Eip4844::decode(buf)?)),
            Eip7702::ETHEREUM_TYPE => Ok(Self::Eip7702(Eip7702::decode(buf)?)),
            _ => Err(alloy_rlp::Error::Custom(INVALID_TX_TYPE_ERROR_MESSAGE)),
        }
    }

    fn decode_native(transaction_type: TransactionType, buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let transaction = match transaction_type {
            TransactionType::ValueTransfer => Self::ValueTransfer(ValueTransfer::decode(buf)?),
            TransactionType::FeeDelegatedValueTransfer => Self::FeeDelegatedValueTransfer(FeeDelegatedValueTransfer::decode(buf)?),
            TransactionType::FeeDelegatedValueTransferWithRatio => Self::FeeDelegatedValueTransferWithRatio(FeeDelegatedValueTransferWithRatio::decode(buf)?),
            TransactionType::ValueTransferMemo => Self::ValueTransferMemo(ValueTransferMemo::decode(buf)?),
            TransactionType::FeeDelegatedValueTransferMemo => Self::FeeDelegatedValueTransferMemo(FeeDelegatedValueTransferMemo::decode(buf)?),
            TransactionType::FeeDelegatedValueTransferMemoWithRatio => Self::FeeDelegatedValueTransferMemoWithRatio(FeeDelegatedValueTransferMemoWithRatio::decode(buf)?),
            TransactionType::AccountUpdate => Self::AccountUpdate(AccountUpdate::decode(buf)?),
            TransactionType::FeeDelegatedAccountUpdate => Self::FeeDelegatedAccountUpdate(FeeDelegatedAccountUpdate::decode(buf)?),
            TransactionType::FeeDelegatedAccountUpdateWithRatio => Self::FeeDelegatedAccountUpdateWithRatio(FeeDelegatedAccountUpdateWithRatio::decode(buf)?),
            TransactionType::SmartContractDeploy => Self::SmartContractDeploy(SmartContractDeploy::decode(buf)?),
            TransactionType::FeeDelegatedSmartContractDeploy => Self::FeeDelegatedSmartContractDeploy(FeeDelegatedSmartContractDeploy::decode(buf)?),
            TransactionType::FeeDelegatedSmartContractDeployWithRatio => Self::FeeDelegatedSmartContractDeployWithRatio(FeeDelegatedSmartContractDeployWithRatio::decode(buf)?),
            TransactionType::SmartContractExecution => Self::SmartContractExecution(SmartContractExecution::decode(buf)?),
            TransactionType::FeeDelegatedSmartContractExecution => Self::FeeDelegatedSmartContractExecution(FeeDelegatedSmartContractExecution::decode(buf)?),
            TransactionType::FeeDelegatedSmartContractExecutionWithRatio => Self::FeeDelegatedSmartContractExecutionWithRatio(FeeDelegatedSmartContractExecutionWithRatio::decode(buf)?),
            TransactionType::Cancel => Self::Cancel(Cancel::decode(buf)?),
            TransactionType::FeeDelegatedCancel => Self::FeeDelegatedCancel(FeeDelegatedCancel::decode(buf)?),
            TransactionType::FeeDelegatedCancelWithRatio => Self::FeeDelegatedCancelWithRatio(FeeDelegatedCancelWithRatio::decode(buf)?),
            TransactionType::ChainDataAnchoring => Self::ChainDataAnchoring(ChainDataAnchoring::decode(buf)?),
            TransactionType::FeeDelegatedChainDataAnchoring => Self::FeeDelegatedChainDataAnchoring(FeeDelegatedChainDataAnchoring::decode(buf)?),
            TransactionType::FeeDelegatedChainDataAnchoringWithRatio => Self::FeeDelegatedChainDataAnchoringWithRatio(FeeDelegatedChainDataAnchoringWithRatio::decode(buf)?),
            TransactionType::Legacy
            | TransactionType::EthereumAccessList
            | TransactionType::EthereumDynamicFee
            | TransactionType::EthereumBlob
            | TransactionType::EthereumSetCode => {
                return Err(alloy_rlp::Error::Custom(INVALID_TX_TYPE_ERROR_MESSAGE));
            }
        };

        Ok(transaction)
    }
}

fn single_signature(signatures: TxSignatures) -> Result<TxSignature, SignerError> {
    let mut signatures = signatures.into_inner();
    if signatures.len() != 1 {
        return Err(SignerError::InvalidKeyCount {
            expected: 1,
            actual: signatures.len(),
        });
    }

    signatures.pop().ok_or(SignerError::MissingSignature)
}

fn sign_hash(
    signer: &dyn Signer,
    transaction: &Signed,
    hash: B256,
    secret_keys: &[SecretKey],
) -> Result<TxSignatures, SignerError> {
    secret_keys
        .iter()
        .map(|secret_key| {
            let signature = SignatureWithRecoveryId::new(hash, secret_key)?;
            signer.signature_values(transaction, &signature)
        })
        .collect::<Result<Vec<_>, _>>()
        .map(TxSignatures::new)
}

impl alloy_rlp::Decodable for Signed {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let first = *buf.first().ok_or(alloy_rlp::Error::InputTooShort)?;

        if is_list(first) {
            return Ok(Self::Legacy(Legacy::decode(buf)?));
        }

        match first {
            ETHEREUM_TX_TYPE_PREFIX => {
                buf.advance(1);

                let ethereum_type = *buf.first().ok_or(alloy_rlp::Error::InputTooShort)?;
                buf.advance(1);

                Self::decode_ethereum_typed(ethereum_type, buf)
            }
            // Plain EIP-2718 encoding, as produced by Ethereum tooling
            Eip2930::ETHEREUM_TYPE..=Eip7702::ETHEREUM_TYPE => {
                buf.advance(1);

                Self::decode_ethereum_typed(first, buf)
            }
            byte => {
                let transaction_type = TransactionType::try_from(u16::from(byte))
                    .map_err(|_type| alloy_rlp::Error::Custom(INVALID_TX_TYPE_ERROR_MESSAGE))?;
                buf.advance(1);

                Self::decode_native(transaction_type, buf)
            }
        }
    }
}

impl alloy_rlp::Encodable for Signed {
    fn encode(&self, out: &mut dyn BufMut) {
        self.encode_type_prefix(out);
        for_each_variant!(self, transaction => transaction.encode(out));
    }

    fn length(&self) -> usize {
        self.type_prefix_length() + for_each_variant!(self, transaction => transaction.length())
    }
}

impl TransactionVariant for Signed {
    fn transaction_type(&self) -> TransactionType {
        for_each_variant!(self, transaction => transaction.transaction_type())
    }

    fn nonce(&self) -> u64 {
        for_each_variant!(self, transaction => transaction.nonce())
    }

    fn gas_price(&self) -> u128 {
        for_each_variant!(self, transaction => transaction.gas_price())
    }

    fn gas_limit(&self) -> u64 {
        for_each_variant!(self, transaction => transaction.gas_limit())
    }

    fn kind(&self) -> TxKind {
        for_each_variant!(self, transaction => transaction.kind())
    }

    fn value(&self) -> U256 {
        for_each_variant!(self, transaction => transaction.value())
    }

    fn data(&self) -> &[u8] {
        for_each_variant!(self, transaction => transaction.data())
    }

    fn chain_id(&self) -> Option<u64> {
        for_each_variant!(self, transaction => transaction.chain_id())
    }

    fn signatures(&self) -> &[TxSignature] {
        for_each_variant!(self, transaction => transaction.signatures())
    }

    fn declared_sender(&self) -> Option<Address> {
        for_each_variant!(self, transaction => transaction.declared_sender())
    }

    fn signing_hash(&self, chain_id: Option<u64>) -> B256 {
        for_each_variant!(self, transaction => transaction.signing_hash(chain_id))
    }

    fn transaction_hash(&self) -> B256 {
        for_each_variant!(self, transaction => transaction.transaction_hash())
    }

    fn sender_only_hash(&self) -> B256 {
        for_each_variant!(self, transaction => transaction.sender_only_hash())
    }

    fn intrinsic_gas(&self, rules: &Rules) -> IntrinsicGas {
        for_each_variant!(self, transaction => transaction.intrinsic_gas(rules))
    }

    fn action(&self) -> Action<'_> {
        for_each_variant!(self, transaction => transaction.action())
    }

    fn validate<StateT: State>(
        &self,
        state: &StateT,
        rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        for_each_variant!(self, transaction => transaction.validate(state, rules))
    }

    fn validate_mutable<StateT: State>(
        &self,
        state: &StateT,
        rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        for_each_variant!(self, transaction => transaction.validate_mutable(state, rules))
    }
}

impl From<Legacy> for Signed {
    fn from(transaction: Legacy) -> Self {
        Self::Legacy(transaction)
    }
}

impl From<ValueTransfer> for Signed {
    fn from(transaction: ValueTransfer) -> Self {
        Self::ValueTransfer(transaction)
    }
}

impl From<FeeDelegatedValueTransfer> for Signed {
    fn from(transaction: FeeDelegatedValueTransfer) -> Self {
        Self::FeeDelegatedValueTransfer(transaction)
    }
}

impl From<FeeDelegatedValueTransferWithRatio> for Signed {
    fn from(transaction: FeeDelegatedValueTransferWithRatio) -> Self {
        Self::FeeDelegatedValueTransferWithRatio(transaction)
    }
}

impl From<ValueTransferMemo> for Signed {
    fn from(transaction: ValueTransferMemo) -> Self {
        Self::ValueTransferMemo(transaction)
    }
}

impl From<FeeDelegatedValueTransferMemo> for Signed {
    fn from(transaction: FeeDelegatedValueTransferMemo) -> Self {
        Self::FeeDelegatedValueTransferMemo(transaction)
    }
}

impl From<FeeDelegatedValueTransferMemoWithRatio> for Signed {
    fn from(transaction: FeeDelegatedValueTransferMemoWithRatio) -> Self {
        Self::FeeDelegatedValueTransferMemoWithRatio(transaction)
    }
}

impl From<AccountUpdate> for Signed {
    fn from(transaction: AccountUpdate) -> Self {
        Self::AccountUpdate(transaction)
    }
}

impl From<FeeDelegatedAccountUpdate> for Signed {
    fn from(transaction: FeeDelegatedAccountUpdate) -> Self {
        Self::FeeDelegatedAccountUpdate(transaction)
    }
}

impl From<FeeDelegatedAccountUpdateWithRatio> for Signed {
    fn from(transaction: FeeDelegatedAccountUpdateWithRatio) -> Self {
        Self::FeeDelegatedAccountUpdateWithRatio(transaction)
    }
}

impl From<SmartContractDeploy> for Signed {
    fn from(transaction: SmartContractDeploy) -> Self {
        Self::SmartContractDeploy(transaction)
    }
}

impl From<FeeDelegatedSmartContractDeploy> for Signed {
    fn from(transaction: FeeDelegatedSmartContractDeploy) -> Self {
        Self::FeeDelegatedSmartContractDeploy(transaction)
    }
}

impl From<FeeDelegatedSmartContractDeployWithRatio> for Signed {
    fn from(transaction: FeeDelegatedSmartContractDeployWithRatio) -> Self {
        Self::FeeDelegatedSmartContractDeployWithRatio(transaction)
    }
}

impl From<SmartContractExecution> for Signed {
    fn from(transaction: SmartContractExecution) -> Self {
        Self::SmartContractExecution(transaction)
    }
}

impl From<FeeDelegatedSmartContractExecution> for Signed {
    fn from(transaction: FeeDelegatedSmartContractExecution) -> Self {
        Self::FeeDelegatedSmartContractExecution(transaction)
    }
}

impl From<FeeDelegatedSmartContractExecutionWithRatio> for Signed {
    fn from(transaction: FeeDelegatedSmartContractExecutionWithRatio) -> Self {
        Self::FeeDelegatedSmartContractExecutionWithRatio(transaction)
    }
}

impl From<Cancel> for Signed {
    fn from(transaction: Cancel) -> Self {
        Self::Cancel(transaction)
    }
}

impl From<FeeDelegatedCancel> for Signed {
    fn from(transaction: FeeDelegatedCancel) -> Self {
        Self::FeeDelegatedCancel(transaction)
    }
}

impl From<FeeDelegatedCancelWithRatio> for Signed {
    fn from(transaction: FeeDelegatedCancelWithRatio) -> Self {
        Self::FeeDelegatedCancelWithRatio(transaction)
    }
}

impl From<ChainDataAnchoring> for Signed {
    fn from(transaction: ChainDataAnchoring) -> Self {
        Self::ChainDataAnchoring(transaction)
    }
}

impl From<FeeDelegatedChainDataAnchoring> for Signed {
    fn from(transaction: FeeDelegatedChainDataAnchoring) -> Self {
        Self::FeeDelegatedChainDataAnchoring(transaction)
    }
}

impl From<FeeDelegatedChainDataAnchoringWithRatio> for Signed {
    fn from(transaction: FeeDelegatedChainDataAnchoringWithRatio) -> Self {
        Self::FeeDelegatedChainDataAnchoringWithRatio(transaction)
    }
}

impl From<Eip2930> for Signed {
    fn from(transaction: Eip2930) -> Self {
        Self::Eip2930(transaction)
    }
}

impl From<Eip1559> for Signed {
    fn from(transaction: Eip1559) -> Self {
        Self::Eip1559(transaction)
    }
}

impl From<Eip4844> for Signed {
    fn from(transaction: Eip4844) -> Self {
        Self::Eip4844(transaction)
    }
}

impl From<Eip7702> for Signed {
    fn from(transaction: Eip7702) -> Self {
        Self::Eip7702(transaction)
    }
}

impl From<&Signed> for RpcTransaction {
    fn from(transaction: &Signed) -> Self {
        let mut rpc = for_each_variant!(transaction, inner => RpcTransaction::from(inner));
        rpc.hash = Some(transaction.transaction_hash());
        rpc
    }
}

impl TryFrom<&RpcTransaction> for Signed {
    type Error = RpcTransactionConversionError;

    fn try_from(rpc: &RpcTransaction) -> Result<Self, Self::Error> {
        let transaction_type = rpc.transaction_type()?;

        let transaction = match transaction_type {
            TransactionType::Legacy => Self::Legacy(Legacy::try_from(rpc)?),
            TransactionType::ValueTransfer => Self::ValueTransfer(ValueTransfer::try_from(rpc)?),
            TransactionType::FeeDelegatedValueTransfer => Self::FeeDelegatedValueTransfer(FeeDelegatedValueTransfer::try_from(rpc)?),
            TransactionType::FeeDelegatedValueTransferWithRatio => Self::FeeDelegatedValueTransferWithRatio(FeeDelegatedValueTransferWithRatio::try_from(rpc)?),
            TransactionType::ValueTransferMemo => Self::ValueTransferMemo(ValueTransferMemo::try_from(rpc)?),
            TransactionType::FeeDelegatedValueTransferMemo => Self::FeeDelegatedValueTransferMemo(FeeDelegatedValueTransferMemo::try_from(rpc)?),
            TransactionType::FeeDelegatedValueTransferMemoWithRatio => Self::FeeDelegatedValueTransferMemoWithRatio(FeeDelegatedValueTransferMemoWithRatio::try_from(rpc)?),
            TransactionType::AccountUpdate => Self::AccountUpdate(AccountUpdate::try_from(rpc)?),
            TransactionType::FeeDelegatedAccountUpdate => Self::FeeDelegatedAccountUpdate(FeeDelegatedAccountUpdate::try_from(rpc)?),
            TransactionType::FeeDelegatedAccountUpdateWithRatio => Self::FeeDelegatedAccountUpdateWithRatio(FeeDelegatedAccountUpdateWithRatio::try_from(rpc)?),
            TransactionType::SmartContractDeploy => Self::SmartContractDeploy(SmartContractDeploy::try_from(rpc)?),
            TransactionType::FeeDelegatedSmartContractDeploy => Self::FeeDelegatedSmartContractDeploy(FeeDelegatedSmartContractDeploy::try_from(rpc)?),
            TransactionType::FeeDelegatedSmartContractDeployWithRatio => Self::FeeDelegatedSmartContractDeployWithRatio(FeeDelegatedSmartContractDeployWithRatio::try_from(rpc)?),
            TransactionType::SmartContractExecution => Self::SmartContractExecution(SmartContractExecution::try_from(rpc)?),
            TransactionType::FeeDelegatedSmartContractExecution => Self::FeeDelegatedSmartContractExecution(FeeDelegatedSmartContractExecution::try_from(rpc)?),
            TransactionType::FeeDelegatedSmartContractExecutionWithRatio => Self::FeeDelegatedSmartContractExecutionWithRatio(FeeDelegatedSmartContractExecutionWithRatio::try_from(rpc)?),
            TransactionType::Cancel => Self::Cancel(Cancel::try_from(rpc)?),
            TransactionType::FeeDelegatedCancel => Self::FeeDelegatedCancel(FeeDelegatedCancel::try_from(rpc)?),
            TransactionType::FeeDelegatedCancelWithRatio => Self::FeeDelegatedCancelWithRatio(FeeDelegatedCancelWithRatio::try_from(rpc)?),
            TransactionType::ChainDataAnchoring => Self::ChainDataAnchoring(ChainDataAnchoring::try_from(rpc)?),
            TransactionType::FeeDelegatedChainDataAnchoring => Self::FeeDelegatedChainDataAnchoring(FeeDelegatedChainDataAnchoring::try_from(rpc)?),
            TransactionType::FeeDelegatedChainDataAnchoringWithRatio => Self::FeeDelegatedChainDataAnchoringWithRatio(FeeDelegatedChainDataAnchoringWithRatio::try_from(rpc)?),
            TransactionType::EthereumAccessList => Self::Eip2930(Eip2930::try_from(rpc)?),
            TransactionType::EthereumDynamicFee => Self::Eip1559(Eip1559::try_from(rpc)?),
            TransactionType::EthereumBlob => Self::Eip4844(Eip4844::try_from(rpc)?),
            TransactionType::EthereumSetCode => Self::Eip7702(Eip7702::try_from(rpc)?),
        };

        Ok(transaction)
    }
}

impl serde::Serialize for Signed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        RpcTransaction::from(self).serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Signed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let rpc = RpcTransaction::deserialize(deserializer)?;
        Signed::try_from(&rpc).map_err(serde::de::Error::custom)
    }
}

mod kinds;

use std::fmt::Debug;

use alloy_rlp::{BufMut, Decodable as _, Encodable};
use kaia_chain_config::Rules;
use kaia_primitives::{keccak256, Address, TxKind, B256, U256};
use kaia_signer::{TxSignature, TxSignatures};
use kaia_state_api::State;

pub use self::kinds::{
    AccountUpdateFields, CancelFields, ChainDataAnchoringFields, SmartContractDeployFields,
    SmartContractExecutionFields, ValueTransferFields, ValueTransferMemoFields, CODE_FORMAT_EVM,
};
use crate::{
    execution::Action,
    fee::FeeRatio,
    gas::IntrinsicGas,
    rpc::{RpcTransaction, RpcTransactionConversionError},
    utils::{decode_list_payload, encode_list_header, ensure_consumed, invalid_signature, list_length},
    validation::ValidationError,
    FeePayerBearing, FeeRatioBearing, PayloadBearing, TransactionType, TransactionVariant,
};

/// The kind-specific fields of a Kaia-native transaction.
pub trait NativeKind: Clone + Debug + PartialEq + Eq + Sized {
    /// Type of the basic transaction
    const TYPE: TransactionType;
    /// Type of the fee-delegated sibling
    const FEE_DELEGATED_TYPE: TransactionType;
    /// Type of the fee-delegated sibling with a fee ratio
    const FEE_DELEGATED_WITH_RATIO_TYPE: TransactionType;

    /// Returns the declared sender.
    fn from(&self) -> Address;

    fn kind(&self) -> TxKind;

    fn value(&self) -> U256 {
        U256::ZERO
    }

    /// Returns the input data charged as payload.
    fn data(&self) -> &[u8] {
        &[]
    }

    /// Length of the fields, including the fee ratio if provided.
    fn fields_length(&self, fee_ratio: Option<FeeRatio>) -> usize;

    /// Encodes the fields without a list header, inserting the fee ratio at
    /// the kind's position if provided.
    fn encode_fields(&self, fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut);

    /// Decodes the fields and, if `with_fee_ratio` is set, the fee ratio.
    fn decode_fields(
        buf: &mut &[u8],
        with_fee_ratio: bool,
    ) -> alloy_rlp::Result<(Self, Option<FeeRatio>)>;

    fn action(&self) -> Action<'_>;

    fn validate<StateT: State>(
        &self,
        _nonce: u64,
        _state: &StateT,
        _rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        Ok(())
    }

    fn validate_mutable<StateT: State>(
        &self,
        _state: &StateT,
        _rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        Ok(())
    }

    /// Writes the kind's fields into a JSON object.
    fn to_rpc(&self, rpc: &mut RpcTransaction);

    /// Reads the kind's fields from a JSON object.
    fn from_rpc(rpc: &RpcTransaction) -> Result<Self, RpcTransactionConversionError>;
}

/// How a Kaia-native transaction's fee is paid.
pub trait FeeMode: Clone + Debug + PartialEq + Eq + Sized {
    /// Whether a fee ratio is part of the kind's fields.
    const HAS_FEE_RATIO: bool;

    /// Selects the transaction type of `KindT` for this mode.
    fn transaction_type<KindT: NativeKind>() -> TransactionType;

    fn fee_ratio(&self) -> Option<FeeRatio>;

    /// Length of the fee payer's fields, appended after the sender's
    /// signatures.
    fn trailer_length(&self) -> usize;

    fn encode_trailer(&self, out: &mut dyn BufMut);

    fn decode_trailer(buf: &mut &[u8], fee_ratio: Option<FeeRatio>) -> alloy_rlp::Result<Self>;

    /// Writes the mode's fields into a JSON object.
    fn to_rpc(&self, rpc: &mut RpcTransaction);

    /// Reads the mode's fields from a JSON object.
    fn from_rpc(rpc: &RpcTransaction) -> Result<Self, RpcTransactionConversionError>;
}

/// The sender pays the full fee.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Basic;

/// A fee payer pays the full fee.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeeDelegated {
    pub fee_payer: Address,
    pub fee_payer_signatures: TxSignatures,
}

/// A fee payer pays `fee_ratio` percent of the fee, the sender pays the rest.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeeDelegatedWithRatio {
    pub fee_ratio: FeeRatio,
    pub fee_payer: Address,
    pub fee_payer_signatures: TxSignatures,
}

impl FeeMode for Basic {
    const HAS_FEE_RATIO: bool = false;

    fn transaction_type<KindT: NativeKind>() -> TransactionType {
        KindT::TYPE
    }

    fn fee_ratio(&self) -> Option<FeeRatio> {
        None
    }

    fn trailer_length(&self) -> usize {
        0
    }

    fn encode_trailer(&self, _out: &mut dyn BufMut) {}

    fn decode_trailer(_buf: &mut &[u8], _fee_ratio: Option<FeeRatio>) -> alloy_rlp::Result<Self> {
        Ok(Self)
    }

    fn to_rpc(&self, _rpc: &mut RpcTransaction) {}

    fn from_rpc(_rpc: &RpcTransaction) -> Result<Self, RpcTransactionConversionError> {
        Ok(Self)
    }
}

fn decode_fee_payer(buf: &mut &[u8]) -> alloy_rlp::Result<(Address, TxSignatures)> {
    let fee_payer = Address::decode(buf)?;
    let fee_payer_signatures = TxSignatures::decode(buf)?;
    fee_payer_signatures.validate().map_err(invalid_signature)?;

    Ok((fee_payer, fee_payer_signatures))
}

fn fee_payer_from_rpc(
    rpc: &RpcTransaction,
) -> Result<(Address, TxSignatures), RpcTransactionConversionError> {
    let fee_payer = rpc
        .fee_payer
        .ok_or(RpcTransactionConversionError::MissingField("feePayer"))?;

    let fee_payer_signatures = rpc.fee_payer_signatures.clone().unwrap_or_default();
    fee_payer_signatures.validate()?;

    Ok((fee_payer, fee_payer_signatures))
}

impl FeeMode for FeeDelegated {
    const HAS_FEE_RATIO: bool = false;

    fn transaction_type<KindT: NativeKind>() -> TransactionType {
        KindT::FEE_DELEGATED_TYPE
    }

    fn fee_ratio(&self) -> Option<FeeRatio> {
        None
    }

    fn trailer_length(&self) -> usize {
        self.fee_payer.length() + self.fee_payer_signatures.length()
    }

    fn encode_trailer(&self, out: &mut dyn BufMut) {
        self.fee_payer.encode(out);
        self.fee_payer_signatures.encode(out);
    }

    fn decode_trailer(buf: &mut &[u8], _fee_ratio: Option<FeeRatio>) -> alloy_rlp::Result<Self> {
        let (fee_payer, fee_payer_signatures) = decode_fee_payer(buf)?;

        Ok(Self {
            fee_payer,
            fee_payer_signatures,
        })
    }

    fn to_rpc(&self, rpc: &mut RpcTransaction) {
        rpc.fee_payer = Some(self.fee_payer);
        rpc.fee_payer_signatures = Some(self.fee_payer_signatures.clone());
    }

    fn from_rpc(rpc: &RpcTransaction) -> Result<Self, RpcTransactionConversionError> {
        let (fee_payer, fee_payer_signatures) = fee_payer_from_rpc(rpc)?;

        Ok(Self {
            fee_payer,
            fee_payer_signatures,
        })
    }
}

impl FeeMode for FeeDelegatedWithRatio {
    const HAS_FEE_RATIO: bool = true;

    fn transaction_type<KindT: NativeKind>() -> TransactionType {
        KindT::FEE_DELEGATED_WITH_RATIO_TYPE
    }

    fn fee_ratio(&self) -> Option<FeeRatio> {
        Some(self.fee_ratio)
    }

    fn trailer_length(&self) -> usize {
        self.fee_payer.length() + self.fee_payer_signatures.length()
    }

    fn encode_trailer(&self, out: &mut dyn BufMut) {
        self.fee_payer.encode(out);
        self.fee_payer_signatures.encode(out);
    }

    fn decode_trailer(buf: &mut &[u8], fee_ratio: Option<FeeRatio>) -> alloy_rlp::Result<Self> {
        let fee_ratio = fee_ratio.ok_or(alloy_rlp::Error::Custom("missing fee ratio"))?;
        let (fee_payer, fee_payer_signatures) = decode_fee_payer(buf)?;

        Ok(Self {
            fee_ratio,
            fee_payer,
            fee_payer_signatures,
        })
    }

    fn to_rpc(&self, rpc: &mut RpcTransaction) {
        rpc.fee_ratio = Some(self.fee_ratio);
        rpc.fee_payer = Some(self.fee_payer);
        rpc.fee_payer_signatures = Some(self.fee_payer_signatures.clone());
    }

    fn from_rpc(rpc: &RpcTransaction) -> Result<Self, RpcTransactionConversionError> {
        let fee_ratio = rpc
            .fee_ratio
            .ok_or(RpcTransactionConversionError::MissingField("feeRatio"))?;
        let (fee_payer, fee_payer_signatures) = fee_payer_from_rpc(rpc)?;

        Ok(Self {
            fee_ratio,
            fee_payer,
            fee_payer_signatures,
        })
    }
}

/// A Kaia-native transaction.
///
/// Encoded as `type || rlp([nonce, gasPrice, gas, <fields>, txSignatures,
/// (feePayer, feePayerSignatures)])`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Native<KindT, FeeT> {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    /// Kind-specific fields
    pub fields: KindT,
    /// The sender's signatures
    pub signatures: TxSignatures,
    /// Fee payment mode
    pub fee: FeeT,
}

impl<KindT: NativeKind, FeeT: FeeMode> Native<KindT, FeeT> {
    /// Returns the type byte of the transaction.
    pub fn type_byte() -> u8 {
        u16::from(FeeT::transaction_type::<KindT>()) as u8
    }

    fn common_fields_length(&self) -> usize {
        self.nonce.length()
            + self.gas_price.length()
            + self.gas_limit.length()
            + self.fields.fields_length(self.fee.fee_ratio())
    }

    fn encode_common_fields(&self, out: &mut dyn BufMut) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        self.fields.encode_fields(self.fee.fee_ratio(), out);
    }

    fn sender_payload_length(&self) -> usize {
        self.common_fields_length() + self.signatures.length()
    }

    /// Encodes the transaction, including its type byte.
    pub fn encoded(&self) -> Vec<u8> {
        let mut encoded = Vec::with_capacity(1 + self.length());
        encoded.put_u8(Self::type_byte());
        self.encode(&mut encoded);
        encoded
    }

    /// Encodes `rlp([type, nonce, gasPrice, gas, <fields>])`, the part of the
    /// transaction both signing hashes commit to.
    fn encode_for_signing(&self) -> Vec<u8> {
        let type_byte = Self::type_byte();
        let payload_length = type_byte.length() + self.common_fields_length();

        let mut encoded = Vec::with_capacity(list_length(payload_length));
        encode_list_header(payload_length, &mut encoded);
        type_byte.encode(&mut encoded);
        self.encode_common_fields(&mut encoded);
        encoded
    }

    /// Computes `keccak(rlp([inner, (fee_payer), chain_id, 0, 0]))`.
    fn hash_for_signing(&self, fee_payer: Option<&Address>, chain_id: u64) -> B256 {
        let inner = self.encode_for_signing();
        let inner = inner.as_slice();

        let payload_length = inner.length()
            + fee_payer.map_or(0, Encodable::length)
            + chain_id.length()
            + 2;

        let mut encoded = Vec::with_capacity(list_length(payload_length));
        encode_list_header(payload_length, &mut encoded);
        inner.encode(&mut encoded);
        if let Some(fee_payer) = fee_payer {
            fee_payer.encode(&mut encoded);
        }
        chain_id.encode(&mut encoded);
        0u8.encode(&mut encoded);
        0u8.encode(&mut encoded);

        keccak256(encoded)
    }
}

impl<KindT: NativeKind, FeeT: FeeMode> Encodable for Native<KindT, FeeT> {
    fn encode(&self, out: &mut dyn BufMut) {
        encode_list_header(self.sender_payload_length() + self.fee.trailer_length(), out);
        self.encode_common_fields(out);
        self.signatures.encode(out);
        self.fee.encode_trailer(out);
    }

    fn length(&self) -> usize {
        list_length(self.sender_payload_length() + self.fee.trailer_length())
    }
}

impl<KindT: NativeKind, FeeT: FeeMode> alloy_rlp::Decodable for Native<KindT, FeeT> {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let mut payload = decode_list_payload(buf)?;

        let nonce = u64::decode(&mut payload)?;
        let gas_price = u128::decode(&mut payload)?;
        let gas_limit = u64::decode(&mut payload)?;
        let (fields, fee_ratio) = KindT::decode_fields(&mut payload, FeeT::HAS_FEE_RATIO)?;

        let signatures = TxSignatures::decode(&mut payload)?;
        signatures.validate().map_err(invalid_signature)?;

        let fee = FeeT::decode_trailer(&mut payload, fee_ratio)?;
        ensure_consumed(payload)?;

        Ok(Self {
            nonce,
            gas_price,
            gas_limit,
            fields,
            signatures,
            fee,
        })
    }
}

impl<KindT: NativeKind, FeeT: FeeMode> TransactionVariant for Native<KindT, FeeT> {
    fn transaction_type(&self) -> TransactionType {
        FeeT::transaction_type::<KindT>()
    }

    fn nonce(&self) -> u64 {
        self.nonce
    }

    fn gas_price(&self) -> u128 {
        self.gas_price
    }

    fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    fn kind(&self) -> TxKind {
        self.fields.kind()
    }

    fn value(&self) -> U256 {
        self.fields.value()
    }

    fn data(&self) -> &[u8] {
        self.fields.data()
    }

    fn chain_id(&self) -> Option<u64> {
        self.signatures.chain_id()
    }

    fn signatures(&self) -> &[TxSignature] {
        self.signatures.as_slice()
    }

    fn declared_sender(&self) -> Option<Address> {
        Some(self.fields.from())
    }

    fn signing_hash(&self, chain_id: Option<u64>) -> B256 {
        self.hash_for_signing(None, chain_id.unwrap_or_default())
    }

    fn transaction_hash(&self) -> B256 {
        keccak256(self.encoded())
    }

    fn sender_only_hash(&self) -> B256 {
        let payload_length = self.sender_payload_length();

        let mut encoded = Vec::with_capacity(1 + list_length(payload_length));
        encoded.put_u8(Self::type_byte());
        encode_list_header(payload_length, &mut encoded);
        self.encode_common_fields(&mut encoded);
        self.signatures.encode(&mut encoded);

        keccak256(encoded)
    }

    fn intrinsic_gas(&self, rules: &Rules) -> IntrinsicGas {
        IntrinsicGas::new(
            self.transaction_type(),
            self.fields.data(),
            self.fields.kind().is_create(),
            0,
            rules,
        )
    }

    fn action(&self) -> Action<'_> {
        self.fields.action()
    }

    fn validate<StateT: State>(
        &self,
        state: &StateT,
        rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        if let Some(fee_ratio) = self.fee.fee_ratio()
            && !fee_ratio.is_valid()
        {
            return Err(ValidationError::InvalidFeeRatio(fee_ratio));
        }

        self.fields.validate(self.nonce, state, rules)
    }

    fn validate_mutable<StateT: State>(
        &self,
        state: &StateT,
        rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        self.fields.validate_mutable(state, rules)
    }
}

impl<KindT: NativeKind, FeeT: FeeMode> PayloadBearing for Native<KindT, FeeT>
where
    KindT: PayloadBearing,
{
    fn payload(&self) -> &kaia_primitives::Bytes {
        self.fields.payload()
    }
}

impl<KindT: NativeKind> FeePayerBearing for Native<KindT, FeeDelegated> {
    fn fee_payer(&self) -> Address {
        self.fee.fee_payer
    }

    fn fee_payer_signatures(&self) -> &TxSignatures {
        &self.fee.fee_payer_signatures
    }

    fn fee_payer_signing_hash(&self, chain_id: u64) -> B256 {
        self.hash_for_signing(Some(&self.fee.fee_payer), chain_id)
    }
}

impl<KindT: NativeKind> FeePayerBearing for Native<KindT, FeeDelegatedWithRatio> {
    fn fee_payer(&self) -> Address {
        self.fee.fee_payer
    }

    fn fee_payer_signatures(&self) -> &TxSignatures {
        &self.fee.fee_payer_signatures
    }

    fn fee_payer_signing_hash(&self, chain_id: u64) -> B256 {
        self.hash_for_signing(Some(&self.fee.fee_payer), chain_id)
    }
}

impl<KindT: NativeKind> FeeRatioBearing for Native<KindT, FeeDelegatedWithRatio> {
    fn fee_ratio(&self) -> FeeRatio {
        self.fee.fee_ratio
    }
}

impl<KindT: NativeKind, FeeT: FeeMode> From<&Native<KindT, FeeT>> for RpcTransaction {
    fn from(transaction: &Native<KindT, FeeT>) -> Self {
        let mut rpc = RpcTransaction::new(
            transaction.transaction_type(),
            transaction.nonce,
            transaction.gas_limit,
            transaction.signatures.clone(),
        );
        rpc.gas_price = Some(transaction.gas_price);
        rpc.chain_id = transaction.signatures.chain_id();

        transaction.fields.to_rpc(&mut rpc);
        transaction.fee.to_rpc(&mut rpc);
        rpc
    }
}

impl<KindT: NativeKind, FeeT: FeeMode> TryFrom<&RpcTransaction> for Native<KindT, FeeT> {
    type Error = RpcTransactionConversionError;

    fn try_from(rpc: &RpcTransaction) -> Result<Self, Self::Error> {
        let gas_price = rpc
            .gas_price
            .ok_or(RpcTransactionConversionError::MissingField("gasPrice"))?;

        rpc.signatures.validate()?;

        Ok(Self {
            nonce: rpc.nonce,
            gas_price,
            gas_limit: rpc.gas,
            fields: KindT::from_rpc(rpc)?,
            signatures: rpc.signatures.clone(),
            fee: FeeT::from_rpc(rpc)?,
        })
    }
}

pub type ValueTransfer = Native<ValueTransferFields, Basic>;
pub type FeeDelegatedValueTransfer = Native<ValueTransferFields, FeeDelegated>;
pub type FeeDelegatedValueTransferWithRatio = Native<ValueTransferFields, FeeDelegatedWithRatio>;
pub type ValueTransferMemo = Native<ValueTransferMemoFields, Basic>;
pub type FeeDelegatedValueTransferMemo = Native<ValueTransferMemoFields, FeeDelegated>;
pub type FeeDelegatedValueTransferMemoWithRatio =
    Native<ValueTransferMemoFields, FeeDelegatedWithRatio>;
pub type AccountUpdate = Native<AccountUpdateFields, Basic>;
pub type FeeDelegatedAccountUpdate = Native<AccountUpdateFields, FeeDelegated>;
pub type FeeDelegatedAccountUpdateWithRatio = Native<AccountUpdateFields, FeeDelegatedWithRatio>;
pub type SmartContractDeploy = Native<SmartContractDeployFields, Basic>;
pub type FeeDelegatedSmartContractDeploy = Native<SmartContractDeployFields, FeeDelegated>;
pub type FeeDelegatedSmartContractDeployWithRatio =
    Native<SmartContractDeployFields, FeeDelegatedWithRatio>;
pub type SmartContractExecution = Native<SmartContractExecutionFields, Basic>;
pub type FeeDelegatedSmartContractExecution = Native<SmartContractExecutionFields, FeeDelegated>;
pub type FeeDelegatedSmartContractExecutionWithRatio =
    Native<SmartContractExecutionFields, FeeDelegatedWithRatio>;
pub type Cancel = Native<CancelFields, Basic>;
pub type FeeDelegatedCancel = Native<CancelFields, FeeDelegated>;
pub type FeeDelegatedCancelWithRatio = Native<CancelFields, FeeDelegatedWithRatio>;
pub type ChainDataAnchoring = Native<ChainDataAnchoringFields, Basic>;
pub type FeeDelegatedChainDataAnchoring = Native<ChainDataAnchoringFields, FeeDelegated>;
pub type FeeDelegatedChainDataAnchoringWithRatio =
    Native<ChainDataAnchoringFields, FeeDelegatedWithRatio>;

#[cfg(test)]
mod tests {
    use alloy_rlp::Decodable as _;
    use kaia_chain_config::{ChainConfig, Hardfork};
    use kaia_primitives::{address, Bytes};
    use kaia_signer::{SecretKey, SignatureWithRecoveryId, TxSignature};
    use kaia_test_utils::secret_key::{secret_key_from_str, TEST_SECRET_KEYS};

    use super::*;
    use crate::test_utils::InMemoryState;

    const CHAIN_ID: u64 = 1001;

    fn secret_key(index: usize) -> SecretKey {
        secret_key_from_str(TEST_SECRET_KEYS[index]).expect("valid secret key")
    }

    fn signature(hash: B256, secret_key: &SecretKey) -> anyhow::Result<TxSignature> {
        let signature = SignatureWithRecoveryId::new(hash, secret_key)?;

        Ok(TxSignature {
            v: u64::from(signature.recovery_id()?) + 35 + 2 * CHAIN_ID,
            r: signature.r,
            s: signature.s,
        })
    }

    fn value_transfer_fields() -> ValueTransferFields {
        ValueTransferFields {
            to: address!("0x7b65b75d204abed71587c9e519a89277766ee1d0"),
            value: U256::from(10u64),
            from: address!("0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b"),
        }
    }

    fn fee_delegated_value_transfer() -> FeeDelegatedValueTransfer {
        Native {
            nonce: 1234,
            gas_price: 25_000_000_000,
            gas_limit: 1_000_000,
            fields: value_transfer_fields(),
            signatures: TxSignatures::default(),
            fee: FeeDelegated {
                fee_payer: address!("0x5a0043070275d9f6054307ee7348bd660849d90f"),
                fee_payer_signatures: TxSignatures::default(),
            },
        }
    }

    fn memo_with_ratio(fee_ratio: u8) -> FeeDelegatedValueTransferMemoWithRatio {
        Native {
            nonce: 0,
            gas_price: 25_000_000_000,
            gas_limit: 100_000,
            fields: ValueTransferMemoFields {
                to: address!("0x7b65b75d204abed71587c9e519a89277766ee1d0"),
                value: U256::from(1u64),
                from: address!("0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b"),
                input: Bytes::from_static(&[0x01, 0x00]),
            },
            signatures: TxSignatures::default(),
            fee: FeeDelegatedWithRatio {
                fee_ratio: FeeRatio::from(fee_ratio),
                fee_payer: address!("0x5a0043070275d9f6054307ee7348bd660849d90f"),
                fee_payer_signatures: TxSignatures::default(),
            },
        }
    }

    #[test]
    fn type_bytes() {
        assert_eq!(ValueTransfer::type_byte(), 0x08);
        assert_eq!(FeeDelegatedValueTransfer::type_byte(), 0x09);
        assert_eq!(FeeDelegatedValueTransferWithRatio::type_byte(), 0x0a);
        assert_eq!(SmartContractDeploy::type_byte(), 0x28);
        assert_eq!(FeeDelegatedCancelWithRatio::type_byte(), 0x3a);
        assert_eq!(ChainDataAnchoring::type_byte(), 0x48);
    }

    #[test]
    fn encoded_starts_with_type_byte() {
        let transaction = fee_delegated_value_transfer();
        let encoded = transaction.encoded();

        assert_eq!(encoded.first(), Some(&0x09));
        assert_eq!(encoded.len(), 1 + transaction.length());
        assert_eq!(transaction.transaction_hash(), keccak256(&encoded));
    }

    #[test]
    fn signing_hashes_are_distinct() {
        let transaction = fee_delegated_value_transfer();

        let sender_hash = transaction.signing_hash(Some(CHAIN_ID));
        let fee_payer_hash = transaction.fee_payer_signing_hash(CHAIN_ID);
        assert_ne!(sender_hash, fee_payer_hash);

        // Both commit to the chain id
        assert_ne!(sender_hash, transaction.signing_hash(Some(8217)));
        assert_ne!(fee_payer_hash, transaction.fee_payer_signing_hash(8217));

        // The sender's hash does not commit to the fee payer
        let mut other_fee_payer = transaction.clone();
        other_fee_payer.fee.fee_payer = Address::repeat_byte(0x01);
        assert_eq!(sender_hash, other_fee_payer.signing_hash(Some(CHAIN_ID)));
        assert_ne!(fee_payer_hash, other_fee_payer.fee_payer_signing_hash(CHAIN_ID));
    }

    #[test]
    fn signing_hash_commits_to_fee_mode() {
        let fee_delegated = fee_delegated_value_transfer();
        let basic = ValueTransfer {
            nonce: fee_delegated.nonce,
            gas_price: fee_delegated.gas_price,
            gas_limit: fee_delegated.gas_limit,
            fields: fee_delegated.fields.clone(),
            signatures: TxSignatures::default(),
            fee: Basic,
        };

        assert_ne!(
            basic.signing_hash(Some(CHAIN_ID)),
            fee_delegated.signing_hash(Some(CHAIN_ID))
        );
    }

    #[test]
    fn sender_only_hash_ignores_fee_payer() -> anyhow::Result<()> {
        let mut transaction = fee_delegated_value_transfer();
        transaction.signatures = TxSignatures::single(signature(
            transaction.signing_hash(Some(CHAIN_ID)),
            &secret_key(0),
        )?);

        let unsigned_by_fee_payer = transaction.clone();
        transaction.fee.fee_payer_signatures = TxSignatures::single(signature(
            transaction.fee_payer_signing_hash(CHAIN_ID),
            &secret_key(1),
        )?);

        assert_eq!(
            transaction.sender_only_hash(),
            unsigned_by_fee_payer.sender_only_hash()
        );
        assert_ne!(
            transaction.transaction_hash(),
            unsigned_by_fee_payer.transaction_hash()
        );

        let basic = ValueTransfer {
            signatures: transaction.signatures.clone(),
            ..ValueTransfer::default()
        };
        assert_eq!(basic.sender_only_hash(), basic.transaction_hash());

        Ok(())
    }

    #[test]
    fn decode_fee_ratio_variant() -> anyhow::Result<()> {
        let transaction = memo_with_ratio(30);
        let encoded = alloy_rlp::encode(&transaction);

        let decoded = FeeDelegatedValueTransferMemoWithRatio::decode(&mut encoded.as_slice())?;
        assert_eq!(decoded, transaction);
        assert_eq!(decoded.fee_ratio(), FeeRatio::from(30));

        // Without a fee ratio, the signatures list lands where the ratio is
        // expected.
        let without_ratio = alloy_rlp::encode(fee_delegated_value_transfer());
        assert!(
            FeeDelegatedValueTransferWithRatio::decode(&mut without_ratio.as_slice()).is_err()
        );

        Ok(())
    }

    #[test]
    fn deploy_fee_ratio_precedes_code_format() -> anyhow::Result<()> {
        let transaction = FeeDelegatedSmartContractDeployWithRatio {
            fields: SmartContractDeployFields {
                input: Bytes::from_static(&[0x60, 0x80, 0x60]),
                code_format: CODE_FORMAT_EVM,
                ..SmartContractDeployFields::default()
            },
            fee: FeeDelegatedWithRatio {
                fee_ratio: FeeRatio::from(0x42),
                ..FeeDelegatedWithRatio::default()
            },
            ..FeeDelegatedSmartContractDeployWithRatio::default()
        };

        let mut expected_tail = Vec::new();
        false.encode(&mut expected_tail);
        FeeRatio::from(0x42).encode(&mut expected_tail);
        CODE_FORMAT_EVM.encode(&mut expected_tail);

        let mut fields = Vec::new();
        transaction
            .fields
            .encode_fields(transaction.fee.fee_ratio(), &mut fields);
        assert!(fields.ends_with(&expected_tail));

        let encoded = alloy_rlp::encode(&transaction);
        let decoded = FeeDelegatedSmartContractDeployWithRatio::decode(&mut encoded.as_slice())?;
        assert_eq!(decoded, transaction);

        Ok(())
    }

    #[test]
    fn decode_rejects_trailing_fields() {
        let transaction = ValueTransfer {
            fields: value_transfer_fields(),
            ..ValueTransfer::default()
        };

        let payload_length = transaction.sender_payload_length() + 1;
        let mut encoded = Vec::new();
        encode_list_header(payload_length, &mut encoded);
        transaction.encode_common_fields(&mut encoded);
        transaction.signatures.encode(&mut encoded);
        0u8.encode(&mut encoded);

        assert!(ValueTransfer::decode(&mut encoded.as_slice()).is_err());
    }

    #[test]
    fn invalid_fee_ratio() {
        let rules = ChainConfig::with_hardfork(CHAIN_ID, Hardfork::Prague).rules(0);
        let state = InMemoryState::default();

        for fee_ratio in [0, 100, 255] {
            let result = memo_with_ratio(fee_ratio).validate(&state, &rules);
            assert!(matches!(result, Err(ValidationError::InvalidFeeRatio(ratio)) if ratio.get() == fee_ratio));
        }

        for fee_ratio in [1, 99] {
            assert!(memo_with_ratio(fee_ratio).validate(&state, &rules).is_ok());
        }
    }

    #[test]
    fn intrinsic_gas_includes_fee_delegation() {
        let rules = ChainConfig::with_hardfork(CHAIN_ID, Hardfork::Prague).rules(0);

        let gas = fee_delegated_value_transfer().intrinsic_gas(&rules);
        assert_eq!(gas.intrinsic, 31_000);

        // One non-zero and one zero byte of memo
        let gas = memo_with_ratio(30).intrinsic_gas(&rules);
        assert_eq!(gas.intrinsic, 36_020);
        assert_eq!(gas.floor, 21_050);

        let deploy = SmartContractDeploy {
            fields: SmartContractDeployFields {
                input: Bytes::from_static(&[0x60, 0x80, 0x60]),
                ..SmartContractDeployFields::default()
            },
            ..SmartContractDeploy::default()
        };
        assert_eq!(deploy.intrinsic_gas(&rules).intrinsic, 53_050);
    }

    #[test]
    fn chain_id_comes_from_signatures() -> anyhow::Result<()> {
        let mut transaction = fee_delegated_value_transfer();
        assert_eq!(transaction.chain_id(), None);

        transaction.signatures = TxSignatures::single(signature(
            transaction.signing_hash(Some(CHAIN_ID)),
            &secret_key(0),
        )?);
        assert_eq!(transaction.chain_id(), Some(CHAIN_ID));
        assert_eq!(
            transaction.declared_sender(),
            Some(address!("0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b"))
        );

        Ok(())
    }
}

use alloy_rlp::{BufMut, Decodable as _, Encodable};
use kaia_chain_config::Rules;
use kaia_primitives::{is_precompile_address, Address, Bytes, TxKind, U256};
use kaia_state_api::State;

use super::NativeKind;
use crate::{
    execution::Action,
    fee::FeeRatio,
    rpc::{RpcTransaction, RpcTransactionConversionError},
    validation::ValidationError,
    PayloadBearing, TransactionType,
};

/// Code format of EVM bytecode, the only supported format.
pub const CODE_FORMAT_EVM: u8 = 0;

fn fee_ratio_length(fee_ratio: Option<FeeRatio>) -> usize {
    fee_ratio.map_or(0, |fee_ratio| fee_ratio.length())
}

fn encode_fee_ratio(fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut) {
    if let Some(fee_ratio) = fee_ratio {
        fee_ratio.encode(out);
    }
}

fn decode_fee_ratio(buf: &mut &[u8], with_fee_ratio: bool) -> alloy_rlp::Result<Option<FeeRatio>> {
    if with_fee_ratio {
        FeeRatio::decode(buf).map(Some)
    } else {
        Ok(None)
    }
}

fn missing(field: &'static str) -> RpcTransactionConversionError {
    RpcTransactionConversionError::MissingField(field)
}

fn validate_recipient<StateErrorT>(to: &Address) -> Result<(), ValidationError<StateErrorT>> {
    if is_precompile_address(to) {
        Err(ValidationError::PrecompileRecipient(*to))
    } else {
        Ok(())
    }
}

/// Value transfers may only target code-free externally owned accounts.
fn validate_transfer_recipient<StateT: State>(
    to: &Address,
    state: &StateT,
) -> Result<(), ValidationError<StateT::Error>> {
    if state.is_program_account(*to)? {
        return Err(ValidationError::RecipientIsProgram(*to));
    }

    if state.has_code(*to)? {
        return Err(ValidationError::RecipientHasCode(*to));
    }

    Ok(())
}

/// Transfer of native tokens to an externally owned account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValueTransferFields {
    pub to: Address,
    pub value: U256,
    pub from: Address,
}

impl NativeKind for ValueTransferFields {
    const TYPE: TransactionType = TransactionType::ValueTransfer;
    const FEE_DELEGATED_TYPE: TransactionType = TransactionType::FeeDelegatedValueTransfer;
    const FEE_DELEGATED_WITH_RATIO_TYPE: TransactionType =
        TransactionType::FeeDelegatedValueTransferWithRatio;

    fn from(&self) -> Address {
        self.from
    }

    fn kind(&self) -> TxKind {
        TxKind::Call(self.to)
    }

    fn value(&self) -> U256 {
        self.value
    }

    fn fields_length(&self, fee_ratio: Option<FeeRatio>) -> usize {
        self.to.length() + self.value.length() + self.from.length() + fee_ratio_length(fee_ratio)
    }

    fn encode_fields(&self, fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut) {
        self.to.encode(out);
        self.value.encode(out);
        self.from.encode(out);
        encode_fee_ratio(fee_ratio, out);
    }

    fn decode_fields(
        buf: &mut &[u8],
        with_fee_ratio: bool,
    ) -> alloy_rlp::Result<(Self, Option<FeeRatio>)> {
        let fields = Self {
            to: Address::decode(buf)?,
            value: U256::decode(buf)?,
            from: Address::decode(buf)?,
        };

        Ok((fields, decode_fee_ratio(buf, with_fee_ratio)?))
    }

    fn action(&self) -> Action<'_> {
        Action::Call {
            to: self.to,
            input: &[],
        }
    }

    fn validate<StateT: State>(
        &self,
        _nonce: u64,
        _state: &StateT,
        _rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        validate_recipient(&self.to)
    }

    fn validate_mutable<StateT: State>(
        &self,
        state: &StateT,
        _rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        validate_transfer_recipient(&self.to, state)
    }

    fn to_rpc(&self, rpc: &mut RpcTransaction) {
        rpc.to = Some(self.to);
        rpc.value = Some(self.value);
        rpc.from = Some(self.from);
    }

    fn from_rpc(rpc: &RpcTransaction) -> Result<Self, RpcTransactionConversionError> {
        Ok(Self {
            to: rpc.to.ok_or_else(|| missing("to"))?,
            value: rpc.value.unwrap_or_default(),
            from: rpc.from.ok_or_else(|| missing("from"))?,
        })
    }
}

/// Value transfer carrying a memo.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValueTransferMemoFields {
    pub to: Address,
    pub value: U256,
    pub from: Address,
    /// The memo
    pub input: Bytes,
}

impl NativeKind for ValueTransferMemoFields {
    const TYPE: TransactionType = TransactionType::ValueTransferMemo;
    const FEE_DELEGATED_TYPE: TransactionType = TransactionType::FeeDelegatedValueTransferMemo;
    const FEE_DELEGATED_WITH_RATIO_TYPE: TransactionType =
        TransactionType::FeeDelegatedValueTransferMemoWithRatio;

    fn from(&self) -> Address {
        self.from
    }

    fn kind(&self) -> TxKind {
        TxKind::Call(self.to)
    }

    fn value(&self) -> U256 {
        self.value
    }

    fn data(&self) -> &[u8] {
        &self.input
    }

    fn fields_length(&self, fee_ratio: Option<FeeRatio>) -> usize {
        self.to.length()
            + self.value.length()
            + self.from.length()
            + self.input.length()
            + fee_ratio_length(fee_ratio)
    }

    fn encode_fields(&self, fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut) {
        self.to.encode(out);
        self.value.encode(out);
        self.from.encode(out);
        self.input.encode(out);
        encode_fee_ratio(fee_ratio, out);
    }

    fn decode_fields(
        buf: &mut &[u8],
        with_fee_ratio: bool,
    ) -> alloy_rlp::Result<(Self, Option<FeeRatio>)> {
        let fields = Self {
            to: Address::decode(buf)?,
            value: U256::decode(buf)?,
            from: Address::decode(buf)?,
            input: Bytes::decode(buf)?,
        };

        Ok((fields, decode_fee_ratio(buf, with_fee_ratio)?))
    }

    fn action(&self) -> Action<'_> {
        Action::Call {
            to: self.to,
            input: &self.input,
        }
    }

    fn validate<StateT: State>(
        &self,
        _nonce: u64,
        _state: &StateT,
        _rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        validate_recipient(&self.to)
    }

    fn validate_mutable<StateT: State>(
        &self,
        state: &StateT,
        _rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        validate_transfer_recipient(&self.to, state)
    }

    fn to_rpc(&self, rpc: &mut RpcTransaction) {
        rpc.to = Some(self.to);
        rpc.value = Some(self.value);
        rpc.from = Some(self.from);
        rpc.input = Some(self.input.clone());
    }

    fn from_rpc(rpc: &RpcTransaction) -> Result<Self, RpcTransactionConversionError> {
        Ok(Self {
            to: rpc.to.ok_or_else(|| missing("to"))?,
            value: rpc.value.unwrap_or_default(),
            from: rpc.from.ok_or_else(|| missing("from"))?,
            input: rpc.input.clone().unwrap_or_default(),
        })
    }
}

impl PayloadBearing for ValueTransferMemoFields {
    fn payload(&self) -> &Bytes {
        &self.input
    }
}

/// Replacement of an account's key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountUpdateFields {
    pub from: Address,
    /// The RLP-encoded account key
    pub key: Bytes,
}

impl NativeKind for AccountUpdateFields {
    const TYPE: TransactionType = TransactionType::AccountUpdate;
    const FEE_DELEGATED_TYPE: TransactionType = TransactionType::FeeDelegatedAccountUpdate;
    const FEE_DELEGATED_WITH_RATIO_TYPE: TransactionType =
        TransactionType::FeeDelegatedAccountUpdateWithRatio;

    fn from(&self) -> Address {
        self.from
    }

    fn kind(&self) -> TxKind {
        TxKind::Call(self.from)
    }

    fn fields_length(&self, fee_ratio: Option<FeeRatio>) -> usize {
        self.from.length() + self.key.length() + fee_ratio_length(fee_ratio)
    }

    fn encode_fields(&self, fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut) {
        self.from.encode(out);
        self.key.encode(out);
        encode_fee_ratio(fee_ratio, out);
    }

    fn decode_fields(
        buf: &mut &[u8],
        with_fee_ratio: bool,
    ) -> alloy_rlp::Result<(Self, Option<FeeRatio>)> {
        let fields = Self {
            from: Address::decode(buf)?,
            key: Bytes::decode(buf)?,
        };

        Ok((fields, decode_fee_ratio(buf, with_fee_ratio)?))
    }

    fn action(&self) -> Action<'_> {
        Action::UpdateKey { key: &self.key }
    }

    fn validate<StateT: State>(
        &self,
        _nonce: u64,
        state: &StateT,
        _rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        if state.is_program_account(self.from)? {
            Err(ValidationError::ProgramAccountKeyUpdate(self.from))
        } else {
            Ok(())
        }
    }

    fn to_rpc(&self, rpc: &mut RpcTransaction) {
        rpc.from = Some(self.from);
        rpc.key = Some(self.key.clone());
    }

    fn from_rpc(rpc: &RpcTransaction) -> Result<Self, RpcTransactionConversionError> {
        Ok(Self {
            from: rpc.from.ok_or_else(|| missing("from"))?,
            key: rpc.key.clone().ok_or_else(|| missing("key"))?,
        })
    }
}

/// Deployment of a smart contract.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SmartContractDeployFields {
    /// Must be absent. Encoded as an empty string.
    pub to: Option<Address>,
    pub value: U256,
    pub from: Address,
    /// Initcode
    pub input: Bytes,
    /// Whether `to` is a human-readable address. Must be `false`.
    pub human_readable: bool,
    /// Format of the deployed code
    pub code_format: u8,
}

impl SmartContractDeployFields {
    fn to_length(&self) -> usize {
        self.to.map_or(1, |to| to.length())
    }

    fn encode_to(&self, out: &mut dyn BufMut) {
        match &self.to {
            Some(to) => to.encode(out),
            None => out.put_u8(alloy_rlp::EMPTY_STRING_CODE),
        }
    }

    fn decode_to(buf: &mut &[u8]) -> alloy_rlp::Result<Option<Address>> {
        match TxKind::decode(buf)? {
            TxKind::Call(to) => Ok(Some(to)),
            TxKind::Create => Ok(None),
        }
    }
}

impl NativeKind for SmartContractDeployFields {
    const TYPE: TransactionType = TransactionType::SmartContractDeploy;
    const FEE_DELEGATED_TYPE: TransactionType = TransactionType::FeeDelegatedSmartContractDeploy;
    const FEE_DELEGATED_WITH_RATIO_TYPE: TransactionType =
        TransactionType::FeeDelegatedSmartContractDeployWithRatio;

    fn from(&self) -> Address {
        self.from
    }

    fn kind(&self) -> TxKind {
        TxKind::Create
    }

    fn value(&self) -> U256 {
        self.value
    }

    fn data(&self) -> &[u8] {
        &self.input
    }

    fn fields_length(&self, fee_ratio: Option<FeeRatio>) -> usize {
        self.to_length()
            + self.value.length()
            + self.from.length()
            + self.input.length()
            + self.human_readable.length()
            + fee_ratio_length(fee_ratio)
            + self.code_format.length()
    }

    // The fee ratio precedes the code format.
    fn encode_fields(&self, fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut) {
        self.encode_to(out);
        self.value.encode(out);
        self.from.encode(out);
        self.input.encode(out);
        self.human_readable.encode(out);
        encode_fee_ratio(fee_ratio, out);
        self.code_format.encode(out);
    }

    fn decode_fields(
        buf: &mut &[u8],
        with_fee_ratio: bool,
    ) -> alloy_rlp::Result<(Self, Option<FeeRatio>)> {
        let to = Self::decode_to(buf)?;
        let value = U256::decode(buf)?;
        let from = Address::decode(buf)?;
        let input = Bytes::decode(buf)?;
        let human_readable = bool::decode(buf)?;
        let fee_ratio = decode_fee_ratio(buf, with_fee_ratio)?;
        let code_format = u8::decode(buf)?;

        let fields = Self {
            to,
            value,
            from,
            input,
            human_readable,
            code_format,
        };

        Ok((fields, fee_ratio))
    }

    fn action(&self) -> Action<'_> {
        Action::Create { input: &self.input }
    }

    fn validate<StateT: State>(
        &self,
        nonce: u64,
        state: &StateT,
        _rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        if self.to.is_some() {
            return Err(ValidationError::DeploymentWithRecipient);
        }

        if self.human_readable {
            return Err(ValidationError::HumanReadableNotSupported);
        }

        if self.code_format != CODE_FORMAT_EVM {
            return Err(ValidationError::UnknownCodeFormat(self.code_format));
        }

        let contract_address = self.from.create(nonce);
        if state.exists(contract_address)? {
            return Err(ValidationError::AccountAlreadyExists(contract_address));
        }

        Ok(())
    }

    fn to_rpc(&self, rpc: &mut RpcTransaction) {
        rpc.to = self.to;
        rpc.value = Some(self.value);
        rpc.from = Some(self.from);
        rpc.input = Some(self.input.clone());
        rpc.human_readable = Some(self.human_readable);
        rpc.code_format = Some(self.code_format);
    }

    fn from_rpc(rpc: &RpcTransaction) -> Result<Self, RpcTransactionConversionError> {
        Ok(Self {
            to: rpc.to,
            value: rpc.value.unwrap_or_default(),
            from: rpc.from.ok_or_else(|| missing("from"))?,
            input: rpc.input.clone().unwrap_or_default(),
            human_readable: rpc.human_readable.unwrap_or_default(),
            code_format: rpc.code_format.unwrap_or(CODE_FORMAT_EVM),
        })
    }
}

impl PayloadBearing for SmartContractDeployFields {
    fn payload(&self) -> &Bytes {
        &self.input
    }
}

/// Call of a deployed smart contract.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SmartContractExecutionFields {
    pub to: Address,
    pub value: U256,
    pub from: Address,
    /// Call data
    pub input: Bytes,
}

impl NativeKind for SmartContractExecutionFields {
    const TYPE: TransactionType = TransactionType::SmartContractExecution;
    const FEE_DELEGATED_TYPE: TransactionType =
        TransactionType::FeeDelegatedSmartContractExecution;
    const FEE_DELEGATED_WITH_RATIO_TYPE: TransactionType =
        TransactionType::FeeDelegatedSmartContractExecutionWithRatio;

    fn from(&self) -> Address {
        self.from
    }

    fn kind(&self) -> TxKind {
        TxKind::Call(self.to)
    }

    fn value(&self) -> U256 {
        self.value
    }

    fn data(&self) -> &[u8] {
        &self.input
    }

    fn fields_length(&self, fee_ratio: Option<FeeRatio>) -> usize {
        self.to.length()
            + self.value.length()
            + self.from.length()
            + self.input.length()
            + fee_ratio_length(fee_ratio)
    }

    fn encode_fields(&self, fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut) {
        self.to.encode(out);
        self.value.encode(out);
        self.from.encode(out);
        self.input.encode(out);
        encode_fee_ratio(fee_ratio, out);
    }

    fn decode_fields(
        buf: &mut &[u8],
        with_fee_ratio: bool,
    ) -> alloy_rlp::Result<(Self, Option<FeeRatio>)> {
        let fields = Self {
            to: Address::decode(buf)?,
            value: U256::decode(buf)?,
            from: Address::decode(buf)?,
            input: Bytes::decode(buf)?,
        };

        Ok((fields, decode_fee_ratio(buf, with_fee_ratio)?))
    }

    fn action(&self) -> Action<'_> {
        Action::Call {
            to: self.to,
            input: &self.input,
        }
    }

    fn validate<StateT: State>(
        &self,
        _nonce: u64,
        _state: &StateT,
        _rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        validate_recipient(&self.to)
    }

    /// The recipient must be a program account with code. From Prague,
    /// externally owned accounts with delegated code qualify as well.
    fn validate_mutable<StateT: State>(
        &self,
        state: &StateT,
        rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        let is_program = state.is_program_account(self.to)?;
        let has_code = state.has_code(self.to)?;

        if has_code && (is_program || rules.is_prague) {
            Ok(())
        } else {
            Err(ValidationError::RecipientNotProgram(self.to))
        }
    }

    fn to_rpc(&self, rpc: &mut RpcTransaction) {
        rpc.to = Some(self.to);
        rpc.value = Some(self.value);
        rpc.from = Some(self.from);
        rpc.input = Some(self.input.clone());
    }

    fn from_rpc(rpc: &RpcTransaction) -> Result<Self, RpcTransactionConversionError> {
        Ok(Self {
            to: rpc.to.ok_or_else(|| missing("to"))?,
            value: rpc.value.unwrap_or_default(),
            from: rpc.from.ok_or_else(|| missing("from"))?,
            input: rpc.input.clone().unwrap_or_default(),
        })
    }
}

impl PayloadBearing for SmartContractExecutionFields {
    fn payload(&self) -> &Bytes {
        &self.input
    }
}

/// Cancellation of a pending transaction with the same nonce.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CancelFields {
    pub from: Address,
}

impl NativeKind for CancelFields {
    const TYPE: TransactionType = TransactionType::Cancel;
    const FEE_DELEGATED_TYPE: TransactionType = TransactionType::FeeDelegatedCancel;
    const FEE_DELEGATED_WITH_RATIO_TYPE: TransactionType =
        TransactionType::FeeDelegatedCancelWithRatio;

    fn from(&self) -> Address {
        self.from
    }

    fn kind(&self) -> TxKind {
        TxKind::Call(self.from)
    }

    fn fields_length(&self, fee_ratio: Option<FeeRatio>) -> usize {
        self.from.length() + fee_ratio_length(fee_ratio)
    }

    fn encode_fields(&self, fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut) {
        self.from.encode(out);
        encode_fee_ratio(fee_ratio, out);
    }

    fn decode_fields(
        buf: &mut &[u8],
        with_fee_ratio: bool,
    ) -> alloy_rlp::Result<(Self, Option<FeeRatio>)> {
        let fields = Self {
            from: Address::decode(buf)?,
        };

        Ok((fields, decode_fee_ratio(buf, with_fee_ratio)?))
    }

    fn action(&self) -> Action<'_> {
        Action::NonceOnly
    }

    fn to_rpc(&self, rpc: &mut RpcTransaction) {
        rpc.from = Some(self.from);
    }

    fn from_rpc(rpc: &RpcTransaction) -> Result<Self, RpcTransactionConversionError> {
        Ok(Self {
            from: rpc.from.ok_or_else(|| missing("from"))?,
        })
    }
}

/// Anchoring of service chain data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainDataAnchoringFields {
    pub from: Address,
    /// The anchored data
    pub input: Bytes,
}

impl NativeKind for ChainDataAnchoringFields {
    const TYPE: TransactionType = TransactionType::ChainDataAnchoring;
    const FEE_DELEGATED_TYPE: TransactionType = TransactionType::FeeDelegatedChainDataAnchoring;
    const FEE_DELEGATED_WITH_RATIO_TYPE: TransactionType =
        TransactionType::FeeDelegatedChainDataAnchoringWithRatio;

    fn from(&self) -> Address {
        self.from
    }

    fn kind(&self) -> TxKind {
        TxKind::Call(self.from)
    }

    fn data(&self) -> &[u8] {
        &self.input
    }

    fn fields_length(&self, fee_ratio: Option<FeeRatio>) -> usize {
        self.from.length() + self.input.length() + fee_ratio_length(fee_ratio)
    }

    fn encode_fields(&self, fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut) {
        self.from.encode(out);
        self.input.encode(out);
        encode_fee_ratio(fee_ratio, out);
    }

    fn decode_fields(
        buf: &mut &[u8],
        with_fee_ratio: bool,
    ) -> alloy_rlp::Result<(Self, Option<FeeRatio>)> {
        let fields = Self {
            from: Address::decode(buf)?,
            input: Bytes::decode(buf)?,
        };

        Ok((fields, decode_fee_ratio(buf, with_fee_ratio)?))
    }

    fn action(&self) -> Action<'_> {
        Action::NonceOnly
    }

    fn to_rpc(&self, rpc: &mut RpcTransaction) {
        rpc.from = Some(self.from);
        rpc.input = Some(self.input.clone());
    }

    fn from_rpc(rpc: &RpcTransaction) -> Result<Self, RpcTransactionConversionError> {
        Ok(Self {
            from: rpc.from.ok_or_else(|| missing("from"))?,
            input: rpc.input.clone().unwrap_or_default(),
        })
    }
}

impl PayloadBearing for ChainDataAnchoringFields {
    fn payload(&self) -> &Bytes {
        &self.input
    }
}

#[cfg(test)]
mod tests {
    use kaia_chain_config::{ChainConfig, Hardfork};
    use kaia_primitives::address;
    use kaia_state_api::AccountKind;

    use super::*;
    use crate::test_utils::{InMemoryAccount, InMemoryState};

    const SENDER: Address = address!("0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b");
    const RECIPIENT: Address = address!("0x7b65b75d204abed71587c9e519a89277766ee1d0");

    fn rules(hardfork: Hardfork) -> Rules {
        ChainConfig::with_hardfork(1001, hardfork).rules(0)
    }

    fn value_transfer(to: Address) -> ValueTransferFields {
        ValueTransferFields {
            to,
            value: U256::from(1u64),
            from: SENDER,
        }
    }

    fn execution(to: Address) -> SmartContractExecutionFields {
        SmartContractExecutionFields {
            to,
            value: U256::ZERO,
            from: SENDER,
            input: Bytes::from_static(&[0x01]),
        }
    }

    #[test]
    fn value_transfer_rejects_precompiles() {
        let state = InMemoryState::default();
        let rules = rules(Hardfork::Prague);

        for to in [
            address!("0x0000000000000000000000000000000000000001"),
            address!("0x00000000000000000000000000000000000003ff"),
        ] {
            assert!(matches!(
                value_transfer(to).validate(0, &state, &rules),
                Err(ValidationError::PrecompileRecipient(recipient)) if recipient == to
            ));
        }

        let above_range = address!("0x0000000000000000000000000000000000000400");
        assert!(value_transfer(above_range).validate(0, &state, &rules).is_ok());
    }

    #[test]
    fn value_transfer_requires_externally_owned_recipient() {
        let rules = rules(Hardfork::Prague);

        let mut state = InMemoryState::default();
        state.insert_program(RECIPIENT, Bytes::from_static(&[0x00]));
        assert!(matches!(
            value_transfer(RECIPIENT).validate_mutable(&state, &rules),
            Err(ValidationError::RecipientIsProgram(_))
        ));

        let mut state = InMemoryState::default();
        state.insert(
            RECIPIENT,
            InMemoryAccount {
                code: Bytes::from_static(&[0xef, 0x01, 0x00]),
                ..InMemoryAccount::default()
            },
        );
        assert!(matches!(
            value_transfer(RECIPIENT).validate_mutable(&state, &rules),
            Err(ValidationError::RecipientHasCode(_))
        ));

        assert!(value_transfer(RECIPIENT)
            .validate_mutable(&InMemoryState::default(), &rules)
            .is_ok());
    }

    #[test]
    fn execution_requires_code() {
        let delegated = InMemoryAccount {
            kind: AccountKind::Externally,
            code: Bytes::from_static(&[0xef, 0x01, 0x00]),
            ..InMemoryAccount::default()
        };

        let mut state = InMemoryState::default();
        state.insert(RECIPIENT, delegated);

        // Delegated externally owned accounts only qualify from Prague
        assert!(matches!(
            execution(RECIPIENT).validate_mutable(&state, &rules(Hardfork::Kaia)),
            Err(ValidationError::RecipientNotProgram(_))
        ));
        assert!(execution(RECIPIENT)
            .validate_mutable(&state, &rules(Hardfork::Prague))
            .is_ok());

        let mut state = InMemoryState::default();
        state.insert_program(RECIPIENT, Bytes::from_static(&[0x60, 0x00]));
        assert!(execution(RECIPIENT)
            .validate_mutable(&state, &rules(Hardfork::Kaia))
            .is_ok());

        assert!(matches!(
            execution(RECIPIENT).validate_mutable(&InMemoryState::default(), &rules(Hardfork::Prague)),
            Err(ValidationError::RecipientNotProgram(_))
        ));
    }

    #[test]
    fn deploy_validation() {
        let state = InMemoryState::default();
        let rules = rules(Hardfork::Prague);

        let valid = SmartContractDeployFields {
            from: SENDER,
            input: Bytes::from_static(&[0x60, 0x00]),
            ..SmartContractDeployFields::default()
        };
        assert!(valid.validate(0, &state, &rules).is_ok());

        let with_recipient = SmartContractDeployFields {
            to: Some(RECIPIENT),
            ..valid.clone()
        };
        assert!(matches!(
            with_recipient.validate(0, &state, &rules),
            Err(ValidationError::DeploymentWithRecipient)
        ));

        let human_readable = SmartContractDeployFields {
            human_readable: true,
            ..valid.clone()
        };
        assert!(matches!(
            human_readable.validate(0, &state, &rules),
            Err(ValidationError::HumanReadableNotSupported)
        ));

        let unknown_format = SmartContractDeployFields {
            code_format: 1,
            ..valid.clone()
        };
        assert!(matches!(
            unknown_format.validate(0, &state, &rules),
            Err(ValidationError::UnknownCodeFormat(1))
        ));

        let mut state = InMemoryState::default();
        state.insert(SENDER.create(5), InMemoryAccount::default());
        assert!(matches!(
            valid.validate(5, &state, &rules),
            Err(ValidationError::AccountAlreadyExists(address)) if address == SENDER.create(5)
        ));
        assert!(valid.validate(4, &state, &rules).is_ok());
    }

    #[test]
    fn program_accounts_cannot_update_keys() {
        let fields = AccountUpdateFields {
            from: SENDER,
            key: Bytes::from_static(&[0x01, 0xc0]),
        };
        let rules = rules(Hardfork::Prague);

        assert!(fields.validate(0, &InMemoryState::default(), &rules).is_ok());

        let mut state = InMemoryState::default();
        state.insert_program(SENDER, Bytes::new());
        assert!(matches!(
            fields.validate(0, &state, &rules),
            Err(ValidationError::ProgramAccountKeyUpdate(address)) if address == SENDER
        ));
    }

    #[test]
    fn deploy_decodes_empty_recipient() -> anyhow::Result<()> {
        let fields = SmartContractDeployFields {
            from: SENDER,
            input: Bytes::from_static(&[0x60]),
            ..SmartContractDeployFields::default()
        };

        let mut encoded = Vec::new();
        fields.encode_fields(None, &mut encoded);
        assert_eq!(encoded.first(), Some(&alloy_rlp::EMPTY_STRING_CODE));

        let (decoded, fee_ratio) =
            SmartContractDeployFields::decode_fields(&mut encoded.as_slice(), false)?;
        assert_eq!(decoded, fields);
        assert_eq!(fee_ratio, None);

        Ok(())
    }
}

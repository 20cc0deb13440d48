use alloy_rlp::{BufMut, Decodable as _, Encodable, RlpDecodable};
use kaia_chain_config::Rules;
use kaia_eip2930::AccessList;
use kaia_eip7702::{authorization_list_gas, SignedAuthorization};
use kaia_primitives::{Address, Bytes, TxKind, B256, U256};
use kaia_signer::{TxSignature, TxSignatures};
use kaia_state_api::State;

use crate::{
    execution::Action,
    gas::IntrinsicGas,
    rpc::{RpcTransaction, RpcTransactionConversionError},
    utils::{
        encode_list_header, encode_signature_fields, hash_enveloped_list, list_length,
        signature_fields_length, validate_y_parity_signature,
    },
    validation::ValidationError,
    BaseFeeBearing, EthereumTyped, PayloadBearing, TransactionType, TransactionVariant,
};

/// An EIP-7702 transaction that installs code delegations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Eip7702 {
    // The order of these fields determines encoding order.
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
    pub access_list: AccessList,
    pub authorization_list: Vec<SignedAuthorization>,
    /// Signature with the Y-parity as V-value
    pub signature: TxSignature,
}

impl Eip7702 {
    /// The type identifier for an EIP-7702 transaction.
    pub const TYPE: TransactionType = TransactionType::EthereumSetCode;

    /// The EIP-2718 type byte.
    pub const ETHEREUM_TYPE: u8 = 4;

    fn unsigned_fields_length(&self) -> usize {
        self.chain_id.length()
            + self.nonce.length()
            + self.max_priority_fee_per_gas.length()
            + self.max_fee_per_gas.length()
            + self.gas_limit.length()
            + self.to.length()
            + self.value.length()
            + self.input.length()
            + self.access_list.length()
            + self.authorization_list.length()
    }

    fn encode_unsigned_fields(&self, out: &mut dyn BufMut) {
        self.chain_id.encode(out);
        self.nonce.encode(out);
        self.max_priority_fee_per_gas.encode(out);
        self.max_fee_per_gas.encode(out);
        self.gas_limit.encode(out);
        self.to.encode(out);
        self.value.encode(out);
        self.input.encode(out);
        self.access_list.encode(out);
        self.authorization_list.encode(out);
    }

    fn payload_length(&self) -> usize {
        self.unsigned_fields_length() + signature_fields_length(&self.signature)
    }
}

impl Encodable for Eip7702 {
    fn encode(&self, out: &mut dyn BufMut) {
        encode_list_header(self.payload_length(), out);
        self.encode_unsigned_fields(out);
        encode_signature_fields(&self.signature, out);
    }

    fn length(&self) -> usize {
        list_length(self.payload_length())
    }
}

#[derive(RlpDecodable)]
struct Decodable {
    // The order of these fields determines decoding order.
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
    pub access_list: AccessList,
    pub authorization_list: Vec<SignedAuthorization>,
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

impl alloy_rlp::Decodable for Eip7702 {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let transaction = Decodable::decode(buf)?;

        let signature = TxSignature {
            v: transaction.v,
            r: transaction.r,
            s: transaction.s,
        };
        validate_y_parity_signature(&signature)?;

        Ok(Self {
            chain_id: transaction.chain_id,
            nonce: transaction.nonce,
            max_priority_fee_per_gas: transaction.max_priority_fee_per_gas,
            max_fee_per_gas: transaction.max_fee_per_gas,
            gas_limit: transaction.gas_limit,
            to: transaction.to,
            value: transaction.value,
            input: transaction.input,
            access_list: transaction.access_list,
            authorization_list: transaction.authorization_list,
            signature,
        })
    }
}

impl BaseFeeBearing for Eip7702 {
    fn max_fee_per_gas(&self) -> u128 {
        self.max_fee_per_gas
    }

    fn max_priority_fee_per_gas(&self) -> u128 {
        self.max_priority_fee_per_gas
    }
}

impl EthereumTyped for Eip7702 {
    fn ethereum_type(&self) -> u8 {
        Self::ETHEREUM_TYPE
    }

    fn access_list(&self) -> &AccessList {
        &self.access_list
    }

    fn y_parity(&self) -> bool {
        self.signature.v == 1
    }
}

impl PayloadBearing for Eip7702 {
    fn payload(&self) -> &Bytes {
        &self.input
    }
}

impl TransactionVariant for Eip7702 {
    fn transaction_type(&self) -> TransactionType {
        Self::TYPE
    }

    fn nonce(&self) -> u64 {
        self.nonce
    }

    fn gas_price(&self) -> u128 {
        self.max_fee_per_gas
    }

    fn gas_limit(&self) -> u64 {
        self.gas_limit
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

    fn chain_id(&self) -> Option<u64> {
        Some(self.chain_id)
    }

    fn signatures(&self) -> &[TxSignature] {
        std::slice::from_ref(&self.signature)
    }

    fn signing_hash(&self, _chain_id: Option<u64>) -> B256 {
        hash_enveloped_list(Self::ETHEREUM_TYPE, self.unsigned_fields_length(), |out| {
            self.encode_unsigned_fields(out);
        })
    }

    fn transaction_hash(&self) -> B256 {
        hash_enveloped_list(Self::ETHEREUM_TYPE, self.payload_length(), |out| {
            self.encode_unsigned_fields(out);
            encode_signature_fields(&self.signature, out);
        })
    }

    fn intrinsic_gas(&self, rules: &Rules) -> IntrinsicGas {
        let list_gas = self
            .access_list
            .gas()
            .saturating_add(authorization_list_gas(&self.authorization_list));

        IntrinsicGas::new(Self::TYPE, &self.input, false, list_gas, rules)
    }

    fn action(&self) -> Action<'_> {
        Action::Call {
            to: self.to,
            input: &self.input,
        }
    }

    fn validate<StateT: State>(
        &self,
        _state: &StateT,
        _rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        if self.authorization_list.is_empty() {
            return Err(ValidationError::EmptyAuthorizationList);
        }

        Ok(())
    }

    fn validate_mutable<StateT: State>(
        &self,
        _state: &StateT,
        _rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        super::validate_recipient_is_not_precompile(TxKind::Call(self.to))
    }
}

impl From<&Eip7702> for RpcTransaction {
    fn from(transaction: &Eip7702) -> Self {
        let mut rpc = RpcTransaction::new(
            Eip7702::TYPE,
            transaction.nonce,
            transaction.gas_limit,
            TxSignatures::single(transaction.signature),
        );
        rpc.chain_id = Some(transaction.chain_id);
        rpc.max_priority_fee_per_gas = Some(transaction.max_priority_fee_per_gas);
        rpc.max_fee_per_gas = Some(transaction.max_fee_per_gas);
        rpc.to = Some(transaction.to);
        rpc.value = Some(transaction.value);
        rpc.input = Some(transaction.input.clone());
        rpc.access_list = Some(transaction.access_list.clone());
        rpc.authorization_list = Some(transaction.authorization_list.clone());
        rpc
    }
}

impl TryFrom<&RpcTransaction> for Eip7702 {
    type Error = RpcTransactionConversionError;

    fn try_from(rpc: &RpcTransaction) -> Result<Self, Self::Error> {
        Ok(Self {
            chain_id: rpc.chain_id.ok_or(RpcTransactionConversionError::MissingField("chainId"))?,
            nonce: rpc.nonce,
            max_priority_fee_per_gas: rpc.max_priority_fee_per_gas.ok_or(
                RpcTransactionConversionError::MissingField("maxPriorityFeePerGas"),
            )?,
            max_fee_per_gas: rpc
                .max_fee_per_gas
                .ok_or(RpcTransactionConversionError::MissingField("maxFeePerGas"))?,
            gas_limit: rpc.gas,
            to: rpc.to.ok_or(RpcTransactionConversionError::MissingField("to"))?,
            value: rpc.value.unwrap_or_default(),
            input: rpc.input.clone().unwrap_or_default(),
            access_list: rpc.access_list.clone().unwrap_or_default(),
            authorization_list: rpc
                .authorization_list
                .clone()
                .ok_or(RpcTransactionConversionError::MissingField("authorizationList"))?,
            signature: rpc.single_y_parity_signature()?,
        })
    }
}

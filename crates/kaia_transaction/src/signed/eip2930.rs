use alloy_rlp::{BufMut, Decodable as _, Encodable, RlpDecodable};
use kaia_chain_config::Rules;
use kaia_eip2930::AccessList;
use kaia_primitives::{Bytes, TxKind, B256, U256};
use kaia_signer::{TxSignature, TxSignatures};
use kaia_state_api::State;

use super::legacy::recipient;
use crate::{
    execution::Action,
    gas::IntrinsicGas,
    rpc::{RpcTransaction, RpcTransactionConversionError},
    utils::{
        encode_list_header, encode_signature_fields, hash_enveloped_list, list_length,
        signature_fields_length, validate_y_parity_signature,
    },
    validation::ValidationError,
    EthereumTyped, PayloadBearing, TransactionType, TransactionVariant,
};

/// An EIP-2930 transaction with an access list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Eip2930 {
    // The order of these fields determines encoding order.
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub kind: TxKind,
    pub value: U256,
    pub input: Bytes,
    pub access_list: AccessList,
    /// Signature with the Y-parity as V-value
    pub signature: TxSignature,
}

impl Eip2930 {
    /// The type identifier for an EIP-2930 transaction.
    pub const TYPE: TransactionType = TransactionType::EthereumAccessList;

    /// The EIP-2718 type byte.
    pub const ETHEREUM_TYPE: u8 = 1;

    fn unsigned_fields_length(&self) -> usize {
        self.chain_id.length()
            + self.nonce.length()
            + self.gas_price.length()
            + self.gas_limit.length()
            + self.kind.length()
            + self.value.length()
            + self.input.length()
            + self.access_list.length()
    }

    fn encode_unsigned_fields(&self, out: &mut dyn BufMut) {
        self.chain_id.encode(out);
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        self.kind.encode(out);
        self.value.encode(out);
        self.input.encode(out);
        self.access_list.encode(out);
    }

    fn payload_length(&self) -> usize {
        self.unsigned_fields_length() + signature_fields_length(&self.signature)
    }
}

impl Encodable for Eip2930 {
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
    pub gas_price: u128,
    pub gas_limit: u64,
    pub kind: TxKind,
    pub value: U256,
    pub input: Bytes,
    pub access_list: AccessList,
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

impl alloy_rlp::Decodable for Eip2930 {
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
            gas_price: transaction.gas_price,
            gas_limit: transaction.gas_limit,
            kind: transaction.kind,
            value: transaction.value,
            input: transaction.input,
            access_list: transaction.access_list,
            signature,
        })
    }
}

impl EthereumTyped for Eip2930 {
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

impl PayloadBearing for Eip2930 {
    fn payload(&self) -> &Bytes {
        &self.input
    }
}

impl TransactionVariant for Eip2930 {
    fn transaction_type(&self) -> TransactionType {
        Self::TYPE
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
        self.kind
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
        IntrinsicGas::new(
            Self::TYPE,
            &self.input,
            self.kind.is_create(),
            self.access_list.gas(),
            rules,
        )
    }

    fn action(&self) -> Action<'_> {
        match recipient(self.kind) {
            Some(to) => Action::Call {
                to,
                input: &self.input,
            },
            None => Action::Create { input: &self.input },
        }
    }

    fn validate_mutable<StateT: State>(
        &self,
        _state: &StateT,
        _rules: &Rules,
    ) -> Result<(), ValidationError<StateT::Error>> {
        super::validate_recipient_is_not_precompile(self.kind)
    }
}

impl From<&Eip2930> for RpcTransaction {
    fn from(transaction: &Eip2930) -> Self {
        let mut rpc = RpcTransaction::new(
            Eip2930::TYPE,
            transaction.nonce,
            transaction.gas_limit,
            TxSignatures::single(transaction.signature),
        );
        rpc.chain_id = Some(transaction.chain_id);
        rpc.gas_price = Some(transaction.gas_price);
        rpc.to = recipient(transaction.kind);
        rpc.value = Some(transaction.value);
        rpc.input = Some(transaction.input.clone());
        rpc.access_list = Some(transaction.access_list.clone());
        rpc
    }
}

impl TryFrom<&RpcTransaction> for Eip2930 {
    type Error = RpcTransactionConversionError;

    fn try_from(rpc: &RpcTransaction) -> Result<Self, Self::Error> {
        Ok(Self {
            chain_id: rpc.chain_id.ok_or(RpcTransactionConversionError::MissingField("chainId"))?,
            nonce: rpc.nonce,
            gas_price: rpc
                .gas_price
                .ok_or(RpcTransactionConversionError::MissingField("gasPrice"))?,
            gas_limit: rpc.gas,
            kind: rpc.to.map_or(TxKind::Create, TxKind::Call),
            value: rpc.value.unwrap_or_default(),
            input: rpc.input.clone().unwrap_or_default(),
            access_list: rpc.access_list.clone().unwrap_or_default(),
            signature: rpc.single_y_parity_signature()?,
        })
    }
}

use alloy_rlp::{BufMut, Decodable as _, Encodable, RlpDecodable};
use kaia_chain_config::Rules;
use kaia_primitives::{keccak256, Address, Bytes, TxKind, B256, U256};
use kaia_signer::{SignatureError, TxSignature, TxSignatures};
use kaia_state_api::State;

use crate::{
    execution::Action,
    gas::IntrinsicGas,
    rpc::{RpcTransaction, RpcTransactionConversionError},
    utils::{
        encode_list_header, encode_signature_fields, invalid_signature, list_length,
        signature_fields_length,
    },
    validation::ValidationError,
    PayloadBearing, TransactionType, TransactionVariant,
};

/// A transaction in the original Ethereum format. It carries no type byte on
/// the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Legacy {
    // The order of these fields determines encoding order.
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub kind: TxKind,
    pub value: U256,
    pub input: Bytes,
    /// Signature. The V-value is either `27 + recovery_id` or follows
    /// EIP-155.
    pub signature: TxSignature,
}

impl Legacy {
    /// The type identifier for a legacy transaction.
    pub const TYPE: TransactionType = TransactionType::Legacy;

    /// Whether the signature commits to a chain id (EIP-155).
    pub fn is_replay_protected(&self) -> bool {
        self.signature.v >= 35
    }

    fn unsigned_fields_length(&self) -> usize {
        self.nonce.length()
            + self.gas_price.length()
            + self.gas_limit.length()
            + self.kind.length()
            + self.value.length()
            + self.input.length()
    }

    fn encode_unsigned_fields(&self, out: &mut dyn BufMut) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        self.kind.encode(out);
        self.value.encode(out);
        self.input.encode(out);
    }
}

impl Encodable for Legacy {
    fn encode(&self, out: &mut dyn BufMut) {
        encode_list_header(
            self.unsigned_fields_length() + signature_fields_length(&self.signature),
            out,
        );
        self.encode_unsigned_fields(out);
        encode_signature_fields(&self.signature, out);
    }

    fn length(&self) -> usize {
        list_length(self.unsigned_fields_length() + signature_fields_length(&self.signature))
    }
}

#[derive(RlpDecodable)]
struct Decodable {
    // The order of these fields determines decoding order.
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub kind: TxKind,
    pub value: U256,
    pub input: Bytes,
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

impl alloy_rlp::Decodable for Legacy {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let transaction = Decodable::decode(buf)?;

        let signature = TxSignature {
            v: transaction.v,
            r: transaction.r,
            s: transaction.s,
        };

        if !matches!(signature.v, 27 | 28) && signature.v < 35 {
            return Err(alloy_rlp::Error::Custom("invalid signature values"));
        }
        signature.validate_values().map_err(invalid_signature)?;

        Ok(Self {
            nonce: transaction.nonce,
            gas_price: transaction.gas_price,
            gas_limit: transaction.gas_limit,
            kind: transaction.kind,
            value: transaction.value,
            input: transaction.input,
            signature,
        })
    }
}

impl PayloadBearing for Legacy {
    fn payload(&self) -> &Bytes {
        &self.input
    }
}

impl TransactionVariant for Legacy {
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
        self.signature.chain_id()
    }

    fn signatures(&self) -> &[TxSignature] {
        std::slice::from_ref(&self.signature)
    }

    fn signing_hash(&self, chain_id: Option<u64>) -> B256 {
        let replay_protection_length = chain_id.map_or(0, |chain_id| chain_id.length() + 2);

        let mut encoded = Vec::new();
        encode_list_header(
            self.unsigned_fields_length() + replay_protection_length,
            &mut encoded,
        );
        self.encode_unsigned_fields(&mut encoded);

        if let Some(chain_id) = chain_id {
            chain_id.encode(&mut encoded);
            0u8.encode(&mut encoded);
            0u8.encode(&mut encoded);
        }

        keccak256(encoded)
    }

    fn transaction_hash(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }

    fn intrinsic_gas(&self, rules: &Rules) -> IntrinsicGas {
        IntrinsicGas::new(Self::TYPE, &self.input, self.kind.is_create(), 0, rules)
    }

    fn action(&self) -> Action<'_> {
        match self.kind {
            TxKind::Call(to) => Action::Call {
                to,
                input: &self.input,
            },
            TxKind::Create => Action::Create { input: &self.input },
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

impl From<&Legacy> for RpcTransaction {
    fn from(transaction: &Legacy) -> Self {
        let mut rpc = RpcTransaction::new(
            Legacy::TYPE,
            transaction.nonce,
            transaction.gas_limit,
            TxSignatures::single(transaction.signature),
        );
        rpc.chain_id = transaction.signature.chain_id();
        rpc.gas_price = Some(transaction.gas_price);
        rpc.to = recipient(transaction.kind);
        rpc.value = Some(transaction.value);
        rpc.input = Some(transaction.input.clone());
        rpc
    }
}

impl TryFrom<&RpcTransaction> for Legacy {
    type Error = RpcTransactionConversionError;

    fn try_from(rpc: &RpcTransaction) -> Result<Self, Self::Error> {
        let signature = rpc.single_signature()?;
        if !matches!(signature.v, 27 | 28) && signature.v < 35 {
            return Err(SignatureError::InvalidV(signature.v).into());
        }

        Ok(Self {
            nonce: rpc.nonce,
            gas_price: rpc
                .gas_price
                .ok_or(RpcTransactionConversionError::MissingField("gasPrice"))?,
            gas_limit: rpc.gas,
            kind: rpc.to.map_or(TxKind::Create, TxKind::Call),
            value: rpc.value.unwrap_or_default(),
            input: rpc.input.clone().unwrap_or_default(),
            signature,
        })
    }
}

/// Returns the recipient of a call, if any.
pub(crate) fn recipient(kind: TxKind) -> Option<Address> {
    match kind {
        TxKind::Call(to) => Some(to),
        TxKind::Create => None,
    }
}

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
    BaseFeeBearing, EthereumTyped, PayloadBearing, TransactionType, TransactionVariant,
};

/// An EIP-1559 transaction priced by a fee cap and a tip cap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Eip1559 {
    // The order of these fields determines encoding order.
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
    pub kind: TxKind,
    pub value: U256,
    pub input: Bytes,
    pub access_list: AccessList,
    /// Signature with the Y-parity as V-value
    pub signature: TxSignature,
}

impl Eip1559 {
    /// The type identifier for an EIP-1559 transaction.
    pub const TYPE: TransactionType = TransactionType::EthereumDynamicFee;

    /// The EIP-2718 type byte.
    pub const ETHEREUM_TYPE: u8 = 2;

    fn unsigned_fields_length(&self) -> usize {
        self.chain_id.length()
            + self.nonce.length()
            + self.max_priority_fee_per_gas.length()
            + self.max_fee_per_gas.length()
            + self.gas_limit.length()
            + self.kind.length()
            + self.value.length()
            + self.input.length()
            + self.access_list.length()
    }

    fn encode_unsigned_fields(&self, out: &mut dyn BufMut) {
        self.chain_id.encode(out);
        self.nonce.encode(out);
        self.max_priority_fee_per_gas.encode(out);
        self.max_fee_per_gas.encode(out);
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

impl Encodable for Eip1559 {
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
    pub kind: TxKind,
    pub value: U256,
    pub input: Bytes,
    pub access_list: AccessList,
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

impl alloy_rlp::Decodable for Eip1559 {
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
            kind: transaction.kind,
            value: transaction.value,
            input: transaction.input,
            access_list: transaction.access_list,
            signature,
        })
    }
}

impl BaseFeeBearing for Eip1559 {
    fn max_fee_per_gas(&self) -> u128 {
        self.max_fee_per_gas
    }

    fn max_priority_fee_per_gas(&self) -> u128 {
        self.max_priority_fee_per_gas
    }
}

impl EthereumTyped for Eip1559 {
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

impl PayloadBearing for Eip1559 {
    fn payload(&self) -> &Bytes {
        &self.input
    }
}

impl TransactionVariant for Eip1559 {
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

impl From<&Eip1559> for RpcTransaction {
    fn from(transaction: &Eip1559) -> Self {
        let mut rpc = RpcTransaction::new(
            Eip1559::TYPE,
            transaction.nonce,
            transaction.gas_limit,
            TxSignatures::single(transaction.signature),
        );
        rpc.chain_id = Some(transaction.chain_id);
        rpc.max_priority_fee_per_gas = Some(transaction.max_priority_fee_per_gas);
        rpc.max_fee_per_gas = Some(transaction.max_fee_per_gas);
        rpc.to = recipient(transaction.kind);
        rpc.value = Some(transaction.value);
        rpc.input = Some(transaction.input.clone());
        rpc.access_list = Some(transaction.access_list.clone());
        rpc
    }
}

impl TryFrom<&RpcTransaction> for Eip1559 {
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
            kind: rpc.to.map_or(TxKind::Create, TxKind::Call),
            value: rpc.value.unwrap_or_default(),
            input: rpc.input.clone().unwrap_or_default(),
            access_list: rpc.access_list.clone().unwrap_or_default(),
            signature: rpc.single_y_parity_signature()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use alloy_rlp::Decodable as _;
    use kaia_primitives::{address, Address};
    use kaia_signer::public_key_to_address;

    use super::*;

    #[test]
    fn can_recover_sender() -> anyhow::Result<()> {
        let bytes = hex::decode("f872041a8459682f008459682f0d8252089461815774383099e24810ab832a5b2a5425c154d58829a2241af62c000080c001a059e6b67f48fb32e7e570dfb11e042b5ad2e55e3ce3ce9cd989c7e06e07feeafda0016b83f4f980694ed2eee4d10667242b1f40dc406901b34125b008d334d47469")?;

        let transaction = Eip1559::decode(&mut bytes.as_slice())?;
        assert_eq!(transaction.chain_id, 4);
        assert_eq!(transaction.nonce, 26);
        assert_eq!(transaction.max_priority_fee_per_gas, 1_500_000_000);
        assert_eq!(transaction.max_fee_per_gas, 1_500_000_013);
        assert_eq!(transaction.gas_limit, 21_000);
        assert_eq!(
            transaction.kind,
            TxKind::Call(address!("0x61815774383099e24810ab832a5b2a5425c154d5"))
        );
        assert_eq!(transaction.value, U256::from(3_000_000_000_000_000_000u64));
        assert!(transaction.y_parity());

        let public_key = transaction
            .signature
            .recover_public_key(transaction.signing_hash(None), 1)?;
        assert_eq!(
            public_key_to_address(public_key),
            Address::from_str("0x9421de2177f0e810ca1d69a040a2169f8c7c8e4b")?
        );

        Ok(())
    }

    #[test]
    fn gas_price_is_fee_cap() {
        let transaction = Eip1559 {
            max_priority_fee_per_gas: 1_000,
            max_fee_per_gas: 4_000,
            ..Eip1559::default()
        };

        assert_eq!(transaction.gas_price(), 4_000);
    }

    #[test]
    fn decode_rejects_invalid_y_parity() {
        let transaction = Eip1559 {
            signature: TxSignature {
                v: 27,
                r: U256::from(1),
                s: U256::from(1),
            },
            ..Eip1559::default()
        };

        let encoded = alloy_rlp::encode(&transaction);
        assert_eq!(
            Eip1559::decode(&mut encoded.as_slice()),
            Err(alloy_rlp::Error::Custom("invalid signature values"))
        );
    }
}

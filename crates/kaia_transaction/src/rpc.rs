use kaia_eip2930::AccessList;
use kaia_eip4844::BlobSidecar;
use kaia_eip7702::SignedAuthorization;
use kaia_primitives::{Address, Bytes, B256, U256};
use kaia_signer::{SignatureError, TxSignature, TxSignatures};

use crate::{fee::FeeRatio, TransactionType};

/// JSON-RPC representation of a transaction of any type.
///
/// Fields that a type does not carry are omitted.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    /// numeric transaction type
    pub type_int: TransactionType,
    /// name of the transaction type, e.g. `TxTypeValueTransfer`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// the number of transactions made by the sender prior to this one
    #[serde(with = "alloy_serde::quantity")]
    pub nonce: u64,
    /// gas price provided by the sender in kei
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub gas_price: Option<u128>,
    /// max priority fee per gas
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub max_priority_fee_per_gas: Option<u128>,
    /// max fee per gas
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub max_fee_per_gas: Option<u128>,
    /// gas provided by the sender
    #[serde(with = "alloy_serde::quantity")]
    pub gas: u64,
    /// address of the receiver. null when its a contract creation transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// value transferred in kei
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    /// sender declared by Kaia-native transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// the data sent along with the transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Bytes>,
    /// RLP-encoded account key installed by account updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_readable: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub code_format: Option<u8>,
    /// fee payer's share of the fee in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_ratio: Option<FeeRatio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_payer: Option<Address>,
    /// chain ID
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub chain_id: Option<u64>,
    /// access list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_list: Option<AccessList>,
    /// The maximum total fee per gas the sender is willing to pay for blob gas
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub max_fee_per_blob_gas: Option<u128>,
    /// List of versioned blob hashes associated with the transaction's blobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_versioned_hashes: Option<Vec<B256>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_list: Option<Vec<SignedAuthorization>>,
    /// blobs, commitments, and proofs of a blob transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidecar: Option<BlobSidecar>,
    /// the sender's signatures
    #[serde(default)]
    pub signatures: TxSignatures,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_payer_signatures: Option<TxSignatures>,
    /// hash of the transaction. Informational only, it is never trusted when
    /// decoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<B256>,
}

impl RpcTransaction {
    /// Constructs an object with the fields every transaction type carries.
    pub fn new(
        transaction_type: TransactionType,
        nonce: u64,
        gas: u64,
        signatures: TxSignatures,
    ) -> Self {
        Self {
            type_int: transaction_type,
            type_name: Some(transaction_type.name().to_string()),
            nonce,
            gas_price: None,
            max_priority_fee_per_gas: None,
            max_fee_per_gas: None,
            gas,
            to: None,
            value: None,
            from: None,
            input: None,
            key: None,
            human_readable: None,
            code_format: None,
            fee_ratio: None,
            fee_payer: None,
            chain_id: None,
            access_list: None,
            max_fee_per_blob_gas: None,
            blob_versioned_hashes: None,
            authorization_list: None,
            sidecar: None,
            signatures,
            fee_payer_signatures: None,
            hash: None,
        }
    }

    /// Returns the transaction type, checking that the type name, if present,
    /// agrees with it.
    pub fn transaction_type(&self) -> Result<TransactionType, RpcTransactionConversionError> {
        match &self.type_name {
            Some(name) if name != self.type_int.name() => {
                Err(RpcTransactionConversionError::TypeMismatch {
                    type_int: self.type_int,
                    type_name: name.clone(),
                })
            }
            _ => Ok(self.type_int),
        }
    }

    /// Returns the only signature of a single-signer transaction.
    pub fn single_signature(&self) -> Result<TxSignature, RpcTransactionConversionError> {
        let signature = match self.signatures.as_slice() {
            [signature] => *signature,
            signatures => {
                return Err(RpcTransactionConversionError::InvalidSignatureCount(
                    signatures.len(),
                ));
            }
        };

        signature.validate_values()?;
        Ok(signature)
    }

    /// Returns the only signature of an Ethereum typed transaction, whose
    /// V-value holds the Y-parity.
    pub fn single_y_parity_signature(&self) -> Result<TxSignature, RpcTransactionConversionError> {
        let signature = self.single_signature()?;
        if signature.v > 1 {
            return Err(SignatureError::InvalidV(signature.v).into());
        }

        Ok(signature)
    }
}

/// Error that occurs when trying to convert the JSON-RPC transaction object.
#[derive(Debug, thiserror::Error)]
pub enum RpcTransactionConversionError {
    /// A field required by the transaction type is missing.
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    /// The type name does not match the numeric type.
    #[error("Transaction type name {type_name} does not match type {type_int}")]
    TypeMismatch {
        /// The numeric type
        type_int: TransactionType,
        /// The provided name
        type_name: String,
    },
    /// A single-signer transaction carries zero or several signatures.
    #[error("Expected exactly one signature, got {0}")]
    InvalidSignatureCount(usize),
    /// A signature is structurally invalid.
    #[error(transparent)]
    InvalidSignature(#[from] SignatureError),
}

#[cfg(test)]
mod tests {
    use kaia_primitives::address;

    use super::*;

    fn dummy_signature() -> TxSignature {
        TxSignature {
            v: 2037,
            r: U256::from(1),
            s: U256::from(2),
        }
    }

    #[test]
    fn serializes_kaia_field_names() -> anyhow::Result<()> {
        let mut rpc = RpcTransaction::new(
            TransactionType::FeeDelegatedValueTransferWithRatio,
            3,
            21_000,
            TxSignatures::single(dummy_signature()),
        );
        rpc.fee_ratio = Some(FeeRatio::new(30)?);
        rpc.fee_payer = Some(address!("0x5a0043070275d9f6054307ee7348bd660849d90f"));

        let json = serde_json::to_value(&rpc)?;
        assert_eq!(json["typeInt"], 10);
        assert_eq!(json["type"], "TxTypeFeeDelegatedValueTransferWithRatio");
        assert_eq!(json["nonce"], "0x3");
        assert_eq!(json["gas"], "0x5208");
        assert_eq!(json["feeRatio"], "0x1e");
        assert_eq!(json["signatures"][0]["V"], "0x7f5");
        assert!(json.get("maxFeePerGas").is_none());

        Ok(())
    }

    #[test]
    fn type_name_must_agree() -> anyhow::Result<()> {
        let mut rpc = RpcTransaction::new(TransactionType::Cancel, 0, 0, TxSignatures::default());
        assert_eq!(rpc.transaction_type()?, TransactionType::Cancel);

        rpc.type_name = None;
        assert_eq!(rpc.transaction_type()?, TransactionType::Cancel);

        rpc.type_name = Some("TxTypeValueTransfer".to_string());
        assert!(matches!(
            rpc.transaction_type(),
            Err(RpcTransactionConversionError::TypeMismatch { .. })
        ));

        Ok(())
    }

    #[test]
    fn single_signature_count() {
        let rpc = RpcTransaction::new(TransactionType::Legacy, 0, 0, TxSignatures::default());
        assert!(matches!(
            rpc.single_signature(),
            Err(RpcTransactionConversionError::InvalidSignatureCount(0))
        ));

        let rpc = RpcTransaction::new(
            TransactionType::EthereumDynamicFee,
            0,
            0,
            TxSignatures::single(dummy_signature()),
        );
        assert!(rpc.single_signature().is_ok());
        assert!(matches!(
            rpc.single_y_parity_signature(),
            Err(RpcTransactionConversionError::InvalidSignature(
                SignatureError::InvalidV(2037)
            ))
        ));
    }
}

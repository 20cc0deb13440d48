use alloy_rlp::{BufMut, Decodable as _, Encodable, RlpDecodable};
use kaia_chain_config::Rules;
use kaia_eip2930::AccessList;
use kaia_eip4844::{is_kzg_versioned_hash, probe_network_shape, BlobSidecar, NetworkShape};
use kaia_primitives::{Address, Bytes, TxKind, B256, U256};
use kaia_signer::{TxSignature, TxSignatures};
use kaia_state_api::State;

use crate::{
    execution::Action,
    gas::IntrinsicGas,
    rpc::{RpcTransaction, RpcTransactionConversionError},
    utils::{
        decode_list_payload, encode_list_header, encode_signature_fields, ensure_consumed,
        hash_enveloped_list, list_length, signature_fields_length, validate_y_parity_signature,
    },
    validation::ValidationError,
    BaseFeeBearing, EthereumTyped, PayloadBearing, TransactionType, TransactionVariant,
};

/// An EIP-4844 transaction carrying blob hashes.
///
/// The sidecar only travels in the network encoding. The canonical encoding
/// and the identity hash ignore whether it is attached. Equality compares it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Eip4844 {
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
    pub max_fee_per_blob_gas: u128,
    pub blob_hashes: Vec<B256>,
    /// Signature with the Y-parity as V-value
    pub signature: TxSignature,
    /// Blobs, commitments, and proofs
    pub sidecar: Option<BlobSidecar>,
}

impl Eip4844 {
    /// The type identifier for an EIP-4844 transaction.
    pub const TYPE: TransactionType = TransactionType::EthereumBlob;

    /// The EIP-2718 type byte.
    pub const ETHEREUM_TYPE: u8 = 3;

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
            + self.max_fee_per_blob_gas.length()
            + self.blob_hashes.length()
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
        self.max_fee_per_blob_gas.encode(out);
        self.blob_hashes.encode(out);
    }

    fn payload_length(&self) -> usize {
        self.unsigned_fields_length() + signature_fields_length(&self.signature)
    }

    /// Length of the network encoding.
    pub fn network_length(&self) -> usize {
        match &self.sidecar {
            Some(sidecar) => list_length(self.length() + sidecar.fields_length()),
            None => self.length(),
        }
    }

    /// Encodes the transaction with its sidecar as
    /// `[[fields...], (version), blobs, commitments, proofs]`. Without a
    /// sidecar this is the canonical encoding.
    pub fn encode_network(&self, out: &mut dyn BufMut) {
        match &self.sidecar {
            Some(sidecar) => {
                encode_list_header(self.length() + sidecar.fields_length(), out);
                self.encode(out);
                sidecar.encode_fields(out);
            }
            None => self.encode(out),
        }
    }

    /// Returns the transaction without its sidecar.
    pub fn without_sidecar(&self) -> Self {
        Self {
            sidecar: None,
            ..self.clone()
        }
    }

    fn decode_canonical(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
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
            max_fee_per_blob_gas: transaction.max_fee_per_blob_gas,
            blob_hashes: transaction.blob_hashes,
            signature,
            sidecar: None,
        })
    }
}

impl Encodable for Eip4844 {
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
    pub max_fee_per_blob_gas: u128,
    pub blob_hashes: Vec<B256>,
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

/// Decodes any of the three shapes: canonical, or network form with a
/// version 0 or version 1 sidecar.
impl alloy_rlp::Decodable for Eip4844 {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let shape = probe_network_shape(buf)?;
        let Some(version) = shape.sidecar_version() else {
            debug_assert_eq!(shape, NetworkShape::Canonical);
            return Self::decode_canonical(buf);
        };

        let mut payload = decode_list_payload(buf)?;
        let mut transaction = Self::decode_canonical(&mut payload)?;

        let sidecar = BlobSidecar::decode_fields(&mut payload, version)?;
        ensure_consumed(payload)?;

        sidecar
            .validate_against(&transaction.blob_hashes)
            .map_err(|_error| alloy_rlp::Error::Custom("blob sidecar does not match blob hashes"))?;

        transaction.sidecar = Some(sidecar);
        Ok(transaction)
    }
}

impl BaseFeeBearing for Eip4844 {
    fn max_fee_per_gas(&self) -> u128 {
        self.max_fee_per_gas
    }

    fn max_priority_fee_per_gas(&self) -> u128 {
        self.max_priority_fee_per_gas
    }
}

impl EthereumTyped for Eip4844 {
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

impl PayloadBearing for Eip4844 {
    fn payload(&self) -> &Bytes {
        &self.input
    }
}

impl TransactionVariant for Eip4844 {
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
        IntrinsicGas::new(Self::TYPE, &self.input, false, self.access_list.gas(), rules)
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
        if self.blob_hashes.is_empty() {
            return Err(ValidationError::MissingBlobHashes);
        }

        if let Some(blob_hash) = self
            .blob_hashes
            .iter()
            .find(|blob_hash| !is_kzg_versioned_hash(blob_hash))
        {
            return Err(ValidationError::InvalidBlobHashVersion(*blob_hash));
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

impl From<&Eip4844> for RpcTransaction {
    fn from(transaction: &Eip4844) -> Self {
        let mut rpc = RpcTransaction::new(
            Eip4844::TYPE,
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
        rpc.max_fee_per_blob_gas = Some(transaction.max_fee_per_blob_gas);
        rpc.blob_versioned_hashes = Some(transaction.blob_hashes.clone());
        rpc.sidecar.clone_from(&transaction.sidecar);
        rpc
    }
}

impl TryFrom<&RpcTransaction> for Eip4844 {
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
            max_fee_per_blob_gas: rpc
                .max_fee_per_blob_gas
                .ok_or(RpcTransactionConversionError::MissingField("maxFeePerBlobGas"))?,
            blob_hashes: rpc
                .blob_versioned_hashes
                .clone()
                .ok_or(RpcTransactionConversionError::MissingField("blobVersionedHashes"))?,
            signature: rpc.single_y_parity_signature()?,
            sidecar: rpc.sidecar.clone(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use kaia_eip4844::{Blob, Bytes48, SidecarVersion, BYTES_PER_BLOB, CELLS_PER_EXT_BLOB};
    use kaia_primitives::address;

    use super::*;
    use crate::test_utils::InMemoryState;

    fn fake_blob() -> Blob {
        let mut bytes = vec![0x0u8];
        bytes.extend_from_slice(b"kaia blob");
        bytes.resize(BYTES_PER_BLOB, 0);

        Blob::from_bytes(bytes.as_slice()).expect("Invalid blob")
    }

    pub(crate) fn fake_sidecar(version: SidecarVersion) -> BlobSidecar {
        let proof_count = match version {
            SidecarVersion::V0 => 1,
            SidecarVersion::V1 => CELLS_PER_EXT_BLOB,
        };

        BlobSidecar {
            version,
            blobs: vec![fake_blob()],
            commitments: vec![Bytes48::from([0xc0; 48])],
            proofs: vec![Bytes48::from([0xaa; 48]); proof_count],
        }
    }

    pub(crate) fn dummy_transaction(sidecar: Option<BlobSidecar>) -> Eip4844 {
        let blob_hashes = sidecar
            .as_ref()
            .map_or_else(|| fake_sidecar(SidecarVersion::V0).versioned_hashes(), BlobSidecar::versioned_hashes);

        Eip4844 {
            chain_id: 1001,
            nonce: 7,
            max_priority_fee_per_gas: 1,
            max_fee_per_gas: 2,
            gas_limit: 3,
            to: address!("0xc014ba5ec014ba5ec014ba5ec014ba5ec014ba5e"),
            value: U256::from(4),
            input: Bytes::from_static(&[1, 2]),
            access_list: AccessList::default(),
            max_fee_per_blob_gas: 7,
            blob_hashes,
            signature: TxSignature {
                v: 1,
                r: U256::from(11),
                s: U256::from(13),
            },
            sidecar,
        }
    }

    #[test]
    fn canonical_encoding_strips_sidecar() -> anyhow::Result<()> {
        let transaction = dummy_transaction(Some(fake_sidecar(SidecarVersion::V0)));

        let canonical = alloy_rlp::encode(&transaction);
        assert_eq!(probe_network_shape(&canonical)?, NetworkShape::Canonical);

        let decoded = Eip4844::decode(&mut canonical.as_slice())?;
        assert_eq!(decoded, transaction.without_sidecar());
        assert_eq!(decoded.transaction_hash(), transaction.transaction_hash());

        Ok(())
    }

    #[test]
    fn network_encoding_round_trip() -> anyhow::Result<()> {
        for (version, shape) in [
            (SidecarVersion::V0, NetworkShape::NetworkV0),
            (SidecarVersion::V1, NetworkShape::NetworkV1),
        ] {
            let transaction = dummy_transaction(Some(fake_sidecar(version)));

            let mut encoded = Vec::new();
            transaction.encode_network(&mut encoded);
            assert_eq!(encoded.len(), transaction.network_length());
            assert_eq!(probe_network_shape(&encoded)?, shape);

            let decoded = Eip4844::decode(&mut encoded.as_slice())?;
            assert_eq!(decoded, transaction);
        }

        Ok(())
    }

    #[test]
    fn json_round_trip_with_sidecar() -> anyhow::Result<()> {
        for version in [SidecarVersion::V0, SidecarVersion::V1] {
            let transaction = dummy_transaction(Some(fake_sidecar(version)));

            let rpc = RpcTransaction::from(&transaction);
            let json = serde_json::to_value(&rpc)?;
            assert!(json.get("sidecar").is_some());

            let rpc: RpcTransaction = serde_json::from_value(json)?;
            let decoded = Eip4844::try_from(&rpc)?;
            assert_eq!(decoded, transaction);
            assert_eq!(decoded.sidecar.map(|sidecar| sidecar.version), Some(version));
        }

        Ok(())
    }

    #[test]
    fn decode_rejects_mismatched_sidecar() {
        let mut transaction = dummy_transaction(Some(fake_sidecar(SidecarVersion::V0)));
        transaction.blob_hashes = vec![B256::ZERO];

        let mut encoded = Vec::new();
        transaction.encode_network(&mut encoded);
        assert!(Eip4844::decode(&mut encoded.as_slice()).is_err());
    }

    #[test]
    fn validate_blob_hashes() {
        let state = InMemoryState::default();
        let rules = kaia_chain_config::ChainConfig::with_hardfork(
            1001,
            kaia_chain_config::Hardfork::Prague,
        )
        .rules(0);

        let transaction = dummy_transaction(None);
        assert!(transaction.validate(&state, &rules).is_ok());

        let mut empty = transaction.clone();
        empty.blob_hashes.clear();
        assert!(matches!(
            empty.validate(&state, &rules),
            Err(ValidationError::MissingBlobHashes)
        ));

        let mut wrong_version = transaction;
        wrong_version.blob_hashes = vec![B256::ZERO];
        assert!(matches!(
            wrong_version.validate(&state, &rules),
            Err(ValidationError::InvalidBlobHashVersion(hash)) if hash == B256::ZERO
        ));
    }
}

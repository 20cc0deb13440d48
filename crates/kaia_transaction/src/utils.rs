use alloy_rlp::{BufMut, Decodable, Encodable, Header};
use kaia_primitives::{keccak256, B256, U256};
use kaia_signer::{SignatureError, TxSignature};

/// Whether the first byte of an RLP item denotes a list.
pub fn is_list(byte: u8) -> bool {
    byte >= alloy_rlp::EMPTY_LIST_CODE
}

/// Length of a list with the provided payload length, including its header.
pub(crate) fn list_length(payload_length: usize) -> usize {
    payload_length + alloy_rlp::length_of_length(payload_length)
}

pub(crate) fn encode_list_header(payload_length: usize, out: &mut dyn BufMut) {
    Header {
        list: true,
        payload_length,
    }
    .encode(out);
}

/// Splits off the payload of the list at the start of `buf`, advancing `buf`
/// past the list.
pub(crate) fn decode_list_payload<'a>(buf: &mut &'a [u8]) -> alloy_rlp::Result<&'a [u8]> {
    let header = Header::decode(buf)?;
    if !header.list {
        return Err(alloy_rlp::Error::UnexpectedString);
    }

    let (payload, rest) = buf
        .split_at_checked(header.payload_length)
        .ok_or(alloy_rlp::Error::InputTooShort)?;

    *buf = rest;
    Ok(payload)
}

/// Ensures that a list's payload was fully consumed.
pub(crate) fn ensure_consumed(payload: &[u8]) -> alloy_rlp::Result<()> {
    if payload.is_empty() {
        Ok(())
    } else {
        Err(alloy_rlp::Error::ListLengthMismatch {
            expected: 0,
            got: payload.len(),
        })
    }
}

/// Length of a signature's `v, r, s` fields when flattened into an outer
/// list.
pub(crate) fn signature_fields_length(signature: &TxSignature) -> usize {
    signature.v.length() + signature.r.length() + signature.s.length()
}

/// Encodes a signature's `v, r, s` fields without a list header.
pub(crate) fn encode_signature_fields(signature: &TxSignature, out: &mut dyn BufMut) {
    signature.v.encode(out);
    signature.r.encode(out);
    signature.s.encode(out);
}

/// Decodes flattened `v, r, s` fields.
pub(crate) fn decode_signature_fields(buf: &mut &[u8]) -> alloy_rlp::Result<TxSignature> {
    let v = u64::decode(buf)?;
    let r = U256::decode(buf)?;
    let s = U256::decode(buf)?;

    Ok(TxSignature { v, r, s })
}

/// Computes `keccak(id || rlp([fields]))`, where `encode_fields` writes
/// `payload_length` bytes of list payload.
pub(crate) fn hash_enveloped_list(
    id: u8,
    payload_length: usize,
    encode_fields: impl FnOnce(&mut Vec<u8>),
) -> B256 {
    let mut encoded = Vec::with_capacity(1 + list_length(payload_length));
    encoded.put_u8(id);
    encode_list_header(payload_length, &mut encoded);
    encode_fields(&mut encoded);

    keccak256(encoded)
}

/// Validates the signature of an Ethereum typed transaction, whose V-value is
/// the plain Y-parity.
pub(crate) fn validate_y_parity_signature(signature: &TxSignature) -> alloy_rlp::Result<()> {
    if signature.v > 1 {
        return Err(alloy_rlp::Error::Custom("invalid signature values"));
    }

    signature.validate_values().map_err(invalid_signature)
}

/// Maps a structural signature failure onto a decoding error.
pub(crate) fn invalid_signature(_error: SignatureError) -> alloy_rlp::Error {
    alloy_rlp::Error::Custom("invalid signature values")
}

//! Types related to EIP-2930 access lists.

use alloy_rlp::{RlpDecodable, RlpDecodableWrapper, RlpEncodable, RlpEncodableWrapper};
use kaia_primitives::{Address, B256};

/// Gas charged per address in an access list.
pub const ACCESS_LIST_ADDRESS_COST: u64 = 2400;

/// Gas charged per storage key in an access list.
pub const ACCESS_LIST_STORAGE_KEY_COST: u64 = 1900;

/// An address and the storage keys it intends to access.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, RlpEncodable, RlpDecodable, serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct AccessListItem {
    /// Accessed address
    pub address: Address,
    /// Accessed storage keys
    pub storage_keys: Vec<B256>,
}

/// A list of addresses and storage keys that a transaction plans to access.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, RlpEncodableWrapper, RlpDecodableWrapper,
    serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct AccessList(pub Vec<AccessListItem>);

impl AccessList {
    /// Returns the number of addresses and the total number of storage keys.
    pub fn counts(&self) -> (u64, u64) {
        self.0.iter().fold((0, 0), |(addresses, keys), item| {
            (addresses + 1, keys + item.storage_keys.len() as u64)
        })
    }

    /// Returns the intrinsic gas charged for the access list.
    pub fn gas(&self) -> u64 {
        let (addresses, keys) = self.counts();
        addresses * ACCESS_LIST_ADDRESS_COST + keys * ACCESS_LIST_STORAGE_KEY_COST
    }

    /// Returns whether the access list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<AccessListItem>> for AccessList {
    fn from(items: Vec<AccessListItem>) -> Self {
        Self(items)
    }
}

impl std::ops::Deref for AccessList {
    type Target = [AccessListItem];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use alloy_rlp::Decodable as _;

    use super::*;

    fn dummy_access_list() -> AccessList {
        AccessList(vec![
            AccessListItem {
                address: Address::repeat_byte(0x11),
                storage_keys: vec![B256::repeat_byte(0x01), B256::repeat_byte(0x02)],
            },
            AccessListItem {
                address: Address::repeat_byte(0x22),
                storage_keys: Vec::new(),
            },
        ])
    }

    #[test]
    fn gas() {
        let access_list = dummy_access_list();

        assert_eq!(access_list.counts(), (2, 2));
        assert_eq!(access_list.gas(), 2 * 2400 + 2 * 1900);
        assert_eq!(AccessList::default().gas(), 0);
    }

    #[test]
    fn rlp_round_trip() -> anyhow::Result<()> {
        let access_list = dummy_access_list();

        let encoded = alloy_rlp::encode(&access_list);
        let decoded = AccessList::decode(&mut encoded.as_slice())?;
        assert_eq!(decoded, access_list);

        Ok(())
    }

    #[test]
    fn json_uses_camel_case() -> anyhow::Result<()> {
        let json = serde_json::to_value(dummy_access_list())?;
        assert!(json[0].get("storageKeys").is_some());

        Ok(())
    }
}

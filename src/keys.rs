//! Storage key derivation and SS58 address handling.

use anyhow::anyhow;
use codec::Encode;
use subxt::ext::{
    sp_core::{
        crypto::{Ss58AddressFormat, Ss58Codec},
        hashing::{blake2_128, twox_128, twox_64},
    },
    sp_runtime::AccountId32,
};

/// `twox128(pallet) ++ twox128(item)`, the prefix shared by every key of a storage item.
pub fn storage_prefix(pallet: &str, item: &str) -> Vec<u8> {
    let mut key = twox_128(pallet.as_bytes()).to_vec();
    key.extend_from_slice(&twox_128(item.as_bytes()));
    key
}

pub fn twox_64_concat<K: Encode>(key: &K) -> Vec<u8> {
    let encoded = key.encode();
    let mut out = twox_64(&encoded).to_vec();
    out.extend_from_slice(&encoded);
    out
}

pub fn blake2_128_concat<K: Encode>(key: &K) -> Vec<u8> {
    let encoded = key.encode();
    let mut out = blake2_128(&encoded).to_vec();
    out.extend_from_slice(&encoded);
    out
}

/// Parses an SS58 address regardless of its network prefix.
pub fn parse_address(address: &str) -> anyhow::Result<AccountId32> {
    AccountId32::from_ss58check_with_version(address)
        .map(|(account, _)| account)
        .map_err(|e| anyhow!("invalid account address {}: {:?}", address, e))
}

pub fn parse_addresses(addresses: &[String]) -> anyhow::Result<Vec<AccountId32>> {
    addresses.iter().map(|a| parse_address(a)).collect()
}

pub fn to_address(account: &AccountId32, ss58_prefix: u16) -> String {
    account.to_ss58check_with_version(Ss58AddressFormat::custom(ss58_prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_keyring::AccountKeyring;

    const ALICE_42: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

    #[test]
    fn system_account_key_matches_known_vector() {
        let alice = AccountKeyring::Alice.to_account_id();
        let mut key = storage_prefix("System", "Account");
        key.extend(blake2_128_concat(&alice));
        assert_eq!(
            hex::encode(key),
            "26aa394eea5630e07c48ae0c9558cef7b99d880ec681799c0cf30e8886371da9\
             de1e86a9a8c739864cf3cc5ec2bea59f\
             d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d"
        );
    }

    #[test]
    fn twox_64_concat_keeps_the_raw_key() {
        let alice = AccountKeyring::Alice.to_account_id();
        let hashed = twox_64_concat(&alice);
        assert_eq!(hashed.len(), 8 + 32);
        let raw: &[u8] = alice.as_ref();
        assert_eq!(&hashed[8..], raw);
    }

    #[test]
    fn addresses_render_and_parse_across_prefixes() {
        let alice = AccountKeyring::Alice.to_account_id();
        assert_eq!(to_address(&alice, 42), ALICE_42);

        let bifrost = to_address(&alice, 6);
        assert_ne!(bifrost, ALICE_42);
        assert_eq!(parse_address(&bifrost).unwrap(), alice);
        assert_eq!(parse_address(ALICE_42).unwrap(), alice);
    }

    #[test]
    fn garbage_address_is_rejected() {
        assert!(parse_address("not-an-address").is_err());
        assert!(parse_addresses(&[ALICE_42.to_string(), "X".to_string()]).is_err());
    }
}

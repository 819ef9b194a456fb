//! Delegation and caveat types.
//!
//! A [`Delegation`] authorizes its delegate to act under a bounded set of
//! [`Caveat`]s, each evaluated by an on-chain enforcer contract at redemption
//! time. In this pipeline delegator and delegate are always the same account:
//! the account authorizes itself to perform one specific, caveat-bounded
//! action, and nothing worse.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Authority marker for a delegation with no parent in a delegation chain.
///
/// Matches the on-chain framework's root sentinel (all-ones `bytes32`).
pub const ROOT_AUTHORITY: B256 = B256::repeat_byte(0xff);

/// Sentinel signature carried by a delegation the wallet has not signed yet.
/// The keyring fills this in before submission; encoding requires the field
/// to exist either way.
pub const UNSIGNED: Bytes = Bytes::new();

/// One machine-checkable constraint attached to a delegation.
///
/// `enforcer` identifies the on-chain contract that evaluates this caveat;
/// `terms` is that enforcer's tightly packed fixed-width parameter tuple;
/// `args` is reserved for values supplied only at redemption and is always
/// empty at construction time. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caveat {
    pub enforcer: Address,
    pub terms: Bytes,
    pub args: Bytes,
}

/// A hashable object authorizing `delegate` to act on behalf of `delegator`,
/// bounded by `caveats`.
///
/// Caveat order is exactly policy evaluation order (native first, then each
/// token change in report order). Order affects [`Delegation::hash`], so it
/// must be stable for a given input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delegation {
    pub delegate: Address,
    pub delegator: Address,
    /// [`ROOT_AUTHORITY`] for a root delegation, otherwise the parent's hash.
    pub authority: B256,
    pub caveats: Vec<Caveat>,
    /// Random value making otherwise-identical delegations hash differently.
    pub salt: U256,
    /// Wallet signature over the typed-data hash; [`UNSIGNED`] until signed.
    pub signature: Bytes,
}

// EIP-712 type strings fixed by the on-chain framework; their keccak256
// digests are the CAVEAT_TYPEHASH / DELEGATION_TYPEHASH used below.
const CAVEAT_TYPE: &[u8] = b"Caveat(address enforcer,bytes terms)";
const DELEGATION_TYPE: &[u8] =
    b"Delegation(address delegate,address delegator,bytes32 authority,Caveat[] caveats,uint256 salt)Caveat(address enforcer,bytes terms)";

impl Delegation {
    /// Compute this delegation's typed-data hash, exactly as the on-chain
    /// framework does. The external delegation store is keyed by this value.
    ///
    /// The signature is not part of the hash; a delegation hashes the same
    /// before and after signing.
    pub fn hash(&self) -> B256 {
        let caveat_type_hash = keccak256(CAVEAT_TYPE);
        let mut packet_hashes = Vec::with_capacity(self.caveats.len() * 32);
        for caveat in &self.caveats {
            let mut packet = Vec::with_capacity(96);
            packet.extend_from_slice(caveat_type_hash.as_slice());
            packet.extend_from_slice(B256::left_padding_from(caveat.enforcer.as_slice()).as_slice());
            packet.extend_from_slice(keccak256(&caveat.terms).as_slice());
            packet_hashes.extend_from_slice(keccak256(&packet).as_slice());
        }

        let mut encoded = Vec::with_capacity(192);
        encoded.extend_from_slice(keccak256(DELEGATION_TYPE).as_slice());
        encoded.extend_from_slice(B256::left_padding_from(self.delegate.as_slice()).as_slice());
        encoded.extend_from_slice(B256::left_padding_from(self.delegator.as_slice()).as_slice());
        encoded.extend_from_slice(self.authority.as_slice());
        encoded.extend_from_slice(keccak256(&packet_hashes).as_slice());
        encoded.extend_from_slice(&self.salt.to_be_bytes::<32>());
        keccak256(&encoded)
    }

    /// True if this delegation has no parent in a delegation chain.
    pub fn is_root(&self) -> bool {
        self.authority == ROOT_AUTHORITY
    }
}

/// The persisted record tracked by the external delegation store: the
/// delegation hash, the full chain from root to leaf, and free-form metadata.
///
/// Owned by the store, not by this crate; the lifecycle coordinator is the
/// only in-scope actor that mutates one, and only via `delete` and `store`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationEntry {
    pub hash: B256,
    pub delegation_chain: Vec<Delegation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

static SALT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Draw a fresh 256-bit delegation salt.
///
/// The upper 24 bytes come from the OS CSPRNG; the low 8 bytes are a
/// process-global monotonic counter. Two calls in the same process can never
/// return the same value, which is the contract the hash-keyed store relies
/// on: uniqueness, not mere statistical improbability.
pub fn fresh_salt() -> U256 {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes[..24]);
    let sequence = SALT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    bytes[24..].copy_from_slice(&sequence.to_be_bytes());
    U256::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn delegation_with_salt(salt: U256) -> Delegation {
        Delegation {
            delegate: address!("1111111111111111111111111111111111111111"),
            delegator: address!("1111111111111111111111111111111111111111"),
            authority: ROOT_AUTHORITY,
            caveats: vec![Caveat {
                enforcer: address!("2222222222222222222222222222222222222222"),
                terms: Bytes::from(vec![0xab; 52]),
                args: Bytes::new(),
            }],
            salt,
            signature: UNSIGNED,
        }
    }

    #[test]
    fn salt_changes_the_hash() {
        let a = delegation_with_salt(U256::from(1u64));
        let b = delegation_with_salt(U256::from(2u64));
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn caveat_order_changes_the_hash() {
        let mut a = delegation_with_salt(U256::from(1u64));
        a.caveats.push(Caveat {
            enforcer: address!("3333333333333333333333333333333333333333"),
            terms: Bytes::from(vec![0xcd; 52]),
            args: Bytes::new(),
        });
        let mut b = a.clone();
        b.caveats.reverse();
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn signature_does_not_affect_the_hash() {
        let unsigned = delegation_with_salt(U256::from(7u64));
        let mut signed = unsigned.clone();
        signed.signature = Bytes::from(vec![0x01; 65]);
        assert_eq!(unsigned.hash(), signed.hash());
    }

    #[test]
    fn fresh_salts_never_repeat() {
        let salts: Vec<U256> = (0..64).map(|_| fresh_salt()).collect();
        for (i, a) in salts.iter().enumerate() {
            for b in &salts[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn root_detection() {
        let root = delegation_with_salt(U256::from(1u64));
        assert!(root.is_root());

        let mut child = root.clone();
        child.authority = root.hash();
        assert!(!child.is_root());
    }
}

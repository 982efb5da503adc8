//! # Canonical Association Identifier
//!
//! Typed-data (EIP-712 style) hashing of an [`AssociationRecord`].
//!
//! ```text
//! id = keccak256(0x19 || 0x01 || domainSeparator || structHash)
//! structHash = keccak256(RECORD_TYPEHASH || lo || hi || interfaceId
//!                        || keccak256(data) || validAt || validUntil)
//! ```
//!
//! `lo`/`hi` are the two account hashes in ascending byte order, so the
//! identifier does not depend on which party is the initiator.

use super::ecdsa::keccak256;
use super::entities::{AssociationId, AssociationRecord, Hash};

/// Default protocol name bound into the domain separator.
pub const DEFAULT_DOMAIN_NAME: &str = "AssociatedAccounts";

/// Default protocol version bound into the domain separator.
pub const DEFAULT_DOMAIN_VERSION: &str = "1";

/// Type string of the domain separator struct.
pub const DOMAIN_TYPE: &str = "EIP712Domain(string name,string version)";

/// Type string of the association record struct.
pub const RECORD_TYPE: &str = "AssociatedAccountRecord(bytes initiator,bytes approver,bytes4 interfaceId,bytes data,uint64 validAt,uint64 validUntil)";

/// Derives association identifiers under a fixed domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canonicalizer {
    domain_separator: Hash,
    record_typehash: Hash,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new(DEFAULT_DOMAIN_NAME, DEFAULT_DOMAIN_VERSION)
    }
}

impl Canonicalizer {
    /// Bind a canonicalizer to a protocol name and version.
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            domain_separator: domain_separator(name, version),
            record_typehash: keccak256(RECORD_TYPE.as_bytes()),
        }
    }

    /// The domain separator in use.
    pub fn domain_separator(&self) -> Hash {
        self.domain_separator
    }

    /// Struct hash of a record (before domain binding).
    pub fn struct_hash(&self, record: &AssociationRecord) -> Hash {
        let (lo, hi) = sorted_pair(
            record.initiator.account_hash(),
            record.approver.account_hash(),
        );

        let mut interface_word = [0u8; 32];
        interface_word[..4].copy_from_slice(&record.interface_id);

        let mut encoded = Vec::with_capacity(7 * 32);
        encoded.extend_from_slice(&self.record_typehash);
        encoded.extend_from_slice(&lo);
        encoded.extend_from_slice(&hi);
        encoded.extend_from_slice(&interface_word);
        encoded.extend_from_slice(&keccak256(&record.data));
        encoded.extend_from_slice(&uint_word(record.valid_at));
        encoded.extend_from_slice(&uint_word(record.valid_until));

        keccak256(&encoded)
    }

    /// The association identifier of a record.
    pub fn identifier(&self, record: &AssociationRecord) -> AssociationId {
        let mut digest_input = [0u8; 66];
        digest_input[0] = 0x19;
        digest_input[1] = 0x01;
        digest_input[2..34].copy_from_slice(&self.domain_separator);
        digest_input[34..].copy_from_slice(&self.struct_hash(record));
        keccak256(&digest_input)
    }
}

/// `keccak256(DOMAIN_TYPEHASH || keccak256(name) || keccak256(version))`
pub fn domain_separator(name: &str, version: &str) -> Hash {
    let mut encoded = [0u8; 96];
    encoded[..32].copy_from_slice(&keccak256(DOMAIN_TYPE.as_bytes()));
    encoded[32..64].copy_from_slice(&keccak256(name.as_bytes()));
    encoded[64..].copy_from_slice(&keccak256(version.as_bytes()));
    keccak256(&encoded)
}

/// Identifier under the default domain.
pub fn association_id(record: &AssociationRecord) -> AssociationId {
    Canonicalizer::default().identifier(record)
}

/// Byte-wise ascending order.
fn sorted_pair(a: Hash, b: Hash) -> (Hash, Hash) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Left-padded big-endian 256-bit word.
fn uint_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::AccountAddress;

    fn record() -> AssociationRecord {
        AssociationRecord::new(
            AccountAddress::evm(1, [0x11; 20]),
            AccountAddress::evm(1, [0x22; 20]),
            1_700_000_000,
        )
        .with_valid_until(1_800_000_000)
        .with_data([0xDE, 0xAD, 0xBE, 0xEF], b"sub-account".to_vec())
    }

    #[test]
    fn test_identifier_is_order_independent() {
        let canonicalizer = Canonicalizer::default();
        let r = record();
        assert_eq!(
            canonicalizer.identifier(&r),
            canonicalizer.identifier(&r.swapped())
        );
    }

    #[test]
    fn test_identifier_is_deterministic() {
        assert_eq!(association_id(&record()), association_id(&record()));
    }

    #[test]
    fn test_every_field_changes_identifier() {
        let base = association_id(&record());

        let mut r = record();
        r.valid_at += 1;
        assert_ne!(association_id(&r), base);

        let mut r = record();
        r.valid_until = 0;
        assert_ne!(association_id(&r), base);

        let mut r = record();
        r.interface_id = [0; 4];
        assert_ne!(association_id(&r), base);

        let mut r = record();
        r.data.push(0);
        assert_ne!(association_id(&r), base);

        let mut r = record();
        r.approver = AccountAddress::evm(10, [0x22; 20]);
        assert_ne!(association_id(&r), base);
    }

    #[test]
    fn test_domain_separates_identifiers() {
        let r = record();
        let v1 = Canonicalizer::new("AssociatedAccounts", "1");
        let v2 = Canonicalizer::new("AssociatedAccounts", "2");
        assert_ne!(v1.domain_separator(), v2.domain_separator());
        assert_ne!(v1.identifier(&r), v2.identifier(&r));
    }

    #[test]
    fn test_self_association_hashes() {
        let me = AccountAddress::evm(1, [0x33; 20]);
        let r = AssociationRecord::new(me.clone(), me, 5);
        assert_eq!(association_id(&r), association_id(&r.swapped()));
    }

    #[test]
    fn test_sorted_pair_orders_bytewise() {
        let mut low = [0xFF; 32];
        low[0] = 0x00;
        let high = [0x01; 32];
        assert_eq!(sorted_pair(high, low), (low, high));
        assert_eq!(sorted_pair(low, high), (low, high));
    }

    #[test]
    fn test_uint_word_is_big_endian() {
        let word = uint_word(0x0102);
        assert_eq!(word[30], 0x01);
        assert_eq!(word[31], 0x02);
        assert!(word[..30].iter().all(|&b| b == 0));
    }
}

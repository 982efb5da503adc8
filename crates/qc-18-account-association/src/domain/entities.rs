//! # Domain Entities
//!
//! Core data structures of the association protocol.
//!
//! - [`AccountAddress`]: opaque chain-qualified binary account identifier
//! - [`AssociationRecord`]: the immutable two-party proposal
//! - [`SignedAssociationRecord`]: the signed envelope with its revocation slot

use super::ecdsa::keccak256;
use super::errors::AssociationError;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;

/// 32-byte Keccak-256 digest.
pub type Hash = [u8; 32];

/// Ethereum-style address derived from public key (last 20 bytes of keccak256(pubkey))
pub type EvmAddress = [u8; 20];

/// Association identifier: the canonical hash of a record.
pub type AssociationId = Hash;

/// Index key of an account: `keccak256(address bytes)`.
pub type AccountHash = Hash;

/// 4-byte interface selector tagging the semantics of `data`.
pub type InterfaceId = [u8; 4];

// =============================================================================
// ACCOUNT ADDRESS
// =============================================================================

/// Chain-qualified binary account address.
///
/// The bytes are opaque to everything except the address codec. Equality is
/// byte-exact and the account index is keyed by [`AccountAddress::account_hash`].
#[serde_as]
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountAddress(#[serde_as(as = "Bytes")] Vec<u8>);

impl AccountAddress {
    /// Wrap raw bytes without decoding them.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw binary form.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hash used as the account index key.
    pub fn account_hash(&self) -> AccountHash {
        keccak256(&self.0)
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress(0x{})", hex::encode(&self.0))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

// =============================================================================
// KEY TYPES
// =============================================================================

/// Signature scheme tag selecting a verification strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
#[repr(u16)]
pub enum KeyType {
    /// ECDSA over secp256k1.
    K1 = 0x0000,
    /// ECDSA over P-256.
    R1 = 0x0001,
    /// WebAuthn assertion.
    WebAuthn = 0x0002,
    /// EdDSA over Curve25519.
    Ed25519 = 0x0003,
    /// BLS over BLS12-381.
    Bls = 0x0004,
    /// Contract-validated signature.
    Erc1271 = 0x8000,
    /// Contract-validated signature of a not-yet-deployed account.
    Erc6492 = 0x8001,
}

impl KeyType {
    /// Every known tag, in tag order.
    pub const ALL: [KeyType; 7] = [
        KeyType::K1,
        KeyType::R1,
        KeyType::WebAuthn,
        KeyType::Ed25519,
        KeyType::Bls,
        KeyType::Erc1271,
        KeyType::Erc6492,
    ];

    /// The 2-byte wire tag.
    pub fn tag(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for KeyType {
    type Error = AssociationError;

    fn try_from(tag: u16) -> Result<Self, Self::Error> {
        KeyType::ALL
            .into_iter()
            .find(|k| k.tag() == tag)
            .ok_or(AssociationError::UnsupportedKeyType(tag))
    }
}

impl From<KeyType> for u16 {
    fn from(key_type: KeyType) -> Self {
        key_type.tag()
    }
}

// =============================================================================
// ECDSA SIGNATURE (secp256k1)
// =============================================================================

/// ECDSA signature on the secp256k1 curve.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdsaSignature {
    /// R component (32 bytes)
    pub r: [u8; 32],
    /// S component (32 bytes)
    pub s: [u8; 32],
    /// Recovery ID (0, 1, 27, or 28)
    pub v: u8,
}

impl EcdsaSignature {
    /// Encoded length: `r || s || v`.
    pub const LEN: usize = 65;

    /// Decode from the 65-byte `r || s || v` form.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::LEN {
            return None;
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Some(Self { r, s, v: bytes[64] })
    }

    /// Encode to `r || s || v`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::LEN);
        out.extend_from_slice(&self.r);
        out.extend_from_slice(&self.s);
        out.push(self.v);
        out
    }
}

// =============================================================================
// ASSOCIATION RECORDS
// =============================================================================

/// The two-party proposal.
///
/// Never mutated once part of a stored envelope.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationRecord {
    /// Proposing account.
    pub initiator: AccountAddress,
    /// Accepting account.
    pub approver: AccountAddress,
    /// Start of validity (seconds).
    pub valid_at: u64,
    /// End of validity (seconds, exclusive); 0 means no expiry.
    pub valid_until: u64,
    /// Selector describing how `data` is interpreted.
    pub interface_id: InterfaceId,
    /// Opaque payload.
    #[serde_as(as = "Bytes")]
    pub data: Vec<u8>,
}

impl AssociationRecord {
    /// A record with no expiry, no interface tag and no payload.
    pub fn new(initiator: AccountAddress, approver: AccountAddress, valid_at: u64) -> Self {
        Self {
            initiator,
            approver,
            valid_at,
            valid_until: 0,
            interface_id: [0u8; 4],
            data: Vec::new(),
        }
    }

    /// Set the expiry.
    pub fn with_valid_until(mut self, valid_until: u64) -> Self {
        self.valid_until = valid_until;
        self
    }

    /// Attach a tagged payload.
    pub fn with_data(mut self, interface_id: InterfaceId, data: Vec<u8>) -> Self {
        self.interface_id = interface_id;
        self.data = data;
        self
    }

    /// The same record with initiator and approver swapped.
    pub fn swapped(&self) -> Self {
        Self {
            initiator: self.approver.clone(),
            approver: self.initiator.clone(),
            ..self.clone()
        }
    }

    /// Whether `now` lies inside `[valid_at, valid_until)`.
    pub fn is_within_window(&self, now: u64) -> bool {
        self.valid_at <= now && (self.valid_until == 0 || now < self.valid_until)
    }
}

/// Signed envelope around an [`AssociationRecord`].
///
/// `revoked_at` is the only field that changes after storage, and only once.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAssociationRecord {
    /// The signed proposal.
    pub record: AssociationRecord,
    /// Scheme of the initiator's signature.
    pub initiator_key_type: KeyType,
    /// Scheme of the approver's signature.
    pub approver_key_type: KeyType,
    /// Initiator's signature over the association identifier.
    #[serde_as(as = "Bytes")]
    pub initiator_signature: Vec<u8>,
    /// Approver's signature over the association identifier.
    #[serde_as(as = "Bytes")]
    pub approver_signature: Vec<u8>,
    /// Revocation time (seconds); 0 means active.
    pub revoked_at: u64,
}

impl SignedAssociationRecord {
    /// Index key of the initiator.
    pub fn initiator_hash(&self) -> AccountHash {
        self.record.initiator.account_hash()
    }

    /// Index key of the approver.
    pub fn approver_hash(&self) -> AccountHash {
        self.record.approver.account_hash()
    }

    /// Whether `account_hash` is one of the two parties.
    pub fn involves(&self, account_hash: &AccountHash) -> bool {
        self.initiator_hash() == *account_hash || self.approver_hash() == *account_hash
    }

    /// Whether a revocation time has been committed.
    pub fn is_revoked(&self) -> bool {
        self.revoked_at != 0
    }

    /// Whether the revocation (if any) has not taken effect yet at `now`.
    pub fn is_unrevoked_at(&self, now: u64) -> bool {
        self.revoked_at == 0 || now < self.revoked_at
    }

    /// In its validity window and not revoked at `now`.
    pub fn is_active_at(&self, now: u64) -> bool {
        self.record.is_within_window(now) && self.is_unrevoked_at(now)
    }

    /// The filter applied by the active-associations listing, which
    /// additionally requires a non-zero `valid_at`.
    pub fn is_listed_active_at(&self, now: u64) -> bool {
        self.record.valid_at > 0 && self.is_active_at(now)
    }
}

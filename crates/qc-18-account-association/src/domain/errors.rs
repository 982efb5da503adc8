//! # Association Errors
//!
//! Error types for the association protocol core.
//!
//! Three classes of failure exist:
//! - **Malformed input**: `UnsupportedChainType`, `UnsupportedKeyType`, `MalformedAddress`
//! - **Validation failure**: `InvalidAssociation` (deliberately opaque)
//! - **State conflict**: `AssociationAlreadyExists`, `AssociationNotFound`,
//!   `AssociationAlreadyRevoked`, `UnauthorizedRevocation`

use super::entities::Hash;
use thiserror::Error;

/// Errors surfaced by the association store and its collaborators.
///
/// Every failure is terminal for the call that produced it and leaves the
/// store unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssociationError {
    /// The chain-type tag of an account address has no registered codec.
    #[error("Unsupported chain type: 0x{0:04x}")]
    UnsupportedChainType(u16),

    /// The key-type tag has no registered verification strategy, or the
    /// registered strategy is a placeholder for an unimplemented scheme.
    #[error("Unsupported key type: 0x{0:04x}")]
    UnsupportedKeyType(u16),

    /// The binary account address could not be decoded.
    #[error("Malformed account address: {0}")]
    MalformedAddress(String),

    /// Timestamp or signature validation failed.
    ///
    /// The failing sub-check is intentionally not reported.
    #[error("Invalid association")]
    InvalidAssociation,

    /// An association with this identifier is already stored.
    #[error("Association already exists: 0x{}", hex::encode(.0))]
    AssociationAlreadyExists(Hash),

    /// No association with this identifier is stored.
    #[error("Association not found: 0x{}", hex::encode(.0))]
    AssociationNotFound(Hash),

    /// The association already carries a revocation timestamp.
    #[error("Association already revoked: 0x{}", hex::encode(.0))]
    AssociationAlreadyRevoked(Hash),

    /// The caller is neither the initiator nor the approver.
    #[error("Unauthorized revocation")]
    UnauthorizedRevocation,
}

/// Low-level ECDSA failures.
///
/// These stay inside the verifier; the store only ever reports
/// [`AssociationError::InvalidAssociation`] for them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The signature format is invalid (wrong length, invalid encoding)
    #[error("Invalid signature format")]
    InvalidFormat,

    /// Signature has high S value (EIP-2 malleability protection)
    #[error("Malleable signature (high S value)")]
    MalleableSignature,

    /// Invalid recovery ID (v must be 0, 1, 27, or 28)
    #[error("Invalid recovery ID: {0}")]
    InvalidRecoveryId(u8),

    /// Failed to recover public key from signature
    #[error("Failed to recover public key")]
    RecoveryFailed,

    /// Recovered signer does not match expected signer
    #[error("Signer mismatch: expected {expected:?}, got {actual:?}")]
    SignerMismatch {
        expected: [u8; 20],
        actual: [u8; 20],
    },
}

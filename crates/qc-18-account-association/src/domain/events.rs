//! # Association Events
//!
//! Notifications emitted after a committed mutation. Replaying them in order
//! rebuilds the ledger (see [`super::ledger::AssociationLedger::apply`]).

use super::entities::{AccountHash, AssociationId, SignedAssociationRecord};
use serde::{Deserialize, Serialize};

/// A committed change to the association ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssociationEvent {
    /// A new association was stored.
    Created {
        /// Association identifier.
        id: AssociationId,
        /// Index key of the initiator.
        initiator_hash: AccountHash,
        /// Index key of the approver.
        approver_hash: AccountHash,
        /// The stored envelope.
        record: Box<SignedAssociationRecord>,
    },

    /// An association was revoked.
    Revoked {
        /// Association identifier.
        id: AssociationId,
        /// Index key of the revoking party.
        revoker_hash: AccountHash,
        /// Effective revocation time.
        revoked_at: u64,
    },
}

impl AssociationEvent {
    /// The affected association.
    pub fn id(&self) -> AssociationId {
        match self {
            Self::Created { id, .. } | Self::Revoked { id, .. } => *id,
        }
    }

    /// Short name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Revoked { .. } => "revoked",
        }
    }
}

//! # Inbound Ports (Driving Ports / API)
//!
//! The operations collaborators call on the association store.

use crate::domain::entities::{AccountAddress, AssociationId, SignedAssociationRecord};
use crate::domain::errors::AssociationError;

/// Primary Account Association API.
///
/// Implementations must be thread-safe (`Send + Sync`) and each mutating
/// call must either commit fully or leave state unchanged.
pub trait AccountAssociationApi: Send + Sync {
    /// Validate and commit a signed association.
    ///
    /// # Errors
    /// * `InvalidAssociation` - outside its validity window, already revoked,
    ///   oversized payload, or a signature does not verify
    /// * `AssociationAlreadyExists` - the identifier is already stored
    /// * `UnsupportedKeyType` / `UnsupportedChainType` / `MalformedAddress` -
    ///   malformed input
    fn store_association(
        &self,
        record: SignedAssociationRecord,
    ) -> Result<AssociationId, AssociationError>;

    /// Revoke an association on behalf of one of its parties.
    ///
    /// The committed time is `max(requested_revoked_at, now)`.
    ///
    /// # Errors
    /// * `AssociationNotFound`
    /// * `AssociationAlreadyRevoked`
    /// * `UnauthorizedRevocation` - `caller` is neither initiator nor approver
    fn revoke_association(
        &self,
        id: AssociationId,
        requested_revoked_at: u64,
        caller: &AccountAddress,
    ) -> Result<u64, AssociationError>;

    /// Fetch a stored envelope.
    fn get_association(
        &self,
        id: &AssociationId,
    ) -> Result<SignedAssociationRecord, AssociationError>;

    /// Every identifier involving `account`, in insertion order.
    fn get_association_ids_for_account(&self, account: &AccountAddress) -> Vec<AssociationId>;

    /// Every envelope involving `account`, including revoked and expired ones.
    fn get_associations_for_account(
        &self,
        account: &AccountAddress,
    ) -> Vec<SignedAssociationRecord>;

    /// Envelopes involving `account` that are currently active.
    fn get_active_associations_for_account(
        &self,
        account: &AccountAddress,
    ) -> Vec<SignedAssociationRecord>;

    /// Whether `a` and `b` share a currently active association.
    fn are_accounts_associated(&self, a: &AccountAddress, b: &AccountAddress) -> bool;

    /// The first association between `a` and `b`, whatever its state.
    fn get_association_between_accounts(
        &self,
        a: &AccountAddress,
        b: &AccountAddress,
    ) -> Option<SignedAssociationRecord>;
}

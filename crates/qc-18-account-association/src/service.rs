//! # Account Association Service
//!
//! Application service implementing [`AccountAssociationApi`].
//!
//! ## Architecture
//!
//! - Derives identifiers via the [`Canonicalizer`]
//! - Authenticates both parties via the [`SignatureVerifier`]
//! - Commits to the [`AssociationLedger`] behind a `parking_lot::RwLock`
//! - Publishes committed events to the [`AssociationEventSink`] port
//!
//! ## Atomicity
//!
//! Signatures are verified before the write lock is taken. The existence
//! re-check, the map insert and both index appends then happen under one
//! write lock, so concurrent `store` calls for the same identifier commit
//! exactly once. `revoke` runs all of its checks and its commit under one
//! write lock.
//!
//! Every commit happens while holding the publish-order mutex, which is
//! released only after the event reaches the sink. Events therefore leave
//! in commit order and the emitted log always replays. Readers take only
//! the ledger lock and are never blocked by a slow sink.

use crate::domain::canonical::Canonicalizer;
use crate::domain::config::AssociationConfig;
use crate::domain::entities::{
    AccountAddress, AccountHash, AssociationId, AssociationRecord, SignedAssociationRecord,
};
use crate::domain::errors::AssociationError;
use crate::domain::events::AssociationEvent;
use crate::domain::ledger::AssociationLedger;
use crate::ports::inbound::AccountAssociationApi;
use crate::ports::outbound::{AssociationEventSink, TimeSource};
use crate::verifier::SignatureVerifier;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Account Association Service.
pub struct AssociationService<T: TimeSource, E: AssociationEventSink> {
    config: AssociationConfig,
    canonicalizer: Canonicalizer,
    verifier: SignatureVerifier,
    ledger: RwLock<AssociationLedger>,
    publish_order: Mutex<()>,
    clock: T,
    events: E,
}

impl<T: TimeSource, E: AssociationEventSink> AssociationService<T, E> {
    /// Create a service with an empty ledger.
    pub fn new(config: AssociationConfig, verifier: SignatureVerifier, clock: T, events: E) -> Self {
        Self::with_ledger(config, verifier, clock, events, AssociationLedger::new())
    }

    /// Create a service over an existing ledger.
    pub fn with_ledger(
        config: AssociationConfig,
        verifier: SignatureVerifier,
        clock: T,
        events: E,
        ledger: AssociationLedger,
    ) -> Self {
        let canonicalizer = config.canonicalizer();
        Self {
            config,
            canonicalizer,
            verifier,
            ledger: RwLock::new(ledger),
            publish_order: Mutex::new(()),
            clock,
            events,
        }
    }

    /// Rebuild a service by replaying a previously emitted event log.
    ///
    /// Replayed events are not re-published.
    pub fn from_events<I>(
        config: AssociationConfig,
        verifier: SignatureVerifier,
        clock: T,
        events: E,
        log: I,
    ) -> Result<Self, AssociationError>
    where
        I: IntoIterator<Item = AssociationEvent>,
    {
        let ledger = AssociationLedger::replay(log)?;
        info!(associations = ledger.len(), "Association ledger rebuilt from events");
        Ok(Self::with_ledger(config, verifier, clock, events, ledger))
    }

    /// The active configuration.
    pub fn config(&self) -> &AssociationConfig {
        &self.config
    }

    /// Identifier the service derives for `record`.
    pub fn identifier(&self, record: &AssociationRecord) -> AssociationId {
        self.canonicalizer.identifier(record)
    }

    /// Number of stored associations.
    pub fn len(&self) -> usize {
        self.ledger.read().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.ledger.read().is_empty()
    }

    /// Copy of the committed state.
    pub fn snapshot(&self) -> AssociationLedger {
        self.ledger.read().clone()
    }

    /// All checks except duplicate detection.
    ///
    /// Any failing timestamp, payload or signature check collapses into
    /// `InvalidAssociation`; malformed-input errors pass through.
    fn validate(
        &self,
        id: &AssociationId,
        envelope: &SignedAssociationRecord,
        now: u64,
    ) -> Result<(), AssociationError> {
        let record = &envelope.record;

        let well_formed = record.data.len() <= self.config.max_data_len
            && record.is_within_window(now)
            && envelope.is_unrevoked_at(now);
        if !well_formed {
            return Err(AssociationError::InvalidAssociation);
        }

        let initiator_ok = self.verifier.verify(
            &record.initiator,
            envelope.initiator_key_type,
            &envelope.initiator_signature,
            id,
        )?;
        let approver_ok = self.verifier.verify(
            &record.approver,
            envelope.approver_key_type,
            &envelope.approver_signature,
            id,
        )?;
        if !(initiator_ok && approver_ok) {
            return Err(AssociationError::InvalidAssociation);
        }

        Ok(())
    }

    fn matches_pair(
        record: &SignedAssociationRecord,
        a_hash: &AccountHash,
        b_hash: &AccountHash,
    ) -> bool {
        let (initiator, approver) = (record.initiator_hash(), record.approver_hash());
        (initiator == *a_hash && approver == *b_hash) || (initiator == *b_hash && approver == *a_hash)
    }
}

impl<T: TimeSource, E: AssociationEventSink> AccountAssociationApi for AssociationService<T, E> {
    fn store_association(
        &self,
        envelope: SignedAssociationRecord,
    ) -> Result<AssociationId, AssociationError> {
        let now = self.clock.now();
        let id = self.identifier(&envelope.record);

        if self.ledger.read().contains(&id) {
            return Err(AssociationError::AssociationAlreadyExists(id));
        }

        if let Err(e) = self.validate(&id, &envelope, now) {
            warn!(id = %hex::encode(id), error = %e, "Association rejected");
            return Err(e);
        }

        let initiator = hex::encode(envelope.initiator_hash());
        let approver = hex::encode(envelope.approver_hash());

        let _order = self.publish_order.lock();
        let event = self.ledger.write().insert(id, envelope)?;

        info!(id = %hex::encode(id), %initiator, %approver, "Association stored");
        let receivers = self.events.publish(event);
        debug!(receivers, "Creation event published");

        Ok(id)
    }

    fn revoke_association(
        &self,
        id: AssociationId,
        requested_revoked_at: u64,
        caller: &AccountAddress,
    ) -> Result<u64, AssociationError> {
        // A zero revocation time means "active", so commit at least 1.
        let effective = requested_revoked_at.max(self.clock.now()).max(1);
        let revoker_hash = caller.account_hash();

        let _order = self.publish_order.lock();
        let event = self
            .ledger
            .write()
            .revoke(id, revoker_hash, effective)
            .map_err(|e| {
                warn!(id = %hex::encode(id), error = %e, "Revocation rejected");
                e
            })?;

        info!(id = %hex::encode(id), revoked_at = effective, "Association revoked");
        let receivers = self.events.publish(event);
        debug!(receivers, "Revocation event published");

        Ok(effective)
    }

    fn get_association(
        &self,
        id: &AssociationId,
    ) -> Result<SignedAssociationRecord, AssociationError> {
        self.ledger
            .read()
            .get(id)
            .cloned()
            .ok_or(AssociationError::AssociationNotFound(*id))
    }

    fn get_association_ids_for_account(&self, account: &AccountAddress) -> Vec<AssociationId> {
        self.ledger.read().ids_for(&account.account_hash()).to_vec()
    }

    fn get_associations_for_account(
        &self,
        account: &AccountAddress,
    ) -> Vec<SignedAssociationRecord> {
        self.ledger
            .read()
            .records_for(&account.account_hash())
            .cloned()
            .collect()
    }

    fn get_active_associations_for_account(
        &self,
        account: &AccountAddress,
    ) -> Vec<SignedAssociationRecord> {
        let now = self.clock.now();
        self.ledger
            .read()
            .records_for(&account.account_hash())
            .filter(|r| r.is_listed_active_at(now))
            .cloned()
            .collect()
    }

    fn are_accounts_associated(&self, a: &AccountAddress, b: &AccountAddress) -> bool {
        let now = self.clock.now();
        let (a_hash, b_hash) = (a.account_hash(), b.account_hash());
        self.ledger
            .read()
            .records_for(&a_hash)
            .any(|r| Self::matches_pair(r, &a_hash, &b_hash) && r.is_active_at(now))
    }

    fn get_association_between_accounts(
        &self,
        a: &AccountAddress,
        b: &AccountAddress,
    ) -> Option<SignedAssociationRecord> {
        let (a_hash, b_hash) = (a.account_hash(), b.account_hash());
        self.ledger
            .read()
            .records_for(&a_hash)
            .find(|r| Self::matches_pair(r, &a_hash, &b_hash))
            .cloned()
    }
}

// =============================================================================
// TESTS
// =============================================================================

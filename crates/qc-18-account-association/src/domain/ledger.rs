//! # Association Ledger
//!
//! The identifier → envelope map and the account → identifiers index.
//!
//! Every mutating method validates first and writes last, so a failed call
//! leaves both maps untouched. The ledger performs no signature or timestamp
//! checks; those belong to the service.

use super::entities::{AccountHash, AssociationId, SignedAssociationRecord};
use super::errors::AssociationError;
use super::events::AssociationEvent;
use std::collections::HashMap;

/// In-memory association state.
#[derive(Debug, Clone, Default)]
pub struct AssociationLedger {
    associations: HashMap<AssociationId, SignedAssociationRecord>,
    index: HashMap<AccountHash, Vec<AssociationId>>,
}

impl AssociationLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger by applying events in order.
    pub fn replay<I>(events: I) -> Result<Self, AssociationError>
    where
        I: IntoIterator<Item = AssociationEvent>,
    {
        let mut ledger = Self::new();
        for event in events {
            ledger.apply(event)?;
        }
        Ok(ledger)
    }

    /// Number of stored associations.
    pub fn len(&self) -> usize {
        self.associations.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.associations.is_empty()
    }

    /// Whether `id` is stored.
    pub fn contains(&self, id: &AssociationId) -> bool {
        self.associations.contains_key(id)
    }

    /// Look up an envelope.
    pub fn get(&self, id: &AssociationId) -> Option<&SignedAssociationRecord> {
        self.associations.get(id)
    }

    /// Identifiers involving an account, in insertion order.
    pub fn ids_for(&self, account_hash: &AccountHash) -> &[AssociationId] {
        self.index
            .get(account_hash)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Envelopes involving an account, in insertion order.
    pub fn records_for<'a>(
        &'a self,
        account_hash: &AccountHash,
    ) -> impl Iterator<Item = &'a SignedAssociationRecord> + 'a {
        self.ids_for(account_hash)
            .iter()
            .filter_map(move |id| self.associations.get(id))
    }

    /// Commit a new association and index it under both parties.
    pub fn insert(
        &mut self,
        id: AssociationId,
        record: SignedAssociationRecord,
    ) -> Result<AssociationEvent, AssociationError> {
        if self.associations.contains_key(&id) {
            return Err(AssociationError::AssociationAlreadyExists(id));
        }

        let initiator_hash = record.initiator_hash();
        let approver_hash = record.approver_hash();

        self.index.entry(initiator_hash).or_default().push(id);
        if approver_hash != initiator_hash {
            self.index.entry(approver_hash).or_default().push(id);
        }
        self.associations.insert(id, record.clone());

        Ok(AssociationEvent::Created {
            id,
            initiator_hash,
            approver_hash,
            record: Box::new(record),
        })
    }

    /// Commit a revocation time.
    ///
    /// Fails if the association is absent, already carries a revocation
    /// time, or `revoker_hash` is not one of its parties.
    pub fn revoke(
        &mut self,
        id: AssociationId,
        revoker_hash: AccountHash,
        revoked_at: u64,
    ) -> Result<AssociationEvent, AssociationError> {
        let record = self
            .associations
            .get_mut(&id)
            .ok_or(AssociationError::AssociationNotFound(id))?;

        if record.is_revoked() {
            return Err(AssociationError::AssociationAlreadyRevoked(id));
        }
        if !record.involves(&revoker_hash) {
            return Err(AssociationError::UnauthorizedRevocation);
        }

        record.revoked_at = revoked_at;

        Ok(AssociationEvent::Revoked {
            id,
            revoker_hash,
            revoked_at,
        })
    }

    /// Apply a previously emitted event.
    pub fn apply(&mut self, event: AssociationEvent) -> Result<(), AssociationError> {
        match event {
            AssociationEvent::Created { id, record, .. } => {
                self.insert(id, *record)?;
            }
            AssociationEvent::Revoked {
                id,
                revoker_hash,
                revoked_at,
            } => {
                self.revoke(id, revoker_hash, revoked_at)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{AccountAddress, AssociationRecord, KeyType};

    fn envelope(a: u8, b: u8) -> SignedAssociationRecord {
        SignedAssociationRecord {
            record: AssociationRecord::new(
                AccountAddress::evm(1, [a; 20]),
                AccountAddress::evm(1, [b; 20]),
                1,
            ),
            initiator_key_type: KeyType::K1,
            approver_key_type: KeyType::K1,
            initiator_signature: vec![],
            approver_signature: vec![],
            revoked_at: 0,
        }
    }

    fn hash_of(byte: u8) -> AccountHash {
        AccountAddress::evm(1, [byte; 20]).account_hash()
    }

    #[test]
    fn test_insert_indexes_both_parties() {
        let mut ledger = AssociationLedger::new();
        ledger.insert([1; 32], envelope(0xA, 0xB)).unwrap();

        assert_eq!(ledger.ids_for(&hash_of(0xA)), &[[1; 32]]);
        assert_eq!(ledger.ids_for(&hash_of(0xB)), &[[1; 32]]);
        assert!(ledger.ids_for(&hash_of(0xC)).is_empty());
    }

    #[test]
    fn test_duplicate_insert_leaves_index_unchanged() {
        let mut ledger = AssociationLedger::new();
        ledger.insert([1; 32], envelope(0xA, 0xB)).unwrap();

        let err = ledger.insert([1; 32], envelope(0xA, 0xB)).unwrap_err();
        assert_eq!(err, AssociationError::AssociationAlreadyExists([1; 32]));
        assert_eq!(ledger.ids_for(&hash_of(0xA)).len(), 1);
    }

    #[test]
    fn test_self_association_indexed_once() {
        let mut ledger = AssociationLedger::new();
        ledger.insert([1; 32], envelope(0xA, 0xA)).unwrap();
        assert_eq!(ledger.ids_for(&hash_of(0xA)).len(), 1);
    }

    #[test]
    fn test_index_keeps_insertion_order() {
        let mut ledger = AssociationLedger::new();
        ledger.insert([3; 32], envelope(0xA, 0xB)).unwrap();
        ledger.insert([1; 32], envelope(0xC, 0xA)).unwrap();
        ledger.insert([2; 32], envelope(0xA, 0xD)).unwrap();

        assert_eq!(ledger.ids_for(&hash_of(0xA)), &[[3; 32], [1; 32], [2; 32]]);
    }

    #[test]
    fn test_revoke_checks_in_order() {
        let mut ledger = AssociationLedger::new();
        assert_eq!(
            ledger.revoke([9; 32], hash_of(0xA), 10),
            Err(AssociationError::AssociationNotFound([9; 32]))
        );

        ledger.insert([1; 32], envelope(0xA, 0xB)).unwrap();
        assert_eq!(
            ledger.revoke([1; 32], hash_of(0xC), 10),
            Err(AssociationError::UnauthorizedRevocation)
        );
        assert_eq!(ledger.get(&[1; 32]).unwrap().revoked_at, 0);

        ledger.revoke([1; 32], hash_of(0xB), 10).unwrap();
        assert_eq!(
            ledger.revoke([1; 32], hash_of(0xA), 20),
            Err(AssociationError::AssociationAlreadyRevoked([1; 32]))
        );
        assert_eq!(ledger.get(&[1; 32]).unwrap().revoked_at, 10);
    }

    #[test]
    fn test_replay_rebuilds_state() {
        let mut live = AssociationLedger::new();
        let events = vec![
            live.insert([1; 32], envelope(0xA, 0xB)).unwrap(),
            live.insert([2; 32], envelope(0xB, 0xC)).unwrap(),
            live.revoke([1; 32], hash_of(0xA), 42).unwrap(),
        ];

        let replayed = AssociationLedger::replay(events).unwrap();
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed.get(&[1; 32]), live.get(&[1; 32]));
        assert_eq!(replayed.ids_for(&hash_of(0xB)), live.ids_for(&hash_of(0xB)));
    }

    #[test]
    fn test_replay_rejects_revocation_of_unknown_id() {
        let events = vec![AssociationEvent::Revoked {
            id: [5; 32],
            revoker_hash: hash_of(0xA),
            revoked_at: 1,
        }];
        assert_eq!(
            AssociationLedger::replay(events).unwrap_err(),
            AssociationError::AssociationNotFound([5; 32])
        );
    }
}

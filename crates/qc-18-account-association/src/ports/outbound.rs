//! # Outbound Ports (Driven Ports / SPI)
//!
//! Dependencies the association service needs from its host:
//! - [`TimeSource`]: the current time
//! - [`ContractSignatureChecker`]: contract-account signature validation
//! - [`AssociationEventSink`]: delivery of committed events

use crate::domain::address::ParsedAddress;
use crate::domain::entities::Hash;
use crate::domain::events::AssociationEvent;
#[cfg(test)]
use parking_lot::Mutex;
#[cfg(test)]
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Abstract interface for time operations (for testability).
pub trait TimeSource: Send + Sync {
    /// Get current timestamp in seconds since epoch.
    fn now(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Start at `now`.
    pub fn new(now: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now)),
        }
    }

    /// Jump to `now`.
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Signature validation delegated to contract accounts (ERC-1271 style).
pub trait ContractSignatureChecker: Send + Sync {
    /// Whether the account is a deployed contract.
    fn is_contract(&self, account: &ParsedAddress) -> bool;

    /// Ask the contract whether `signature` is valid for `hash`.
    fn is_valid_signature(&self, account: &ParsedAddress, hash: &Hash, signature: &[u8]) -> bool;
}

/// Host without contract accounts: every contract check fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContractAccounts;

impl ContractSignatureChecker for NoContractAccounts {
    fn is_contract(&self, _account: &ParsedAddress) -> bool {
        false
    }

    fn is_valid_signature(&self, _account: &ParsedAddress, _hash: &Hash, _signature: &[u8]) -> bool {
        false
    }
}

/// Sink for committed association events.
pub trait AssociationEventSink: Send + Sync {
    /// Deliver an event. Returns the number of receivers reached.
    fn publish(&self, event: AssociationEvent) -> usize;
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl AssociationEventSink for NullEventSink {
    fn publish(&self, _event: AssociationEvent) -> usize {
        0
    }
}

impl<T: AssociationEventSink + ?Sized> AssociationEventSink for Arc<T> {
    fn publish(&self, event: AssociationEvent) -> usize {
        (**self).publish(event)
    }
}

impl<T: ContractSignatureChecker + ?Sized> ContractSignatureChecker for Arc<T> {
    fn is_contract(&self, account: &ParsedAddress) -> bool {
        (**self).is_contract(account)
    }

    fn is_valid_signature(&self, account: &ParsedAddress, hash: &Hash, signature: &[u8]) -> bool {
        (**self).is_valid_signature(account, hash, signature)
    }
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Contract accounts that approve pre-registered `(hash, signature)` pairs.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockContractAccounts {
    contracts: Mutex<HashSet<Vec<u8>>>,
    approvals: Mutex<HashSet<(Vec<u8>, Hash, Vec<u8>)>>,
}

#[cfg(test)]
impl MockContractAccounts {
    /// No contracts deployed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `address` as a deployed contract.
    pub fn deploy(&self, address: &[u8]) {
        self.contracts.lock().insert(address.to_vec());
    }

    /// Make the contract at `address` accept `signature` over `hash`.
    pub fn approve(&self, address: &[u8], hash: Hash, signature: &[u8]) {
        self.deploy(address);
        self.approvals
            .lock()
            .insert((address.to_vec(), hash, signature.to_vec()));
    }
}

#[cfg(test)]
impl ContractSignatureChecker for MockContractAccounts {
    fn is_contract(&self, account: &ParsedAddress) -> bool {
        self.contracts.lock().contains(&account.address)
    }

    fn is_valid_signature(&self, account: &ParsedAddress, hash: &Hash, signature: &[u8]) -> bool {
        self.approvals
            .lock()
            .contains(&(account.address.clone(), *hash, signature.to_vec()))
    }
}

/// Records every published event.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<AssociationEvent>>,
}

#[cfg(test)]
impl RecordingEventSink {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of events received so far.
    pub fn events(&self) -> Vec<AssociationEvent> {
        self.events.lock().clone()
    }
}

#[cfg(test)]
impl AssociationEventSink for RecordingEventSink {
    fn publish(&self, event: AssociationEvent) -> usize {
        self.events.lock().push(event);
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(100);
        let other = clock.clone();
        clock.advance(5);
        assert_eq!(other.now(), 105);
        other.set(7);
        assert_eq!(clock.now(), 7);
    }

    #[test]
    fn test_system_time_is_after_2020() {
        assert!(SystemTimeSource.now() > 1_577_836_800);
    }

    #[test]
    fn test_mock_contract_requires_exact_signature() {
        let mock = MockContractAccounts::new();
        let account = ParsedAddress {
            chain_type: 0,
            chain_reference: vec![1],
            address: vec![0xCC; 20],
        };
        mock.approve(&account.address, [1; 32], b"ok");

        assert!(mock.is_contract(&account));
        assert!(mock.is_valid_signature(&account, &[1; 32], b"ok"));
        assert!(!mock.is_valid_signature(&account, &[2; 32], b"ok"));
        assert!(!mock.is_valid_signature(&account, &[1; 32], b"no"));
    }
}

//! # Account Association Subsystem (QC-18)
//!
//! Stores signed, revocable associations between two chain-qualified
//! accounts. Both parties sign an order-independent identifier derived from
//! the record, so either may initiate and either may later revoke.
//!
//! ## Architecture
//!
//! This subsystem follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Address codec, canonical hashing, ECDSA
//!   recovery and the association ledger. No I/O.
//! - **Verifier** (`verifier.rs`): Per-key-type signature strategy table
//! - **Ports Layer** (`ports/`): Inbound API and outbound clock, contract
//!   and event-sink traits
//! - **Service Layer** (`service.rs`): Wires domain logic to ports
//! - **Adapters** (`adapters/`): Broadcast event fan-out
//!
//! ## Security Notes
//!
//! - **Malleability Prevention (EIP-2)**: ECDSA signatures with high S values
//!   are rejected
//! - **Domain Separation**: Identifiers bind a protocol name and version, so
//!   signatures do not transfer between deployments
//! - **Role Independence**: Swapping initiator and approver yields the same
//!   identifier, so a pair cannot be stored twice by reversing roles

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;
pub mod verifier;

// Re-export public API
pub use adapters::broadcast::{BroadcastEventSink, Subscription, SubscriptionError};
pub use domain::address::{AddressCodec, ChainCodec, EvmChainCodec, ParsedAddress};
pub use domain::canonical::{association_id, Canonicalizer};
pub use domain::config::AssociationConfig;
pub use domain::ecdsa::{address_from_pubkey, keccak256};
pub use domain::entities::{
    AccountAddress, AccountHash, AssociationId, AssociationRecord, EcdsaSignature, KeyType,
    SignedAssociationRecord,
};
pub use domain::errors::{AssociationError, SignatureError};
pub use domain::events::AssociationEvent;
pub use domain::ledger::AssociationLedger;
pub use ports::inbound::AccountAssociationApi;
pub use ports::outbound::{
    AssociationEventSink, ContractSignatureChecker, ManualClock, NoContractAccounts,
    NullEventSink, SystemTimeSource, TimeSource,
};
pub use service::AssociationService;
pub use verifier::{SignatureStrategy, SignatureVerifier};

//! # Domain Layer
//!
//! Address encoding, canonical hashing, signature recovery and the
//! association ledger. No I/O and no clock access.
//! This is the inner layer of the hexagonal architecture.

pub mod address;
pub mod canonical;
pub mod config;
pub mod ecdsa;
pub mod entities;
pub mod errors;
pub mod events;
pub mod ledger;

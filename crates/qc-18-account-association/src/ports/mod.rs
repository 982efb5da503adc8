//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: API that external callers use
//! - **Outbound (Driven)**: Clock, contract accounts, event delivery

pub mod inbound;
pub mod outbound;

//! Fuzz target for association storage.
//!
//! Adversarial envelopes must be rejected without panicking and must never
//! be committed, since the fuzzer cannot forge a valid signature pair.
//!
//! ## Running
//!
//! ```bash
//! cd crates/qc-18-account-association
//! cargo +nightly fuzz run fuzz_store_envelope
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use qc_18_account_association::{
    AccountAddress, AccountAssociationApi, AssociationConfig, AssociationRecord,
    AssociationService, KeyType, ManualClock, NullEventSink, SignatureVerifier,
    SignedAssociationRecord,
};

/// Fuzz input structure for a signed envelope.
#[derive(Debug, arbitrary::Arbitrary)]
struct FuzzInput {
    initiator: Vec<u8>,
    approver: Vec<u8>,
    interface_id: [u8; 4],
    data: Vec<u8>,
    valid_at: u64,
    valid_until: u64,
    initiator_key_type: u16,
    approver_key_type: u16,
    initiator_signature: Vec<u8>,
    approver_signature: Vec<u8>,
    revoked_at: u64,
    now: u64,
}

fuzz_target!(|input: FuzzInput| {
    let (Ok(initiator_key_type), Ok(approver_key_type)) = (
        KeyType::try_from(input.initiator_key_type),
        KeyType::try_from(input.approver_key_type),
    ) else {
        return;
    };

    let service = AssociationService::new(
        AssociationConfig::default(),
        SignatureVerifier::default(),
        ManualClock::new(input.now),
        NullEventSink,
    );

    let record = AssociationRecord::new(
        AccountAddress::from_bytes(input.initiator),
        AccountAddress::from_bytes(input.approver),
        input.valid_at,
    )
    .with_valid_until(input.valid_until)
    .with_data(input.interface_id, input.data);

    let envelope = SignedAssociationRecord {
        record,
        initiator_key_type,
        approver_key_type,
        initiator_signature: input.initiator_signature,
        approver_signature: input.approver_signature,
        revoked_at: input.revoked_at,
    };

    assert!(service.store_association(envelope).is_err());
    assert!(service.is_empty());
});

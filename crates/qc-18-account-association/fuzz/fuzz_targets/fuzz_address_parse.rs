//! Fuzz target for the chain-qualified address codec.
//!
//! Arbitrary bytes must either fail to parse or re-encode to exactly the
//! same bytes.
//!
//! ## Running
//!
//! ```bash
//! cd crates/qc-18-account-association
//! cargo +nightly fuzz run fuzz_address_parse
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use qc_18_account_association::{AccountAddress, AddressCodec};

fuzz_target!(|data: &[u8]| {
    let codec = AddressCodec::default();
    let address = AccountAddress::from_bytes(data.to_vec());

    // Parsing should NEVER panic, regardless of input
    let Ok(parsed) = codec.parse(&address) else {
        return;
    };

    let encoded = codec
        .format(parsed.chain_type, &parsed.chain_reference, &parsed.address)
        .expect("parsed address must re-encode");
    assert_eq!(encoded, address);
});

//! # ECDSA Recovery (secp256k1)
//!
//! Pure signer recovery for K1 association signatures.
//!
//! ## Security Notes
//!
//! - **Malleability Prevention (EIP-2)**: S must be STRICTLY LESS THAN SECP256K1_HALF_ORDER
//! - **Scalar Range Validation**: R and S must be in [1, n-1]
//! - **R Point Validation**: R must be a valid x-coordinate on the secp256k1 curve
//! - **Constant-Time Operations**: Uses `subtle` crate for side-channel resistance

use super::entities::{EcdsaSignature, EvmAddress, Hash};
use super::errors::SignatureError;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::FromEncodedPoint;
use k256::{AffinePoint, EncodedPoint};
use sha3::{Digest, Keccak256};
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroize;

/// secp256k1 curve order n
const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// n/2, the exclusive upper bound for S.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// Keccak-256 of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derive the EVM address of a public key.
pub fn address_from_pubkey(public_key: &VerifyingKey) -> EvmAddress {
    let encoded = public_key.to_encoded_point(false);
    // Skip the 0x04 SEC1 prefix
    let hash = keccak256(&encoded.as_bytes()[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Validate the signature's scalars and recover the signer address.
///
/// Checks, in order: R in [1, n-1], R on the curve, S in [1, n-1],
/// S in the lower half of the order, v in {0, 1, 27, 28}.
pub fn recover_signer(
    message_hash: &Hash,
    signature: &EcdsaSignature,
) -> Result<EvmAddress, SignatureError> {
    if !is_valid_scalar(&signature.r) || !is_valid_r_coordinate(&signature.r) {
        return Err(SignatureError::InvalidFormat);
    }
    if !is_valid_scalar(&signature.s) {
        return Err(SignatureError::InvalidFormat);
    }
    if !is_low_s(&signature.s) {
        return Err(SignatureError::MalleableSignature);
    }

    let recovery_id = parse_recovery_id(signature.v)?;

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&signature.r);
    sig_bytes[32..].copy_from_slice(&signature.s);
    let parsed = Signature::from_slice(&sig_bytes);
    sig_bytes.zeroize();
    let sig = parsed.map_err(|_| SignatureError::InvalidFormat)?;

    let key = VerifyingKey::recover_from_prehash(message_hash, &sig, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;

    Ok(address_from_pubkey(&key))
}

/// Recover the signer and require it to equal `expected`.
pub fn verify_signer(
    message_hash: &Hash,
    signature: &EcdsaSignature,
    expected: &EvmAddress,
) -> Result<(), SignatureError> {
    let actual = recover_signer(message_hash, signature)?;
    if !bool::from(actual.as_slice().ct_eq(expected.as_slice())) {
        return Err(SignatureError::SignerMismatch {
            expected: *expected,
            actual,
        });
    }
    Ok(())
}

/// Constant-time `a < b` over big-endian 32-byte integers.
fn ct_less_than(a: &[u8; 32], b: &[u8; 32]) -> Choice {
    let mut less = Choice::from(0u8);
    let mut greater = Choice::from(0u8);

    for (x, y) in a.iter().zip(b.iter()) {
        let undecided = !(less | greater);
        less |= undecided & Choice::from((x < y) as u8);
        greater |= undecided & Choice::from((x > y) as u8);
    }

    less
}

/// S strictly below n/2 (EIP-2).
fn is_low_s(s: &[u8; 32]) -> bool {
    ct_less_than(s, &SECP256K1_HALF_ORDER).into()
}

/// Scalar in [1, n-1].
fn is_valid_scalar(scalar: &[u8; 32]) -> bool {
    let mut is_zero = Choice::from(1u8);
    for byte in scalar {
        is_zero &= byte.ct_eq(&0u8);
    }
    (!is_zero & ct_less_than(scalar, &SECP256K1_ORDER)).into()
}

/// R must be the x-coordinate of a point on the curve.
fn is_valid_r_coordinate(r: &[u8; 32]) -> bool {
    let mut compressed = [0u8; 33];
    compressed[0] = 0x02;
    compressed[1..].copy_from_slice(r);

    match EncodedPoint::from_bytes(compressed) {
        Ok(encoded) => AffinePoint::from_encoded_point(&encoded).is_some().into(),
        Err(_) => false,
    }
}

fn parse_recovery_id(v: u8) -> Result<RecoveryId, SignatureError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(SignatureError::InvalidRecoveryId(v)),
    };
    RecoveryId::try_from(id).map_err(|_| SignatureError::InvalidRecoveryId(v))
}

/// s' = n - s
pub fn invert_s(s: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: i32 = 0;

    for i in (0..32).rev() {
        let diff = (SECP256K1_ORDER[i] as i32) - (s[i] as i32) - borrow;
        if diff < 0 {
            result[i] = (diff + 256) as u8;
            borrow = 1;
        } else {
            result[i] = diff as u8;
            borrow = 0;
        }
    }

    result
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use k256::ecdsa::SigningKey;

    /// Generate a new ECDSA keypair.
    pub fn generate_keypair() -> (SigningKey, VerifyingKey) {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let verifying_key = *signing_key.verifying_key();
        (signing_key, verifying_key)
    }

    /// Sign a prehashed message, normalizing to low S.
    pub fn sign(message_hash: &Hash, private_key: &SigningKey) -> EcdsaSignature {
        let (sig, recid) = private_key
            .sign_prehash_recoverable(message_hash)
            .expect("signing failed");

        let sig_bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig_bytes[..32]);
        s.copy_from_slice(&sig_bytes[32..]);

        let (s, flipped) = if is_low_s(&s) {
            (s, false)
        } else {
            (invert_s(&s), true)
        };
        let v = 27 + (recid.to_byte() ^ flipped as u8);

        EcdsaSignature { r, s, v }
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use super::*;

    #[test]
    fn test_recover_matches_pubkey_address() {
        let (private_key, public_key) = generate_keypair();
        let message_hash = keccak256(b"association");
        let signature = sign(&message_hash, &private_key);

        let recovered = recover_signer(&message_hash, &signature).unwrap();
        assert_eq!(recovered, address_from_pubkey(&public_key));
    }

    #[test]
    fn test_verify_signer_rejects_other_key() {
        let (private_key, _) = generate_keypair();
        let (_, other_public) = generate_keypair();
        let message_hash = keccak256(b"association");
        let signature = sign(&message_hash, &private_key);

        let result = verify_signer(
            &message_hash,
            &signature,
            &address_from_pubkey(&other_public),
        );
        assert!(matches!(result, Err(SignatureError::SignerMismatch { .. })));
    }

    #[test]
    fn test_wrong_message_recovers_different_signer() {
        let (private_key, public_key) = generate_keypair();
        let signature = sign(&keccak256(b"message 1"), &private_key);

        let result = verify_signer(
            &keccak256(b"message 2"),
            &signature,
            &address_from_pubkey(&public_key),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_high_s_rejected() {
        let (private_key, _) = generate_keypair();
        let message_hash = keccak256(b"test");
        let signature = sign(&message_hash, &private_key);

        let malleable = EcdsaSignature {
            s: invert_s(&signature.s),
            ..signature
        };
        assert_eq!(
            recover_signer(&message_hash, &malleable),
            Err(SignatureError::MalleableSignature)
        );
    }

    #[test]
    fn test_max_value_signature_rejected() {
        let sig = EcdsaSignature {
            r: [0xFF; 32],
            s: [0xFF; 32],
            v: 28,
        };
        assert_eq!(
            recover_signer(&keccak256(b"test"), &sig),
            Err(SignatureError::InvalidFormat)
        );
    }

    #[test]
    fn test_zero_scalars_rejected() {
        let hash = keccak256(b"test");
        let zero_r = EcdsaSignature {
            r: [0; 32],
            s: [1; 32],
            v: 27,
        };
        let zero_s = EcdsaSignature {
            r: [1; 32],
            s: [0; 32],
            v: 27,
        };
        assert!(recover_signer(&hash, &zero_r).is_err());
        assert!(recover_signer(&hash, &zero_s).is_err());
    }

    #[test]
    fn test_is_low_s_boundary() {
        assert!(!is_low_s(&SECP256K1_HALF_ORDER));

        let mut below = SECP256K1_HALF_ORDER;
        below[31] -= 1;
        assert!(is_low_s(&below));

        let mut above = SECP256K1_HALF_ORDER;
        above[31] += 1;
        assert!(!is_low_s(&above));
    }

    #[test]
    fn test_order_is_not_a_valid_scalar() {
        assert!(!is_valid_scalar(&SECP256K1_ORDER));
        assert!(!is_valid_scalar(&[0u8; 32]));
        assert!(is_valid_scalar(&SECP256K1_HALF_ORDER));
    }

    #[test]
    fn test_recovery_ids() {
        for v in [0u8, 1, 27, 28] {
            assert!(parse_recovery_id(v).is_ok(), "v={} should be valid", v);
        }
        for v in (2..27).chain(29..=255) {
            assert!(parse_recovery_id(v).is_err(), "v={} should be invalid", v);
        }
    }

    #[test]
    fn test_invert_s_is_involution() {
        let s = [0x01; 32];
        assert_eq!(invert_s(&invert_s(&s)), s);
    }

    #[test]
    fn test_keccak256_empty_input() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }
}

//! # Signature Verifier
//!
//! Dispatches signature checks to a per-[`KeyType`] strategy table.
//!
//! | Key type | Strategy |
//! |----------|----------|
//! | `K1` | ECDSA recovery against the EVM address, falling back to the contract check for contract accounts |
//! | `Erc1271` | Contract check only |
//! | `R1`, `WebAuthn`, `Ed25519`, `Bls`, `Erc6492` | Placeholder: always `UnsupportedKeyType` |
//!
//! Signatures are always checked against the association identifier, never
//! against raw record bytes.

use crate::domain::address::{AddressCodec, ParsedAddress};
use crate::domain::ecdsa;
use crate::domain::entities::{AccountAddress, EcdsaSignature, Hash, KeyType};
use crate::domain::errors::AssociationError;
use crate::ports::outbound::{ContractSignatureChecker, NoContractAccounts};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One signature scheme.
pub trait SignatureStrategy: Send + Sync {
    /// Check `signature` by `account` over `hash`.
    ///
    /// `Ok(false)` is a well-formed rejection; `Err` means the scheme itself
    /// cannot be evaluated.
    fn verify(
        &self,
        account: &ParsedAddress,
        signature: &[u8],
        hash: &Hash,
    ) -> Result<bool, AssociationError>;
}

/// secp256k1 ECDSA, or the account contract when the account is one.
pub struct K1Strategy {
    contracts: Arc<dyn ContractSignatureChecker>,
}

impl K1Strategy {
    /// Use `contracts` for the contract-account fallback.
    pub fn new(contracts: Arc<dyn ContractSignatureChecker>) -> Self {
        Self { contracts }
    }
}

impl SignatureStrategy for K1Strategy {
    fn verify(
        &self,
        account: &ParsedAddress,
        signature: &[u8],
        hash: &Hash,
    ) -> Result<bool, AssociationError> {
        let Some(expected) = account.evm_address() else {
            debug!(chain_type = account.chain_type, "K1 signature on non-EVM account");
            return Ok(false);
        };

        if let Some(sig) = EcdsaSignature::from_bytes(signature) {
            match ecdsa::verify_signer(hash, &sig, &expected) {
                Ok(()) => return Ok(true),
                Err(e) => debug!(error = %e, "ECDSA check failed"),
            }
        }

        Ok(self.contracts.is_contract(account)
            && self.contracts.is_valid_signature(account, hash, signature))
    }
}

/// Signature validated by the account contract alone.
pub struct ContractStrategy {
    contracts: Arc<dyn ContractSignatureChecker>,
}

impl ContractStrategy {
    /// Delegate to `contracts`.
    pub fn new(contracts: Arc<dyn ContractSignatureChecker>) -> Self {
        Self { contracts }
    }
}

impl SignatureStrategy for ContractStrategy {
    fn verify(
        &self,
        account: &ParsedAddress,
        signature: &[u8],
        hash: &Hash,
    ) -> Result<bool, AssociationError> {
        if !self.contracts.is_contract(account) {
            debug!("contract signature from non-contract account");
            return Ok(false);
        }
        Ok(self.contracts.is_valid_signature(account, hash, signature))
    }
}

/// Placeholder for a scheme without an implementation.
pub struct UnsupportedScheme(pub KeyType);

impl SignatureStrategy for UnsupportedScheme {
    fn verify(&self, _: &ParsedAddress, _: &[u8], _: &Hash) -> Result<bool, AssociationError> {
        Err(AssociationError::UnsupportedKeyType(self.0.tag()))
    }
}

/// Strategy table keyed by [`KeyType`].
#[derive(Clone)]
pub struct SignatureVerifier {
    codec: AddressCodec,
    strategies: HashMap<KeyType, Arc<dyn SignatureStrategy>>,
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self::new(AddressCodec::default(), Arc::new(NoContractAccounts))
    }
}

impl SignatureVerifier {
    /// The standard table: K1 and Erc1271 backed by `contracts`, every other
    /// known key type registered as a placeholder.
    pub fn new(codec: AddressCodec, contracts: Arc<dyn ContractSignatureChecker>) -> Self {
        let mut verifier = Self::empty(codec);
        verifier.register(KeyType::K1, Arc::new(K1Strategy::new(contracts.clone())));
        verifier.register(KeyType::Erc1271, Arc::new(ContractStrategy::new(contracts)));
        for key_type in [
            KeyType::R1,
            KeyType::WebAuthn,
            KeyType::Ed25519,
            KeyType::Bls,
            KeyType::Erc6492,
        ] {
            verifier.register(key_type, Arc::new(UnsupportedScheme(key_type)));
        }
        verifier
    }

    /// No strategies registered.
    pub fn empty(codec: AddressCodec) -> Self {
        Self {
            codec,
            strategies: HashMap::new(),
        }
    }

    /// Register (or replace) the strategy for `key_type`.
    pub fn register(&mut self, key_type: KeyType, strategy: Arc<dyn SignatureStrategy>) {
        self.strategies.insert(key_type, strategy);
    }

    /// The address codec used to decode accounts.
    pub fn codec(&self) -> &AddressCodec {
        &self.codec
    }

    /// Verify `signature` by `account` over `hash` using the `key_type` strategy.
    ///
    /// # Errors
    /// * `UnsupportedKeyType` - no strategy, or a placeholder strategy
    /// * `UnsupportedChainType` / `MalformedAddress` - the account cannot be decoded
    pub fn verify(
        &self,
        account: &AccountAddress,
        key_type: KeyType,
        signature: &[u8],
        hash: &Hash,
    ) -> Result<bool, AssociationError> {
        let strategy = self
            .strategies
            .get(&key_type)
            .ok_or(AssociationError::UnsupportedKeyType(key_type.tag()))?;
        let parsed = self.codec.parse(account)?;

        let valid = strategy.verify(&parsed, signature, hash)?;
        debug!(?key_type, %account, valid, "signature checked");
        Ok(valid)
    }
}

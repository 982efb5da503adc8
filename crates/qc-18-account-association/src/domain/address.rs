//! # Account Address Codec
//!
//! Parses and formats chain-qualified binary account addresses.
//!
//! ## Layout (version 1)
//!
//! ```text
//! | version (2) | chain type (2) | ref len (1) | chain reference | addr len (1) | address |
//! ```
//!
//! All integers are big-endian. Chain types are strategies registered in an
//! [`AddressCodec`]; only EVM (`0x0000`) ships by default.

use super::entities::{AccountAddress, EvmAddress};
use super::errors::AssociationError;
use std::collections::HashMap;
use std::sync::Arc;

/// Layout version understood by this codec.
pub const ADDRESS_VERSION: u16 = 0x0001;

/// Chain-type tag of EVM (eip155) chains.
pub const CHAIN_TYPE_EVM: u16 = 0x0000;

/// Length prefixes are single bytes.
const MAX_FIELD_LEN: usize = u8::MAX as usize;

/// Decoded components of an [`AccountAddress`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedAddress {
    /// Chain-type tag.
    pub chain_type: u16,
    /// Chain reference (e.g. big-endian chain id for EVM).
    pub chain_reference: Vec<u8>,
    /// Raw address bytes.
    pub address: Vec<u8>,
}

impl ParsedAddress {
    /// The 20-byte address, if this is an EVM address.
    pub fn evm_address(&self) -> Option<EvmAddress> {
        if self.chain_type != CHAIN_TYPE_EVM {
            return None;
        }
        self.address.as_slice().try_into().ok()
    }
}

/// Validation rules for one chain type.
pub trait ChainCodec: Send + Sync {
    /// The tag this codec handles.
    fn chain_type(&self) -> u16;

    /// Check chain reference and address bytes for this chain type.
    fn validate(&self, chain_reference: &[u8], address: &[u8]) -> Result<(), AssociationError>;
}

/// EVM-style chain-qualified addresses.
///
/// The chain reference is the minimal big-endian chain id, so each account
/// has exactly one byte form.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvmChainCodec;

impl ChainCodec for EvmChainCodec {
    fn chain_type(&self) -> u16 {
        CHAIN_TYPE_EVM
    }

    fn validate(&self, chain_reference: &[u8], address: &[u8]) -> Result<(), AssociationError> {
        if chain_reference.len() > 32 {
            return Err(AssociationError::MalformedAddress(format!(
                "EVM chain reference too long: {} bytes",
                chain_reference.len()
            )));
        }
        if chain_reference.first() == Some(&0) {
            return Err(AssociationError::MalformedAddress(
                "EVM chain reference has leading zero bytes".to_string(),
            ));
        }
        if address.len() != 20 {
            return Err(AssociationError::MalformedAddress(format!(
                "EVM address must be 20 bytes, got {}",
                address.len()
            )));
        }
        Ok(())
    }
}

/// Registry of chain codecs.
#[derive(Clone)]
pub struct AddressCodec {
    codecs: HashMap<u16, Arc<dyn ChainCodec>>,
}

impl Default for AddressCodec {
    fn default() -> Self {
        let mut codec = Self::empty();
        codec.register(Arc::new(EvmChainCodec));
        codec
    }
}

impl AddressCodec {
    /// A codec that recognizes no chain types.
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Register (or replace) the codec for its chain type.
    pub fn register(&mut self, codec: Arc<dyn ChainCodec>) {
        self.codecs.insert(codec.chain_type(), codec);
    }

    /// Whether a codec exists for `chain_type`.
    pub fn supports(&self, chain_type: u16) -> bool {
        self.codecs.contains_key(&chain_type)
    }

    fn codec_for(&self, chain_type: u16) -> Result<&Arc<dyn ChainCodec>, AssociationError> {
        self.codecs
            .get(&chain_type)
            .ok_or(AssociationError::UnsupportedChainType(chain_type))
    }

    /// Decode an address into its components.
    pub fn parse(&self, address: &AccountAddress) -> Result<ParsedAddress, AssociationError> {
        let mut reader = Reader::new(address.as_bytes());

        let version = reader.u16()?;
        if version != ADDRESS_VERSION {
            return Err(AssociationError::MalformedAddress(format!(
                "unknown version 0x{:04x}",
                version
            )));
        }
        let chain_type = reader.u16()?;
        let codec = self.codec_for(chain_type)?;

        let ref_len = reader.u8()? as usize;
        let chain_reference = reader.take(ref_len)?.to_vec();
        let addr_len = reader.u8()? as usize;
        let raw = reader.take(addr_len)?.to_vec();
        reader.finish()?;

        codec.validate(&chain_reference, &raw)?;

        Ok(ParsedAddress {
            chain_type,
            chain_reference,
            address: raw,
        })
    }

    /// Encode components into an address. Inverse of [`AddressCodec::parse`].
    pub fn format(
        &self,
        chain_type: u16,
        chain_reference: &[u8],
        address: &[u8],
    ) -> Result<AccountAddress, AssociationError> {
        self.codec_for(chain_type)?
            .validate(chain_reference, address)?;

        if chain_reference.len() > MAX_FIELD_LEN || address.len() > MAX_FIELD_LEN {
            return Err(AssociationError::MalformedAddress(
                "field exceeds 255 bytes".to_string(),
            ));
        }

        let mut out = Vec::with_capacity(6 + chain_reference.len() + address.len());
        out.extend_from_slice(&ADDRESS_VERSION.to_be_bytes());
        out.extend_from_slice(&chain_type.to_be_bytes());
        out.push(chain_reference.len() as u8);
        out.extend_from_slice(chain_reference);
        out.push(address.len() as u8);
        out.extend_from_slice(address);

        Ok(AccountAddress::from_bytes(out))
    }
}

impl AccountAddress {
    /// Build an EVM account address for `chain_id`.
    ///
    /// The chain reference is the minimal big-endian encoding of the id, so
    /// chain id 0 yields an empty (chain-agnostic) reference.
    pub fn evm(chain_id: u64, address: EvmAddress) -> Self {
        let be = chain_id.to_be_bytes();
        let skip = be.iter().take_while(|&&b| b == 0).count();

        let mut out = Vec::with_capacity(6 + (8 - skip) + 20);
        out.extend_from_slice(&ADDRESS_VERSION.to_be_bytes());
        out.extend_from_slice(&CHAIN_TYPE_EVM.to_be_bytes());
        out.push((8 - skip) as u8);
        out.extend_from_slice(&be[skip..]);
        out.push(20);
        out.extend_from_slice(&address);
        Self::from_bytes(out)
    }
}

/// Cursor over the address bytes.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], AssociationError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| AssociationError::MalformedAddress("truncated".to_string()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, AssociationError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, AssociationError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn finish(&self) -> Result<(), AssociationError> {
        if self.pos != self.bytes.len() {
            return Err(AssociationError::MalformedAddress(format!(
                "{} trailing bytes",
                self.bytes.len() - self.pos
            )));
        }
        Ok(())
    }
}

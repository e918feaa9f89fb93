//! # Message Codec
//!
//! Turns reaction batches into request payloads and response payloads back
//! into states. The client only relies on the [`MessageCodec`] contract; the
//! bundled [`JsonCodec`] additionally implements the simulator side so
//! in-process and TCP stub simulators can speak the same protocol.
//!
//! Every payload starts with a 6 byte envelope:
//!
//! | bytes | content |
//! |---|---|
//! | 0..4 | magic `SLNK` |
//! | 4..6 | schema version, `u16` little-endian |
//!
//! The remainder is the JSON encoded body. Framing (delivering exactly one
//! complete payload) is the transport's job; the codec never sees a partial
//! frame.

use crate::reaction::Reaction;
use crate::state::Response;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub const MAGIC: [u8; 4] = *b"SLNK";
pub const SCHEMA_VERSION: u16 = 1;
const HEADER_LEN: usize = MAGIC.len() + 2;

/// A payload could not be turned back into messages.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("payload of {0} bytes is shorter than the envelope header")]
    Truncated(usize),
    #[error("payload does not start with the protocol magic")]
    BadMagic,
    #[error("unsupported schema version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },
    #[error("malformed payload body: {0}")]
    Body(#[from] serde_json::Error),
}

/// Messages could not be serialized.
#[derive(Error, Debug)]
#[error("failed to encode message: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// Client side of the wire contract.
pub trait MessageCodec: Send + Sync + 'static {
    /// Serialize a reaction batch into one request payload.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if a reaction cannot be represented.
    fn encode_reactions(&self, reactions: &[Reaction]) -> Result<Vec<u8>, EncodeError>;

    /// Decode one response payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] for corrupt, truncated or unversioned payloads.
    fn decode_response(&self, payload: &[u8]) -> Result<Response, DecodeError>;
}

/// Versioned JSON codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    /// Simulator side: decode a request payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] for corrupt or unversioned payloads.
    pub fn decode_reactions(&self, payload: &[u8]) -> Result<Vec<Reaction>, DecodeError> {
        open(payload)
    }

    /// Simulator side: encode a response payload.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if the response cannot be represented.
    pub fn encode_response(&self, response: &Response) -> Result<Vec<u8>, EncodeError> {
        seal(response)
    }
}

impl MessageCodec for JsonCodec {
    fn encode_reactions(&self, reactions: &[Reaction]) -> Result<Vec<u8>, EncodeError> {
        seal(&reactions)
    }

    fn decode_response(&self, payload: &[u8]) -> Result<Response, DecodeError> {
        open(payload)
    }
}

fn seal<T: Serialize + ?Sized>(body: &T) -> Result<Vec<u8>, EncodeError> {
    let mut payload = Vec::with_capacity(256);
    payload.extend_from_slice(&MAGIC);
    payload.extend_from_slice(&SCHEMA_VERSION.to_le_bytes());
    serde_json::to_writer(&mut payload, body)?;
    Ok(payload)
}

fn open<T: DeserializeOwned>(payload: &[u8]) -> Result<T, DecodeError> {
    if payload.len() < HEADER_LEN {
        return Err(DecodeError::Truncated(payload.len()));
    }
    let (header, body) = payload.split_at(HEADER_LEN);
    if header[..MAGIC.len()] != MAGIC {
        return Err(DecodeError::BadMagic);
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != SCHEMA_VERSION {
        return Err(DecodeError::UnsupportedVersion { found: version, expected: SCHEMA_VERSION });
    }
    Ok(serde_json::from_slice(body)?)
}

//! Two-frame wire encoding.
//!
//! Layout:
//!
//!   frame 1 (opcode): [opcode: u8]
//!   frame 2 (header): [0xFE, 0x01, 0x00, 0x06, len: u8, identifier[0..len]]
//!
//! `len = min(identifier.len(), 255)`. Longer identifiers are truncated to
//! 255 bytes; this is not an error.
//!
//! Turning a frame into a transport payload walks three tiers: the native
//! buffer utility (both call shapes), the generic buffer primitive, and
//! finally the raw bytes. The raw tier always succeeds, so encoding never
//! fails; a `Raw` payload is how "no usable encoding" reaches the dispatcher.

use tracing::debug;

use tether_contracts::{
    command::{Command, Opcode},
    error::{TetherError, TetherResult},
};

use crate::capability::{Capability, CapabilitySet};

/// Fixed protocol magic at the start of every header frame.
pub const HEADER_MAGIC: [u8; 4] = [0xFE, 0x01, 0x00, 0x06];

/// Longest identifier a header frame can carry.
pub const MAX_IDENTIFIER_LEN: usize = u8::MAX as usize;

/// One immutable binary unit handed to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Vec<u8>);

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Which tier produced a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadEncoding {
    Native,
    Primitive,
    Raw,
}

/// A frame in the representation handed to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportPayload {
    pub encoding: PayloadEncoding,
    pub bytes: Vec<u8>,
}

/// Both payloads of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCommand {
    pub opcode: TransportPayload,
    pub header: TransportPayload,
}

impl EncodedCommand {
    /// The weakest encoding used across the two payloads.
    pub fn encoding(&self) -> PayloadEncoding {
        use PayloadEncoding::*;
        match (self.opcode.encoding, self.header.encoding) {
            (Raw, _) | (_, Raw) => Raw,
            (Primitive, _) | (_, Primitive) => Primitive,
            _ => Native,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    prefer_native: bool,
}

impl FrameEncoder {
    pub fn new(prefer_native: bool) -> Self {
        Self { prefer_native }
    }

    pub fn encode_opcode(opcode: Opcode) -> Frame {
        Frame(vec![opcode.0])
    }

    pub fn encode_header(identifier: &str) -> Frame {
        let bytes = identifier.as_bytes();
        let len = bytes.len().min(MAX_IDENTIFIER_LEN);
        let mut out = Vec::with_capacity(HEADER_MAGIC.len() + 1 + len);
        out.extend_from_slice(&HEADER_MAGIC);
        out.push(len as u8);
        out.extend_from_slice(&bytes[..len]);
        Frame(out)
    }

    /// Encode both frames of `command` into transport payloads.
    pub fn encode(&self, command: &Command, capabilities: &CapabilitySet) -> EncodedCommand {
        EncodedCommand {
            opcode: self.to_transport_payload(&Self::encode_opcode(command.opcode), capabilities),
            header: self.to_transport_payload(&Self::encode_header(&command.identifier), capabilities),
        }
    }

    pub fn to_transport_payload(&self, frame: &Frame, capabilities: &CapabilitySet) -> TransportPayload {
        let bytes = frame.as_bytes();

        if self.prefer_native {
            match Self::try_native(bytes, capabilities) {
                Ok(encoded) => {
                    return TransportPayload { encoding: PayloadEncoding::Native, bytes: encoded }
                }
                Err(e) => debug!(error = %e, "native encoding tier unavailable"),
            }
        }

        match Self::try_primitive(bytes, capabilities) {
            Ok(encoded) => {
                return TransportPayload { encoding: PayloadEncoding::Primitive, bytes: encoded }
            }
            Err(e) => debug!(error = %e, "primitive encoding tier unavailable"),
        }

        TransportPayload { encoding: PayloadEncoding::Raw, bytes: bytes.to_vec() }
    }

    /// Factory shape first, then allocate-and-write.
    fn try_native(bytes: &[u8], capabilities: &CapabilitySet) -> TetherResult<Vec<u8>> {
        let utility = capabilities.native_buffer().ok_or_else(|| unavailable(Capability::NativeBuffer))?;
        match utility.from_bytes(bytes) {
            Ok(encoded) => return Ok(encoded),
            Err(fault) => debug!(%fault, "native factory call shape failed"),
        }
        utility.create_and_write(bytes).map_err(|fault| {
            debug!(%fault, "native write call shape failed");
            unavailable(Capability::NativeBuffer)
        })
    }

    fn try_primitive(bytes: &[u8], capabilities: &CapabilitySet) -> TetherResult<Vec<u8>> {
        let primitive = capabilities
            .buffer_primitive()
            .ok_or_else(|| unavailable(Capability::BufferPrimitive))?;
        primitive.wrap(bytes).map_err(|fault| {
            debug!(%fault, "buffer primitive failed");
            unavailable(Capability::BufferPrimitive)
        })
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(true)
    }
}

fn unavailable(capability: Capability) -> TetherError {
    TetherError::CapabilityUnavailable { capability: capability.as_str().to_string() }
}

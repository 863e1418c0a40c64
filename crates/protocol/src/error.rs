//! Error taxonomy of the inbound packet path
//!
//! Nothing in here ever reaches the transport: the dispatcher logs these
//! and moves on to the next frame.

use muclient_core::{ClientError, ProtocolVersion};

/// Header inspection failed before any decoder was consulted
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("frame too short: {length} bytes, header needs {minimum}")]
    FrameTooShort { length: usize, minimum: usize },

    #[error("unknown header type 0x{0:02X}")]
    UnknownHeaderType(u8),
}

/// A single decoder rejected its frame
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("packet too short: {actual} bytes, layout needs {expected}")]
    TooShort { expected: usize, actual: usize },

    #[error("read of {size} bytes at offset {offset} exceeds packet length {length}")]
    IndexOutOfRange {
        offset: usize,
        size: usize,
        length: usize,
    },

    #[error("layout not available for protocol version {0}")]
    UnsupportedVersion(ProtocolVersion),
}

/// Failures surfaced while routing a frame
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error("no decoder registered for code 0x{code:02X} sub-code {}", format_sub_code(.sub_code))]
    NoDecoderRegistered { code: u8, sub_code: Option<u8> },

    #[error("decoder for code 0x{code:02X} sub-code {} failed: {source}", format_sub_code(.sub_code))]
    Decode {
        code: u8,
        sub_code: Option<u8>,
        #[source]
        source: DecodeError,
    },

    #[error("duplicate handler for code 0x{code:02X} sub-code {}", format_sub_code(.sub_code))]
    DuplicateHandlerRegistration { code: u8, sub_code: Option<u8> },
}

fn format_sub_code(sub_code: &Option<u8>) -> String {
    match sub_code {
        Some(sub) => format!("0x{:02X}", sub),
        None => "none".to_string(),
    }
}

impl From<DecodeError> for ClientError {
    fn from(err: DecodeError) -> Self {
        ClientError::Protocol(err.to_string())
    }
}

impl From<DispatchError> for ClientError {
    fn from(err: DispatchError) -> Self {
        ClientError::Protocol(err.to_string())
    }
}

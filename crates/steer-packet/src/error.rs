use thiserror::Error;

use crate::SteerTlvType;

/// Error type for steering frame parsing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SteerParseError {
    /// Buffer shorter than the fixed frame header
    #[error("Frame header truncated: {found} bytes, expected at least 6")]
    HeaderTruncated { found: usize },

    /// Wrong protocol discriminator
    #[error("Invalid steering magic: expected 0x30, found {found:#x}")]
    InvalidMagic { found: u8 },

    /// Frame from a newer protocol revision
    #[error("Unsupported protocol version: {found}, local version {local}")]
    UnsupportedVersion { found: u8, local: u8 },

    /// Declared length runs past the received buffer
    #[error("Declared frame length {declared} exceeds buffer of {available} bytes")]
    FrameTruncated { declared: usize, available: usize },

    /// Declared length shorter than the frame header itself
    #[error("Declared frame length {declared} shorter than the frame header")]
    FrameUnderflow { declared: usize },

    /// Invalid MAC address text form
    #[error("Invalid MAC address: {message}")]
    InvalidMacAddr { message: String },

    /// TLV shorter than the minimum for its type. Reported by the
    /// TLV-level parser; frame parsing keeps preceding TLVs.
    #[error("Invalid TLV length: TLV type {tlv_type:?}, expected {expected}, found {found}")]
    InvalidTlvLength {
        tlv_type: SteerTlvType,
        expected: u8,
        found: u8,
    },

    /// Declared TLV length runs past the end of the frame
    #[error("TLV truncated: declared {declared} bytes, {available} available")]
    TlvTruncated { declared: usize, available: usize },

    /// Generic nom parsing error
    #[error("Nom parsing error: {message}")]
    NomError { message: String },
}

impl SteerParseError {
    pub fn header_truncated(found: usize) -> Self {
        Self::HeaderTruncated { found }
    }

    pub fn invalid_magic(found: u8) -> Self {
        Self::InvalidMagic { found }
    }

    pub fn unsupported_version(found: u8, local: u8) -> Self {
        Self::UnsupportedVersion { found, local }
    }

    pub fn frame_truncated(declared: usize, available: usize) -> Self {
        Self::FrameTruncated {
            declared,
            available,
        }
    }

    pub fn invalid_tlv_length(tlv_type: SteerTlvType, expected: u8, found: u8) -> Self {
        Self::InvalidTlvLength {
            tlv_type,
            expected,
            found,
        }
    }

    pub fn tlv_truncated(declared: usize, available: usize) -> Self {
        Self::TlvTruncated {
            declared,
            available,
        }
    }

    pub fn nom_error(message: impl Into<String>) -> Self {
        Self::NomError {
            message: message.into(),
        }
    }
}

impl From<nom::Err<nom::error::Error<&[u8]>>> for SteerParseError {
    fn from(err: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        Self::nom_error(format!("{:?}", err))
    }
}

/// Result type for steering frame parsing operations
pub type SteerParseResult<T> = Result<T, SteerParseError>;

//! Core types for the CAN batch decoder library
//!
//! This module defines the frames produced by the batch parser, the values
//! emitted by signal extraction, and the error type shared by every stage.
//! Nothing here holds state across decode calls.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Payload capacity of a classic CAN frame
pub const CAN_PAYLOAD_LEN: usize = 8;

/// Number of payload bytes quoted in batch errors
const PAYLOAD_PREVIEW_LEN: usize = 256;

/// Decoded signal values of one batch, keyed by signal name
pub type DecodedSignals = HashMap<String, SignalValue>;

/// Batch metadata, keyed by entry name
pub type BatchMeta = HashMap<String, MetaValue>;

/// A CAN frame taken from a JSON batch
///
/// The payload is always 8 bytes; bytes the wire did not supply stay zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    /// CAN message ID (11-bit or 29-bit, without flag bits)
    pub can_id: u32,
    /// Frame payload, zero-filled past `len`
    pub data: [u8; CAN_PAYLOAD_LEN],
    /// Number of payload bytes carried on the wire (at most 8)
    pub len: u8,
}

impl CanFrame {
    /// Create a frame from an ID and up to 8 payload bytes
    ///
    /// Bytes past the eighth are dropped.
    pub fn new(can_id: u32, bytes: &[u8]) -> Self {
        let len = bytes.len().min(CAN_PAYLOAD_LEN);
        let mut data = [0u8; CAN_PAYLOAD_LEN];
        data[..len].copy_from_slice(&bytes[..len]);
        Self {
            can_id,
            data,
            len: len as u8,
        }
    }

    /// Get the data length code (DLC) - number of data bytes
    pub fn dlc(&self) -> usize {
        self.len as usize
    }
}

/// A parsed batch: optional metadata plus an ordered, non-empty frame list
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBatch {
    /// Metadata entries, when the batch carried a `meta` object
    pub meta: Option<BatchMeta>,
    /// Frames in wire order
    pub frames: Vec<CanFrame>,
}

/// A batch metadata value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Number(f64),
    String(String),
    Boolean(bool),
}

/// Signals of one batch together with its metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecodedBatch {
    /// Metadata entries, if the batch carried any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<BatchMeta>,
    /// Decoded signal values
    pub signals: DecodedSignals,
}

/// Errors that can occur while building a message table or decoding a batch
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Failed to read {path:?}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse DBC file: {0}")]
    DbcParseError(String),

    #[error("Invalid signal definition: {0}")]
    InvalidSignalDefinition(String),

    #[error("Invalid frame json `{payload}`: {reason}")]
    InvalidBatch { payload: String, reason: String },

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
}

impl DecoderError {
    /// Build a batch error quoting the start of the offending payload
    pub fn invalid_batch(payload: &[u8], reason: impl Into<String>) -> Self {
        let cut = payload.len().min(PAYLOAD_PREVIEW_LEN);
        let mut preview = String::from_utf8_lossy(&payload[..cut]).into_owned();
        if cut < payload.len() {
            preview.push_str("...");
        }
        DecoderError::InvalidBatch {
            payload: preview,
            reason: reason.into(),
        }
    }

    /// True for errors caused by a malformed input batch
    pub fn is_schema_error(&self) -> bool {
        matches!(self, DecoderError::InvalidBatch { .. })
    }

    /// True for errors raised while loading signal definitions
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            DecoderError::SourceRead { .. }
                | DecoderError::DbcParseError(_)
                | DecoderError::InvalidSignalDefinition(_)
        )
    }
}

/// Signal value types supported by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    /// Signed integer value
    Integer(i64),
    /// Floating-point value (after scaling/offset)
    Float(f64),
    /// Boolean value (single unscaled bit)
    Boolean(bool),
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Integer(v) => write!(f, "{}", v),
            SignalValue::Float(v) => write!(f, "{:.3}", v),
            SignalValue::Boolean(v) => write!(f, "{}", if *v { "true" } else { "false" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_zero_fills_short_payload() {
        let frame = CanFrame::new(0x100, &[0x01, 0x02]);
        assert_eq!(frame.data, [0x01, 0x02, 0, 0, 0, 0, 0, 0]);
        assert_eq!(frame.dlc(), 2);
    }

    #[test]
    fn test_frame_drops_bytes_past_capacity() {
        let frame = CanFrame::new(0x100, &[0xFF; 12]);
        assert_eq!(frame.data, [0xFF; 8]);
        assert_eq!(frame.dlc(), 8);
    }

    #[test]
    fn test_invalid_batch_preview_is_bounded() {
        let payload = vec![b'x'; 1000];
        match DecoderError::invalid_batch(&payload, "no frames") {
            DecoderError::InvalidBatch { payload, reason } => {
                assert_eq!(payload.len(), PAYLOAD_PREVIEW_LEN + 3);
                assert!(payload.ends_with("..."));
                assert_eq!(reason, "no frames");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_error_classes() {
        let schema = DecoderError::invalid_batch(b"{}", "no frames");
        assert!(schema.is_schema_error());
        assert!(!schema.is_configuration_error());

        let config = DecoderError::DbcParseError("bad".to_string());
        assert!(config.is_configuration_error());

        let encode = DecoderError::NotImplemented("encode");
        assert!(!encode.is_schema_error());
        assert!(!encode.is_configuration_error());
    }

    #[test]
    fn test_signal_value_display() {
        assert_eq!(format!("{}", SignalValue::Integer(42)), "42");
        assert_eq!(format!("{}", SignalValue::Float(3.14159)), "3.142");
        assert_eq!(format!("{}", SignalValue::Boolean(true)), "true");
    }

    #[test]
    fn test_values_serialize_untagged() {
        let mut signals = DecodedSignals::new();
        signals.insert("RPM".to_string(), SignalValue::Float(2.5));
        let json = serde_json::to_string(&signals).unwrap();
        assert_eq!(json, r#"{"RPM":2.5}"#);

        let meta = MetaValue::String("vin".to_string());
        assert_eq!(serde_json::to_string(&meta).unwrap(), r#""vin""#);
    }
}

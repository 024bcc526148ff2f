//! CAN Batch Decoder Library
//!
//! Decodes JSON batches of raw CAN frames into named signal values, using
//! message definitions loaded from DBC files.
//!
//! # Architecture
//!
//! - A message table is built once from a DBC file or a directory of DBC
//!   files; the first definition of a CAN ID wins
//! - Each batch is parsed by a field-picking JSON scanner into fixed 8-byte
//!   frames
//! - Every frame is routed to its message schema and all signals land in one
//!   flat map
//!
//! The library does NOT:
//! - Encode signals back into frames
//! - Attach batch metadata to signals (see [`Converter::decode_with_meta`])
//! - Read input streams or install a logger
//!
//! Stream handling lives in the application layer (can-batch-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use can_batch_decoder::{Converter, ConverterConfig, PayloadOverflow};
//! use std::path::Path;
//!
//! let config = ConverterConfig::new().with_payload_overflow(PayloadOverflow::Reject);
//! let converter = Converter::with_config(Path::new("dbc/"), config).unwrap();
//!
//! match converter.decode(br#"{"frames":[{"id":291,"data":"e803"}]}"#) {
//!     Ok(signals) => println!("{:?}", signals.get("EngineSpeed")),
//!     Err(e) => eprintln!("Decode error: {}", e),
//! }
//! ```

// Public modules
pub mod batch;
pub mod config;
pub mod converter;
pub mod signals;
pub mod types;

// Re-export main types for convenience
pub use batch::parse_batch;
pub use config::{ConverterConfig, PayloadOverflow};
pub use converter::{decode_frames, Converter};
pub use signals::{
    build_message_table, DatabaseStats, DbcSchemaSource, MessageDefinition, MessageSchema,
    MessageTable, SchemaSource,
};
pub use types::{
    BatchMeta, CanFrame, DecodedBatch, DecodedSignals, DecoderError, FrameBatch, MetaValue,
    Result, SignalValue, CAN_PAYLOAD_LEN,
};

// Internal modules (not exposed in public API)
mod message_decoder;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

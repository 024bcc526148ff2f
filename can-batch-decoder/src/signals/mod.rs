//! Signal definitions, the DBC schema source and the message table
//!
//! The converter only talks to compiled messages through [`MessageSchema`]
//! and to compilers through [`SchemaSource`]; the DBC-backed implementations
//! live in [`dbc`] and [`database`].

pub mod dbc;
pub mod database;
pub mod loader;

use crate::types::{CanFrame, DecodedSignals, Result};

// Re-export key types for convenience
pub use database::{
    ByteOrder, DatabaseStats, MessageDefinition, MessageTable, SignalDefinition, ValueType,
};
pub use dbc::DbcSchemaSource;
pub use loader::build_message_table;

/// A compiled message layout, addressed by its CAN ID
pub trait MessageSchema {
    /// CAN ID this schema decodes
    fn message_id(&self) -> u32;

    /// Write every signal this frame carries into `into`, replacing entries
    /// that already have the same name
    fn extract_signals(&self, frame: &CanFrame, into: &mut DecodedSignals);
}

/// Compiles the raw content of one signal description file
pub trait SchemaSource {
    type Schema: MessageSchema;

    /// Compile `content`; `source_name` is used for diagnostics only
    fn compile(&self, source_name: &str, content: &[u8]) -> Result<Vec<Self::Schema>>;
}

//! Message definitions and the ID-indexed message table
//!
//! Definitions compiled from every DBC source end up in a single
//! [`MessageTable`], which is frozen once the converter owns it.

use crate::signals::MessageSchema;
use std::collections::HashMap;

/// A CAN message layout compiled from a DBC source
#[derive(Debug, Clone)]
pub struct MessageDefinition {
    /// CAN ID as carried on the wire
    pub id: u32,
    pub name: String,
    pub signals: Vec<SignalDefinition>,
    /// Name of the signal whose value selects the active multiplexed signals
    pub multiplexer_signal: Option<String>,
    /// DBC source the message was compiled from
    pub source: String,
}

/// Where a signal sits in the payload and how its raw value is scaled
#[derive(Debug, Clone)]
pub struct SignalDefinition {
    pub name: String,
    /// Start bit in DBC numbering
    pub start_bit: u16,
    /// Length in bits
    pub length: u16,
    pub byte_order: ByteOrder,
    pub value_type: ValueType,
    pub factor: f64,
    pub offset: f64,
    /// Multiplexer value this signal is present for; `None` for plain signals
    pub switch_value: Option<u64>,
}

/// Byte order for signal extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian (Intel format)
    LittleEndian,
    /// Big-endian (Motorola format)
    BigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Signed,
    Unsigned,
}

/// Message schemas indexed by CAN ID
///
/// The first schema inserted for an ID is kept; later ones are discarded.
#[derive(Debug)]
pub struct MessageTable<M = MessageDefinition> {
    messages: HashMap<u32, M>,
}

impl<M> MessageTable<M> {
    /// Create a new empty message table
    pub fn new() -> Self {
        Self {
            messages: HashMap::new(),
        }
    }

    /// Get the schema registered for a CAN ID
    pub fn get(&self, can_id: u32) -> Option<&M> {
        self.messages.get(&can_id)
    }

    /// Number of distinct CAN IDs
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Get all CAN IDs in the table, sorted
    pub fn can_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.messages.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl<M: MessageSchema> MessageTable<M> {
    /// Insert a schema unless its CAN ID is already taken
    ///
    /// Returns `false` when the schema was discarded.
    pub fn insert_first(&mut self, schema: M) -> bool {
        let can_id = schema.message_id();
        if self.messages.contains_key(&can_id) {
            return false;
        }
        self.messages.insert(can_id, schema);
        true
    }

    /// Merge compiled schemas in order, returning how many were inserted
    pub fn merge(&mut self, schemas: impl IntoIterator<Item = M>) -> usize {
        let mut inserted = 0;
        for schema in schemas {
            let can_id = schema.message_id();
            if self.insert_first(schema) {
                inserted += 1;
            } else {
                log::debug!(
                    "Message ID 0x{:X} already defined, keeping first definition",
                    can_id
                );
            }
        }
        inserted
    }
}

impl MessageTable<MessageDefinition> {
    /// Get table statistics
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            num_messages: self.messages.len(),
            num_signals: self.messages.values().map(|msg| msg.signals.len()).sum(),
        }
    }
}

impl<M> Default for MessageTable<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Message table statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Total number of message definitions
    pub num_messages: usize,
    /// Total number of signal definitions
    pub num_signals: usize,
}

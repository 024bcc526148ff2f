//! DBC schema source
//!
//! Compiles Vector DBC content with the `can-dbc` crate and converts it into
//! our internal message definitions.

use crate::signals::database::{ByteOrder, MessageDefinition, SignalDefinition, ValueType};
use crate::signals::SchemaSource;
use crate::types::{DecoderError, Result};
use can_dbc::MultiplexIndicator;
use std::borrow::Cow;

/// Flag bit DBC files set on extended (29-bit) message IDs
const EXTENDED_ID_FLAG: u32 = 0x8000_0000;
const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

/// Schema source backed by the `can-dbc` parser
#[derive(Debug, Clone, Copy, Default)]
pub struct DbcSchemaSource;

impl SchemaSource for DbcSchemaSource {
    type Schema = MessageDefinition;

    fn compile(&self, source_name: &str, content: &[u8]) -> Result<Vec<MessageDefinition>> {
        parse_dbc(source_name, content)
    }
}

/// Parse DBC content and return message definitions
pub fn parse_dbc(source_name: &str, content: &[u8]) -> Result<Vec<MessageDefinition>> {
    log::debug!("Compiling DBC source: {}", source_name);

    // Try UTF-8 first, then fallback to Latin-1/Windows-1252 encoding
    let dbc_content = match std::str::from_utf8(content) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            log::warn!("DBC source {} is not UTF-8, trying Latin-1 encoding", source_name);
            Cow::Owned(content.iter().map(|&b| b as char).collect::<String>())
        }
    };

    let dbc = can_dbc::DBC::from_slice(dbc_content.as_bytes()).map_err(|e| {
        DecoderError::DbcParseError(format!("Failed to parse DBC source {}: {:?}", source_name, e))
    })?;

    let messages = dbc
        .messages()
        .iter()
        .map(|dbc_msg| convert_message(dbc_msg, source_name))
        .collect::<Result<Vec<_>>>()?;

    log::debug!("Compiled {} messages from {}", messages.len(), source_name);

    Ok(messages)
}

/// Strip the DBC extended-frame flag so IDs match what the bus carries
fn wire_id(raw_id: u32) -> u32 {
    if raw_id & EXTENDED_ID_FLAG != 0 {
        raw_id & EXTENDED_ID_MASK
    } else {
        raw_id
    }
}

fn convert_message(dbc_msg: &can_dbc::Message, source: &str) -> Result<MessageDefinition> {
    let multiplexer_signal = dbc_msg
        .signals()
        .iter()
        .find(|sig| matches!(sig.multiplexer_indicator(), MultiplexIndicator::Multiplexor))
        .map(|sig| sig.name().to_string());

    let signals = dbc_msg
        .signals()
        .iter()
        .map(|dbc_sig| -> Result<SignalDefinition> {
            Ok(SignalDefinition {
                name: dbc_sig.name().to_string(),
                start_bit: *dbc_sig.start_bit() as u16,
                length: *dbc_sig.signal_size() as u16,
                byte_order: dbc_sig.byte_order().into(),
                value_type: dbc_sig.value_type().into(),
                factor: *dbc_sig.factor(),
                offset: *dbc_sig.offset(),
                switch_value: switch_value(dbc_sig, multiplexer_signal.is_some())?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(MessageDefinition {
        id: wire_id(dbc_msg.message_id().0),
        name: dbc_msg.message_name().to_string(),
        signals,
        multiplexer_signal,
        source: source.to_string(),
    })
}

/// Multiplexer value a signal is gated on
///
/// Extended multiplexing (`MultiplexorAndMultiplexedSignal`) is decoded as a
/// plain signal.
fn switch_value(dbc_sig: &can_dbc::Signal, has_multiplexer: bool) -> Result<Option<u64>> {
    match *dbc_sig.multiplexer_indicator() {
        MultiplexIndicator::MultiplexedSignal(value) if has_multiplexer => Ok(Some(value)),
        MultiplexIndicator::MultiplexedSignal(_) => Err(DecoderError::InvalidSignalDefinition(
            format!("Multiplexed signal '{}' but no multiplexer found", dbc_sig.name()),
        )),
        _ => Ok(None),
    }
}

impl From<&can_dbc::ByteOrder> for ByteOrder {
    fn from(order: &can_dbc::ByteOrder) -> Self {
        match order {
            can_dbc::ByteOrder::LittleEndian => ByteOrder::LittleEndian,
            can_dbc::ByteOrder::BigEndian => ByteOrder::BigEndian,
        }
    }
}

impl From<&can_dbc::ValueType> for ValueType {
    fn from(value_type: &can_dbc::ValueType) -> Self {
        match value_type {
            can_dbc::ValueType::Signed => ValueType::Signed,
            can_dbc::ValueType::Unsigned => ValueType::Unsigned,
        }
    }
}

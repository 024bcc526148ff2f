//! Message Decoding Engine
//!
//! Extracts signal values from CAN frames based on DBC message definitions.
//! Handles bit extraction, endianness, multiplexing, and physical value
//! conversion.

use crate::signals::database::{ByteOrder, MessageDefinition, SignalDefinition, ValueType};
use crate::signals::MessageSchema;
use crate::types::{CanFrame, DecodedSignals, SignalValue, CAN_PAYLOAD_LEN};
use byteorder::ByteOrder as _;

/// Payload width in bits
const PAYLOAD_BITS: u32 = (CAN_PAYLOAD_LEN * 8) as u32;

impl MessageSchema for MessageDefinition {
    fn message_id(&self) -> u32 {
        self.id
    }

    fn extract_signals(&self, frame: &CanFrame, into: &mut DecodedSignals) {
        MessageDecoder::decode_message(frame, self, into);
    }
}

/// Message decoder - extracts signals from CAN frames
pub struct MessageDecoder;

impl MessageDecoder {
    /// Decode every active signal of `message_def` into `into`
    ///
    /// Returns the number of signals written.
    pub fn decode_message(
        frame: &CanFrame,
        message_def: &MessageDefinition,
        into: &mut DecodedSignals,
    ) -> usize {
        // Value of the multiplexer switch, if the message has one
        let switch = message_def
            .multiplexer_signal
            .as_deref()
            .and_then(|name| message_def.signals.iter().find(|s| s.name == name))
            .and_then(|mux| Self::extract_signal_value(&frame.data, mux))
            .map(|value| value as u64);

        let mut written = 0;
        for signal in &message_def.signals {
            if signal.switch_value.is_some() && signal.switch_value != switch {
                continue;
            }

            if let Some(value) = Self::decode_signal(&frame.data, signal) {
                into.insert(signal.name.clone(), value);
                written += 1;
            }
        }

        written
    }

    /// Decode a single signal from CAN frame data
    fn decode_signal(
        data: &[u8; CAN_PAYLOAD_LEN],
        signal: &SignalDefinition,
    ) -> Option<SignalValue> {
        let raw_value = Self::extract_signal_value(data, signal)?;

        let value = if signal.factor == 1.0 && signal.offset == 0.0 && signal.length == 1 {
            // Boolean signal (single bit, no scaling)
            SignalValue::Boolean(raw_value != 0)
        } else if signal.factor != 1.0 || signal.offset != 0.0 {
            SignalValue::Float(signal.offset + signal.factor * (raw_value as f64))
        } else {
            SignalValue::Integer(raw_value)
        };

        Some(value)
    }

    /// Extract the raw (sign-extended) signal value from the payload
    fn extract_signal_value(
        data: &[u8; CAN_PAYLOAD_LEN],
        signal: &SignalDefinition,
    ) -> Option<i64> {
        let start_bit = signal.start_bit as u32;
        let length = signal.length as u32;

        let raw_value = match signal.byte_order {
            ByteOrder::LittleEndian => Self::extract_little_endian(data, start_bit, length),
            ByteOrder::BigEndian => Self::extract_big_endian(data, start_bit, length),
        };

        let Some(raw_value) = raw_value else {
            log::warn!(
                "Signal '{}' ({}|{}) does not fit in a {}-byte frame",
                signal.name,
                signal.start_bit,
                signal.length,
                CAN_PAYLOAD_LEN
            );
            return None;
        };

        let signed_value = match signal.value_type {
            ValueType::Unsigned => raw_value as i64,
            ValueType::Signed => Self::sign_extend(raw_value, length),
        };

        Some(signed_value)
    }

    /// Extract signal with little-endian (Intel) byte order
    ///
    /// The start bit is the signal's LSB; bit `n` lives in byte `n / 8`.
    fn extract_little_endian(
        data: &[u8; CAN_PAYLOAD_LEN],
        start_bit: u32,
        length: u32,
    ) -> Option<u64> {
        if length == 0 || start_bit + length > PAYLOAD_BITS {
            return None;
        }

        let word = byteorder::LittleEndian::read_u64(data);
        Some((word >> start_bit) & Self::mask(length))
    }

    /// Extract signal with big-endian (Motorola) byte order
    ///
    /// The start bit is the signal's MSB in DBC sawtooth numbering (bit 7 of
    /// byte 0 is the first bit on the wire).
    fn extract_big_endian(
        data: &[u8; CAN_PAYLOAD_LEN],
        start_bit: u32,
        length: u32,
    ) -> Option<u64> {
        if length == 0 || start_bit >= PAYLOAD_BITS {
            return None;
        }

        // Position counted from the first bit on the wire
        let msb = (start_bit / 8) * 8 + (7 - start_bit % 8);
        let lsb = msb + length - 1;
        if lsb >= PAYLOAD_BITS {
            return None;
        }

        let word = byteorder::BigEndian::read_u64(data);
        Some((word >> (PAYLOAD_BITS - 1 - lsb)) & Self::mask(length))
    }

    fn mask(length: u32) -> u64 {
        if length >= 64 {
            u64::MAX
        } else {
            (1u64 << length) - 1
        }
    }

    /// Sign-extend a value from N bits to 64 bits
    fn sign_extend(value: u64, bit_length: u32) -> i64 {
        if bit_length >= 64 {
            return value as i64;
        }

        let sign_bit = 1u64 << (bit_length - 1);
        if (value & sign_bit) != 0 {
            let mask = !0u64 << bit_length;
            (value | mask) as i64
        } else {
            value as i64
        }
    }
}

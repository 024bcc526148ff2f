//! Frame batch parser
//!
//! Reads one JSON batch without building a generic JSON tree. A small serde
//! visitor walks each object, keeps the fields we know about as borrowed raw
//! JSON slices and skips the rest; each kept slice is then decoded into its
//! concrete type.
//!
//! Wire format:
//!
//! ```text
//! { "meta": { "<key>": <number|string|bool>, ... },
//!   "frames": [ { "id": <uint>, "data": "<hex string>" }, ... ] }
//! ```

use crate::config::{ConverterConfig, PayloadOverflow};
use crate::types::{
    BatchMeta, CanFrame, DecoderError, FrameBatch, MetaValue, Result, CAN_PAYLOAD_LEN,
};
use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::value::RawValue;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// Parse a JSON frame batch
///
/// Any structural problem fails the whole batch with
/// [`DecoderError::InvalidBatch`]. Meta entries of unsupported types are
/// dropped with a warning.
///
/// # Example
/// ```
/// use can_batch_decoder::{parse_batch, ConverterConfig};
///
/// let json = br#"{"frames":[{"id":100,"data":"00000a00"}]}"#;
/// let batch = parse_batch(json, &ConverterConfig::default()).unwrap();
/// assert_eq!(batch.frames[0].can_id, 100);
/// assert_eq!(batch.frames[0].data, [0, 0, 0x0a, 0, 0, 0, 0, 0]);
/// ```
pub fn parse_batch(bytes: &[u8], config: &ConverterConfig) -> Result<FrameBatch> {
    let invalid = |reason: String| DecoderError::invalid_batch(bytes, reason);

    let [frames, meta] = pick_fields(bytes, ["frames", "meta"]).map_err(|e| {
        if e.is_data() {
            invalid(format!("should be object but receive error: {}", e))
        } else {
            invalid(e.to_string())
        }
    })?;

    let frames = frames
        .ok_or_else(|| invalid("should have frames array but frames is missing".to_string()))?;
    let elements: Vec<&RawValue> = serde_json::from_str(frames.get())
        .map_err(|e| invalid(format!("should have frames array but receive error: {}", e)))?;
    if elements.is_empty() {
        return Err(invalid("no frames".to_string()));
    }

    let frames = elements
        .iter()
        .enumerate()
        .map(|(index, element)| parse_frame(index, element, config).map_err(&invalid))
        .collect::<Result<Vec<_>>>()?;

    let meta = meta
        .map(|raw| {
            parse_meta(raw)
                .map_err(|e| invalid(format!("should have meta object but receive error: {}", e)))
        })
        .transpose()?;

    Ok(FrameBatch { meta, frames })
}

/// A borrowed JSON string that stays borrowed unless it contains escapes
#[derive(Deserialize)]
struct HexData<'a>(#[serde(borrow)] Cow<'a, str>);

fn parse_frame(
    index: usize,
    element: &RawValue,
    config: &ConverterConfig,
) -> std::result::Result<CanFrame, String> {
    let [id, data] = pick_fields(element.get().as_bytes(), ["id", "data"])
        .map_err(|e| format!("frame {} should be object but receive error: {}", index, e))?;

    let id = id.ok_or_else(|| format!("frame {} id is missing", index))?;
    let can_id: u32 = serde_json::from_str(id.get())
        .map_err(|e| format!("frame {} id should be uint but receive error: {}", index, e))?;

    let data = data.ok_or_else(|| format!("frame {} data is missing", index))?;
    let HexData(hex_str): HexData<'_> = serde_json::from_str(data.get())
        .map_err(|e| format!("frame {} data should be string but receive error: {}", index, e))?;

    let (payload, len) = decode_payload(&hex_str, config.payload_overflow).map_err(|e| {
        format!("frame {} data should be hex string but receive error: {}", index, e)
    })?;

    Ok(CanFrame {
        can_id,
        data: payload,
        len,
    })
}

/// Decode a hex payload into a zero-filled 8-byte buffer
fn decode_payload(
    hex_str: &str,
    policy: PayloadOverflow,
) -> std::result::Result<([u8; CAN_PAYLOAD_LEN], u8), String> {
    let mut payload = [0u8; CAN_PAYLOAD_LEN];
    if hex_str.len() % 2 != 0 {
        return Err(hex::FromHexError::OddLength.to_string());
    }

    let len = hex_str.len() / 2;
    if len <= CAN_PAYLOAD_LEN {
        hex::decode_to_slice(hex_str, &mut payload[..len]).map_err(|e| e.to_string())?;
        return Ok((payload, len as u8));
    }

    // Validate every digit before deciding what to keep
    let bytes = hex::decode(hex_str).map_err(|e| e.to_string())?;
    match policy {
        PayloadOverflow::Reject => Err(format!(
            "payload has {} bytes, at most {} allowed",
            bytes.len(),
            CAN_PAYLOAD_LEN
        )),
        PayloadOverflow::Truncate => {
            log::debug!("Truncating {}-byte payload to {} bytes", bytes.len(), CAN_PAYLOAD_LEN);
            payload.copy_from_slice(&bytes[..CAN_PAYLOAD_LEN]);
            Ok((payload, CAN_PAYLOAD_LEN as u8))
        }
    }
}

fn parse_meta(raw: &RawValue) -> serde_json::Result<BatchMeta> {
    let entries: HashMap<Cow<'_, str>, &RawValue> = serde_json::from_str(raw.get())?;

    let mut meta = BatchMeta::with_capacity(entries.len());
    for (key, value) in entries {
        if let Some(value) = meta_value(&key, value) {
            meta.insert(key.into_owned(), value);
        }
    }
    Ok(meta)
}

/// Keep numbers, strings and booleans; anything else is dropped
fn meta_value(key: &str, raw: &RawValue) -> Option<MetaValue> {
    let text = raw.get().trim_start();
    let value = match text.as_bytes().first() {
        Some(b'"') => serde_json::from_str(text).map(MetaValue::String).ok(),
        Some(b't' | b'f') => serde_json::from_str(text).map(MetaValue::Boolean).ok(),
        Some(b'-' | b'0'..=b'9') => serde_json::from_str(text).map(MetaValue::Number).ok(),
        _ => None,
    };

    if value.is_none() {
        log::warn!("Ignoring meta entry '{}' with unsupported value {}", key, text);
    }
    value
}

/// Extract the raw values of the named fields of a JSON object
///
/// Returns `None` for absent fields. Fails when the input is not an object.
fn pick_fields<'a, const N: usize>(
    json: &'a [u8],
    names: [&'static str; N],
) -> serde_json::Result<[Option<&'a RawValue>; N]> {
    let mut deserializer = serde_json::Deserializer::from_slice(json);
    let fields = FieldPicker { names }.deserialize(&mut deserializer)?;
    deserializer.end()?;
    Ok(fields)
}

struct FieldPicker<const N: usize> {
    names: [&'static str; N],
}

impl<'de, const N: usize> DeserializeSeed<'de> for FieldPicker<N> {
    type Value = [Option<&'de RawValue>; N];

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de, const N: usize> Visitor<'de> for FieldPicker<N> {
    type Value = [Option<&'de RawValue>; N];

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a JSON object")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut found = [None; N];
        while let Some(key) = map.next_key::<Cow<'de, str>>()? {
            match self.names.iter().position(|name| *name == key) {
                Some(idx) => found[idx] = Some(map.next_value::<&'de RawValue>()?),
                None => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(found)
    }
}

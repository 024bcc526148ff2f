//! Converter configuration types
//!
//! Decode-time options only. Where signal definitions come from is passed to
//! the converter directly, since the message table is built once at
//! construction.

use serde::{Deserialize, Serialize};

/// What to do with a frame payload longer than 8 bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadOverflow {
    /// Keep the first 8 bytes and drop the rest
    #[default]
    Truncate,
    /// Fail the whole batch
    Reject,
}

/// Configuration for the converter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Handling of frame payloads longer than 8 bytes
    #[serde(default)]
    pub payload_overflow: PayloadOverflow,

    /// Optional: only decode these specific CAN message IDs
    #[serde(default)]
    pub message_filter: Option<Vec<u32>>,
}

impl ConverterConfig {
    /// Create a new converter configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the oversized payload policy
    pub fn with_payload_overflow(mut self, policy: PayloadOverflow) -> Self {
        self.payload_overflow = policy;
        self
    }

    /// Builder method: set message filter
    pub fn with_message_filter(mut self, messages: Vec<u32>) -> Self {
        self.message_filter = Some(messages);
        self
    }

    /// Check if a message ID should be processed
    pub fn should_process_message(&self, can_id: u32) -> bool {
        match &self.message_filter {
            Some(messages) => messages.contains(&can_id),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converter_config_builder() {
        let config = ConverterConfig::new()
            .with_payload_overflow(PayloadOverflow::Reject)
            .with_message_filter(vec![0x123, 0x456]);

        assert_eq!(config.payload_overflow, PayloadOverflow::Reject);
        assert!(config.should_process_message(0x123));
        assert!(!config.should_process_message(0x789));
    }

    #[test]
    fn test_no_filters() {
        let config = ConverterConfig::new();

        assert_eq!(config.payload_overflow, PayloadOverflow::Truncate);
        assert!(config.should_process_message(0x123));
        assert!(config.should_process_message(0xFFFFFFFF));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: ConverterConfig =
            serde_json::from_str(r#"{"payload_overflow":"reject"}"#).unwrap();
        assert_eq!(config.payload_overflow, PayloadOverflow::Reject);
        assert_eq!(config.message_filter, None);

        let config: ConverterConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ConverterConfig::default());
    }
}

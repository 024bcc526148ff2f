//! Main converter API
//!
//! [`Converter`] is the entry point of the library: it builds the message
//! table once from a DBC path and then decodes JSON frame batches against it.
//! Decoding borrows the converter immutably, so one converter can serve any
//! number of threads.

use crate::batch::parse_batch;
use crate::config::ConverterConfig;
use crate::signals::{
    build_message_table, DatabaseStats, DbcSchemaSource, MessageDefinition, MessageSchema,
    MessageTable, SchemaSource,
};
use crate::types::{DecodedBatch, DecodedSignals, DecoderError, FrameBatch, Result};
use std::path::Path;

/// Decodes JSON frame batches into signal values
pub struct Converter<M = MessageDefinition> {
    /// Message schemas by CAN ID, frozen after construction
    table: MessageTable<M>,
    config: ConverterConfig,
}

impl Converter {
    /// Create a converter from a DBC file or a directory of DBC files
    ///
    /// # Example
    /// ```no_run
    /// use can_batch_decoder::Converter;
    /// use std::path::Path;
    ///
    /// let converter = Converter::new(Path::new("powertrain.dbc")).unwrap();
    /// let signals = converter.decode(br#"{"frames":[{"id":100,"data":"00000a00"}]}"#).unwrap();
    /// for (name, value) in &signals {
    ///     println!("{} = {}", name, value);
    /// }
    /// ```
    pub fn new(path: &Path) -> Result<Self> {
        Self::with_config(path, ConverterConfig::default())
    }

    /// Create a converter with explicit decode options
    pub fn with_config(path: &Path, config: ConverterConfig) -> Result<Self> {
        Self::with_source(path, &DbcSchemaSource, config)
    }

    /// Get statistics about the loaded message table
    pub fn database_stats(&self) -> DatabaseStats {
        self.table.stats()
    }
}

impl<M: MessageSchema> Converter<M> {
    /// Create a converter whose schemas come from a custom source
    pub fn with_source<S>(path: &Path, source: &S, config: ConverterConfig) -> Result<Self>
    where
        S: SchemaSource<Schema = M>,
    {
        log::info!("Loading signal definitions from {:?}", path);
        let table = build_message_table(path, source)?;
        Ok(Self::from_table(table, config))
    }

    /// Wrap an already built message table
    pub fn from_table(table: MessageTable<M>, config: ConverterConfig) -> Self {
        Self { table, config }
    }

    /// Decode one JSON frame batch into a flat signal map
    ///
    /// Frames with unknown IDs are skipped; a malformed batch fails as a
    /// whole.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedSignals> {
        let batch = parse_batch(bytes, &self.config)?;
        Ok(decode_frames(&batch, &self.table, &self.config))
    }

    /// Decode one JSON frame batch, keeping its metadata
    pub fn decode_with_meta(&self, bytes: &[u8]) -> Result<DecodedBatch> {
        let batch = parse_batch(bytes, &self.config)?;
        let signals = decode_frames(&batch, &self.table, &self.config);
        Ok(DecodedBatch {
            meta: batch.meta,
            signals,
        })
    }

    /// Encoding signals back into frames is not supported
    pub fn encode<T: ?Sized>(&self, _value: &T) -> Result<Vec<u8>> {
        Err(DecoderError::NotImplemented("encoding signals into CAN frames"))
    }

    pub fn table(&self) -> &MessageTable<M> {
        &self.table
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }
}

/// Route every frame of a batch to its schema and collect the signals
///
/// Later frames overwrite signals of the same name written by earlier ones.
pub fn decode_frames<M: MessageSchema>(
    batch: &FrameBatch,
    table: &MessageTable<M>,
    config: &ConverterConfig,
) -> DecodedSignals {
    let mut signals = DecodedSignals::new();

    for frame in &batch.frames {
        if !config.should_process_message(frame.can_id) {
            log::trace!("Message ID 0x{:X} filtered out", frame.can_id);
            continue;
        }

        match table.get(frame.can_id) {
            Some(schema) => schema.extract_signals(frame, &mut signals),
            None => log::warn!(
                "Cannot find message {} (0x{:X}), skipping frame",
                frame.can_id,
                frame.can_id
            ),
        }
    }

    signals
}

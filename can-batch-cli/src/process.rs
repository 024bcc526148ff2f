//! Batch stream processing
//!
//! Decodes newline-delimited JSON batches as they arrive and writes one JSON
//! object per decoded batch, in input order.

use anyhow::{Context, Result};
use can_batch_decoder::Converter;
use rayon::prelude::*;
use std::io::{BufRead, Write};

/// Batches handed to each rayon worker per parallel chunk
const BATCHES_PER_THREAD: usize = 4;

/// How a batch stream is processed
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    /// Emit `{"meta":..,"signals":..}` instead of the bare signal map
    pub include_meta: bool,
    /// Abort on the first batch that fails to decode
    pub strict: bool,
    /// Decode batches on the rayon thread pool
    pub parallel: bool,
}

/// Outcome counts of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub decoded: usize,
    pub failed: usize,
}

/// Decode one batch and render it as a JSON line
pub fn decode_line(converter: &Converter, line: &str, include_meta: bool) -> Result<String> {
    let json = if include_meta {
        serde_json::to_string(&converter.decode_with_meta(line.as_bytes())?)?
    } else {
        serde_json::to_string(&converter.decode(line.as_bytes())?)?
    };
    Ok(json)
}

/// Decode every non-blank line of `input` and write the results to `out`
///
/// Lines are read in bounded chunks (one line at a time unless decoding in
/// parallel) and `out` is flushed after each chunk, so results of a live
/// stream show up before the stream ends.
pub fn process_batches<R: BufRead, W: Write>(
    converter: &Converter,
    input: R,
    options: ProcessOptions,
    out: &mut W,
) -> Result<Summary> {
    let chunk_size = if options.parallel {
        rayon::current_num_threads() * BATCHES_PER_THREAD
    } else {
        1
    };
    log::debug!("Decoding batches in chunks of {}", chunk_size);

    let mut summary = Summary::default();
    // (1-based line number, batch) pairs
    let mut chunk: Vec<(usize, String)> = Vec::with_capacity(chunk_size);
    let mut lines = input.lines().enumerate();

    loop {
        chunk.clear();
        for (idx, line) in lines.by_ref() {
            let line = line.context("Failed to read batches")?;
            if line.trim().is_empty() {
                continue;
            }
            chunk.push((idx + 1, line));
            if chunk.len() == chunk_size {
                break;
            }
        }
        if chunk.is_empty() {
            break;
        }

        let results: Vec<Result<String>> = if options.parallel {
            chunk
                .par_iter()
                .map(|(_, line)| decode_line(converter, line.trim(), options.include_meta))
                .collect()
        } else {
            chunk
                .iter()
                .map(|(_, line)| decode_line(converter, line.trim(), options.include_meta))
                .collect()
        };

        for ((line_no, _), result) in chunk.iter().zip(results) {
            match result {
                Ok(json) => {
                    writeln!(out, "{}", json)?;
                    summary.decoded += 1;
                }
                Err(e) if options.strict => {
                    out.flush()?;
                    return Err(e.context(format!("Batch on line {} failed to decode", line_no)));
                }
                Err(e) => {
                    log::error!("Batch on line {} failed to decode: {:#}", line_no, e);
                    summary.failed += 1;
                }
            }
        }
        out.flush()?;
    }

    Ok(summary)
}

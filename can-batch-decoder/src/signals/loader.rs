//! Message table builder
//!
//! Turns a DBC path (one file, or a directory searched recursively) into a
//! single [`MessageTable`]. Any unreadable path or failed compilation aborts
//! the build.

use crate::signals::database::MessageTable;
use crate::signals::SchemaSource;
use crate::types::{DecoderError, Result};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Build a message table from a DBC file or a directory of DBC files
///
/// Files are merged in discovery order and the first definition of a CAN ID
/// wins.
///
/// # Example
/// ```no_run
/// use can_batch_decoder::signals::{build_message_table, DbcSchemaSource};
/// use std::path::Path;
///
/// let table = build_message_table(Path::new("dbc/"), &DbcSchemaSource).unwrap();
/// println!("{} messages", table.len());
/// ```
pub fn build_message_table<S: SchemaSource>(
    path: &Path,
    source: &S,
) -> Result<MessageTable<S::Schema>> {
    let metadata = fs::metadata(path).map_err(|e| read_error(path, e))?;
    let mut table = MessageTable::new();

    if metadata.is_dir() {
        let files = discover_dbc_files(path)?;
        log::info!("Found {} DBC files under {:?}", files.len(), path);

        let mut buffer = Vec::new();
        for file in &files {
            buffer.clear();
            File::open(file)
                .and_then(|mut f| f.read_to_end(&mut buffer))
                .map_err(|e| read_error(file, e))?;
            add_source(&mut table, source, file, &buffer)?;
        }
    } else {
        let content = fs::read(path).map_err(|e| read_error(path, e))?;
        add_source(&mut table, source, path, &content)?;
    }

    log::info!("Message table built from {:?}: {} message IDs", path, table.len());
    Ok(table)
}

/// Compile one source and merge it into the table
fn add_source<S: SchemaSource>(
    table: &mut MessageTable<S::Schema>,
    source: &S,
    path: &Path,
    content: &[u8],
) -> Result<()> {
    let source_name = path.display().to_string();
    let schemas = source.compile(&source_name, content)?;
    let total = schemas.len();
    let inserted = table.merge(schemas);

    log::debug!(
        "Loaded {} of {} messages from {}",
        inserted,
        total,
        source_name
    );
    Ok(())
}

/// Recursively collect `.dbc` files (any extension case), sorted per directory
fn discover_dbc_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(dir, &mut files)?;
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .and_then(|entries| entries.collect::<std::io::Result<Vec<_>>>())
        .map_err(|e| read_error(dir, e))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| read_error(&path, e))?;

        if file_type.is_dir() {
            walk(&path, files)?;
        } else if is_dbc_file(&path) {
            files.push(path);
        }
    }

    Ok(())
}

fn is_dbc_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dbc"))
}

fn read_error(path: &Path, source: std::io::Error) -> DecoderError {
    DecoderError::SourceRead {
        path: path.to_path_buf(),
        source,
    }
}

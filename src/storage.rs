// src/storage.rs
//! Table and artifact persistence
//!
//! Recording and feature tables go through [`TableStore`]; the shipped
//! implementation keeps them as JSON documents. Loaded tables are validated
//! before they are handed to the pipeline.

use crate::error::{ForceResult, IntoForceError};
use crate::processing::signal::SignalTable;
use crate::processing::windowing::FeatureTable;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Load/save of recording and feature tables
pub trait TableStore {
    fn load_signal(&self, path: &Path) -> ForceResult<SignalTable>;
    fn save_signal(&self, table: &SignalTable, path: &Path) -> ForceResult<()>;
    fn load_features(&self, path: &Path) -> ForceResult<FeatureTable>;
    fn save_features(&self, table: &FeatureTable, path: &Path) -> ForceResult<()>;

    /// File extension, without the dot
    fn extension(&self) -> &str;
}

/// JSON-backed table store
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTableStore {
    pretty: bool,
}

impl JsonTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl TableStore for JsonTableStore {
    fn load_signal(&self, path: &Path) -> ForceResult<SignalTable> {
        let table: SignalTable = read_json(path)?;
        table.validate()?;
        Ok(table)
    }

    fn save_signal(&self, table: &SignalTable, path: &Path) -> ForceResult<()> {
        write_json(table, path, self.pretty)
    }

    fn load_features(&self, path: &Path) -> ForceResult<FeatureTable> {
        let table: FeatureTable = read_json(path)?;
        table.validate()?;
        Ok(table)
    }

    fn save_features(&self, table: &FeatureTable, path: &Path) -> ForceResult<()> {
        write_json(table, path, self.pretty)
    }

    fn extension(&self) -> &str {
        crate::config::paths::TABLE_EXTENSION
    }
}

/// Deserialize a JSON document
pub fn read_json<T: DeserializeOwned>(path: &Path) -> ForceResult<T> {
    let file = File::open(path).storage_err(path)?;
    serde_json::from_reader(BufReader::new(file)).storage_err(path)
}

/// Serialize `value` as a JSON document, replacing any existing file
pub fn write_json<T: Serialize>(value: &T, path: &Path, pretty: bool) -> ForceResult<()> {
    let file = File::create(path).storage_err(path)?;
    let mut writer = BufWriter::new(file);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value).storage_err(path)?;
    } else {
        serde_json::to_writer(&mut writer, value).storage_err(path)?;
    }
    writer.flush().storage_err(path)
}

/// Files in `dir` with `extension`, sorted by path
pub fn list_files(dir: &Path, extension: &str) -> ForceResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).storage_err(dir)? {
        let path = entry.storage_err(dir)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Macro file format and loader (C11).
//!
//! A macro definitions file is a single JSON object; keys are macro ids and each
//! value names the ordered list of `{device, command}` steps to run. Parsed once
//! at startup into an immutable map — the core macro executor never touches the
//! filesystem.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroStep {
    pub device: String,
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDefinition {
    pub name: String,
    pub commands: Vec<MacroStep>,
}

pub type MacroTable = Arc<HashMap<String, MacroDefinition>>;

#[derive(Debug)]
pub enum MacroLoadError {
    Io { path: String, source: std::io::Error },
    Parse { path: String, source: serde_json::Error },
}

impl std::fmt::Display for MacroLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "failed to read macro file {path}: {source}"),
            Self::Parse { path, source } => write!(f, "failed to parse macro file {path}: {source}"),
        }
    }
}

impl std::error::Error for MacroLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

/// Load and parse the macro definitions file at `path`.
///
/// Any failure here is treated as a fatal startup error (§7): the caller is
/// expected to log and exit rather than fall back to an empty table.
pub fn load(path: &Path) -> Result<MacroTable, MacroLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| MacroLoadError::Io { path: path.display().to_string(), source })?;
    let table: HashMap<String, MacroDefinition> =
        serde_json::from_str(&raw).map_err(|source| MacroLoadError::Parse { path: path.display().to_string(), source })?;
    Ok(Arc::new(table))
}

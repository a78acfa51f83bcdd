//! JSON artifact persistence.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Write `data` as an indented UTF-8 JSON document at `path`.
/// An existing file at that path is overwritten without warning.
pub fn export_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(data).context("serialize JSON artifact")?;
    fs::write(path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

//! Serialization helpers for [`FoldReport`]s.
//!
//! JSON and CBOR read/write utilities with extension-based auto-detection.
//! Unknown/missing extensions are rejected for reads and default to JSON
//! for writes.

use crate::report::FoldReport;
use anyhow::{anyhow, Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Ensure the parent directory for a file exists (no-op if none).
fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", dir.display()))?;
        }
    }
    Ok(())
}

/// Read a [`FoldReport`] from **JSON**.
pub fn read_report_json<P: AsRef<Path>>(path: P) -> Result<FoldReport> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", path_ref.display()))?;
    let rdr = BufReader::new(f);
    let v: FoldReport =
        serde_json::from_reader(rdr).with_context(|| "deserialize JSON fold report")?;
    Ok(v)
}

/// Write a [`FoldReport`] to **JSON** (pretty).
pub fn write_report_json<P: AsRef<Path>>(path: P, v: &FoldReport) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", path_ref.display()))?;
    let w = BufWriter::new(f);
    serde_json::to_writer_pretty(w, v).with_context(|| "serialize JSON fold report")?;
    Ok(())
}

/// Read a [`FoldReport`] from **CBOR**.
pub fn read_report_cbor<P: AsRef<Path>>(path: P) -> Result<FoldReport> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", path_ref.display()))?;
    let mut rdr = BufReader::new(f);
    let v: FoldReport =
        ciborium::de::from_reader(&mut rdr).with_context(|| "deserialize CBOR fold report")?;
    Ok(v)
}

/// Write a [`FoldReport`] to **CBOR**.
pub fn write_report_cbor<P: AsRef<Path>>(path: P, v: &FoldReport) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", path_ref.display()))?;
    let mut w = BufWriter::new(f);
    ciborium::ser::into_writer(v, &mut w).with_context(|| "serialize CBOR fold report")?;
    Ok(())
}

/// Auto-detect read by extension `.json` / `.cbor` (case-insensitive).
pub fn read_report_auto<P: AsRef<Path>>(path: P) -> Result<FoldReport> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("json") => read_report_json(path),
        Some("cbor") => read_report_cbor(path),
        Some(other) => Err(anyhow!(
            "unsupported report extension: {} (supported: .json, .cbor)",
            other
        )),
        None => Err(anyhow!("path has no extension (expected .json or .cbor)")),
    }
}

/// Auto-detect write (defaults to **JSON** if unknown or missing).
pub fn write_report_auto<P: AsRef<Path>>(path: P, v: &FoldReport) -> Result<()> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("cbor") => write_report_cbor(path, v),
        _ => write_report_json(path, v),
    }
}

/// Return the lowercase extension (without dot) if present.
fn ext_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_ascii_lowercase())
}

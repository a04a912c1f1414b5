//! Serialization helpers shared by the trace envelope and report writers.
//!
//! JSON and CBOR read/write utilities with extension-based auto-detection.
//! Unknown/missing extensions are rejected for reads and default to JSON
//! for writes.
//!
//! Payloads carry a wire version through [`Versioned<T>`].

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Serialized document format, chosen by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocFormat {
    /// Pretty-printed JSON.
    Json,
    /// CBOR via `ciborium`.
    Cbor,
}

impl DocFormat {
    /// Detect from extension (`.json` / `.cbor`, case-insensitive).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match ext_lower(path).as_deref() {
            Some("json") => Some(Self::Json),
            Some("cbor") => Some(Self::Cbor),
            _ => None,
        }
    }
}

/// Ensure the parent directory for a file exists (no-op if none).
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", display(path)))?;
        }
    }
    Ok(())
}

/// Read any `T` from **JSON**.
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P, what: &str) -> Result<T> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    let rdr = BufReader::new(f);
    serde_json::from_reader(rdr).with_context(|| format!("deserialize JSON {what}"))
}

/// Write any `T` to **JSON** (pretty).
pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, v: &T, what: &str) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, v).with_context(|| format!("serialize JSON {what}"))?;
    w.flush().with_context(|| "flush JSON writer")?;
    Ok(())
}

/// Read any `T` from **CBOR**.
pub fn read_cbor<T: DeserializeOwned, P: AsRef<Path>>(path: P, what: &str) -> Result<T> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    let mut rdr = BufReader::new(f);
    ciborium::de::from_reader(&mut rdr).with_context(|| format!("deserialize CBOR {what}"))
}

/// Write any `T` to **CBOR**.
pub fn write_cbor<T: Serialize, P: AsRef<Path>>(path: P, v: &T, what: &str) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let mut w = BufWriter::new(f);
    ciborium::ser::into_writer(v, &mut w).with_context(|| format!("serialize CBOR {what}"))?;
    w.flush().with_context(|| "flush CBOR writer")?;
    Ok(())
}

/// Auto-detect read by extension `.json` / `.cbor`.
pub fn read_auto<T: DeserializeOwned, P: AsRef<Path>>(path: P, what: &str) -> Result<T> {
    let path_ref = path.as_ref();
    match DocFormat::from_path(path_ref) {
        Some(DocFormat::Json) => read_json(path_ref, what),
        Some(DocFormat::Cbor) => read_cbor(path_ref, what),
        None => match ext_lower(path_ref) {
            Some(other) => Err(anyhow!(
                "unsupported {what} extension: {other} (supported: .json, .cbor)"
            )),
            None => Err(anyhow!("path has no extension (expected .json or .cbor)")),
        },
    }
}

/// Auto-detect write (defaults to **JSON** if unknown or missing).
pub fn write_auto<T: Serialize, P: AsRef<Path>>(path: P, v: &T, what: &str) -> Result<()> {
    let path_ref = path.as_ref();
    match DocFormat::from_path(path_ref) {
        Some(DocFormat::Cbor) => write_cbor(path_ref, v, what),
        _ => write_json(path_ref, v, what),
    }
}

/// Small versioned wrapper to tag payloads.
///
/// Pairs a `u16` tag with a payload so callers can enforce wire versions at
/// the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// Wire version tag.
    pub ver: u16,
    /// Wrapped payload.
    pub payload: T,
}

impl<T> Versioned<T> {
    /// Construct a new versioned wrapper.
    #[inline]
    pub const fn new(ver: u16, payload: T) -> Self {
        Self { ver, payload }
    }
}

/// Return the lowercase extension (without dot) if present.
#[must_use]
pub fn ext_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Human-friendly path display for error messages.
fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strings::StringTable;

    fn tmp_path(name: &str, ext: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("evrace_core_io_{}_{}.{}", name, nanos, ext));
        p
    }

    #[test]
    fn table_json_and_cbor_auto() {
        let t: StringTable = ["a", "b"].into_iter().collect();
        for ext in ["json", "cbor"] {
            let path = tmp_path("table", ext);
            write_auto(&path, &t, "string table").unwrap();
            let got: StringTable = read_auto(&path, "string table").unwrap();
            assert_eq!(got, t);
            let _ = std::fs::remove_file(path);
        }
    }

    #[test]
    fn read_auto_rejects_unknown_extension() {
        let err = read_auto::<StringTable, _>("x.yaml", "string table").unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn versioned_envelope_keeps_its_tag_on_disk() {
        let t: StringTable = ["x"].into_iter().collect();
        let path = tmp_path("versioned", "cbor");
        write_auto(&path, &Versioned::new(3, &t), "versioned table").unwrap();
        let back: Versioned<StringTable> = read_auto(&path, "versioned table").unwrap();
        assert_eq!(back.ver, 3);
        assert_eq!(back.payload, t);
        let _ = std::fs::remove_file(path);
    }
}

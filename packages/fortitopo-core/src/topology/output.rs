use crate::error::{Result, TopologyError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Extension of diagram files written by default.
pub const DIAGRAM_EXTENSION: &str = "drawio";

/// Default file name for a gateway's diagram: `topology_<hostname>.drawio`.
pub fn default_output_name(hostname: &str) -> PathBuf {
    let safe: String = hostname
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    PathBuf::from(format!("topology_{}.{}", safe, DIAGRAM_EXTENSION))
}

/// Write a document so that an existing file at `path` is only replaced by a
/// complete copy. The bytes go to a temporary file next to the target first.
pub fn write_document(path: &Path, bytes: &[u8]) -> Result<()> {
    let write_err = |source: std::io::Error| TopologyError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    tracing::info!("File saved: {}", path.display());
    Ok(())
}

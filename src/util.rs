//! Small filesystem helpers shared by the persistence paths.

use std::fs;
use std::io;
use std::path::Path;

/// Write content to a file atomically using temp + rename.
///
/// Readers see either the old or the new content, never a partial write. An
/// orphaned temp file from a crashed run is harmless.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let pid = std::process::id();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    let temp_path = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        pid,
        timestamp
    ));
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

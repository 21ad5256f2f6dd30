//! Filesystem placement for submissions: sanitized names, collision-safe
//! destinations, and the per-team completed archive.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const COMPLETED_DIR: &str = "completed";

/// Reduce a client-declared filename to a safe final path component.
pub(crate) fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim();

    let cleaned: String = base
        .chars()
        .map(|ch| if ch.is_control() { '_' } else { ch })
        .collect();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// First free path for `filename` inside `dir`, appending `_1`, `_2`, ...
/// before the extension until the name is unused.
pub(crate) fn unique_destination(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let name = Path::new(filename);
    let stem = name
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let extension = name
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1;
    loop {
        let candidate = dir.join(format!("{stem}_{counter}{extension}"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Move a finished artifact into `<team_dir>/completed/`, never clobbering
/// an existing file. Returns the final resting place.
pub(crate) fn move_to_completed(file: &Path, team_dir: &Path) -> io::Result<PathBuf> {
    let completed = team_dir.join(COMPLETED_DIR);
    fs::create_dir_all(&completed)?;

    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "artifact has no filename"))?;
    let destination = unique_destination(&completed, &filename);
    fs::rename(file, &destination)?;
    Ok(destination)
}

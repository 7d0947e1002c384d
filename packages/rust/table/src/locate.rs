//! Input discovery and output naming.

use std::path::{Path, PathBuf};

use tracing::debug;
use trackfill_shared::{Result, TrackfillError};

use crate::TableFormat;

/// Suffix appended to the input stem for the default output file.
pub const PROCESSED_SUFFIX: &str = "_processed";

/// First supported file in `dir` whose name starts with `prefix`, in name order.
///
/// Files produced by a previous run (`*_processed.*`) are ignored.
pub fn locate_input(dir: &Path, prefix: &str) -> Result<PathBuf> {
    let entries = std::fs::read_dir(dir).map_err(|e| TrackfillError::io(dir, e))?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(prefix))
        })
        .filter(|path| TableFormat::from_path(path).is_ok())
        .filter(|path| {
            !path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.ends_with(PROCESSED_SUFFIX))
        })
        .collect();
    candidates.sort();

    debug!(dir = %dir.display(), prefix, candidates = candidates.len(), "input lookup");

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| TrackfillError::InputNotFound {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
        })
}

/// `<stem>_processed.<ext>` next to `input`.
pub fn processed_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{stem}{PROCESSED_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{PROCESSED_SUFFIX}"),
    };
    input.with_file_name(name)
}

//! Output file naming and artifact inspection.

use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "meeting_audio";
const MAX_SUFFIX: u32 = 999;

/// `dir/meeting_audio_YYYYMMDD_HHMMSS.ext` (UTC). A file already present with
/// that name gets a numeric suffix instead of being overwritten; once the
/// suffixes run out this fails with `AlreadyExists`.
pub fn output_path(dir: &Path, extension: &str, now: DateTime<Utc>) -> io::Result<PathBuf> {
    let timestamp = now.format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("{FILE_PREFIX}_{timestamp}.{extension}"));
    if !path.exists() {
        return Ok(path);
    }

    (1..=MAX_SUFFIX)
        .map(|i| dir.join(format!("{FILE_PREFIX}_{timestamp}_{i}.{extension}")))
        .find(|alt| !alt.exists())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!(
                    "{} and {MAX_SUFFIX} numbered variants already exist",
                    path.display()
                ),
            )
        })
}

/// Size of the artifact when it exists and is non-empty.
pub fn inspect_artifact(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .ok()
        .filter(|meta| meta.is_file())
        .map(|meta| meta.len())
        .filter(|len| *len > 0)
}

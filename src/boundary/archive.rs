/// Scoped extraction of an uploaded ZIP archive.
///
/// The archive is unpacked into a fresh temporary directory owned by
/// `ExtractedArchive`. Dropping the value removes the directory, so the
/// files never outlive the request that uploaded them, whether or not
/// parsing succeeds.

use super::BoundaryError;
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use zip::ZipArchive;

/// Name the raw upload is saved under inside the scratch directory.
const UPLOAD_FILE_NAME: &str = "upload.zip";

/// Directory prefix macOS adds to archives; its entries are resource forks.
const MACOS_METADATA_DIR: &str = "__MACOSX/";

pub struct ExtractedArchive {
    dir: TempDir,
    /// Relative entry paths in archive order (files only).
    entries: Vec<PathBuf>,
}

impl ExtractedArchive {
    /// Saves `bytes` into a new temporary directory and extracts every
    /// file entry next to it.
    ///
    /// Entries whose names would escape the directory are skipped.
    pub fn extract(bytes: &[u8]) -> Result<Self, BoundaryError> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(UPLOAD_FILE_NAME), bytes)?;

        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;

            let Some(relative) = file.enclosed_name().map(Path::to_path_buf) else {
                warn!(entry = file.name(), "skipping archive entry with unsafe path");
                continue;
            };

            if file.name().starts_with(MACOS_METADATA_DIR) {
                continue;
            }

            let target = dir.path().join(&relative);
            if file.is_dir() {
                fs::create_dir_all(&target)?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = fs::File::create(&target)?;
            io::copy(&mut file, &mut out)?;

            debug!(entry = %relative.display(), bytes = file.size(), "extracted archive entry");
            entries.push(relative);
        }

        Ok(Self { dir, entries })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Absolute path of the first entry with the given extension
    /// (case-insensitive, without the dot).
    pub fn find_with_extension(&self, extension: &str) -> Option<PathBuf> {
        self.entries
            .iter()
            .find(|entry| has_extension(entry, extension))
            .map(|entry| self.dir.path().join(entry))
    }

    /// Absolute path of the entry sharing `path`'s directory and stem with
    /// the given extension, matched case-insensitively (`AOI.SHP` finds
    /// `AOI.PRJ` or `AOI.prj`).
    pub fn find_sibling(&self, path: &Path, extension: &str) -> Option<PathBuf> {
        let relative = path.strip_prefix(self.dir.path()).unwrap_or(path);
        let stem = relative.with_extension("");
        self.entries
            .iter()
            .find(|entry| has_extension(entry, extension) && entry.with_extension("") == stem)
            .map(|entry| self.dir.path().join(entry))
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

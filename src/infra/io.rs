use anyhow::{Context, Result};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::marker::ExistingMarker;
use crate::core::timecode::{FrameRateProfile, Timecode};

const MMAP_THRESHOLD: u64 = 1024 * 1024; // 1 MiB

pub enum FileContent {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl FileContent {
    /// Exports are not guaranteed to be UTF-8; invalid bytes become U+FFFD,
    /// which the comment parser strips as corruption
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            FileContent::Mapped(mmap) => String::from_utf8_lossy(mmap),
            FileContent::Buffered(bytes) => String::from_utf8_lossy(bytes),
        }
    }
}

/// Expand `~` and `$VAR` in a user-supplied path
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => path.to_path_buf(),
    }
}

pub fn read_file_smart<P: AsRef<Path>>(path: P) -> Result<FileContent> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read metadata for {}", path.display()))?;

    if metadata.len() > MMAP_THRESHOLD {
        let file =
            File::open(path).with_context(|| format!("Failed to open file {}", path.display()))?;

        // Safety: read-only mapping; the export is not modified while mapped
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to memory-map {}", path.display()))?;

        Ok(FileContent::Mapped(mmap))
    } else {
        let content =
            std::fs::read(path).with_context(|| format!("Failed to read file {}", path.display()))?;

        Ok(FileContent::Buffered(content))
    }
}

/// Whole export as text
pub fn read_export(path: &Path) -> Result<String> {
    let path = expand_path(path);
    let content = read_file_smart(&path)?;
    Ok(content.text().into_owned())
}

/// On-disk shape of an existing marker
#[derive(Debug, Deserialize)]
struct ExistingMarkerRecord {
    name: String,
    start: String,
}

/// Existing timeline markers from `[{"name": ..., "start": "HH:MM:SS:FF"}]`
pub fn read_existing_markers(path: &Path, profile: FrameRateProfile) -> Result<Vec<ExistingMarker>> {
    let path = expand_path(path);
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read markers file {}", path.display()))?;
    let records: Vec<ExistingMarkerRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse markers file {}", path.display()))?;

    records
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            let start = Timecode::parse(&r.start, profile)
                .with_context(|| format!("marker #{} ({}) has an invalid start", i + 1, r.name))?;
            Ok(ExistingMarker::new(r.name, start))
        })
        .collect()
}

/// Pretty JSON written next to its destination, then renamed into place
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let path = expand_path(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    // Same-dir temp file so persist is a rename on one filesystem
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write {}", tmp.path().display()))?;
    tmp.as_file().sync_all().context("Failed to sync temp file")?;

    tmp.persist(&path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(())
}

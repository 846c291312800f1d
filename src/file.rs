//! The `File` handle (§3): a located byte sequence with lazily-memoised fingerprints, plus
//! its in-archive specialisation `ArchiveEntry`.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;

use crate::archive::{adapter_for, detect_kind};
use crate::checksum::compute_checksums_with_header;
use crate::config::Config;
use crate::types::{ArchiveKind, ChecksumSet, Fingerprint};

/// A detected ROM-format header prefix: `size` bytes to skip from the start of the file to
/// reach the "without-header" view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderInfo {
    pub size: u64,
}

#[derive(Debug, Clone)]
struct ArchiveLocation {
    archive_path: PathBuf,
    entry_path: String,
    kind: ArchiveKind,
}

/// A located byte sequence, either a plain on-disk file or an entry inside an archive.
/// Fingerprints are computed at most once per file per viewpoint (with/without header) and
/// cached behind a `OnceCell`, matching the "memoised lazy cell" redesign note in SPEC_FULL.md.
pub struct File {
    path: PathBuf,
    archive: Option<ArchiveLocation>,
    pub size: u64,
    pub header: Option<HeaderInfo>,
    with_header: OnceCell<ChecksumSet>,
    without_header: OnceCell<ChecksumSet>,
}

impl File {
    pub fn on_disk(path: PathBuf, size: u64, header: Option<HeaderInfo>) -> Self {
        File {
            path,
            archive: None,
            size,
            header,
            with_header: OnceCell::new(),
            without_header: OnceCell::new(),
        }
    }

    pub fn in_archive(
        archive_path: PathBuf,
        entry_path: String,
        kind: ArchiveKind,
        size: u64,
        header: Option<HeaderInfo>,
    ) -> Self {
        File {
            path: archive_path.clone(),
            archive: Some(ArchiveLocation {
                archive_path,
                entry_path,
                kind,
            }),
            size,
            header,
            with_header: OnceCell::new(),
            without_header: OnceCell::new(),
        }
    }

    /// The on-disk path: the archive's path for an archive entry, the file's own path otherwise.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `archive_path#entry_path` style display path, or just the path for a plain file.
    pub fn display_path(&self) -> String {
        match &self.archive {
            Some(loc) => format!("{}#{}", loc.archive_path.display(), loc.entry_path),
            None => self.path.display().to_string(),
        }
    }

    pub fn is_archive_entry(&self) -> bool {
        self.archive.is_some()
    }

    pub fn archive_kind(&self) -> ArchiveKind {
        self.archive
            .as_ref()
            .map(|l| l.kind)
            .unwrap_or(ArchiveKind::None)
    }

    pub fn has_header(&self) -> bool {
        self.header.is_some()
    }

    fn read_checksums(&self, config: &Config, header_size: Option<u64>) -> anyhow::Result<ChecksumSet> {
        match &self.archive {
            None => compute_checksums_with_header(&self.path, config, header_size, None),
            Some(loc) => {
                let adapter = adapter_for(loc.kind)
                    .ok_or_else(|| anyhow::anyhow!("no adapter for archive kind {:?}", loc.kind))?;
                let tmp = tempfile::NamedTempFile::new()?;
                adapter.extract_entry(&loc.archive_path, &loc.entry_path, tmp.path())?;
                compute_checksums_with_header(tmp.path(), config, header_size, None)
            }
        }
    }

    /// Fingerprint of the raw bytes (no header stripped).
    pub fn with_header_checksums(&self, config: &Config) -> anyhow::Result<&ChecksumSet> {
        self.with_header
            .get_or_try_init(|| self.read_checksums(config, None))
    }

    /// Fingerprint with the detected header prefix skipped, or `None` if this file carries
    /// no detected header.
    pub fn without_header_checksums(
        &self,
        config: &Config,
    ) -> anyhow::Result<Option<&ChecksumSet>> {
        let Some(header) = self.header else {
            return Ok(None);
        };
        self.without_header
            .get_or_try_init(|| self.read_checksums(config, Some(header.size)))
            .map(Some)
    }

    pub fn with_header_fingerprint(&self, config: &Config) -> anyhow::Result<Option<Fingerprint>> {
        Ok(self.with_header_checksums(config)?.fingerprint())
    }

    pub fn without_header_fingerprint(
        &self,
        config: &Config,
    ) -> anyhow::Result<Option<Fingerprint>> {
        Ok(self
            .without_header_checksums(config)?
            .and_then(|set| set.fingerprint()))
    }
}

/// Detects a file's archive kind from its path, for callers assembling `File`s from a
/// plain walk of the input directories rather than from an archive listing.
pub fn classify_path(path: &Path) -> ArchiveKind {
    detect_kind(path)
}

//! Archive-adapter interface (§6): a normalized listing/extraction contract over Zip, Tar,
//! Rar and SevenZip, so the rest of the crate never has to know which format it's looking at.

use std::collections::HashSet;
use std::fs::File as StdFile;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use once_cell::sync::Lazy;

use crate::types::{ArchiveEntryMeta, ArchiveKind};

/// Normalized capability every archive format must provide. `list_entries` may legitimately
/// return an empty vec for a non-archive input; `extract_entry` guarantees that on success
/// `destination` contains exactly the entry's bytes.
pub trait ArchiveAdapter {
    fn kind(&self) -> ArchiveKind;
    fn list_entries(&self, archive_path: &Path) -> anyhow::Result<Vec<ArchiveEntryMeta>>;
    fn extract_entry(
        &self,
        archive_path: &Path,
        entry_path: &str,
        destination: &Path,
    ) -> anyhow::Result<()>;
}

/// Guess an archive's kind from its extension. Anything unrecognised that still looks like
/// a container file falls into `ArchiveKind::Other`; plain files are `ArchiveKind::None`.
pub fn detect_kind(path: &Path) -> ArchiveKind {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
        .as_str()
    {
        "zip" => ArchiveKind::Zip,
        "tar" => ArchiveKind::Tar,
        "rar" => ArchiveKind::Rar,
        "7z" => ArchiveKind::SevenZip,
        _ => ArchiveKind::None,
    }
}

pub fn adapter_for(kind: ArchiveKind) -> Option<Box<dyn ArchiveAdapter>> {
    match kind {
        ArchiveKind::Zip => Some(Box::new(ZipAdapter)),
        ArchiveKind::Tar => Some(Box::new(TarAdapter)),
        ArchiveKind::Rar => Some(Box::new(RarAdapter)),
        ArchiveKind::SevenZip => Some(Box::new(SevenZipAdapter)),
        ArchiveKind::None | ArchiveKind::Other => None,
    }
}

pub struct ZipAdapter;

impl ArchiveAdapter for ZipAdapter {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Zip
    }

    fn list_entries(&self, archive_path: &Path) -> anyhow::Result<Vec<ArchiveEntryMeta>> {
        let f = StdFile::open(archive_path)
            .with_context(|| format!("opening zip archive: {archive_path:?}"))?;
        let mut zip = zip::ZipArchive::new(f)
            .with_context(|| format!("reading zip directory: {archive_path:?}"))?;
        let mut out = Vec::new();
        for i in 0..zip.len() {
            let entry = zip.by_index(i)?;
            if entry.is_file() {
                out.push(ArchiveEntryMeta {
                    entry_path: entry.name().to_string(),
                    size: entry.size(),
                    crc32: Some(format!("{:08x}", entry.crc32())),
                });
            }
        }
        Ok(out)
    }

    fn extract_entry(
        &self,
        archive_path: &Path,
        entry_path: &str,
        destination: &Path,
    ) -> anyhow::Result<()> {
        let f = StdFile::open(archive_path)
            .with_context(|| format!("opening zip archive: {archive_path:?}"))?;
        let mut zip = zip::ZipArchive::new(f)?;
        let mut entry = zip
            .by_name(entry_path)
            .with_context(|| format!("entry {entry_path:?} not found in {archive_path:?}"))?;
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = StdFile::create(destination)
            .with_context(|| format!("creating {destination:?}"))?;
        std::io::copy(&mut entry, &mut out)?;
        Ok(())
    }
}

pub struct TarAdapter;

impl ArchiveAdapter for TarAdapter {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Tar
    }

    fn list_entries(&self, archive_path: &Path) -> anyhow::Result<Vec<ArchiveEntryMeta>> {
        let f = StdFile::open(archive_path)
            .with_context(|| format!("opening tar archive: {archive_path:?}"))?;
        let mut archive = tar::Archive::new(f);
        let mut out = Vec::new();
        for entry in archive
            .entries()
            .with_context(|| format!("reading tar directory: {archive_path:?}"))?
        {
            let entry = entry?;
            if entry.header().entry_type().is_file() {
                let entry_path = entry.path()?.to_string_lossy().to_string();
                out.push(ArchiveEntryMeta {
                    entry_path,
                    size: entry.header().size().unwrap_or(0),
                    crc32: None,
                });
            }
        }
        Ok(out)
    }

    fn extract_entry(
        &self,
        archive_path: &Path,
        entry_path: &str,
        destination: &Path,
    ) -> anyhow::Result<()> {
        let f = StdFile::open(archive_path)
            .with_context(|| format!("opening tar archive: {archive_path:?}"))?;
        let mut archive = tar::Archive::new(f);
        for entry in archive.entries()? {
            let mut entry = entry?;
            if entry.path()?.to_string_lossy() == entry_path {
                if let Some(parent) = destination.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                entry.unpack(destination)?;
                return Ok(());
            }
        }
        anyhow::bail!("entry {entry_path:?} not found in {archive_path:?}")
    }
}

/// 7z has no lightweight pure-Rust reader in this crate's dependency set, so (like the Rar
/// adapter below) it shells out to the system binary, located via `which`.
pub struct SevenZipAdapter;

/// Listing via the external 7z/7za/unrar binaries is observed to spuriously return empty
/// results under concurrent invocation; serialise it process-wide and retry.
static EXTERNAL_LISTING_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const LISTING_MAX_ATTEMPTS: u32 = 3;

fn jittered_backoff(attempt: u32) -> Duration {
    let base = 250u64 * (1u64 << attempt);
    let jitter = (base / 4).max(1);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    Duration::from_millis(base + nanos % jitter)
}

/// Runs `list_fn` under the process-wide external-tool mutex, retrying with jittered
/// exponential backoff when it comes back empty (the 7z/unrar quirk described in §5/§7).
fn list_with_retry(
    list_fn: impl Fn() -> anyhow::Result<Vec<ArchiveEntryMeta>>,
) -> anyhow::Result<Vec<ArchiveEntryMeta>> {
    let _guard = EXTERNAL_LISTING_LOCK.lock().unwrap();
    let mut last = Vec::new();
    for attempt in 0..LISTING_MAX_ATTEMPTS {
        last = list_fn()?;
        if !last.is_empty() {
            return Ok(last);
        }
        if attempt + 1 < LISTING_MAX_ATTEMPTS {
            std::thread::sleep(jittered_backoff(attempt));
        }
    }
    Ok(last)
}

impl ArchiveAdapter for SevenZipAdapter {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::SevenZip
    }

    fn list_entries(&self, archive_path: &Path) -> anyhow::Result<Vec<ArchiveEntryMeta>> {
        let Some(exe) = which::which("7z").or_else(|_| which::which("7za")).ok() else {
            return Ok(Vec::new());
        };
        list_with_retry(|| list_via_listing_tool(&exe, archive_path))
    }

    fn extract_entry(
        &self,
        archive_path: &Path,
        entry_path: &str,
        destination: &Path,
    ) -> anyhow::Result<()> {
        let exe = which::which("7z")
            .or_else(|_| which::which("7za"))
            .with_context(|| "neither 7z nor 7za found on PATH")?;
        extract_via_temp_dir(&exe, archive_path, entry_path, destination)
    }
}

pub struct RarAdapter;

impl ArchiveAdapter for RarAdapter {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Rar
    }

    fn list_entries(&self, archive_path: &Path) -> anyhow::Result<Vec<ArchiveEntryMeta>> {
        let Some(exe) = which::which("unrar").ok() else {
            return Ok(Vec::new());
        };
        list_with_retry(|| list_via_listing_tool(&exe, archive_path))
    }

    fn extract_entry(
        &self,
        archive_path: &Path,
        entry_path: &str,
        destination: &Path,
    ) -> anyhow::Result<()> {
        let exe = which::which("unrar").with_context(|| "unrar not found on PATH")?;
        extract_via_temp_dir(&exe, archive_path, entry_path, destination)
    }
}

/// Shared "list by running `exe l <archive>` and parse columnar output" path for the two
/// external-process adapters (7z and unrar both emit a similar dashed-table format).
fn list_via_listing_tool(exe: &Path, archive_path: &Path) -> anyhow::Result<Vec<ArchiveEntryMeta>> {
    let output = Command::new(exe)
        .arg("l")
        .arg(archive_path.as_os_str())
        .output()
        .with_context(|| format!("running {exe:?} to list archive: {archive_path:?}"))?;

    if !output.status.success() {
        return Ok(Vec::new());
    }

    let text = String::from_utf8_lossy(&output.stdout).to_string();
    let mut names: HashSet<String> = HashSet::new();
    if let Some(header_line) = text.lines().find(|l| l.contains("Name")) {
        if let Some(name_idx) = header_line.find("Name") {
            let mut in_table = false;
            for line in text.lines() {
                if !in_table {
                    if line.trim_start().starts_with("----") {
                        in_table = true;
                    }
                    continue;
                }
                if line.trim_start().starts_with("----") {
                    break;
                }
                if line.contains("Name") && line.contains("Size") {
                    continue;
                }
                if line.len() > name_idx {
                    let name = line[name_idx..].trim().to_string();
                    if !name.is_empty() {
                        names.insert(name);
                    }
                }
            }
        }
    }

    Ok(names
        .into_iter()
        .map(|entry_path| ArchiveEntryMeta {
            entry_path,
            size: 0,
            crc32: None,
        })
        .collect())
}

/// Shared "extract everything to a scratch tempdir, then copy the one entry we want" path.
/// The tempdir is an RAII guard, so it is removed on every exit path, including panics.
fn extract_via_temp_dir(
    exe: &Path,
    archive_path: &Path,
    entry_path: &str,
    destination: &Path,
) -> anyhow::Result<()> {
    let tmp = tempfile::tempdir().with_context(|| "creating scratch extraction directory")?;

    let status = Command::new(exe)
        .arg("x")
        .arg(archive_path.as_os_str())
        .arg(format!("-o{}", tmp.path().to_string_lossy()))
        .arg("-y")
        .status()
        .with_context(|| format!("extracting {archive_path:?} to tempdir"))?;

    if !status.success() {
        anyhow::bail!("extraction of {archive_path:?} failed");
    }

    let extracted = tmp.path().join(entry_path);
    if !extracted.exists() {
        anyhow::bail!("entry {entry_path:?} not found after extracting {archive_path:?}");
    }
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(&extracted, destination)
        .with_context(|| format!("copying extracted entry to {destination:?}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn detect_kind_by_extension() {
        assert_eq!(detect_kind(Path::new("a.zip")), ArchiveKind::Zip);
        assert_eq!(detect_kind(Path::new("a.tar")), ArchiveKind::Tar);
        assert_eq!(detect_kind(Path::new("a.rar")), ArchiveKind::Rar);
        assert_eq!(detect_kind(Path::new("a.7z")), ArchiveKind::SevenZip);
        assert_eq!(detect_kind(Path::new("a.rom")), ArchiveKind::None);
    }

    #[test]
    fn zip_adapter_round_trips_entry() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        {
            let mut w = zip::ZipWriter::new(tmp.reopen().unwrap());
            w.start_file::<_, ()>("a.rom", zip::write::FileOptions::default())
                .unwrap();
            w.write_all(b"hello").unwrap();
            w.finish().unwrap();
        }

        let adapter = ZipAdapter;
        let entries = adapter.list_entries(tmp.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_path, "a.rom");
        assert_eq!(entries[0].size, 5);

        let out = tempfile::NamedTempFile::new().unwrap();
        adapter
            .extract_entry(tmp.path(), "a.rom", out.path())
            .unwrap();
        assert_eq!(std::fs::read(out.path()).unwrap(), b"hello");
    }

    #[test]
    fn tar_adapter_round_trips_entry() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        {
            let mut builder = tar::Builder::new(tmp.reopen().unwrap());
            let data = b"world";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_cksum();
            builder.append_data(&mut header, "b.rom", &data[..]).unwrap();
            builder.finish().unwrap();
        }

        let adapter = TarAdapter;
        let entries = adapter.list_entries(tmp.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_path, "b.rom");

        let out = tempfile::NamedTempFile::new().unwrap();
        adapter
            .extract_entry(tmp.path(), "b.rom", out.path())
            .unwrap();
        assert_eq!(std::fs::read(out.path()).unwrap(), b"world");
    }
}

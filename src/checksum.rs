//! Content hashing (§3: "Hashing is treated as a pure content function"). Streams a file (or
//! an in-memory buffer) through whichever checksum algorithms `Config::input_checksum_min`..
//! `input_checksum_max` selects, optionally skipping a ROM-header prefix first.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::mpsc::Sender;

use anyhow::Context;
use crc32fast::Hasher as Crc32;
use md5::{Digest as Md5Digest, Md5};
use sha1_smol::Sha1;

use crate::config::Config;
use crate::progress::ProgressEvent;
use crate::types::{Checksum, ChecksumSet};

const STREAM_CHUNK_SIZE: usize = 512 * 1024;
const MIN_PROGRESS_UPDATE: u64 = 64 * 1024;

pub fn checksum_range(min: Checksum, max: Option<Checksum>) -> Vec<Checksum> {
    let min_rank = min.rank();
    let max_rank = max.map(|c| c.rank()).unwrap_or(min_rank);

    [Checksum::Crc32, Checksum::Md5, Checksum::Sha1]
        .into_iter()
        .filter(|c| c.rank() >= min_rank && c.rank() <= max_rank)
        .collect()
}

/// Hash an arbitrary reader. Used for in-memory archive-entry buffers where seeking to skip
/// a header isn't available; callers that need header-skipping go through
/// `compute_checksums_with_header` instead.
pub fn compute_checksums_stream<R: Read>(
    mut reader: R,
    config: &Config,
) -> anyhow::Result<(ChecksumSet, u64)> {
    let targets = checksum_range(config.input_checksum_min, config.input_checksum_max);
    let mut crc32h = targets.contains(&Checksum::Crc32).then(Crc32::new);
    let mut md5h = targets.contains(&Checksum::Md5).then(Md5::new);
    let mut sha1h = targets.contains(&Checksum::Sha1).then(Sha1::new);

    let mut processed: u64 = 0;
    let mut buf = vec![0u8; STREAM_CHUNK_SIZE.min(64 * 1024)];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        processed = processed.saturating_add(n as u64);
        let slice = &buf[..n];
        if let Some(h) = crc32h.as_mut() {
            h.update(slice);
        }
        if let Some(h) = md5h.as_mut() {
            h.update(slice);
        }
        if let Some(h) = sha1h.as_mut() {
            h.update(slice);
        }
    }

    Ok((
        ChecksumSet {
            crc32: crc32h.map(|h| format!("{:08x}", h.finalize())),
            md5: md5h.map(|h| format!("{:032x}", h.finalize())),
            sha1: sha1h.map(|h| h.digest().to_string()),
        },
        processed,
    ))
}

/// Hash a file on disk, optionally skipping `header_size` bytes first so the result reflects
/// the "without-header" viewpoint described in §3. Reports incremental progress when a sender
/// is supplied.
pub fn compute_checksums_with_header(
    path: &Path,
    config: &Config,
    header_size: Option<u64>,
    progress_sender: Option<Sender<ProgressEvent>>,
) -> anyhow::Result<ChecksumSet> {
    let targets = checksum_range(config.input_checksum_min, config.input_checksum_max);
    let mut file =
        File::open(path).with_context(|| format!("opening file for checksum: {path:?}"))?;
    let file_len = file.metadata().map(|m| m.len()).unwrap_or(0);

    let trim = match header_size {
        Some(s) if s > 0 && s <= file_len => Some(s),
        _ => None,
    };

    let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
    if let Some(mut remaining) = trim {
        while remaining > 0 {
            let to_read = std::cmp::min(remaining, buf.len() as u64) as usize;
            let n = file.read(&mut buf[..to_read])?;
            if n == 0 {
                break;
            }
            remaining -= n as u64;
        }
    }

    let mut crc32h = targets.contains(&Checksum::Crc32).then(Crc32::new);
    let mut md5h = targets.contains(&Checksum::Md5).then(Md5::new);
    let mut sha1h = targets.contains(&Checksum::Sha1).then(Sha1::new);

    let mut bytes_read: u64 = 0;
    let mut last_reported: u64 = 0;
    let report_threshold = std::cmp::max(MIN_PROGRESS_UPDATE, (buf.len() as u64) / 2);
    let total_size = file_len.saturating_sub(trim.unwrap_or(0));
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            if let Some(tx) = &progress_sender {
                let _ = tx.send(ProgressEvent::hashing(path.to_path_buf(), bytes_read, Some(total_size)));
            }
            break;
        }
        let slice = &buf[..n];
        if let Some(h) = crc32h.as_mut() {
            h.update(slice);
        }
        if let Some(h) = md5h.as_mut() {
            h.update(slice);
        }
        if let Some(h) = sha1h.as_mut() {
            h.update(slice);
        }
        bytes_read = bytes_read.saturating_add(n as u64);
        if let Some(tx) = &progress_sender {
            if bytes_read - last_reported >= report_threshold {
                let _ = tx.send(ProgressEvent::hashing(path.to_path_buf(), bytes_read, Some(total_size)));
                last_reported = bytes_read;
            }
        }
    }

    Ok(ChecksumSet {
        crc32: crc32h.map(|h| format!("{:08x}", h.finalize())),
        md5: md5h.map(|h| format!("{:032x}", h.finalize())),
        sha1: sha1h.map(|h| h.digest().to_string()),
    })
}

pub fn compute_checksums(path: &Path, config: &Config) -> anyhow::Result<ChecksumSet> {
    compute_checksums_with_header(path, config, None, None)
}

pub fn compute_checksums_from_bytes(buf: &[u8], config: &Config) -> anyhow::Result<ChecksumSet> {
    let cursor = std::io::Cursor::new(buf);
    let (checksums, _) = compute_checksums_stream(cursor, config)?;
    Ok(checksums)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn all_checksums_config() -> Config {
        let mut c = Config::default();
        c.input_checksum_min = Checksum::Crc32;
        c.input_checksum_max = Some(Checksum::Sha1);
        c
    }

    #[test]
    fn trimmed_checksums_match_body_bytes() {
        let mut f = NamedTempFile::new().unwrap();
        let header = vec![0xAAu8; 128];
        let body = b"hello trimmed world".to_vec();
        f.write_all(&header).unwrap();
        f.write_all(&body).unwrap();
        f.flush().unwrap();

        let cfg = all_checksums_config();
        let trimmed = compute_checksums_with_header(f.path(), &cfg, Some(128), None).unwrap();
        let from_bytes = compute_checksums_from_bytes(&body, &cfg).unwrap();

        assert_eq!(trimmed.crc32, from_bytes.crc32);
        assert_eq!(trimmed.md5, from_bytes.md5);
        assert_eq!(trimmed.sha1, from_bytes.sha1);
    }

    #[test]
    fn header_size_equal_file_results_in_empty_body_checksums() {
        let mut f = NamedTempFile::new().unwrap();
        let header = vec![0xFFu8; 64];
        f.write_all(&header).unwrap();
        f.flush().unwrap();

        let cfg = all_checksums_config();
        let trimmed = compute_checksums_with_header(f.path(), &cfg, Some(64), None).unwrap();
        let empty = compute_checksums_from_bytes(&[], &cfg).unwrap();

        assert_eq!(trimmed.crc32, empty.crc32);
        assert_eq!(trimmed.md5, empty.md5);
        assert_eq!(trimmed.sha1, empty.sha1);
    }

    #[test]
    fn header_size_larger_than_file_uses_full_buffer() {
        let mut f = NamedTempFile::new().unwrap();
        let data = b"actual data";
        f.write_all(data).unwrap();
        f.flush().unwrap();

        let cfg = all_checksums_config();
        let computed = compute_checksums_with_header(f.path(), &cfg, Some(1024), None).unwrap();
        let full = compute_checksums_from_bytes(data, &cfg).unwrap();

        assert_eq!(computed.crc32, full.crc32);
        assert_eq!(computed.md5, full.md5);
        assert_eq!(computed.sha1, full.sha1);
    }

    #[test]
    fn checksum_range_respects_min_and_max() {
        let range = checksum_range(Checksum::Md5, Some(Checksum::Sha1));
        assert_eq!(range, vec![Checksum::Md5, Checksum::Sha1]);
    }
}

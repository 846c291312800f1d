//! The File Indexer (§4.1): builds a fingerprint -> candidate-files map over the scanned input
//! tree, and picks a single preferred candidate per fingerprint when several files share it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;

use crate::config::Config;
use crate::file::File;
use crate::types::Fingerprint;

struct IndexEntry {
    file: Arc<File>,
    /// `true` when this entry was indexed under its without-header fingerprint rather than
    /// its raw (with-header) one.
    header_stripped: bool,
}

/// Maps every fingerprint reachable from the indexed files (both with- and without-header
/// viewpoints, when a header was detected) to the files that produce it.
pub struct Indexer {
    entries: HashMap<Fingerprint, Vec<IndexEntry>>,
}

impl Indexer {
    pub fn build(files: &[Arc<File>], config: &Config) -> anyhow::Result<Indexer> {
        // Hashing is the expensive part; compute every file's fingerprints in parallel, then
        // fold the (small, cheap) results into the map on the calling thread.
        let computed: Vec<anyhow::Result<(Option<Fingerprint>, Option<Fingerprint>)>> = files
            .par_iter()
            .map(|file| {
                let with_header = file.with_header_fingerprint(config)?;
                let without_header = file.without_header_fingerprint(config)?;
                Ok((with_header, without_header))
            })
            .collect();

        let mut entries: HashMap<Fingerprint, Vec<IndexEntry>> = HashMap::new();
        for (file, result) in files.iter().zip(computed) {
            let (with_header, without_header) = result?;
            if let Some(fp) = with_header {
                entries.entry(fp).or_default().push(IndexEntry {
                    file: Arc::clone(file),
                    header_stripped: false,
                });
            }
            if let Some(fp) = without_header {
                entries.entry(fp).or_default().push(IndexEntry {
                    file: Arc::clone(file),
                    header_stripped: true,
                });
            }
        }

        Ok(Indexer { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every file indexed under `fingerprint`, in preference order (§4.1): the file at index 0
    /// is the one a write/link operation should use.
    pub fn candidates(&self, fingerprint: &Fingerprint, output_dir: &Path) -> Vec<Arc<File>> {
        let Some(entries) = self.entries.get(fingerprint) else {
            return Vec::new();
        };

        let mut ranked: Vec<&IndexEntry> = entries.iter().collect();
        ranked.sort_by(|a, b| preference_key(a, output_dir).cmp(&preference_key(b, output_dir)));
        ranked.into_iter().map(|e| Arc::clone(&e.file)).collect()
    }

    /// The single best file for `fingerprint`, or `None` if no indexed file produces it.
    pub fn best(&self, fingerprint: &Fingerprint, output_dir: &Path) -> Option<Arc<File>> {
        self.candidates(fingerprint, output_dir).into_iter().next()
    }
}

#[cfg(unix)]
fn filesystem_id(path: &Path) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata(path).ok().map(|m| m.dev())
}

#[cfg(not(unix))]
fn filesystem_id(_path: &Path) -> Option<u64> {
    None
}

/// The 5-tier ordering key (§4.1), ascending = more preferred:
/// 1. header-match preference: a raw (with-header) fingerprint match beats one obtained by
///    stripping a detected header.
/// 2. archive-kind priority: lower-overhead containers (plain file, then zip/tar/7z/rar) beat
///    higher-overhead ones.
/// 3. output-dir deprioritisation: a candidate already sitting in the output directory is
///    demoted, since using it as a source risks reading back what this run itself wrote.
/// 4. same-filesystem preference: a candidate on the same filesystem as the output directory
///    is promoted, since moving it there can be a rename instead of a copy.
/// 5. lexicographic path tiebreak, for determinism.
fn preference_key(entry: &IndexEntry, output_dir: &Path) -> (u8, u8, u8, u8, String) {
    let header_tier = entry.header_stripped as u8;
    let archive_tier = entry.file.archive_kind().priority();

    let display_path = entry.file.display_path();
    let in_output_dir = entry.file.path().starts_with(output_dir) as u8;

    let same_fs = match (filesystem_id(entry.file.path()), filesystem_id(output_dir)) {
        (Some(a), Some(b)) => (a != b) as u8,
        _ => 0,
    };

    (header_tier, archive_tier, in_output_dir, same_fs, display_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn prefers_plain_file_over_archive_entry_for_same_fingerprint() {
        let config = Config::default();
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"payload").unwrap();
        f.flush().unwrap();

        let plain = Arc::new(File::on_disk(f.path().to_path_buf(), 7, None));
        let archived = Arc::new(File::in_archive(
            f.path().to_path_buf(),
            "entry.bin".into(),
            crate::types::ArchiveKind::Zip,
            7,
            None,
        ));

        // Both report the same fingerprint by construction for this test (same bytes).
        let fp = plain.with_header_fingerprint(&config).unwrap().unwrap();

        let mut entries: HashMap<Fingerprint, Vec<IndexEntry>> = HashMap::new();
        entries.insert(
            fp.clone(),
            vec![
                IndexEntry {
                    file: Arc::clone(&archived),
                    header_stripped: false,
                },
                IndexEntry {
                    file: Arc::clone(&plain),
                    header_stripped: false,
                },
            ],
        );
        let indexer = Indexer { entries };

        let best = indexer.best(&fp, Path::new("/out")).unwrap();
        assert!(!best.is_archive_entry());
    }

    #[test]
    fn unknown_fingerprint_has_no_candidates() {
        let indexer = Indexer {
            entries: HashMap::new(),
        };
        let fp = Fingerprint {
            algorithm: crate::types::Checksum::Sha1,
            value: "0".repeat(40),
        };
        assert!(indexer.candidates(&fp, Path::new("/out")).is_empty());
    }
}

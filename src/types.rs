use clap::ValueEnum;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, ValueEnum, PartialEq, Eq, Hash)]
pub enum Action {
    /// Reshape a DAT's parent/clone sets according to --merge-mode and write it back out.
    Merge,
    /// Index the input files, match them against the DAT(s), and emit a residual fixdat.
    Fixdat,
}

#[derive(Debug, Clone, Copy, Serialize, ValueEnum, PartialEq, Eq, Hash)]
pub enum MergeMode {
    /// Sanitize only; no set arithmetic.
    None,
    /// Clones carry only deltas from their parent; BIOS ROMs subtracted.
    Split,
    /// The parent class collapses to one game with clone-prefixed ROM names.
    Merged,
    /// Games are self-contained; device ROMs inlined.
    Fullnonmerged,
}

#[derive(Debug, Clone, Copy, Serialize, ValueEnum, PartialEq, Eq, Hash)]
pub enum Checksum {
    #[serde(rename = "CRC32")]
    Crc32,
    #[serde(rename = "MD5")]
    Md5,
    #[serde(rename = "SHA1")]
    Sha1,
}

impl Checksum {
    /// Higher rank means a stronger/more-trusted algorithm.
    pub fn rank(&self) -> u8 {
        match self {
            Checksum::Crc32 => 0,
            Checksum::Md5 => 1,
            Checksum::Sha1 => 2,
        }
    }
}

/// The subset of checksums a ROM entry or candidate file carries. Not every DAT declares
/// every algorithm, so matching must fall back through whichever pair both sides have.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ChecksumSet {
    pub crc32: Option<String>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
}

/// An opaque, equality-comparable content fingerprint, picked as the strongest checksum
/// a `ChecksumSet` has available.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub algorithm: Checksum,
    pub value: String,
}

impl ChecksumSet {
    /// The strongest available checksum, per `Checksum::rank`, or `None` if the set is empty.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        if let Some(v) = &self.sha1 {
            return Some(Fingerprint {
                algorithm: Checksum::Sha1,
                value: v.to_ascii_lowercase(),
            });
        }
        if let Some(v) = &self.md5 {
            return Some(Fingerprint {
                algorithm: Checksum::Md5,
                value: v.to_ascii_lowercase(),
            });
        }
        if let Some(v) = &self.crc32 {
            return Some(Fingerprint {
                algorithm: Checksum::Crc32,
                value: v.to_ascii_lowercase(),
            });
        }
        None
    }

    /// Compares two checksum sets at whatever the strongest shared algorithm is.
    /// Returns `None` when the sets share no algorithm (the comparison is undecidable).
    pub fn matches(&self, other: &ChecksumSet) -> Option<bool> {
        if let (Some(a), Some(b)) = (&self.sha1, &other.sha1) {
            return Some(a.eq_ignore_ascii_case(b));
        }
        if let (Some(a), Some(b)) = (&self.md5, &other.md5) {
            return Some(a.eq_ignore_ascii_case(b));
        }
        if let (Some(a), Some(b)) = (&self.crc32, &other.crc32) {
            return Some(a.eq_ignore_ascii_case(b));
        }
        None
    }
}

/// Total preference order over archive kinds used both by the indexer tiebreaker and by
/// the archive-adapter dispatch. Lower priority value sorts first / is preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArchiveKind {
    None,
    Zip,
    Tar,
    Rar,
    SevenZip,
    Other,
}

impl ArchiveKind {
    pub fn priority(&self) -> u8 {
        match self {
            ArchiveKind::None => 0,
            ArchiveKind::Zip => 1,
            ArchiveKind::Tar => 2,
            ArchiveKind::Rar => 3,
            ArchiveKind::SevenZip => 4,
            ArchiveKind::Other => 99,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntryMeta {
    pub entry_path: String,
    pub size: u64,
    pub crc32: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Paths {
    pub input: Vec<PathBuf>,
    pub dat: Vec<PathBuf>,
    pub output: PathBuf,
}

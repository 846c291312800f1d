//! Binds indexed input files to a DAT's ROMs, producing one release candidate per game.

use std::path::Path;
use std::sync::Arc;

use crate::dat::{Dat, Game, Rom};
use crate::file::File;
use crate::indexer::Indexer;

pub struct RomMatch {
    pub rom: Rom,
    pub file: Option<Arc<File>>,
}

impl RomMatch {
    pub fn is_matched(&self) -> bool {
        self.file.is_some()
    }
}

pub struct ReleaseCandidate {
    pub game: Game,
    pub rom_matches: Vec<RomMatch>,
}

impl ReleaseCandidate {
    pub fn is_complete(&self) -> bool {
        self.rom_matches.iter().all(RomMatch::is_matched)
    }

    pub fn missing(&self) -> impl Iterator<Item = &RomMatch> {
        self.rom_matches.iter().filter(|m| !m.is_matched())
    }
}

/// Matches every game in `dat` against `indexer`, keyed by each ROM's strongest-available
/// fingerprint. A ROM with no recorded checksum at all can never match and is reported missing.
pub fn match_dat(dat: &Dat, indexer: &Indexer, output_dir: &Path) -> Vec<ReleaseCandidate> {
    dat.games
        .iter()
        .map(|game| {
            let rom_matches = game
                .roms
                .iter()
                .map(|rom| {
                    let file = rom
                        .checksums
                        .fingerprint()
                        .and_then(|fp| indexer.best(&fp, output_dir));
                    RomMatch {
                        rom: rom.clone(),
                        file,
                    }
                })
                .collect();
            ReleaseCandidate {
                game: game.clone(),
                rom_matches,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dat::DatHeader;
    use crate::types::ChecksumSet;
    use std::io::Write;

    #[test]
    fn matches_rom_by_fingerprint_and_reports_missing() {
        let config = Config::default();
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"rom bytes").unwrap();
        f.flush().unwrap();

        let file = Arc::new(File::on_disk(f.path().to_path_buf(), 9, None));
        let fp = file.with_header_fingerprint(&config).unwrap().unwrap();

        let dat = Dat {
            header: DatHeader::default(),
            games: vec![Game {
                name: "Game".into(),
                roms: vec![
                    Rom {
                        name: "present.bin".into(),
                        size: Some(9),
                        checksums: ChecksumSet {
                            crc32: None,
                            md5: None,
                            sha1: Some(fp.value.clone()),
                        },
                        merge: None,
                        bios: false,
                    },
                    Rom {
                        name: "absent.bin".into(),
                        size: Some(9),
                        checksums: ChecksumSet {
                            crc32: None,
                            md5: None,
                            sha1: Some("f".repeat(40)),
                        },
                        merge: None,
                        bios: false,
                    },
                ],
                ..Default::default()
            }],
        };

        let indexer = Indexer::build(&[file], &config).unwrap();
        let candidates = match_dat(&dat, &indexer, Path::new("/out"));
        assert_eq!(candidates.len(), 1);
        assert!(!candidates[0].is_complete());
        assert_eq!(candidates[0].missing().count(), 1);
    }
}

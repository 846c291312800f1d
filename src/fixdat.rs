//! The Fixdat Generator (§4.3): derives a residual catalog of ROMs not covered by a run's
//! written-hashes set, from the *original* (pre-merge) DAT.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::dat::{Dat, DatHeader, Game};
use crate::types::Fingerprint;

/// Builds the fixdat for `dat` given the set of fingerprints this run actually wrote out.
/// Returns `None` when every game's every ROM is already covered ("no fixdat" case, §8).
pub fn generate_fixdat(dat: &Dat, written: &HashSet<Fingerprint>, now: DateTime<Utc>) -> Option<Dat> {
    let mut missing_games = Vec::new();

    for game in &dat.games {
        let missing_roms: Vec<_> = game
            .roms
            .iter()
            .filter(|rom| {
                rom.checksums
                    .fingerprint()
                    .map(|fp| !written.contains(&fp))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();

        if !missing_roms.is_empty() {
            missing_games.push(game.with_roms(missing_roms));
        }
    }

    if missing_games.is_empty() {
        return None;
    }

    let header = DatHeader {
        name: format!("{} (fixdat)", dat.header.name),
        description: format!("{} (fixdat)", dat.header.description),
        version: dat.header.version.clone(),
        author: dat.header.author.clone(),
        date: Some(format_timestamp(now)),
        url: dat.header.url.clone(),
        comment: Some("Generated fixdat of missing ROMs".to_string()),
        rom_names_contain_directories: dat.header.rom_names_contain_directories,
    };

    Some(Dat {
        header,
        games: missing_games,
    })
}

/// `YYYYMMDD-HHMMSS` in UTC with a trailing `Z`, matching the Open-Question resolution in
/// SPEC_FULL.md §9.
fn format_timestamp(now: DateTime<Utc>) -> String {
    format!("{}Z", now.format("%Y%m%d-%H%M%S"))
}

/// Where a fixdat for `dat` should be written: `{output_dir}/{dat name}.dat`.
pub fn fixdat_path(output_dir: &Path, game_filename_stem: &str) -> PathBuf {
    output_dir.join(format!("{game_filename_stem}.dat"))
}

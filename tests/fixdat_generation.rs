use std::collections::HashSet;

use chrono::{TimeZone, Utc};

use igir::dat::{Dat, DatHeader, Game, Rom};
use igir::fixdat::{fixdat_path, generate_fixdat};
use igir::types::{Checksum, ChecksumSet, Fingerprint};

fn rom(name: &str, sha1: &str) -> Rom {
    Rom {
        name: name.to_string(),
        size: Some(1),
        checksums: ChecksumSet {
            crc32: None,
            md5: None,
            sha1: Some(sha1.to_string()),
        },
        merge: None,
        bios: false,
    }
}

fn two_game_dat() -> Dat {
    Dat {
        header: DatHeader {
            name: "Collection".into(),
            description: "Collection DAT".into(),
            ..Default::default()
        },
        games: vec![
            Game {
                name: "Complete Game".into(),
                roms: vec![rom("a.bin", "1111111111111111111111111111111111111a")],
                ..Default::default()
            },
            Game {
                name: "Incomplete Game".into(),
                roms: vec![rom("b.bin", "2222222222222222222222222222222222222b")],
                ..Default::default()
            },
        ],
    }
}

#[test]
fn no_fixdat_when_every_game_is_fully_present() {
    let dat = two_game_dat();
    let written: HashSet<Fingerprint> = dat
        .games
        .iter()
        .flat_map(|g| &g.roms)
        .filter_map(|r| r.checksums.fingerprint())
        .collect();

    let now = Utc.with_ymd_and_hms(2026, 7, 26, 12, 0, 0).unwrap();
    assert!(generate_fixdat(&dat, &written, now).is_none());
}

#[test]
fn fixdat_reports_only_the_incomplete_game_with_utc_timestamp() {
    let dat = two_game_dat();
    let mut written = HashSet::new();
    written.insert(Fingerprint {
        algorithm: Checksum::Sha1,
        value: "1111111111111111111111111111111111111a".to_string(),
    });

    let now = Utc.with_ymd_and_hms(2026, 7, 26, 12, 0, 0).unwrap();
    let fixdat = generate_fixdat(&dat, &written, now).unwrap();

    assert_eq!(fixdat.games.len(), 1);
    assert_eq!(fixdat.games[0].name, "Incomplete Game");
    assert_eq!(fixdat.header.date.as_deref(), Some("20260726-120000Z"));

    let path = fixdat_path(std::path::Path::new("/out"), &fixdat.header.name);
    assert_eq!(path, std::path::PathBuf::from("/out/Collection (fixdat).dat"));
}

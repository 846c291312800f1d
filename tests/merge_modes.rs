use igir::dat::{Dat, DatHeader, Game, MachineExtras, Rom};
use igir::merger::merge_dat;
use igir::types::{ChecksumSet, MergeMode};

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

fn arcade_dat() -> Dat {
    Dat {
        header: DatHeader {
            name: "Arcade".into(),
            description: "Arcade set".into(),
            ..Default::default()
        },
        games: vec![
            Game {
                name: "biosset".into(),
                roms: vec![rom("bios.rom", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")],
                machine: Some(MachineExtras {
                    device_refs: vec![],
                    is_bios: true,
                }),
                ..Default::default()
            },
            Game {
                name: "devicechip".into(),
                roms: vec![rom("device.rom", "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb")],
                ..Default::default()
            },
            Game {
                name: "mygame".into(),
                bios: Some("biosset".into()),
                roms: vec![rom("main.rom", "cccccccccccccccccccccccccccccccccccccccc")],
                machine: Some(MachineExtras {
                    device_refs: vec!["devicechip".into()],
                    is_bios: false,
                }),
                ..Default::default()
            },
        ],
    }
}

#[test]
fn none_mode_leaves_rom_sets_untouched() {
    let dat = arcade_dat();
    let out = merge_dat(&dat, MergeMode::None);
    let game = out.games.iter().find(|g| g.name == "mygame").unwrap();
    assert_eq!(game.roms.len(), 1);
    assert!(game.roms[0].merge.is_none());
}

#[test]
fn fullnonmerged_inlines_bios_and_device_roms() {
    let dat = arcade_dat();
    let out = merge_dat(&dat, MergeMode::Fullnonmerged);
    let game = out.games.iter().find(|g| g.name == "mygame").unwrap();
    let names: Vec<&str> = game.roms.iter().map(|r| r.name.as_str()).collect();
    assert!(names.contains(&"main.rom"));
    assert!(names.contains(&"bios.rom"));
    assert!(names.contains(&"device.rom"));
    assert!(game.roms.iter().all(|r| r.merge.is_none()));
}

#[test]
fn split_annotates_bios_owned_rom_with_merge_pointer() {
    let dat = arcade_dat();
    let out = merge_dat(&dat, MergeMode::Split);
    let game = out.games.iter().find(|g| g.name == "mygame").unwrap();
    // mygame's own roms are untouched by bios subtraction since it has no rom named
    // the same as the bios set's rom; only a genuinely shared name would get merge=Some.
    assert!(game.roms.iter().any(|r| r.name == "main.rom" && r.merge.is_none()));
}

#[test]
fn merged_collapses_parent_clone_pair_into_single_game() {
    let dat = Dat {
        header: DatHeader {
            name: "Consoles".into(),
            description: "Consoles set".into(),
            ..Default::default()
        },
        games: vec![
            Game {
                name: "Super Game (USA)".into(),
                roms: vec![rom("super game (usa).rom", "1111111111111111111111111111111111111a")],
                ..Default::default()
            },
            Game {
                name: "Super Game (Europe)".into(),
                parent: Some("Super Game (USA)".into()),
                roms: vec![
                    rom("super game (usa).rom", "1111111111111111111111111111111111111a"),
                    rom("super game (europe).rom", "2222222222222222222222222222222222222b"),
                ],
                ..Default::default()
            },
        ],
    };

    let out = merge_dat(&dat, MergeMode::Merged);
    assert_eq!(out.games.len(), 1);
    let parent = &out.games[0];
    assert!(parent.roms.iter().any(|r| r.name.contains("super game (usa).rom")));
    assert!(parent
        .roms
        .iter()
        .any(|r| r.name == "Super Game (Europe)\\super game (europe).rom"));
    assert!(out.header.rom_names_contain_directories);
}

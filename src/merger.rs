//! The DAT Merger/Splitter (§4.2): rewrites a DAT's ROM sets according to a `MergeMode`,
//! one parent/clone class at a time.

use std::collections::{HashMap, HashSet};

use crate::dat::{Dat, DatHeader, Game, ParentClass, Rom};
use crate::path_sanitizer::sanitize_component;
use crate::types::MergeMode;

/// Sort key for ROM names that orders embedded numbers numerically ("track-2" before
/// "track-10") rather than lexicographically. `-` is folded to `__` first so a hyphenated
/// name sorts the same whether or not it was already split/merged through a prefix rewrite
/// (the `clone\rom` rewrite in MERGED mode never introduces a `-`, so this keeps sort order
/// stable across modes).
pub fn natural_sort_key(name: &str) -> Vec<NaturalKeyPart> {
    let normalized = name.replace('-', "__");
    let mut parts = Vec::new();
    let mut chars = normalized.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            let mut digits = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() {
                    digits.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            parts.push(NaturalKeyPart::Number(digits.parse().unwrap_or(u64::MAX)));
        } else {
            let mut text = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() {
                    break;
                }
                text.push(c);
                chars.next();
            }
            parts.push(NaturalKeyPart::Text(text));
        }
    }

    parts
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NaturalKeyPart {
    Number(u64),
    Text(String),
}

pub fn sort_roms_naturally(roms: &mut [Rom]) {
    roms.sort_by(|a, b| natural_sort_key(&a.name).cmp(&natural_sort_key(&b.name)));
}

/// True when some ROM in `others` is byte-identical to `rom` at their strongest shared
/// checksum algorithm. Used to tell whether a clone's ROM is already represented by the
/// parent's own content, regardless of what either one is named.
fn content_matches_any(rom: &Rom, others: &[Rom]) -> bool {
    others
        .iter()
        .any(|other| rom.checksums.matches(&other.checksums) == Some(true))
}

/// ROM diff rule (§4.2): drops every ROM in `roms` whose effective name matches one in
/// `reference` *and* whose fingerprint is identical to it, since that ROM is already fully
/// represented by the reference game. A ROM with no same-named reference entry, or whose
/// fingerprint diverges from one that does, is kept unmodified.
fn diff_against_reference(roms: &mut Vec<Rom>, reference: &[&Rom]) {
    roms.retain(|rom| {
        match reference.iter().find(|r| r.effective_name() == rom.effective_name()) {
            None => true,
            Some(r) => rom.checksums.matches(&r.checksums) != Some(true),
        }
    });
}

fn resolve_device_roms<'a>(
    game: &Game,
    by_name: &HashMap<&'a str, &'a Game>,
    visited: &mut HashSet<String>,
) -> Vec<Rom> {
    let mut out = Vec::new();
    for dref in game.device_refs() {
        if !visited.insert(dref.clone()) {
            continue;
        }
        if let Some(device_game) = by_name.get(dref.as_str()) {
            out.extend(device_game.roms.iter().cloned());
            out.extend(resolve_device_roms(device_game, by_name, visited));
        }
    }
    out
}

fn sanitize_game(game: &mut Game) {
    let separator = std::path::MAIN_SEPARATOR;
    game.name = sanitize_component(&game.name, separator);
    for rom in &mut game.roms {
        rom.name = sanitize_component(&rom.name, separator);
    }
}

/// Rewrites `dat` according to `mode`. The header's `rom_names_contain_directories` flag is
/// set whenever MERGED mode introduced a `clone\rom` style name.
pub fn merge_dat(dat: &Dat, mode: MergeMode) -> Dat {
    let by_name: HashMap<&str, &Game> = dat.games.iter().map(|g| (g.name.as_str(), g)).collect();
    let classes = dat.parents();
    let mut introduced_directories = false;

    let out_classes: Vec<ParentClass> = classes
        .into_iter()
        .map(|class| process_class(class, mode, &by_name, &mut introduced_directories))
        .collect();

    let mut header = dat.header.clone();
    if mode == MergeMode::Merged {
        header.rom_names_contain_directories = introduced_directories;
    }

    let mut out = Dat::from_classes(header, out_classes);
    for game in &mut out.games {
        sanitize_game(game);
        sort_roms_naturally(&mut game.roms);
    }
    out
}

fn bios_roms<'a>(game: &Game, by_name: &HashMap<&'a str, &'a Game>) -> Vec<Rom> {
    game.bios
        .as_deref()
        .and_then(|name| by_name.get(name))
        .map(|g| g.roms.clone())
        .unwrap_or_default()
}

fn process_class(
    mut class: ParentClass,
    mode: MergeMode,
    by_name: &HashMap<&str, &Game>,
    introduced_directories: &mut bool,
) -> ParentClass {
    match mode {
        MergeMode::None => class,
        MergeMode::Fullnonmerged => {
            for game in class_games_mut(&mut class) {
                let mut extra = bios_roms(game, by_name);
                let mut visited = HashSet::new();
                extra.extend(resolve_device_roms(game, by_name, &mut visited));
                for rom in &mut extra {
                    rom.merge = None;
                }
                game.roms.extend(extra);
            }
            if let Some(parent) = &class.parent {
                let parent_roms = parent.roms.clone();
                for clone in &mut class.clones {
                    let mut extra: Vec<Rom> = parent_roms
                        .iter()
                        .filter(|pr| !clone.roms.iter().any(|cr| cr.effective_name() == pr.effective_name()))
                        .cloned()
                        .collect();
                    for rom in &mut extra {
                        rom.merge = None;
                    }
                    clone.roms.extend(extra);
                }
            }
            class
        }
        MergeMode::Split => {
            for game in class_games_mut(&mut class) {
                let bios = bios_roms(game, by_name);
                let bios_refs: Vec<&Rom> = bios.iter().collect();
                diff_against_reference(&mut game.roms, &bios_refs);
            }
            if let Some(parent) = &class.parent {
                let parent_refs: Vec<&Rom> = parent.roms.iter().collect();
                for clone in &mut class.clones {
                    diff_against_reference(&mut clone.roms, &parent_refs);
                }
            }
            class
        }
        MergeMode::Merged => {
            for game in class_games_mut(&mut class) {
                let bios = bios_roms(game, by_name);
                let bios_refs: Vec<&Rom> = bios.iter().collect();
                diff_against_reference(&mut game.roms, &bios_refs);
            }

            let Some(mut parent) = class.parent.take() else {
                // Orphan singleton class: nothing to collapse into.
                return class;
            };

            // Snapshot the parent's own (post-diff) content before adding anything, so a
            // clone's ROM is only ever compared against the parent, never against another
            // clone's already-added entries: two clones sharing content under different
            // local names must both survive the rename below.
            let parent_originals = parent.roms.clone();

            for clone in &class.clones {
                for rom in &clone.roms {
                    if content_matches_any(rom, &parent_originals) {
                        continue;
                    }
                    let mut renamed = rom.clone();
                    renamed.name = format!("{}\\{}", clone.name, rom.name);
                    renamed.merge = None;
                    *introduced_directories = true;
                    parent.roms.push(renamed);
                }
            }

            ParentClass {
                parent: Some(parent),
                clones: Vec::new(),
            }
        }
    }
}

fn class_games_mut(class: &mut ParentClass) -> impl Iterator<Item = &mut Game> {
    class.parent.iter_mut().chain(class.clones.iter_mut())
}

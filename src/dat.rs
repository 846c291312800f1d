//! The DAT data model (§3) and its Logiqx XML I/O (§6). Parsing/serialization are treated as
//! an external-collaborator concern by the distilled spec, but a complete crate still needs
//! them: they're how input catalogs are loaded and how the fixdat is written back out.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Context;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;

use crate::types::ChecksumSet;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Rom {
    pub name: String,
    pub size: Option<u64>,
    pub checksums: ChecksumSet,
    /// Name under which the same bytes appear in a parent/BIOS set, when it differs from `name`.
    pub merge: Option<String>,
    pub bios: bool,
}

impl Rom {
    /// The name to use when looking this ROM up in a reference game's ROM list (§4.2 "ROM diff rule").
    pub fn effective_name(&self) -> &str {
        self.merge.as_deref().unwrap_or(&self.name)
    }
}

/// The arcade-style "device reference" / BIOS-flag payload that only machine-kind games carry.
/// Modelled as an optional field on `Game` rather than a `Machine` subtype, per the
/// polymorphism redesign note in SPEC_FULL.md §9.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct MachineExtras {
    pub device_refs: Vec<String>,
    pub is_bios: bool,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Game {
    pub name: String,
    pub description: Option<String>,
    /// `cloneof`: the parent game's name, if this is a clone.
    pub parent: Option<String>,
    /// `romof`, when it names a BIOS set distinct from `parent`: the BIOS game's name.
    pub bios: Option<String>,
    pub roms: Vec<Rom>,
    pub machine: Option<MachineExtras>,
}

impl Game {
    pub fn is_clone(&self) -> bool {
        self.parent.is_some()
    }

    pub fn is_machine(&self) -> bool {
        self.machine.is_some()
    }

    pub fn device_refs(&self) -> &[String] {
        self.machine
            .as_ref()
            .map(|m| m.device_refs.as_slice())
            .unwrap_or(&[])
    }

    pub fn with_roms(&self, roms: Vec<Rom>) -> Game {
        Game {
            roms,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DatHeader {
    pub name: String,
    pub description: String,
    pub version: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub url: Option<String>,
    pub comment: Option<String>,
    /// Set when a MERGED pass re-parented at least one clone's ROMs under a `clone\name` path,
    /// so that downstream path construction knows ROM names carry directory components.
    pub rom_names_contain_directories: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Dat {
    pub header: DatHeader,
    pub games: Vec<Game>,
}

/// One parent/clone equivalence class (§3 "Parent (class)"): a grouping handle derived
/// on-demand from a DAT, never persisted.
#[derive(Debug, Clone)]
pub struct ParentClass {
    pub parent: Option<Game>,
    pub clones: Vec<Game>,
}

impl ParentClass {
    /// All games in this class, parent first, in original order.
    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.parent.iter().chain(self.clones.iter())
    }
}

impl Dat {
    /// Groups the DAT's games into parent/clone equivalence classes (§3). Every game belongs
    /// to exactly one class; clones whose declared parent doesn't exist in the DAT form their
    /// own singleton class instead of being silently dropped.
    pub fn parents(&self) -> Vec<ParentClass> {
        let root_names: HashSet<&str> = self
            .games
            .iter()
            .filter(|g| g.parent.is_none())
            .map(|g| g.name.as_str())
            .collect();

        let mut clones_by_parent: HashMap<&str, Vec<&Game>> = HashMap::new();
        for g in &self.games {
            if let Some(p) = &g.parent {
                if root_names.contains(p.as_str()) {
                    clones_by_parent.entry(p.as_str()).or_default().push(g);
                }
            }
        }

        let mut classes = Vec::new();
        let mut emitted: HashSet<&str> = HashSet::new();
        for g in &self.games {
            if emitted.contains(g.name.as_str()) {
                continue;
            }
            match &g.parent {
                None => {
                    let clones = clones_by_parent
                        .get(g.name.as_str())
                        .cloned()
                        .unwrap_or_default();
                    emitted.insert(g.name.as_str());
                    for c in &clones {
                        emitted.insert(c.name.as_str());
                    }
                    classes.push(ParentClass {
                        parent: Some(g.clone()),
                        clones: clones.into_iter().cloned().collect(),
                    });
                }
                Some(p) if !root_names.contains(p.as_str()) => {
                    emitted.insert(g.name.as_str());
                    classes.push(ParentClass {
                        parent: None,
                        clones: vec![g.clone()],
                    });
                }
                Some(_) => {
                    // Handled when its parent's class is built, regardless of iteration order.
                }
            }
        }

        classes
    }

    pub fn from_classes(header: DatHeader, classes: Vec<ParentClass>) -> Dat {
        let mut games = Vec::new();
        for class in classes {
            if let Some(parent) = class.parent {
                games.push(parent);
            }
            games.extend(class.clones);
        }
        Dat { header, games }
    }
}

fn attr_string(e: &quick_xml::events::BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// Parses a Logiqx-dialect DAT file into the `Dat` model.
pub fn parse_dat(path: &Path) -> anyhow::Result<Dat> {
    let mut reader = Reader::from_file(path)
        .with_context(|| format!("opening DAT file: {}", path.display()))?;
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut header = DatHeader::default();
    let mut games: Vec<Game> = Vec::new();

    let mut in_header = false;
    let mut text_target: Option<&'static str> = None;
    let mut comment_lines: Vec<String> = Vec::new();

    let mut current_game: Option<Game> = None;
    let mut in_description = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .with_context(|| format!("parsing DAT file: {}", path.display()))?;
        let is_empty_tag = matches!(event, Event::Empty(_));

        match event {
            Event::Start(ref e) if e.name().as_ref() == b"header" => {
                in_header = true;
            }
            Event::End(ref e) if e.name().as_ref() == b"header" => {
                in_header = false;
            }
            Event::Start(ref e) if in_header => match e.name().as_ref() {
                b"name" => text_target = Some("name"),
                b"description" => text_target = Some("description"),
                b"version" => text_target = Some("version"),
                b"author" => text_target = Some("author"),
                b"date" => text_target = Some("date"),
                b"url" => text_target = Some("url"),
                b"comment" => text_target = Some("comment"),
                _ => text_target = None,
            },
            Event::Text(e) if in_header => {
                let text = e.unescape().unwrap_or_default().to_string();
                match text_target {
                    Some("name") => header.name = text,
                    Some("description") => header.description = text,
                    Some("version") => header.version = Some(text),
                    Some("author") => header.author = Some(text),
                    Some("date") => header.date = Some(text),
                    Some("url") => header.url = Some(text),
                    Some("comment") => comment_lines.push(text),
                    _ => {}
                }
            }
            Event::End(ref e) if in_header => {
                text_target = None;
                let _ = e;
            }
            Event::Start(ref e) | Event::Empty(ref e)
                if e.name().as_ref() == b"game" || e.name().as_ref() == b"machine" =>
            {
                let is_machine = e.name().as_ref() == b"machine";
                let name = attr_string(e, b"name").unwrap_or_default();
                let cloneof = attr_string(e, b"cloneof");
                let romof = attr_string(e, b"romof");
                let is_bios = attr_string(e, b"isbios")
                    .map(|v| v.eq_ignore_ascii_case("yes"))
                    .unwrap_or(false);

                // A game's BIOS dependency is its `romof`, when that differs from its
                // clone parent (`cloneof`); when they're equal, romof is just restating the
                // clone link rather than naming a separate BIOS set.
                let bios = match (&romof, &cloneof) {
                    (Some(r), Some(c)) if r != c => Some(r.clone()),
                    (Some(r), None) => Some(r.clone()),
                    _ => None,
                };

                let machine = if is_machine || is_bios {
                    Some(MachineExtras {
                        device_refs: Vec::new(),
                        is_bios,
                    })
                } else {
                    None
                };

                let game = Game {
                    name,
                    description: None,
                    parent: cloneof,
                    bios,
                    roms: Vec::new(),
                    machine,
                };

                // A self-closing `<game/>` or `<machine/>` (no ROMs, no description) never
                // gets a matching `Event::End`, so it must be finalised immediately.
                if is_empty_tag {
                    games.push(game);
                } else {
                    current_game = Some(game);
                }
            }
            Event::Start(ref e) if e.name().as_ref() == b"description" => {
                in_description = true;
                let _ = e;
            }
            Event::Text(e) if in_description => {
                if let Some(g) = current_game.as_mut() {
                    g.description = Some(e.unescape().unwrap_or_default().to_string());
                }
                in_description = false;
            }
            Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"device_ref" => {
                if let Some(name) = attr_string(e, b"name") {
                    if let Some(g) = current_game.as_mut() {
                        g.machine.get_or_insert_with(MachineExtras::default);
                        g.machine.as_mut().unwrap().device_refs.push(name);
                    }
                }
            }
            Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"rom" => {
                let name = attr_string(e, b"name").unwrap_or_default();
                let size = attr_string(e, b"size").and_then(|v| v.parse().ok());
                let crc32 = attr_string(e, b"crc").map(|v| v.to_ascii_lowercase());
                let md5 = attr_string(e, b"md5").map(|v| v.to_ascii_lowercase());
                let sha1 = attr_string(e, b"sha1").map(|v| v.to_ascii_lowercase());
                let merge = attr_string(e, b"merge");
                let bios = attr_string(e, b"bios").is_some();

                if let Some(g) = current_game.as_mut() {
                    g.roms.push(Rom {
                        name,
                        size,
                        checksums: ChecksumSet { crc32, md5, sha1 },
                        merge,
                        bios,
                    });
                }
            }
            Event::End(ref e) if e.name().as_ref() == b"game" || e.name().as_ref() == b"machine" => {
                if let Some(g) = current_game.take() {
                    games.push(g);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !comment_lines.is_empty() {
        header.comment = Some(comment_lines.join("\n"));
    }

    Ok(Dat { header, games })
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Serialises a `Dat` to the Logiqx XML dialect (§6).
pub fn serialize_dat(dat: &Dat) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\"?>\n");
    out.push_str("<!DOCTYPE datafile PUBLIC \"-//Logiqx//DTD ROM Management Datafile//EN\" \"http://www.logiqx.com/Dats/datafile.dtd\">\n");
    out.push_str("<datafile>\n\t<header>\n");
    out.push_str(&format!("\t\t<name>{}</name>\n", escape_xml(&dat.header.name)));
    out.push_str(&format!(
        "\t\t<description>{}</description>\n",
        escape_xml(&dat.header.description)
    ));
    if let Some(v) = &dat.header.version {
        out.push_str(&format!("\t\t<version>{}</version>\n", escape_xml(v)));
    }
    if let Some(v) = &dat.header.author {
        out.push_str(&format!("\t\t<author>{}</author>\n", escape_xml(v)));
    }
    if let Some(v) = &dat.header.date {
        out.push_str(&format!("\t\t<date>{}</date>\n", escape_xml(v)));
    }
    if let Some(v) = &dat.header.url {
        out.push_str(&format!("\t\t<url>{}</url>\n", escape_xml(v)));
    }
    if let Some(v) = &dat.header.comment {
        out.push_str(&format!("\t\t<comment>{}</comment>\n", escape_xml(v)));
    }
    out.push_str("\t</header>\n");

    for game in &dat.games {
        let tag = if game.is_machine() { "machine" } else { "game" };
        out.push_str(&format!("\t<{tag} name=\"{}\"", escape_xml(&game.name)));
        if let Some(p) = &game.parent {
            out.push_str(&format!(" cloneof=\"{}\" romof=\"{}\"", escape_xml(p), escape_xml(p)));
        } else if let Some(b) = &game.bios {
            out.push_str(&format!(" romof=\"{}\"", escape_xml(b)));
        }
        if game.machine.as_ref().map(|m| m.is_bios).unwrap_or(false) {
            out.push_str(" isbios=\"yes\"");
        }
        out.push_str(">\n");
        if let Some(desc) = &game.description {
            out.push_str(&format!("\t\t<description>{}</description>\n", escape_xml(desc)));
        }
        for dref in game.device_refs() {
            out.push_str(&format!("\t\t<device_ref name=\"{}\"/>\n", escape_xml(dref)));
        }
        for rom in &game.roms {
            out.push_str(&format!("\t\t<rom name=\"{}\"", escape_xml(&rom.name)));
            if let Some(size) = rom.size {
                out.push_str(&format!(" size=\"{size}\""));
            }
            if let Some(crc) = &rom.checksums.crc32 {
                out.push_str(&format!(" crc=\"{crc}\""));
            }
            if let Some(md5) = &rom.checksums.md5 {
                out.push_str(&format!(" md5=\"{md5}\""));
            }
            if let Some(sha1) = &rom.checksums.sha1 {
                out.push_str(&format!(" sha1=\"{sha1}\""));
            }
            if let Some(merge) = &rom.merge {
                out.push_str(&format!(" merge=\"{}\"", escape_xml(merge)));
            }
            if rom.bios {
                out.push_str(" bios=\"yes\"");
            }
            out.push_str("/>\n");
        }
        out.push_str(&format!("\t</{tag}>\n"));
    }

    out.push_str("</datafile>\n");
    out
}

pub fn write_dat(dat: &Dat, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory: {}", parent.display()))?;
    }
    std::fs::write(path, serialize_dat(dat))
        .with_context(|| format!("writing DAT file: {}", path.display()))
}

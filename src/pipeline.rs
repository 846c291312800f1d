//! Wires the library's pieces into the two commands this crate supports end to end: load the
//! configured DATs, scan the configured inputs, reconcile, and write merge/fixdat output.
//! Grounded in the orchestration role the teacher's `actions::perform_actions` plays, trimmed
//! to this crate's two commands.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::archive::{adapter_for, detect_kind};
use crate::config::Config;
use crate::dat::{self, Dat};
use crate::file::File;
use crate::fixdat;
use crate::indexer::Indexer;
use crate::matcher::match_dat;
use crate::merger::merge_dat;
use crate::path_sanitizer::sanitize_component;
use crate::roms::rom_scanner::detect_header;
use crate::types::{Action, ArchiveKind};

fn excluded(path: &Path, excludes: &Option<globset::GlobSet>) -> bool {
    excludes
        .as_ref()
        .map(|set| set.is_match(path))
        .unwrap_or(false)
}

/// Walks the configured input roots and builds a `File` handle for every plain file and
/// every entry inside every recognised archive.
pub fn scan_inputs(config: &Config) -> anyhow::Result<Vec<Arc<File>>> {
    let excludes = crate::utils::build_globset(&config.input_exclude)?;
    let mut files = Vec::new();

    for root in &config.input {
        for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if excluded(path, &excludes) {
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let kind = detect_kind(path);

            match kind {
                ArchiveKind::None => {
                    let header = detect_header(path).unwrap_or(None);
                    files.push(Arc::new(File::on_disk(path.to_path_buf(), size, header)));
                }
                other => {
                    let Some(adapter) = adapter_for(other) else {
                        continue;
                    };
                    let entries = adapter.list_entries(path).unwrap_or_default();
                    for meta in entries {
                        files.push(Arc::new(File::in_archive(
                            path.to_path_buf(),
                            meta.entry_path,
                            other,
                            meta.size,
                            None,
                        )));
                    }
                }
            }
        }
    }

    Ok(files)
}

pub fn load_dats(config: &Config) -> anyhow::Result<Vec<Dat>> {
    let excludes = crate::utils::build_globset(&config.dat_exclude)?;
    config
        .dat
        .iter()
        .filter(|p| !excluded(p, &excludes))
        .map(|p| dat::parse_dat(p))
        .collect()
}

fn dat_output_path(output: &Path, dat: &Dat) -> PathBuf {
    let name = sanitize_component(&dat.header.name, std::path::MAIN_SEPARATOR);
    output.join(format!("{name}.dat"))
}

pub fn run(config: &Config) -> anyhow::Result<()> {
    let dats = load_dats(config)?;
    let files = scan_inputs(config)?;
    let indexer = Indexer::build(&files, config)?;

    let output = config
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    for original in &dats {
        let merged = merge_dat(original, config.merge_roms);

        let candidates = match_dat(&merged, &indexer, &output);
        let written: HashSet<_> = candidates
            .iter()
            .flat_map(|c| c.rom_matches.iter())
            .filter(|m| m.is_matched())
            .filter_map(|m| m.rom.checksums.fingerprint())
            .collect();

        if config.commands.contains(&Action::Merge) {
            let complete = candidates.iter().filter(|c| c.is_complete()).count();
            vprintln!(
                config.verbose,
                1,
                "{}: {}/{} games complete",
                merged.header.name,
                complete,
                candidates.len()
            );
            dat::write_dat(&merged, &dat_output_path(&output, &merged))?;
        }

        if config.commands.contains(&Action::Fixdat) {
            match fixdat::generate_fixdat(original, &written, chrono::Utc::now()) {
                Some(fix) => {
                    let name = sanitize_component(&fix.header.name, std::path::MAIN_SEPARATOR);
                    let path = fixdat::fixdat_path(&output, &name);
                    dat::write_dat(&fix, &path)?;
                    vprintln!(config.verbose, 1, "wrote fixdat: {}", path.display());
                }
                None => {
                    vprintln!(
                        config.verbose,
                        1,
                        "{}: nothing missing, no fixdat written",
                        original.header.name
                    );
                }
            }
        }
    }

    Ok(())
}

use clap::{ArgAction, Parser, ValueEnum, builder::PossibleValuesParser};
use std::path::PathBuf;

use crate::types::{Action, Checksum, MergeMode};

#[derive(Parser, Debug, serde::Serialize)]
#[command(
    name = "igir",
    version,
    about = "DAT-driven ROM set reconciliation tool",
    long_about = "Indexes a tree of ROM files and archives, reconciles it against one or more \
                  Logiqx DAT catalogs, and reports (or writes) the result of that reconciliation."
)]
pub struct Cli {
    /// Commands to run (can specify multiple)
    #[arg(value_enum, value_name = "COMMAND", action = ArgAction::Append)]
    pub commands: Vec<Action>,

    /// Path(s) to ROM files or archives (supports globbing)
    #[arg(short = 'i', long = "input", value_name = "PATH", action = ArgAction::Append)]
    pub input: Vec<PathBuf>,

    /// Path(s) to ROM files or archives to exclude from processing (supports globbing)
    #[arg(short = 'I', long = "input-exclude", value_name = "PATH", action = ArgAction::Append)]
    pub input_exclude: Vec<PathBuf>,

    /// The minimum checksum level to calculate and use for matching
    #[arg(
        long = "input-checksum-min",
        value_enum,
        default_value_t = Checksum::Crc32,
        value_parser = PossibleValuesParser::new(Checksum::value_variants()),
    )]
    pub input_checksum_min: Checksum,

    /// The maximum checksum level to calculate and use for matching
    #[arg(long = "input-checksum-max", value_enum, value_parser = PossibleValuesParser::new(Checksum::value_variants()))]
    pub input_checksum_max: Option<Checksum>,

    /// Path(s) to DAT files to reconcile against
    #[arg(short = 'd', long = "dat", value_name = "PATH", action = ArgAction::Append)]
    pub dat: Vec<PathBuf>,

    /// Path(s) to DAT files to exclude
    #[arg(long = "dat-exclude", value_name = "PATH", action = ArgAction::Append)]
    pub dat_exclude: Vec<PathBuf>,

    /// Output directory for merge/fixdat results
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// How to arrange ROM sets relative to their parent/clone/BIOS/device relationships
    #[arg(
        long = "merge-roms",
        value_enum,
        default_value_t = MergeMode::Fullnonmerged,
        value_parser = PossibleValuesParser::new(MergeMode::value_variants()),
    )]
    pub merge_roms: MergeMode,

    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,
}

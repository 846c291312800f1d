use std::path::PathBuf;

use crate::{
    cli::Cli,
    types::{Action, Checksum, MergeMode},
};

#[derive(Debug, Clone, serde::Serialize)]
pub struct Config {
    pub commands: Vec<Action>,
    pub input: Vec<PathBuf>,
    pub input_exclude: Vec<PathBuf>,
    pub input_checksum_min: Checksum,
    pub input_checksum_max: Option<Checksum>,
    pub dat: Vec<PathBuf>,
    pub dat_exclude: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub merge_roms: MergeMode,
    pub verbose: u8,
    pub quiet: u8,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            commands: vec![Action::Merge],
            input: Vec::new(),
            input_exclude: Vec::new(),
            input_checksum_min: Checksum::Crc32,
            input_checksum_max: Some(Checksum::Sha1),
            dat: Vec::new(),
            dat_exclude: Vec::new(),
            output: None,
            merge_roms: MergeMode::Fullnonmerged,
            verbose: 0,
            quiet: 0,
        }
    }
}

impl Config {
    fn validate_checksum_range(&self) -> anyhow::Result<()> {
        if let Some(max) = self.input_checksum_max {
            if max.rank() < self.input_checksum_min.rank() {
                anyhow::bail!(
                    "input-checksum-max cannot be lower fidelity than input-checksum-min"
                );
            }
        }
        Ok(())
    }

    fn validate_commands(&self) -> anyhow::Result<()> {
        if self.commands.is_empty() {
            anyhow::bail!("at least one command must be provided");
        }
        Ok(())
    }

    fn validate_output_requirements(&self) -> anyhow::Result<()> {
        let needs_output = self.commands.iter().any(|action| match action {
            Action::Merge | Action::Fixdat => true,
        });

        if needs_output && self.output.is_none() {
            anyhow::bail!("--output is required for the selected commands");
        }
        Ok(())
    }

    fn validate_dats_provided(&self) -> anyhow::Result<()> {
        if self.dat.is_empty() {
            anyhow::bail!("at least one --dat is required");
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_commands()?;
        self.validate_checksum_range()?;
        self.validate_output_requirements()?;
        self.validate_dats_provided()?;
        Ok(())
    }
}

impl TryFrom<Cli> for Config {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let config = Config {
            commands: cli.commands,
            input: cli.input,
            input_exclude: cli.input_exclude,
            input_checksum_min: cli.input_checksum_min,
            input_checksum_max: cli.input_checksum_max,
            dat: cli.dat,
            dat_exclude: cli.dat_exclude,
            output: cli.output,
            merge_roms: cli.merge_roms,
            verbose: cli.verbose,
            quiet: cli.quiet,
        };

        config.validate()?;
        Ok(config)
    }
}

//! Command-line arguments.
//!
//! Flags given on the command line override the values loaded from the
//! configuration file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use entente_core::config::{Controller, MatchConfig};

/// Multi-agent Diplomacy orchestration.
#[derive(Parser, Debug)]
#[command(name = "entente", version, about = "Run Diplomacy matches between pluggable agents")]
pub struct Cli {
    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// The command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play one match with every power controlled by an agent.
    SelfPlay(SelfPlayArgs),
}

/// Arguments for `entente self-play`.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfPlayArgs {
    /// Match configuration file. Defaults to `entente.yaml` when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seed for the random decision-makers.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop after this many resolved phases (0 = no limit).
    #[arg(long)]
    pub max_phases: Option<u32>,

    /// Stop once play passes this year (0 = no limit).
    #[arg(long)]
    pub max_year: Option<u16>,

    /// Controller for every power: hold, random, or llm.
    #[arg(long)]
    pub controller: Option<Controller>,

    /// Write the match result, phase history, and press log to this JSON file.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl SelfPlayArgs {
    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut MatchConfig) {
        if let Some(seed) = self.seed {
            config.game.seed = seed;
        }
        if let Some(max_phases) = self.max_phases {
            config.game.max_phases = max_phases;
        }
        if let Some(max_year) = self.max_year {
            config.game.max_year = max_year;
        }
        if let Some(controller) = self.controller {
            config.set_all_controllers(controller);
        }
    }
}

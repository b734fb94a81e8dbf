//! Command-line interface definition.

use clap::{Command, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;
use trax_algo::Weights;
use trax_core::Planet;

#[derive(Parser, Debug)]
#[command(author, version, about = "Least-cost walking traverses over planetary terrain", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Solve a traverse scenario and emit the path
    Solve {
        /// Path to the scenario JSON file
        scenario: PathBuf,
        /// Write the result here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Heuristic inflation factor (1.0 = cost-optimal)
        #[arg(long, default_value_t = 1.0)]
        alpha: f64,
        /// Objective the scalar cost minimises
        #[arg(long, value_enum, default_value_t = Objective::Energy)]
        optimize: Objective,
        /// Suited agent mass in kilograms
        #[arg(long, default_value_t = 80.0)]
        mass: f64,
        /// Worker threads for the cache builds ("auto" or a count)
        #[arg(long, default_value = "auto")]
        threads: String,
        /// Abort the solve after this many seconds
        #[arg(long)]
        timeout_secs: Option<f64>,
        /// Record a run manifest next to the output
        #[arg(long)]
        manifest: bool,
    },
    /// Terrain grid utilities
    Grid {
        #[command(subcommand)]
        command: GridCommands,
    },
    /// Scenario file utilities
    Scenario {
        #[command(subcommand)]
        command: ScenarioCommands,
    },
    /// Inspect recorded solve runs
    Runs {
        #[command(subcommand)]
        command: RunsCommands,
    },
    /// Serve the traverse wire protocol over TCP
    Serve {
        /// Listen address
        #[arg(long, default_value = "127.0.0.1:9800")]
        addr: String,
        /// Directory scanned for loadable models
        #[arg(long, default_value = "models")]
        models_dir: PathBuf,
        /// Heuristic inflation factor
        #[arg(long, default_value_t = 1.0)]
        alpha: f64,
        /// Suited agent mass in kilograms
        #[arg(long, default_value_t = 80.0)]
        mass: f64,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum GridCommands {
    /// Passability and connectivity statistics for a terrain model
    Stats {
        /// Path to the terrain model (.txt, .tif, .tiff, .png)
        model: PathBuf,
        /// Maximum traversable slope in degrees
        #[arg(long, default_value_t = 35.0)]
        max_slope: f64,
        /// Planet supplying surface gravity
        #[arg(long, value_enum, default_value_t = PlanetArg::Earth)]
        planet: PlanetArg,
        /// Emit JSON instead of the plain table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ScenarioCommands {
    /// Check a scenario file without solving it
    Validate {
        /// Path to the scenario JSON file
        scenario: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum RunsCommands {
    /// Print a recorded run manifest
    Show {
        /// Path to a traverse-run-*.json manifest
        manifest: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Objective {
    Energy,
    Time,
    Distance,
}

impl Objective {
    pub fn weights(self) -> Weights {
        match self {
            Objective::Energy => Weights::energy_only(),
            Objective::Time => Weights::time_only(),
            Objective::Distance => Weights::distance_only(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanetArg {
    Earth,
    Moon,
    Mars,
}

impl From<PlanetArg> for Planet {
    fn from(value: PlanetArg) -> Self {
        match value {
            PlanetArg::Earth => Planet::Earth,
            PlanetArg::Moon => Planet::Moon,
            PlanetArg::Mars => Planet::Mars,
        }
    }
}

/// The clap command tree, for completion generation.
pub fn build_cli_command() -> Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_solve() {
        let cli = Cli::try_parse_from([
            "trax",
            "solve",
            "site.json",
            "--alpha",
            "2.0",
            "--format",
            "csv",
        ])
        .unwrap();
        match cli.command {
            Commands::Solve { scenario, alpha, format, .. } => {
                assert_eq!(scenario, PathBuf::from("site.json"));
                assert_eq!(alpha, 2.0);
                assert_eq!(format, OutputFormat::Csv);
            }
            other => panic!("parsed wrong command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_verifies() {
        build_cli_command().debug_assert();
    }

    #[test]
    fn test_objective_weights() {
        assert_eq!(Objective::Energy.weights().energy, 1.0);
        assert_eq!(Objective::Time.weights().time, 1.0);
        assert_eq!(Objective::Distance.weights().distance, 1.0);
    }
}

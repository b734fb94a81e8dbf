use clap::Parser;
use clap_complete::generate;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;
use trax_algo::{grid_stats, report, SolveOptions};
use trax_core::{Agent, TraxError};
use trax_io::load_model;
use trax_net::{serve, ServerConfig};
use trax_scenarios::{load_scenario, materialize};

mod cli;
mod manifest;

use cli::{
    build_cli_command, Cli, Commands, GridCommands, Objective, OutputFormat, RunsCommands,
    ScenarioCommands,
};
use manifest::{read_solve_manifest, record_solve_manifest, SolveManifest};

/// Exit codes of the `solve` command: 0 success, 2 no_path,
/// 3 endpoint_blocked, 1 anything else.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<TraxError>().map(TraxError::kind) {
        Some("no_path") => 2,
        Some("endpoint_blocked") => 3,
        _ => 1,
    }
}

fn configure_threads(spec: &str) {
    let count = if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        spec.parse().unwrap_or_else(|_| num_cpus::get())
    };
    let _ = ThreadPoolBuilder::new().num_threads(count).build_global();
}

#[allow(clippy::too_many_arguments)]
fn cmd_solve(
    scenario_path: &Path,
    out: Option<&Path>,
    format: OutputFormat,
    alpha: f64,
    optimize: Objective,
    mass: f64,
    timeout_secs: Option<f64>,
    write_manifest: bool,
) -> anyhow::Result<()> {
    let scenario = load_scenario(scenario_path)?;
    let base_dir = scenario_path.parent().unwrap_or_else(|| Path::new("."));
    let mut materialized = materialize(
        &scenario,
        base_dir,
        Agent::new(mass),
        optimize.weights(),
        alpha,
    )?;
    info!(
        start = %materialized.start,
        end = %materialized.end,
        heading = materialized.start_heading_deg,
        "scenario loaded"
    );

    let options = SolveOptions {
        cancel: None,
        deadline: timeout_secs.map(|secs| Instant::now() + Duration::from_secs_f64(secs)),
    };
    let traverse = materialized.planner.find_path(&options)?;

    let payload = match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&report::traverse_json(&traverse))? + "\n"
        }
        OutputFormat::Csv => {
            let cache = materialized
                .planner
                .cache()
                .ok_or_else(|| anyhow::anyhow!("solve left no cache behind"))?;
            let mut buf = Vec::new();
            report::write_traverse_csv(&mut buf, materialized.planner.grid(), cache, &traverse)?;
            String::from_utf8(buf)?
        }
    };

    match out {
        Some(path) => {
            fs::write(path, &payload)
                .map_err(|err| anyhow::anyhow!("writing {}: {err}", path.display()))?;
            println!("Traverse written to {}", path.display());
            if write_manifest {
                let manifest_path = record_solve_manifest(
                    path,
                    scenario_path,
                    &scenario.model,
                    &format!("{optimize:?}").to_lowercase(),
                    &format!("{format:?}").to_lowercase(),
                    &traverse,
                )?;
                println!("Recorded run manifest {}", manifest_path.display());
            }
        }
        None => print!("{payload}"),
    }
    info!(
        cells = traverse.cells.len(),
        distance_m = traverse.distance_m,
        duration_s = traverse.duration_s,
        energy_j = traverse.energy_j,
        "solve complete"
    );
    Ok(())
}

fn cmd_grid_stats(
    model: &Path,
    max_slope: f64,
    planet: cli::PlanetArg,
    json: bool,
) -> anyhow::Result<()> {
    let grid = load_model(model, planet.into(), max_slope)?;
    let stats = grid_stats(&grid);
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Grid statistics for {}:", model.display());
        println!("  Extent        : {} x {}", stats.width, stats.height);
        println!("  Resolution    : {} m/cell", stats.resolution_m);
        println!("  Valid cells   : {}", stats.valid_cells);
        println!("  Passable      : {}", stats.passable_cells);
        println!("  Obstacles     : {}", stats.obstacle_cells);
        println!("  Islands       : {}", stats.components);
        println!("  Largest island: {}", stats.largest_component);
    }
    Ok(())
}

fn describe_run(manifest: &SolveManifest) {
    println!(
        "Run {} (solve @ v{} from {})",
        manifest.run_id, manifest.version, manifest.timestamp
    );
    println!("  Scenario : {}", manifest.scenario);
    println!(
        "  Model    : {} ({} objective, alpha {})",
        manifest.model, manifest.objective, manifest.alpha
    );
    println!("  Output   : {} ({})", manifest.output, manifest.format);
    println!(
        "  Traverse : {} cells, {:.1} m, {:.1} s, {:.1} J",
        manifest.cells, manifest.distance_m, manifest.duration_s, manifest.energy_j
    );
}

fn generate_completions(shell: clap_complete::Shell, out: Option<&Path>) -> anyhow::Result<()> {
    let mut cmd = build_cli_command();
    if let Some(path) = out {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        generate(shell, &mut cmd, "trax", &mut file);
        println!("Wrote {shell:?} completion to {}", path.display());
    } else {
        let stdout = &mut io::stdout();
        generate(shell, &mut cmd, "trax", stdout);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let result: anyhow::Result<()> = match cli.command {
        Commands::Solve {
            scenario,
            out,
            format,
            alpha,
            optimize,
            mass,
            threads,
            timeout_secs,
            manifest,
        } => {
            configure_threads(&threads);
            cmd_solve(
                &scenario,
                out.as_deref(),
                format,
                alpha,
                optimize,
                mass,
                timeout_secs,
                manifest,
            )
        }
        Commands::Grid { command } => match command {
            GridCommands::Stats { model, max_slope, planet, json } => {
                cmd_grid_stats(&model, max_slope, planet, json)
            }
        },
        Commands::Scenario { command } => match command {
            ScenarioCommands::Validate { scenario } => load_scenario(&scenario).map(|s| {
                println!(
                    "Scenario OK: model {}, {:?} {:?} -> {:?}",
                    s.model, s.coordinate_system, s.start, s.end
                );
            }),
        },
        Commands::Runs { command } => match command {
            RunsCommands::Show { manifest } => {
                read_solve_manifest(&manifest).map(|m| describe_run(&m))
            }
        },
        Commands::Serve { addr, models_dir, alpha, mass } => {
            let config = ServerConfig {
                models_dir,
                agent: Agent::new(mass),
                weights: trax_algo::Weights::energy_only(),
                alpha,
            };
            serve(addr, config)
        }
        Commands::Completions { shell, out } => generate_completions(shell, out.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

//! Lonenet CLI - network generation and simulation drivers
//!
//! Usage:
//!   lonenet generate --config <FILE> --networks <N> --output <DIR>
//!   lonenet simulate --config <FILE> --input <DIR> --output <DIR>
//!
//! `generate` writes `<output>/<network>/<target>/<n>.json` for every target.
//! `simulate` reads those graphs and writes, per target and point,
//! `<output>/<network>/<simulation>/dyn_data/<target>/<point>/<n>.json` summaries
//! and the final graphs under `tt_graphs`. Existing summaries are skipped.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use lonenet_core::engine::sweep::{resolve_seed, run_units, tune_targets, SweepUnit};
use lonenet_core::storage::{
    list_graph_files, next_graph_path, GraphStore, JsonGraphStore, ResultsStore, SimulationSummary,
};
use lonenet_core::{ExperimentConfig, ModelError, Simulation};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lonenet")]
#[command(version)]
#[command(about = "Lonenet - assortativity-tuned social graphs and loneliness dynamics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate tuned networks for every configured target
    Generate {
        /// Experiment configuration (JSON)
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Networks to generate per target
        #[arg(short, long, default_value_t = 1, value_name = "N")]
        networks: usize,

        /// Root output folder (must exist)
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,
    },
    /// Simulate the dynamics on previously generated networks
    Simulate {
        /// Experiment configuration (JSON)
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Root folder the networks were generated into
        #[arg(short, long, value_name = "DIR")]
        input: PathBuf,

        /// Root output folder for summaries and final graphs
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lonenet=info,lonenet_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Generate {
            config,
            networks,
            output,
        } => generate(&config, networks, &output),
        Command::Simulate {
            config,
            input,
            output,
        } => simulate(&config, &input, &output),
    };

    match result {
        Ok(0) => {}
        Ok(failed) => {
            eprintln!("{} target(s) failed", failed);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn load_config(path: &Path) -> Result<ExperimentConfig, ModelError> {
    ExperimentConfig::from_path(path)
}

fn require_dir(path: &Path) -> Result<(), ModelError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ModelError::Config(format!(
            "output folder does not exist: {}",
            path.display()
        )))
    }
}

/// Prints one line per unit and returns how many failed.
fn report<T>(units: &[SweepUnit<T>], done: impl Fn(&T) -> String) -> usize {
    let mut failed = 0;
    for unit in units {
        match &unit.outcome {
            Ok(value) => println!("{}", done(value)),
            Err(e) => {
                eprintln!("Target {} failed (seed {}): {}", unit.target, unit.seed, e);
                failed += 1;
            }
        }
    }
    failed
}

fn generate(config_path: &Path, networks: usize, output: &Path) -> Result<usize, ModelError> {
    let config = load_config(config_path)?;
    require_dir(output)?;
    let tuner = config.tuner()?;
    let seed = resolve_seed(config.seed);
    let root = output.join(config.network_label());
    tracing::info!(seed, root = %root.display(), networks, "generating networks");

    let units = tune_targets(&tuner, &config.network.targets, networks, seed);
    let store = JsonGraphStore;
    let mut written = Vec::with_capacity(units.len());
    for unit in units {
        let outcome = unit.outcome.and_then(|tuned| {
            let dir = root.join(unit.target.to_string());
            for net in &tuned {
                let path = next_graph_path(&dir)?;
                store.save(net.graph(), &path)?;
            }
            Ok(tuned.len())
        });
        written.push(SweepUnit {
            index: unit.index,
            target: unit.target,
            seed: unit.seed,
            outcome,
        });
    }

    Ok(report(&written, |count| format!("Wrote {} file(s)", count)))
}

fn simulate(config_path: &Path, input: &Path, output: &Path) -> Result<usize, ModelError> {
    let config = load_config(config_path)?;
    require_dir(output)?;
    let points = config.points()?;
    let seed = resolve_seed(config.seed);
    let graphs_root = input.join(config.network_label());
    let run_root = output
        .join(config.network_label())
        .join(config.simulation_label());
    let results = ResultsStore::new(run_root.join("dyn_data"));
    tracing::info!(seed, input = %graphs_root.display(), output = %run_root.display(), "simulating");

    let units = run_units(&config.network.targets, seed, |target, rng| {
        let key = target.to_string();
        let store = JsonGraphStore;
        let mut runs = 0;
        for file in list_graph_files(&graphs_root.join(&key))? {
            let Some(name) = file.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let graph = store.load(&file)?;

            for strengths in &points {
                let point = strengths.label();
                let summary_name = Path::new(&key).join(&point).join(&name);
                if results.exists(&summary_name) {
                    tracing::info!(aim = target, file = %name, %point, "summary exists, skipping");
                    continue;
                }
                tracing::info!(aim = target, file = %name, %point, "running simulation");

                let params = config.dynamics_params(*strengths)?;
                let record = Simulation::new(graph.clone(), params, config.simulation.horizon)?
                    .with_convergence(
                        config.simulation.window_fraction,
                        config.simulation.variance_threshold,
                    )?
                    .run(rng);

                let final_path = run_root.join("tt_graphs").join(&key).join(&point).join(&name);
                store.save(&record.graph, &final_path)?;
                results.save(
                    &summary_name,
                    &SimulationSummary::from_record(&record, &config.network.groups),
                )?;
                runs += 1;
            }
        }
        Ok(runs)
    });

    Ok(report(&units, |runs| format!("Finished {} simulation(s)", runs)))
}

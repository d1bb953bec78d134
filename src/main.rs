use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use trainplan::config::PlannerConfig;
use trainplan::error::PlannerError;
use trainplan::loader::{
    calculate_combined_metrics_dynamic, load_traces, parse_trace_record, FileTraceLoader, InMemoryTraceLoader,
    TraceLoader,
};
use trainplan::logging::{init_logging, LogLevel};
use trainplan::models::{PowerProfile, Scenario};
use trainplan::projection::TargetIntensityProjector;
use trainplan::report::{format_duration, ScenarioReport};
use trainplan::scenario::ScenarioComparison;
use trainplan::tss::TssCalculator;

/// TrainPlan - Training Scenario Planner
///
/// Computes Normalized Power, Intensity Factor and Training Stress Score for
/// structured workouts and for scenarios built from them.
#[derive(Parser)]
#[command(name = "trainplan")]
#[command(version = "0.1.0")]
#[command(about = "Training scenario planner", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Where workout traces come from
#[derive(clap::Args)]
struct LibraryArgs {
    /// Directory of <workout id>.json trace files
    #[arg(short, long, value_name = "DIR")]
    library: Option<PathBuf>,

    /// Single JSON file holding every trace keyed by workout id
    #[arg(short, long, value_name = "FILE", conflicts_with = "library")]
    bundle: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate metrics for a single workout trace
    Workout {
        /// Trace file (bare trace or indoor/outdoor pair)
        #[arg(short, long)]
        trace: PathBuf,

        /// Power profile JSON file
        #[arg(short, long)]
        profile: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a scenario: totals, target projection, zones and timeline
    Scenario {
        /// Scenario JSON file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Power profile JSON file
        #[arg(short, long)]
        profile: PathBuf,

        #[command(flatten)]
        source: LibraryArgs,

        /// Target intensity percent (overrides the profile)
        #[arg(short, long)]
        target: Option<f64>,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Compare the totals of two scenarios
    Compare {
        /// Baseline scenario JSON file
        base: PathBuf,

        /// Scenario compared against the baseline
        other: PathBuf,

        /// Power profile JSON file
        #[arg(short, long)]
        profile: PathBuf,

        #[command(flatten)]
        source: LibraryArgs,
    },

    /// Show or initialize configuration
    Config {
        /// Print the effective configuration
        #[arg(short, long)]
        show: bool,

        /// Write a default configuration file
        #[arg(short, long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `config --init` may point at a file that does not exist yet
    let config = match &cli.config {
        Some(path) if path.exists() || !matches!(cli.command, Commands::Config { .. }) => {
            PlannerConfig::load_from_file(path)?
        }
        Some(_) => PlannerConfig::default(),
        None => PlannerConfig::load_or_default(),
    };

    let mut log_config = config.logging.clone();
    log_config.level = LogLevel::from_verbosity(log_config.level, cli.verbose);
    init_logging(&log_config)?;

    match cli.command {
        Commands::Workout { trace, profile, json } => {
            let profile = read_profile(&profile)?;
            let content = fs::read_to_string(&trace)
                .with_context(|| format!("Failed to read trace file: {}", trace.display()))?;
            let workout_id = trace
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let trace = parse_trace_record(&workout_id, &content)
                .map_err(|e| anyhow!(PlannerError::from(e).user_message()))?;

            let metrics = TssCalculator::from_settings(&config.calculation).calculate_all_training_metrics(&trace, &profile);

            if json {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else {
                println!("{}", format!("Workout {}", workout_id).green().bold());
                println!("  Duration: {}", format_duration(metrics.duration));
                println!("  Normalized Power: {:.0} W", metrics.normalized_power);
                println!("  Intensity Factor: {:.2}", metrics.intensity_factor);
                println!("  Training Stress Score: {:.0}", metrics.training_stress_score);
            }
        }

        Commands::Scenario {
            scenario,
            profile,
            source,
            target,
            output,
            json,
        } => {
            let scenario = read_scenario(&scenario, &config)?;
            let profile = read_profile(&profile)?;

            let report = match open_loader(&source, &config)? {
                Some(loader) => {
                    let traces =
                        load_traces(loader.as_ref(), &scenario.workouts, config.loading.max_concurrent_loads).await;
                    ScenarioReport::build(&scenario.name, &scenario.workouts, &traces, &profile, target, &config)
                }
                None => {
                    info!(scenario = %scenario.name, "No trace library configured, using stored metrics");
                    ScenarioReport::from_stored(&scenario.name, scenario.stored_selections(), &profile, target, &config)
                }
            };

            let mut rendered = Vec::new();
            if json {
                serde_json::to_writer_pretty(&mut rendered, &report)?;
                rendered.push(b'\n');
            } else {
                report.write_text(&mut rendered)?;
            }

            match output {
                Some(path) => {
                    fs::write(&path, &rendered)
                        .with_context(|| format!("Failed to write report: {}", path.display()))?;
                    println!("{}", format!("✓ Report written to {}", path.display()).green());
                }
                None => print!("{}", String::from_utf8_lossy(&rendered)),
            }
        }

        Commands::Compare {
            base,
            other,
            profile,
            source,
        } => {
            let base = read_scenario(&base, &config)?;
            let other = read_scenario(&other, &config)?;
            let profile = read_profile(&profile)?;

            let Some(loader) = open_loader(&source, &config)? else {
                bail!("compare needs a trace library: pass --library or --bundle, or set loading.library_dir");
            };

            let base_metrics =
                calculate_combined_metrics_dynamic(loader.as_ref(), &base.workouts, &profile, &config).await;
            let other_metrics =
                calculate_combined_metrics_dynamic(loader.as_ref(), &other.workouts, &profile, &config).await;
            let comparison = ScenarioComparison::between(&base_metrics, &other_metrics);

            let projector = TargetIntensityProjector::from_settings(&config.calculation);
            let base_target = projector.project_for_profile(&base_metrics, &profile);
            let other_target = projector.project_for_profile(&other_metrics, &profile);

            println!("{}", format!("{} vs {}", base.name, other.name).cyan().bold());
            println!("{:<22} {:>12} {:>12} {:>12}", "", base.name, other.name, "Delta");
            println!(
                "{:<22} {:>12} {:>12} {:>+12.0}",
                "Moving time",
                format_duration(base_metrics.total_duration),
                format_duration(other_metrics.total_duration),
                comparison.duration_delta
            );
            println!(
                "{:<22} {:>12} {:>12} {:>+12.0}",
                "Elapsed time",
                format_duration(base_metrics.total_elapsed_duration),
                format_duration(other_metrics.total_elapsed_duration),
                comparison.elapsed_duration_delta
            );
            println!(
                "{:<22} {:>12.0} {:>12.0} {:>+12.0}",
                "Total TSS", base_metrics.total_tss, other_metrics.total_tss, comparison.tss_delta
            );
            println!(
                "{:<22} {:>12.2} {:>12.2} {:>+12.2}",
                "Average IF", base_metrics.average_if, other_metrics.average_if, comparison.average_if_delta
            );
            println!(
                "{:<22} {:>12.0} {:>12.0} {:>+12.0}",
                "Average NP", base_metrics.average_np, other_metrics.average_np, comparison.average_np_delta
            );
            println!(
                "{:<22} {:>12.0} {:>12.0} {:>+12.0}",
                format!("Target TSS @ {:.0}%", base_target.target_intensity),
                base_target.target_tss,
                other_target.target_tss,
                other_target.target_tss - base_target.target_tss
            );

            if comparison.is_harder() {
                println!("{}", format!("{} carries more training stress", other.name).yellow());
            } else {
                println!("{}", format!("{} carries no more training stress", other.name).green());
            }
        }

        Commands::Config { show, init } => {
            let path = cli.config.clone().unwrap_or_else(PlannerConfig::default_config_path);

            if init {
                if path.exists() {
                    bail!("Config file already exists: {}", path.display());
                }
                PlannerConfig::default().save_to_file(&path)?;
                println!("{}", format!("✓ Wrote default configuration to {}", path.display()).green());
            }

            if show || !init {
                println!("{}", format!("# {}", path.display()).dimmed());
                println!("{}", toml::to_string_pretty(&config).context("Failed to render configuration")?);
            }
        }
    }

    Ok(())
}

fn read_profile(path: &Path) -> Result<PowerProfile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid profile: {}", path.display()))
}

fn read_scenario(path: &Path, config: &PlannerConfig) -> Result<Scenario> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario: {}", path.display()))?;
    let scenario: Scenario =
        serde_json::from_str(&content).with_context(|| format!("Invalid scenario: {}", path.display()))?;
    scenario.validate(config.scenario.max_workouts)?;
    Ok(scenario)
}

fn open_loader(source: &LibraryArgs, config: &PlannerConfig) -> Result<Option<Box<dyn TraceLoader>>> {
    if let Some(bundle) = &source.bundle {
        let loader = InMemoryTraceLoader::from_bundle_file(bundle)
            .with_context(|| format!("Failed to load trace bundle: {}", bundle.display()))?;
        return Ok(Some(Box::new(loader)));
    }

    let library = source.library.clone().or_else(|| config.loading.library_dir.clone());
    Ok(library.map(|dir| Box::new(FileTraceLoader::new(dir)) as Box<dyn TraceLoader>))
}

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{info, warn, LevelFilter};

use ebsd_match::core::CrystalSystem;
use ebsd_match::engine::{
    load_scan_json, run_matching, MatchError, MatchRunConfig, PhysicalFileIndex, ProjectDetails,
    ProjectDetailsError, ReferenceListing, RunIoError,
};

#[derive(Parser)]
#[command(
    name = "ebsd-match",
    version,
    about = "Match deformed EBSD patterns to reference pixels by misorientation"
)]
struct Cli {
    /// Log level: off, error, warn, info, debug, trace. Defaults to
    /// `$EBSD_MATCH_LOG`, then `info`.
    #[arg(long, global = true)]
    log_level: Option<LevelFilter>,

    /// Emit tracing output as JSON (feature `tracing`).
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a matching pass described by a JSON config.
    Match {
        /// Path to the run config.
        #[arg(short, long)]
        config: PathBuf,

        /// Override the angle threshold in degrees.
        #[arg(long)]
        threshold: Option<f64>,

        /// Override the file naming scale factor.
        #[arg(long)]
        scale_factor: Option<f64>,

        /// Directory of existing reference images; each match is resolved to
        /// the closest file by physical coordinates.
        #[arg(long)]
        reference_dir: Option<PathBuf>,
    },

    /// List the supported crystal systems.
    Groups,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Io(#[from] RunIoError),
    #[error(transparent)]
    ProjectDetails(#[from] ProjectDetailsError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error("cannot read reference directory: {0}")]
    ReferenceDir(std::io::Error),
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) {
    let _ = match cli.log_level {
        Some(level) => ebsd_match::core::init_with_level(level),
        None => ebsd_match::core::init_from_env(ebsd_match::core::LOG_ENV, LevelFilter::Info),
    };
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) {
    ebsd_match::core::init_tracing(cli.log_level, cli.json_logs);
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match cli.command {
        Commands::Match {
            config,
            threshold,
            scale_factor,
            reference_dir,
        } => run_match(config, threshold, scale_factor, reference_dir),
        Commands::Groups => {
            print_groups();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_groups() {
    println!("{:<13} {:<5} operators", "system", "group");
    for system in CrystalSystem::ALL {
        println!(
            "{:<13} {:<5} {}",
            system.name(),
            system.point_group(),
            system.operator_count()
        );
    }
}

fn run_match(
    config_path: PathBuf,
    threshold: Option<f64>,
    scale_factor: Option<f64>,
    reference_dir: Option<PathBuf>,
) -> Result<(), CliError> {
    let mut config = MatchRunConfig::load_json(&config_path)?;
    if let Some(threshold) = threshold {
        config.angle_threshold_deg = threshold;
    }
    if let Some(scale_factor) = scale_factor {
        config.scale_factor = scale_factor;
    }

    let reference = load_scan_json(&config.reference_scan)?;
    let target = load_scan_json(&config.target_scan)?;
    let details = ProjectDetails::from_path(&config.project_details)?;
    let listing = ReferenceListing::from_project_details(&details)?;
    let params = config.build_params(&details, &reference)?;
    info!(
        "reference {} ({}), deformed {} ({}), {} listing entries",
        config.reference_scan,
        reference.shape(),
        config.target_scan,
        target.shape(),
        listing.len()
    );

    let report = run_matching(&reference, &target, &listing, &config.symmetry, &params)?;

    let output_path = config.output_path();
    report.write_csv(&output_path)?;
    if let Some(json_path) = &config.report_json_path {
        report.write_json(json_path)?;
    }

    if let Some(dir) = reference_dir {
        let index = PhysicalFileIndex::from_dir(&dir).map_err(CliError::ReferenceDir)?;
        info!("{} reference images in {}", index.len(), dir.display());
        for m in &report.matches {
            match index.resolve(&m.matched_physical_name) {
                Some(file) => info!("{} -> {}", m.deformed_filename, file),
                None => warn!(
                    "{}: no reference image close to {}",
                    m.deformed_filename, m.matched_physical_name
                ),
            }
        }
    }

    println!(
        "matched {} of {} patterns; wrote {}",
        report.matched_count(),
        report.number_of_references,
        output_path.display()
    );
    Ok(())
}

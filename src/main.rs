use anyhow::{Context, Result};
use chunkcam::{
    compute_layers, init_logging, plan_job, CancellationToken, ChunkEngine, ContourGeometry,
    CuttingParameters, EngineOutput, JobConfig, JobReport, LogListener, BUILD_DATE, VERSION,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

/// Exit status of a run stopped by Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(name = "chunkcam")]
#[command(about = "Order offset contours into layered, shaped milling passes")]
#[command(version = VERSION)]
struct Cli {
    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a job file and write the ordered passes as JSON
    Run {
        /// Job description (.json or .toml)
        job: PathBuf,
        /// Report destination; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a job file without computing paths
    Check {
        /// Job description (.json or .toml)
        job: PathBuf,
    },

    /// Print the layer table for a depth range
    Layers {
        #[arg(allow_hyphen_values = true)]
        start: f64,
        #[arg(allow_hyphen_values = true)]
        end: f64,
        stepdown: f64,
    },

    /// Print version and build date
    Version,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;

    match cli.command {
        Command::Run { job, output } => run_job(job, output).await,
        Command::Check { job } => {
            let config = JobConfig::load_from_file(&job)
                .with_context(|| format!("loading job {}", job.display()))?;
            info!(
                "Job '{}' is valid: {} polygons, {} tabs",
                config.name,
                config.polygons.len(),
                config.tabs.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Layers {
            start,
            end,
            stepdown,
        } => {
            let params = CuttingParameters {
                stepdown,
                ..Default::default()
            };
            let layers = compute_layers(start, end, &params)?;
            for (i, layer) in layers.iter().enumerate() {
                println!("{:>4}  {:>10.4}  {:>10.4}", i, layer.start, layer.end);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Version => {
            println!("chunkcam {} (built {})", VERSION, BUILD_DATE);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_job(path: PathBuf, output: Option<PathBuf>) -> Result<ExitCode> {
    let job = JobConfig::load_from_file(&path)
        .with_context(|| format!("loading job {}", path.display()))?;
    info!("Running job '{}' from {}", job.name, path.display());

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            interrupt.cancel();
        }
    });

    let name = job.name.clone();
    let result = tokio::task::spawn_blocking(move || compute(&job, token))
        .await
        .context("path computation task failed")?;

    let output_data = match result {
        Ok(data) => data,
        Err(e) if e.is_cancelled() => {
            info!("Job '{}' cancelled", name);
            return Ok(ExitCode::from(EXIT_CANCELLED));
        }
        Err(e) => return Err(e).context("computing paths"),
    };

    let report = JobReport::new(&name, &output_data);
    match output {
        Some(dest) => {
            report.write_to(&dest)?;
            info!("Wrote {} passes to {}", report.passes.len(), dest.display());
        }
        None => println!("{}", report.to_json()?),
    }
    for warning in &report.warnings {
        warn!("{}", warning);
    }
    Ok(ExitCode::SUCCESS)
}

fn compute(job: &JobConfig, token: CancellationToken) -> chunkcam::engine::Result<EngineOutput> {
    let geometry = ContourGeometry::new(job.params.circle_segments);
    let mut plan = plan_job(job, &geometry)?;
    let listener = LogListener::default();
    ChunkEngine::new(&job.params, &geometry)
        .with_depth(plan.depth.as_ref())
        .with_silhouette(plan.silhouette.as_ref())
        .with_listener(&listener)
        .with_cancellation(token)
        .run(&mut plan.arena, &plan.request)
}

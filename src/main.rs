use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use sheet_dispatch::config::AppConfig;
use sheet_dispatch::loader::load_table;
use sheet_dispatch::logging::init_logging;
use sheet_dispatch::mailer::LettreConnector;
use sheet_dispatch::models::Artifact;
use sheet_dispatch::service::{DispatchService, RunOutput, RunRequest};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Extra configuration file, applied after config/default and config/local
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split the input file, email each part and write the result downloads
    Run {
        /// Input records spreadsheet (.xlsx or .csv)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Distribution list spreadsheet with Name, Designation and Email_ID columns
        #[arg(short, long)]
        distribution: Option<PathBuf>,

        /// Column to split by (repeatable)
        #[arg(short, long = "split-by")]
        split_by: Vec<String>,

        /// Directory that receives the updated distribution list and the output archive
        #[arg(short, long, default_value = "./downloads")]
        output_dir: PathBuf,
    },
    /// List the columns that can be selected for splitting
    Columns {
        /// Input records spreadsheet to check the columns against
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load(cli.config.as_deref())?;

    // Initialize logging
    let _guard = init_logging(
        Some(&config.get_log_level()),
        config.logging.format == "json",
        config.logging.file_path.as_deref().map(Path::new),
    )?;

    info!("Starting sheet-dispatch");

    match cli.command {
        Commands::Run {
            input,
            distribution,
            split_by,
            output_dir,
        } => {
            let request = RunRequest {
                records: input,
                distribution,
                split_by,
            };
            run(&config, &request, &output_dir).await
        }
        Commands::Columns { input } => {
            list_columns(&config, input.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run the pipeline and save its downloads
async fn run(config: &AppConfig, request: &RunRequest, output_dir: &Path) -> Result<ExitCode> {
    let service = DispatchService::new(config.clone());
    let connector = LettreConnector::new(config.mail.clone());

    match service.run(request, &connector).await {
        Ok(output) => {
            save_outputs(config, &output, output_dir)?;
            info!(
                sent = output.report.mails_sent,
                failed = output.report.mails_failed,
                unmatched = output.report.files_unmatched,
                "Processing complete!"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_warning() => {
            warn!("{e}");
            warn!("Please provide both spreadsheet files and select at least one column to split by.");
            Ok(ExitCode::from(2))
        }
        Err(e) => {
            error!("{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn save_outputs(config: &AppConfig, output: &RunOutput, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    save_artifact(&output.distribution, output_dir)?;
    save_artifact(&output.archive, output_dir)?;

    if config.export.write_report {
        let path = output_dir.join("run_report.json");
        std::fs::write(&path, output.report.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Run report written to {}", path.display());
    }

    Ok(())
}

fn save_artifact(artifact: &Artifact, output_dir: &Path) -> Result<()> {
    let path = output_dir.join(&artifact.file_name);
    std::fs::write(&path, &artifact.bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Download ready: {}", path.display());
    Ok(())
}

/// Show the allowed grouping columns and, given an input file, which of them it contains
fn list_columns(config: &AppConfig, input: Option<&Path>) -> Result<()> {
    let table = input
        .map(|path| load_table(path).with_context(|| format!("Failed to read {}", path.display())))
        .transpose()?;

    for column in &config.split.allowed_columns {
        match &table {
            Some(t) if t.has_column(column) => info!("{column} (present)"),
            Some(_) => info!("{column} (missing from input)"),
            None => info!("{column}"),
        }
    }

    Ok(())
}

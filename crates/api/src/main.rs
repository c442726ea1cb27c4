//! pm-risk - Machine Failure-Risk Scoring

use anyhow::{Context, Result};
use api::{commands, config::AppConfig, init_logging, run_server, AssessResponse};
use clap::{Parser, Subcommand};
use feature_engine::RawReading;
use risk_classifier::RiskLabel;
use std::path::PathBuf;
use tracing::info;

/// Machine failure-risk scoring
#[derive(Parser)]
#[command(name = "pm-risk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ./pm-risk.toml if present)
    #[arg(long, short, env = "PMRISK_CONFIG")]
    config: Option<PathBuf>,

    /// Override the model directory
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the failure and anomaly models on a labelled CSV
    Train {
        /// CSV with the feature columns and "Machine failure"
        data: PathBuf,

        /// Seed for both models
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Score every row of a CSV
    Score {
        input: PathBuf,

        /// Output CSV
        #[arg(long, short)]
        output: PathBuf,

        /// Only write rows with these labels (e.g. Verdächtig,Hochrisiko)
        #[arg(long, value_delimiter = ',')]
        labels: Vec<RiskLabel>,
    },

    /// Score one reading
    Assess {
        /// Torque [Nm]
        #[arg(long, default_value_t = 40.0)]
        torque: f64,

        /// Tool wear [min]
        #[arg(long, default_value_t = 150.0)]
        tool_wear: f64,

        /// Rotational speed [rpm]
        #[arg(long, default_value_t = 1500.0)]
        rpm: f64,

        /// Process temperature [K]
        #[arg(long, default_value_t = 310.0)]
        temperature: f64,

        /// Machine type (L, M or H)
        #[arg(long = "type", default_value = "L")]
        machine_type: String,
    },

    /// Run the HTTP API
    Serve {
        /// Listen address, overrides the config
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.model_dir {
        config.model_dir = dir;
    }
    init_logging(cli.json_logs || config.logging.json)?;

    info!("=== pm-risk v{} ===", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Train { data, seed } => {
            if let Some(seed) = seed {
                config.training = config.training.with_seed(seed);
            }
            let manifest = tokio::task::spawn_blocking(move || {
                commands::train_command(&config, &data)
            })
            .await
            .context("training task panicked")??;
            println!("{}", serde_json::to_string_pretty(&manifest)?);
        }
        Commands::Score {
            input,
            output,
            labels,
        } => {
            let summary = tokio::task::spawn_blocking(move || {
                commands::score_command(&config, &input, &output, &labels)
            })
            .await
            .context("scoring task panicked")??;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Assess {
            torque,
            tool_wear,
            rpm,
            temperature,
            machine_type,
        } => {
            let reading = RawReading {
                torque,
                tool_wear,
                rotational_speed: rpm,
                process_temperature: temperature,
                machine_type,
            };
            let assessment = commands::assess_command(&config, &reading)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&AssessResponse::from(assessment))?
            );
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind_addr = bind;
            }
            run_server(&config).await?;
        }
    }

    Ok(())
}

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use synthcare_gan::{
    service::{GenerateRequest, TrainRequest},
    utils::init_tracing,
    Config, GanService,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "synthcare_gan")]
#[command(about = "Conditional GAN for synthetic patient time series and tabular records", long_about = None)]
struct Cli {
    /// TOML settings, defaults are used for anything left out
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Train {
        #[arg(short, long)]
        epochs: Option<usize>,

        #[arg(short, long)]
        batch_size: Option<usize>,

        #[arg(long)]
        time_series: Option<PathBuf>,

        #[arg(long)]
        tabular: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,
    },
    Generate {
        #[arg(short, long, default_value_t = 100)]
        num_samples: usize,

        #[arg(short, long)]
        age: Option<f32>,

        /// Male or Female
        #[arg(short, long)]
        gender: Option<String>,

        #[arg(short, long)]
        disease_type: Option<String>,

        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    println!("{}", "Start".green());

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("reading config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Train {
            epochs,
            batch_size,
            time_series,
            tabular,
            seed,
        } => {
            if seed.is_some() {
                config.training.seed = seed;
            }
            let request = TrainRequest {
                epochs: epochs.unwrap_or(config.training.epochs),
                time_series_path: time_series,
                tabular_path: tabular,
                batch_size,
            };
            let service: GanService = GanService::new(config);

            let response = tokio::task::spawn_blocking(move || service.train(&request))
                .await
                .context("training task panicked")??;

            println!("{}", response.message.green());
            println!("Checkpoint: {}", response.model_timestamp.bold());
        }
        Commands::Generate {
            num_samples,
            age,
            gender,
            disease_type,
            output_dir,
        } => {
            if let Some(output_dir) = output_dir {
                config.paths.output_dir = output_dir;
            }
            let request = GenerateRequest {
                num_samples,
                age,
                gender,
                disease_type,
            };
            let service: GanService = GanService::new(config);

            let response = tokio::task::spawn_blocking(move || service.generate(&request))
                .await
                .context("generation task panicked")??;

            println!("{}", format!("Generated {} records", response.num_generated).green());
            println!("Time series: {}", response.time_series_file.display());
            println!("Tabular: {}", response.tabular_file.display());
            info!("Preview: {}", serde_json::to_string(&response.preview)?);
        }
        Commands::Status => {
            let service: GanService = GanService::new(config);
            service.load_latest()?;
            let status = service.status()?;

            let trained = if status.is_trained {
                "trained".green()
            } else {
                "not trained".yellow()
            };
            println!("Models: {trained}");
            println!("Checkpoint available: {}", status.available_models);
            println!("{}", serde_json::to_string_pretty(&status.training_history)?);
        }
    }

    println!("{}", "End".green());
    Ok(())
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use reqwest::Client;
use review_sentiment::{
    config::Config,
    ml::{infer, ArtifactLoader, PredictionResult},
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sentiment-cli")]
#[command(about = "Review Sentiment operator CLI", long_about = None)]
struct Cli {
    /// Configuration file used to locate artifacts
    #[arg(short, long, env = "CONFIG_PATH", global = true)]
    config: Option<String>,

    /// Directory that relative artifact paths are resolved against (default: the current working directory)
    #[arg(long, default_value = ".", global = true)]
    app_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a review locally with the configured artifacts
    Analyze {
        #[arg(short, long)]
        text: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load the artifacts and report whether they are usable
    CheckArtifacts,

    /// Check server health
    Health {
        #[arg(short, long, default_value = "http://localhost:8080")]
        endpoint: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config =
        Config::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    let loader = ArtifactLoader::from_config(&config.artifacts, &cli.app_root);

    match cli.command {
        Commands::Analyze { text, json } => {
            let result = if text.trim().is_empty() {
                PredictionResult::empty_input()
            } else {
                let model = loader.load().with_context(|| {
                    format!(
                        "Failed to load artifacts from {}",
                        loader.vectorizer_path().parent().unwrap_or(&cli.app_root).display()
                    )
                })?;
                let inference = infer(&model, &text).context("Analysis failed")?;
                PredictionResult::classified(&inference.label, inference.max_probability * 100.0)
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                match result.confidence() {
                    Some(confidence) => println!("{} ({:.2}%)", result.sentiment(), confidence),
                    None => println!("{}", result.sentiment()),
                }
            }
        }

        Commands::CheckArtifacts => {
            println!("Vectorizer: {}", loader.vectorizer_path().display());
            println!("Classifier: {}", loader.classifier_path().display());

            match loader.load() {
                Ok(model) => {
                    println!("OK");
                    println!("  Features: {}", model.classifier().n_features());
                    println!("  Classes: {}", model.classifier().classes().join(", "));
                }
                Err(e) => {
                    eprintln!("FAILED: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Health { endpoint } => {
            let client = Client::new();
            let response = client
                .get(format!("{}/health/ready", endpoint.trim_end_matches('/')))
                .send()
                .await
                .with_context(|| format!("Failed to reach {}", endpoint))?;

            let status = response.status();
            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);

            if !status.is_success() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

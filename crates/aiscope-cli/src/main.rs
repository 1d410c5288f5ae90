//! `aiscope` command-line interface.
//!
//! ```text
//! aiscope analyze "Some text to check"
//! aiscope analyze --file essay.md --reference my-old-essay.pdf
//! aiscope models
//! aiscope config > aiscope.yaml
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use aiscope_core::{ChatTurn, FileReference, Verdict};
use aiscope_runtime::{
    Analysis, AnalyzerBuilder, ApiCredential, GeminiProvider, GenerativeProvider,
    ReferenceUploader, RuntimeConfig, GEMINI_API_KEY_ENV,
};

#[derive(Debug, Parser)]
#[command(name = "aiscope", version, about = "Estimate how likely a text is AI-generated")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze a text
    Analyze {
        /// Text to analyze; read from stdin when neither this nor --file is given
        text: Option<String>,

        /// Read the text from a .txt or .md file
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Reference documents to upload and compare against
        #[arg(short, long = "reference")]
        references: Vec<PathBuf>,

        /// JSON file with prior turns: [{"role": "user", "content": "..."}]
        #[arg(long)]
        history: Option<PathBuf>,

        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// List models that support content generation
    Models {
        /// Include models without generateContent
        #[arg(long)]
        all: bool,
    },

    /// Print the default configuration as YAML
    Config,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    score: Option<u8>,
    #[serde(flatten)]
    analysis: &'a Analysis,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Config => {
            print!("{}", config.to_yaml()?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Models { all } => {
            let provider = gemini(&config)?;
            list_models(provider, config, all).await
        }
        Command::Analyze {
            text,
            file,
            references,
            history,
            json,
        } => {
            let input = read_input(text, file.as_deref())?;
            let history = match history {
                Some(path) => read_history(&path)?,
                None => Vec::new(),
            };
            let provider = gemini(&config)?;
            analyze(provider, config, &input, &history, &references, json).await
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(RuntimeConfig::default()),
    }
}

fn gemini(config: &RuntimeConfig) -> Result<Arc<GeminiProvider>> {
    let credential =
        ApiCredential::resolve(config.api_key.as_deref(), GEMINI_API_KEY_ENV, "Gemini API key")?;
    tracing::debug!(credential = %credential, "Credential loaded");

    let provider = GeminiProvider::new(credential, config.request_timeout)
        .context("creating Gemini provider")?;
    Ok(Arc::new(provider))
}

fn read_input(text: Option<String>, file: Option<&Path>) -> Result<String> {
    let input = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
            if !matches!(ext.to_ascii_lowercase().as_str(), "txt" | "md") {
                bail!("unsupported input file {}: expected .txt or .md", path.display());
            }
            std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?
        }
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading text from stdin")?;
            buf
        }
    };

    if input.trim().is_empty() {
        bail!("nothing to analyze: input text is empty");
    }
    Ok(input)
}

fn read_history(path: &Path) -> Result<Vec<ChatTurn>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading history {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing history {}", path.display()))
}

async fn analyze(
    provider: Arc<GeminiProvider>,
    config: RuntimeConfig,
    input: &str,
    history: &[ChatTurn],
    references: &[PathBuf],
    json: bool,
) -> Result<ExitCode> {
    let mut attachments: Vec<FileReference> = Vec::new();
    if !references.is_empty() {
        let uploader = ReferenceUploader::new(provider.clone());
        for path in references {
            match uploader.upload(path, None).await {
                Some(file) => attachments.push(file),
                None => tracing::warn!(path = %path.display(), "Continuing without reference"),
            }
        }
    }

    let analyzer = AnalyzerBuilder::new()
        .provider(provider)
        .config(config)
        .build()?;
    let analysis = analyzer.analyze_detailed(input, history, &attachments).await;
    let verdict = Verdict::parse(&analysis.text);

    if json {
        let report = JsonReport {
            score: verdict.score,
            analysis: &analysis,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !analysis.is_answered() {
        println!("{}", analysis.text);
    } else {
        match verdict.score {
            Some(score) => {
                let leaning = if verdict.leans_ai() { "likely AI-generated" } else { "likely human-written" };
                println!("AI probability: {}% ({})", score, leaning);
                println!();
                println!("{}", verdict.body);
            }
            None => {
                tracing::warn!("Response carried no score marker");
                println!("{}", analysis.text);
            }
        }
    }

    if let Some(model) = &analysis.model {
        tracing::info!(model = %model, calls = analysis.trace.total_calls(), "Analysis complete");
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}

async fn list_models(provider: Arc<GeminiProvider>, config: RuntimeConfig, all: bool) -> Result<ExitCode> {
    let models = if all {
        provider.list_models().await.context("listing models")?
    } else {
        AnalyzerBuilder::new()
            .provider(provider)
            .config(config)
            .build()?
            .supported_models()
            .await
            .context("listing models")?
    };

    if models.is_empty() {
        println!("No models returned by ListModels.");
    }
    for model in &models {
        println!("{}", model);
    }
    Ok(ExitCode::SUCCESS)
}

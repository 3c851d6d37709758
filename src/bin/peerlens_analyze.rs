use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use peerlens::core::config::{AnalysisConfig, PeerlensConfig};
use peerlens::llm::factory::ExternalServices;
use peerlens::toolkit::analysis::{AnalysisRequest, SimilarityAnalyzer};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut input: Option<PathBuf> = None;
    let mut tuning: Option<String> = None;
    let mut compact = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" | "-i" => {
                if i + 1 < args.len() {
                    input = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--tuning" | "-t" => {
                if i + 1 < args.len() {
                    tuning = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--compact" => compact = true,
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_help();
                std::process::exit(2);
            }
        }
        i += 1;
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive("peerlens=info".parse()?))
        .init();

    let raw = match &input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let request: AnalysisRequest = serde_json::from_str(&raw)?;

    let config = PeerlensConfig::from_env();
    config.validate()?;
    let tuning_path = tuning.or_else(|| config.analysis_config_path.clone());
    let analysis = AnalysisConfig::load(tuning_path.as_deref())?;

    let services = ExternalServices::from_config(&config)?;
    let analyzer = SimilarityAnalyzer::from_services(&services, analysis);

    match analyzer.analyze(&request.summaries).await {
        Ok(result) => {
            let out = if compact {
                serde_json::to_string(&result)?
            } else {
                serde_json::to_string_pretty(&result)?
            };
            println!("{}", out);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", serde_json::to_string_pretty(&e.to_response())?);
            std::process::exit(if e.status_code() == 400 { 2 } else { 1 });
        }
    }
}

fn print_help() {
    println!(
        r#"peerlens-analyze - cross-compare summaries from the command line

USAGE:
    peerlens-analyze [OPTIONS] < request.json

OPTIONS:
    -i, --input <FILE>     Read {{"summaries": [...]}} from FILE instead of stdin
    -t, --tuning <FILE>    Analysis tuning file (TOML/JSON), overrides PEERLENS_TUNING_PATH
        --compact          Print single-line JSON
    -h, --help             Print help

EXIT CODES:
    0  success
    1  analysis failed (provider or internal error)
    2  invalid input or arguments

ENVIRONMENT:
    PEERLENS_LLM_PROVIDER, PEERLENS_LLM_MODEL, PEERLENS_LLM_API_KEY,
    PEERLENS_EMBEDDING_PROVIDER, PEERLENS_EMBEDDING_MODEL, PEERLENS_EMBEDDING_URL,
    PEERLENS_ANALYSIS__<FIELD> (e.g. PEERLENS_ANALYSIS__TOP_K=5)"#
    );
}

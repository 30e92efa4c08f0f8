//! Command-line interface for athanor
//!
//! Subcommands cover interactive generation, JSONL batch processing, the
//! nightly training job, provider status, and config validation. All
//! logic lives in the library; this module parses arguments, loads
//! configuration, and maps errors to exit codes.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing::{error, warn};

use athanor_config::Config;
use athanor_models::{GenerationRequest, Phase};

use crate::client::AthanorClient;
use crate::error::AthanorError;
use crate::exit_codes::ExitCode;
use crate::logging::init_tracing;

/// athanor - phased prompt generation with multi-provider LLM routing
#[derive(Parser)]
#[command(name = "athanor")]
#[command(about = "Generate, rank, and refine LLM prompts through a phased pipeline")]
#[command(long_about = r#"
athanor transforms a rough request into ranked prompt candidates by
routing it through a sequence of transformation phases (prima-materia,
solutio, coagulatio), each served by a configurable LLM provider.

EXAMPLES:
  # Generate three ranked candidates
  athanor generate "an email announcing a maintenance window" --count 3

  # Force a provider for one phase
  athanor generate "summarize a changelog" --provider solutio=anthropic

  # Process a JSONL file of requests with eight workers
  athanor batch requests.jsonl --workers 8

  # Nightly ranking-weight training (dry run prints the would-be deltas)
  athanor nightly --dry-run

  # Show provider availability
  athanor providers

CONFIGURATION:
  Configuration is discovered by searching upward from CWD for
  athanor.yaml; use --config for an explicit path. CLI flags override
  file values.
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging with targets and span timing
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate ranked prompt candidates for an input
    Generate {
        /// The raw request to transform
        input: String,

        /// Number of independent generation chains
        #[arg(long)]
        count: Option<usize>,

        /// Comma-separated phase list (default: all three in order)
        #[arg(long)]
        phases: Option<String>,

        /// Per-phase provider override, e.g. solutio=anthropic (repeatable)
        #[arg(long = "provider", value_name = "PHASE=PROVIDER")]
        providers: Vec<String>,

        /// Sampling temperature
        #[arg(long)]
        temperature: Option<f64>,

        /// Output token budget per provider call
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Persona shaping the generated prompt
        #[arg(long)]
        persona: Option<String>,

        /// Tag recorded on every candidate (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Context line appended to phase prompts (repeatable)
        #[arg(long = "context")]
        context: Vec<String>,

        /// Emit the full result as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Process a JSONL file of generation requests
    Batch {
        /// File with one JSON-encoded request per line
        file: PathBuf,

        /// Chain worker pool size override
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Run the ranking-weight training job
    Nightly {
        /// Compute and report deltas without persisting
        #[arg(long)]
        dry_run: bool,
    },

    /// List registered providers with availability and capabilities
    Providers,

    /// Validate the configuration file and report all problems
    Validate,
}

/// Entry point invoked by `main`.
///
/// Handles all output including errors; `main` only maps the returned
/// code to the process exit status.
///
/// # Errors
///
/// Returns the exit code to terminate with on failure.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let runtime = tokio::runtime::Runtime::new().map_err(|e| {
        eprintln!("Error: failed to start async runtime: {e}");
        ExitCode::GeneralError
    })?;

    runtime.block_on(dispatch(cli)).map_err(|e| {
        error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        e.to_exit_code()
    })
}

async fn dispatch(cli: Cli) -> Result<(), AthanorError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Generate {
            input,
            count,
            phases,
            providers,
            temperature,
            max_tokens,
            persona,
            tags,
            context,
            json,
        } => {
            let client = AthanorClient::from_config(config)?;
            let request = build_request(
                client.config(),
                input,
                count,
                phases.as_deref(),
                &providers,
                temperature,
                max_tokens,
                persona,
                tags,
                context,
            )?;
            let result = client.generate(&request).await?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&result)
                        .expect("generation result serializes")
                );
            } else {
                print_result_summary(&result);
            }
            Ok(())
        }

        Command::Batch { file, workers } => {
            let mut config = config;
            if let Some(workers) = workers {
                config.generation.workers = workers;
            }
            let client = AthanorClient::from_config(config)?;
            run_batch(&client, &file).await
        }

        Command::Nightly { dry_run } => {
            let client = AthanorClient::from_config(config)?;
            match client.run_training(dry_run) {
                Ok(run) => {
                    println!(
                        "Training run: {} interaction(s), updated: {}",
                        run.interactions_seen, run.updated
                    );
                    for feature in athanor_models::Feature::ALL {
                        println!(
                            "  {:<24} correlation {:+.4}  delta {:+.4}",
                            feature.to_string(),
                            run.correlations.get(feature),
                            run.applied_deltas.get(feature),
                        );
                    }
                    Ok(())
                }
                Err(e) => {
                    // A scheduled training failure must never look fatal
                    // to operators scripting the serving path.
                    warn!(error = %e, "Training run skipped");
                    println!("Training skipped: {e}");
                    Ok(())
                }
            }
        }

        Command::Providers => {
            let client = AthanorClient::from_config(config)?;
            let statuses = client.provider_statuses().await;
            if statuses.is_empty() {
                println!("No providers configured.");
                return Ok(());
            }
            println!("{:<12} {:<11} {}", "PROVIDER", "AVAILABLE", "EMBEDDINGS");
            for status in statuses {
                println!(
                    "{:<12} {:<11} {}",
                    status.name,
                    if status.available { "yes" } else { "no" },
                    if status.supports_embeddings { "yes" } else { "no" },
                );
            }
            Ok(())
        }

        Command::Validate => {
            // load_config already validated; reaching here means success.
            println!("Configuration OK");
            println!("  providers: {}", config.providers.len());
            println!("  phases mapped: {}", config.phases.len());
            Ok(())
        }
    }
}

fn load_config(explicit: Option<&std::path::Path>) -> Result<Config, AthanorError> {
    let config = match explicit {
        Some(path) => Config::load(path)?,
        None => {
            let cwd = std::env::current_dir()?;
            Config::discover(&cwd)?
        }
    };
    Ok(config)
}

#[allow(clippy::too_many_arguments)]
fn build_request(
    config: &Config,
    input: String,
    count: Option<usize>,
    phases: Option<&str>,
    provider_overrides: &[String],
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    persona: Option<String>,
    tags: Vec<String>,
    context: Vec<String>,
) -> Result<GenerationRequest, AthanorError> {
    let mut request = GenerationRequest::new(input);
    request.count = count.unwrap_or(config.generation.default_count);
    request.temperature = temperature.unwrap_or(config.generation.default_temperature);
    request.max_tokens = max_tokens.unwrap_or(config.generation.default_max_tokens);
    request.persona = persona;
    request.tags = tags;
    request.context = context;

    if let Some(list) = phases {
        request.phases = parse_phases(list)?;
    }
    request.providers = parse_provider_overrides(provider_overrides)?;

    Ok(request)
}

fn parse_phases(list: &str) -> Result<Vec<Phase>, AthanorError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| {
            Phase::from_str(name).map_err(|e| {
                AthanorError::Config(athanor_config::ConfigError::ValidationFailed {
                    errors: vec![e.to_string()],
                })
            })
        })
        .collect()
}

fn parse_provider_overrides(
    overrides: &[String],
) -> Result<HashMap<Phase, String>, AthanorError> {
    let mut map = HashMap::new();
    for entry in overrides {
        let invalid = || {
            AthanorError::Config(athanor_config::ConfigError::ValidationFailed {
                errors: vec![format!(
                    "invalid provider override '{entry}' (expected PHASE=PROVIDER)"
                )],
            })
        };
        let (phase, provider) = entry.split_once('=').ok_or_else(invalid)?;
        let phase = Phase::from_str(phase.trim()).map_err(|_| invalid())?;
        map.insert(phase, provider.trim().to_string());
    }
    Ok(map)
}

fn print_result_summary(result: &athanor_models::GenerationResult) {
    println!(
        "Generated {} candidate(s), {} chain error(s)",
        result.prompts.len(),
        result.chain_errors.len()
    );
    for ranking in &result.rankings {
        let prompt = result
            .prompts
            .iter()
            .find(|p| p.id == ranking.prompt_id)
            .expect("ranking refers to a known prompt");
        let marker = if result.selected == Some(prompt.id) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} [{:.4}] {} via {} ({} tokens)",
            ranking.score, prompt.id, prompt.provider, prompt.actual_tokens
        );
        let preview: String = prompt.content.chars().take(100).collect();
        println!("    {preview}");
    }
    for chain_error in &result.chain_errors {
        println!("  ! {chain_error}");
    }
}

async fn run_batch(client: &AthanorClient, file: &std::path::Path) -> Result<(), AthanorError> {
    let handle = std::fs::File::open(file)?;
    let reader = std::io::BufReader::new(handle);

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let request: GenerationRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                warn!(line = index + 1, error = %e, "Skipping malformed batch line");
                failed += 1;
                continue;
            }
        };
        match client.generate(&request).await {
            Ok(result) => {
                succeeded += 1;
                println!(
                    "line {}: {} candidate(s), selected {:?}",
                    index + 1,
                    result.prompts.len(),
                    result.selected
                );
            }
            Err(e) => {
                failed += 1;
                warn!(line = index + 1, error = %e, "Batch request failed");
                println!("line {}: failed: {e}", index + 1);
            }
        }
    }

    println!("Batch complete: {succeeded} succeeded, {failed} failed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_phases_accepts_comma_list() {
        let phases = parse_phases("prima-materia, solutio").unwrap();
        assert_eq!(phases, vec![Phase::PrimaMateria, Phase::Solutio]);
    }

    #[test]
    fn parse_phases_rejects_unknown() {
        assert!(parse_phases("nigredo").is_err());
    }

    #[test]
    fn parse_overrides_accepts_pairs() {
        let overrides = parse_provider_overrides(&["solutio=anthropic".to_string()]).unwrap();
        assert_eq!(overrides.get(&Phase::Solutio).unwrap(), "anthropic");
    }

    #[test]
    fn parse_overrides_rejects_missing_equals() {
        assert!(parse_provider_overrides(&["solutio".to_string()]).is_err());
    }

    #[test]
    fn cli_parses_generate_command() {
        let cli = Cli::try_parse_from([
            "athanor",
            "generate",
            "write a haiku",
            "--count",
            "2",
            "--provider",
            "solutio=anthropic",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Command::Generate { input, count, json, .. } => {
                assert_eq!(input, "write a haiku");
                assert_eq!(count, Some(2));
                assert!(json);
            }
            _ => panic!("expected generate command"),
        }
    }
}

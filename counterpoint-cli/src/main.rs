//! # Counterpoint CLI
//!
//! Command-line interface for running prompt flows.
//!
//! Usage:
//!   counterpoint debate <claim> -c <category>...
//!   counterpoint flows
//!   counterpoint invoke <flow> --input <json>
//!
//! Examples:
//!   counterpoint debate "Index funds always beat stock picking" -c finance -c history
//!   counterpoint --provider anthropic debate "Cold showers boost immunity" -c medicine
//!   counterpoint invoke debateClaim --input '{"claim": "...", "categories": ["Career"]}'
//!
//! Provider settings come from flags, falling back to `COUNTERPOINT_*`
//! environment variables.

mod logging;

use clap::{Parser, Subcommand};
use counterpoint_flows::{
    builtin_descriptors, CancellationToken, Category, DebateClaimFlow, DebateRequest, DebateResponse, Error,
    ErrorKind, FlowConfig, FlowRegistry, LlmBackend, ProviderConfig, ProviderType, RetryPolicy,
    DEBATE_CLAIM_FLOW,
};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "counterpoint")]
#[command(author, version, about = "Counterpoint - argue both sides of a claim")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Model provider: openai (or any OpenAI-compatible server) or anthropic
    #[arg(long, global = true, env = "COUNTERPOINT_PROVIDER", default_value = "openai")]
    provider: ProviderType,

    /// Base URL of the provider API
    #[arg(long, global = true, env = "COUNTERPOINT_BASE_URL")]
    base_url: Option<String>,

    /// Model name (defaults to the provider's default)
    #[arg(short, long, global = true, env = "COUNTERPOINT_MODEL")]
    model: Option<String>,

    /// API key for hosted providers
    #[arg(long, global = true, env = "COUNTERPOINT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// HTTP timeout per request, in seconds
    #[arg(long, global = true, default_value = "120")]
    timeout: u64,

    /// Sampling temperature
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Attempts before giving up
    #[arg(long, global = true, default_value_t = counterpoint_flows::DEFAULT_MAX_ATTEMPTS)]
    max_attempts: usize,

    /// Backoff unit in milliseconds; retry n waits n times this long
    #[arg(long, global = true, default_value = "1000")]
    base_delay_ms: u64,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only print results and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Have an Advocate and a Skeptic argue about a claim
    Debate {
        /// The claim to debate
        #[arg(trailing_var_arg = true, required = true)]
        claim: Vec<String>,

        /// Category of the claim (repeatable)
        #[arg(short = 'c', long = "category", required = true)]
        categories: Vec<Category>,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },
    /// List registered flows
    Flows {
        /// Include input and output JSON schemas
        #[arg(long)]
        schemas: bool,
    },
    /// Run a registered flow on JSON input
    Invoke {
        /// Flow name, e.g. debateClaim
        flow: String,

        /// Flow input as a JSON document
        #[arg(long, conflicts_with = "input_file")]
        input: Option<String>,

        /// Read flow input from a JSON file
        #[arg(long)]
        input_file: Option<String>,
    },
}

impl Cli {
    fn flow_config(&self) -> FlowConfig {
        let mut provider = match self.provider {
            ProviderType::OpenAI => match (&self.api_key, &self.base_url) {
                (Some(key), _) => ProviderConfig::openai(key.clone()),
                (None, Some(url)) => ProviderConfig::local(url.clone(), "gpt-4o"),
                // Hosted OpenAI without a key; validation reports the missing key
                (None, None) => ProviderConfig::openai(""),
            },
            ProviderType::Anthropic => {
                ProviderConfig::anthropic(self.api_key.clone().unwrap_or_default())
            }
        };

        if let Some(url) = &self.base_url {
            provider = provider.with_base_url(url.clone());
        }
        if let Some(model) = &self.model {
            provider = provider.with_model(model.clone());
        }
        provider = provider.with_timeout(self.timeout);

        let mut config = FlowConfig::new(provider).with_retry(RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
        ));
        if let Some(t) = self.temperature {
            config = config.with_temperature(t);
        }
        config
    }
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            token.cancel();
        }
    });
}

fn print_debate(response: &DebateResponse, json: bool, quiet: bool) -> Result<(), Error> {
    if json {
        let rendered = serde_json::to_string_pretty(response).map_err(|e| {
            Error::serialization_failed(e.to_string()).with_operation("cli::print_debate")
        })?;
        println!("{}", rendered);
        return Ok(());
    }

    if !quiet {
        println!("--- ADVOCATE ---\n");
    }
    println!("{}", response.advocate_text);
    println!();
    if !quiet {
        println!("--- SKEPTIC ---\n");
    }
    println!("{}", response.skeptic_text);
    Ok(())
}

async fn run_debate(
    cli: &Cli,
    claim: &[String],
    categories: &[Category],
    json: bool,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    let config = cli.flow_config();
    config.validate()?;

    let request = DebateRequest::new(claim.join(" "), categories.iter().copied())?;
    let flow = DebateClaimFlow::new(LlmBackend::from_config(&config)?).with_policy(config.retry);

    if !cli.quiet {
        let names: Vec<&str> = request.categories().iter().map(Category::as_str).collect();
        eprintln!("Claim: {}", request.claim());
        eprintln!("Categories: {}\n", names.join(", "));
    }

    let response = flow.debate_claim_with_cancel(&request, cancel).await?;
    print_debate(&response, json, cli.quiet)
}

fn list_flows(schemas: bool) {
    for descriptor in builtin_descriptors() {
        println!("{} - {}", descriptor.name, descriptor.description);
        if schemas {
            let pretty = |v: &serde_json::Value| serde_json::to_string_pretty(v).unwrap_or_default();
            println!("  input:\n{}", indent(&pretty(&descriptor.input_schema), 4));
            println!("  output:\n{}", indent(&pretty(&descriptor.output_schema), 4));
        }
    }
}

fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_input(input: Option<&str>, input_file: Option<&str>) -> Result<serde_json::Value, Error> {
    let text = match (input, input_file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
            Error::invalid_argument(format!("cannot read {}: {}", path, e))
                .with_operation("cli::read_input")
                .with_context("path", path)
                .set_source(e)
        })?,
        (None, None) => {
            return Err(Error::invalid_argument("one of --input or --input-file is required")
                .with_operation("cli::read_input"))
        }
    };

    serde_json::from_str(&text).map_err(|e| {
        Error::serialization_failed(format!("flow input is not valid JSON: {}", e))
            .with_operation("cli::read_input")
            .set_source(e)
    })
}

async fn invoke_flow(
    cli: &Cli,
    flow: &str,
    input: Option<&str>,
    input_file: Option<&str>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    let registry = FlowRegistry::from_config(&cli.flow_config())?;
    let input = read_input(input, input_file)?;
    let output = registry.invoke(flow, input, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&output).unwrap_or_else(|_| output.to_string()));
    Ok(())
}

fn exit_status(err: &Error) -> u8 {
    match err.kind() {
        ErrorKind::Cancelled => 130,
        _ => 1,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let result = match &cli.command {
        Commands::Debate {
            claim,
            categories,
            json,
        } => run_debate(&cli, claim, categories, *json, &cancel).await,
        Commands::Flows { schemas } => {
            list_flows(*schemas);
            Ok(())
        }
        Commands::Invoke {
            flow,
            input,
            input_file,
        } => {
            invoke_flow(&cli, flow, input.as_deref(), input_file.as_deref(), &cancel).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if cli.verbose {
                eprintln!("Error: {:?}", err);
            } else {
                eprintln!("Error: {}", err);
            }
            if err.kind() == ErrorKind::FlowNotFound && !cli.quiet {
                eprintln!("Hint: `counterpoint flows` lists flows; try {}", DEBATE_CLAIM_FLOW);
            }
            ExitCode::from(exit_status(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_debate_args_parse() {
        let cli = Cli::try_parse_from([
            "counterpoint",
            "--api-key",
            "sk-test",
            "debate",
            "-c",
            "famous-personas",
            "--category",
            "History",
            "Napoleon",
            "was",
            "short",
        ])
        .unwrap();

        match &cli.command {
            Commands::Debate { claim, categories, json } => {
                assert_eq!(claim.join(" "), "Napoleon was short");
                assert_eq!(categories, &[Category::FamousPersonas, Category::History]);
                assert!(!json);
            }
            _ => panic!("expected debate"),
        }
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let result = Cli::try_parse_from(["counterpoint", "debate", "-c", "astrology", "claim"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flow_config_from_flags() {
        let cli = Cli::try_parse_from([
            "counterpoint",
            "--provider",
            "anthropic",
            "--api-key",
            "sk-ant",
            "--model",
            "claude-3-5-haiku-20241022",
            "--max-attempts",
            "5",
            "--base-delay-ms",
            "10",
            "flows",
        ])
        .unwrap();

        let config = cli.flow_config();
        assert_eq!(config.provider.provider_type, ProviderType::Anthropic);
        assert_eq!(config.provider.default_model.as_deref(), Some("claude-3-5-haiku-20241022"));
        assert_eq!(config.retry, RetryPolicy::new(5, Duration::from_millis(10)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_local_server_needs_no_key() {
        let cli = Cli::try_parse_from([
            "counterpoint",
            "--base-url",
            "http://localhost:11434/v1",
            "--model",
            "llama3",
            "flows",
        ])
        .unwrap();

        let config = cli.flow_config();
        assert_eq!(config.provider.base_url.as_deref(), Some("http://localhost:11434/v1"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_hosted_openai_without_key_reports_missing_key() {
        let cli = Cli::try_parse_from(["counterpoint", "flows"]).unwrap();
        if cli.api_key.is_some() || cli.base_url.is_some() {
            // COUNTERPOINT_API_KEY or COUNTERPOINT_BASE_URL is set in this environment
            return;
        }

        let err = cli.flow_config().validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.message().contains("requires an API key"), "{}", err);
    }

    #[test]
    fn test_read_input() {
        let value = read_input(Some(r#"{"claim": "x"}"#), None).unwrap();
        assert_eq!(value["claim"], "x");

        let err = read_input(Some("{"), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SerializationFailed);

        let err = read_input(None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_status(&Error::cancelled(1)), 130);
        assert_eq!(exit_status(&Error::config_invalid("x")), 1);
        assert_eq!(exit_status(&Error::backend_failed("x")), 1);
    }
}

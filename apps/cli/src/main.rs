//! Relay CLI - command-line surface for the tracked LLM orchestration core.
//!
//! Wraps the `Orchestrator` query surface: explain routing decisions, run
//! tracked queries, drive the research pipeline and provider comparisons,
//! and inspect usage analytics. Results print as JSON so they compose with
//! shell tooling.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use relay_abstraction::{Complexity, TaskType};
use relay_models::ProviderRegistry;
use relay_orchestrator::{
    CallContext, Intent, Orchestrator, OrchestratorConfig, PrivacyLevel, ResearchConfig,
    RouteOptions, catalog,
};
use relay_telemetry::Timeframe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Relay - tracked LLM orchestration
///
/// Routes queries across provider families with full usage/cost telemetry,
/// and composes the plan → research → synthesize pipeline.
#[derive(Parser, Debug)]
#[command(
    name = "relay",
    author,
    version,
    about = "Relay - tracked LLM orchestration core"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Use mock providers instead of live API credentials
    #[arg(long, global = true)]
    mock: bool,

    /// Path to the orchestrator configuration file
    #[arg(short = 'c', long, default_value = "relay.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Explain the routing decision for a query without invoking anything
    Route {
        /// The query text
        query: String,

        #[command(flatten)]
        routing: RoutingArgs,
    },

    /// Route a query, invoke the selected provider, and print the tracked response
    Query {
        /// The query text
        query: String,

        #[command(flatten)]
        routing: RoutingArgs,

        /// Per-invocation deadline in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Run the plan → research → synthesize pipeline
    Research {
        /// The research question
        query: String,

        /// Route the research stage through the web-grounded provider
        #[arg(long)]
        web_search: bool,
    },

    /// Run the research pipeline against both provider families and compare
    Compare {
        /// The research question
        query: String,
    },

    /// Print aggregate usage analytics
    Analytics {
        /// Window start (RFC 3339, inclusive)
        #[arg(long)]
        since: Option<String>,

        /// Window end (RFC 3339, exclusive)
        #[arg(long)]
        until: Option<String>,
    },
}

/// Routing flags shared by `route` and `query`.
#[derive(clap::Args, Debug)]
struct RoutingArgs {
    /// Task type override (inferred from the query when absent)
    #[arg(long, value_enum)]
    task_type: Option<TaskTypeArg>,

    /// Complexity override (inferred from the query when absent)
    #[arg(long, value_enum)]
    complexity: Option<ComplexityArg>,

    /// Pin the deep-capability provider family
    #[arg(long)]
    force_gpt: bool,

    /// Request the privacy-preferred provider family
    #[arg(long)]
    private: bool,

    /// Route to the web-grounded provider
    #[arg(long)]
    web_search: bool,

    /// Intent hint
    #[arg(long, value_enum)]
    intent: Option<IntentArg>,
}

impl RoutingArgs {
    fn options(&self) -> RouteOptions {
        RouteOptions {
            force_gpt: self.force_gpt,
            privacy_level: if self.private { PrivacyLevel::Private } else { PrivacyLevel::Standard },
            requires_web_search: self.web_search,
            intent: self.intent.map(Intent::from),
            ..RouteOptions::default()
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TaskTypeArg {
    Research,
    CompanyAnalysis,
    LeadGeneration,
    IcpDevelopment,
    Summarization,
    SimpleChat,
    FastResponse,
}

impl From<TaskTypeArg> for TaskType {
    fn from(value: TaskTypeArg) -> Self {
        match value {
            TaskTypeArg::Research => Self::Research,
            TaskTypeArg::CompanyAnalysis => Self::CompanyAnalysis,
            TaskTypeArg::LeadGeneration => Self::LeadGeneration,
            TaskTypeArg::IcpDevelopment => Self::IcpDevelopment,
            TaskTypeArg::Summarization => Self::Summarization,
            TaskTypeArg::SimpleChat => Self::SimpleChat,
            TaskTypeArg::FastResponse => Self::FastResponse,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ComplexityArg {
    Low,
    Medium,
    High,
}

impl From<ComplexityArg> for Complexity {
    fn from(value: ComplexityArg) -> Self {
        match value {
            ComplexityArg::Low => Self::Low,
            ComplexityArg::Medium => Self::Medium,
            ComplexityArg::High => Self::High,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IntentArg {
    Chat,
    Analysis,
    DeepInfo,
    CompanyInfo,
    Research,
    Summarization,
}

impl From<IntentArg> for Intent {
    fn from(value: IntentArg) -> Self {
        match value {
            IntentArg::Chat => Self::Chat,
            IntentArg::Analysis => Self::Analysis,
            IntentArg::DeepInfo => Self::DeepInfo,
            IntentArg::CompanyInfo => Self::CompanyInfo,
            IntentArg::Research => Self::Research,
            IntentArg::Summarization => Self::Summarization,
        }
    }
}

fn parse_rfc3339(value: &str, flag: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("--{flag} must be an RFC 3339 timestamp, got '{value}'"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&args.log_level).context("invalid --log-level value")?,
        )
        .with_writer(std::io::stderr)
        .init();

    let registry = if args.mock {
        Arc::new(ProviderRegistry::with_mocks(catalog::ALL))
    } else {
        Arc::new(ProviderRegistry::from_env(catalog::ALL))
    };
    if registry.is_empty() {
        anyhow::bail!(
            "no providers available; set OPENAI_API_KEY / GEMINI_API_KEY / \
             PERPLEXITY_API_KEY or pass --mock"
        );
    }

    let config = OrchestratorConfig::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let orchestrator = Orchestrator::with_config(registry, &config)?;

    match args.command {
        Command::Route { query, routing } => {
            let profile = orchestrator.analyze_query(&query);
            let task_type =
                routing.task_type.map(TaskType::from).unwrap_or(profile.task_type);
            let complexity =
                routing.complexity.map(Complexity::from).unwrap_or(profile.complexity);
            let decision = orchestrator.route(task_type, complexity, &routing.options());
            print_json(&serde_json::json!({
                "taskType": task_type,
                "complexity": complexity,
                "decision": decision,
            }))?;
        }
        Command::Query { query, routing, timeout_secs } => {
            let ctx = match timeout_secs {
                Some(secs) => CallContext::with_timeout(Duration::from_secs(secs)),
                None => CallContext::default(),
            };
            let response = orchestrator
                .route_and_track(
                    routing.task_type.map(TaskType::from),
                    &query,
                    routing.complexity.map(Complexity::from),
                    &routing.options(),
                    &ctx,
                )
                .await?;
            print_json(&response)?;
        }
        Command::Research { query, web_search } => {
            let config = ResearchConfig { requires_web_search: web_search, ..ResearchConfig::default() };
            let result = orchestrator
                .research_with_tracking(&query, &config, &CallContext::default())
                .await?;
            print_json(&result)?;
        }
        Command::Compare { query } => {
            let result = orchestrator
                .compare_providers(&query, &ResearchConfig::default(), &CallContext::default())
                .await?;
            // Quality scores are heuristic signals; say so next to the data.
            eprintln!("note: quality scores are heuristic, not a validated quality model");
            print_json(&result)?;
        }
        Command::Analytics { since, until } => {
            let timeframe = Timeframe {
                start: since.as_deref().map(|v| parse_rfc3339(v, "since")).transpose()?,
                end: until.as_deref().map(|v| parse_rfc3339(v, "until")).transpose()?,
            };
            let analytics = orchestrator.get_analytics(Some(&timeframe));
            print_json(&analytics)?;
        }
    }

    Ok(())
}

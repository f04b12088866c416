use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use llm_log_insights::{
    config::Config,
    search::FilterSpec,
    service::InsightService,
    tenants::TenantRegistry,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "llm-log-insights")]
#[command(about = "Multi-tenant exception and log analytics", long_about = None)]
#[command(version)]
struct Cli {
    /// Override file layered over the built-in defaults
    #[arg(short, long, env = "LLM_LOG_INSIGHTS_CONFIG")]
    config: Option<PathBuf>,

    /// Tenant document, overriding `tenants.path`
    #[arg(long)]
    tenants: Option<PathBuf>,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate configuration and the tenant document
    Validate,

    /// List configured tenants
    Tenants,

    /// List a tenant's environments
    Environments {
        #[arg(value_name = "TENANT")]
        tenant: String,
    },

    /// Search exception indices
    Search {
        #[arg(value_name = "TENANT")]
        tenant: String,

        /// Free-text query; uses smart search when enabled
        #[arg(short, long)]
        query: Option<String>,

        /// Log level filter
        #[arg(short = 'S', long)]
        severity: Option<String>,

        #[command(flatten)]
        filter: FilterArgs,

        /// Reorder results by how often each message occurs
        #[arg(long)]
        sort_by_frequency: bool,
    },

    /// Search application and log indices
    Logs {
        #[arg(value_name = "TENANT")]
        tenant: String,

        #[arg(short, long)]
        query: Option<String>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Totals, top messages and hourly distribution
    Summary {
        #[arg(value_name = "TENANT")]
        tenant: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Most frequent error messages
    Frequent {
        #[arg(value_name = "TENANT")]
        tenant: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Per-service and per-message trends
    Trends {
        #[arg(value_name = "TENANT")]
        tenant: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Analyze one exception message
    Analyze {
        #[arg(value_name = "TENANT")]
        tenant: String,

        #[arg(value_name = "MESSAGE")]
        message: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Check cluster health for a tenant environment
    Ping {
        #[arg(value_name = "TENANT")]
        tenant: String,

        #[arg(short, long)]
        environment: Option<String>,
    },
}

#[derive(Args)]
struct FilterArgs {
    #[arg(short, long)]
    environment: Option<String>,

    #[arg(short, long)]
    service: Option<String>,

    /// 1h, 6h, 12h, 24h or 7d
    #[arg(short, long)]
    timeframe: Option<String>,

    /// RFC 3339 start of an explicit window
    #[arg(long, requires = "until")]
    since: Option<DateTime<Utc>>,

    /// RFC 3339 end of an explicit window
    #[arg(long, requires = "since")]
    until: Option<DateTime<Utc>>,

    #[arg(short, long)]
    limit: Option<usize>,
}

impl FilterArgs {
    fn into_spec(self) -> FilterSpec {
        let mut spec = FilterSpec::new();
        spec.environment = self.environment;
        spec.service = self.service;
        spec.timeframe = self.timeframe;
        spec.limit = self.limit;
        if let (Some(since), Some(until)) = (self.since, self.until) {
            spec = spec.with_time_range(since, until);
        }
        spec
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    init_tracing(&config);

    if config.observability.metrics_enabled {
        if let Err(e) = llm_log_insights::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
        }
    }

    let tenants_path = cli.tenants.clone().unwrap_or_else(|| config.tenants.path.clone());
    let registry = TenantRegistry::load(&tenants_path)
        .with_context(|| format!("failed to load tenants from {}", tenants_path.display()))?;
    tracing::info!(
        tenants = registry.len(),
        path = %tenants_path.display(),
        "Tenant registry loaded"
    );

    let service = InsightService::new(Arc::new(registry), config.engine.clone());
    let result = run(&service, cli.command).await;

    service.shutdown().await;
    if cli.print_metrics {
        eprintln!("{}", llm_log_insights::metrics::gather_metrics());
    }
    result
}

async fn run(service: &InsightService, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Validate => {
            print_json(&serde_json::json!({
                "valid": true,
                "tenants": service.registry().len(),
            }))?;
        }

        Commands::Tenants => print_json(&service.list_tenants())?,

        Commands::Environments { tenant } => print_json(&service.list_environments(&tenant)?)?,

        Commands::Search {
            tenant,
            query,
            severity,
            filter,
            sort_by_frequency,
        } => {
            let mut spec = filter.into_spec().with_sort_by_frequency(sort_by_frequency);
            spec.text_query = query;
            spec.severity = severity;
            print_json(&service.search_exceptions(&tenant, &spec).await?)?;
        }

        Commands::Logs {
            tenant,
            query,
            filter,
        } => {
            let mut spec = filter.into_spec();
            spec.text_query = query;
            print_json(&service.search_logs(&tenant, &spec).await?)?;
        }

        Commands::Summary { tenant, filter } => {
            print_json(&service.exception_summary(&tenant, &filter.into_spec()).await?)?;
        }

        Commands::Frequent { tenant, filter } => {
            print_json(&service.frequent_exceptions(&tenant, &filter.into_spec()).await?)?;
        }

        Commands::Trends { tenant, filter } => {
            print_json(&service.exception_trends(&tenant, &filter.into_spec()).await?)?;
        }

        Commands::Analyze {
            tenant,
            message,
            filter,
        } => {
            let spec = filter.into_spec();
            print_json(&service.analyze_exception(&tenant, &message, &spec).await?)?;
        }

        Commands::Ping {
            tenant,
            environment,
        } => {
            print_json(&service.check_connection(&tenant, environment.as_deref()).await?)?;
        }
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("llm_log_insights={}", config.observability.log_level).into()
    });

    // Logs go to stderr so stdout stays machine-readable
    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use quay_cmpstatus::{CheckContext, StatusAggregator};
use quay_core::{ComponentKind, Condition, RegistryStatus};
use quay_kubehub::KubeAccessor;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "quayctl", version, about = "QuayRegistry component readiness")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Namespace of the QuayRegistry
    #[arg(long = "ns", global = true, env = "QUAYCTL_NAMESPACE", default_value = "default")]
    namespace: String,

    /// Per-pass check deadline in milliseconds
    #[arg(long = "timeout-ms", global = true, env = "QUAYCTL_CHECK_TIMEOUT_MS", default_value_t = 2000)]
    timeout_ms: u64,

    /// Log filter directives, e.g. `info` or `quay_cmpstatus=debug`
    #[arg(long = "log", global = true, env = "QUAYCTL_LOG", default_value = "info")]
    log: String,

    /// Serve Prometheus metrics on host:port
    #[arg(long = "metrics-addr", global = true, env = "QUAYCTL_METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json, Yaml }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate every declared component of a registry
    Status {
        /// QuayRegistry name
        registry: String,
        /// Re-evaluate every N seconds until Ctrl-C
        #[arg(long = "every")]
        every_secs: Option<u64>,
    },
    /// Evaluate a single component, e.g. `mirror` or `clairpostgres`
    Check {
        /// QuayRegistry name
        registry: String,
        /// Component kind
        kind: ComponentKind,
    },
}

fn init_tracing(directives: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics(addr: Option<SocketAddr>) {
    let Some(sock) = addr else { return };
    match metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(sock).install() {
        Ok(()) => info!(addr = %sock, "metrics exporter listening"),
        Err(e) => warn!(addr = %sock, error = %e, "metrics exporter not installed; continuing without it"),
    }
}

fn print_conditions(output: Output, conditions: &[Condition]) -> Result<()> {
    match output {
        Output::Human => {
            println!("{:<30} {:<8} {:<20} MESSAGE", "TYPE", "STATUS", "REASON");
            for c in conditions {
                let ty = serde_json::to_value(c.type_)?;
                println!("{:<30} {:<8} {:<20} {}", ty.as_str().unwrap_or("?"), c.status.as_str(), c.reason.as_str(), c.message);
            }
        }
        Output::Json => println!("{}", serde_json::to_string_pretty(conditions)?),
        Output::Yaml => print!("{}", serde_yaml::to_string(conditions)?),
    }
    Ok(())
}

async fn status_pass(agg: &StatusAggregator, accessor: &KubeAccessor, cli: &Cli, registry: &str, status: &mut RegistryStatus) -> Result<()> {
    let reg = quay_kubehub::fetch_registry(accessor.client(), &cli.namespace, registry).await?;
    let ctx = CheckContext::with_timeout(Duration::from_millis(cli.timeout_ms));
    let report = agg.evaluate(&ctx, &reg, status).await;
    print_conditions(cli.output, status.conditions())?;
    for kind in &report.skipped {
        info!(kind = %kind, "no readiness checker for component");
    }
    if !report.is_complete() {
        for (kind, e) in &report.failed {
            error!(kind = %kind, error = %e, "component check failed");
        }
        return Err(anyhow!("{} component check(s) failed", report.failed.len()));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);
    init_metrics(cli.metrics_addr);

    let accessor = KubeAccessor::try_default().await?;
    let agg = StatusAggregator::new(Arc::new(accessor.clone()));

    match &cli.command {
        Commands::Status { registry, every_secs: None } => {
            let t0 = Instant::now();
            info!(registry = %registry, ns = %cli.namespace, "status invoked");
            let mut status = RegistryStatus::new();
            status_pass(&agg, &accessor, &cli, registry, &mut status).await?;
            info!(took_ms = %t0.elapsed().as_millis(), "status done");
        }
        Commands::Status { registry, every_secs: Some(secs) } => {
            info!(registry = %registry, ns = %cli.namespace, every_secs = secs, "status loop invoked");
            let mut status = RegistryStatus::new();
            let mut ticker = tokio::time::interval(Duration::from_secs((*secs).max(1)));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = status_pass(&agg, &accessor, &cli, registry, &mut status).await {
                            warn!(error = %e, "status pass incomplete");
                        }
                    }
                    _ = signal::ctrl_c() => {
                        info!("Ctrl-C received; stopping status loop");
                        break;
                    }
                }
            }
        }
        Commands::Check { registry, kind } => {
            info!(registry = %registry, kind = %kind, "check invoked");
            let reg = quay_kubehub::fetch_registry(accessor.client(), &cli.namespace, registry).await?;
            let ctx = CheckContext::with_timeout(Duration::from_millis(cli.timeout_ms));
            let cond = agg
                .check_one(&ctx, &reg, *kind)
                .await
                .ok_or_else(|| anyhow!("no readiness checker for component {}", kind))?
                .with_context(|| format!("checking {}", kind))?;
            print_conditions(cli.output, std::slice::from_ref(&cond))?;
        }
    }
    Ok(())
}

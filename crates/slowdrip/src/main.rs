use clap::{Parser, ValueEnum};
use slowdrip::transport::check_endpoint;
use slowdrip::transport::tls::install_crypto_provider;
use slowdrip::{Orchestrator, Phase, RedisStore, TcpDialer, TracingSink};
use slowdrip_common::{parse_flag, ConfigurationError, EndpointConfig, RunConfig, TransportSecurity};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

/// Populates a Redis-compatible store with large values, then holds many
/// connections open with unread GET replies.
#[derive(Debug, Parser)]
#[command(name = "slowdrip", version)]
struct Cli {
    /// Load the run configuration from a YAML file instead of positionals
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(required_unless_present = "config")]
    host: Option<String>,

    #[arg(required_unless_present = "config")]
    port: Option<u16>,

    /// Number of keys written and connections held
    #[arg(required_unless_present = "config")]
    workers: Option<u32>,

    /// Value size of the first key, in MiB
    #[arg(required_unless_present = "config", allow_negative_numbers = true)]
    initial_size_mib: Option<i64>,

    /// Size added per key, in MiB
    #[arg(required_unless_present = "config", allow_negative_numbers = true)]
    delta_mib: Option<i64>,

    /// Seconds to hold each slow-read connection
    #[arg(required_unless_present = "config")]
    idle_secs: Option<u64>,

    /// "true" to keep existing data instead of flushing first
    #[arg(required_unless_present = "config")]
    skip_flush: Option<String>,

    /// "true" for TLS without certificate verification
    use_tls: Option<String>,

    #[arg(long)]
    heartbeat_ms: Option<u64>,

    #[arg(long)]
    connect_timeout_secs: Option<u64>,

    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init(),
    }
}

fn required<T>(value: Option<T>, name: &'static str) -> Result<T, ConfigurationError> {
    value.ok_or(ConfigurationError::Missing(name))
}

fn build_config(cli: Cli) -> Result<RunConfig, ConfigurationError> {
    let mut config = match cli.config {
        Some(path) => RunConfig::load(path)?,
        None => {
            let use_tls = match cli.use_tls.as_deref() {
                Some(raw) => parse_flag("use_tls", raw)?,
                None => false,
            };
            let security = if use_tls {
                TransportSecurity::TlsNoVerify
            } else {
                TransportSecurity::Plain
            };
            let endpoint = EndpointConfig {
                host: required(cli.host, "host")?,
                port: required(cli.port, "port")?,
                security,
            };
            let mut config = RunConfig::new(endpoint, required(cli.workers, "workers")?);
            config.initial_size_mib = required(cli.initial_size_mib, "initial_size_mib")?;
            config.delta_mib = required(cli.delta_mib, "delta_mib")?;
            config.idle_secs = required(cli.idle_secs, "idle_secs")?;
            let skip_flush = required(cli.skip_flush, "skip_flush")?;
            config.skip_flush = parse_flag("skip_flush", &skip_flush)?;
            config
        }
    };

    if let Some(ms) = cli.heartbeat_ms {
        config.heartbeat_ms = ms;
    }
    if let Some(secs) = cli.connect_timeout_secs {
        config.connect_timeout_secs = secs;
    }
    config.validate()?;
    check_endpoint(&config.endpoint)?;
    Ok(config)
}

async fn run(config: RunConfig) -> Result<Phase, Box<dyn Error>> {
    let timeout = config.connect_timeout();
    let store = RedisStore::new(&config.endpoint, timeout)?;
    let dialer = TcpDialer::new(&config.endpoint, timeout)?;

    info!(
        target_addr = %dialer.address(),
        workers = config.workers,
        tls = config.endpoint.security.is_tls(),
        "slowdrip started"
    );

    let mut orchestrator = Orchestrator::new(
        config,
        Arc::new(store),
        Arc::new(dialer),
        Arc::new(TracingSink),
    );

    tokio::select! {
        res = orchestrator.run() => Ok(res?),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted before the run completed");
            Err("interrupted".into())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let config = match build_config(cli) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    install_crypto_provider();

    match run(config).await {
        Ok(phase) => {
            info!(phase = ?phase, "Run finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Run aborted");
            ExitCode::FAILURE
        }
    }
}

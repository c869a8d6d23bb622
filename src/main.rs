use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use sse_fanout::{RegistryConfig, ServerConfig, StreamServer};

/// Server-sent event fan-out server
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Pending events per client before it is disconnected
    #[arg(long, default_value_t = 100)]
    buffer_capacity: usize,

    /// Events kept for Last-Event-ID replay (0 disables replay)
    #[arg(long, default_value_t = 1000)]
    history_capacity: usize,

    /// Maximum connected clients (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_clients: usize,

    /// Reconnect delay sent to clients, in milliseconds
    #[arg(long, default_value_t = 5000)]
    retry_ms: u64,

    /// Seconds between heartbeat events
    #[arg(long, default_value_t = 30)]
    heartbeat_secs: u64,

    /// Shortest wait between sample data events, in milliseconds
    #[arg(long, default_value_t = 500)]
    min_interval_ms: u64,

    /// Longest wait between sample data events, in milliseconds
    #[arg(long, default_value_t = 2000)]
    max_interval_ms: u64,

    /// Seconds between keep-alive comments on idle streams
    #[arg(long, default_value_t = 15)]
    keep_alive_secs: u64,

    /// Do not run the built-in producers
    #[arg(long)]
    no_producers: bool,
}

impl Args {
    fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::default()
            .buffer_capacity(self.buffer_capacity)
            .history_capacity(self.history_capacity)
            .max_clients(self.max_clients)
            .retry_hint(Duration::from_millis(self.retry_ms))
    }

    fn server_config(&self) -> ServerConfig {
        let config = ServerConfig::with_addr(self.bind)
            .keep_alive(Duration::from_secs(self.keep_alive_secs))
            .heartbeat_interval(Duration::from_secs(self.heartbeat_secs))
            .data_interval(
                Duration::from_millis(self.min_interval_ms),
                Duration::from_millis(self.max_interval_ms),
            );

        if self.no_producers {
            config.disable_producers()
        } else {
            config
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sse_fanout=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    let registry_config = args.registry_config();

    if registry_config.buffer_capacity == 0 {
        anyhow::bail!("--buffer-capacity must be at least 1");
    }

    info!(
        buffer_capacity = registry_config.buffer_capacity,
        history_capacity = registry_config.history_capacity,
        max_clients = registry_config.max_clients,
        "Starting SSE fan-out"
    );

    let server = StreamServer::with_registry_config(args.server_config(), registry_config);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}

//! Runs only the slow-read phase against a store that is already populated.
//!
//! ```bash
//! cargo run --example hold_connections -- 127.0.0.1:6379 200 30
//! ```

use slowdrip::{slow_fetch, TcpDialer, TracingSink};
use slowdrip_common::{EndpointConfig, RunConfig, TransportSecurity};
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let mut args = env::args().skip(1);
    let target = args.next().unwrap_or_else(|| "127.0.0.1:6379".to_string());
    let workers: u32 = args.next().map(|v| v.parse()).transpose()?.unwrap_or(100);
    let idle_secs: u64 = args.next().map(|v| v.parse()).transpose()?.unwrap_or(10);

    let (host, port) = target
        .rsplit_once(':')
        .ok_or("target must be host:port")?;
    let endpoint = EndpointConfig {
        host: host.to_string(),
        port: port.parse()?,
        security: TransportSecurity::Plain,
    };

    let mut config = RunConfig::new(endpoint, workers);
    config.idle_secs = idle_secs;
    config.validate()?;

    println!(
        "Holding {} connections to {} for {}s each",
        workers, target, idle_secs
    );

    let dialer = Arc::new(TcpDialer::new(&config.endpoint, config.connect_timeout())?);
    slow_fetch(Arc::new(config), dialer, Arc::new(TracingSink)).await;

    println!("All connections released.");
    Ok(())
}

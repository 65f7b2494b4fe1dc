use clap::Parser;
use json_ws::server::{serve, ServerConfig};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Serves static files and answers websocket messages with a greeting.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    address: IpAddr,
    #[arg(short, long, default_value_t = 3210)]
    port: u16,
    /// Directory served to plain HTTP requests
    #[arg(long, default_value = "./public")]
    root: PathBuf,
    /// Subprotocol to accept, may be repeated
    #[arg(long = "subprotocol", default_value = "json")]
    subprotocols: Vec<String>,
    /// Seconds without inbound data before a websocket is dropped
    #[arg(long, default_value_t = 60)]
    timeout: u64,
    /// One of off, error, warn, info, debug, trace
    #[arg(long, default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,
}

fn parse_level(level: &str) -> Result<LevelFilter, String> {
    level
        .parse()
        .map_err(|_| format!("unknown log level {:?}", level))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    SimpleLogger::new().with_level(args.log_level).init()?;
    let config = ServerConfig {
        address: args.address,
        port: args.port,
        document_root: args.root,
        subprotocols: args.subprotocols,
        timeout: Duration::from_secs(args.timeout),
    };
    serve(config)?;
    Ok(())
}

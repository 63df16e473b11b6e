//! xredis command line client.
//!
//! Runs single commands through the failover client, mostly useful to check
//! a configuration against live instances.
//!
//! ```text
//! xredis --config xredis.toml ping --count 20
//! xredis -a 127.0.0.1:6379 -a 127.0.0.1:6380 set greeting hello --ttl 60
//! xredis -a 127.0.0.1:6379 pipeline a=1 b=2
//! ```

use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use serde_json::json;
use std::path::PathBuf;

use xredis::config::{load_config, ClusterOptions};
use xredis::observability::{logging, metrics};
use xredis::{Commands, FailoverClient};

#[derive(Parser)]
#[command(name = "xredis")]
#[command(about = "Failover client for a pool of standalone redis instances", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend address (repeatable). Replaces the addresses from the config file.
    #[arg(short = 'a', long = "addr")]
    addrs: Vec<String>,

    /// Password for every instance.
    #[arg(short, long)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// PING the pool, `count` times concurrently
    Ping {
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    /// GET a key
    Get { key: String },
    /// SET a key, optionally with a TTL in seconds
    Set {
        key: String,
        value: String,
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// DEL one or more keys
    Del {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// SET key=value pairs in one pipeline on a single instance
    Pipeline {
        #[arg(required = true)]
        pairs: Vec<String>,
    },
    /// Connection pool counters summed over all instances
    Stats,
    /// Instance addresses and health after one check interval
    Instances,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut options = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClusterOptions::default(),
    };
    if !cli.addrs.is_empty() {
        options.addrs = cli.addrs.clone();
    }
    if cli.password.is_some() {
        options.client.password = cli.password.clone();
    }

    logging::init_logging(&options.observability);
    if options.observability.metrics_enabled {
        match options.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %options.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let client = FailoverClient::new(&options)?;
    tracing::debug!(
        instances = options.addrs.len(),
        failover_retries = client.failover_retries(),
        max_retries = client.max_retries(),
        "client ready"
    );

    let outcome = run(&client, &options, cli.command).await;
    client.close()?;
    outcome
}

async fn run(
    client: &FailoverClient,
    options: &ClusterOptions,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Ping { count } => {
            let replies = join_all((0..count).map(|_| client.ping())).await;
            for reply in replies {
                match reply {
                    Ok(pong) => println!("{pong}"),
                    Err(e) => println!("error: {e}"),
                }
            }
        }
        Command::Get { key } => {
            let value: Option<String> = client.get(&key).await?;
            match value {
                Some(value) => println!("{value}"),
                None => println!("(nil)"),
            }
        }
        Command::Set { key, value, ttl } => {
            match ttl {
                Some(seconds) => client.set_ex(&key, value, seconds).await?,
                None => client.set(&key, value).await?,
            }
            println!("OK");
        }
        Command::Del { keys } => {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            println!("{}", client.del(&keys).await?);
        }
        Command::Pipeline { pairs } => {
            let mut pipe = client.pipeline();
            for pair in &pairs {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("expected KEY=VALUE, got {pair:?}"))?;
                pipe.cmd("SET").arg(key).arg(value);
            }
            let addr = pipe.instance().addr().to_string();
            let replies = pipe.exec().await?;
            println!("{} replies from {addr}", replies.len());
        }
        Command::Stats => {
            println!("{}", serde_json::to_string_pretty(&client.pool_stats())?);
        }
        Command::Instances => {
            tokio::time::sleep(options.balancer.check_interval()).await;
            let instances: Vec<_> = client
                .balancer()
                .instances()
                .iter()
                .map(|instance| {
                    json!({
                        "addr": instance.addr(),
                        "state": format!("{:?}", instance.health().state()),
                        "pool": instance.pool_stats(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&instances)?);
        }
    }
    Ok(())
}

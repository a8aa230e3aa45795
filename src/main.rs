// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::io::Write as _;

use clap::{Parser, Subcommand};

use pi_delivery::api;
use pi_delivery::cdf::Radix;
use pi_delivery::config::Config;
use pi_delivery::index::Index;
use pi_delivery::logger::setup_logger;
use pi_delivery::service::Service;
use pi_delivery::store::ObjectStore as _;
use pi_delivery::store::http::HttpStore;

#[derive(Parser)]
#[command(name = "pi-server", version, about = env!("CARGO_PKG_DESCRIPTION"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (the default).
    Serve {
        /// Port to listen on, overriding the environment.
        #[arg(long)]
        port: Option<u16>,
        /// Bucket holding the digit files, overriding the environment.
        #[arg(long)]
        bucket: Option<String>,
    },
    /// Print a digit range to standard output.
    Extract {
        /// Digit position to start from; position 0 is the leading 3.
        #[arg(long, default_value_t = 0)]
        start: u64,
        /// Number of digits to print.
        #[arg(long, default_value_t = 100)]
        count: u64,
        /// Radix of the expansion, 10 or 16.
        #[arg(long, default_value_t = 10)]
        radix: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logger();
    let cli = Cli::parse();
    let mut config = Config::from_env();

    match cli.command.unwrap_or(Command::Serve {
        port: None,
        bucket: None,
    }) {
        Command::Serve { port, bucket } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(bucket) = bucket {
                config.bucket_name = bucket;
            }
            api::serve(config).await
        }
        Command::Extract {
            start,
            count,
            radix,
        } => extract(config, start, count, radix).await,
    }
}

async fn extract(config: Config, start: u64, count: u64, radix: u32) -> anyhow::Result<()> {
    let radix = Radix::try_from(radix)?;
    let index = Index::load(&config.index_path)?;
    let store = HttpStore::new(config.object_store_endpoint.clone());
    let service = Service::new(store.bucket(&config.bucket_name));

    let digits = service.get(index.result_set(radix), start, count).await?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&digits)?;
    writeln!(stdout)?;
    Ok(())
}

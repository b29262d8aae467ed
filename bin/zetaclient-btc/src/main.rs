//! The ZetaChain client of a bitcoin chain: observes deposits and withdrawals of the TSS and signs
//! the pending withdrawals.

use std::{fs, path::Path};

use clap::Parser;
use config::Config;
use constants::{DEFAULT_THREAD_COUNT, DEFAULT_THREAD_STACK_SIZE};
use params::Params;
use serde::de::DeserializeOwned;
use tokio::runtime;
use tracing::{debug, info, trace};
use zeta_btc_common::logging::{self, LoggerConfig};

mod args;
mod bootstrap;
mod config;
mod params;

mod constants;

fn main() {
    logging::init(LoggerConfig::with_base_name("zetaclient-btc"));

    let cli = args::Cli::parse();
    info!(config = %cli.config.display(), params = %cli.params.display(), "starting zetaclient");

    let params = parse_toml::<Params>(cli.params);
    let config = parse_toml::<Config>(cli.config);

    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(config.num_threads.unwrap_or(DEFAULT_THREAD_COUNT).into())
        .thread_stack_size(
            config
                .thread_stack_size
                .unwrap_or(DEFAULT_THREAD_STACK_SIZE),
        )
        .enable_all()
        .build()
        .expect("must be able to create runtime");

    if let Err(e) = runtime.block_on(bootstrap::run(params, config)) {
        panic!("zetaclient crashed: {e:?}");
    }

    info!("zetaclient shutdown complete");
}

/// Loads the TOML file at `path` as a `T`.
///
/// # Panics
///
/// If the file cannot be read or does not describe a valid `T`. Both messages name the file.
fn parse_toml<T>(path: impl AsRef<Path>) -> T
where
    T: std::fmt::Debug + DeserializeOwned,
{
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    trace!(path = %path.display(), len = contents.len(), "read file");

    let parsed = toml::from_str::<T>(&contents)
        .unwrap_or_else(|e| panic!("failed to parse {}: {e}", path.display()));
    debug!(path = %path.display(), ?parsed, "parsed TOML file");

    parsed
}

//! Parses command-line arguments for the bitcoin client.

use std::path::PathBuf;

use clap::{crate_version, Parser};

#[derive(Debug, Parser)]
#[clap(
    name = "zetaclient-btc",
    about = "Observes a bitcoin chain and signs its withdrawals on behalf of the TSS",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[clap(
        long,
        short = 'p',
        help = "The file containing the chain params",
        default_value = "params.toml"
    )]
    pub params: PathBuf,

    #[clap(
        long,
        short = 'c',
        help = "The file containing the configuration of the client",
        default_value = "config.toml"
    )]
    pub config: PathBuf,
}

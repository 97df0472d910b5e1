use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vigil_core::OpKind;

#[derive(Parser)]
#[command(
    about = "Vigil - audit and toggle per-app operation permissions",
    version
)]
pub struct Cli {
    #[clap(
        long,
        help = "Directory for persisted policy state",
        default_value = "/data/vigil"
    )]
    pub data_dir: PathBuf,

    #[clap(
        long,
        help = "Present app lists even without the verified capability marker"
    )]
    pub assume_verified: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(about = "List tracked apps for an operation kind, partitioned into allow/deny")]
    List { kind: OpKind },

    #[command(about = "Allow the operation for a package")]
    Allow { kind: OpKind, package: String },

    #[command(about = "Deny the operation for a package")]
    Deny { kind: OpKind, package: String },

    #[command(about = "Purge persisted state for a removed package")]
    Purge { package: String },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

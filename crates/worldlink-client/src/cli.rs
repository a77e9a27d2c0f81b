//! Command-line interface definitions and parsing

use clap::Parser;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "worldlink.toml")]
    pub config: String,

    /// Character to enter the world with, overriding the configuration
    #[arg(long)]
    pub character: Option<String>,

    /// Server address, overriding the configuration
    #[arg(long)]
    pub address: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

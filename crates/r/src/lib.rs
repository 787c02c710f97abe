use clap::{Parser, Subcommand, ValueEnum};

use serde::{Deserialize, Serialize};

pub mod commands;
pub mod config;
pub mod session;
pub mod utils;

#[derive(Debug, Parser)]
#[command(name = "r")]
#[command(about = "Chat with your ingested documents through the terminal")]
pub struct Cli {
    /// Base url of the chat service API.
    #[arg(long, global = true, env = "R_BASE_URL")]
    pub base_url: Option<String>,
    /// Config file
    #[arg(
        long,
        global = true,
        env = "R_CONFIG_FILE",
        default_value = "~/.config/r.yaml"
    )]
    pub config_file: String,
    /// Response output format
    #[arg(short, long, global = true, value_enum)]
    pub format: Option<Output>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Send a message to the assistant
    #[clap(alias = "c")]
    Chat(commands::chat::CommandOptions),
    /// Manage the documents used as context
    #[clap(alias = "i")]
    Ingest(commands::ingest::CommandOptions),
    /// Inspect user profiles
    #[clap(alias = "u")]
    Users(commands::users::CommandOptions),
}

#[derive(Default, ValueEnum, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[clap(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Output {
    #[default]
    /// Plain text
    Raw,
    /// JSON
    Json,
    /// YAML
    Yaml,
}

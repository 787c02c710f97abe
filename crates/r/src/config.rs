use std::fs;

use color_eyre::eyre::{Context, Result};
use ragchat::client::DEFAULT_BASE_URL;
use ragchat::{Client, QueryOptions};
use serde::Deserialize;

use crate::utils::expand_home;
use crate::{Cli, Output};

/// Values read from the config file. Everything is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    pub base_url: Option<String>,
    pub use_context: Option<bool>,
    pub stream: Option<bool>,
    pub quiet: Option<bool>,
    pub format: Option<Output>,
}

impl Config {
    /// Loads the config file. A missing file yields the defaults.
    pub fn load(path: &str) -> Result<Self> {
        let path = expand_home(path)?;

        if !path.exists() {
            tracing::event!(tracing::Level::DEBUG, "No config file at {:?}", path);
            return Ok(Self::default());
        }

        tracing::event!(tracing::Level::INFO, "Loading config from {:?}", path);
        let content =
            fs::read_to_string(&path).with_context(|| format!("can't read {path:?}"))?;

        serde_yaml::from_str(&content).with_context(|| format!("invalid config file {path:?}"))
    }

    /// Query options for a new conversation.
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            use_context: self.use_context.unwrap_or_default(),
            stream: self.stream.unwrap_or_default(),
            context_filter: None,
        }
    }
}

/// Settings shared by every command once flags, environment and config file are merged.
#[derive(Debug)]
pub struct Globals {
    pub base_url: String,
    pub format: Output,
    pub config: Config,
}

impl Globals {
    pub fn new(cli: &Cli, config: Config) -> Self {
        let base_url = cli
            .base_url
            .clone()
            .or_else(|| config.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let format = cli.format.or(config.format).unwrap_or_default();

        Self {
            base_url,
            format,
            config,
        }
    }

    /// Creates the API client.
    pub fn client(&self) -> Result<Client> {
        Client::new(self.base_url.as_str()).context("can't create api client")
    }
}

//! Server options.
//!
//! Options come from three places, strongest first: whatever the caller
//! passes explicitly, `#\` lines in a script, and the environment defaults.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 9292;
pub const DEFAULT_CONFIG: &str = "config.ru";

#[derive(Parser, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[command(name = "lack", no_binary_name = true, disable_help_flag = true, disable_version_flag = true)]
#[serde(default)]
pub struct Options {
    /// Handler to serve the application with
    #[arg(short = 's', long)]
    pub server: Option<String>,

    /// Address to listen on
    #[arg(short = 'o', long)]
    pub host: Option<String>,

    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Deployment environment, `development` by default
    #[arg(short = 'E', long = "env")]
    pub environment: Option<String>,

    /// Handler specific option, `NAME=VALUE` or a bare `NAME` meaning `true`
    #[arg(short = 'O', long = "option", value_parser = parse_server_option)]
    pub server_options: Vec<(String, String)>,

    #[arg(short = 'd', long)]
    pub debug: bool,

    #[arg(short = 'w', long)]
    pub warn: bool,

    #[arg(short = 'q', long)]
    pub quiet: bool,

    #[arg(short = 'P', long)]
    pub pid: Option<PathBuf>,

    /// Path of the script describing the application
    #[arg(skip)]
    pub config: Option<PathBuf>,
}

fn parse_server_option(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some(("", _)) => Err(format!("option name missing in '{raw}'")),
        Some((name, value)) => Ok((name.to_owned(), value.to_owned())),
        None if raw.is_empty() => Err("option name missing".to_owned()),
        None => Ok((raw.to_owned(), "true".to_owned())),
    }
}

impl Options {
    /// Parses option words as they appear on a `#\` line.
    pub fn parse_words<I, S>(words: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(words)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Defaults derived from the process environment (`LACK_ENV`).
    pub fn defaults_from_env() -> Self {
        let environment = std::env::var("LACK_ENV").ok();
        Self::defaults_for(environment.as_deref().unwrap_or("development"))
    }

    /// Defaults for the deployment environment `environment`.
    pub fn defaults_for(environment: &str) -> Self {
        let host = if environment == "development" { "localhost" } else { "0.0.0.0" };
        Self {
            environment: Some(environment.to_owned()),
            host: Some(host.to_owned()),
            port: Some(DEFAULT_PORT),
            config: Some(PathBuf::from(DEFAULT_CONFIG)),
            ..Self::default()
        }
    }

    /// Layers `explicit` on top of `self`: every value set in `explicit`
    /// wins, the rest comes from `self`.
    #[must_use]
    pub fn merge_beneath(self, explicit: Options) -> Options {
        let mut server_options = self.server_options;
        for (name, value) in explicit.server_options {
            server_options.retain(|(existing, _)| *existing != name);
            server_options.push((name, value));
        }

        Options {
            server: explicit.server.or(self.server),
            host: explicit.host.or(self.host),
            port: explicit.port.or(self.port),
            environment: explicit.environment.or(self.environment),
            server_options,
            debug: explicit.debug || self.debug,
            warn: explicit.warn || self.warn,
            quiet: explicit.quiet || self.quiet,
            pid: explicit.pid.or(self.pid),
            config: explicit.config.or(self.config),
        }
    }

    /// The value of handler option `name`, last setting wins.
    pub fn server_option(&self, name: &str) -> Option<&str> {
        self.server_options.iter().rev().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

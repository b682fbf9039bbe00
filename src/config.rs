//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "site-lockdown")]
#[command(about = "A local HTTP service that tracks per-domain unblock, interrupt and lockdown timers")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Page blocked tabs are redirected to. Defaults to this server's /blocked
    #[arg(short, long)]
    pub block_page: Option<String>,

    /// JSON file of site records to seed the store with
    #[arg(short, long)]
    pub sites: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Block page URL, falling back to the one this server serves
    pub fn block_page_url(&self) -> String {
        self.block_page
            .clone()
            .unwrap_or_else(|| format!("http://{}/blocked", self.address()))
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

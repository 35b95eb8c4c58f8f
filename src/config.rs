//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "timer-keeper")]
#[command(about = "A local daemon that keeps named, categorized countdown timers ticking")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// File holding the persisted timers
    #[arg(short, long, default_value = "timers.json")]
    pub data_file: PathBuf,

    /// Keep timers in memory only, nothing is written to disk
    #[arg(long)]
    pub in_memory: bool,

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

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_local_file() {
        let config = Config::try_parse_from(["timer-keeper"]).unwrap();
        assert_eq!(config.address(), "127.0.0.1:20554");
        assert_eq!(config.data_file, PathBuf::from("timers.json"));
        assert!(!config.in_memory);
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "timer-keeper",
            "--port",
            "8080",
            "--data-file",
            "/tmp/t.json",
            "--in-memory",
            "-v",
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_file, PathBuf::from("/tmp/t.json"));
        assert!(config.in_memory);
        assert_eq!(config.log_level(), "debug");
    }
}

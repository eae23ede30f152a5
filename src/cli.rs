//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "geoblock")]
#[command(author, version, about = "Country-based inbound port blocking for Linux firewalls")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "/etc/geoblock/config.yaml", global = true)]
    pub config: PathBuf,

    /// Quiet mode (for cron/systemd timer)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Block countries on the given ports (creates sets and DROP rules)
    Block {
        /// Comma-separated two-letter country codes (e.g. cn,ru)
        #[arg(long, value_delimiter = ',', required = true)]
        countries: Vec<String>,

        /// Comma-separated TCP ports (default: configured ports, usually 22)
        #[arg(long, value_delimiter = ',')]
        ports: Vec<u16>,
    },

    /// Re-fetch zone files and refresh membership of every managed set
    Refresh,

    /// List managed country sets with their member counts
    List,

    /// Remove managed blocks (rules first, then their backing sets)
    Remove {
        /// Remove every managed set
        #[arg(long, conflicts_with = "select")]
        all: bool,

        /// Comma-separated 1-based indices from `geoblock list`
        #[arg(long, value_delimiter = ',')]
        select: Vec<usize>,
    },

    /// Interactive mode: numbered listing plus block/delete prompts
    Interactive,

    /// Show version
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_block() {
        let cli = Cli::try_parse_from([
            "geoblock", "block", "--countries", "cn,ru", "--ports", "22,80",
        ])
        .unwrap();
        match cli.command {
            Commands::Block { countries, ports } => {
                assert_eq!(countries, vec!["cn", "ru"]);
                assert_eq!(ports, vec![22, 80]);
            }
            _ => panic!("expected block subcommand"),
        }
    }

    #[test]
    fn test_block_requires_countries() {
        assert!(Cli::try_parse_from(["geoblock", "block"]).is_err());
    }

    #[test]
    fn test_remove_all_conflicts_with_select() {
        assert!(Cli::try_parse_from(["geoblock", "remove", "--all", "--select", "1"]).is_err());
        assert!(Cli::try_parse_from(["geoblock", "remove", "--select", "1,3"]).is_ok());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["geoblock", "refresh", "--quiet"]).unwrap();
        assert!(cli.quiet);
        assert!(!cli.verbose);
    }
}

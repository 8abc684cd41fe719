//! CLI commands for netprep

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::pipeline::{run_assign, run_build, run_resolve, AssignConfig, BuildConfig, ResolveConfig};

#[derive(Parser)]
#[command(name = "netprep")]
#[command(about = "Directed link and county preparation for regional roadway networks", long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve undirected edges into directed links with lanes and access
    Resolve {
        /// Undirected edge table (JSON array)
        #[arg(long)]
        edges: PathBuf,

        /// Output directory for links.json and resolve.lock.json
        #[arg(short, long)]
        outdir: PathBuf,

        /// Log every row of this endpoint pair after each stage (A,B; needs RUST_LOG=debug)
        #[arg(long, value_parser = parse_endpoint_pair)]
        trace: Option<(i64, i64)>,
    },

    /// Assign a county to every directed link and node
    Assign {
        /// Directed link table (JSON array)
        #[arg(long)]
        links: PathBuf,

        /// Node table (JSON array)
        #[arg(long)]
        nodes: PathBuf,

        /// County boundaries (JSON array of {county, boundary})
        #[arg(long)]
        regions: PathBuf,

        /// Output directory for links.json, nodes.json and assign.lock.json
        #[arg(short, long)]
        outdir: PathBuf,
    },

    /// Resolve and assign in one run
    Build {
        /// Undirected edge table (JSON array)
        #[arg(long)]
        edges: PathBuf,

        /// Node table (JSON array)
        #[arg(long)]
        nodes: PathBuf,

        /// County boundaries (JSON array of {county, boundary})
        #[arg(long)]
        regions: PathBuf,

        /// Output directory for links.json, nodes.json and build.lock.json
        #[arg(short, long)]
        outdir: PathBuf,

        /// Log every row of this endpoint pair after each stage (A,B; needs RUST_LOG=debug)
        #[arg(long, value_parser = parse_endpoint_pair)]
        trace: Option<(i64, i64)>,
    },
}

/// Parse "A,B" into a node id pair
pub fn parse_endpoint_pair(s: &str) -> std::result::Result<(i64, i64), String> {
    let (a, b) = s
        .split_once(',')
        .ok_or_else(|| format!("expected A,B but got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<i64>()
            .map_err(|e| format!("invalid node id '{}': {e}", v.trim()))
    };
    Ok((parse(a)?, parse(b)?))
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Resolve {
                edges,
                outdir,
                trace,
            } => {
                run_resolve(ResolveConfig {
                    edges,
                    outdir,
                    trace,
                })?;
            }
            Commands::Assign {
                links,
                nodes,
                regions,
                outdir,
            } => {
                run_assign(AssignConfig {
                    links,
                    nodes,
                    regions,
                    outdir,
                })?;
            }
            Commands::Build {
                edges,
                nodes,
                regions,
                outdir,
                trace,
            } => {
                run_build(BuildConfig {
                    edges,
                    nodes,
                    regions,
                    outdir,
                    trace,
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_pair_parses() {
        assert_eq!(parse_endpoint_pair("12,34"), Ok((12, 34)));
        assert_eq!(parse_endpoint_pair(" -1 , 7"), Ok((-1, 7)));
        assert!(parse_endpoint_pair("12").is_err());
        assert!(parse_endpoint_pair("a,b").is_err());
    }

    #[test]
    fn build_command_parses() {
        let cli = Cli::try_parse_from([
            "netprep", "build", "--edges", "e.json", "--nodes", "n.json", "--regions", "r.json",
            "-o", "out", "--trace", "1,2", "--log-json",
        ])
        .unwrap();
        assert!(cli.log_json);
        match cli.command {
            Commands::Build { trace, outdir, .. } => {
                assert_eq!(trace, Some((1, 2)));
                assert_eq!(outdir, PathBuf::from("out"));
            }
            _ => panic!("expected build"),
        }
    }
}

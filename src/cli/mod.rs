//! CLI Module
//!
//! Command-line interface for the Stratus metadata core.

pub mod catalog;
pub mod commands;

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};

/// Stratus - metadata and time synchronization core for satellite imagery
#[derive(Parser, Debug)]
#[command(name = "stratus")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a catalog and print the resulting layer stack
    #[command(name = "inspect")]
    Inspect {
        /// Path to the catalog file
        catalog: PathBuf,
    },

    /// Load a catalog and animate over its timelines
    #[command(name = "play")]
    Play {
        /// Path to the catalog file
        catalog: PathBuf,

        /// Number of animation steps to run
        #[arg(short, long, default_value_t = 8)]
        steps: usize,

        /// Step backwards through the timeline
        #[arg(short, long)]
        backwards: bool,

        /// Timebase: a dynamic layer index or 'most-frequent'
        /// (defaults to automatic selection)
        #[arg(short, long)]
        timebase: Option<TimebaseArg>,

        /// Timestamp matching policy
        #[arg(short, long, value_enum, default_value_t = MatcherArg::NearestPast)]
        matcher: MatcherArg,
    },

    /// Collect *.json catalog files under a directory into one catalog
    #[command(name = "scan")]
    Scan {
        /// Directory to walk
        dir: PathBuf,
    },
}

/// Timebase selection for `play`.
#[derive(Debug, Clone)]
pub enum TimebaseArg {
    /// Index into the dynamic layers, top of the stack first.
    Index(usize),

    /// The dynamic layer with the smallest mean time step.
    MostFrequent,
}

impl FromStr for TimebaseArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == "most-frequent" {
            return Ok(TimebaseArg::MostFrequent);
        }
        s.parse::<usize>().map(TimebaseArg::Index).map_err(|_| {
            format!(
                "expected a dynamic layer index or 'most-frequent', got '{}'",
                s
            )
        })
    }
}

/// Matching policy selection for `play`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MatcherArg {
    /// Greatest time step at or before the simulated time
    NearestPast,

    /// Closest time step in either direction, past wins ties
    Nearest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timebase_arg_parses_index_and_keyword() {
        assert!(matches!("3".parse::<TimebaseArg>(), Ok(TimebaseArg::Index(3))));
        assert!(matches!(
            "most-frequent".parse::<TimebaseArg>(),
            Ok(TimebaseArg::MostFrequent)
        ));
        assert!("nearest".parse::<TimebaseArg>().is_err());
    }
}

//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap, including
//! validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// casekeep - study-progress aggregation and case-content backup
///
/// Records speed-quiz attempts into per-law score documents and backs up
/// modified case modules into timestamped snapshots.
///
/// Examples:
///   casekeep record --law 民法 --article 196 --paragraph 1 --score 190 --correct
///   casekeep show --law 民法
///   casekeep backup --dry-run
///   casekeep backup --dest data/case-backups/manual
///   casekeep scan --output data/case-index.json
///   casekeep init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Repository root containing the content tree
    #[arg(long, global = true, default_value = ".", value_name = "DIR", env = "CASEKEEP_REPO_ROOT")]
    pub repo_root: PathBuf,

    /// Path to configuration file
    ///
    /// If not specified, looks for .casekeep.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the score-document directory
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Override the content root (relative to the repository root)
    #[arg(long, global = true, value_name = "DIR")]
    pub content_root: Option<String>,

    /// Override the default backup root (relative to the repository root)
    #[arg(long, global = true, value_name = "DIR")]
    pub backup_root: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available operations.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Record one quiz attempt into a law's score document
    Record {
        /// Law the attempt belongs to (e.g. 民法)
        #[arg(long, value_name = "NAME")]
        law: String,

        /// Article number (numeric string)
        #[arg(long, value_name = "NUM")]
        article: String,

        /// Paragraph number (numeric string)
        #[arg(long, default_value = "1", value_name = "NUM")]
        paragraph: String,

        /// Score earned by the attempt
        #[arg(long, value_name = "SCORE")]
        score: f64,

        /// Mark the attempt as correct
        #[arg(long)]
        correct: bool,

        /// Module identifier to associate with the article
        #[arg(long, value_name = "ID")]
        module: Option<String>,
    },

    /// Print progress summaries for one law or all laws
    Show {
        /// Law to summarize (all laws when omitted)
        #[arg(long, value_name = "NAME")]
        law: Option<String>,

        /// Also list per-article aggregates
        #[arg(long)]
        detailed: bool,
    },

    /// Back up changed case modules into a snapshot directory
    Backup {
        /// Destination directory (timestamped directory under the backup
        /// root when omitted)
        #[arg(long, value_name = "DIR")]
        dest: Option<PathBuf>,

        /// Compute and print the mapping without copying anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Build the case-module index from the content root
    Scan {
        /// Write the index as JSON to this file instead of printing it
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Generate a default .casekeep.toml configuration file
    InitConfig,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if !self.repo_root.exists() {
            return Err(format!(
                "Repository root does not exist: {}",
                self.repo_root.display()
            ));
        }
        if !self.repo_root.is_dir() {
            return Err(format!(
                "Repository root is not a directory: {}",
                self.repo_root.display()
            ));
        }

        if let Command::Record { score, .. } = &self.command {
            if *score < 0.0 || !score.is_finite() {
                return Err("Score must be a non-negative number".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(command: Command) -> Args {
        Args {
            command,
            repo_root: PathBuf::from("."),
            config: None,
            data_dir: None,
            content_root: None,
            backup_root: None,
            verbose: false,
            quiet: false,
        }
    }

    fn record_command(score: f64) -> Command {
        Command::Record {
            law: "民法".to_string(),
            article: "196".to_string(),
            paragraph: "1".to_string(),
            score,
            correct: true,
            module: None,
        }
    }

    #[test]
    fn test_validation_ok() {
        let args = make_args(record_command(190.0));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_negative_score() {
        let args = make_args(record_command(-1.0));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(record_command(1.0));
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_repo_root() {
        let mut args = make_args(Command::InitConfig);
        args.repo_root = PathBuf::from("/does/not/exist");
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Command::InitConfig);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}

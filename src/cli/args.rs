//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::FailurePolicy;

/// Hotspec shared compile broker CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: hotspec.toml)
    #[arg(short = 'C', long, global = true, default_value = "hotspec.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the compile broker
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        args: ServeArgs,
    },

    /// Request a compiled file from a running broker
    #[command(visible_alias = "p")]
    Preprocess {
        #[command(flatten)]
        args: PreprocessArgs,
    },
}

/// Serve command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Enable file watching for rerun notifications
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub watch: Option<bool>,

    /// How a failed compilation affects other cached entries
    #[arg(long, value_enum)]
    pub failure_policy: Option<FailurePolicy>,

    /// Maximum number of changed files compiled eagerly at startup
    #[arg(short, long)]
    pub eager_limit: Option<usize>,
}

/// Preprocess command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct PreprocessArgs {
    /// Source file to compile (may be percent-encoded)
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Where the broker writes the compiled output
    /// (default: system temp dir + file name)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Stay connected and recompile on every rerun notification
    #[arg(short, long)]
    pub watch: bool,

    /// Request timeout in milliseconds (0 disables)
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

#[allow(unused)]
impl Cli {
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
    pub const fn is_preprocess(&self) -> bool {
        matches!(self.command, Commands::Preprocess { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::parse_from(["hotspec", "serve", "--failure-policy", "entry", "-e", "3"]);
        let Commands::Serve { args } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.failure_policy, Some(FailurePolicy::Entry));
        assert_eq!(args.eager_limit, Some(3));
        assert_eq!(args.watch, None);
    }

    #[test]
    fn test_parse_serve_watch_flag() {
        let cli = Cli::parse_from(["hotspec", "serve", "--watch", "false"]);
        let Commands::Serve { args } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.watch, Some(false));
    }

    #[test]
    fn test_parse_preprocess() {
        let cli = Cli::parse_from([
            "hotspec",
            "-V",
            "preprocess",
            "tests/my%20spec.js",
            "-o",
            "/tmp/out.js",
            "--watch",
        ]);
        assert!(cli.verbose);
        assert!(cli.is_preprocess());
        let Commands::Preprocess { args } = cli.command else {
            panic!("expected preprocess");
        };
        assert_eq!(args.file, "tests/my%20spec.js");
        assert_eq!(args.output, Some(PathBuf::from("/tmp/out.js")));
        assert!(args.watch);
        assert_eq!(args.timeout, None);
    }
}

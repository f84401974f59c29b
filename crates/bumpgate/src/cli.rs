use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "bumpgate",
    version,
    about = "Check changed plugins for missing manifest version bumps"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Color mode
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorMode,

    /// Repository to inspect (defaults to the one containing the current directory)
    #[arg(long, global = true)]
    pub repo: Option<String>,

    /// Directory holding the plugins, relative to the repository root
    /// (overrides pluginRoot from .claude-plugin/marketplace.json)
    #[arg(long, global = true)]
    pub plugin_root: Option<String>,

    /// Manifest path inside each plugin directory
    #[arg(long, global = true)]
    pub manifest: Option<String>,

    /// Log filter, e.g. "debug" or "bumpgate_core=trace" (RUST_LOG wins)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

/// Selects the change set to inspect.
#[derive(Args, Debug, Clone, Default)]
pub struct CompareArgs {
    /// Compare the staged index against HEAD
    #[arg(long)]
    pub staged: bool,

    /// Compare HEAD against its merge base with this ref
    #[arg(long, value_name = "REF")]
    pub branch: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check every changed plugin and fail if a version bump is missing
    Check {
        #[command(flatten)]
        compare: CompareArgs,

        /// Only check this plugin
        plugin: Option<String>,

        /// Maximum concurrent git queries
        #[arg(long, default_value_t = bumpgate_core::check::DEFAULT_JOBS)]
        jobs: usize,

        /// Per-query timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },

    /// List changed plugins, or print one plugin's diff
    Changed {
        #[command(flatten)]
        compare: CompareArgs,

        /// Print the unified diff of this plugin's changed files
        plugin: Option<String>,
    },

    /// Decide whether a manifest diff needs a version bump (prints YES or NO)
    Evaluate {
        /// Read the diff from this file instead of stdin
        #[arg(long)]
        file: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_check_flags() {
        let cli = Cli::parse_from(["bumpgate", "check", "--branch", "origin/main", "alpha"]);
        let Commands::Check {
            compare, plugin, jobs, ..
        } = cli.command
        else {
            panic!("expected check");
        };
        assert_eq!(compare.branch.as_deref(), Some("origin/main"));
        assert!(!compare.staged);
        assert_eq!(plugin.as_deref(), Some("alpha"));
        assert_eq!(jobs, 4);
    }
}

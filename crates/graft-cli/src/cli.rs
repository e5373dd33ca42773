use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "graft",
    about = "graft: rewrite the history of content-addressed repositories",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Rewrite the history stored in a repository bundle
    Rewrite(RewriteArgs),
    /// List the refs of a repository bundle
    Refs(RefsArgs),
    /// Show commit history starting at a ref
    Log(LogArgs),
}

#[derive(Args)]
pub struct RewriteArgs {
    /// Repository bundle to read
    pub bundle: PathBuf,
    /// Where to write the result. Defaults to the input when rewriting in place
    #[arg(short, long, required_unless_present = "overwrite")]
    pub output: Option<PathBuf>,
    /// Rewrite in place: rename and delete refs, keep old objects
    #[arg(long)]
    pub overwrite: bool,
    /// Make parent paths part of the entry cache key
    #[arg(long)]
    pub path_sensitive: bool,
    /// Rewrite root trees on a worker pool first
    #[arg(long)]
    pub concurrent: bool,
    /// Pre-pass worker count (0 = one per core)
    #[arg(long)]
    pub threads: Option<usize>,
    /// TOML configuration file; flags override it
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Drop files with this name, or at this path when it contains `/`
    #[arg(long = "drop", value_name = "PATH")]
    pub drops: Vec<String>,
    /// svn-to-git progress log (`progress SVN r<N> branch master = :<mark>`)
    #[arg(long, requires = "object_mapping")]
    pub svn_mapping: Option<PathBuf>,
    /// svn-to-git marks file (`:<mark> <commit-id>`)
    #[arg(long, requires = "svn_mapping")]
    pub object_mapping: Option<PathBuf>,
}

#[derive(Args)]
pub struct RefsArgs {
    pub bundle: PathBuf,
}

#[derive(Args)]
pub struct LogArgs {
    pub bundle: PathBuf,
    /// Ref to start from
    #[arg(long = "ref", default_value = "HEAD")]
    pub reference: String,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub oneline: bool,
}

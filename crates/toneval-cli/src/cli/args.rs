use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "toneval",
    version,
    about = "Measure how prompt tone, reasoning strategy and critique severity change LLM accuracy"
)]
pub struct Cli {
    /// Debug-level logs (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run every condition over the sampled datasets
    Run(RunArgs),
    /// Accuracy tables and bootstrap comparisons from a finished run
    Analyze(AnalyzeArgs),
    /// Summarize the response cache log
    CacheStats(CacheStatsArgs),
    /// Row counts, columns, missing values and sample rows of both datasets
    DataSummary(DataSummaryArgs),
    Version,
}

#[derive(Parser, Clone, Debug)]
pub struct RunArgs {
    /// GSM8K split: a directory containing test.jsonl, or a .jsonl file
    #[arg(long, default_value = "datasets/gsm8k")]
    pub gsm8k_path: PathBuf,

    /// ARC-Challenge split: a directory containing test.jsonl, or a .jsonl file
    #[arg(long, default_value = "datasets/ai2_arc")]
    pub arc_path: PathBuf,

    /// GSM8K examples to sample (0 skips the dataset)
    #[arg(long, default_value_t = 100)]
    pub gsm8k_n: usize,

    /// ARC examples to sample (0 skips the dataset)
    #[arg(long, default_value_t = 100)]
    pub arc_n: usize,

    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4.1")]
    pub model: String,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Default output token budget; conditions may override it
    #[arg(long, default_value_t = 256)]
    pub max_tokens: u32,

    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,

    /// YAML conditions file (default: the built-in condition grid)
    #[arg(long)]
    pub conditions: Option<PathBuf>,

    /// (condition, example) pairs in flight at once
    #[arg(long, default_value_t = 1)]
    pub parallel: usize,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub base_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    /// Answer from a local offline transport instead of the endpoint (no credential needed)
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct AnalyzeArgs {
    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,

    /// Condition every other condition is compared against
    #[arg(long, default_value = "direct-neutral")]
    pub baseline: String,

    #[arg(long, default_value_t = 2000)]
    pub n_boot: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Parser, Clone, Debug)]
pub struct CacheStatsArgs {
    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,

    /// Explicit cache log path (overrides --results-dir)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct DataSummaryArgs {
    #[arg(long, default_value = "datasets/gsm8k")]
    pub gsm8k_path: PathBuf,

    #[arg(long, default_value = "datasets/ai2_arc")]
    pub arc_path: PathBuf,

    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,

    /// Leading rows written to <dataset>_samples.json
    #[arg(long, default_value_t = 3)]
    pub samples: usize,
}

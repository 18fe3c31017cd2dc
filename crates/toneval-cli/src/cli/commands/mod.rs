use super::args::*;

pub mod analyze;
pub mod cache_stats;
pub mod data_summary;
pub(crate) mod run;

use crate::exit_codes::SUCCESS;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => run::run(args).await,
        Command::Analyze(args) => analyze::run(args),
        Command::CacheStats(args) => cache_stats::run(args),
        Command::DataSummary(args) => data_summary::run(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}

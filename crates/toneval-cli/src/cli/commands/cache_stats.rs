use super::super::args::CacheStatsArgs;
use crate::exit_codes;
use toneval_core::cache::ResponseCache;
use toneval_core::report::ResultsLayout;

pub fn run(args: CacheStatsArgs) -> anyhow::Result<i32> {
    let path = args
        .cache
        .clone()
        .unwrap_or_else(|| ResultsLayout::new(&args.results_dir).cache_log());
    let cache = ResponseCache::load(&path)?;
    let stats = cache.stats();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(exit_codes::SUCCESS);
    }

    println!("cache: {}", path.display());
    println!("records: {}", stats.records);
    for (model, n) in &stats.by_model {
        println!("  {model}: {n}");
    }
    println!(
        "tokens: input={} output={} total={}",
        stats.input_tokens, stats.output_tokens, stats.total_tokens
    );
    Ok(exit_codes::SUCCESS)
}

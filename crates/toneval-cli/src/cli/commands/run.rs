use super::super::args::RunArgs;
use crate::exit_codes;
use std::sync::Arc;
use std::time::Duration;
use toneval_core::cache::ResponseCache;
use toneval_core::client::{now_iso, LlmClient};
use toneval_core::config::{self, Condition};
use toneval_core::dataset::{self, Dataset, DatasetKind};
use toneval_core::engine::retry::{CallExecutor, RetryPolicy};
use toneval_core::engine::runner::ExperimentDriver;
use toneval_core::providers::llm::fake::FakeTransport;
use toneval_core::providers::llm::openai::OpenAIResponses;
use toneval_core::providers::llm::CompletionTransport;
use toneval_core::report::progress::{ProgressEvent, ProgressSink};
use toneval_core::report::summary::{RunMetadata, RunSummary};
use toneval_core::report::{write_json_pretty, write_records, ResultsLayout};
use tracing::info;

const PROGRESS_EVERY: usize = 10;

fn load_conditions(args: &RunArgs) -> anyhow::Result<Vec<Condition>> {
    match &args.conditions {
        Some(path) => Ok(config::load_conditions(path)?),
        None => Ok(config::default_conditions()),
    }
}

fn load_datasets(args: &RunArgs) -> anyhow::Result<Vec<Dataset>> {
    let mut out = Vec::new();
    if args.gsm8k_n > 0 {
        out.push(dataset::load_gsm8k(&args.gsm8k_path)?.sample(args.gsm8k_n, args.seed));
    }
    if args.arc_n > 0 {
        out.push(dataset::load_arc(&args.arc_path)?.sample(args.arc_n, args.seed));
    }
    Ok(out)
}

fn build_transport(args: &RunArgs) -> anyhow::Result<Arc<dyn CompletionTransport>> {
    if args.dry_run {
        return Ok(Arc::new(FakeTransport::echo()));
    }
    let transport = OpenAIResponses::from_env(&args.base_url, Duration::from_secs(args.timeout_secs))?;
    Ok(Arc::new(transport))
}

fn progress_sink() -> ProgressSink {
    Arc::new(|ev: ProgressEvent| {
        if ev.is_milestone(PROGRESS_EVERY) {
            info!(done = ev.done, total = ev.total, "progress");
        }
    })
}

pub async fn run(args: RunArgs) -> anyhow::Result<i32> {
    // Everything that can be misconfigured is checked before the first request.
    let conditions = load_conditions(&args)?;
    let datasets = load_datasets(&args)?;
    let transport = build_transport(&args)?;

    let layout = ResultsLayout::new(&args.results_dir);
    let cache_path = if args.dry_run {
        layout.dry_run_cache_log()
    } else {
        layout.cache_log()
    };
    let cache = Arc::new(ResponseCache::load(&cache_path)?);
    info!(
        cache = %cache_path.display(),
        records = cache.len(),
        provider = transport.provider_name(),
        "response cache loaded"
    );

    let count = |kind: DatasetKind| {
        datasets
            .iter()
            .filter(|d| d.kind == kind)
            .map(Dataset::len)
            .sum::<usize>()
    };
    let metadata = RunMetadata {
        timestamp: now_iso(),
        model: args.model.clone(),
        seed: args.seed,
        gsm8k_n: count(DatasetKind::Gsm8k),
        arc_n: count(DatasetKind::Arc),
        max_tokens: args.max_tokens,
        parallel: args.parallel.max(1),
        provider: transport.provider_name().to_string(),
        conditions: conditions.iter().map(|c| c.spec.clone()).collect(),
    };
    write_json_pretty(&layout.metadata(), &metadata)?;

    let client = LlmClient::new(cache, CallExecutor::new(transport, RetryPolicy::default()));
    let driver = ExperimentDriver::new(Arc::new(client), &args.model, args.max_tokens)
        .with_parallel(args.parallel);
    let outcome = driver.run(&datasets, &conditions, Some(progress_sink())).await?;

    write_records(&layout.records(), &outcome.records)?;
    let kinds: Vec<DatasetKind> = datasets.iter().map(|d| d.kind).collect();
    let names: Vec<String> = conditions.iter().map(|c| c.name.clone()).collect();
    let summary = RunSummary::build(&outcome.records, &kinds, &names);
    write_json_pretty(&layout.summary(), &summary)?;

    for (key, entry) in &summary.entries {
        println!(
            "{key:<40} n={:<5} accuracy={:.3} failed={}",
            entry.n, entry.accuracy, entry.failed
        );
    }
    info!(
        records = outcome.records.len(),
        failed = outcome.failed_total(),
        output = %layout.records().display(),
        "run complete"
    );

    if outcome.failed_total() > 0 {
        Ok(exit_codes::EXAMPLES_FAILED)
    } else {
        Ok(exit_codes::SUCCESS)
    }
}

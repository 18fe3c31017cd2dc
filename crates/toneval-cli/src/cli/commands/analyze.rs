use super::super::args::AnalyzeArgs;
use crate::exit_codes;
use toneval_core::report::analysis::{analyze, AnalysisOptions};
use toneval_core::report::{read_records, ResultsLayout};
use tracing::info;

pub fn run(args: AnalyzeArgs) -> anyhow::Result<i32> {
    let layout = ResultsLayout::new(&args.results_dir);
    let records_path = layout.records();
    if !records_path.exists() {
        anyhow::bail!(
            "run experiments first: {} not found",
            records_path.display()
        );
    }

    let records = read_records(&records_path)?;
    let opts = AnalysisOptions {
        baseline: args.baseline,
        resamples: args.n_boot,
        seed: args.seed,
        ..Default::default()
    };
    let analysis = analyze(&records, &opts);
    analysis.write_accuracy_csv(&layout.accuracy_csv())?;
    analysis.write_diff_csv(&layout.diff_csv())?;

    for row in &analysis.accuracy {
        println!(
            "{:<8} {:<28} n={:<5} accuracy={:.3}",
            row.dataset, row.condition, row.n, row.accuracy
        );
    }
    for row in &analysis.diffs {
        let ci = match (row.ci_low, row.ci_high) {
            (Some(lo), Some(hi)) => format!("[{lo:+.3}, {hi:+.3}]"),
            _ => "n/a".to_string(),
        };
        println!(
            "{:<8} {:<28} diff_vs_{}={:+.3} ci95={}",
            row.dataset, row.condition, opts.baseline, row.diff_vs_direct, ci
        );
    }
    info!(
        records = records.len(),
        accuracy_csv = %layout.accuracy_csv().display(),
        diff_csv = %layout.diff_csv().display(),
        "analysis written"
    );
    Ok(exit_codes::SUCCESS)
}

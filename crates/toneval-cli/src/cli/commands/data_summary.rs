use super::super::args::DataSummaryArgs;
use crate::exit_codes;
use toneval_core::dataset::profile::{profile_split, DataSummary};
use toneval_core::dataset::DatasetKind;
use toneval_core::report::{write_json_pretty, ResultsLayout};
use tracing::info;

pub fn run(args: DataSummaryArgs) -> anyhow::Result<i32> {
    let summary = DataSummary {
        gsm8k: profile_split(&args.gsm8k_path, args.samples)?,
        arc: profile_split(&args.arc_path, args.samples)?,
    };

    let layout = ResultsLayout::new(&args.results_dir);
    write_json_pretty(&layout.data_summary(), &summary)?;
    for kind in [DatasetKind::Gsm8k, DatasetKind::Arc] {
        let profile = summary.get(kind);
        write_json_pretty(&layout.dataset_samples(kind), &profile.samples)?;
        println!(
            "{:<6} rows={:<6} columns={}",
            kind.as_str(),
            profile.rows,
            profile.columns.join(",")
        );
    }
    info!(output = %layout.data_summary().display(), "data summary written");
    Ok(exit_codes::SUCCESS)
}

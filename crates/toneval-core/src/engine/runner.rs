use crate::client::LlmClient;
use crate::config::Condition;
use crate::dataset::{Dataset, DatasetKind, Example};
use crate::engine::record::ConditionRecord;
use crate::errors::ErrorKind;
use crate::pipeline::PipelineInputs;
use crate::report::progress::{ProgressEvent, ProgressSink};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Runs every condition over every example of every dataset.
pub struct ExperimentDriver {
    client: Arc<LlmClient>,
    model: String,
    default_max_tokens: u32,
    parallel: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureCount {
    pub dataset: DatasetKind,
    pub condition: String,
    pub failed: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Ordered by (dataset, condition, example index) in input order.
    pub records: Vec<ConditionRecord>,
}

impl RunOutcome {
    pub fn failed_total(&self) -> usize {
        self.records.iter().filter(|r| r.is_failed()).count()
    }

    /// One entry per (dataset, condition), in run order.
    pub fn failure_counts(&self) -> Vec<FailureCount> {
        let mut out: Vec<FailureCount> = Vec::new();
        for rec in &self.records {
            let slot = match out
                .iter_mut()
                .find(|f| f.dataset == rec.dataset && f.condition == rec.condition)
            {
                Some(slot) => slot,
                None => {
                    out.push(FailureCount {
                        dataset: rec.dataset,
                        condition: rec.condition.clone(),
                        failed: 0,
                        total: 0,
                    });
                    let last = out.len() - 1;
                    &mut out[last]
                }
            };
            slot.total += 1;
            if rec.is_failed() {
                slot.failed += 1;
            }
        }
        out
    }
}

struct Job {
    order: (usize, usize, usize),
    dataset: DatasetKind,
    condition: Condition,
    example: Example,
}

impl ExperimentDriver {
    pub fn new(client: Arc<LlmClient>, model: impl Into<String>, default_max_tokens: u32) -> Self {
        Self {
            client,
            model: model.into(),
            default_max_tokens,
            parallel: 1,
        }
    }

    /// Number of (condition, example) pairs in flight at once. 1 is strictly sequential.
    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel.max(1);
        self
    }

    pub fn client(&self) -> &LlmClient {
        &self.client
    }

    /// Example failures become `failed` records and never stop the batch.
    pub async fn run(
        &self,
        datasets: &[Dataset],
        conditions: &[Condition],
        progress: Option<ProgressSink>,
    ) -> anyhow::Result<RunOutcome> {
        let mut jobs = Vec::new();
        for (d, ds) in datasets.iter().enumerate() {
            for (c, cond) in conditions.iter().enumerate() {
                for (i, ex) in ds.examples.iter().enumerate() {
                    jobs.push(Job {
                        order: (d, c, i),
                        dataset: ds.kind,
                        condition: cond.clone(),
                        example: ex.clone(),
                    });
                }
            }
        }

        let total = jobs.len();
        info!(
            total,
            conditions = conditions.len(),
            parallel = self.parallel,
            model = %self.model,
            "starting experiment run"
        );

        let sem = Arc::new(Semaphore::new(self.parallel));
        let mut join_set = JoinSet::new();
        let mut pending = HashMap::new();

        for job in jobs {
            let permit = sem.clone().acquire_owned().await?;
            let client = self.client.clone();
            let model = self.model.clone();
            let max_tokens = job.condition.max_tokens_or(self.default_max_tokens);
            pending.insert(
                job.order,
                (job.dataset, job.condition.name.clone(), job.example.clone()),
            );
            join_set.spawn(async move {
                let _permit = permit;
                let record = run_one(&client, &model, &job, max_tokens).await;
                (job.order, record)
            });
        }

        let mut rows = Vec::with_capacity(total);
        let mut aborted = None;
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok((order, record)) => {
                    pending.remove(&order);
                    rows.push((order, record));
                }
                Err(e) => {
                    error!(error = %e, "experiment task aborted");
                    aborted = Some(e.to_string());
                    continue;
                }
            }
            if let Some(ref sink) = progress {
                sink(ProgressEvent {
                    done: rows.len(),
                    total,
                });
            }
        }

        // Jobs whose task died never produced a record of their own.
        if let Some(reason) = aborted {
            for (order, (dataset, condition, example)) in pending {
                rows.push((
                    order,
                    ConditionRecord::failed(
                        dataset,
                        &condition,
                        order.2,
                        &example,
                        ErrorKind::Other,
                        format!("task error: {reason}"),
                    ),
                ));
            }
        }

        // Deterministic order regardless of completion order.
        rows.sort_by_key(|(order, _)| *order);
        let outcome = RunOutcome {
            records: rows.into_iter().map(|(_, r)| r).collect(),
        };

        for f in outcome.failure_counts().iter().filter(|f| f.failed > 0) {
            warn!(
                dataset = %f.dataset,
                condition = %f.condition,
                failed = f.failed,
                total = f.total,
                "condition had failed examples"
            );
        }
        Ok(outcome)
    }
}

async fn run_one(client: &LlmClient, model: &str, job: &Job, max_tokens: u32) -> ConditionRecord {
    let cond = &job.condition;
    let index = job.order.2;
    let inputs = PipelineInputs {
        model,
        tone: cond.tone,
        dataset: job.dataset,
        example: &job.example,
        max_tokens,
        temperature: cond.temperature,
    };

    match cond.strategy.run(client, &inputs).await {
        Ok(output) => {
            let rec = ConditionRecord::completed(job.dataset, &cond.name, index, &job.example, output);
            debug!(
                dataset = %job.dataset,
                condition = %cond.name,
                index,
                correct = rec.correct,
                cached = rec.cached,
                "example done"
            );
            rec
        }
        Err(e) => {
            warn!(
                dataset = %job.dataset,
                condition = %cond.name,
                index,
                kind = e.kind().as_str(),
                error = %e,
                "example failed"
            );
            ConditionRecord::from_error(job.dataset, &cond.name, index, &job.example, &e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use crate::config::default_conditions;
    use crate::engine::retry::{CallExecutor, RetryPolicy};
    use crate::errors::LlmError;
    use crate::providers::llm::fake::FakeTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn gsm(n: usize) -> Dataset {
        Dataset {
            kind: DatasetKind::Gsm8k,
            examples: (0..n)
                .map(|i| Example {
                    question: format!("What is {i} + 0?"),
                    choices: None,
                    gold: i.to_string(),
                })
                .collect(),
        }
    }

    fn driver(fake: Arc<FakeTransport>, dir: &std::path::Path) -> ExperimentDriver {
        let cache = Arc::new(ResponseCache::load(dir.join("cache.jsonl")).unwrap());
        let policy = RetryPolicy {
            max_attempts: 2,
            base: Duration::from_millis(1),
            cap: Duration::from_millis(1),
        };
        let client = LlmClient::new(cache, CallExecutor::new(fake, policy));
        ExperimentDriver::new(Arc::new(client), "m", 256)
    }

    #[tokio::test]
    async fn one_failing_example_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeTransport::with_responder(|p| {
            let user = p.user_content().unwrap_or_default();
            if user.contains("What is 1 + 0?") {
                Err(LlmError::Rejected {
                    status: 400,
                    message: "content filter".into(),
                })
            } else {
                Ok("Final: 0".into())
            }
        }));
        let conds = default_conditions()[..1].to_vec();
        let outcome = driver(fake, dir.path())
            .run(&[gsm(3)], &conds, None)
            .await
            .unwrap();

        assert_eq!(outcome.records.len(), 3);
        assert!(outcome.records[0].correct);
        assert!(outcome.records[1].is_failed());
        assert!(!outcome.records[1].correct);
        assert_eq!(
            outcome.records[1].error.as_ref().unwrap().kind,
            ErrorKind::ProviderRejected
        );
        assert!(!outcome.records[2].is_failed());
        let counts = outcome.failure_counts();
        assert_eq!(counts.len(), 1);
        assert_eq!((counts[0].failed, counts[0].total), (1, 3));
        assert_eq!(outcome.failed_total(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_runs_keep_deterministic_order() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeTransport::echo().with_latency(Duration::from_millis(5)));
        let conds = default_conditions();
        let seen = Arc::new(AtomicUsize::new(0));
        let sink_seen = seen.clone();
        let sink: ProgressSink = Arc::new(move |_ev| {
            sink_seen.fetch_add(1, Ordering::SeqCst);
        });

        let datasets = [gsm(4)];
        let outcome = driver(fake, dir.path())
            .with_parallel(8)
            .run(&datasets, &conds, Some(sink))
            .await
            .unwrap();

        assert_eq!(outcome.records.len(), conds.len() * 4);
        assert_eq!(seen.load(Ordering::SeqCst), conds.len() * 4);
        let keys: Vec<(String, usize)> = outcome
            .records
            .iter()
            .map(|r| (r.condition.clone(), r.index))
            .collect();
        let mut expected = Vec::new();
        for c in &conds {
            for i in 0..4 {
                expected.push((c.name.clone(), i));
            }
        }
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn rerun_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeTransport::echo());
        let conds = default_conditions();
        let first = driver(fake.clone(), dir.path())
            .run(&[gsm(2)], &conds, None)
            .await
            .unwrap();
        let calls = fake.calls();
        assert!(calls > 0);

        let again = driver(fake.clone(), dir.path())
            .run(&[gsm(2)], &conds, None)
            .await
            .unwrap();
        assert_eq!(fake.calls(), calls);
        assert!(again.records.iter().all(|r| r.cached));
        let preds = |o: &RunOutcome| o.records.iter().map(|r| r.prediction.clone()).collect::<Vec<_>>();
        assert_eq!(preds(&first), preds(&again));
    }
}

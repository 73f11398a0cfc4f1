use crate::config::{BatchConfig, RetryConfig};
use crate::error::{ExecutionError, NodeError};
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{info, warn};

use super::context::Context;
use super::node::{Stage, StageFailure};
use super::retry::{retry_with_backoff, Attempt, AttemptInfo, RetryFailure};

/// An item that could not be completed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFailure {
    pub key: String,
    pub attempts: u32,
    pub error: String,
}

/// Per-item result, in the same position as the prepared item
#[derive(Debug)]
pub struct ItemOutcome<T> {
    pub key: String,
    pub result: Result<T, ItemFailure>,
}

/// A node that runs `execute_item` once per prepared item
///
/// Items run concurrently up to `policy().concurrency`, each with its own
/// retry budget. Outcomes reach `finalize` in prepare order no matter when
/// they complete. A failing item is recorded and the rest carry on, unless
/// `fail_fast` is set, in which case outstanding items are cancelled and the
/// stage fails naming the item.
#[async_trait]
pub trait BatchNode: Send + Sync + 'static {
    type Item: Send + Sync + Debug + 'static;
    type Output: Send + 'static;

    fn name(&self) -> &str;

    fn retry(&self) -> &RetryConfig;

    fn policy(&self) -> &BatchConfig;

    fn prepare(&self, ctx: &Context) -> Result<Vec<Self::Item>, NodeError>;

    /// Stable identifier used in logs and failures
    fn item_key(&self, item: &Self::Item) -> String;

    async fn execute_item(&self, item: &Self::Item, attempt: AttemptInfo)
        -> Attempt<Self::Output>;

    fn fallback_item(
        &self,
        _item: &Self::Item,
        error: ExecutionError,
    ) -> Result<Self::Output, ExecutionError> {
        Err(error)
    }

    fn finalize(
        &self,
        ctx: &mut Context,
        outcomes: Vec<ItemOutcome<Self::Output>>,
    ) -> Result<String, NodeError>;
}

async fn run_item<B: BatchNode>(
    node: &B,
    key: &str,
    item: &B::Item,
) -> Result<B::Output, ItemFailure> {
    let label = format!("{} [{}]", node.name(), key);
    let failure = |attempts: u32, error: &ExecutionError| ItemFailure {
        key: key.to_string(),
        attempts,
        error: error.to_string(),
    };

    match retry_with_backoff(node.retry(), &label, |info| node.execute_item(item, info)).await {
        Ok((output, _)) => Ok(output),
        Err(RetryFailure::Fatal { attempts, error }) => Err(failure(attempts, &error)),
        Err(RetryFailure::Exhausted { attempts, error }) => node
            .fallback_item(item, error)
            .map_err(|e| failure(attempts, &e)),
    }
}

/// Adapts a `BatchNode` to the `Stage` interface
pub struct BatchStage<B>(pub Arc<B>);

impl<B> BatchStage<B> {
    pub fn new(node: B) -> Self {
        Self(Arc::new(node))
    }
}

#[async_trait]
impl<B: BatchNode> Stage for BatchStage<B> {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn run(&self, ctx: &mut Context) -> Result<String, StageFailure> {
        let node = &self.0;
        let items = node
            .prepare(ctx)
            .map_err(|e| StageFailure::new("<prepare>", e))?;
        let total = items.len();
        let described = format!("{} items", total);

        if total == 0 {
            info!("{}: nothing to do", node.name());
            return node
                .finalize(ctx, Vec::new())
                .map_err(|e| StageFailure::new(described, e));
        }

        let policy = node.policy().clone();
        let concurrency = policy.concurrency.max(1);
        info!(
            "{}: running {} items with concurrency {}",
            node.name(),
            total,
            concurrency
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let keys: Vec<String> = items.iter().map(|item| node.item_key(item)).collect();
        let launch_delay = Duration::from_millis(policy.launch_delay_ms);

        let mut futures = FuturesUnordered::new();
        let mut aborts = Vec::with_capacity(total);

        for (position, item) in items.into_iter().enumerate() {
            // Small delay between launches to avoid burst rate limits
            if position > 0 && launch_delay > Duration::ZERO {
                sleep(launch_delay).await;
            }

            let node = Arc::clone(node);
            let semaphore = Arc::clone(&semaphore);
            let key = keys[position].clone();

            let handle = tokio::spawn(async move {
                match semaphore.acquire_owned().await {
                    // hold until done
                    Ok(_permit) => run_item(node.as_ref(), &key, &item).await,
                    Err(e) => Err(ItemFailure {
                        key,
                        attempts: 0,
                        error: e.to_string(),
                    }),
                }
            });
            aborts.push(handle.abort_handle());
            futures.push(async move { (position, handle.await) });
        }

        let mut slots: Vec<Option<ItemOutcome<B::Output>>> = (0..total).map(|_| None).collect();
        let mut aborted: Option<ItemFailure> = None;

        while let Some((position, joined)) = futures.next().await {
            let key = keys[position].clone();
            let result = match joined {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => Err(ItemFailure {
                    key: key.clone(),
                    attempts: 1,
                    error: format!("task panicked: {}", e),
                }),
            };

            if let Err(failure) = &result {
                warn!(
                    "{}: item {} failed after {} attempts: {}",
                    node.name(),
                    failure.key,
                    failure.attempts,
                    failure.error
                );
                if policy.fail_fast {
                    for handle in &aborts {
                        handle.abort();
                    }
                    aborted = Some(failure.clone());
                    break;
                }
            }

            slots[position] = Some(ItemOutcome { key, result });
        }

        if let Some(failure) = aborted {
            return Err(StageFailure::new(
                failure.key.clone(),
                NodeError::Item {
                    index: failure.key,
                    attempts: failure.attempts,
                    message: failure.error,
                },
            ));
        }

        let outcomes: Vec<_> = slots.into_iter().flatten().collect();
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        info!(
            "{}: {} succeeded, {} failed",
            node.name(),
            outcomes.len() - failed,
            failed
        );

        node.finalize(ctx, outcomes)
            .map_err(|e| StageFailure::new(described, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    struct Job {
        key: String,
        delay_ms: u64,
        failures: u32,
    }

    fn job(key: &str, delay_ms: u64, failures: u32) -> Job {
        Job {
            key: key.to_string(),
            delay_ms,
            failures,
        }
    }

    /// Echoes each job key after a delay, failing the first `failures` attempts
    struct Echo {
        jobs: Vec<Job>,
        retry: RetryConfig,
        policy: BatchConfig,
        calls: Mutex<HashMap<String, u32>>,
        running: AtomicUsize,
        peak: AtomicUsize,
        completed: AtomicU32,
        outcomes: Mutex<Vec<(String, Result<String, ItemFailure>)>>,
    }

    impl Echo {
        fn new(jobs: Vec<Job>, concurrency: usize, max_retries: u32, fail_fast: bool) -> Self {
            let mut retry = RetryConfig::once();
            retry.max_retries = max_retries;
            Self {
                jobs,
                retry,
                policy: BatchConfig {
                    concurrency,
                    fail_fast,
                    launch_delay_ms: 0,
                },
                calls: Mutex::new(HashMap::new()),
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                completed: AtomicU32::new(0),
                outcomes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BatchNode for Echo {
        type Item = Job;
        type Output = String;

        fn name(&self) -> &str {
            "echo"
        }

        fn retry(&self) -> &RetryConfig {
            &self.retry
        }

        fn policy(&self) -> &BatchConfig {
            &self.policy
        }

        fn prepare(&self, _ctx: &Context) -> Result<Vec<Job>, NodeError> {
            Ok(self.jobs.clone())
        }

        fn item_key(&self, item: &Job) -> String {
            item.key.clone()
        }

        async fn execute_item(&self, item: &Job, _attempt: AttemptInfo) -> Attempt<String> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            sleep(Duration::from_millis(item.delay_ms)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            let n = {
                let mut calls = self.calls.lock().unwrap();
                let n = calls.entry(item.key.clone()).or_insert(0);
                *n += 1;
                *n
            };
            if n <= item.failures {
                return Attempt::Retryable(ProviderError::RateLimited(item.key.clone()).into());
            }
            self.completed.fetch_add(1, Ordering::SeqCst);
            Attempt::Success(format!("done {}", item.key))
        }

        fn finalize(
            &self,
            _ctx: &mut Context,
            outcomes: Vec<ItemOutcome<String>>,
        ) -> Result<String, NodeError> {
            let mut store = self.outcomes.lock().unwrap();
            for outcome in outcomes {
                store.push((outcome.key, outcome.result));
            }
            Ok("default".into())
        }
    }

    fn keys(stage: &BatchStage<Echo>) -> Vec<String> {
        stage
            .0
            .outcomes
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_outcomes_keep_prepare_order() {
        // Later items finish first
        let jobs = vec![job("1.1", 60, 0), job("1.2", 30, 0), job("2", 0, 0)];
        let stage = BatchStage::new(Echo::new(jobs, 3, 0, false));
        stage.run(&mut Context::default()).await.unwrap();

        assert_eq!(keys(&stage), vec!["1.1", "1.2", "2"]);
        let outcomes = stage.0.outcomes.lock().unwrap();
        assert_eq!(outcomes[0].1.as_deref(), Ok("done 1.1"));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let jobs = (1..=8).map(|i| job(&i.to_string(), 20, 0)).collect();
        let stage = BatchStage::new(Echo::new(jobs, 2, 0, false));
        stage.run(&mut Context::default()).await.unwrap();

        assert!(stage.0.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(stage.0.completed.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_launch_delay_spaces_out_spawns() {
        let jobs = (1..=4).map(|i| job(&i.to_string(), 0, 0)).collect();
        let mut echo = Echo::new(jobs, 4, 0, false);
        echo.policy.launch_delay_ms = 50;
        let stage = BatchStage::new(echo);

        let started = std::time::Instant::now();
        stage.run(&mut Context::default()).await.unwrap();

        // Three gaps between four launches
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert_eq!(keys(&stage), vec!["1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_by_default() {
        let jobs = vec![job("1", 0, 0), job("2", 0, 10), job("3", 0, 1)];
        let stage = BatchStage::new(Echo::new(jobs, 3, 1, false));
        stage.run(&mut Context::default()).await.unwrap();

        let outcomes = stage.0.outcomes.lock().unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].1.is_ok());
        let failure = outcomes[1].1.as_ref().unwrap_err();
        assert_eq!(failure.key, "2");
        assert_eq!(failure.attempts, 2);
        // "3" fails once and succeeds on its own retry
        assert_eq!(outcomes[2].1.as_deref(), Ok("done 3"));
    }

    #[tokio::test]
    async fn test_fail_fast_aborts_batch() {
        let jobs = vec![job("1", 0, 10), job("2", 500, 0), job("3", 500, 0)];
        let stage = BatchStage::new(Echo::new(jobs, 3, 0, true));
        let failure = stage.run(&mut Context::default()).await.unwrap_err();

        match failure.error {
            NodeError::Item { index, attempts, .. } => {
                assert_eq!(index, "1");
                assert_eq!(attempts, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(failure.input, "1");
        // finalize never ran and the slow items were cancelled
        assert!(stage.0.outcomes.lock().unwrap().is_empty());
        assert_eq!(stage.0.completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_batch_still_finalizes() {
        let stage = BatchStage::new(Echo::new(Vec::new(), 2, 0, false));
        let signal = stage.run(&mut Context::default()).await.unwrap();
        assert_eq!(signal, "default");
    }
}

use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::time::Instant;

use crate::domain::{ExecutionHandle, ExecutionRequest, ExecutionResult};
use crate::engine::traits::{EngineError, JudgeEngine};
use crate::error::JudgeError;

/// Poll-loop knobs: the fixed sleep between rounds and the wall-clock
/// budget after which the whole batch is abandoned.
#[derive(Clone, Copy, Debug)]
pub struct PollConfig {
    pub interval: Duration,
    pub budget: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            budget: Duration::from_secs(30),
        }
    }
}

/// Fan a batch of execution requests out to the engine, order-preserving
/// and fail-fast: any individual submission failure fails the whole batch
/// so callers never see a silently shortened result set.
///
/// Dispatch is sequential unless the engine advertises that it tolerates
/// a concurrent burst (the observed production engines return 404s under
/// concurrency).
#[tracing::instrument(skip(engine, requests), fields(batch_size = requests.len()))]
pub async fn submit_batch(
    engine: &dyn JudgeEngine,
    requests: &[ExecutionRequest],
) -> Result<Vec<ExecutionHandle>, EngineError> {
    if !engine.supports_concurrent_submit() {
        return engine.submit_many(requests.to_vec()).await;
    }

    tracing::debug!("Dispatching batch concurrently");
    let mut futures = FuturesUnordered::new();
    for (idx, request) in requests.iter().enumerate() {
        let request = request.clone();
        futures.push(async move { (idx, engine.submit_one(request).await) });
    }

    let mut slots: Vec<Option<ExecutionHandle>> = vec![None; requests.len()];
    while let Some((idx, handle)) = futures.next().await {
        slots[idx] = Some(handle?);
    }

    Ok(slots
        .into_iter()
        .map(|slot| slot.expect("every submitted index yields a handle"))
        .collect())
}

/// Poll until every handle in the batch is terminal, then return the
/// results index-aligned with the handles.
///
/// The "all done" check is a batch-wide barrier: no partial result set is
/// ever returned, because the verdict computation downstream assumes a
/// complete, index-aligned array. Handles that are `Ready` at entry are
/// resolved without any engine call, so a synchronous-wait adapter
/// degrades this to a pass-through.
#[tracing::instrument(skip(engine, handles), fields(batch_size = handles.len()))]
pub async fn poll_batch_results(
    engine: &dyn JudgeEngine,
    handles: Vec<ExecutionHandle>,
    config: &PollConfig,
) -> Result<Vec<ExecutionResult>, JudgeError> {
    let mut slots: Vec<Option<ExecutionResult>> = vec![None; handles.len()];
    for (idx, handle) in handles.iter().enumerate() {
        if let ExecutionHandle::Ready(result) = handle {
            if !result.status.is_terminal() {
                return Err(JudgeError::Engine(EngineError::Protocol {
                    detail: format!(
                        "synchronous-wait engine returned non-terminal status {}",
                        result.status
                    ),
                    payload: String::new(),
                }));
            }
            slots[idx] = Some((**result).clone());
        }
    }

    let deadline = Instant::now() + config.budget;
    loop {
        let pending: Vec<(usize, ExecutionHandle)> = handles
            .iter()
            .enumerate()
            .filter(|(idx, _)| slots[*idx].is_none())
            .map(|(idx, handle)| (idx, handle.clone()))
            .collect();

        if pending.is_empty() {
            return Ok(slots
                .into_iter()
                .map(|slot| slot.expect("barrier passed with unresolved slot"))
                .collect());
        }

        tracing::debug!("Polling {} pending handle(s)", pending.len());
        let results = engine
            .fetch_many(pending.iter().map(|(_, h)| h.clone()).collect())
            .await
            .map_err(JudgeError::Engine)?;
        if results.len() != pending.len() {
            return Err(JudgeError::Engine(EngineError::Protocol {
                detail: format!(
                    "fetched {} results for {} pending handles",
                    results.len(),
                    pending.len()
                ),
                payload: String::new(),
            }));
        }

        let mut unresolved = 0usize;
        for ((idx, _), result) in pending.iter().zip(results) {
            if result.status.is_terminal() {
                slots[*idx] = Some(result);
            } else {
                unresolved += 1;
            }
        }

        if unresolved == 0 {
            continue;
        }

        if Instant::now() >= deadline {
            tracing::warn!(
                "Abandoning batch: {unresolved} handle(s) still pending after {:?}",
                config.budget
            );
            return Err(JudgeError::PollTimeout {
                budget: config.budget,
            });
        }
        tokio::time::sleep(config.interval).await;
    }
}

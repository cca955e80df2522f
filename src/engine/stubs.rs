use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::{ExecutionHandle, ExecutionRequest, ExecutionResult, StatusCode};
use crate::engine::traits::{EngineError, JudgeEngine};

/// In-process engine with canned results, keyed by the request's stdin.
/// Used by the smoke binary and the end-to-end tests; also the only
/// engine that advertises concurrent submission, so the fan-out path
/// stays exercised.
///
/// `pending_rounds` scripts the asynchronous-token protocol: each handle
/// reports `InQueue` for that many fetches before turning terminal. With
/// `sync_wait` the stub behaves like a synchronous-wait engine instead
/// and returns `Ready` handles at submit time.
#[derive(Debug)]
pub struct StubEngine {
    responses: DashMap<String, ExecutionResult>,
    fallback: ExecutionResult,
    delay: Duration,
    pending_rounds: usize,
    sync_wait: bool,
    inflight: DashMap<String, InflightEntry>,
    submit_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

#[derive(Debug)]
struct InflightEntry {
    result: ExecutionResult,
    fetches: usize,
}

impl StubEngine {
    pub fn new(delay: Duration, pending_rounds: usize, sync_wait: bool) -> Self {
        Self {
            responses: DashMap::new(),
            fallback: ExecutionResult {
                stdout: None,
                stderr: None,
                compile_output: None,
                status: StatusCode::InternalError,
                memory_kb: None,
                time_seconds: None,
            },
            delay,
            pending_rounds,
            sync_wait,
            inflight: DashMap::new(),
            submit_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Script the result returned for a request with the given stdin.
    pub fn respond_with(self, stdin: impl Into<String>, result: ExecutionResult) -> Self {
        self.responses.insert(stdin.into(), result);
        self
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn result_for(&self, request: &ExecutionRequest) -> ExecutionResult {
        self.responses
            .get(&request.stdin)
            .map(|r| r.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait::async_trait]
impl JudgeEngine for StubEngine {
    #[tracing::instrument]
    async fn submit_one(&self, request: ExecutionRequest) -> Result<ExecutionHandle, EngineError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        let result = self.result_for(&request);
        tracing::debug!("Stub result for stdin {:?}: {:?}", request.stdin, result);

        if self.sync_wait {
            return Ok(ExecutionHandle::Ready(Box::new(result)));
        }

        let token = Uuid::new_v4().to_string();
        self.inflight
            .insert(token.clone(), InflightEntry { result, fetches: 0 });
        Ok(ExecutionHandle::Pending { token })
    }

    #[tracing::instrument]
    async fn fetch_result(&self, handle: ExecutionHandle) -> Result<ExecutionResult, EngineError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        let token = match handle {
            ExecutionHandle::Ready(result) => return Ok(*result),
            ExecutionHandle::Pending { token } => token,
        };

        let mut entry = self
            .inflight
            .get_mut(&token)
            .ok_or_else(|| EngineError::Protocol {
                detail: format!("unknown token {token}"),
                payload: String::new(),
            })?;
        entry.fetches += 1;

        if entry.fetches <= self.pending_rounds {
            return Ok(ExecutionResult {
                stdout: None,
                stderr: None,
                compile_output: None,
                status: StatusCode::InQueue,
                memory_kb: None,
                time_seconds: None,
            });
        }

        Ok(entry.result.clone())
    }

    fn supports_concurrent_submit(&self) -> bool {
        true
    }
}

/// Convenience constructor for a terminal result, test/demo use.
pub fn accepted_result(stdout: &str) -> ExecutionResult {
    ExecutionResult {
        stdout: Some(stdout.to_string()),
        stderr: None,
        compile_output: None,
        status: StatusCode::Accepted,
        memory_kb: Some(3200.0),
        time_seconds: Some(0.02),
    }
}

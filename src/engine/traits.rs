use crate::domain::{ExecutionHandle, ExecutionRequest, ExecutionResult};

/// Failure raised by an engine adapter. Adapters never retry; the batch
/// layer and its callers decide what a failure means.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine rejected request: HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("engine request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed engine response ({detail}): {payload}")]
    Protocol { detail: String, payload: String },
}

/// Seam between the orchestration layer and one concrete judging engine.
///
/// Adapters translate `ExecutionRequest` into engine-specific calls and
/// engine-specific responses into the unified `ExecutionResult`. They
/// perform outbound network I/O only: no persistence, no pass/fail
/// judgment.
///
/// `fetch_result` may return a non-terminal status; the poller keeps
/// calling until `status.is_terminal()` holds. A `Ready` handle echoes
/// its embedded result without touching the network.
#[mockall::automock]
#[async_trait::async_trait]
pub trait JudgeEngine: std::fmt::Debug + Send + Sync {
    async fn submit_one(&self, request: ExecutionRequest) -> Result<ExecutionHandle, EngineError>;

    async fn fetch_result(&self, handle: ExecutionHandle) -> Result<ExecutionResult, EngineError>;

    /// Order-preserving batch submit. Engines with a native batch endpoint
    /// override this; the default dispatches sequentially and fails fast
    /// on the first error.
    async fn submit_many(
        &self,
        requests: Vec<ExecutionRequest>,
    ) -> Result<Vec<ExecutionHandle>, EngineError> {
        let mut handles = Vec::with_capacity(requests.len());
        for request in requests {
            handles.push(self.submit_one(request).await?);
        }
        Ok(handles)
    }

    /// Order-preserving batch fetch, one result per handle.
    async fn fetch_many(
        &self,
        handles: Vec<ExecutionHandle>,
    ) -> Result<Vec<ExecutionResult>, EngineError> {
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(self.fetch_result(handle).await?);
        }
        Ok(results)
    }

    /// Whether the engine tolerates a concurrent submission burst. Both
    /// observed production engines reject bursts, so this defaults to off
    /// and the submitter dispatches sequentially.
    fn supports_concurrent_submit(&self) -> bool {
        false
    }
}

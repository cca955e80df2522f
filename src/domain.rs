use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Languages the platform accepts. Each engine adapter owns the mapping
/// from this catalog to its private compiler ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Language {
    Python,
    Java,
    C,
    Cpp,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::Java => "Java",
            Language::C => "C",
            Language::Cpp => "C++",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compile-and-run unit: exactly one test case of one submission.
/// Immutable once constructed.
#[derive(Clone, Debug)]
pub struct ExecutionRequest {
    pub source_code: String,
    pub language: Language,
    pub stdin: String,
}

impl ExecutionRequest {
    pub fn new(
        source_code: impl Into<String>,
        language: Language,
        stdin: impl Into<String>,
    ) -> Self {
        Self {
            source_code: source_code.into(),
            language,
            stdin: stdin.into(),
        }
    }
}

/// Reference to a submitted execution, handed from the submitter to the
/// poller and discarded once terminal.
///
/// Synchronous-wait engines return `Ready` with the final result embedded,
/// which short-circuits the poll loop entirely. Asynchronous-token engines
/// return `Pending` and the poller keeps fetching until the status turns
/// terminal.
#[derive(Clone, Debug)]
pub enum ExecutionHandle {
    Pending { token: String },
    Ready(Box<ExecutionResult>),
}

/// Unified status vocabulary across all supported engines. Adapters map
/// their private codes here, defaulting to `Unknown` for anything
/// unrecognized so an exotic engine status never aborts a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StatusCode {
    InQueue,
    Compiling,
    Running,
    Accepted,
    WrongAnswer,
    CompileError,
    RuntimeError,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    IllegalSystemCall,
    InternalError,
    Unknown,
}

impl StatusCode {
    /// Only queue/compile/run states are non-terminal; everything else,
    /// `Unknown` included, stops the poll loop for that handle.
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            StatusCode::InQueue | StatusCode::Compiling | StatusCode::Running
        )
    }

    pub fn description(self) -> &'static str {
        match self {
            StatusCode::InQueue => "In Queue",
            StatusCode::Compiling => "Compiling",
            StatusCode::Running => "Running",
            StatusCode::Accepted => "Accepted",
            StatusCode::WrongAnswer => "Wrong Answer",
            StatusCode::CompileError => "Compilation Error",
            StatusCode::RuntimeError => "Runtime Error",
            StatusCode::TimeLimitExceeded => "Time Limit Exceeded",
            StatusCode::MemoryLimitExceeded => "Memory Limit Exceeded",
            StatusCode::IllegalSystemCall => "Illegal System Call",
            StatusCode::InternalError => "Internal Error",
            StatusCode::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Normalized outcome of one `ExecutionRequest`. Engines routinely omit
/// stderr/compile output and resource figures, so every payload field is
/// optional by design.
#[derive(Clone, Debug, Serialize)]
pub struct ExecutionResult {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub status: StatusCode,
    pub memory_kb: Option<f64>,
    pub time_seconds: Option<f64>,
}

/// An (input, expected output) pair attached to a problem.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub output: String,
}

/// One `ExecutionResult` paired with its expected output. `index` is
/// 1-based and matches the problem's test-case ordering end to end.
#[derive(Clone, Debug, Serialize)]
pub struct TestCaseVerdict {
    pub index: u32,
    pub passed: bool,
    pub stdout: Option<String>,
    pub expected: String,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub status: StatusCode,
    pub memory_kb: Option<f64>,
    pub time_seconds: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Accepted,
    WrongAnswer,
}

/// Aggregate over all test-case verdicts of one run. The means skip test
/// cases that reported no memory/time figure instead of counting them as
/// zero.
#[derive(Clone, Debug, Serialize)]
pub struct BatchVerdict {
    pub all_passed: bool,
    pub overall_status: OverallStatus,
    pub total_count: u32,
    pub passed_count: u32,
    pub mean_memory_kb: Option<f64>,
    pub mean_time_seconds: Option<f64>,
    pub cases: Vec<TestCaseVerdict>,
}

/// Durable record of one submit, as returned by the submission store.
#[derive(Clone, Debug, Serialize)]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub problem_id: Uuid,
    pub source_code: String,
    pub language: Language,
    pub overall_status: OverallStatus,
    pub cases: Vec<TestCaseVerdict>,
    pub created_at: DateTime<Utc>,
}

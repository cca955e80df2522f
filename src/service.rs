use std::sync::Arc;

use uuid::Uuid;

use crate::batch::{PollConfig, poll_batch_results, submit_batch};
use crate::domain::{BatchVerdict, ExecutionRequest, Language, SubmissionRecord, TestCase};
use crate::engine::traits::JudgeEngine;
use crate::error::{JudgeError, ValidationError};
use crate::store::traits::{NewSubmission, ProblemStore, SubmissionStore};
use crate::verdict::evaluate;

#[derive(Clone, Debug)]
pub struct RunRequest {
    pub source_code: String,
    pub language: Language,
    pub problem_id: Uuid,
}

#[derive(Clone, Debug)]
pub struct SubmitRequest {
    pub source_code: String,
    pub language: Language,
    pub problem_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Clone, Debug)]
pub struct SubmissionOutcome {
    pub verdict: BatchVerdict,
    pub record: SubmissionRecord,
}

/// Single entry point for judging. `run` executes against the public test
/// cases only and persists nothing; `submit` executes against the union
/// of public and hidden cases, persists the record and marks the problem
/// solved when everything passed.
///
/// Collaborators are injected at construction; the service holds no
/// global state and separate calls are fully independent.
#[derive(Clone, Debug)]
pub struct JudgeService {
    engine: Arc<dyn JudgeEngine>,
    problems: Arc<dyn ProblemStore>,
    submissions: Arc<dyn SubmissionStore>,
    poll: PollConfig,
}

impl JudgeService {
    pub fn new(
        engine: Arc<dyn JudgeEngine>,
        problems: Arc<dyn ProblemStore>,
        submissions: Arc<dyn SubmissionStore>,
        poll: PollConfig,
    ) -> Self {
        Self {
            engine,
            problems,
            submissions,
            poll,
        }
    }

    /// Throwaway run against the problem's public test cases.
    #[tracing::instrument(skip(self, request), fields(problem_id = %request.problem_id))]
    pub async fn run(&self, request: RunRequest) -> Result<BatchVerdict, JudgeError> {
        validate_source(&request.source_code)?;

        let cases = self
            .problems
            .public_test_cases(request.problem_id)
            .await?
            .ok_or(ValidationError::ProblemNotFound(request.problem_id))?;
        if cases.is_empty() {
            return Err(ValidationError::NoTestCasesAvailable(request.problem_id).into());
        }

        let verdict = self
            .execute_cases(&request.source_code, request.language, &cases)
            .await?;
        tracing::info!(
            passed = verdict.passed_count,
            total = verdict.total_count,
            "Run evaluated"
        );
        Ok(verdict)
    }

    /// Scored submission against all test cases, public and hidden, in
    /// that order. Persistence happens only after evaluation; the engine
    /// is never touched again once results are in.
    #[tracing::instrument(skip(self, request), fields(problem_id = %request.problem_id, user_id = %request.user_id))]
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmissionOutcome, JudgeError> {
        validate_source(&request.source_code)?;

        let public = self
            .problems
            .public_test_cases(request.problem_id)
            .await?
            .ok_or(ValidationError::ProblemNotFound(request.problem_id))?;
        let hidden = self
            .problems
            .hidden_test_cases(request.problem_id)
            .await?
            .ok_or(ValidationError::ProblemNotFound(request.problem_id))?;

        let mut cases = public;
        cases.extend(hidden);
        if cases.is_empty() {
            return Err(ValidationError::NoTestCasesAvailable(request.problem_id).into());
        }

        let verdict = self
            .execute_cases(&request.source_code, request.language, &cases)
            .await?;

        let record = self
            .submissions
            .create_submission(NewSubmission {
                user_id: request.user_id,
                problem_id: request.problem_id,
                source_code: request.source_code,
                language: request.language,
                overall_status: verdict.overall_status,
                cases: verdict.cases.clone(),
            })
            .await?;
        tracing::info!(submission_id = %record.id, status = ?record.overall_status, "Submission persisted");

        if verdict.all_passed {
            self.submissions
                .mark_problem_solved(request.user_id, request.problem_id)
                .await?;
        }

        Ok(SubmissionOutcome { verdict, record })
    }

    async fn execute_cases(
        &self,
        source_code: &str,
        language: Language,
        cases: &[TestCase],
    ) -> Result<BatchVerdict, JudgeError> {
        let requests: Vec<ExecutionRequest> = cases
            .iter()
            .map(|case| ExecutionRequest::new(source_code, language, &case.input))
            .collect();

        let handles = submit_batch(self.engine.as_ref(), &requests).await?;
        tracing::debug!("Dispatched {} execution(s)", handles.len());

        let results = poll_batch_results(self.engine.as_ref(), handles, &self.poll).await?;
        let expected: Vec<String> = cases.iter().map(|case| case.output.clone()).collect();
        Ok(evaluate(&results, &expected))
    }
}

fn validate_source(source_code: &str) -> Result<(), ValidationError> {
    if source_code.trim().is_empty() {
        return Err(ValidationError::EmptySourceCode);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExecutionHandle, ExecutionResult, OverallStatus, StatusCode};
    use crate::engine::traits::MockJudgeEngine;
    use crate::store::memory::{MemoryProblemStore, MemorySubmissionStore};
    use std::time::Duration;

    fn fast_poll() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(10),
            budget: Duration::from_millis(500),
        }
    }

    fn square_cases() -> Vec<TestCase> {
        vec![
            TestCase {
                input: "2".to_string(),
                output: "4".to_string(),
            },
            TestCase {
                input: "3".to_string(),
                output: "9".to_string(),
            },
            TestCase {
                input: "4".to_string(),
                output: "16".to_string(),
            },
        ]
    }

    fn hidden_cases() -> Vec<TestCase> {
        vec![
            TestCase {
                input: "10".to_string(),
                output: "100".to_string(),
            },
            TestCase {
                input: "11".to_string(),
                output: "121".to_string(),
            },
        ]
    }

    fn ready_result(stdout: &str, status: StatusCode) -> ExecutionResult {
        ExecutionResult {
            stdout: Some(stdout.to_string()),
            stderr: None,
            compile_output: None,
            status,
            memory_kb: Some(2048.0),
            time_seconds: Some(0.05),
        }
    }

    /// Engine that answers every submission with the square of its stdin,
    /// already terminal (synchronous-wait shape).
    fn squaring_engine() -> MockJudgeEngine {
        let mut engine = MockJudgeEngine::new();
        engine
            .expect_supports_concurrent_submit()
            .return_const(false);
        engine.expect_submit_many().returning(|requests| {
            Ok(requests
                .into_iter()
                .map(|request| {
                    let n: i64 = request.stdin.parse().unwrap();
                    ExecutionHandle::Ready(Box::new(ready_result(
                        &format!("{}\n", n * n),
                        StatusCode::Accepted,
                    )))
                })
                .collect())
        });
        engine.expect_fetch_many().times(0);
        engine
    }

    /// Engine whose submissions all print a constant.
    fn constant_engine(stdout: &'static str) -> MockJudgeEngine {
        let mut engine = MockJudgeEngine::new();
        engine
            .expect_supports_concurrent_submit()
            .return_const(false);
        engine.expect_submit_many().returning(move |requests| {
            Ok(requests
                .into_iter()
                .map(|_| {
                    ExecutionHandle::Ready(Box::new(ready_result(stdout, StatusCode::WrongAnswer)))
                })
                .collect())
        });
        engine
    }

    fn service_with(
        engine: MockJudgeEngine,
        problems: Arc<MemoryProblemStore>,
        submissions: Arc<MemorySubmissionStore>,
    ) -> JudgeService {
        JudgeService::new(Arc::new(engine), problems, submissions, fast_poll())
    }

    fn run_request(problem_id: Uuid) -> RunRequest {
        RunRequest {
            source_code: "n = int(input())\nprint(n * n)\n".to_string(),
            language: Language::Python,
            problem_id,
        }
    }

    fn submit_request(problem_id: Uuid, user_id: Uuid) -> SubmitRequest {
        SubmitRequest {
            source_code: "n = int(input())\nprint(n * n)\n".to_string(),
            language: Language::Python,
            problem_id,
            user_id,
        }
    }

    #[tokio::test]
    async fn test_run_all_public_cases_pass() {
        let problems = Arc::new(MemoryProblemStore::new());
        let problem_id = Uuid::new_v4();
        problems.insert_problem(problem_id, square_cases(), vec![]);
        let service = service_with(
            squaring_engine(),
            problems,
            Arc::new(MemorySubmissionStore::new()),
        );

        let verdict = service.run(run_request(problem_id)).await.unwrap();

        assert!(verdict.all_passed);
        assert_eq!(verdict.overall_status, OverallStatus::Accepted);
        assert_eq!(verdict.passed_count, 3);
        assert_eq!(verdict.total_count, 3);
        assert_eq!(verdict.cases.len(), 3);
        assert_eq!(verdict.cases[2].expected, "16");
    }

    #[tokio::test]
    async fn test_run_constant_output_fails_every_case() {
        let problems = Arc::new(MemoryProblemStore::new());
        let problem_id = Uuid::new_v4();
        problems.insert_problem(problem_id, square_cases(), vec![]);
        let service = service_with(
            constant_engine("0\n"),
            problems,
            Arc::new(MemorySubmissionStore::new()),
        );

        let verdict = service.run(run_request(problem_id)).await.unwrap();

        assert!(!verdict.all_passed);
        assert_eq!(verdict.overall_status, OverallStatus::WrongAnswer);
        assert_eq!(verdict.passed_count, 0);
        assert!(verdict.cases.iter().all(|c| !c.passed));
    }

    #[tokio::test]
    async fn test_submit_evaluates_hidden_cases_too() {
        let problems = Arc::new(MemoryProblemStore::new());
        let problem_id = Uuid::new_v4();
        problems.insert_problem(problem_id, square_cases(), hidden_cases());
        let submissions = Arc::new(MemorySubmissionStore::new());

        // Passes the three public cases but flunks the hidden ones.
        let mut engine = MockJudgeEngine::new();
        engine
            .expect_supports_concurrent_submit()
            .return_const(false);
        engine.expect_submit_many().returning(|requests| {
            Ok(requests
                .into_iter()
                .map(|request| {
                    let n: i64 = request.stdin.parse().unwrap();
                    let stdout = if n < 10 {
                        format!("{}\n", n * n)
                    } else {
                        "wrong\n".to_string()
                    };
                    ExecutionHandle::Ready(Box::new(ready_result(&stdout, StatusCode::Accepted)))
                })
                .collect())
        });

        let user_id = Uuid::new_v4();
        let service = service_with(engine, problems, submissions.clone());
        let outcome = service
            .submit(submit_request(problem_id, user_id))
            .await
            .unwrap();

        assert_eq!(outcome.verdict.total_count, 5);
        assert_eq!(outcome.verdict.passed_count, 3);
        assert_eq!(outcome.verdict.overall_status, OverallStatus::WrongAnswer);
        assert_eq!(outcome.record.cases.len(), 5);
        // Not solved: the hidden cases failed.
        assert!(!submissions.is_solved(user_id, problem_id));
        assert!(submissions.submission(outcome.record.id).is_some());
    }

    #[tokio::test]
    async fn test_submit_accepted_marks_solved_idempotently() {
        let problems = Arc::new(MemoryProblemStore::new());
        let problem_id = Uuid::new_v4();
        problems.insert_problem(problem_id, square_cases(), hidden_cases());
        let submissions = Arc::new(MemorySubmissionStore::new());
        let user_id = Uuid::new_v4();

        for _ in 0..2 {
            let problems = problems.clone();
            let submissions = submissions.clone();
            let service = service_with(squaring_engine(), problems, submissions);
            let outcome = service
                .submit(submit_request(problem_id, user_id))
                .await
                .unwrap();
            assert_eq!(outcome.verdict.overall_status, OverallStatus::Accepted);
        }

        assert!(submissions.is_solved(user_id, problem_id));
        assert_eq!(submissions.solved_count(), 1);
        assert_eq!(submissions.submission_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_engine_status_does_not_break_judging() {
        let problems = Arc::new(MemoryProblemStore::new());
        let problem_id = Uuid::new_v4();
        problems.insert_problem(
            problem_id,
            vec![TestCase {
                input: "4".to_string(),
                output: "16".to_string(),
            }],
            vec![],
        );

        // Status the adapter could not recognize: normalized to Unknown,
        // stdout comparison still decides the verdict.
        let mut engine = MockJudgeEngine::new();
        engine
            .expect_supports_concurrent_submit()
            .return_const(false);
        engine.expect_submit_many().returning(|_| {
            Ok(vec![ExecutionHandle::Ready(Box::new(ready_result(
                "16\n",
                StatusCode::Unknown,
            )))])
        });

        let service = service_with(engine, problems, Arc::new(MemorySubmissionStore::new()));
        let verdict = service.run(run_request(problem_id)).await.unwrap();

        assert!(verdict.all_passed);
        assert_eq!(verdict.cases[0].status, StatusCode::Unknown);
    }

    #[tokio::test]
    async fn test_run_without_test_cases_never_calls_engine() {
        let problems = Arc::new(MemoryProblemStore::new());
        let problem_id = Uuid::new_v4();
        problems.insert_problem(problem_id, vec![], vec![]);

        let mut engine = MockJudgeEngine::new();
        engine.expect_submit_one().times(0);
        engine.expect_submit_many().times(0);
        engine.expect_supports_concurrent_submit().times(0);

        let service = service_with(engine, problems, Arc::new(MemorySubmissionStore::new()));
        let err = service.run(run_request(problem_id)).await.unwrap_err();

        assert!(matches!(
            err,
            JudgeError::Validation(ValidationError::NoTestCasesAvailable(id)) if id == problem_id
        ));
    }

    #[tokio::test]
    async fn test_missing_problem_never_calls_engine() {
        let mut engine = MockJudgeEngine::new();
        engine.expect_submit_one().times(0);
        engine.expect_submit_many().times(0);

        let service = service_with(
            engine,
            Arc::new(MemoryProblemStore::new()),
            Arc::new(MemorySubmissionStore::new()),
        );
        let problem_id = Uuid::new_v4();
        let err = service.run(run_request(problem_id)).await.unwrap_err();

        assert!(matches!(
            err,
            JudgeError::Validation(ValidationError::ProblemNotFound(id)) if id == problem_id
        ));
    }

    #[tokio::test]
    async fn test_empty_source_rejected_before_any_lookup() {
        let mut engine = MockJudgeEngine::new();
        engine.expect_submit_one().times(0);
        engine.expect_submit_many().times(0);

        let service = service_with(
            engine,
            Arc::new(MemoryProblemStore::new()),
            Arc::new(MemorySubmissionStore::new()),
        );
        let err = service
            .run(RunRequest {
                source_code: "   \n".to_string(),
                language: Language::Python,
                problem_id: Uuid::new_v4(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            JudgeError::Validation(ValidationError::EmptySourceCode)
        ));
    }

    #[tokio::test]
    async fn test_submit_does_not_persist_on_engine_failure() {
        let problems = Arc::new(MemoryProblemStore::new());
        let problem_id = Uuid::new_v4();
        problems.insert_problem(problem_id, square_cases(), vec![]);
        let submissions = Arc::new(MemorySubmissionStore::new());

        let mut engine = MockJudgeEngine::new();
        engine
            .expect_supports_concurrent_submit()
            .return_const(false);
        engine.expect_submit_many().returning(|_| {
            Err(crate::engine::traits::EngineError::Http {
                status: 503,
                body: "unavailable".to_string(),
            })
        });

        let service = service_with(engine, problems, submissions.clone());
        let err = service
            .submit(submit_request(problem_id, Uuid::new_v4()))
            .await
            .unwrap_err();

        assert!(matches!(err, JudgeError::Engine(_)));
        assert_eq!(submissions.submission_count(), 0);
        assert_eq!(submissions.solved_count(), 0);
    }
}

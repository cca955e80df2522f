//! End-to-end scenarios over the in-process stub engine and the memory
//! stores, covering both engine shapes: asynchronous tokens with a poll
//! loop and synchronous wait.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::batch::PollConfig;
use crate::domain::{Language, OverallStatus, TestCase};
use crate::engine::stubs::{StubEngine, accepted_result};
use crate::error::JudgeError;
use crate::service::{JudgeService, RunRequest, SubmitRequest};
use crate::store::memory::{MemoryProblemStore, MemorySubmissionStore};

fn fast_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(10),
        budget: Duration::from_millis(500),
    }
}

fn squaring_stub(pending_rounds: usize, sync_wait: bool) -> StubEngine {
    StubEngine::new(Duration::from_millis(1), pending_rounds, sync_wait)
        .respond_with("2", accepted_result("4\n"))
        .respond_with("3", accepted_result("9\n"))
        .respond_with("4", accepted_result("16\n"))
        .respond_with("10", accepted_result("100\n"))
        .respond_with("11", accepted_result("121\n"))
}

fn seeded_problem(problems: &MemoryProblemStore) -> Uuid {
    let problem_id = Uuid::new_v4();
    problems.insert_problem(
        problem_id,
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
        ],
        vec![
            TestCase {
                input: "10".to_string(),
                output: "100".to_string(),
            },
            TestCase {
                input: "11".to_string(),
                output: "121".to_string(),
            },
        ],
    );
    problem_id
}

fn source() -> String {
    "n = int(input())\nprint(n * n)\n".to_string()
}

#[tokio::test]
async fn test_run_and_submit_through_token_polling_engine() {
    let engine = Arc::new(squaring_stub(1, false));
    let problems = Arc::new(MemoryProblemStore::new());
    let problem_id = seeded_problem(&problems);
    let submissions = Arc::new(MemorySubmissionStore::new());
    let service = JudgeService::new(
        engine.clone(),
        problems,
        submissions.clone(),
        fast_poll(),
    );

    let verdict = service
        .run(RunRequest {
            source_code: source(),
            language: Language::Python,
            problem_id,
        })
        .await
        .unwrap();
    assert!(verdict.all_passed);
    assert_eq!(verdict.total_count, 3);
    // The stub advertises concurrent submission, so the fan-out path
    // submitted each case individually.
    assert_eq!(engine.submit_calls(), 3);
    // Every token was fetched at least twice: once while queued, once
    // terminal.
    assert!(engine.fetch_calls() >= 6);
    // Nothing persisted on a throwaway run.
    assert_eq!(submissions.submission_count(), 0);

    let user_id = Uuid::new_v4();
    let outcome = service
        .submit(SubmitRequest {
            source_code: source(),
            language: Language::Python,
            problem_id,
            user_id,
        })
        .await
        .unwrap();
    assert_eq!(outcome.verdict.total_count, 5);
    assert_eq!(outcome.verdict.overall_status, OverallStatus::Accepted);
    assert_eq!(submissions.submission_count(), 1);
    assert!(submissions.is_solved(user_id, problem_id));
}

#[tokio::test]
async fn test_synchronous_wait_engine_needs_no_polling() {
    let engine = Arc::new(squaring_stub(0, true));
    let problems = Arc::new(MemoryProblemStore::new());
    let problem_id = seeded_problem(&problems);
    let service = JudgeService::new(
        engine.clone(),
        problems,
        Arc::new(MemorySubmissionStore::new()),
        fast_poll(),
    );

    let verdict = service
        .run(RunRequest {
            source_code: source(),
            language: Language::Python,
            problem_id,
        })
        .await
        .unwrap();

    assert!(verdict.all_passed);
    assert_eq!(engine.fetch_calls(), 0);
}

#[tokio::test]
async fn test_unscripted_input_fails_that_case_only() {
    // "4" has no scripted response, so the stub reports an internal
    // error with no stdout for it; the other cases still pass.
    let engine = Arc::new(
        StubEngine::new(Duration::from_millis(1), 0, true)
            .respond_with("2", accepted_result("4\n"))
            .respond_with("3", accepted_result("9\n")),
    );
    let problems = Arc::new(MemoryProblemStore::new());
    let problem_id = seeded_problem(&problems);
    let submissions = Arc::new(MemorySubmissionStore::new());
    let service = JudgeService::new(engine, problems, submissions.clone(), fast_poll());

    let user_id = Uuid::new_v4();
    let outcome = service
        .submit(SubmitRequest {
            source_code: source(),
            language: Language::Python,
            problem_id,
            user_id,
        })
        .await
        .unwrap();

    assert_eq!(outcome.verdict.overall_status, OverallStatus::WrongAnswer);
    assert_eq!(outcome.verdict.passed_count, 2);
    assert!(outcome.verdict.cases[0].passed);
    assert!(outcome.verdict.cases[1].passed);
    assert!(!outcome.verdict.cases[2].passed);
    // The failed record is still persisted, but the problem is not
    // marked solved.
    assert_eq!(submissions.submission_count(), 1);
    assert!(!submissions.is_solved(user_id, problem_id));
}

#[tokio::test]
async fn test_engine_that_never_finishes_times_out() {
    let engine = Arc::new(squaring_stub(usize::MAX, false));
    let problems = Arc::new(MemoryProblemStore::new());
    let problem_id = seeded_problem(&problems);
    let service = JudgeService::new(
        engine,
        problems,
        Arc::new(MemorySubmissionStore::new()),
        PollConfig {
            interval: Duration::from_millis(5),
            budget: Duration::from_millis(50),
        },
    );

    let err = service
        .run(RunRequest {
            source_code: source(),
            language: Language::Python,
            problem_id,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, JudgeError::PollTimeout { .. }));
}

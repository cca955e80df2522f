use std::panic;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use codeflow_judge::batch::PollConfig;
use codeflow_judge::config::{EngineConfig, EngineKind, build_engine};
use codeflow_judge::domain::{Language, TestCase};
use codeflow_judge::engine::stubs::{StubEngine, accepted_result};
use codeflow_judge::engine::traits::JudgeEngine;
use codeflow_judge::service::{JudgeService, RunRequest, SubmitRequest};
use codeflow_judge::store::memory::{MemoryProblemStore, MemorySubmissionStore};

#[tokio::main]
#[tracing::instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    set_panic_hook();

    let config = EngineConfig::from_env()?;
    let engine: Arc<dyn JudgeEngine> = if config.kind == EngineKind::Stub {
        // Script the stub to square its input so the demo problem below
        // actually passes.
        Arc::new(
            StubEngine::new(Duration::from_millis(50), 1, false)
                .respond_with("2", accepted_result("4\n"))
                .respond_with("3", accepted_result("9\n"))
                .respond_with("4", accepted_result("16\n"))
                .respond_with("10", accepted_result("100\n"))
                .respond_with("11", accepted_result("121\n")),
        )
    } else {
        build_engine(&config)?
    };

    let problems = Arc::new(MemoryProblemStore::new());
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
    let submissions = Arc::new(MemorySubmissionStore::new());

    let service = JudgeService::new(
        engine,
        problems,
        submissions.clone(),
        PollConfig {
            interval: Duration::from_millis(100),
            budget: config.poll.budget,
        },
    );

    let source_code = "n = int(input())\nprint(n * n)\n".to_string();
    let user_id = Uuid::new_v4();

    tracing::info!(%problem_id, "Running against public test cases");
    let verdict = service
        .run(RunRequest {
            source_code: source_code.clone(),
            language: Language::Python,
            problem_id,
        })
        .await?;
    println!("{}", serde_json::to_string_pretty(&verdict)?);

    tracing::info!(%problem_id, %user_id, "Submitting against all test cases");
    let outcome = service
        .submit(SubmitRequest {
            source_code,
            language: Language::Python,
            problem_id,
            user_id,
        })
        .await?;
    println!("{}", serde_json::to_string_pretty(&outcome.verdict)?);
    tracing::info!(
        submission_id = %outcome.record.id,
        solved = submissions.is_solved(user_id, problem_id),
        "Done"
    );

    Ok(())
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}

use uuid::Uuid;

use crate::domain::{Language, OverallStatus, SubmissionRecord, TestCase, TestCaseVerdict};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Read side of the problem catalog. `Ok(None)` means the problem does
/// not exist, which callers must distinguish from an existing problem
/// with an empty test-case list.
#[async_trait::async_trait]
pub trait ProblemStore: std::fmt::Debug + Send + Sync {
    async fn public_test_cases(&self, problem_id: Uuid)
    -> Result<Option<Vec<TestCase>>, StoreError>;

    async fn hidden_test_cases(&self, problem_id: Uuid)
    -> Result<Option<Vec<TestCase>>, StoreError>;
}

/// Everything needed to persist one submission.
#[derive(Clone, Debug)]
pub struct NewSubmission {
    pub user_id: Uuid,
    pub problem_id: Uuid,
    pub source_code: String,
    pub language: Language,
    pub overall_status: OverallStatus,
    pub cases: Vec<TestCaseVerdict>,
}

#[async_trait::async_trait]
pub trait SubmissionStore: std::fmt::Debug + Send + Sync {
    async fn create_submission(
        &self,
        submission: NewSubmission,
    ) -> Result<SubmissionRecord, StoreError>;

    /// Idempotent: marking an already-solved (user, problem) pair again
    /// leaves exactly one solved record.
    async fn mark_problem_solved(&self, user_id: Uuid, problem_id: Uuid)
    -> Result<(), StoreError>;
}

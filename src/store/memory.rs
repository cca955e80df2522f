use chrono::Utc;
use dashmap::{DashMap, DashSet};
use uuid::Uuid;

use crate::domain::{SubmissionRecord, TestCase};
use crate::store::traits::{NewSubmission, ProblemStore, StoreError, SubmissionStore};

#[derive(Debug)]
struct StoredProblem {
    public: Vec<TestCase>,
    hidden: Vec<TestCase>,
}

/// In-memory problem catalog for tests and the smoke binary.
#[derive(Debug, Default)]
pub struct MemoryProblemStore {
    problems: DashMap<Uuid, StoredProblem>,
}

impl MemoryProblemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_problem(&self, problem_id: Uuid, public: Vec<TestCase>, hidden: Vec<TestCase>) {
        self.problems
            .insert(problem_id, StoredProblem { public, hidden });
    }
}

#[async_trait::async_trait]
impl ProblemStore for MemoryProblemStore {
    async fn public_test_cases(
        &self,
        problem_id: Uuid,
    ) -> Result<Option<Vec<TestCase>>, StoreError> {
        Ok(self.problems.get(&problem_id).map(|p| p.public.clone()))
    }

    async fn hidden_test_cases(
        &self,
        problem_id: Uuid,
    ) -> Result<Option<Vec<TestCase>>, StoreError> {
        Ok(self.problems.get(&problem_id).map(|p| p.hidden.clone()))
    }
}

/// In-memory submission log plus the solved set.
#[derive(Debug, Default)]
pub struct MemorySubmissionStore {
    submissions: DashMap<Uuid, SubmissionRecord>,
    solved: DashSet<(Uuid, Uuid)>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submission(&self, id: Uuid) -> Option<SubmissionRecord> {
        self.submissions.get(&id).map(|r| r.clone())
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.len()
    }

    pub fn is_solved(&self, user_id: Uuid, problem_id: Uuid) -> bool {
        self.solved.contains(&(user_id, problem_id))
    }

    pub fn solved_count(&self) -> usize {
        self.solved.len()
    }
}

#[async_trait::async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn create_submission(
        &self,
        submission: NewSubmission,
    ) -> Result<SubmissionRecord, StoreError> {
        let record = SubmissionRecord {
            id: Uuid::new_v4(),
            user_id: submission.user_id,
            problem_id: submission.problem_id,
            source_code: submission.source_code,
            language: submission.language,
            overall_status: submission.overall_status,
            cases: submission.cases,
            created_at: Utc::now(),
        };
        self.submissions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn mark_problem_solved(
        &self,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> Result<(), StoreError> {
        self.solved.insert((user_id, problem_id));
        Ok(())
    }
}

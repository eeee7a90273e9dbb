//! Storage seams consumed by the catalog, registry, ledger and session engine.
//!
//! Every store has a PostgreSQL implementation under [`crate::database`] and an
//! in-memory one in [`memory`], used by tests and by database-less dev runs.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{
    activation_repo::PgActivationStore, profile_repo::PgProfileDirectory, quiz_repo::PgQuizStore,
    result_repo::PgResultStore, violation_repo::PgViolationStore,
};
use crate::error::Result;
use crate::models::activation::{ActivationFilter, TestActivation};
use crate::models::profile::StudentProfile;
use crate::models::quiz::{QuizFilter, QuizTemplate};
use crate::models::quiz_result::{QuizResult, ResultFilter};
use crate::models::violation::{ViolationFilter, ViolationRecord, ViolationSummary};

use self::memory::MemoryStore;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn insert(&self, quiz: &QuizTemplate) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<QuizTemplate>>;
    /// Creation order.
    async fn list(&self, filter: &QuizFilter) -> Result<Vec<QuizTemplate>>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivationStore: Send + Sync {
    async fn insert(&self, activation: &TestActivation) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<TestActivation>>;
    /// Insertion order.
    async fn list(&self, filter: &ActivationFilter) -> Result<Vec<TestActivation>>;
    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<TestActivation>>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Stores a result. Re-creating the same id is a no-op; a second result for
    /// the same (student, quiz) pair fails with `Error::AlreadyAttempted`.
    async fn create(&self, result: &QuizResult) -> Result<()>;
    async fn find(&self, student_id: &str, quiz_id: Uuid) -> Result<Option<QuizResult>>;
    async fn list(&self, filter: &ResultFilter) -> Result<Vec<QuizResult>>;
    async fn delete_submitted_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ViolationStore: Send + Sync {
    async fn append(&self, record: &ViolationRecord) -> Result<()>;
    async fn list(&self, filter: &ViolationFilter) -> Result<Vec<ViolationRecord>>;
    async fn summary(&self) -> Result<Vec<ViolationSummary>>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn delete_all(&self) -> Result<u64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn get(&self, student_id: &str) -> Result<Option<StudentProfile>>;
}

/// The full set of stores the application runs against.
#[derive(Clone)]
pub struct Stores {
    pub quizzes: Arc<dyn QuizStore>,
    pub activations: Arc<dyn ActivationStore>,
    pub results: Arc<dyn ResultStore>,
    pub violations: Arc<dyn ViolationStore>,
    pub profiles: Arc<dyn ProfileDirectory>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            quizzes: Arc::new(PgQuizStore::new(pool.clone())),
            activations: Arc::new(PgActivationStore::new(pool.clone())),
            results: Arc::new(PgResultStore::new(pool.clone())),
            violations: Arc::new(PgViolationStore::new(pool.clone())),
            profiles: Arc::new(PgProfileDirectory::new(pool)),
        }
    }

    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            quizzes: store.clone(),
            activations: store.clone(),
            results: store.clone(),
            violations: store.clone(),
            profiles: store,
        }
    }
}

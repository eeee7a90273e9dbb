use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ActivationStore, ProfileDirectory, QuizStore, ResultStore, ViolationStore};
use crate::error::{Error, Result};
use crate::models::activation::{ActivationFilter, TestActivation};
use crate::models::profile::StudentProfile;
use crate::models::quiz::{QuizFilter, QuizTemplate};
use crate::models::quiz_result::{QuizResult, ResultFilter};
use crate::models::violation::{ViolationFilter, ViolationRecord, ViolationSummary};

#[derive(Default)]
struct Tables {
    quizzes: Vec<QuizTemplate>,
    activations: Vec<TestActivation>,
    results: Vec<QuizResult>,
    violations: Vec<ViolationRecord>,
    profiles: BTreeMap<String, StudentProfile>,
}

/// Process-local implementation of every store. Vectors keep insertion order,
/// which is the listing order the registry and catalog promise.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or replaces a profile in the directory.
    pub fn put_profile(&self, profile: StudentProfile) {
        self.lock().profiles.insert(profile.id.clone(), profile);
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store mutex poisoned")
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn insert(&self, quiz: &QuizTemplate) -> Result<()> {
        let mut tables = self.lock();
        if tables.quizzes.iter().any(|q| q.id == quiz.id) {
            return Err(Error::Conflict(format!("Quiz {} already exists", quiz.id)));
        }
        tables.quizzes.push(quiz.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<QuizTemplate>> {
        Ok(self.lock().quizzes.iter().find(|q| q.id == id).cloned())
    }

    async fn list(&self, filter: &QuizFilter) -> Result<Vec<QuizTemplate>> {
        Ok(self
            .lock()
            .quizzes
            .iter()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.lock();
        let before = tables.quizzes.len();
        tables.quizzes.retain(|q| q.id != id);
        Ok(tables.quizzes.len() != before)
    }
}

#[async_trait]
impl ActivationStore for MemoryStore {
    async fn insert(&self, activation: &TestActivation) -> Result<()> {
        let mut tables = self.lock();
        if tables.activations.iter().any(|a| a.id == activation.id) {
            return Err(Error::Conflict(format!(
                "Activation {} already exists",
                activation.id
            )));
        }
        tables.activations.push(activation.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<TestActivation>> {
        Ok(self.lock().activations.iter().find(|a| a.id == id).cloned())
    }

    async fn list(&self, filter: &ActivationFilter) -> Result<Vec<TestActivation>> {
        Ok(self
            .lock()
            .activations
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<TestActivation>> {
        let mut tables = self.lock();
        Ok(tables
            .activations
            .iter_mut()
            .find(|a| a.id == id)
            .map(|a| {
                a.is_active = active;
                a.clone()
            }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.lock();
        let before = tables.activations.len();
        tables.activations.retain(|a| a.id != id);
        Ok(tables.activations.len() != before)
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn create(&self, result: &QuizResult) -> Result<()> {
        let mut tables = self.lock();
        if tables.results.iter().any(|r| r.id == result.id) {
            return Ok(());
        }
        if let Some(existing) = tables
            .results
            .iter()
            .find(|r| r.student_id == result.student_id && r.quiz_id == result.quiz_id)
        {
            return Err(Error::AlreadyAttempted {
                score: existing.score,
                total: existing.total_questions,
            });
        }
        tables.results.push(result.clone());
        Ok(())
    }

    async fn find(&self, student_id: &str, quiz_id: Uuid) -> Result<Option<QuizResult>> {
        Ok(self
            .lock()
            .results
            .iter()
            .find(|r| r.student_id == student_id && r.quiz_id == quiz_id)
            .cloned())
    }

    async fn list(&self, filter: &ResultFilter) -> Result<Vec<QuizResult>> {
        Ok(self
            .lock()
            .results
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn delete_submitted_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.lock();
        let before = tables.results.len();
        tables.results.retain(|r| r.submitted_at >= cutoff);
        Ok((before - tables.results.len()) as u64)
    }
}

#[async_trait]
impl ViolationStore for MemoryStore {
    async fn append(&self, record: &ViolationRecord) -> Result<()> {
        self.lock().violations.push(record.clone());
        Ok(())
    }

    async fn list(&self, filter: &ViolationFilter) -> Result<Vec<ViolationRecord>> {
        Ok(self
            .lock()
            .violations
            .iter()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect())
    }

    async fn summary(&self) -> Result<Vec<ViolationSummary>> {
        let tables = self.lock();
        let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
        for v in &tables.violations {
            *counts.entry(v.test_name.as_str()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(test_name, count)| ViolationSummary {
                test_name: test_name.to_string(),
                count,
            })
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.lock();
        let before = tables.violations.len();
        tables.violations.retain(|v| v.id != id);
        Ok(tables.violations.len() != before)
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut tables = self.lock();
        let removed = tables.violations.len() as u64;
        tables.violations.clear();
        Ok(removed)
    }
}

#[async_trait]
impl ProfileDirectory for MemoryStore {
    async fn get(&self, student_id: &str) -> Result<Option<StudentProfile>> {
        Ok(self.lock().profiles.get(student_id).cloned())
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::quiz::QuizTemplate;

/// A teacher's rollout of a quiz to one (department, division) cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TestActivation {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub quiz_title: String,
    pub assigned_by: String,
    pub department: String,
    pub division: String,
    pub is_active: bool,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ActivationFilter {
    pub department: Option<String>,
    pub division: Option<String>,
    pub assigned_by: Option<String>,
}

impl ActivationFilter {
    pub fn matches(&self, a: &TestActivation) -> bool {
        self.department.as_ref().map_or(true, |d| &a.department == d)
            && self.division.as_ref().map_or(true, |d| &a.division == d)
            && self.assigned_by.as_ref().map_or(true, |t| &a.assigned_by == t)
    }
}

/// What a student sees in the available-tests list.
#[derive(Debug, Clone)]
pub struct EligibleTest {
    pub activation: TestActivation,
    pub quiz: QuizTemplate,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One loss of foreground focus during an active session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ViolationRecord {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub student_id: String,
    pub student_name: String,
    pub test_name: String,
    pub violation_number: i32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ViolationFilter {
    pub test_name: Option<String>,
    pub quiz_id: Option<Uuid>,
}

impl ViolationFilter {
    pub fn matches(&self, v: &ViolationRecord) -> bool {
        self.test_name.as_ref().map_or(true, |t| &v.test_name == t)
            && self.quiz_id.map_or(true, |q| v.quiz_id == q)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ViolationSummary {
    pub test_name: String,
    pub count: i64,
}

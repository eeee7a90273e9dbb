use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::activation::EligibleTest;
use crate::models::quiz_result::{QuizResult, SubmissionType};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateActivationPayload {
    pub quiz_id: Uuid,
    #[validate(length(min = 1, message = "Department is required"))]
    pub department: String,
    #[validate(length(min = 1, message = "Division is required"))]
    pub division: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActivePayload {
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivationQuery {
    pub department: Option<String>,
    pub division: Option<String>,
    pub mine: Option<bool>,
}

/// Prior result shown next to a test the student already took.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub score: i32,
    pub total_questions: i32,
    pub submission_type: SubmissionType,
    pub submitted_at: DateTime<Utc>,
}

impl From<&QuizResult> for AttemptSummary {
    fn from(r: &QuizResult) -> Self {
        Self {
            score: r.score,
            total_questions: r.total_questions,
            submission_type: r.submission_type,
            submitted_at: r.submitted_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableTest {
    pub activation_id: Uuid,
    pub quiz_id: Uuid,
    pub title: String,
    pub college_year: i32,
    pub semester: i32,
    pub time_limit_minutes: i32,
    pub total_questions: i32,
    pub assigned_by: String,
    pub assigned_at: DateTime<Utc>,
    pub attempt: Option<AttemptSummary>,
}

impl AvailableTest {
    pub fn new(test: &EligibleTest, prior: Option<&QuizResult>) -> Self {
        Self {
            activation_id: test.activation.id,
            quiz_id: test.quiz.id,
            title: test.quiz.title.clone(),
            college_year: test.quiz.college_year,
            semester: test.quiz.semester,
            time_limit_minutes: test.quiz.time_limit_minutes,
            total_questions: test.quiz.total_questions(),
            assigned_by: test.activation.assigned_by.clone(),
            assigned_at: test.activation.assigned_at,
            attempt: prior.map(AttemptSummary::from),
        }
    }
}

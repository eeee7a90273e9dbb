use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionType {
    Normal,
    Timeout,
    ViolationAutoSubmit,
}

impl SubmissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionType::Normal => "NORMAL",
            SubmissionType::Timeout => "TIMEOUT",
            SubmissionType::ViolationAutoSubmit => "VIOLATION_AUTO_SUBMIT",
        }
    }
}

impl fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NORMAL" => Ok(SubmissionType::Normal),
            "TIMEOUT" => Ok(SubmissionType::Timeout),
            "VIOLATION_AUTO_SUBMIT" => Ok(SubmissionType::ViolationAutoSubmit),
            other => Err(format!("unknown submission type '{}'", other)),
        }
    }
}

/// Academic context copied into a result at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicSnapshot {
    pub prn: Option<String>,
    pub division: Option<String>,
    pub department: String,
    pub college_year: Option<i32>,
    pub semester: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub quiz_title: String,
    pub student_id: String,
    pub student_name: String,
    #[serde(flatten)]
    pub snapshot: AcademicSnapshot,
    pub score: i32,
    pub total_questions: i32,
    pub submitted_at: DateTime<Utc>,
    pub submission_type: SubmissionType,
}

impl QuizResult {
    /// Auto-submitted for integrity violations; teachers review these separately.
    pub fn is_flagged(&self) -> bool {
        self.submission_type == SubmissionType::ViolationAutoSubmit
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResultFilter {
    pub department: Option<String>,
    pub division: Option<String>,
    pub college_year: Option<i32>,
    pub semester: Option<i32>,
    pub quiz_ids: Option<Vec<Uuid>>,
}

impl ResultFilter {
    pub fn matches(&self, r: &QuizResult) -> bool {
        self.department
            .as_ref()
            .map_or(true, |d| &r.snapshot.department == d)
            && self
                .division
                .as_ref()
                .map_or(true, |d| r.snapshot.division.as_ref() == Some(d))
            && self
                .college_year
                .map_or(true, |y| r.snapshot.college_year == Some(y))
            && self.semester.map_or(true, |s| r.snapshot.semester == Some(s))
            && self
                .quiz_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&r.quiz_id))
    }
}

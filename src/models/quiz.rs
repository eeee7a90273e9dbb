use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of option slots every question carries.
pub const OPTION_SLOTS: usize = 4;

/// A teacher-authored quiz. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizTemplate {
    pub id: Uuid,
    pub title: String,
    pub created_by: String,
    pub college_year: i32,
    pub semester: i32,
    pub questions: Vec<Question>,
    pub time_limit_minutes: i32,
    pub created_at: DateTime<Utc>,
}

impl QuizTemplate {
    pub fn total_questions(&self) -> i32 {
        self.questions.len() as i32
    }

    pub fn is_attemptable(&self) -> bool {
        !self.questions.is_empty()
    }

    pub fn question(&self, question_id: Uuid) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub text: String,
    pub options: Vec<String>,
    pub correct_option: usize,
}

impl Question {
    /// Options a student can actually pick.
    pub fn filled_options(&self) -> usize {
        self.options.iter().filter(|o| !o.trim().is_empty()).count()
    }

    pub fn accepts(&self, option: usize) -> bool {
        option < self.options.len()
    }
}

/// Question as shown to a student during a session: no answer key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: Uuid,
    pub text: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            text: q.text.clone(),
            options: q.options.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuizFilter {
    pub created_by: Option<String>,
    pub college_year: Option<i32>,
    pub semester: Option<i32>,
}

impl QuizFilter {
    pub fn matches(&self, quiz: &QuizTemplate) -> bool {
        self.created_by.as_ref().map_or(true, |c| &quiz.created_by == c)
            && self.college_year.map_or(true, |y| quiz.college_year == y)
            && self.semester.map_or(true, |s| quiz.semester == s)
    }
}

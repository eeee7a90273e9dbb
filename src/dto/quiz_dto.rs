use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuizPayload {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(range(min = 1, max = 4, message = "College year must be between 1 and 4"))]
    pub college_year: i32,
    #[validate(range(min = 1, max = 8, message = "Semester must be between 1 and 8"))]
    pub semester: i32,
    #[validate(range(min = 1, message = "Time limit must be at least 1 minute"))]
    pub time_limit_minutes: i32,
    #[validate(length(min = 1, message = "At least one question is required"), nested)]
    pub questions: Vec<QuestionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionPayload {
    pub id: Option<Uuid>,
    #[validate(length(min = 1, message = "Question text is required"))]
    pub text: String,
    #[validate(length(max = 4, message = "A question has at most 4 options"))]
    pub options: Vec<String>,
    pub correct_option: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuizQuery {
    pub college_year: Option<i32>,
    pub semester: Option<i32>,
    /// Restrict to quizzes authored by the caller.
    pub mine: Option<bool>,
}

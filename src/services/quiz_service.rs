use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::dto::quiz_dto::{CreateQuizPayload, QuestionPayload};
use crate::error::{Error, Result};
use crate::models::quiz::{Question, QuizFilter, QuizTemplate, OPTION_SLOTS};
use crate::session::Clock;
use crate::store::QuizStore;

#[derive(Clone)]
pub struct QuizService {
    store: Arc<dyn QuizStore>,
    clock: Arc<dyn Clock>,
}

impl QuizService {
    pub fn new(store: Arc<dyn QuizStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create(&self, payload: CreateQuizPayload, created_by: &str) -> Result<QuizTemplate> {
        payload.validate()?;
        let title = payload.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("Title is required".to_string()));
        }

        let questions = payload
            .questions
            .into_iter()
            .enumerate()
            .map(|(idx, q)| build_question(idx, q))
            .collect::<Result<Vec<_>>>()?;
        let mut seen = HashSet::with_capacity(questions.len());
        if let Some(dup) = questions.iter().find(|q| !seen.insert(q.id)) {
            return Err(Error::InvalidInput(format!(
                "Question id {} is used more than once",
                dup.id
            )));
        }

        let quiz = QuizTemplate {
            id: Uuid::new_v4(),
            title: title.to_string(),
            created_by: created_by.to_string(),
            college_year: payload.college_year,
            semester: payload.semester,
            questions,
            time_limit_minutes: payload.time_limit_minutes,
            created_at: self.clock.now(),
        };
        self.store.insert(&quiz).await?;
        tracing::info!(
            quiz_id = %quiz.id,
            created_by = %quiz.created_by,
            questions = quiz.questions.len(),
            "Quiz created"
        );
        Ok(quiz)
    }

    pub async fn get(&self, id: Uuid) -> Result<QuizTemplate> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Quiz {} not found", id)))
    }

    pub async fn list(&self, filter: &QuizFilter) -> Result<Vec<QuizTemplate>> {
        self.store.list(filter).await
    }

    /// Hard delete. Activations pointing at the quiz are left in place and
    /// stop showing up for students.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(Error::NotFound(format!("Quiz {} not found", id)));
        }
        tracing::info!(quiz_id = %id, "Quiz deleted");
        Ok(())
    }
}

fn build_question(idx: usize, q: QuestionPayload) -> Result<Question> {
    let number = idx + 1;
    let text = q.text.trim();
    if text.is_empty() {
        return Err(Error::InvalidInput(format!("Question {} has no text", number)));
    }
    if q.options.len() > OPTION_SLOTS {
        return Err(Error::InvalidInput(format!(
            "Question {} has more than {} options",
            number, OPTION_SLOTS
        )));
    }

    let mut options: Vec<String> = q.options.iter().map(|o| o.trim().to_string()).collect();
    options.resize(OPTION_SLOTS, String::new());

    let question = Question {
        id: q.id.unwrap_or_else(Uuid::new_v4),
        text: text.to_string(),
        options,
        correct_option: q.correct_option,
    };
    if question.filled_options() < 2 {
        return Err(Error::InvalidInput(format!(
            "Question {} needs at least 2 non-empty options",
            number
        )));
    }
    match question.options.get(question.correct_option) {
        Some(option) if !option.is_empty() => Ok(question),
        _ => Err(Error::InvalidInput(format!(
            "Question {} marks an empty or missing option as correct",
            number
        ))),
    }
}

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::quiz::Question;

pub struct GradingService;

impl GradingService {
    /// Number of questions whose captured answer equals the correct option.
    /// Unanswered questions and answers to unknown questions earn nothing.
    pub fn score(questions: &[Question], answers: &HashMap<Uuid, usize>) -> i32 {
        questions
            .iter()
            .filter(|q| answers.get(&q.id) == Some(&q.correct_option))
            .count() as i32
    }
}

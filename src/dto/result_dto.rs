use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::quiz_result::QuizResult;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultQuery {
    pub department: Option<String>,
    pub division: Option<String>,
    pub college_year: Option<i32>,
    pub semester: Option<i32>,
    pub quiz_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PruneQuery {
    pub months: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneResponse {
    pub deleted: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    #[serde(flatten)]
    pub result: QuizResult,
    pub flagged: bool,
}

impl From<QuizResult> for ResultView {
    fn from(result: QuizResult) -> Self {
        let flagged = result.is_flagged();
        Self { result, flagged }
    }
}

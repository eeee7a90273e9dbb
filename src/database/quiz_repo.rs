use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{is_unique_violation, Error, Result};
use crate::models::quiz::{Question, QuizFilter, QuizTemplate};
use crate::store::QuizStore;

#[derive(FromRow)]
struct QuizRow {
    id: Uuid,
    title: String,
    created_by: String,
    college_year: i32,
    semester: i32,
    questions: Json<Vec<Question>>,
    time_limit_minutes: i32,
    created_at: DateTime<Utc>,
}

impl From<QuizRow> for QuizTemplate {
    fn from(row: QuizRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            created_by: row.created_by,
            college_year: row.college_year,
            semester: row.semester,
            questions: row.questions.0,
            time_limit_minutes: row.time_limit_minutes,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgQuizStore {
    pool: PgPool,
}

impl PgQuizStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizStore for PgQuizStore {
    async fn insert(&self, quiz: &QuizTemplate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO quizzes (
                id, title, created_by, college_year, semester, questions, time_limit_minutes, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(quiz.id)
        .bind(&quiz.title)
        .bind(&quiz.created_by)
        .bind(quiz.college_year)
        .bind(quiz.semester)
        .bind(Json(quiz.questions.clone()))
        .bind(quiz.time_limit_minutes)
        .bind(quiz.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict(format!("Quiz {} already exists", quiz.id))
            } else {
                Error::from(e)
            }
        })?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<QuizTemplate>> {
        let row = sqlx::query_as::<_, QuizRow>(
            r#"
            SELECT id, title, created_by, college_year, semester, questions, time_limit_minutes, created_at
            FROM quizzes WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(QuizTemplate::from))
    }

    async fn list(&self, filter: &QuizFilter) -> Result<Vec<QuizTemplate>> {
        let rows = sqlx::query_as::<_, QuizRow>(
            r#"
            SELECT id, title, created_by, college_year, semester, questions, time_limit_minutes, created_at
            FROM quizzes
            WHERE ($1::text IS NULL OR created_by = $1)
              AND ($2::int IS NULL OR college_year = $2)
              AND ($3::int IS NULL OR semester = $3)
            ORDER BY seq
            "#,
        )
        .bind(filter.created_by.clone())
        .bind(filter.college_year)
        .bind(filter.semester)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(QuizTemplate::from).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

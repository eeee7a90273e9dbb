use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{is_unique_violation, Error, Result};
use crate::models::quiz_result::{AcademicSnapshot, QuizResult, ResultFilter, SubmissionType};
use crate::store::ResultStore;

const COLUMNS: &str = "id, quiz_id, quiz_title, student_id, student_name, prn, division, department, \
     college_year, semester, score, total_questions, submitted_at, submission_type";

#[derive(FromRow)]
struct ResultRow {
    id: Uuid,
    quiz_id: Uuid,
    quiz_title: String,
    student_id: String,
    student_name: String,
    prn: Option<String>,
    division: Option<String>,
    department: String,
    college_year: Option<i32>,
    semester: Option<i32>,
    score: i32,
    total_questions: i32,
    submitted_at: DateTime<Utc>,
    submission_type: String,
}

impl TryFrom<ResultRow> for QuizResult {
    type Error = Error;

    fn try_from(row: ResultRow) -> Result<Self> {
        let submission_type: SubmissionType = row.submission_type.parse().map_err(Error::Internal)?;
        Ok(Self {
            id: row.id,
            quiz_id: row.quiz_id,
            quiz_title: row.quiz_title,
            student_id: row.student_id,
            student_name: row.student_name,
            snapshot: AcademicSnapshot {
                prn: row.prn,
                division: row.division,
                department: row.department,
                college_year: row.college_year,
                semester: row.semester,
            },
            score: row.score,
            total_questions: row.total_questions,
            submitted_at: row.submitted_at,
            submission_type,
        })
    }
}

#[derive(Clone)]
pub struct PgResultStore {
    pool: PgPool,
}

impl PgResultStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn create(&self, result: &QuizResult) -> Result<()> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO quiz_results (
                id, quiz_id, quiz_title, student_id, student_name, prn, division, department,
                college_year, semester, score, total_questions, submitted_at, submission_type
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(result.id)
        .bind(result.quiz_id)
        .bind(&result.quiz_title)
        .bind(&result.student_id)
        .bind(&result.student_name)
        .bind(&result.snapshot.prn)
        .bind(&result.snapshot.division)
        .bind(&result.snapshot.department)
        .bind(result.snapshot.college_year)
        .bind(result.snapshot.semester)
        .bind(result.score)
        .bind(result.total_questions)
        .bind(result.submitted_at)
        .bind(result.submission_type.as_str())
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                // The (student, quiz) index fired: another session already stored a result.
                let existing = self.find(&result.student_id, result.quiz_id).await?;
                let (score, total) = existing
                    .map(|r| (r.score, r.total_questions))
                    .unwrap_or((0, result.total_questions));
                Err(Error::AlreadyAttempted { score, total })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find(&self, student_id: &str, quiz_id: Uuid) -> Result<Option<QuizResult>> {
        let row = sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {} FROM quiz_results WHERE student_id = $1 AND quiz_id = $2",
            COLUMNS
        ))
        .bind(student_id)
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(QuizResult::try_from).transpose()
    }

    async fn list(&self, filter: &ResultFilter) -> Result<Vec<QuizResult>> {
        let rows = sqlx::query_as::<_, ResultRow>(&format!(
            r#"
            SELECT {} FROM quiz_results
            WHERE ($1::text IS NULL OR department = $1)
              AND ($2::text IS NULL OR division = $2)
              AND ($3::int IS NULL OR college_year = $3)
              AND ($4::int IS NULL OR semester = $4)
              AND ($5::uuid[] IS NULL OR quiz_id = ANY($5))
            ORDER BY seq
            "#,
            COLUMNS
        ))
        .bind(filter.department.clone())
        .bind(filter.division.clone())
        .bind(filter.college_year)
        .bind(filter.semester)
        .bind(filter.quiz_ids.clone())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(QuizResult::try_from).collect()
    }

    async fn delete_submitted_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM quiz_results WHERE submitted_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::violation::{ViolationFilter, ViolationRecord, ViolationSummary};
use crate::store::ViolationStore;

#[derive(Clone)]
pub struct PgViolationStore {
    pool: PgPool,
}

impl PgViolationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ViolationStore for PgViolationStore {
    async fn append(&self, record: &ViolationRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO test_violations (
                id, quiz_id, student_id, student_name, test_name, violation_number, occurred_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.quiz_id)
        .bind(&record.student_id)
        .bind(&record.student_name)
        .bind(&record.test_name)
        .bind(record.violation_number)
        .bind(record.occurred_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, filter: &ViolationFilter) -> Result<Vec<ViolationRecord>> {
        let rows = sqlx::query_as::<_, ViolationRecord>(
            r#"
            SELECT id, quiz_id, student_id, student_name, test_name, violation_number, occurred_at
            FROM test_violations
            WHERE ($1::text IS NULL OR test_name = $1)
              AND ($2::uuid IS NULL OR quiz_id = $2)
            ORDER BY seq
            "#,
        )
        .bind(filter.test_name.clone())
        .bind(filter.quiz_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn summary(&self) -> Result<Vec<ViolationSummary>> {
        let rows = sqlx::query_as::<_, ViolationSummary>(
            r#"
            SELECT test_name, COUNT(*) AS count
            FROM test_violations
            GROUP BY test_name
            ORDER BY test_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM test_violations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM test_violations")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

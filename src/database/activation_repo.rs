use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{is_unique_violation, Error, Result};
use crate::models::activation::{ActivationFilter, TestActivation};
use crate::store::ActivationStore;

const COLUMNS: &str =
    "id, quiz_id, quiz_title, assigned_by, department, division, is_active, assigned_at";

#[derive(Clone)]
pub struct PgActivationStore {
    pool: PgPool,
}

impl PgActivationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivationStore for PgActivationStore {
    async fn insert(&self, activation: &TestActivation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO test_activations (
                id, quiz_id, quiz_title, assigned_by, department, division, is_active, assigned_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(activation.id)
        .bind(activation.quiz_id)
        .bind(&activation.quiz_title)
        .bind(&activation.assigned_by)
        .bind(&activation.department)
        .bind(&activation.division)
        .bind(activation.is_active)
        .bind(activation.assigned_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict(format!("Activation {} already exists", activation.id))
            } else {
                Error::from(e)
            }
        })?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<TestActivation>> {
        let row = sqlx::query_as::<_, TestActivation>(&format!(
            "SELECT {} FROM test_activations WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list(&self, filter: &ActivationFilter) -> Result<Vec<TestActivation>> {
        let rows = sqlx::query_as::<_, TestActivation>(&format!(
            r#"
            SELECT {} FROM test_activations
            WHERE ($1::text IS NULL OR department = $1)
              AND ($2::text IS NULL OR division = $2)
              AND ($3::text IS NULL OR assigned_by = $3)
            ORDER BY seq
            "#,
            COLUMNS
        ))
        .bind(filter.department.clone())
        .bind(filter.division.clone())
        .bind(filter.assigned_by.clone())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<TestActivation>> {
        let row = sqlx::query_as::<_, TestActivation>(&format!(
            "UPDATE test_activations SET is_active = $2 WHERE id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM test_activations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

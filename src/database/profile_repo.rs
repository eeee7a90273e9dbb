use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::profile::StudentProfile;
use crate::store::ProfileDirectory;

/// Reads student accounts from the portal's shared `users` table.
#[derive(Clone)]
pub struct PgProfileDirectory {
    pool: PgPool,
}

impl PgProfileDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileDirectory for PgProfileDirectory {
    async fn get(&self, student_id: &str) -> Result<Option<StudentProfile>> {
        let row = sqlx::query_as::<_, StudentProfile>(
            r#"
            SELECT id, full_name, department, division, prn, college_year, semester
            FROM users
            WHERE id = $1 AND role = 'STUDENT'
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

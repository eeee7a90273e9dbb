use std::sync::Arc;

use chrono::Months;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::quiz_result::{QuizResult, ResultFilter};
use crate::session::Clock;
use crate::store::ResultStore;

#[derive(Clone)]
pub struct ResultService {
    store: Arc<dyn ResultStore>,
    clock: Arc<dyn Clock>,
}

impl ResultService {
    pub fn new(store: Arc<dyn ResultStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn list(&self, filter: &ResultFilter) -> Result<Vec<QuizResult>> {
        self.store.list(filter).await
    }

    pub async fn find(&self, student_id: &str, quiz_id: Uuid) -> Result<Option<QuizResult>> {
        self.store.find(student_id, quiz_id).await
    }

    /// Deletes results submitted more than `months` calendar months ago.
    pub async fn prune_older_than(&self, months: u32) -> Result<u64> {
        if months == 0 {
            return Err(Error::InvalidInput(
                "Retention must be at least 1 month".to_string(),
            ));
        }
        let cutoff = self
            .clock
            .now()
            .checked_sub_months(Months::new(months))
            .ok_or_else(|| Error::InvalidInput(format!("Retention of {} months is out of range", months)))?;
        let deleted = self.store.delete_submitted_before(cutoff).await?;
        tracing::info!(months, %cutoff, deleted, "Pruned old quiz results");
        Ok(deleted)
    }
}

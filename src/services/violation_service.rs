use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::violation::{ViolationFilter, ViolationRecord, ViolationSummary};
use crate::store::ViolationStore;

#[derive(Clone)]
pub struct ViolationService {
    store: Arc<dyn ViolationStore>,
}

impl ViolationService {
    pub fn new(store: Arc<dyn ViolationStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, filter: &ViolationFilter) -> Result<Vec<ViolationRecord>> {
        self.store.list(filter).await
    }

    pub async fn summary(&self) -> Result<Vec<ViolationSummary>> {
        self.store.summary().await
    }

    pub async fn delete_one(&self, id: Uuid) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(Error::NotFound(format!("Violation {} not found", id)));
        }
        Ok(())
    }

    pub async fn delete_all(&self) -> Result<u64> {
        let deleted = self.store.delete_all().await?;
        tracing::warn!(deleted, "Violation ledger cleared");
        Ok(deleted)
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViolationQuery {
    pub test_name: Option<String>,
    pub quiz_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteAllQuery {
    pub confirm: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: u64,
}

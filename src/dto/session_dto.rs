use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{SessionView, SubmissionOutcome, Visibility};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectAnswerPayload {
    pub question_id: Uuid,
    pub option: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityPayload {
    pub state: Visibility,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitPayload {
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartKind {
    Created,
    Resumed,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartResponse {
    pub kind: StartKind,
    pub session: SessionView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityVerdict {
    /// Back in the foreground; liveness refreshed only.
    Visible,
    Warned,
    AutoSubmitted,
    Ignored,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisibilityResponse {
    pub verdict: VisibilityVerdict,
    pub session: SessionView,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub outcome: SubmissionOutcome,
}

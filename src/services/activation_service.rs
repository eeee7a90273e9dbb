use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::dto::activation_dto::CreateActivationPayload;
use crate::error::{Error, Result};
use crate::models::activation::{ActivationFilter, EligibleTest, TestActivation};
use crate::models::profile::StudentProfile;
use crate::session::Clock;
use crate::store::{ActivationStore, QuizStore};

#[derive(Clone)]
pub struct ActivationService {
    activations: Arc<dyn ActivationStore>,
    quizzes: Arc<dyn QuizStore>,
    clock: Arc<dyn Clock>,
}

impl ActivationService {
    pub fn new(
        activations: Arc<dyn ActivationStore>,
        quizzes: Arc<dyn QuizStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            activations,
            quizzes,
            clock,
        }
    }

    /// Rolls a quiz out to a cohort. New activations start inactive.
    pub async fn create(
        &self,
        payload: CreateActivationPayload,
        assigned_by: &str,
    ) -> Result<TestActivation> {
        payload.validate()?;
        let department = payload.department.trim();
        let division = payload.division.trim();
        if department.is_empty() || division.is_empty() {
            return Err(Error::InvalidInput(
                "Department and division are required".to_string(),
            ));
        }

        let quiz = self
            .quizzes
            .get(payload.quiz_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Quiz {} not found", payload.quiz_id)))?;
        if !quiz.is_attemptable() {
            return Err(Error::InvalidInput(
                "A quiz without questions cannot be activated".to_string(),
            ));
        }

        let activation = TestActivation {
            id: Uuid::new_v4(),
            quiz_id: quiz.id,
            quiz_title: quiz.title.clone(),
            assigned_by: assigned_by.to_string(),
            department: department.to_string(),
            division: division.to_string(),
            is_active: false,
            assigned_at: self.clock.now(),
        };
        self.activations.insert(&activation).await?;
        tracing::info!(
            activation_id = %activation.id,
            quiz_id = %quiz.id,
            department = %activation.department,
            division = %activation.division,
            "Test activation created"
        );
        Ok(activation)
    }

    pub async fn get(&self, id: Uuid) -> Result<TestActivation> {
        self.activations
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Activation {} not found", id)))
    }

    pub async fn list(&self, filter: &ActivationFilter) -> Result<Vec<TestActivation>> {
        self.activations.list(filter).await
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<TestActivation> {
        let activation = self
            .activations
            .set_active(id, active)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Activation {} not found", id)))?;
        tracing::info!(activation_id = %id, is_active = active, "Test activation toggled");
        Ok(activation)
    }

    /// Removes future eligibility only; sessions already started are unaffected.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.activations.delete(id).await? {
            return Err(Error::NotFound(format!("Activation {} not found", id)));
        }
        tracing::info!(activation_id = %id, "Test activation deleted");
        Ok(())
    }

    /// Active activations for a cohort whose quiz still exists, has questions
    /// and matches the given year and semester. `None` skips that axis.
    pub async fn list_eligible(
        &self,
        department: &str,
        division: &str,
        college_year: Option<i32>,
        semester: Option<i32>,
    ) -> Result<Vec<EligibleTest>> {
        let filter = ActivationFilter {
            department: Some(department.to_string()),
            division: Some(division.to_string()),
            assigned_by: None,
        };
        let mut eligible = Vec::new();
        for activation in self.activations.list(&filter).await? {
            if !activation.is_active {
                continue;
            }
            let Some(quiz) = self.quizzes.get(activation.quiz_id).await? else {
                tracing::debug!(activation_id = %activation.id, "Skipping orphaned activation");
                continue;
            };
            if !quiz.is_attemptable() {
                continue;
            }
            if college_year.map_or(false, |y| y != quiz.college_year)
                || semester.map_or(false, |s| s != quiz.semester)
            {
                continue;
            }
            eligible.push(EligibleTest { activation, quiz });
        }
        Ok(eligible)
    }

    /// Students without a division are not part of any cohort yet.
    pub async fn eligible_for(&self, profile: &StudentProfile) -> Result<Vec<EligibleTest>> {
        let Some(division) = profile.division.as_deref().filter(|d| !d.is_empty()) else {
            return Ok(Vec::new());
        };
        if profile.department.is_empty() {
            return Ok(Vec::new());
        }
        self.list_eligible(
            &profile.department,
            division,
            profile.college_year,
            profile.semester,
        )
        .await
    }
}

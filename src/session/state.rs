use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EngineSettings;
use crate::error::{Error, Result};
use crate::models::profile::StudentProfile;
use crate::models::quiz::{PublicQuestion, QuizTemplate};
use crate::models::quiz_result::{QuizResult, SubmissionType};
use crate::services::grading_service::GradingService;

pub const MONITORING_NOTICE: &str =
    "Full screen is required. Leaving the test window is recorded as a violation.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Confirming,
    Active,
    Submitted,
}

/// Foreground visibility reported by the monitored client surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Hidden,
    Visible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationVerdict {
    /// The session continues; the warning stays up until `until`.
    Warned { count: u32, until: DateTime<Utc> },
    /// The violation limit was exceeded and the session must be submitted now.
    AutoSubmit { count: u32 },
    /// Focus changes outside an active session are not monitored.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDecision {
    Keep,
    Timeout,
    /// No client traffic since before the deadline; discard without a result.
    Abandon,
    /// Submitted and past the retention window.
    Purge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Persistence {
    Pending,
    Stored,
    /// Another session stored a result for the same (student, quiz) first.
    Rejected { score: i32, total: i32 },
}

#[derive(Debug, Clone)]
struct Resolution {
    result: QuizResult,
    persistence: Persistence,
    resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    pub session_id: Uuid,
    pub result_id: Uuid,
    pub quiz_id: Uuid,
    pub submission_type: SubmissionType,
    pub score: i32,
    pub total_questions: i32,
    pub flagged: bool,
    pub persisted: bool,
    pub retry_available: bool,
    pub notice: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub activation_id: Uuid,
    pub quiz_id: Uuid,
    pub title: String,
    pub state: SessionState,
    pub time_limit_minutes: i32,
    pub total_questions: i32,
    pub remaining_seconds: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub answers: HashMap<Uuid, usize>,
    pub answered: usize,
    pub violation_count: u32,
    pub violation_limit: u32,
    pub warning_active: bool,
    pub exclusive_display: bool,
    pub monitoring_notice: &'static str,
    /// Only populated while the session is active.
    pub questions: Vec<PublicQuestion>,
    pub outcome: Option<SubmissionOutcome>,
}

/// One student's single attempt at one quiz.
///
/// The template and the student profile are captured when the session is
/// created, so later catalog or registry edits do not affect it. All methods
/// are synchronous and take the current instant explicitly.
#[derive(Debug, Clone)]
pub struct ExamSession {
    id: Uuid,
    activation_id: Uuid,
    quiz: QuizTemplate,
    student: StudentProfile,
    state: SessionState,
    started_at: Option<DateTime<Utc>>,
    deadline: Option<DateTime<Utc>>,
    answers: HashMap<Uuid, usize>,
    violation_count: u32,
    warning_until: Option<DateTime<Utc>>,
    last_seen: DateTime<Utc>,
    display_held: bool,
    resolution: Option<Resolution>,
}

impl ExamSession {
    pub fn new(
        activation_id: Uuid,
        quiz: QuizTemplate,
        student: StudentProfile,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            activation_id,
            quiz,
            student,
            state: SessionState::Confirming,
            started_at: None,
            deadline: None,
            answers: HashMap::new(),
            violation_count: 0,
            warning_until: None,
            last_seen: now,
            display_held: false,
            resolution: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn quiz(&self) -> &QuizTemplate {
        &self.quiz
    }

    pub fn student(&self) -> &StudentProfile {
        &self.student
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn violation_count(&self) -> u32 {
        self.violation_count
    }

    pub fn answers(&self) -> &HashMap<Uuid, usize> {
        &self.answers
    }

    pub fn display_held(&self) -> bool {
        self.display_held
    }

    pub fn set_display_held(&mut self, held: bool) {
        self.display_held = held;
    }

    /// Records client traffic for abandonment detection.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_seen {
            self.last_seen = now;
        }
    }

    pub fn confirm(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.state {
            SessionState::Confirming => {}
            SessionState::Active => {
                return Err(Error::Conflict("Session has already started".to_string()))
            }
            SessionState::Submitted => {
                return Err(Error::SessionClosed("Session was already submitted".to_string()))
            }
        }
        self.state = SessionState::Active;
        self.started_at = Some(now);
        self.deadline = Some(now + Duration::minutes(self.quiz.time_limit_minutes as i64));
        self.violation_count = 0;
        self.warning_until = None;
        self.touch(now);
        Ok(())
    }

    /// Whole seconds left, rounded up so the counter shows 1 until the deadline itself.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        match (self.state, self.deadline) {
            (SessionState::Confirming, _) => self.quiz.time_limit_minutes as i64 * 60,
            (SessionState::Active, Some(deadline)) => {
                let ms = (deadline - now).num_milliseconds();
                if ms <= 0 {
                    0
                } else {
                    (ms + 999) / 1000
                }
            }
            _ => 0,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.state == SessionState::Active && self.remaining_seconds(now) == 0
    }

    pub fn select_answer(
        &mut self,
        question_id: Uuid,
        option: usize,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.require_active()?;
        let question = self
            .quiz
            .question(question_id)
            .ok_or_else(|| Error::NotFound(format!("Question {} is not part of this test", question_id)))?;
        if !question.accepts(option) {
            return Err(Error::InvalidInput(format!(
                "Option {} is out of range for question {}",
                option, question_id
            )));
        }
        self.answers.insert(question_id, option);
        self.touch(now);
        Ok(())
    }

    pub fn register_violation(
        &mut self,
        now: DateTime<Utc>,
        limit: u32,
        warning_display: std::time::Duration,
    ) -> ViolationVerdict {
        if self.state != SessionState::Active {
            return ViolationVerdict::Ignored;
        }
        self.violation_count += 1;
        self.touch(now);
        if self.violation_count > limit {
            self.warning_until = None;
            ViolationVerdict::AutoSubmit {
                count: self.violation_count,
            }
        } else {
            let until = now + to_chrono(warning_display);
            self.warning_until = Some(until);
            ViolationVerdict::Warned {
                count: self.violation_count,
                until,
            }
        }
    }

    pub fn warning_active(&self, now: DateTime<Utc>) -> bool {
        self.state == SessionState::Active && self.warning_until.map_or(false, |until| now < until)
    }

    /// Moves the session to SUBMITTED and returns the result to persist.
    ///
    /// `profile` is the student's profile as of now; its academic fields are
    /// copied into the result.
    pub fn resolve(
        &mut self,
        submission_type: SubmissionType,
        profile: &StudentProfile,
        now: DateTime<Utc>,
    ) -> Result<QuizResult> {
        self.require_active()?;
        let score = GradingService::score(&self.quiz.questions, &self.answers);
        let result = QuizResult {
            id: self.id,
            quiz_id: self.quiz.id,
            quiz_title: self.quiz.title.clone(),
            student_id: self.student.id.clone(),
            student_name: profile.full_name.clone(),
            snapshot: profile.snapshot(),
            score,
            total_questions: self.quiz.total_questions(),
            submitted_at: now,
            submission_type,
        };
        self.state = SessionState::Submitted;
        self.warning_until = None;
        self.resolution = Some(Resolution {
            result: result.clone(),
            persistence: Persistence::Pending,
            resolved_at: now,
        });
        Ok(result)
    }

    /// The computed result while it still has to reach the result store.
    pub fn pending_result(&self) -> Option<&QuizResult> {
        self.resolution
            .as_ref()
            .filter(|r| r.persistence == Persistence::Pending)
            .map(|r| &r.result)
    }

    pub fn mark_stored(&mut self) {
        if let Some(resolution) = self.resolution.as_mut() {
            resolution.persistence = Persistence::Stored;
        }
    }

    pub fn mark_rejected(&mut self, score: i32, total: i32) {
        if let Some(resolution) = self.resolution.as_mut() {
            resolution.persistence = Persistence::Rejected { score, total };
        }
    }

    /// Score on record when a concurrent session won the single attempt.
    pub fn rejection(&self) -> Option<(i32, i32)> {
        match self.resolution.as_ref().map(|r| &r.persistence) {
            Some(Persistence::Rejected { score, total }) => Some((*score, *total)),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<SubmissionOutcome> {
        let resolution = self.resolution.as_ref()?;
        let result = &resolution.result;
        let (persisted, retry_available, notice) = match resolution.persistence {
            Persistence::Stored => (true, false, notice_for(result)),
            Persistence::Pending => (
                false,
                true,
                "Your answers could not be saved. Please retry the submission.".to_string(),
            ),
            Persistence::Rejected { score, total } => (
                false,
                false,
                format!(
                    "This test was already submitted from another session. Score on record: {} / {}",
                    score, total
                ),
            ),
        };
        Some(SubmissionOutcome {
            session_id: self.id,
            result_id: result.id,
            quiz_id: result.quiz_id,
            submission_type: result.submission_type,
            score: result.score,
            total_questions: result.total_questions,
            flagged: result.is_flagged(),
            persisted,
            retry_available,
            notice,
        })
    }

    pub fn sweep_decision(&self, now: DateTime<Utc>, settings: &EngineSettings) -> SweepDecision {
        let stale_at = self.last_seen + to_chrono(settings.heartbeat_grace);
        match self.state {
            SessionState::Confirming if stale_at < now => SweepDecision::Abandon,
            SessionState::Confirming => SweepDecision::Keep,
            SessionState::Active => {
                let deadline = self.deadline.unwrap_or(now);
                if stale_at < now && stale_at < deadline {
                    SweepDecision::Abandon
                } else if self.is_expired(now) {
                    SweepDecision::Timeout
                } else {
                    SweepDecision::Keep
                }
            }
            SessionState::Submitted => match &self.resolution {
                Some(r) if r.resolved_at + to_chrono(settings.finished_retention) <= now => {
                    SweepDecision::Purge
                }
                _ => SweepDecision::Keep,
            },
        }
    }

    pub fn view(&self, now: DateTime<Utc>, settings: &EngineSettings) -> SessionView {
        let questions = if self.state == SessionState::Active {
            self.quiz.questions.iter().map(PublicQuestion::from).collect()
        } else {
            Vec::new()
        };
        SessionView {
            session_id: self.id,
            activation_id: self.activation_id,
            quiz_id: self.quiz.id,
            title: self.quiz.title.clone(),
            state: self.state,
            time_limit_minutes: self.quiz.time_limit_minutes,
            total_questions: self.quiz.total_questions(),
            remaining_seconds: self.remaining_seconds(now),
            started_at: self.started_at,
            deadline: self.deadline,
            answers: self.answers.clone(),
            answered: self.answers.len(),
            violation_count: self.violation_count,
            violation_limit: settings.violation_limit,
            warning_active: self.warning_active(now),
            exclusive_display: self.display_held,
            monitoring_notice: MONITORING_NOTICE,
            questions,
            outcome: self.outcome(),
        }
    }

    fn require_active(&self) -> Result<()> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Confirming => {
                Err(Error::Conflict("Session has not been confirmed yet".to_string()))
            }
            SessionState::Submitted => {
                Err(Error::SessionClosed("Session was already submitted".to_string()))
            }
        }
    }
}

fn notice_for(result: &QuizResult) -> String {
    match result.submission_type {
        SubmissionType::Normal => format!(
            "Test submitted! Your score: {} / {}",
            result.score, result.total_questions
        ),
        SubmissionType::Timeout => format!(
            "Time is up! Test submitted. Your score: {} / {}",
            result.score, result.total_questions
        ),
        SubmissionType::ViolationAutoSubmit => {
            "Test auto-submitted due to repeated tab switching violations. The submission is flagged for review."
                .to_string()
        }
    }
}

fn to_chrono(d: std::time::Duration) -> Duration {
    Duration::milliseconds(d.as_millis() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::Question;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn question(correct: usize) -> Question {
        Question {
            id: Uuid::new_v4(),
            text: format!("Pick {}", correct),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option: correct,
        }
    }

    fn quiz(correct: &[usize], minutes: i32) -> QuizTemplate {
        QuizTemplate {
            id: Uuid::new_v4(),
            title: "Data Structures Unit 1".into(),
            created_by: "teacher-1".into(),
            college_year: 2,
            semester: 3,
            questions: correct.iter().map(|c| question(*c)).collect(),
            time_limit_minutes: minutes,
            created_at: t0(),
        }
    }

    fn student() -> StudentProfile {
        StudentProfile {
            id: "stu-1".into(),
            full_name: "Asha Patil".into(),
            department: "CS".into(),
            division: Some("A".into()),
            prn: Some("PRN001".into()),
            college_year: Some(2),
            semester: Some(3),
        }
    }

    fn active_session(correct: &[usize], minutes: i32) -> ExamSession {
        let mut s = ExamSession::new(Uuid::new_v4(), quiz(correct, minutes), student(), t0());
        s.confirm(t0()).unwrap();
        s
    }

    #[test]
    fn confirm_starts_the_countdown() {
        let mut s = ExamSession::new(Uuid::new_v4(), quiz(&[0], 2), student(), t0());
        assert_eq!(s.state(), SessionState::Confirming);
        assert_eq!(s.remaining_seconds(t0()), 120);
        s.confirm(t0()).unwrap();
        assert_eq!(s.state(), SessionState::Active);
        assert_eq!(s.remaining_seconds(t0()), 120);
        assert!(matches!(s.confirm(t0()), Err(Error::Conflict(_))));
    }

    #[test]
    fn countdown_reaches_zero_exactly_at_deadline() {
        let s = active_session(&[0], 1);
        assert_eq!(s.remaining_seconds(t0() + Duration::seconds(59)), 1);
        assert_eq!(
            s.remaining_seconds(t0() + Duration::milliseconds(59_500)),
            1
        );
        assert!(!s.is_expired(t0() + Duration::milliseconds(59_999)));
        assert!(s.is_expired(t0() + Duration::seconds(60)));
        assert_eq!(s.remaining_seconds(t0() + Duration::seconds(75)), 0);
    }

    #[test]
    fn answers_upsert_and_validate_option_range() {
        let mut s = active_session(&[0, 1], 5);
        let q = s.quiz().questions[0].id;
        s.select_answer(q, 2, t0()).unwrap();
        s.select_answer(q, 0, t0()).unwrap();
        assert_eq!(s.answers().get(&q), Some(&0));
        assert_eq!(s.answers().len(), 1);

        assert!(matches!(
            s.select_answer(q, 4, t0()),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            s.select_answer(Uuid::new_v4(), 0, t0()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn answers_rejected_before_confirmation() {
        let mut s = ExamSession::new(Uuid::new_v4(), quiz(&[0], 5), student(), t0());
        let q = s.quiz().questions[0].id;
        assert!(matches!(s.select_answer(q, 0, t0()), Err(Error::Conflict(_))));
    }

    #[test]
    fn fourth_violation_requests_auto_submit() {
        let mut s = active_session(&[0], 5);
        let warn = std::time::Duration::from_secs(10);
        for expected in 1..=3 {
            match s.register_violation(t0(), 3, warn) {
                ViolationVerdict::Warned { count, until } => {
                    assert_eq!(count, expected);
                    assert_eq!(until, t0() + Duration::seconds(10));
                }
                other => panic!("unexpected verdict {:?}", other),
            }
            assert_eq!(s.state(), SessionState::Active);
        }
        assert_eq!(
            s.register_violation(t0(), 3, warn),
            ViolationVerdict::AutoSubmit { count: 4 }
        );
    }

    #[test]
    fn warning_dismisses_after_display_window() {
        let mut s = active_session(&[0], 5);
        s.register_violation(t0(), 3, std::time::Duration::from_secs(10));
        assert!(s.warning_active(t0() + Duration::seconds(9)));
        assert!(!s.warning_active(t0() + Duration::seconds(10)));
    }

    #[test]
    fn violations_outside_active_state_are_ignored() {
        let mut s = ExamSession::new(Uuid::new_v4(), quiz(&[0], 5), student(), t0());
        assert_eq!(
            s.register_violation(t0(), 3, std::time::Duration::from_secs(10)),
            ViolationVerdict::Ignored
        );
        assert_eq!(s.violation_count(), 0);
    }

    #[test]
    fn resolve_scores_and_snapshots_current_profile() {
        let mut s = active_session(&[0, 1, 2], 5);
        let ids: Vec<Uuid> = s.quiz().questions.iter().map(|q| q.id).collect();
        s.select_answer(ids[0], 0, t0()).unwrap();
        s.select_answer(ids[1], 3, t0()).unwrap();

        let mut moved = student();
        moved.division = Some("B".into());
        let result = s
            .resolve(SubmissionType::Normal, &moved, t0() + Duration::seconds(30))
            .unwrap();

        assert_eq!(result.score, 1);
        assert_eq!(result.total_questions, 3);
        assert_eq!(result.id, s.id());
        assert_eq!(result.snapshot.division.as_deref(), Some("B"));
        assert_eq!(s.state(), SessionState::Submitted);
        assert!(s.pending_result().is_some());

        assert!(matches!(
            s.resolve(SubmissionType::Timeout, &moved, t0()),
            Err(Error::SessionClosed(_))
        ));
        assert!(matches!(
            s.select_answer(ids[2], 2, t0()),
            Err(Error::SessionClosed(_))
        ));
    }

    #[test]
    fn outcome_reflects_persistence_state() {
        let mut s = active_session(&[0], 5);
        s.resolve(SubmissionType::ViolationAutoSubmit, &student(), t0())
            .unwrap();
        let pending = s.outcome().unwrap();
        assert!(!pending.persisted);
        assert!(pending.retry_available);
        assert!(pending.flagged);

        s.mark_stored();
        let stored = s.outcome().unwrap();
        assert!(stored.persisted);
        assert!(stored.notice.contains("tab switching"));
        assert!(s.pending_result().is_none());
    }

    #[test]
    fn sweep_tells_abandoned_from_timed_out() {
        let settings = EngineSettings {
            heartbeat_grace: std::time::Duration::from_secs(120),
            ..EngineSettings::default()
        };

        // Silent since the start of a 10 minute test: abandoned once the grace passes.
        let s = active_session(&[0], 10);
        assert_eq!(
            s.sweep_decision(t0() + Duration::seconds(100), &settings),
            SweepDecision::Keep
        );
        assert_eq!(
            s.sweep_decision(t0() + Duration::seconds(121), &settings),
            SweepDecision::Abandon
        );

        // Seen shortly before the deadline of a 1 minute test: times out normally.
        let mut s = active_session(&[0], 1);
        s.touch(t0() + Duration::seconds(50));
        assert_eq!(
            s.sweep_decision(t0() + Duration::seconds(60), &settings),
            SweepDecision::Timeout
        );
    }

    #[test]
    fn submitted_sessions_are_purged_after_retention() {
        let settings = EngineSettings::default();
        let mut s = active_session(&[0], 5);
        s.resolve(SubmissionType::Normal, &student(), t0()).unwrap();
        s.mark_stored();
        assert_eq!(s.sweep_decision(t0(), &settings), SweepDecision::Keep);
        assert_eq!(
            s.sweep_decision(t0() + Duration::seconds(300), &settings),
            SweepDecision::Purge
        );
    }
}

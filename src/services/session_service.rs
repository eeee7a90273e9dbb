use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::config::EngineSettings;
use crate::dto::activation_dto::AvailableTest;
use crate::error::{Error, Result};
use crate::models::profile::StudentProfile;
use crate::models::quiz_result::{QuizResult, SubmissionType};
use crate::models::violation::ViolationRecord;
use crate::services::activation_service::ActivationService;
use crate::session::{
    Clock, DisplayMode, ExamSession, SessionState, SessionView, SubmissionOutcome, SweepDecision,
    ViolationVerdict, Visibility,
};
use crate::store::Stores;

type SessionHandle = Arc<AsyncMutex<ExamSession>>;

struct Entry {
    student_id: String,
    quiz_id: Uuid,
    handle: SessionHandle,
}

#[derive(Default)]
struct Registry {
    sessions: HashMap<Uuid, Entry>,
    /// (student id, quiz id) to the live session for that pair.
    by_attempt: HashMap<(String, Uuid), Uuid>,
}

impl Registry {
    fn remove(&mut self, session_id: Uuid) {
        if let Some(entry) = self.sessions.remove(&session_id) {
            let key = (entry.student_id, entry.quiz_id);
            if self.by_attempt.get(&key) == Some(&session_id) {
                self.by_attempt.remove(&key);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum StartOutcome {
    /// A new session awaiting the student's confirmation.
    Created(SessionView),
    /// The student already had a live session for this quiz.
    Resumed(SessionView),
    AlreadyAttempted { score: i32, total: i32 },
}

/// Result of a visibility report.
#[derive(Debug, Clone)]
pub enum VisibilityOutcome {
    Visible(SessionView),
    Warned(SessionView),
    AutoSubmitted(SessionView),
    Ignored(SessionView),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub timed_out: usize,
    pub abandoned: usize,
    pub purged: usize,
}

/// Owns every in-flight exam session and drives it to exactly one result.
///
/// Each session sits behind its own async mutex, so timer evaluation, answer
/// capture and visibility events on one session never interleave. The
/// registry lock is only taken to look up, insert or drop handles and is
/// never held across an await.
#[derive(Clone)]
pub struct SessionService {
    inner: Arc<Inner>,
}

struct Inner {
    stores: Stores,
    activations: ActivationService,
    display: Arc<dyn DisplayMode>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
    registry: Mutex<Registry>,
}

impl SessionService {
    pub fn new(
        stores: Stores,
        display: Arc<dyn DisplayMode>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        let activations = ActivationService::new(
            stores.activations.clone(),
            stores.quizzes.clone(),
            clock.clone(),
        );
        Self {
            inner: Arc::new(Inner {
                stores,
                activations,
                display,
                clock,
                settings,
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.inner.settings
    }

    pub fn live_sessions(&self) -> usize {
        self.registry().sessions.len()
    }

    /// Tests the student may take, with the prior result attached where one exists.
    pub async fn available_tests(&self, student_id: &str) -> Result<Vec<AvailableTest>> {
        let profile = self.profile(student_id).await?;
        let mut tests = Vec::new();
        for test in self.inner.activations.eligible_for(&profile).await? {
            let prior = self
                .inner
                .stores
                .results
                .find(student_id, test.quiz.id)
                .await?;
            tests.push(AvailableTest::new(&test, prior.as_ref()));
        }
        Ok(tests)
    }

    pub async fn start(&self, student_id: &str, activation_id: Uuid) -> Result<StartOutcome> {
        let profile = self.profile(student_id).await?;
        let test = self
            .inner
            .activations
            .eligible_for(&profile)
            .await?
            .into_iter()
            .find(|t| t.activation.id == activation_id)
            .ok_or_else(|| {
                Error::NotEligible(format!("Test {} is not available to you", activation_id))
            })?;

        if let Some(prior) = self
            .inner
            .stores
            .results
            .find(student_id, test.quiz.id)
            .await?
        {
            tracing::info!(
                student_id,
                quiz_id = %test.quiz.id,
                score = prior.score,
                "Start refused, quiz already attempted"
            );
            return Ok(StartOutcome::AlreadyAttempted {
                score: prior.score,
                total: prior.total_questions,
            });
        }

        let now = self.now();
        let quiz_id = test.quiz.id;
        let (handle, resumed) = {
            let mut registry = self.registry();
            let key = (student_id.to_string(), quiz_id);
            let existing = registry
                .by_attempt
                .get(&key)
                .and_then(|id| registry.sessions.get(id))
                .map(|entry| entry.handle.clone());
            match existing {
                Some(handle) => (handle, true),
                None => {
                    let session = ExamSession::new(activation_id, test.quiz, profile, now);
                    let session_id = session.id();
                    let handle = Arc::new(AsyncMutex::new(session));
                    registry.sessions.insert(
                        session_id,
                        Entry {
                            student_id: student_id.to_string(),
                            quiz_id,
                            handle: handle.clone(),
                        },
                    );
                    registry.by_attempt.insert(key, session_id);
                    (handle, false)
                }
            }
        };

        let mut session = handle.lock().await;
        self.settle(&mut session, now).await;
        session.touch(now);
        let view = session.view(now, &self.inner.settings);
        if resumed {
            tracing::info!(session_id = %view.session_id, student_id, %quiz_id, "Session resumed");
            Ok(StartOutcome::Resumed(view))
        } else {
            tracing::info!(session_id = %view.session_id, student_id, %quiz_id, "Session created");
            Ok(StartOutcome::Created(view))
        }
    }

    /// Leaves the disclosure screen without starting. Nothing is recorded.
    pub async fn cancel(&self, session_id: Uuid, student_id: &str) -> Result<()> {
        let handle = self.handle(session_id, student_id)?;
        let session = handle.lock().await;
        if session.state() != SessionState::Confirming {
            return Err(Error::Conflict(
                "Only a session awaiting confirmation can be cancelled".to_string(),
            ));
        }
        self.registry().remove(session_id);
        tracing::info!(%session_id, student_id, "Session cancelled");
        Ok(())
    }

    pub async fn confirm(&self, session_id: Uuid, student_id: &str) -> Result<SessionView> {
        let handle = self.handle(session_id, student_id)?;
        let mut session = handle.lock().await;
        let now = self.now();
        session.confirm(now)?;
        tracing::info!(
            %session_id,
            student_id,
            quiz_id = %session.quiz().id,
            remaining_seconds = session.remaining_seconds(now),
            "Session started"
        );

        match self.inner.display.request_exclusive(session_id).await {
            Ok(()) => session.set_display_held(true),
            Err(e) => tracing::warn!(%session_id, error = %e, "Exclusive display request failed"),
        }
        Ok(session.view(now, &self.inner.settings))
    }

    pub async fn select_answer(
        &self,
        session_id: Uuid,
        student_id: &str,
        question_id: Uuid,
        option: usize,
    ) -> Result<SessionView> {
        let handle = self.handle(session_id, student_id)?;
        let mut session = handle.lock().await;
        let now = self.now();
        self.settle(&mut session, now).await;
        session.select_answer(question_id, option, now)?;
        Ok(session.view(now, &self.inner.settings))
    }

    pub async fn visibility(
        &self,
        session_id: Uuid,
        student_id: &str,
        visibility: Visibility,
    ) -> Result<VisibilityOutcome> {
        let handle = self.handle(session_id, student_id)?;
        let mut session = handle.lock().await;
        let now = self.now();
        self.settle(&mut session, now).await;

        if visibility == Visibility::Visible {
            session.touch(now);
            return Ok(VisibilityOutcome::Visible(
                session.view(now, &self.inner.settings),
            ));
        }

        let settings = &self.inner.settings;
        let verdict =
            session.register_violation(now, settings.violation_limit, settings.warning_display);
        let count = match verdict {
            ViolationVerdict::Ignored => {
                return Ok(VisibilityOutcome::Ignored(session.view(now, settings)))
            }
            ViolationVerdict::Warned { count, .. } | ViolationVerdict::AutoSubmit { count } => count,
        };
        self.record_violation(&session, count, now).await;

        if let ViolationVerdict::AutoSubmit { .. } = verdict {
            tracing::warn!(
                %session_id,
                student_id,
                violations = count,
                "Violation limit exceeded, auto-submitting"
            );
            self.resolve(&mut session, SubmissionType::ViolationAutoSubmit, now)
                .await?;
            return Ok(VisibilityOutcome::AutoSubmitted(session.view(now, settings)));
        }

        tracing::info!(%session_id, student_id, violations = count, "Violation warning shown");
        Ok(VisibilityOutcome::Warned(session.view(now, settings)))
    }

    /// Student-initiated submission. The client must have confirmed it.
    pub async fn submit(
        &self,
        session_id: Uuid,
        student_id: &str,
        confirmed: bool,
    ) -> Result<SubmissionOutcome> {
        if !confirmed {
            return Err(Error::BadRequest(
                "Submission must be explicitly confirmed".to_string(),
            ));
        }
        let handle = self.handle(session_id, student_id)?;
        let mut session = handle.lock().await;
        let now = self.now();
        self.settle(&mut session, now).await;
        self.resolve(&mut session, SubmissionType::Normal, now).await
    }

    /// Retries storing a result that failed to persist. The same result id is
    /// reused, so a store that did receive the first write treats this as a no-op.
    pub async fn retry(&self, session_id: Uuid, student_id: &str) -> Result<SubmissionOutcome> {
        let handle = self.handle(session_id, student_id)?;
        let mut session = handle.lock().await;
        if let Some(result) = session.pending_result().cloned() {
            tracing::info!(%session_id, result_id = %result.id, "Retrying result persistence");
            return self.persist(&mut session, result).await;
        }
        if let Some((score, total)) = session.rejection() {
            return Err(Error::AlreadyAttempted { score, total });
        }
        session
            .outcome()
            .ok_or_else(|| Error::Conflict("Session has not been submitted".to_string()))
    }

    pub async fn status(&self, session_id: Uuid, student_id: &str) -> Result<SessionView> {
        let handle = self.handle(session_id, student_id)?;
        let mut session = handle.lock().await;
        let now = self.now();
        self.settle(&mut session, now).await;
        Ok(session.view(now, &self.inner.settings))
    }

    /// Same as [`status`](Self::status) but also marks the client as alive.
    pub async fn heartbeat(&self, session_id: Uuid, student_id: &str) -> Result<SessionView> {
        let handle = self.handle(session_id, student_id)?;
        let mut session = handle.lock().await;
        let now = self.now();
        self.settle(&mut session, now).await;
        session.touch(now);
        Ok(session.view(now, &self.inner.settings))
    }

    /// One pass over every live session: resolves expired timers, drops
    /// abandoned sessions and purges submitted ones past retention.
    pub async fn sweep(&self) -> SweepReport {
        let handles: Vec<(Uuid, SessionHandle)> = self
            .registry()
            .sessions
            .iter()
            .map(|(id, entry)| (*id, entry.handle.clone()))
            .collect();

        let mut report = SweepReport::default();
        for (session_id, handle) in handles {
            let mut session = handle.lock().await;
            let now = self.now();
            match session.sweep_decision(now, &self.inner.settings) {
                SweepDecision::Keep => {}
                SweepDecision::Timeout => {
                    report.timed_out += 1;
                    if let Err(e) = self.resolve(&mut session, SubmissionType::Timeout, now).await {
                        tracing::warn!(%session_id, error = %e, "Timeout resolution did not persist");
                    }
                }
                SweepDecision::Abandon => {
                    report.abandoned += 1;
                    tracing::warn!(
                        %session_id,
                        student_id = %session.student().id,
                        state = ?session.state(),
                        "Session abandoned without a result"
                    );
                    self.release_display(&mut session).await;
                    self.registry().remove(session_id);
                }
                SweepDecision::Purge => {
                    report.purged += 1;
                    if session.pending_result().is_some() {
                        tracing::error!(
                            %session_id,
                            student_id = %session.student().id,
                            "Discarding session whose result was never stored"
                        );
                    }
                    self.registry().remove(session_id);
                }
            }
        }
        if report != SweepReport::default() {
            tracing::debug!(?report, "Session sweep finished");
        }
        report
    }

    fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn profile(&self, student_id: &str) -> Result<StudentProfile> {
        self.inner
            .stores
            .profiles
            .get(student_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Student {} not found", student_id)))
    }

    /// Looks up a session owned by `student_id`. Other students' sessions are
    /// reported as missing.
    fn handle(&self, session_id: Uuid, student_id: &str) -> Result<SessionHandle> {
        self.registry()
            .sessions
            .get(&session_id)
            .filter(|entry| entry.student_id == student_id)
            .map(|entry| entry.handle.clone())
            .ok_or_else(|| Error::NotFound(format!("Session {} not found", session_id)))
    }

    /// Applies the timer before any other operation touches the session.
    async fn settle(&self, session: &mut ExamSession, now: DateTime<Utc>) {
        if session.is_expired(now) {
            if let Err(e) = self.resolve(session, SubmissionType::Timeout, now).await {
                tracing::warn!(session_id = %session.id(), error = %e, "Timeout resolution did not persist");
            }
        }
    }

    async fn record_violation(&self, session: &ExamSession, count: u32, now: DateTime<Utc>) {
        let record = ViolationRecord {
            id: Uuid::new_v4(),
            quiz_id: session.quiz().id,
            student_id: session.student().id.clone(),
            student_name: session.student().full_name.clone(),
            test_name: session.quiz().title.clone(),
            violation_number: count as i32,
            occurred_at: now,
        };
        if let Err(e) = self.inner.stores.violations.append(&record).await {
            tracing::error!(
                session_id = %session.id(),
                violation_number = count,
                error = %e,
                "Failed to record violation"
            );
        }
    }

    async fn resolve(
        &self,
        session: &mut ExamSession,
        submission_type: SubmissionType,
        now: DateTime<Utc>,
    ) -> Result<SubmissionOutcome> {
        let student_id = session.student().id.clone();
        let profile = match self.inner.stores.profiles.get(&student_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => session.student().clone(),
            Err(e) => {
                tracing::warn!(%student_id, error = %e, "Profile lookup failed, using start-time profile");
                session.student().clone()
            }
        };

        let result = session.resolve(submission_type, &profile, now)?;
        tracing::info!(
            session_id = %session.id(),
            %student_id,
            quiz_id = %result.quiz_id,
            submission_type = %submission_type,
            score = result.score,
            total = result.total_questions,
            "Session submitted"
        );
        self.release_display(session).await;
        self.persist(session, result).await
    }

    async fn persist(&self, session: &mut ExamSession, result: QuizResult) -> Result<SubmissionOutcome> {
        match self.inner.stores.results.create(&result).await {
            Ok(()) => session.mark_stored(),
            Err(Error::AlreadyAttempted { score, total }) => {
                tracing::warn!(
                    session_id = %session.id(),
                    student_id = %result.student_id,
                    quiz_id = %result.quiz_id,
                    "Result rejected, another session already stored one"
                );
                session.mark_rejected(score, total);
                return Err(Error::AlreadyAttempted { score, total });
            }
            Err(e) => {
                tracing::error!(
                    session_id = %session.id(),
                    result_id = %result.id,
                    error = %e,
                    "Failed to persist quiz result"
                );
                return Err(Error::Persistence(format!(
                    "Submission could not be saved: {}",
                    e
                )));
            }
        }
        session
            .outcome()
            .ok_or_else(|| Error::Internal("Submitted session has no outcome".to_string()))
    }

    async fn release_display(&self, session: &mut ExamSession) {
        if !session.display_held() {
            return;
        }
        if let Err(e) = self.inner.display.release_exclusive(session.id()).await {
            tracing::debug!(session_id = %session.id(), error = %e, "Display release failed");
        }
        session.set_display_held(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activation::TestActivation;
    use crate::models::quiz::{Question, QuizTemplate};
    use crate::session::display::MockDisplayMode;
    use crate::session::{ClientDisplayMode, ManualClock};
    use crate::store::memory::MemoryStore;
    use crate::store::{
        ActivationStore, MockResultStore, MockViolationStore, QuizStore, ResultStore,
        ViolationStore,
    };
    use chrono::TimeZone;

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: ManualClock,
        quiz: QuizTemplate,
        activation: TestActivation,
    }

    fn student(id: &str, division: &str) -> StudentProfile {
        StudentProfile {
            id: id.into(),
            full_name: format!("Student {}", id),
            department: "CS".into(),
            division: Some(division.into()),
            prn: Some(format!("PRN-{}", id)),
            college_year: Some(2),
            semester: Some(3),
        }
    }

    async fn fixture(correct: &[usize], minutes: i32) -> Fixture {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 4, 6, 10, 0, 0).unwrap());
        let store = Arc::new(MemoryStore::new());
        let quiz = QuizTemplate {
            id: Uuid::new_v4(),
            title: "Discrete Maths".into(),
            created_by: "teacher-1".into(),
            college_year: 2,
            semester: 3,
            questions: correct
                .iter()
                .enumerate()
                .map(|(i, c)| Question {
                    id: Uuid::new_v4(),
                    text: format!("Q{}", i + 1),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_option: *c,
                })
                .collect(),
            time_limit_minutes: minutes,
            created_at: clock.now(),
        };
        let activation = TestActivation {
            id: Uuid::new_v4(),
            quiz_id: quiz.id,
            quiz_title: quiz.title.clone(),
            assigned_by: "teacher-1".into(),
            department: "CS".into(),
            division: "A".into(),
            is_active: true,
            assigned_at: clock.now(),
        };
        QuizStore::insert(store.as_ref(), &quiz).await.unwrap();
        ActivationStore::insert(store.as_ref(), &activation)
            .await
            .unwrap();
        store.put_profile(student("stu-1", "A"));
        Fixture {
            store,
            clock,
            quiz,
            activation,
        }
    }

    fn engine_with(stores: Stores, display: Arc<dyn DisplayMode>, clock: &ManualClock) -> SessionService {
        SessionService::new(stores, display, Arc::new(clock.clone()), EngineSettings::default())
    }

    fn engine(f: &Fixture) -> SessionService {
        engine_with(
            Stores::in_memory(f.store.clone()),
            Arc::new(ClientDisplayMode),
            &f.clock,
        )
    }

    async fn started(svc: &SessionService, f: &Fixture) -> Uuid {
        let view = match svc.start("stu-1", f.activation.id).await.unwrap() {
            StartOutcome::Created(view) => view,
            other => panic!("unexpected start outcome {:?}", other),
        };
        svc.confirm(view.session_id, "stu-1").await.unwrap();
        view.session_id
    }

    #[tokio::test]
    async fn start_requires_eligibility() {
        let f = fixture(&[0], 5).await;
        f.store.put_profile(student("stu-b", "B"));
        let svc = engine(&f);
        assert!(matches!(
            svc.start("stu-b", f.activation.id).await,
            Err(Error::NotEligible(_))
        ));
        assert!(matches!(
            svc.start("nobody", f.activation.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn second_start_resumes_the_live_session() {
        let f = fixture(&[0], 5).await;
        let svc = engine(&f);
        let first = match svc.start("stu-1", f.activation.id).await.unwrap() {
            StartOutcome::Created(view) => view.session_id,
            other => panic!("unexpected {:?}", other),
        };
        match svc.start("stu-1", f.activation.id).await.unwrap() {
            StartOutcome::Resumed(view) => assert_eq!(view.session_id, first),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(svc.live_sessions(), 1);
    }

    #[tokio::test]
    async fn cancel_leaves_no_trace() {
        let f = fixture(&[0], 5).await;
        let svc = engine(&f);
        let id = match svc.start("stu-1", f.activation.id).await.unwrap() {
            StartOutcome::Created(view) => view.session_id,
            other => panic!("unexpected {:?}", other),
        };
        svc.cancel(id, "stu-1").await.unwrap();
        assert_eq!(svc.live_sessions(), 0);
        assert!(matches!(
            svc.status(id, "stu-1").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn sessions_are_private_to_their_student() {
        let f = fixture(&[0], 5).await;
        let svc = engine(&f);
        let id = started(&svc, &f).await;
        assert!(matches!(
            svc.status(id, "stu-2").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn submit_scores_and_blocks_restart() {
        let f = fixture(&[0, 1, 2], 10).await;
        let svc = engine(&f);
        let id = started(&svc, &f).await;
        let q = &f.quiz.questions;
        svc.select_answer(id, "stu-1", q[0].id, 0).await.unwrap();
        svc.select_answer(id, "stu-1", q[1].id, 3).await.unwrap();

        assert!(matches!(
            svc.submit(id, "stu-1", false).await,
            Err(Error::BadRequest(_))
        ));
        let outcome = svc.submit(id, "stu-1", true).await.unwrap();
        assert_eq!((outcome.score, outcome.total_questions), (1, 3));
        assert_eq!(outcome.submission_type, SubmissionType::Normal);
        assert!(outcome.persisted);
        assert_eq!(outcome.notice, "Test submitted! Your score: 1 / 3");

        match svc.start("stu-1", f.activation.id).await.unwrap() {
            StartOutcome::AlreadyAttempted { score, total } => assert_eq!((score, total), (1, 3)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn fourth_hidden_signal_auto_submits() {
        let f = fixture(&[0, 1], 10).await;
        let svc = engine(&f);
        let id = started(&svc, &f).await;

        for _ in 0..3 {
            let outcome = svc.visibility(id, "stu-1", Visibility::Hidden).await.unwrap();
            assert!(matches!(outcome, VisibilityOutcome::Warned(ref v) if v.warning_active));
        }
        match svc.visibility(id, "stu-1", Visibility::Hidden).await.unwrap() {
            VisibilityOutcome::AutoSubmitted(view) => {
                let outcome = view.outcome.unwrap();
                assert_eq!(outcome.submission_type, SubmissionType::ViolationAutoSubmit);
                assert_eq!(outcome.score, 0);
                assert!(outcome.flagged);
            }
            other => panic!("unexpected {:?}", other),
        }
        let ledger = ViolationStore::list(f.store.as_ref(), &Default::default())
            .await
            .unwrap();
        let numbers: Vec<i32> = ledger.iter().map(|v| v.violation_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert!(ledger.iter().all(|v| v.test_name == "Discrete Maths"));

        assert!(matches!(
            svc.visibility(id, "stu-1", Visibility::Hidden).await.unwrap(),
            VisibilityOutcome::Ignored(_)
        ));
    }

    #[tokio::test]
    async fn hidden_before_confirmation_is_ignored() {
        let f = fixture(&[0], 5).await;
        let svc = engine(&f);
        let id = match svc.start("stu-1", f.activation.id).await.unwrap() {
            StartOutcome::Created(view) => view.session_id,
            other => panic!("unexpected {:?}", other),
        };
        assert!(matches!(
            svc.visibility(id, "stu-1", Visibility::Hidden).await.unwrap(),
            VisibilityOutcome::Ignored(_)
        ));
    }

    #[tokio::test]
    async fn timer_expiry_submits_captured_answers() {
        let f = fixture(&[2, 0], 1).await;
        let svc = engine(&f);
        let id = started(&svc, &f).await;
        svc.select_answer(id, "stu-1", f.quiz.questions[0].id, 2)
            .await
            .unwrap();

        f.clock.advance_secs(59);
        let view = svc.status(id, "stu-1").await.unwrap();
        assert_eq!(view.remaining_seconds, 1);
        assert_eq!(view.state, SessionState::Active);

        f.clock.advance_secs(1);
        let report = svc.sweep().await;
        assert_eq!(report.timed_out, 1);
        let view = svc.status(id, "stu-1").await.unwrap();
        let outcome = view.outcome.unwrap();
        assert_eq!(outcome.submission_type, SubmissionType::Timeout);
        assert_eq!(outcome.score, 1);
        assert!(outcome.notice.starts_with("Time is up!"));
    }

    #[tokio::test]
    async fn operations_after_deadline_resolve_timeout_first() {
        let f = fixture(&[0], 1).await;
        let svc = engine(&f);
        let id = started(&svc, &f).await;
        f.clock.advance_secs(61);
        assert!(matches!(
            svc.select_answer(id, "stu-1", f.quiz.questions[0].id, 0).await,
            Err(Error::SessionClosed(_))
        ));
        let stored = f.store.find("stu-1", f.quiz.id).await.unwrap().unwrap();
        assert_eq!(stored.submission_type, SubmissionType::Timeout);
        assert_eq!(stored.score, 0);
    }

    #[tokio::test]
    async fn persistence_failure_keeps_result_for_retry() {
        let f = fixture(&[1], 5).await;
        let mut results = MockResultStore::new();
        let mut calls = 0;
        results.expect_create().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(Error::Persistence("connection reset".into()))
            } else {
                Ok(())
            }
        });
        results.expect_find().returning(|_, _| Ok(None));

        let mut stores = Stores::in_memory(f.store.clone());
        stores.results = Arc::new(results);
        let svc = engine_with(stores, Arc::new(ClientDisplayMode), &f.clock);
        let id = started(&svc, &f).await;
        svc.select_answer(id, "stu-1", f.quiz.questions[0].id, 1)
            .await
            .unwrap();

        assert!(matches!(
            svc.submit(id, "stu-1", true).await,
            Err(Error::Persistence(_))
        ));
        let view = svc.status(id, "stu-1").await.unwrap();
        assert_eq!(view.state, SessionState::Submitted);
        assert!(view.outcome.as_ref().unwrap().retry_available);

        let outcome = svc.retry(id, "stu-1").await.unwrap();
        assert!(outcome.persisted);
        assert_eq!(outcome.score, 1);
        assert_eq!(outcome.result_id, id);
    }

    #[tokio::test]
    async fn late_uniqueness_conflict_surfaces_as_already_attempted() {
        let f = fixture(&[0], 5).await;
        let mut results = MockResultStore::new();
        results.expect_find().returning(|_, _| Ok(None));
        results
            .expect_create()
            .returning(|_| Err(Error::AlreadyAttempted { score: 4, total: 5 }));

        let mut stores = Stores::in_memory(f.store.clone());
        stores.results = Arc::new(results);
        let svc = engine_with(stores, Arc::new(ClientDisplayMode), &f.clock);
        let id = started(&svc, &f).await;

        match svc.submit(id, "stu-1", true).await {
            Err(Error::AlreadyAttempted { score, total }) => assert_eq!((score, total), (4, 5)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            svc.retry(id, "stu-1").await,
            Err(Error::AlreadyAttempted { .. })
        ));
    }

    #[tokio::test]
    async fn violation_ledger_failure_still_counts() {
        let f = fixture(&[0], 5).await;
        let mut violations = MockViolationStore::new();
        violations
            .expect_append()
            .returning(|_| Err(Error::Persistence("ledger down".into())));

        let mut stores = Stores::in_memory(f.store.clone());
        stores.violations = Arc::new(violations);
        let svc = engine_with(stores, Arc::new(ClientDisplayMode), &f.clock);
        let id = started(&svc, &f).await;

        svc.visibility(id, "stu-1", Visibility::Hidden).await.unwrap();
        let view = svc.status(id, "stu-1").await.unwrap();
        assert_eq!(view.violation_count, 1);
        assert_eq!(view.state, SessionState::Active);
    }

    #[tokio::test]
    async fn display_failures_never_block() {
        let f = fixture(&[0], 5).await;
        let mut display = MockDisplayMode::new();
        display
            .expect_request_exclusive()
            .returning(|_| Err(Error::Internal("fullscreen denied".into())));
        display.expect_release_exclusive().never();

        let svc = engine_with(Stores::in_memory(f.store.clone()), Arc::new(display), &f.clock);
        let id = started(&svc, &f).await;
        let view = svc.status(id, "stu-1").await.unwrap();
        assert!(!view.exclusive_display);
        assert!(svc.submit(id, "stu-1", true).await.is_ok());
    }

    #[tokio::test]
    async fn display_is_released_on_resolution() {
        let f = fixture(&[0], 5).await;
        let mut display = MockDisplayMode::new();
        display.expect_request_exclusive().times(1).returning(|_| Ok(()));
        display
            .expect_release_exclusive()
            .times(1)
            .returning(|_| Err(Error::Internal("already windowed".into())));

        let svc = engine_with(Stores::in_memory(f.store.clone()), Arc::new(display), &f.clock);
        let id = started(&svc, &f).await;
        svc.submit(id, "stu-1", true).await.unwrap();
        assert!(!svc.status(id, "stu-1").await.unwrap().exclusive_display);
    }

    #[tokio::test]
    async fn snapshot_uses_profile_at_submission() {
        let f = fixture(&[0], 5).await;
        let svc = engine(&f);
        let id = started(&svc, &f).await;
        let mut moved = student("stu-1", "A");
        moved.semester = Some(4);
        moved.prn = Some("PRN-NEW".into());
        f.store.put_profile(moved);

        svc.submit(id, "stu-1", true).await.unwrap();
        let stored = f.store.find("stu-1", f.quiz.id).await.unwrap().unwrap();
        assert_eq!(stored.snapshot.semester, Some(4));
        assert_eq!(stored.snapshot.prn.as_deref(), Some("PRN-NEW"));
    }

    #[tokio::test]
    async fn sweep_discards_abandoned_and_purges_finished() {
        let f = fixture(&[0], 30).await;
        let svc = engine(&f);
        let abandoned = started(&svc, &f).await;

        f.clock.advance_secs(121);
        let report = svc.sweep().await;
        assert_eq!(report.abandoned, 1);
        assert!(matches!(
            svc.status(abandoned, "stu-1").await,
            Err(Error::NotFound(_))
        ));
        assert!(f.store.find("stu-1", f.quiz.id).await.unwrap().is_none());

        let id = started(&svc, &f).await;
        svc.submit(id, "stu-1", true).await.unwrap();
        f.clock.advance_secs(300);
        assert_eq!(svc.sweep().await.purged, 1);
        assert_eq!(svc.live_sessions(), 0);
    }
}

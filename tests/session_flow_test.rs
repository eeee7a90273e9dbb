use std::sync::Arc;

use chrono::{TimeZone, Utc};
use proctor_backend::{
    config::EngineSettings,
    dto::{activation_dto::CreateActivationPayload, quiz_dto::{CreateQuizPayload, QuestionPayload}},
    error::Error,
    models::{
        profile::StudentProfile,
        quiz::QuizTemplate,
        quiz_result::{ResultFilter, SubmissionType},
        violation::ViolationFilter,
    },
    services::session_service::{SessionService, StartOutcome, VisibilityOutcome},
    session::{ClientDisplayMode, ManualClock, SessionState, Visibility},
    store::{memory::MemoryStore, Stores},
    AppState,
};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

struct World {
    store: Arc<MemoryStore>,
    clock: ManualClock,
    app: AppState,
}

fn world() -> World {
    let store = Arc::new(MemoryStore::new());
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 12, 9, 0, 0).unwrap());
    let app = AppState::new(
        Stores::in_memory(store.clone()),
        Arc::new(ClientDisplayMode),
        Arc::new(clock.clone()),
        EngineSettings::default(),
    );
    World { store, clock, app }
}

fn student(id: &str, division: &str, year: Option<i32>) -> StudentProfile {
    StudentProfile {
        id: id.to_string(),
        full_name: format!("Student {}", id),
        department: "CS".to_string(),
        division: Some(division.to_string()),
        prn: Some(format!("PRN-{}", id)),
        college_year: year,
        semester: None,
    }
}

async fn publish(w: &World, title: &str, year: i32, correct: &[usize], minutes: i32) -> (QuizTemplate, Uuid) {
    let quiz = w
        .app
        .quiz_service
        .create(
            CreateQuizPayload {
                title: title.to_string(),
                college_year: year,
                semester: year * 2 - 1,
                time_limit_minutes: minutes,
                questions: correct
                    .iter()
                    .enumerate()
                    .map(|(i, c)| QuestionPayload {
                        id: None,
                        text: format!("Question {}", i + 1),
                        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                        correct_option: *c,
                    })
                    .collect(),
            },
            "teacher-1",
        )
        .await
        .unwrap();
    let activation = w
        .app
        .activation_service
        .create(
            CreateActivationPayload {
                quiz_id: quiz.id,
                department: "CS".into(),
                division: "A".into(),
            },
            "teacher-1",
        )
        .await
        .unwrap();
    w.app
        .activation_service
        .set_active(activation.id, true)
        .await
        .unwrap();
    (quiz, activation.id)
}

async fn begin(engine: &SessionService, student_id: &str, activation_id: Uuid) -> Uuid {
    let id = match engine.start(student_id, activation_id).await.unwrap() {
        StartOutcome::Created(view) => view.session_id,
        other => panic!("expected a new session, got {:?}", other),
    };
    assert_ok!(engine.confirm(id, student_id).await);
    id
}

#[tokio::test]
async fn eligibility_follows_cohort_and_academic_year() {
    let w = world();
    let (year2, _) = publish(&w, "Algorithms", 2, &[0], 10).await;
    publish(&w, "Compilers", 3, &[0], 10).await;

    w.store.put_profile(student("a2", "A", Some(2)));
    w.store.put_profile(student("b2", "B", Some(2)));
    w.store.put_profile(student("a-unset", "A", None));

    let engine = &w.app.session_service;
    let seen = engine.available_tests("a2").await.unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].quiz_id, year2.id);
    assert!(seen[0].attempt.is_none());

    assert!(engine.available_tests("b2").await.unwrap().is_empty());
    assert_eq!(engine.available_tests("a-unset").await.unwrap().len(), 2);
}

#[tokio::test]
async fn full_attempt_then_restart_is_refused() {
    let w = world();
    let (quiz, activation_id) = publish(&w, "Databases", 2, &[0, 1, 2], 15).await;
    w.store.put_profile(student("s1", "A", Some(2)));
    let engine = &w.app.session_service;

    let id = begin(engine, "s1", activation_id).await;
    assert_ok!(engine.select_answer(id, "s1", quiz.questions[0].id, 0).await);
    assert_ok!(engine.select_answer(id, "s1", quiz.questions[1].id, 3).await);
    let outcome = engine.submit(id, "s1", true).await.unwrap();
    assert_eq!((outcome.score, outcome.total_questions), (1, 3));

    match engine.start("s1", activation_id).await.unwrap() {
        StartOutcome::AlreadyAttempted { score, total } => assert_eq!((score, total), (1, 3)),
        other => panic!("expected AlreadyAttempted, got {:?}", other),
    }
    let listed = engine.available_tests("s1").await.unwrap();
    assert_eq!(listed[0].attempt.as_ref().map(|a| a.score), Some(1));
}

#[tokio::test]
async fn two_engines_race_for_one_result() {
    let w = world();
    let (quiz, activation_id) = publish(&w, "Graphics", 2, &[1], 10).await;
    w.store.put_profile(student("s1", "A", Some(2)));

    // A second engine over the same stores, as a second server replica would be.
    let other = SessionService::new(
        Stores::in_memory(w.store.clone()),
        Arc::new(ClientDisplayMode),
        Arc::new(w.clock.clone()),
        EngineSettings::default(),
    );
    let first = begin(&w.app.session_service, "s1", activation_id).await;
    let second = begin(&other, "s1", activation_id).await;

    assert_ok!(
        w.app
            .session_service
            .select_answer(first, "s1", quiz.questions[0].id, 1)
            .await
    );
    assert_ok!(w.app.session_service.submit(first, "s1", true).await);

    match other.submit(second, "s1", true).await {
        Err(Error::AlreadyAttempted { score, total }) => assert_eq!((score, total), (1, 1)),
        other => panic!("expected late AlreadyAttempted, got {:?}", other),
    }
    let results = w.app.result_service.list(&ResultFilter::default()).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, first);
}

#[tokio::test]
async fn tab_switching_limit_and_timeout_in_parallel_sessions() {
    let w = world();
    let (quiz, activation_id) = publish(&w, "Networks", 2, &[3, 2], 1).await;
    w.store.put_profile(student("cheater", "A", Some(2)));
    w.store.put_profile(student("slow", "A", Some(2)));
    let engine = &w.app.session_service;

    let cheater = begin(engine, "cheater", activation_id).await;
    let slow = begin(engine, "slow", activation_id).await;
    assert_ok!(engine.select_answer(slow, "slow", quiz.questions[0].id, 3).await);

    for _ in 0..3 {
        assert!(matches!(
            engine.visibility(cheater, "cheater", Visibility::Hidden).await.unwrap(),
            VisibilityOutcome::Warned(_)
        ));
        assert_ok!(engine.visibility(cheater, "cheater", Visibility::Visible).await);
    }
    assert!(matches!(
        engine.visibility(cheater, "cheater", Visibility::Hidden).await.unwrap(),
        VisibilityOutcome::AutoSubmitted(_)
    ));

    w.clock.advance_secs(59);
    assert_eq!(engine.status(slow, "slow").await.unwrap().remaining_seconds, 1);
    w.clock.advance_secs(1);
    assert_eq!(engine.sweep().await.timed_out, 1);

    let slow_view = engine.status(slow, "slow").await.unwrap();
    assert_eq!(slow_view.state, SessionState::Submitted);
    assert_err!(engine.select_answer(slow, "slow", quiz.questions[1].id, 2).await);

    let results = w.app.result_service.list(&ResultFilter::default()).await.unwrap();
    let by_student = |id: &str| results.iter().find(|r| r.student_id == id).unwrap().clone();
    let flagged = by_student("cheater");
    assert_eq!(flagged.submission_type, SubmissionType::ViolationAutoSubmit);
    assert_eq!(flagged.score, 0);
    let timed_out = by_student("slow");
    assert_eq!(timed_out.submission_type, SubmissionType::Timeout);
    assert_eq!(timed_out.score, 1);

    let violations = w
        .app
        .violation_service
        .list(&ViolationFilter {
            test_name: Some("Networks".into()),
            quiz_id: None,
        })
        .await
        .unwrap();
    assert_eq!(violations.len(), 4);
    assert!(violations.iter().all(|v| v.student_id == "cheater"));
}

#[tokio::test]
async fn deleting_the_template_does_not_disturb_a_running_session() {
    let w = world();
    let (quiz, activation_id) = publish(&w, "Security", 2, &[2], 10).await;
    w.store.put_profile(student("s1", "A", Some(2)));
    let engine = &w.app.session_service;

    let id = begin(engine, "s1", activation_id).await;
    assert_ok!(w.app.activation_service.delete(activation_id).await);
    assert_ok!(w.app.quiz_service.delete(quiz.id).await);

    assert_ok!(engine.select_answer(id, "s1", quiz.questions[0].id, 2).await);
    let outcome = engine.submit(id, "s1", true).await.unwrap();
    assert_eq!(outcome.score, 1);
    assert!(engine.available_tests("s1").await.unwrap().is_empty());
}

#[tokio::test]
async fn pruning_twice_deletes_nothing_the_second_time() {
    let w = world();
    let (_, activation_id) = publish(&w, "Ethics", 2, &[0], 5).await;
    w.store.put_profile(student("s1", "A", Some(2)));
    let engine = &w.app.session_service;
    let id = begin(engine, "s1", activation_id).await;
    assert_ok!(engine.submit(id, "s1", true).await);

    w.clock.advance(chrono::Duration::days(70));
    assert_eq!(w.app.result_service.prune_older_than(2).await.unwrap(), 1);
    assert_eq!(w.app.result_service.prune_older_than(2).await.unwrap(), 0);
}

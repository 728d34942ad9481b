//! Survey service tests against an in-memory SQLite store.
//!
//! The pool holds a single connection so every session sees the same
//! database. A context that keeps a session attached must be dropped before
//! other contexts run.

use sea_orm::{ConnectOptions, ConnectionTrait};

use common::AppError;
use domain::{
    AnswerChanges, NewAnswer, NewQuestion, NewSurvey, NewUser, QuestionChanges, SurveyChanges,
    UserChanges,
};
use survey_service_lib::infra::{CallContext, Database, SessionProvider};
use survey_service_lib::prepare_database;
use survey_service_lib::repository::{QuestionRepository, SurveyRepository};
use survey_service_lib::service::{SurveyManager, SurveyService};

async fn setup() -> (SurveyManager, SessionProvider, Database) {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let conn = sea_orm::Database::connect(options)
        .await
        .expect("in-memory sqlite");
    let db = Database::from_connection(conn);
    assert!(prepare_database(&db, "sqlite::memory:").await);

    let sessions = SessionProvider::new(db.get_connection());
    (SurveyManager::new(sessions.clone()), sessions, db)
}

/// Run raw SQL outside any session.
async fn execute(db: &Database, sql: &str) {
    db.connection()
        .execute_unprepared(sql)
        .await
        .expect("raw statement");
}

/// Survey 1 with question 1, answered once by a new user.
async fn answered_by_user(service: &SurveyManager) -> (domain::User, domain::Answer) {
    let mut ctx = CallContext::new();

    service.create_survey(&mut ctx, new_survey("S")).await.unwrap();
    service
        .create_question(&mut ctx, new_question(1, "Q"))
        .await
        .unwrap();
    let user = service.create_user(&mut ctx, new_user("Ana")).await.unwrap();
    let answer = service
        .create_answer(&mut ctx, new_answer(1, Some(user.id), "yes"))
        .await
        .unwrap();

    (user, answer)
}

fn new_survey(title: &str) -> NewSurvey {
    NewSurvey {
        title: title.to_string(),
        ..Default::default()
    }
}

fn new_user(name: &str) -> NewUser {
    NewUser {
        name: name.to_string(),
        ..Default::default()
    }
}

fn new_question(survey_id: i32, text: &str) -> NewQuestion {
    NewQuestion {
        survey_id,
        text: text.to_string(),
    }
}

fn new_answer(question_id: i32, user_id: Option<i32>, text: &str) -> NewAnswer {
    NewAnswer {
        question_id,
        user_id,
        text: text.to_string(),
    }
}

// =============================================================================
// Create / read
// =============================================================================

#[tokio::test]
async fn satisfaction_survey_scenario() {
    let (service, _, _) = setup().await;

    let survey = service
        .create_survey(
            &mut CallContext::new(),
            NewSurvey {
                title: "Satisfaction".to_string(),
                description: Some("Q1".to_string()),
                status: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(survey.id, 1);
    assert_eq!(survey.title.as_deref(), Some("Satisfaction"));
    assert_eq!(survey.description.as_deref(), Some("Q1"));
    assert!(survey.created_at.is_some());

    let question = service
        .create_question(&mut CallContext::new(), new_question(1, "Rate us"))
        .await
        .unwrap();
    assert_eq!(question.id, 1);
    assert_eq!(question.survey_id, 1);
    assert_eq!(question.text.as_deref(), Some("Rate us"));

    let answer = service
        .create_answer(&mut CallContext::new(), new_answer(1, None, "5 stars"))
        .await
        .unwrap();
    assert_eq!(answer.id, 1);
    assert_eq!(answer.question_id, 1);
    assert_eq!(answer.user_id, None);
    assert_eq!(answer.text.as_deref(), Some("5 stars"));
    assert!(answer.recorded_at.is_some());

    // The answer still references the question
    let err = service
        .delete_question(&mut CallContext::new(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InUse(_)));

    let kept = service
        .get_question(&mut CallContext::new(), 1)
        .await
        .unwrap();
    assert_eq!(kept, question);
}

#[tokio::test]
async fn created_rows_read_back_unchanged() {
    let (service, _, _) = setup().await;

    let created = service
        .create_user(
            &mut CallContext::new(),
            NewUser {
                name: "Ana".to_string(),
                last_name: Some("Lopez".to_string()),
                email: Some("ana@example.com".to_string()),
                gender: Some("F".to_string()),
                phone: None,
            },
        )
        .await
        .unwrap();

    let fetched = service
        .get_user(&mut CallContext::new(), created.id)
        .await
        .unwrap();

    assert_eq!(fetched.name.as_deref(), Some("Ana"));
    assert_eq!(fetched.last_name.as_deref(), Some("Lopez"));
    assert_eq!(fetched.email.as_deref(), Some("ana@example.com"));
    assert_eq!(fetched.phone, None);
    assert!(fetched.created_at.is_some());
}

#[tokio::test]
async fn create_requires_fields() {
    let (service, _, _) = setup().await;

    let err = service
        .create_survey(&mut CallContext::new(), NewSurvey::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "'title' is required to create a survey");

    let err = service
        .create_user(&mut CallContext::new(), NewUser::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = service
        .create_answer(&mut CallContext::new(), new_answer(1, None, ""))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn question_for_missing_survey_is_not_inserted() {
    let (service, _, _) = setup().await;

    let err = service
        .create_question(&mut CallContext::new(), new_question(42, "Orphan"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(err.to_string(), "Survey not found with id: 42");

    service
        .create_survey(&mut CallContext::new(), new_survey("First"))
        .await
        .unwrap();
    let question = service
        .create_question(&mut CallContext::new(), new_question(1, "Rate us"))
        .await
        .unwrap();

    // The failed insert consumed no id
    assert_eq!(question.id, 1);
}

#[tokio::test]
async fn answer_parents_must_exist() {
    let (service, _, _) = setup().await;

    let err = service
        .create_answer(&mut CallContext::new(), new_answer(9, None, "yes"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Question not found with id: 9");

    service
        .create_survey(&mut CallContext::new(), new_survey("S"))
        .await
        .unwrap();
    service
        .create_question(&mut CallContext::new(), new_question(1, "Q"))
        .await
        .unwrap();

    let err = service
        .create_answer(&mut CallContext::new(), new_answer(1, Some(5), "yes"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "User not found with id: 5");

    let user = service
        .create_user(&mut CallContext::new(), new_user("Ana"))
        .await
        .unwrap();
    let answer = service
        .create_answer(&mut CallContext::new(), new_answer(1, Some(user.id), "yes"))
        .await
        .unwrap();
    assert_eq!(answer.user_id, Some(user.id));
}

#[tokio::test]
async fn reading_missing_rows_is_not_found() {
    let (service, _, _) = setup().await;
    let mut ctx = CallContext::new();

    assert!(matches!(
        service.get_survey(&mut ctx, 1).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        service.get_question(&mut ctx, 1).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        service.get_answer(&mut ctx, 1).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        service.get_user(&mut ctx, 1).await,
        Err(AppError::NotFound(_))
    ));
}

// =============================================================================
// Update
// =============================================================================

#[tokio::test]
async fn update_overwrites_every_mutable_field() {
    let (service, _, _) = setup().await;

    let survey = service
        .create_survey(
            &mut CallContext::new(),
            NewSurvey {
                title: "Satisfaction".to_string(),
                description: Some("Q1".to_string()),
                status: Some(1),
            },
        )
        .await
        .unwrap();

    let updated = service
        .update_survey(
            &mut CallContext::new(),
            SurveyChanges {
                id: survey.id,
                title: Some("Satisfaction 2024".to_string()),
                description: None,
                status: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title.as_deref(), Some("Satisfaction 2024"));
    assert_eq!(updated.description, None);
    assert_eq!(updated.status, None);
    assert_eq!(updated.created_at, survey.created_at);

    let fetched = service
        .get_survey(&mut CallContext::new(), survey.id)
        .await
        .unwrap();
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn update_of_missing_row_is_not_found() {
    let (service, _, _) = setup().await;

    let err = service
        .update_user(
            &mut CallContext::new(),
            UserChanges {
                id: 3,
                name: Some("Ghost".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "User not found with id: 3");

    let err = service
        .update_survey(&mut CallContext::new(), SurveyChanges::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn question_can_move_only_to_an_existing_survey() {
    let (service, _, _) = setup().await;
    let mut ctx = CallContext::new();

    service.create_survey(&mut ctx, new_survey("A")).await.unwrap();
    let target = service.create_survey(&mut ctx, new_survey("B")).await.unwrap();
    let question = service
        .create_question(&mut ctx, new_question(1, "Rate us"))
        .await
        .unwrap();

    let err = service
        .update_question(
            &mut ctx,
            QuestionChanges {
                id: question.id,
                survey_id: 99,
                text: Some("Rate us".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Survey not found with id: 99");

    let moved = service
        .update_question(
            &mut ctx,
            QuestionChanges {
                id: question.id,
                survey_id: target.id,
                text: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.survey_id, target.id);
    assert_eq!(moved.text, None);
}

#[tokio::test]
async fn answer_update_keeps_question_and_checks_user() {
    let (service, _, _) = setup().await;
    let mut ctx = CallContext::new();

    service.create_survey(&mut ctx, new_survey("S")).await.unwrap();
    service
        .create_question(&mut ctx, new_question(1, "Q"))
        .await
        .unwrap();
    let user = service.create_user(&mut ctx, new_user("Ana")).await.unwrap();
    let answer = service
        .create_answer(&mut ctx, new_answer(1, Some(user.id), "yes"))
        .await
        .unwrap();

    let err = service
        .update_answer(
            &mut ctx,
            AnswerChanges {
                id: answer.id,
                user_id: Some(77),
                text: Some("no".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let updated = service
        .update_answer(
            &mut ctx,
            AnswerChanges {
                id: answer.id,
                user_id: None,
                text: Some("no".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.question_id, 1);
    assert_eq!(updated.user_id, None);
    assert_eq!(updated.text.as_deref(), Some("no"));
    assert_eq!(updated.recorded_at, answer.recorded_at);
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn delete_then_read_is_not_found() {
    let (service, _, _) = setup().await;

    let survey = service
        .create_survey(&mut CallContext::new(), new_survey("Short lived"))
        .await
        .unwrap();

    assert!(service
        .delete_survey(&mut CallContext::new(), survey.id)
        .await
        .unwrap());
    assert!(matches!(
        service.get_survey(&mut CallContext::new(), survey.id).await,
        Err(AppError::NotFound(_))
    ));

    // A second delete reports the missing row instead of returning false
    assert!(matches!(
        service.delete_survey(&mut CallContext::new(), survey.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn survey_with_questions_cannot_be_deleted() {
    let (service, _, _) = setup().await;
    let mut ctx = CallContext::new();

    let survey = service.create_survey(&mut ctx, new_survey("S")).await.unwrap();
    let question = service
        .create_question(&mut ctx, new_question(survey.id, "Q"))
        .await
        .unwrap();

    let err = service.delete_survey(&mut ctx, survey.id).await.unwrap_err();
    assert!(matches!(err, AppError::InUse(_)));
    assert!(service.get_survey(&mut ctx, survey.id).await.is_ok());

    assert!(service.delete_question(&mut ctx, question.id).await.unwrap());
    assert!(service.delete_survey(&mut ctx, survey.id).await.unwrap());
}

#[tokio::test]
async fn deleting_a_user_orphans_their_answers() {
    let (service, _, _) = setup().await;
    let mut ctx = CallContext::new();

    service.create_survey(&mut ctx, new_survey("S")).await.unwrap();
    service
        .create_question(&mut ctx, new_question(1, "Q"))
        .await
        .unwrap();
    let user = service.create_user(&mut ctx, new_user("Ana")).await.unwrap();
    let answer = service
        .create_answer(&mut ctx, new_answer(1, Some(user.id), "yes"))
        .await
        .unwrap();

    assert!(service.delete_user(&mut ctx, user.id).await.unwrap());

    let orphan = service.get_answer(&mut ctx, answer.id).await.unwrap();
    assert_eq!(orphan.user_id, None);
    assert_eq!(orphan.text.as_deref(), Some("yes"));
    assert!(matches!(
        service.get_user(&mut ctx, user.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn answers_delete_freely() {
    let (service, _, _) = setup().await;
    let mut ctx = CallContext::new();

    service.create_survey(&mut ctx, new_survey("S")).await.unwrap();
    service
        .create_question(&mut ctx, new_question(1, "Q"))
        .await
        .unwrap();
    let answer = service
        .create_answer(&mut ctx, new_answer(1, None, "yes"))
        .await
        .unwrap();

    assert!(service.delete_answer(&mut ctx, answer.id).await.unwrap());
    assert!(service.delete_question(&mut ctx, 1).await.unwrap());
    assert!(matches!(
        service.delete_answer(&mut ctx, answer.id).await,
        Err(AppError::NotFound(_))
    ));
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn lists_are_ordered_by_id() {
    let (service, _, _) = setup().await;
    let mut ctx = CallContext::new();

    for title in ["first", "second", "third"] {
        service.create_survey(&mut ctx, new_survey(title)).await.unwrap();
    }
    service.create_user(&mut ctx, new_user("Ana")).await.unwrap();

    let surveys = service.list_surveys(&mut ctx).await.unwrap();
    let ids: Vec<i32> = surveys.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(surveys[2].title.as_deref(), Some("third"));

    let users = service.list_users(&mut ctx).await.unwrap();
    assert_eq!(users.len(), 1);
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn owned_sessions_are_released_after_each_call() {
    let (service, _, _) = setup().await;
    let mut ctx = CallContext::new();

    service.create_survey(&mut ctx, new_survey("S")).await.unwrap();
    assert!(!ctx.has_session());

    let _ = service.get_survey(&mut ctx, 404).await;
    assert!(!ctx.has_session());
}

#[tokio::test]
async fn attached_session_is_reused_across_calls() {
    let (service, sessions, _) = setup().await;

    {
        let mut ctx = CallContext::with_session(sessions.open());

        let survey = service.create_survey(&mut ctx, new_survey("S")).await.unwrap();
        let question = service
            .create_question(&mut ctx, new_question(survey.id, "Q"))
            .await
            .unwrap();
        assert_eq!(question.survey_id, survey.id);

        // A failing call leaves the caller's session attached as well
        assert!(service.get_answer(&mut ctx, 1).await.is_err());
        assert!(ctx.has_session());

        let session = ctx.take_session().expect("session stays attached");
        session.close();
    }

    // Committed work is visible to a fresh context
    let question = service
        .get_question(&mut CallContext::new(), 1)
        .await
        .unwrap();
    assert_eq!(question.text.as_deref(), Some("Q"));
}

// =============================================================================
// Write failures
// =============================================================================

#[tokio::test]
async fn failed_insert_is_a_persistence_error_with_driver_text() {
    let (service, _, db) = setup().await;
    execute(
        &db,
        "CREATE TRIGGER surveys_quota BEFORE INSERT ON surveys \
         BEGIN SELECT RAISE(ABORT, 'disk quota exceeded'); END",
    )
    .await;

    let mut ctx = CallContext::new();
    let err = service
        .create_survey(&mut ctx, new_survey("Satisfaction"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Persistence(_)));
    assert!(err.to_string().contains("disk quota exceeded"));
    assert!(!ctx.has_session());

    let status = tonic::Status::from(err);
    assert_eq!(status.code(), tonic::Code::Internal);
    assert!(status.message().contains("disk quota exceeded"));
}

#[tokio::test]
async fn failed_mutation_leaves_nothing_for_a_reused_session() {
    let (service, sessions, db) = setup().await;
    let (user, answer) = answered_by_user(&service).await;
    execute(
        &db,
        "CREATE TRIGGER users_locked BEFORE DELETE ON users \
         BEGIN SELECT RAISE(ABORT, 'users are locked'); END",
    )
    .await;

    {
        let mut ctx = CallContext::with_session(sessions.open());

        // Answers are detached before the delete fails
        let err = service.delete_user(&mut ctx, user.id).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert!(ctx.has_session());

        // The next call on the same context commits only its own work
        service
            .create_survey(&mut ctx, new_survey("After failure"))
            .await
            .unwrap();
    }

    let kept = service
        .get_answer(&mut CallContext::new(), answer.id)
        .await
        .unwrap();
    assert_eq!(kept.user_id, Some(user.id));
    assert!(service
        .get_user(&mut CallContext::new(), user.id)
        .await
        .is_ok());
}

// =============================================================================
// Schema-level delete rules
// =============================================================================

#[tokio::test]
async fn store_refuses_to_delete_a_survey_with_questions() {
    let (service, _, db) = setup().await;
    answered_by_user(&service).await;

    let err = SurveyRepository::new(db.connection())
        .delete(1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InUse(_)));

    let err = QuestionRepository::new(db.connection())
        .delete(1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InUse(_)));

    assert!(service
        .get_question(&mut CallContext::new(), 1)
        .await
        .is_ok());
}

#[tokio::test]
async fn store_clears_answers_of_a_deleted_user() {
    let (service, _, db) = setup().await;
    let (user, answer) = answered_by_user(&service).await;

    execute(&db, &format!("DELETE FROM users WHERE id = {}", user.id)).await;

    let orphan = service
        .get_answer(&mut CallContext::new(), answer.id)
        .await
        .unwrap();
    assert_eq!(orphan.user_id, None);
}

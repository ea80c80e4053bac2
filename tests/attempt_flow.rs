use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use examify_client::core::config::Settings;
use examify_client::services::answers::AnswerValue;
use examify_client::services::api_client::ApiClient;
use examify_client::services::attempt_session::{
    AttemptPhase, ExamAttemptSession, SubmitMode, SubmitOutcome,
};
use examify_client::services::observer::{Confirmed, NoopObserver, SubmissionOutcome};

type Submitted = Arc<Mutex<Vec<(String, Value)>>>;

async fn fake_backend(submitted: Submitted) -> anyhow::Result<String> {
    let router = Router::new()
        .route(
            "/api/auth/login",
            post(|| async { Json(json!({ "token": "t", "role": "student", "name": "Kiran" })) }),
        )
        .route(
            "/api/student/start/:exam_id",
            get(|| async {
                Json(json!({
                    "questions": [
                        { "_id": "q1", "questionText": "Capital of France?",
                          "options": { "A": "Rome", "B": "Madrid", "C": "Paris" }, "marks": 5 },
                        { "_id": "q2", "questionText": "Name a noble gas",
                          "questionType": "short", "marks": 5 }
                    ],
                    "previousAnswers": [],
                    "duration": 60
                }))
            }),
        )
        .route(
            "/api/student/submit/:exam_id",
            post(
                |State(submitted): State<Submitted>,
                 Path(exam_id): Path<String>,
                 Json(body): Json<Value>| async move {
                    if let Ok(mut submitted) = submitted.lock() {
                        submitted.push((exam_id, body));
                    }
                    Json(json!({ "obtainedMarks": 5, "totalMarks": 10 }))
                },
            ),
        )
        .with_state(submitted);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{addr}/api"))
}

#[tokio::test]
async fn student_answers_and_submits_over_http() -> anyhow::Result<()> {
    let submitted = Submitted::default();
    let url = fake_backend(submitted.clone()).await?;
    let settings = Settings::load_with(|key| (key == "EXAMIFY_API_URL").then(|| url.clone()))?;

    let mut client = ApiClient::from_settings(&settings)?;
    let context = client.login("kiran@school.test", "pw").await?;
    let session =
        ExamAttemptSession::new("exam-7", context, Arc::new(client), Arc::new(NoopObserver));

    session.start().await?;
    assert_eq!(session.remaining_seconds().await, 3600);

    session.set_answer("q1", AnswerValue::Choice("C".to_string())).await?;
    let outcome = session.submit(SubmitMode::Manual(&Confirmed)).await?;

    assert_eq!(
        outcome,
        SubmitOutcome::Submitted(SubmissionOutcome::Scored { obtained: 5.0, total: 10.0 })
    );
    assert_eq!(session.phase().await, AttemptPhase::Submitted);

    let submitted = submitted.lock().map_err(|_| anyhow::anyhow!("poisoned"))?.clone();
    assert_eq!(
        submitted,
        vec![(
            "exam-7".to_string(),
            json!({ "answers": [{ "questionId": "q1", "selectedOption": "C" }] })
        )]
    );

    Ok(())
}

//! Integration tests for the HTTP adapter and the study workflow against a mock backend.

use bytes::Bytes;
use client_lib::adapters::{FileKeyValueStore, HttpSessionBridge};
use client_lib::interactive::{run_quiz, QuizOutcome};
use mockito::{Matcher, Server};
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use studyflow_core::{
    GradeRequest, KeyValueStore, PortError, QuizKind, QuizQuestion, QuizRunner, SessionBridge, SessionId,
    StoreError, StudyError, StudyWorkflow, WrongNoteStore,
};
use tempfile::TempDir;

fn bridge_for(server: &Server, token: Option<&str>) -> HttpSessionBridge {
    let client = HttpSessionBridge::build_client(Duration::from_secs(5)).expect("client");
    HttpSessionBridge::new(client, server.url(), token.map(str::to_string))
}

fn workflow_for(server: &Server, temp_dir: &TempDir) -> StudyWorkflow {
    let storage = Arc::new(FileKeyValueStore::new(temp_dir.path().join("state")));
    StudyWorkflow::new(Arc::new(bridge_for(server, None)), storage, 10 * 1024 * 1024)
}

fn upload_body() -> serde_json::Value {
    json!({
        "sessionId": 17,
        "summary": "The French Revolution began in 1789.",
        "keywords": ["revolution", "1789"],
        "structuredSummary": [{ "title": "Cause", "content": "Debt" }],
        "fullSummary": [{ "mainTitle": "1. Background", "content": ["Debt crisis"] }],
        "expectedQuestions": [{ "question": "When?", "answer": "1789" }],
        "quizData": { "questions": [
            { "id": 1, "question": "When did it begin?", "options": ["1789", "1815"], "answer": "1789" },
            { "id": 2, "question": "Was Louis XVI executed?", "options": ["O", "X"], "answer": "O" },
            { "id": 3, "question": "Name one cause.", "options": [], "answer": "Debt" }
        ]},
        "pdfUrl": "/uploads/rev.pdf",
        "pdfText": "The French Revolution began in 1789 ..."
    })
}

#[tokio::test]
async fn grade_posts_question_and_answers() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/feedback")
        .match_header("authorization", "Bearer secret")
        .match_body(Matcher::Json(json!({
            "question": "What is 2+2?",
            "user_answer": "5",
            "correct_answer": "4"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "is_correct": false, "feedback": "It is 4." }).to_string())
        .create_async()
        .await;

    let grade = bridge_for(&server, Some("secret"))
        .grade(&GradeRequest {
            question: "What is 2+2?".into(),
            user_answer: "5".into(),
            correct_answer: "4".into(),
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(!grade.is_correct);
    assert_eq!(grade.feedback, "It is 4.");
}

#[tokio::test]
async fn backend_error_payloads_become_typed_errors() {
    let mut server = Server::new_async().await;
    let _save = server
        .mock("POST", "/study/save")
        .with_status(404)
        .with_body(json!({ "error": "session not found" }).to_string())
        .create_async()
        .await;
    let _list = server
        .mock("GET", "/mypage/files")
        .with_status(401)
        .with_body(json!({ "msg": "Missing Authorization Header" }).to_string())
        .create_async()
        .await;
    let _quiz = server
        .mock("POST", "/generate-quiz")
        .with_status(500)
        .with_body(json!({ "error": "quota exceeded" }).to_string())
        .create_async()
        .await;

    let bridge = bridge_for(&server, None);
    let save = bridge
        .save_session(&studyflow_core::SaveSessionRequest {
            session_id: SessionId(1),
            summary_data: None,
            quiz_data: None,
            wrong_notes: Vec::new(),
        })
        .await;
    assert!(matches!(save, Err(PortError::NotFound(m)) if m == "session not found"));

    assert!(matches!(bridge.list_saved().await, Err(PortError::Unauthorized)));

    let quiz = bridge.generate_quiz("text", 3, QuizKind::Short).await;
    assert!(matches!(
        quiz,
        Err(PortError::Backend { status: 500, message }) if message == "quota exceeded"
    ));
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat")
        .with_status(200)
        .with_body("<html>oops</html>")
        .create_async()
        .await;

    let result = bridge_for(&server, None).chat("why?", "text").await;
    assert!(matches!(result, Err(PortError::Decode(_))));
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let client = HttpSessionBridge::build_client(Duration::from_secs(2)).unwrap();
    let bridge = HttpSessionBridge::new(client, "http://127.0.0.1:9", None);
    assert!(matches!(bridge.list_saved().await, Err(PortError::Network(_))));
}

#[tokio::test]
async fn generate_quiz_sends_count_and_type() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/generate-quiz")
        .match_body(Matcher::Json(json!({ "text": "summary", "quiz_count": 5, "quiz_type": "truefalse" })))
        .with_status(200)
        .with_body(json!({ "quizData": { "questions": [
            { "id": 1, "question": "Is it?", "options": ["O", "X"], "answer": "O" }
        ]}}).to_string())
        .create_async()
        .await;

    let quiz = bridge_for(&server, None)
        .generate_quiz("summary", 5, QuizKind::TrueFalse)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(quiz.typed.questions.len(), 1);
    assert_eq!(quiz.raw["questions"][0]["answer"], "O");
}

#[tokio::test]
async fn pdf_and_delete_endpoints() {
    let mut server = Server::new_async().await;
    let _pdf = server
        .mock("POST", "/pdf")
        .match_body(Matcher::Regex(r#""keywords":\["revolution","1789"\]"#.into()))
        .with_status(200)
        .with_header("content-type", "application/pdf")
        .with_body(b"%PDF-1.7 body".to_vec())
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/mypage/files/4")
        .with_status(200)
        .with_body(json!({ "message": "deleted" }).to_string())
        .create_async()
        .await;
    let _upload = server
        .mock("POST", "/upload")
        .with_status(200)
        .with_body(upload_body().to_string())
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let workflow = workflow_for(&server, &temp_dir);
    workflow
        .upload_document("rev.pdf", Bytes::from_static(b"%PDF-1.4"), "Revolution", "history")
        .await
        .unwrap();

    let pdf = workflow.export_pdf().await.unwrap();
    assert!(pdf.starts_with(b"%PDF"));

    workflow.delete_saved(4).await.unwrap();
    delete.assert_async().await;
}

#[tokio::test]
async fn full_study_session_survives_a_restart_and_saves() {
    let mut server = Server::new_async().await;
    let upload = server
        .mock("POST", "/upload")
        .match_header("content-type", Matcher::Regex("multipart/form-data".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(upload_body().to_string())
        .create_async()
        .await;
    let _wrong = server
        .mock("POST", "/feedback")
        .match_body(Matcher::PartialJson(json!({ "correct_answer": "1789" })))
        .with_status(200)
        .with_body(json!({ "is_correct": false, "feedback": "It began in 1789." }).to_string())
        .create_async()
        .await;
    let _right = server
        .mock("POST", "/feedback")
        .match_body(Matcher::PartialJson(json!({ "correct_answer": "O" })))
        .with_status(200)
        .with_body(json!({ "is_correct": true, "feedback": "Correct" }).to_string())
        .create_async()
        .await;
    let _short = server
        .mock("POST", "/feedback")
        .match_body(Matcher::PartialJson(json!({ "correct_answer": "Debt" })))
        .with_status(200)
        .with_body(json!({ "is_correct": false, "feedback": "Think about finances." }).to_string())
        .create_async()
        .await;
    let save = server
        .mock("POST", "/study/save")
        .match_body(Matcher::PartialJson(json!({ "session_id": 17 })))
        .with_status(200)
        .with_body(json!({ "message": "saved" }).to_string())
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    {
        let workflow = workflow_for(&server, &temp_dir);
        let result = workflow
            .upload_document("rev.pdf", Bytes::from_static(b"%PDF-1.4"), "Revolution", "history")
            .await
            .unwrap();
        upload.assert_async().await;
        assert_eq!(result.keyword_list(), vec!["revolution", "1789"]);

        let mut runner = workflow.start_quiz().unwrap();
        for answer in ["1815", "O", "Bad weather"] {
            runner.select(answer).unwrap();
            runner.submit(workflow.bridge()).await.unwrap();
            runner.advance().unwrap();
        }
        assert!(runner.is_complete());
        assert_eq!(runner.results().len(), 3);
    }

    // A new process over the same state directory sees the same pending notes.
    let workflow = workflow_for(&server, &temp_dir);
    let notes = workflow.wrong_notes();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().any(|n| n.user_answer == "1815"));

    let saved = workflow.save_session().await.unwrap();
    save.assert_async().await;
    assert_eq!(saved, 2);
    assert!(workflow.wrong_notes().is_empty());
}

#[tokio::test]
async fn failed_save_keeps_notes_on_disk() {
    let mut server = Server::new_async().await;
    let _upload = server
        .mock("POST", "/upload")
        .with_status(200)
        .with_body(upload_body().to_string())
        .create_async()
        .await;
    let _feedback = server
        .mock("POST", "/feedback")
        .with_status(200)
        .with_body(json!({ "is_correct": false, "feedback": "No." }).to_string())
        .create_async()
        .await;
    let _save = server
        .mock("POST", "/study/save")
        .with_status(500)
        .with_body(json!({ "error": "database is down" }).to_string())
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let workflow = workflow_for(&server, &temp_dir);
    workflow
        .upload_document("rev.txt", Bytes::from_static(b"text"), "Revolution", "history")
        .await
        .unwrap();
    let mut runner = workflow.start_quiz().unwrap();
    runner.select("1815").unwrap();
    runner.submit(workflow.bridge()).await.unwrap();

    let before = workflow.wrong_notes();
    let err = workflow.save_session().await.unwrap_err();

    assert!(matches!(err, StudyError::Port(PortError::Backend { status: 500, .. })));
    assert_eq!(workflow.wrong_notes(), before);
}

#[tokio::test]
async fn fields_the_client_does_not_model_reach_the_save_request() {
    let mut server = Server::new_async().await;
    let mut body = upload_body();
    body["sourceMeta"] = json!({ "pages": 12, "ocr": true });
    body["quizData"]["difficulty"] = json!("hard");
    let _upload = server
        .mock("POST", "/upload")
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;
    let save = server
        .mock("POST", "/study/save")
        .match_body(Matcher::PartialJson(json!({
            "session_id": 17,
            "summary_data": { "sourceMeta": { "pages": 12, "ocr": true } },
            "quiz_data": { "difficulty": "hard" }
        })))
        .with_status(200)
        .with_body(json!({ "message": "saved" }).to_string())
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let workflow = workflow_for(&server, &temp_dir);
    workflow
        .upload_document("rev.pdf", Bytes::from_static(b"%PDF-1.4"), "Revolution", "history")
        .await
        .unwrap();
    workflow.save_session().await.unwrap();

    save.assert_async().await;
}

#[tokio::test]
async fn recorded_attempt_is_included_in_the_pdf() {
    let mut server = Server::new_async().await;
    let _upload = server
        .mock("POST", "/upload")
        .with_status(200)
        .with_body(upload_body().to_string())
        .create_async()
        .await;
    let _feedback = server
        .mock("POST", "/feedback")
        .with_status(200)
        .with_body(json!({ "is_correct": false, "feedback": "It began in 1789." }).to_string())
        .create_async()
        .await;
    let pdf = server
        .mock("POST", "/pdf")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""userAnswer":"1815""#.into()),
            Matcher::Regex(r#""isCorrect":false"#.into()),
        ]))
        .with_status(200)
        .with_body(b"%PDF-1.7".to_vec())
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    {
        let workflow = workflow_for(&server, &temp_dir);
        workflow
            .upload_document("rev.pdf", Bytes::from_static(b"%PDF-1.4"), "Revolution", "history")
            .await
            .unwrap();
        let mut runner = workflow.start_quiz().unwrap();
        runner.select("1815").unwrap();
        runner.submit(workflow.bridge()).await.unwrap();
        workflow.record_attempt(&runner).unwrap();
    }

    let workflow = workflow_for(&server, &temp_dir);
    workflow.export_pdf().await.unwrap();
    pdf.assert_async().await;
}

#[tokio::test]
async fn saved_session_can_be_shown_and_exported() {
    let mut server = Server::new_async().await;
    let _files = server
        .mock("GET", "/mypage/files")
        .with_status(200)
        .with_body(
            json!([{
                "id": 5,
                "custom_filename": "Revolution",
                "original_filename": "rev.pdf",
                "created_at": "2024-03-01 09:00:00",
                "is_saved": true,
                "summary_data": json!({ "summary": "It began in 1789.", "keywords": ["revolution"] }).to_string(),
                "quiz_data": json!({ "questions": [
                    { "question": "When did it begin?", "options": ["1789", "1815"], "answer": "1789" }
                ]}).to_string(),
                "wrong_notes_data": json!([{
                    "question": "When did it begin?", "user_answer": "1815", "correct_answer": "1789",
                    "explanation": null, "created_at": "2024-03-01T09:00:00+00:00"
                }]).to_string()
            }])
            .to_string(),
        )
        .create_async()
        .await;
    let pdf = server
        .mock("POST", "/pdf")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({ "summary": { "summary": "It began in 1789." } })),
            Matcher::Regex(r#""keywords":\["revolution"\]"#.into()),
        ]))
        .with_status(200)
        .with_body(b"%PDF-1.7".to_vec())
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let workflow = workflow_for(&server, &temp_dir);

    let saved = workflow.saved_session(5).await.unwrap();
    assert_eq!(saved.summary_text().as_deref(), Some("It began in 1789."));
    assert_eq!(saved.wrong_notes().into_option().unwrap().len(), 1);

    let (session, bytes) = workflow.export_saved_pdf(5).await.unwrap();
    pdf.assert_async().await;
    assert_eq!(session.custom_filename, "Revolution");
    assert!(bytes.starts_with(b"%PDF"));

    let missing = workflow.export_saved_pdf(6).await.unwrap_err();
    assert!(matches!(missing, StudyError::Port(PortError::NotFound(_))));
}

/// Storage that refuses every write.
struct FullDisk;

impl KeyValueStore for FullDisk {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Write {
            key: key.to_string(),
            message: "no space left on device".to_string(),
        })
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn interactive_quiz_warns_when_a_wrong_note_is_not_saved() {
    let mut server = Server::new_async().await;
    let _feedback = server
        .mock("POST", "/feedback")
        .with_status(200)
        .with_body(json!({ "is_correct": false, "feedback": "It began in 1789." }).to_string())
        .create_async()
        .await;
    let question: QuizQuestion = serde_json::from_value(json!({
        "id": 1, "question": "When did it begin?", "options": ["1789", "1815"], "answer": "1789"
    }))
    .unwrap();
    let mut runner = QuizRunner::new(vec![question], WrongNoteStore::new(Arc::new(FullDisk))).unwrap();
    let bridge = bridge_for(&server, None);
    let mut input = Cursor::new("2\n\n");
    let mut out = Vec::new();

    let outcome = run_quiz(&mut runner, &bridge, &mut input, &mut out).await.unwrap();

    let printed = String::from_utf8(out).unwrap();
    assert_eq!(outcome, QuizOutcome::Completed);
    assert!(printed.contains("could not be added to your notes"));
    assert!(printed.contains("Incorrect. The answer is: 1789"));
    assert_eq!(runner.results().len(), 1);
}

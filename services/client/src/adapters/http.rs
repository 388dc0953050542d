//! services/client/src/adapters/http.rs
//!
//! This module contains the adapter for the study backend's HTTP API.
//! It implements the `SessionBridge` port from the `core` crate using `reqwest`.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use studyflow_core::{
    domain::{Grade, Payload, QuizData, QuizKind, SavedSession, UploadResult},
    ports::{
        GradeRequest, PdfRequest, PortError, PortResult, SaveSessionRequest, SessionBridge,
        UploadRequest,
    },
};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `SessionBridge` over the backend's REST endpoints.
#[derive(Clone)]
pub struct HttpSessionBridge {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpSessionBridge {
    /// Creates a new `HttpSessionBridge`. `token` is sent as a bearer token when present.
    pub fn new(client: Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Builds the `reqwest` client used by the adapter.
    pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
        Client::builder().timeout(timeout).build()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> PortResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;
        debug!("{} -> {}", response.url().path(), response.status());
        check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> PortResult<T> {
        let response = self.send(builder).await?;
        let body = response
            .text()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| PortError::Decode(e.to_string()))
    }
}

/// Decodes the typed view of a payload while keeping the JSON as received.
fn with_raw<T: DeserializeOwned>(raw: Value) -> PortResult<Payload<T>> {
    Payload::from_raw(raw).map_err(|e| PortError::Decode(e.to_string()))
}

//=========================================================================================
// Wire Payloads
//=========================================================================================

#[derive(Serialize)]
struct GenerateQuizBody<'a> {
    text: &'a str,
    quiz_count: u32,
    quiz_type: &'a str,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    question: &'a str,
    #[serde(rename = "pdfText")]
    pdf_text: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    answer: String,
}

/// The backend reports failures as `{"error": "..."}`, sometimes `{"message": "..."}`.
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Maps non-success statuses to typed port errors, keeping the backend's message.
async fn check_status(response: Response) -> PortResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error.or(b.message))
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    Err(match status {
        StatusCode::UNAUTHORIZED => PortError::Unauthorized,
        StatusCode::NOT_FOUND => PortError::NotFound(message),
        _ => PortError::Backend {
            status: status.as_u16(),
            message,
        },
    })
}

//=========================================================================================
// `SessionBridge` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionBridge for HttpSessionBridge {
    async fn upload(&self, request: UploadRequest) -> PortResult<Payload<UploadResult>> {
        let file = multipart::Part::bytes(request.bytes.to_vec()).file_name(request.file_name);
        let form = multipart::Form::new()
            .part("file", file)
            .text("custom_filename", request.custom_filename)
            .text("category", request.category);

        let raw: Value = self
            .send_json(self.request(Method::POST, "/upload").multipart(form))
            .await?;
        with_raw(raw)
    }

    async fn generate_quiz(&self, text: &str, count: u32, kind: QuizKind) -> PortResult<Payload<QuizData>> {
        let body = GenerateQuizBody {
            text,
            quiz_count: count,
            quiz_type: kind.as_str(),
        };
        let mut response: Value = self
            .send_json(self.request(Method::POST, "/generate-quiz").json(&body))
            .await?;
        let raw = response
            .get_mut("quizData")
            .map(Value::take)
            .filter(|quiz| !quiz.is_null())
            .ok_or_else(|| PortError::Decode("response has no quizData".to_string()))?;
        with_raw(raw)
    }

    async fn grade(&self, request: &GradeRequest) -> PortResult<Grade> {
        self.send_json(self.request(Method::POST, "/feedback").json(request))
            .await
    }

    async fn chat(&self, question: &str, pdf_text: &str) -> PortResult<String> {
        let body = ChatBody { question, pdf_text };
        let response: ChatResponse = self
            .send_json(self.request(Method::POST, "/chat").json(&body))
            .await?;
        Ok(response.answer)
    }

    async fn render_pdf(&self, request: &PdfRequest) -> PortResult<Bytes> {
        let response = self
            .send(self.request(Method::POST, "/pdf").json(request))
            .await?;
        response
            .bytes()
            .await
            .map_err(|e| PortError::Network(e.to_string()))
    }

    async fn save_session(&self, request: &SaveSessionRequest) -> PortResult<()> {
        self.send(self.request(Method::POST, "/study/save").json(request))
            .await?;
        Ok(())
    }

    async fn list_saved(&self) -> PortResult<Vec<SavedSession>> {
        self.send_json(self.request(Method::GET, "/mypage/files"))
            .await
    }

    async fn delete_saved(&self, id: i64) -> PortResult<()> {
        self.send(self.request(Method::DELETE, &format!("/mypage/files/{}", id)))
            .await?;
        Ok(())
    }
}

//! HTML form and JSON endpoint over HTTP.
//!
//! `GET /` renders the form, `POST /generate` renders it again with the
//! result or error filled in, and `POST /api/generate` speaks JSON. The
//! form route takes either a urlencoded body or `multipart/form-data` with
//! a `prompt` field and/or a `file` field.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::async_trait;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use html_escape::encode_text;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::consts::MAX_UPLOAD_BYTES;
use crate::error::{ErrorKind, RunnerError};
use crate::model::Attachment;
use crate::runner::{PromptRunner, Status};

#[derive(Deserialize)]
pub struct PromptForm {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateReply {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
    pub message: String,
}

/// A form submission: the prompt plus any uploaded files.
#[derive(Debug, Default)]
pub struct PromptUpload {
    pub prompt: String,
    pub attachments: Vec<Attachment>,
}

#[async_trait]
impl<S> FromRequest<S> for PromptUpload
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if multipart {
            let form = Multipart::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            read_upload(form).await.map_err(|e| {
                debug!("rejected upload: {e}");
                (e.status(), e.body_text()).into_response()
            })
        } else {
            let Form(form) = Form::<PromptForm>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self {
                prompt: form.prompt,
                attachments: Vec::new(),
            })
        }
    }
}

async fn read_upload(mut form: Multipart) -> Result<PromptUpload, MultipartError> {
    let mut upload = PromptUpload::default();
    while let Some(field) = form.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "prompt" => upload.prompt = field.text().await?,
            "file" => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .map(str::to_string);
                let mime_type = field.content_type().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                // Browsers send an empty, unnamed part when no file is chosen.
                if file_name.is_none() && data.is_empty() {
                    continue;
                }
                debug!(?file_name, %mime_type, bytes = data.len(), "received file");
                upload.attachments.push(Attachment {
                    mime_type,
                    data: data.to_vec(),
                    file_name,
                });
            }
            _ => {}
        }
    }
    Ok(upload)
}

/// Build the router. The runner is shared by every request.
pub fn router(runner: Arc<PromptRunner>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/generate", post(generate_form))
        .route("/api/generate", post(generate_json))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(runner)
}

/// Bind `addr` and serve until Ctrl+C.
pub async fn serve(runner: Arc<PromptRunner>, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(runner))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;
    Ok(())
}

async fn index(State(runner): State<Arc<PromptRunner>>) -> Html<String> {
    Html(render_page(&runner.status(), "", None))
}

async fn generate_form(State(runner): State<Arc<PromptRunner>>, upload: PromptUpload) -> Response {
    let outcome = runner.generate_with(&upload.prompt, upload.attachments).await;
    let status = match &outcome {
        Ok(_) => StatusCode::OK,
        Err(e) => status_for(e.kind()),
    };
    let page = render_page(&runner.status(), &upload.prompt, Some(&outcome));
    (status, Html(page)).into_response()
}

async fn generate_json(
    State(runner): State<Arc<PromptRunner>>,
    payload: Result<Json<PromptForm>, JsonRejection>,
) -> Response {
    let form = match payload {
        Ok(Json(form)) => form,
        Err(rejection) => {
            return error_reply(
                StatusCode::BAD_REQUEST,
                ErrorKind::Validation,
                rejection.body_text(),
            );
        }
    };
    match runner.generate(&form.prompt).await {
        Ok(text) => Json(GenerateReply { text }).into_response(),
        Err(e) => error_reply(status_for(e.kind()), e.kind(), e.to_string()),
    }
}

fn error_reply(status: StatusCode, kind: ErrorKind, message: String) -> Response {
    let reply = ErrorReply {
        error: kind.as_str().to_string(),
        message,
    };
    (status, Json(reply)).into_response()
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::ContentBlocked => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Configuration | ErrorKind::Initialization => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Generation => StatusCode::BAD_GATEWAY,
    }
}

fn render_page(
    status: &Status,
    prompt: &str,
    outcome: Option<&Result<String, RunnerError>>,
) -> String {
    let (status_class, status_text) = match status {
        Status::Configured { model } | Status::Ready { model } => {
            ("ok", format!("Generation enabled ({model})"))
        }
        Status::Disabled { reason } => ("error", format!("Generation disabled: {reason}")),
    };

    let body = match outcome {
        None => String::new(),
        Some(Ok(text)) => format!(
            "<h2>Result</h2>\n<pre id=\"output\">{}</pre>\n",
            encode_text(text)
        ),
        Some(Err(e)) => format!(
            "<p id=\"error\" class=\"error\">{}</p>\n",
            encode_text(&e.to_string())
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Prompt Runner</title>
<style>
body {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }}
textarea {{ width: 100%; min-height: 8rem; }}
pre {{ white-space: pre-wrap; background: #f4f4f4; padding: 1rem; }}
.ok {{ color: #1a7f37; }}
.error {{ color: #cf222e; }}
</style>
</head>
<body>
<h1>Prompt Runner</h1>
<p id="status" class="{status_class}">{status}</p>
<form method="post" action="/generate" enctype="multipart/form-data" onsubmit="this.querySelector('button').disabled = true; this.querySelector('button').textContent = 'Generating…';">
<textarea name="prompt" placeholder="Enter your prompt">{prompt}</textarea>
<p><input type="file" name="file" accept="image/*,application/pdf"></p>
<p><button type="submit">Generate</button></p>
</form>
{body}</body>
</html>
"#,
        status = encode_text(&status_text),
        prompt = encode_text(prompt),
    )
}

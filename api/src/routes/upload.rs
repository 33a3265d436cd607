//! `POST /upload`: accept a document, index it, and draft a quiz.
//!
//! Multipart form with a `file` part (PDF or DOCX) and a `user_id` text
//! part. Extraction, chunking and index persistence run on blocking
//! threads; embedding and quiz generation go through the LLM gateway.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Response,
};
use serde::Serialize;
use tokio::task;
use tracing::{info, instrument, warn};

use answerer::{QuizQuestion, generate_quiz};
use doc_ingest::{DocumentFormat, extract_text, split_text};
use vector_store::{IndexError, VectorIndex};

use crate::core::app_state::AppState;
use crate::core::http::response_envelope::ApiResponse;
use crate::error_handler::AppError;
use crate::registry::{SessionRecord, sanitize_file_name};

#[derive(Serialize)]
pub struct UploadResponse {
    pub file_name: String,
    pub vector_path: String,
    pub chunks: usize,
    pub questions: Vec<QuizQuestion>,
}

#[instrument(skip_all)]
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut user_id: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut file_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("user_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("unreadable user_id: {e}")))?;
                user_id = Some(text);
            }
            Some("file") => {
                file_name = field.file_name().map(|n| n.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("unreadable file part: {e}")))?;
                file_bytes = Some(bytes.to_vec());
            }
            other => {
                warn!("upload: ignoring unexpected multipart field {other:?}");
            }
        }
    }

    let user_id = user_id
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("user_id is required".into()))?;
    let bytes = file_bytes
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::BadRequest("file part is required".into()))?;
    let file_name = sanitize_file_name(&file_name.unwrap_or_default());
    if file_name.is_empty() {
        return Err(AppError::BadRequest("file part must carry a file name".into()));
    }

    // Closed-set dispatch; anything else is rejected before any heavy work.
    let format = DocumentFormat::from_path(&file_name)?;

    if state
        .registry
        .resolve_vector_path(&user_id, &file_name)
        .await
        .is_some()
    {
        return Err(AppError::DuplicateUpload);
    }

    let user_dir = sanitize_file_name(&user_id);
    if user_dir.is_empty() {
        return Err(AppError::BadRequest("user_id is not usable as a path".into()));
    }

    let upload_dir = state.upload_dir.join(&user_dir);
    tokio::fs::create_dir_all(&upload_dir).await?;
    let file_path = upload_dir.join(&file_name);
    tokio::fs::write(&file_path, &bytes).await?;

    // Extraction and chunking are CPU-bound; keep them off the runtime.
    let chunking = state.chunking;
    let doc_id = file_name.clone();
    let chunks = task::spawn_blocking(move || {
        let text = extract_text(&bytes, format)?;
        Ok::<_, AppError>(split_text(&text, &doc_id, &chunking))
    })
    .await
    .map_err(|e| AppError::Io(std::io::Error::other(e)))??;

    let chunk_count = chunks.len();
    info!("upload: {file_name} for {user_id}: {chunk_count} chunks, format {format:?}");

    let index = VectorIndex::build(chunks, &state.embedder).await?;

    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem.to_string())
        .unwrap_or_else(|| file_name.clone());
    let vector_path = state.index_dir.join(&user_dir).join(&stem);

    let save_path = vector_path.clone();
    let index = task::spawn_blocking(move || -> Result<VectorIndex, IndexError> {
        index.save(&save_path)?;
        Ok(index)
    })
    .await
    .map_err(|e| AppError::Io(std::io::Error::other(e)))??;

    // Quiz only once the document is indexed and durable; its input comes
    // from the persisted index, not from a separate chunk copy.
    let quiz_chunks: Vec<_> = index.chunks().cloned().collect();
    let questions = generate_quiz(&quiz_chunks, &*state.llm).await;

    state
        .registry
        .insert(SessionRecord {
            user_id,
            file_name: file_name.clone(),
            file_path,
            vector_path: vector_path.clone(),
            questions: questions.clone(),
            upload_date: chrono::Utc::now(),
        })
        .await?;

    let body = UploadResponse {
        file_name,
        vector_path: vector_path.display().to_string(),
        chunks: chunk_count,
        questions,
    };
    Ok(ApiResponse::success(body).into_response_with_status(StatusCode::OK))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::sync::Mutex;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, header};
    use axum::routing::post;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt;

    use doc_ingest::ChunkingConfig;
    use llm_gateway::{LlmClient, LlmModelConfig, LlmProvider};
    use vector_store::GatewayEmbedder;

    use crate::registry::SessionRegistry;

    fn model_cfg(endpoint: &str, model: &str) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: model.into(),
            endpoint: endpoint.into(),
            api_key: None,
            max_tokens: None,
            temperature: Some(0.0),
            timeout_secs: Some(2),
        }
    }

    fn app_state(endpoint: &str, data_dir: &std::path::Path) -> Arc<AppState> {
        let llm = Arc::new(
            LlmClient::new(model_cfg(endpoint, "chat"), model_cfg(endpoint, "embed")).unwrap(),
        );
        Arc::new(AppState {
            embedder: GatewayEmbedder::new(llm.clone(), None),
            llm,
            upload_dir: data_dir.join("uploads"),
            index_dir: data_dir.join("indexes"),
            registry: SessionRegistry::open(data_dir.join("sessions.json")).unwrap(),
            chunking: ChunkingConfig::default(),
        })
    }

    /// Model backend that answers 500 to everything and records the request
    /// paths it saw.
    async fn spawn_failing_backend() -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    break;
                };
                let record = record.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let n = sock.read(&mut buf).await.unwrap_or(0);
                    let head = String::from_utf8_lossy(&buf[..n]).into_owned();
                    if let Some(path) = head
                        .lines()
                        .next()
                        .and_then(|line| line.split_whitespace().nth(1))
                    {
                        record.lock().unwrap().push(path.to_string());
                    }
                    let _ = sock
                        .write_all(
                            b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                        )
                        .await;
                });
            }
        });
        (endpoint, seen)
    }

    fn docx_bytes(text: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:body></w:document>"#
        );
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    fn multipart_body(file_name: &str, file: &[u8]) -> (String, Vec<u8>) {
        let boundary = "upload-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!("--{boundary}\r\ncontent-disposition: form-data; name=\"user_id\"\r\n\r\nu1\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{boundary}\r\ncontent-disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    #[tokio::test]
    async fn failed_embedding_skips_quiz_and_inserts_nothing() {
        let (endpoint, seen) = spawn_failing_backend().await;
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&endpoint, dir.path());

        let app = Router::new()
            .route("/upload", post(upload_document))
            .with_state(state.clone());

        let (content_type, body) = multipart_body(
            "notes.docx",
            &docx_bytes("The French Revolution began in 1789 and reshaped European politics."),
        );
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        // Embedding was attempted; quiz generation never was, and nothing
        // was recorded for the user.
        {
            let paths = seen.lock().unwrap();
            assert!(paths.iter().any(|p| p == "/api/embeddings"));
            assert!(paths.iter().all(|p| p != "/api/generate"));
        }
        assert!(state.registry.list_files("u1").await.is_empty());
    }
}

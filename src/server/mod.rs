// src/server/mod.rs
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::{net::SocketAddr, sync::Arc};
use tracing::{info, warn};

use crate::config::XLSX_CONTENT_TYPE;
use crate::pipeline::Pipeline;
use crate::workbook::convert_bytes;

pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const UPLOAD_PAGE: &str = include_str!("upload.html");

pub fn router(pipeline: Pipeline) -> Router {
    Router::new()
        .route("/", get(upload_page).post(upload))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(Arc::new(pipeline))
}

pub async fn serve(addr: SocketAddr, pipeline: Pipeline) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(pipeline)).await?;
    Ok(())
}

async fn upload_page() -> Html<&'static str> {
    Html(UPLOAD_PAGE)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "qasheet"
    }))
}

async fn upload(State(pipeline): State<Arc<Pipeline>>, multipart: Multipart) -> Response {
    let bytes = match read_file_field(multipart).await {
        Ok(bytes) => bytes,
        Err(resp) => return resp,
    };
    info!(bytes = bytes.len(), "upload received");
    process_upload(pipeline, bytes).await
}

/// Run the conversion off the async runtime and turn it into a download.
async fn process_upload(pipeline: Arc<Pipeline>, bytes: Vec<u8>) -> Response {
    let file_name = pipeline.config().output.file_name.clone();
    let result = tokio::task::spawn_blocking(move || convert_bytes(&bytes, &pipeline)).await;

    match result {
        Ok(Ok((out, _report))) => (
            [
                (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file_name),
                ),
            ],
            out,
        )
            .into_response(),
        Ok(Err(err)) => {
            warn!("conversion failed: {:#}", err);
            error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("could not process spreadsheet: {:#}", err),
            )
        }
        Err(join_err) => {
            warn!("conversion task failed: {}", join_err);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "conversion task failed".to_string(),
            )
        }
    }
}

async fn read_file_field(mut multipart: Multipart) -> Result<Vec<u8>, Response> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| error_response(StatusCode::BAD_REQUEST, err.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let data = field
            .bytes()
            .await
            .map_err(|err| error_response(StatusCode::BAD_REQUEST, err.to_string()))?;
        if data.is_empty() {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "uploaded file is empty".to_string(),
            ));
        }
        return Ok(data.to_vec());
    }
    Err(error_response(
        StatusCode::BAD_REQUEST,
        "no file field in upload".to_string(),
    ))
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, message).into_response()
}

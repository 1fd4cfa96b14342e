use axum::Json;
use axum::body::Body;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::{header, HeaderValue, Response, StatusCode};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::models::ErrorResponse;
use super::state::ServerState;
use crate::generator::{GenerateError, GenerateRequest};

pub(crate) const PROCESS_TIME_HEADER: &str = "x-process-time";

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn into_error_response(self) -> (StatusCode, Json<ErrorResponse>) {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
    }
}

impl From<GenerateError> for ServerError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::BadRequest(message) => ServerError::bad_request(message),
            GenerateError::Internal(message) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message,
            },
        }
    }
}

impl From<MultipartError> for ServerError {
    fn from(err: MultipartError) -> Self {
        Self {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

pub(crate) async fn generate(
    State(state): State<Arc<ServerState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response<Body>, (StatusCode, Json<ErrorResponse>)> {
    let started = Instant::now();
    info!("POST /api/generate received");

    let multipart = multipart.map_err(|rejection| {
        warn!("rejected form: {}", rejection.body_text());
        ServerError {
            status: rejection.status(),
            message: rejection.body_text(),
        }
        .into_error_response()
    })?;
    let request = read_generate_form(multipart)
        .await
        .map_err(ServerError::into_error_response)?;

    match state.generator.generate(request).await {
        Ok(output) => jpeg_response(output.jpeg, started),
        Err(err) => {
            let err = ServerError::from(err);
            if err.status.is_server_error() {
                error!(
                    "[{}ms] processing error: {}",
                    started.elapsed().as_millis(),
                    err.message
                );
            }
            Err(err.into_error_response())
        }
    }
}

async fn read_generate_form(mut multipart: Multipart) -> Result<GenerateRequest, ServerError> {
    let mut request = GenerateRequest::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                request.image_name = field.file_name().map(|name| name.to_string());
                request.image = Some(field.bytes().await?.to_vec());
            }
            "text" => request.text = field.text().await?,
            "style" => request.style = field.text().await?,
            _ => {}
        }
    }
    Ok(request)
}

fn jpeg_response(
    jpeg: Vec<u8>,
    started: Instant,
) -> Result<Response<Body>, (StatusCode, Json<ErrorResponse>)> {
    let process_time = format!("{}ms", started.elapsed().as_millis());
    let mut response = Response::new(Body::from(jpeg));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));
    let value = HeaderValue::from_str(&process_time).map_err(|err| {
        ServerError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("invalid process time header: {}", err),
        }
        .into_error_response()
    })?;
    headers.insert(PROCESS_TIME_HEADER, value);
    Ok(response)
}

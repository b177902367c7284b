use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
	#[error("{0}")]
	NotFound(String),
	#[error("{0}")]
	BadRequest(String),
	#[error("store error: {0}")]
	Store(#[from] modsort::Error),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("blocking task failed: {0}")]
	Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = match &self {
			ApiError::NotFound(_) => StatusCode::NOT_FOUND,
			ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
			ApiError::Store(_) | ApiError::IO(_) | ApiError::Join(_) => {
				log::error!("Request failed: {}", self);
				StatusCode::INTERNAL_SERVER_ERROR
			}
		};

		(status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
	}
}

pub type ApiResult<T> = Result<T, ApiError>;

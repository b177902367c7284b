use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::store::parse_upload;
use crate::AppState;

/// Runs store and backup file work off the async workers.
async fn blocking<T, F>(work: F) -> ApiResult<T>
where
	F: FnOnce() -> ApiResult<T> + Send + 'static,
	T: Send + 'static,
{
	tokio::task::spawn_blocking(work).await?
}

/// GET /mod_environments
///
/// The whole store, `{}` when nothing was uploaded yet.
pub async fn get_environments(State(state): State<AppState>) -> ApiResult<Json<Value>> {
	let cache = blocking(move || Ok(state.store.load()?)).await?;
	Ok(Json(cache.to_json()))
}

/// GET /mod_environment/:id
pub async fn get_environment(State(state): State<AppState>, Path(identifier): Path<String>) -> ApiResult<Json<Value>> {
	let cache = blocking(move || {
		if !state.store.exists() {
			return Err(ApiError::NotFound("No data available".to_string()));
		}
		Ok(state.store.load()?)
	})
	.await?;

	match cache.get(&identifier) {
		Some(classification) => {
			let mut entry = serde_json::Map::new();
			entry.insert(identifier, Value::from(classification.as_str()));
			Ok(Json(Value::Object(entry)))
		}
		None => Err(ApiError::NotFound(format!("Mod {} not found", identifier))),
	}
}

/// POST /upload
///
/// Merges a client's batch into the store. The first upload of each day
/// snapshots the store as it was before the merge.
///
/// The merge is an unlocked read-modify-write, overlapping uploads may lose keys.
pub async fn upload(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
	let entries = parse_upload(&body).map_err(ApiError::BadRequest)?;
	let today = (state.today)();
	let uploaded = entries.len();

	let total = blocking(move || {
		if state.backups.should_backup(today) {
			state.backups.snapshot(state.store.path(), today)?;
		}
		Ok(state.store.merge(entries, today)?)
	})
	.await?;
	log::info!("Merged {} uploaded environments, store now holds {}", uploaded, total);

	Ok(Json(json!({ "message": "Data uploaded successfully", "merged": uploaded })))
}

/// POST /backup
///
/// Snapshots the store now, replacing any snapshot already taken today.
pub async fn backup(State(state): State<AppState>) -> ApiResult<Json<Value>> {
	let today = (state.today)();

	match blocking(move || Ok(state.backups.snapshot(state.store.path(), today)?)).await? {
		Some(path) => Ok(Json(json!({ "message": "Backup completed successfully", "file": path.display().to_string() }))),
		None => Ok(Json(json!({ "message": "Nothing to back up" }))),
	}
}

pub fn routes() -> Router<AppState> {
	Router::new()
		.route("/mod_environments", get(get_environments))
		.route("/mod_environment/:id", get(get_environment))
		.route("/upload", post(upload))
		.route("/backup", post(backup))
}

//! Sync server holding the shared environment store.

pub mod api;
pub mod backup;
pub mod error;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

use std::path::PathBuf;

use axum::Router;
use chrono::NaiveDate;

use crate::backup::BackupDir;
use crate::store::Store;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
	pub store: Store,
	pub backups: BackupDir,
	pub today: fn() -> NaiveDate,
}

impl AppState {
	pub fn new(data_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
		let data_dir: PathBuf = data_dir.into();
		Self {
			store: Store::new(data_dir),
			backups: BackupDir::new(backup_dir),
			today: modsort::cache::today,
		}
	}

	/// Replaces the date source, for tests.
	pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
		self.today = today;
		self
	}
}

pub fn build_router(state: AppState) -> Router {
	Router::new()
		.merge(api::routes())
		.with_state(state)
}

use axum::{extract::State, response::IntoResponse};
use serde::Serialize;

use sandworm_domain::{ExecutionRecord, WorkerId};

use crate::{error::ApiResult, response::success, routes::AppState};

#[derive(Debug, Serialize)]
pub struct DispatcherStatus {
    pub queue_length: usize,
    pub queued: Vec<ExecutionRecord>,
    pub idle_workers: Vec<WorkerId>,
    pub busy_workers: Vec<WorkerId>,
    pub running: usize,
}

pub async fn dispatcher_status(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let snapshot = state.dispatcher.snapshot().await?;

    Ok(success(DispatcherStatus {
        queue_length: snapshot.queued.len(),
        queued: snapshot.queued,
        idle_workers: snapshot.idle,
        busy_workers: snapshot.busy,
        running: snapshot.running,
    }))
}

use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    response::accepted,
    routes::AppState,
};

/// Run request. Field names also accept the camelCase spelling.
#[derive(Debug, Deserialize)]
pub struct SubmitExecutionRequest {
    #[serde(alias = "registryUrl")]
    pub registry_url: String,
    pub image: String,
    #[serde(alias = "loggingEndpoint")]
    pub logging_endpoint: String,
}

impl SubmitExecutionRequest {
    /// Only presence is checked; the runtime decides whether the values work.
    fn validate(&self) -> ApiResult<()> {
        for (field, value) in [
            ("registry_url", &self.registry_url),
            ("image", &self.image),
            ("logging_endpoint", &self.logging_endpoint),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::BadRequest(format!("{field} must not be blank")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitExecutionResponse {
    pub id: Uuid,
}

pub async fn submit_execution(
    State(state): State<AppState>,
    Json(request): Json<SubmitExecutionRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let id = state
        .dispatcher
        .submit(
            request.registry_url,
            request.image.clone(),
            request.logging_endpoint,
        )
        .await?;

    info!(job_id = %id, image = %request.image, "Execution submitted");
    Ok(accepted(SubmitExecutionResponse { id }, "execution queued"))
}

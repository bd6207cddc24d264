//! Axum route handler for pitch generation.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::info;

use crate::errors::AppError;
use crate::pitch::models::{PitchRequest, PitchResult};
use crate::pitch::prompts::{build_pitch_prompt, PITCH_SYSTEM};
use crate::pitch::validation::validate;
use crate::state::AppState;

/// POST /generate-pitch
///
/// Validate → compose prompt → one provider call. Validation failures return
/// before the provider is touched.
pub async fn handle_generate_pitch(
    State(state): State<AppState>,
    payload: Result<Json<PitchRequest>, JsonRejection>,
) -> Result<Json<PitchResult>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let request = validate(request)?;
    let prompt = build_pitch_prompt(&request);

    info!(
        "Generating pitch for: genres={}, characters={}",
        request.genres().join(", "),
        request.characters().join(", ")
    );

    let pitch = state
        .generator
        .generate(PITCH_SYSTEM, &prompt)
        .await?;

    info!("Successfully generated pitch: {}", pitch.title);

    Ok(Json(pitch))
}

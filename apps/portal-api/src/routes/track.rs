//! # Tracking Route
//!
//! Public status lookup. No authentication: the reference number is the
//! only thing a consumer holds.

use axum::extract::{Path, State};
use axum::Json;
use portal_db::Tracking;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /api/v1/track/:reference`
pub async fn track(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<Tracking>, ApiError> {
    let tracking = state.db.track(&reference).await?;
    debug!(
        reference_number = %tracking.reference_number,
        status = %tracking.status,
        "Tracked"
    );
    Ok(Json(tracking))
}

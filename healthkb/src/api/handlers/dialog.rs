use axum::{body::Bytes, extract::State, Json};

use crate::api::response::ErrorResponse;
use crate::api::state::AppState;
use crate::error::Result;
use crate::models::{DialogEvent, DialogResponse};

/// Dialog code hook for the conversational bot.
///
/// Only a malformed event or a missing query flow produce an HTTP error;
/// answer failures are reported to the bot as a closing message.
#[utoipa::path(
    post,
    path = "/dialog",
    tag = "dialog",
    request_body = DialogEvent,
    responses(
        (status = 200, description = "Dialog directive", body = DialogResponse),
        (status = 400, description = "Malformed dialog event", body = ErrorResponse),
        (status = 503, description = "Query flow not configured", body = ErrorResponse),
    )
)]
pub async fn dialog_hook(State(state): State<AppState>, body: Bytes) -> Result<Json<DialogResponse>> {
    let dialog = state.dialog()?;
    let event = DialogEvent::parse(&body)?;
    Ok(Json(dialog.handle(&event).await))
}

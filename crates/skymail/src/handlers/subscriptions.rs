//! Subscribe, confirm, and unsubscribe endpoints.

use axum::{
    extract::{FromRequest, Path, Request, State},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde_json::{json, Value};

use skymail_core::subscription::{ServiceError, SubscribeRequest};

use crate::{handlers::AppError, state::AppState};

/// A [`SubscribeRequest`] read from either a JSON or a form-encoded body.
pub struct SubscribeBody(pub SubscribeRequest);

impl<S> FromRequest<S> for SubscribeBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let request = if is_json {
            Json::<SubscribeRequest>::from_request(req, state)
                .await
                .map_err(|e| AppError::bad_request(anyhow::anyhow!(e.body_text())))?
                .0
        } else {
            Form::<SubscribeRequest>::from_request(req, state)
                .await
                .map_err(|e| AppError::bad_request(anyhow::anyhow!(e.body_text())))?
                .0
        };
        Ok(Self(request))
    }
}

/// Start a subscription (POST /subscribe).
///
/// Sends the confirm code by email; nothing is delivered until it is
/// redeemed.
pub async fn subscribe(
    State(state): State<AppState>,
    SubscribeBody(request): SubscribeBody,
) -> Result<Json<Value>, AppError> {
    let request = request.normalized()?;

    match state.orchestrator.invite_user(&request).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "Subscription requested");
            Ok(Json(json!({ "message": "Confirmation email sent" })))
        }
        Err(err @ ServiceError::AlreadyExists(_)) => Err(err.into()),
        Err(err) => Err(AppError::bad_request(err)),
    }
}

/// Confirm a subscription (GET /confirm/{token}).
pub async fn confirm(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Value>, AppError> {
    let subscription = state
        .orchestrator
        .confirm(&token)
        .await
        .map_err(token_error)?;

    Ok(Json(json!({
        "message": "Subscription confirmed",
        "cadence": subscription.cadence,
    })))
}

/// Remove a subscriber (GET /unsubscribe/{token}).
pub async fn unsubscribe(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Value>, AppError> {
    state
        .orchestrator
        .cancel(&token)
        .await
        .map_err(token_error)?;

    Ok(Json(json!({ "message": "Unsubscribed" })))
}

/// Invalid tokens are 404; every other failure is a generic 400.
fn token_error(err: ServiceError) -> AppError {
    match err {
        ServiceError::InvalidToken => err.into(),
        other => AppError::bad_request(other),
    }
}

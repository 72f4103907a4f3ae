use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::pages::result_page;
use crate::ApiState;
use email_scanner::store::ContactStore;
use shared_types::{is_valid_email, Category, ContactSource, ContactStatus, NewContact, ScanReport};

// ── Unsubscribe ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UnsubscribeParams {
    #[serde(default)]
    pub token: Option<String>,
}

/// Public unsubscribe link target. Every outcome renders HTML; errors never
/// leak details beyond a generic message.
pub async fn unsubscribe(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<UnsubscribeParams>,
) -> (StatusCode, Html<String>) {
    let token = params.token.unwrap_or_default();

    if !is_well_formed_token(&token) {
        return (
            StatusCode::BAD_REQUEST,
            Html(result_page(
                &state.site_name,
                "Invalid unsubscribe link.",
                false,
            )),
        );
    }

    match apply_unsubscribe(&state, &token).await {
        Ok(true) => (
            StatusCode::OK,
            Html(result_page(
                &state.site_name,
                &format!(
                    "You've been successfully unsubscribed from {} emails.",
                    state.site_name
                ),
                true,
            )),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Html(result_page(
                &state.site_name,
                "This unsubscribe link is not valid or has already been used.",
                false,
            )),
        ),
        Err(e) => {
            tracing::error!("Unsubscribe error: {:?}", e);
            let message = match &state.support_email {
                Some(email) => {
                    format!("Something went wrong. Please email {email} to unsubscribe.")
                }
                None => "Something went wrong. Please try again later.".to_string(),
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(result_page(&state.site_name, &message, false)),
            )
        }
    }
}

async fn apply_unsubscribe(state: &ApiState, token: &str) -> anyhow::Result<bool> {
    match state.store.find_by_token(token).await? {
        Some(contact) => {
            state
                .store
                .set_status(&contact.email, ContactStatus::Unsubscribed)
                .await?;
            tracing::info!(email = %contact.email, "unsubscribed via link");
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Tokens are hex-encoded HMAC-SHA256 digests: exactly 64 hex chars.
fn is_well_formed_token(token: &str) -> bool {
    token.len() == 64 && token.chars().all(|c| c.is_ascii_hexdigit())
}

// ── Subscribe ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Website form endpoint. Always answers `{"ok": true}` so a storage hiccup
/// never breaks the form UX; failures are logged instead.
pub async fn subscribe(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(body): Json<SubscribeRequest>,
) -> Json<OkResponse> {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !origin_allowed(&state.allowed_origins, origin) {
        tracing::debug!(origin = %origin, "subscribe request from disallowed origin");
        return Json(OkResponse { ok: true });
    }

    let email = body
        .email
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let name = body.name.as_deref().unwrap_or_default().trim().to_string();

    if !is_valid_email(&email) {
        return Json(OkResponse { ok: true });
    }

    let result = state
        .store
        .append(NewContact {
            email: email.clone(),
            name,
            source: ContactSource::WebsiteForm,
            classification: Some(Category::GeneralInterest),
            notes: "Submitted via contact form".to_string(),
        })
        .await;

    match result {
        Ok(true) => tracing::info!(email = %email, "subscribed via website form"),
        Ok(false) => tracing::debug!(email = %email, "already subscribed"),
        Err(e) => tracing::error!("Subscribe error: {:?}", e),
    }

    Json(OkResponse { ok: true })
}

/// An empty allow-list means no origin restriction (development).
fn origin_allowed(allowed: &[String], origin: &str) -> bool {
    if allowed.is_empty() {
        return true;
    }
    allowed.iter().any(|a| origin.starts_with(a.as_str()))
}

// ── Cron scan trigger ────────────────────────────────────────────────────

/// Run a real scan pass on demand. Guarded by a bearer secret so only the
/// scheduler can trigger it.
pub async fn cron_scan(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> ApiResult<Json<ScanReport>> {
    let secret = state
        .cron_secret
        .as_deref()
        .ok_or_else(|| ApiError::Config("CRON_SECRET is not set".to_string()))?;

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if authorization != format!("Bearer {secret}") {
        return Err(ApiError::Unauthorized("invalid cron secret".to_string()));
    }

    let report = email_scanner::run_configured_scan(&state.scanner_config, false).await?;
    Ok(Json(report))
}

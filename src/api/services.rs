use std::net::SocketAddr;

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, Path, Query, Request, State, rejection::QueryRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{debug, info, warn};

use super::{
    error::ApiError,
    models::{
        AlertsQuery, CaptureAccepted, ChallengeResponse, CreateAlertRequest, CreatedWebhook,
        DeliveriesQuery, HealthResponse, NotificationConfigRequest, NotificationConfigView,
        PublicUrlResponse, TestConnectionRequest, TestConnectionResponse, TextRequest,
        ThreadDeleted,
    },
    state::AppState,
    utils::{clamp_limit, json_body, read_body, request_base_url},
    validation::{
        RequestValidationError, normalize_optional, validate_alert, validate_message_text,
        validate_notification_config,
    },
};
use crate::ledger::{DeliveryQuery, NotificationConfig};
use crate::notify::{self, CANARY_TEXT, ChannelKind, OutboundMessage};
use crate::registry::{CapturedRequest, RegistryError, verification_challenge};
use crate::threads::DELETE_NOTICE;

/// Mint a new webhook endpoint (POST /webhooks)
pub async fn create_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let fallback = request_base_url(&headers).unwrap_or_else(|| state.local_url());
    let endpoint = state.registry.create_endpoint(&fallback).await;

    let response = CreatedWebhook {
        id: endpoint.id,
        url: endpoint.url,
        created_at: endpoint.created_at,
    };
    (StatusCode::CREATED, Json(response))
}

pub async fn list_webhooks(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.list().await)
}

/// Endpoint with its captured requests (GET /webhooks/{id})
pub async fn get_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let endpoint = state.registry.get(&id).await?;
    Ok(Json(endpoint))
}

/// Capture endpoint (ANY /hooks/{id})
///
/// ## Flow:
/// 1. Unknown id: log a failed delivery, raise an alert per policy, 404
/// 2. Read the body under `server.max_body_bytes` (413 beyond it)
/// 3. Verification handshake: echo the challenge without capturing
/// 4. Append the normalized request to the endpoint, log the delivery
///
/// Delivery logging and alert relay never change the response. A store
/// failure becomes one error alert and the caller still gets 200.
pub async fn capture_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let method = parts.method.as_str().to_string();

    // Unknown ids are answered before the body is read
    let Some(endpoint_url) = state.registry.url_of(&id).await else {
        state.metrics.capture_unknown();
        let base = request_base_url(&parts.headers).unwrap_or_else(|| state.local_url());
        let source_url = format!("{base}{}", parts.uri.path());

        info!(webhook_id = %id, %method, "Capture for unknown webhook");
        state.alerts.record_failed_lookup(&id, &method, &source_url);
        return Err(RegistryError::NotFound(id).into());
    };

    let bytes = read_body(body, state.config.server.max_body_bytes).await?;

    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let captured = CapturedRequest::from_parts(
        &parts.method,
        &parts.headers,
        parts.uri.query(),
        &bytes,
        peer,
    );

    if let Some(challenge) = verification_challenge(&captured.body) {
        debug!(webhook_id = %id, "Answering verification challenge");
        let response = ChallengeResponse {
            challenge: challenge.to_string(),
        };
        return Ok(Json(response).into_response());
    }

    let captured = state.registry.capture(&id, captured).await?;
    state.metrics.capture_accepted();
    info!(
        webhook_id = %id,
        %method,
        bytes = bytes.len(),
        headers = captured.headers.len(),
        "Webhook received"
    );

    state.alerts.record_delivery(&id, &method, &endpoint_url);

    let response = CaptureAccepted {
        message: "Webhook received successfully",
        webhook_id: id,
    };
    Ok(Json(response).into_response())
}

/// Health check endpoint (GET /health)
///
/// Returns 503 when the ledger cannot be read, 200 otherwise.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store_connected = match state.ledger.ping() {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Ledger health check failed");
            false
        }
    };

    let (status_code, status) = if store_connected {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let response = HealthResponse {
        status,
        active_webhooks: state.registry.len().await,
        store_connected,
        is_live: state.registry.is_live(),
        public_url: state.registry.public_url(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        notification_channel: state.channel.kind().as_str(),
        version: env!("CARGO_PKG_VERSION"),
        counters: state.metrics.snapshot(),
    };

    (status_code, Json(response))
}

pub async fn public_url(State(state): State<AppState>) -> impl IntoResponse {
    Json(PublicUrlResponse {
        public_url: state.registry.public_url(),
        is_live: state.registry.is_live(),
        local_url: state.local_url(),
    })
}

pub async fn get_notification_config(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let config = state.ledger.notification_config()?;
    Ok(Json(NotificationConfigView {
        config,
        strategy: state.channel.kind().as_str(),
        threads_supported: state.channel.supports_threads(),
    }))
}

/// Replace the saved notification config (POST /notification-config)
///
/// The target URL is validated before anything is stored; nothing is sent.
pub async fn save_notification_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = read_body(body, state.config.server.max_body_bytes).await?;
    let request: NotificationConfigRequest = json_body(&headers, &bytes)?;
    validate_notification_config(&request, &state.config.notifier.incoming_webhook_prefix)?;

    let config = NotificationConfig {
        target_url: request.target_url.trim().to_string(),
        channel: normalize_optional(request.channel),
        display_name: normalize_optional(request.display_name),
        icon_token: normalize_optional(request.icon_token),
        updated_at: Utc::now(),
    };

    state.ledger.replace_notification_config(&config)?;
    state.channel.apply_config(&config);
    info!(channel = ?config.channel, "Notification config saved");

    Ok(Json(config))
}

/// Send a canary message (POST /notification-config/test)
///
/// Uses the supplied `targetUrl`, else the saved one. With the bot strategy
/// and no explicit target, the canary goes through the bot channel.
pub async fn test_notification_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = read_body(body, state.config.server.max_body_bytes).await?;
    let request: TestConnectionRequest = if bytes.is_empty() {
        TestConnectionRequest::default()
    } else {
        json_body(&headers, &bytes)?
    };

    let explicit = normalize_optional(request.target_url);
    if explicit.is_none() && state.channel.kind() == ChannelKind::Bot {
        let canary = OutboundMessage::builder().text(CANARY_TEXT).build();
        state.channel.post(&canary).await?;
        return Ok(Json(TestConnectionResponse {
            success: true,
            message: "Test message sent through the bot channel".to_string(),
        }));
    }

    let target = match explicit {
        Some(url) => url,
        None => state
            .ledger
            .notification_config()?
            .map(|c| c.target_url)
            .or_else(|| state.config.notifier.webhook_url.clone())
            .ok_or_else(|| {
                ApiError::ConfigurationMissing("no target URL supplied or saved".to_string())
            })?,
    };

    let prefix = &state.config.notifier.incoming_webhook_prefix;
    notify::validate_incoming_webhook_url(prefix, &target).map_err(RequestValidationError::from)?;
    notify::test_connection(&state.http, prefix, &target).await?;

    Ok(Json(TestConnectionResponse {
        success: true,
        message: "Test message sent".to_string(),
    }))
}

/// Start a thread (POST /threads)
pub async fn create_thread(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = read_body(body, state.config.server.max_body_bytes).await?;
    let request: TextRequest = json_body(&headers, &bytes)?;
    validate_message_text(&request.text)?;

    let thread = state.threads.create(&request.text).await?;
    Ok((StatusCode::CREATED, Json(thread)))
}

/// Reply under an existing thread (POST /threads/{id}/replies)
pub async fn add_reply(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = read_body(body, state.config.server.max_body_bytes).await?;
    let request: TextRequest = json_body(&headers, &bytes)?;
    validate_message_text(&request.text)?;

    let thread = state.threads.add_reply(&thread_id, &request.text).await?;
    Ok(Json(thread))
}

pub async fn list_threads(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.threads.list()?))
}

pub async fn get_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.threads.get(&thread_id)?))
}

/// Delete the local thread record (DELETE /threads/{id})
pub async fn delete_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.threads.delete(&thread_id).await?;
    Ok(Json(ThreadDeleted {
        id: thread_id,
        message: DELETE_NOTICE,
    }))
}

/// Recent alerts, newest first (GET /alerts?limit=)
pub async fn list_alerts(
    State(state): State<AppState>,
    query: Result<Query<AlertsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let limits = &state.config.alerts;
    let limit = clamp_limit(query.limit, limits.default_list_limit, limits.max_list_limit);
    Ok(Json(state.alerts.list_alerts(limit)?))
}

/// Manually raise an alert (POST /alerts)
pub async fn create_alert(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = read_body(body, state.config.server.max_body_bytes).await?;
    let request: CreateAlertRequest = json_body(&headers, &bytes)?;
    validate_alert(&request)?;

    let raised = state
        .alerts
        .create_alert(request.level, request.message.trim(), request.source_url)?;
    Ok((StatusCode::CREATED, Json(raised.alert)))
}

/// Paged delivery log (GET /deliveries?page=&limit=&webhookId=&status=)
pub async fn list_deliveries(
    State(state): State<AppState>,
    query: Result<Query<DeliveriesQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let defaults = DeliveryQuery::default();
    let query = DeliveryQuery {
        page: query.page.unwrap_or(defaults.page).max(1),
        limit: clamp_limit(query.limit, defaults.limit, state.config.alerts.max_list_limit),
        webhook_id: normalize_optional(query.webhook_id),
        status: query.status,
    };

    Ok(Json(state.alerts.list_deliveries(&query)?))
}

use thiserror::Error;

use super::models::{CreateAlertRequest, NotificationConfigRequest};
use crate::notify::{TargetUrlError, validate_incoming_webhook_url};

/// Longest text accepted for a posted message
pub const MAX_TEXT_CHARS: usize = 40_000;
const MAX_LABEL_CHARS: usize = 80;

#[derive(Debug, Error)]
pub enum RequestValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("targetUrl is not a valid incoming webhook URL: {0}")]
    InvalidTargetUrl(#[from] TargetUrlError),
    #[error("sourceUrl must be an http/https URL")]
    InvalidSourceUrl,
}

fn check_text(field: &'static str, value: &str, max: usize) -> Result<(), RequestValidationError> {
    if value.trim().is_empty() {
        return Err(RequestValidationError::Empty(field));
    }
    if value.chars().count() > max {
        return Err(RequestValidationError::TooLong { field, max });
    }
    Ok(())
}

fn check_optional_label(
    field: &'static str,
    value: Option<&str>,
) -> Result<(), RequestValidationError> {
    match value {
        Some(v) => check_text(field, v, MAX_LABEL_CHARS),
        None => Ok(()),
    }
}

/// Text of a thread root or reply
pub fn validate_message_text(text: &str) -> Result<(), RequestValidationError> {
    check_text("text", text, MAX_TEXT_CHARS)
}

/// Checked before anything is stored or sent
pub fn validate_notification_config(
    request: &NotificationConfigRequest,
    prefix: &str,
) -> Result<(), RequestValidationError> {
    validate_incoming_webhook_url(prefix, request.target_url.trim())?;
    check_optional_label("channel", request.channel.as_deref())?;
    check_optional_label("displayName", request.display_name.as_deref())?;
    check_optional_label("iconToken", request.icon_token.as_deref())?;
    Ok(())
}

pub fn validate_alert(request: &CreateAlertRequest) -> Result<(), RequestValidationError> {
    check_text("message", &request.message, MAX_TEXT_CHARS)?;
    if let Some(url) = &request.source_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(RequestValidationError::InvalidSourceUrl);
        }
    }
    Ok(())
}

/// Blank optional strings count as absent
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

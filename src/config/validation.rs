use super::models::Config;
use crate::notify::{TargetUrlError, validate_incoming_webhook_url};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("public_url must be an http(s) URL, got '{0}'")]
    InvalidPublicUrl(String),

    #[error("{field} must be positive")]
    ZeroValue { field: &'static str },

    #[error("default_list_limit ({default}) exceeds max_list_limit ({max})")]
    ListLimitOrder { default: usize, max: usize },

    #[error("SLACK_BOT_TOKEN and SLACK_CHANNEL_ID must be set together")]
    IncompleteBotCredentials,

    #[error("notifier.api_base must be an http(s) URL, got '{0}'")]
    InvalidApiBase(String),

    #[error("notifier.webhook_url is malformed: {0}")]
    InvalidWebhookUrl(#[from] TargetUrlError),
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_notifier(config)?;
    validate_alerts(config)?;
    Ok(())
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if let Some(ref url) = config.server.public_url {
        if !is_http_url(url) {
            return Err(ValidationError::InvalidPublicUrl(url.clone()));
        }
    }

    if config.server.max_body_bytes == 0 {
        return Err(ValidationError::ZeroValue {
            field: "server.max_body_bytes",
        });
    }

    Ok(())
}

/// Half-configured bot credentials are rejected rather than silently falling
/// back to the incoming-webhook strategy
fn validate_notifier(config: &Config) -> Result<(), ValidationError> {
    let notifier = &config.notifier;

    let has_token = notifier.bot_token.as_deref().is_some_and(|t| !t.is_empty());
    let has_channel = notifier.channel_id.as_deref().is_some_and(|c| !c.is_empty());
    if has_token != has_channel {
        return Err(ValidationError::IncompleteBotCredentials);
    }

    if !is_http_url(&notifier.api_base) {
        return Err(ValidationError::InvalidApiBase(notifier.api_base.clone()));
    }

    if let Some(ref url) = notifier.webhook_url {
        validate_incoming_webhook_url(&notifier.incoming_webhook_prefix, url)?;
    }

    if notifier.connect_timeout_secs == 0 {
        return Err(ValidationError::ZeroValue {
            field: "notifier.connect_timeout_secs",
        });
    }

    if notifier.request_timeout_secs == 0 {
        return Err(ValidationError::ZeroValue {
            field: "notifier.request_timeout_secs",
        });
    }

    Ok(())
}

fn validate_alerts(config: &Config) -> Result<(), ValidationError> {
    if config.alerts.default_list_limit == 0 {
        return Err(ValidationError::ZeroValue {
            field: "alerts.default_list_limit",
        });
    }

    if config.alerts.default_list_limit > config.alerts.max_list_limit {
        return Err(ValidationError::ListLimitOrder {
            default: config.alerts.default_list_limit,
            max: config.alerts.max_list_limit,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_public_url_scheme() {
        let mut config = Config::default();
        config.server.public_url = Some("ftp://tunnel".to_string());

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::InvalidPublicUrl(_))));
    }

    #[test]
    fn test_half_bot_credentials() {
        let mut config = Config::default();
        config.notifier.bot_token = Some("xoxb-123".to_string());

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::IncompleteBotCredentials)
        ));

        config.notifier.channel_id = Some("C42".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_fallback_webhook_url_shape() {
        let mut config = Config::default();
        config.notifier.webhook_url = Some("https://example.com/x".to_string());

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::InvalidWebhookUrl(_))));

        config.notifier.webhook_url =
            Some("https://hooks.slack.com/services/T000/B000/XXXX".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_list_limit() {
        let mut config = Config::default();
        config.alerts.default_list_limit = 0;

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::ZeroValue { .. })));
    }

    #[test]
    fn test_zero_timeouts() {
        let mut config = Config::default();
        config.notifier.connect_timeout_secs = 0;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::ZeroValue {
                field: "notifier.connect_timeout_secs"
            })
        ));

        config.notifier.connect_timeout_secs = 5;
        config.notifier.request_timeout_secs = 0;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::ZeroValue {
                field: "notifier.request_timeout_secs"
            })
        ));
    }

    #[test]
    fn test_list_limit_order() {
        let mut config = Config::default();
        config.alerts.default_list_limit = 600;

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::ListLimitOrder { .. })
        ));
    }
}

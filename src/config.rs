//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Agent the backend routes messages to when none is configured.
pub const DEFAULT_AGENT_ID: &str = "01c95267-dd29-02bc-a9ad-d243b05a8d51";

/// Room the transcript record is kept under when none is configured.
pub const DEFAULT_ROOM_ID: &str = "45b0dcf5-802e-074e-9e67-84991c38b62e";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the message endpoint.
    pub base_url: String,
    /// Base URL of the `/auth/*` endpoints (transcript, session reset).
    pub auth_base_url: String,
    pub agent_id: String,
    pub room_id: String,
    /// User the conversation is attributed to.
    pub user_id: String,
    /// Delay between a message exchange and the transcript refetch, so the
    /// backend has time to record the answer.
    pub refetch_delay: Duration,
    /// How long a "new stage" notification stays visible.
    pub notification_display: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            auth_base_url: "http://localhost:3000".to_string(),
            agent_id: DEFAULT_AGENT_ID.to_string(),
            room_id: DEFAULT_ROOM_ID.to_string(),
            user_id: "User".to_string(),
            refetch_delay: Duration::from_millis(1000),
            notification_display: Duration::from_millis(4000),
        }
    }
}

impl ClientConfig {
    /// Build the configuration from `INTAKE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Unset keys fall back to [`ClientConfig::default`]; the auth base URL
    /// falls back to the message base URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = match get("INTAKE_BASE_URL") {
            Some(url) => validate_url("INTAKE_BASE_URL", &url)?,
            None => defaults.base_url,
        };
        let auth_base_url = match get("INTAKE_AUTH_BASE_URL") {
            Some(url) => validate_url("INTAKE_AUTH_BASE_URL", &url)?,
            None => base_url.clone(),
        };

        let refetch_delay = match get("INTAKE_REFETCH_DELAY_MS") {
            Some(ms) => parse_millis("INTAKE_REFETCH_DELAY_MS", &ms)?,
            None => defaults.refetch_delay,
        };
        let notification_display = match get("INTAKE_NOTIFICATION_MS") {
            Some(ms) => parse_millis("INTAKE_NOTIFICATION_MS", &ms)?,
            None => defaults.notification_display,
        };

        Ok(Self {
            base_url,
            auth_base_url,
            agent_id: get("INTAKE_AGENT_ID").unwrap_or(defaults.agent_id),
            room_id: get("INTAKE_ROOM_ID").unwrap_or(defaults.room_id),
            user_id: get("INTAKE_USER_ID").unwrap_or(defaults.user_id),
            refetch_delay,
            notification_display,
        })
    }
}

fn validate_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    reqwest::Url::parse(trimmed).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{trimmed}' is not a valid URL: {e}"),
    })?;
    Ok(trimmed.to_string())
}

fn parse_millis(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected milliseconds, got '{raw}': {e}"),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_lookup_yields_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.auth_base_url, "http://localhost:3000");
        assert_eq!(config.agent_id, DEFAULT_AGENT_ID);
        assert_eq!(config.room_id, DEFAULT_ROOM_ID);
        assert_eq!(config.user_id, "User");
        assert_eq!(config.refetch_delay, Duration::from_millis(1000));
        assert_eq!(config.notification_display, Duration::from_millis(4000));
    }

    #[test]
    fn auth_base_url_follows_base_url() {
        let config =
            ClientConfig::from_lookup(lookup(&[("INTAKE_BASE_URL", "https://intake.test/")]))
                .unwrap();
        assert_eq!(config.base_url, "https://intake.test");
        assert_eq!(config.auth_base_url, "https://intake.test");
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("INTAKE_BASE_URL", "https://msg.test"),
            ("INTAKE_AUTH_BASE_URL", "https://auth.test"),
            ("INTAKE_USER_ID", "chris"),
            ("INTAKE_REFETCH_DELAY_MS", "0"),
            ("INTAKE_NOTIFICATION_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.auth_base_url, "https://auth.test");
        assert_eq!(config.user_id, "chris");
        assert_eq!(config.refetch_delay, Duration::ZERO);
        assert_eq!(config.notification_display, Duration::from_millis(250));
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        let config = ClientConfig::from_lookup(lookup(&[("INTAKE_USER_ID", "  ")])).unwrap();
        assert_eq!(config.user_id, "User");
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[("INTAKE_BASE_URL", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "INTAKE_BASE_URL"));
    }

    #[test]
    fn invalid_millis_are_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[("INTAKE_NOTIFICATION_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("INTAKE_NOTIFICATION_MS"));
    }
}

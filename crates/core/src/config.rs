use crate::error::ConfigError;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:9200";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, ConfigError> {
        let username = username.into();
        if username.is_empty() {
            return Err(ConfigError::InvalidCredentials(
                "username must not be empty".to_string(),
            ));
        }
        if username.contains(':') {
            return Err(ConfigError::InvalidCredentials(
                "username must not contain ':'".to_string(),
            ));
        }

        Ok(Self {
            username,
            password: password.into(),
        })
    }

    pub fn basic_auth_header(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub endpoint: Url,
    pub credentials: Credentials,
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn new(endpoint: &str, credentials: Credentials) -> Result<Self, ConfigError> {
        let endpoint = parse_endpoint(endpoint)?;
        Ok(Self {
            endpoint,
            credentials,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn from_parts(
        endpoint: &str,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self, ConfigError> {
        let username = username.ok_or_else(|| ConfigError::Missing("username".to_string()))?;
        let password = password.ok_or_else(|| ConfigError::Missing("password".to_string()))?;
        Self::new(endpoint, Credentials::new(username, password)?)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Missing("endpoint".to_string()));
    }

    let url = Url::parse(trimmed).map_err(|error| ConfigError::InvalidEndpoint {
        url: trimmed.to_string(),
        reason: error.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidEndpoint {
            url: trimmed.to_string(),
            reason: format!("unsupported scheme {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_header_encodes_user_and_password() {
        let credentials = Credentials::new("elastic", "changeme").expect("valid credentials");
        assert_eq!(credentials.basic_auth_header(), "Basic ZWxhc3RpYzpjaGFuZ2VtZQ==");
    }

    #[test]
    fn debug_output_hides_password() {
        let credentials = Credentials::new("elastic", "s3cret").expect("valid credentials");
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn missing_password_is_rejected() {
        let result = BackendConfig::from_parts(DEFAULT_ENDPOINT, Some("elastic".to_string()), None);
        assert!(matches!(result, Err(ConfigError::Missing(field)) if field == "password"));
    }

    #[test]
    fn non_http_endpoint_is_rejected() {
        let credentials = Credentials::new("elastic", "pw").expect("valid credentials");
        let result = BackendConfig::new("ftp://localhost:9200", credentials);
        assert!(matches!(result, Err(ConfigError::InvalidEndpoint { .. })));
    }

    #[test]
    fn default_timeout_is_thirty_seconds() -> Result<(), Box<dyn std::error::Error>> {
        let config = BackendConfig::from_parts(
            "http://search.internal:9200/",
            Some("elastic".to_string()),
            Some("pw".to_string()),
        )?;
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.endpoint.host_str(), Some("search.internal"));
        Ok(())
    }
}

use std::{fmt, time::Duration};

use reqwest::Url;

use crate::{wire::PIPELINE_PATH, Result, TursoError};

pub const DATABASE_URL_ENV: &str = "TURSO_DATABASE_URL";
pub const AUTH_TOKEN_ENV: &str = "TURSO_AUTH_TOKEN";
pub const TIMEOUT_ENV: &str = "TURSO_TIMEOUT_SECS";
pub const MAX_RETRIES_ENV: &str = "TURSO_MAX_RETRIES";
pub const BACKOFF_BASE_ENV: &str = "TURSO_BACKOFF_BASE_SECS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRIES: usize = 2;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Resolved endpoint, credential, timeout and retry settings.
///
/// Built once through [`ClientConfig::builder`]; nothing is read from the
/// environment after [`ClientConfigBuilder::build`] returns.
#[derive(Clone, Eq, PartialEq)]
pub struct ClientConfig {
    base_url: String,
    authorization: String,
    /// Bound on a whole round trip, retries and backoff sleeps included.
    pub timeout: Duration,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Base retry backoff; attempt `n` waits `backoff_base * 2^n`.
    pub backoff_base: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("authorization", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("backoff_base", &self.backoff_base)
            .finish()
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Resolves every setting from the environment.
    pub fn from_env() -> Result<Self> {
        Self::builder().build()
    }

    /// Database URL with the `https` scheme and no pipeline suffix.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn pipeline_url(&self) -> String {
        format!("{}{PIPELINE_PATH}", self.base_url)
    }

    pub(crate) fn authorization(&self) -> &str {
        &self.authorization
    }
}

/// Builder for [`ClientConfig`]. Unset options fall back to the
/// `TURSO_*` environment variables, then to defaults.
#[derive(Clone, Debug, Default)]
pub struct ClientConfigBuilder {
    database_url: Option<String>,
    auth_token: Option<String>,
    timeout: Option<Duration>,
    max_retries: Option<usize>,
    backoff_base: Option<Duration>,
}

impl ClientConfigBuilder {
    /// `libsql://`, `https://` or `http://` URL of the database.
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Access token; the `Bearer ` prefix is optional.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// A zero backoff retries immediately.
    pub fn backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = Some(backoff_base);
        self
    }

    /// Resolves the configuration against the process environment.
    pub fn build(self) -> Result<ClientConfig> {
        self.build_with(|key| std::env::var(key).ok())
    }

    /// Resolves the configuration using `lookup` in place of the process
    /// environment.
    pub fn build_with<F>(self, lookup: F) -> Result<ClientConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url = self
            .database_url
            .or_else(|| env(DATABASE_URL_ENV))
            .ok_or_else(|| {
                TursoError::Config(format!(
                    "database_url not provided and {DATABASE_URL_ENV} is not set"
                ))
            })?;
        let auth_token = self
            .auth_token
            .or_else(|| env(AUTH_TOKEN_ENV))
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                TursoError::Config(format!(
                    "auth_token not provided and {AUTH_TOKEN_ENV} is not set"
                ))
            })?;

        let timeout = match self.timeout {
            Some(timeout) => timeout,
            None => env(TIMEOUT_ENV)
                .map(|raw| parse_seconds(TIMEOUT_ENV, &raw))
                .transpose()?
                .unwrap_or(DEFAULT_TIMEOUT),
        };
        if timeout.is_zero() {
            return Err(TursoError::Config("timeout must be greater than zero".to_owned()));
        }

        let max_retries = match self.max_retries {
            Some(max_retries) => max_retries,
            None => env(MAX_RETRIES_ENV)
                .map(|raw| {
                    raw.trim().parse::<usize>().map_err(|err| {
                        TursoError::Config(format!("invalid {MAX_RETRIES_ENV} '{raw}': {err}"))
                    })
                })
                .transpose()?
                .unwrap_or(DEFAULT_MAX_RETRIES),
        };

        let backoff_base = match self.backoff_base {
            Some(backoff_base) => backoff_base,
            None => env(BACKOFF_BASE_ENV)
                .map(|raw| parse_seconds(BACKOFF_BASE_ENV, &raw))
                .transpose()?
                .unwrap_or(DEFAULT_BACKOFF_BASE),
        };

        Ok(ClientConfig {
            base_url: normalize_database_url(&database_url)?,
            authorization: normalize_bearer_authorization(&auth_token),
            timeout,
            max_retries,
            backoff_base,
        })
    }
}

/// Rewrites `libsql://` to `https://` and strips a trailing slash or a
/// pasted `/v2/pipeline` suffix.
pub(crate) fn normalize_database_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    let rewritten = match trimmed.strip_prefix("libsql://") {
        Some(rest) => format!("https://{rest}"),
        None => trimmed.to_owned(),
    };
    let mut base = rewritten.trim_end_matches('/');
    if let Some(stripped) = base.strip_suffix(PIPELINE_PATH) {
        base = stripped.trim_end_matches('/');
    }

    let parsed = Url::parse(base)
        .map_err(|err| TursoError::Config(format!("invalid database URL '{base}': {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(TursoError::Config(format!(
            "invalid database URL '{base}': expected libsql://, https:// or http:// with a host"
        )));
    }
    Ok(base.to_owned())
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}

fn parse_seconds(key: &str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| TursoError::Config(format!("invalid {key} '{raw}': expected seconds")))
}

//! Provider configuration with environment fallbacks

use std::str::FromStr;
use std::time::Duration;
use tfcrud::{Auth, AttributePath, BackendError, ClientConfig, Diagnostic, Dynamic, DynamicValue, HttpBackend};

pub const ENDPOINT_ENV: &str = "GUARDRAIL_ENDPOINT";
pub const API_TOKEN_ENV: &str = "GUARDRAIL_API_TOKEN";
pub const AUTH_SCHEME_ENV: &str = "GUARDRAIL_AUTH_SCHEME";
pub const INSECURE_ENV: &str = "GUARDRAIL_INSECURE";
pub const TIMEOUT_ENV: &str = "GUARDRAIL_TIMEOUT";

/// Header carrying the token when `auth_scheme = "api_key"`
pub const API_KEY_HEADER: &str = "X-Guardrail-Key";

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    ApiKey,
}

impl FromStr for AuthScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bearer" => Ok(AuthScheme::Bearer),
            "api_key" | "api-key" => Ok(AuthScheme::ApiKey),
            other => Err(format!(
                "unsupported auth scheme {:?}, expected one of: bearer, api_key",
                other
            )),
        }
    }
}

#[derive(Clone)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub api_token: String,
    pub auth_scheme: AuthScheme,
    pub insecure: bool,
    pub timeout: Duration,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("api_token", &"***")
            .field("auth_scheme", &self.auth_scheme)
            .field("insecure", &self.insecure)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Read settings from the provider block, falling back to the environment
    /// for anything left unset. All problems are reported together.
    pub fn from_config(config: &DynamicValue) -> Result<Self, Vec<Diagnostic>> {
        let mut diags = Vec::new();

        let endpoint = string_setting(config, "endpoint", ENDPOINT_ENV, &mut diags);
        let api_token = string_setting(config, "api_token", API_TOKEN_ENV, &mut diags);

        let auth_scheme = match string_setting(config, "auth_scheme", AUTH_SCHEME_ENV, &mut diags) {
            None => AuthScheme::Bearer,
            Some(raw) => raw.parse().unwrap_or_else(|e: String| {
                diags.push(
                    Diagnostic::error("Invalid auth_scheme", e)
                        .with_attribute(AttributePath::new("auth_scheme")),
                );
                AuthScheme::Bearer
            }),
        };

        let insecure = match config.attribute("insecure") {
            Some(Dynamic::Bool(b)) => *b,
            Some(Dynamic::Null) | None => std::env::var(INSECURE_ENV)
                .ok()
                .and_then(|v| v.parse::<bool>().ok())
                .unwrap_or(false),
            Some(other) => {
                diags.push(type_error("insecure", "bool", other));
                false
            }
        };

        let timeout_seconds = match config.attribute("timeout_seconds") {
            Some(Dynamic::Int(n)) => Some(*n),
            Some(Dynamic::Null) | None => match std::env::var(TIMEOUT_ENV) {
                Ok(raw) => match raw.trim().parse::<i64>() {
                    Ok(n) => Some(n),
                    Err(_) => {
                        diags.push(Diagnostic::error(
                            "Invalid timeout",
                            format!("{} must be a whole number of seconds, got {:?}", TIMEOUT_ENV, raw),
                        ));
                        None
                    }
                },
                Err(_) => None,
            },
            Some(other) => {
                diags.push(type_error("timeout_seconds", "int", other));
                None
            }
        };
        let timeout_seconds = match timeout_seconds {
            Some(n) if n <= 0 => {
                diags.push(
                    Diagnostic::error("Invalid timeout", format!("must be positive, got {}", n))
                        .with_attribute(AttributePath::new("timeout_seconds")),
                );
                DEFAULT_TIMEOUT_SECONDS
            }
            Some(n) => n as u64,
            None => DEFAULT_TIMEOUT_SECONDS,
        };

        if endpoint.is_none() {
            diags.push(
                Diagnostic::error(
                    "endpoint is required (set in provider config or GUARDRAIL_ENDPOINT env var)",
                    "",
                )
                .with_attribute(AttributePath::new("endpoint")),
            );
        }
        if api_token.is_none() {
            diags.push(
                Diagnostic::error(
                    "api_token is required (set in provider config or GUARDRAIL_API_TOKEN env var)",
                    "",
                )
                .with_attribute(AttributePath::new("api_token")),
            );
        }

        match (endpoint, api_token) {
            (Some(endpoint), Some(api_token)) if diags.is_empty() => Ok(Self {
                endpoint,
                api_token,
                auth_scheme,
                insecure,
                timeout: Duration::from_secs(timeout_seconds),
            }),
            _ => Err(diags),
        }
    }

    pub fn auth(&self) -> Auth {
        match self.auth_scheme {
            AuthScheme::Bearer => Auth::Bearer(self.api_token.clone()),
            AuthScheme::ApiKey => Auth::ApiKey {
                header: API_KEY_HEADER.to_string(),
                key: self.api_token.clone(),
            },
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: self.timeout,
            insecure: self.insecure,
            user_agent: format!("terraform-provider-guardrail/{}", env!("CARGO_PKG_VERSION")),
            ..Default::default()
        }
    }

    pub fn backend(&self) -> Result<HttpBackend, BackendError> {
        HttpBackend::with_config(&self.endpoint, self.auth(), self.client_config())
    }
}

fn string_setting(
    config: &DynamicValue,
    name: &str,
    env: &str,
    diags: &mut Vec<Diagnostic>,
) -> Option<String> {
    match config.attribute(name) {
        Some(Dynamic::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Dynamic::String(_)) | Some(Dynamic::Null) | None => {
            std::env::var(env).ok().filter(|v| !v.is_empty())
        }
        Some(other) => {
            diags.push(type_error(name, "string", other));
            None
        }
    }
}

fn type_error(name: &str, expected: &str, actual: &Dynamic) -> Diagnostic {
    Diagnostic::error(
        "Incorrect attribute value type",
        format!("{} must be a {}, got {}", name, expected, actual.type_name()),
    )
    .with_attribute(AttributePath::new(name))
}

//! Process configuration read from the environment at startup.

use std::env;
use thiserror::Error;

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_OAUTH_URL: &str = "https://github.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
}

/// Template repository used to provision a personal repository on invite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRepository {
    pub owner: String,
    pub name: String,
}

impl TemplateRepository {
    /// Parse an `owner/name` identifier.
    pub fn parse(value: &str) -> Option<Self> {
        let (owner, name) = value.trim().split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub organization: String,
    pub username: String,
    /// Basic-auth secret for REST, bearer token for GraphQL.
    pub private_key: String,
    pub client_id: String,
    pub client_secret: String,
    pub template_repository: Option<TemplateRepository>,
    pub port: u16,
    pub api_url: String,
    pub oauth_url: String,
    pub timeout_secs: u64,
    /// Whether `/gql-query` executes caller-supplied GraphQL.
    pub allow_adhoc_graphql: bool,
    /// Logins skipped by ownership inference, on top of the built-in list.
    pub owner_blocklist: Vec<String>,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String, ConfigError> {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
        };

        let template_repository = match lookup("TEMPLATE_REPOSITORY") {
            Some(v) if !v.trim().is_empty() => Some(TemplateRepository::parse(&v).ok_or_else(
                || ConfigError::InvalidValue {
                    name: "TEMPLATE_REPOSITORY".to_string(),
                    message: format!("expected owner/name, got {:?}", v),
                },
            )?),
            _ => None,
        };

        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let allow_adhoc_graphql = parse_or(&lookup, "ALLOW_ADHOC_GRAPHQL", true)?;

        let owner_blocklist = lookup("OWNER_BLOCKLIST")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            organization: required("ORGANIZATION")?,
            username: required("USERNAME")?,
            private_key: required("PRIVATE_KEY")?,
            client_id: required("CLIENT_ID")?,
            client_secret: required("CLIENT_SECRET")?,
            template_repository,
            port,
            api_url: lookup("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            oauth_url: lookup("GITHUB_OAUTH_URL").unwrap_or_else(|| DEFAULT_OAUTH_URL.to_string()),
            timeout_secs,
            allow_adhoc_graphql,
            owner_blocklist,
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [("GITHUB_API_URL", &self.api_url), ("GITHUB_OAUTH_URL", &self.oauth_url)] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    message: "must be an http(s) URL".to_string(),
                });
            }
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "REQUEST_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                message: format!("cannot parse {:?}", raw),
            })
        }
        _ => Ok(default),
    }
}

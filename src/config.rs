//! Provider configuration.
//!
//! The host sends the `provider "vercel" { ... }` block as JSON during
//! Configure. Unset values fall back to environment variables so credentials
//! can stay out of configuration files.

use serde::Deserialize;
use serde_json::Value;

use crate::client::{Client, DEFAULT_API_URL};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

/// Environment variable consulted when `api_token` is not configured.
pub const API_TOKEN_ENV: &str = "VERCEL_API_TOKEN";

/// Environment variable consulted when `team` is not configured.
pub const TEAM_ENV: &str = "VERCEL_TEAM";

/// The provider configuration block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
}

impl ProviderConfig {
    /// Parse the configuration sent by the host. `null` means an empty block.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Fill unset values from the process environment.
    pub fn with_env_fallback(self) -> Self {
        self.with_fallback(|name| std::env::var(name).ok())
    }

    fn with_fallback(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if is_unset(&self.api_token) {
            self.api_token = lookup(API_TOKEN_ENV);
        }
        if is_unset(&self.team) {
            self.team = lookup(TEAM_ENV);
        }
        self
    }

    /// Build an API client from this configuration.
    pub fn build_client(&self) -> Result<Client, ProviderError> {
        let token = self
            .api_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "api_token is not set. Set it in the provider block or with the {} environment variable",
                    API_TOKEN_ENV
                ))
            })?;

        let api_url = self
            .api_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_API_URL);

        let client = Client::new(token)
            .and_then(|c| c.with_base_url(api_url))
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        Ok(client.with_team_id(self.team.clone()))
    }
}

fn is_unset(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

/// Schema of the provider configuration block.
pub fn schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "api_token",
            Attribute::optional_string().sensitive().with_description(
                "The Vercel API Token to use. This can also be specified with the `VERCEL_API_TOKEN` environment variable.",
            ),
        )
        .with_attribute(
            "team",
            Attribute::optional_string().with_description(
                "The default team ID to use for resources. This can also be specified with the `VERCEL_TEAM` environment variable.",
            ),
        )
        .with_attribute(
            "api_url",
            Attribute::optional_string()
                .with_description("The Vercel API endpoint. Defaults to https://api.vercel.com."),
        )
}

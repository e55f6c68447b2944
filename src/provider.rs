//! The Vercel provider.

use std::sync::OnceLock;

use serde_json::Value;
use tracing::{debug, info};

use crate::client::Client;
use crate::config::{self, ProviderConfig};
use crate::data_sources::file;
use crate::error::ProviderError;
use crate::plan::plan_resource;
use crate::resources::project_domain;
use crate::schema::{Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation::validate;

/// Maps host operations onto the Vercel API.
///
/// The API client is created by the first successful Configure and shared
/// by every later call.
#[derive(Debug, Default)]
pub struct VercelProvider {
    client: OnceLock<Client>,
}

impl VercelProvider {
    /// An unconfigured provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that is already configured with `client`.
    pub fn with_client(client: Client) -> Self {
        let provider = Self::new();
        let _ = provider.client.set(client);
        provider
    }

    fn client(&self) -> Result<&Client, ProviderError> {
        self.client.get().ok_or_else(|| {
            ProviderError::Configuration("the provider has not been configured".to_string())
        })
    }

    fn resource_schema(resource_type: &str) -> Result<Schema, ProviderError> {
        match resource_type {
            project_domain::TYPE_NAME => Ok(project_domain::schema()),
            other => Err(unknown_resource(other)),
        }
    }

    fn data_source_schema(data_source_type: &str) -> Result<Schema, ProviderError> {
        match data_source_type {
            file::TYPE_NAME => Ok(file::schema()),
            other => Err(unknown_data_source(other)),
        }
    }
}

fn unknown_resource(resource_type: &str) -> ProviderError {
    ProviderError::UnknownResource(format!("Unknown resource type: {}", resource_type))
}

fn unknown_data_source(data_source_type: &str) -> ProviderError {
    ProviderError::UnknownResource(format!("Unknown data source type: {}", data_source_type))
}

#[async_trait::async_trait]
impl ProviderService for VercelProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(config::schema())
            .with_resource(project_domain::TYPE_NAME, project_domain::schema())
            .with_data_source(file::TYPE_NAME, file::schema())
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&config::schema(), &config))
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        if self.client.get().is_some() {
            return Err(ProviderError::Configuration(
                "the provider is already configured".to_string(),
            ));
        }

        let diagnostics = validate(&config::schema(), &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(diagnostics);
        }

        let config = ProviderConfig::from_value(config)?.with_env_fallback();
        let client = match config.build_client() {
            Ok(client) => client,
            Err(e) => {
                return Ok(vec![Diagnostic::error(e.summary()).with_detail(e.message())]);
            }
        };
        let team = client.default_team_id().unwrap_or_default().to_string();

        self.client.set(client).map_err(|_| {
            ProviderError::Configuration("the provider is already configured".to_string())
        })?;
        info!(team = %team, "configured vercel client");
        Ok(diagnostics)
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&Self::resource_schema(resource_type)?, &config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        _proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = Self::resource_schema(resource_type)?;
        plan_resource(&schema, prior_state.as_ref(), &config)
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        match resource_type {
            project_domain::TYPE_NAME => project_domain::create(self.client()?, planned_state).await,
            other => Err(unknown_resource(other)),
        }
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        match resource_type {
            project_domain::TYPE_NAME => project_domain::read(self.client()?, current_state).await,
            other => Err(unknown_resource(other)),
        }
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        match resource_type {
            project_domain::TYPE_NAME => {
                project_domain::update(self.client()?, prior_state, planned_state).await
            }
            other => Err(unknown_resource(other)),
        }
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        match resource_type {
            project_domain::TYPE_NAME => project_domain::delete(self.client()?, current_state).await,
            other => Err(unknown_resource(other)),
        }
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        match resource_type {
            project_domain::TYPE_NAME => {
                let state = project_domain::import(self.client()?, id).await?;
                Ok(vec![ImportedResource::new(resource_type, state)])
            }
            other => Err(unknown_resource(other)),
        }
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&Self::data_source_schema(data_source_type)?, &config))
    }

    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError> {
        debug!(data_source_type, "reading data source");
        match data_source_type {
            // Needs no API client, so it works before Configure.
            file::TYPE_NAME => file::read(config).await,
            other => Err(unknown_data_source(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_lists_components() {
        let schema = VercelProvider::new().schema();
        assert!(schema.resources.contains_key("vercel_project_domain"));
        assert!(schema.data_sources.contains_key("vercel_file"));
        assert!(schema.provider.attribute("api_token").unwrap().flags.sensitive);
    }

    #[tokio::test]
    async fn test_configure_once() {
        let provider = VercelProvider::new();
        let diagnostics = provider
            .configure(json!({"api_token": "token", "team": "team_1"}))
            .await
            .unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(provider.client().unwrap().default_team_id(), Some("team_1"));

        let err = provider
            .configure(json!({"api_token": "other"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_configure_rejects_unknown_attribute() {
        let provider = VercelProvider::new();
        let diagnostics = provider
            .configure(json!({"api_token": "token", "region": "iad1"}))
            .await
            .unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert!(provider.client().is_err());
    }

    #[tokio::test]
    async fn test_operations_require_configure() {
        let provider = VercelProvider::new();
        let err = provider
            .read(
                "vercel_project_domain",
                json!({"project_id": "prj_1", "domain": "example.com"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unknown_types() {
        let provider = VercelProvider::with_client(Client::new("token").unwrap());

        let err = provider.create("vercel_project", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));

        let err = provider
            .read_data_source("vercel_project", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));

        let err = provider
            .validate_resource_config("vercel_alias", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_computed_attributes_rejected_in_config() {
        let provider = VercelProvider::new();

        let diagnostics = provider
            .validate_resource_config(
                "vercel_project_domain",
                json!({"project_id": "prj_1", "domain": "example.com", "id": "bogus"}),
            )
            .await
            .unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("id"));

        let diagnostics = provider
            .validate_data_source_config(
                "vercel_file",
                json!({"path": "index.html", "file": {"index.html": "1~abc"}}),
            )
            .await
            .unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("file"));
    }

    #[tokio::test]
    async fn test_plan_ignores_configured_id() {
        let provider = VercelProvider::new();
        let prior = json!({
            "project_id": "prj_1",
            "team_id": null,
            "id": "example.com",
            "domain": "example.com",
            "redirect": null,
            "redirect_status_code": null,
            "git_branch": null
        });
        let config = json!({"project_id": "prj_1", "domain": "example.com", "id": "bogus"});
        let plan = provider
            .plan("vercel_project_domain", Some(prior), config.clone(), config)
            .await
            .unwrap();
        assert!(plan.changes.is_empty());
        assert_eq!(plan.planned_state["id"], "example.com");
    }

    #[tokio::test]
    async fn test_plan_uses_resource_schema() {
        let provider = VercelProvider::new();
        let config = json!({"project_id": "prj_1", "domain": "example.com"});
        let plan = provider
            .plan("vercel_project_domain", None, config.clone(), config)
            .await
            .unwrap();
        assert_eq!(plan.planned_state["redirect"], Value::Null);
        assert_eq!(plan.changes.len(), 2);
    }
}

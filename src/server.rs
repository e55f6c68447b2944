//! The provider side of the `hemmer.provider.v1` gRPC protocol.
//!
//! [`ProviderService`] is the JSON-level interface the provider implements;
//! the adapter in this module decodes request bytes, calls it, and turns
//! errors into diagnostics. [`serve`] binds a local port, prints the
//! handshake line and runs until SIGTERM or SIGINT.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tonic::transport::Server;
use tracing::field::Empty;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ProviderError;
use crate::generated;
use crate::schema::{Block, Diagnostic, DiagnosticSeverity, ProviderSchema, Schema};
use crate::types::{
    ImportedResource, PlanResult, ProviderMetadata, HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};

/// The operations a provider exposes to the host.
///
/// State and configuration are plain JSON objects shaped by the schema
/// returned from [`schema`](Self::schema).
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    /// The schema of the provider block, every resource and every data source.
    fn schema(&self) -> ProviderSchema;

    /// Resource and data source type names, sorted.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        let mut resources: Vec<String> = schema.resources.keys().cloned().collect();
        let mut data_sources: Vec<String> = schema.data_sources.keys().cloned().collect();
        resources.sort();
        data_sources.sort();
        ProviderMetadata {
            resources,
            data_sources,
        }
    }

    /// Check the provider block without configuring anything.
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Configure the provider. Called once before any resource operation.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Release resources before the process exits.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Check a resource configuration.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Compute the planned state. `prior_state` is `None` on create and
    /// `config` is null on destroy.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create the remote object and return its state.
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError>;

    /// Refresh state. `Ok(None)` means the remote object is gone.
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError>;

    /// Apply an in-place update and return the new state.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the remote object.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    /// Load existing remote objects identified by `id`.
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let _ = id;
        Err(ProviderError::Validation(format!(
            "Import is not supported for resource type: {}",
            resource_type
        )))
    }

    /// Check a data source configuration.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (data_source_type, config);
        Ok(vec![])
    }

    /// Read a data source.
    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError>;
}

struct ProviderGrpcService<P: ProviderService> {
    provider: Arc<P>,
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<generated::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| generated::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Error => generated::diagnostic::Severity::Error as i32,
                DiagnosticSeverity::Warning => generated::diagnostic::Severity::Warning as i32,
            },
            summary: d.summary,
            detail: d.detail.unwrap_or_default(),
            attribute: d.attribute.unwrap_or_default(),
        })
        .collect()
}

fn error_to_diagnostics(err: ProviderError) -> Vec<generated::Diagnostic> {
    let detail = match &err {
        ProviderError::Serialization(e) => e.to_string(),
        ProviderError::Transport(e) => e.to_string(),
        other => other.message().to_string(),
    };
    diagnostics_to_proto(vec![Diagnostic::error(err.summary()).with_detail(detail)])
}

fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Decode JSON request bytes; empty bytes are `null`.
fn decode(bytes: &[u8]) -> Result<Value, ProviderError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(bytes)?)
}

fn encode(value: &Value) -> Result<Vec<u8>, ProviderError> {
    Ok(serde_json::to_vec(value)?)
}

fn schema_to_proto(schema: &Schema) -> generated::Schema {
    generated::Schema {
        version: schema.version as i64,
        block: Some(block_to_proto(&schema.block)),
    }
}

fn block_to_proto(block: &Block) -> generated::Block {
    let mut names: Vec<&String> = block.attributes.keys().collect();
    names.sort();
    generated::Block {
        attributes: names
            .into_iter()
            .map(|name| {
                let attr = &block.attributes[name];
                generated::Attribute {
                    name: name.clone(),
                    r#type: serde_json::to_vec(&attr.attr_type).unwrap_or_default(),
                    required: attr.flags.required,
                    optional: attr.flags.optional,
                    computed: attr.flags.computed,
                    sensitive: attr.flags.sensitive,
                    description: attr.description.clone().unwrap_or_default(),
                    force_new: attr.force_new,
                }
            })
            .collect(),
        description: block.description.clone().unwrap_or_default(),
    }
}

#[derive(Debug, Clone, Copy)]
enum ConfigKind {
    Provider,
    Resource,
    DataSource,
}

impl<P: ProviderService> ProviderGrpcService<P> {
    async fn validate_config(
        &self,
        kind: ConfigKind,
        type_name: &str,
        config: &[u8],
    ) -> Vec<generated::Diagnostic> {
        let result = match decode(config) {
            Ok(config) => match kind {
                ConfigKind::Provider => self.provider.validate_provider_config(config).await,
                ConfigKind::Resource => {
                    self.provider.validate_resource_config(type_name, config).await
                }
                ConfigKind::DataSource => {
                    self.provider
                        .validate_data_source_config(type_name, config)
                        .await
                }
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(diagnostics) => {
                if has_errors(&diagnostics) {
                    warn!(?kind, type_name, diagnostics = diagnostics.len(), "Validation found errors");
                } else {
                    debug!(?kind, type_name, "Validation passed");
                }
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(?kind, type_name, error = %e, "Validation failed");
                error_to_diagnostics(e)
            }
        }
    }
}

#[tonic::async_trait]
impl<P: ProviderService> generated::provider_server::Provider for ProviderGrpcService<P> {
    #[instrument(skip_all, name = "grpc.get_metadata")]
    async fn get_metadata(
        &self,
        _request: tonic::Request<generated::GetMetadataRequest>,
    ) -> Result<tonic::Response<generated::GetMetadataResponse>, tonic::Status> {
        let metadata = self.provider.metadata();
        debug!(
            resources = metadata.resources.len(),
            data_sources = metadata.data_sources.len(),
            "GetMetadata completed"
        );
        Ok(tonic::Response::new(generated::GetMetadataResponse {
            resources: metadata.resources,
            data_sources: metadata.data_sources,
            diagnostics: vec![],
        }))
    }

    #[instrument(skip_all, name = "grpc.get_schema")]
    async fn get_schema(
        &self,
        _request: tonic::Request<generated::GetSchemaRequest>,
    ) -> Result<tonic::Response<generated::GetSchemaResponse>, tonic::Status> {
        let schema = self.provider.schema();
        Ok(tonic::Response::new(generated::GetSchemaResponse {
            provider: Some(schema_to_proto(&schema.provider)),
            resources: schema
                .resources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            data_sources: schema
                .data_sources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            diagnostics: vec![],
        }))
    }

    #[instrument(skip_all, name = "grpc.validate_provider_config")]
    async fn validate_provider_config(
        &self,
        request: tonic::Request<generated::ValidateProviderConfigRequest>,
    ) -> Result<tonic::Response<generated::ValidateProviderConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        let diagnostics = self.validate_config(ConfigKind::Provider, "", &req.config).await;
        Ok(tonic::Response::new(generated::ValidateProviderConfigResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.configure")]
    async fn configure(
        &self,
        request: tonic::Request<generated::ConfigureRequest>,
    ) -> Result<tonic::Response<generated::ConfigureResponse>, tonic::Status> {
        let req = request.into_inner();
        let result = match decode(&req.config) {
            Ok(config) => self.provider.configure(config).await,
            Err(e) => Err(e),
        };

        let diagnostics = match result {
            Ok(diagnostics) => {
                if has_errors(&diagnostics) {
                    warn!(diagnostics = diagnostics.len(), "Configure completed with errors");
                } else {
                    info!("Provider configured");
                }
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(error = %e, "Configure failed");
                error_to_diagnostics(e)
            }
        };
        Ok(tonic::Response::new(generated::ConfigureResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.stop")]
    async fn stop(
        &self,
        _request: tonic::Request<generated::StopRequest>,
    ) -> Result<tonic::Response<generated::StopResponse>, tonic::Status> {
        info!("Stop requested");
        let error = match self.provider.stop().await {
            Ok(()) => String::new(),
            Err(e) => {
                error!(error = %e, "Stop failed");
                e.to_string()
            }
        };
        Ok(tonic::Response::new(generated::StopResponse { error }))
    }

    #[instrument(skip_all, name = "grpc.validate_resource_config", fields(resource_type = Empty))]
    async fn validate_resource_config(
        &self,
        request: tonic::Request<generated::ValidateResourceConfigRequest>,
    ) -> Result<tonic::Response<generated::ValidateResourceConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("resource_type", req.resource_type.as_str());
        let diagnostics = self
            .validate_config(ConfigKind::Resource, &req.resource_type, &req.config)
            .await;
        Ok(tonic::Response::new(generated::ValidateResourceConfigResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.plan", fields(resource_type = Empty))]
    async fn plan(
        &self,
        request: tonic::Request<generated::PlanRequest>,
    ) -> Result<tonic::Response<generated::PlanResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("resource_type", req.resource_type.as_str());

        let result = async {
            let prior_state = match decode(&req.prior_state)? {
                Value::Null => None,
                state => Some(state),
            };
            let proposed_state = decode(&req.proposed_state)?;
            let config = decode(&req.config)?;
            let plan = self
                .provider
                .plan(&req.resource_type, prior_state, proposed_state, config)
                .await?;
            let planned_state = encode(&plan.planned_state)?;
            Ok::<_, ProviderError>((plan, planned_state))
        }
        .await;

        let response = match result {
            Ok((plan, planned_state)) => {
                debug!(
                    changes = plan.changes.len(),
                    requires_replace = plan.requires_replace,
                    "Plan completed"
                );
                generated::PlanResponse {
                    planned_state,
                    changes: plan.changes.into_iter().map(Into::into).collect(),
                    requires_replace: plan.requires_replace,
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                error!(error = %e, "Plan failed");
                generated::PlanResponse {
                    planned_state: vec![],
                    changes: vec![],
                    requires_replace: false,
                    diagnostics: error_to_diagnostics(e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip_all, name = "grpc.create", fields(resource_type = Empty))]
    async fn create(
        &self,
        request: tonic::Request<generated::CreateRequest>,
    ) -> Result<tonic::Response<generated::CreateResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("resource_type", req.resource_type.as_str());

        let result = async {
            let planned_state = decode(&req.planned_state)?;
            let state = self.provider.create(&req.resource_type, planned_state).await?;
            encode(&state)
        }
        .await;

        let response = match result {
            Ok(state) => {
                info!("Create completed");
                generated::CreateResponse {
                    state,
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                error!(error = %e, "Create failed");
                generated::CreateResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip_all, name = "grpc.read", fields(resource_type = Empty))]
    async fn read(
        &self,
        request: tonic::Request<generated::ReadRequest>,
    ) -> Result<tonic::Response<generated::ReadResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("resource_type", req.resource_type.as_str());

        let result = async {
            let current_state = decode(&req.current_state)?;
            match self.provider.read(&req.resource_type, current_state).await? {
                Some(state) => encode(&state),
                None => Ok(vec![]),
            }
        }
        .await;

        let response = match result {
            Ok(state) => {
                if state.is_empty() {
                    info!("Resource no longer exists, removing from state");
                } else {
                    debug!("Read completed");
                }
                generated::ReadResponse {
                    state,
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                error!(error = %e, "Read failed");
                generated::ReadResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip_all, name = "grpc.update", fields(resource_type = Empty))]
    async fn update(
        &self,
        request: tonic::Request<generated::UpdateRequest>,
    ) -> Result<tonic::Response<generated::UpdateResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("resource_type", req.resource_type.as_str());

        let result = async {
            let prior_state = decode(&req.prior_state)?;
            let planned_state = decode(&req.planned_state)?;
            let state = self
                .provider
                .update(&req.resource_type, prior_state, planned_state)
                .await?;
            encode(&state)
        }
        .await;

        let response = match result {
            Ok(state) => {
                info!("Update completed");
                generated::UpdateResponse {
                    state,
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                error!(error = %e, "Update failed");
                generated::UpdateResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip_all, name = "grpc.delete", fields(resource_type = Empty))]
    async fn delete(
        &self,
        request: tonic::Request<generated::DeleteRequest>,
    ) -> Result<tonic::Response<generated::DeleteResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("resource_type", req.resource_type.as_str());

        let result = async {
            let current_state = decode(&req.current_state)?;
            self.provider.delete(&req.resource_type, current_state).await
        }
        .await;

        let diagnostics = match result {
            Ok(()) => {
                info!("Delete completed");
                vec![]
            }
            Err(e) => {
                error!(error = %e, "Delete failed");
                error_to_diagnostics(e)
            }
        };
        Ok(tonic::Response::new(generated::DeleteResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.import_resource_state", fields(resource_type = Empty, id = Empty))]
    async fn import_resource_state(
        &self,
        request: tonic::Request<generated::ImportResourceStateRequest>,
    ) -> Result<tonic::Response<generated::ImportResourceStateResponse>, tonic::Status> {
        let req = request.into_inner();
        let span = tracing::Span::current();
        span.record("resource_type", req.resource_type.as_str());
        span.record("id", req.id.as_str());

        let result = async {
            let resources = self
                .provider
                .import_resource(&req.resource_type, &req.id)
                .await?;
            resources
                .into_iter()
                .map(|r| -> Result<_, ProviderError> {
                    Ok(generated::ImportedResource {
                        state: encode(&r.state)?,
                        resource_type: r.resource_type,
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        }
        .await;

        let response = match result {
            Ok(imported) => {
                info!(imported = imported.len(), "Import completed");
                generated::ImportResourceStateResponse {
                    imported,
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                error!(error = %e, "Import failed");
                generated::ImportResourceStateResponse {
                    imported: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip_all, name = "grpc.validate_data_source_config", fields(data_source_type = Empty))]
    async fn validate_data_source_config(
        &self,
        request: tonic::Request<generated::ValidateDataSourceConfigRequest>,
    ) -> Result<tonic::Response<generated::ValidateDataSourceConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("data_source_type", req.data_source_type.as_str());
        let diagnostics = self
            .validate_config(ConfigKind::DataSource, &req.data_source_type, &req.config)
            .await;
        Ok(tonic::Response::new(generated::ValidateDataSourceConfigResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.read_data_source", fields(data_source_type = Empty))]
    async fn read_data_source(
        &self,
        request: tonic::Request<generated::ReadDataSourceRequest>,
    ) -> Result<tonic::Response<generated::ReadDataSourceResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("data_source_type", req.data_source_type.as_str());

        let result = async {
            let config = decode(&req.config)?;
            let state = self
                .provider
                .read_data_source(&req.data_source_type, config)
                .await?;
            encode(&state)
        }
        .await;

        let response = match result {
            Ok(state) => {
                debug!("ReadDataSource completed");
                generated::ReadDataSourceResponse {
                    state,
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                error!(error = %e, "ReadDataSource failed");
                generated::ReadDataSourceResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }
}

/// Options for [`serve_with_options`].
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// How long in-flight requests may run after a shutdown signal.
    /// Default: 30 seconds.
    pub shutdown_timeout: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServeOptions {
    /// Options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                    _ = sigint.recv() => info!("Received SIGINT, shutting down"),
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "Could not install signal handlers");
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received CTRL+C, shutting down"),
            Err(e) => {
                error!(error = %e, "Could not install CTRL+C handler");
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Serve `provider` on an ephemeral local port.
///
/// Prints `HEMMER_PROVIDER|<version>|<address>` on stdout once the port is
/// bound, then serves until SIGTERM or SIGINT.
pub async fn serve<P: ProviderService>(provider: P) -> Result<(), Box<dyn std::error::Error>> {
    serve_with_options(provider, ServeOptions::default()).await
}

/// [`serve`] with custom options.
pub async fn serve_with_options<P: ProviderService>(
    provider: P,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    serve_on_listener(provider, listener, addr, options).await
}

async fn serve_on_listener<P: ProviderService>(
    provider: P,
    listener: TcpListener,
    addr: SocketAddr,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", handshake_line(addr));
    info!(address = %addr, "Provider server starting");

    let provider = Arc::new(provider);
    let service = ProviderGrpcService {
        provider: Arc::clone(&provider),
    };

    let (signalled_tx, mut signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = Server::builder()
        .add_service(generated::provider_server::ProviderServer::new(service))
        .serve_with_incoming_shutdown(
            tokio_stream::wrappers::TcpListenerStream::new(listener),
            async move {
                wait_for_shutdown_signal().await;
                let _ = signalled_tx.send(());
            },
        );
    tokio::pin!(server);

    // The timeout only bounds the drain after a signal.
    tokio::select! {
        biased;
        result = &mut server => result?,
        Ok(()) = &mut signalled_rx => {
            match tokio::time::timeout(options.shutdown_timeout, &mut server).await {
                Ok(result) => result?,
                Err(_) => warn!(
                    timeout = ?options.shutdown_timeout,
                    "Shutdown timeout exceeded, dropping in-flight requests"
                ),
            }
        }
    }

    if let Err(e) = provider.stop().await {
        warn!(error = %e, "Provider stop returned an error");
    }
    info!("Provider shutdown complete");
    Ok(())
}

/// The line the host reads from stdout to find the server.
pub fn handshake_line(addr: SocketAddr) -> String {
    format!("{}|{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION, addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generated::provider_server::Provider;
    use crate::schema::Attribute;
    use crate::types::AttributeChange;
    use serde_json::json;

    struct Echo;

    #[async_trait::async_trait]
    impl ProviderService for Echo {
        fn schema(&self) -> ProviderSchema {
            ProviderSchema::new()
                .with_resource(
                    "echo_b",
                    Schema::v0().with_attribute("name", Attribute::required_string()),
                )
                .with_resource("echo_a", Schema::v0())
                .with_data_source("echo_data", Schema::v0())
        }

        async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
            if config.is_null() {
                return Ok(vec![Diagnostic::error("Missing config")]);
            }
            Ok(vec![])
        }

        async fn plan(
            &self,
            _resource_type: &str,
            _prior_state: Option<Value>,
            proposed_state: Value,
            _config: Value,
        ) -> Result<PlanResult, ProviderError> {
            Ok(PlanResult::with_changes(
                proposed_state.clone(),
                vec![AttributeChange::added("name", proposed_state["name"].clone())],
                false,
            ))
        }

        async fn create(&self, _resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
            Ok(planned_state)
        }

        async fn read(
            &self,
            _resource_type: &str,
            current_state: Value,
        ) -> Result<Option<Value>, ProviderError> {
            if current_state["name"] == "gone" {
                return Ok(None);
            }
            Ok(Some(current_state))
        }

        async fn update(
            &self,
            _resource_type: &str,
            _prior_state: Value,
            planned_state: Value,
        ) -> Result<Value, ProviderError> {
            Ok(planned_state)
        }

        async fn delete(&self, _resource_type: &str, _current_state: Value) -> Result<(), ProviderError> {
            Err(ProviderError::Remote("500 internal: boom".to_string()))
        }

        async fn read_data_source(&self, data_source_type: &str, _config: Value) -> Result<Value, ProviderError> {
            Err(ProviderError::UnknownResource(data_source_type.to_string()))
        }
    }

    fn service() -> ProviderGrpcService<Echo> {
        ProviderGrpcService {
            provider: Arc::new(Echo),
        }
    }

    #[test]
    fn test_handshake_line() {
        let addr: SocketAddr = "127.0.0.1:50051".parse().unwrap();
        assert_eq!(handshake_line(addr), "HEMMER_PROVIDER|1|127.0.0.1:50051");
    }

    #[test]
    fn test_serve_options() {
        assert_eq!(ServeOptions::default().shutdown_timeout, Duration::from_secs(30));
        let options = ServeOptions::new().with_shutdown_timeout(Duration::from_secs(5));
        assert_eq!(options.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_metadata_is_sorted() {
        let metadata = Echo.metadata();
        assert_eq!(metadata.resources, vec!["echo_a", "echo_b"]);
        assert_eq!(metadata.data_sources, vec!["echo_data"]);
    }

    #[test]
    fn test_error_to_diagnostics() {
        let diagnostics = error_to_diagnostics(ProviderError::Remote("404 not_found".to_string()));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].severity,
            generated::diagnostic::Severity::Error as i32
        );
        assert_eq!(diagnostics[0].summary, "Vercel API error");
        assert_eq!(diagnostics[0].detail, "404 not_found");
    }

    #[tokio::test]
    async fn test_get_schema() {
        let response = service()
            .get_schema(tonic::Request::new(generated::GetSchemaRequest {}))
            .await
            .unwrap()
            .into_inner();

        let echo = &response.resources["echo_b"];
        let block = echo.block.as_ref().unwrap();
        assert_eq!(block.attributes.len(), 1);
        assert_eq!(block.attributes[0].name, "name");
        assert!(block.attributes[0].required);
        assert_eq!(block.attributes[0].r#type, b"\"string\"".to_vec());
    }

    #[tokio::test]
    async fn test_configure_reports_diagnostics() {
        let response = service()
            .configure(tonic::Request::new(generated::ConfigureRequest { config: vec![] }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Missing config");
    }

    #[tokio::test]
    async fn test_invalid_json_becomes_diagnostic() {
        let response = service()
            .create(tonic::Request::new(generated::CreateRequest {
                resource_type: "echo_b".to_string(),
                planned_state: b"{not json".to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.state.is_empty());
        assert_eq!(response.diagnostics[0].summary, "Invalid state");
    }

    #[tokio::test]
    async fn test_read_gone_returns_empty_state() {
        let response = service()
            .read(tonic::Request::new(generated::ReadRequest {
                resource_type: "echo_b".to_string(),
                current_state: br#"{"name":"gone"}"#.to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.state.is_empty());
        assert!(response.diagnostics.is_empty());

        let response = service()
            .read(tonic::Request::new(generated::ReadRequest {
                resource_type: "echo_b".to_string(),
                current_state: br#"{"name":"here"}"#.to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(
            serde_json::from_slice::<Value>(&response.state).unwrap(),
            json!({"name": "here"})
        );
    }

    #[tokio::test]
    async fn test_plan_encodes_changes() {
        let response = service()
            .plan(tonic::Request::new(generated::PlanRequest {
                resource_type: "echo_b".to_string(),
                prior_state: vec![],
                proposed_state: br#"{"name":"a"}"#.to_vec(),
                config: br#"{"name":"a"}"#.to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.diagnostics.is_empty());
        assert_eq!(response.changes.len(), 1);
        assert_eq!(response.changes[0].after, b"\"a\"".to_vec());
    }

    #[tokio::test]
    async fn test_delete_error_becomes_diagnostic() {
        let response = service()
            .delete(tonic::Request::new(generated::DeleteRequest {
                resource_type: "echo_b".to_string(),
                current_state: br#"{"name":"a"}"#.to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].detail, "500 internal: boom");
    }

    #[tokio::test]
    async fn test_import_unsupported_by_default() {
        let response = service()
            .import_resource_state(tonic::Request::new(generated::ImportResourceStateRequest {
                resource_type: "echo_b".to_string(),
                id: "x".to_string(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.imported.is_empty());
        assert_eq!(response.diagnostics[0].summary, "Invalid configuration");
    }
}

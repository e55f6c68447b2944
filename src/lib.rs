//! Hemmer provider for Vercel.
//!
//! The provider runs as a subprocess of the Hemmer host and speaks the
//! `hemmer.provider.v1` gRPC protocol. It manages:
//!
//! - **`vercel_project_domain`**: a custom domain attached to a Vercel
//!   project, with optional redirect and git branch. Importable as
//!   `project_id/domain` or `team_id/project_id/domain`.
//! - **`vercel_file`** (data source): a local file's `size~sha1`
//!   fingerprint, keyed by path.
//!
//! # Handshake
//!
//! On startup the binary prints a single line to stdout:
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `HEMMER_PROVIDER|<protocol_version>|<address>`. All logging goes
//! to stderr.
//!
//! # Configuration
//!
//! ```text
//! provider "vercel" {
//!   api_token = "..."   # or VERCEL_API_TOKEN
//!   team      = "..."   # or VERCEL_TEAM
//! }
//! ```

#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use client::Client;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default};
pub use provider::VercelProvider;
pub use schema::ProviderSchema;
pub use server::{serve, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, HANDSHAKE_PREFIX,
    PROTOCOL_VERSION,
};
pub use validation::validate;

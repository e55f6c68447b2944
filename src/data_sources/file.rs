//! The `vercel_file` data source.
//!
//! Reads a local file and reports a fingerprint of its contents, keyed by the
//! path it was read from. Deployments use the fingerprint to decide which
//! files need uploading.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha1::{Digest, Sha1};
use tracing::trace;

use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};

/// Type name of the data source.
pub const TYPE_NAME: &str = "vercel_file";

#[derive(Debug, Deserialize)]
struct FileConfig {
    path: String,
}

/// State produced by a read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileData {
    /// The path the file was read from.
    pub path: String,
    /// Always equal to `path`.
    pub id: String,
    /// A single entry mapping `path` to the file's fingerprint.
    pub file: BTreeMap<String, String>,
}

/// Schema of the data source.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("Reads a file from disk and prepares it for use in a deployment.")
        .with_attribute(
            "path",
            Attribute::required_string().with_description("The path to the file on your filesystem."),
        )
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("The ID of this data source."),
        )
        .with_attribute(
            "file",
            Attribute::new(AttributeType::map(AttributeType::String), AttributeFlags::computed())
            .with_description(
                "A map of filename to metadata about the file, in the form `size~sha1`.",
            ),
        )
}

/// `<byte length>~<lowercase hex SHA-1>` of `content`.
pub fn fingerprint(content: &[u8]) -> String {
    format!("{}~{:x}", content.len(), Sha1::digest(content))
}

/// Read the file named by `config.path` and fingerprint it.
pub async fn read(config: Value) -> Result<Value, ProviderError> {
    let config: FileConfig = serde_json::from_value(config)?;

    let content = tokio::fs::read(&config.path).await.map_err(|e| {
        ProviderError::Io(format!(
            "Could not read file {}, unexpected error: {}",
            config.path, e
        ))
    })?;

    let data = FileData {
        id: config.path.clone(),
        file: BTreeMap::from([(config.path.clone(), fingerprint(&content))]),
        path: config.path,
    };
    trace!(path = %data.path, "read file");

    Ok(serde_json::to_value(data)?)
}

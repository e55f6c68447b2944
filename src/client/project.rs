use reqwest::Method;
use serde::Deserialize;

use super::{Client, ClientError};

/// The subset of a Vercel project the provider reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    /// The project ID.
    pub id: String,
    /// The project name.
    pub name: String,
}

impl Client {
    /// Fetch a project by ID or name.
    pub async fn get_project(
        &self,
        project_id: &str,
        team_id: Option<&str>,
    ) -> Result<ProjectResponse, ClientError> {
        let url = self.endpoint(&["v9", "projects", project_id], team_id)?;
        self.send(self.request(Method::GET, url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_project() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v9/projects/prj_1")
                    .query_param("teamId", "team_1")
                    .header("authorization", "Bearer token");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({"id": "prj_1", "name": "web", "framework": "nextjs"}));
            })
            .await;

        let client = Client::new("token")
            .unwrap()
            .with_base_url(&server.base_url())
            .unwrap();
        let project = client.get_project("prj_1", Some("team_1")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(project.id, "prj_1");
        assert_eq!(project.name, "web");
    }

    #[tokio::test]
    async fn test_get_project_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v9/projects/missing");
                then.status(404).json_body(json!({
                    "error": {"code": "not_found", "message": "Project not found"}
                }));
            })
            .await;

        let client = Client::new("token")
            .unwrap()
            .with_base_url(&server.base_url())
            .unwrap();
        let err = client.get_project("missing", None).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "404 not_found: Project not found");
    }

    #[tokio::test]
    async fn test_get_project_plain_error_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v9/projects/prj_1");
                then.status(502).body("bad gateway");
            })
            .await;

        let client = Client::new("token")
            .unwrap()
            .with_base_url(&server.base_url())
            .unwrap();
        let err = client.get_project("prj_1", None).await.unwrap_err();

        assert!(!err.is_not_found());
        match err {
            ClientError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 502);
                assert_eq!(code, "bad_gateway");
                assert_eq!(message, "bad gateway");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

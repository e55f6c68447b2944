use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{Client, ClientError};

/// Body of `POST /v10/projects/{id}/domains`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectDomainRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_status_code: Option<i64>,
}

/// Body of `PATCH /v9/projects/{id}/domains/{domain}`.
///
/// Every field is always sent; `null` clears the setting remotely, so the
/// same request applied twice leaves the same remote state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectDomainRequest {
    pub git_branch: Option<String>,
    pub redirect: Option<String>,
    pub redirect_status_code: Option<i64>,
}

/// A domain attached to a project, as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDomainResponse {
    pub name: String,
    pub project_id: String,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub redirect_status_code: Option<i64>,
    #[serde(default)]
    pub git_branch: Option<String>,
}

impl Client {
    /// Attach a domain to a project.
    pub async fn create_project_domain(
        &self,
        project_id: &str,
        team_id: Option<&str>,
        request: &CreateProjectDomainRequest,
    ) -> Result<ProjectDomainResponse, ClientError> {
        let url = self.endpoint(&["v10", "projects", project_id, "domains"], team_id)?;
        self.send(self.request(Method::POST, url).json(request))
            .await
    }

    /// Fetch a single project domain.
    pub async fn get_project_domain(
        &self,
        project_id: &str,
        domain: &str,
        team_id: Option<&str>,
    ) -> Result<ProjectDomainResponse, ClientError> {
        let url = self.endpoint(&["v9", "projects", project_id, "domains", domain], team_id)?;
        self.send(self.request(Method::GET, url)).await
    }

    /// Replace the redirect and git branch settings of a project domain.
    pub async fn update_project_domain(
        &self,
        project_id: &str,
        domain: &str,
        team_id: Option<&str>,
        request: &UpdateProjectDomainRequest,
    ) -> Result<ProjectDomainResponse, ClientError> {
        let url = self.endpoint(&["v9", "projects", project_id, "domains", domain], team_id)?;
        self.send(self.request(Method::PATCH, url).json(request))
            .await
    }

    /// Detach a domain from a project.
    pub async fn delete_project_domain(
        &self,
        project_id: &str,
        domain: &str,
        team_id: Option<&str>,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["v9", "projects", project_id, "domains", domain], team_id)?;
        self.send_empty(self.request(Method::DELETE, url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> Client {
        Client::new("token")
            .unwrap()
            .with_base_url(&server.base_url())
            .unwrap()
    }

    #[test]
    fn test_create_request_omits_unset_fields() {
        let request = CreateProjectDomainRequest {
            name: "example.com".to_string(),
            git_branch: None,
            redirect: Some("www.example.com".to_string()),
            redirect_status_code: Some(308),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"name": "example.com", "redirect": "www.example.com", "redirectStatusCode": 308})
        );
    }

    #[test]
    fn test_update_request_sends_nulls() {
        let request = UpdateProjectDomainRequest {
            git_branch: Some("staging".to_string()),
            redirect: None,
            redirect_status_code: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"gitBranch": "staging", "redirect": null, "redirectStatusCode": null})
        );
    }

    #[tokio::test]
    async fn test_create_project_domain() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v10/projects/prj_1/domains")
                    .json_body(json!({"name": "example.com", "gitBranch": "main"}));
                then.status(200).json_body(json!({
                    "name": "example.com",
                    "apexName": "example.com",
                    "projectId": "prj_1",
                    "gitBranch": "main",
                    "verified": true
                }));
            })
            .await;

        let request = CreateProjectDomainRequest {
            name: "example.com".to_string(),
            git_branch: Some("main".to_string()),
            redirect: None,
            redirect_status_code: None,
        };
        let out = client(&server)
            .create_project_domain("prj_1", None, &request)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(out.name, "example.com");
        assert_eq!(out.git_branch.as_deref(), Some("main"));
        assert_eq!(out.redirect, None);
    }

    #[tokio::test]
    async fn test_get_project_domain_with_team() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v9/projects/prj_1/domains/example.com")
                    .query_param("teamId", "team_1");
                then.status(200).json_body(json!({
                    "name": "example.com",
                    "projectId": "prj_1",
                    "redirect": "www.example.com",
                    "redirectStatusCode": 307,
                    "gitBranch": null
                }));
            })
            .await;

        let out = client(&server)
            .get_project_domain("prj_1", "example.com", Some("team_1"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(out.redirect.as_deref(), Some("www.example.com"));
        assert_eq!(out.redirect_status_code, Some(307));
        assert_eq!(out.git_branch, None);
    }

    #[tokio::test]
    async fn test_update_project_domain() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::PATCH)
                    .path("/v9/projects/prj_1/domains/example.com")
                    .json_body(json!({
                        "gitBranch": null,
                        "redirect": "www.example.com",
                        "redirectStatusCode": 301
                    }));
                then.status(200).json_body(json!({
                    "name": "example.com",
                    "projectId": "prj_1",
                    "redirect": "www.example.com",
                    "redirectStatusCode": 301
                }));
            })
            .await;

        let request = UpdateProjectDomainRequest {
            git_branch: None,
            redirect: Some("www.example.com".to_string()),
            redirect_status_code: Some(301),
        };
        let out = client(&server)
            .update_project_domain("prj_1", "example.com", None, &request)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(out.redirect_status_code, Some(301));
    }

    #[tokio::test]
    async fn test_delete_project_domain() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/v9/projects/prj_1/domains/example.com");
                then.status(200).json_body(json!({}));
            })
            .await;

        client(&server)
            .delete_project_domain("prj_1", "example.com", None)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_missing_domain_is_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/v9/projects/prj_1/domains/gone.com");
                then.status(404).json_body(json!({
                    "error": {"code": "not_found", "message": "Domain not found"}
                }));
            })
            .await;

        let err = client(&server)
            .delete_project_domain("prj_1", "gone.com", None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}

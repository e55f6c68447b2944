//! The `vercel_project_domain` resource.
//!
//! Binds a custom domain to a Vercel project, optionally redirecting it to
//! another domain or pinning it to a git branch. The remote object is keyed
//! by `(team_id, project_id, domain)`; changing any of those replaces it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::client::{
    Client, ClientError, CreateProjectDomainRequest, ProjectDomainResponse,
    UpdateProjectDomainRequest,
};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeValidator, Schema};

/// Type name of the resource.
pub const TYPE_NAME: &str = "vercel_project_domain";

/// Status codes accepted for `redirect_status_code`.
pub const REDIRECT_STATUS_CODES: [i64; 4] = [301, 302, 307, 308];

/// Resource state.
///
/// `id` is unknown (null) in a planned create and always set afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDomain {
    pub project_id: String,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    pub domain: String,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub redirect_status_code: Option<i64>,
    #[serde(default)]
    pub git_branch: Option<String>,
}

impl ProjectDomain {
    fn from_response(response: ProjectDomainResponse, team_id: Option<&str>) -> Self {
        Self {
            project_id: response.project_id,
            team_id: team_id.map(str::to_string),
            id: Some(response.name.clone()),
            domain: response.name,
            redirect: response.redirect,
            redirect_status_code: response.redirect_status_code,
            git_branch: response.git_branch,
        }
    }

    fn to_create_request(&self) -> CreateProjectDomainRequest {
        CreateProjectDomainRequest {
            name: self.domain.clone(),
            git_branch: self.git_branch.clone(),
            redirect: self.redirect.clone(),
            redirect_status_code: self.redirect_status_code,
        }
    }

    fn to_update_request(&self) -> UpdateProjectDomainRequest {
        UpdateProjectDomainRequest {
            git_branch: self.git_branch.clone(),
            redirect: self.redirect.clone(),
            redirect_status_code: self.redirect_status_code,
        }
    }

    fn check_redirect_status_code(&self) -> Result<(), ProviderError> {
        match self.redirect_status_code {
            Some(code) if !REDIRECT_STATUS_CODES.contains(&code) => {
                Err(ProviderError::Validation(format!(
                    "redirect_status_code must be one of {:?}, got {}",
                    REDIRECT_STATUS_CODES, code
                )))
            }
            _ => Ok(()),
        }
    }
}

/// The parts of an import identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportId {
    pub team_id: Option<String>,
    pub project_id: String,
    pub domain: String,
}

/// Parse `project_id/domain` or `team_id/project_id/domain`.
///
/// The form is chosen by segment count alone, so a domain containing `/`
/// cannot be imported.
pub fn parse_import_id(id: &str) -> Result<ImportId, ProviderError> {
    let parts: Vec<&str> = id.split('/').collect();
    let parsed = match parts.as_slice() {
        [project_id, domain] => ImportId {
            team_id: None,
            project_id: project_id.to_string(),
            domain: domain.to_string(),
        },
        [team_id, project_id, domain] => ImportId {
            team_id: Some(team_id.to_string()),
            project_id: project_id.to_string(),
            domain: domain.to_string(),
        },
        _ => return Err(invalid_import_id(id)),
    };

    if parts.iter().any(|p| p.is_empty()) {
        return Err(invalid_import_id(id));
    }
    Ok(parsed)
}

fn invalid_import_id(id: &str) -> ProviderError {
    ProviderError::Validation(format!(
        "Invalid id '{}' specified. should be in format \"team_id/project_id/domain\" or \"project_id/domain\"",
        id
    ))
}

/// Schema of the resource.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("Provides a Project Domain resource.")
        .with_attribute(
            "project_id",
            Attribute::required_string()
                .with_force_new()
                .with_description("The project ID to add the deployment to."),
        )
        .with_attribute(
            "team_id",
            Attribute::optional_computed_string()
                .with_force_new()
                .with_use_state_for_unknown()
                .with_description(
                    "The ID of the team the project exists under. Required when configured to use a team.",
                ),
        )
        .with_attribute(
            "id",
            Attribute::computed_string().with_use_state_for_unknown(),
        )
        .with_attribute(
            "domain",
            Attribute::required_string()
                .with_force_new()
                .with_description("The domain name to associate with the project."),
        )
        .with_attribute(
            "redirect",
            Attribute::optional_string()
                .with_description("The domain name that serves as a target destination for redirects."),
        )
        .with_attribute(
            "redirect_status_code",
            Attribute::optional_int64()
                .with_validator(AttributeValidator::Int64OneOf(REDIRECT_STATUS_CODES.to_vec()))
                .with_description(
                    "The HTTP status code to use when serving as a redirect. One of 301, 302, 307 or 308.",
                ),
        )
        .with_attribute(
            "git_branch",
            Attribute::optional_string()
                .with_description("Git branch to link to the project domain. Deployments from this git branch will be assigned the domain name."),
        )
}

fn remote(err: ClientError, what: String) -> ProviderError {
    ProviderError::Remote(format!("{}, unexpected error: {}", what, err))
}

/// Attach the planned domain to its project.
pub async fn create(client: &Client, planned_state: Value) -> Result<Value, ProviderError> {
    let plan: ProjectDomain = serde_json::from_value(planned_state)?;
    plan.check_redirect_status_code()?;
    let team_id = client.effective_team_id(plan.team_id.as_deref());

    if let Err(err) = client.get_project(&plan.project_id, team_id).await {
        if err.is_not_found() {
            return Err(ProviderError::NotFound(
                "Could not find project, please make sure both the project_id and team_id match the project and team you wish to deploy to.".to_string(),
            ));
        }
        return Err(remote(
            err,
            format!("Could not read project {}", plan.project_id),
        ));
    }

    let out = client
        .create_project_domain(&plan.project_id, team_id, &plan.to_create_request())
        .await
        .map_err(|e| {
            remote(
                e,
                format!(
                    "Could not add domain {} to project {}",
                    plan.domain, plan.project_id
                ),
            )
        })?;

    let result = ProjectDomain::from_response(out, team_id);
    trace!(
        project_id = %result.project_id,
        domain = %result.domain,
        team_id = result.team_id.as_deref().unwrap_or_default(),
        "added domain to project"
    );
    Ok(serde_json::to_value(result)?)
}

/// Refresh state from the API. `None` means the domain no longer exists.
pub async fn read(client: &Client, current_state: Value) -> Result<Option<Value>, ProviderError> {
    let state: ProjectDomain = serde_json::from_value(current_state)?;
    let team_id = client.effective_team_id(state.team_id.as_deref());

    let out = match client
        .get_project_domain(&state.project_id, &state.domain, team_id)
        .await
    {
        Ok(out) => out,
        Err(err) if err.is_not_found() => {
            trace!(
                project_id = %state.project_id,
                domain = %state.domain,
                "project domain no longer exists"
            );
            return Ok(None);
        }
        Err(err) => {
            return Err(remote(
                err,
                format!(
                    "Could not get domain {} for project {}",
                    state.domain, state.project_id
                ),
            ))
        }
    };

    let result = ProjectDomain::from_response(out, team_id);
    trace!(
        project_id = %result.project_id,
        domain = %result.domain,
        team_id = result.team_id.as_deref().unwrap_or_default(),
        "read project domain"
    );
    Ok(Some(serde_json::to_value(result)?))
}

/// Apply the planned redirect and git branch settings.
pub async fn update(
    client: &Client,
    _prior_state: Value,
    planned_state: Value,
) -> Result<Value, ProviderError> {
    let plan: ProjectDomain = serde_json::from_value(planned_state)?;
    plan.check_redirect_status_code()?;
    let team_id = client.effective_team_id(plan.team_id.as_deref());

    let out = client
        .update_project_domain(
            &plan.project_id,
            &plan.domain,
            team_id,
            &plan.to_update_request(),
        )
        .await
        .map_err(|e| {
            remote(
                e,
                format!(
                    "Could not update domain {} for project {}",
                    plan.domain, plan.project_id
                ),
            )
        })?;

    let result = ProjectDomain::from_response(out, team_id);
    trace!(
        project_id = %result.project_id,
        domain = %result.domain,
        team_id = result.team_id.as_deref().unwrap_or_default(),
        "updated project domain"
    );
    Ok(serde_json::to_value(result)?)
}

/// Detach the domain. Succeeds if it is already gone.
pub async fn delete(client: &Client, current_state: Value) -> Result<(), ProviderError> {
    let state: ProjectDomain = serde_json::from_value(current_state)?;
    let team_id = client.effective_team_id(state.team_id.as_deref());

    match client
        .delete_project_domain(&state.project_id, &state.domain, team_id)
        .await
    {
        Ok(()) => {
            trace!(
                project_id = %state.project_id,
                domain = %state.domain,
                team_id = team_id.unwrap_or_default(),
                "deleted project domain"
            );
            Ok(())
        }
        Err(err) if err.is_not_found() => {
            trace!(
                project_id = %state.project_id,
                domain = %state.domain,
                team_id = team_id.unwrap_or_default(),
                "project domain already removed"
            );
            Ok(())
        }
        Err(err) => Err(remote(
            err,
            format!(
                "Could not delete domain {} for project {}",
                state.domain, state.project_id
            ),
        )),
    }
}

/// Load an existing project domain by its import identifier.
pub async fn import(client: &Client, id: &str) -> Result<Value, ProviderError> {
    let ImportId {
        team_id,
        project_id,
        domain,
    } = parse_import_id(id)?;
    let team_id = client.effective_team_id(team_id.as_deref());

    let out = client
        .get_project_domain(&project_id, &domain, team_id)
        .await
        .map_err(|err| {
            let what = format!("Could not get domain {} for project {}", domain, project_id);
            if err.is_not_found() {
                ProviderError::NotFound(format!("{}, unexpected error: {}", what, err))
            } else {
                remote(err, what)
            }
        })?;

    let result = ProjectDomain::from_response(out, team_id);
    trace!(
        project_id = %result.project_id,
        domain = %result.domain,
        team_id = result.team_id.as_deref().unwrap_or_default(),
        "imported project domain"
    );
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> Client {
        Client::new("token")
            .unwrap()
            .with_base_url(&server.base_url())
            .unwrap()
    }

    fn planned() -> Value {
        json!({
            "project_id": "prj_1",
            "team_id": null,
            "id": null,
            "domain": "example.com",
            "redirect": null,
            "redirect_status_code": null,
            "git_branch": null
        })
    }

    fn domain_body() -> Value {
        json!({"name": "example.com", "projectId": "prj_1", "verified": true})
    }

    #[test]
    fn test_parse_import_id() {
        assert_eq!(
            parse_import_id("teamA/proj1/example.com").unwrap(),
            ImportId {
                team_id: Some("teamA".to_string()),
                project_id: "proj1".to_string(),
                domain: "example.com".to_string(),
            }
        );
        assert_eq!(
            parse_import_id("proj1/example.com").unwrap(),
            ImportId {
                team_id: None,
                project_id: "proj1".to_string(),
                domain: "example.com".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_import_id_rejects_bad_shapes() {
        for id in ["a/b/c/d", "example.com", "", "proj1/", "/example.com", "team//example.com"] {
            let err = parse_import_id(id).unwrap_err();
            assert!(matches!(err, ProviderError::Validation(_)), "{id}");
        }
    }

    #[test]
    fn test_schema_rejects_redirect_status_code() {
        let diagnostics = validate(
            &schema(),
            &json!({"project_id": "prj_1", "domain": "example.com", "redirect_status_code": 303}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("redirect_status_code".to_string())
        );

        for code in REDIRECT_STATUS_CODES {
            let config = json!({
                "project_id": "prj_1",
                "domain": "example.com",
                "redirect": "www.example.com",
                "redirect_status_code": code
            });
            assert!(validate(&schema(), &config).is_empty());
        }
    }

    #[tokio::test]
    async fn test_create() {
        let server = MockServer::start_async().await;
        let project = server
            .mock_async(|when, then| {
                when.method(GET).path("/v9/projects/prj_1");
                then.status(200).json_body(json!({"id": "prj_1", "name": "web"}));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v10/projects/prj_1/domains")
                    .json_body(json!({"name": "example.com"}));
                then.status(200).json_body(domain_body());
            })
            .await;

        let state = super::create(&client(&server), planned()).await.unwrap();

        project.assert_async().await;
        create.assert_async().await;
        assert_eq!(state["id"], "example.com");
        assert_eq!(state["domain"], "example.com");
        assert_eq!(state["project_id"], "prj_1");
        assert_eq!(state["team_id"], Value::Null);
        assert_eq!(state["redirect"], Value::Null);
    }

    #[tokio::test]
    async fn test_create_uses_default_team() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v9/projects/prj_1")
                    .query_param("teamId", "team_1");
                then.status(200).json_body(json!({"id": "prj_1", "name": "web"}));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v10/projects/prj_1/domains")
                    .query_param("teamId", "team_1");
                then.status(200).json_body(domain_body());
            })
            .await;

        let client = client(&server).with_team_id(Some("team_1".to_string()));
        let state = super::create(&client, planned()).await.unwrap();

        create.assert_async().await;
        assert_eq!(state["team_id"], "team_1");
    }

    #[tokio::test]
    async fn test_create_missing_project() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v9/projects/prj_1");
                then.status(404).json_body(json!({
                    "error": {"code": "not_found", "message": "Project not found"}
                }));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/v10/projects/prj_1/domains");
                then.status(200).json_body(domain_body());
            })
            .await;

        let err = super::create(&client(&server), planned())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(err.message().contains("Could not find project"));
        assert_eq!(create.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_create_project_lookup_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v9/projects/prj_1");
                then.status(403).json_body(json!({
                    "error": {"code": "forbidden", "message": "Not authorized"}
                }));
            })
            .await;

        let err = super::create(&client(&server), planned())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Remote(_)));
        assert!(err.message().contains("Not authorized"));
    }

    #[tokio::test]
    async fn test_create_rejects_status_code_before_any_call() {
        let server = MockServer::start_async().await;
        let any = server
            .mock_async(|when, then| {
                when.path_contains("/v");
                then.status(200).json_body(json!({}));
            })
            .await;

        let mut plan = planned();
        plan["redirect"] = json!("www.example.com");
        plan["redirect_status_code"] = json!(303);

        let err = super::create(&client(&server), plan).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert_eq!(any.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_read_missing_domain() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v9/projects/prj_1/domains/example.com");
                then.status(404).json_body(json!({
                    "error": {"code": "not_found", "message": "Domain not found"}
                }));
            })
            .await;

        let mut state = planned();
        state["id"] = json!("example.com");
        let out = super::read(&client(&server), state).await.unwrap();
        assert_eq!(out, None);
    }

    #[tokio::test]
    async fn test_read_remote_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v9/projects/prj_1/domains/example.com");
                then.status(500).body("oops");
            })
            .await;

        let err = super::read(&client(&server), planned()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Remote(_)));
        assert!(err
            .message()
            .starts_with("Could not get domain example.com for project prj_1"));
    }

    #[tokio::test]
    async fn test_update_is_full_replace() {
        let server = MockServer::start_async().await;
        let update = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::PATCH)
                    .path("/v9/projects/prj_1/domains/example.com")
                    .json_body(json!({
                        "gitBranch": null,
                        "redirect": "www.example.com",
                        "redirectStatusCode": 308
                    }));
                then.status(200).json_body(json!({
                    "name": "example.com",
                    "projectId": "prj_1",
                    "redirect": "www.example.com",
                    "redirectStatusCode": 308
                }));
            })
            .await;

        let mut plan = planned();
        plan["id"] = json!("example.com");
        plan["redirect"] = json!("www.example.com");
        plan["redirect_status_code"] = json!(308);

        let first = super::update(&client(&server), planned(), plan.clone())
            .await
            .unwrap();
        let second = super::update(&client(&server), planned(), plan)
            .await
            .unwrap();

        assert_eq!(update.hits_async().await, 2);
        assert_eq!(first, second);
        assert_eq!(first["redirect_status_code"], 308);
    }

    #[tokio::test]
    async fn test_delete_missing_domain_succeeds() {
        let server = MockServer::start_async().await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/v9/projects/prj_1/domains/example.com");
                then.status(404).json_body(json!({
                    "error": {"code": "not_found", "message": "Domain not found"}
                }));
            })
            .await;

        super::delete(&client(&server), planned()).await.unwrap();
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_remote_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/v9/projects/prj_1/domains/example.com");
                then.status(500).body("oops");
            })
            .await;

        let err = super::delete(&client(&server), planned())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Remote(_)));
    }

    #[tokio::test]
    async fn test_import_with_team() {
        let server = MockServer::start_async().await;
        let get = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v9/projects/prj_1/domains/example.com")
                    .query_param("teamId", "team_1");
                then.status(200).json_body(json!({
                    "name": "example.com",
                    "projectId": "prj_1",
                    "gitBranch": "main"
                }));
            })
            .await;

        let state = super::import(&client(&server), "team_1/prj_1/example.com")
            .await
            .unwrap();

        get.assert_async().await;
        assert_eq!(state["team_id"], "team_1");
        assert_eq!(state["git_branch"], "main");
        assert_eq!(state["id"], "example.com");
    }

    #[tokio::test]
    async fn test_import_missing_domain_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v9/projects/prj_1/domains/example.com");
                then.status(404).json_body(json!({
                    "error": {"code": "not_found", "message": "Domain not found"}
                }));
            })
            .await;

        let err = super::import(&client(&server), "prj_1/example.com")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_import_bad_id_makes_no_call() {
        let server = MockServer::start_async().await;
        let any = server
            .mock_async(|when, then| {
                when.path_contains("/v");
                then.status(200).json_body(json!({}));
            })
            .await;

        let err = super::import(&client(&server), "a/b/c/d").await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert_eq!(any.hits_async().await, 0);
    }
}

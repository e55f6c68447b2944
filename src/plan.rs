//! Plan computation for schema-described resources.
//!
//! Given the prior state and the new configuration, [`plan_resource`] works out
//! the planned state, which attributes change, and whether the change forces
//! the resource to be replaced. Unknown values (computed attributes the
//! provider fills in during apply) are planned as `null`.

use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::schema::Schema;
use crate::types::{AttributeChange, PlanResult};

/// Plan a create (`prior_state == None`), update, or destroy (`config == null`).
pub fn plan_resource(
    schema: &Schema,
    prior_state: Option<&Value>,
    config: &Value,
) -> Result<PlanResult, ProviderError> {
    let prior = match prior_state {
        Some(Value::Null) | None => None,
        Some(Value::Object(map)) => Some(map),
        Some(other) => {
            return Err(ProviderError::Validation(format!(
                "prior state must be an object, got {}",
                other
            )))
        }
    };

    let config = match config {
        Value::Null => return Ok(plan_destroy(schema, prior)),
        Value::Object(map) => map,
        other => {
            return Err(ProviderError::Validation(format!(
                "configuration must be an object, got {}",
                other
            )))
        }
    };

    // Computed-only attributes are owned by the provider.
    let config: Map<String, Value> = config
        .iter()
        .filter(|(name, _)| {
            !schema
                .block
                .attributes
                .get(*name)
                .is_some_and(|attr| attr.flags.is_computed_only())
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    let config = &config;

    let mut names: Vec<&String> = schema.block.attributes.keys().collect();
    names.sort();

    let mut planned = Map::new();
    for name in &names {
        let attr = &schema.block.attributes[*name];
        let configured = non_null(config.get(*name));
        let value = match (configured, prior) {
            (Some(v), _) => v.clone(),
            (None, Some(prior)) if attr.flags.computed && attr.use_state_for_unknown => {
                prior.get(*name).cloned().unwrap_or(Value::Null)
            }
            (None, _) => Value::Null,
        };
        planned.insert((*name).clone(), value);
    }

    let Some(prior) = prior else {
        let changes = names
            .iter()
            .filter_map(|name| {
                non_null(planned.get(*name)).map(|v| AttributeChange::added(*name, v.clone()))
            })
            .collect();
        return Ok(PlanResult::with_changes(Value::Object(planned), changes, false));
    };

    let mut changes = Vec::new();
    let mut requires_replace = false;
    for name in &names {
        let attr = &schema.block.attributes[*name];
        let before = non_null(prior.get(*name));
        let after = non_null(planned.get(*name));
        let unknown = attr.flags.computed && after.is_none() && config_unset(config, name);
        if before == after || unknown {
            continue;
        }
        requires_replace |= attr.force_new;
        changes.push(AttributeChange::new(*name, before.cloned(), after.cloned()));
    }

    if requires_replace {
        // The replacement is a new remote object; nothing carries over.
        for name in &names {
            let attr = &schema.block.attributes[*name];
            if attr.flags.computed && config_unset(config, name) {
                planned.insert((*name).clone(), Value::Null);
            }
        }
    }

    Ok(PlanResult::with_changes(
        Value::Object(planned),
        changes,
        requires_replace,
    ))
}

fn plan_destroy(schema: &Schema, prior: Option<&Map<String, Value>>) -> PlanResult {
    let Some(prior) = prior else {
        return PlanResult::no_change(Value::Null);
    };

    let mut names: Vec<&String> = schema.block.attributes.keys().collect();
    names.sort();
    let changes = names
        .into_iter()
        .filter_map(|name| {
            non_null(prior.get(name)).map(|v| AttributeChange::removed(name.as_str(), v.clone()))
        })
        .collect();
    PlanResult::with_changes(Value::Null, changes, false)
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn config_unset(config: &Map<String, Value>, name: &str) -> bool {
    non_null(config.get(name)).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("project_id", Attribute::required_string().with_force_new())
            .with_attribute(
                "team_id",
                Attribute::optional_computed_string()
                    .with_force_new()
                    .with_use_state_for_unknown(),
            )
            .with_attribute(
                "id",
                Attribute::computed_string().with_use_state_for_unknown(),
            )
            .with_attribute("domain", Attribute::required_string().with_force_new())
            .with_attribute("redirect", Attribute::optional_string())
    }

    fn prior() -> Value {
        json!({
            "project_id": "prj_1",
            "team_id": "team_1",
            "id": "example.com",
            "domain": "example.com",
            "redirect": null
        })
    }

    #[test]
    fn test_plan_create() {
        let plan = plan_resource(
            &schema(),
            None,
            &json!({"project_id": "prj_1", "domain": "example.com"}),
        )
        .unwrap();

        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["id"], Value::Null);
        assert_eq!(plan.planned_state["team_id"], Value::Null);
        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["domain", "project_id"]);
    }

    #[test]
    fn test_plan_no_changes_keeps_computed_state() {
        let plan = plan_resource(
            &schema(),
            Some(&prior()),
            &json!({"project_id": "prj_1", "domain": "example.com"}),
        )
        .unwrap();

        assert!(plan.changes.is_empty());
        assert_eq!(plan.planned_state["id"], "example.com");
        assert_eq!(plan.planned_state["team_id"], "team_1");
    }

    #[test]
    fn test_plan_in_place_update() {
        let plan = plan_resource(
            &schema(),
            Some(&prior()),
            &json!({"project_id": "prj_1", "domain": "example.com", "redirect": "www.example.com"}),
        )
        .unwrap();

        assert!(!plan.requires_replace);
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "redirect");
        assert_eq!(plan.changes[0].before, None);
        assert_eq!(plan.planned_state["id"], "example.com");
    }

    #[test]
    fn test_plan_force_new_replaces() {
        let plan = plan_resource(
            &schema(),
            Some(&prior()),
            &json!({"project_id": "prj_1", "domain": "other.com"}),
        )
        .unwrap();

        assert!(plan.requires_replace);
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "domain");
        assert_eq!(plan.planned_state["id"], Value::Null);
        assert_eq!(plan.planned_state["team_id"], Value::Null);
    }

    #[test]
    fn test_plan_explicit_team_change_replaces() {
        let plan = plan_resource(
            &schema(),
            Some(&prior()),
            &json!({"project_id": "prj_1", "team_id": "team_2", "domain": "example.com"}),
        )
        .unwrap();

        assert!(plan.requires_replace);
        assert_eq!(plan.planned_state["team_id"], "team_2");
    }

    #[test]
    fn test_plan_ignores_configured_computed_attribute() {
        let plan = plan_resource(
            &schema(),
            Some(&prior()),
            &json!({"project_id": "prj_1", "domain": "example.com", "id": "bogus"}),
        )
        .unwrap();

        assert!(plan.changes.is_empty());
        assert_eq!(plan.planned_state["id"], "example.com");

        let plan = plan_resource(
            &schema(),
            None,
            &json!({"project_id": "prj_1", "domain": "example.com", "id": "bogus"}),
        )
        .unwrap();
        assert_eq!(plan.planned_state["id"], Value::Null);
        assert!(plan.changes.iter().all(|c| c.path != "id"));
    }

    #[test]
    fn test_plan_destroy() {
        let plan = plan_resource(&schema(), Some(&prior()), &Value::Null).unwrap();
        assert_eq!(plan.planned_state, Value::Null);
        assert!(plan.changes.iter().all(|c| c.after.is_none()));
        assert_eq!(plan.changes.len(), 4);

        let plan = plan_resource(&schema(), None, &Value::Null).unwrap();
        assert!(plan.changes.is_empty());
    }

    #[test]
    fn test_plan_rejects_non_object_config() {
        let err = plan_resource(&schema(), None, &json!("example.com")).unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }
}

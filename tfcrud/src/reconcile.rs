//! Diffing desired configuration against known state
//!
//! The reconciler decides what an apply has to do (nothing, an in-place
//! update, or a replacement) and reports drift between two states. It never
//! talks to a backend.

use crate::schema::{ResourceSchema, ValidatedAttributes};
use crate::state::ResourceState;
use crate::types::{AttributePath, Dynamic};
use std::fmt;

/// What an apply must do to reach the desired configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    /// Nothing exists yet
    Create,
    /// Desired and known values agree
    NoOp,
    UpdateInPlace,
    /// A forces-recreate attribute changed
    Replace,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlanAction::Create => "create",
            PlanAction::NoOp => "no-op",
            PlanAction::UpdateInPlace => "update",
            PlanAction::Replace => "replace",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub action: PlanAction,
    /// Configurable attributes whose desired value differs, in schema order
    pub changed: Vec<String>,
    /// The subset of `changed` that forces recreation
    pub requires_replace: Vec<AttributePath>,
}

/// Compare desired attributes with the known state
pub fn reconcile(
    schema: &ResourceSchema,
    prior: &ResourceState,
    desired: &ValidatedAttributes,
) -> Reconciliation {
    if !prior.is_created() {
        return Reconciliation {
            action: PlanAction::Create,
            changed: schema.configurable().map(|a| a.name.clone()).collect(),
            requires_replace: Vec::new(),
        };
    }

    let mut changed = Vec::new();
    let mut requires_replace = Vec::new();
    let updatable = schema.supports_update();

    for spec in schema.configurable() {
        let planned = desired.get(&spec.name);
        if values_equal(prior.get(&spec.name), planned) {
            continue;
        }
        changed.push(spec.name.clone());
        // an unknown value may turn out equal, so it only forces replacement
        // when there is no in-place update to fall back to
        if spec.forces_recreate && (!updatable || !planned.contains_unknown()) {
            requires_replace.push(spec.path());
        }
    }

    let action = if changed.is_empty() {
        PlanAction::NoOp
    } else if !requires_replace.is_empty() {
        PlanAction::Replace
    } else {
        PlanAction::UpdateInPlace
    };

    Reconciliation {
        action,
        changed,
        requires_replace,
    }
}

/// The state the host should expect after applying `reconciliation`
///
/// Configurable attributes take their desired value. Computed attributes
/// (and the id) become unknown whenever the server will assign them anew,
/// otherwise they carry over from `prior`.
pub fn planned_state(
    schema: &ResourceSchema,
    prior: &ResourceState,
    desired: &ValidatedAttributes,
    reconciliation: &Reconciliation,
) -> ResourceState {
    let fresh = matches!(
        reconciliation.action,
        PlanAction::Create | PlanAction::Replace
    );

    let mut planned = ResourceState {
        id: if fresh { None } else { prior.id.clone() },
        values: Default::default(),
    };

    for spec in &schema.attributes {
        let value = if spec.is_configurable() {
            desired.get(&spec.name).clone()
        } else if fresh {
            Dynamic::Unknown
        } else {
            prior.get(&spec.name).clone()
        };
        planned.values.insert(spec.name.clone(), value);
    }

    planned
}

/// An attribute whose server value moved away from the last known state
#[derive(Debug, Clone, PartialEq)]
pub struct Drift {
    pub attribute: String,
    pub before: Dynamic,
    pub after: Dynamic,
    pub sensitive: bool,
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sensitive {
            write!(f, "{}: (sensitive value changed)", self.attribute)
        } else {
            write!(f, "{}: {} -> {}", self.attribute, render(&self.before), render(&self.after))
        }
    }
}

fn render(value: &Dynamic) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.type_name().to_string())
}

/// Attributes whose values differ between `last_known` and `fresh`
pub fn detect_drift(
    schema: &ResourceSchema,
    last_known: &ResourceState,
    fresh: &ResourceState,
) -> Vec<Drift> {
    schema
        .attributes
        .iter()
        .filter(|spec| !values_equal(last_known.get(&spec.name), fresh.get(&spec.name)))
        .map(|spec| Drift {
            attribute: spec.name.clone(),
            before: last_known.get(&spec.name).clone(),
            after: fresh.get(&spec.name).clone(),
            sensitive: spec.sensitive,
        })
        .collect()
}

/// Structural equality where unknown never equals anything
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Int(a), Dynamic::Int(b)) => a == b,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeBuilder, SchemaBuilder};
    use crate::types::DynamicValue;
    use std::collections::HashMap;

    fn user_schema() -> ResourceSchema {
        SchemaBuilder::new("guardrail_user", "/v1/users")
            .attribute(AttributeBuilder::string("email").required().forces_recreate())
            .attribute(AttributeBuilder::string("display_name").optional())
            .attribute(AttributeBuilder::string("password").optional().sensitive())
            .attribute(AttributeBuilder::string("created_at").computed())
            .build()
            .unwrap()
    }

    fn existing() -> ResourceState {
        let mut state = ResourceState::with_id("u-1");
        state.set("email", "ana@example.com");
        state.set("display_name", "Ana");
        state.set("created_at", "2026-01-01");
        state
    }

    fn desired(schema: &ResourceSchema, pairs: &[(&str, &str)]) -> ValidatedAttributes {
        schema
            .validate(&DynamicValue::from_pairs(pairs.iter().copied()))
            .unwrap()
    }

    #[test]
    fn nothing_known_means_create() {
        let schema = user_schema();
        let attrs = desired(&schema, &[("email", "ana@example.com")]);

        let rec = reconcile(&schema, &ResourceState::new(), &attrs);
        assert_eq!(rec.action, PlanAction::Create);
    }

    #[test]
    fn identical_config_is_a_no_op() {
        let schema = user_schema();
        let attrs = desired(
            &schema,
            &[("email", "ana@example.com"), ("display_name", "Ana")],
        );

        let rec = reconcile(&schema, &existing(), &attrs);
        assert_eq!(rec.action, PlanAction::NoOp);
        assert!(rec.changed.is_empty());
    }

    #[test]
    fn mutable_change_updates_in_place() {
        let schema = user_schema();
        let attrs = desired(
            &schema,
            &[("email", "ana@example.com"), ("display_name", "Ana B")],
        );

        let rec = reconcile(&schema, &existing(), &attrs);
        assert_eq!(rec.action, PlanAction::UpdateInPlace);
        assert_eq!(rec.changed, vec!["display_name".to_string()]);
        assert!(rec.requires_replace.is_empty());
    }

    #[test]
    fn forced_attribute_change_replaces() {
        let schema = user_schema();
        let attrs = desired(
            &schema,
            &[("email", "ana@corp.example"), ("display_name", "Ana")],
        );

        let rec = reconcile(&schema, &existing(), &attrs);
        assert_eq!(rec.action, PlanAction::Replace);
        assert_eq!(rec.requires_replace, vec![AttributePath::new("email")]);
    }

    #[test]
    fn unknown_forced_value_does_not_replace_yet() {
        let schema = user_schema();
        let attrs = schema
            .validate(&DynamicValue::from_pairs([
                ("email", Dynamic::Unknown),
                ("display_name", Dynamic::from("Ana")),
            ]))
            .unwrap();

        let rec = reconcile(&schema, &existing(), &attrs);
        assert_eq!(rec.action, PlanAction::UpdateInPlace);
        assert!(rec.requires_replace.is_empty());
    }

    #[test]
    fn removing_an_optional_value_is_a_change() {
        let schema = user_schema();
        let attrs = desired(&schema, &[("email", "ana@example.com")]);

        let rec = reconcile(&schema, &existing(), &attrs);
        assert_eq!(rec.changed, vec!["display_name".to_string()]);
    }

    #[test]
    fn planned_create_marks_computed_unknown() {
        let schema = user_schema();
        let attrs = desired(&schema, &[("email", "ana@example.com")]);
        let prior = ResourceState::new();
        let rec = reconcile(&schema, &prior, &attrs);

        let planned = planned_state(&schema, &prior, &attrs, &rec);
        assert!(planned.id.is_none());
        assert_eq!(planned.get("created_at"), &Dynamic::Unknown);
        assert_eq!(planned.get("email"), &Dynamic::from("ana@example.com"));
    }

    #[test]
    fn planned_update_keeps_computed_from_state() {
        let schema = user_schema();
        let attrs = desired(
            &schema,
            &[("email", "ana@example.com"), ("display_name", "Ana B")],
        );
        let rec = reconcile(&schema, &existing(), &attrs);

        let planned = planned_state(&schema, &existing(), &attrs, &rec);
        assert_eq!(planned.id.as_deref(), Some("u-1"));
        assert_eq!(planned.get("created_at"), &Dynamic::from("2026-01-01"));
    }

    #[test]
    fn drift_lists_changed_attributes() {
        let schema = user_schema();
        let mut fresh = existing();
        fresh.set("display_name", "Changed Out Of Band");

        let drift = detect_drift(&schema, &existing(), &fresh);
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].attribute, "display_name");
        assert_eq!(
            drift[0].to_string(),
            r#"display_name: "Ana" -> "Changed Out Of Band""#
        );
    }

    #[test]
    fn sensitive_drift_hides_values() {
        let schema = user_schema();
        let mut last = existing();
        last.set("password", "old-secret");
        let mut fresh = existing();
        fresh.set("password", "new-secret");

        let drift = detect_drift(&schema, &last, &fresh);
        let rendered = drift[0].to_string();
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn values_equal_handles_all_types() {
        assert!(values_equal(&Dynamic::Int(42), &Dynamic::Int(42)));
        assert!(!values_equal(&Dynamic::Int(42), &Dynamic::Int(43)));
        assert!(values_equal(&Dynamic::Bool(true), &Dynamic::Bool(true)));
        assert!(!values_equal(&Dynamic::Null, &Dynamic::from("")));
        assert!(!values_equal(&Dynamic::Unknown, &Dynamic::Unknown));

        let list1 = Dynamic::List(vec![Dynamic::from("a"), Dynamic::Int(1)]);
        let list2 = Dynamic::List(vec![Dynamic::from("a"), Dynamic::Int(1)]);
        let list3 = Dynamic::List(vec![Dynamic::from("b"), Dynamic::Int(1)]);
        assert!(values_equal(&list1, &list2));
        assert!(!values_equal(&list1, &list3));

        let mut map1 = HashMap::new();
        map1.insert("key".to_string(), Dynamic::from("value"));
        let mut map2 = map1.clone();
        assert!(values_equal(
            &Dynamic::Map(map1.clone()),
            &Dynamic::Map(map2.clone())
        ));
        map2.insert("key".to_string(), Dynamic::from("different"));
        assert!(!values_equal(&Dynamic::Map(map1), &Dynamic::Map(map2)));
    }
}

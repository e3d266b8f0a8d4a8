//! Translation of validated attributes into HTTP requests
//!
//! Only configurable attributes are ever sent. Values are converted by
//! walking the declared [`AttributeType`] alongside the value, so the JSON
//! written for an attribute always has the schema's shape.

use crate::error::MappingError;
use crate::schema::{AttributeType, ResourceSchema, UpdateMethod, ValidatedAttributes};
use crate::types::{AttributePath, Dynamic};
use reqwest::Method;
use serde_json::{Map, Number, Value};
use std::fmt;

/// The four CRUD operations a resource maps onto its endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "Create",
            Operation::Read => "Read",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
        };
        f.write_str(name)
    }
}

/// A request ready to hand to a backend. `path` is relative to the
/// backend's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub operation: Operation,
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Build the request for `operation`
///
/// `id` is the external identifier and is required for everything but
/// Create. On Create, null optional attributes are left out of the body;
/// on Update they are sent as explicit JSON `null` so the server clears them.
pub fn build(
    operation: Operation,
    schema: &ResourceSchema,
    id: Option<&str>,
    attributes: &ValidatedAttributes,
) -> Result<ApiRequest, MappingError> {
    let endpoint = &schema.endpoint;
    let item_path = || {
        id.map(|id| endpoint.item_path(id))
            .ok_or_else(|| MappingError::NoExternalId {
                operation: operation.to_string(),
            })
    };

    let request = match operation {
        Operation::Create => ApiRequest {
            operation,
            method: Method::POST,
            path: endpoint.collection_path().to_string(),
            body: Some(body(schema, attributes, false)?),
        },
        Operation::Read => ApiRequest {
            operation,
            method: Method::GET,
            path: item_path()?,
            body: None,
        },
        Operation::Update => ApiRequest {
            operation,
            method: match endpoint.update_method {
                UpdateMethod::Patch => Method::PATCH,
                UpdateMethod::Put => Method::PUT,
            },
            path: item_path()?,
            body: Some(body(schema, attributes, true)?),
        },
        Operation::Delete => ApiRequest {
            operation,
            method: Method::DELETE,
            path: item_path()?,
            body: None,
        },
    };

    Ok(request)
}

fn body(
    schema: &ResourceSchema,
    attributes: &ValidatedAttributes,
    send_nulls: bool,
) -> Result<Value, MappingError> {
    let mut object = Map::new();

    for spec in schema.configurable() {
        let value = attributes.get(&spec.name);
        if value.is_null() {
            if send_nulls {
                object.insert(spec.wire_name().to_string(), Value::Null);
            }
            continue;
        }
        let json = to_json(&spec.r#type, value, &spec.path())?;
        object.insert(spec.wire_name().to_string(), json);
    }

    Ok(Value::Object(object))
}

/// Convert one value, guided by its declared type
pub(crate) fn to_json(
    kind: &AttributeType,
    value: &Dynamic,
    path: &AttributePath,
) -> Result<Value, MappingError> {
    match (kind, value) {
        (_, Dynamic::Unknown) => Err(MappingError::UnknownValue {
            attribute: path.clone(),
        }),
        (_, Dynamic::Null) => Ok(Value::Null),
        (AttributeType::String, Dynamic::String(s)) => Ok(Value::String(s.clone())),
        (AttributeType::Int, Dynamic::Int(n)) => Ok(Value::Number(Number::from(*n))),
        (AttributeType::Bool, Dynamic::Bool(b)) => Ok(Value::Bool(*b)),
        (AttributeType::List(element), Dynamic::List(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| to_json(element, item, &path.clone().index(idx as i64)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (AttributeType::Map(element), Dynamic::Map(entries)) => {
            let mut object = Map::new();
            for (key, item) in entries {
                object.insert(key.clone(), to_json(element, item, &path.clone().key(key))?);
            }
            Ok(Value::Object(object))
        }
        (expected, actual) => Err(MappingError::TypeMismatch {
            attribute: path.clone(),
            expected: expected.to_string(),
            actual: actual.type_name().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeBuilder, SchemaBuilder};
    use crate::types::DynamicValue;
    use serde_json::json;

    fn access_list_schema() -> ResourceSchema {
        SchemaBuilder::new("guardrail_access_list", "/v1/access-lists/")
            .attribute(AttributeBuilder::string("name").required())
            .attribute(AttributeBuilder::string("description").optional())
            .attribute(
                AttributeBuilder::new("entries", AttributeType::list(AttributeType::String))
                    .optional(),
            )
            .attribute(
                AttributeBuilder::string("access")
                    .required()
                    .wire_name("accessMode"),
            )
            .attribute(AttributeBuilder::string("created_at").computed())
            .build()
            .unwrap()
    }

    fn validated(schema: &ResourceSchema, config: DynamicValue) -> ValidatedAttributes {
        schema.validate(&config).unwrap()
    }

    #[test]
    fn create_posts_to_collection_and_omits_nulls() {
        let schema = access_list_schema();
        let attrs = validated(
            &schema,
            DynamicValue::from_pairs([("name", "office"), ("access", "allow")]),
        );

        let request = build(Operation::Create, &schema, None, &attrs).unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/v1/access-lists");
        assert_eq!(
            request.body,
            Some(json!({"name": "office", "accessMode": "allow"}))
        );
    }

    #[test]
    fn update_sends_explicit_nulls() {
        let schema = access_list_schema();
        let attrs = validated(
            &schema,
            DynamicValue::from_pairs([("name", "office"), ("access", "block")]),
        );

        let request = build(Operation::Update, &schema, Some("al-1"), &attrs).unwrap();

        assert_eq!(request.method, Method::PATCH);
        assert_eq!(request.path, "/v1/access-lists/al-1");
        assert_eq!(
            request.body,
            Some(json!({
                "name": "office",
                "description": null,
                "entries": null,
                "accessMode": "block"
            }))
        );
    }

    #[test]
    fn computed_attributes_are_never_sent() {
        let schema = access_list_schema();
        let attrs = validated(
            &schema,
            DynamicValue::from_pairs([("name", "office"), ("access", "allow")]),
        );

        let request = build(Operation::Update, &schema, Some("al-1"), &attrs).unwrap();
        let body = request.body.unwrap();
        assert!(body.get("created_at").is_none());
    }

    #[test]
    fn item_operations_require_an_id() {
        let schema = access_list_schema();
        let attrs = validated(
            &schema,
            DynamicValue::from_pairs([("name", "office"), ("access", "allow")]),
        );

        for op in [Operation::Read, Operation::Update, Operation::Delete] {
            let err = build(op, &schema, None, &attrs).unwrap_err();
            assert!(matches!(err, MappingError::NoExternalId { .. }), "{}", op);
        }
    }

    #[test]
    fn read_and_delete_have_no_body() {
        let schema = access_list_schema();
        let attrs = validated(
            &schema,
            DynamicValue::from_pairs([("name", "office"), ("access", "allow")]),
        );

        let read = build(Operation::Read, &schema, Some("al-1"), &attrs).unwrap();
        assert_eq!(read.method, Method::GET);
        assert!(read.body.is_none());

        let delete = build(Operation::Delete, &schema, Some("al-1"), &attrs).unwrap();
        assert_eq!(delete.method, Method::DELETE);
        assert!(delete.body.is_none());
    }

    #[test]
    fn ids_are_escaped_in_paths() {
        let schema = access_list_schema();
        let attrs = validated(
            &schema,
            DynamicValue::from_pairs([("name", "office"), ("access", "allow")]),
        );

        let request = build(Operation::Read, &schema, Some("team a/b"), &attrs).unwrap();
        assert_eq!(request.path, "/v1/access-lists/team%20a%2Fb");
    }

    #[test]
    fn unknown_values_cannot_be_sent() {
        let schema = access_list_schema();
        let attrs = validated(
            &schema,
            DynamicValue::from_pairs([
                ("name", Dynamic::Unknown),
                ("access", Dynamic::from("allow")),
            ]),
        );

        let err = build(Operation::Create, &schema, None, &attrs).unwrap_err();
        assert_eq!(
            err,
            MappingError::UnknownValue {
                attribute: AttributePath::new("name")
            }
        );
    }

    #[test]
    fn nested_values_follow_declared_type() {
        let kind = AttributeType::list(AttributeType::map(AttributeType::Int));
        let value = Dynamic::List(vec![Dynamic::Map(
            [("limit".to_string(), Dynamic::Int(10))].into_iter().collect(),
        )]);

        let json = to_json(&kind, &value, &AttributePath::new("limits")).unwrap();
        assert_eq!(json, json!([{"limit": 10}]));
    }

    #[test]
    fn mismatched_nested_value_reports_path() {
        let kind = AttributeType::list(AttributeType::Int);
        let value = Dynamic::List(vec![Dynamic::Int(1), Dynamic::from("two")]);

        let err = to_json(&kind, &value, &AttributePath::new("ports")).unwrap_err();
        assert_eq!(err.attribute().map(|p| p.to_string()), Some("ports[1]".to_string()));
    }

    #[test]
    fn put_schemas_update_with_put() {
        let schema = SchemaBuilder::new("guardrail_user", "/v1/users")
            .update_method(UpdateMethod::Put)
            .attribute(AttributeBuilder::string("email").required())
            .build()
            .unwrap();
        let attrs = validated(&schema, DynamicValue::from_pairs([("email", "a@b.io")]));

        let request = build(Operation::Update, &schema, Some("u-1"), &attrs).unwrap();
        assert_eq!(request.method, Method::PUT);
    }
}

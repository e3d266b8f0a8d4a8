//! Resource catalog. Each resource is a schema value; the engine in
//! `tfcrud` supplies all behaviour.

pub mod access_list;
pub mod api_key;
pub mod rate_limit_rule;
pub mod user;

use tfcrud::{ResourceSchema, SchemaError};

/// Every resource schema the provider serves
pub fn all() -> Result<Vec<ResourceSchema>, SchemaError> {
    Ok(vec![
        access_list::schema()?,
        api_key::schema()?,
        rate_limit_rule::schema()?,
        user::schema()?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfcrud::{Dynamic, DynamicValue, ValidationError};

    #[test]
    fn every_schema_builds() {
        let schemas = all().unwrap();
        assert_eq!(schemas.len(), 4);
        for schema in &schemas {
            assert!(schema.type_name.starts_with("guardrail_"));
        }
    }

    #[test]
    fn api_keys_cannot_be_updated_in_place() {
        assert!(!api_key::schema().unwrap().supports_update());
        assert!(user::schema().unwrap().supports_update());
    }

    #[test]
    fn access_list_rejects_unsupported_access() {
        let schema = access_list::schema().unwrap();
        let errors = schema
            .validate(&DynamicValue::from_pairs([
                ("name", "office"),
                ("access", "permit"),
            ]))
            .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("allow, block"));
    }

    #[test]
    fn rate_limit_threshold_is_bounded() {
        let schema = rate_limit_rule::schema().unwrap();
        let errors = schema
            .validate(&DynamicValue::from_pairs([
                ("zone_id", Dynamic::from("z-1")),
                ("name", Dynamic::from("login")),
                ("threshold", Dynamic::Int(0)),
                ("period_seconds", Dynamic::Int(60)),
                ("action", Dynamic::from("block")),
            ]))
            .unwrap_err();

        assert!(matches!(
            &errors[0],
            ValidationError::RuleViolation { attribute, .. } if attribute.to_string() == "threshold"
        ));
    }

    #[test]
    fn user_email_must_look_like_an_address() {
        let schema = user::schema().unwrap();
        let result = schema.validate(&DynamicValue::from_pairs([
            ("email", "not-an-email"),
            ("role", "viewer"),
        ]));
        assert!(result.is_err());
    }
}

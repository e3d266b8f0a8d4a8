//! Schema types and builders for tfcrud
//!
//! A [`ResourceSchema`] is plain data: the attributes of one resource type
//! plus the REST endpoint it lives behind. Every concrete resource is an
//! instance of this type rather than its own piece of code.

use crate::error::{SchemaError, ValidationError};
use crate::types::{AttributePath, Dynamic, DynamicValue};
use crate::validator::{Pattern, ValidationRule};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// AttributeType is the fixed kind of an attribute's values
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Int,
    Bool,
    List(Box<AttributeType>),
    Map(Box<AttributeType>),
}

impl AttributeType {
    pub fn list(element: AttributeType) -> Self {
        AttributeType::List(Box::new(element))
    }

    pub fn map(element: AttributeType) -> Self {
        AttributeType::Map(Box::new(element))
    }

    /// Whether `value` has this shape. Null and unknown fit any type.
    pub fn accepts(&self, value: &Dynamic) -> bool {
        let mut mismatches = Vec::new();
        self.collect_mismatches(value, &AttributePath::root(), &mut mismatches);
        mismatches.is_empty()
    }

    /// Walk `value` and record every position whose shape disagrees
    pub(crate) fn collect_mismatches(
        &self,
        value: &Dynamic,
        path: &AttributePath,
        out: &mut Vec<(AttributePath, String, String)>,
    ) {
        match (self, value) {
            (_, Dynamic::Null) | (_, Dynamic::Unknown) => {}
            (AttributeType::String, Dynamic::String(_))
            | (AttributeType::Int, Dynamic::Int(_))
            | (AttributeType::Bool, Dynamic::Bool(_)) => {}
            (AttributeType::List(element), Dynamic::List(items)) => {
                for (idx, item) in items.iter().enumerate() {
                    element.collect_mismatches(item, &path.clone().index(idx as i64), out);
                }
            }
            (AttributeType::Map(element), Dynamic::Map(entries)) => {
                for (key, item) in entries {
                    element.collect_mismatches(item, &path.clone().key(key), out);
                }
            }
            (expected, actual) => out.push((
                path.clone(),
                expected.to_string(),
                actual.type_name().to_string(),
            )),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::String => write!(f, "string"),
            AttributeType::Int => write!(f, "int"),
            AttributeType::Bool => write!(f, "bool"),
            AttributeType::List(element) => write!(f, "list({})", element),
            AttributeType::Map(element) => write!(f, "map({})", element),
        }
    }
}

/// Who supplies an attribute's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeMode {
    /// Must be set in configuration
    Required,
    /// May be set in configuration
    Optional,
    /// Only ever set from server responses
    Computed,
}

/// AttributeSpec describes one field of a resource
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub mode: AttributeMode,
    /// Changing the value destroys and recreates the resource
    pub forces_recreate: bool,
    /// Never logged, kept from prior state when the server does not echo it
    pub sensitive: bool,
    /// JSON key on the wire when it differs from `name`
    pub wire_name: Option<String>,
    pub validation: Option<ValidationRule>,
}

impl AttributeSpec {
    pub fn is_required(&self) -> bool {
        self.mode == AttributeMode::Required
    }

    pub fn is_computed(&self) -> bool {
        self.mode == AttributeMode::Computed
    }

    /// Required or optional, i.e. sent to the server
    pub fn is_configurable(&self) -> bool {
        !self.is_computed()
    }

    pub fn wire_name(&self) -> &str {
        self.wire_name.as_deref().unwrap_or(&self.name)
    }

    pub fn path(&self) -> AttributePath {
        AttributePath::new(&self.name)
    }
}

/// Verb used for in-place updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMethod {
    Patch,
    Put,
}

/// REST endpoint template for one resource type
///
/// Create posts to `base_path`; read, update and delete address
/// `{base_path}/{id}`. `id_path` and attribute lookups are resolved inside
/// `envelope` when the API wraps its payloads (e.g. `{"result": {...}}`).
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub base_path: String,
    pub update_method: UpdateMethod,
    pub id_path: Vec<String>,
    pub envelope: Option<String>,
}

impl Endpoint {
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: base_path.trim_end_matches('/').to_string(),
            update_method: UpdateMethod::Patch,
            id_path: vec!["id".to_string()],
            envelope: None,
        }
    }

    pub fn collection_path(&self) -> &str {
        &self.base_path
    }

    pub fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.base_path, urlencoding::encode(id))
    }

    pub fn id_path_display(&self) -> String {
        self.id_path.join(".")
    }
}

/// ResourceSchema is returned by resources and data sources
/// Version is used by the host for state migration
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub type_name: String,
    pub version: i64,
    pub description: String,
    pub attributes: Vec<AttributeSpec>,
    pub endpoint: Endpoint,
}

impl ResourceSchema {
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn configurable(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.attributes.iter().filter(|a| a.is_configurable())
    }

    pub fn computed(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.attributes.iter().filter(|a| a.is_computed())
    }

    /// False when no configurable attribute can change without recreation
    pub fn supports_update(&self) -> bool {
        self.configurable().any(|a| !a.forces_recreate)
    }

    /// Check `config` against every attribute, collecting all problems
    pub fn validate(
        &self,
        config: &DynamicValue,
    ) -> Result<ValidatedAttributes, Vec<ValidationError>> {
        let empty = HashMap::new();
        let provided = match &config.value {
            Dynamic::Map(m) => m,
            Dynamic::Null => &empty,
            other => {
                return Err(vec![ValidationError::TypeMismatch {
                    attribute: AttributePath::root(),
                    expected: "object".to_string(),
                    actual: other.type_name().to_string(),
                }])
            }
        };

        let mut errors = Vec::new();
        let mut values = HashMap::new();

        for spec in &self.attributes {
            let value = provided.get(&spec.name).unwrap_or(&NULL);

            if spec.is_computed() {
                if !value.is_null() && !value.is_unknown() {
                    errors.push(ValidationError::ComputedSet {
                        attribute: spec.path(),
                    });
                }
                continue;
            }

            if value.is_null() {
                if spec.is_required() {
                    errors.push(ValidationError::MissingRequired {
                        attribute: spec.path(),
                    });
                }
                values.insert(spec.name.clone(), Dynamic::Null);
                continue;
            }

            let mut mismatches = Vec::new();
            spec.r#type
                .collect_mismatches(value, &spec.path(), &mut mismatches);
            if !mismatches.is_empty() {
                errors.extend(mismatches.into_iter().map(|(attribute, expected, actual)| {
                    ValidationError::TypeMismatch {
                        attribute,
                        expected,
                        actual,
                    }
                }));
                continue;
            }

            if let Some(rule) = &spec.validation {
                if let Err(message) = rule.check(value) {
                    errors.push(ValidationError::RuleViolation {
                        attribute: spec.path(),
                        message,
                    });
                }
            }

            values.insert(spec.name.clone(), value.clone());
        }

        let mut unknown: Vec<&String> = provided
            .keys()
            .filter(|k| k.as_str() != "id" && self.attribute(k).is_none())
            .collect();
        unknown.sort();
        errors.extend(unknown.into_iter().map(|k| ValidationError::UnknownAttribute {
            attribute: AttributePath::new(k),
        }));

        if errors.is_empty() {
            Ok(ValidatedAttributes { values })
        } else {
            Err(errors)
        }
    }
}

static NULL: Dynamic = Dynamic::Null;

/// Configurable attribute values that passed [`ResourceSchema::validate`]
/// Absent optional attributes are present as `Null`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidatedAttributes {
    values: HashMap<String, Dynamic>,
}

impl ValidatedAttributes {
    pub fn get(&self, name: &str) -> &Dynamic {
        self.values.get(name).unwrap_or(&NULL)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Dynamic)> {
        self.values.iter()
    }

    pub fn into_values(self) -> HashMap<String, Dynamic> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// AttributeBuilder provides fluent API for building attributes
pub struct AttributeBuilder {
    attribute: AttributeSpec,
    mode: Option<AttributeMode>,
    error: Option<SchemaError>,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: AttributeSpec {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                mode: AttributeMode::Optional,
                forces_recreate: false,
                sensitive: false,
                wire_name: None,
                validation: None,
            },
            mode: None,
            error: None,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn int(name: &str) -> Self {
        Self::new(name, AttributeType::Int)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, AttributeType::Bool)
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.mode = Some(AttributeMode::Required);
        self
    }

    pub fn optional(mut self) -> Self {
        self.mode = Some(AttributeMode::Optional);
        self
    }

    pub fn computed(mut self) -> Self {
        self.mode = Some(AttributeMode::Computed);
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn forces_recreate(mut self) -> Self {
        self.attribute.forces_recreate = true;
        self
    }

    pub fn wire_name(mut self, name: &str) -> Self {
        self.attribute.wire_name = Some(name.to_string());
        self
    }

    pub fn validation(mut self, rule: ValidationRule) -> Self {
        self.attribute.validation = Some(rule);
        self
    }

    /// Full-match regex; compile errors surface from [`SchemaBuilder::build`]
    pub fn regex(mut self, pattern: &str) -> Self {
        match Pattern::new(pattern) {
            Ok(p) => self.attribute.validation = Some(ValidationRule::Regex(p)),
            Err(e) => {
                self.error = Some(SchemaError::InvalidRegex {
                    attribute: self.attribute.name.clone(),
                    message: e.to_string(),
                })
            }
        }
        self
    }

    pub fn one_of<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validation(ValidationRule::one_of(values))
    }

    pub fn range(self, min: i64, max: i64) -> Self {
        self.validation(ValidationRule::range(min, max))
    }

    pub fn min_length(self, n: usize) -> Self {
        self.validation(ValidationRule::min_length(n))
    }

    fn build(self) -> Result<AttributeSpec, SchemaError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let mut attribute = self.attribute;
        attribute.mode = self
            .mode
            .ok_or_else(|| SchemaError::MissingMode(attribute.name.clone()))?;

        if attribute.name == "id" {
            return Err(SchemaError::ReservedAttribute);
        }
        if attribute.is_computed() && attribute.forces_recreate {
            return Err(SchemaError::ComputedForcesRecreate(attribute.name));
        }
        if let Some(rule) = &attribute.validation {
            if !rule.applies_to(&attribute.r#type) {
                return Err(SchemaError::RuleKindMismatch {
                    attribute: attribute.name.clone(),
                    rule: rule.name().to_string(),
                    kind: attribute.r#type.to_string(),
                });
            }
            if let ValidationRule::Range {
                min: Some(min),
                max: Some(max),
            } = rule
            {
                if min > max {
                    return Err(SchemaError::InvalidRange {
                        attribute: attribute.name.clone(),
                        min: *min,
                        max: *max,
                    });
                }
            }
        }
        Ok(attribute)
    }
}

/// SchemaBuilder provides fluent API for building resource schemas
pub struct SchemaBuilder {
    type_name: String,
    version: i64,
    description: String,
    endpoint: Endpoint,
    attributes: Vec<AttributeBuilder>,
}

impl SchemaBuilder {
    pub fn new(type_name: &str, base_path: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            version: 0,
            description: String::new(),
            endpoint: Endpoint::new(base_path),
            attributes: Vec::new(),
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }

    pub fn update_method(mut self, method: UpdateMethod) -> Self {
        self.endpoint.update_method = method;
        self
    }

    /// Dot-separated location of the external id, e.g. `"uuid"` or `"meta.id"`
    pub fn id_path(mut self, path: &str) -> Self {
        self.endpoint.id_path = path
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    pub fn envelope(mut self, key: &str) -> Self {
        self.endpoint.envelope = Some(key.to_string());
        self
    }

    pub fn attribute(mut self, attr: AttributeBuilder) -> Self {
        self.attributes.push(attr);
        self
    }

    pub fn build(self) -> Result<ResourceSchema, SchemaError> {
        if self.endpoint.base_path.is_empty() {
            return Err(SchemaError::EmptyBasePath(self.type_name));
        }
        if self.endpoint.id_path.is_empty() {
            return Err(SchemaError::EmptyIdPath(self.type_name));
        }

        let mut seen = HashSet::new();
        let mut attributes = Vec::with_capacity(self.attributes.len());
        for builder in self.attributes {
            let attribute = builder.build()?;
            if !seen.insert(attribute.name.clone()) {
                return Err(SchemaError::DuplicateAttribute(attribute.name));
            }
            attributes.push(attribute);
        }

        Ok(ResourceSchema {
            type_name: self.type_name,
            version: self.version,
            description: self.description,
            attributes,
            endpoint: self.endpoint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access_list_schema() -> ResourceSchema {
        SchemaBuilder::new("test_access_list", "/v1/access-lists")
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .regex("^[a-zA-Z0-9-]+$"),
            )
            .attribute(
                AttributeBuilder::string("access")
                    .required()
                    .one_of(["allow", "block"]),
            )
            .attribute(AttributeBuilder::int("priority").optional().range(1, 100))
            .attribute(
                AttributeBuilder::new("entries", AttributeType::list(AttributeType::String))
                    .optional()
                    .min_length(1),
            )
            .attribute(AttributeBuilder::string("created_at").computed())
            .build()
            .unwrap()
    }

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .description("The name of the resource")
            .required()
            .build()
            .unwrap();

        assert_eq!(attr.name, "name");
        assert!(attr.is_required());
        assert!(attr.is_configurable());
        assert_eq!(attr.description, "The name of the resource");
    }

    #[test]
    fn attribute_without_mode_is_rejected() {
        let result = SchemaBuilder::new("t", "/t")
            .attribute(AttributeBuilder::string("name"))
            .build();
        assert_eq!(result.unwrap_err(), SchemaError::MissingMode("name".into()));
    }

    #[test]
    fn range_on_string_is_a_schema_error() {
        let result = SchemaBuilder::new("t", "/t")
            .attribute(AttributeBuilder::string("name").required().range(1, 2))
            .build();
        assert!(matches!(
            result,
            Err(SchemaError::RuleKindMismatch { ref rule, .. }) if rule == "range"
        ));
    }

    #[test]
    fn schema_build_rejects_bad_definitions() {
        let dup = SchemaBuilder::new("t", "/t")
            .attribute(AttributeBuilder::string("a").required())
            .attribute(AttributeBuilder::string("a").optional())
            .build();
        assert_eq!(dup.unwrap_err(), SchemaError::DuplicateAttribute("a".into()));

        let reserved = SchemaBuilder::new("t", "/t")
            .attribute(AttributeBuilder::string("id").computed())
            .build();
        assert_eq!(reserved.unwrap_err(), SchemaError::ReservedAttribute);

        let computed_recreate = SchemaBuilder::new("t", "/t")
            .attribute(AttributeBuilder::string("c").computed().forces_recreate())
            .build();
        assert!(matches!(
            computed_recreate,
            Err(SchemaError::ComputedForcesRecreate(_))
        ));

        let bad_regex = SchemaBuilder::new("t", "/t")
            .attribute(AttributeBuilder::string("r").required().regex("(oops"))
            .build();
        assert!(matches!(bad_regex, Err(SchemaError::InvalidRegex { .. })));

        let inverted = SchemaBuilder::new("t", "/t")
            .attribute(AttributeBuilder::int("n").optional().range(5, 1))
            .build();
        assert!(matches!(inverted, Err(SchemaError::InvalidRange { .. })));

        let no_path = SchemaBuilder::new("t", "/")
            .attribute(AttributeBuilder::string("a").required())
            .build();
        assert!(matches!(no_path, Err(SchemaError::EmptyBasePath(_))));
    }

    #[test]
    fn validate_accepts_valid_config() {
        let schema = access_list_schema();
        let config = DynamicValue::from_pairs([("name", "test-list"), ("access", "block")]);

        let attrs = schema.validate(&config).unwrap();
        assert_eq!(attrs.get("name"), &Dynamic::from("test-list"));
        assert_eq!(attrs.get("access"), &Dynamic::from("block"));
        assert!(attrs.get("priority").is_null());
    }

    #[test]
    fn validate_collects_every_violation() {
        let schema = access_list_schema();
        let config = DynamicValue::from_pairs([
            ("name", Dynamic::from("invalid name with spaces")),
            ("access", Dynamic::from("permit")),
            ("priority", Dynamic::Int(500)),
        ]);

        let errors = schema.validate(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        let attributes: Vec<String> = errors.iter().map(|e| e.attribute().to_string()).collect();
        assert_eq!(attributes, vec!["name", "access", "priority"]);
    }

    #[test]
    fn missing_required_is_distinct_from_rule_violation() {
        let schema = access_list_schema();
        let config = DynamicValue::from_pairs([("access", "allow")]);

        let errors = schema.validate(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::MissingRequired {
                attribute: AttributePath::new("name")
            }]
        );
    }

    #[test]
    fn empty_string_is_validated() {
        let schema = SchemaBuilder::new("t", "/t")
            .attribute(AttributeBuilder::string("label").optional().min_length(1))
            .build()
            .unwrap();

        let errors = schema
            .validate(&DynamicValue::from_pairs([("label", "")]))
            .unwrap_err();
        assert!(matches!(errors[0], ValidationError::RuleViolation { .. }));

        assert!(schema.validate(&DynamicValue::empty_object()).is_ok());
    }

    #[test]
    fn nested_type_mismatch_reports_element_path() {
        let schema = access_list_schema();
        let config = DynamicValue::from_pairs([
            ("name", Dynamic::from("ok")),
            ("access", Dynamic::from("allow")),
            (
                "entries",
                Dynamic::List(vec![Dynamic::from("10.0.0.0/8"), Dynamic::Int(3)]),
            ),
        ]);

        let errors = schema.validate(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::TypeMismatch {
                attribute: AttributePath::new("entries").index(1),
                expected: "string".to_string(),
                actual: "int".to_string(),
            }]
        );
    }

    #[test]
    fn computed_and_unknown_attributes_are_rejected() {
        let schema = access_list_schema();
        let config = DynamicValue::from_pairs([
            ("name", "ok"),
            ("access", "allow"),
            ("created_at", "yesterday"),
            ("colour", "blue"),
        ]);

        let errors = schema.validate(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::ComputedSet { .. }));
        assert!(matches!(errors[1], ValidationError::UnknownAttribute { .. }));
    }

    #[test]
    fn unknown_values_skip_rules() {
        let schema = access_list_schema();
        let config = DynamicValue::from_pairs([
            ("name", Dynamic::Unknown),
            ("access", Dynamic::from("allow")),
            ("id", Dynamic::Null),
        ]);

        let attrs = schema.validate(&config).unwrap();
        assert!(attrs.get("name").is_unknown());
    }

    #[test]
    fn supports_update_requires_a_mutable_attribute() {
        let all_recreate = SchemaBuilder::new("t", "/t")
            .attribute(AttributeBuilder::string("a").required().forces_recreate())
            .attribute(AttributeBuilder::string("b").optional().forces_recreate())
            .attribute(AttributeBuilder::string("c").computed())
            .build()
            .unwrap();
        assert!(!all_recreate.supports_update());
        assert!(access_list_schema().supports_update());
    }

    #[test]
    fn endpoint_paths_encode_ids() {
        let schema = SchemaBuilder::new("t", "/v1/things/")
            .id_path("meta.uuid")
            .attribute(AttributeBuilder::string("a").required())
            .build()
            .unwrap();

        assert_eq!(schema.endpoint.collection_path(), "/v1/things");
        assert_eq!(schema.endpoint.item_path("a b/c"), "/v1/things/a%20b%2Fc");
        assert_eq!(schema.endpoint.id_path, vec!["meta", "uuid"]);
    }

    #[test]
    fn attribute_type_display() {
        let t = AttributeType::list(AttributeType::map(AttributeType::String));
        assert_eq!(t.to_string(), "list(map(string))");
        assert!(t.accepts(&Dynamic::List(vec![Dynamic::Map(HashMap::new())])));
        assert!(!t.accepts(&Dynamic::from("x")));
    }
}
